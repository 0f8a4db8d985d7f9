//! Autonomous end-to-end run: no pause point, approvals synthesized with
//! every candidate address, one status line recorded per lead.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use leadflow::collaborators::{
    DeliveryError, Dispatcher, Draft, DraftGenerator, FetchError, GenerationError, Lead,
    LeadSource, WriteError,
};
use leadflow::config::EngineConfig;
use leadflow::engine::{Engine, RunOutcome};
use leadflow::stages::{ReferenceContext, StageExecutor};
use leadflow::state::Mode;

struct DemoLeads {
    queue: Mutex<Vec<Lead>>,
    recorded: Mutex<Vec<(u32, String)>>,
}

impl DemoLeads {
    fn seeded() -> Arc<Self> {
        let mk = |row: u32, name: &str, company: &str, emails: &[&str]| Lead {
            row_index: row,
            status_column_index: 5,
            recipient_name: name.into(),
            company_name: company.into(),
            position: "Engineer".into(),
            candidate_emails: emails.iter().map(|e| e.to_string()).collect(),
        };
        Arc::new(Self {
            queue: Mutex::new(vec![
                mk(2, "Ada Lovelace", "Analytical Engines", &["ada@analytical.example"]),
                mk(3, "Grace Hopper", "Compile Co", &[
                    "grace@compile.example",
                    "g.hopper@compile.example",
                ]),
                mk(4, "No Address", "Ghost Corp", &[]),
            ]),
            recorded: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LeadSource for DemoLeads {
    async fn next(&self) -> Result<Option<Lead>, FetchError> {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            Ok(None)
        } else {
            Ok(Some(queue.remove(0)))
        }
    }

    async fn record_status(
        &self,
        row_index: u32,
        _status_column_index: u32,
        text: &str,
    ) -> Result<(), WriteError> {
        self.recorded.lock().push((row_index, text.to_string()));
        Ok(())
    }
}

struct DemoDrafts;

#[async_trait]
impl DraftGenerator for DemoDrafts {
    async fn create_draft(
        &self,
        recipient_name: &str,
        company_name: &str,
        position: &str,
        _resume_context: &str,
    ) -> Result<Draft, GenerationError> {
        Ok(Draft {
            subject: format!("{position} at {company_name}"),
            body: format!("Hi {recipient_name}, I'd love to talk about the {position} role."),
        })
    }

    async fn revise_draft(
        &self,
        subject: &str,
        body: &str,
        feedback: &str,
    ) -> Result<Draft, GenerationError> {
        Ok(Draft {
            subject: subject.to_string(),
            body: format!("{body}\n[revised per feedback: {feedback}]"),
        })
    }
}

struct StdoutDispatcher;

#[async_trait]
impl Dispatcher for StdoutDispatcher {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        _body: &str,
    ) -> Result<(), DeliveryError> {
        tracing::info!(?recipients, %subject, "message dispatched");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    leadflow::telemetry::init();

    let leads = DemoLeads::seeded();
    let executor = StageExecutor::new(
        leads.clone(),
        Arc::new(DemoDrafts),
        Arc::new(StdoutDispatcher),
        ReferenceContext::inline("Sample resume content."),
    );
    let mut engine = Engine::new(executor, EngineConfig::default()).await;
    let session_id = EngineConfig::generate_session_id();

    match engine.start(&session_id, Mode::AutoDraft).await? {
        RunOutcome::Finished(report) => {
            println!("Run complete in {} steps.", report.step);
            for (row, text) in leads.recorded.lock().iter() {
                println!("  row {row}: {text}");
            }
        }
        RunOutcome::Paused(_) => unreachable!("autonomous mode never pauses"),
    }
    Ok(())
}
