//! Terminal front end for the outreach engine.
//!
//! Mirrors the full human-in-the-loop surface: mode selection, draft
//! display at the review pause, multi-address disambiguation, and the
//! approve / skip / refine loop. Collaborators are in-memory demo
//! implementations; swap in real ones to drive an actual lead book.

use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use miette::IntoDiagnostic;
use parking_lot::Mutex;

use leadflow::collaborators::{
    DeliveryError, Dispatcher, Draft, DraftGenerator, FetchError, GenerationError, Lead,
    LeadSource, WriteError,
};
use leadflow::config::EngineConfig;
use leadflow::engine::{Decision, Engine, PauseReport, RunOutcome};
use leadflow::stages::{ReferenceContext, StageExecutor};
use leadflow::state::Mode;

const RESUME: &str = "Systems engineer; four years of Rust services, \
workflow tooling, and a habit of shipping things that resume cleanly.";

struct DemoLeads {
    queue: Mutex<Vec<Lead>>,
}

impl DemoLeads {
    fn seeded() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(vec![
                Lead {
                    row_index: 2,
                    status_column_index: 5,
                    recipient_name: "Ada Lovelace".into(),
                    company_name: "Analytical Engines".into(),
                    position: "Platform Engineer".into(),
                    candidate_emails: vec![
                        "ada@analytical.example".into(),
                        "a.lovelace@analytical.example".into(),
                    ],
                },
                Lead {
                    row_index: 3,
                    status_column_index: 5,
                    recipient_name: "Grace Hopper".into(),
                    company_name: "Compile Co".into(),
                    position: "Staff Engineer".into(),
                    candidate_emails: vec!["grace@compile.example".into()],
                },
                Lead {
                    row_index: 4,
                    status_column_index: 5,
                    recipient_name: "No Address".into(),
                    company_name: "Ghost Corp".into(),
                    position: "Engineer".into(),
                    candidate_emails: vec![],
                },
            ]),
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
        tracing::info!(row = row_index, %text, "status recorded");
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
        resume_context: &str,
    ) -> Result<Draft, GenerationError> {
        let first_name = recipient_name.split_whitespace().next().unwrap_or(recipient_name);
        Ok(Draft {
            subject: format!("{position} at {company_name}"),
            body: format!(
                "Hi {first_name},\n\nI've been following {company_name} and would love \
to talk about the {position} opening.\n\nAbout me: {resume_context}\n\n\
Would you have fifteen minutes this week?\n"
            ),
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
            body: format!("{body}\n[revised per feedback: {feedback}]\n"),
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

fn prompt(question: &str) -> io::Result<String> {
    print!("{question} ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn display_draft(report: &PauseReport) {
    let state = &report.state;
    println!("\n----------------------------------------");
    println!(
        "Lead (row {}): {} - {} at {}",
        state.row_index.unwrap_or_default(),
        state.recipient_name,
        state.position,
        state.company_name
    );
    println!("Subject: {}", state.email_subject.as_deref().unwrap_or("N/A"));
    println!("---");
    println!("{}", state.email_body.as_deref().unwrap_or("N/A"));
    println!("----------------------------------------");
}

fn choose_recipients(candidates: &[String]) -> io::Result<Vec<String>> {
    if candidates.len() <= 1 {
        return Ok(candidates.to_vec());
    }
    println!("Multiple addresses found for this lead:");
    for (i, email) in candidates.iter().enumerate() {
        println!("  [{}] {email}", i + 1);
    }
    let choice = prompt("Target which address? ('all' or an index, default all):")?;
    if choice.is_empty() || choice.eq_ignore_ascii_case("all") {
        return Ok(candidates.to_vec());
    }
    match choice.parse::<usize>() {
        Ok(n) if (1..=candidates.len()).contains(&n) => Ok(vec![candidates[n - 1].clone()]),
        _ => {
            println!("Invalid choice, defaulting to the first address.");
            Ok(vec![candidates[0].clone()])
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    leadflow::telemetry::init();

    println!("leadflow - outreach workflow demo");
    println!("  1. Interactive: review and approve each draft");
    println!("  2. Autonomous: draft and dispatch every lead");
    let mode = match prompt("Mode [1/2, default 1]:").into_diagnostic()?.as_str() {
        "2" => Mode::AutoDraft,
        _ => Mode::Interactive,
    };

    let executor = StageExecutor::new(
        DemoLeads::seeded(),
        Arc::new(DemoDrafts),
        Arc::new(StdoutDispatcher),
        ReferenceContext::inline(RESUME),
    );
    let mut engine = Engine::new(executor, EngineConfig::default()).await;
    let session_id = EngineConfig::generate_session_id();

    let mut outcome = engine.start(&session_id, mode).await?;
    loop {
        match outcome {
            RunOutcome::Finished(report) => {
                println!("\nAll leads processed ({} steps). Goodbye!", report.step);
                break;
            }
            RunOutcome::Paused(ref report) => {
                display_draft(report);
                let action = prompt("[y] approve / [s] skip / anything else = refine feedback:")
                    .into_diagnostic()?;
                let decision = match action.to_lowercase().as_str() {
                    "" | "y" => Decision::Approve {
                        selected: Some(
                            choose_recipients(&report.state.candidate_emails).into_diagnostic()?,
                        ),
                    },
                    "s" | "skip" => Decision::Skip,
                    _ => Decision::Refine { feedback: action },
                };
                outcome = engine.inject_decision(&session_id, decision).await?;
            }
        }
    }
    Ok(())
}
