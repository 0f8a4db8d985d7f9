//! Shared fixtures: scripted collaborators with call recording and failure
//! toggles, plus helpers for building leads and executors.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use leadflow::collaborators::{
    DeliveryError, Dispatcher, Draft, DraftGenerator, FetchError, GenerationError, Lead,
    LeadSource, WriteError,
};
use leadflow::stages::{ReferenceContext, StageExecutor};

/// One status write observed by the scripted lead source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedStatus {
    pub row_index: u32,
    pub status_column_index: u32,
    pub text: String,
}

/// Lead source over a fixed queue, recording every collaborator call in
/// order so tests can assert sequencing (e.g. update-before-next-fetch).
#[derive(Default)]
pub struct ScriptedLeads {
    queue: Mutex<VecDeque<Lead>>,
    pub recorded: Mutex<Vec<RecordedStatus>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub fail_next: AtomicBool,
    pub fail_record: AtomicBool,
}

impl ScriptedLeads {
    pub fn new(leads: Vec<Lead>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(leads.into()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl LeadSource for ScriptedLeads {
    async fn next(&self) -> Result<Option<Lead>, FetchError> {
        self.calls.lock().push("next");
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(FetchError::new("scripted outage"));
        }
        Ok(self.queue.lock().pop_front())
    }

    async fn record_status(
        &self,
        row_index: u32,
        status_column_index: u32,
        text: &str,
    ) -> Result<(), WriteError> {
        self.calls.lock().push("record");
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(WriteError::new("sheet offline"));
        }
        self.recorded.lock().push(RecordedStatus {
            row_index,
            status_column_index,
            text: text.to_string(),
        });
        Ok(())
    }
}

/// Deterministic draft generator with per-method failure toggles.
#[derive(Default)]
pub struct StubDrafts {
    pub created: AtomicU32,
    pub revised: AtomicU32,
    pub fail_create: AtomicBool,
    pub fail_revise: AtomicBool,
}

impl StubDrafts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl DraftGenerator for StubDrafts {
    async fn create_draft(
        &self,
        recipient_name: &str,
        company_name: &str,
        position: &str,
        _resume_context: &str,
    ) -> Result<Draft, GenerationError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GenerationError::new("model unavailable"));
        }
        Ok(Draft {
            subject: format!("Hello {recipient_name}"),
            body: format!("Regarding the {position} role at {company_name}."),
        })
    }

    async fn revise_draft(
        &self,
        subject: &str,
        body: &str,
        feedback: &str,
    ) -> Result<Draft, GenerationError> {
        self.revised.fetch_add(1, Ordering::SeqCst);
        if self.fail_revise.load(Ordering::SeqCst) {
            return Err(GenerationError::new("model unavailable"));
        }
        Ok(Draft {
            subject: subject.to_string(),
            body: format!("{body} [revised: {feedback}]"),
        })
    }
}

/// One delivery observed by the recording dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub deliveries: Mutex<Vec<Delivery>>,
    pub fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn deliver(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::new(recipients.len(), "smtp refused"));
        }
        self.deliveries.lock().push(Delivery {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub fn lead(row_index: u32, recipient: &str, emails: &[&str]) -> Lead {
    Lead {
        row_index,
        status_column_index: 5,
        recipient_name: recipient.to_string(),
        company_name: "Acme".to_string(),
        position: "Engineer".to_string(),
        candidate_emails: emails.iter().map(|e| e.to_string()).collect(),
    }
}

pub fn executor(
    leads: Arc<ScriptedLeads>,
    drafts: Arc<StubDrafts>,
    dispatcher: Arc<RecordingDispatcher>,
) -> StageExecutor {
    StageExecutor::new(
        leads,
        drafts,
        dispatcher,
        ReferenceContext::inline("Sample resume content."),
    )
}
