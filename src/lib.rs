//! # Leadflow: Resumable Lead-Outreach Workflow Engine
//!
//! Leadflow automates a per-lead outreach pipeline: pull a lead record,
//! produce a draft message, optionally pause for a human decision, revise
//! on feedback, dispatch the message, and record the outcome. The crate is
//! the **workflow engine** for that pipeline: the state machine, the
//! conditional routing, the checkpoint persistence that lets a session stop
//! and resume at the exact interruption point, and the two execution modes
//! (human-gated and fully autonomous). Everything stateless (reading lead
//! rows, generating text, delivering mail) lives behind the collaborator
//! traits in [`collaborators`] and is injected at construction.
//!
//! ## Core Concepts
//!
//! - **Stages**: six handlers (`fetch`, `generate`, `review`, `refine`,
//!   `send`, `update`), each a pure `state -> patch` transformation
//! - **Router**: conditional edges deciding the next stage from the state
//! - **Checkpoints**: a snapshot after every stage, keyed by session id
//! - **Engine**: the loop, the review pause point, and the
//!   `start` / `get_state` / `inject_decision` front-end surface
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use leadflow::collaborators::{
//!     DeliveryError, Dispatcher, Draft, DraftGenerator, FetchError, GenerationError, Lead,
//!     LeadSource, WriteError,
//! };
//! use leadflow::config::EngineConfig;
//! use leadflow::engine::{Engine, RunOutcome};
//! use leadflow::stages::{ReferenceContext, StageExecutor};
//! use leadflow::state::Mode;
//!
//! struct EmptyBook;
//!
//! #[async_trait]
//! impl LeadSource for EmptyBook {
//!     async fn next(&self) -> Result<Option<Lead>, FetchError> {
//!         Ok(None)
//!     }
//!     async fn record_status(&self, _: u32, _: u32, _: &str) -> Result<(), WriteError> {
//!         Ok(())
//!     }
//! }
//!
//! struct TemplateDrafts;
//!
//! #[async_trait]
//! impl DraftGenerator for TemplateDrafts {
//!     async fn create_draft(
//!         &self,
//!         recipient: &str,
//!         company: &str,
//!         _position: &str,
//!         _resume_context: &str,
//!     ) -> Result<Draft, GenerationError> {
//!         Ok(Draft {
//!             subject: format!("Hello {recipient}"),
//!             body: format!("A note for {company}."),
//!         })
//!     }
//!     async fn revise_draft(
//!         &self,
//!         subject: &str,
//!         body: &str,
//!         feedback: &str,
//!     ) -> Result<Draft, GenerationError> {
//!         Ok(Draft {
//!             subject: subject.to_string(),
//!             body: format!("{body}\n(revised per: {feedback})"),
//!         })
//!     }
//! }
//!
//! struct NullDispatcher;
//!
//! #[async_trait]
//! impl Dispatcher for NullDispatcher {
//!     async fn deliver(&self, _: &[String], _: &str, _: &str) -> Result<(), DeliveryError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let executor = StageExecutor::new(
//!         Arc::new(EmptyBook),
//!         Arc::new(TemplateDrafts),
//!         Arc::new(NullDispatcher),
//!         ReferenceContext::inline("resume text"),
//!     );
//!     let mut engine = Engine::new(executor, EngineConfig::default()).await;
//!
//!     match engine.start("demo-session", Mode::Interactive).await? {
//!         RunOutcome::Finished(report) => println!("finished at step {}", report.step),
//!         RunOutcome::Paused(report) => println!("awaiting a decision at step {}", report.step),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## The Pause Point
//!
//! In `Interactive` mode the engine halts before the review stage whenever
//! a draft is awaiting a decision, checkpoints the paused session, and
//! returns control to the caller. The caller inspects the draft via
//! [`Engine::get_state`](engine::Engine::get_state) and unblocks it with
//! [`Engine::inject_decision`](engine::Engine::inject_decision): approve
//! (with a recipient selection when the lead has several candidate
//! addresses), skip, or refine with feedback. In `AutoDraft` mode the pause
//! is never honored; the engine approves with every candidate address and
//! keeps going.
//!
//! ## Module Guide
//!
//! - [`state`] - The workflow state record and stage patches
//! - [`stage`] - Stage identifiers and their persisted encoding
//! - [`router`] - The state machine's edge table
//! - [`stages`] - Stage handlers and the executor
//! - [`collaborators`] - External contracts (lead source, drafts, dispatch)
//! - [`engine`] - The run loop, pause point, and decision surface
//! - [`checkpoint`] - Checkpoint stores (in-memory, sqlite)
//! - [`persistence`] - Serde-friendly persisted checkpoint models
//! - [`config`] - Engine configuration
//! - [`telemetry`] - Tracing setup for binaries

pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod persistence;
pub mod router;
pub mod session;
pub mod stage;
pub mod stages;
pub mod state;
pub mod telemetry;
