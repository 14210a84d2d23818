//! LEADLINE Engine - the lead pipeline behavior.
//!
//! Owns the canonical in-memory lead collection and everything that mutates
//! or reads it: deterministic scoring, timestamp-ordered reconciliation of
//! five independent change streams against optimistic local edits, the
//! declarative filter/sort pipeline, and the async command facade over the
//! persistence boundary.
//!
//! Scheduling model: single-threaded, cooperative, event-driven. Merges and
//! filter/sort passes run synchronously to completion; concurrency arises
//! only from the number of independent asynchronous sources, never from
//! parallel execution on the held collection.

pub mod config;
pub mod memory;
pub mod merge;
pub mod pipeline;
pub mod query;
pub mod score;
pub mod session;
pub mod storage;
pub mod store;
pub mod streams;

pub use config::{EngineConfig, ReconnectConfig};
pub use memory::InMemoryBackend;
pub use merge::HeldLead;
pub use pipeline::LeadPipeline;
pub use query::{apply, matches, QueryContext};
pub use score::{quality, score_aggregate, score_lead, Engagement};
pub use session::{SessionProvider, StaticSession};
pub use storage::LeadStoreBackend;
pub use store::PipelineStore;
pub use streams::{notification_stream, spawn_listeners, ChangeTransport};
