//! LEADLINE Core - Entity Types
//!
//! Pure data structures with no engine behavior. All other crates depend on
//! this. This crate contains the lead pipeline's data model: identities,
//! enums, entity structs, query specifications, change notifications, and
//! the error taxonomy.

pub mod change;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod query;

pub use change::{ChangeNotification, ChangeOp, StreamChannel};
pub use entities::{
    Comment, CommentDraft, Contact, ContactDraft, Lead, LeadAggregate, LeadCorePatch, LeadDraft,
    LeadEvent, LeadPatch, TechnicianAssignment,
};
pub use enums::{
    CommentType, CompanySize, ContactMethod, EntityKind, FieldGroup, LeadEventType, LeadPriority,
    LeadQuality, LeadStatus,
};
pub use error::{
    ConfigError, LeadlineError, LeadlineResult, StoreError, StreamError, ValidationError,
};
pub use identity::{new_entity_id, EntityId, Timestamp};
pub use query::{
    AssignmentScope, CreatedWithin, LeadFilter, SortDirection, SortField, SortFieldParseError,
    SortSpec, ValuePresence,
};
