//! Core entity structures for the lead pipeline.

use crate::{
    new_entity_id, CommentType, CompanySize, ContactMethod, EntityId, FieldGroup, LeadEventType,
    LeadPriority, LeadStatus, Timestamp, ValidationError,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// LEAD (AGGREGATE ROOT)
// ============================================================================

/// Lead - a prospective customer tracked through the qualification pipeline.
///
/// The lead score and quality band are derived values, recomputed from the
/// current attributes on every read. They are never stored on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: EntityId,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub org_number: Option<String>,
    pub company_size: Option<CompanySize>,
    pub contact_method: Option<ContactMethod>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    /// BANT: budget confirmed
    pub budget_confirmed: bool,
    /// BANT: decision authority confirmed
    pub authority_confirmed: bool,
    /// BANT: need confirmed
    pub needs_confirmed: bool,
    /// BANT: timeline confirmed
    pub timeline_confirmed: bool,
    pub estimated_value: Option<Decimal>,
    /// Win probability in percent, 0-100.
    pub probability: Option<u8>,
    pub closing_date_estimate: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    /// Direct assignment, independent of the technician assignment set.
    pub assigned_to: Option<EntityId>,
    pub created_by: EntityId,
    pub updated_by: EntityId,
    pub created_at: Timestamp,
    /// Monotonic server timestamp; the conflict-ordering authority.
    pub updated_at: Timestamp,
    /// Ordered tag list, duplicates disallowed.
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl Lead {
    /// Create a new lead. Starts `cold` with no priority unless overridden.
    pub fn new(company_name: &str, created_by: EntityId) -> Self {
        let now = Utc::now();
        Self {
            lead_id: new_entity_id(),
            company_name: company_name.to_string(),
            contact_person: None,
            email: None,
            phone: None,
            org_number: None,
            company_size: None,
            contact_method: None,
            source: None,
            status: LeadStatus::Cold,
            priority: LeadPriority::None,
            budget_confirmed: false,
            authority_confirmed: false,
            needs_confirmed: false,
            timeline_confirmed: false,
            estimated_value: None,
            probability: None,
            closing_date_estimate: None,
            follow_up_date: None,
            assigned_to: None,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            notes: None,
        }
    }

    /// Set the pipeline status.
    pub fn with_status(mut self, status: LeadStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: LeadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the contact person.
    pub fn with_contact_person(mut self, contact_person: &str) -> Self {
        self.contact_person = Some(contact_person.to_string());
        self
    }

    /// Set the contact email.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Set the estimated deal value.
    pub fn with_estimated_value(mut self, value: Decimal) -> Self {
        self.estimated_value = Some(value);
        self
    }

    /// Set the win probability (percent).
    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Set the lead source.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Add a tag. Returns false (and leaves the list unchanged) if the tag
    /// is already present; order of existing tags is preserved.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag. Returns true if the tag was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Snapshot of the core field group, used as an optimistic edit payload.
    pub fn core_fields(&self) -> LeadCorePatch {
        LeadCorePatch {
            company_name: self.company_name.clone(),
            contact_person: self.contact_person.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            org_number: self.org_number.clone(),
            company_size: self.company_size,
            contact_method: self.contact_method,
            source: self.source.clone(),
            budget_confirmed: self.budget_confirmed,
            authority_confirmed: self.authority_confirmed,
            needs_confirmed: self.needs_confirmed,
            timeline_confirmed: self.timeline_confirmed,
            estimated_value: self.estimated_value,
            probability: self.probability,
            closing_date_estimate: self.closing_date_estimate,
            follow_up_date: self.follow_up_date,
            assigned_to: self.assigned_to,
            notes: self.notes.clone(),
        }
    }

    /// Apply an edit to the field group the patch belongs to, stamping
    /// `updated_at`/`updated_by`. Tags are deduplicated, order preserved.
    pub fn apply_patch(&mut self, patch: &LeadPatch, now: Timestamp, user: EntityId) {
        match patch {
            LeadPatch::Core(core) => {
                self.company_name = core.company_name.clone();
                self.contact_person = core.contact_person.clone();
                self.email = core.email.clone();
                self.phone = core.phone.clone();
                self.org_number = core.org_number.clone();
                self.company_size = core.company_size;
                self.contact_method = core.contact_method;
                self.source = core.source.clone();
                self.budget_confirmed = core.budget_confirmed;
                self.authority_confirmed = core.authority_confirmed;
                self.needs_confirmed = core.needs_confirmed;
                self.timeline_confirmed = core.timeline_confirmed;
                self.estimated_value = core.estimated_value;
                self.probability = core.probability;
                self.closing_date_estimate = core.closing_date_estimate;
                self.follow_up_date = core.follow_up_date;
                self.assigned_to = core.assigned_to;
                self.notes = core.notes.clone();
            }
            LeadPatch::Status(status) => {
                self.status = *status;
            }
            LeadPatch::Priority(priority) => {
                self.priority = *priority;
            }
            LeadPatch::Tags(tags) => {
                self.tags.clear();
                for tag in tags {
                    if !self.tags.iter().any(|t| t == tag) {
                        self.tags.push(tag.clone());
                    }
                }
            }
        }
        self.updated_at = now;
        self.updated_by = user;
    }
}

/// Full snapshot of a lead's core field group (everything outside status,
/// priority, and tags). Optimistic core edits replace the whole group; the
/// per-group timestamp ordering in the reconciler does the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadCorePatch {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub org_number: Option<String>,
    pub company_size: Option<CompanySize>,
    pub contact_method: Option<ContactMethod>,
    pub source: Option<String>,
    pub budget_confirmed: bool,
    pub authority_confirmed: bool,
    pub needs_confirmed: bool,
    pub timeline_confirmed: bool,
    pub estimated_value: Option<Decimal>,
    pub probability: Option<u8>,
    pub closing_date_estimate: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub assigned_to: Option<EntityId>,
    pub notes: Option<String>,
}

/// An edit to exactly one field group of a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LeadPatch {
    Core(Box<LeadCorePatch>),
    Status(LeadStatus),
    Priority(LeadPriority),
    Tags(Vec<String>),
}

impl LeadPatch {
    /// The field group this patch mutates.
    pub fn group(&self) -> FieldGroup {
        match self {
            LeadPatch::Core(_) => FieldGroup::Core,
            LeadPatch::Status(_) => FieldGroup::Status,
            LeadPatch::Priority(_) => FieldGroup::Priority,
            LeadPatch::Tags(_) => FieldGroup::Tags,
        }
    }
}

/// Payload for creating a new lead, validated before any store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    pub company_name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub org_number: Option<String>,
    pub company_size: Option<CompanySize>,
    pub contact_method: Option<ContactMethod>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub estimated_value: Option<Decimal>,
    pub probability: Option<u8>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl LeadDraft {
    pub fn new(company_name: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            contact_person: None,
            email: None,
            phone: None,
            org_number: None,
            company_size: None,
            contact_method: None,
            source: None,
            status: None,
            priority: None,
            estimated_value: None,
            probability: None,
            tags: Vec::new(),
            notes: None,
        }
    }

    /// Validate the draft. No partial state is possible on failure because
    /// validation runs before anything reaches the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "company_name".to_string(),
            });
        }
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                return Err(ValidationError::MalformedEmail {
                    value: email.clone(),
                });
            }
        }
        if let Some(probability) = self.probability {
            if probability > 100 {
                return Err(ValidationError::InvalidValue {
                    field: "probability".to_string(),
                    reason: format!("must be 0-100, got {}", probability),
                });
            }
        }
        if let Some(value) = self.estimated_value {
            if value.is_sign_negative() {
                return Err(ValidationError::InvalidValue {
                    field: "estimated_value".to_string(),
                    reason: "must not be negative".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Materialize the draft into a lead owned by `created_by`.
    pub fn into_lead(self, created_by: EntityId) -> Lead {
        let mut lead = Lead::new(&self.company_name, created_by);
        lead.contact_person = self.contact_person;
        lead.email = self.email;
        lead.phone = self.phone;
        lead.org_number = self.org_number;
        lead.company_size = self.company_size;
        lead.contact_method = self.contact_method;
        lead.source = self.source;
        lead.status = self.status.unwrap_or_default();
        lead.priority = self.priority.unwrap_or_default();
        lead.estimated_value = self.estimated_value;
        lead.probability = self.probability;
        lead.notes = self.notes;
        for tag in &self.tags {
            lead.add_tag(tag);
        }
        lead
    }
}

// ============================================================================
// CHILD ENTITIES
// ============================================================================

/// Contact - a person at the lead's company. At most one contact per lead
/// may be primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: EntityId,
    pub lead_id: EntityId,
    pub name: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub is_primary: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contact {
    pub fn new(lead_id: EntityId, name: &str) -> Self {
        let now = Utc::now();
        Self {
            contact_id: new_entity_id(),
            lead_id,
            name: name.to_string(),
            title: None,
            phone: None,
            email: None,
            notes: None,
            is_primary: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    /// Mark as the primary contact for the lead.
    pub fn as_primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// Payload for creating or editing a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub lead_id: EntityId,
    pub name: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub is_primary: bool,
}

impl ContactDraft {
    pub fn new(lead_id: EntityId, name: &str) -> Self {
        Self {
            lead_id,
            name: name.to_string(),
            title: None,
            phone: None,
            email: None,
            notes: None,
            is_primary: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        if let Some(email) = &self.email {
            if !is_plausible_email(email) {
                return Err(ValidationError::MalformedEmail {
                    value: email.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn into_contact(self) -> Contact {
        let now = Utc::now();
        Contact {
            contact_id: new_entity_id(),
            lead_id: self.lead_id,
            name: self.name,
            title: self.title,
            phone: self.phone,
            email: self.email,
            notes: self.notes,
            is_primary: self.is_primary,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Comment - a free-form note/call/meeting record on a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: EntityId,
    pub lead_id: EntityId,
    pub content: String,
    pub comment_type: CommentType,
    pub created_by: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comment {
    pub fn new(lead_id: EntityId, content: &str, created_by: EntityId) -> Self {
        let now = Utc::now();
        Self {
            comment_id: new_entity_id(),
            lead_id,
            content: content.to_string(),
            comment_type: CommentType::Note,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_type(mut self, comment_type: CommentType) -> Self {
        self.comment_type = comment_type;
        self
    }
}

/// Payload for creating a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub lead_id: EntityId,
    pub content: String,
    pub comment_type: CommentType,
}

impl CommentDraft {
    pub fn new(lead_id: EntityId, content: &str) -> Self {
        Self {
            lead_id,
            content: content.to_string(),
            comment_type: CommentType::Note,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "content".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_comment(self, created_by: EntityId) -> Comment {
        let now = Utc::now();
        Comment {
            comment_id: new_entity_id(),
            lead_id: self.lead_id,
            content: self.content,
            comment_type: self.comment_type,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// LeadEvent - append-mostly audit/timeline entry. The durable narrative of
/// everything that happened to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadEvent {
    pub event_id: EntityId,
    pub lead_id: EntityId,
    pub event_type: LeadEventType,
    pub title: String,
    pub description: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_by: EntityId,
    pub created_at: Timestamp,
}

impl LeadEvent {
    pub fn new(
        lead_id: EntityId,
        event_type: LeadEventType,
        title: &str,
        created_by: EntityId,
    ) -> Self {
        Self {
            event_id: new_entity_id(),
            lead_id,
            event_type,
            title: title.to_string(),
            description: None,
            data: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Build the audit event for a status transition, capturing old and new
    /// state in the structured payload.
    pub fn status_changed(
        lead_id: EntityId,
        old: LeadStatus,
        new: LeadStatus,
        created_by: EntityId,
    ) -> Self {
        Self::new(lead_id, LeadEventType::StatusChanged, "Status changed", created_by)
            .with_description(&format!("{} -> {}", old, new))
            .with_data(json!({ "from": old.as_db_str(), "to": new.as_db_str() }))
    }
}

/// TechnicianAssignment - join between a lead and a technician. At most one
/// assignment per lead may be primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicianAssignment {
    pub assignment_id: EntityId,
    pub lead_id: EntityId,
    pub technician_id: EntityId,
    pub is_primary: bool,
    pub assigned_at: Timestamp,
    pub notes: Option<String>,
}

impl TechnicianAssignment {
    pub fn new(lead_id: EntityId, technician_id: EntityId) -> Self {
        Self {
            assignment_id: new_entity_id(),
            lead_id,
            technician_id,
            is_primary: false,
            assigned_at: Utc::now(),
            notes: None,
        }
    }

    pub fn as_primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Denormalized view of a lead with its four related sub-collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadAggregate {
    pub lead: Lead,
    pub contacts: Vec<Contact>,
    pub comments: Vec<Comment>,
    pub events: Vec<LeadEvent>,
    pub assignments: Vec<TechnicianAssignment>,
}

impl LeadAggregate {
    pub fn new(lead: Lead) -> Self {
        Self {
            lead,
            contacts: Vec::new(),
            comments: Vec::new(),
            events: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Total recorded activity: comment count + event count.
    pub fn activity_count(&self) -> usize {
        self.comments.len() + self.events.len()
    }

    /// The primary contact, if one is marked.
    pub fn primary_contact(&self) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.is_primary)
    }

    /// The primary technician assignment, if one is marked.
    pub fn primary_assignment(&self) -> Option<&TechnicianAssignment> {
        self.assignments.iter().find(|a| a.is_primary)
    }

    /// Comments in the declared default timeline order: newest first by
    /// `created_at`.
    pub fn comments_newest_first(&self) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self.comments.iter().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }

    /// Events in the declared default timeline order: newest first by
    /// `created_at`.
    pub fn events_newest_first(&self) -> Vec<&LeadEvent> {
        let mut events: Vec<&LeadEvent> = self.events.iter().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events
    }

    /// Whether the given technician appears in the assignment set.
    pub fn has_technician(&self, technician_id: EntityId) -> bool {
        self.assignments
            .iter()
            .any(|a| a.technician_id == technician_id)
    }
}

/// Structural plausibility check for an email address: one `@` with a
/// non-empty local part and a dotted domain. Full RFC validation is the
/// persistent store's job.
pub fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_new_lead_defaults() {
        let user = new_entity_id();
        let lead = Lead::new("Acme Pest Control", user);
        assert_eq!(lead.status, LeadStatus::Cold);
        assert_eq!(lead.priority, LeadPriority::None);
        assert_eq!(lead.created_by, user);
        assert_eq!(lead.updated_by, user);
        assert!(lead.tags.is_empty());
        assert!(!lead.budget_confirmed);
    }

    #[test]
    fn test_add_tag_rejects_duplicates() {
        let mut lead = Lead::new("Acme", new_entity_id());
        assert!(lead.add_tag("vip"));
        assert!(lead.add_tag("north"));
        assert!(!lead.add_tag("vip"));
        assert_eq!(lead.tags, vec!["vip", "north"]);
    }

    #[test]
    fn test_remove_tag() {
        let mut lead = Lead::new("Acme", new_entity_id());
        lead.add_tag("vip");
        assert!(lead.remove_tag("vip"));
        assert!(!lead.remove_tag("vip"));
        assert!(lead.tags.is_empty());
    }

    #[test]
    fn test_apply_patch_status_stamps_updated() {
        let user = new_entity_id();
        let editor = new_entity_id();
        let mut lead = Lead::new("Acme", user);
        let before = lead.updated_at;
        let now = before + chrono::Duration::seconds(5);

        lead.apply_patch(&LeadPatch::Status(LeadStatus::Hot), now, editor);

        assert_eq!(lead.status, LeadStatus::Hot);
        assert_eq!(lead.updated_at, now);
        assert_eq!(lead.updated_by, editor);
    }

    #[test]
    fn test_apply_patch_tags_dedupes() {
        let user = new_entity_id();
        let mut lead = Lead::new("Acme", user);
        let patch = LeadPatch::Tags(vec![
            "vip".to_string(),
            "north".to_string(),
            "vip".to_string(),
        ]);

        lead.apply_patch(&patch, Utc::now(), user);

        assert_eq!(lead.tags, vec!["vip", "north"]);
    }

    #[test]
    fn test_patch_group_mapping() {
        let lead = Lead::new("Acme", new_entity_id());
        assert_eq!(
            LeadPatch::Core(Box::new(lead.core_fields())).group(),
            FieldGroup::Core
        );
        assert_eq!(LeadPatch::Status(LeadStatus::Hot).group(), FieldGroup::Status);
        assert_eq!(
            LeadPatch::Priority(LeadPriority::High).group(),
            FieldGroup::Priority
        );
        assert_eq!(LeadPatch::Tags(vec![]).group(), FieldGroup::Tags);
    }

    #[test]
    fn test_lead_draft_requires_company_name() {
        let draft = LeadDraft::new("   ");
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::RequiredFieldMissing { field }) if field == "company_name"
        ));
    }

    #[test]
    fn test_lead_draft_rejects_bad_probability() {
        let mut draft = LeadDraft::new("Acme");
        draft.probability = Some(101);
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidValue { field, .. }) if field == "probability"
        ));
    }

    #[test]
    fn test_lead_draft_rejects_negative_value() {
        let mut draft = LeadDraft::new("Acme");
        draft.estimated_value = Some(Decimal::from(-5));
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidValue { field, .. }) if field == "estimated_value"
        ));
    }

    #[test]
    fn test_lead_draft_into_lead_carries_fields() {
        let mut draft = LeadDraft::new("Acme");
        draft.status = Some(LeadStatus::Warm);
        draft.estimated_value = Some(Decimal::from(250_000));
        draft.tags = vec!["vip".to_string(), "vip".to_string()];
        let user = new_entity_id();

        let lead = draft.into_lead(user);

        assert_eq!(lead.company_name, "Acme");
        assert_eq!(lead.status, LeadStatus::Warm);
        assert_eq!(lead.estimated_value, Some(Decimal::from(250_000)));
        assert_eq!(lead.tags, vec!["vip"]);
        assert_eq!(lead.created_by, user);
    }

    #[test]
    fn test_contact_draft_requires_name() {
        let draft = ContactDraft::new(new_entity_id(), "");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_contact_draft_rejects_malformed_email() {
        let mut draft = ContactDraft::new(new_entity_id(), "Maria");
        draft.email = Some("not-an-email".to_string());
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::MalformedEmail { .. })
        ));
    }

    #[test]
    fn test_comment_draft_requires_content() {
        let draft = CommentDraft::new(new_entity_id(), "  ");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_is_plausible_email() {
        assert!(is_plausible_email("maria@acme.se"));
        assert!(is_plausible_email("a.b+c@mail.example.com"));
        assert!(!is_plausible_email("maria"));
        assert!(!is_plausible_email("@acme.se"));
        assert!(!is_plausible_email("maria@acme"));
        assert!(!is_plausible_email("maria@.se"));
        assert!(!is_plausible_email("maria smith@acme.se"));
    }

    #[test]
    fn test_status_changed_event_payload() {
        let lead_id = new_entity_id();
        let user = new_entity_id();
        let event = LeadEvent::status_changed(lead_id, LeadStatus::Cold, LeadStatus::Hot, user);

        assert_eq!(event.event_type, LeadEventType::StatusChanged);
        assert_eq!(event.lead_id, lead_id);
        let data = event.data.unwrap();
        assert_eq!(data["from"], "cold");
        assert_eq!(data["to"], "hot");
    }

    #[test]
    fn test_aggregate_primary_contact() {
        let lead = Lead::new("Acme", new_entity_id());
        let lead_id = lead.lead_id;
        let mut aggregate = LeadAggregate::new(lead);
        aggregate.contacts.push(Contact::new(lead_id, "First"));
        aggregate
            .contacts
            .push(Contact::new(lead_id, "Second").as_primary());

        assert_eq!(aggregate.primary_contact().unwrap().name, "Second");
    }

    #[test]
    fn test_aggregate_activity_count() {
        let user = new_entity_id();
        let lead = Lead::new("Acme", user);
        let lead_id = lead.lead_id;
        let mut aggregate = LeadAggregate::new(lead);
        aggregate.comments.push(Comment::new(lead_id, "first", user));
        aggregate
            .events
            .push(LeadEvent::new(lead_id, LeadEventType::Created, "Created", user));

        assert_eq!(aggregate.activity_count(), 2);
    }

    #[test]
    fn test_events_newest_first() {
        let user = new_entity_id();
        let lead = Lead::new("Acme", user);
        let lead_id = lead.lead_id;
        let mut aggregate = LeadAggregate::new(lead);

        let mut older = LeadEvent::new(lead_id, LeadEventType::Created, "Created", user);
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = LeadEvent::new(lead_id, LeadEventType::Updated, "Updated", user);
        aggregate.events.push(older);
        aggregate.events.push(newer);

        let ordered = aggregate.events_newest_first();
        assert_eq!(ordered[0].event_type, LeadEventType::Updated);
    }

    #[test]
    fn test_comments_newest_first() {
        let user = new_entity_id();
        let lead = Lead::new("Acme", user);
        let lead_id = lead.lead_id;
        let mut aggregate = LeadAggregate::new(lead);

        let mut older = Comment::new(lead_id, "older", user);
        older.created_at = Utc::now() - chrono::Duration::hours(2);
        let newer = Comment::new(lead_id, "newer", user);
        aggregate.comments.push(older);
        aggregate.comments.push(newer);

        let ordered = aggregate.comments_newest_first();
        assert_eq!(ordered[0].content, "newer");
        assert_eq!(ordered[1].content, "older");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
