//! Record merge/reconciliation.
//!
//! Five independently-ordered channels plus local optimistic edits all feed
//! one lead collection. Ordering by monotonic timestamp, not by arrival
//! order, is the core correctness decision here: a late-arriving stale
//! broadcast must never clobber a newer optimistic edit.
//!
//! Merges are synchronous and total. Last-writer-wins by timestamp is the
//! single conflict policy; no merge can fail.

use leadline_core::{
    Comment, Contact, EntityId, FieldGroup, Lead, LeadAggregate, LeadEvent, LeadEventType,
    LeadPatch, TechnicianAssignment, Timestamp,
};
use std::collections::HashSet;
use tracing::debug;

/// Conflict-ordering timestamp per field group of one lead.
///
/// Seeded from the record's `updated_at` on insert; advanced whenever a
/// group is overwritten. An incoming value applies only when its stamp is
/// not older than the group's held stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStamps {
    core: Timestamp,
    status: Timestamp,
    priority: Timestamp,
    tags: Timestamp,
}

impl GroupStamps {
    fn seed(at: Timestamp) -> Self {
        Self {
            core: at,
            status: at,
            priority: at,
            tags: at,
        }
    }

    fn get(&self, group: FieldGroup) -> Timestamp {
        match group {
            FieldGroup::Core => self.core,
            FieldGroup::Status => self.status,
            FieldGroup::Priority => self.priority,
            FieldGroup::Tags => self.tags,
        }
    }

    fn set(&mut self, group: FieldGroup, at: Timestamp) {
        match group {
            FieldGroup::Core => self.core = at,
            FieldGroup::Status => self.status = at,
            FieldGroup::Priority => self.priority = at,
            FieldGroup::Tags => self.tags = at,
        }
    }
}

/// A lead aggregate held by the pipeline store, together with the merge
/// bookkeeping the reconciler needs: per-group conflict stamps and the set
/// of groups carrying an unconfirmed optimistic edit.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldLead {
    aggregate: LeadAggregate,
    stamps: GroupStamps,
    dirty: HashSet<FieldGroup>,
}

impl HeldLead {
    pub fn new(aggregate: LeadAggregate) -> Self {
        let stamps = GroupStamps::seed(aggregate.lead.updated_at);
        Self {
            aggregate,
            stamps,
            dirty: HashSet::new(),
        }
    }

    pub fn aggregate(&self) -> &LeadAggregate {
        &self.aggregate
    }

    pub fn lead(&self) -> &Lead {
        &self.aggregate.lead
    }

    pub fn lead_id(&self) -> EntityId {
        self.aggregate.lead.lead_id
    }

    /// Whether any field group carries an unconfirmed optimistic edit.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Groups carrying an unconfirmed optimistic edit.
    pub fn dirty_groups(&self) -> Vec<FieldGroup> {
        FieldGroup::all()
            .into_iter()
            .filter(|g| self.dirty.contains(g))
            .collect()
    }

    // ========================================================================
    // OPTIMISTIC EDITS
    // ========================================================================

    /// Apply a local edit: mutate the patch's field group immediately, stamp
    /// it with the local clock, and mark it dirty until the authoritative
    /// response (or a refetch) arrives.
    ///
    /// Returns the audit events the edit warrants; the caller persists them
    /// best-effort and has already had them appended to the timeline here.
    pub fn apply_local_patch(
        &mut self,
        patch: &LeadPatch,
        now: Timestamp,
        user: EntityId,
    ) -> Vec<LeadEvent> {
        let audits = self.audit_events_for(patch, user);
        self.aggregate.lead.apply_patch(patch, now, user);
        let group = patch.group();
        self.stamps.set(group, now);
        self.dirty.insert(group);
        for event in &audits {
            upsert_event(&mut self.aggregate.events, event.clone());
        }
        audits
    }

    fn audit_events_for(&self, patch: &LeadPatch, user: EntityId) -> Vec<LeadEvent> {
        let lead = &self.aggregate.lead;
        match patch {
            LeadPatch::Status(new) if *new != lead.status => {
                vec![LeadEvent::status_changed(lead.lead_id, lead.status, *new, user)]
            }
            LeadPatch::Status(_) => Vec::new(),
            LeadPatch::Tags(new_tags) => {
                let mut events = Vec::new();
                let mut seen: Vec<&str> = Vec::new();
                for tag in new_tags {
                    if lead.tags.iter().any(|t| t == tag) || seen.contains(&tag.as_str()) {
                        continue;
                    }
                    seen.push(tag);
                    events.push(LeadEvent::new(
                        lead.lead_id,
                        LeadEventType::TagAdded,
                        &format!("Tag added: {}", tag),
                        user,
                    ));
                }
                for tag in &lead.tags {
                    if !new_tags.iter().any(|t| t == tag) {
                        events.push(
                            LeadEvent::new(
                                lead.lead_id,
                                LeadEventType::TagRemoved,
                                &format!("Tag removed: {}", tag),
                                user,
                            ),
                        );
                    }
                }
                events
            }
            LeadPatch::Core(core) => {
                let mut events = vec![LeadEvent::new(
                    lead.lead_id,
                    LeadEventType::Updated,
                    "Lead updated",
                    user,
                )];
                if core.follow_up_date.is_some() && core.follow_up_date != lead.follow_up_date {
                    events.push(LeadEvent::new(
                        lead.lead_id,
                        LeadEventType::FollowUpScheduled,
                        "Follow-up scheduled",
                        user,
                    ));
                }
                events
            }
            LeadPatch::Priority(_) => {
                vec![LeadEvent::new(
                    lead.lead_id,
                    LeadEventType::Updated,
                    "Lead updated",
                    user,
                )]
            }
        }
    }

    /// Confirm an optimistic edit from the authoritative persistence
    /// response. Same timestamp rules as a streamed merge; groups the
    /// response overwrites stop being dirty.
    pub fn confirm(&mut self, authoritative: Lead) -> bool {
        self.merge_remote_lead(authoritative)
    }

    // ========================================================================
    // STREAMED MERGES
    // ========================================================================

    /// Merge an incoming full lead record, group by group. A group is
    /// overwritten only when the incoming `updated_at` is not older than the
    /// group's held stamp; stale groups are left untouched (and stay dirty
    /// if they were).
    ///
    /// Returns true when at least one group was applied.
    pub fn merge_remote_lead(&mut self, incoming: Lead) -> bool {
        let mut applied_any = false;
        for group in FieldGroup::all() {
            if incoming.updated_at < self.stamps.get(group) {
                debug!(
                    lead_id = %incoming.lead_id,
                    group = ?group,
                    "discarding stale merge for field group"
                );
                continue;
            }
            self.apply_group(group, &incoming);
            self.stamps.set(group, incoming.updated_at);
            self.dirty.remove(&group);
            applied_any = true;
        }
        if applied_any {
            let lead = &mut self.aggregate.lead;
            if incoming.updated_at >= lead.updated_at {
                lead.updated_at = incoming.updated_at;
                lead.updated_by = incoming.updated_by;
            }
        }
        applied_any
    }

    fn apply_group(&mut self, group: FieldGroup, incoming: &Lead) {
        let lead = &mut self.aggregate.lead;
        match group {
            FieldGroup::Core => {
                lead.company_name = incoming.company_name.clone();
                lead.contact_person = incoming.contact_person.clone();
                lead.email = incoming.email.clone();
                lead.phone = incoming.phone.clone();
                lead.org_number = incoming.org_number.clone();
                lead.company_size = incoming.company_size;
                lead.contact_method = incoming.contact_method;
                lead.source = incoming.source.clone();
                lead.budget_confirmed = incoming.budget_confirmed;
                lead.authority_confirmed = incoming.authority_confirmed;
                lead.needs_confirmed = incoming.needs_confirmed;
                lead.timeline_confirmed = incoming.timeline_confirmed;
                lead.estimated_value = incoming.estimated_value;
                lead.probability = incoming.probability;
                lead.closing_date_estimate = incoming.closing_date_estimate;
                lead.follow_up_date = incoming.follow_up_date;
                lead.assigned_to = incoming.assigned_to;
                lead.notes = incoming.notes.clone();
            }
            FieldGroup::Status => lead.status = incoming.status,
            FieldGroup::Priority => lead.priority = incoming.priority,
            FieldGroup::Tags => {
                lead.tags.clear();
                for tag in &incoming.tags {
                    if !lead.tags.iter().any(|t| t == tag) {
                        lead.tags.push(tag.clone());
                    }
                }
            }
        }
    }

    /// Upsert a contact by id, last-writer-wins on `updated_at`. An
    /// incoming primary demotes any other primary so at most one remains.
    pub fn merge_contact(&mut self, incoming: Contact) -> bool {
        if let Some(existing) = self
            .aggregate
            .contacts
            .iter_mut()
            .find(|c| c.contact_id == incoming.contact_id)
        {
            if incoming.updated_at < existing.updated_at {
                debug!(contact_id = %incoming.contact_id, "discarding stale contact merge");
                return false;
            }
            *existing = incoming.clone();
        } else {
            self.aggregate.contacts.push(incoming.clone());
        }
        if incoming.is_primary {
            for contact in &mut self.aggregate.contacts {
                if contact.contact_id != incoming.contact_id {
                    contact.is_primary = false;
                }
            }
        }
        true
    }

    pub fn remove_contact(&mut self, contact_id: EntityId) -> bool {
        let before = self.aggregate.contacts.len();
        self.aggregate.contacts.retain(|c| c.contact_id != contact_id);
        self.aggregate.contacts.len() != before
    }

    /// Upsert a comment by id, last-writer-wins on `updated_at`.
    pub fn merge_comment(&mut self, incoming: Comment) -> bool {
        if let Some(existing) = self
            .aggregate
            .comments
            .iter_mut()
            .find(|c| c.comment_id == incoming.comment_id)
        {
            if incoming.updated_at < existing.updated_at {
                debug!(comment_id = %incoming.comment_id, "discarding stale comment merge");
                return false;
            }
            *existing = incoming;
        } else {
            self.aggregate.comments.push(incoming);
        }
        true
    }

    pub fn remove_comment(&mut self, comment_id: EntityId) -> bool {
        let before = self.aggregate.comments.len();
        self.aggregate.comments.retain(|c| c.comment_id != comment_id);
        self.aggregate.comments.len() != before
    }

    /// Upsert a timeline event by id. Events are append-mostly; redelivery
    /// of a known id replaces it in place, so at-least-once delivery never
    /// duplicates the timeline.
    pub fn merge_event(&mut self, incoming: LeadEvent) -> bool {
        upsert_event(&mut self.aggregate.events, incoming)
    }

    pub fn remove_event(&mut self, event_id: EntityId) -> bool {
        let before = self.aggregate.events.len();
        self.aggregate.events.retain(|e| e.event_id != event_id);
        self.aggregate.events.len() != before
    }

    /// Upsert an assignment by id, last-writer-wins on `assigned_at`. An
    /// incoming primary demotes any other primary.
    pub fn merge_assignment(&mut self, incoming: TechnicianAssignment) -> bool {
        if let Some(existing) = self
            .aggregate
            .assignments
            .iter_mut()
            .find(|a| a.assignment_id == incoming.assignment_id)
        {
            if incoming.assigned_at < existing.assigned_at {
                debug!(assignment_id = %incoming.assignment_id, "discarding stale assignment merge");
                return false;
            }
            *existing = incoming.clone();
        } else {
            self.aggregate.assignments.push(incoming.clone());
        }
        if incoming.is_primary {
            for assignment in &mut self.aggregate.assignments {
                if assignment.assignment_id != incoming.assignment_id {
                    assignment.is_primary = false;
                }
            }
        }
        true
    }

    pub fn remove_assignment(&mut self, assignment_id: EntityId) -> bool {
        let before = self.aggregate.assignments.len();
        self.aggregate
            .assignments
            .retain(|a| a.assignment_id != assignment_id);
        self.aggregate.assignments.len() != before
    }
}

fn upsert_event(events: &mut Vec<LeadEvent>, incoming: LeadEvent) -> bool {
    if let Some(existing) = events.iter_mut().find(|e| e.event_id == incoming.event_id) {
        *existing = incoming;
    } else {
        events.push(incoming);
    }
    true
}

// ============================================================================
// TESTS
// ============================================================================
