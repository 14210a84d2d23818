//! The pipeline store - single owner of the canonical lead collection.
//!
//! All five change-stream listeners and every optimistic-edit call site go
//! through this store, so there is exactly one code path that can change
//! canonical state. The filter/sort pipeline and the scoring function only
//! read it.

use crate::merge::HeldLead;
use crate::score;
use leadline_core::{
    ChangeNotification, EntityId, EntityKind, FieldGroup, Lead, LeadAggregate, LeadEvent,
    LeadPatch, StoreError, Timestamp,
};
use std::collections::HashSet;
use tracing::debug;

/// Canonical in-memory lead collection plus the reconciliation bookkeeping:
/// per-group conflict stamps, dirty (unconfirmed-edit) groups, and a
/// tombstone set preventing deleted leads from being resurrected by late
/// notifications.
#[derive(Debug, Clone, Default)]
pub struct PipelineStore {
    leads: Vec<HeldLead>,
    tombstones: HashSet<EntityId>,
}

impl PipelineStore {
    pub fn new() -> Self {
        Self {
            leads: Vec::new(),
            tombstones: HashSet::new(),
        }
    }

    // ========================================================================
    // READ ACCESS
    // ========================================================================

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// All held aggregates in insertion order.
    pub fn aggregates(&self) -> impl Iterator<Item = &LeadAggregate> {
        self.leads.iter().map(|h| h.aggregate())
    }

    pub fn get(&self, lead_id: EntityId) -> Option<&LeadAggregate> {
        self.leads
            .iter()
            .find(|h| h.lead_id() == lead_id)
            .map(|h| h.aggregate())
    }

    /// Derived score for a held lead, recomputed from current attributes.
    pub fn score_of(&self, lead_id: EntityId, now: Timestamp) -> Option<u8> {
        self.get(lead_id).map(|a| score::score_aggregate(a, now))
    }

    /// Field groups of a lead carrying an unconfirmed optimistic edit.
    pub fn dirty_groups(&self, lead_id: EntityId) -> Vec<FieldGroup> {
        self.leads
            .iter()
            .find(|h| h.lead_id() == lead_id)
            .map(|h| h.dirty_groups())
            .unwrap_or_default()
    }

    /// Whether a lead id has been deleted and must not be resurrected by a
    /// late notification or persistence result.
    pub fn is_tombstoned(&self, lead_id: EntityId) -> bool {
        self.tombstones.contains(&lead_id)
    }

    // ========================================================================
    // OPTIMISTIC LOCAL EDITS
    // ========================================================================

    /// Apply a local edit immediately, stamping the patch's field group
    /// with the local clock and marking it dirty until confirmed. Returns
    /// the audit events the edit warrants (already appended to the local
    /// timeline; the caller persists them best-effort).
    pub fn apply_local_edit(
        &mut self,
        lead_id: EntityId,
        patch: &LeadPatch,
        now: Timestamp,
        user: EntityId,
    ) -> Result<Vec<LeadEvent>, StoreError> {
        let held = self
            .leads
            .iter_mut()
            .find(|h| h.lead_id() == lead_id)
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Lead,
                id: lead_id,
            })?;
        Ok(held.apply_local_patch(patch, now, user))
    }

    /// Merge the authoritative record returned by a persistence call.
    /// Discarded when the lead was deleted while the call was in flight.
    pub fn confirm_local_edit(&mut self, authoritative: Lead) {
        self.merge_lead_upsert(authoritative);
    }

    /// Remove a lead locally (user delete) and tombstone the id so an
    /// in-flight result for it is discarded on arrival.
    pub fn remove_lead(&mut self, lead_id: EntityId) -> bool {
        let before = self.leads.len();
        self.leads.retain(|h| h.lead_id() != lead_id);
        self.tombstones.insert(lead_id);
        self.leads.len() != before
    }

    // ========================================================================
    // FULL REFETCH REPLACE
    // ========================================================================

    /// Replace the held collection wholesale with a freshly fetched one.
    ///
    /// This is the self-healing convergence path invoked after every
    /// user-visible write: dropped or reordered stream notifications cannot
    /// prevent eventual consistency. Dirty flags are cleared. A tombstone
    /// is cleared only when the fetched list contains its id (the store
    /// says the lead is alive after all); absent ids keep their tombstone
    /// so a late broadcast still cannot resurrect a deleted lead.
    pub fn replace_all(&mut self, aggregates: Vec<LeadAggregate>) {
        self.tombstones
            .retain(|id| !aggregates.iter().any(|a| a.lead.lead_id == *id));
        self.leads = aggregates.into_iter().map(HeldLead::new).collect();
    }

    // ========================================================================
    // STREAMED MERGES
    // ========================================================================

    /// Merge a single-entity notification from one of the five channels.
    ///
    /// Synchronous and total: conflicts resolve deterministically by
    /// timestamp and can never fail. Notifications for tombstoned or
    /// unknown leads are discarded (the next refetch heals any gap).
    pub fn apply_change(&mut self, notification: ChangeNotification) {
        match notification {
            ChangeNotification::LeadUpserted { lead, .. } => {
                self.merge_lead_upsert(lead);
            }
            ChangeNotification::LeadDeleted { lead_id } => {
                self.remove_lead(lead_id);
            }
            ChangeNotification::ContactUpserted { contact, .. } => {
                if let Some(held) = self.held_mut(contact.lead_id) {
                    held.merge_contact(contact);
                }
            }
            ChangeNotification::ContactDeleted {
                lead_id,
                contact_id,
            } => {
                if let Some(held) = self.held_mut(lead_id) {
                    held.remove_contact(contact_id);
                }
            }
            ChangeNotification::CommentUpserted { comment, .. } => {
                if let Some(held) = self.held_mut(comment.lead_id) {
                    held.merge_comment(comment);
                }
            }
            ChangeNotification::CommentDeleted {
                lead_id,
                comment_id,
            } => {
                if let Some(held) = self.held_mut(lead_id) {
                    held.remove_comment(comment_id);
                }
            }
            ChangeNotification::EventUpserted { event, .. } => {
                if let Some(held) = self.held_mut(event.lead_id) {
                    held.merge_event(event);
                }
            }
            ChangeNotification::EventDeleted { lead_id, event_id } => {
                if let Some(held) = self.held_mut(lead_id) {
                    held.remove_event(event_id);
                }
            }
            ChangeNotification::AssignmentUpserted { assignment, .. } => {
                if let Some(held) = self.held_mut(assignment.lead_id) {
                    held.merge_assignment(assignment);
                }
            }
            ChangeNotification::AssignmentDeleted {
                lead_id,
                assignment_id,
            } => {
                if let Some(held) = self.held_mut(lead_id) {
                    held.remove_assignment(assignment_id);
                }
            }
        }
    }

    fn merge_lead_upsert(&mut self, lead: Lead) {
        if self.tombstones.contains(&lead.lead_id) {
            debug!(lead_id = %lead.lead_id, "discarding notification for deleted lead");
            return;
        }
        match self.leads.iter_mut().find(|h| h.lead_id() == lead.lead_id) {
            Some(held) => {
                held.merge_remote_lead(lead);
            }
            None => {
                self.leads.push(HeldLead::new(LeadAggregate::new(lead)));
            }
        }
    }

    fn held_mut(&mut self, lead_id: EntityId) -> Option<&mut HeldLead> {
        if self.tombstones.contains(&lead_id) {
            debug!(lead_id = %lead_id, "discarding child notification for deleted lead");
            return None;
        }
        let held = self.leads.iter_mut().find(|h| h.lead_id() == lead_id);
        if held.is_none() {
            debug!(lead_id = %lead_id, "child notification for unknown lead; awaiting refetch");
        }
        held
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use leadline_core::{new_entity_id, ChangeOp, Comment, Contact, LeadPriority, LeadStatus};

    fn store_with_lead(company: &str) -> (PipelineStore, EntityId) {
        let mut store = PipelineStore::new();
        let lead = Lead::new(company, new_entity_id());
        let id = lead.lead_id;
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Insert,
            lead,
        });
        (store, id)
    }

    #[test]
    fn test_insert_unknown_lead() {
        let (store, id) = store_with_lead("Acme");
        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = PipelineStore::new();
        let lead = Lead::new("Acme", new_entity_id());
        let notification = ChangeNotification::LeadUpserted {
            op: ChangeOp::Insert,
            lead,
        };
        store.apply_change(notification.clone());
        store.apply_change(notification);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_then_stale_update_does_not_recreate() {
        let (mut store, id) = store_with_lead("Acme");
        let lead = store.get(id).unwrap().lead.clone();

        store.apply_change(ChangeNotification::LeadDeleted { lead_id: id });
        assert!(store.is_empty());

        // Late update for the deleted id arrives afterwards.
        let mut late = lead;
        late.updated_at = late.updated_at + Duration::seconds(30);
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Update,
            lead: late,
        });

        assert!(store.is_empty());
        assert!(store.is_tombstoned(id));
    }

    #[test]
    fn test_local_delete_discards_inflight_confirmation() {
        let (mut store, id) = store_with_lead("Acme");
        let mut inflight = store.get(id).unwrap().lead.clone();
        inflight.updated_at = inflight.updated_at + Duration::seconds(5);

        store.remove_lead(id);
        store.confirm_local_edit(inflight);

        assert!(store.is_empty());
    }

    #[test]
    fn test_optimistic_edit_marks_group_dirty() {
        let (mut store, id) = store_with_lead("Acme");
        let user = new_entity_id();

        store
            .apply_local_edit(id, &LeadPatch::Priority(LeadPriority::Urgent), Utc::now(), user)
            .unwrap();

        assert_eq!(store.dirty_groups(id), vec![FieldGroup::Priority]);
    }

    #[test]
    fn test_optimistic_edit_unknown_lead_is_not_found() {
        let mut store = PipelineStore::new();
        let result = store.apply_local_edit(
            new_entity_id(),
            &LeadPatch::Status(LeadStatus::Hot),
            Utc::now(),
            new_entity_id(),
        );
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_replace_all_clears_dirty() {
        let (mut store, id) = store_with_lead("Acme");
        let user = new_entity_id();
        store
            .apply_local_edit(id, &LeadPatch::Status(LeadStatus::Hot), Utc::now(), user)
            .unwrap();

        let fresh = vec![LeadAggregate::new(Lead::new("Fresh AB", user))];
        store.replace_all(fresh);

        assert_eq!(store.len(), 1);
        let fresh_id = store.aggregates().next().unwrap().lead.lead_id;
        assert!(store.dirty_groups(fresh_id).is_empty());
    }

    #[test]
    fn test_refetch_keeps_tombstone_for_absent_lead() {
        // Deleted lead, refetch without it, then a late broadcast: the
        // tombstone must survive the refetch and block resurrection.
        let (mut store, id) = store_with_lead("Acme");
        let lead = store.get(id).unwrap().lead.clone();
        store.remove_lead(id);

        store.replace_all(Vec::new());
        assert!(store.is_tombstoned(id));

        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Update,
            lead,
        });
        assert!(store.is_empty());
    }

    #[test]
    fn test_refetch_revives_lead_the_store_still_has() {
        // A local delete that never persisted: the refetch returns the
        // lead, which clears its tombstone and restores it.
        let (mut store, id) = store_with_lead("Acme");
        let aggregate = store.get(id).unwrap().clone();
        store.remove_lead(id);

        store.replace_all(vec![aggregate]);

        assert!(!store.is_tombstoned(id));
        assert!(store.get(id).is_some());
    }

    #[test]
    fn test_child_for_unknown_lead_is_dropped() {
        let mut store = PipelineStore::new();
        let contact = Contact::new(new_entity_id(), "Maria");
        store.apply_change(ChangeNotification::ContactUpserted {
            op: ChangeOp::Insert,
            contact,
        });
        assert!(store.is_empty());
    }

    #[test]
    fn test_child_merge_lands_on_aggregate() {
        let (mut store, id) = store_with_lead("Acme");
        let comment = Comment::new(id, "called them", new_entity_id());

        store.apply_change(ChangeNotification::CommentUpserted {
            op: ChangeOp::Insert,
            comment,
        });

        assert_eq!(store.get(id).unwrap().comments.len(), 1);
    }

    #[test]
    fn test_child_for_tombstoned_lead_is_dropped() {
        let (mut store, id) = store_with_lead("Acme");
        store.apply_change(ChangeNotification::LeadDeleted { lead_id: id });

        store.apply_change(ChangeNotification::CommentUpserted {
            op: ChangeOp::Insert,
            comment: Comment::new(id, "late", new_entity_id()),
        });

        assert!(store.is_empty());
    }

    #[test]
    fn test_score_of_recomputes_after_merge() {
        let (mut store, id) = store_with_lead("Acme");
        let now = store.get(id).unwrap().lead.updated_at;
        let before = store.score_of(id, now).unwrap();

        let mut qualified = store.get(id).unwrap().lead.clone();
        qualified.budget_confirmed = true;
        qualified.updated_at = qualified.updated_at + Duration::seconds(1);
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Update,
            lead: qualified,
        });

        let after = store.score_of(id, now).unwrap();
        assert!(after > before, "score must reflect merged attributes");
    }
}
