//! In-memory reference implementation of the persistence boundary.
//!
//! Backs tests and offline embedding. Emulates the hosted store's relevant
//! behavior: every write returns the resulting record with a fresh
//! monotonic `updated_at`, deletes cascade to children, and the primary
//! flag is unique per lead.

use crate::storage::LeadStoreBackend;
use ::async_trait::async_trait;
use chrono::Utc;
use leadline_core::{
    Comment, Contact, EntityId, EntityKind, Lead, LeadAggregate, LeadEvent, LeadPatch,
    LeadlineResult, StoreError, TechnicianAssignment,
};
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded lead list acting as the persistent store.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<Vec<LeadAggregate>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Vec::new()),
        }
    }

    /// Seed the backend with an existing pipeline.
    pub fn with_pipeline(aggregates: Vec<LeadAggregate>) -> Self {
        Self {
            state: Mutex::new(aggregates),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LeadAggregate>>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Unavailable {
            reason: "state lock poisoned".to_string(),
        })
    }
}

fn find_aggregate<'a>(
    state: &'a mut [LeadAggregate],
    lead_id: EntityId,
) -> Result<&'a mut LeadAggregate, StoreError> {
    state
        .iter_mut()
        .find(|a| a.lead.lead_id == lead_id)
        .ok_or(StoreError::NotFound {
            kind: EntityKind::Lead,
            id: lead_id,
        })
}

#[async_trait]
impl LeadStoreBackend for InMemoryBackend {
    async fn fetch_pipeline(&self) -> LeadlineResult<Vec<LeadAggregate>> {
        Ok(self.lock()?.clone())
    }

    async fn lead_insert(&self, lead: &Lead) -> LeadlineResult<Lead> {
        let mut state = self.lock()?;
        if state.iter().any(|a| a.lead.lead_id == lead.lead_id) {
            return Err(StoreError::InsertFailed {
                kind: EntityKind::Lead,
                reason: "duplicate id".to_string(),
            }
            .into());
        }
        let mut stored = lead.clone();
        stored.updated_at = Utc::now();
        state.push(LeadAggregate::new(stored.clone()));
        Ok(stored)
    }

    async fn lead_update(
        &self,
        lead_id: EntityId,
        patch: &LeadPatch,
        updated_by: EntityId,
    ) -> LeadlineResult<Lead> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, lead_id)?;
        aggregate.lead.apply_patch(patch, Utc::now(), updated_by);
        Ok(aggregate.lead.clone())
    }

    async fn lead_delete(&self, lead_id: EntityId) -> LeadlineResult<()> {
        let mut state = self.lock()?;
        let before = state.len();
        state.retain(|a| a.lead.lead_id != lead_id);
        if state.len() == before {
            return Err(StoreError::NotFound {
                kind: EntityKind::Lead,
                id: lead_id,
            }
            .into());
        }
        Ok(())
    }

    async fn contact_insert(&self, contact: &Contact) -> LeadlineResult<Contact> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, contact.lead_id)?;
        let mut stored = contact.clone();
        stored.updated_at = Utc::now();
        if stored.is_primary {
            for existing in &mut aggregate.contacts {
                existing.is_primary = false;
            }
        }
        aggregate.contacts.push(stored.clone());
        Ok(stored)
    }

    async fn contact_update(&self, contact: &Contact) -> LeadlineResult<Contact> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, contact.lead_id)?;
        let mut stored = contact.clone();
        stored.updated_at = Utc::now();
        if stored.is_primary {
            for existing in &mut aggregate.contacts {
                existing.is_primary = false;
            }
        }
        match aggregate
            .contacts
            .iter_mut()
            .find(|c| c.contact_id == contact.contact_id)
        {
            Some(existing) => {
                *existing = stored.clone();
                Ok(stored)
            }
            None => Err(StoreError::NotFound {
                kind: EntityKind::Contact,
                id: contact.contact_id,
            }
            .into()),
        }
    }

    async fn contact_delete(&self, lead_id: EntityId, contact_id: EntityId) -> LeadlineResult<()> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, lead_id)?;
        aggregate.contacts.retain(|c| c.contact_id != contact_id);
        Ok(())
    }

    async fn comment_insert(&self, comment: &Comment) -> LeadlineResult<Comment> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, comment.lead_id)?;
        let mut stored = comment.clone();
        stored.updated_at = Utc::now();
        aggregate.comments.push(stored.clone());
        Ok(stored)
    }

    async fn comment_update(&self, comment: &Comment) -> LeadlineResult<Comment> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, comment.lead_id)?;
        let mut stored = comment.clone();
        stored.updated_at = Utc::now();
        match aggregate
            .comments
            .iter_mut()
            .find(|c| c.comment_id == comment.comment_id)
        {
            Some(existing) => {
                *existing = stored.clone();
                Ok(stored)
            }
            None => Err(StoreError::NotFound {
                kind: EntityKind::Comment,
                id: comment.comment_id,
            }
            .into()),
        }
    }

    async fn comment_delete(&self, lead_id: EntityId, comment_id: EntityId) -> LeadlineResult<()> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, lead_id)?;
        aggregate.comments.retain(|c| c.comment_id != comment_id);
        Ok(())
    }

    async fn event_insert(&self, event: &LeadEvent) -> LeadlineResult<LeadEvent> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, event.lead_id)?;
        if !aggregate.events.iter().any(|e| e.event_id == event.event_id) {
            aggregate.events.push(event.clone());
        }
        Ok(event.clone())
    }

    async fn assignment_insert(
        &self,
        assignment: &TechnicianAssignment,
    ) -> LeadlineResult<TechnicianAssignment> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, assignment.lead_id)?;
        let mut stored = assignment.clone();
        stored.assigned_at = Utc::now();
        if stored.is_primary {
            for existing in &mut aggregate.assignments {
                existing.is_primary = false;
            }
        }
        aggregate.assignments.push(stored.clone());
        Ok(stored)
    }

    async fn assignment_delete(
        &self,
        lead_id: EntityId,
        assignment_id: EntityId,
    ) -> LeadlineResult<()> {
        let mut state = self.lock()?;
        let aggregate = find_aggregate(&mut state, lead_id)?;
        aggregate
            .assignments
            .retain(|a| a.assignment_id != assignment_id);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
