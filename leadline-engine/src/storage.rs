//! Async persistence boundary.
//!
//! The persistent store is an external collaborator. Every write returns
//! the resulting record so the caller can reconcile its optimistic state
//! against the authority; `fetch_pipeline` feeds the full-refetch-replace
//! convergence path. Each call is an independent suspension point with no
//! ordering dependency on any other in-flight call.

use ::async_trait::async_trait;
use leadline_core::{
    Comment, Contact, EntityId, Lead, LeadAggregate, LeadEvent, LeadPatch, LeadlineResult,
    TechnicianAssignment,
};

/// Async storage trait for lead pipeline persistence.
///
/// Implementations wrap the hosted data store. They must tolerate retries:
/// the engine may re-issue a call after a transient failure.
#[async_trait]
pub trait LeadStoreBackend: Send + Sync {
    // ========================================================================
    // PIPELINE FETCH
    // ========================================================================

    /// Fetch the full lead list with children, for wholesale replacement of
    /// the held collection. Server-side filtering is not required; the
    /// engine filters in memory.
    async fn fetch_pipeline(&self) -> LeadlineResult<Vec<LeadAggregate>>;

    // ========================================================================
    // LEAD OPERATIONS
    // ========================================================================

    /// Insert a new lead. Returns the stored record.
    async fn lead_insert(&self, lead: &Lead) -> LeadlineResult<Lead>;

    /// Apply a partial update to one field group of a lead. Returns the
    /// stored record carrying the server-assigned `updated_at`.
    async fn lead_update(
        &self,
        lead_id: EntityId,
        patch: &LeadPatch,
        updated_by: EntityId,
    ) -> LeadlineResult<Lead>;

    /// Delete a lead. The store cascades to its children.
    async fn lead_delete(&self, lead_id: EntityId) -> LeadlineResult<()>;

    // ========================================================================
    // CONTACT OPERATIONS
    // ========================================================================

    /// Insert a new contact. Returns the stored record.
    async fn contact_insert(&self, contact: &Contact) -> LeadlineResult<Contact>;

    /// Update a contact. Returns the stored record.
    async fn contact_update(&self, contact: &Contact) -> LeadlineResult<Contact>;

    /// Delete a contact.
    async fn contact_delete(&self, lead_id: EntityId, contact_id: EntityId) -> LeadlineResult<()>;

    // ========================================================================
    // COMMENT OPERATIONS
    // ========================================================================

    /// Insert a new comment. Returns the stored record.
    async fn comment_insert(&self, comment: &Comment) -> LeadlineResult<Comment>;

    /// Update a comment. Returns the stored record.
    async fn comment_update(&self, comment: &Comment) -> LeadlineResult<Comment>;

    /// Delete a comment.
    async fn comment_delete(&self, lead_id: EntityId, comment_id: EntityId) -> LeadlineResult<()>;

    // ========================================================================
    // EVENT OPERATIONS
    // ========================================================================

    /// Append a timeline event. Returns the stored record. Callers treat
    /// audit appends as best-effort: a failure here never fails the
    /// mutation that produced the event.
    async fn event_insert(&self, event: &LeadEvent) -> LeadlineResult<LeadEvent>;

    // ========================================================================
    // ASSIGNMENT OPERATIONS
    // ========================================================================

    /// Insert a technician assignment. Returns the stored record.
    async fn assignment_insert(
        &self,
        assignment: &TechnicianAssignment,
    ) -> LeadlineResult<TechnicianAssignment>;

    /// Delete a technician assignment.
    async fn assignment_delete(
        &self,
        lead_id: EntityId,
        assignment_id: EntityId,
    ) -> LeadlineResult<()>;
}
