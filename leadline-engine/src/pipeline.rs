//! The command facade: validate, edit optimistically, persist, converge.
//!
//! Every user-visible write follows the same shape: validation first (no
//! partial state on failure), then the optimistic store mutation, then the
//! persistence call, then a full refetch so the view converges even if
//! stream notifications were dropped. Audit events are emitted best-effort
//! and never fail the primary mutation.

use crate::config::EngineConfig;
use crate::query::{self, QueryContext};
use crate::session::SessionProvider;
use crate::storage::LeadStoreBackend;
use crate::store::PipelineStore;
use chrono::Utc;
use leadline_core::entities::is_plausible_email;
use leadline_core::{
    ChangeNotification, ChangeOp, Comment, CommentDraft, CommentType, Contact, ContactDraft,
    EntityId, Lead, LeadAggregate, LeadDraft, LeadEvent, LeadEventType, LeadFilter, LeadPatch,
    LeadPriority, LeadStatus, LeadlineResult, SortSpec, TechnicianAssignment, Timestamp,
    ValidationError,
};
use tracing::warn;

/// Couples the pipeline store with its external collaborators.
///
/// The store stays the single owner of canonical state: stream
/// notifications drain through [`LeadPipeline::apply_change`] and every
/// user action goes through one of the async commands here.
pub struct LeadPipeline<B, S> {
    store: PipelineStore,
    backend: B,
    session: S,
    config: EngineConfig,
}

impl<B, S> LeadPipeline<B, S>
where
    B: LeadStoreBackend,
    S: SessionProvider,
{
    pub fn new(backend: B, session: S, config: EngineConfig) -> LeadlineResult<Self> {
        config.validate()?;
        Ok(Self {
            store: PipelineStore::new(),
            backend,
            session,
            config,
        })
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The visible ordered subset for the given query.
    pub fn query(
        &self,
        filter: &LeadFilter,
        sort: Option<SortSpec>,
        now: Timestamp,
    ) -> Vec<&LeadAggregate> {
        let ctx = QueryContext::for_session(&self.session, now);
        query::apply(self.store.aggregates(), filter, sort, &ctx)
    }

    /// Feed one streamed notification into the merge entry point. The
    /// embedder drains the listener channel into this.
    pub fn apply_change(&mut self, notification: ChangeNotification) {
        self.store.apply_change(notification);
    }

    /// Refetch the full pipeline and replace the held collection. The
    /// self-healing path: invoked after every user-visible write, and safe
    /// to call on an interval.
    pub async fn refresh(&mut self) -> LeadlineResult<()> {
        let aggregates = self.backend.fetch_pipeline().await?;
        self.store.replace_all(aggregates);
        Ok(())
    }

    // ========================================================================
    // LEAD COMMANDS
    // ========================================================================

    /// Create a lead. Creation is not optimistic: the server assigns the
    /// authoritative record, which is merged on return.
    pub async fn create_lead(&mut self, draft: LeadDraft) -> LeadlineResult<Lead> {
        draft.validate()?;
        let user = self.session.current_user();
        let lead = draft.into_lead(user);

        let stored = self.backend.lead_insert(&lead).await?;
        self.store.confirm_local_edit(stored.clone());

        let audit = LeadEvent::new(stored.lead_id, LeadEventType::Created, "Lead created", user);
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(stored)
    }

    /// Edit one field group of a lead: optimistic mutation, persistence,
    /// best-effort audit, refetch.
    ///
    /// On persistence failure the optimistic edit is retained and its field
    /// group stays flagged unconfirmed; surfacing and retry-or-rollback are
    /// the caller's policy (a `refresh` rolls back to the stored state).
    pub async fn update_lead(
        &mut self,
        lead_id: EntityId,
        patch: LeadPatch,
    ) -> LeadlineResult<Lead> {
        validate_patch(&patch)?;
        let user = self.session.current_user();
        let now = Utc::now();

        let audits = self.store.apply_local_edit(lead_id, &patch, now, user)?;

        let stored = match self.backend.lead_update(lead_id, &patch, user).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%lead_id, error = %err, "lead update not persisted; optimistic edit retained");
                return Err(err);
            }
        };
        self.store.confirm_local_edit(stored.clone());

        for audit in audits {
            self.persist_audit(audit).await;
        }

        self.refresh().await?;
        Ok(stored)
    }

    /// Transition the pipeline status. Any state may move to any other;
    /// the transition emits a status-changed audit event.
    pub async fn set_status(
        &mut self,
        lead_id: EntityId,
        status: LeadStatus,
    ) -> LeadlineResult<Lead> {
        self.update_lead(lead_id, LeadPatch::Status(status)).await
    }

    pub async fn set_priority(
        &mut self,
        lead_id: EntityId,
        priority: LeadPriority,
    ) -> LeadlineResult<Lead> {
        self.update_lead(lead_id, LeadPatch::Priority(priority)).await
    }

    /// Replace the tag list. Duplicates are dropped, order preserved; the
    /// diff against the held list becomes tag-added/tag-removed audits.
    pub async fn edit_tags(
        &mut self,
        lead_id: EntityId,
        tags: Vec<String>,
    ) -> LeadlineResult<Lead> {
        self.update_lead(lead_id, LeadPatch::Tags(tags)).await
    }

    /// Delete a lead. The id is tombstoned immediately so any in-flight
    /// result for it is discarded on arrival.
    pub async fn delete_lead(&mut self, lead_id: EntityId) -> LeadlineResult<()> {
        self.store.remove_lead(lead_id);

        if let Err(err) = self.backend.lead_delete(lead_id).await {
            warn!(%lead_id, error = %err, "lead delete not persisted");
            return Err(err);
        }

        self.refresh().await?;
        Ok(())
    }

    // ========================================================================
    // CONTACT COMMANDS
    // ========================================================================

    pub async fn add_contact(&mut self, draft: ContactDraft) -> LeadlineResult<Contact> {
        draft.validate()?;
        let user = self.session.current_user();
        let contact = draft.into_contact();
        let lead_id = contact.lead_id;

        self.store.apply_change(ChangeNotification::ContactUpserted {
            op: ChangeOp::Insert,
            contact: contact.clone(),
        });

        let stored = match self.backend.contact_insert(&contact).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%lead_id, error = %err, "contact insert not persisted; optimistic add retained");
                return Err(err);
            }
        };
        self.store.apply_change(ChangeNotification::ContactUpserted {
            op: ChangeOp::Update,
            contact: stored.clone(),
        });

        let audit = LeadEvent::new(
            lead_id,
            LeadEventType::ContactAdded,
            &format!("Contact added: {}", stored.name),
            user,
        );
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(stored)
    }

    pub async fn update_contact(&mut self, contact: Contact) -> LeadlineResult<Contact> {
        validate_contact(&contact)?;
        let user = self.session.current_user();
        let lead_id = contact.lead_id;

        self.store.apply_change(ChangeNotification::ContactUpserted {
            op: ChangeOp::Update,
            contact: contact.clone(),
        });

        let stored = self.backend.contact_update(&contact).await?;
        self.store.apply_change(ChangeNotification::ContactUpserted {
            op: ChangeOp::Update,
            contact: stored.clone(),
        });

        let audit = LeadEvent::new(
            lead_id,
            LeadEventType::ContactUpdated,
            &format!("Contact updated: {}", stored.name),
            user,
        );
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(stored)
    }

    pub async fn remove_contact(
        &mut self,
        lead_id: EntityId,
        contact_id: EntityId,
    ) -> LeadlineResult<()> {
        let user = self.session.current_user();

        self.store.apply_change(ChangeNotification::ContactDeleted {
            lead_id,
            contact_id,
        });

        self.backend.contact_delete(lead_id, contact_id).await?;

        let audit = LeadEvent::new(lead_id, LeadEventType::ContactRemoved, "Contact removed", user);
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(())
    }

    // ========================================================================
    // COMMENT COMMANDS
    // ========================================================================

    pub async fn add_comment(&mut self, draft: CommentDraft) -> LeadlineResult<Comment> {
        draft.validate()?;
        let user = self.session.current_user();
        let comment = draft.into_comment(user);
        let lead_id = comment.lead_id;

        self.store.apply_change(ChangeNotification::CommentUpserted {
            op: ChangeOp::Insert,
            comment: comment.clone(),
        });

        let stored = match self.backend.comment_insert(&comment).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%lead_id, error = %err, "comment insert not persisted; optimistic add retained");
                return Err(err);
            }
        };
        self.store.apply_change(ChangeNotification::CommentUpserted {
            op: ChangeOp::Update,
            comment: stored.clone(),
        });

        let event_type = if stored.comment_type == CommentType::Note {
            LeadEventType::NoteAdded
        } else {
            LeadEventType::CommentAdded
        };
        let audit = LeadEvent::new(lead_id, event_type, "Comment added", user);
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(stored)
    }

    pub async fn remove_comment(
        &mut self,
        lead_id: EntityId,
        comment_id: EntityId,
    ) -> LeadlineResult<()> {
        self.store.apply_change(ChangeNotification::CommentDeleted {
            lead_id,
            comment_id,
        });

        self.backend.comment_delete(lead_id, comment_id).await?;

        self.refresh().await?;
        Ok(())
    }

    // ========================================================================
    // ASSIGNMENT COMMANDS
    // ========================================================================

    pub async fn assign_technician(
        &mut self,
        lead_id: EntityId,
        technician_id: EntityId,
        primary: bool,
    ) -> LeadlineResult<TechnicianAssignment> {
        let user = self.session.current_user();
        let mut assignment = TechnicianAssignment::new(lead_id, technician_id);
        if primary {
            assignment = assignment.as_primary();
        }

        self.store
            .apply_change(ChangeNotification::AssignmentUpserted {
                op: ChangeOp::Insert,
                assignment: assignment.clone(),
            });

        let stored = self.backend.assignment_insert(&assignment).await?;
        self.store
            .apply_change(ChangeNotification::AssignmentUpserted {
                op: ChangeOp::Update,
                assignment: stored.clone(),
            });

        let audit = LeadEvent::new(
            lead_id,
            LeadEventType::AssignmentAdded,
            "Technician assigned",
            user,
        );
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(stored)
    }

    pub async fn remove_assignment(
        &mut self,
        lead_id: EntityId,
        assignment_id: EntityId,
    ) -> LeadlineResult<()> {
        let user = self.session.current_user();

        self.store
            .apply_change(ChangeNotification::AssignmentDeleted {
                lead_id,
                assignment_id,
            });

        self.backend.assignment_delete(lead_id, assignment_id).await?;

        let audit = LeadEvent::new(
            lead_id,
            LeadEventType::AssignmentRemoved,
            "Technician unassigned",
            user,
        );
        self.persist_audit(audit).await;

        self.refresh().await?;
        Ok(())
    }

    // ========================================================================
    // AUDIT EMISSION
    // ========================================================================

    /// Append an audit event locally and persist it best-effort. A failed
    /// audit write never fails, retries, or queues: it is logged and
    /// dropped, and the primary mutation stands.
    async fn persist_audit(&mut self, event: LeadEvent) {
        self.store.apply_change(ChangeNotification::EventUpserted {
            op: ChangeOp::Insert,
            event: event.clone(),
        });
        match self.backend.event_insert(&event).await {
            Ok(stored) => {
                self.store.apply_change(ChangeNotification::EventUpserted {
                    op: ChangeOp::Update,
                    event: stored,
                });
            }
            Err(err) => {
                warn!(
                    lead_id = %event.lead_id,
                    event_type = %event.event_type,
                    error = %err,
                    "audit event not persisted"
                );
            }
        }
    }
}

fn validate_patch(patch: &LeadPatch) -> Result<(), ValidationError> {
    if let LeadPatch::Core(core) = patch {
        if core.company_name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "company_name".to_string(),
            });
        }
        if let Some(email) = &core.email {
            if !is_plausible_email(email) {
                return Err(ValidationError::MalformedEmail {
                    value: email.clone(),
                });
            }
        }
        if let Some(probability) = core.probability {
            if probability > 100 {
                return Err(ValidationError::InvalidValue {
                    field: "probability".to_string(),
                    reason: format!("must be 0-100, got {}", probability),
                });
            }
        }
        if let Some(value) = core.estimated_value {
            if value.is_sign_negative() {
                return Err(ValidationError::InvalidValue {
                    field: "estimated_value".to_string(),
                    reason: "must not be negative".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_contact(contact: &Contact) -> Result<(), ValidationError> {
    if contact.name.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    if let Some(email) = &contact.email {
        if !is_plausible_email(email) {
            return Err(ValidationError::MalformedEmail {
                value: email.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
