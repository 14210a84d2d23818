//! Change-notification types delivered by the five live-update channels.
//!
//! Each channel is an independent at-least-once subscription with no
//! ordering guarantee relative to the others. Every notification funnels
//! into the single reconciler entry point keyed by (entity kind, id).

use crate::{Comment, Contact, EntityId, Lead, LeadEvent, TechnicianAssignment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// The five independent live-update channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamChannel {
    Leads,
    Contacts,
    Comments,
    Events,
    Assignments,
}

impl StreamChannel {
    /// All channels, in subscription order.
    pub fn all() -> [StreamChannel; 5] {
        [
            StreamChannel::Leads,
            StreamChannel::Contacts,
            StreamChannel::Comments,
            StreamChannel::Events,
            StreamChannel::Assignments,
        ]
    }
}

impl fmt::Display for StreamChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamChannel::Leads => "leads",
            StreamChannel::Contacts => "contacts",
            StreamChannel::Comments => "comments",
            StreamChannel::Events => "events",
            StreamChannel::Assignments => "assignments",
        };
        write!(f, "{}", s)
    }
}

/// A single-entity notification from one of the five channels.
///
/// Upserts carry the full record (the transport echoes the post-write
/// state); deletes carry the ids needed to locate the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeNotification {
    // ========================================================================
    // LEAD CHANNEL
    // ========================================================================
    /// A lead was inserted or updated.
    LeadUpserted { op: ChangeOp, lead: Lead },

    /// A lead was deleted. The whole aggregate goes with it.
    LeadDeleted { lead_id: EntityId },

    // ========================================================================
    // CONTACT CHANNEL
    // ========================================================================
    /// A contact was inserted or updated.
    ContactUpserted { op: ChangeOp, contact: Contact },

    /// A contact was deleted.
    ContactDeleted {
        lead_id: EntityId,
        contact_id: EntityId,
    },

    // ========================================================================
    // COMMENT CHANNEL
    // ========================================================================
    /// A comment was inserted or updated.
    CommentUpserted { op: ChangeOp, comment: Comment },

    /// A comment was deleted.
    CommentDeleted {
        lead_id: EntityId,
        comment_id: EntityId,
    },

    // ========================================================================
    // EVENT CHANNEL
    // ========================================================================
    /// A timeline event was appended (or re-delivered).
    EventUpserted { op: ChangeOp, event: LeadEvent },

    /// A timeline event was deleted.
    EventDeleted {
        lead_id: EntityId,
        event_id: EntityId,
    },

    // ========================================================================
    // ASSIGNMENT CHANNEL
    // ========================================================================
    /// A technician assignment was inserted or updated.
    AssignmentUpserted {
        op: ChangeOp,
        assignment: TechnicianAssignment,
    },

    /// A technician assignment was deleted.
    AssignmentDeleted {
        lead_id: EntityId,
        assignment_id: EntityId,
    },
}

impl ChangeNotification {
    /// The channel this notification belongs to.
    pub fn channel(&self) -> StreamChannel {
        match self {
            ChangeNotification::LeadUpserted { .. } | ChangeNotification::LeadDeleted { .. } => {
                StreamChannel::Leads
            }
            ChangeNotification::ContactUpserted { .. }
            | ChangeNotification::ContactDeleted { .. } => StreamChannel::Contacts,
            ChangeNotification::CommentUpserted { .. }
            | ChangeNotification::CommentDeleted { .. } => StreamChannel::Comments,
            ChangeNotification::EventUpserted { .. } | ChangeNotification::EventDeleted { .. } => {
                StreamChannel::Events
            }
            ChangeNotification::AssignmentUpserted { .. }
            | ChangeNotification::AssignmentDeleted { .. } => StreamChannel::Assignments,
        }
    }

    /// The lead aggregate this notification targets.
    pub fn lead_id(&self) -> EntityId {
        match self {
            ChangeNotification::LeadUpserted { lead, .. } => lead.lead_id,
            ChangeNotification::LeadDeleted { lead_id } => *lead_id,
            ChangeNotification::ContactUpserted { contact, .. } => contact.lead_id,
            ChangeNotification::ContactDeleted { lead_id, .. } => *lead_id,
            ChangeNotification::CommentUpserted { comment, .. } => comment.lead_id,
            ChangeNotification::CommentDeleted { lead_id, .. } => *lead_id,
            ChangeNotification::EventUpserted { event, .. } => event.lead_id,
            ChangeNotification::EventDeleted { lead_id, .. } => *lead_id,
            ChangeNotification::AssignmentUpserted { assignment, .. } => assignment.lead_id,
            ChangeNotification::AssignmentDeleted { lead_id, .. } => *lead_id,
        }
    }
}
