//! Test utilities, generators, and fixtures for LEADLINE.
//!
//! Shared by unit, integration, and property tests across the workspace.

use chrono::{Duration, Utc};
use leadline_core::{
    new_entity_id, Comment, CommentType, Contact, EntityId, Lead, LeadAggregate, LeadEvent,
    LeadEventType, LeadPatch, LeadPriority, LeadStatus, TechnicianAssignment,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

// ============================================================================
// FIXTURES
// ============================================================================

/// A bare cold lead.
pub fn sample_lead(company: &str) -> Lead {
    Lead::new(company, new_entity_id())
}

/// A fully qualified lead: all four BANT flags, a large estimated value,
/// and a high win probability.
pub fn sample_qualified_lead(company: &str) -> Lead {
    let mut lead = sample_lead(company)
        .with_status(LeadStatus::Hot)
        .with_priority(LeadPriority::High)
        .with_estimated_value(Decimal::from(500_000))
        .with_probability(80);
    lead.budget_confirmed = true;
    lead.authority_confirmed = true;
    lead.needs_confirmed = true;
    lead.timeline_confirmed = true;
    lead
}

pub fn sample_contact(lead_id: EntityId, name: &str) -> Contact {
    Contact::new(lead_id, name)
        .with_title("Site Manager")
        .with_email("contact@example.com")
}

pub fn sample_comment(lead_id: EntityId, content: &str) -> Comment {
    Comment::new(lead_id, content, new_entity_id()).with_type(CommentType::Call)
}

pub fn sample_event(lead_id: EntityId, event_type: LeadEventType) -> LeadEvent {
    LeadEvent::new(lead_id, event_type, "fixture event", new_entity_id())
}

pub fn sample_assignment(lead_id: EntityId) -> TechnicianAssignment {
    TechnicianAssignment::new(lead_id, new_entity_id())
}

/// An aggregate with the given child counts.
pub fn sample_aggregate(company: &str, comments: usize, events: usize) -> LeadAggregate {
    let lead = sample_lead(company);
    let lead_id = lead.lead_id;
    let mut aggregate = LeadAggregate::new(lead);
    for i in 0..comments {
        let mut comment = sample_comment(lead_id, &format!("comment {}", i));
        comment.created_at = Utc::now() - Duration::minutes(i as i64);
        aggregate.comments.push(comment);
    }
    for i in 0..events {
        let mut event = sample_event(lead_id, LeadEventType::Updated);
        event.created_at = Utc::now() - Duration::minutes(i as i64);
        aggregate.events.push(event);
    }
    aggregate
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub fn arb_lead_status() -> impl Strategy<Value = LeadStatus> {
    prop_oneof![
        Just(LeadStatus::Lost),
        Just(LeadStatus::Cold),
        Just(LeadStatus::Warm),
        Just(LeadStatus::Hot),
        Just(LeadStatus::Deal),
    ]
}

pub fn arb_lead_priority() -> impl Strategy<Value = LeadPriority> {
    prop_oneof![
        Just(LeadPriority::None),
        Just(LeadPriority::Low),
        Just(LeadPriority::Medium),
        Just(LeadPriority::High),
        Just(LeadPriority::Urgent),
    ]
}

pub fn arb_comment_type() -> impl Strategy<Value = CommentType> {
    prop_oneof![
        Just(CommentType::Note),
        Just(CommentType::Call),
        Just(CommentType::Meeting),
        Just(CommentType::Email),
        Just(CommentType::Other),
    ]
}

pub fn arb_tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{2,8}", 0..5)
}

/// A lead with arbitrary classification and qualification signals.
pub fn arb_lead() -> impl Strategy<Value = Lead> {
    (
        "[A-Za-z ]{1,24}",
        arb_lead_status(),
        arb_lead_priority(),
        any::<[bool; 4]>(),
        prop::option::of(0u32..2_000_000),
        prop::option::of(0u8..=100),
        arb_tags(),
    )
        .prop_map(
            |(company, status, priority, bant, value, probability, tags)| {
                let mut lead = Lead::new(&company, new_entity_id())
                    .with_status(status)
                    .with_priority(priority);
                lead.budget_confirmed = bant[0];
                lead.authority_confirmed = bant[1];
                lead.needs_confirmed = bant[2];
                lead.timeline_confirmed = bant[3];
                lead.estimated_value = value.map(Decimal::from);
                lead.probability = probability;
                for tag in tags {
                    lead.add_tag(&tag);
                }
                lead
            },
        )
}

/// A patch to a single arbitrary field group.
pub fn arb_lead_patch() -> impl Strategy<Value = LeadPatch> {
    prop_oneof![
        arb_lead_status().prop_map(LeadPatch::Status),
        arb_lead_priority().prop_map(LeadPatch::Priority),
        arb_tags().prop_map(LeadPatch::Tags),
    ]
}
