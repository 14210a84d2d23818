//! Lead scoring - a pure, deterministic weighted sum over qualification
//! signals, normalized to 0-100.
//!
//! The clock and the engagement counts are explicit inputs, so the same
//! arguments always produce the same score. The score is never stored on a
//! record and never cached across a mutation; callers recompute at read
//! time.

use leadline_core::{Lead, LeadAggregate, LeadQuality, Timestamp};
use rust_decimal::Decimal;

/// Points per confirmed BANT flag (4 flags, 40 total).
const BANT_POINTS: u8 = 10;
/// Caps for the remaining contributions. Together with BANT the maximum is
/// exactly 100.
const VALUE_MAX: u8 = 15;
const PROBABILITY_MAX: u8 = 15;
const RECENCY_MAX: u8 = 10;
const CONTACTS_MAX: u8 = 5;
const COMMENTS_MAX: u8 = 10;
const EVENTS_MAX: u8 = 5;

/// Engagement counts consumed by the scoring function. Only counts, never
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Engagement {
    pub contacts: usize,
    pub comments: usize,
    pub events: usize,
}

impl Engagement {
    /// Counts for a lead aggregate.
    pub fn of(aggregate: &LeadAggregate) -> Self {
        Self {
            contacts: aggregate.contacts.len(),
            comments: aggregate.comments.len(),
            events: aggregate.events.len(),
        }
    }
}

/// Compute the lead score in [0,100].
///
/// Monotone in each qualification flag: confirming any BANT signal never
/// lowers the score.
pub fn score_lead(lead: &Lead, engagement: &Engagement, now: Timestamp) -> u8 {
    let mut score = 0u8;

    for confirmed in [
        lead.budget_confirmed,
        lead.authority_confirmed,
        lead.needs_confirmed,
        lead.timeline_confirmed,
    ] {
        if confirmed {
            score += BANT_POINTS;
        }
    }

    score += value_points(lead.estimated_value);
    score += probability_points(lead.probability);
    score += recency_points(lead.updated_at, now);
    score += contact_points(engagement.contacts);
    score += comment_points(engagement.comments);
    score += event_points(engagement.events);

    score.min(100)
}

/// Score a full aggregate (counts taken from its child collections).
pub fn score_aggregate(aggregate: &LeadAggregate, now: Timestamp) -> u8 {
    score_lead(&aggregate.lead, &Engagement::of(aggregate), now)
}

/// Band a lead's score into its quality label.
pub fn quality(lead: &Lead, engagement: &Engagement, now: Timestamp) -> LeadQuality {
    LeadQuality::from_score(score_lead(lead, engagement, now))
}

fn value_points(value: Option<Decimal>) -> u8 {
    match value {
        Some(v) if v >= Decimal::from(500_000) => VALUE_MAX,
        Some(v) if v >= Decimal::from(100_000) => 10,
        Some(v) if v > Decimal::ZERO => 5,
        _ => 0,
    }
}

fn probability_points(probability: Option<u8>) -> u8 {
    match probability {
        Some(p) if p >= 75 => PROBABILITY_MAX,
        Some(p) if p >= 50 => 10,
        Some(p) if p >= 25 => 5,
        Some(p) if p > 0 => 2,
        _ => 0,
    }
}

fn recency_points(updated_at: Timestamp, now: Timestamp) -> u8 {
    let age_days = (now - updated_at).num_days();
    if age_days < 7 {
        RECENCY_MAX
    } else if age_days < 30 {
        5
    } else {
        0
    }
}

fn contact_points(contacts: usize) -> u8 {
    match contacts {
        0 => 0,
        1 => 3,
        _ => CONTACTS_MAX,
    }
}

/// 2 points per comment, capped.
fn comment_points(comments: usize) -> u8 {
    (comments.min(usize::from(COMMENTS_MAX)) as u8).saturating_mul(2).min(COMMENTS_MAX)
}

/// 1 point per event, capped.
fn event_points(events: usize) -> u8 {
    events.min(usize::from(EVENTS_MAX)) as u8
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::Utc;
    use leadline_core::new_entity_id;
    use proptest::prelude::*;

    fn arb_lead() -> impl Strategy<Value = Lead> {
        (
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            prop::option::of(0u32..2_000_000),
            prop::option::of(0u8..=100),
        )
            .prop_map(|(budget, authority, needs, timeline, value, probability)| {
                let mut lead = Lead::new("Proptest AB", new_entity_id());
                lead.budget_confirmed = budget;
                lead.authority_confirmed = authority;
                lead.needs_confirmed = needs;
                lead.timeline_confirmed = timeline;
                lead.estimated_value = value.map(Decimal::from);
                lead.probability = probability;
                lead
            })
    }

    fn arb_engagement() -> impl Strategy<Value = Engagement> {
        (0usize..10, 0usize..20, 0usize..20).prop_map(|(contacts, comments, events)| Engagement {
            contacts,
            comments,
            events,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Score is always within [0,100].
        #[test]
        fn prop_score_in_range(lead in arb_lead(), engagement in arb_engagement()) {
            let score = score_lead(&lead, &engagement, Utc::now());
            prop_assert!(score <= 100);
        }

        /// Re-evaluation with unchanged inputs yields the same score.
        #[test]
        fn prop_score_idempotent(lead in arb_lead(), engagement in arb_engagement()) {
            let now = Utc::now();
            prop_assert_eq!(
                score_lead(&lead, &engagement, now),
                score_lead(&lead, &engagement, now)
            );
        }

        /// Confirming any single BANT flag never lowers the score.
        #[test]
        fn prop_score_monotone_in_bant(
            lead in arb_lead(),
            engagement in arb_engagement(),
            flag in 0usize..4,
        ) {
            let now = Utc::now();
            let mut cleared = lead.clone();
            let mut confirmed = lead;
            match flag {
                0 => {
                    cleared.budget_confirmed = false;
                    confirmed.budget_confirmed = true;
                }
                1 => {
                    cleared.authority_confirmed = false;
                    confirmed.authority_confirmed = true;
                }
                2 => {
                    cleared.needs_confirmed = false;
                    confirmed.needs_confirmed = true;
                }
                _ => {
                    cleared.timeline_confirmed = false;
                    confirmed.timeline_confirmed = true;
                }
            }

            prop_assert!(
                score_lead(&confirmed, &engagement, now) >= score_lead(&cleared, &engagement, now)
            );
        }

        /// Every score maps into exactly the band its range dictates.
        #[test]
        fn prop_band_partition(score in 0u8..=100) {
            let band = LeadQuality::from_score(score);
            let expected = if score <= 24 {
                LeadQuality::Poor
            } else if score <= 49 {
                LeadQuality::Fair
            } else if score <= 74 {
                LeadQuality::Good
            } else {
                LeadQuality::Excellent
            };
            prop_assert_eq!(band, expected);
        }
    }
}
