//! Cross-module property and scenario tests for the pipeline engine.

use chrono::{Duration, Utc};
use leadline_core::{
    new_entity_id, ChangeNotification, ChangeOp, CommentDraft, ContactDraft, LeadAggregate,
    LeadDraft, LeadFilter, LeadPatch, LeadPriority, LeadStatus, SortDirection, SortField,
    SortSpec,
};
use leadline_engine::{
    score_aggregate, apply, EngineConfig, InMemoryBackend, LeadPipeline, PipelineStore,
    QueryContext, ReconnectConfig, StaticSession,
};
use leadline_test_utils::{
    arb_lead, arb_lead_patch, arb_lead_priority, arb_lead_status, sample_aggregate,
    sample_contact, sample_lead, sample_qualified_lead,
};
use proptest::prelude::*;

fn engine_config() -> EngineConfig {
    EngineConfig {
        refresh_interval_ms: 2_000,
        channel_capacity: 64,
        reconnect: ReconnectConfig {
            initial_ms: 250,
            max_ms: 5_000,
            multiplier: 1.5,
            jitter_ms: 100,
        },
    }
}

fn ctx() -> QueryContext {
    QueryContext::new(Utc::now(), new_entity_id(), None)
}

fn snapshot(store: &PipelineStore) -> Vec<LeadAggregate> {
    store.aggregates().cloned().collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Scenario A: a fully qualified lead scores strictly higher than an
/// otherwise-identical lead with all BANT flags false.
#[test]
fn scenario_a_bant_flags_raise_score() {
    let now = Utc::now();

    let mut qualified = sample_aggregate("Acme", 3, 2);
    qualified.lead = sample_qualified_lead("Acme");

    let mut unqualified = qualified.clone();
    unqualified.lead.budget_confirmed = false;
    unqualified.lead.authority_confirmed = false;
    unqualified.lead.needs_confirmed = false;
    unqualified.lead.timeline_confirmed = false;

    assert!(score_aggregate(&qualified, now) > score_aggregate(&unqualified, now));
}

/// Scenario B: the active-only toggle over one lead per status keeps
/// exactly {cold, warm, hot}.
#[test]
fn scenario_b_active_only_view() {
    let leads: Vec<LeadAggregate> = [
        LeadStatus::Lost,
        LeadStatus::Cold,
        LeadStatus::Warm,
        LeadStatus::Hot,
        LeadStatus::Deal,
    ]
    .into_iter()
    .map(|status| {
        let mut aggregate = LeadAggregate::new(sample_lead("Lead"));
        aggregate.lead.status = status;
        aggregate
    })
    .collect();

    let mut filter = LeadFilter::new();
    filter.active_only = true;
    let visible = apply(leads.iter(), &filter, None, &ctx());

    let statuses: Vec<LeadStatus> = visible.iter().map(|a| a.lead.status).collect();
    assert_eq!(
        statuses,
        vec![LeadStatus::Cold, LeadStatus::Warm, LeadStatus::Hot]
    );
}

/// Scenario C: an optimistic priority edit at local time T survives a
/// stream notification timestamped before T.
#[test]
fn scenario_c_optimistic_edit_survives_stale_broadcast() {
    let mut store = PipelineStore::new();
    let lead = sample_lead("Acme");
    let lead_id = lead.lead_id;
    store.apply_change(ChangeNotification::LeadUpserted {
        op: ChangeOp::Insert,
        lead: lead.clone(),
    });

    let t = Utc::now() + Duration::seconds(10);
    store
        .apply_local_edit(
            lead_id,
            &LeadPatch::Priority(LeadPriority::Urgent),
            t,
            new_entity_id(),
        )
        .unwrap();

    let mut stale = lead;
    stale.priority = LeadPriority::Medium;
    stale.updated_at = t - Duration::seconds(2);
    store.apply_change(ChangeNotification::LeadUpserted {
        op: ChangeOp::Update,
        lead: stale,
    });

    assert_eq!(
        store.get(lead_id).unwrap().lead.priority,
        LeadPriority::Urgent
    );
}

/// Scenario D: searching "Acme" matches a company name and a contact
/// person alike.
#[test]
fn scenario_d_search_spans_fields() {
    let by_company = LeadAggregate::new(sample_lead("Acme Pest Control"));
    let mut by_person = LeadAggregate::new(sample_lead("Northside Services"));
    by_person.lead.contact_person = Some("Acme Johansson".to_string());
    let leads = vec![by_company, by_person];

    let mut filter = LeadFilter::new();
    filter.search = Some("Acme".to_string());

    assert_eq!(apply(leads.iter(), &filter, None, &ctx()).len(), 2);
}

// ============================================================================
// END-TO-END FLOW
// ============================================================================

#[tokio::test]
async fn full_flow_edit_stream_and_query() {
    let session = StaticSession::new(new_entity_id());
    let mut pipeline =
        LeadPipeline::new(InMemoryBackend::new(), session, engine_config()).unwrap();

    let acme = pipeline
        .create_lead(LeadDraft::new("Acme Pest Control"))
        .await
        .unwrap();
    let other = pipeline
        .create_lead(LeadDraft::new("Northside Services"))
        .await
        .unwrap();

    pipeline.set_status(acme.lead_id, LeadStatus::Hot).await.unwrap();
    pipeline
        .add_contact(ContactDraft::new(acme.lead_id, "Maria Berg"))
        .await
        .unwrap();
    pipeline
        .add_comment(CommentDraft::new(acme.lead_id, "site visit booked"))
        .await
        .unwrap();

    // An independent stream pushes a contact for the other lead.
    pipeline.apply_change(ChangeNotification::ContactUpserted {
        op: ChangeOp::Insert,
        contact: sample_contact(other.lead_id, "Jon Lind"),
    });

    let mut filter = LeadFilter::new();
    filter.active_only = true;
    let visible = pipeline.query(
        &filter,
        Some(SortSpec::descending(SortField::Score)),
        Utc::now(),
    );

    assert_eq!(visible.len(), 2);
    // The engaged hot lead outranks the bare cold one.
    assert_eq!(visible[0].lead.lead_id, acme.lead_id);
    assert_eq!(pipeline.store().get(other.lead_id).unwrap().contacts.len(), 1);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Applying the same upsert twice leaves the collection identical to
    /// applying it once.
    #[test]
    fn prop_merge_idempotent(lead in arb_lead()) {
        let mut store = PipelineStore::new();
        let notification = ChangeNotification::LeadUpserted {
            op: ChangeOp::Insert,
            lead,
        };

        store.apply_change(notification.clone());
        let once = snapshot(&store);
        store.apply_change(notification);

        prop_assert_eq!(once, snapshot(&store));
    }

    /// A notification whose ordering stamp is strictly older than the held
    /// value leaves the held value unchanged.
    #[test]
    fn prop_merge_non_regression(lead in arb_lead(), patch in arb_lead_patch()) {
        let mut store = PipelineStore::new();
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Insert,
            lead: lead.clone(),
        });
        let before = snapshot(&store);

        let mut stale = lead.clone();
        stale.apply_patch(&patch, lead.updated_at - Duration::seconds(30), lead.updated_by);
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Update,
            lead: stale,
        });

        prop_assert_eq!(before, snapshot(&store));
    }

    /// Deleting a lead then receiving any late notification for the same id
    /// never re-creates it.
    #[test]
    fn prop_delete_then_late_update_stays_deleted(lead in arb_lead(), patch in arb_lead_patch()) {
        let mut store = PipelineStore::new();
        let lead_id = lead.lead_id;
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Insert,
            lead: lead.clone(),
        });
        store.apply_change(ChangeNotification::LeadDeleted { lead_id });

        let mut late = lead;
        late.apply_patch(&patch, Utc::now() + Duration::seconds(60), late.updated_by);
        store.apply_change(ChangeNotification::LeadUpserted {
            op: ChangeOp::Update,
            lead: late,
        });

        prop_assert!(store.is_empty());
    }

    /// Conjunction of two filter dimensions equals the intersection of the
    /// dimensions applied separately.
    #[test]
    fn prop_filter_conjunction(
        leads in prop::collection::vec(arb_lead(), 0..12),
        status in arb_lead_status(),
        priority in arb_lead_priority(),
    ) {
        let aggregates: Vec<LeadAggregate> =
            leads.into_iter().map(LeadAggregate::new).collect();
        let ctx = ctx();

        let mut by_status = LeadFilter::new();
        by_status.status = Some(status);
        let mut by_priority = LeadFilter::new();
        by_priority.priority = Some(priority);
        let mut both = LeadFilter::new();
        both.status = Some(status);
        both.priority = Some(priority);

        let ids = |filter: &LeadFilter| -> Vec<_> {
            apply(aggregates.iter(), filter, None, &ctx)
                .iter()
                .map(|a| a.lead.lead_id)
                .collect()
        };

        let s = ids(&by_status);
        let p = ids(&by_priority);
        let conjunction = ids(&both);
        let intersection: Vec<_> = s.iter().filter(|id| p.contains(id)).copied().collect();

        prop_assert_eq!(conjunction, intersection);
    }

    /// Sorting never panics on absent values and repeated calls give one
    /// deterministic ordering, for every sort field and direction.
    #[test]
    fn prop_sort_total_and_stable(
        leads in prop::collection::vec(arb_lead(), 0..12),
        field_index in 0usize..11,
        descending in any::<bool>(),
    ) {
        let fields = [
            SortField::Score,
            SortField::CompanyName,
            SortField::Status,
            SortField::Priority,
            SortField::EstimatedValue,
            SortField::Activity,
            SortField::UpdatedAt,
            SortField::ClosingDate,
            SortField::FollowUpDate,
            SortField::Age,
            SortField::Staleness,
        ];
        let spec = SortSpec::new(
            fields[field_index],
            if descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        );
        let aggregates: Vec<LeadAggregate> =
            leads.into_iter().map(LeadAggregate::new).collect();
        let ctx = ctx();

        let first: Vec<_> = apply(aggregates.iter(), &LeadFilter::new(), Some(spec), &ctx)
            .iter()
            .map(|a| a.lead.lead_id)
            .collect();
        let second: Vec<_> = apply(aggregates.iter(), &LeadFilter::new(), Some(spec), &ctx)
            .iter()
            .map(|a| a.lead.lead_id)
            .collect();

        prop_assert_eq!(first.len(), aggregates.len());
        prop_assert_eq!(first, second);
    }

    /// The unconstrained filter is the identity on the collection.
    #[test]
    fn prop_empty_filter_is_identity(leads in prop::collection::vec(arb_lead(), 0..12)) {
        let aggregates: Vec<LeadAggregate> =
            leads.into_iter().map(LeadAggregate::new).collect();
        let visible = apply(aggregates.iter(), &LeadFilter::new(), None, &ctx());

        let input: Vec<_> = aggregates.iter().map(|a| a.lead.lead_id).collect();
        let output: Vec<_> = visible.iter().map(|a| a.lead.lead_id).collect();
        prop_assert_eq!(input, output);
    }
}
