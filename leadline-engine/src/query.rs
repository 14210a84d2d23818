//! The filter/sort pipeline - pure evaluation of a declarative query
//! against the reconciled collection.
//!
//! Recomputed in full on every call; the working set is one visible
//! pipeline view, so there is no incremental variant.

use crate::score;
use crate::session::SessionProvider;
use chrono::Datelike;
use leadline_core::{
    AssignmentScope, CreatedWithin, EntityId, LeadAggregate, LeadFilter, SortDirection, SortField,
    SortSpec, Timestamp, ValuePresence,
};
use std::cmp::Ordering;

/// Read-side context for a query: the clock plus the current identity used
/// by the `mine`/`unassigned` assignment dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext {
    pub now: Timestamp,
    pub current_user: EntityId,
    pub technician_id: Option<EntityId>,
}

impl QueryContext {
    pub fn new(now: Timestamp, current_user: EntityId, technician_id: Option<EntityId>) -> Self {
        Self {
            now,
            current_user,
            technician_id,
        }
    }

    /// Build a context from the session boundary.
    pub fn for_session<S: SessionProvider>(session: &S, now: Timestamp) -> Self {
        Self::new(now, session.current_user(), session.technician_id())
    }
}

/// Apply a filter and an optional sort to the collection, producing the
/// visible ordered subset.
///
/// The filter is a conjunction: a lead passes only if every constrained
/// dimension matches. `None` sort preserves input order (callers map an
/// unrecognized sort-field name to `None`). Sorting is stable and total,
/// so repeated calls on unchanged input give one deterministic ordering.
pub fn apply<'a, I>(
    leads: I,
    filter: &LeadFilter,
    sort: Option<SortSpec>,
    ctx: &QueryContext,
) -> Vec<&'a LeadAggregate>
where
    I: IntoIterator<Item = &'a LeadAggregate>,
{
    let mut visible: Vec<&LeadAggregate> = leads
        .into_iter()
        .filter(|aggregate| matches(aggregate, filter, ctx))
        .collect();

    if let Some(spec) = sort {
        visible.sort_by(|a, b| {
            let ordering = compare_by_field(a, b, spec.field, ctx);
            match spec.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    visible
}

// ============================================================================
// FILTERING
// ============================================================================

/// Evaluate the conjunction of all constrained dimensions.
pub fn matches(aggregate: &LeadAggregate, filter: &LeadFilter, ctx: &QueryContext) -> bool {
    let lead = &aggregate.lead;

    if filter.active_only && lead.status.is_terminal() {
        return false;
    }
    if let Some(search) = &filter.search {
        if !matches_search(aggregate, search) {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if lead.status != status {
            return false;
        }
    }
    if let Some(priority) = filter.priority {
        if lead.priority != priority {
            return false;
        }
    }
    match filter.assignment {
        AssignmentScope::All => {}
        AssignmentScope::Mine => {
            let direct = lead.assigned_to == Some(ctx.current_user);
            let via_assignment = ctx
                .technician_id
                .map(|tech| aggregate.has_technician(tech))
                .unwrap_or(false);
            if !direct && !via_assignment {
                return false;
            }
        }
        AssignmentScope::Unassigned => {
            if lead.assigned_to.is_some() || !aggregate.assignments.is_empty() {
                return false;
            }
        }
    }
    if let Some(creator) = filter.created_by {
        if lead.created_by != creator {
            return false;
        }
    }
    if let Some(size) = filter.company_size {
        if lead.company_size != Some(size) {
            return false;
        }
    }
    if let Some(method) = filter.contact_method {
        if lead.contact_method != Some(method) {
            return false;
        }
    }
    if let Some(source) = &filter.source {
        let matched = lead
            .source
            .as_deref()
            .map(|s| contains_ci(s, source))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if let Some(min) = filter.value_min {
        if lead.estimated_value.map(|v| v < min).unwrap_or(true) {
            return false;
        }
    }
    if let Some(max) = filter.value_max {
        if lead.estimated_value.map(|v| v > max).unwrap_or(true) {
            return false;
        }
    }
    if let Some(created) = &filter.created {
        if !matches_created(lead.created_at, created, ctx.now) {
            return false;
        }
    }
    if filter.follow_up_due_today && lead.follow_up_date != Some(ctx.now.date_naive()) {
        return false;
    }
    match filter.has_value {
        ValuePresence::Any => {}
        ValuePresence::With => {
            if lead.estimated_value.is_none() {
                return false;
            }
        }
        ValuePresence::Without => {
            if lead.estimated_value.is_some() {
                return false;
            }
        }
    }

    true
}

/// Case-insensitive substring match across company name, contact person,
/// email, and organization number.
fn matches_search(aggregate: &LeadAggregate, query: &str) -> bool {
    let lead = &aggregate.lead;
    contains_ci(&lead.company_name, query)
        || lead
            .contact_person
            .as_deref()
            .map(|s| contains_ci(s, query))
            .unwrap_or(false)
        || lead
            .email
            .as_deref()
            .map(|s| contains_ci(s, query))
            .unwrap_or(false)
        || lead
            .org_number
            .as_deref()
            .map(|s| contains_ci(s, query))
            .unwrap_or(false)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_created(created_at: Timestamp, within: &CreatedWithin, now: Timestamp) -> bool {
    match within {
        CreatedWithin::Today => created_at.date_naive() == now.date_naive(),
        CreatedWithin::ThisWeek => {
            created_at.iso_week() == now.iso_week() && created_at.year() == now.year()
        }
        CreatedWithin::ThisMonth => {
            created_at.month() == now.month() && created_at.year() == now.year()
        }
        CreatedWithin::Custom { start, end } => created_at >= *start && created_at <= *end,
    }
}

// ============================================================================
// SORTING
// ============================================================================

/// Total ascending comparison on one field. Absent values rank lowest, so
/// sorting never throws and never reorders unpredictably.
fn compare_by_field(
    a: &LeadAggregate,
    b: &LeadAggregate,
    field: SortField,
    ctx: &QueryContext,
) -> Ordering {
    match field {
        SortField::Score => {
            score::score_aggregate(a, ctx.now).cmp(&score::score_aggregate(b, ctx.now))
        }
        SortField::CompanyName => a
            .lead
            .company_name
            .to_lowercase()
            .cmp(&b.lead.company_name.to_lowercase()),
        SortField::Status => a.lead.status.rank().cmp(&b.lead.status.rank()),
        SortField::Priority => a.lead.priority.rank().cmp(&b.lead.priority.rank()),
        SortField::EstimatedValue => cmp_option(a.lead.estimated_value, b.lead.estimated_value),
        SortField::Activity => a.activity_count().cmp(&b.activity_count()),
        SortField::UpdatedAt => a.lead.updated_at.cmp(&b.lead.updated_at),
        SortField::ClosingDate => {
            cmp_option(a.lead.closing_date_estimate, b.lead.closing_date_estimate)
        }
        SortField::FollowUpDate => cmp_option(a.lead.follow_up_date, b.lead.follow_up_date),
        SortField::Age => age_days(a, ctx).cmp(&age_days(b, ctx)),
        SortField::Staleness => staleness_days(a, ctx).cmp(&staleness_days(b, ctx)),
    }
}

/// `None` ranks below any `Some`, in both directions.
fn cmp_option<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// Days since creation.
fn age_days(aggregate: &LeadAggregate, ctx: &QueryContext) -> i64 {
    (ctx.now - aggregate.lead.created_at).num_days()
}

/// Days since last update.
fn staleness_days(aggregate: &LeadAggregate, ctx: &QueryContext) -> i64 {
    (ctx.now - aggregate.lead.updated_at).num_days()
}

// ============================================================================
// TESTS
// ============================================================================
