//! Declarative filter and sort specifications for the pipeline view.
//!
//! A filter is a conjunction over independently-specifiable dimensions,
//! each defaulting to "no constraint". The engine's query module evaluates
//! these against the reconciled collection; nothing here touches state.

use crate::{CompanySize, ContactMethod, EntityId, LeadPriority, LeadStatus, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FILTER SPECIFICATION
// ============================================================================

/// Assignment dimension of the lead filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AssignmentScope {
    /// No constraint.
    #[default]
    All,
    /// Leads directly assigned to the current user, or whose assignment set
    /// contains the current user's technician.
    Mine,
    /// Leads with no direct assignment and an empty assignment set.
    Unassigned,
}

/// Tri-state "has estimated value" dimension.
///
/// The engine honors all three states even where a consuming UI can only
/// reach two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValuePresence {
    #[default]
    Any,
    With,
    Without,
}

/// Date-created dimension: relative buckets or an explicit range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreatedWithin {
    Today,
    ThisWeek,
    ThisMonth,
    /// Inclusive custom range.
    Custom { start: Timestamp, end: Timestamp },
}

/// Conjunctive filter over the lead collection. Every dimension defaults to
/// "no constraint"; `LeadFilter::new()` therefore matches everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LeadFilter {
    /// Case-insensitive substring match across company name, contact
    /// person, email, and organization number.
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub assignment: AssignmentScope,
    pub created_by: Option<EntityId>,
    pub company_size: Option<CompanySize>,
    pub contact_method: Option<ContactMethod>,
    /// Case-insensitive substring match on the lead source.
    pub source: Option<String>,
    /// Inclusive minimum estimated value.
    pub value_min: Option<Decimal>,
    /// Inclusive maximum estimated value.
    pub value_max: Option<Decimal>,
    pub created: Option<CreatedWithin>,
    /// Only leads whose follow-up date is today.
    pub follow_up_due_today: bool,
    pub has_value: ValuePresence,
    /// Exclude leads in terminal states (lost, deal) regardless of the
    /// other dimensions.
    pub active_only: bool,
}

impl LeadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no dimension constrains the result.
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignment == AssignmentScope::All
            && self.created_by.is_none()
            && self.company_size.is_none()
            && self.contact_method.is_none()
            && self.source.is_none()
            && self.value_min.is_none()
            && self.value_max.is_none()
            && self.created.is_none()
            && !self.follow_up_due_today
            && self.has_value == ValuePresence::Any
            && !self.active_only
    }
}

// ============================================================================
// SORT SPECIFICATION
// ============================================================================

/// Sortable fields of the pipeline view. `Age` and `Staleness` are derived
/// temporal metrics (days since creation / days since last update).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Score,
    CompanyName,
    Status,
    Priority,
    EstimatedValue,
    /// Comment count + event count.
    Activity,
    UpdatedAt,
    ClosingDate,
    FollowUpDate,
    Age,
    Staleness,
}

impl SortField {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SortField::Score => "score",
            SortField::CompanyName => "company_name",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::EstimatedValue => "estimated_value",
            SortField::Activity => "activity",
            SortField::UpdatedAt => "updated_at",
            SortField::ClosingDate => "closing_date",
            SortField::FollowUpDate => "follow_up_date",
            SortField::Age => "age",
            SortField::Staleness => "staleness",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, SortFieldParseError> {
        match s.to_lowercase().as_str() {
            "score" => Ok(SortField::Score),
            "company_name" => Ok(SortField::CompanyName),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "estimated_value" => Ok(SortField::EstimatedValue),
            "activity" => Ok(SortField::Activity),
            "updated_at" => Ok(SortField::UpdatedAt),
            "closing_date" => Ok(SortField::ClosingDate),
            "follow_up_date" => Ok(SortField::FollowUpDate),
            "age" => Ok(SortField::Age),
            "staleness" => Ok(SortField::Staleness),
            _ => Err(SortFieldParseError(s.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for SortField {
    type Err = SortFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an unrecognized sort field name. Callers treat a
/// parse failure as "no sort" (input order preserved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortFieldParseError(pub String);

impl fmt::Display for SortFieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unrecognized sort field: {}", self.0)
    }
}

impl std::error::Error for SortFieldParseError {}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// A single-field sort declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: SortField) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: SortField) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

// ============================================================================
// TESTS
// ============================================================================
