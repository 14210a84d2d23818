//! Enum types for LEADLINE entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PIPELINE ENUMS
// ============================================================================

/// Stage of a lead in the sales pipeline.
///
/// There is no enforced transition graph: any status may move to any other
/// by explicit user action. `Lost` and `Deal` are terminal only for the
/// purposes of the "active only" filter, not for mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeadStatus {
    Lost,
    #[default]
    Cold,
    Warm,
    Hot,
    Deal,
}

impl LeadStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LeadStatus::Lost => "lost",
            LeadStatus::Cold => "cold",
            LeadStatus::Warm => "warm",
            LeadStatus::Hot => "hot",
            LeadStatus::Deal => "deal",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, LeadStatusParseError> {
        match s.to_lowercase().as_str() {
            "lost" => Ok(LeadStatus::Lost),
            "cold" => Ok(LeadStatus::Cold),
            "warm" => Ok(LeadStatus::Warm),
            "hot" => Ok(LeadStatus::Hot),
            "deal" => Ok(LeadStatus::Deal),
            _ => Err(LeadStatusParseError(s.to_string())),
        }
    }

    /// Fixed pipeline rank used for status sorting (lost < cold < warm < hot < deal).
    pub fn rank(&self) -> u8 {
        match self {
            LeadStatus::Lost => 0,
            LeadStatus::Cold => 1,
            LeadStatus::Warm => 2,
            LeadStatus::Hot => 3,
            LeadStatus::Deal => 4,
        }
    }

    /// Whether this status is excluded by the "active only" view.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeadStatus::Lost | LeadStatus::Deal)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for LeadStatus {
    type Err = LeadStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid lead status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadStatusParseError(pub String);

impl fmt::Display for LeadStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid lead status: {}", self.0)
    }
}

impl std::error::Error for LeadStatusParseError {}

/// Priority assigned to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LeadPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl LeadPriority {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LeadPriority::None => "none",
            LeadPriority::Low => "low",
            LeadPriority::Medium => "medium",
            LeadPriority::High => "high",
            LeadPriority::Urgent => "urgent",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, LeadPriorityParseError> {
        match s.to_lowercase().as_str() {
            "none" => Ok(LeadPriority::None),
            "low" => Ok(LeadPriority::Low),
            "medium" => Ok(LeadPriority::Medium),
            "high" => Ok(LeadPriority::High),
            "urgent" => Ok(LeadPriority::Urgent),
            _ => Err(LeadPriorityParseError(s.to_string())),
        }
    }

    /// Fixed rank used for priority sorting (never lexicographic).
    pub fn rank(&self) -> u8 {
        match self {
            LeadPriority::None => 0,
            LeadPriority::Low => 1,
            LeadPriority::Medium => 2,
            LeadPriority::High => 3,
            LeadPriority::Urgent => 4,
        }
    }
}

impl fmt::Display for LeadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for LeadPriority {
    type Err = LeadPriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid lead priority string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadPriorityParseError(pub String);

impl fmt::Display for LeadPriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid lead priority: {}", self.0)
    }
}

impl std::error::Error for LeadPriorityParseError {}

/// Quality band mapped from the derived 0-100 lead score.
///
/// The bands partition [0,100] without gaps or overlaps:
/// 0-24 poor, 25-49 fair, 50-74 good, 75-100 excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl LeadQuality {
    /// Band a score. Scores above 100 clamp into the top band.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => LeadQuality::Poor,
            25..=49 => LeadQuality::Fair,
            50..=74 => LeadQuality::Good,
            _ => LeadQuality::Excellent,
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            LeadQuality::Poor => "poor",
            LeadQuality::Fair => "fair",
            LeadQuality::Good => "good",
            LeadQuality::Excellent => "excellent",
        }
    }
}

impl fmt::Display for LeadQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// CHILD-RECORD ENUMS
// ============================================================================

/// Kind of comment recorded on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommentType {
    #[default]
    Note,
    Call,
    Meeting,
    Email,
    Other,
}

impl CommentType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CommentType::Note => "note",
            CommentType::Call => "call",
            CommentType::Meeting => "meeting",
            CommentType::Email => "email",
            CommentType::Other => "other",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, CommentTypeParseError> {
        match s.to_lowercase().as_str() {
            "note" => Ok(CommentType::Note),
            "call" => Ok(CommentType::Call),
            "meeting" => Ok(CommentType::Meeting),
            "email" => Ok(CommentType::Email),
            "other" => Ok(CommentType::Other),
            _ => Err(CommentTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for CommentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for CommentType {
    type Err = CommentTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid comment type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTypeParseError(pub String);

impl fmt::Display for CommentTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid comment type: {}", self.0)
    }
}

impl std::error::Error for CommentTypeParseError {}

/// Type of an audit/timeline event on a lead.
///
/// Events are the durable narrative of everything that happened to a lead
/// and are primarily system-generated as a side effect of other mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadEventType {
    Created,
    Updated,
    StatusChanged,
    NoteAdded,
    CommentAdded,
    ContactAdded,
    ContactUpdated,
    ContactRemoved,
    TagAdded,
    TagRemoved,
    AssignmentAdded,
    AssignmentRemoved,
    FollowUpScheduled,
}

impl LeadEventType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LeadEventType::Created => "created",
            LeadEventType::Updated => "updated",
            LeadEventType::StatusChanged => "status_changed",
            LeadEventType::NoteAdded => "note_added",
            LeadEventType::CommentAdded => "comment_added",
            LeadEventType::ContactAdded => "contact_added",
            LeadEventType::ContactUpdated => "contact_updated",
            LeadEventType::ContactRemoved => "contact_removed",
            LeadEventType::TagAdded => "tag_added",
            LeadEventType::TagRemoved => "tag_removed",
            LeadEventType::AssignmentAdded => "assignment_added",
            LeadEventType::AssignmentRemoved => "assignment_removed",
            LeadEventType::FollowUpScheduled => "follow_up_scheduled",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, LeadEventTypeParseError> {
        match s.to_lowercase().as_str() {
            "created" => Ok(LeadEventType::Created),
            "updated" => Ok(LeadEventType::Updated),
            "status_changed" => Ok(LeadEventType::StatusChanged),
            "note_added" => Ok(LeadEventType::NoteAdded),
            "comment_added" => Ok(LeadEventType::CommentAdded),
            "contact_added" => Ok(LeadEventType::ContactAdded),
            "contact_updated" => Ok(LeadEventType::ContactUpdated),
            "contact_removed" => Ok(LeadEventType::ContactRemoved),
            "tag_added" => Ok(LeadEventType::TagAdded),
            "tag_removed" => Ok(LeadEventType::TagRemoved),
            "assignment_added" => Ok(LeadEventType::AssignmentAdded),
            "assignment_removed" => Ok(LeadEventType::AssignmentRemoved),
            "follow_up_scheduled" => Ok(LeadEventType::FollowUpScheduled),
            _ => Err(LeadEventTypeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for LeadEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for LeadEventType {
    type Err = LeadEventTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid lead event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadEventTypeParseError(pub String);

impl fmt::Display for LeadEventTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid lead event type: {}", self.0)
    }
}

impl std::error::Error for LeadEventTypeParseError {}

// ============================================================================
// CLASSIFICATION ENUMS
// ============================================================================

/// Company size bucket used as a filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    /// 1-9 employees
    Micro,
    /// 10-49 employees
    Small,
    /// 50-249 employees
    Medium,
    /// 250+ employees
    Large,
}

impl CompanySize {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CompanySize::Micro => "micro",
            CompanySize::Small => "small",
            CompanySize::Medium => "medium",
            CompanySize::Large => "large",
        }
    }
}

impl fmt::Display for CompanySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

/// Preferred contact method for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactMethod {
    Phone,
    Email,
    Sms,
    Visit,
}

impl ContactMethod {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ContactMethod::Phone => "phone",
            ContactMethod::Email => "email",
            ContactMethod::Sms => "sms",
            ContactMethod::Visit => "visit",
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

// ============================================================================
// MERGE SUPPORT ENUMS
// ============================================================================

/// Entity kind discriminator for polymorphic references and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Lead,
    Contact,
    Comment,
    Event,
    Assignment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Lead => "lead",
            EntityKind::Contact => "contact",
            EntityKind::Comment => "comment",
            EntityKind::Event => "event",
            EntityKind::Assignment => "assignment",
        };
        write!(f, "{}", s)
    }
}

/// Subset of a lead's attributes sharing one conflict-ordering comparison.
///
/// The reconciler tracks a timestamp per field group per lead, so an
/// optimistic status edit and a streamed tags update to the same lead
/// never clobber each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldGroup {
    /// Company/contact identity, qualification signals, scheduling, notes.
    Core,
    Status,
    Priority,
    Tags,
}

impl FieldGroup {
    /// All field groups, in declaration order.
    pub fn all() -> [FieldGroup; 4] {
        [
            FieldGroup::Core,
            FieldGroup::Status,
            FieldGroup::Priority,
            FieldGroup::Tags,
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
