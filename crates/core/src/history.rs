//! Audit-trail entries and the text rendering of recorded values.
//!
//! Old and new values are stored as display text regardless of the
//! field's type. Lists are joined with a bare `,` so clients can split
//! them back apart.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{require_list, ValidationError};

/// Joins list entries in recorded history values.
pub const LIST_SEPARATOR: &str = ",";

/// What kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    StatusChanged,
    PriorityChanged,
    AssigneeChanged,
    FieldUpdated,
    EvidenciasUpdated,
    CommentAdded,
    TicketArchived,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::PriorityChanged => "priority_changed",
            HistoryAction::AssigneeChanged => "assignee_changed",
            HistoryAction::FieldUpdated => "field_updated",
            HistoryAction::EvidenciasUpdated => "evidencias_updated",
            HistoryAction::CommentAdded => "comment_added",
            HistoryAction::TicketArchived => "ticket_archived",
        }
    }
}

/// One immutable line of a ticket's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketHistoryEntry {
    pub id: String,
    pub ticket_id: String,
    pub action: HistoryAction,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A single field-level change, before it is written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: String,
    pub new_value: String,
}

/// Render a list field the way history entries record it.
pub fn render_list(values: &[String]) -> String {
    values.join(LIST_SEPARATOR)
}

/// Render a nullable list field; `None` renders as the empty string.
pub fn render_optional_list(values: Option<&[String]>) -> String {
    values.map(render_list).unwrap_or_default()
}

/// Split a recorded list value back into its entries.
pub fn parse_list(rendered: &str) -> Vec<String> {
    if rendered.is_empty() {
        return Vec::new();
    }
    rendered.split(LIST_SEPARATOR).map(str::to_string).collect()
}

/// Check that a list field survives a render/parse round trip: no blank
/// entries and no entry holding [`LIST_SEPARATOR`].
pub fn validate_list(field: &'static str, values: &[String]) -> Result<(), ValidationError> {
    require_list(field, values, LIST_SEPARATOR)
}
