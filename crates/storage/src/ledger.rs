//! Append-only, per-ticket audit trail.

use chamados_core::{FieldChange, HistoryAction, TicketHistoryEntry};
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory history ledger. Entries are never modified or removed.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: Vec<TicketHistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry. `change` is `None` for actions that carry no
    /// field (comments, archival).
    pub fn append(
        &mut self,
        ticket_id: &str,
        action: HistoryAction,
        change: Option<FieldChange>,
        author: &str,
        now: OffsetDateTime,
    ) -> &TicketHistoryEntry {
        let (field, old_value, new_value) = match change {
            Some(c) => (
                Some(c.field.to_string()),
                Some(c.old_value),
                Some(c.new_value),
            ),
            None => (None, None, None),
        };
        self.entries.push(TicketHistoryEntry {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            action,
            field,
            old_value,
            new_value,
            author: author.to_string(),
            created_at: now,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Entries for one ticket, newest first. Entries sharing a timestamp
    /// come out in reverse insertion order.
    pub fn list_by_ticket(&self, ticket_id: &str) -> Vec<TicketHistoryEntry> {
        let mut entries: Vec<TicketHistoryEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}
