use async_trait::async_trait;
use chamados_core::{
    Actor, NewComment, NewTicket, NewUser, Prioridade, Status, Ticket, TicketComment,
    TicketHistoryEntry, TicketPatch, User,
};

use crate::error::StorageError;

/// The storage trait for chamados backends.
///
/// A `TicketStorage` implementation owns tickets, comments, users and the
/// history ledger, and is the only writer of ticket state.
///
/// ## History Coupling
///
/// Every mutating ticket operation writes its history entries in the same
/// atomic step as the field change: a reader never observes a change
/// without its entry, and concurrent mutations of one ticket never lose
/// an entry (last write wins on the ticket itself).
///
/// ## Numbering
///
/// `create_ticket` allocates ticket numbers strictly serially: no gaps,
/// no repeats, increasing in creation order.
///
/// ## Missing Tickets
///
/// `get_ticket` reports absence as `Ok(None)`. Every other operation
/// addressed to an unknown id returns `Err(StorageError::TicketNotFound)`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait TicketStorage: Send + Sync + 'static {
    // ── Tickets ───────────────────────────────────────────────────────────────

    /// Validate and file a new ticket with all server-assigned defaults.
    /// Creation writes no history entry.
    async fn create_ticket(&self, input: NewTicket) -> Result<Ticket, StorageError>;

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StorageError>;

    /// Run the archival sweep, then return every non-archived ticket.
    async fn list_active_tickets(&self) -> Result<Vec<Ticket>, StorageError>;

    async fn list_archived_tickets(&self) -> Result<Vec<Ticket>, StorageError>;

    /// Change workflow stage. The first move to `Finalizados` stamps
    /// `finalizado_em`; later moves never clear or restamp it.
    ///
    /// History: one `status_changed` entry.
    async fn update_status(
        &self,
        id: &str,
        status: Status,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// History: one `priority_changed` entry.
    async fn update_priority(
        &self,
        id: &str,
        prioridade: Prioridade,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Assign, or unassign with `None`.
    ///
    /// History: one `assignee_changed` entry; an empty string stands for
    /// "nobody" on either side.
    async fn update_responsavel(
        &self,
        id: &str,
        responsavel: Option<String>,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Generic patch.
    ///
    /// History: one `field_updated` entry per key present in the patch.
    async fn update_fields(
        &self,
        id: &str,
        patch: TicketPatch,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Replace the attachment list.
    ///
    /// History: one `evidencias_updated` entry with comma-joined values.
    async fn update_evidencias(
        &self,
        id: &str,
        evidencias: Vec<String>,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Add a label. Adding a label already present returns the ticket
    /// unchanged and writes no history.
    async fn add_etiqueta(
        &self,
        id: &str,
        etiqueta: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Remove a label through the generic patch path. Removing an absent
    /// label leaves the list unchanged but still writes a `field_updated`
    /// entry.
    async fn remove_etiqueta(
        &self,
        id: &str,
        etiqueta: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Same policy as [`TicketStorage::add_etiqueta`].
    async fn add_seguidor(
        &self,
        id: &str,
        seguidor: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Same policy as [`TicketStorage::remove_etiqueta`].
    async fn remove_seguidor(
        &self,
        id: &str,
        seguidor: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError>;

    /// Archive a finalized ticket on behalf of the system actor.
    ///
    /// Returns `Err(StorageError::NotFinalized)` for a ticket that never
    /// reached `Finalizados`. Archiving an archived ticket is a no-op.
    ///
    /// History: one `ticket_archived` entry authored by `Sistema`.
    async fn archive_ticket(&self, id: &str) -> Result<Ticket, StorageError>;

    /// Archive every finalized ticket older than the retention period and
    /// return how many were archived.
    async fn sweep_archive(&self) -> Result<usize, StorageError>;

    // ── Comments ──────────────────────────────────────────────────────────────

    /// Validate and store a comment on an existing ticket.
    ///
    /// History: one `comment_added` entry carrying only the author.
    async fn add_comment(
        &self,
        ticket_id: &str,
        comment: NewComment,
    ) -> Result<TicketComment, StorageError>;

    /// Comments in insertion order.
    async fn list_comments(&self, ticket_id: &str) -> Result<Vec<TicketComment>, StorageError>;

    // ── History ───────────────────────────────────────────────────────────────

    /// History entries, newest first. Consumers must not re-sort.
    async fn list_history(&self, ticket_id: &str)
        -> Result<Vec<TicketHistoryEntry>, StorageError>;

    // ── Users ─────────────────────────────────────────────────────────────────

    /// Returns `Err(StorageError::UsernameTaken)` for a duplicate username.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
}
