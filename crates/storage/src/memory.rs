//! In-memory `TicketStorage` backend.
//!
//! All state sits behind one mutex, so each operation (field change plus
//! its history entries) is atomic and ticket numbers are allocated
//! serially. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chamados_core::history::{render_list, render_optional_list, validate_list};
use chamados_core::{
    Actor, FieldChange, HistoryAction, NewComment, NewTicket, NewUser, Prioridade, Status, Ticket,
    TicketComment, TicketHistoryEntry, TicketPatch, User,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::StorageError;
use crate::ledger::HistoryLedger;
use crate::sweep::ArchivePolicy;
use crate::traits::TicketStorage;

#[derive(Debug)]
struct Inner {
    /// Creation order, which is also ticket-number order.
    tickets: Vec<Ticket>,
    index: HashMap<String, usize>,
    next_ticket_number: u64,
    comments: Vec<TicketComment>,
    ledger: HistoryLedger,
    users: HashMap<String, User>,
}

impl Inner {
    fn new() -> Self {
        Self {
            tickets: Vec::new(),
            index: HashMap::new(),
            next_ticket_number: 1,
            comments: Vec::new(),
            ledger: HistoryLedger::new(),
            users: HashMap::new(),
        }
    }

    fn position(&self, id: &str) -> Result<usize, StorageError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| StorageError::not_found(id))
    }

    fn ticket_mut(&mut self, id: &str) -> Result<&mut Ticket, StorageError> {
        let pos = self.position(id)?;
        Ok(&mut self.tickets[pos])
    }

    /// Validate and apply a generic patch, recording one entry per touched
    /// key. Label and follower helpers go through here too.
    fn patch(
        &mut self,
        id: &str,
        patch: TicketPatch,
        author: &str,
        now: OffsetDateTime,
    ) -> Result<Ticket, StorageError> {
        patch.validate()?;
        let ticket = self.ticket_mut(id)?;
        let changes = patch.apply(ticket, now);
        let updated = ticket.clone();
        for change in changes {
            self.ledger
                .append(id, HistoryAction::FieldUpdated, Some(change), author, now);
        }
        Ok(updated)
    }

    /// Archive the ticket at `pos` and record it. Returns `false` when it
    /// was already archived.
    fn archive_at(&mut self, pos: usize, now: OffsetDateTime) -> bool {
        let ticket = &mut self.tickets[pos];
        if !ticket.archive(now) {
            return false;
        }
        let id = ticket.id.clone();
        tracing::info!(ticket = %id, number = ticket.ticket_number, "ticket archived");
        self.ledger.append(
            &id,
            HistoryAction::TicketArchived,
            None,
            Actor::SYSTEM_NAME,
            now,
        );
        true
    }

    fn sweep(&mut self, policy: &ArchivePolicy, now: OffsetDateTime) -> usize {
        let Some(threshold) = policy.threshold(now) else {
            return 0;
        };
        let due: Vec<usize> = self
            .tickets
            .iter()
            .enumerate()
            .filter(|(_, t)| policy.is_due(t, threshold))
            .map(|(pos, _)| pos)
            .collect();
        due.into_iter()
            .filter(|&pos| self.archive_at(pos, now))
            .count()
    }
}

/// Volatile ticket store.
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    policy: ArchivePolicy,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            clock,
            policy: ArchivePolicy::default(),
        }
    }

    /// Replace the archival policy (retention period).
    pub fn with_policy(mut self, policy: ArchivePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ArchivePolicy {
        self.policy
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Backend(format!("store lock poisoned: {e}")))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStorage for MemoryStorage {
    async fn create_ticket(&self, input: NewTicket) -> Result<Ticket, StorageError> {
        input.validate()?;
        let mut inner = self.lock()?;
        let now = self.clock.now();
        let number = inner.next_ticket_number;
        let ticket = Ticket::new(Uuid::new_v4().to_string(), number, input, now);
        inner.next_ticket_number += 1;
        let pos = inner.tickets.len();
        inner.index.insert(ticket.id.clone(), pos);
        inner.tickets.push(ticket.clone());
        tracing::debug!(ticket = %ticket.id, number, "ticket created");
        Ok(ticket)
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .index
            .get(id)
            .map(|&pos| inner.tickets[pos].clone()))
    }

    async fn list_active_tickets(&self) -> Result<Vec<Ticket>, StorageError> {
        let mut inner = self.lock()?;
        let archived = inner.sweep(&self.policy, self.clock.now());
        if archived > 0 {
            tracing::info!(archived, "auto-archive sweep");
        }
        Ok(inner
            .tickets
            .iter()
            .filter(|t| !t.arquivado)
            .cloned()
            .collect())
    }

    async fn list_archived_tickets(&self) -> Result<Vec<Ticket>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.arquivado)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: Status,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let now = self.clock.now();
        let ticket = inner.ticket_mut(id)?;
        let old = ticket.set_status(status, now);
        let updated = ticket.clone();
        inner.ledger.append(
            id,
            HistoryAction::StatusChanged,
            Some(FieldChange {
                field: "status",
                old_value: old.to_string(),
                new_value: status.to_string(),
            }),
            actor.name(),
            now,
        );
        tracing::debug!(ticket = %id, from = %old, to = %status, "status changed");
        Ok(updated)
    }

    async fn update_priority(
        &self,
        id: &str,
        prioridade: Prioridade,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let now = self.clock.now();
        let ticket = inner.ticket_mut(id)?;
        let old = ticket.set_prioridade(prioridade, now);
        let updated = ticket.clone();
        inner.ledger.append(
            id,
            HistoryAction::PriorityChanged,
            Some(FieldChange {
                field: "prioridade",
                old_value: old.to_string(),
                new_value: prioridade.to_string(),
            }),
            actor.name(),
            now,
        );
        Ok(updated)
    }

    async fn update_responsavel(
        &self,
        id: &str,
        responsavel: Option<String>,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let now = self.clock.now();
        let ticket = inner.ticket_mut(id)?;
        let new_value = responsavel.clone().unwrap_or_default();
        let old = ticket.set_responsavel(responsavel, now);
        let updated = ticket.clone();
        inner.ledger.append(
            id,
            HistoryAction::AssigneeChanged,
            Some(FieldChange {
                field: "responsavel",
                old_value: old.unwrap_or_default(),
                new_value,
            }),
            actor.name(),
            now,
        );
        Ok(updated)
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: TicketPatch,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let now = self.clock.now();
        inner.patch(id, patch, actor.name(), now)
    }

    async fn update_evidencias(
        &self,
        id: &str,
        evidencias: Vec<String>,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        validate_list("evidencias", &evidencias)?;
        let mut inner = self.lock()?;
        let now = self.clock.now();
        let ticket = inner.ticket_mut(id)?;
        let new_value = render_list(&evidencias);
        let old = ticket.set_evidencias(evidencias, now);
        let updated = ticket.clone();
        inner.ledger.append(
            id,
            HistoryAction::EvidenciasUpdated,
            Some(FieldChange {
                field: "evidencias",
                old_value: render_optional_list(old.as_deref()),
                new_value,
            }),
            actor.name(),
            now,
        );
        Ok(updated)
    }

    async fn add_etiqueta(
        &self,
        id: &str,
        etiqueta: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let ticket = inner.ticket_mut(id)?;
        if ticket.etiquetas.iter().any(|e| e == etiqueta) {
            return Ok(ticket.clone());
        }
        let mut etiquetas = ticket.etiquetas.clone();
        etiquetas.push(etiqueta.to_string());
        let now = self.clock.now();
        inner.patch(id, TicketPatch::etiquetas(etiquetas), actor.name(), now)
    }

    async fn remove_etiqueta(
        &self,
        id: &str,
        etiqueta: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let ticket = inner.ticket_mut(id)?;
        let etiquetas: Vec<String> = ticket
            .etiquetas
            .iter()
            .filter(|e| *e != etiqueta)
            .cloned()
            .collect();
        let now = self.clock.now();
        inner.patch(id, TicketPatch::etiquetas(etiquetas), actor.name(), now)
    }

    async fn add_seguidor(
        &self,
        id: &str,
        seguidor: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let ticket = inner.ticket_mut(id)?;
        if ticket.seguidores.iter().any(|s| s == seguidor) {
            return Ok(ticket.clone());
        }
        let mut seguidores = ticket.seguidores.clone();
        seguidores.push(seguidor.to_string());
        let now = self.clock.now();
        inner.patch(id, TicketPatch::seguidores(seguidores), actor.name(), now)
    }

    async fn remove_seguidor(
        &self,
        id: &str,
        seguidor: &str,
        actor: &Actor,
    ) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let ticket = inner.ticket_mut(id)?;
        let seguidores: Vec<String> = ticket
            .seguidores
            .iter()
            .filter(|s| *s != seguidor)
            .cloned()
            .collect();
        let now = self.clock.now();
        inner.patch(id, TicketPatch::seguidores(seguidores), actor.name(), now)
    }

    async fn archive_ticket(&self, id: &str) -> Result<Ticket, StorageError> {
        let mut inner = self.lock()?;
        let pos = inner.position(id)?;
        if !inner.tickets[pos].is_finalized() {
            return Err(StorageError::NotFinalized { id: id.to_string() });
        }
        let now = self.clock.now();
        inner.archive_at(pos, now);
        Ok(inner.tickets[pos].clone())
    }

    async fn sweep_archive(&self) -> Result<usize, StorageError> {
        let mut inner = self.lock()?;
        Ok(inner.sweep(&self.policy, self.clock.now()))
    }

    async fn add_comment(
        &self,
        ticket_id: &str,
        comment: NewComment,
    ) -> Result<TicketComment, StorageError> {
        comment.validate()?;
        let mut inner = self.lock()?;
        inner.position(ticket_id)?;
        let now = self.clock.now();
        let stored = TicketComment {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            author: comment.author,
            content: comment.content,
            mentions: comment.mentions,
            created_at: now,
        };
        inner.comments.push(stored.clone());
        inner.ledger.append(
            ticket_id,
            HistoryAction::CommentAdded,
            None,
            &stored.author,
            now,
        );
        Ok(stored)
    }

    async fn list_comments(&self, ticket_id: &str) -> Result<Vec<TicketComment>, StorageError> {
        let inner = self.lock()?;
        inner.position(ticket_id)?;
        Ok(inner
            .comments
            .iter()
            .filter(|c| c.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn list_history(
        &self,
        ticket_id: &str,
    ) -> Result<Vec<TicketHistoryEntry>, StorageError> {
        let inner = self.lock()?;
        inner.position(ticket_id)?;
        Ok(inner.ledger.list_by_ticket(ticket_id))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::UsernameTaken {
                username: user.username,
            });
        }
        let stored = User {
            id: Uuid::new_v4().to_string(),
            username: user.username,
            password: user.password,
        };
        inner.users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}
