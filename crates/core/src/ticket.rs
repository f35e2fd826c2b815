//! The ticket entity and its state transitions.
//!
//! Storage backends own persistence and history; the methods here only
//! move a single ticket from one consistent state to the next and report
//! what the old value was, so every backend enforces the same timestamps.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::input::NewTicket;
use crate::types::{Categoria, Frequencia, Prioridade, Status};

/// A ticket as stored and as returned by every API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    /// Human-facing number, strictly increasing in creation order.
    pub ticket_number: u64,
    pub categoria: Categoria,
    pub prioridade: Prioridade,
    /// Free text or a `C1`..`C4` code.
    pub criticidade: String,
    pub titulo: String,
    pub sistema: String,
    pub problema_descricao: String,
    pub nao_consegue: String,
    pub replicacao: String,
    pub frequencia: Frequencia,
    pub impedimento: String,
    pub solicitante_nome: String,
    pub solicitante_sobrenome: String,
    pub responsavel: Option<String>,
    pub etiquetas: Vec<String>,
    pub seguidores: Vec<String>,
    /// Attachment URLs; the bytes live elsewhere.
    pub evidencias: Option<Vec<String>>,
    pub status: Status,
    pub arquivado: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Set the first time the ticket reaches `Finalizados`; never cleared.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub finalizado_em: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub arquivado_em: Option<OffsetDateTime>,
}

impl Ticket {
    /// Build a freshly filed ticket with every server-assigned default.
    pub fn new(id: String, ticket_number: u64, input: NewTicket, now: OffsetDateTime) -> Self {
        Ticket {
            id,
            ticket_number,
            categoria: Categoria::Melhoria,
            prioridade: Prioridade::default(),
            criticidade: input.criticidade,
            titulo: input.titulo,
            sistema: input.sistema,
            problema_descricao: input.problema_descricao,
            nao_consegue: input.nao_consegue,
            replicacao: input.replicacao,
            frequencia: input.frequencia,
            impedimento: input.impedimento,
            solicitante_nome: input.solicitante_nome,
            solicitante_sobrenome: input.solicitante_sobrenome,
            responsavel: None,
            etiquetas: Vec::new(),
            seguidores: Vec::new(),
            evidencias: input.evidencias,
            status: Status::default(),
            arquivado: false,
            created_at: now,
            updated_at: now,
            finalizado_em: None,
            arquivado_em: None,
        }
    }

    /// Move to `status`, stamping `finalizado_em` on the first arrival at
    /// `Finalizados`. Returns the previous status.
    pub fn set_status(&mut self, status: Status, now: OffsetDateTime) -> Status {
        let old = self.status;
        if status.is_final() && self.finalizado_em.is_none() {
            self.finalizado_em = Some(now);
        }
        self.status = status;
        self.updated_at = now;
        old
    }

    /// Returns the previous priority.
    pub fn set_prioridade(&mut self, prioridade: Prioridade, now: OffsetDateTime) -> Prioridade {
        let old = self.prioridade;
        self.prioridade = prioridade;
        self.updated_at = now;
        old
    }

    /// Assign or (with `None`) unassign. Returns the previous assignee.
    pub fn set_responsavel(
        &mut self,
        responsavel: Option<String>,
        now: OffsetDateTime,
    ) -> Option<String> {
        self.updated_at = now;
        std::mem::replace(&mut self.responsavel, responsavel)
    }

    /// Replace the attachment list. Returns the previous list.
    pub fn set_evidencias(
        &mut self,
        evidencias: Vec<String>,
        now: OffsetDateTime,
    ) -> Option<Vec<String>> {
        self.updated_at = now;
        self.evidencias.replace(evidencias)
    }

    /// Mark archived. Returns `false` (and changes nothing) when the ticket
    /// was already archived, so the archival stamp is written once.
    pub fn archive(&mut self, now: OffsetDateTime) -> bool {
        if self.arquivado {
            return false;
        }
        self.arquivado = true;
        self.arquivado_em = Some(now);
        self.updated_at = now;
        true
    }

    pub fn is_finalized(&self) -> bool {
        self.finalizado_em.is_some()
    }

    /// Full requester name as shown on the board.
    pub fn solicitante(&self) -> String {
        format!("{} {}", self.solicitante_nome, self.solicitante_sobrenome)
            .trim()
            .to_string()
    }
}

/// A comment attached to a ticket. Comments are never edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketComment {
    pub id: String,
    pub ticket_id: String,
    pub author: String,
    pub content: String,
    pub mentions: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A board user. Stored for completeness; never exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
