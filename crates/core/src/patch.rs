//! Generic field patches.
//!
//! A patch names the keys it touches; applying it yields one
//! [`FieldChange`] per supplied key, even when the new value equals the
//! old one. Status and assignee are not patchable here because their
//! dedicated operations carry extra invariants and history actions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{require, require_unique, ValidationError};
use crate::history::{
    render_list, render_optional_list, validate_list, FieldChange, LIST_SEPARATOR,
};
use crate::ticket::Ticket;
use crate::types::{Categoria, Frequencia, Prioridade};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TicketPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sistema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problema_descricao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nao_consegue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicacao: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequencia: Option<Frequencia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impedimento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticidade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categoria: Option<Categoria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioridade: Option<Prioridade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solicitante_nome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solicitante_sobrenome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etiquetas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seguidores: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidencias: Option<Vec<String>>,
}

fn set_text(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    slot: &mut String,
    value: Option<String>,
) {
    if let Some(value) = value {
        let old = std::mem::replace(slot, value);
        changes.push(FieldChange {
            field,
            old_value: old,
            new_value: slot.clone(),
        });
    }
}

fn set_label<T: Copy + ToString>(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    slot: &mut T,
    value: Option<T>,
) {
    if let Some(value) = value {
        let old = std::mem::replace(slot, value);
        changes.push(FieldChange {
            field,
            old_value: old.to_string(),
            new_value: value.to_string(),
        });
    }
}

fn set_list(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    slot: &mut Vec<String>,
    value: Option<Vec<String>>,
) {
    if let Some(value) = value {
        let old = std::mem::replace(slot, value);
        changes.push(FieldChange {
            field,
            old_value: render_list(&old),
            new_value: render_list(slot),
        });
    }
}

impl TicketPatch {
    /// Patch that replaces only the label set.
    pub fn etiquetas(etiquetas: Vec<String>) -> Self {
        TicketPatch {
            etiquetas: Some(etiquetas),
            ..Default::default()
        }
    }

    /// Patch that replaces only the follower set.
    pub fn seguidores(seguidores: Vec<String>) -> Self {
        TicketPatch {
            seguidores: Some(seguidores),
            ..Default::default()
        }
    }

    /// Narrative fields may be replaced but never blanked; set-like lists
    /// must stay duplicate-free; list entries must not hold the history
    /// separator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let texts = [
            ("titulo", &self.titulo),
            ("sistema", &self.sistema),
            ("problemaDescricao", &self.problema_descricao),
            ("naoConsegue", &self.nao_consegue),
            ("replicacao", &self.replicacao),
            ("impedimento", &self.impedimento),
            ("criticidade", &self.criticidade),
            ("solicitanteNome", &self.solicitante_nome),
            ("solicitanteSobrenome", &self.solicitante_sobrenome),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                require(field, value)?;
            }
        }
        if let Some(etiquetas) = &self.etiquetas {
            require_unique("etiquetas", etiquetas, LIST_SEPARATOR)?;
        }
        if let Some(seguidores) = &self.seguidores {
            require_unique("seguidores", seguidores, LIST_SEPARATOR)?;
        }
        if let Some(evidencias) = &self.evidencias {
            validate_list("evidencias", evidencias)?;
        }
        Ok(())
    }

    /// Merge into `ticket`, bump `updated_at`, and report each touched key
    /// in declaration order.
    pub fn apply(self, ticket: &mut Ticket, now: OffsetDateTime) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        set_text(&mut changes, "titulo", &mut ticket.titulo, self.titulo);
        set_text(&mut changes, "sistema", &mut ticket.sistema, self.sistema);
        set_text(
            &mut changes,
            "problemaDescricao",
            &mut ticket.problema_descricao,
            self.problema_descricao,
        );
        set_text(
            &mut changes,
            "naoConsegue",
            &mut ticket.nao_consegue,
            self.nao_consegue,
        );
        set_text(
            &mut changes,
            "replicacao",
            &mut ticket.replicacao,
            self.replicacao,
        );
        set_label(
            &mut changes,
            "frequencia",
            &mut ticket.frequencia,
            self.frequencia,
        );
        set_text(
            &mut changes,
            "impedimento",
            &mut ticket.impedimento,
            self.impedimento,
        );
        set_text(
            &mut changes,
            "criticidade",
            &mut ticket.criticidade,
            self.criticidade,
        );
        set_label(&mut changes, "categoria", &mut ticket.categoria, self.categoria);
        set_label(
            &mut changes,
            "prioridade",
            &mut ticket.prioridade,
            self.prioridade,
        );
        set_text(
            &mut changes,
            "solicitanteNome",
            &mut ticket.solicitante_nome,
            self.solicitante_nome,
        );
        set_text(
            &mut changes,
            "solicitanteSobrenome",
            &mut ticket.solicitante_sobrenome,
            self.solicitante_sobrenome,
        );
        set_list(&mut changes, "etiquetas", &mut ticket.etiquetas, self.etiquetas);
        set_list(
            &mut changes,
            "seguidores",
            &mut ticket.seguidores,
            self.seguidores,
        );
        if let Some(evidencias) = self.evidencias {
            let old = render_optional_list(ticket.evidencias.as_deref());
            changes.push(FieldChange {
                field: "evidencias",
                old_value: old,
                new_value: render_list(&evidencias),
            });
            ticket.evidencias = Some(evidencias);
        }
        ticket.updated_at = now;
        changes
    }
}
