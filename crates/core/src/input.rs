//! Caller-supplied payloads for creating tickets and comments.
//!
//! Deserialization enforces presence and closed vocabularies; `validate`
//! adds the checks serde cannot express (non-blank text, clean lists).
//! Unknown keys are ignored on creation, so clients that echo back
//! server-assigned fields are not rejected.

use serde::{Deserialize, Serialize};

use crate::error::{require, require_entries, ValidationError};
use crate::history::validate_list;
use crate::types::Frequencia;

/// Narrative and classification fields filed through the intake wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub problema_descricao: String,
    pub titulo: String,
    pub sistema: String,
    pub nao_consegue: String,
    pub replicacao: String,
    pub frequencia: Frequencia,
    pub impedimento: String,
    pub criticidade: String,
    #[serde(default)]
    pub evidencias: Option<Vec<String>>,
    pub solicitante_nome: String,
    pub solicitante_sobrenome: String,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("problemaDescricao", &self.problema_descricao)?;
        require("titulo", &self.titulo)?;
        require("sistema", &self.sistema)?;
        require("naoConsegue", &self.nao_consegue)?;
        require("replicacao", &self.replicacao)?;
        require("impedimento", &self.impedimento)?;
        require("criticidade", &self.criticidade)?;
        require("solicitanteNome", &self.solicitante_nome)?;
        require("solicitanteSobrenome", &self.solicitante_sobrenome)?;
        if let Some(evidencias) = &self.evidencias {
            validate_list("evidencias", evidencias)?;
        }
        Ok(())
    }
}

/// A comment posted on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub mentions: Option<Vec<String>>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("author", &self.author)?;
        require("content", &self.content)?;
        if let Some(mentions) = &self.mentions {
            require_entries("mentions", mentions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_ticket_input() -> NewTicket {
        NewTicket {
            problema_descricao: "Relatório trava ao exportar".into(),
            titulo: "Exportação de relatório".into(),
            sistema: "ERP Financeiro".into(),
            nao_consegue: "Gerar o fechamento mensal".into(),
            replicacao: "Abrir relatórios > Exportar > PDF".into(),
            frequencia: Frequencia::QuaseSempre,
            impedimento: "Fechamento atrasado".into(),
            criticidade: "C2".into(),
            evidencias: None,
            solicitante_nome: "Vitoria".into(),
            solicitante_sobrenome: "Regina".into(),
        }
    }

    #[test]
    fn complete_input_is_valid() {
        assert_eq!(sample_ticket_input().validate(), Ok(()));
    }

    #[test]
    fn blank_narrative_field_is_rejected() {
        let mut input = sample_ticket_input();
        input.replicacao = "  ".into();
        assert_eq!(
            input.validate(),
            Err(ValidationError::Required {
                field: "replicacao"
            })
        );
    }

    #[test]
    fn blank_evidence_url_is_rejected() {
        let mut input = sample_ticket_input();
        input.evidencias = Some(vec!["https://files/a.png".into(), "".into()]);
        assert_eq!(
            input.validate().unwrap_err().to_string(),
            "field 'evidencias' contains a blank entry"
        );
    }

    #[test]
    fn missing_field_fails_deserialization() {
        let body = serde_json::json!({
            "titulo": "Sem descrição",
            "sistema": "CRM",
        });
        let err = serde_json::from_value::<NewTicket>(body).unwrap_err();
        assert!(err.to_string().contains("missing field"), "{err}");
    }

    #[test]
    fn unknown_frequencia_fails_deserialization() {
        let mut body = serde_json::to_value(sample_ticket_input()).unwrap();
        body["frequencia"] = "Sempre".into();
        assert!(serde_json::from_value::<NewTicket>(body).is_err());
    }

    #[test]
    fn server_assigned_keys_are_ignored_on_create() {
        let mut body = serde_json::to_value(sample_ticket_input()).unwrap();
        body["status"] = "Finalizados".into();
        body["categoria"] = "Bug".into();
        let parsed: NewTicket = serde_json::from_value(body).unwrap();
        assert_eq!(parsed, sample_ticket_input());
    }

    #[test]
    fn comment_requires_author_and_content() {
        let comment = NewComment {
            author: "Joan".into(),
            content: "".into(),
            mentions: None,
        };
        assert_eq!(
            comment.validate(),
            Err(ValidationError::Required { field: "content" })
        );
        let body = serde_json::json!({"author": "Joan", "content": "ok"});
        let parsed: NewComment = serde_json::from_value(body).unwrap();
        assert!(parsed.mentions.is_none());
        assert_eq!(parsed.validate(), Ok(()));
    }
}
