use std::path::Path;
use std::process;

use chamados_core::{Ticket, TicketComment, TicketHistoryEntry};

use crate::{report_error, OutputFormat};

static ENTITY_SCHEMA_STR: &str = include_str!("../../../../schema/ticket-schema.json");

/// Which `$defs` entry a document is checked against.
fn detect_kind(doc: &serde_json::Value) -> &'static str {
    if doc.get("ticketNumber").is_some() {
        "ticket"
    } else if doc.get("action").is_some() {
        "historyEntry"
    } else if doc.get("content").is_some() {
        "comment"
    } else {
        "ticket"
    }
}

/// Check that the document also deserializes into the typed entity.
fn check_typed(kind: &str, doc: serde_json::Value) -> Result<(), String> {
    let result = match kind {
        "comment" => serde_json::from_value::<TicketComment>(doc).map(|_| ()),
        "historyEntry" => serde_json::from_value::<TicketHistoryEntry>(doc).map(|_| ()),
        _ => serde_json::from_value::<Ticket>(doc).map(|_| ()),
    };
    result.map_err(|e| e.to_string())
}

pub(crate) fn cmd_validate(doc_path: &Path, output: OutputFormat, quiet: bool) {
    let mut schema: serde_json::Value = match serde_json::from_str(ENTITY_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded entity schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc_str = match std::fs::read_to_string(doc_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", doc_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc: serde_json::Value = match serde_json::from_str(&doc_str) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", doc_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    // Narrow the root `oneOf` to the detected entity so errors point at
    // the right definition instead of "matched none of".
    let kind = detect_kind(&doc);
    if let Some(root) = schema.as_object_mut() {
        root.remove("oneOf");
        root.insert(
            "$ref".to_string(),
            serde_json::Value::String(format!("#/$defs/{kind}")),
        );
    }

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();
    if errors.is_empty() {
        if let Err(e) = check_typed(kind, doc) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid {}", kind),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "valid": true, "type": kind }));
                }
            }
        }
    } else {
        match output {
            OutputFormat::Text => {
                if !quiet {
                    eprintln!("invalid {}", kind);
                    for err in &errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": false,
                    "type": kind,
                    "errors": errors
                });
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&json).unwrap_or_default()
                );
            }
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_detected_from_distinguishing_keys() {
        assert_eq!(detect_kind(&serde_json::json!({"ticketNumber": 1})), "ticket");
        assert_eq!(
            detect_kind(&serde_json::json!({"action": "comment_added", "ticketId": "x"})),
            "historyEntry"
        );
        assert_eq!(
            detect_kind(&serde_json::json!({"content": "oi", "ticketId": "x"})),
            "comment"
        );
    }

    #[test]
    fn embedded_schema_parses() {
        let schema: serde_json::Value = serde_json::from_str(ENTITY_SCHEMA_STR).unwrap();
        assert!(schema["$defs"]["ticket"].is_object());
        assert!(schema["$defs"]["comment"].is_object());
        assert!(schema["$defs"]["historyEntry"].is_object());
    }
}
