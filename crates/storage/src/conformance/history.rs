use std::future::Future;
use std::sync::Arc;

use chamados_core::history::parse_list;
use chamados_core::{Actor, HistoryAction, Prioridade, Status, TicketPatch};
use time::Duration;

use super::{create, fresh, history_len, TestResult};
use crate::clock::ManualClock;
use crate::{StorageError, TicketStorage};

pub(super) async fn run_history_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "history",
        "each_mutation_appends_one_entry_newest_first",
        each_mutation_appends_one_entry_newest_first(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "status_entry_records_old_and_new",
        status_entry_records_old_and_new(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "assignee_entry_uses_empty_string_for_nobody",
        assignee_entry_uses_empty_string_for_nobody(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "update_fields_writes_one_entry_per_key",
        update_fields_writes_one_entry_per_key(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "evidencias_entry_is_comma_joined",
        evidencias_entry_is_comma_joined(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "unrenderable_evidencias_are_rejected",
        unrenderable_evidencias_are_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "recorded_lists_parse_back_to_stored_lists",
        recorded_lists_parse_back_to_stored_lists(factory).await,
    ));
    results.push(TestResult::from_result(
        "history",
        "history_is_scoped_per_ticket",
        history_is_scoped_per_ticket(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Every single-field mutation adds exactly one entry, and that entry is
/// the first one returned, even when several share a timestamp.
async fn each_mutation_appends_one_entry_newest_first<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "History").await?;
    let actor = Actor::from("Joan Reis Santos");

    let steps: Vec<(HistoryAction, &str)> = vec![
        (HistoryAction::StatusChanged, "status"),
        (HistoryAction::PriorityChanged, "priority"),
        (HistoryAction::AssigneeChanged, "assignee"),
        (HistoryAction::EvidenciasUpdated, "evidencias"),
        (HistoryAction::FieldUpdated, "fields"),
        (HistoryAction::TicketArchived, "archive"),
    ];

    for (expected_action, step) in steps {
        let before = history_len(&s, &t.id).await?;
        let result = match step {
            "status" => s.update_status(&t.id, Status::Finalizados, &actor).await,
            "priority" => s.update_priority(&t.id, Prioridade::Alta, &actor).await,
            "assignee" => {
                s.update_responsavel(&t.id, Some("Lucas Dewes".to_string()), &actor)
                    .await
            }
            "evidencias" => {
                s.update_evidencias(&t.id, vec!["https://files.local/a.png".to_string()], &actor)
                    .await
            }
            "fields" => {
                let patch = TicketPatch {
                    criticidade: Some("C1".to_string()),
                    ..Default::default()
                };
                s.update_fields(&t.id, patch, &actor).await
            }
            _ => s.archive_ticket(&t.id).await,
        };
        result.map_err(|e| format!("{step}: {e}"))?;

        let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
        if history.len() != before + 1 {
            return Err(format!(
                "{step}: expected {} entries, got {}",
                before + 1,
                history.len()
            ));
        }
        if history[0].action != expected_action {
            return Err(format!(
                "{step}: newest entry is {:?}, expected {:?}",
                history[0].action, expected_action
            ));
        }
    }
    Ok(())
}

async fn status_entry_records_old_and_new<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Status").await?;
    s.update_status(&t.id, Status::Finalizados, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    let entry = history.first().ok_or("no history entry")?;
    if entry.action != HistoryAction::StatusChanged
        || entry.field.as_deref() != Some("status")
        || entry.old_value.as_deref() != Some("Chamados abertos")
        || entry.new_value.as_deref() != Some("Finalizados")
    {
        return Err(format!("unexpected status entry: {entry:?}"));
    }
    if entry.author != "Sistema" {
        return Err(format!("system actor must be recorded as Sistema, got {}", entry.author));
    }
    if entry.ticket_id != t.id {
        return Err("entry must reference its ticket".to_string());
    }
    Ok(())
}

async fn assignee_entry_uses_empty_string_for_nobody<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Assignee").await?;
    let actor = Actor::from("William Santana");
    s.update_responsavel(&t.id, Some("Nicolas Souza".to_string()), &actor)
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(Duration::seconds(1));
    s.update_responsavel(&t.id, None, &actor)
        .await
        .map_err(|e| e.to_string())?;

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if history.len() != 2 {
        return Err(format!("expected 2 entries, got {}", history.len()));
    }
    let (unassign, assign) = (&history[0], &history[1]);
    if assign.old_value.as_deref() != Some("") || assign.new_value.as_deref() != Some("Nicolas Souza")
    {
        return Err(format!("unexpected assign entry: {assign:?}"));
    }
    if unassign.old_value.as_deref() != Some("Nicolas Souza")
        || unassign.new_value.as_deref() != Some("")
    {
        return Err(format!("unexpected unassign entry: {unassign:?}"));
    }
    if unassign.author != "William Santana" {
        return Err(format!("wrong author: {}", unassign.author));
    }
    Ok(())
}

async fn update_fields_writes_one_entry_per_key<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Patch").await?;
    let patch = TicketPatch {
        titulo: Some("Patched".to_string()),
        sistema: Some(t.sistema.clone()),
        etiquetas: Some(vec!["a".to_string(), "b".to_string()]),
        ..Default::default()
    };
    let updated = s
        .update_fields(&t.id, patch, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    if updated.titulo != "Patched" || updated.etiquetas != vec!["a", "b"] {
        return Err("patch was not merged".to_string());
    }

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if history.len() != 3 {
        return Err(format!("expected 3 entries (one per key), got {}", history.len()));
    }
    if history.iter().any(|e| e.action != HistoryAction::FieldUpdated) {
        return Err("patch entries must be field_updated".to_string());
    }
    let mut fields: Vec<&str> = history.iter().filter_map(|e| e.field.as_deref()).collect();
    fields.sort_unstable();
    if fields != vec!["etiquetas", "sistema", "titulo"] {
        return Err(format!("unexpected fields: {fields:?}"));
    }
    let tags = history
        .iter()
        .find(|e| e.field.as_deref() == Some("etiquetas"))
        .ok_or("missing etiquetas entry")?;
    if tags.old_value.as_deref() != Some("") || tags.new_value.as_deref() != Some("a,b") {
        return Err(format!("unexpected etiquetas entry: {tags:?}"));
    }
    Ok(())
}

async fn evidencias_entry_is_comma_joined<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Evidence").await?;
    let actor = Actor::System;
    s.update_evidencias(&t.id, vec!["u1".to_string(), "u2".to_string()], &actor)
        .await
        .map_err(|e| e.to_string())?;
    let updated = s
        .update_evidencias(&t.id, vec!["u3".to_string()], &actor)
        .await
        .map_err(|e| e.to_string())?;
    if updated.evidencias != Some(vec!["u3".to_string()]) {
        return Err(format!("unexpected evidencias: {:?}", updated.evidencias));
    }
    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    let latest = history.first().ok_or("no history entry")?;
    if latest.action != HistoryAction::EvidenciasUpdated
        || latest.field.as_deref() != Some("evidencias")
        || latest.old_value.as_deref() != Some("u1,u2")
        || latest.new_value.as_deref() != Some("u3")
    {
        return Err(format!("unexpected evidencias entry: {latest:?}"));
    }
    Ok(())
}

/// Blank URLs and URLs holding the list separator cannot be recorded
/// faithfully, so they are refused before anything is stored.
async fn unrenderable_evidencias_are_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Bad evidence").await?;
    for evidencias in [
        vec!["".to_string(), "https://files.local/a.png".to_string()],
        vec!["https://files.local/a,b.png".to_string()],
    ] {
        match s.update_evidencias(&t.id, evidencias.clone(), &Actor::System).await {
            Err(StorageError::Invalid(_)) => {}
            Err(e) => return Err(format!("expected Invalid for {evidencias:?}, got: {e}")),
            Ok(_) => return Err(format!("{evidencias:?} must be rejected")),
        }
    }
    let stored = s
        .get_ticket(&t.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("ticket vanished")?;
    if stored.evidencias.is_some() {
        return Err(format!("rejected lists were stored: {:?}", stored.evidencias));
    }
    if history_len(&s, &t.id).await? != 0 {
        return Err("a rejected update must not write history".to_string());
    }
    Ok(())
}

async fn recorded_lists_parse_back_to_stored_lists<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Round trip").await?;
    let urls = vec![
        "https://files.local/print 1.png".to_string(),
        "https://files.local/log.txt?v=2".to_string(),
    ];
    let updated = s
        .update_evidencias(&t.id, urls.clone(), &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    let tags = vec!["nota fiscal".to_string(), "erp".to_string()];
    s.update_fields(&t.id, TicketPatch::etiquetas(tags.clone()), &Actor::System)
        .await
        .map_err(|e| e.to_string())?;

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    let [tag_entry, url_entry] = history.as_slice() else {
        return Err(format!("expected two entries, got {}", history.len()));
    };
    let recorded_urls = parse_list(url_entry.new_value.as_deref().unwrap_or_default());
    if Some(&recorded_urls) != updated.evidencias.as_ref() {
        return Err(format!("evidencias recorded as {recorded_urls:?}"));
    }
    let recorded_tags = parse_list(tag_entry.new_value.as_deref().unwrap_or_default());
    if recorded_tags != tags {
        return Err(format!("etiquetas recorded as {recorded_tags:?}"));
    }
    Ok(())
}

async fn history_is_scoped_per_ticket<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let a = create(&s, "A").await?;
    let b = create(&s, "B").await?;
    s.update_priority(&a.id, Prioridade::Baixa, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    if history_len(&s, &a.id).await? != 1 || history_len(&s, &b.id).await? != 0 {
        return Err("history leaked across tickets".to_string());
    }
    Ok(())
}
