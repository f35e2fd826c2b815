use std::future::Future;
use std::sync::Arc;

use chamados_core::{Actor, HistoryAction, TicketPatch};

use super::{create, fresh, history_len, TestResult};
use crate::clock::ManualClock;
use crate::{StorageError, TicketStorage};

pub(super) async fn run_collaboration_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "collaboration",
        "add_etiqueta_appends_in_order",
        add_etiqueta_appends_in_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "add_existing_etiqueta_is_noop",
        add_existing_etiqueta_is_noop(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "remove_etiqueta_filters_value",
        remove_etiqueta_filters_value(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "remove_absent_etiqueta_still_records_history",
        remove_absent_etiqueta_still_records_history(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "seguidores_follow_label_policy",
        seguidores_follow_label_policy(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "patch_with_duplicate_labels_is_rejected",
        patch_with_duplicate_labels_is_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "collaboration",
        "separator_in_label_or_follower_is_rejected",
        separator_in_label_or_follower_is_rejected(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn add_etiqueta_appends_in_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Labels").await?;
    let actor = Actor::from("Raildo");
    s.add_etiqueta(&t.id, "financeiro", &actor)
        .await
        .map_err(|e| e.to_string())?;
    let updated = s
        .add_etiqueta(&t.id, "urgente", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if updated.etiquetas != vec!["financeiro", "urgente"] {
        return Err(format!("unexpected etiquetas: {:?}", updated.etiquetas));
    }
    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    let latest = history.first().ok_or("no history entry")?;
    if latest.action != HistoryAction::FieldUpdated
        || latest.field.as_deref() != Some("etiquetas")
        || latest.old_value.as_deref() != Some("financeiro")
        || latest.new_value.as_deref() != Some("financeiro,urgente")
        || latest.author != "Raildo"
    {
        return Err(format!("unexpected etiquetas entry: {latest:?}"));
    }
    Ok(())
}

/// Adding a label that is already present changes nothing, history included.
async fn add_existing_etiqueta_is_noop<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Idempotent").await?;
    let actor = Actor::System;
    let first = s
        .add_etiqueta(&t.id, "erp", &actor)
        .await
        .map_err(|e| e.to_string())?;
    let before = history_len(&s, &t.id).await?;
    let second = s
        .add_etiqueta(&t.id, "erp", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if second != first {
        return Err("re-adding a label must return the unmodified ticket".to_string());
    }
    if history_len(&s, &t.id).await? != before {
        return Err("re-adding a label must not write history".to_string());
    }
    Ok(())
}

async fn remove_etiqueta_filters_value<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Remove").await?;
    let actor = Actor::System;
    for tag in ["a", "b", "c"] {
        s.add_etiqueta(&t.id, tag, &actor)
            .await
            .map_err(|e| e.to_string())?;
    }
    let updated = s
        .remove_etiqueta(&t.id, "b", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if updated.etiquetas != vec!["a", "c"] {
        return Err(format!("unexpected etiquetas: {:?}", updated.etiquetas));
    }
    Ok(())
}

/// Removal goes through the generic patch, so removing an absent label
/// leaves the list alone but still records a `field_updated` entry.
async fn remove_absent_etiqueta_still_records_history<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Absent").await?;
    let actor = Actor::System;
    s.add_etiqueta(&t.id, "mantida", &actor)
        .await
        .map_err(|e| e.to_string())?;
    let before = history_len(&s, &t.id).await?;
    let updated = s
        .remove_etiqueta(&t.id, "inexistente", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if updated.etiquetas != vec!["mantida"] {
        return Err(format!("unexpected etiquetas: {:?}", updated.etiquetas));
    }
    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if history.len() != before + 1 {
        return Err(format!(
            "expected one new entry, got {}",
            history.len() - before
        ));
    }
    let latest = &history[0];
    if latest.old_value != latest.new_value || latest.new_value.as_deref() != Some("mantida") {
        return Err(format!("unexpected no-op removal entry: {latest:?}"));
    }
    Ok(())
}

async fn seguidores_follow_label_policy<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Followers").await?;
    let actor = Actor::System;
    s.add_seguidor(&t.id, "Vitoria Regina", &actor)
        .await
        .map_err(|e| e.to_string())?;
    let before = history_len(&s, &t.id).await?;
    let again = s
        .add_seguidor(&t.id, "Vitoria Regina", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if again.seguidores != vec!["Vitoria Regina"] || history_len(&s, &t.id).await? != before {
        return Err("re-following must be a no-op".to_string());
    }
    let removed = s
        .remove_seguidor(&t.id, "Vitoria Regina", &actor)
        .await
        .map_err(|e| e.to_string())?;
    if !removed.seguidores.is_empty() {
        return Err(format!("unexpected seguidores: {:?}", removed.seguidores));
    }
    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if history[0].field.as_deref() != Some("seguidores") {
        return Err(format!("unexpected follower entry: {:?}", history[0]));
    }
    Ok(())
}

async fn patch_with_duplicate_labels_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Dupes").await?;
    let patch = TicketPatch::etiquetas(vec!["x".to_string(), "x".to_string()]);
    match s.update_fields(&t.id, patch, &Actor::System).await {
        Err(StorageError::Invalid(_)) => {}
        Err(e) => return Err(format!("expected Invalid, got: {e}")),
        Ok(_) => return Err("duplicate labels must be rejected".to_string()),
    }
    if history_len(&s, &t.id).await? != 0 {
        return Err("a rejected patch must not write history".to_string());
    }
    Ok(())
}

async fn separator_in_label_or_follower_is_rejected<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Separators").await?;
    match s.add_etiqueta(&t.id, "fiscal,urgente", &Actor::System).await {
        Err(StorageError::Invalid(_)) => {}
        Err(e) => return Err(format!("expected Invalid for etiqueta, got: {e}")),
        Ok(_) => return Err("an etiqueta holding ',' must be rejected".to_string()),
    }
    match s.add_seguidor(&t.id, "Santos, Joan", &Actor::System).await {
        Err(StorageError::Invalid(_)) => {}
        Err(e) => return Err(format!("expected Invalid for seguidor, got: {e}")),
        Ok(_) => return Err("a seguidor holding ',' must be rejected".to_string()),
    }
    let stored = s
        .get_ticket(&t.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("ticket vanished")?;
    if !stored.etiquetas.is_empty() || !stored.seguidores.is_empty() {
        return Err(format!(
            "rejected values were stored: {:?} {:?}",
            stored.etiquetas, stored.seguidores
        ));
    }
    if history_len(&s, &t.id).await? != 0 {
        return Err("rejected additions must not write history".to_string());
    }
    Ok(())
}
