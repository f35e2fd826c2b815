use std::future::Future;
use std::sync::Arc;

use chamados_core::{Actor, HistoryAction, Status};
use time::Duration;

use super::{create, fresh, TestResult};
use crate::clock::{Clock, ManualClock};
use crate::sweep::DEFAULT_RETENTION;
use crate::{StorageError, TicketStorage};

pub(super) async fn run_archive_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "archive",
        "listing_sweeps_tickets_past_retention",
        listing_sweeps_tickets_past_retention(factory).await,
    ));
    results.push(TestResult::from_result(
        "archive",
        "tickets_within_retention_stay_active",
        tickets_within_retention_stay_active(factory).await,
    ));
    results.push(TestResult::from_result(
        "archive",
        "unfinalized_tickets_are_never_swept",
        unfinalized_tickets_are_never_swept(factory).await,
    ));
    results.push(TestResult::from_result(
        "archive",
        "sweep_reports_count",
        sweep_reports_count(factory).await,
    ));
    results.push(TestResult::from_result(
        "archive",
        "manual_archive_requires_finalization",
        manual_archive_requires_finalization(factory).await,
    ));
    results.push(TestResult::from_result(
        "archive",
        "manual_archive_is_recorded_once",
        manual_archive_is_recorded_once(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// Finalize, move the clock 16 days, list: the ticket leaves the active
/// list and shows up archived, with the sweep recorded as `Sistema`.
async fn listing_sweeps_tickets_past_retention<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Old").await?;
    let keep = create(&s, "Open").await?;
    s.update_status(&t.id, Status::Finalizados, &Actor::from("Lucas Dewes"))
        .await
        .map_err(|e| e.to_string())?;

    clock.advance(Duration::days(16));
    let swept_at = clock.now();
    let active = s.list_active_tickets().await.map_err(|e| e.to_string())?;
    if active.iter().any(|a| a.id == t.id) {
        return Err("ticket finalized 16 days ago is still active".to_string());
    }
    if !active.iter().any(|a| a.id == keep.id) {
        return Err("open ticket disappeared from the active list".to_string());
    }

    let archived = s.list_archived_tickets().await.map_err(|e| e.to_string())?;
    let found = archived
        .iter()
        .find(|a| a.id == t.id)
        .ok_or("swept ticket missing from archive")?;
    if !found.arquivado || found.arquivado_em != Some(swept_at) {
        return Err(format!(
            "expected arquivado_em {swept_at}, got {:?}",
            found.arquivado_em
        ));
    }

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    let latest = history.first().ok_or("no history entry")?;
    if latest.action != HistoryAction::TicketArchived
        || latest.author != Actor::SYSTEM_NAME
        || latest.field.is_some()
        || latest.old_value.is_some()
        || latest.new_value.is_some()
    {
        return Err(format!("unexpected archive entry: {latest:?}"));
    }
    Ok(())
}

/// Exactly at the retention boundary the ticket is not yet due.
async fn tickets_within_retention_stay_active<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Recent").await?;
    s.update_status(&t.id, Status::Finalizados, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(DEFAULT_RETENTION);
    let active = s.list_active_tickets().await.map_err(|e| e.to_string())?;
    if !active.iter().any(|a| a.id == t.id) {
        return Err("ticket at exactly the retention boundary was archived".to_string());
    }
    let archived = s.list_archived_tickets().await.map_err(|e| e.to_string())?;
    if !archived.is_empty() {
        return Err("archive must be empty".to_string());
    }
    Ok(())
}

async fn unfinalized_tickets_are_never_swept<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Waiting").await?;
    s.update_status(&t.id, Status::AguardandoPublicacao, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(Duration::days(90));
    let active = s.list_active_tickets().await.map_err(|e| e.to_string())?;
    if active.len() != 1 {
        return Err(format!("expected 1 active ticket, got {}", active.len()));
    }
    Ok(())
}

/// A finalized ticket that was reopened keeps its original finalization
/// time, so it is still swept once that time is old enough.
async fn sweep_reports_count<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let actor = Actor::System;
    let a = create(&s, "A").await?;
    let b = create(&s, "B").await?;
    create(&s, "C").await?;
    s.update_status(&a.id, Status::Finalizados, &actor)
        .await
        .map_err(|e| e.to_string())?;
    s.update_status(&b.id, Status::Finalizados, &actor)
        .await
        .map_err(|e| e.to_string())?;
    s.update_status(&b.id, Status::EmAtendimento, &actor)
        .await
        .map_err(|e| e.to_string())?;

    clock.advance(Duration::days(20));
    let swept = s.sweep_archive().await.map_err(|e| e.to_string())?;
    if swept != 2 {
        return Err(format!("expected 2 tickets swept, got {swept}"));
    }
    let again = s.sweep_archive().await.map_err(|e| e.to_string())?;
    if again != 0 {
        return Err(format!("second sweep must archive nothing, got {again}"));
    }
    let archived = s.list_archived_tickets().await.map_err(|e| e.to_string())?;
    if archived.len() != 2 {
        return Err(format!("expected 2 archived, got {}", archived.len()));
    }
    Ok(())
}

async fn manual_archive_requires_finalization<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Early").await?;
    match s.archive_ticket(&t.id).await {
        Err(StorageError::NotFinalized { id }) if id == t.id => {}
        Err(e) => return Err(format!("expected NotFinalized, got: {e}")),
        Ok(_) => return Err("archiving an open ticket must fail".to_string()),
    }
    let fetched = s
        .get_ticket(&t.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("ticket vanished")?;
    if fetched.arquivado {
        return Err("rejected archive must not change the ticket".to_string());
    }
    Ok(())
}

async fn manual_archive_is_recorded_once<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Manual").await?;
    s.update_status(&t.id, Status::Finalizados, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(Duration::hours(2));
    let archived_at = clock.now();
    let first = s.archive_ticket(&t.id).await.map_err(|e| e.to_string())?;
    if !first.arquivado || first.arquivado_em != Some(archived_at) || first.updated_at != archived_at
    {
        return Err(format!("unexpected archived ticket: {first:?}"));
    }

    clock.advance(Duration::hours(2));
    let second = s.archive_ticket(&t.id).await.map_err(|e| e.to_string())?;
    if second.arquivado_em != Some(archived_at) {
        return Err("archiving twice must keep the first arquivado_em".to_string());
    }
    let archive_entries = s
        .list_history(&t.id)
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .filter(|e| e.action == HistoryAction::TicketArchived)
        .count();
    if archive_entries != 1 {
        return Err(format!("expected 1 ticket_archived entry, got {archive_entries}"));
    }
    Ok(())
}
