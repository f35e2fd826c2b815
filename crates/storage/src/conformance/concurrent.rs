use std::future::Future;
use std::sync::Arc;

use chamados_core::{Actor, HistoryAction, Prioridade, Status};

use super::{fresh, make_ticket_input, TestResult};
use crate::clock::ManualClock;
use crate::{StorageError, TicketStorage};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_creates_number_serially",
        concurrent_creates_number_serially(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_updates_keep_every_entry",
        concurrent_updates_keep_every_entry(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_label_adds_all_land",
        concurrent_label_adds_all_land(factory).await,
    ));

    results
}

// ── Concurrent creation: contiguous numbers ─────────────────────────────────

/// N tasks file tickets at once. The numbers handed out must be exactly
/// 1..=N with no repeats, whatever order the tasks ran in.
async fn concurrent_creates_number_serially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (storage, _clock) = fresh(factory).await;
    let storage = Arc::new(storage);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.create_ticket(make_ticket_input(&format!("Concurrent {i}")))
                .await
        }));
    }

    let mut numbers = Vec::with_capacity(N);
    for handle in handles {
        let ticket = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        numbers.push(ticket.ticket_number);
    }
    numbers.sort_unstable();
    let expected: Vec<u64> = (1..=N as u64).collect();
    if numbers != expected {
        return Err(format!("expected numbers {expected:?}, got {numbers:?}"));
    }

    let active = storage
        .list_active_tickets()
        .await
        .map_err(|e| format!("list: {e}"))?;
    if active.len() != N {
        return Err(format!("expected {N} active tickets, got {}", active.len()));
    }
    Ok(())
}

// ── Concurrent updates of one ticket: no lost history ───────────────────────

/// N tasks change the same ticket at once. The ticket ends up in one of the
/// written states and the ledger holds one entry per call.
async fn concurrent_updates_keep_every_entry<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (storage, _clock) = fresh(factory).await;
    let storage = Arc::new(storage);
    let ticket = storage
        .create_ticket(make_ticket_input("Contended"))
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let id = ticket.id.clone();
        handles.push(tokio::spawn(async move {
            let actor = Actor::from(format!("agent-{i}").as_str());
            if i % 2 == 0 {
                s.update_status(&id, Status::EmAtendimento, &actor).await
            } else {
                s.update_priority(&id, Prioridade::Alta, &actor).await
            }
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
    }

    let history = storage
        .list_history(&ticket.id)
        .await
        .map_err(|e| format!("history: {e}"))?;
    if history.len() != N {
        return Err(format!("expected {N} history entries, got {}", history.len()));
    }
    let status_entries = history
        .iter()
        .filter(|e| e.action == HistoryAction::StatusChanged)
        .count();
    if status_entries != N / 2 {
        return Err(format!(
            "expected {} status entries, got {status_entries}",
            N / 2
        ));
    }

    let stored = storage
        .get_ticket(&ticket.id)
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("ticket vanished")?;
    if stored.status != Status::EmAtendimento || stored.prioridade != Prioridade::Alta {
        return Err(format!(
            "unexpected final state: {} / {}",
            stored.status, stored.prioridade
        ));
    }
    Ok(())
}

// ── Concurrent label adds: every distinct label lands ───────────────────────

/// Each task adds a different label to the same ticket. Read-modify-write
/// inside the store must not drop any of them.
async fn concurrent_label_adds_all_land<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (storage, _clock) = fresh(factory).await;
    let storage = Arc::new(storage);
    let ticket = storage
        .create_ticket(make_ticket_input("Tagged"))
        .await
        .map_err(|e| format!("create: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let id = ticket.id.clone();
        handles.push(tokio::spawn(async move {
            s.add_etiqueta(&id, &format!("tag-{i}"), &Actor::System)
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    let stored = storage
        .get_ticket(&ticket.id)
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("ticket vanished")?;
    let mut tags = stored.etiquetas.clone();
    tags.sort_unstable();
    tags.dedup();
    if tags.len() != N || stored.etiquetas.len() != N {
        return Err(format!("expected {N} distinct labels, got {:?}", stored.etiquetas));
    }
    Ok(())
}
