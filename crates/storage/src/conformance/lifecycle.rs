use std::future::Future;
use std::sync::Arc;

use chamados_core::{Actor, Categoria, Prioridade, Status, TicketPatch};
use time::Duration;

use super::{create, fresh, make_ticket_input, TestResult};
use crate::clock::{Clock, ManualClock};
use crate::{StorageError, TicketStorage};

pub(super) async fn run_lifecycle_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "lifecycle",
        "create_assigns_server_defaults",
        create_assigns_server_defaults(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "created_ticket_round_trips",
        created_ticket_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "ticket_numbers_are_contiguous",
        ticket_numbers_are_contiguous(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "create_rejects_blank_fields",
        create_rejects_blank_fields(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "get_missing_ticket_returns_none",
        get_missing_ticket_returns_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "mutations_on_missing_ticket_return_not_found",
        mutations_on_missing_ticket_return_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "finalizado_em_is_stamped_once",
        finalizado_em_is_stamped_once(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "mutations_bump_updated_at_only",
        mutations_bump_updated_at_only(factory).await,
    ));
    results.push(TestResult::from_result(
        "lifecycle",
        "unassign_clears_responsavel",
        unassign_clears_responsavel(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A new ticket is a `Melhoria`, open, medium priority, unassigned.
async fn create_assigns_server_defaults<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Defaults").await?;

    if t.categoria != Categoria::Melhoria {
        return Err(format!("expected categoria Melhoria, got {}", t.categoria));
    }
    if t.status != Status::ChamadosAbertos {
        return Err(format!("expected initial status, got {}", t.status));
    }
    if t.prioridade != Prioridade::Media {
        return Err(format!("expected prioridade Média, got {}", t.prioridade));
    }
    if t.responsavel.is_some() || !t.etiquetas.is_empty() || !t.seguidores.is_empty() {
        return Err("collaboration fields must start empty".to_string());
    }
    if t.arquivado || t.finalizado_em.is_some() || t.arquivado_em.is_some() {
        return Err("workflow timestamps must start unset".to_string());
    }
    if t.created_at != clock.now() || t.updated_at != clock.now() {
        return Err("created_at/updated_at must come from the store clock".to_string());
    }
    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if !history.is_empty() {
        return Err(format!(
            "creation must not write history, found {} entries",
            history.len()
        ));
    }
    Ok(())
}

/// Narrative fields read back exactly as filed.
async fn created_ticket_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let mut input = make_ticket_input("Round trip");
    input.evidencias = Some(vec!["https://files.local/print.png".to_string()]);
    let created = s
        .create_ticket(input.clone())
        .await
        .map_err(|e| e.to_string())?;
    let fetched = s
        .get_ticket(&created.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("created ticket not found by id")?;

    if fetched != created {
        return Err("fetched ticket differs from the created one".to_string());
    }
    if fetched.titulo != input.titulo
        || fetched.sistema != input.sistema
        || fetched.problema_descricao != input.problema_descricao
        || fetched.nao_consegue != input.nao_consegue
        || fetched.replicacao != input.replicacao
        || fetched.frequencia != input.frequencia
        || fetched.impedimento != input.impedimento
        || fetched.criticidade != input.criticidade
        || fetched.evidencias != input.evidencias
        || fetched.solicitante_nome != input.solicitante_nome
        || fetched.solicitante_sobrenome != input.solicitante_sobrenome
    {
        return Err("narrative fields changed on the way through the store".to_string());
    }
    Ok(())
}

/// N sequential creations are numbered exactly 1..=N.
async fn ticket_numbers_are_contiguous<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let mut numbers = Vec::new();
    for i in 0..5 {
        numbers.push(create(&s, &format!("T{i}")).await?.ticket_number);
        clock.advance(Duration::seconds(1));
    }
    if numbers != vec![1, 2, 3, 4, 5] {
        return Err(format!("expected numbers 1..=5, got {numbers:?}"));
    }
    Ok(())
}

async fn create_rejects_blank_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let mut input = make_ticket_input("Blank");
    input.sistema = "   ".to_string();
    match s.create_ticket(input).await {
        Err(StorageError::Invalid(_)) => {}
        Err(e) => return Err(format!("expected Invalid, got: {e}")),
        Ok(_) => return Err("expected blank sistema to be rejected".to_string()),
    }
    let active = s.list_active_tickets().await.map_err(|e| e.to_string())?;
    if !active.is_empty() {
        return Err("a rejected ticket must not be stored".to_string());
    }
    // The rejected attempt must not consume a ticket number.
    let t = create(&s, "After").await?;
    if t.ticket_number != 1 {
        return Err(format!("expected number 1, got {}", t.ticket_number));
    }
    Ok(())
}

async fn get_missing_ticket_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    match s.get_ticket("no-such-ticket").await {
        Ok(None) => Ok(()),
        Ok(Some(_)) => Err("found a ticket that was never created".to_string()),
        Err(e) => Err(format!("get_ticket must not fail for a missing id: {e}")),
    }
}

async fn mutations_on_missing_ticket_return_not_found<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let actor = Actor::System;
    let id = "ghost";
    let outcomes = vec![
        ("update_status", s.update_status(id, Status::Finalizados, &actor).await.err()),
        ("update_priority", s.update_priority(id, Prioridade::Alta, &actor).await.err()),
        ("update_responsavel", s.update_responsavel(id, None, &actor).await.err()),
        (
            "update_fields",
            s.update_fields(id, TicketPatch::default(), &actor).await.err(),
        ),
        ("update_evidencias", s.update_evidencias(id, vec![], &actor).await.err()),
        ("add_etiqueta", s.add_etiqueta(id, "x", &actor).await.err()),
        ("remove_etiqueta", s.remove_etiqueta(id, "x", &actor).await.err()),
        ("add_seguidor", s.add_seguidor(id, "x", &actor).await.err()),
        ("remove_seguidor", s.remove_seguidor(id, "x", &actor).await.err()),
        ("archive_ticket", s.archive_ticket(id).await.err()),
        ("list_history", s.list_history(id).await.err()),
        ("list_comments", s.list_comments(id).await.err()),
    ];
    for (op, err) in outcomes {
        match err {
            Some(StorageError::TicketNotFound { id: got }) if got == id => {}
            Some(e) => return Err(format!("{op}: expected TicketNotFound, got: {e}")),
            None => return Err(format!("{op}: expected TicketNotFound, got Ok")),
        }
    }
    Ok(())
}

/// Finalizados → other → Finalizados keeps the first finalization time.
async fn finalizado_em_is_stamped_once<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let actor = Actor::from("Alesson Garcia");
    let t = create(&s, "Finalize").await?;

    clock.advance(Duration::hours(1));
    let first_at = clock.now();
    let t1 = s
        .update_status(&t.id, Status::Finalizados, &actor)
        .await
        .map_err(|e| e.to_string())?;
    if t1.finalizado_em != Some(first_at) {
        return Err(format!("expected finalizado_em {first_at}, got {:?}", t1.finalizado_em));
    }

    clock.advance(Duration::hours(1));
    let t2 = s
        .update_status(&t.id, Status::EmAtendimento, &actor)
        .await
        .map_err(|e| e.to_string())?;
    if t2.finalizado_em != Some(first_at) {
        return Err("moving away from Finalizados must not clear finalizado_em".to_string());
    }

    clock.advance(Duration::hours(1));
    let t3 = s
        .update_status(&t.id, Status::Finalizados, &actor)
        .await
        .map_err(|e| e.to_string())?;
    if t3.finalizado_em != Some(first_at) {
        return Err(format!(
            "re-finalizing must keep {first_at}, got {:?}",
            t3.finalizado_em
        ));
    }
    if t3.updated_at != clock.now() {
        return Err("updated_at must track the latest change".to_string());
    }
    Ok(())
}

async fn mutations_bump_updated_at_only<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Bump").await?;
    clock.advance(Duration::minutes(30));
    let updated = s
        .update_priority(&t.id, Prioridade::Urgente, &Actor::System)
        .await
        .map_err(|e| e.to_string())?;
    if updated.created_at != t.created_at {
        return Err("created_at must never change".to_string());
    }
    if updated.updated_at != clock.now() {
        return Err("updated_at must be set to the mutation time".to_string());
    }
    if updated.prioridade != Prioridade::Urgente {
        return Err(format!("expected Urgente, got {}", updated.prioridade));
    }
    Ok(())
}

async fn unassign_clears_responsavel<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Assign").await?;
    let actor = Actor::System;
    let assigned = s
        .update_responsavel(&t.id, Some("Raildo".to_string()), &actor)
        .await
        .map_err(|e| e.to_string())?;
    if assigned.responsavel.as_deref() != Some("Raildo") {
        return Err(format!("expected Raildo, got {:?}", assigned.responsavel));
    }
    let cleared = s
        .update_responsavel(&t.id, None, &actor)
        .await
        .map_err(|e| e.to_string())?;
    if cleared.responsavel.is_some() {
        return Err("unassign must clear responsavel".to_string());
    }
    Ok(())
}
