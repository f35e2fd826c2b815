use std::future::Future;
use std::sync::Arc;

use chamados_core::{HistoryAction, NewComment};
use time::Duration;

use super::{create, fresh, history_len, TestResult};
use crate::clock::ManualClock;
use crate::{StorageError, TicketStorage};

pub(super) async fn run_comment_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "comments",
        "comments_list_in_insertion_order",
        comments_list_in_insertion_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "comments",
        "comment_writes_author_only_history",
        comment_writes_author_only_history(factory).await,
    ));
    results.push(TestResult::from_result(
        "comments",
        "comment_on_missing_ticket_is_not_found",
        comment_on_missing_ticket_is_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "comments",
        "blank_comment_is_rejected",
        blank_comment_is_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "comments",
        "comments_are_scoped_per_ticket",
        comments_are_scoped_per_ticket(factory).await,
    ));

    results
}

fn comment(author: &str, content: &str) -> NewComment {
    NewComment {
        author: author.to_string(),
        content: content.to_string(),
        mentions: None,
    }
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn comments_list_in_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Comments").await?;
    let first = s
        .add_comment(&t.id, comment("Lucas Dewes", "Consegue anexar o log?"))
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(Duration::minutes(5));
    let second = s
        .add_comment(
            &t.id,
            NewComment {
                mentions: Some(vec!["Lucas Dewes".to_string()]),
                ..comment("Vitoria Regina", "Anexado.")
            },
        )
        .await
        .map_err(|e| e.to_string())?;

    if first.ticket_id != t.id || first.mentions.is_some() {
        return Err(format!("unexpected stored comment: {first:?}"));
    }
    if first.id == second.id {
        return Err("comment ids must be unique".to_string());
    }

    let listed = s.list_comments(&t.id).await.map_err(|e| e.to_string())?;
    if listed != vec![first, second] {
        return Err(format!("comments out of order: {listed:?}"));
    }
    if listed[1].mentions.as_deref() != Some(&["Lucas Dewes".to_string()][..]) {
        return Err("mentions were not kept".to_string());
    }
    Ok(())
}

async fn comment_writes_author_only_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, clock) = fresh(factory).await;
    let t = create(&s, "Comment history").await?;
    s.add_comment(&t.id, comment("Raildo", "Primeiro"))
        .await
        .map_err(|e| e.to_string())?;
    clock.advance(Duration::seconds(30));
    s.add_comment(&t.id, comment("Joan Reis Santos", "Segundo"))
        .await
        .map_err(|e| e.to_string())?;

    let history = s.list_history(&t.id).await.map_err(|e| e.to_string())?;
    if history.len() != 2 {
        return Err(format!("expected 2 entries, got {}", history.len()));
    }
    if history
        .iter()
        .any(|e| e.action != HistoryAction::CommentAdded || e.field.is_some() || e.new_value.is_some())
    {
        return Err(format!("unexpected comment entries: {history:?}"));
    }
    if history[0].author != "Joan Reis Santos" || history[1].author != "Raildo" {
        return Err("comment entries must be newest first".to_string());
    }

    let ticket = s
        .get_ticket(&t.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("ticket vanished")?;
    if ticket.updated_at != t.updated_at {
        return Err("commenting must not touch the ticket".to_string());
    }
    Ok(())
}

async fn comment_on_missing_ticket_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    match s.add_comment("no-such-ticket", comment("Raildo", "Olá")).await {
        Err(StorageError::TicketNotFound { .. }) => {}
        Err(e) => return Err(format!("expected TicketNotFound, got: {e}")),
        Ok(_) => return Err("comment on a missing ticket was stored".to_string()),
    }
    match s.list_comments("no-such-ticket").await {
        Err(StorageError::TicketNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected TicketNotFound, got: {e}")),
        Ok(_) => Err("listing comments of a missing ticket must fail".to_string()),
    }
}

async fn blank_comment_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let t = create(&s, "Blank").await?;
    match s.add_comment(&t.id, comment("Raildo", "   ")).await {
        Err(StorageError::Invalid(_)) => {}
        Err(e) => return Err(format!("expected Invalid, got: {e}")),
        Ok(_) => return Err("blank comment was stored".to_string()),
    }
    if history_len(&s, &t.id).await? != 0 {
        return Err("a rejected comment must not write history".to_string());
    }
    Ok(())
}

async fn comments_are_scoped_per_ticket<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let (s, _clock) = fresh(factory).await;
    let a = create(&s, "A").await?;
    let b = create(&s, "B").await?;
    s.add_comment(&a.id, comment("Raildo", "Só no A"))
        .await
        .map_err(|e| e.to_string())?;
    let on_b = s.list_comments(&b.id).await.map_err(|e| e.to_string())?;
    if !on_b.is_empty() {
        return Err(format!("comments leaked across tickets: {on_b:?}"));
    }
    Ok(())
}
