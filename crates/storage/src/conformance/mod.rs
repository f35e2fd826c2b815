//! Conformance test suite for `TicketStorage` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `TicketStorage` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Lifecycle**: creation defaults, numbering, status timestamps, not-found
//! - **History**: one entry per change, value rendering, newest-first order
//! - **Collaboration**: label and follower add/remove policy
//! - **Archive**: time-based sweep, manual archival rules
//! - **Comments**: insertion order, history coupling, parent checks
//! - **Concurrency**: serialized numbering, no lost history entries
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that builds
//! a fresh, empty store reading time from the supplied clock:
//!
//! ```ignore
//! use chamados_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|clock| async move {
//!         create_test_postgres_storage(clock).await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod archive;
mod collaboration;
mod comments;
mod concurrent;
mod history;
mod lifecycle;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chamados_core::{Frequencia, NewTicket, Ticket};
use time::macros::datetime;
use time::OffsetDateTime;

use crate::clock::ManualClock;
use crate::TicketStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "lifecycle", "history", "archive").
    pub category: String,
    /// Test name (e.g. "ticket_numbers_are_contiguous").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` is called once per test with a fresh [`ManualClock`]
/// and must return an empty store that reads time only from that clock.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(lifecycle::run_lifecycle_tests(&factory).await);
    results.extend(history::run_history_tests(&factory).await);
    results.extend(collaboration::run_collaboration_tests(&factory).await);
    results.extend(archive::run_archive_tests(&factory).await);
    results.extend(comments::run_comment_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Instant every test clock starts at.
const START: OffsetDateTime = datetime!(2026-01-05 12:00 UTC);

/// Build a fresh store and the clock driving it.
async fn fresh<S, F, Fut>(factory: &F) -> (S, Arc<ManualClock>)
where
    S: TicketStorage,
    F: Fn(Arc<ManualClock>) -> Fut,
    Fut: Future<Output = S>,
{
    let clock = Arc::new(ManualClock::new(START));
    let storage = factory(clock.clone()).await;
    (storage, clock)
}

fn make_ticket_input(titulo: &str) -> NewTicket {
    NewTicket {
        problema_descricao: format!("{titulo}: descrição do problema"),
        titulo: titulo.to_string(),
        sistema: "ERP".to_string(),
        nao_consegue: "Concluir o pedido".to_string(),
        replicacao: "Pedidos > Novo > Salvar".to_string(),
        frequencia: Frequencia::AsVezes,
        impedimento: "Pedido não é faturado".to_string(),
        criticidade: "C2".to_string(),
        evidencias: None,
        solicitante_nome: "Vitoria".to_string(),
        solicitante_sobrenome: "Regina".to_string(),
    }
}

async fn create<S: TicketStorage>(s: &S, titulo: &str) -> Result<Ticket, String> {
    s.create_ticket(make_ticket_input(titulo))
        .await
        .map_err(|e| format!("create: {e}"))
}

async fn history_len<S: TicketStorage>(s: &S, id: &str) -> Result<usize, String> {
    s.list_history(id)
        .await
        .map(|h| h.len())
        .map_err(|e| format!("list_history: {e}"))
}
