//! Time-based auto-archival policy.
//!
//! The sweep runs on the read path: every listing of active tickets
//! archives finalized tickets that have aged past the retention period
//! first, so no scheduler is needed for the rule to hold.

use chamados_core::Ticket;
use time::{Duration, OffsetDateTime};

/// How long a finalized ticket stays on the board.
pub const DEFAULT_RETENTION: Duration = Duration::days(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePolicy {
    retention: Duration,
}

impl ArchivePolicy {
    pub fn new(retention: Duration) -> Self {
        Self { retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Tickets finalized strictly before this instant are due. `None` when
    /// the retention reaches past the representable calendar, in which
    /// case nothing can be due.
    pub fn threshold(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        now.checked_sub(self.retention)
    }

    pub fn is_due(&self, ticket: &Ticket, threshold: OffsetDateTime) -> bool {
        match ticket.finalizado_em {
            Some(finalizado_em) => !ticket.arquivado && finalizado_em < threshold,
            None => false,
        }
    }
}

impl Default for ArchivePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamados_core::{Frequencia, NewTicket, Status};
    use time::macros::datetime;

    fn finalized_at(at: OffsetDateTime) -> Ticket {
        let input = NewTicket {
            problema_descricao: "p".into(),
            titulo: "t".into(),
            sistema: "s".into(),
            nao_consegue: "n".into(),
            replicacao: "r".into(),
            frequencia: Frequencia::Pontualmente,
            impedimento: "i".into(),
            criticidade: "C4".into(),
            evidencias: None,
            solicitante_nome: "a".into(),
            solicitante_sobrenome: "b".into(),
        };
        let mut t = Ticket::new("x".into(), 1, input, at);
        t.set_status(Status::Finalizados, at);
        t
    }

    #[test]
    fn due_only_after_retention_elapses() {
        let policy = ArchivePolicy::default();
        let finalized = datetime!(2026-06-01 00:00 UTC);
        let t = finalized_at(finalized);

        let exactly = policy.threshold(finalized + DEFAULT_RETENTION).unwrap();
        assert!(!policy.is_due(&t, exactly));

        let later = policy
            .threshold(finalized + DEFAULT_RETENTION + Duration::seconds(1))
            .unwrap();
        assert!(policy.is_due(&t, later));
    }

    #[test]
    fn retention_past_calendar_start_has_no_threshold() {
        let policy = ArchivePolicy::new(Duration::days(10_000_000));
        assert_eq!(policy.retention(), Duration::days(10_000_000));
        assert_eq!(policy.threshold(datetime!(2026-06-01 00:00 UTC)), None);
    }

    #[test]
    fn archived_or_open_tickets_are_never_due() {
        let policy = ArchivePolicy::new(Duration::days(1));
        let at = datetime!(2026-06-01 00:00 UTC);
        let mut t = finalized_at(at);
        t.archive(at);
        assert!(!policy.is_due(&t, at + Duration::days(30)));

        let mut open = finalized_at(at);
        open.finalizado_em = None;
        assert!(!policy.is_due(&open, at + Duration::days(30)));
    }
}
