//! Storage layer for the chamados ticket board.
//!
//! [`TicketStorage`] is the seam between the HTTP layer and persistence.
//! [`MemoryStorage`] is the only backend shipped here; any other backend
//! proves itself against [`conformance::run_conformance_suite`].

mod clock;
pub mod conformance;
mod error;
mod ledger;
mod memory;
mod sweep;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StorageError;
pub use ledger::HistoryLedger;
pub use memory::MemoryStorage;
pub use sweep::{ArchivePolicy, DEFAULT_RETENTION};
pub use traits::TicketStorage;
