//! chamados-core: entity schemas for the ticket intake board.
//!
//! Defines tickets, comments, history entries and users, the closed
//! vocabularies they use, and the validation applied to caller-supplied
//! payloads. Nothing here performs I/O; storage backends build on these
//! types and on the state transitions implemented by [`Ticket`].
//!
//! # Public API
//!
//! - [`Ticket`], [`TicketComment`], [`TicketHistoryEntry`], [`User`]
//! - [`Status`], [`Prioridade`], [`Categoria`], [`Frequencia`], [`Actor`]
//! - [`NewTicket`], [`NewComment`], [`TicketPatch`] and [`ValidationError`]

pub mod error;
pub mod history;
pub mod input;
pub mod patch;
pub mod ticket;
pub mod types;

pub use error::ValidationError;
pub use history::{FieldChange, HistoryAction, TicketHistoryEntry};
pub use input::{NewComment, NewTicket};
pub use patch::TicketPatch;
pub use ticket::{NewUser, Ticket, TicketComment, User};
pub use types::{Actor, Categoria, Frequencia, Prioridade, Status};
