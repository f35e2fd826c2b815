//! Application state.

use std::sync::Arc;

use chamados_storage::TicketStorage;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// The single ticket store; every handler goes through it.
    pub(crate) store: Arc<dyn TicketStorage>,
}

impl AppState {
    pub(crate) fn new(store: Arc<dyn TicketStorage>) -> Self {
        Self { store }
    }
}
