use chamados_core::ValidationError;

/// All errors that can be returned by a TicketStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No ticket with the given id.
    #[error("ticket not found: {id}")]
    TicketNotFound { id: String },

    /// Manual archival of a ticket that never reached `Finalizados`.
    /// Archiving it would leave `arquivado` set without `finalizadoEm`.
    #[error("ticket {id} cannot be archived before it is finalized")]
    NotFinalized { id: String },

    /// Username already registered.
    #[error("username already taken: {username}")]
    UsernameTaken { username: String },

    /// The payload failed schema validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A backend-specific storage error (lock poisoning, connection, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub(crate) fn not_found(id: &str) -> Self {
        StorageError::TicketNotFound { id: id.to_string() }
    }
}
