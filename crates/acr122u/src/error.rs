//! Error types for reader polling and card sessions

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`Context`](crate::Context) construction and serving
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Middleware failure, with the step that produced it
    #[error("{context} [{source} ({:X})]", raw_code(.source))]
    Pcsc {
        /// What the crate was doing when the middleware failed
        context: &'static str,
        /// Underlying middleware error
        source: pcsc::Error,
    },

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// The card answered the UID request with `63 00`
    #[error("Operation failed")]
    OperationFailed,

    /// The card answered the UID request with an unexpected status word
    #[error("Status word error: {0:#06X}")]
    StatusWord(u16),

    /// Response too short to carry a status word
    #[error("Invalid response length: {0}")]
    InvalidResponse(usize),

    /// A card payload arrived on a transition that is not a presence event
    #[error("Unknown card data from reader: {reader}")]
    UnhandledCardData {
        /// Reader the transition came from
        reader: String,
    },

    /// Cancellation was requested while waiting for a state change
    #[error("Shutting down")]
    Shutdown,
}

impl Error {
    /// Wrap a middleware error with the step that produced it
    pub(crate) const fn pcsc(context: &'static str, source: pcsc::Error) -> Self {
        Self::Pcsc { context, source }
    }

    /// The wrapped middleware error, if any
    pub const fn pcsc_error(&self) -> Option<pcsc::Error> {
        match self {
            Self::Pcsc { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Whether this is an elapsed wait with no reader change
    pub const fn is_timeout(&self) -> bool {
        matches!(self.pcsc_error(), Some(pcsc::Error::Timeout))
    }

    /// Whether the card went away between detection and connection
    pub const fn is_card_absent(&self) -> bool {
        matches!(
            self.pcsc_error(),
            Some(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::UnpoweredCard)
        )
    }
}

const fn raw_code(error: &pcsc::Error) -> u32 {
    *error as u32
}
