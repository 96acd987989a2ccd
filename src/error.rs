//! Unified error type.

/// Boxed error used for validator and handler failures whose concrete type
/// belongs to the caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by handlers, middleware and the [`Ctx`](crate::Ctx)
/// body helpers.
///
/// Anything a handler or middleware returns out of the chain is written by the
/// router as a plain-text body at the status the context carries (500 if the
/// handler never set one). Body helpers return their errors to the caller and
/// never write a response on their own.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request body was required (POST, PUT, PATCH, DELETE) but empty.
    #[error("empty body")]
    EmptyBody,

    /// The request body was not valid JSON for the requested type.
    #[error("invalid body")]
    InvalidBody(#[source] serde_json::Error),

    /// The validator rejected a decoded body. Carries the validator's error as-is.
    #[error(transparent)]
    Validation(BoxError),

    /// A middleware or handler aborted the chain.
    #[error(transparent)]
    Handler(BoxError),

    /// Serialising an outbound body failed.
    #[error(transparent)]
    Encode(serde_json::Error),

    /// Binding or accepting on the listening socket failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A handler failure carrying `message` verbatim.
    ///
    /// ```rust
    /// let err = waypost::Error::msg("forbidden");
    /// assert_eq!(err.to_string(), "forbidden");
    /// ```
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Handler(message.into())
    }

    /// Wraps any error as a handler failure.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// The validator's original error, if this is a validation failure.
    pub fn validation_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Validation(err) => Some(&**err),
            _ => None,
        }
    }
}
