/// Error code CloudFormation returns when a stack cannot be found, amongst
/// other request validation failures.
pub(crate) const VALIDATION_ERROR_CODE: &str = "ValidationError";

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("no stack found: {0}")]
    NoStack(String),
    #[error("aws error {code}: {message}")]
    Service { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("waiting for stack failed: {0}")]
    Wait(String),
    #[error("unexpected value {value:?} for {field}")]
    UnexpectedValue { field: &'static str, value: String },
    #[error("writing output")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an error from a service error code and message, keeping the
    /// validation error class apart from other service errors.
    pub(crate) fn from_service(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some(VALIDATION_ERROR_CODE) => Error::Validation(message),
            Some(code) => Error::Service {
                code: code.to_string(),
                message,
            },
            None => Error::Transport(message),
        }
    }

    /// Errors raised by the remote API, as opposed to local validation.
    pub(crate) fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::NoStack(_)
                | Error::Service { .. }
                | Error::Transport(_)
                | Error::Wait(_)
        )
    }

    /// The "stack does not exist" class, expected once a delete finishes.
    /// CloudFormation reports a missing stack as a validation error.
    pub(crate) fn is_stack_missing(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::NoStack(_))
    }
}
