//! Provider errors and the diagnostics reported to the configuration engine

use serde::Serialize;
use thiserror::Error;

use crate::retry::RetryError;
use crate::state::DynamicValue;
use crate::waiter::WaitError;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] cirrus_common::Error),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ProviderError>,
    },

    /// The mutation was issued but the handler failed afterwards; `state`
    /// is the last known state so the engine can reconcile.
    #[error("{source}")]
    Incomplete {
        state: Box<DynamicValue>,
        #[source]
        source: Box<ProviderError>,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure taxonomy surfaced with every error diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientPoll,
    NotFound,
    UnexpectedState,
    Timeout,
    Cancelled,
    Api,
    Config,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Api(e) if e.is_not_found() => ErrorKind::NotFound,
            ProviderError::Api(cirrus_common::Error::InvalidConfig(_)) => ErrorKind::Config,
            ProviderError::Api(_) => ErrorKind::Api,
            ProviderError::Wait(e) => match e {
                WaitError::Poll { .. } => ErrorKind::TransientPoll,
                WaitError::NotFound { .. } => ErrorKind::NotFound,
                WaitError::UnexpectedState { .. } => ErrorKind::UnexpectedState,
                WaitError::Timeout { .. } => ErrorKind::Timeout,
                WaitError::Cancelled { .. } => ErrorKind::Cancelled,
            },
            ProviderError::Retry(RetryError::Cancelled { .. }) => ErrorKind::Cancelled,
            ProviderError::Retry(e) if e.is_not_found() => ErrorKind::NotFound,
            ProviderError::Retry(_) => ErrorKind::Api,
            ProviderError::Context { source, .. } | ProviderError::Incomplete { source, .. } => {
                source.kind()
            }
            ProviderError::UnknownResourceType(_) | ProviderError::InvalidConfig(_) => {
                ErrorKind::Config
            }
        }
    }

    /// Last known state carried by an [`Incomplete`](Self::Incomplete) error
    pub fn partial_state(&self) -> Option<&DynamicValue> {
        match self {
            ProviderError::Incomplete { state, .. } => Some(state),
            ProviderError::Context { source, .. } => source.partial_state(),
            _ => None,
        }
    }

    pub fn incomplete(state: DynamicValue, source: impl Into<ProviderError>) -> Self {
        ProviderError::Incomplete {
            state: Box::new(state),
            source: Box::new(source.into()),
        }
    }
}

/// Attach a description of the failed step to an error
pub trait ErrorContext<T> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<ProviderError>> ErrorContext<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| ProviderError::Context {
            context: f(),
            source: Box::new(e.into()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
            kind: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn from_error(summary: impl Into<String>, err: &ProviderError) -> Self {
        Self {
            kind: Some(err.kind()),
            ..Self::error(summary, err.to_string())
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
