//! Failure classification shared by the read and write tools.
//!
//! Every warehouse call made on behalf of a tool goes through [`shielded`],
//! which turns errors and panics into an [`ExternalFailure`] so that nothing
//! escapes past the tool boundary.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::InsightsError;

/// Which kind of failure the warehouse call ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The warehouse API reported the error; its text is carried verbatim.
    Api,
    /// Anything else: transport errors, undecodable responses, panics.
    Unexpected,
}

/// A failed warehouse call, ready to be reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFailure {
    pub category: FailureCategory,
    pub message: String,
}

impl ExternalFailure {
    /// Classifies a crate error.
    pub fn from_error(err: &InsightsError) -> Self {
        match err {
            InsightsError::Api(detail) => Self {
                category: FailureCategory::Api,
                message: detail.clone(),
            },
            other => Self {
                category: FailureCategory::Unexpected,
                message: other.to_string(),
            },
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self {
            category: FailureCategory::Unexpected,
            message: format!("warehouse client panicked: {detail}"),
        }
    }

    pub fn is_api(&self) -> bool {
        self.category == FailureCategory::Api
    }
}

impl fmt::Display for ExternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            FailureCategory::Api => write!(f, "An API error occurred: {}", self.message),
            FailureCategory::Unexpected => write!(f, "A general error occurred: {}", self.message),
        }
    }
}

/// Awaits a warehouse call, converting both errors and panics into an [`ExternalFailure`].
pub async fn shielded<T, F>(call: F) -> std::result::Result<T, ExternalFailure>
where
    F: Future<Output = crate::error::Result<T>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ExternalFailure::from_error(&err)),
        Err(payload) => Err(ExternalFailure::from_panic(payload)),
    }
}
