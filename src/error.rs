use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::wire::problem::{AcmeProblem, AcmeProblemType};

pub type AcmeResult<T> = Result<T, AcmeError>;

#[derive(Error, Debug)]
pub enum AcmeError {
    /// Transport failure before any response was received. Retriable by the caller.
    #[error("network error: {0}")]
    Network(http_client::Error),

    /// A response that doesn't match the wire contract: bad JSON shape, a
    /// missing required field, an unparseable header, ...
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A problem+json document returned by the server.
    #[error("{0}")]
    Server(AcmeProblem),

    /// A `rateLimited` problem, with the server's `Retry-After` attached.
    #[error("rate limited: {problem}")]
    RateLimited {
        problem: AcmeProblem,
        retry_after: Option<DateTime<Utc>>,
    },

    #[error(transparent)]
    Crypto(anyhow::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("missing expected field {0}")]
    MissingExpectedField(&'static str),

    #[error("missing expected header {0}")]
    MissingExpectedHeader(&'static str),

    /// The caller violated a precondition: a CSR with no identifiers, an
    /// unloaded lazy resource read before `fetch()`/`update()`, a certificate
    /// accessed before an order finalized, ...
    #[error("usage error: {0}")]
    Usage(String),
}

impl AcmeError {
    /// The problem's typed error kind, for `Server`/`RateLimited` variants.
    pub fn problem_type(&self) -> Option<AcmeProblemType> {
        match self {
            AcmeError::Server(problem) => Some(problem.problem_type()),
            AcmeError::RateLimited { problem, .. } => Some(problem.problem_type()),
            _ => None,
        }
    }

    pub(crate) fn from_problem(problem: AcmeProblem, retry_after: Option<DateTime<Utc>>) -> Self {
        if problem.has_type(AcmeProblemType::RateLimited) {
            AcmeError::RateLimited {
                problem,
                retry_after,
            }
        } else {
            AcmeError::Server(problem)
        }
    }
}

impl From<http_client::Error> for AcmeError {
    fn from(err: http_client::Error) -> Self {
        AcmeError::Network(err)
    }
}
