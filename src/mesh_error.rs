//! BoundaryError: Unified error type for nek-boundaries public APIs
//!
//! Every failure this crate reports is fatal at this layer: collective
//! transports give no partial-failure semantics, so nothing here is retried.

use thiserror::Error;

/// Unified error type for face matching and ghost-node marking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// A collective or point-to-point transport call failed.
    #[error("improper use: collective `{operation}` failed (peer {peer:?}): {reason}")]
    CommError {
        operation: &'static str,
        peer: Option<usize>,
        reason: String,
    },
    /// Structurally unimplemented ghost exchange.
    #[error("improper use: `{0}` is not supported by Nek domain boundaries")]
    UnsupportedExchange(&'static str),
    /// Ghost computation requested before `configure`.
    #[error("domain layout has not been configured")]
    NotConfigured,
    /// Block dimensions must all be at least one node.
    #[error("invalid block dimensions {0:?}")]
    InvalidBlockDims([usize; 3]),
    /// A domain id fell outside `0..n_domains`.
    #[error("domain id {domain} out of range for {n_domains} domains")]
    DomainOutOfRange { domain: i32, n_domains: usize },
    /// A mesh block does not hold the configured number of points.
    #[error("block {block} holds {got} points, expected {expected}")]
    BlockSizeMismatch {
        block: usize,
        expected: usize,
        got: usize,
    },
    /// The configured coordinator rank is not part of the worker group.
    #[error("coordinator rank {coordinator} outside a group of {size} workers")]
    InvalidCoordinator { coordinator: usize, size: usize },
    /// A domain's node slice does not hold the configured number of points.
    #[error("domain {domain} covers {got} points, expected {expected}")]
    DomainSizeMismatch {
        domain: i32,
        expected: usize,
        got: usize,
    },
    /// Domain ids and mesh blocks disagree in length.
    #[error("{domains} domain ids supplied for {blocks} mesh blocks")]
    MismatchedInputs { domains: usize, blocks: usize },
}

impl BoundaryError {
    /// True for the fatal "improper use" signals surfaced to the host.
    pub fn is_improper_use(&self) -> bool {
        matches!(
            self,
            BoundaryError::CommError { .. } | BoundaryError::UnsupportedExchange(_)
        )
    }

    pub(crate) fn comm(operation: &'static str, peer: Option<usize>, reason: impl Into<String>) -> Self {
        BoundaryError::CommError {
            operation,
            peer,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improper_use_names_the_collective() {
        let err = BoundaryError::comm("all_to_all_counts", Some(3), "short read");
        assert!(err.is_improper_use());
        let msg = err.to_string();
        assert!(msg.contains("all_to_all_counts"));
        assert!(msg.contains("improper use"));
    }

    #[test]
    fn config_errors_are_not_improper_use() {
        assert!(!BoundaryError::NotConfigured.is_improper_use());
        assert!(!BoundaryError::InvalidCoordinator { coordinator: 2, size: 2 }.is_improper_use());
        assert!(BoundaryError::UnsupportedExchange("exchange_mesh").is_improper_use());
    }
}
