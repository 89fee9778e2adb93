// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for GSLB reconciliation.
//!
//! This module provides specialized error types for:
//! - Traffic-distribution (MTD) and DNS (Infoblox) gateway calls
//! - Reconciler stage failures surfaced in a FAILED result
//! - Verification failures found after a successful write
//!
//! Gateway outcomes that a reconciler must treat specially (already exists,
//! not found) are distinct variants so stages can match on them instead of
//! inspecting error text.

use thiserror::Error;

/// Typed outcome of a failed gateway call.
///
/// Both the MTD and the DNS gateways report failures through this enum. The
/// HTTP clients classify remote error codes and messages into these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The record being created already exists
    ///
    /// Returned for MTD uniqueness violations, MTD host-exists errors and
    /// Infoblox data-conflict errors. Usually the result of a concurrent creator.
    #[error("{resource} '{name}' already exists")]
    AlreadyExists {
        /// Kind of record (e.g., "MtdBase", "CNAME")
        resource: String,
        /// Name or key of the record
        name: String,
    },

    /// The record does not exist
    #[error("{resource} '{name}' not found")]
    NotFound {
        /// Kind of record (e.g., "MtdHost", "A")
        resource: String,
        /// Name or key of the record
        name: String,
    },

    /// The record exists but holds state incompatible with the request
    #[error("{resource} '{name}' conflicts with existing state: {reason}")]
    Conflict {
        /// Kind of record
        resource: String,
        /// Name or key of the record
        name: String,
        /// What the existing state is
        reason: String,
    },

    /// The gateway rejected the request with one or more error codes
    #[error("{operation} failed with {codes}")]
    Rejected {
        /// Gateway operation (e.g., "createMtdHost")
        operation: String,
        /// Error codes or message reported by the gateway
        codes: String,
    },

    /// The gateway could not be reached or answered with a server error
    #[error("{operation} failed: {reason}")]
    Transport {
        /// Gateway operation
        operation: String,
        /// Connection or server error text
        reason: String,
    },
}

impl GatewayError {
    /// Build an [`GatewayError::AlreadyExists`] error.
    pub fn already_exists(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Build a [`GatewayError::NotFound`] error.
    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Build a [`GatewayError::Rejected`] error.
    pub fn rejected(operation: impl Into<String>, codes: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            codes: codes.into(),
        }
    }

    /// Build a [`GatewayError::Transport`] error.
    pub fn transport(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is transient and the operation may be retried.
    ///
    /// Only transport failures are transient. Remote rejections, conflicts and
    /// existence outcomes are answers, and repeating the call will not change them.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns true for [`GatewayError::AlreadyExists`].
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns true for [`GatewayError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns a short reason code, used in logs and metric labels.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::NotFound { .. } => "NotFound",
            Self::Conflict { .. } => "Conflict",
            Self::Rejected { .. } => "Rejected",
            Self::Transport { .. } => "TransportError",
        }
    }
}

/// A fatal failure of one reconciler stage.
///
/// The rendered message always starts with a stage-specific description and,
/// where a gateway error caused it, ends with the gateway's own text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A gateway call failed in a way the stage cannot absorb
    #[error("{context} : {source}")]
    Gateway {
        /// What the stage was doing
        context: String,
        /// The underlying gateway error
        source: GatewayError,
    },

    /// A DNS alias is already owned by a different canonical name
    #[error("alias {alias} exists already with a different cname : {existing}")]
    AliasConflict {
        /// The lower-cased alias
        alias: String,
        /// Canonical name the alias currently points to
        existing: String,
    },

    /// A CNAME does not resolve to the expected canonical name
    #[error("cname check failed for {alias} : Expected: {expected}, actual: {actual}")]
    CnameMismatch {
        /// The lower-cased alias
        alias: String,
        /// Expected canonical name
        expected: String,
        /// Canonical names actually returned
        actual: String,
    },

    /// A target's cloud is missing from the traffic topology
    #[error("cloud lookup failed : {cloud} not found in data center topology")]
    UnknownCloud {
        /// Cloud name
        cloud: String,
    },

    /// No target carries a usable VIP
    #[error("no usable targets : {app} has no target with a VIP")]
    NoTargets {
        /// Application name
        app: String,
    },

    /// Actual gateway state differs from the desired state
    #[error("{subject} does not match : Expected: {expected}, actual: {actual}")]
    StatusMismatch {
        /// What was compared
        subject: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// The request could not be turned into a desired state
    #[error("invalid request : {0}")]
    InvalidRequest(String),
}

impl ReconcileError {
    /// Wrap a gateway error with a stage description.
    pub fn gateway(context: impl Into<String>, source: GatewayError) -> Self {
        Self::Gateway {
            context: context.into(),
            source,
        }
    }

    /// Returns a short reason code, used in logs and metric labels.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Gateway { source, .. } => source.status_reason(),
            Self::AliasConflict { .. } => "AliasConflict",
            Self::CnameMismatch { .. } => "CnameMismatch",
            Self::UnknownCloud { .. } => "UnknownCloud",
            Self::NoTargets { .. } => "NoTargets",
            Self::StatusMismatch { .. } => "StatusMismatch",
            Self::InvalidRequest(_) => "InvalidRequest",
        }
    }
}

/// Actual remote state diverges from the recomputed expectation.
///
/// Carries the first violated condition only; verification stops at the first failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Verification failed for : {condition}{}", expectation_suffix(.expected.as_deref(), .actual.as_deref()))]
pub struct VerificationError {
    /// Description of the violated condition
    pub condition: String,
    /// Expected value, when the check compared values
    pub expected: Option<String>,
    /// Observed value, when the check compared values
    pub actual: Option<String>,
}

impl VerificationError {
    /// A failed condition with no value comparison.
    pub fn condition(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            expected: None,
            actual: None,
        }
    }

    /// A failed value comparison.
    pub fn mismatch(
        condition: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self {
            condition: condition.into(),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        }
    }
}

fn expectation_suffix(expected: Option<&str>, actual: Option<&str>) -> String {
    match (expected, actual) {
        (Some(expected), Some(actual)) => format!(" :: Expected: {expected}, actual: {actual}"),
        _ => String::new(),
    }
}
