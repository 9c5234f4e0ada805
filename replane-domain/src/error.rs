// /////////////////////////////////////////////////////////////////////////////
// Replane
// Copyright (c) 2025 Replane Authors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Closed taxonomy of error *kinds* the control plane can raise. Use cases
//! let lower-level errors propagate unchanged; the RPC layer (outside this
//! crate) maps each kind to a wire code and HTTP status.

use thiserror::Error;

/// Errors raised anywhere in the identity, permission, config, or proposal
/// pipelines.
///
/// Each variant is a *kind*, not a specific failure; the string payload
/// carries the human-readable detail. `BadRequest` additionally carries an
/// optional machine-readable `code` so clients can branch without parsing
/// the message (`APPROVAL_REQUIRED`, `CONFIG_VERSION_MISMATCH`, ...).
#[derive(Error, Debug, Clone)]
pub enum ReplaneError {
    #[error("bad request: {message}")]
    BadRequest { message: String, code: Option<&'static str> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReplaneError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest { message: msg.into(), code: None }
    }

    pub fn bad_request_with_code(msg: impl Into<String>, code: &'static str) -> Self {
        Self::BadRequest { message: msg.into(), code: Some(code) }
    }

    pub fn approval_required(reason: impl Into<String>) -> Self {
        Self::bad_request_with_code(reason, "APPROVAL_REQUIRED")
    }

    pub fn version_mismatch(reason: impl Into<String>) -> Self {
        Self::bad_request_with_code(reason, "CONFIG_VERSION_MISMATCH")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable code, if any. Only `BadRequest` carries one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::BadRequest { code, .. } => *code,
            _ => None,
        }
    }

    /// Closed-set category name, used for logging and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::TooManyRequests(_) => "too_many_requests",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for ReplaneError {
    fn from(err: serde_json::Error) -> Self {
        ReplaneError::bad_request(format!("invalid JSON: {err}"))
    }
}

pub type DomainResult<T> = Result<T, ReplaneError>;
