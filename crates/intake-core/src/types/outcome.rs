//! Validation outcome reporting.

use std::fmt;

use serde::Serialize;

use crate::UploadError;

/// States of the per-file validation state machine.
///
/// ```text
/// Staged ──policy fails──▶ RejectedPre
///   │
///   └─▶ Written ──byte checks fail──▶ RejectedPost (file deleted)
///          │
///          └─▶ Accepted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// Bytes are in the staging area, nothing decided yet.
    Staged,
    /// Rejected from declared metadata; the filesystem was not touched.
    RejectedPre,
    /// Bytes are at their final path, awaiting byte-level checks.
    Written,
    /// Rejected after writing; the written file was removed.
    RejectedPost,
    /// Every check passed and the file was retained.
    Accepted,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::RejectedPre => "rejected_pre",
            Self::Written => "written",
            Self::RejectedPost => "rejected_post",
            Self::Accepted => "accepted",
        };
        f.write_str(name)
    }
}

/// Summary of a validation decision, suitable for logs and API responses.
///
/// A file is either fully retained (`accepted`) or fully removed; there is no
/// partially applied state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Whether the file was accepted.
    pub accepted: bool,

    /// Final state reached.
    pub stage: ValidationStage,

    /// Machine-readable reason for a rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<&'static str>,

    /// Human-readable detail for a rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationOutcome {
    /// Outcome for an accepted file.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            accepted: true,
            stage: ValidationStage::Accepted,
            reason_code: None,
            detail: None,
        }
    }

    /// Outcome for a rejected file.
    ///
    /// Policy violations are pre-write rejections; everything else happened
    /// after the bytes were written.
    #[must_use]
    pub fn rejected(error: &UploadError) -> Self {
        let stage = if error.is_policy_violation()
            || matches!(error, UploadError::UnknownCategory { .. })
        {
            ValidationStage::RejectedPre
        } else {
            ValidationStage::RejectedPost
        };

        Self {
            accepted: false,
            stage,
            reason_code: Some(error.reason_code()),
            detail: Some(error.to_string()),
        }
    }

    /// Builds an outcome from a pipeline result.
    #[must_use]
    pub fn from_result<T>(result: &crate::Result<T>) -> Self {
        match result {
            Ok(_) => Self::accepted(),
            Err(err) => Self::rejected(err),
        }
    }
}
