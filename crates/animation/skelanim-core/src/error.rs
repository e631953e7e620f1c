//! Error types for skeleton construction, container setup and data loading.
//!
//! Per-tick evaluation never returns these: lookup misses and rejected edits
//! are reported through sentinel values instead.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimError {
    /// Two bones share a name
    #[error("Duplicate bone name: {name}")]
    DuplicateBoneName { name: String },

    /// A bone references a parent stored at or after its own index
    #[error("Bone {bone} ({name}) has parent {parent} which does not precede it")]
    ParentAfterChild {
        bone: usize,
        name: String,
        parent: usize,
    },

    #[error("Bone not found: {name}")]
    BoneNotFound { name: String },

    #[error("Bone index {index} out of range (bone count {count})")]
    InvalidBoneIndex { index: usize, count: usize },

    /// Reference pose override length differs from the compact bone count
    #[error("Reference pose has {actual} bones, expected {expected}")]
    RefPoseSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid frame rate: {rate}")]
    InvalidFrameRate { rate: i32 },

    /// The data controller refused a track edit while loading
    #[error("Track rejected: {name}: {reason}")]
    TrackRejected { name: String, reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    #[error("Animation error: {message}")]
    Generic { message: String },
}

impl AnimError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateBoneName { .. }
            | Self::ParentAfterChild { .. }
            | Self::BoneNotFound { .. } => "skeleton",
            Self::InvalidBoneIndex { .. } | Self::RefPoseSizeMismatch { .. } => "container",
            Self::InvalidFrameRate { .. } | Self::TrackRejected { .. } => "data",
            Self::Serialization { .. } => "serialization",
            Self::Generic { .. } => "generic",
        }
    }
}

impl From<serde_json::Error> for AnimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = AnimError::new("test error");
        assert!(matches!(error, AnimError::Generic { .. }));
        assert_eq!(error.to_string(), "Animation error: test error");
    }

    #[test]
    fn test_error_categories() {
        let skeleton = AnimError::DuplicateBoneName {
            name: "spine".to_string(),
        };
        assert_eq!(skeleton.category(), "skeleton");

        let container = AnimError::RefPoseSizeMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(container.category(), "container");

        assert_eq!(AnimError::InvalidFrameRate { rate: 0 }.category(), "data");
    }

    #[test]
    fn test_serialization() {
        let error = AnimError::BoneNotFound {
            name: "hand_l".to_string(),
        };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: AnimError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
