//! Error taxonomy shared by every builder.

use std::path::PathBuf;

use thiserror::Error;

use crate::workspace::{MaterialId, PartId};

/// Failures of a single boolean cut.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("tool `{tool}` does not overlap target `{target}`")]
    NoOverlap { target: String, tool: String },

    #[error("tool `{tool}` has no volume")]
    DegenerateTool { tool: String },

    #[error("target `{target}` has no volume to cut")]
    DegenerateTarget { target: String },

    #[error("part `{name}` cannot be cut by itself")]
    SelfCut { name: String },
}

#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("missing asset {}: {reason}", path.display())]
    MissingAsset { path: PathBuf, reason: String },

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error("part {0:?} is not in the workspace")]
    UnknownPart(PartId),

    #[error("material {0:?} is not in the workspace")]
    UnknownMaterial(MaterialId),

    #[error("attaching `{child}` to `{parent}` would create a cycle")]
    HierarchyCycle { child: String, parent: String },

    #[error("export of `{name}` failed: {reason}")]
    Export { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReplicaError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplicaError>;

/// Reject zero, negative and non-finite physical dimensions.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ReplicaError::invalid(
            name,
            format!("expected a positive finite length, got {value}"),
        ))
    }
}

pub(crate) fn require_unit_interval(name: &'static str, value: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ReplicaError::invalid(
            name,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}
