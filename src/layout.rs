//! Evenly spaced positions for repeated sub-parts.
//!
//! Positions are centred in the span with equal padding at both ends:
//! `start + spacing * (i + 1)` where `spacing = span / (count + 1)`.

use crate::error::{ReplicaError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArraySpec {
    count: usize,
    span: f64,
    start: f64,
}

impl ArraySpec {
    pub fn new(count: i64, span: f64, start: f64) -> Result<Self> {
        let count = usize::try_from(count).map_err(|_| {
            ReplicaError::invalid("count", format!("expected a non-negative count, got {count}"))
        })?;
        if !span.is_finite() {
            return Err(ReplicaError::invalid("span", format!("expected a finite span, got {span}")));
        }
        if !start.is_finite() {
            return Err(ReplicaError::invalid("start", format!("expected a finite start, got {start}")));
        }
        Ok(Self { count, span, start })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn spacing(&self) -> f64 {
        self.span / (self.count as f64 + 1.0)
    }

    pub fn positions(&self) -> Vec<f64> {
        let spacing = self.spacing();
        (0..self.count)
            .map(|i| self.start + spacing * (i as f64 + 1.0))
            .collect()
    }
}

/// `count` centred positions across `span`, beginning at `start`.
pub fn layout(count: i64, span: f64, start: f64) -> Result<Vec<f64>> {
    Ok(ArraySpec::new(count, span, start)?.positions())
}

/// Positions centred on `center`: the span runs from `center - span / 2`.
pub fn layout_centered(count: i64, span: f64, center: f64) -> Result<Vec<f64>> {
    layout(count, span, center - span / 2.0)
}
