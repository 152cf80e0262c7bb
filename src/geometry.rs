//! Shapes, transforms and solids.
//!
//! A [`Solid`] is a base primitive centred on a baked origin plus the
//! ordered history of volumes carved out of it. Volume and point membership
//! are answered against that history, so every cut sees the result of the
//! cuts before it.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector2, Vector3};
use serde::Serialize;

use crate::error::{CompositionError, ReplicaError, Result};

/// Smallest volume (m³) that still counts as material.
pub const VOLUME_EPSILON: f64 = 1e-15;

const ANGLE_EPSILON: f64 = 1e-9;
const SCALE_EPSILON: f64 = 1e-12;

/// Samples per axis when a cut has to be integrated numerically.
const OVERLAP_SAMPLES: usize = 32;

/// Local placement of a part relative to its parent (or the world).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Rigid part of the transform (scale is expected to be baked).
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    pub fn set_isometry(&mut self, iso: &Isometry3<f64>) {
        self.translation = iso.translation.vector;
        self.rotation = iso.rotation;
    }

    pub fn has_unit_scale(&self) -> bool {
        (self.scale - Vector3::repeat(1.0)).amax() <= SCALE_EPSILON
    }

    pub fn has_identity_rotation(&self) -> bool {
        self.rotation.angle() <= ANGLE_EPSILON
    }
}

/// Primitive geometry, centred on its own origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Box { size: Vector3<f64> },
    /// Axis along +Z.
    Cylinder { radius: f64, depth: f64 },
    /// Lies in the XY plane; has area but no volume.
    Plane { size: Vector2<f64> },
    /// Geometry-free placement handle.
    Anchor,
}

impl Shape {
    pub fn unit_box() -> Self {
        Shape::Box {
            size: Vector3::repeat(1.0),
        }
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        match *self {
            Shape::Box { size } => size / 2.0,
            Shape::Cylinder { radius, depth } => Vector3::new(radius, radius, depth / 2.0),
            Shape::Plane { size } => Vector3::new(size.x / 2.0, size.y / 2.0, 0.0),
            Shape::Anchor => Vector3::zeros(),
        }
    }

    pub fn volume(&self) -> f64 {
        match *self {
            Shape::Box { size } => size.x * size.y * size.z,
            Shape::Cylinder { radius, depth } => std::f64::consts::PI * radius * radius * depth,
            Shape::Plane { .. } | Shape::Anchor => 0.0,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.volume() <= VOLUME_EPSILON
    }

    /// Point membership in shape-local coordinates (boundary counts as inside).
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        match *self {
            Shape::Box { size } => {
                let h = size / 2.0;
                p.x.abs() <= h.x && p.y.abs() <= h.y && p.z.abs() <= h.z
            }
            Shape::Cylinder { radius, depth } => {
                p.x * p.x + p.y * p.y <= radius * radius && p.z.abs() <= depth / 2.0
            }
            Shape::Plane { .. } | Shape::Anchor => false,
        }
    }

    /// Commit a per-axis scale into the dimensions.
    pub fn scaled(&self, s: &Vector3<f64>) -> Result<Shape> {
        Ok(match *self {
            Shape::Box { size } => Shape::Box {
                size: size.component_mul(s),
            },
            Shape::Cylinder { radius, depth } => {
                if (s.x - s.y).abs() > SCALE_EPSILON {
                    return Err(ReplicaError::invalid(
                        "scale",
                        format!("cylinder needs equal x/y scale, got {} and {}", s.x, s.y),
                    ));
                }
                Shape::Cylinder {
                    radius: radius * s.x,
                    depth: depth * s.z,
                }
            }
            Shape::Plane { size } => Shape::Plane {
                size: Vector2::new(size.x * s.x, size.y * s.y),
            },
            Shape::Anchor => Shape::Anchor,
        })
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    pub fn from_center_half(center: Point3<f64>, half: Vector3<f64>) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point3<f64>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.inf(&p),
            max: acc.max.sup(&p),
        }))
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Overlap with strictly positive extent on every axis.
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.sup(&other.min);
        let max = self.max.inf(&other.max);
        let extent = max - min;
        (extent.x > 0.0 && extent.y > 0.0 && extent.z > 0.0).then_some(Aabb { min, max })
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        let tol = 1e-12;
        (0..3).all(|i| other.min[i] >= self.min[i] - tol && other.max[i] <= self.max[i] + tol)
    }

    /// Bounds of this box after a rigid motion.
    pub fn transformed(&self, iso: &Isometry3<f64>) -> Aabb {
        let corners = (0..8).map(|i| {
            let pick = |bit: usize, axis: usize| {
                if i & bit == 0 {
                    self.min[axis]
                } else {
                    self.max[axis]
                }
            };
            iso.transform_point(&Point3::new(pick(1, 0), pick(2, 1), pick(4, 2)))
        });
        // Eight corners always exist.
        Aabb::from_points(corners).unwrap_or(*self)
    }
}

/// A volume carved out of a solid, placed in the solid's local frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutVolume {
    pub tool: String,
    pub shape: Shape,
    pub placement: Isometry3<f64>,
    pub removed: f64,
}

impl CutVolume {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half(Point3::origin(), self.shape.half_extents())
            .transformed(&self.placement)
    }

    fn contains(&self, p: &Point3<f64>) -> bool {
        self.shape.contains(&self.placement.inverse_transform_point(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solid {
    shape: Shape,
    origin: Vector3<f64>,
    cuts: Vec<CutVolume>,
}

impl Solid {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            origin: Vector3::zeros(),
            cuts: Vec::new(),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Offset of the primitive's centre from the part origin.
    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn cuts(&self) -> &[CutVolume] {
        &self.cuts
    }

    /// Bounds of the base primitive; cuts never grow or shrink them.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half(Point3::from(self.origin), self.shape.half_extents())
    }

    pub fn volume(&self) -> f64 {
        let removed: f64 = self.cuts.iter().map(|c| c.removed).sum();
        (self.shape.volume() - removed).max(0.0)
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        self.shape.contains(&(p - self.origin)) && !self.cuts.iter().any(|c| c.contains(p))
    }

    pub(crate) fn scaled(&self, s: &Vector3<f64>) -> Result<Solid> {
        let uniform = (s.x - s.y).abs() <= SCALE_EPSILON && (s.y - s.z).abs() <= SCALE_EPSILON;
        let mut cuts = Vec::with_capacity(self.cuts.len());
        for cut in &self.cuts {
            if !uniform && cut.placement.rotation.angle() > ANGLE_EPSILON {
                return Err(ReplicaError::invalid(
                    "scale",
                    format!("cannot apply non-uniform scale over rotated cut `{}`", cut.tool),
                ));
            }
            let mut placement = cut.placement;
            placement.translation.vector = placement.translation.vector.component_mul(s);
            cuts.push(CutVolume {
                tool: cut.tool.clone(),
                shape: cut.shape.scaled(s)?,
                placement,
                removed: cut.removed * s.x * s.y * s.z,
            });
        }
        Ok(Solid {
            shape: self.shape.scaled(s)?,
            origin: self.origin.component_mul(s),
            cuts,
        })
    }

    pub(crate) fn translated(&self, offset: &Vector3<f64>) -> Solid {
        let shift = Translation3::from(*offset);
        Solid {
            shape: self.shape,
            origin: self.origin + offset,
            cuts: self
                .cuts
                .iter()
                .map(|c| CutVolume {
                    placement: shift * c.placement,
                    ..c.clone()
                })
                .collect(),
        }
    }

    /// Carve `tool` (placed in this solid's frame) out of the current
    /// geometry and return the removed volume.
    pub(crate) fn subtract(
        &mut self,
        target: &str,
        tool: &str,
        tool_shape: Shape,
        placement: Isometry3<f64>,
    ) -> std::result::Result<f64, CompositionError> {
        if self.volume() <= VOLUME_EPSILON {
            return Err(CompositionError::DegenerateTarget {
                target: target.to_string(),
            });
        }
        if tool_shape.is_degenerate() {
            return Err(CompositionError::DegenerateTool {
                tool: tool.to_string(),
            });
        }
        let no_overlap = || CompositionError::NoOverlap {
            target: target.to_string(),
            tool: tool.to_string(),
        };

        let base = self.bounds();
        let tool_bounds = Aabb::from_center_half(Point3::origin(), tool_shape.half_extents())
            .transformed(&placement);
        let overlap = base.intersection(&tool_bounds).ok_or_else(no_overlap)?;

        let untouched = !self
            .cuts
            .iter()
            .any(|c| c.bounds().intersection(&tool_bounds).is_some());
        let base_is_box = matches!(self.shape, Shape::Box { .. });
        let axis_aligned_box =
            matches!(tool_shape, Shape::Box { .. }) && placement.rotation.angle() <= ANGLE_EPSILON;

        let removed = if untouched && base_is_box && base.contains_aabb(&tool_bounds) {
            tool_shape.volume()
        } else if untouched && base_is_box && axis_aligned_box {
            overlap.volume()
        } else {
            self.integrate_overlap(&tool_shape, &placement, &overlap)
        };

        if removed <= VOLUME_EPSILON {
            return Err(no_overlap());
        }

        self.cuts.push(CutVolume {
            tool: tool.to_string(),
            shape: tool_shape,
            placement,
            removed,
        });
        Ok(removed)
    }

    /// Midpoint-rule estimate of the material shared by this solid and the tool.
    fn integrate_overlap(&self, tool: &Shape, placement: &Isometry3<f64>, region: &Aabb) -> f64 {
        let n = OVERLAP_SAMPLES;
        let step = region.size() / n as f64;
        let mut hits = 0usize;
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    let p = region.min
                        + Vector3::new(
                            (i as f64 + 0.5) * step.x,
                            (j as f64 + 0.5) * step.y,
                            (k as f64 + 0.5) * step.z,
                        );
                    if self.contains(&p) && tool.contains(&placement.inverse_transform_point(&p)) {
                        hits += 1;
                    }
                }
            }
        }
        region.volume() * hits as f64 / (n * n * n) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn box_solid(x: f64, y: f64, z: f64) -> Solid {
        Solid::new(Shape::Box {
            size: Vector3::new(x, y, z),
        })
    }

    fn at(x: f64, y: f64, z: f64) -> Isometry3<f64> {
        Isometry3::translation(x, y, z)
    }

    #[test]
    fn contained_box_cut_removes_exact_volume() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Box {
            size: Vector3::new(0.2, 0.3, 0.4),
        };
        let removed = solid.subtract("t", "cut", tool, at(0.1, 0.0, 0.0)).unwrap();
        assert_relative_eq!(removed, 0.024, epsilon = 1e-12);
        assert_relative_eq!(solid.volume(), 1.0 - 0.024, epsilon = 1e-12);
        assert_eq!(solid.bounds(), box_solid(1.0, 1.0, 1.0).bounds());
    }

    #[test]
    fn partial_box_cut_uses_overlap() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Box {
            size: Vector3::new(0.2, 0.2, 0.2),
        };
        // Half of the tool pokes out through the +X face.
        let removed = solid.subtract("t", "cut", tool, at(0.5, 0.0, 0.0)).unwrap();
        assert_relative_eq!(removed, 0.004, epsilon = 1e-12);
    }

    #[test]
    fn disjoint_tool_is_rejected() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Box {
            size: Vector3::new(0.2, 0.2, 0.2),
        };
        let err = solid.subtract("t", "cut", tool, at(3.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CompositionError::NoOverlap { .. }));
        assert!(solid.cuts().is_empty());
    }

    #[test]
    fn flat_tool_is_degenerate() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Plane {
            size: Vector2::new(0.2, 0.2),
        };
        let err = solid.subtract("t", "sheet", tool, at(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CompositionError::DegenerateTool { .. }));
    }

    #[test]
    fn later_cut_sees_earlier_cut() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Box {
            size: Vector3::new(0.4, 0.4, 0.4),
        };
        solid.subtract("t", "first", tool, at(0.0, 0.0, 0.0)).unwrap();
        // Same pocket again: nothing left to remove there.
        let err = solid.subtract("t", "second", tool, at(0.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CompositionError::NoOverlap { .. }));
        assert_relative_eq!(solid.volume(), 1.0 - 0.064, epsilon = 1e-12);
    }

    #[test]
    fn cylinder_cut_is_estimated() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Cylinder {
            radius: 0.25,
            depth: 2.0,
        };
        // Through-hole: only the middle unit of depth hits material.
        let removed = solid.subtract("t", "bore", tool, at(0.0, 0.0, 0.0)).unwrap();
        let expected = std::f64::consts::PI * 0.25 * 0.25;
        assert_relative_eq!(removed, expected, max_relative = 0.05);
    }

    #[test]
    fn translated_solid_moves_cut_history() {
        let mut solid = box_solid(1.0, 1.0, 1.0);
        let tool = Shape::Box {
            size: Vector3::new(0.2, 0.2, 0.2),
        };
        solid.subtract("t", "cut", tool, at(0.0, 0.0, 0.0)).unwrap();
        let moved = solid.translated(&Vector3::new(0.0, 0.5, 0.0));
        assert!(!moved.contains(&Point3::new(0.0, 0.5, 0.0)));
        assert!(moved.contains(&Point3::new(0.3, 0.5, 0.0)));
        assert_relative_eq!(moved.volume(), solid.volume());
    }

    #[test]
    fn cylinder_rejects_elliptic_scale() {
        let shape = Shape::Cylinder {
            radius: 1.0,
            depth: 1.0,
        };
        assert!(shape.scaled(&Vector3::new(1.0, 2.0, 1.0)).is_err());
        let scaled = shape.scaled(&Vector3::new(0.5, 0.5, 3.0)).unwrap();
        assert_eq!(
            scaled,
            Shape::Cylinder {
                radius: 0.5,
                depth: 3.0
            }
        );
    }

    #[test]
    fn rotated_bounds_grow() {
        let b = Aabb::from_center_half(Point3::origin(), Vector3::new(1.0, 0.5, 0.5));
        let iso = Isometry3::rotation(Vector3::z() * std::f64::consts::FRAC_PI_2);
        let r = b.transformed(&iso);
        assert_relative_eq!(r.size().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(r.size().y, 2.0, epsilon = 1e-12);
    }
}
