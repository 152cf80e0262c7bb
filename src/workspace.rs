//! The scene store: every part and material lives here behind a handle.
//!
//! There is no notion of a "current" object. Builders receive handles from
//! the factory functions and pass them on explicitly.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::error::{ReplicaError, Result};
use crate::geometry::{Aabb, Solid, Transform};
use crate::hierarchy::AssemblyHierarchy;
use crate::material::Material;

new_key_type! {
    pub struct PartId;
    pub struct MaterialId;
}

/// A modification recorded on a part, in application order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modifier {
    Bevel { width: f64, segments: u32 },
    Subdivision { levels: u32 },
    BooleanDifference { tool: String, removed_volume: f64 },
}

#[derive(Debug, Clone)]
pub struct Part {
    pub(crate) name: String,
    pub(crate) transform: Transform,
    pub(crate) solid: Solid,
    pub(crate) modifiers: Vec<Modifier>,
    pub(crate) materials: Vec<MaterialId>,
}

impl Part {
    pub(crate) fn new(name: impl Into<String>, solid: Solid) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            solid,
            modifiers: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn solid(&self) -> &Solid {
        &self.solid
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    /// Enclosed volume after every applied cut.
    pub fn volume(&self) -> f64 {
        self.solid.volume()
    }

    /// Bounds in the part's own frame.
    pub fn bounds(&self) -> Aabb {
        self.solid.bounds()
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    parts: SlotMap<PartId, Part>,
    materials: SlotMap<MaterialId, Material>,
    pub(crate) hierarchy: AssemblyHierarchy,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every part, material and relation.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.materials.clear();
        self.hierarchy.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub(crate) fn insert_part(&mut self, part: Part) -> PartId {
        self.parts.insert(part)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn contains_part(&self, id: PartId) -> bool {
        self.parts.contains_key(id)
    }

    pub fn get(&self, id: PartId) -> Result<&Part> {
        self.parts.get(id).ok_or(ReplicaError::UnknownPart(id))
    }

    pub(crate) fn get_mut(&mut self, id: PartId) -> Result<&mut Part> {
        self.parts.get_mut(id).ok_or(ReplicaError::UnknownPart(id))
    }

    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts.iter()
    }

    pub fn find(&self, name: &str) -> Option<PartId> {
        self.parts
            .iter()
            .find_map(|(id, part)| (part.name == name).then_some(id))
    }

    /// Remove a part. Its children stay in the workspace as roots; its
    /// materials stay in the material table.
    pub fn remove_part(&mut self, id: PartId) -> Result<Part> {
        let part = self.parts.remove(id).ok_or(ReplicaError::UnknownPart(id))?;
        let orphans = self.hierarchy.forget(id);
        debug!(part = %part.name, orphans, "removed part");
        Ok(part)
    }

    pub fn set_location(&mut self, id: PartId, location: Vector3<f64>) -> Result<()> {
        self.get_mut(id)?.transform.translation = location;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: PartId, rotation: UnitQuaternion<f64>) -> Result<()> {
        self.get_mut(id)?.transform.rotation = rotation;
        Ok(())
    }

    pub fn set_scale(&mut self, id: PartId, scale: Vector3<f64>) -> Result<()> {
        if !scale.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(ReplicaError::invalid(
                "scale",
                format!("expected positive finite factors, got {scale:?}"),
            ));
        }
        self.get_mut(id)?.transform.scale = scale;
        Ok(())
    }

    pub fn add_modifier(&mut self, id: PartId, modifier: Modifier) -> Result<()> {
        match &modifier {
            Modifier::Bevel { width, segments } => {
                crate::error::require_positive("bevel width", *width)?;
                if *segments == 0 {
                    return Err(ReplicaError::invalid("bevel segments", "must be at least 1"));
                }
            }
            Modifier::Subdivision { levels: 0 } => {
                return Err(ReplicaError::invalid("subdivision levels", "must be at least 1"));
            }
            _ => {}
        }
        self.get_mut(id)?.modifiers.push(modifier);
        Ok(())
    }

    /// Retune the part's bevel in place, or add one if it has none yet.
    pub fn set_bevel(&mut self, id: PartId, width: f64, segments: u32) -> Result<()> {
        let bevel = Modifier::Bevel { width, segments };
        let existing = self
            .get(id)?
            .modifiers
            .iter()
            .position(|m| matches!(m, Modifier::Bevel { .. }));
        match existing {
            Some(index) => {
                // Validate through add_modifier, then move the new bevel into
                // the old one's slot.
                self.add_modifier(id, bevel)?;
                let modifiers = &mut self.get_mut(id)?.modifiers;
                modifiers.swap_remove(index);
            }
            None => self.add_modifier(id, bevel)?,
        }
        Ok(())
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter()
    }

    /// Append a material slot to a part; a material is listed at most once.
    pub fn assign_material(&mut self, part: PartId, material: MaterialId) -> Result<()> {
        if !self.materials.contains_key(material) {
            return Err(ReplicaError::UnknownMaterial(material));
        }
        let part = self.get_mut(part)?;
        if !part.materials.contains(&material) {
            part.materials.push(material);
        }
        Ok(())
    }

    /// Replace every material slot on a part with a single material.
    pub fn replace_materials(&mut self, part: PartId, material: MaterialId) -> Result<()> {
        if !self.materials.contains_key(material) {
            return Err(ReplicaError::UnknownMaterial(material));
        }
        let part = self.get_mut(part)?;
        part.materials.clear();
        part.materials.push(material);
        Ok(())
    }

    /// Drop materials no part references. Returns how many were removed.
    pub fn purge_unused_materials(&mut self) -> usize {
        let parts = &self.parts;
        let before = self.materials.len();
        self.materials
            .retain(|id, _| parts.values().any(|p| p.materials.contains(&id)));
        before - self.materials.len()
    }

    pub fn hierarchy(&self) -> &AssemblyHierarchy {
        &self.hierarchy
    }
}
