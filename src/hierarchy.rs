//! Parent/child relations between parts.
//!
//! Relations live in one table owned by the workspace rather than on the
//! parts themselves, so cycle checks and queries happen in one place.
//! Attaching never merges geometry.

use nalgebra::{Isometry3, Point3};
use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{ReplicaError, Result};
use crate::geometry::Aabb;
use crate::workspace::{PartId, Workspace};

#[derive(Debug, Default)]
pub struct AssemblyHierarchy {
    parent_of: SecondaryMap<PartId, PartId>,
    children_of: SecondaryMap<PartId, Vec<PartId>>,
}

impl AssemblyHierarchy {
    pub fn parent(&self, child: PartId) -> Option<PartId> {
        self.parent_of.get(child).copied()
    }

    /// Children in attachment order.
    pub fn children(&self, parent: PartId) -> &[PartId] {
        self.children_of.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks from `id`'s parent up to the root.
    pub fn ancestors(&self, id: PartId) -> impl Iterator<Item = PartId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_ancestor(&self, ancestor: PartId, of: PartId) -> bool {
        self.ancestors(of).any(|p| p == ancestor)
    }

    /// Returns false when the pair was already linked.
    fn link(&mut self, child: PartId, parent: PartId) -> bool {
        if self.parent(child) == Some(parent) {
            return false;
        }
        self.unlink(child);
        self.parent_of.insert(child, parent);
        match self.children_of.get_mut(parent) {
            Some(children) => children.push(child),
            None => {
                self.children_of.insert(parent, vec![child]);
            }
        }
        true
    }

    fn unlink(&mut self, child: PartId) -> Option<PartId> {
        let parent = self.parent_of.remove(child)?;
        if let Some(children) = self.children_of.get_mut(parent) {
            children.retain(|&c| c != child);
        }
        Some(parent)
    }

    /// Drop every relation touching `id`; returns how many children were orphaned.
    pub(crate) fn forget(&mut self, id: PartId) -> usize {
        self.unlink(id);
        let children = self.children_of.remove(id).unwrap_or_default();
        for child in &children {
            self.parent_of.remove(*child);
        }
        children.len()
    }

    pub(crate) fn clear(&mut self) {
        self.parent_of.clear();
        self.children_of.clear();
    }
}

fn require_baked(ws: &Workspace, id: PartId) -> Result<()> {
    let part = ws.get(id)?;
    if part.transform().has_unit_scale() {
        Ok(())
    } else {
        Err(ReplicaError::invalid(
            "parent",
            format!("`{}` still carries an unbaked scale", part.name()),
        ))
    }
}

/// Make `parent` own `child`, keeping the child's local transform.
///
/// Attaching the same pair twice is a no-op; attaching to a new parent moves
/// the child.
pub fn attach(ws: &mut Workspace, child: PartId, parent: PartId) -> Result<()> {
    let child_name = ws.get(child)?.name().to_string();
    let parent_name = ws.get(parent)?.name().to_string();
    require_baked(ws, parent)?;
    if child == parent || ws.hierarchy.is_ancestor(child, parent) {
        return Err(ReplicaError::HierarchyCycle {
            child: child_name,
            parent: parent_name,
        });
    }
    if ws.hierarchy.link(child, parent) {
        debug!(child = %child_name, parent = %parent_name, "attached");
    }
    Ok(())
}

pub fn attach_many(ws: &mut Workspace, children: &[PartId], parent: PartId) -> Result<()> {
    children
        .iter()
        .try_for_each(|&child| attach(ws, child, parent))
}

/// Attach while keeping the child's world placement: its local transform is
/// rewritten relative to the new parent.
pub fn attach_keep_world(ws: &mut Workspace, child: PartId, parent: PartId) -> Result<()> {
    let child_world = world_transform(ws, child)?;
    let parent_world = world_transform(ws, parent)?;
    attach(ws, child, parent)?;
    let local = parent_world.inverse() * child_world;
    ws.get_mut(child)?.transform.set_isometry(&local);
    Ok(())
}

pub fn attach_many_keep_world(ws: &mut Workspace, children: &[PartId], parent: PartId) -> Result<()> {
    children
        .iter()
        .try_for_each(|&child| attach_keep_world(ws, child, parent))
}

/// Detach `child` from its parent. The local transform is left untouched.
pub fn detach(ws: &mut Workspace, child: PartId) -> Result<Option<PartId>> {
    ws.get(child)?;
    Ok(ws.hierarchy.unlink(child))
}

pub fn parent_of(ws: &Workspace, child: PartId) -> Result<Option<PartId>> {
    ws.get(child)?;
    Ok(ws.hierarchy.parent(child))
}

pub fn children_of(ws: &Workspace, parent: PartId) -> Result<&[PartId]> {
    ws.get(parent)?;
    Ok(ws.hierarchy.children(parent))
}

/// Composition of the local transforms from the root down to `id`.
pub fn world_transform(ws: &Workspace, id: PartId) -> Result<Isometry3<f64>> {
    let mut world = ws.get(id)?.transform().isometry();
    for ancestor in ws.hierarchy.ancestors(id) {
        world = ws.get(ancestor)?.transform().isometry() * world;
    }
    Ok(world)
}

/// Bounds of the part's base primitive in world coordinates.
pub fn world_bounds(ws: &Workspace, id: PartId) -> Result<Aabb> {
    let part = ws.get(id)?;
    let local = part.bounds();
    let scale = part.transform().scale;
    let scaled = Aabb {
        min: Point3::from(local.min.coords.component_mul(&scale)),
        max: Point3::from(local.max.coords.component_mul(&scale)),
    };
    Ok(scaled.transformed(&world_transform(ws, id)?))
}

/// `root` followed by every part below it, depth first.
pub fn descendants(ws: &Workspace, root: PartId) -> Vec<PartId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(ws.hierarchy.children(id).iter().rev());
    }
    out
}

/// Parts without a parent.
pub fn roots(ws: &Workspace) -> Vec<PartId> {
    ws.parts()
        .filter(|(id, _)| ws.hierarchy.parent(*id).is_none())
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::create_box;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube(ws: &mut Workspace, name: &str) -> PartId {
        create_box(ws, name, [0.1, 0.1, 0.1]).unwrap()
    }

    #[test]
    fn attach_is_idempotent() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c = cube(&mut ws, "child");
        attach(&mut ws, c, p).unwrap();
        attach(&mut ws, c, p).unwrap();
        assert_eq!(ws.hierarchy().children(p), &[c]);
        assert_eq!(ws.hierarchy().parent(c), Some(p));
    }

    #[test]
    fn queries_check_the_part_exists() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c = cube(&mut ws, "child");
        attach(&mut ws, c, p).unwrap();
        assert_eq!(parent_of(&ws, c).unwrap(), Some(p));
        assert_eq!(children_of(&ws, p).unwrap(), &[c]);
        ws.remove_part(c).unwrap();
        assert!(matches!(parent_of(&ws, c), Err(ReplicaError::UnknownPart(_))));
    }

    #[test]
    fn reattach_moves_child() {
        let mut ws = Workspace::new();
        let a = cube(&mut ws, "a");
        let b = cube(&mut ws, "b");
        let c = cube(&mut ws, "c");
        attach(&mut ws, c, a).unwrap();
        attach(&mut ws, c, b).unwrap();
        assert!(ws.hierarchy().children(a).is_empty());
        assert_eq!(ws.hierarchy().children(b), &[c]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut ws = Workspace::new();
        let a = cube(&mut ws, "a");
        let b = cube(&mut ws, "b");
        let c = cube(&mut ws, "c");
        attach(&mut ws, b, a).unwrap();
        attach(&mut ws, c, b).unwrap();
        assert!(matches!(
            attach(&mut ws, a, c),
            Err(ReplicaError::HierarchyCycle { .. })
        ));
        assert!(matches!(
            attach(&mut ws, a, a),
            Err(ReplicaError::HierarchyCycle { .. })
        ));
    }

    #[test]
    fn removing_parent_orphans_children() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c1 = cube(&mut ws, "c1");
        let c2 = cube(&mut ws, "c2");
        attach_many(&mut ws, &[c1, c2], p).unwrap();
        ws.remove_part(p).unwrap();
        assert!(ws.contains_part(c1));
        assert!(ws.contains_part(c2));
        assert_eq!(ws.hierarchy().parent(c1), None);
        assert_eq!(roots(&ws).len(), 2);
    }

    #[test]
    fn local_transform_is_relative_to_parent() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c = cube(&mut ws, "child");
        ws.set_location(p, Vector3::new(1.0, 0.0, 0.0)).unwrap();
        ws.set_location(c, Vector3::new(0.0, 2.0, 0.0)).unwrap();
        attach(&mut ws, c, p).unwrap();
        let world = world_transform(&ws, c).unwrap();
        assert_relative_eq!(world.translation.vector, Vector3::new(1.0, 2.0, 0.0));
        // Local transform itself is untouched.
        assert_eq!(ws.get(c).unwrap().transform().translation, Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn keep_world_rewrites_local() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c = cube(&mut ws, "child");
        ws.set_location(p, Vector3::new(0.0, 0.15, 0.045)).unwrap();
        ws.set_location(c, Vector3::new(0.01, 0.15, 0.045)).unwrap();
        attach_keep_world(&mut ws, c, p).unwrap();
        let local = ws.get(c).unwrap().transform().translation;
        assert_relative_eq!(local, Vector3::new(0.01, 0.0, 0.0), epsilon = 1e-12);
        let world = world_transform(&ws, c).unwrap();
        assert_relative_eq!(world.translation.vector, Vector3::new(0.01, 0.15, 0.045), epsilon = 1e-12);
    }

    #[test]
    fn unbaked_parent_is_rejected() {
        let mut ws = Workspace::new();
        let p = cube(&mut ws, "parent");
        let c = cube(&mut ws, "child");
        ws.set_scale(p, Vector3::new(2.0, 1.0, 1.0)).unwrap();
        assert!(matches!(
            attach(&mut ws, c, p),
            Err(ReplicaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn descendants_are_depth_first() {
        let mut ws = Workspace::new();
        let root = cube(&mut ws, "root");
        let a = cube(&mut ws, "a");
        let a1 = cube(&mut ws, "a1");
        let b = cube(&mut ws, "b");
        attach_many(&mut ws, &[a, b], root).unwrap();
        attach(&mut ws, a1, a).unwrap();
        assert_eq!(descendants(&ws, root), vec![root, a, a1, b]);
        assert_eq!(detach(&mut ws, a1).unwrap(), Some(a));
        assert_eq!(descendants(&ws, root), vec![root, a, b]);
    }
}
