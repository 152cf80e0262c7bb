//! Primitive factory.
//!
//! Each primitive starts life as a unit solid whose requested dimensions are
//! set as scale and then baked, so the returned part always carries identity
//! scale and real-world dimensions.

use nalgebra::{Vector2, Vector3};
use tracing::{info, instrument};

use crate::error::{require_positive, ReplicaError, Result};
use crate::geometry::{Shape, Solid};
use crate::workspace::{Part, PartId, Workspace};

/// Axis-aligned box; `size` is `[x, y, z]` in meters.
#[instrument(skip(ws))]
pub fn create_box(ws: &mut Workspace, name: &str, size: [f64; 3]) -> Result<PartId> {
    let [x, y, z] = size;
    let scale = Vector3::new(
        require_positive("box width", x)?,
        require_positive("box depth", y)?,
        require_positive("box height", z)?,
    );
    let id = ws.insert_part(Part::new(name, Solid::new(Shape::unit_box())));
    ws.set_scale(id, scale)?;
    bake_scale(ws, id)?;
    info!(part = name, size = ?size, "created box");
    Ok(id)
}

/// Cylinder along +Z.
#[instrument(skip(ws))]
pub fn create_cylinder(ws: &mut Workspace, name: &str, radius: f64, depth: f64) -> Result<PartId> {
    let radius = require_positive("cylinder radius", radius)?;
    let depth = require_positive("cylinder depth", depth)?;
    let unit = Shape::Cylinder {
        radius: 1.0,
        depth: 1.0,
    };
    let id = ws.insert_part(Part::new(name, Solid::new(unit)));
    ws.set_scale(id, Vector3::new(radius, radius, depth))?;
    bake_scale(ws, id)?;
    info!(part = name, radius, depth, "created cylinder");
    Ok(id)
}

/// Flat rectangle in the XY plane; `size` is `[x, y]`.
#[instrument(skip(ws))]
pub fn create_plane(ws: &mut Workspace, name: &str, size: [f64; 2]) -> Result<PartId> {
    let [x, y] = size;
    let x = require_positive("plane width", x)?;
    let y = require_positive("plane height", y)?;
    let unit = Shape::Plane {
        size: Vector2::new(1.0, 1.0),
    };
    let id = ws.insert_part(Part::new(name, Solid::new(unit)));
    ws.set_scale(id, Vector3::new(x, y, 1.0))?;
    bake_scale(ws, id)?;
    info!(part = name, size = ?size, "created plane");
    Ok(id)
}

/// Geometry-free handle used as a pivot or grouping origin.
pub fn create_anchor(ws: &mut Workspace, name: &str) -> PartId {
    info!(part = name, "created anchor");
    ws.insert_part(Part::new(name, Solid::new(Shape::Anchor)))
}

/// Commit the part's scale into its solid and reset scale to identity.
pub fn bake_scale(ws: &mut Workspace, id: PartId) -> Result<()> {
    let part = ws.get_mut(id)?;
    let scale = part.transform.scale;
    part.solid = part.solid.scaled(&scale)?;
    part.transform.scale = Vector3::repeat(1.0);
    Ok(())
}

/// Commit the part's translation into its solid and reset it to the origin.
pub fn bake_location(ws: &mut Workspace, id: PartId) -> Result<()> {
    let part = ws.get_mut(id)?;
    if !part.transform.has_identity_rotation() {
        return Err(ReplicaError::invalid(
            "location",
            format!("`{}` must be unrotated before baking its location", part.name),
        ));
    }
    let offset = part.transform.translation;
    part.solid = part.solid.translated(&offset);
    part.transform.translation = Vector3::zeros();
    Ok(())
}
