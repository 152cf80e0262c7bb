//! Cartridge slot and the guide rails either side of it.

use nalgebra::Vector3;
use tracing::{debug, instrument};

use crate::boolean::cut;
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::hierarchy::attach_many;
use crate::primitives::create_box;
use crate::workspace::{PartId, Workspace};

use super::placed_box;

#[derive(Debug, Clone, Copy)]
pub struct GuideRails {
    pub left: PartId,
    pub right: PartId,
}

/// Cut the slot into the body, then soften the body bevel so it does not
/// eat the slot edges.
#[instrument(skip_all)]
pub fn build_slot(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<()> {
    let c = &cfg.cartridge;
    let slot = create_box(ws, &cfg.name("Cartridge_Slot"), c.slot_size)?;
    ws.set_location(slot, Vector3::from(c.slot_center))?;
    cut(ws, body, slot)?;
    ws.set_bevel(body, c.slot_bevel_width, c.slot_bevel_segments)?;
    debug!("cartridge slot cut");
    Ok(())
}

#[instrument(skip_all)]
pub fn build_guide_rails(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<GuideRails> {
    let c = &cfg.cartridge;
    let material = ws.add_material(c.rail_surface.material(&cfg.name("Rail_Material"))?);

    let mut rail = |side: &str, x: f64| {
        placed_box(
            ws,
            &cfg.name(&format!("{side}_Guide_Rail")),
            c.rail_size,
            [x, c.rail_y, c.rail_z],
            material,
        )
    };
    let left = rail("Left", -c.rail_offset_x)?;
    let right = rail("Right", c.rail_offset_x)?;

    attach_many(ws, &[left, right], body)?;
    Ok(GuideRails { left, right })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::body;
    use crate::workspace::Modifier;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn slot_removes_exact_volume_and_keeps_bounds() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let before = ws.get(body).unwrap().volume();
        let bounds_before = ws.get(body).unwrap().bounds();

        build_slot(&mut ws, body, &cfg).unwrap();

        let part = ws.get(body).unwrap();
        assert_relative_eq!(
            before - part.volume(),
            0.1143 * 0.0127 * 0.01905,
            epsilon = 1e-15
        );
        assert_eq!(part.bounds(), bounds_before);
        assert!(!part.solid().contains(&Point3::new(0.0, 0.1073, 0.0286)));
        assert_eq!(ws.part_count(), 1);
        assert!(matches!(
            part.modifiers(),
            [
                Modifier::Bevel { width, segments: 2 },
                Modifier::BooleanDifference { .. },
            ] if *width == 0.001
        ));
    }

    #[test]
    fn rails_share_material_and_sit_symmetric() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let rails = build_guide_rails(&mut ws, body, &cfg).unwrap();
        let left = ws.get(rails.left).unwrap();
        let right = ws.get(rails.right).unwrap();
        assert_eq!(left.materials(), right.materials());
        assert_relative_eq!(left.transform().translation.x, -0.055);
        assert_relative_eq!(right.transform().translation.x, 0.055);
        assert_eq!(ws.hierarchy().children(body), &[rails.left, rails.right]);
    }
}
