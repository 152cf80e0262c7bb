//! Ventilation grilles: a top panel and one panel on each side, each
//! perforated by a row of slots.

use nalgebra::Vector3;
use tracing::instrument;

use crate::boolean::cut;
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::hierarchy::attach_many;
use crate::layout::{layout, layout_centered};
use crate::primitives::create_box;
use crate::workspace::{MaterialId, PartId, Workspace};

use super::placed_box;

#[derive(Debug, Clone, Copy)]
pub struct Grilles {
    pub top: PartId,
    pub left: PartId,
    pub right: PartId,
}

#[instrument(skip_all)]
pub fn build(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<Grilles> {
    let material = ws.add_material(cfg.grilles.surface.material(&cfg.name("Grille_Material"))?);

    let top = build_top(ws, cfg, material)?;
    let left = build_side(ws, cfg, material, "Left", -cfg.grilles.side_offset_x)?;
    let right = build_side(ws, cfg, material, "Right", cfg.grilles.side_offset_x)?;

    attach_many(ws, &[top, left, right], body)?;
    Ok(Grilles { top, left, right })
}

/// Slots run across the panel width, spread over the full panel.
fn build_top(ws: &mut Workspace, cfg: &ConsoleConfig, material: MaterialId) -> Result<PartId> {
    let g = &cfg.grilles;
    let name = cfg.name("Top_Grille");
    let grille = placed_box(ws, &name, g.top_size, g.top_center, material)?;

    let [width, _, _] = g.top_size;
    let [cx, cy, cz] = g.top_center;
    let xs = layout(g.top_slots.into(), width, cx - width / 2.0)?;
    let slots = xs
        .iter()
        .map(|&x| [x, cy, cz])
        .collect::<Vec<_>>();
    perforate(ws, grille, &name, g.slot_size, &slots)?;
    Ok(grille)
}

/// Slots are stacked vertically, centred on the panel.
fn build_side(
    ws: &mut Workspace,
    cfg: &ConsoleConfig,
    material: MaterialId,
    side: &str,
    x: f64,
) -> Result<PartId> {
    let g = &cfg.grilles;
    let name = cfg.name(&format!("{side}_Side_Grille"));
    let grille = placed_box(ws, &name, g.side_size, [x, g.side_y, g.side_z], material)?;

    let [_, _, height] = g.side_size;
    let slots = layout_centered(g.side_slots.into(), height, g.side_z)?
        .into_iter()
        .map(|z| [x, g.side_y, z])
        .collect::<Vec<_>>();
    perforate(ws, grille, &name, g.slot_size, &slots)?;
    Ok(grille)
}

/// Cut one slot at a time; each cut sees the result of the previous one.
fn perforate(
    ws: &mut Workspace,
    grille: PartId,
    name: &str,
    slot_size: [f64; 3],
    centers: &[[f64; 3]],
) -> Result<()> {
    for (i, center) in centers.iter().enumerate() {
        let slot = create_box(ws, &format!("{name}_Slot_{i}"), slot_size)?;
        ws.set_location(slot, Vector3::from(*center))?;
        cut(ws, grille, slot)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::body;
    use crate::workspace::Modifier;
    use approx::assert_relative_eq;

    #[test]
    fn top_grille_has_ten_slots() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let grilles = build(&mut ws, body, &cfg).unwrap();

        let top = ws.get(grilles.top).unwrap();
        let cuts = top
            .modifiers()
            .iter()
            .filter(|m| matches!(m, Modifier::BooleanDifference { .. }))
            .count();
        assert_eq!(cuts, 10);
        // Slots are deeper than the panel, so each removes a full-thickness strip.
        let expected = 0.15 * 0.05 * 0.001 - 10.0 * 0.002 * 0.05 * 0.001;
        assert_relative_eq!(top.volume(), expected, epsilon = 1e-15);
        // Only body and the three panels remain.
        assert_eq!(ws.part_count(), 4);
    }

    #[test]
    fn side_grilles_mirror_each_other() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let grilles = build(&mut ws, body, &cfg).unwrap();

        let left = ws.get(grilles.left).unwrap();
        let right = ws.get(grilles.right).unwrap();
        assert_relative_eq!(left.transform().translation.x, -0.139);
        assert_relative_eq!(right.transform().translation.x, 0.139);
        assert_eq!(left.solid().cuts().len(), 8);
        assert_relative_eq!(left.volume(), right.volume(), epsilon = 1e-15);
        assert_eq!(left.materials(), ws.get(grilles.top).unwrap().materials());
    }
}
