//! Printed manual: a stack of pages between two covers, bound by a spine.
//!
//! The front cover lies at z = 0 and page `i` at `(i + 1) * page_thickness`,
//! with the back cover one step past the last page. The book hangs off a
//! pivot anchor on its binding edge (x = -width / 2), so opening it is a
//! single rotation of the pivot about Y.

use std::path::Path;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{info, instrument, warn};

use crate::config::ManualConfig;
use crate::error::{require_positive, ReplicaError, Result};
use crate::hierarchy::{attach_keep_world, attach_many_keep_world};
use crate::material::load_image_material;
use crate::primitives::{create_anchor, create_box, create_plane};
use crate::workspace::{Modifier, PartId, Workspace};

#[derive(Debug, Clone)]
pub struct Manual {
    pub pivot: PartId,
    pub front_cover: PartId,
    pub pages: Vec<PartId>,
    pub back_cover: PartId,
    /// Absent for an empty book.
    pub spine: Option<PartId>,
}

/// Stack height the spine has to cover.
pub fn spine_width(cfg: &ManualConfig) -> f64 {
    f64::from(cfg.num_pages) * cfg.per_page_unit
}

fn name(cfg: &ManualConfig, suffix: &str) -> String {
    if cfg.name_prefix.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", cfg.name_prefix, suffix)
    }
}

#[instrument(skip_all, fields(pages = cfg.num_pages))]
pub fn build_manual(ws: &mut Workspace, cfg: &ManualConfig) -> Result<Manual> {
    let t = require_positive("page_thickness", cfg.page_thickness)?;
    require_positive("per_page_unit", cfg.per_page_unit)?;
    let [width, height] = cfg.page_size;
    let n = cfg.num_pages;

    let paper = ws.add_material(cfg.paper_surface.material(&name(cfg, "Paper"))?);
    let cover = ws.add_material(cfg.cover_surface.material(&name(cfg, "Cover"))?);

    let cover_size = [width, height, cfg.cover_thickness];
    let front_cover = create_box(ws, &name(cfg, "Front_Cover"), cover_size)?;
    ws.assign_material(front_cover, cover)?;
    apply_image(ws, cfg, front_cover, cfg.front_cover_image.as_deref())?;

    let mut pages = Vec::with_capacity(n as usize);
    for i in 0..n {
        let page = create_plane(ws, &name(cfg, &format!("Page_{}", i + 1)), cfg.page_size)?;
        ws.set_location(page, Vector3::new(0.0, 0.0, f64::from(i + 1) * t))?;
        ws.add_modifier(
            page,
            Modifier::Subdivision {
                levels: cfg.subdivision_levels,
            },
        )?;
        ws.assign_material(page, paper)?;
        let image = cfg.page_images.get(i as usize).map(|p| p.as_path());
        apply_image(ws, cfg, page, image)?;
        pages.push(page);
    }

    let back_cover = create_box(ws, &name(cfg, "Back_Cover"), cover_size)?;
    ws.set_location(back_cover, Vector3::new(0.0, 0.0, f64::from(n + 1) * t))?;
    ws.assign_material(back_cover, cover)?;
    apply_image(ws, cfg, back_cover, cfg.back_cover_image.as_deref())?;

    let spine = if n > 0 {
        let depth = spine_width(cfg);
        let spine = create_box(ws, &name(cfg, "Spine"), [cfg.cover_thickness, height, depth])?;
        ws.set_location(spine, Vector3::new(-width / 2.0, 0.0, f64::from(n + 1) * t / 2.0))?;
        ws.assign_material(spine, cover)?;
        Some(spine)
    } else {
        None
    };

    attach_many_keep_world(ws, &pages, front_cover)?;
    attach_keep_world(ws, back_cover, front_cover)?;
    if let Some(spine) = spine {
        attach_keep_world(ws, spine, front_cover)?;
    }

    let pivot = create_anchor(ws, &name(cfg, "Pivot"));
    ws.set_location(pivot, Vector3::new(-width / 2.0, 0.0, 0.0))?;
    attach_keep_world(ws, front_cover, pivot)?;
    if cfg.open_angle_deg != 0.0 {
        let angle = cfg.open_angle_deg.to_radians();
        ws.set_rotation(pivot, UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -angle))?;
    }

    info!(pages = pages.len(), parts = ws.part_count(), "manual assembled");
    Ok(Manual {
        pivot,
        front_cover,
        pages,
        back_cover,
        spine,
    })
}

/// Swap in an image material when `path` is set. A missing or unreadable
/// image leaves the part's material alone.
fn apply_image(ws: &mut Workspace, cfg: &ManualConfig, part: PartId, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let part_name = ws.get(part)?.name().to_string();
    match load_image_material(&format!("{part_name}_Image"), path, cfg.image_roughness) {
        Ok(material) => {
            let id = ws.add_material(material);
            ws.replace_materials(part, id)
        }
        Err(ReplicaError::MissingAsset { path, reason }) => {
            warn!(part = %part_name, path = %path.display(), %reason, "image unavailable, keeping material");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
