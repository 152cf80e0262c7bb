//! Main console shell.

use nalgebra::Vector3;
use tracing::instrument;

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::primitives::{bake_location, create_box};
use crate::workspace::{Modifier, PartId, Workspace};

/// Body box spanning the console frame, with a light bevel and the console
/// black material.
#[instrument(skip_all)]
pub fn build(ws: &mut Workspace, cfg: &ConsoleConfig) -> Result<PartId> {
    let b = &cfg.body;
    let [_, depth, height] = b.size;

    let body = create_box(ws, &cfg.name("Body"), b.size)?;
    ws.set_location(body, Vector3::new(0.0, depth / 2.0, height / 2.0))?;
    bake_location(ws, body)?;

    ws.add_modifier(
        body,
        Modifier::Bevel {
            width: b.bevel_width,
            segments: b.bevel_segments,
        },
    )?;

    let black = ws.add_material(b.surface.material(&cfg.name("Black"))?);
    ws.assign_material(body, black)?;
    Ok(body)
}
