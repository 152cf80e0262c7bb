//! Subtractive composition: carve a tool part out of a target part.
//!
//! A cut is applied exactly once against the target's current geometry, is
//! recorded on the target's modifier stack, and then the tool part is
//! removed from the workspace. Its handle is stale from that point on.

use tracing::{debug, instrument};

use crate::error::{CompositionError, ReplicaError, Result};
use crate::hierarchy::world_transform;
use crate::workspace::{Modifier, PartId, Workspace};

/// Subtract `tool` from `target`, delete `tool`, and return `target`.
#[instrument(skip(ws))]
pub fn cut(ws: &mut Workspace, target: PartId, tool: PartId) -> Result<PartId> {
    let target_part = ws.get(target)?;
    let tool_part = ws.get(tool)?;
    let target_name = target_part.name().to_string();
    let tool_name = tool_part.name().to_string();

    if target == tool {
        return Err(CompositionError::SelfCut { name: target_name }.into());
    }
    for part in [target_part, tool_part] {
        if !part.transform().has_unit_scale() {
            return Err(ReplicaError::invalid(
                "scale",
                format!("bake the scale of `{}` before cutting", part.name()),
            ));
        }
    }

    let tool_shape = *tool_part.solid().shape();
    let tool_solid_origin = tool_part.solid().origin();
    if !tool_part.solid().cuts().is_empty() {
        debug!(tool = %tool_name, "tool history is ignored; only its base primitive cuts");
    }

    // Tool primitive expressed in the target's local frame.
    let placement = world_transform(ws, target)?.inverse()
        * world_transform(ws, tool)?
        * nalgebra::Translation3::from(tool_solid_origin);

    let removed = ws
        .get_mut(target)?
        .solid
        .subtract(&target_name, &tool_name, tool_shape, placement)?;

    ws.get_mut(target)?.modifiers.push(Modifier::BooleanDifference {
        tool: tool_name.clone(),
        removed_volume: removed,
    });
    ws.remove_part(tool)?;

    debug!(target = %target_name, tool = %tool_name, removed, "applied cut");
    Ok(target)
}

/// Apply several cuts one after another. Each tool is consumed as soon as its
/// own cut is applied; the first failure stops the sequence and leaves the
/// remaining tools in the workspace.
pub fn cut_all(ws: &mut Workspace, target: PartId, tools: &[PartId]) -> Result<PartId> {
    for &tool in tools {
        cut(ws, target, tool)?;
    }
    Ok(target)
}
