//! Edge connector: a base block carrying a row of metal pins.

use tracing::{debug, instrument};

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::hierarchy::{attach, attach_many_keep_world};
use crate::layout::layout;
use crate::workspace::{PartId, Workspace};

use super::placed_box;

#[derive(Debug, Clone)]
pub struct Connector {
    pub base: PartId,
    pub pins: Vec<PartId>,
}

/// Pins are grouped under the base, and the base under the body.
#[instrument(skip_all, fields(pins = cfg.connector.pin_count))]
pub fn build(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<Connector> {
    let c = &cfg.connector;
    let base_material = ws.add_material(c.base_surface.material(&cfg.name("Connector_Base_Material"))?);
    let pin_material = ws.add_material(c.pin_surface.material(&cfg.name("Pin_Material"))?);

    let base = placed_box(
        ws,
        &cfg.name("Connector_Base"),
        c.base_size,
        c.base_center,
        base_material,
    )?;

    let [_, y, z] = c.base_center;
    let pins = layout(c.pin_count.into(), c.pin_span, c.pin_start)?
        .into_iter()
        .enumerate()
        .map(|(i, x)| placed_box(ws, &cfg.name(&format!("Pin_{i}")), c.pin_size, [x, y, z], pin_material))
        .collect::<Result<Vec<_>>>()?;

    attach_many_keep_world(ws, &pins, base)?;
    attach(ws, base, body)?;
    debug!(pins = pins.len(), "connector assembled");
    Ok(Connector { base, pins })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::body;
    use crate::hierarchy::world_transform;
    use approx::assert_relative_eq;

    #[test]
    fn thirty_two_pins_evenly_spaced() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let connector = build(&mut ws, body, &cfg).unwrap();

        assert_eq!(connector.pins.len(), 32);
        let xs: Vec<f64> = connector
            .pins
            .iter()
            .map(|&p| world_transform(&ws, p).unwrap().translation.x)
            .collect();
        assert_relative_eq!(xs[0], -0.0470, epsilon = 1e-4);
        assert_relative_eq!(xs[31], 0.0470, epsilon = 1e-4);
        for pair in xs.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 0.1 / 33.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn pins_hang_off_base_and_share_one_material() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let connector = build(&mut ws, body, &cfg).unwrap();

        assert_eq!(ws.hierarchy().parent(connector.base), Some(body));
        assert_eq!(ws.hierarchy().children(connector.base), connector.pins.as_slice());
        let first = ws.get(connector.pins[0]).unwrap().materials().to_vec();
        assert!(connector
            .pins
            .iter()
            .all(|&p| ws.get(p).unwrap().materials() == first.as_slice()));

        // Local placement is relative to the base, world placement is absolute.
        let local = ws.get(connector.pins[0]).unwrap().transform().translation;
        assert_relative_eq!(local.y, 0.0, epsilon = 1e-12);
        let world = world_transform(&ws, connector.pins[0]).unwrap().translation.vector;
        assert_relative_eq!(world.y, 0.15, epsilon = 1e-12);
        assert_relative_eq!(world.z, 0.045, epsilon = 1e-12);
    }
}
