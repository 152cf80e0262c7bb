//! Genesis console: the body plus every hardware feature attached to it.
//!
//! The body's location is baked so it spans `x ∈ [-w/2, w/2]`, `y ∈ [0, d]`
//! and `z ∈ [0, h]`. Every measurement below is therefore an absolute
//! position in the console frame.

pub mod body;
pub mod buttons;
pub mod cartridge;
pub mod connector;
pub mod contacts;
pub mod grilles;
pub mod ports;

use nalgebra::Vector3;
use tracing::{info, instrument};

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::primitives::create_box;
use crate::workspace::{MaterialId, PartId, Workspace};

/// Handles to everything [`build_console`] created.
#[derive(Debug, Clone)]
pub struct ConsoleAssembly {
    pub body: PartId,
    pub guide_rails: Option<cartridge::GuideRails>,
    pub connector: Option<connector::Connector>,
    pub contacts: Option<contacts::Contacts>,
    pub buttons: Option<buttons::Buttons>,
    pub power_led: Option<PartId>,
    pub ports: Option<ports::ControllerPorts>,
    pub grilles: Option<grilles::Grilles>,
}

/// Build the console with the enabled features, in assembly order: body,
/// slot, rails, connector, contacts, buttons, ports, grilles.
#[instrument(skip_all, fields(prefix = %cfg.name_prefix))]
pub fn build_console(ws: &mut Workspace, cfg: &ConsoleConfig) -> Result<ConsoleAssembly> {
    let features = cfg.features;
    let body = body::build(ws, cfg)?;

    if features.cartridge_slot {
        cartridge::build_slot(ws, body, cfg)?;
    }
    let guide_rails = features
        .guide_rails
        .then(|| cartridge::build_guide_rails(ws, body, cfg))
        .transpose()?;
    let connector = features
        .connector_pins
        .then(|| connector::build(ws, body, cfg))
        .transpose()?;
    let contacts = features
        .pin_contacts
        .then(|| contacts::build(ws, body, cfg))
        .transpose()?;
    let buttons = features
        .buttons
        .then(|| buttons::build(ws, body, cfg))
        .transpose()?;
    let power_led = features
        .power_led
        .then(|| buttons::build_power_led(ws, body, cfg))
        .transpose()?;
    let ports = features
        .controller_ports
        .then(|| ports::build(ws, body, cfg))
        .transpose()?;
    let grilles = features
        .grilles
        .then(|| grilles::build(ws, body, cfg))
        .transpose()?;

    info!(
        parts = ws.part_count(),
        materials = ws.material_count(),
        "console assembled"
    );
    Ok(ConsoleAssembly {
        body,
        guide_rails,
        connector,
        contacts,
        buttons,
        power_led,
        ports,
        grilles,
    })
}

/// Box of `size` centred at `center`, with `material` assigned.
pub(crate) fn placed_box(
    ws: &mut Workspace,
    name: &str,
    size: [f64; 3],
    center: [f64; 3],
    material: MaterialId,
) -> Result<PartId> {
    let id = create_box(ws, name, size)?;
    ws.set_location(id, Vector3::from(center))?;
    ws.assign_material(id, material)?;
    Ok(id)
}
