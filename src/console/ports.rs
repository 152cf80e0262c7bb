//! Front controller ports.
//!
//! Each port is a housing block with an optional set of details (a 9-pin
//! connector, metal shielding, a label, a dust cover and two mounting
//! brackets). A single recess covering every port is cut into the body.

use nalgebra::Vector3;
use tracing::{debug, instrument};

use crate::boolean::cut;
use crate::config::{ConsoleConfig, SurfaceConfig};
use crate::error::Result;
use crate::hierarchy::{attach, attach_many_keep_world};
use crate::layout::layout_centered;
use crate::primitives::{create_box, create_cylinder, create_plane};
use crate::workspace::{MaterialId, PartId, Workspace};

use super::placed_box;

#[derive(Debug, Clone)]
pub struct PortDetails {
    pub connector: PartId,
    pub pins: Vec<PartId>,
    pub shield: PartId,
    pub label: PartId,
    pub dust_cover: PartId,
    pub brackets: [PartId; 2],
}

#[derive(Debug, Clone)]
pub struct ControllerPort {
    pub housing: PartId,
    pub details: Option<PortDetails>,
}

#[derive(Debug, Clone)]
pub struct ControllerPorts {
    pub ports: Vec<ControllerPort>,
}

/// Shared by every port.
struct PortMaterials {
    housing: MaterialId,
    connector: MaterialId,
    pin: MaterialId,
    shield: MaterialId,
    label: MaterialId,
    cover: MaterialId,
    bracket: MaterialId,
}

impl PortMaterials {
    fn add(ws: &mut Workspace, cfg: &ConsoleConfig) -> Result<Self> {
        let p = &cfg.ports;
        let mut add = |surface: &SurfaceConfig, name: &str| -> Result<MaterialId> {
            Ok(ws.add_material(surface.material(&cfg.name(name))?))
        };
        Ok(Self {
            housing: add(&p.housing_surface, "Port_Material")?,
            connector: add(&p.connector_surface, "Port_Connector_Material")?,
            pin: add(&p.pin_surface, "Port_Pin_Material")?,
            shield: add(&p.shield_surface, "Port_Shielding_Material")?,
            label: add(&p.label_surface, "Port_Label_Material")?,
            cover: add(&p.cover_surface, "Port_Dust_Cover_Material")?,
            bracket: add(&p.bracket_surface, "Port_Bracket_Material")?,
        })
    }
}

#[instrument(skip_all, fields(ports = cfg.ports.xs.len()))]
pub fn build(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<ControllerPorts> {
    let p = &cfg.ports;
    let materials = PortMaterials::add(ws, cfg)?;

    let mut ports = Vec::with_capacity(p.xs.len());
    for (i, &x) in p.xs.iter().enumerate() {
        let prefix = cfg.name(&format!("Controller{}", i + 1));
        let housing = placed_box(
            ws,
            &format!("{prefix}_Port"),
            p.housing_size,
            [x, p.face_y, p.z],
            materials.housing,
        )?;
        let details = if cfg.features.port_details {
            Some(build_details(ws, cfg, &materials, &prefix, housing, x)?)
        } else {
            None
        };
        ports.push(ControllerPort { housing, details });
    }

    cut_recess(ws, body, cfg)?;

    for port in &ports {
        attach(ws, port.housing, body)?;
    }
    Ok(ControllerPorts { ports })
}

fn build_details(
    ws: &mut Workspace,
    cfg: &ConsoleConfig,
    materials: &PortMaterials,
    prefix: &str,
    housing: PartId,
    x: f64,
) -> Result<PortDetails> {
    let p = &cfg.ports;
    let (connector, pins) = build_connector(ws, cfg, materials, prefix, x)?;

    let shield = placed_box(
        ws,
        &format!("{prefix}_Shielding"),
        p.shield_size,
        [x, p.face_y + p.shield_offset_y, p.z],
        materials.shield,
    )?;

    let label = create_plane(ws, &format!("{prefix}_Label"), p.label_size)?;
    ws.set_location(
        label,
        Vector3::new(x, p.face_y + p.label_offset_y, p.z + p.label_offset_z),
    )?;
    ws.assign_material(label, materials.label)?;

    let dust_cover = placed_box(
        ws,
        &format!("{prefix}_Dust_Cover"),
        p.cover_size,
        [x, p.face_y + p.cover_offset_y, p.z],
        materials.cover,
    )?;

    let mut bracket = |side: &str, dx: f64| {
        placed_box(
            ws,
            &format!("{prefix}_Bracket_{side}"),
            p.bracket_size,
            [x + dx, p.face_y, p.z],
            materials.bracket,
        )
    };
    let brackets = [
        bracket("Left", -p.bracket_offset_x)?,
        bracket("Right", p.bracket_offset_x)?,
    ];

    attach_many_keep_world(ws, &[connector, shield, label, dust_cover], housing)?;
    attach_many_keep_world(ws, &brackets, housing)?;
    Ok(PortDetails {
        connector,
        pins,
        shield,
        label,
        dust_cover,
        brackets,
    })
}

/// Connector block with a grid of cylindrical pins, pins grouped under it.
fn build_connector(
    ws: &mut Workspace,
    cfg: &ConsoleConfig,
    materials: &PortMaterials,
    prefix: &str,
    x: f64,
) -> Result<(PartId, Vec<PartId>)> {
    let p = &cfg.ports;
    let connector = placed_box(
        ws,
        &format!("{prefix}_Connector"),
        p.connector_size,
        [x, p.face_y + p.connector_offset_y, p.z],
        materials.connector,
    )?;

    let [span_x, span_z] = p.pin_grid_span;
    let columns = layout_centered(p.pin_columns.into(), span_x, x)?;
    let rows = layout_centered(p.pin_rows.into(), span_z, p.z)?;

    let mut pins = Vec::with_capacity(columns.len() * rows.len());
    for &px in &columns {
        for &pz in rows.iter().rev() {
            let pin = create_cylinder(
                ws,
                &format!("{prefix}_Pin_{}", pins.len() + 1),
                p.pin_radius,
                p.pin_depth,
            )?;
            ws.set_location(pin, Vector3::new(px, p.face_y + p.pin_offset_y, pz))?;
            ws.assign_material(pin, materials.pin)?;
            pins.push(pin);
        }
    }
    attach_many_keep_world(ws, &pins, connector)?;
    Ok((connector, pins))
}

/// One recess spanning all ports, cut into the body front.
fn cut_recess(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<()> {
    let p = &cfg.ports;
    let recess = create_box(ws, &cfg.name("Controller_Ports_Recess"), p.recess_size)?;
    ws.set_location(recess, Vector3::from(p.recess_center))?;
    cut(ws, body, recess)?;
    debug!("port recess cut");
    Ok(())
}
