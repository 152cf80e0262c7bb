//! Power and reset buttons, and the power indicator LED.

use nalgebra::Vector3;
use tracing::instrument;

use crate::config::{ButtonConfig, ConsoleConfig};
use crate::error::Result;
use crate::hierarchy::{attach, attach_many};
use crate::material::{make_glow_material, make_material, Rgba};
use crate::primitives::{create_box, create_cylinder};
use crate::workspace::{Modifier, PartId, Workspace};

#[derive(Debug, Clone, Copy)]
pub struct Buttons {
    pub power: PartId,
    pub reset: PartId,
}

/// Power is red, everything else black.
pub fn button_color(cfg: &ButtonConfig, is_power: bool) -> Rgba {
    if is_power {
        cfg.power_color
    } else {
        cfg.other_color
    }
}

fn build_button(
    ws: &mut Workspace,
    cfg: &ConsoleConfig,
    label: &str,
    x: f64,
    is_power: bool,
) -> Result<PartId> {
    let b = &cfg.buttons;
    let button = create_box(ws, &cfg.name(&format!("{label}_Button")), b.size)?;
    ws.set_location(button, Vector3::new(x, b.y, b.z))?;
    ws.add_modifier(
        button,
        Modifier::Bevel {
            width: b.bevel_width,
            segments: b.bevel_segments,
        },
    )?;

    let material = make_material(
        &cfg.name(&format!("{label}_Button_Material")),
        button_color(b, is_power),
        b.metallic,
        b.roughness,
    )?;
    let material = ws.add_material(material);
    ws.assign_material(button, material)?;
    Ok(button)
}

#[instrument(skip_all)]
pub fn build(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<Buttons> {
    let b = &cfg.buttons;
    let power = build_button(ws, cfg, "Power", b.power_x, true)?;
    let reset = build_button(ws, cfg, "Reset", b.reset_x, false)?;
    attach_many(ws, &[power, reset], body)?;
    Ok(Buttons { power, reset })
}

/// Small glowing cylinder next to the power button.
#[instrument(skip_all)]
pub fn build_power_led(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<PartId> {
    let b = &cfg.buttons;
    let led = create_cylinder(ws, &cfg.name("Power_LED"), b.led_radius, b.led_depth)?;
    ws.set_location(led, Vector3::new(b.led_x, b.y, b.z))?;

    let glow = make_glow_material(&cfg.name("LED_Material"), b.led_color, b.led_strength, b.led_mix)?;
    let glow = ws.add_material(glow);
    ws.assign_material(led, glow)?;
    attach(ws, led, body)?;
    Ok(led)
}
