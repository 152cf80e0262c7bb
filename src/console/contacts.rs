//! Cartridge pin contacts with a worn-metal finish.

use tracing::instrument;

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::hierarchy::{attach, attach_many_keep_world};
use crate::layout::layout;
use crate::material::make_wear_material;
use crate::workspace::{PartId, Workspace};

use super::placed_box;

#[derive(Debug, Clone)]
pub struct Contacts {
    pub housing: PartId,
    pub contacts: Vec<PartId>,
}

#[instrument(skip_all, fields(contacts = cfg.contacts.count))]
pub fn build(ws: &mut Workspace, body: PartId, cfg: &ConsoleConfig) -> Result<Contacts> {
    let c = &cfg.contacts;

    let mut wear = make_wear_material(
        &cfg.name("Contact_Material"),
        c.clean_color,
        c.worn_color,
        c.wear_threshold_low,
        c.wear_threshold_high,
        c.emission_strength,
    )?;
    if let Some(pattern) = wear.wear_mut() {
        pattern.noise = c.noise;
    }
    let wear = ws.add_material(wear);
    let housing_material = ws.add_material(c.housing_surface.material(&cfg.name("Contact_Housing_Material"))?);

    let housing = placed_box(
        ws,
        &cfg.name("Contact_Housing"),
        c.housing_size,
        c.housing_center,
        housing_material,
    )?;

    let [_, y, z] = c.housing_center;
    let contacts = layout(c.count.into(), c.span, c.start)?
        .into_iter()
        .enumerate()
        .map(|(i, x)| placed_box(ws, &cfg.name(&format!("Contact_{i}")), c.size, [x, y, z], wear))
        .collect::<Result<Vec<_>>>()?;

    attach_many_keep_world(ws, &contacts, housing)?;
    attach(ws, housing, body)?;
    Ok(Contacts { housing, contacts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::body;
    use crate::material::MaterialKind;

    #[test]
    fn contacts_share_a_single_wear_material() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let before = ws.material_count();
        let built = build(&mut ws, body, &cfg).unwrap();

        assert_eq!(built.contacts.len(), 32);
        // One wear material and one housing material.
        assert_eq!(ws.material_count(), before + 2);

        let mat = ws.get(built.contacts[0]).unwrap().materials()[0];
        assert!(built
            .contacts
            .iter()
            .all(|&c| ws.get(c).unwrap().materials() == [mat]));
        match &ws.material(mat).unwrap().kind {
            MaterialKind::Wear(w) => {
                assert_eq!(w.ramp.low, 0.4);
                assert_eq!(w.ramp.high, 0.6);
                assert_eq!(w.noise.scale, 200.0);
            }
            other => panic!("expected a wear material, got {other:?}"),
        }
    }

    #[test]
    fn contacts_group_under_housing() {
        let mut ws = Workspace::new();
        let cfg = ConsoleConfig::default();
        let body = body::build(&mut ws, &cfg).unwrap();
        let built = build(&mut ws, body, &cfg).unwrap();
        assert_eq!(ws.hierarchy().parent(built.housing), Some(body));
        assert!(built
            .contacts
            .iter()
            .all(|&c| ws.hierarchy().parent(c) == Some(built.housing)));
    }
}
