//! Hand finished parts to the outside world: STL meshes through vcad and a
//! JSON scene manifest with placements, modifiers and shader graphs.

use std::path::{Path, PathBuf};

use nalgebra::Isometry3;
use serde::Serialize;
use tracing::{info, instrument};
use vcad::{centered_cube, centered_cylinder};

use crate::config::ExportConfig;
use crate::error::{ReplicaError, Result};
use crate::geometry::{CutVolume, Shape, Solid};
use crate::hierarchy::{descendants, roots, world_bounds, world_transform};
use crate::material::Material;
use crate::shader_graph::ShaderGraph;
use crate::workspace::{Modifier, PartId, Workspace};

/// Planes have no thickness; meshes need some.
const PLANE_THICKNESS: f64 = 1e-4;

#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub stl_files: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SceneManifest<'a> {
    pub scene: &'a str,
    pub unit_scale: f64,
    pub parts: Vec<PartRecord<'a>>,
    pub materials: Vec<MaterialRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PartRecord<'a> {
    pub name: &'a str,
    pub parent: Option<&'a str>,
    /// World placement in meters.
    pub translation: [f64; 3],
    /// World rotation as `[i, j, k, w]`.
    pub rotation: [f64; 4],
    pub shape: Shape,
    pub volume: f64,
    pub bounds_min: [f64; 3],
    pub bounds_max: [f64; 3],
    pub modifiers: &'a [Modifier],
    pub materials: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct MaterialRecord<'a> {
    #[serde(flatten)]
    pub material: &'a Material,
    pub graph: ShaderGraph,
}

fn export_error(name: &str, reason: impl ToString) -> ReplicaError {
    ReplicaError::Export {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn shape_mesh(name: &str, shape: &Shape, unit: f64) -> Option<vcad::Part> {
    match *shape {
        Shape::Box { size } => Some(centered_cube(name, size.x * unit, size.y * unit, size.z * unit)),
        Shape::Cylinder { radius, depth } => Some(centered_cylinder(name, radius * unit, depth * unit, 32)),
        Shape::Plane { size } => Some(centered_cube(name, size.x * unit, size.y * unit, PLANE_THICKNESS * unit)),
        Shape::Anchor => None,
    }
}

/// Rotate then translate, as `iso` does.
fn place(mesh: vcad::Part, iso: &Isometry3<f64>, unit: f64) -> vcad::Part {
    let (rx, ry, rz) = iso.rotation.euler_angles();
    let t = iso.translation.vector * unit;
    mesh.rotate(rx.to_degrees(), ry.to_degrees(), rz.to_degrees())
        .translate(t.x, t.y, t.z)
}

/// Mesh of a solid in its own frame, with its cut history replayed.
fn solid_mesh(name: &str, solid: &Solid, unit: f64) -> Option<vcad::Part> {
    let o = solid.origin() * unit;
    let base = shape_mesh(name, solid.shape(), unit)?.translate(o.x, o.y, o.z);
    let carved = solid.cuts().iter().fold(base, |mesh, cut: &CutVolume| {
        match shape_mesh(&cut.tool, &cut.shape, unit) {
            Some(tool) => mesh - place(tool, &cut.placement, unit),
            None => mesh,
        }
    });
    Some(carved)
}

/// World-space mesh of one part, or `None` for anchors.
pub fn part_mesh(ws: &Workspace, id: PartId, unit: f64) -> Result<Option<vcad::Part>> {
    let part = ws.get(id)?;
    let solid = if part.transform().has_unit_scale() {
        part.solid().clone()
    } else {
        part.solid().scaled(&part.transform().scale)?
    };
    let world = world_transform(ws, id)?;
    Ok(solid_mesh(part.name(), &solid, unit).map(|mesh| place(mesh, &world, unit)))
}

fn write_stl(mesh: &vcad::Part, name: &str, path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy().into_owned();
    mesh.write_stl(&path_str).map_err(|e| export_error(name, e))?;
    info!(path = %path.display(), "exported");
    Ok(())
}

pub fn build_manifest<'a>(ws: &'a Workspace, scene: &'a str, unit_scale: f64) -> Result<SceneManifest<'a>> {
    let mut parts = Vec::with_capacity(ws.part_count());
    for (id, part) in ws.parts() {
        let world = world_transform(ws, id)?;
        let bounds = world_bounds(ws, id)?;
        let parent = match ws.hierarchy().parent(id) {
            Some(p) => Some(ws.get(p)?.name()),
            None => None,
        };
        let materials = part
            .materials()
            .iter()
            .map(|&m| {
                ws.material(m)
                    .map(|mat| mat.name.as_str())
                    .ok_or(ReplicaError::UnknownMaterial(m))
            })
            .collect::<Result<Vec<_>>>()?;
        let q = world.rotation.coords;
        parts.push(PartRecord {
            name: part.name(),
            parent,
            translation: world.translation.vector.into(),
            rotation: [q.x, q.y, q.z, q.w],
            shape: *part.solid().shape(),
            volume: part.volume(),
            bounds_min: bounds.min.coords.into(),
            bounds_max: bounds.max.coords.into(),
            modifiers: part.modifiers(),
            materials,
        });
    }

    let materials = ws
        .materials()
        .map(|(_, material)| MaterialRecord {
            material,
            graph: ShaderGraph::from_material(material),
        })
        .collect();

    Ok(SceneManifest {
        scene,
        unit_scale,
        parts,
        materials,
    })
}

/// Write every part of the workspace under `<output_dir>/<scene>/`.
///
/// With `join_assemblies`, each hierarchy root and its descendants are
/// merged into one mesh named after the root; otherwise every part gets its
/// own file.
#[instrument(skip(ws, cfg))]
pub fn export_scene(ws: &Workspace, scene: &str, cfg: &ExportConfig) -> Result<ExportReport> {
    if !(cfg.unit_scale.is_finite() && cfg.unit_scale > 0.0) {
        return Err(ReplicaError::invalid("unit_scale", format!("expected a positive scale, got {}", cfg.unit_scale)));
    }
    let dir = cfg.output_dir.join(file_stem(scene));
    std::fs::create_dir_all(&dir)?;
    let mut report = ExportReport::default();

    if cfg.write_stl {
        if cfg.join_assemblies {
            for root in roots(ws) {
                let name = ws.get(root)?.name().to_string();
                let mut joined: Option<vcad::Part> = None;
                for id in descendants(ws, root) {
                    if let Some(mesh) = part_mesh(ws, id, cfg.unit_scale)? {
                        joined = Some(match joined {
                            Some(acc) => acc + mesh,
                            None => mesh,
                        });
                    }
                }
                if let Some(mesh) = joined {
                    let path = dir.join(format!("{}.stl", file_stem(&name)));
                    write_stl(&mesh, &name, &path)?;
                    report.stl_files.push(path);
                }
            }
        } else {
            for (id, part) in ws.parts() {
                if let Some(mesh) = part_mesh(ws, id, cfg.unit_scale)? {
                    let path = dir.join(format!("{}.stl", file_stem(part.name())));
                    write_stl(&mesh, part.name(), &path)?;
                    report.stl_files.push(path);
                }
            }
        }
    }

    if cfg.write_manifest {
        let manifest = build_manifest(ws, scene, cfg.unit_scale)?;
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| export_error(scene, e))?;
        let path = dir.join("scene.json");
        std::fs::write(&path, json)?;
        info!(path = %path.display(), parts = manifest.parts.len(), "wrote manifest");
        report.manifest = Some(path);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::cut;
    use crate::hierarchy::attach;
    use crate::material::make_material;
    use crate::primitives::{create_anchor, create_box};
    use nalgebra::Vector3;

    fn manifest_only(dir: &Path) -> ExportConfig {
        ExportConfig {
            output_dir: dir.to_path_buf(),
            write_stl: false,
            ..ExportConfig::default()
        }
    }

    #[test]
    fn file_stems_are_filesystem_safe() {
        assert_eq!(file_stem("Genesis_Top Grilles"), "Genesis_Top_Grilles");
        assert_eq!(file_stem("a/b"), "a_b");
    }

    #[test]
    fn manifest_records_parts_and_graphs() {
        let mut ws = Workspace::new();
        let body = create_box(&mut ws, "body", [0.2, 0.2, 0.05]).unwrap();
        let button = create_box(&mut ws, "button", [0.01, 0.01, 0.002]).unwrap();
        ws.set_location(button, Vector3::new(0.03, 0.0, 0.0)).unwrap();
        attach(&mut ws, button, body).unwrap();
        let black = ws.add_material(make_material("black", [0.02, 0.02, 0.02, 1.0], 0.0, 0.5).unwrap());
        ws.assign_material(body, black).unwrap();

        let manifest = build_manifest(&ws, "test", 1000.0).unwrap();
        assert_eq!(manifest.parts.len(), 2);
        let rec = manifest.parts.iter().find(|p| p.name == "button").unwrap();
        assert_eq!(rec.parent, Some("body"));
        assert_eq!(rec.translation, [0.03, 0.0, 0.0]);
        let rec = manifest.parts.iter().find(|p| p.name == "body").unwrap();
        assert_eq!(rec.materials, vec!["black"]);
        assert_eq!(manifest.materials.len(), 1);
        assert_eq!(manifest.materials[0].graph.nodes().len(), 2);
    }

    #[test]
    fn writes_scene_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = Workspace::new();
        let body = create_box(&mut ws, "body", [0.2, 0.2, 0.05]).unwrap();
        let slot = create_box(&mut ws, "slot", [0.1, 0.01, 0.02]).unwrap();
        cut(&mut ws, body, slot).unwrap();
        create_anchor(&mut ws, "pivot");

        let report = export_scene(&ws, "console", &manifest_only(dir.path())).unwrap();
        assert!(report.stl_files.is_empty());
        let path = report.manifest.unwrap();
        assert_eq!(path, dir.path().join("console").join("scene.json"));

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let parts = json["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        let body = parts.iter().find(|p| p["name"] == "body").unwrap();
        assert_eq!(body["modifiers"][0]["kind"], "boolean_difference");
        assert_eq!(body["modifiers"][0]["tool"], "slot");
        assert_eq!(body["shape"]["kind"], "box");
        let pivot = parts.iter().find(|p| p["name"] == "pivot").unwrap();
        assert_eq!(pivot["shape"]["kind"], "anchor");
    }

    #[test]
    fn rejects_bad_unit_scale() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new();
        let cfg = ExportConfig {
            unit_scale: 0.0,
            ..manifest_only(dir.path())
        };
        assert!(matches!(
            export_scene(&ws, "empty", &cfg),
            Err(ReplicaError::InvalidParameter { name: "unit_scale", .. })
        ));
    }
}
