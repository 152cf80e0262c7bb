//! Declarative material descriptions.
//!
//! A [`Material`] is plain data. Renderer-specific node graphs are produced
//! from it by [`crate::shader_graph`]; nothing here knows about nodes.

use std::path::{Path, PathBuf};

use nalgebra::Point3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::{require_unit_interval, ReplicaError, Result};

/// Linear RGBA, components in [0, 1] (emission colours may exceed 1).
pub type Rgba = [f32; 4];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialKind {
    /// Opaque principled surface.
    Simple(Surface),
    /// Noise-driven blend between a clean and a worn state.
    Wear(WearPattern),
    /// Emissive indicator mixed over a principled surface.
    Glow(Glow),
    /// Surface coloured by an image file.
    Image(ImageTexture),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Surface {
    pub base_color: Rgba,
    pub metallic: f32,
    pub roughness: f32,
}

/// Parameters of the scalar noise field; `roughness` here shapes the noise
/// octaves, not the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub scale: f64,
    pub detail: f64,
    pub roughness: f64,
    pub seed: u32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            scale: 200.0,
            detail: 2.0,
            roughness: 0.7,
            seed: 0,
        }
    }
}

/// Two-stop linear ramp: worn at or below `low`, clean at or above `high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorRamp {
    pub low: f32,
    pub high: f32,
    pub worn: Rgba,
    pub clean: Rgba,
}

impl ColorRamp {
    /// Blend factor in [0, 1]; 0 is fully worn, 1 fully clean.
    pub fn factor(&self, value: f64) -> f32 {
        let t = (value as f32 - self.low) / (self.high - self.low);
        t.clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Rgba {
        let t = self.factor(value);
        let mut out = [0.0; 4];
        for (o, (w, c)) in out.iter_mut().zip(self.worn.iter().zip(self.clean.iter())) {
            *o = w * (1.0 - t) + c * t;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WearPattern {
    pub ramp: ColorRamp,
    pub noise: NoiseSettings,
    pub metallic: f32,
    pub roughness: f32,
    pub emission_strength: f32,
    pub bump_strength: f32,
}

/// Everything one noise sample drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WearSample {
    pub base_color: Rgba,
    pub emission_color: Rgba,
    pub emission_strength: f32,
    /// Weight of the emissive term in the final blend.
    pub emission_mix: f32,
    pub bump_height: f32,
}

impl WearPattern {
    pub fn sample(&self, noise: f64) -> WearSample {
        let color = self.ramp.color(noise);
        WearSample {
            base_color: color,
            emission_color: color,
            emission_strength: self.emission_strength,
            emission_mix: luminance(&color).clamp(0.0, 1.0),
            bump_height: noise.clamp(0.0, 1.0) as f32 * self.bump_strength,
        }
    }

    pub fn sample_at(&self, field: &NoiseField, p: &Point3<f64>) -> WearSample {
        self.sample(field.sample(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Glow {
    pub color: Rgba,
    pub strength: f32,
    /// 0 shows only the emissive term, 1 only the surface.
    pub mix: f32,
    pub metallic: f32,
    pub roughness: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageTexture {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub roughness: f32,
}

/// Rec. 709 luminance, the usual colour-to-scalar conversion of node shaders.
pub fn luminance(c: &Rgba) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

/// Fractal Perlin noise remapped to [0, 1].
pub struct NoiseField {
    perlin: Perlin,
    settings: NoiseSettings,
}

impl NoiseField {
    pub fn new(settings: NoiseSettings) -> Self {
        Self {
            perlin: Perlin::new(settings.seed),
            settings,
        }
    }

    fn octaves(&self) -> u32 {
        self.settings.detail.max(0.0).floor() as u32 + 1
    }

    pub fn sample(&self, p: &Point3<f64>) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.settings.scale;
        let mut max_value = 0.0;

        for _ in 0..self.octaves() {
            total += self.perlin.get([p.x * frequency, p.y * frequency, p.z * frequency]) * amplitude;
            max_value += amplitude;
            amplitude *= self.settings.roughness;
            frequency *= 2.0;
        }

        ((total / max_value + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

fn require_color(name: &'static str, c: &Rgba) -> Result<()> {
    if c.iter().all(|v| v.is_finite() && *v >= 0.0) {
        Ok(())
    } else {
        Err(ReplicaError::invalid(name, format!("expected finite non-negative components, got {c:?}")))
    }
}

fn require_non_negative(name: &'static str, v: f32) -> Result<f32> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(ReplicaError::invalid(name, format!("expected a finite non-negative value, got {v}")))
    }
}

/// Opaque material for bodies, buttons, ports and rails.
pub fn make_material(name: &str, base_color: Rgba, metallic: f32, roughness: f32) -> Result<Material> {
    require_color("base_color", &base_color)?;
    Ok(Material {
        name: name.to_string(),
        kind: MaterialKind::Simple(Surface {
            base_color,
            metallic: require_unit_interval("metallic", metallic)?,
            roughness: require_unit_interval("roughness", roughness)?,
        }),
    })
}

/// Worn-metal material with the contact defaults; adjust the returned
/// pattern through [`Material::wear_mut`] if needed.
pub fn make_wear_material(
    name: &str,
    clean_color: Rgba,
    worn_color: Rgba,
    wear_threshold_low: f32,
    wear_threshold_high: f32,
    emission_strength: f32,
) -> Result<Material> {
    require_color("clean_color", &clean_color)?;
    require_color("worn_color", &worn_color)?;
    let low = require_unit_interval("wear_threshold_low", wear_threshold_low)?;
    let high = require_unit_interval("wear_threshold_high", wear_threshold_high)?;
    if low >= high {
        return Err(ReplicaError::invalid(
            "wear_threshold_high",
            format!("must be greater than the low threshold ({low} >= {high})"),
        ));
    }
    Ok(Material {
        name: name.to_string(),
        kind: MaterialKind::Wear(WearPattern {
            ramp: ColorRamp {
                low,
                high,
                worn: worn_color,
                clean: clean_color,
            },
            noise: NoiseSettings::default(),
            metallic: 1.0,
            roughness: 0.15,
            emission_strength: require_non_negative("emission_strength", emission_strength)?,
            bump_strength: 0.02,
        }),
    })
}

pub fn make_glow_material(name: &str, color: Rgba, strength: f32, mix: f32) -> Result<Material> {
    require_color("color", &color)?;
    Ok(Material {
        name: name.to_string(),
        kind: MaterialKind::Glow(Glow {
            color,
            strength: require_non_negative("strength", strength)?,
            mix: require_unit_interval("mix", mix)?,
            metallic: 0.1,
            roughness: 0.3,
        }),
    })
}

/// Material backed by an image on disk. Fails with `MissingAsset` when the
/// file is absent or cannot be decoded.
pub fn load_image_material(name: &str, path: &Path, roughness: f32) -> Result<Material> {
    let missing = |reason: String| ReplicaError::MissingAsset {
        path: path.to_path_buf(),
        reason,
    };
    if !path.is_file() {
        return Err(missing("no such file".to_string()));
    }
    let (width, height) = image::image_dimensions(path).map_err(|e| missing(e.to_string()))?;
    Ok(Material {
        name: name.to_string(),
        kind: MaterialKind::Image(ImageTexture {
            path: path.to_path_buf(),
            width,
            height,
            roughness: require_unit_interval("roughness", roughness)?,
        }),
    })
}

impl Material {
    pub fn wear(&self) -> Option<&WearPattern> {
        match &self.kind {
            MaterialKind::Wear(w) => Some(w),
            _ => None,
        }
    }

    pub fn wear_mut(&mut self) -> Option<&mut WearPattern> {
        match &mut self.kind {
            MaterialKind::Wear(w) => Some(w),
            _ => None,
        }
    }

    /// Colour a viewer would show for the material at a glance.
    pub fn display_color(&self) -> Rgba {
        match &self.kind {
            MaterialKind::Simple(s) => s.base_color,
            MaterialKind::Wear(w) => w.ramp.clean,
            MaterialKind::Glow(g) => g.color,
            MaterialKind::Image(_) => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const CLEAN: Rgba = [0.95, 0.95, 0.95, 1.0];
    const WORN: Rgba = [0.7, 0.7, 0.7, 1.0];

    fn contact_wear() -> WearPattern {
        *make_wear_material("contact", CLEAN, WORN, 0.4, 0.6, 0.1)
            .unwrap()
            .wear()
            .unwrap()
    }

    #[test]
    fn ramp_endpoints() {
        let wear = contact_wear();
        assert_eq!(wear.sample(1.0).base_color, CLEAN);
        assert_eq!(wear.sample(0.0).base_color, WORN);
        assert_eq!(wear.sample(0.4).base_color, WORN);
        assert_eq!(wear.sample(0.6).base_color, CLEAN);
        let mid = wear.sample(0.5).base_color;
        assert_relative_eq!(mid[0], 0.825, epsilon = 1e-6);
    }

    #[test]
    fn one_sample_drives_every_effect() {
        let wear = contact_wear();
        for v in [0.0, 0.3, 0.45, 0.55, 0.9] {
            let s = wear.sample(v);
            assert_eq!(s.emission_color, s.base_color);
            assert_relative_eq!(s.emission_mix, luminance(&s.base_color), epsilon = 1e-6);
            assert_relative_eq!(s.bump_height, v as f32 * 0.02, epsilon = 1e-7);
            assert_relative_eq!(s.emission_strength, 0.1);
        }
    }

    #[test]
    fn field_sample_matches_direct_sample() {
        let wear = contact_wear();
        let field = NoiseField::new(wear.noise);
        let p = Point3::new(0.01, 0.155, 0.045);
        let v = field.sample(&p);
        assert!((0.0..=1.0).contains(&v));
        assert_eq!(wear.sample_at(&field, &p), wear.sample(v));
        // Deterministic for a fixed seed.
        assert_eq!(NoiseField::new(wear.noise).sample(&p), v);
    }

    #[test]
    fn invalid_parameters() {
        assert!(make_material("m", [0.5; 4], 1.5, 0.5).is_err());
        assert!(make_material("m", [0.5; 4], 0.5, -0.1).is_err());
        assert!(make_material("m", [f32::NAN, 0.0, 0.0, 1.0], 0.5, 0.5).is_err());
        assert!(make_wear_material("w", CLEAN, WORN, 0.6, 0.4, 0.1).is_err());
        assert!(make_wear_material("w", CLEAN, WORN, 0.4, 0.4, 0.1).is_err());
        assert!(make_wear_material("w", CLEAN, WORN, 0.4, 0.6, -1.0).is_err());
        assert!(make_glow_material("g", [0.8, 0.1, 0.1, 1.0], 0.5, 2.0).is_err());
    }

    #[test]
    fn missing_image_is_missing_asset() {
        let err = load_image_material("page", Path::new("/definitely/not/here.png"), 0.5).unwrap_err();
        assert!(matches!(err, ReplicaError::MissingAsset { .. }));
    }

    #[test]
    fn image_dimensions_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();
        let mat = load_image_material("cover", &path, 0.4).unwrap();
        match mat.kind {
            MaterialKind::Image(tex) => {
                assert_eq!((tex.width, tex.height), (4, 3));
                assert_eq!(tex.path, path);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn garbage_file_is_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            load_image_material("broken", &path, 0.4),
            Err(ReplicaError::MissingAsset { .. })
        ));
    }

    proptest! {
        #[test]
        fn ramp_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let wear = contact_wear();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(wear.ramp.factor(lo) <= wear.ramp.factor(hi));
            prop_assert!(wear.sample(lo).base_color[0] <= wear.sample(hi).base_color[0] + 1e-6);
        }
    }
}
