//! Configuration loader for every measurement, count, colour and feature
//! toggle, read from `config.toml`.
//!
//! All sections fall back to the built-in Genesis measurements, so a config
//! file only has to name the values it changes.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::error::Result as ReplicaResult;
use crate::material::{make_material, Material, NoiseSettings, Rgba};

const CONFIG_ENV: &str = "RETRO_REPLICA_CONFIG";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub console: ConsoleConfig,
    pub manual: ManualConfig,
    pub export: ExportConfig,
}

/// Colour and finish of an opaque surface.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub color: Rgba,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::plastic([0.02, 0.02, 0.02, 1.0], 0.5)
    }
}

impl SurfaceConfig {
    pub const fn plastic(color: Rgba, roughness: f32) -> Self {
        Self {
            color,
            metallic: 0.0,
            roughness,
        }
    }

    pub const fn metal(color: Rgba, roughness: f32) -> Self {
        Self {
            color,
            metallic: 1.0,
            roughness,
        }
    }

    pub fn material(&self, name: &str) -> ReplicaResult<Material> {
        make_material(name, self.color, self.metallic, self.roughness)
    }
}

/// Which console features get built. Together these cover every historical
/// variant of the console model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub cartridge_slot: bool,
    pub guide_rails: bool,
    pub connector_pins: bool,
    pub pin_contacts: bool,
    pub buttons: bool,
    pub power_led: bool,
    pub controller_ports: bool,
    pub port_details: bool,
    pub grilles: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            cartridge_slot: true,
            guide_rails: true,
            connector_pins: true,
            pin_contacts: true,
            buttons: true,
            power_led: true,
            controller_ports: true,
            port_details: true,
            grilles: true,
        }
    }
}

impl FeatureToggles {
    /// Body only.
    pub fn none() -> Self {
        Self {
            cartridge_slot: false,
            guide_rails: false,
            connector_pins: false,
            pin_contacts: false,
            buttons: false,
            power_led: false,
            controller_ports: false,
            port_details: false,
            grilles: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub name_prefix: String,
    pub features: FeatureToggles,
    pub body: BodyConfig,
    pub cartridge: CartridgeConfig,
    pub connector: ConnectorConfig,
    pub contacts: ContactConfig,
    pub buttons: ButtonConfig,
    pub ports: PortConfig,
    pub grilles: GrilleConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name_prefix: "Genesis".to_string(),
            features: FeatureToggles::default(),
            body: BodyConfig::default(),
            cartridge: CartridgeConfig::default(),
            connector: ConnectorConfig::default(),
            contacts: ContactConfig::default(),
            buttons: ButtonConfig::default(),
            ports: PortConfig::default(),
            grilles: GrilleConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Part or material name with the console prefix.
    pub fn name(&self, suffix: &str) -> String {
        if self.name_prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.name_prefix, suffix)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Width (x), depth (y), height (z).
    pub size: [f64; 3],
    pub bevel_width: f64,
    pub bevel_segments: u32,
    pub surface: SurfaceConfig,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            size: [0.2781, 0.2146, 0.0572],
            bevel_width: 0.002,
            bevel_segments: 3,
            surface: SurfaceConfig::plastic([0.02, 0.02, 0.02, 1.0], 0.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CartridgeConfig {
    pub slot_size: [f64; 3],
    pub slot_center: [f64; 3],
    pub slot_bevel_width: f64,
    pub slot_bevel_segments: u32,
    pub rail_size: [f64; 3],
    /// Rails sit at ±`rail_offset_x`.
    pub rail_offset_x: f64,
    pub rail_y: f64,
    pub rail_z: f64,
    pub rail_surface: SurfaceConfig,
}

impl Default for CartridgeConfig {
    fn default() -> Self {
        Self {
            slot_size: [0.1143, 0.0127, 0.01905],
            slot_center: [0.0, 0.1073, 0.0286],
            slot_bevel_width: 0.001,
            slot_bevel_segments: 2,
            rail_size: [0.005, 0.15, 0.015],
            rail_offset_x: 0.055,
            rail_y: 0.1,
            rail_z: 0.045,
            rail_surface: SurfaceConfig::plastic([0.1, 0.1, 0.1, 1.0], 0.5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub base_size: [f64; 3],
    pub base_center: [f64; 3],
    pub base_surface: SurfaceConfig,
    pub pin_count: u32,
    pub pin_size: [f64; 3],
    pub pin_span: f64,
    pub pin_start: f64,
    pub pin_surface: SurfaceConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_size: [0.1, 0.02, 0.01],
            base_center: [0.0, 0.15, 0.045],
            base_surface: SurfaceConfig::plastic([0.1, 0.1, 0.1, 1.0], 0.5),
            pin_count: 32,
            pin_size: [0.002, 0.005, 0.008],
            pin_span: 0.1,
            pin_start: -0.05,
            pin_surface: SurfaceConfig::metal([0.8, 0.8, 0.8, 1.0], 0.2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub housing_size: [f64; 3],
    pub housing_center: [f64; 3],
    pub housing_surface: SurfaceConfig,
    pub count: u32,
    pub size: [f64; 3],
    pub span: f64,
    pub start: f64,
    pub clean_color: Rgba,
    pub worn_color: Rgba,
    pub wear_threshold_low: f32,
    pub wear_threshold_high: f32,
    pub emission_strength: f32,
    pub noise: NoiseSettings,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            housing_size: [0.102, 0.004, 0.008],
            housing_center: [0.0, 0.155, 0.045],
            housing_surface: SurfaceConfig::plastic([0.05, 0.05, 0.05, 1.0], 0.3),
            count: 32,
            size: [0.001, 0.003, 0.006],
            span: 0.1,
            start: -0.05,
            clean_color: [0.95, 0.95, 0.95, 1.0],
            worn_color: [0.7, 0.7, 0.7, 1.0],
            wear_threshold_low: 0.4,
            wear_threshold_high: 0.6,
            emission_strength: 0.1,
            noise: NoiseSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub size: [f64; 3],
    pub y: f64,
    pub z: f64,
    pub power_x: f64,
    pub reset_x: f64,
    pub bevel_width: f64,
    pub bevel_segments: u32,
    pub power_color: Rgba,
    pub other_color: Rgba,
    pub metallic: f32,
    pub roughness: f32,
    pub led_radius: f64,
    pub led_depth: f64,
    pub led_x: f64,
    pub led_color: Rgba,
    pub led_strength: f32,
    pub led_mix: f32,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            size: [0.0127, 0.00635, 0.002],
            y: 0.1073,
            z: 0.0286,
            power_x: -0.03,
            reset_x: 0.03,
            bevel_width: 0.0005,
            bevel_segments: 3,
            power_color: [0.8, 0.1, 0.1, 1.0],
            other_color: [0.02, 0.02, 0.02, 1.0],
            metallic: 0.1,
            roughness: 0.3,
            led_radius: 0.002,
            led_depth: 0.001,
            led_x: -0.02,
            led_color: [0.8, 0.1, 0.1, 1.0],
            led_strength: 0.5,
            led_mix: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// One port per entry, centred at this x.
    pub xs: Vec<f64>,
    pub face_y: f64,
    pub z: f64,
    pub housing_size: [f64; 3],
    pub housing_surface: SurfaceConfig,
    pub recess_size: [f64; 3],
    pub recess_center: [f64; 3],
    pub connector_size: [f64; 3],
    pub connector_offset_y: f64,
    pub connector_surface: SurfaceConfig,
    pub pin_radius: f64,
    pub pin_depth: f64,
    pub pin_offset_y: f64,
    pub pin_columns: u32,
    pub pin_rows: u32,
    /// Horizontal and vertical span of the pin grid.
    pub pin_grid_span: [f64; 2],
    pub pin_surface: SurfaceConfig,
    pub shield_size: [f64; 3],
    pub shield_offset_y: f64,
    pub shield_surface: SurfaceConfig,
    pub label_size: [f64; 2],
    pub label_offset_y: f64,
    pub label_offset_z: f64,
    pub label_surface: SurfaceConfig,
    pub cover_size: [f64; 3],
    pub cover_offset_y: f64,
    pub cover_surface: SurfaceConfig,
    pub bracket_size: [f64; 3],
    pub bracket_offset_x: f64,
    pub bracket_surface: SurfaceConfig,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            xs: vec![-0.02, 0.02],
            face_y: 0.2146,
            z: 0.0286,
            housing_size: [0.0381, 0.005, 0.0127],
            housing_surface: SurfaceConfig::plastic([0.02, 0.02, 0.02, 1.0], 0.3),
            recess_size: [0.085, 0.008, 0.015],
            recess_center: [0.0, 0.2146, 0.0286],
            connector_size: [0.035, 0.004, 0.011],
            connector_offset_y: 0.002,
            connector_surface: SurfaceConfig::plastic([0.1, 0.1, 0.1, 1.0], 0.3),
            pin_radius: 0.001,
            pin_depth: 0.003,
            pin_offset_y: 0.003,
            pin_columns: 3,
            pin_rows: 3,
            pin_grid_span: [0.06, 0.02],
            pin_surface: SurfaceConfig::metal([0.8, 0.8, 0.8, 1.0], 0.2),
            shield_size: [0.040, 0.003, 0.014],
            shield_offset_y: 0.004,
            shield_surface: SurfaceConfig::metal([0.7, 0.7, 0.7, 1.0], 0.2),
            label_size: [0.015, 0.005],
            label_offset_y: 0.007,
            label_offset_z: 0.008,
            label_surface: SurfaceConfig::plastic([1.0, 1.0, 1.0, 1.0], 0.2),
            cover_size: [0.039, 0.002, 0.013],
            cover_offset_y: 0.006,
            cover_surface: SurfaceConfig {
                color: [0.1, 0.1, 0.1, 1.0],
                metallic: 0.1,
                roughness: 0.4,
            },
            bracket_size: [0.002, 0.008, 0.0127],
            bracket_offset_x: 0.020,
            bracket_surface: SurfaceConfig::metal([0.8, 0.8, 0.8, 1.0], 0.3),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrilleConfig {
    pub top_size: [f64; 3],
    pub top_center: [f64; 3],
    pub top_slots: u32,
    pub side_size: [f64; 3],
    /// Side grilles sit at ±`side_offset_x`.
    pub side_offset_x: f64,
    pub side_y: f64,
    pub side_z: f64,
    pub side_slots: u32,
    pub slot_size: [f64; 3],
    pub surface: SurfaceConfig,
}

impl Default for GrilleConfig {
    fn default() -> Self {
        Self {
            top_size: [0.15, 0.05, 0.001],
            top_center: [0.0, 0.1, 0.0572],
            top_slots: 10,
            side_size: [0.001, 0.05, 0.03],
            side_offset_x: 0.139,
            side_y: 0.1,
            side_z: 0.0286,
            side_slots: 8,
            slot_size: [0.002, 0.05, 0.002],
            surface: SurfaceConfig::plastic([0.02, 0.02, 0.02, 1.0], 0.3),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    pub enabled: bool,
    pub name_prefix: String,
    pub num_pages: u32,
    /// Page width (x) and height (y).
    pub page_size: [f64; 2],
    pub page_thickness: f64,
    pub cover_thickness: f64,
    /// Spine width contributed by each page.
    pub per_page_unit: f64,
    pub subdivision_levels: u32,
    pub paper_surface: SurfaceConfig,
    pub cover_surface: SurfaceConfig,
    pub front_cover_image: Option<PathBuf>,
    pub back_cover_image: Option<PathBuf>,
    /// Page images by page index; missing entries keep the paper material.
    pub page_images: Vec<PathBuf>,
    pub image_roughness: f32,
    /// Rotation of the front cover about the binding edge.
    pub open_angle_deg: f64,
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name_prefix: "Manual".to_string(),
            num_pages: 20,
            page_size: [0.1778, 0.127],
            page_thickness: 0.0002,
            cover_thickness: 0.0005,
            per_page_unit: 0.0002,
            subdivision_levels: 2,
            paper_surface: SurfaceConfig::plastic([0.95, 0.95, 0.92, 1.0], 0.8),
            cover_surface: SurfaceConfig::plastic([0.05, 0.05, 0.05, 1.0], 0.4),
            front_cover_image: None,
            back_cover_image: None,
            page_images: Vec::new(),
            image_roughness: 0.5,
            open_angle_deg: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// Meters to output units (1000 writes millimeters).
    pub unit_scale: f64,
    pub write_stl: bool,
    pub write_manifest: bool,
    /// Merge each assembly into a single mesh instead of one file per part.
    pub join_assemblies: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("models"),
            unit_scale: 1000.0,
            write_stl: true,
            write_manifest: true,
            join_assemblies: false,
        }
    }
}

/// Resolve the path to config.toml.
///
/// Tries in order:
/// 1. `RETRO_REPLICA_CONFIG` environment variable
/// 2. `config.toml` in the crate manifest directory (compile-time)
/// 3. `config.toml` next to the current executable
/// 4. `config.toml` in the current directory
fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }

    let manifest_relative = Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_FILE);
    if manifest_relative.exists() {
        return Some(manifest_relative);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    let cwd = PathBuf::from(CONFIG_FILE);
    cwd.exists().then_some(cwd)
}

pub fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, path)
}

/// Load the project configuration, or the built-in defaults when no file
/// can be found.
pub fn load_config() -> Result<Config, ConfigError> {
    match resolve_config_path() {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config_from(&path)
        }
        None => {
            info!("no config.toml found, using built-in measurements");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("", Path::new("inline.toml")).unwrap();
        assert_eq!(cfg.console.body.size, [0.2781, 0.2146, 0.0572]);
        assert_eq!(cfg.console.connector.pin_count, 32);
        assert_eq!(cfg.manual.num_pages, 20);
        assert_eq!(cfg.console.features, FeatureToggles::default());
    }

    #[test]
    fn partial_sections_override_single_values() {
        let text = r#"
            [console.features]
            grilles = false

            [console.connector]
            pin_count = 16

            [manual]
            num_pages = 8
            front_cover_image = "art/front.png"
        "#;
        let cfg = parse_config(text, Path::new("inline.toml")).unwrap();
        assert!(!cfg.console.features.grilles);
        assert!(cfg.console.features.buttons);
        assert_eq!(cfg.console.connector.pin_count, 16);
        assert_eq!(cfg.console.connector.pin_span, 0.1);
        assert_eq!(cfg.manual.num_pages, 8);
        assert_eq!(cfg.manual.front_cover_image, Some(PathBuf::from("art/front.png")));
    }

    #[test]
    fn negative_count_is_a_parse_error() {
        let err = parse_config("[console.connector]\npin_count = -3\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config_from(Path::new("/no/such/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn shipped_config_matches_built_in_measurements() {
        let cfg = parse_config(include_str!("../config.toml"), Path::new("config.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(cfg.console.body.size, defaults.console.body.size);
        assert_eq!(cfg.console.cartridge.slot_center, defaults.console.cartridge.slot_center);
        assert_eq!(cfg.console.contacts.noise, defaults.console.contacts.noise);
        assert_eq!(cfg.console.ports.xs, defaults.console.ports.xs);
        assert_eq!(cfg.console.grilles.side_offset_x, defaults.console.grilles.side_offset_x);
        assert_eq!(cfg.manual.per_page_unit, defaults.manual.per_page_unit);
        assert_eq!(cfg.export.unit_scale, 1000.0);
    }

    #[test]
    fn name_prefix() {
        let mut cfg = ConsoleConfig::default();
        assert_eq!(cfg.name("Body"), "Genesis_Body");
        cfg.name_prefix.clear();
        assert_eq!(cfg.name("Body"), "Body");
    }
}
