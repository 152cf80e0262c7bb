//! Procedural replica of a cartridge console and its printed manual.
//!
//! Parts are built from literal measurements in meters, carved with boolean
//! cuts, dressed with declarative materials and grouped into assemblies.
//! The finished workspace is exported as STL meshes plus a JSON manifest.

pub mod boolean;
pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod geometry;
pub mod hierarchy;
pub mod layout;
pub mod manual;
pub mod material;
pub mod primitives;
pub mod shader_graph;
pub mod workspace;

pub use error::{CompositionError, ReplicaError, Result};
pub use workspace::{MaterialId, PartId, Workspace};
