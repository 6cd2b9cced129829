/// Raw file access and the little-endian reader both decoders are built on
pub mod data;
/// Error definitions
pub mod error;
/// Polygon collision and vector helpers
pub mod math;
/// Model types and the chunked/keyframe decoders
pub mod models;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;

pub use models::mesh::{AnimationRange, BoundingBox, Face, Material, Model, Object};
pub use models::texture::{TextureHandle, TextureRegistry};
pub use models::{DecodeWarning, Decoded, LoadOptions, LoadedModel, ModelFormat, load_model};
