//! Lumen Core - surface description shared by every shape.
//!
//! This crate provides:
//!
//! - **Materials**: [`Material`], the value record resolved at each hit
//! - **Textures**: the [`Texture`] sampling trait and the in-memory
//!   [`ImageTexture`] built from already decoded images
//!
//! # Example
//!
//! ```
//! use lumen_core::Material;
//! use lumen_math::hex_color;
//!
//! let glass = Material::clear(1.5, 0.0);
//! let lamp = Material::light(hex_color(0xFFFFFF), 5.0);
//! assert!(glass.transparent);
//! assert!(lamp.is_emissive());
//! ```

pub mod material;
pub mod texture;

// Re-export commonly used types
pub use material::Material;
pub use texture::{ImageTexture, Texture, TextureError, TextureResult};
