//! GPU side data: models, materials, textures and instances.
//!
//! - `model` holds uploaded meshes and the matcap material
//! - `texture` wraps GPU textures, including the depth buffer
//! - `instance` holds per-instance transforms and their vertex layout
//! - `batch` pairs a model with its instance buffer

pub mod batch;
pub mod instance;
pub mod model;
pub mod texture;
