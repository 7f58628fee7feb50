//! Render composition.
//!
//! Flows describe what they want drawn with the [`Render`] enum. The engine
//! flattens every flow's render tree into one list of [`Instanced`] items and
//! draws them with the matcap pipeline, so flows never touch a render pass.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum describing render operations
//! - [`Instanced<'a>`] is one instanced draw (model, material and instance buffer)
//!

use crate::data_structures::model::{Material, Model};

/// Data for instanced rendering: a model, its material and an instance buffer.
///
/// Only the first `amount` instances of the buffer are drawn.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub material: &'a Material,
    pub amount: usize,
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of instanced objects
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
///
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn collect(self, instanced: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Default(item) => instanced.push(item),
            Render::Defaults(mut items) => instanced.append(&mut items),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect(instanced)),
            Render::None => (),
        }
    }
}

impl<'a> From<Option<Instanced<'a>>> for Render<'a> {
    fn from(item: Option<Instanced<'a>>) -> Self {
        match item {
            Some(item) => Render::Default(item),
            None => Render::None,
        }
    }
}
