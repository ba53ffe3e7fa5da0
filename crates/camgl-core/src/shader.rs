//! The pass-through draw collaborator.

use crate::matrix::TransformMatrix;
use crate::texture::Texture;

/// Draws one texture into the currently bound framebuffer while applying a
/// 4x4 texture-coordinate transform.
pub trait PassThroughDraw {
    fn draw(&mut self, texture: &Texture, matrix: &TransformMatrix) -> anyhow::Result<()>;

    /// Free GPU objects. Called with the owning context current, only while
    /// that context is still alive.
    fn release(&mut self) {}
}

impl<T: PassThroughDraw + ?Sized> PassThroughDraw for Box<T> {
    fn draw(&mut self, texture: &Texture, matrix: &TransformMatrix) -> anyhow::Result<()> {
        (**self).draw(texture, matrix)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
