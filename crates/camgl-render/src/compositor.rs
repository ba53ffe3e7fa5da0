use std::rc::Rc;

use camgl_core::{GlContext, RenderResult, Texture};

/// An optional stage between the camera texture and the outputs.
///
/// Implementors render the frame into a texture they own and cache across
/// frames; the returned texture stays valid until the next call or until
/// the compositor is released. Passing a different context than the last
/// call releases the cache against the old one first.
pub trait FrameCompositor<C: GlContext> {
    fn render_frame(&mut self, context: &Rc<C>, texture: &Texture) -> RenderResult<&Texture>;

    /// Free every GPU object. Must be a no-op when the context is gone.
    fn release(&mut self);
}
