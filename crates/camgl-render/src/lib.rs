//! Renderers of the camera GL render core.
//!
//! A [`VideoPipeline`] owns the shared [`GlContext`] and, per frame, runs an
//! optional [`FrameCompositor`] ([`RawCopyCompositor`] or
//! [`CanvasCompositor`]) before handing the texture to one
//! [`SurfaceRenderer`] per attached window.
//!
//! Every renderer holds only a weak back-reference to the context, so
//! dropping a renderer after the pipeline's owner destroyed the context
//! never releases anything against a dead display.

use std::rc::{Rc, Weak};

use camgl_core::GlContext;

pub mod canvas;
pub mod compositor;
pub mod config;
pub mod offscreen;
pub mod pipeline;
pub mod surface;

#[cfg(test)]
mod testing;

pub use canvas::{CanvasCompositor, Overlay, PresentTarget};
pub use compositor::FrameCompositor;
pub use config::{OffscreenMode, PipelineConfig};
pub use offscreen::{OffscreenCache, RawCopyCompositor};
pub use pipeline::{Output, VideoPipeline};
pub use surface::SurfaceRenderer;

/// The context behind `context`, unless it was dropped or torn down.
pub(crate) fn live_context<C: GlContext>(context: &Weak<C>) -> Option<Rc<C>> {
    context.upgrade().filter(|context| context.is_alive())
}
