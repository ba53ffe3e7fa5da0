//! Driver-backed implementations of the `camgl-core` seams.
//!
//! - [`NativeGl`] issues the render core's raw GL commands through the `gl`
//!   crate.
//! - [`PassThroughShader`] is the copy/transform program used by every
//!   renderer.
//! - [`GlCanvasBackend`] is a small 2D-drawing backend built from
//!   framebuffers and the pass-through program.
//!
//! ### Warning
//!
//! Everything here assumes a GL (ES) context is current on the calling
//! thread. Calling into the driver without one is undefined behavior.

mod gl_backend;
pub mod canvas;
pub mod passthrough;
pub mod validate_gl;

pub use canvas::{GlCanvas, GlCanvasBackend, GlImage, GlSurface};
pub use gl_backend::NativeGl;
pub use passthrough::PassThroughShader;
