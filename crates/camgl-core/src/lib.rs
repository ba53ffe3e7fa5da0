//! Data model and collaborator interfaces for the camera GL render core.
//!
//! Nothing in this crate talks to a GPU driver. It defines what a frame looks
//! like ([`Texture`], [`TransformMatrix`]), the seams through which the
//! renderers in `camgl-render` reach the driver ([`GlApi`], [`GlContext`],
//! [`PassThroughDraw`], [`CanvasBackend`]) and the typed failures they report
//! ([`RenderError`]).
//!
//! Concrete driver-backed implementations of the seams live in
//! `camgl-native`.

pub mod canvas;
pub mod context;
pub mod error;
pub mod gl_api;
pub mod log;
pub mod matrix;
pub mod shader;
pub mod texture;

pub use canvas::{Canvas, CanvasBackend, Color, Rect, RenderTargetDesc};
pub use context::{DrawingSurface, GlContext, NativeWindow};
pub use error::{GlError, RenderError, RenderResult};
pub use gl_api::{check_gl_error, gl_size, FramebufferStatus, GlApi, GlErrorCode};
pub use matrix::TransformMatrix;
pub use shader::PassThroughDraw;
pub use texture::{Texture, TextureKind};

/// The default (window-system provided) framebuffer.
pub const DEFAULT_FRAMEBUFFER: gl::types::GLuint = 0;
