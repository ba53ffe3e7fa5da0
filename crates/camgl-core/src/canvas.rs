//! The 2D-drawing backend interface.
//!
//! The compositor only relies on this contract, never on a backend's
//! internals, so a vendor canvas library, the bundled GL backend, or a test
//! stub can be swapped in. Backends mutate GL bindings behind the caller's
//! back; [`CanvasBackend::reset`] must be called before every use.

use gl::types::{GLenum, GLuint};

use crate::gl_api::GlApi;
use crate::texture::Texture;

/// `GL_STENCIL_BITS` is not in the core-profile `gl` bindings but is valid
/// on GL ES.
const GL_STENCIL_BITS: GLenum = 0x0D57;

/// An axis-aligned rectangle in surface pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full area of a `width` x `height` surface.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// An on-screen render target to be wrapped by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub framebuffer: GLuint,
    pub sample_count: u32,
    pub stencil_bits: u32,
}

impl RenderTargetDesc {
    /// Describe the bound default framebuffer, querying its multisample and
    /// stencil configuration from the live GL state.
    pub fn default_framebuffer(gl: &dyn GlApi, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            framebuffer: crate::DEFAULT_FRAMEBUFFER,
            sample_count: gl.get_integer(gl::SAMPLES).max(0) as u32,
            stencil_bits: gl.get_integer(GL_STENCIL_BITS).max(0) as u32,
        }
    }
}

/// Drawing commands available on a backend surface.
pub trait Canvas<I> {
    fn clear(&mut self, color: Color);
    /// Draw `image` scaled to fill `dst`.
    fn draw_image(&mut self, image: &I, dst: Rect) -> anyhow::Result<()>;
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// A 2D-drawing backend layered on the raw GL device.
pub trait CanvasBackend: Sized {
    /// A texture imported into the backend (zero-copy borrow).
    type Image;
    /// A backend drawing surface.
    type Surface;
    type CanvasRef<'a>: Canvas<Self::Image>
    where
        Self: 'a;

    /// Bind to the GL device of the current context.
    fn connect(gl: &dyn GlApi) -> anyhow::Result<Self>;

    /// Re-synchronise the backend with GL state changed by others.
    fn reset(&mut self);

    /// Allocate a backend-owned surface rendering into a new texture.
    fn new_offscreen_surface(&mut self, width: u32, height: u32) -> anyhow::Result<Self::Surface>;

    /// The texture backing an offscreen surface; `None` for wrapped targets.
    fn surface_texture(&self, surface: &Self::Surface) -> Option<Texture>;

    /// Wrap an existing framebuffer.
    fn wrap_render_target(&mut self, target: &RenderTargetDesc) -> anyhow::Result<Self::Surface>;

    /// Import `texture` without copying.
    fn wrap_texture(&mut self, texture: &Texture) -> anyhow::Result<Self::Image>;

    fn canvas<'a>(&'a mut self, surface: &'a mut Self::Surface) -> Self::CanvasRef<'a>;

    /// Submit queued GPU work.
    fn flush(&mut self) -> anyhow::Result<()>;

    /// Release a surface and any GPU objects it owns. Requires the context
    /// to be current.
    fn release_surface(&mut self, surface: Self::Surface);

    /// Free backend-owned GPU objects. Requires the context to be current.
    fn release(&mut self);

    /// Forget every GPU object without touching GL, for when the context is
    /// already gone.
    fn abandon(&mut self);
}
