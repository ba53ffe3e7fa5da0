//! The GPU context and window collaborators.
//!
//! The context owns the device connection and the logical display. It is
//! created and destroyed by the pipeline owner; renderers hold a
//! `std::rc::Weak` back-reference and only ever *use* it.

use std::ffi::c_void;

use crate::gl_api::GlApi;
use crate::texture::{Texture, TextureKind};

/// Opaque handle to a presentable surface bound to a native window
/// (an `EGLSurface` on Android).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawingSurface(usize);

impl DrawingSurface {
    pub fn from_raw(raw: *mut c_void) -> Self {
        Self(raw as usize)
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// A native window handle with its declared pixel size.
///
/// The implementor owns one reference to the platform window and releases
/// it on drop (`ANativeWindow_release`).
pub trait NativeWindow {
    fn raw_handle(&self) -> *mut c_void;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// The logical GPU device / display connection.
///
/// A context may be current on at most one thread at a time and none of
/// these methods may be called concurrently with another on the same
/// context.
pub trait GlContext {
    /// Raw GL commands, valid while this context is current.
    fn gl(&self) -> &dyn GlApi;

    /// Make the context current without a window surface (render-to-texture
    /// only).
    fn make_current(&self) -> anyhow::Result<()>;

    /// Make the context current with `surface` as draw and read target.
    fn make_current_with(&self, surface: DrawingSurface) -> anyhow::Result<()>;

    /// Present the current surface (swap buffers).
    fn flush(&self) -> anyhow::Result<()>;

    /// Generate a texture of `kind` with default sampling parameters.
    fn create_texture(&self, kind: TextureKind, width: u32, height: u32)
        -> anyhow::Result<Texture>;

    /// Create a window surface for `window` with this context's display and
    /// config.
    fn create_window_surface(&self, window: &dyn NativeWindow) -> anyhow::Result<DrawingSurface>;

    fn destroy_surface(&self, surface: DrawingSurface);

    /// `false` once the display has been torn down. Nothing may be released
    /// against a dead context.
    fn is_alive(&self) -> bool {
        true
    }
}
