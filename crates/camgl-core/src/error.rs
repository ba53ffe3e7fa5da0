//! Failure taxonomy of the render core.
//!
//! Every failure is detected synchronously right after the call that can
//! produce it and returned to the caller; whether to drop the frame or tear
//! the pipeline down is the caller's decision.

use gl::types::{GLenum, GLuint};
use thiserror::Error;

use crate::gl_api::{FramebufferStatus, GlErrorCode};
use crate::texture::Texture;

pub type RenderResult<T> = Result<T, RenderError>;

/// A flag raised by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{what} raised GL error {}", describe_gl_error(.code, .kind))]
pub struct GlError {
    /// The command after which the error was observed.
    pub what: &'static str,
    pub code: GLenum,
    pub kind: Option<GlErrorCode>,
}

fn describe_gl_error(code: &GLenum, kind: &Option<GlErrorCode>) -> String {
    match kind {
        Some(kind) => format!("{kind:?}"),
        None => format!("0x{code:04X}"),
    }
}

fn describe_status(status: &GLenum) -> String {
    FramebufferStatus::describe(*status)
}

fn describe_texture(texture: &Texture) -> String {
    format!("#{} ({:?})", texture.id, texture.kind)
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// Making the context current failed (stale surface, lost context).
    /// The next frame may succeed again.
    #[error("failed to activate GL context")]
    ContextActivation(#[source] anyhow::Error),

    /// No drawable surface could be created for the window. Requires a new
    /// renderer.
    #[error("failed to create window surface")]
    SurfaceCreation(#[source] anyhow::Error),

    /// The 2D backend refused to wrap an on-screen framebuffer.
    #[error("2D backend could not wrap framebuffer {framebuffer} ({width}x{height})")]
    SurfaceWrap {
        framebuffer: GLuint,
        width: u32,
        height: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The GPU rejected an offscreen attachment.
    #[error(
        "offscreen framebuffer incomplete for {width}x{height} target: {}",
        describe_status(.status)
    )]
    FramebufferIncomplete {
        width: u32,
        height: u32,
        status: GLenum,
    },

    /// The 2D backend refused to import a texture.
    #[error("2D backend could not wrap texture {}", describe_texture(.texture))]
    ImageWrap {
        texture: Texture,
        #[source]
        source: anyhow::Error,
    },

    /// Swap/present failed.
    #[error("failed to present frame")]
    Present(#[source] anyhow::Error),

    /// The context could not allocate an offscreen texture.
    #[error("failed to allocate {width}x{height} offscreen texture")]
    TextureCreation {
        width: u32,
        height: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The pass-through program or the 2D backend failed while drawing.
    #[error("draw failed")]
    Draw(#[source] anyhow::Error),

    /// A frame arrived before the camera input texture was created.
    #[error("no input texture has been created yet")]
    NoInputTexture,
}

impl RenderError {
    /// Whether the failure invalidates the renderer instance, as opposed to
    /// only the current frame.
    pub fn is_fatal_for_renderer(&self) -> bool {
        matches!(
            self,
            RenderError::SurfaceCreation(_) | RenderError::SurfaceWrap { .. }
        )
    }
}
