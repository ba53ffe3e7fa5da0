//! The raw GL command surface used by the renderers.
//!
//! Renderers never call the driver directly; every command goes through
//! [`GlApi`] so the same code runs against the real driver (`camgl-native`)
//! and against recording stubs in tests.

use gl::types::{GLenum, GLint, GLsizei, GLuint};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::error::GlError;

/// `GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS` only exists in GL ES.
pub const GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS: GLenum = 0x8CD9;

/// Raw GL commands issued by the render core.
///
/// All methods assume the owning context is current on the calling thread.
pub trait GlApi {
    fn gen_framebuffer(&self) -> GLuint;
    fn delete_framebuffer(&self, framebuffer: GLuint);
    fn delete_texture(&self, texture: GLuint);

    fn bind_texture(&self, target: GLenum, texture: GLuint);
    /// Bind `framebuffer` to `GL_FRAMEBUFFER` (read and draw).
    fn bind_framebuffer(&self, framebuffer: GLuint);

    /// Allocate uninitialised RGBA8 storage for the texture bound to `target`.
    fn tex_image_2d_rgba(&self, target: GLenum, width: u32, height: u32);
    /// Attach `texture` to color attachment 0 of the bound framebuffer.
    fn framebuffer_texture_2d(&self, target: GLenum, texture: GLuint);
    fn check_framebuffer_status(&self) -> GLenum;

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei);

    fn get_error(&self) -> GLenum;
    fn get_integer(&self, pname: GLenum) -> GLint;
}

/// Result of `glCheckFramebufferStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum FramebufferStatus {
    Complete = gl::FRAMEBUFFER_COMPLETE,
    Undefined = gl::FRAMEBUFFER_UNDEFINED,
    IncompleteAttachment = gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
    IncompleteMissingAttachment = gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
    IncompleteDimensions = GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
    Unsupported = gl::FRAMEBUFFER_UNSUPPORTED,
    IncompleteMultisample = gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE,
}

impl FramebufferStatus {
    pub fn from_raw(status: GLenum) -> Option<Self> {
        Self::from_u32(status)
    }

    /// Human-readable name of a raw status, for logs and error messages.
    pub fn describe(status: GLenum) -> String {
        match Self::from_raw(status) {
            Some(s) => format!("{s:?}"),
            None => format!("0x{status:04X}"),
        }
    }
}

/// Errors reported by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum GlErrorCode {
    InvalidEnum = gl::INVALID_ENUM,
    InvalidValue = gl::INVALID_VALUE,
    InvalidOperation = gl::INVALID_OPERATION,
    OutOfMemory = gl::OUT_OF_MEMORY,
    InvalidFramebufferOperation = gl::INVALID_FRAMEBUFFER_OPERATION,
}

/// A pixel size as GL takes it, saturating at `GLsizei::MAX`.
pub fn gl_size(value: u32) -> GLsizei {
    GLsizei::try_from(value).unwrap_or(GLsizei::MAX)
}

/// Drain the GL error queue and report the first error, if any.
///
/// Call directly after the command that may fail; `what` names that
/// command in the error.
pub fn check_gl_error(gl: &dyn GlApi, what: &'static str) -> Result<(), GlError> {
    let first = gl.get_error();
    if first == gl::NO_ERROR {
        return Ok(());
    }
    // The queue may hold several flags; leave it empty for the next check.
    while gl.get_error() != gl::NO_ERROR {}

    Err(GlError {
        what,
        code: first,
        kind: GlErrorCode::from_u32(first),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Only `get_error` matters here.
    struct ErrorQueue(RefCell<Vec<GLenum>>);

    impl GlApi for ErrorQueue {
        fn gen_framebuffer(&self) -> GLuint {
            0
        }
        fn delete_framebuffer(&self, _: GLuint) {}
        fn delete_texture(&self, _: GLuint) {}
        fn bind_texture(&self, _: GLenum, _: GLuint) {}
        fn bind_framebuffer(&self, _: GLuint) {}
        fn tex_image_2d_rgba(&self, _: GLenum, _: u32, _: u32) {}
        fn framebuffer_texture_2d(&self, _: GLenum, _: GLuint) {}
        fn check_framebuffer_status(&self) -> GLenum {
            gl::FRAMEBUFFER_COMPLETE
        }
        fn viewport(&self, _: GLint, _: GLint, _: GLsizei, _: GLsizei) {}
        fn get_error(&self) -> GLenum {
            let mut queue = self.0.borrow_mut();
            if queue.is_empty() {
                gl::NO_ERROR
            } else {
                queue.remove(0)
            }
        }
        fn get_integer(&self, _: GLenum) -> GLint {
            0
        }
    }

    #[test]
    fn sizes_saturate_instead_of_wrapping() {
        assert_eq!(gl_size(1920), 1920);
        assert_eq!(gl_size(i32::MAX as u32), GLsizei::MAX);
        assert_eq!(gl_size(u32::MAX), GLsizei::MAX);
    }

    #[test]
    fn clean_queue_is_ok() {
        let gl = ErrorQueue(RefCell::new(vec![]));
        assert!(check_gl_error(&gl, "glViewport").is_ok());
    }

    #[test]
    fn reports_first_error_and_drains_the_rest() {
        let gl = ErrorQueue(RefCell::new(vec![
            gl::INVALID_OPERATION,
            gl::OUT_OF_MEMORY,
        ]));

        let err = check_gl_error(&gl, "eglMakeCurrent").unwrap_err();
        assert_eq!(err.kind, Some(GlErrorCode::InvalidOperation));
        assert_eq!(err.what, "eglMakeCurrent");
        assert!(gl.0.borrow().is_empty());
        assert!(check_gl_error(&gl, "eglMakeCurrent").is_ok());
    }

    #[test]
    fn unknown_codes_are_kept_raw() {
        let gl = ErrorQueue(RefCell::new(vec![0x1234]));
        let err = check_gl_error(&gl, "glDrawArrays").unwrap_err();
        assert_eq!(err.kind, None);
        assert_eq!(err.code, 0x1234);
    }

    #[test]
    fn framebuffer_status_names() {
        assert_eq!(
            FramebufferStatus::from_raw(0x8CD9),
            Some(FramebufferStatus::IncompleteDimensions)
        );
        assert_eq!(
            FramebufferStatus::describe(gl::FRAMEBUFFER_UNSUPPORTED),
            "Unsupported"
        );
        assert_eq!(FramebufferStatus::describe(0x1), "0x0001");
    }
}
