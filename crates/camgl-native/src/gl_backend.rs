//! Raw OpenGL backend for the render core, driving the current context.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Once;

use camgl_core::{gl_size, GlApi};
use gl::types::{GLenum, GLint, GLsizei, GLuint};

pub(crate) static GL_INIT_ONCE: Once = Once::new();

/// [`GlApi`] implementation calling the loaded `gl` function pointers.
///
/// Not `Send`: GL calls must stay on the thread the context is current on.
#[derive(Debug)]
pub struct NativeGl {
    _thread_affine: PhantomData<*const ()>,
}

impl NativeGl {
    /// Load GL function pointers with `gl_loader`, exactly once per process.
    ///
    /// # Safety
    ///
    /// Every method of the returned value must be called on a thread where a
    /// GL context is current. Calling it elsewhere is undefined behavior.
    pub unsafe fn load() -> Self {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        });
        tracing::debug!("GL loaded: {}", Self::is_loaded());

        Self {
            _thread_affine: PhantomData,
        }
    }

    /// Load GL function pointers with a platform loader such as
    /// `eglGetProcAddress`, exactly once per process.
    ///
    /// # Safety
    ///
    /// Same contract as [`NativeGl::load`]; `loader` must return valid
    /// function pointers for the current context's API.
    pub unsafe fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        GL_INIT_ONCE.call_once(move || gl::load_with(loader));

        Self {
            _thread_affine: PhantomData,
        }
    }

    /// Whether the function pointers the render core needs were resolved.
    pub fn is_loaded() -> bool {
        gl::GenFramebuffers::is_loaded()
            && gl::FramebufferTexture2D::is_loaded()
            && gl::CheckFramebufferStatus::is_loaded()
    }
}

impl GlApi for NativeGl {
    fn gen_framebuffer(&self) -> GLuint {
        let mut framebuffer = 0;
        unsafe { gl::GenFramebuffers(1, &mut framebuffer) };
        framebuffer
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        unsafe { gl::DeleteFramebuffers(1, &framebuffer) };
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe { gl::DeleteTextures(1, &texture) };
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { gl::BindTexture(target, texture) };
    }

    fn bind_framebuffer(&self, framebuffer: GLuint) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer) };
    }

    fn tex_image_2d_rgba(&self, target: GLenum, width: u32, height: u32) {
        unsafe {
            gl::TexImage2D(
                target,
                0,
                gl::RGBA as GLint,
                gl_size(width),
                gl_size(height),
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                ptr::null(),
            );
        }
    }

    fn framebuffer_texture_2d(&self, target: GLenum, texture: GLuint) {
        unsafe {
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                target,
                texture,
                0,
            );
        }
    }

    fn check_framebuffer_status(&self) -> GLenum {
        unsafe { gl::CheckFramebufferStatus(gl::FRAMEBUFFER) }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        unsafe { gl::Viewport(x, y, width, height) };
    }

    fn get_error(&self) -> GLenum {
        unsafe { gl::GetError() }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { gl::GetIntegerv(pname, &mut value) };
        value
    }
}
