//! Validate and reset the state of the current GL context.

use camgl_core::texture::GL_TEXTURE_EXTERNAL_OES;
use gl::types::{GLenum, GLuint};

/// `GL_TEXTURE_BINDING_EXTERNAL_OES`, GL ES only.
const GL_TEXTURE_BINDING_EXTERNAL_OES: GLenum = 0x8D67;

/// Describes an OpenGL texture target/binding pair.
pub struct TextureType {
    pub target: GLenum,
    pub binding: GLenum,
}

/// Texture targets a camera pipeline binds and must unbind on reset.
pub const TEXTURE_TYPES: [TextureType; 2] = [
    TextureType {
        target: gl::TEXTURE_2D,
        binding: gl::TEXTURE_BINDING_2D,
    },
    TextureType {
        target: GL_TEXTURE_EXTERNAL_OES,
        binding: GL_TEXTURE_BINDING_EXTERNAL_OES,
    },
];

/// Reset GL state to the defaults the render core draws with.
///
/// Unbinds programs, textures on every unit, buffers and vertex arrays,
/// disables blending and scissoring, and binds `framebuffer`.
///
/// # Safety
///
/// Must be called with a valid GL context current.
pub unsafe fn gl_reset(framebuffer: GLuint) {
    gl::UseProgram(0);

    let mut num_samplers = 0;
    gl::GetIntegerv(gl::MAX_TEXTURE_IMAGE_UNITS, &mut num_samplers);

    for texture_type in TEXTURE_TYPES.iter() {
        for sampler in 0..num_samplers {
            gl::ActiveTexture(gl::TEXTURE0 + sampler as u32);
            gl::BindTexture(texture_type.target, 0);
        }
    }

    gl::ActiveTexture(gl::TEXTURE0);

    gl::BindBuffer(gl::ARRAY_BUFFER, 0);
    if gl::BindVertexArray::is_loaded() {
        gl::BindVertexArray(0);
    }
    gl::Disable(gl::BLEND);
    gl::Disable(gl::SCISSOR_TEST);

    gl::BlendFunc(gl::ONE, gl::ZERO);

    gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer);

    // Targets the driver does not know (no OES_EGL_image_external) raise
    // INVALID_ENUM above; that is not an error of the caller.
    clear_gl_errors();
}

/// Drop every pending GL error flag.
pub fn clear_gl_errors() {
    unsafe { while gl::GetError() != gl::NO_ERROR {} }
}

/// Whether any context is current on this thread.
pub fn is_context_current() -> bool {
    gl::GetString::is_loaded() && unsafe { !gl::GetString(gl::VERSION).is_null() }
}
