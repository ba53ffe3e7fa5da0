//! [`GlCanvasBackend`]: a minimal 2D-drawing backend on plain GL.
//!
//! Surfaces are framebuffers (either owned, with a texture attached, or a
//! wrapped existing framebuffer). Images are imported texture handles drawn
//! with the [`PassThroughShader`]; solid fills use scissored clears.

use std::marker::PhantomData;

use anyhow::{bail, Result};
use camgl_core::{
    gl_size, Canvas, CanvasBackend, Color, FramebufferStatus, GlApi, PassThroughDraw, Rect,
    RenderTargetDesc, Texture, TextureKind, TransformMatrix,
};
use gl::types::{GLint, GLsizei, GLuint};
use tracing::{debug, warn};

use crate::passthrough::PassThroughShader;
use crate::validate_gl;

/// A framebuffer the canvas draws into.
#[derive(Debug)]
pub struct GlSurface {
    framebuffer: GLuint,
    /// Attached color texture when the backend allocated it.
    texture: Option<Texture>,
    width: u32,
    height: u32,
}

impl GlSurface {
    pub fn framebuffer(&self) -> GLuint {
        self.framebuffer
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// An imported texture. Borrowed, never deleted by the backend.
#[derive(Debug, Clone, Copy)]
pub struct GlImage(Texture);

/// 2D backend for the current GL context.
#[derive(Debug)]
pub struct GlCanvasBackend {
    shader: PassThroughShader,
    _thread_affine: PhantomData<*const ()>,
}

/// Drawing commands targeting one [`GlSurface`].
pub struct GlCanvas<'a> {
    shader: &'a mut PassThroughShader,
    surface: &'a GlSurface,
}

/// Convert a top-left-origin rectangle to a GL `(x, y, width, height)` box
/// with bottom-left origin, rounded to whole pixels.
pub fn gl_box(rect: Rect, surface_height: u32) -> (GLint, GLint, GLsizei, GLsizei) {
    let x = rect.x.round() as GLint;
    let width = rect.width.round() as GLsizei;
    let height = rect.height.round() as GLsizei;
    let top = (rect.y.round() as GLint).saturating_add(height);
    let y = gl_size(surface_height).saturating_sub(top);
    (x, y, width, height)
}

impl GlCanvas<'_> {
    fn bind(&self) {
        unsafe { gl::BindFramebuffer(gl::FRAMEBUFFER, self.surface.framebuffer) };
    }
}

impl Canvas<GlImage> for GlCanvas<'_> {
    fn clear(&mut self, color: Color) {
        self.bind();
        unsafe {
            gl::Disable(gl::SCISSOR_TEST);
            gl::ClearColor(color.r, color.g, color.b, color.a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }

    fn draw_image(&mut self, image: &GlImage, dst: Rect) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        self.bind();
        let (x, y, w, h) = gl_box(dst, self.surface.height);
        unsafe { gl::Viewport(x, y, w, h) };
        self.shader.draw(&image.0, &TransformMatrix::IDENTITY)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() {
            return;
        }
        self.bind();
        let (x, y, w, h) = gl_box(rect, self.surface.height);
        unsafe {
            gl::Enable(gl::SCISSOR_TEST);
            gl::Scissor(x, y, w, h);
            gl::ClearColor(color.r, color.g, color.b, color.a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
            gl::Disable(gl::SCISSOR_TEST);
        }
    }
}

impl CanvasBackend for GlCanvasBackend {
    type Image = GlImage;
    type Surface = GlSurface;
    type CanvasRef<'a> = GlCanvas<'a>;

    fn connect(_gl: &dyn GlApi) -> Result<Self> {
        if !validate_gl::is_context_current() {
            bail!("no GL context is current");
        }
        debug!("GL canvas backend connected");
        Ok(Self {
            shader: PassThroughShader::new(),
            _thread_affine: PhantomData,
        })
    }

    fn reset(&mut self) {
        unsafe { validate_gl::gl_reset(camgl_core::DEFAULT_FRAMEBUFFER) };
    }

    fn new_offscreen_surface(&mut self, width: u32, height: u32) -> Result<GlSurface> {
        if width == 0 || height == 0 {
            bail!("cannot allocate a {width}x{height} surface");
        }

        let mut texture = 0;
        let mut framebuffer = 0;
        let status = unsafe {
            gl::GenTextures(1, &mut texture);
            gl::BindTexture(gl::TEXTURE_2D, texture);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA as GLint,
                gl_size(width),
                gl_size(height),
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                std::ptr::null(),
            );

            gl::GenFramebuffers(1, &mut framebuffer);
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                texture,
                0,
            );
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);

            gl::BindFramebuffer(gl::FRAMEBUFFER, camgl_core::DEFAULT_FRAMEBUFFER);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            status
        };

        if status != gl::FRAMEBUFFER_COMPLETE {
            unsafe {
                gl::DeleteFramebuffers(1, &framebuffer);
                gl::DeleteTextures(1, &texture);
            }
            bail!(
                "offscreen surface {width}x{height} incomplete: {}",
                FramebufferStatus::describe(status)
            );
        }

        debug!(texture, framebuffer, width, height, "Allocated canvas surface");
        Ok(GlSurface {
            framebuffer,
            texture: Some(Texture::new(texture, TextureKind::Texture2D, width, height)),
            width,
            height,
        })
    }

    fn surface_texture(&self, surface: &GlSurface) -> Option<Texture> {
        surface.texture
    }

    fn wrap_render_target(&mut self, target: &RenderTargetDesc) -> Result<GlSurface> {
        if target.width == 0 || target.height == 0 {
            bail!("cannot wrap a {}x{} render target", target.width, target.height);
        }
        let status = unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, target.framebuffer);
            gl::CheckFramebufferStatus(gl::FRAMEBUFFER)
        };
        if status != gl::FRAMEBUFFER_COMPLETE {
            bail!(
                "framebuffer {} is not drawable: {}",
                target.framebuffer,
                FramebufferStatus::describe(status)
            );
        }
        Ok(GlSurface {
            framebuffer: target.framebuffer,
            texture: None,
            width: target.width,
            height: target.height,
        })
    }

    fn wrap_texture(&mut self, texture: &Texture) -> Result<GlImage> {
        if texture.id == 0 || unsafe { gl::IsTexture(texture.id) } == gl::FALSE {
            bail!("#{} is not a texture name", texture.id);
        }
        Ok(GlImage(*texture))
    }

    fn canvas<'a>(&'a mut self, surface: &'a mut GlSurface) -> GlCanvas<'a> {
        GlCanvas {
            shader: &mut self.shader,
            surface,
        }
    }

    fn flush(&mut self) -> Result<()> {
        unsafe {
            gl::Flush();
            let err = gl::GetError();
            if err != gl::NO_ERROR {
                bail!("canvas flush raised GL error 0x{err:04X}");
            }
        }
        Ok(())
    }

    fn release_surface(&mut self, surface: GlSurface) {
        if let Some(texture) = surface.texture {
            unsafe {
                gl::DeleteFramebuffers(1, &surface.framebuffer);
                gl::DeleteTextures(1, &texture.id);
            }
        }
    }

    fn release(&mut self) {
        self.shader.release();
    }

    fn abandon(&mut self) {
        warn!("Abandoning GL canvas backend without releasing GPU objects");
        self.shader.abandon();
    }
}
