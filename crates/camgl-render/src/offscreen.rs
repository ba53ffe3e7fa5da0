//! [`RawCopyCompositor`]: copies each frame into an offscreen texture with
//! plain GL calls.

use std::rc::{Rc, Weak};

use camgl_core::gl_api::GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
use camgl_core::{
    check_gl_error, gl_size, FramebufferStatus, GlApi, GlContext, PassThroughDraw, RenderError,
    RenderResult, Texture, TextureKind, TransformMatrix, DEFAULT_FRAMEBUFFER,
};
use gl::types::GLuint;
use tracing::{debug, error, trace, warn};

use crate::compositor::FrameCompositor;
use crate::live_context;

/// The offscreen render target, keyed by its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffscreenCache {
    #[default]
    Absent,
    Present {
        texture: Texture,
        framebuffer: GLuint,
    },
}

impl OffscreenCache {
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            OffscreenCache::Absent => None,
            OffscreenCache::Present { texture, .. } => Some(texture),
        }
    }

    /// The cached target if it matches `width` x `height`.
    fn hit(&self, width: u32, height: u32) -> Option<(Texture, GLuint)> {
        match *self {
            OffscreenCache::Present {
                texture,
                framebuffer,
            } if texture.dimensions() == (width, height) => Some((texture, framebuffer)),
            _ => None,
        }
    }
}

/// Renders the camera texture into a cached RGBA texture, applying the
/// fixed camera orientation flip.
pub struct RawCopyCompositor<C: GlContext, S: PassThroughDraw> {
    context: Weak<C>,
    cache: OffscreenCache,
    shader: S,
}

impl<C: GlContext, S: PassThroughDraw> RawCopyCompositor<C, S> {
    /// Nothing is allocated until the first frame.
    pub fn new(shader: S) -> Self {
        Self {
            context: Weak::new(),
            cache: OffscreenCache::Absent,
            shader,
        }
    }

    pub fn cache(&self) -> &OffscreenCache {
        &self.cache
    }

    /// Cached objects belong to the context that created them; switching
    /// contexts releases them against the old one first.
    fn attach(&mut self, context: &Rc<C>) {
        let context = Rc::downgrade(context);
        if !self.context.ptr_eq(&context) {
            self.release();
            self.context = context;
        }
    }

    fn ensure_target(
        &mut self,
        context: &C,
        width: u32,
        height: u32,
    ) -> RenderResult<(Texture, GLuint)> {
        if let Some(hit) = self.cache.hit(width, height) {
            return Ok(hit);
        }

        let gl = context.gl();
        release_cache(gl, &mut self.cache);

        if width == 0 || height == 0 {
            warn!(width, height, "Refusing empty offscreen target");
            return Err(RenderError::FramebufferIncomplete {
                width,
                height,
                status: GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
            });
        }

        let texture = context
            .create_texture(TextureKind::Texture2D, width, height)
            .map_err(|source| RenderError::TextureCreation {
                width,
                height,
                source,
            })?;
        gl.bind_texture(texture.target(), texture.id);
        gl.tex_image_2d_rgba(texture.target(), width, height);

        let framebuffer = gl.gen_framebuffer();
        gl.bind_framebuffer(framebuffer);
        gl.framebuffer_texture_2d(texture.target(), texture.id);

        let status = gl.check_framebuffer_status();
        if status != gl::FRAMEBUFFER_COMPLETE {
            gl.bind_framebuffer(DEFAULT_FRAMEBUFFER);
            gl.delete_framebuffer(framebuffer);
            gl.delete_texture(texture.id);
            error!(
                width,
                height,
                "Offscreen framebuffer incomplete: {}",
                FramebufferStatus::describe(status)
            );
            return Err(RenderError::FramebufferIncomplete {
                width,
                height,
                status,
            });
        }

        debug!(
            texture = texture.id,
            framebuffer, width, height, "Allocated offscreen target"
        );
        self.cache = OffscreenCache::Present {
            texture,
            framebuffer,
        };
        Ok((texture, framebuffer))
    }
}

fn release_cache(gl: &dyn GlApi, cache: &mut OffscreenCache) {
    if let OffscreenCache::Present {
        texture,
        framebuffer,
    } = std::mem::take(cache)
    {
        debug!(texture = texture.id, framebuffer, "Releasing offscreen target");
        gl.delete_texture(texture.id);
        gl.delete_framebuffer(framebuffer);
    }
}

impl<C: GlContext, S: PassThroughDraw> FrameCompositor<C> for RawCopyCompositor<C, S> {
    fn render_frame(&mut self, context: &Rc<C>, texture: &Texture) -> RenderResult<&Texture> {
        self.attach(context);
        let gl = context.gl();

        context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        check_gl_error(gl, "eglMakeCurrent")
            .map_err(|e| RenderError::ContextActivation(e.into()))?;

        let (width, height) = texture.dimensions();
        let (_, framebuffer) = self.ensure_target(context, width, height)?;

        gl.bind_texture(texture.target(), texture.id);
        gl.bind_framebuffer(framebuffer);
        gl.viewport(0, 0, gl_size(width), gl_size(height));
        let drawn = self.shader.draw(texture, &TransformMatrix::CAMERA_FLIP);
        gl.bind_framebuffer(DEFAULT_FRAMEBUFFER);
        drawn.map_err(RenderError::Draw)?;

        trace!(input = texture.id, framebuffer, "Copied frame offscreen");
        self.cache.texture().ok_or(RenderError::FramebufferIncomplete {
            width,
            height,
            status: gl::FRAMEBUFFER_UNDEFINED,
        })
    }

    fn release(&mut self) {
        let Some(context) = live_context(&self.context) else {
            if self.cache != OffscreenCache::Absent {
                debug!("GL context already destroyed, forgetting offscreen target");
            }
            self.cache = OffscreenCache::Absent;
            return;
        };
        match context.make_current() {
            Ok(()) => {
                release_cache(context.gl(), &mut self.cache);
                self.shader.release();
            }
            Err(e) => {
                warn!("Could not activate context to release offscreen target: {e:#}");
                self.cache = OffscreenCache::Absent;
            }
        }
        self.context = Weak::new();
    }
}

impl<C: GlContext, S: PassThroughDraw> Drop for RawCopyCompositor<C, S> {
    fn drop(&mut self) {
        self.release();
    }
}
