//! [`SurfaceRenderer`]: draws a texture into one native window.

use std::rc::{Rc, Weak};

use anyhow::anyhow;
use camgl_core::{
    check_gl_error, gl_size, DrawingSurface, GlContext, NativeWindow, PassThroughDraw, RenderError,
    RenderResult, Texture, TransformMatrix, DEFAULT_FRAMEBUFFER,
};
use tracing::{debug, trace, warn};

use crate::live_context;

/// Binds one native window to a drawing surface of the shared context.
///
/// The surface is created on the first render and reused afterwards. The
/// window size is captured at construction; a resized window needs a new
/// renderer.
pub struct SurfaceRenderer<C: GlContext, W: NativeWindow, S: PassThroughDraw> {
    context: Weak<C>,
    surface: Option<DrawingSurface>,
    shader: S,
    width: u32,
    height: u32,
    // Dropped last: the surface must be gone before the window reference.
    window: W,
}

impl<C: GlContext, W: NativeWindow, S: PassThroughDraw> SurfaceRenderer<C, W, S> {
    /// Takes ownership of one reference to `window`. On failure the window
    /// is released before returning.
    pub fn new(context: &Rc<C>, window: W, shader: S) -> RenderResult<Self> {
        let (width, height) = (window.width(), window.height());
        if width == 0 || height == 0 {
            return Err(RenderError::SurfaceCreation(anyhow!(
                "window reports an empty size ({width}x{height})"
            )));
        }
        debug!(width, height, "Created surface renderer");
        Ok(Self {
            context: Rc::downgrade(context),
            surface: None,
            shader,
            width,
            height,
            window,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    /// Draw `texture` over the whole window with texture coordinates
    /// transformed by `matrix`, then present.
    pub fn render_texture_to_surface(
        &mut self,
        texture: &Texture,
        matrix: &TransformMatrix,
    ) -> RenderResult<()> {
        let context = live_context(&self.context).ok_or_else(|| {
            RenderError::ContextActivation(anyhow!("GL context has been destroyed"))
        })?;
        let gl = context.gl();

        let surface = match self.surface {
            Some(surface) => surface,
            None => self.create_surface(&context)?,
        };

        context
            .make_current_with(surface)
            .map_err(RenderError::ContextActivation)?;
        check_gl_error(gl, "eglMakeCurrent")
            .map_err(|e| RenderError::ContextActivation(e.into()))?;

        // A compositor may have left its offscreen target bound.
        gl.bind_framebuffer(DEFAULT_FRAMEBUFFER);
        gl.viewport(0, 0, gl_size(self.width), gl_size(self.height));
        self.shader
            .draw(texture, matrix)
            .map_err(RenderError::Draw)?;

        context.flush().map_err(RenderError::Present)?;
        check_gl_error(gl, "eglSwapBuffers").map_err(|e| RenderError::Present(e.into()))?;

        trace!(texture = texture.id, "Presented frame");
        Ok(())
    }

    fn create_surface(&mut self, context: &C) -> RenderResult<DrawingSurface> {
        context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        let surface = context
            .create_window_surface(&self.window)
            .map_err(RenderError::SurfaceCreation)?;
        debug!(width = self.width, height = self.height, "Created window surface");
        self.surface = Some(surface);
        Ok(surface)
    }

    /// Release the drawing surface. Safe to call more than once; skips every
    /// GPU release when the context is already gone.
    pub fn destroy(&mut self) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        match live_context(&self.context) {
            Some(context) => {
                match context.make_current() {
                    Ok(()) => self.shader.release(),
                    Err(e) => warn!("Could not activate context to release program: {e:#}"),
                }
                context.destroy_surface(surface);
                debug!("Destroyed window surface");
            }
            None => debug!("GL context already destroyed, skipping surface release"),
        }
    }
}

impl<C: GlContext, W: NativeWindow, S: PassThroughDraw> Drop for SurfaceRenderer<C, W, S> {
    fn drop(&mut self) {
        self.destroy();
    }
}
