//! [`CanvasCompositor`]: composites frames through a 2D drawing backend.
//!
//! The backend is connected lazily on the first frame and reset before
//! every use, since the pass-through program and other renderers share the
//! same GL state. An optional overlay callback draws on top of the camera
//! image in both the offscreen and the on-screen path.

use std::rc::{Rc, Weak};

use anyhow::anyhow;
use camgl_core::gl_api::GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
use camgl_core::{
    check_gl_error, Canvas, CanvasBackend, Color, DrawingSurface, GlApi, GlContext, Rect,
    RenderError, RenderResult, RenderTargetDesc, Texture,
};
use tracing::{debug, trace, warn};

use crate::compositor::FrameCompositor;
use crate::live_context;

/// Draws on top of the camera image. Receives the canvas and its bounds.
pub type Overlay<I> = Box<dyn FnMut(&mut dyn Canvas<I>, Rect) -> anyhow::Result<()>>;

/// Builds a backend bound to the current context.
pub type Connector<B> = Box<dyn FnMut(&dyn GlApi) -> anyhow::Result<B>>;

/// A window surface the on-screen path presents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentTarget {
    pub surface: DrawingSurface,
    pub width: u32,
    pub height: u32,
}

struct OffscreenSurface<S> {
    surface: S,
    texture: Texture,
}

pub struct CanvasCompositor<C: GlContext, B: CanvasBackend> {
    context: Weak<C>,
    connect: Connector<B>,
    backend: Option<B>,
    offscreen: Option<OffscreenSurface<B::Surface>>,
    overlay: Option<Overlay<B::Image>>,
}

impl<C: GlContext, B: CanvasBackend + 'static> CanvasCompositor<C, B> {
    /// Connect with [`CanvasBackend::connect`] on first use.
    pub fn new() -> Self {
        Self::with_connector(B::connect)
    }
}

impl<C: GlContext, B: CanvasBackend + 'static> Default for CanvasCompositor<C, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: GlContext, B: CanvasBackend> CanvasCompositor<C, B> {
    pub fn with_connector(connect: impl FnMut(&dyn GlApi) -> anyhow::Result<B> + 'static) -> Self {
        Self {
            context: Weak::new(),
            connect: Box::new(connect),
            backend: None,
            offscreen: None,
            overlay: None,
        }
    }

    pub fn set_overlay(
        &mut self,
        overlay: impl FnMut(&mut dyn Canvas<B::Image>, Rect) -> anyhow::Result<()> + 'static,
    ) {
        self.overlay = Some(Box::new(overlay));
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    /// The backend and its surfaces belong to the context they were created
    /// in; switching contexts releases them against the old one first.
    fn attach(&mut self, context: &Rc<C>) {
        let context = Rc::downgrade(context);
        if !self.context.ptr_eq(&context) {
            self.release();
            self.context = context;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Size of the cached offscreen surface, if any.
    pub fn offscreen_dimensions(&self) -> Option<(u32, u32)> {
        self.offscreen.as_ref().map(|o| o.texture.dimensions())
    }

    /// Draw `texture` onto the window surface of `target` through the
    /// backend, then present.
    pub fn render_texture_to_surface(
        &mut self,
        context: &Rc<C>,
        texture: &Texture,
        target: &PresentTarget,
    ) -> RenderResult<()> {
        self.attach(context);
        let gl = context.gl();

        context
            .make_current_with(target.surface)
            .map_err(RenderError::ContextActivation)?;
        check_gl_error(gl, "eglMakeCurrent")
            .map_err(|e| RenderError::ContextActivation(e.into()))?;

        let desc = RenderTargetDesc::default_framebuffer(gl, target.width, target.height);
        let Self {
            connect,
            backend,
            overlay,
            ..
        } = self;
        let backend = connected(backend, connect, gl)?;
        backend.reset();

        let mut surface =
            backend
                .wrap_render_target(&desc)
                .map_err(|source| RenderError::SurfaceWrap {
                    framebuffer: desc.framebuffer,
                    width: desc.width,
                    height: desc.height,
                    source,
                })?;
        let bounds = Rect::from_size(target.width, target.height);
        let drawn = draw_frame(backend, &mut surface, overlay, texture, bounds);
        backend.release_surface(surface);
        drawn?;

        context.flush().map_err(RenderError::Present)?;
        check_gl_error(gl, "eglSwapBuffers").map_err(|e| RenderError::Present(e.into()))?;
        trace!(texture = texture.id, "Presented frame through 2D backend");
        Ok(())
    }
}

fn connected<'a, B: CanvasBackend>(
    backend: &'a mut Option<B>,
    connect: &mut Connector<B>,
    gl: &dyn GlApi,
) -> RenderResult<&'a mut B> {
    match backend {
        Some(backend) => Ok(backend),
        None => {
            let connected = connect(gl).map_err(|e| {
                RenderError::ContextActivation(e.context("2D backend could not attach to context"))
            })?;
            debug!("Connected 2D backend");
            Ok(backend.insert(connected))
        }
    }
}

/// Draw the camera image (and overlay) over `bounds` of `surface`, then
/// submit the backend's work.
fn draw_frame<B: CanvasBackend>(
    backend: &mut B,
    surface: &mut B::Surface,
    overlay: &mut Option<Overlay<B::Image>>,
    texture: &Texture,
    bounds: Rect,
) -> RenderResult<()> {
    let image = backend
        .wrap_texture(texture)
        .map_err(|source| RenderError::ImageWrap {
            texture: *texture,
            source,
        })?;
    {
        let mut canvas = backend.canvas(surface);
        canvas.clear(Color::BLACK);
        canvas
            .draw_image(&image, bounds)
            .map_err(RenderError::Draw)?;
        if let Some(overlay) = overlay {
            overlay(&mut canvas, bounds).map_err(RenderError::Draw)?;
        }
    }
    backend.flush().map_err(RenderError::Draw)
}

fn allocate_surface<B: CanvasBackend>(
    backend: &mut B,
    width: u32,
    height: u32,
) -> RenderResult<OffscreenSurface<B::Surface>> {
    if width == 0 || height == 0 {
        warn!(width, height, "Refusing empty canvas surface");
        return Err(RenderError::FramebufferIncomplete {
            width,
            height,
            status: GL_FRAMEBUFFER_INCOMPLETE_DIMENSIONS,
        });
    }
    let surface = backend
        .new_offscreen_surface(width, height)
        .map_err(RenderError::SurfaceCreation)?;
    let Some(texture) = backend.surface_texture(&surface) else {
        backend.release_surface(surface);
        return Err(RenderError::SurfaceCreation(anyhow!(
            "offscreen surface has no backing texture"
        )));
    };
    debug!(texture = texture.id, width, height, "Allocated canvas surface");
    Ok(OffscreenSurface { surface, texture })
}

impl<C: GlContext, B: CanvasBackend> FrameCompositor<C> for CanvasCompositor<C, B> {
    fn render_frame(&mut self, context: &Rc<C>, texture: &Texture) -> RenderResult<&Texture> {
        self.attach(context);
        let gl = context.gl();

        context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        check_gl_error(gl, "eglMakeCurrent")
            .map_err(|e| RenderError::ContextActivation(e.into()))?;

        let Self {
            connect,
            backend,
            offscreen,
            overlay,
            ..
        } = self;
        let backend = connected(backend, connect, gl)?;
        backend.reset();

        let stale = offscreen
            .as_ref()
            .is_some_and(|o| !o.texture.same_size(texture));
        if stale {
            if let Some(old) = offscreen.take() {
                debug!(texture = old.texture.id, "Releasing canvas surface");
                backend.release_surface(old.surface);
            }
        }
        let (width, height) = texture.dimensions();
        let entry = match offscreen {
            Some(entry) => entry,
            None => offscreen.insert(allocate_surface(backend, width, height)?),
        };

        draw_frame(
            backend,
            &mut entry.surface,
            overlay,
            texture,
            Rect::from_size(width, height),
        )?;
        trace!(input = texture.id, output = entry.texture.id, "Composited frame");
        Ok(&entry.texture)
    }

    fn release(&mut self) {
        let Some(mut backend) = self.backend.take() else {
            return;
        };
        let current = live_context(&self.context).filter(|context| match context.make_current() {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not activate context to release 2D backend: {e:#}");
                false
            }
        });
        match current {
            Some(_) => {
                if let Some(offscreen) = self.offscreen.take() {
                    backend.release_surface(offscreen.surface);
                }
                backend.release();
                debug!("Released 2D backend");
            }
            None => {
                self.offscreen = None;
                backend.abandon();
            }
        }
        self.context = Weak::new();
    }
}

impl<C: GlContext, B: CanvasBackend> Drop for CanvasCompositor<C, B> {
    fn drop(&mut self) {
        self.release();
    }
}
