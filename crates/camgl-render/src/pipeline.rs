//! [`VideoPipeline`]: owns the shared context and fans every camera frame
//! out to the attached outputs.

use std::fmt;
use std::rc::Rc;

use anyhow::Context as _;
use camgl_core::{
    GlContext, NativeWindow, PassThroughDraw, RenderError, RenderResult, Texture, TextureKind,
    TransformMatrix, DEFAULT_FRAMEBUFFER,
};
use tracing::{debug, trace, warn};

use crate::compositor::FrameCompositor;
use crate::config::{OffscreenMode, PipelineConfig};
use crate::offscreen::RawCopyCompositor;
use crate::surface::SurfaceRenderer;

/// An output slot. Frames are rendered to the slots in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    Preview,
    FrameProcessor,
    Recording,
}

impl Output {
    pub const ALL: [Output; 3] = [Output::Preview, Output::FrameProcessor, Output::Recording];
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Output::Preview => "preview",
            Output::FrameProcessor => "frame processor",
            Output::Recording => "recording",
        })
    }
}

pub struct VideoPipeline<C, W, S>
where
    C: GlContext + 'static,
    W: NativeWindow,
    S: PassThroughDraw + 'static,
{
    config: PipelineConfig,
    new_shader: Box<dyn FnMut() -> S>,
    input: Option<Texture>,
    compositor: Option<Box<dyn FrameCompositor<C>>>,
    preview: Option<SurfaceRenderer<C, W, S>>,
    frame_processor: Option<SurfaceRenderer<C, W, S>>,
    recording: Option<SurfaceRenderer<C, W, S>>,
    context: Rc<C>,
}

impl<C, W, S> VideoPipeline<C, W, S>
where
    C: GlContext + 'static,
    W: NativeWindow,
    S: PassThroughDraw + 'static,
{
    /// `new_shader` builds the pass-through program of every renderer the
    /// pipeline creates.
    pub fn new(
        context: Rc<C>,
        config: PipelineConfig,
        mut new_shader: impl FnMut() -> S + 'static,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid pipeline configuration")?;

        let compositor: Option<Box<dyn FrameCompositor<C>>> = match config.offscreen {
            OffscreenMode::Disabled => None,
            OffscreenMode::RawCopy => Some(Box::new(RawCopyCompositor::<C, S>::new(new_shader()))),
        };
        debug!(
            width = config.input_width,
            height = config.input_height,
            offscreen = ?config.offscreen,
            "Created video pipeline"
        );
        Ok(Self {
            config,
            new_shader: Box::new(new_shader),
            input: None,
            compositor,
            preview: None,
            frame_processor: None,
            recording: None,
            context,
        })
    }

    pub fn with_default_shaders(context: Rc<C>, config: PipelineConfig) -> anyhow::Result<Self>
    where
        S: Default,
    {
        Self::new(context, config, S::default)
    }

    pub fn context(&self) -> &Rc<C> {
        &self.context
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The camera input texture, created on first call.
    pub fn input_texture(&mut self) -> RenderResult<Texture> {
        if let Some(texture) = self.input {
            return Ok(texture);
        }
        let (width, height) = (self.config.input_width, self.config.input_height);
        self.context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        let texture = self
            .context
            .create_texture(TextureKind::ExternalOes, width, height)
            .map_err(|source| RenderError::TextureCreation {
                width,
                height,
                source,
            })?;
        debug!(texture = texture.id, width, height, "Created input texture");
        self.input = Some(texture);
        Ok(texture)
    }

    /// Activate the context and bind the input texture so the camera can
    /// update it.
    pub fn on_before_frame(&mut self) -> RenderResult<()> {
        self.context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        let texture = self.input.ok_or(RenderError::NoInputTexture)?;
        self.context.gl().bind_texture(texture.target(), texture.id);
        Ok(())
    }

    /// Render the current camera frame to every attached output.
    ///
    /// All outputs are attempted even if one fails; the first failure is
    /// returned.
    pub fn on_frame(&mut self, matrix: &TransformMatrix) -> RenderResult<()> {
        self.context
            .make_current()
            .map_err(RenderError::ContextActivation)?;
        let mut texture = self.input.ok_or(RenderError::NoInputTexture)?;

        if let Some(compositor) = self.compositor.as_mut() {
            texture = *compositor.render_frame(&self.context, &texture)?;
            let gl = self.context.gl();
            gl.bind_texture(texture.target(), texture.id);
            gl.bind_framebuffer(DEFAULT_FRAMEBUFFER);
        }

        let mut first_error = None;
        for output in Output::ALL {
            let Some(renderer) = self.slot(output).as_mut() else {
                continue;
            };
            if let Err(e) = renderer.render_texture_to_surface(&texture, matrix) {
                warn!(%output, "Failed to render frame: {e:#}");
                first_error.get_or_insert(e);
            }
        }
        trace!(texture = texture.id, "Frame done");
        first_error.map_or(Ok(()), Err)
    }

    fn slot(&mut self, output: Output) -> &mut Option<SurfaceRenderer<C, W, S>> {
        match output {
            Output::Preview => &mut self.preview,
            Output::FrameProcessor => &mut self.frame_processor,
            Output::Recording => &mut self.recording,
        }
    }

    pub fn has_output(&self, output: Output) -> bool {
        match output {
            Output::Preview => self.preview.is_some(),
            Output::FrameProcessor => self.frame_processor.is_some(),
            Output::Recording => self.recording.is_some(),
        }
    }

    /// Attach `window` to `output`, destroying any renderer already there.
    pub fn set_output(&mut self, output: Output, window: W) -> RenderResult<()> {
        self.remove_output(output);
        let shader = (self.new_shader)();
        let renderer = SurfaceRenderer::new(&self.context, window, shader)?;
        debug!(%output, "Attached output");
        *self.slot(output) = Some(renderer);
        Ok(())
    }

    /// Returns whether a renderer was attached.
    pub fn remove_output(&mut self, output: Output) -> bool {
        match self.slot(output).take() {
            Some(mut renderer) => {
                renderer.destroy();
                debug!(%output, "Removed output");
                true
            }
            None => false,
        }
    }

    pub fn set_preview_output(&mut self, window: W) -> RenderResult<()> {
        self.set_output(Output::Preview, window)
    }

    pub fn remove_preview_output(&mut self) -> bool {
        self.remove_output(Output::Preview)
    }

    pub fn set_frame_processor_output(&mut self, window: W) -> RenderResult<()> {
        self.set_output(Output::FrameProcessor, window)
    }

    pub fn remove_frame_processor_output(&mut self) -> bool {
        self.remove_output(Output::FrameProcessor)
    }

    pub fn set_recording_output(&mut self, window: W) -> RenderResult<()> {
        self.set_output(Output::Recording, window)
    }

    pub fn remove_recording_output(&mut self) -> bool {
        self.remove_output(Output::Recording)
    }

    /// Route frames through `compositor`, releasing the previous one.
    pub fn set_compositor(&mut self, compositor: impl FrameCompositor<C> + 'static) {
        self.remove_compositor();
        self.compositor = Some(Box::new(compositor));
    }

    pub fn remove_compositor(&mut self) -> bool {
        match self.compositor.take() {
            Some(mut compositor) => {
                compositor.release();
                true
            }
            None => false,
        }
    }

    pub fn has_compositor(&self) -> bool {
        self.compositor.is_some()
    }
}

impl<C, W, S> Drop for VideoPipeline<C, W, S>
where
    C: GlContext + 'static,
    W: NativeWindow,
    S: PassThroughDraw + 'static,
{
    fn drop(&mut self) {
        for output in Output::ALL {
            self.remove_output(output);
        }
        self.remove_compositor();

        if let Some(texture) = self.input.take() {
            if !self.context.is_alive() {
                debug!("GL context already destroyed, skipping input texture release");
            } else if let Err(e) = self.context.make_current() {
                warn!("Could not activate context to release input texture: {e:#}");
            } else {
                self.context.gl().delete_texture(texture.id);
                debug!(texture = texture.id, "Deleted input texture");
            }
        }
        debug!("Destroyed video pipeline");
    }
}
