use anyhow::{ensure, Result};

/// Offscreen stage installed when the pipeline is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffscreenMode {
    /// Outputs sample the camera texture directly.
    #[default]
    Disabled,
    /// Frames are copied through a [`RawCopyCompositor`](crate::RawCopyCompositor)
    /// first.
    RawCopy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Size the camera renders the input texture at.
    pub input_width: u32,
    pub input_height: u32,
    pub offscreen: OffscreenMode,
}

impl PipelineConfig {
    pub fn new(input_width: u32, input_height: u32) -> Self {
        Self {
            input_width,
            input_height,
            offscreen: OffscreenMode::Disabled,
        }
    }

    pub fn with_offscreen(mut self, offscreen: OffscreenMode) -> Self {
        self.offscreen = offscreen;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.input_width > 0 && self.input_height > 0,
            "input size must be non-zero, got {}x{}",
            self.input_width,
            self.input_height
        );
        Ok(())
    }
}
