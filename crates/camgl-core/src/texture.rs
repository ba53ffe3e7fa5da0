//! Texture handles.

use gl::types::{GLenum, GLuint};
use num_derive::FromPrimitive;

/// `GL_TEXTURE_EXTERNAL_OES` is not in the `gl` crate's desktop API.
pub const GL_TEXTURE_EXTERNAL_OES: GLenum = 0x8D65;

/// Binding target of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum TextureKind {
    /// Regular 2D texture, used for offscreen render targets.
    Texture2D = gl::TEXTURE_2D,
    /// External image stream (camera output, usually YUV). Sampled with
    /// `samplerExternalOES`, never rendered into.
    ExternalOes = GL_TEXTURE_EXTERNAL_OES,
}

impl TextureKind {
    /// The GL binding target for this kind.
    pub fn target(self) -> GLenum {
        self as GLenum
    }

    /// Decode a raw binding target.
    pub fn from_target(target: GLenum) -> Option<Self> {
        num_traits::FromPrimitive::from_u32(target)
    }
}

/// Identifies a GPU-resident texture.
///
/// Data only. The handle does not own the GL object: whoever created it is
/// responsible for deleting it, and a renderer that only receives a handle
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture {
    pub id: GLuint,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn new(id: GLuint, kind: TextureKind, width: u32, height: u32) -> Self {
        Self {
            id,
            kind,
            width,
            height,
        }
    }

    pub fn target(&self) -> GLenum {
        self.kind.target()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether `other` has the same pixel dimensions. This is the only
    /// property offscreen caches are keyed on.
    pub fn same_size(&self, other: &Texture) -> bool {
        self.dimensions() == other.dimensions()
    }
}
