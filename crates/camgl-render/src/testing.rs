//! Recording stand-ins for the GL driver, the context, windows, the
//! pass-through program and the 2D backend.
//!
//! Texture "contents" are modelled as a 64-bit signature per texture id
//! (id 0 is the default framebuffer). The stub shader and canvas write
//! `hash(source signature, matrix)` into whatever is attached to the bound
//! framebuffer, which is enough to compare outputs of two pipelines.

use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::ffi::c_void;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use anyhow::{anyhow, bail};
use camgl_core::{
    Canvas, CanvasBackend, Color, DrawingSurface, GlApi, GlContext, NativeWindow, PassThroughDraw,
    Rect, RenderTargetDesc, Texture, TextureKind, TransformMatrix,
};
use gl::types::{GLenum, GLint, GLsizei, GLuint};

// ---------------------------------------------------------------------------
// GL
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StubGl {
    next_id: Cell<GLuint>,
    /// Live textures and their storage size.
    pub textures: RefCell<HashMap<GLuint, (u32, u32)>>,
    /// Live framebuffers and their color attachment.
    pub framebuffers: RefCell<HashMap<GLuint, Option<GLuint>>>,
    pub contents: RefCell<HashMap<GLuint, u64>>,
    pub bound_framebuffer: Cell<GLuint>,
    pub bound_texture: Cell<(GLenum, GLuint)>,
    pub viewport: Cell<(GLint, GLint, GLsizei, GLsizei)>,
    pub pending_errors: RefCell<Vec<GLenum>>,
    /// Every allocation and release, in order.
    pub events: RefCell<Vec<String>>,
    pub reject_attachments: Cell<bool>,
    pub samples: Cell<GLint>,
    pub stencil_bits: Cell<GLint>,
}

impl StubGl {
    pub fn next_id(&self) -> GLuint {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    pub fn log(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.borrow().len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.borrow().len()
    }

    pub fn content(&self, id: GLuint) -> Option<u64> {
        self.contents.borrow().get(&id).copied()
    }

    /// Signature of a texture the camera wrote into.
    pub fn source_signature(&self, texture: &Texture) -> u64 {
        self.content(texture.id).unwrap_or(texture.id as u64)
    }

    /// Write a draw of `source` under `matrix` into the bound framebuffer.
    pub fn record_draw(&self, source: &Texture, matrix: &TransformMatrix) {
        let signature = signature(self.source_signature(source), matrix);
        let fbo = self.bound_framebuffer.get();
        let target = match fbo {
            0 => 0,
            fbo => match self.framebuffers.borrow().get(&fbo).copied().flatten() {
                Some(texture) => texture,
                None => return,
            },
        };
        self.contents.borrow_mut().insert(target, signature);
    }

    pub fn raise(&self, error: GLenum) {
        self.pending_errors.borrow_mut().push(error);
    }
}

pub fn signature(source: u64, matrix: &TransformMatrix) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    for v in matrix.as_array() {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

impl GlApi for StubGl {
    fn gen_framebuffer(&self) -> GLuint {
        let id = self.next_id();
        self.framebuffers.borrow_mut().insert(id, None);
        self.log(format!("gen_framebuffer {id}"));
        id
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        assert!(
            self.framebuffers.borrow_mut().remove(&framebuffer).is_some(),
            "framebuffer {framebuffer} deleted twice or never created"
        );
        self.log(format!("delete_framebuffer {framebuffer}"));
    }

    fn delete_texture(&self, texture: GLuint) {
        assert!(
            self.textures.borrow_mut().remove(&texture).is_some(),
            "texture {texture} deleted twice or never created"
        );
        self.contents.borrow_mut().remove(&texture);
        self.log(format!("delete_texture {texture}"));
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        self.bound_texture.set((target, texture));
    }

    fn bind_framebuffer(&self, framebuffer: GLuint) {
        self.bound_framebuffer.set(framebuffer);
    }

    fn tex_image_2d_rgba(&self, _target: GLenum, width: u32, height: u32) {
        let (_, texture) = self.bound_texture.get();
        self.textures.borrow_mut().insert(texture, (width, height));
    }

    fn framebuffer_texture_2d(&self, _target: GLenum, texture: GLuint) {
        let fbo = self.bound_framebuffer.get();
        self.framebuffers.borrow_mut().insert(fbo, Some(texture));
    }

    fn check_framebuffer_status(&self) -> GLenum {
        let fbo = self.bound_framebuffer.get();
        if fbo == 0 {
            return gl::FRAMEBUFFER_COMPLETE;
        }
        if self.reject_attachments.get() {
            return gl::FRAMEBUFFER_UNSUPPORTED;
        }
        let attachment = self.framebuffers.borrow().get(&fbo).copied().flatten();
        match attachment.and_then(|t| self.textures.borrow().get(&t).copied()) {
            None => gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
            Some((w, h)) if w == 0 || h == 0 => gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
            Some(_) => gl::FRAMEBUFFER_COMPLETE,
        }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLsizei, height: GLsizei) {
        self.viewport.set((x, y, width, height));
    }

    fn get_error(&self) -> GLenum {
        let mut errors = self.pending_errors.borrow_mut();
        if errors.is_empty() {
            gl::NO_ERROR
        } else {
            errors.remove(0)
        }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        match pname {
            gl::SAMPLES => self.samples.get(),
            0x0D57 => self.stencil_bits.get(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StubContext {
    pub gl: Rc<StubGl>,
    pub dead: Cell<bool>,
    pub activations: Cell<usize>,
    pub surface_activations: RefCell<Vec<DrawingSurface>>,
    pub presents: Cell<usize>,
    pub created_surfaces: RefCell<Vec<DrawingSurface>>,
    pub destroyed_surfaces: RefCell<Vec<DrawingSurface>>,
    pub fail_activation: Cell<bool>,
    pub fail_present: Cell<bool>,
    pub fail_surface_creation: Cell<bool>,
}

impl StubContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn shader(&self) -> StubShader {
        StubShader::new(self.gl.clone())
    }

    /// A camera texture as the capture pipeline would hand it over.
    pub fn camera_texture(&self, width: u32, height: u32) -> Texture {
        let id = self.gl.next_id();
        self.gl.textures.borrow_mut().insert(id, (width, height));
        Texture::new(id, TextureKind::ExternalOes, width, height)
    }
}

impl GlContext for StubContext {
    fn gl(&self) -> &dyn GlApi {
        self.gl.as_ref()
    }

    fn make_current(&self) -> anyhow::Result<()> {
        assert!(!self.dead.get(), "make_current on a destroyed context");
        if self.fail_activation.get() {
            bail!("EGL_BAD_CONTEXT");
        }
        self.activations.set(self.activations.get() + 1);
        Ok(())
    }

    fn make_current_with(&self, surface: DrawingSurface) -> anyhow::Result<()> {
        assert!(!self.dead.get(), "make_current on a destroyed context");
        if self.fail_activation.get() {
            bail!("EGL_BAD_SURFACE");
        }
        // Like eglMakeCurrent, leaves the framebuffer binding alone.
        self.surface_activations.borrow_mut().push(surface);
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if self.fail_present.get() {
            bail!("EGL_BAD_NATIVE_WINDOW");
        }
        self.presents.set(self.presents.get() + 1);
        Ok(())
    }

    fn create_texture(
        &self,
        kind: TextureKind,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Texture> {
        let id = self.gl.next_id();
        // Storage is allocated separately for 2D textures.
        let size = match kind {
            TextureKind::Texture2D => (0, 0),
            TextureKind::ExternalOes => (width, height),
        };
        self.gl.textures.borrow_mut().insert(id, size);
        self.gl.log(format!("create_texture {id}"));
        Ok(Texture::new(id, kind, width, height))
    }

    fn create_window_surface(&self, window: &dyn NativeWindow) -> anyhow::Result<DrawingSurface> {
        if self.fail_surface_creation.get() || window.raw_handle().is_null() {
            bail!("EGL_BAD_NATIVE_WINDOW");
        }
        let surface = DrawingSurface::from_raw((0x5000 + self.gl.next_id() as usize) as *mut c_void);
        self.created_surfaces.borrow_mut().push(surface);
        Ok(surface)
    }

    fn destroy_surface(&self, surface: DrawingSurface) {
        assert!(!self.dead.get(), "destroy_surface on a destroyed context");
        let mut destroyed = self.destroyed_surfaces.borrow_mut();
        assert!(!destroyed.contains(&surface), "surface destroyed twice");
        destroyed.push(surface);
    }

    fn is_alive(&self) -> bool {
        !self.dead.get()
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

pub struct StubWindow {
    handle: usize,
    width: u32,
    height: u32,
    released: Rc<Cell<bool>>,
}

impl StubWindow {
    /// A window and a flag that flips once its handle has been released.
    pub fn new(width: u32, height: u32) -> (Self, Rc<Cell<bool>>) {
        let released = Rc::new(Cell::new(false));
        let window = Self {
            handle: 0xA000,
            width,
            height,
            released: released.clone(),
        };
        (window, released)
    }

    /// A window whose handle is already gone; surface creation fails.
    pub fn detached(width: u32, height: u32) -> (Self, Rc<Cell<bool>>) {
        let (mut window, released) = Self::new(width, height);
        window.handle = 0;
        (window, released)
    }
}

impl NativeWindow for StubWindow {
    fn raw_handle(&self) -> *mut c_void {
        self.handle as *mut c_void
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for StubWindow {
    fn drop(&mut self) {
        assert!(!self.released.get(), "window released twice");
        self.released.set(true);
    }
}

// ---------------------------------------------------------------------------
// Pass-through program
// ---------------------------------------------------------------------------

pub struct StubShader {
    gl: Rc<StubGl>,
    pub draws: Rc<RefCell<Vec<(Texture, TransformMatrix)>>>,
    pub released: Rc<Cell<usize>>,
    pub fail: Rc<Cell<bool>>,
}

impl StubShader {
    pub fn new(gl: Rc<StubGl>) -> Self {
        Self {
            gl,
            draws: Rc::default(),
            released: Rc::default(),
            fail: Rc::default(),
        }
    }
}

impl PassThroughDraw for StubShader {
    fn draw(&mut self, texture: &Texture, matrix: &TransformMatrix) -> anyhow::Result<()> {
        if self.fail.get() {
            bail!("program not linked");
        }
        self.gl.record_draw(texture, matrix);
        self.draws.borrow_mut().push((*texture, *matrix));
        Ok(())
    }

    fn release(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// 2D backend
// ---------------------------------------------------------------------------

/// Failure switches and a log shared between a test and its backend.
#[derive(Debug, Default)]
pub struct CanvasControl {
    pub ops: RefCell<Vec<String>>,
    pub reject_textures: Cell<bool>,
    pub reject_targets: Cell<bool>,
    pub connects: Cell<usize>,
}

impl CanvasControl {
    pub fn count(&self, op: &str) -> usize {
        self.ops.borrow().iter().filter(|o| o.starts_with(op)).count()
    }
}

pub struct StubCanvasBackend {
    gl: Rc<StubGl>,
    control: Rc<CanvasControl>,
}

impl StubCanvasBackend {
    pub fn connector(
        gl: Rc<StubGl>,
        control: Rc<CanvasControl>,
    ) -> impl FnMut(&dyn GlApi) -> anyhow::Result<Self> {
        move |_: &dyn GlApi| {
            control.connects.set(control.connects.get() + 1);
            Ok(Self {
                gl: gl.clone(),
                control: control.clone(),
            })
        }
    }

    fn op(&self, op: impl Into<String>) {
        self.control.ops.borrow_mut().push(op.into());
    }
}

#[derive(Debug)]
pub struct StubCanvasSurface {
    framebuffer: GLuint,
    texture: Option<Texture>,
}

pub struct StubCanvas<'a> {
    backend: &'a StubCanvasBackend,
    surface: &'a StubCanvasSurface,
}

impl Canvas<Texture> for StubCanvas<'_> {
    fn clear(&mut self, _color: Color) {
        self.backend.op("clear");
    }

    fn draw_image(&mut self, image: &Texture, dst: Rect) -> anyhow::Result<()> {
        self.backend.op(format!("draw_image #{} {}x{}", image.id, dst.width, dst.height));
        self.backend.gl.bind_framebuffer(self.surface.framebuffer);
        self.backend.gl.record_draw(image, &TransformMatrix::IDENTITY);
        Ok(())
    }

    fn fill_rect(&mut self, _rect: Rect, _color: Color) {
        self.backend.op("fill_rect");
    }
}

impl CanvasBackend for StubCanvasBackend {
    type Image = Texture;
    type Surface = StubCanvasSurface;
    type CanvasRef<'a> = StubCanvas<'a>;

    fn connect(_gl: &dyn GlApi) -> anyhow::Result<Self> {
        Err(anyhow!("stub backends are built with StubCanvasBackend::connector"))
    }

    fn reset(&mut self) {
        self.op("reset");
    }

    fn new_offscreen_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> anyhow::Result<StubCanvasSurface> {
        let gl = &self.gl;
        let texture = gl.next_id();
        gl.textures.borrow_mut().insert(texture, (width, height));
        let framebuffer = gl.gen_framebuffer();
        gl.framebuffers.borrow_mut().insert(framebuffer, Some(texture));
        self.op(format!("new_offscreen_surface {width}x{height}"));
        Ok(StubCanvasSurface {
            framebuffer,
            texture: Some(Texture::new(texture, TextureKind::Texture2D, width, height)),
        })
    }

    fn surface_texture(&self, surface: &StubCanvasSurface) -> Option<Texture> {
        surface.texture
    }

    fn wrap_render_target(
        &mut self,
        target: &RenderTargetDesc,
    ) -> anyhow::Result<StubCanvasSurface> {
        if self.control.reject_targets.get() {
            bail!("unsupported sample count {}", target.sample_count);
        }
        self.op(format!(
            "wrap_render_target fbo={} {}x{} samples={} stencil={}",
            target.framebuffer, target.width, target.height, target.sample_count,
            target.stencil_bits
        ));
        Ok(StubCanvasSurface {
            framebuffer: target.framebuffer,
            texture: None,
        })
    }

    fn wrap_texture(&mut self, texture: &Texture) -> anyhow::Result<Texture> {
        if self.control.reject_textures.get() {
            bail!("unsupported pixel format");
        }
        self.op(format!("wrap_texture #{}", texture.id));
        Ok(*texture)
    }

    fn canvas<'a>(&'a mut self, surface: &'a mut StubCanvasSurface) -> StubCanvas<'a> {
        StubCanvas {
            backend: self,
            surface,
        }
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.op("flush");
        Ok(())
    }

    fn release_surface(&mut self, surface: StubCanvasSurface) {
        if let Some(texture) = surface.texture {
            self.gl.delete_framebuffer(surface.framebuffer);
            self.gl.delete_texture(texture.id);
        }
        self.op("release_surface");
    }

    fn release(&mut self) {
        self.op("release");
    }

    fn abandon(&mut self) {
        self.op("abandon");
    }
}
