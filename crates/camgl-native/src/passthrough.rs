//! The copy/transform program.
//!
//! Draws a texture over the whole viewport of the bound framebuffer with the
//! texture coordinates multiplied by a 4x4 matrix. One program per
//! [`TextureKind`] is compiled on first use: external camera textures need a
//! `samplerExternalOES`, offscreen textures a plain `sampler2D`.

use std::ffi::CString;
use std::mem::size_of;
use std::ptr;

use anyhow::{anyhow, bail, Result};
use camgl_core::{PassThroughDraw, Texture, TextureKind, TransformMatrix};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};
use tracing::{debug, error};

pub const VERTEX_SHADER: &str = "\
attribute vec4 aPosition;
attribute vec4 aTexCoord;
uniform mat4 uTransformMatrix;
varying vec2 vTexCoord;

void main() {
    gl_Position = aPosition;
    vTexCoord = (uTransformMatrix * aTexCoord).xy;
}
";

pub const FRAGMENT_SHADER_2D: &str = "\
precision mediump float;
varying vec2 vTexCoord;
uniform sampler2D uTexture;

void main() {
    gl_FragColor = texture2D(uTexture, vTexCoord);
}
";

pub const FRAGMENT_SHADER_EXTERNAL: &str = "\
#extension GL_OES_EGL_image_external : require
precision mediump float;
varying vec2 vTexCoord;
uniform samplerExternalOES uTexture;

void main() {
    gl_FragColor = texture2D(uTexture, vTexCoord);
}
";

/// Full-viewport triangle strip: position (x, y) followed by texture
/// coordinate (u, v) per vertex.
pub const QUAD_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, 1.0, 1.0, 1.0, //
];

const FLOATS_PER_VERTEX: usize = 4;

/// Fragment stage for textures of `kind`.
pub fn fragment_source(kind: TextureKind) -> &'static str {
    match kind {
        TextureKind::Texture2D => FRAGMENT_SHADER_2D,
        TextureKind::ExternalOes => FRAGMENT_SHADER_EXTERNAL,
    }
}

/// A linked program and its attribute/uniform locations.
#[derive(Debug)]
struct Program {
    id: GLuint,
    position: GLuint,
    tex_coord: GLuint,
    transform_matrix: GLint,
    texture: GLint,
}

/// Pass-through program, compiled lazily per texture kind.
#[derive(Debug, Default)]
pub struct PassThroughShader {
    texture_2d: Option<Program>,
    external: Option<Program>,
    vertex_buffer: GLuint,
}

impl PassThroughShader {
    /// No GL work happens until the first draw.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all GL objects without deleting them (context already gone).
    pub fn abandon(&mut self) {
        self.texture_2d = None;
        self.external = None;
        self.vertex_buffer = 0;
    }

    fn vertex_buffer(&mut self) -> GLuint {
        if self.vertex_buffer == 0 {
            unsafe {
                gl::GenBuffers(1, &mut self.vertex_buffer);
                gl::BindBuffer(gl::ARRAY_BUFFER, self.vertex_buffer);
                gl::BufferData(
                    gl::ARRAY_BUFFER,
                    size_of::<[f32; 16]>() as GLsizeiptr,
                    QUAD_VERTICES.as_ptr().cast(),
                    gl::STATIC_DRAW,
                );
            }
        }
        self.vertex_buffer
    }

    fn program(&mut self, kind: TextureKind) -> Result<&Program> {
        let slot = match kind {
            TextureKind::Texture2D => &mut self.texture_2d,
            TextureKind::ExternalOes => &mut self.external,
        };
        if slot.is_none() {
            debug!(?kind, "Compiling pass-through program");
            *slot = Some(unsafe { build_program(fragment_source(kind))? });
        }
        slot.as_ref()
            .ok_or_else(|| anyhow!("pass-through program for {kind:?} missing"))
    }
}

impl PassThroughDraw for PassThroughShader {
    fn draw(&mut self, texture: &Texture, matrix: &TransformMatrix) -> Result<()> {
        let vertex_buffer = self.vertex_buffer();
        let program = self.program(texture.kind)?;
        let stride = (FLOATS_PER_VERTEX * size_of::<f32>()) as GLsizei;

        unsafe {
            gl::UseProgram(program.id);

            gl::BindBuffer(gl::ARRAY_BUFFER, vertex_buffer);
            gl::EnableVertexAttribArray(program.position);
            gl::VertexAttribPointer(program.position, 2, gl::FLOAT, gl::FALSE, stride, ptr::null());
            gl::EnableVertexAttribArray(program.tex_coord);
            gl::VertexAttribPointer(
                program.tex_coord,
                2,
                gl::FLOAT,
                gl::FALSE,
                stride,
                (2 * size_of::<f32>()) as *const _,
            );

            gl::ActiveTexture(gl::TEXTURE0);
            gl::BindTexture(texture.target(), texture.id);
            gl::Uniform1i(program.texture, 0);
            gl::UniformMatrix4fv(program.transform_matrix, 1, gl::FALSE, matrix.as_array().as_ptr());

            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);

            gl::DisableVertexAttribArray(program.position);
            gl::DisableVertexAttribArray(program.tex_coord);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
            gl::UseProgram(0);

            let err = gl::GetError();
            if err != gl::NO_ERROR {
                bail!("pass-through draw of texture #{} failed: 0x{err:04X}", texture.id);
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        for program in [self.texture_2d.take(), self.external.take()].into_iter().flatten() {
            unsafe { gl::DeleteProgram(program.id) };
        }
        if self.vertex_buffer != 0 {
            unsafe { gl::DeleteBuffers(1, &self.vertex_buffer) };
            self.vertex_buffer = 0;
        }
    }
}

unsafe fn build_program(fragment: &str) -> Result<Program> {
    let vs = compile_shader(gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let fs = match compile_shader(gl::FRAGMENT_SHADER, fragment) {
        Ok(fs) => fs,
        Err(e) => {
            gl::DeleteShader(vs);
            return Err(e);
        }
    };

    let id = gl::CreateProgram();
    gl::AttachShader(id, vs);
    gl::AttachShader(id, fs);
    gl::LinkProgram(id);

    gl::DetachShader(id, vs);
    gl::DetachShader(id, fs);
    gl::DeleteShader(vs);
    gl::DeleteShader(fs);

    let mut linked = 0;
    gl::GetProgramiv(id, gl::LINK_STATUS, &mut linked);
    if linked == 0 {
        let log = program_info_log(id);
        gl::DeleteProgram(id);
        error!("Pass-through program failed to link: {log}");
        bail!("failed to link pass-through program: {log}");
    }

    let position = gl::GetAttribLocation(id, b"aPosition\0".as_ptr().cast());
    let tex_coord = gl::GetAttribLocation(id, b"aTexCoord\0".as_ptr().cast());
    if position < 0 || tex_coord < 0 {
        gl::DeleteProgram(id);
        bail!("pass-through program is missing vertex attributes");
    }

    Ok(Program {
        id,
        position: position as GLuint,
        tex_coord: tex_coord as GLuint,
        transform_matrix: gl::GetUniformLocation(id, b"uTransformMatrix\0".as_ptr().cast()),
        texture: gl::GetUniformLocation(id, b"uTexture\0".as_ptr().cast()),
    })
}

unsafe fn compile_shader(kind: GLenum, source: &str) -> Result<GLuint> {
    let source = CString::new(source)?;
    let shader = gl::CreateShader(kind);
    if shader == 0 {
        bail!("glCreateShader(0x{kind:04X}) returned 0");
    }
    gl::ShaderSource(shader, 1, &source.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut compiled = 0;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut compiled);
    if compiled == 0 {
        let log = shader_info_log(shader);
        gl::DeleteShader(shader);
        error!("Shader 0x{kind:04X} failed to compile: {log}");
        bail!("failed to compile shader 0x{kind:04X}: {log}");
    }
    Ok(shader)
}

unsafe fn shader_info_log(shader: GLuint) -> String {
    let mut len = 0;
    gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    gl::GetShaderInfoLog(shader, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    trim_log(buf)
}

unsafe fn program_info_log(program: GLuint) -> String {
    let mut len = 0;
    gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    gl::GetProgramInfoLog(program, len, ptr::null_mut(), buf.as_mut_ptr() as *mut GLchar);
    trim_log(buf)
}

fn trim_log(buf: Vec<u8>) -> String {
    String::from_utf8_lossy(&buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}
