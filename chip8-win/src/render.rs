//! OpenGL presentation of the CHIP-8 display.
//!
//! The 64x32 display buffer is uploaded as a single channel texture every
//! frame, and stretched over the window with one fullscreen quad. The
//! fragment shader maps texels to the configured foreground and background
//! colours.
use std::{fmt, rc::Rc};

use chip8::{constants::*, Chip8DisplayBuffer};
use glow::{Context as GlowContext, HasContext};

use crate::{config::Color, error::AppError};

type Program = <GlowContext as HasContext>::Program;
type Shader = <GlowContext as HasContext>::Shader;
type Buffer = <GlowContext as HasContext>::Buffer;
type VertexArray = <GlowContext as HasContext>::VertexArray;
type Texture = <GlowContext as HasContext>::Texture;
type UniformLocation = <GlowContext as HasContext>::UniformLocation;

/// Triangle strip covering clip space.
#[rustfmt::skip]
const QUAD: [f32; 8] = [
    -1.0, -1.0,
     1.0, -1.0,
    -1.0,  1.0,
     1.0,  1.0,
];

const VERTEX_SHADER: &str = r#"
layout(location = 0) in vec2 a_pos;
out vec2 v_uv;

void main() {
    // Texture row 0 is the top of the display.
    v_uv = vec2((a_pos.x + 1.0) * 0.5, (1.0 - a_pos.y) * 0.5);
    gl_Position = vec4(a_pos, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
in vec2 v_uv;
out vec4 o_color;

uniform sampler2D u_display;
uniform vec4 u_foreground;
uniform vec4 u_background;

void main() {
    float lit = texture(u_display, v_uv).r;
    o_color = mix(u_background, u_foreground, step(0.5, lit));
}
"#;

pub struct Render {
    /// The interface to the loaded OpenGL function.
    gl: Rc<GlowContext>,
    info: OpenGLInfo,
    program: Program,
    vertex_array: VertexArray,
    vertex_buffer: Buffer,
    texture: Texture,
    u_display: Option<UniformLocation>,
    u_foreground: Option<UniformLocation>,
    u_background: Option<UniformLocation>,
    /// Staging memory for the texture upload.
    pixels: Box<[u8; DISPLAY_BUFFER_SIZE]>,
}

impl Render {
    pub fn new(gl: Rc<GlowContext>) -> Result<Self, AppError> {
        let info = OpenGLInfo::new(&gl);

        unsafe {
            let program = Self::create_program(&gl)?;
            let (vertex_array, vertex_buffer) = Self::create_buffers(&gl)?;
            let texture = Self::create_texture(&gl)?;

            let u_display = gl.get_uniform_location(program, "u_display");
            let u_foreground = gl.get_uniform_location(program, "u_foreground");
            let u_background = gl.get_uniform_location(program, "u_background");

            Ok(Self {
                gl,
                info,
                program,
                vertex_array,
                vertex_buffer,
                texture,
                u_display,
                u_foreground,
                u_background,
                pixels: Box::new([0; DISPLAY_BUFFER_SIZE]),
            })
        }
    }

    /// Shader source header for the current context flavour.
    fn shader_header(gl: &GlowContext) -> &'static str {
        if gl.version().is_embedded {
            "#version 300 es\nprecision mediump float;\n"
        } else {
            "#version 330 core\n"
        }
    }

    unsafe fn compile_shader(gl: &GlowContext, kind: u32, source: &str) -> Result<Shader, AppError> {
        let shader = gl.create_shader(kind).map_err(AppError::gl)?;
        gl.shader_source(shader, &format!("{}{}", Self::shader_header(gl), source));
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let message = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(AppError::gl(format!("shader compile failed: {message}")));
        }

        Ok(shader)
    }

    unsafe fn create_program(gl: &GlowContext) -> Result<Program, AppError> {
        let vertex = Self::compile_shader(gl, glow::VERTEX_SHADER, VERTEX_SHADER)?;
        let fragment = Self::compile_shader(gl, glow::FRAGMENT_SHADER, FRAGMENT_SHADER)?;

        let program = gl.create_program().map_err(AppError::gl)?;
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);

        // Shaders are owned by the program once linked.
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if !gl.get_program_link_status(program) {
            let message = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(AppError::gl(format!("program link failed: {message}")));
        }

        Ok(program)
    }

    unsafe fn create_buffers(gl: &GlowContext) -> Result<(VertexArray, Buffer), AppError> {
        let vertex_array = gl.create_vertex_array().map_err(AppError::gl)?;
        let vertex_buffer = gl.create_buffer().map_err(AppError::gl)?;

        gl.bind_vertex_array(Some(vertex_array));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&QUAD),
            glow::STATIC_DRAW,
        );

        let stride = 2 * std::mem::size_of::<f32>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);

        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok((vertex_array, vertex_buffer))
    }

    unsafe fn create_texture(gl: &GlowContext) -> Result<Texture, AppError> {
        let texture = gl.create_texture().map_err(AppError::gl)?;

        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        for (param, value) in [
            (glow::TEXTURE_MIN_FILTER, glow::NEAREST),
            (glow::TEXTURE_MAG_FILTER, glow::NEAREST),
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
        }
        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(texture)
    }

    /// Set the drawable area to the window size.
    pub fn resize(&mut self, width: u32, height: u32) {
        unsafe {
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    pub fn clear_window(&mut self, color: Color) {
        let [red, green, blue, alpha] = color.to_f32();
        unsafe {
            self.gl.clear_color(red, green, blue, alpha);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Draw the display buffer stretched over the whole window.
    pub fn draw_display(&mut self, display: Chip8DisplayBuffer, foreground: Color, background: Color) {
        for (texel, lit) in self.pixels.iter_mut().zip(display.iter()) {
            *texel = if *lit { 0xFF } else { 0x00 };
        }

        let gl = &self.gl;
        let [fr, fg, fb, fa] = foreground.to_f32();
        let [br, bg, bb, ba] = background.to_f32();

        unsafe {
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            // Rows are tightly packed single bytes.
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::R8 as i32,
                DISPLAY_WIDTH as i32,
                DISPLAY_HEIGHT as i32,
                0,
                glow::RED,
                glow::UNSIGNED_BYTE,
                Some(&self.pixels[..]),
            );

            gl.use_program(Some(self.program));
            gl.uniform_1_i32(self.u_display.as_ref(), 0);
            gl.uniform_4_f32(self.u_foreground.as_ref(), fr, fg, fb, fa);
            gl.uniform_4_f32(self.u_background.as_ref(), br, bg, bb, ba);

            gl.bind_vertex_array(Some(self.vertex_array));
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);

            gl.bind_vertex_array(None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.use_program(None);
        }
    }

    pub fn opengl_info(&self) -> &OpenGLInfo {
        &self.info
    }
}

impl Drop for Render {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_program(self.program);
            self.gl.delete_vertex_array(self.vertex_array);
            self.gl.delete_buffer(self.vertex_buffer);
            self.gl.delete_texture(self.texture);
        }
    }
}

pub struct OpenGLInfo {
    pub version: String,
    pub renderer: String,
    pub vendor: String,
    pub shading_lang: String,
}

impl OpenGLInfo {
    pub fn new(gl: &GlowContext) -> Self {
        unsafe {
            Self {
                version: gl.get_parameter_string(glow::VERSION),
                renderer: gl.get_parameter_string(glow::RENDERER),
                vendor: gl.get_parameter_string(glow::VENDOR),
                shading_lang: gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
            }
        }
    }
}

impl fmt::Display for OpenGLInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self {
            version,
            renderer,
            vendor,
            shading_lang,
        } = self;
        writeln!(f, "OpenGL Version: {version}")?;
        writeln!(f, "Renderer: {renderer}")?;
        writeln!(f, "Vendor: {vendor}")?;
        writeln!(f, "Shading Language: {shading_lang}")?;
        Ok(())
    }
}
