//! WebGL render signature
//!
//! Draws one large point sprite with a radial falloff shader and captures
//! the framebuffer via `toDataURL()`, together with the list of supported
//! extensions. Returns `None` when WebGL is unavailable or the program
//! fails to link.

use js_sys::Float32Array;
use serde::{Deserialize, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, WebGlProgram, WebGlRenderingContext as Gl, WebGlShader};

use crate::dom;
use crate::error::{Result, VisitorError};

const SIZE: u32 = 100;

const VERTEX_SHADER: &str = r#"
      #version 100
      precision highp float;
      attribute vec2 position;
      void main() {
        gl_Position = vec4(position, 0.0, 1.0);
        gl_PointSize = 128.0;
      }"#;

const FRAGMENT_SHADER: &str = r#"
      #version 100
      precision mediump float;
      void main() {
        vec2 fragmentPosition = 2.0*gl_PointCoord - 1.0;
        float distance = length(fragmentPosition);
        float distanceSqrd = distance * distance;
        gl_FragColor = vec4(
          0.2/distanceSqrd,
          0.1/distanceSqrd,
          0.0, 1.0 );
      }
    "#;

/// Rendered point sprite plus the context's extension list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebGlSignature {
    pub data: String,
    pub extensions: Vec<String>,
}

fn js_err(op: &'static str) -> impl Fn(JsValue) -> VisitorError {
    move |e| VisitorError::extractor("webgl", format!("{}: {:?}", op, e))
}

pub fn webgl_signature() -> Result<Option<WebGlSignature>> {
    let document = dom::document()?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_err("create canvas"))?
        .dyn_into()
        .map_err(|_| VisitorError::extractor("webgl", "not a canvas element"))?;
    canvas.set_width(SIZE);
    canvas.set_height(SIZE);

    let Some(gl) = context(&canvas) else {
        log::debug!("WebGL unavailable, webgl signature is null");
        return Ok(None);
    };

    let extensions = gl
        .get_supported_extensions()
        .map(|list| list.iter().filter_map(|e| e.as_string()).collect())
        .unwrap_or_default();

    gl.viewport(0, 0, gl.drawing_buffer_width(), gl.drawing_buffer_height());
    gl.clear_color(0.0, 0.0, 0.0, 1.0);
    gl.clear(Gl::COLOR_BUFFER_BIT);

    let Some(program) = link_program(&gl) else {
        log::debug!("WebGL program failed to link, webgl signature is null");
        return Ok(None);
    };

    gl.enable_vertex_attrib_array(0);
    let buffer = gl.create_buffer();
    gl.bind_buffer(Gl::ARRAY_BUFFER, buffer.as_ref());
    let vertices = Float32Array::from(&[0.0f32, 0.0][..]);
    gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &vertices, Gl::STATIC_DRAW);
    gl.vertex_attrib_pointer_with_i32(0, 2, Gl::FLOAT, false, 0, 0);

    gl.use_program(Some(&program));
    gl.draw_arrays(Gl::POINTS, 0, 1);

    let data = canvas.to_data_url();

    gl.use_program(None);
    gl.delete_buffer(buffer.as_ref());
    gl.delete_program(Some(&program));

    Ok(Some(WebGlSignature {
        data: data.map_err(js_err("toDataURL"))?,
        extensions,
    }))
}

fn context(canvas: &HtmlCanvasElement) -> Option<Gl> {
    ["webgl", "experimental-webgl"]
        .into_iter()
        .find_map(|kind| canvas.get_context(kind).ok().flatten())
        .and_then(|ctx| ctx.dyn_into::<Gl>().ok())
}

fn compile(gl: &Gl, kind: u32, source: &str) -> Option<WebGlShader> {
    let shader = gl.create_shader(kind)?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    Some(shader)
}

/// Compile, link and detach both shaders. Shaders are always deleted;
/// the program is deleted when linking fails.
fn link_program(gl: &Gl) -> Option<WebGlProgram> {
    let vertex = compile(gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment = compile(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
    let program = gl.create_program()?;

    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    gl.detach_shader(&program, &vertex);
    gl.detach_shader(&program, &fragment);
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));

    let linked = gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if !linked {
        gl.use_program(None);
        gl.delete_program(Some(&program));
        return None;
    }
    Some(program)
}
