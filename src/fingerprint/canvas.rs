//! Canvas 2D render signature
//!
//! Draws a fixed scene of overlapping translucent shapes, rotated shadowed
//! text and stroked rectangles, then serializes the bitmap with
//! `toDataURL()`. Anti-aliasing, font rasterization and blending differ per
//! GPU/driver/OS, so the data URL differs too.

use std::f64::consts::PI;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::dom;
use crate::error::{Result, VisitorError};

const WIDTH: u32 = 300;
const HEIGHT: u32 = 150;
const TEXT_LOWER: &str = "@$%&*aBcDeFgHiJkLmNoPqRsTuVwXyZ";
const TEXT_UPPER: &str = "@$%&*AbCdEfGhIjKlMnOpQrStUvWxYz";
const FONT: &str = "bold 17px 'Arial'";

fn deg(d: f64) -> f64 {
    d * PI / 180.0
}

fn js_err(op: &'static str) -> impl Fn(wasm_bindgen::JsValue) -> VisitorError {
    move |e| VisitorError::extractor("canvas", format!("{}: {:?}", op, e))
}

/// Render the scene on a detached canvas and return its PNG data URL.
pub fn canvas_signature() -> Result<String> {
    let document = dom::document()?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_err("create canvas"))?
        .dyn_into()
        .map_err(|_| VisitorError::extractor("canvas", "not a canvas element"))?;
    canvas.set_width(WIDTH);
    canvas.set_height(HEIGHT);

    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(js_err("getContext"))?
        .ok_or_else(|| VisitorError::extractor("canvas", "2d context unavailable"))?
        .dyn_into()
        .map_err(|_| VisitorError::extractor("canvas", "not a 2d context"))?;

    draw_scene(&ctx)?;

    canvas.to_data_url().map_err(js_err("toDataURL"))
}

fn draw_scene(ctx: &CanvasRenderingContext2d) -> Result<()> {
    // Background and two translucent bars
    ctx.set_fill_style_str("rgb(241,44,44)");
    ctx.fill_rect(0.0, 0.0, WIDTH as f64, HEIGHT as f64);
    ctx.set_fill_style_str("rgba(12,254,234,0.76)");
    ctx.fill_rect(40.0, 10.0, 50.0, 130.0);
    ctx.set_fill_style_str("rgba(65,255,0,0.62)");
    ctx.fill_rect(20.0, 55.0, 260.0, 40.0);

    // Rotated outlined text with a white glow
    ctx.set_fill_style_str("#5100cc");
    ctx.set_font(FONT);
    ctx.set_shadow_color("white");
    ctx.set_shadow_blur(5.0);
    ctx.set_text_baseline("top");
    ctx.rotate(deg(15.0)).map_err(js_err("rotate"))?;
    ctx.stroke_text(TEXT_LOWER, 32.0, 25.0).map_err(js_err("strokeText"))?;
    ctx.fill_text(TEXT_LOWER, 30.0, 23.0).map_err(js_err("fillText"))?;
    ctx.rotate(deg(-15.0)).map_err(js_err("rotate"))?;
    ctx.set_shadow_blur(0.0);

    // Circle
    ctx.begin_path();
    ctx.arc(200.0, 75.0, 55.0, 0.0, 2.0 * PI).map_err(js_err("arc"))?;
    ctx.set_fill_style_str("rgba(169,117,199,0.88)");
    ctx.fill();
    ctx.set_stroke_style_str("#b300ff");
    ctx.stroke();

    // Counter-rotated text with a black glow
    ctx.set_fill_style_str("#ffffff");
    ctx.set_font(FONT);
    ctx.set_shadow_color("black");
    ctx.set_shadow_blur(7.0);
    ctx.set_text_baseline("alphabetic");
    ctx.rotate(deg(-15.0)).map_err(js_err("rotate"))?;
    ctx.fill_text(TEXT_UPPER, 16.0, 125.0).map_err(js_err("fillText"))?;
    ctx.rotate(deg(15.0)).map_err(js_err("rotate"))?;

    // Two tilted stroked rectangles
    ctx.rotate(deg(10.0)).map_err(js_err("rotate"))?;
    ctx.set_stroke_style_str("rgba(255,0,0,0.62)");
    ctx.set_line_width(5.0);
    ctx.stroke_rect(80.0, 40.0, 150.0, 20.0);
    ctx.rotate(deg(-10.0)).map_err(js_err("rotate"))?;

    ctx.rotate(deg(-10.0)).map_err(js_err("rotate"))?;
    ctx.set_stroke_style_str("rgba(0,0,255,0.62)");
    ctx.set_line_width(5.0);
    ctx.stroke_rect(45.0, 120.0, 170.0, 20.0);
    ctx.rotate(deg(10.0)).map_err(js_err("rotate"))?;

    Ok(())
}
