use std::cell::RefCell;

use crate::error::BootError;

/// Where the bootstrap should draw.
#[derive(Debug, Clone)]
pub enum CanvasTarget {
    /// A canvas element in the page's document, looked up by id.
    Dom(String),
    /// An in-memory surface that records draw calls instead of rendering.
    Headless { width: u32, height: u32 },
    None,
}

/// The bound drawing surface. Scripts reach it through the `connector`
/// module; the slot is thread-local because everything here runs on one
/// thread.
pub struct BoundCanvas {
    width: u32,
    height: u32,
    #[cfg(target_arch = "wasm32")]
    ctx: web_sys::CanvasRenderingContext2d,
    #[cfg(not(target_arch = "wasm32"))]
    ops: Vec<DrawOp>,
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
    },
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
        line_width: f64,
    },
    FillText {
        text: String,
        x: f64,
        y: f64,
        font: String,
        color: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        color: String,
    },
    FillCircle {
        cx: f64,
        cy: f64,
        r: f64,
        color: String,
    },
}

thread_local! {
    static SURFACE: RefCell<Option<BoundCanvas>> = RefCell::new(None);
}

/// Resolves the target, installs the surface in the slot and returns its
/// pixel dimensions. Binding again replaces the previous surface.
pub fn bind(target: CanvasTarget) -> Result<(u32, u32), BootError> {
    let surface = match target {
        CanvasTarget::Dom(id) => bind_dom(&id)?,
        #[cfg(not(target_arch = "wasm32"))]
        CanvasTarget::Headless { width, height } => BoundCanvas {
            width,
            height,
            ops: Vec::new(),
        },
        #[cfg(target_arch = "wasm32")]
        CanvasTarget::Headless { .. } => {
            return Err(BootError::Canvas(
                "headless surfaces are not available in the browser".to_string(),
            ));
        }
        CanvasTarget::None => {
            return Err(BootError::Canvas("no canvas target provided".to_string()));
        }
    };

    let size = surface.size();
    SURFACE.with(|slot| slot.borrow_mut().replace(surface));

    Ok(size)
}

/// Runs `f` against the bound surface; fails when nothing is bound yet.
pub fn with_canvas<R>(f: impl FnOnce(&mut BoundCanvas) -> Result<R, String>) -> Result<R, String> {
    SURFACE.with(|slot| match slot.borrow_mut().as_mut() {
        Some(surface) => f(surface),
        None => Err("no canvas bound".to_string()),
    })
}

#[cfg(test)]
pub(crate) fn unbind() {
    SURFACE.with(|slot| slot.borrow_mut().take());
}

/// Drains the draw calls recorded by a headless surface.
#[cfg(not(target_arch = "wasm32"))]
pub fn take_ops() -> Vec<DrawOp> {
    SURFACE.with(|slot| {
        slot.borrow_mut()
            .as_mut()
            .map(|surface| std::mem::take(&mut surface.ops))
            .unwrap_or_default()
    })
}

#[cfg(target_arch = "wasm32")]
fn bind_dom(id: &str) -> Result<BoundCanvas, BootError> {
    use wasm_bindgen::JsCast;

    let window = web_sys::window().ok_or_else(|| BootError::Canvas("no window".to_string()))?;
    let document = window
        .document()
        .ok_or_else(|| BootError::Canvas("no document".to_string()))?;

    let canvas = document
        .get_element_by_id(id)
        .ok_or_else(|| BootError::Canvas(format!("no element with id {}", id)))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| BootError::Canvas(format!("element {} is not a canvas", id)))?;

    let width = viewport_extent(window.inner_width())?;
    let height = viewport_extent(window.inner_height())?;

    canvas.set_width(width);
    canvas.set_height(height);

    let ctx = canvas
        .get_context("2d")
        .map_err(|_| BootError::Canvas("requesting a 2d context failed".to_string()))?
        .ok_or_else(|| BootError::Canvas(format!("canvas {} has no 2d context", id)))?
        .dyn_into::<web_sys::CanvasRenderingContext2d>()
        .map_err(|_| BootError::Canvas("2d context has an unexpected type".to_string()))?;

    Ok(BoundCanvas { width, height, ctx })
}

#[cfg(target_arch = "wasm32")]
fn viewport_extent(
    value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>,
) -> Result<u32, BootError> {
    value
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value as u32)
        .ok_or_else(|| BootError::Canvas("viewport size unavailable".to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
fn bind_dom(id: &str) -> Result<BoundCanvas, BootError> {
    Err(BootError::Canvas(format!(
        "canvas element {} requires a browser document",
        id
    )))
}

impl BoundCanvas {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(target_arch = "wasm32")]
impl BoundCanvas {
    pub fn clear(&mut self) -> Result<(), String> {
        self.ctx
            .clear_rect(0.0, 0.0, self.width as f64, self.height as f64);
        Ok(())
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) -> Result<(), String> {
        self.set_fill(color);
        self.ctx.fill_rect(x, y, w, h);
        Ok(())
    }

    pub fn stroke_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: &str,
        line_width: f64,
    ) -> Result<(), String> {
        self.set_stroke(color);
        self.ctx.set_line_width(line_width);
        self.ctx.stroke_rect(x, y, w, h);
        Ok(())
    }

    pub fn fill_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font: &str,
        color: &str,
    ) -> Result<(), String> {
        self.ctx.set_font(font);
        self.set_fill(color);
        self.ctx.fill_text(text, x, y).map_err(js_error)
    }

    pub fn measure_text(&mut self, text: &str, font: &str) -> Result<f64, String> {
        self.ctx.set_font(font);
        self.ctx
            .measure_text(text)
            .map(|metrics| metrics.width())
            .map_err(js_error)
    }

    pub fn line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        color: &str,
    ) -> Result<(), String> {
        self.set_stroke(color);
        self.ctx.set_line_width(width);
        self.ctx.begin_path();
        self.ctx.move_to(x1, y1);
        self.ctx.line_to(x2, y2);
        self.ctx.stroke();
        Ok(())
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: &str) -> Result<(), String> {
        self.set_fill(color);
        self.ctx.begin_path();
        self.ctx
            .arc(cx, cy, r, 0.0, std::f64::consts::TAU)
            .map_err(js_error)?;
        self.ctx.fill();
        Ok(())
    }

    #[allow(deprecated)]
    fn set_fill(&self, color: &str) {
        self.ctx
            .set_fill_style(&wasm_bindgen::JsValue::from_str(color));
    }

    #[allow(deprecated)]
    fn set_stroke(&self, color: &str) {
        self.ctx
            .set_stroke_style(&wasm_bindgen::JsValue::from_str(color));
    }
}

#[cfg(target_arch = "wasm32")]
fn js_error(value: wasm_bindgen::JsValue) -> String {
    format!("{:?}", value)
}

#[cfg(not(target_arch = "wasm32"))]
impl BoundCanvas {
    pub fn clear(&mut self) -> Result<(), String> {
        self.ops.push(DrawOp::Clear);
        Ok(())
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) -> Result<(), String> {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            w,
            h,
            color: color.to_string(),
        });
        Ok(())
    }

    pub fn stroke_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: &str,
        line_width: f64,
    ) -> Result<(), String> {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y,
            w,
            h,
            color: color.to_string(),
            line_width,
        });
        Ok(())
    }

    pub fn fill_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font: &str,
        color: &str,
    ) -> Result<(), String> {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
            font: font.to_string(),
            color: color.to_string(),
        });
        Ok(())
    }

    // Rough advance width so layout code stays testable off the browser.
    pub fn measure_text(&mut self, text: &str, font: &str) -> Result<f64, String> {
        let size = font_px(font).unwrap_or(10.0);
        Ok(text.chars().count() as f64 * size * 0.6)
    }

    pub fn line(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        color: &str,
    ) -> Result<(), String> {
        self.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color: color.to_string(),
        });
        Ok(())
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, color: &str) -> Result<(), String> {
        self.ops.push(DrawOp::FillCircle {
            cx,
            cy,
            r,
            color: color.to_string(),
        });
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn font_px(font: &str) -> Option<f64> {
    let head = font.trim().split_whitespace().next()?;
    head.strip_suffix("px")?.parse().ok()
}
