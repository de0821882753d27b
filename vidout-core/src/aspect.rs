//! Source and destination rectangles for scaled presentation.

use serde::Serialize;

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(w: u32, h: u32) -> Self {
        Self::new(0, 0, w as i32, h as i32)
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Inputs of the rectangle computation.
#[derive(Debug, Clone, Copy)]
pub struct AspectParams {
    pub image_w: u32,
    pub image_h: u32,
    /// Display (aspect corrected) size of the image
    pub display_w: u32,
    pub display_h: u32,
    pub window_w: u32,
    pub window_h: u32,
    /// Pixel aspect of the monitor, 1.0 for square pixels
    pub monitor_par: f64,
    /// 0.0 letterboxes, 1.0 fills the window and crops the video
    pub panscan: f64,
}

/// Compute the cropped source rectangle (video pixels) and the centered
/// destination rectangle (window pixels).
pub fn src_dst_rects(p: &AspectParams) -> (Rect, Rect) {
    let full_src = Rect::from_size(p.image_w, p.image_h);
    if p.window_w == 0 || p.window_h == 0 || p.display_w == 0 || p.display_h == 0 {
        return (full_src, Rect::default());
    }

    let (ww, wh) = (p.window_w as f64, p.window_h as f64);
    let par = if p.monitor_par > 0.0 { p.monitor_par } else { 1.0 };
    let aspect = p.display_w as f64 / p.display_h as f64 / par;

    let wider_window = ww / wh > aspect;
    let (fit_w, fit_h) = if wider_window { (wh * aspect, wh) } else { (ww, ww / aspect) };
    let (fill_w, fill_h) = if wider_window { (ww, ww / aspect) } else { (wh * aspect, wh) };

    let panscan = p.panscan.clamp(0.0, 1.0);
    let scaled_w = fit_w + (fill_w - fit_w) * panscan;
    let scaled_h = fit_h + (fill_h - fit_h) * panscan;

    let (src_x0, src_x1) = crop_axis(p.image_w, scaled_w, ww);
    let (src_y0, src_y1) = crop_axis(p.image_h, scaled_h, wh);
    let src = Rect::new(src_x0, src_y0, src_x1, src_y1);

    let dst_w = scaled_w.min(ww).round() as i32;
    let dst_h = scaled_h.min(wh).round() as i32;
    let x0 = (p.window_w as i32 - dst_w) / 2;
    let y0 = (p.window_h as i32 - dst_h) / 2;
    let dst = Rect::new(x0, y0, x0 + dst_w, y0 + dst_h);

    (src, dst)
}

/// Centered source span shown when the scaled size exceeds the window.
fn crop_axis(size: u32, scaled: f64, window: f64) -> (i32, i32) {
    if scaled <= window {
        return (0, size as i32);
    }
    let visible = (size as f64 * window / scaled).round() as i32;
    let start = (size as i32 - visible) / 2;
    (start, start + visible)
}
