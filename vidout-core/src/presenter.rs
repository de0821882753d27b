//! # Presentation Controller
//!
//! Drives a [`DisplayBackend`] with double buffering:
//!
//! ```text
//! configure ──► render_into(slot current) ──► compose_overlay ──► present
//!                      ▲                                            │
//!                      └──────── current = (current + 1) % 2 ◄──────┘
//! ```
//!
//! The slot on screen (`visible`) is never written between presents. Its
//! overlay backup lets `redraw` and `screenshot` work without a new frame.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::aspect::{src_dst_rects, AspectParams, Rect};
use crate::backend::{negotiate_fourcc, BackendError, DisplayBackend, FourCc};
use crate::csp::{Csp, CspDetails};
use crate::image::{FrameBuffer, ImageError, OwnedImage};
use crate::imgfmt::{imgfmt_desc, ImgFmt, ImgFmtDesc};
use crate::osd::{draw_on_image_bk, OsdBackup, OsdState};
use crate::port::{init_colorkey, select_port, CkMethod, PortError, XvOptions};
use crate::surface::{SurfaceError, SurfacePool, NUM_BUFFERS};

/// Equalizer attribute selecting the BT.709 matrix.
pub const BT709_ATTRIBUTE: &str = "bt_709";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum VoError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("image format {0} not supported by the display")]
    FormatUnsupported(ImgFmt),
    #[error("allocation failed: {0}")]
    Allocation(String),
    #[error("display call failed: {0}")]
    DisplayCall(#[from] BackendError),
    #[error("video output not configured")]
    NotConfigured,
    #[error("port: {0}")]
    Port(#[from] PortError),
}

impl From<SurfaceError> for VoError {
    fn from(e: SurfaceError) -> Self {
        match e {
            SurfaceError::Backend(e) => VoError::DisplayCall(e),
            err @ SurfaceError::Allocation { .. } => VoError::Allocation(err.to_string()),
            SurfaceError::Layout(e) => VoError::Config(e.to_string()),
            SurfaceError::NotAllocated(_) => VoError::NotConfigured,
        }
    }
}

impl From<ImageError> for VoError {
    fn from(e: ImageError) -> Self {
        VoError::Config(e.to_string())
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoState {
    Unconfigured,
    Configured,
    Presenting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoEvent {
    /// Window content was damaged
    Expose,
    /// Window size changed; the new size is read from the backend
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresenterOptions {
    pub xv: XvOptions,
    /// Pixel aspect of the monitor
    pub monitor_par: f64,
    pub panscan: f64,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            xv: XvOptions::default(),
            monitor_par: 1.0,
            panscan: 0.0,
        }
    }
}

pub type SharedPresenter<B> = Arc<Mutex<Presenter<B>>>;

// ============================================================================
// Presenter
// ============================================================================

pub struct Presenter<B: DisplayBackend> {
    backend: B,
    pool: SurfacePool,
    opts: PresenterOptions,
    state: VoState,
    port: u32,
    colorkey: Option<u32>,
    max_image_size: Option<(u32, u32)>,

    fourcc: Option<FourCc>,
    image_desc: ImgFmtDesc,
    image_width: u32,
    image_height: u32,
    display_width: u32,
    display_height: u32,

    src_rect: Rect,
    dst_rect: Rect,
    cached_csp: CspDetails,
    paused: bool,
    want_redraw: bool,
    backups: [OsdBackup; NUM_BUFFERS],
}

impl<B: DisplayBackend> Presenter<B> {
    /// Grab a port and read the display limits.
    pub fn new(mut backend: B, opts: PresenterOptions) -> Result<Self, VoError> {
        let port = select_port(&mut backend, &opts.xv)?;
        let colorkey = init_colorkey(&mut backend, &opts.xv);
        let max_image_size = backend.max_image_size();
        if let Some((w, h)) = max_image_size {
            tracing::debug!("maximum image size {}x{}", w, h);
        }
        Ok(Self {
            backend,
            pool: SurfacePool::new(),
            opts,
            state: VoState::Unconfigured,
            port,
            colorkey,
            max_image_size,
            fourcc: None,
            image_desc: ImgFmtDesc::default(),
            image_width: 0,
            image_height: 0,
            display_width: 0,
            display_height: 0,
            src_rect: Rect::default(),
            dst_rect: Rect::default(),
            cached_csp: CspDetails::default(),
            paused: false,
            want_redraw: false,
            backups: Default::default(),
        })
    }

    /// (Re)create both slots for `width x height` images of `format`.
    pub fn configure(
        &mut self,
        width: u32,
        height: u32,
        d_width: u32,
        d_height: u32,
        format: ImgFmt,
    ) -> Result<(), VoError> {
        if let Some((max_w, max_h)) = self.max_image_size {
            if max_w != 0 && max_h != 0 && (width > max_w || height > max_h) {
                return Err(VoError::Config(format!(
                    "image {}x{} exceeds the display maximum of {}x{}",
                    width, height, max_w, max_h
                )));
            }
        }

        let formats = self.backend.list_formats();
        let fourcc =
            negotiate_fourcc(format, &formats).ok_or(VoError::FormatUnsupported(format))?;
        let desc = imgfmt_desc(format);

        self.state = VoState::Unconfigured;
        self.fourcc = None;
        self.pool.allocate(&mut self.backend, width, height, fourcc, &desc)?;

        self.fourcc = Some(fourcc);
        self.image_desc = desc;
        self.image_width = width;
        self.image_height = height;
        self.display_width = d_width;
        self.display_height = d_height;
        for backup in &mut self.backups {
            backup.reset();
        }
        self.state = VoState::Configured;
        tracing::info!(
            "configured {}x{} => {}x{} {} as {}",
            width,
            height,
            d_width,
            d_height,
            format,
            fourcc
        );

        self.resize();
        Ok(())
    }

    pub fn query_format(&self, format: ImgFmt) -> bool {
        negotiate_fourcc(format, &self.backend.list_formats()).is_some()
    }

    fn ensure_configured(&self) -> Result<(), VoError> {
        match self.state {
            VoState::Unconfigured => Err(VoError::NotConfigured),
            _ => Ok(()),
        }
    }

    /// Recompute rectangles, repaint the colorkey and re-read the colorspace.
    fn resize(&mut self) {
        let (window_w, window_h) = self.backend.window_size();
        let params = AspectParams {
            image_w: self.image_width,
            image_h: self.image_height,
            display_w: self.display_width,
            display_h: self.display_height,
            window_w,
            window_h,
            monitor_par: self.opts.monitor_par,
            panscan: self.opts.panscan,
        };
        let (src, dst) = src_dst_rects(&params);
        self.src_rect = src;
        self.dst_rect = dst;

        if let (Some(colorkey), CkMethod::Manual) = (self.colorkey, self.opts.xv.ck_method) {
            self.backend.draw_colorkey(dst, colorkey);
        }
        self.read_csp();
    }

    fn read_csp(&mut self) {
        self.cached_csp = CspDetails::default();
        if let Some(bt709) = self.backend.get_equalizer(BT709_ATTRIBUTE) {
            self.cached_csp.format = if bt709 == 100 { Csp::Bt709 } else { Csp::Bt601 };
        }
    }

    /// Copy a decoded frame into the write slot.
    pub fn render_into<S: AsRef<[u8]>>(&mut self, frame: &FrameBuffer<S>) -> Result<(), VoError> {
        self.ensure_configured()?;
        if frame.fmt.id != self.image_desc.id {
            return Err(VoError::Config(format!(
                "frame format {} does not match configured {}",
                frame.fmt.id, self.image_desc.id
            )));
        }
        let current = self.pool.current();
        let mut view = self.pool.view_of(current, &self.image_desc, &self.cached_csp)?;
        view.copy_from(frame)?;
        self.backups[current].reset();
        Ok(())
    }

    /// Blend overlays visible at `pts` onto the write slot.
    pub fn compose_overlay(&mut self, osd: &OsdState, pts: f64) -> Result<usize, VoError> {
        self.ensure_configured()?;
        let current = self.pool.current();
        let mut view = self.pool.view_of(current, &self.image_desc, &self.cached_csp)?;
        Ok(draw_on_image_bk(osd, pts, &mut self.backups[current], &mut view))
    }

    /// Put the write slot on screen and advance to the other slot.
    ///
    /// A failed display call drops the frame: the error is returned and
    /// both slot indices stay where they were.
    pub fn present(&mut self) -> Result<(), VoError> {
        self.ensure_configured()?;
        let current = self.pool.current();
        let handle = self.pool.handle(current).ok_or(VoError::NotConfigured)?;
        let data = self.pool.data(current).ok_or(VoError::NotConfigured)?;
        if let Err(e) = self.backend.put_image(handle, data, self.src_rect, self.dst_rect) {
            tracing::warn!("dropping frame, display call failed: {}", e);
            return Err(VoError::DisplayCall(e));
        }
        self.pool.advance();
        self.backend.flush();
        self.state = VoState::Presenting;
        Ok(())
    }

    /// Show the visible frame again, with `osd` recomposed when given.
    /// Returns `false` when nothing has been presented yet.
    pub fn redraw(&mut self, osd: Option<&OsdState>) -> Result<bool, VoError> {
        self.ensure_configured()?;
        let Some(visible) = self.pool.visible() else {
            return Ok(false);
        };
        {
            let mut view = self.pool.view_of(visible, &self.image_desc, &self.cached_csp)?;
            self.backups[visible].restore(&mut view);
        }
        self.backups[visible].reset();
        let write_slot = self.pool.current();
        self.pool.set_current(visible);
        let shown = match osd {
            Some(osd) => self.compose_overlay(osd, osd.vo_pts).and_then(|_| self.present()),
            None => self.present(),
        };
        if let Err(e) = shown {
            // the visible slot must never become the write slot
            self.pool.set_current(write_slot);
            return Err(e);
        }
        self.want_redraw = false;
        Ok(true)
    }

    /// Copy of the visible frame without overlays, carrying the display size.
    pub fn screenshot(&mut self) -> Result<Option<OwnedImage>, VoError> {
        self.ensure_configured()?;
        let Some(visible) = self.pool.visible() else {
            return Ok(None);
        };
        let view = self.pool.view_of(visible, &self.image_desc, &self.cached_csp)?;
        let mut shot = view.to_owned_copy();
        shot.set_display_size(self.display_width, self.display_height);
        self.backups[visible].restore(&mut shot);
        Ok(Some(shot))
    }

    /// React to window events. Returns whether a redraw is wanted.
    pub fn handle_events(&mut self, events: &[VoEvent]) -> bool {
        let relevant = events
            .iter()
            .any(|e| matches!(e, VoEvent::Expose | VoEvent::Resize));
        if relevant && self.state != VoState::Unconfigured {
            self.resize();
            self.want_redraw = true;
        }
        self.want_redraw
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_panscan(&mut self, panscan: f64) {
        self.opts.panscan = panscan.clamp(0.0, 1.0);
        if self.state != VoState::Unconfigured {
            self.resize();
            self.want_redraw = true;
        }
    }

    /// Select the YUV matrix through the display's BT.709 switch.
    pub fn set_yuv_colorspace(&mut self, csp: Csp) -> Result<(), VoError> {
        let is_709 = csp == Csp::Bt709;
        self.backend
            .set_equalizer(BT709_ATTRIBUTE, is_709 as i32 * 200 - 100)?;
        self.read_csp();
        Ok(())
    }

    pub fn yuv_colorspace(&self) -> CspDetails {
        self.cached_csp
    }

    pub fn set_equalizer(&mut self, name: &str, value: i32) -> Result<(), VoError> {
        self.backend.set_equalizer(name, value)?;
        Ok(())
    }

    pub fn equalizer(&self, name: &str) -> Option<i32> {
        self.backend.get_equalizer(name)
    }

    /// Release both slots. A later `configure` starts over.
    pub fn uninit(&mut self) {
        self.pool.deallocate_all(&mut self.backend);
        for backup in &mut self.backups {
            backup.reset();
        }
        self.fourcc = None;
        self.state = VoState::Unconfigured;
    }

    /// Share the presenter with a decode thread.
    pub fn into_shared(self) -> SharedPresenter<B> {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> VoState {
        self.state
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn fourcc(&self) -> Option<FourCc> {
        self.fourcc
    }

    pub fn current_slot(&self) -> usize {
        self.pool.current()
    }

    pub fn visible_slot(&self) -> Option<usize> {
        self.pool.visible()
    }

    pub fn src_rect(&self) -> Rect {
        self.src_rect
    }

    pub fn dst_rect(&self) -> Rect {
        self.dst_rect
    }

    pub fn want_redraw(&self) -> bool {
        self.want_redraw
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: DisplayBackend> Drop for Presenter<B> {
    fn drop(&mut self) {
        self.uninit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;
    use crate::osd::SubBitmap;

    fn presenter(backend: MemoryBackend) -> Presenter<MemoryBackend> {
        Presenter::new(backend, PresenterOptions::default()).unwrap()
    }

    /// 420p frame with luma `x + y`, U = 50 and V = 200.
    fn test_frame(w: u32, h: u32) -> OwnedImage {
        let mut frame = OwnedImage::new(ImgFmt::YUV420P, w, h).unwrap();
        for y in 0..h as usize {
            for (x, b) in frame.row_mut(0, y).iter_mut().enumerate() {
                *b = (x + y) as u8;
            }
        }
        for y in 0..frame.plane_height(1) {
            frame.row_mut(1, y).fill(50);
            frame.row_mut(2, y).fill(200);
        }
        frame
    }

    fn same_pixels(a: &OwnedImage, b: &OwnedImage) -> bool {
        (0..a.num_planes())
            .all(|p| (0..a.plane_height(p)).all(|y| a.row(p, y) == b.row(p, y)))
    }

    #[test]
    fn test_visible_slot_sequence() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(64, 32, 64, 32, ImgFmt::YUV420P).unwrap();
        assert_eq!(vo.visible_slot(), None);
        let mut seen = Vec::new();
        for _ in 0..3 {
            vo.present().unwrap();
            seen.push(vo.visible_slot().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 0]);
        assert_eq!(vo.state(), VoState::Presenting);
        assert_eq!(vo.backend().presents.len(), 3);
    }

    #[test]
    fn test_render_present_screenshot_round_trip() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(40, 16, 80, 16, ImgFmt::YUV420P).unwrap();
        let frame = test_frame(40, 16);
        vo.render_into(&frame).unwrap();
        vo.present().unwrap();

        let shot = vo.screenshot().unwrap().unwrap();
        assert!(same_pixels(&shot, &frame));
        assert_eq!(shot.display_size(), (80, 16));
    }

    #[test]
    fn test_yv12_stores_v_before_u() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 4, 32, 4, ImgFmt::YUV420P).unwrap();
        assert_eq!(vo.fourcc(), Some(FourCc::YV12));
        vo.render_into(&test_frame(32, 4)).unwrap();
        vo.present().unwrap();

        let data = &vo.backend().last_present().unwrap().data;
        assert!(data[128..160].iter().all(|&b| b == 200));
        assert!(data[160..192].iter().all(|&b| b == 50));
    }

    #[test]
    fn test_configure_checks_limits_and_formats() {
        let mut vo = presenter(MemoryBackend::new().with_max_image_size(1920, 1080));
        assert!(matches!(
            vo.configure(4096, 2160, 4096, 2160, ImgFmt::YUV420P),
            Err(VoError::Config(_))
        ));
        assert!(matches!(
            vo.configure(64, 64, 64, 64, ImgFmt::RGB24),
            Err(VoError::FormatUnsupported(ImgFmt::RGB24))
        ));
        assert!(vo.query_format(ImgFmt::UYVY));
        assert!(!vo.query_format(ImgFmt::RGB24));

        let mut vo = presenter(MemoryBackend::new().with_formats(&[FourCc::YUY2]));
        assert!(matches!(
            vo.configure(64, 64, 64, 64, ImgFmt::YUV420P),
            Err(VoError::FormatUnsupported(_))
        ));
        vo.configure(64, 64, 64, 64, ImgFmt::YUYV).unwrap();
        assert_eq!(vo.fourcc(), Some(FourCc::YUY2));
    }

    #[test]
    fn test_reconfigure_resets_slots() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 32, 32, 32, ImgFmt::UYVY).unwrap();
        vo.present().unwrap();
        vo.configure(64, 32, 64, 32, ImgFmt::UYVY).unwrap();
        assert_eq!((vo.current_slot(), vo.visible_slot()), (0, None));
        assert_eq!(vo.backend().live_images(), 2);
        assert_eq!(vo.backend().destroyed.len(), 2);
    }

    #[test]
    fn test_failed_present_keeps_state() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 32, 32, 32, ImgFmt::YUYV).unwrap();
        vo.backend_mut().fail_puts(1);
        assert!(matches!(vo.present(), Err(VoError::DisplayCall(_))));
        assert_eq!((vo.current_slot(), vo.visible_slot()), (0, None));
        vo.present().unwrap();
        assert_eq!(vo.visible_slot(), Some(0));
    }

    #[test]
    fn test_not_configured_is_rejected() {
        let mut vo = presenter(MemoryBackend::new());
        assert!(matches!(vo.present(), Err(VoError::NotConfigured)));
        assert!(matches!(vo.render_into(&test_frame(32, 4)), Err(VoError::NotConfigured)));
    }

    #[test]
    fn test_frame_mismatch_is_config_error() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 4, 32, 4, ImgFmt::YUYV).unwrap();
        assert!(matches!(vo.render_into(&test_frame(32, 4)), Err(VoError::Config(_))));
        vo.configure(32, 4, 32, 4, ImgFmt::YUV420P).unwrap();
        assert!(matches!(vo.render_into(&test_frame(64, 4)), Err(VoError::Config(_))));
    }

    #[test]
    fn test_overlays_are_presented_but_not_in_screenshots() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 8, 32, 8, ImgFmt::YUV420P).unwrap();
        let frame = test_frame(32, 8);
        vo.render_into(&frame).unwrap();

        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(0, 0, 4, 2, [255, 255, 255]));
        assert_eq!(vo.compose_overlay(&osd, 0.0).unwrap(), 1);
        vo.present().unwrap();

        assert_eq!(vo.backend().last_present().unwrap().data[0], 235);
        let shot = vo.screenshot().unwrap().unwrap();
        assert!(same_pixels(&shot, &frame));
    }

    #[test]
    fn test_redraw_restores_and_recomposes() {
        let mut vo = presenter(MemoryBackend::new());
        assert!(matches!(vo.redraw(None), Err(VoError::NotConfigured)));
        vo.configure(32, 8, 32, 8, ImgFmt::YUV420P).unwrap();
        assert!(!vo.redraw(None).unwrap());

        vo.render_into(&test_frame(32, 8)).unwrap();
        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(0, 0, 2, 2, [255, 255, 255]).with_timing(0.0, 1.0));
        vo.compose_overlay(&osd, 0.5).unwrap();
        vo.present().unwrap();
        assert_eq!(vo.backend().last_present().unwrap().data[0], 235);

        // overlay expired: redraw shows the clean frame from the same slot
        osd.vo_pts = 2.0;
        assert!(vo.redraw(Some(&osd)).unwrap());
        let last = vo.backend().last_present().unwrap();
        assert_eq!(last.data[0], 0);
        assert_eq!(vo.visible_slot(), Some(0));
        assert_eq!(vo.current_slot(), 1);
    }

    #[test]
    fn test_failed_redraw_keeps_write_slot() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 8, 32, 8, ImgFmt::YUV420P).unwrap();
        vo.present().unwrap();
        assert_eq!((vo.current_slot(), vo.visible_slot()), (1, Some(0)));

        vo.backend_mut().fail_puts(1);
        assert!(matches!(vo.redraw(None), Err(VoError::DisplayCall(_))));
        assert_eq!((vo.current_slot(), vo.visible_slot()), (1, Some(0)));

        // the next frame goes to the hidden slot, not the one on screen
        let on_screen = vo.backend().last_present().unwrap().data.clone();
        vo.render_into(&test_frame(32, 8)).unwrap();
        vo.present().unwrap();
        assert_eq!(vo.visible_slot(), Some(1));
        assert!(vo.redraw(None).unwrap());
        assert_ne!(vo.backend().last_present().unwrap().data, on_screen);
    }

    #[test]
    fn test_resize_events_recompute_rectangles() {
        let mut vo = presenter(MemoryBackend::new().with_window_size(320, 180));
        vo.configure(64, 36, 64, 36, ImgFmt::YUYV).unwrap();
        assert_eq!(vo.dst_rect(), Rect::new(0, 0, 320, 180));
        assert_eq!(vo.backend().colorkey_draws.len(), 1);

        vo.backend_mut().set_window_size(320, 240);
        assert!(vo.handle_events(&[VoEvent::Resize]));
        assert_eq!(vo.dst_rect(), Rect::new(0, 30, 320, 210));
        assert_eq!(vo.backend().colorkey_draws.len(), 2);

        vo.set_panscan(1.0);
        assert_eq!(vo.dst_rect(), Rect::new(0, 0, 320, 240));
        assert!(vo.src_rect().width() < 64);
    }

    #[test]
    fn test_colorspace_via_bt709_switch() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 8, 32, 8, ImgFmt::YUV420P).unwrap();
        assert_eq!(vo.yuv_colorspace().format, Csp::Bt601);
        vo.set_yuv_colorspace(Csp::Bt709).unwrap();
        assert_eq!(vo.equalizer(BT709_ATTRIBUTE), Some(100));
        assert_eq!(vo.yuv_colorspace().format, Csp::Bt709);
        vo.set_yuv_colorspace(Csp::Bt601).unwrap();
        assert_eq!(vo.yuv_colorspace().format, Csp::Bt601);

        vo.set_equalizer("brightness", 20).unwrap();
        assert_eq!(vo.equalizer("brightness"), Some(20));
        assert!(vo.set_equalizer("sharpness", 1).is_err());
    }

    #[test]
    fn test_pause_flag() {
        let mut vo = presenter(MemoryBackend::new());
        vo.pause();
        assert!(vo.is_paused());
        vo.resume();
        assert!(!vo.is_paused());
    }

    #[test]
    fn test_shared_presenter_across_threads() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 4, 32, 4, ImgFmt::YUV420P).unwrap();
        let shared = vo.into_shared();

        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || {
                let frame = test_frame(32, 4);
                for _ in 0..4 {
                    let mut vo = shared.lock();
                    vo.render_into(&frame).unwrap();
                    vo.present().unwrap();
                }
            })
        };
        worker.join().unwrap();

        let vo = shared.lock();
        assert_eq!(vo.visible_slot(), Some(1));
        assert_eq!(vo.backend().presents.len(), 4);
    }

    #[test]
    fn test_drop_releases_images() {
        let mut vo = presenter(MemoryBackend::new());
        vo.configure(32, 4, 32, 4, ImgFmt::YUV420P).unwrap();
        vo.uninit();
        assert_eq!(vo.backend().live_images(), 0);
        assert_eq!(vo.state(), VoState::Unconfigured);
    }
}
