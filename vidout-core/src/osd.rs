//! # On-Screen Display
//!
//! Subtitle and OSD bitmaps are alpha masks with one RGB color, placed in
//! image coordinates. They are blended straight into a surface slot, so
//! every region is saved into an [`OsdBackup`] before it is touched. The
//! backup lets a redraw or screenshot get the clean frame back without
//! decoding it again.

use crate::csp::rgb_to_yuv;
use crate::image::FrameBuffer;
use crate::imgfmt::{ImgFmt, ImgFmtDesc};

// ============================================================================
// Bitmaps
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SubBitmap {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    /// Row-major coverage, `w * h` entries
    pub alpha: Vec<u8>,
    pub color: [u8; 3],
    pub start_pts: Option<f64>,
    pub end_pts: Option<f64>,
}

impl SubBitmap {
    /// Opaque rectangle of one color.
    pub fn solid(x: i32, y: i32, w: u32, h: u32, color: [u8; 3]) -> Self {
        Self {
            x,
            y,
            w,
            h,
            alpha: vec![255; (w * h) as usize],
            color,
            start_pts: None,
            end_pts: None,
        }
    }

    pub fn with_timing(mut self, start: f64, end: f64) -> Self {
        self.start_pts = Some(start);
        self.end_pts = Some(end);
        self
    }

    pub fn visible_at(&self, pts: f64) -> bool {
        self.start_pts.map_or(true, |s| pts >= s) && self.end_pts.map_or(true, |e| pts < e)
    }
}

/// Everything currently queued for display on top of the video.
#[derive(Debug, Clone, Default)]
pub struct OsdState {
    pub bitmaps: Vec<SubBitmap>,
    /// Timestamp of the frame being shown
    pub vo_pts: f64,
}

impl OsdState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bitmap: SubBitmap) {
        self.bitmaps.push(bitmap);
    }

    pub fn clear(&mut self) {
        self.bitmaps.clear();
    }

    pub fn visible(&self, pts: f64) -> impl Iterator<Item = &SubBitmap> {
        self.bitmaps.iter().filter(move |b| b.visible_at(pts))
    }
}

// ============================================================================
// Backup
// ============================================================================

#[derive(Debug, Clone)]
struct SavedRegion {
    plane: usize,
    y: usize,
    byte_x: usize,
    rows: Vec<Vec<u8>>,
}

/// Saved pixels of every region overlays were drawn over.
#[derive(Debug, Clone, Default)]
pub struct OsdBackup {
    regions: Vec<SavedRegion>,
}

impl OsdBackup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Forget saved regions; the image content is now the clean frame.
    pub fn reset(&mut self) {
        self.regions.clear();
    }

    /// Save the pixels under `[x0, x1) x [y0, y1)` on every plane.
    pub fn save<B>(&mut self, img: &FrameBuffer<B>, x0: u32, y0: u32, x1: u32, y1: u32)
    where
        B: AsRef<[u8]>,
    {
        let desc = img.fmt;
        let (x0, y0) = align_down(&desc, x0, y0);
        let (x1, y1) = (x1.min(img.w), y1.min(img.h));
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for plane in 0..img.num_planes() {
            let (start, end) = plane_byte_span(img, plane, x0, x1);
            let (ys, ye) = plane_row_span(img, plane, y0, y1);
            let rows = (ys..ye).map(|y| img.row(plane, y)[start..end].to_vec()).collect();
            self.regions.push(SavedRegion {
                plane,
                y: ys,
                byte_x: start,
                rows,
            });
        }
    }

    /// Write saved pixels back, newest region first so overlaps end clean.
    pub fn restore<B>(&self, img: &mut FrameBuffer<B>)
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        for region in self.regions.iter().rev() {
            if region.plane >= img.num_planes() {
                continue;
            }
            for (i, saved) in region.rows.iter().enumerate() {
                let y = region.y + i;
                if y >= img.plane_height(region.plane) {
                    break;
                }
                let row = img.row_mut(region.plane, y);
                let end = (region.byte_x + saved.len()).min(row.len());
                if region.byte_x < end {
                    row[region.byte_x..end].copy_from_slice(&saved[..end - region.byte_x]);
                }
            }
        }
    }
}

fn align_down(desc: &ImgFmtDesc, x: u32, y: u32) -> (u32, u32) {
    let ax = desc.align_x.max(1) as u32;
    let ay = desc.align_y.max(1) as u32;
    (x / ax * ax, y / ay * ay)
}

fn plane_byte_span<B>(img: &FrameBuffer<B>, plane: usize, x0: u32, x1: u32) -> (usize, usize) {
    let xs = img.fmt.xs[plane];
    let bytes = img.fmt.bytes[plane] as usize;
    let px0 = (x0 as usize) >> xs;
    let px1 = (x1 as usize + (1 << xs) - 1) >> xs;
    let row = img.row_bytes(plane);
    ((px0 * bytes).min(row), (px1 * bytes).min(row))
}

fn plane_row_span<B>(img: &FrameBuffer<B>, plane: usize, y0: u32, y1: u32) -> (usize, usize) {
    let ys = img.fmt.ys[plane];
    let start = (y0 as usize) >> ys;
    let end = ((y1 as usize + (1 << ys) - 1) >> ys).min(img.plane_height(plane));
    (start, end)
}

// ============================================================================
// Blending
// ============================================================================

/// Whether overlays can be blended onto images of this format.
pub fn can_blend(desc: &ImgFmtDesc) -> bool {
    (desc.yuv_planar && desc.plane_bits == 8 && desc.num_planes >= 3)
        || desc.id == ImgFmt::YUYV
        || desc.id == ImgFmt::UYVY
}

fn mix(dst: u8, src: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((dst as u32 * (255 - a) + src as u32 * a + 127) / 255) as u8
}

/// Clip a bitmap to the image, in image pixels.
fn clip(bitmap: &SubBitmap, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = bitmap.x.max(0) as i64;
    let y0 = bitmap.y.max(0) as i64;
    let x1 = (bitmap.x as i64 + bitmap.w as i64).min(w as i64);
    let y1 = (bitmap.y as i64 + bitmap.h as i64).min(h as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn blend_bitmap<B>(img: &mut FrameBuffer<B>, bitmap: &SubBitmap, x0: u32, y0: u32, x1: u32, y1: u32)
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    let [cy, cu, cv] = rgb_to_yuv(bitmap.color, img.colorspace);
    let packed = match img.fmt.id {
        ImgFmt::YUYV => Some((0usize, 1usize, 3usize)),
        ImgFmt::UYVY => Some((1, 0, 2)),
        _ => None,
    };
    let (xs, ys) = (img.fmt.chroma_xs, img.fmt.chroma_ys);

    for y in y0..y1 {
        let by = (y as i64 - bitmap.y as i64) as usize;
        for x in x0..x1 {
            let bx = (x as i64 - bitmap.x as i64) as usize;
            let a = bitmap.alpha.get(by * bitmap.w as usize + bx).copied().unwrap_or(0);
            if a == 0 {
                continue;
            }
            let xu = x as usize;
            match packed {
                Some((luma, u_off, v_off)) => {
                    let row = img.row_mut(0, y as usize);
                    let luma_at = xu * 2 + luma;
                    row[luma_at] = mix(row[luma_at], cy, a);
                    let macro_at = xu / 2 * 4;
                    // odd widths end on a half macropixel without chroma
                    if xu % 2 == 0 && macro_at + 3 < row.len() {
                        row[macro_at + u_off] = mix(row[macro_at + u_off], cu, a);
                        row[macro_at + v_off] = mix(row[macro_at + v_off], cv, a);
                    }
                }
                None => {
                    let row = img.row_mut(0, y as usize);
                    row[xu] = mix(row[xu], cy, a);
                    let on_chroma_site = xu % (1 << xs) == 0 && (y as usize) % (1 << ys) == 0;
                    if on_chroma_site {
                        let (cx, cyy) = (xu >> xs, (y as usize) >> ys);
                        let u_row = img.row_mut(1, cyy);
                        u_row[cx] = mix(u_row[cx], cu, a);
                        let v_row = img.row_mut(2, cyy);
                        v_row[cx] = mix(v_row[cx], cv, a);
                    }
                }
            }
        }
    }
}

/// Blend every overlay visible at `pts` onto `img`, saving each touched
/// region into `backup` first. Returns the number of bitmaps drawn.
pub fn draw_on_image_bk<B>(
    osd: &OsdState,
    pts: f64,
    backup: &mut OsdBackup,
    img: &mut FrameBuffer<B>,
) -> usize
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    if !can_blend(&img.fmt) {
        tracing::debug!("cannot blend overlays onto {}", img.fmt.id);
        return 0;
    }
    let mut drawn = 0;
    for bitmap in osd.visible(pts) {
        let Some((x0, y0, x1, y1)) = clip(bitmap, img.w, img.h) else {
            continue;
        };
        backup.save(img, x0, y0, x1, y1);
        blend_bitmap(img, bitmap, x0, y0, x1, y1);
        drawn += 1;
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::OwnedImage;

    fn snapshot(img: &OwnedImage) -> Vec<Vec<u8>> {
        (0..img.num_planes())
            .flat_map(|p| (0..img.plane_height(p)).map(move |y| img.row(p, y).to_vec()))
            .collect()
    }

    #[test]
    fn test_timing_window() {
        let bmp = SubBitmap::solid(0, 0, 1, 1, [255, 255, 255]).with_timing(1.0, 2.0);
        assert!(!bmp.visible_at(0.5));
        assert!(bmp.visible_at(1.0));
        assert!(!bmp.visible_at(2.0));
    }

    #[test]
    fn test_white_box_on_planar_yuv() {
        let mut img = OwnedImage::new(ImgFmt::YUV420P, 8, 8).unwrap();
        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(2, 2, 2, 2, [255, 255, 255]));
        let mut backup = OsdBackup::new();

        let mut view = img.as_view();
        assert_eq!(draw_on_image_bk(&osd, 0.0, &mut backup, &mut view), 1);
        assert_eq!(img.row(0, 2), &[16, 16, 235, 235, 16, 16, 16, 16]);
        assert_eq!(img.row(0, 1), &[16; 8]);
        assert!(!backup.is_empty());
    }

    #[test]
    fn test_restore_returns_clean_frame() {
        let mut img = OwnedImage::new(ImgFmt::YUV420P, 16, 8).unwrap();
        for y in 0..8 {
            img.row_mut(0, y).iter_mut().enumerate().for_each(|(x, b)| *b = (x * 10) as u8);
        }
        let clean = snapshot(&img);

        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(1, 1, 5, 3, [255, 0, 0]));
        osd.add(SubBitmap::solid(3, 2, 6, 5, [0, 0, 255]));
        let mut backup = OsdBackup::new();
        let mut view = img.as_view();
        draw_on_image_bk(&osd, 0.0, &mut backup, &mut view);
        assert_ne!(snapshot(&img), clean);

        let mut view = img.as_view();
        backup.restore(&mut view);
        assert_eq!(snapshot(&img), clean);
    }

    #[test]
    fn test_packed_blend_and_restore() {
        let mut img = OwnedImage::new(ImgFmt::UYVY, 4, 2).unwrap();
        let clean = snapshot(&img);
        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(1, 0, 1, 1, [255, 255, 255]));
        let mut backup = OsdBackup::new();
        let mut view = img.as_view();
        draw_on_image_bk(&osd, 0.0, &mut backup, &mut view);
        assert_eq!(img.row(0, 0), &[128, 16, 128, 235, 128, 16, 128, 16]);

        let mut view = img.as_view();
        backup.restore(&mut view);
        assert_eq!(snapshot(&img), clean);
    }

    #[test]
    fn test_packed_odd_width_right_edge() {
        let mut img = OwnedImage::new(ImgFmt::YUYV, 33, 2).unwrap();
        let clean = snapshot(&img);
        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(32, 0, 1, 2, [255, 255, 255]));
        let mut backup = OsdBackup::new();
        let mut view = img.as_view();
        assert_eq!(draw_on_image_bk(&osd, 0.0, &mut backup, &mut view), 1);
        assert_eq!(img.row(0, 0).len(), 66);
        assert_eq!(&img.row(0, 0)[64..], &[235, 128]);
        assert_eq!(&img.row(0, 1)[62..], &[16, 128, 235, 128]);

        let mut view = img.as_view();
        backup.restore(&mut view);
        assert_eq!(snapshot(&img), clean);
    }

    #[test]
    fn test_offscreen_and_unsupported_are_skipped() {
        let mut osd = OsdState::new();
        osd.add(SubBitmap::solid(-10, -10, 4, 4, [255, 255, 255]));
        let mut backup = OsdBackup::new();

        let mut img = OwnedImage::new(ImgFmt::YUV420P, 8, 8).unwrap();
        assert_eq!(draw_on_image_bk(&osd, 0.0, &mut backup, &mut img.as_view()), 0);

        osd.add(SubBitmap::solid(0, 0, 4, 4, [255, 255, 255]));
        let mut rgb = OwnedImage::new(ImgFmt::RGB24, 8, 8).unwrap();
        assert_eq!(draw_on_image_bk(&osd, 0.0, &mut backup, &mut rgb.as_view()), 0);
        assert!(backup.is_empty());
    }
}
