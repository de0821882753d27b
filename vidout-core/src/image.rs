//! # Frame Buffers
//!
//! `FrameBuffer<B>` describes one picture: its format descriptor, size,
//! per-plane offsets and strides into a byte store `B`, and colorspace.
//!
//! The store decides ownership:
//! - `FrameBuffer<&mut [u8]>` is a view into memory someone else allocated
//!   (a surface pool slot), built and dropped within one call
//! - `FrameBuffer<Vec<u8>>` owns its bytes (decoded input, screenshots)
//!
//! Strides may exceed the natural row size; every row-wise operation here
//! honours the stride of each image separately.

use thiserror::Error;

use crate::csp::{Csp, CspDetails, CspLevels};
use crate::imgfmt::{imgfmt_desc, ImgFmt, ImgFmtDesc, HOST_BIG_ENDIAN, MP_MAX_PLANES};

/// Minimum stride alignment of owned images.
pub const MP_STRIDE_ALIGNMENT: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("unknown image format {0}")]
    UnknownFormat(ImgFmt),
    #[error("plane {plane}: stride {stride} is smaller than row size {row}")]
    StrideTooSmall { plane: usize, stride: usize, row: usize },
    #[error("plane {plane} does not fit in a {len} byte buffer")]
    PlaneOutOfBounds { plane: usize, len: usize },
    #[error("format mismatch: expected {expected}, got {got}")]
    FormatMismatch { expected: ImgFmt, got: ImgFmt },
    #[error("size mismatch: expected {expected:?}, got {got:?}")]
    SizeMismatch { expected: (u32, u32), got: (u32, u32) },
}

pub fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

// ============================================================================
// Frame Buffer
// ============================================================================

#[derive(Debug, Clone)]
pub struct FrameBuffer<B> {
    pub fmt: ImgFmtDesc,
    pub w: u32,
    pub h: u32,
    /// Anamorphic display size, zero when unset
    pub display_w: u32,
    pub display_h: u32,
    pub colorspace: Csp,
    pub levels: CspLevels,
    offsets: [usize; MP_MAX_PLANES],
    stride: [usize; MP_MAX_PLANES],
    data: B,
}

/// Borrowed view into memory owned elsewhere.
pub type ImageView<'a> = FrameBuffer<&'a mut [u8]>;

/// Image that owns its pixel memory.
pub type OwnedImage = FrameBuffer<Vec<u8>>;

impl<B> FrameBuffer<B> {
    pub fn num_planes(&self) -> usize {
        self.fmt.num_planes as usize
    }

    pub fn plane_width(&self, plane: usize) -> usize {
        let xs = self.fmt.xs[plane];
        (self.w as usize + (1 << xs) - 1) >> xs
    }

    pub fn plane_height(&self, plane: usize) -> usize {
        let ys = self.fmt.ys[plane];
        (self.h as usize + (1 << ys) - 1) >> ys
    }

    /// Bytes actually covered by pixels in one row of `plane`.
    pub fn row_bytes(&self, plane: usize) -> usize {
        self.fmt.row_bytes(plane, self.w as usize)
    }

    pub fn stride(&self, plane: usize) -> usize {
        self.stride[plane]
    }

    pub fn offset(&self, plane: usize) -> usize {
        self.offsets[plane]
    }

    pub fn set_display_size(&mut self, w: u32, h: u32) {
        self.display_w = w;
        self.display_h = h;
    }

    /// Display size, falling back to the stored size when unset.
    pub fn display_size(&self) -> (u32, u32) {
        if self.display_w != 0 && self.display_h != 0 {
            (self.display_w, self.display_h)
        } else {
            (self.w, self.h)
        }
    }

    pub fn set_colorspace_details(&mut self, csp: &CspDetails) {
        if self.fmt.yuv {
            self.colorspace = csp.format;
            self.levels = csp.levels_in;
        } else {
            self.colorspace = Csp::Rgb;
            self.levels = CspLevels::Pc;
        }
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    fn plane_span(&self, plane: usize) -> usize {
        let height = self.plane_height(plane);
        if height == 0 {
            return 0;
        }
        self.stride[plane] * (height - 1) + self.row_bytes(plane)
    }
}

impl<B: AsRef<[u8]>> FrameBuffer<B> {
    /// Wrap existing memory. Offsets and strides are checked against the
    /// format and the store length.
    pub fn from_parts(
        fmt: ImgFmtDesc,
        w: u32,
        h: u32,
        data: B,
        offsets: [usize; MP_MAX_PLANES],
        stride: [usize; MP_MAX_PLANES],
    ) -> Result<Self, ImageError> {
        if !fmt.is_known() {
            return Err(ImageError::UnknownFormat(fmt.id));
        }
        let image = Self {
            fmt,
            w,
            h,
            display_w: 0,
            display_h: 0,
            colorspace: Csp::Auto,
            levels: CspLevels::Auto,
            offsets,
            stride,
            data,
        };
        let len = image.data.as_ref().len();
        for plane in 0..image.num_planes() {
            let row = image.row_bytes(plane);
            if image.stride[plane] < row {
                return Err(ImageError::StrideTooSmall {
                    plane,
                    stride: image.stride[plane],
                    row,
                });
            }
            if image.offsets[plane] + image.plane_span(plane) > len {
                return Err(ImageError::PlaneOutOfBounds { plane, len });
            }
        }
        Ok(image)
    }

    /// Bytes of `plane` from its first to the end of its last row.
    pub fn plane(&self, plane: usize) -> &[u8] {
        let start = self.offsets[plane];
        &self.data.as_ref()[start..start + self.plane_span(plane)]
    }

    pub fn row(&self, plane: usize, y: usize) -> &[u8] {
        let start = self.offsets[plane] + y * self.stride[plane];
        &self.data.as_ref()[start..start + self.row_bytes(plane)]
    }

    /// Standalone copy with freshly allocated, aligned planes.
    pub fn to_owned_copy(&self) -> OwnedImage {
        let (offsets, stride, size) = aligned_layout(&self.fmt, self.w, self.h);
        let mut copy = OwnedImage {
            fmt: self.fmt,
            w: self.w,
            h: self.h,
            display_w: self.display_w,
            display_h: self.display_h,
            colorspace: self.colorspace,
            levels: self.levels,
            offsets,
            stride,
            data: vec![0u8; size],
        };
        copy.copy_rows_from(self);
        copy
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FrameBuffer<B> {
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        let start = self.offsets[plane];
        let span = self.plane_span(plane);
        &mut self.data.as_mut()[start..start + span]
    }

    pub fn row_mut(&mut self, plane: usize, y: usize) -> &mut [u8] {
        let start = self.offsets[plane] + y * self.stride[plane];
        let len = self.row_bytes(plane);
        &mut self.data.as_mut()[start..start + len]
    }

    /// Copy pixel content from `src`, row by row. Both images must share
    /// format and size; strides may differ.
    pub fn copy_from<S: AsRef<[u8]>>(&mut self, src: &FrameBuffer<S>) -> Result<(), ImageError> {
        if src.fmt.id != self.fmt.id {
            return Err(ImageError::FormatMismatch {
                expected: self.fmt.id,
                got: src.fmt.id,
            });
        }
        if (src.w, src.h) != (self.w, self.h) {
            return Err(ImageError::SizeMismatch {
                expected: (self.w, self.h),
                got: (src.w, src.h),
            });
        }
        self.copy_rows_from(src);
        Ok(())
    }

    fn copy_rows_from<S: AsRef<[u8]>>(&mut self, src: &FrameBuffer<S>) {
        for plane in 0..self.num_planes() {
            for y in 0..self.plane_height(plane) {
                self.row_mut(plane, y).copy_from_slice(src.row(plane, y));
            }
        }
    }

    /// Clear the pixel rectangle `[x0, x1) x [y0, y1)` to black.
    pub fn clear(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        let x1 = x1.min(self.w) as usize;
        let y1 = y1.min(self.h) as usize;
        let (x0, y0) = (x0 as usize, y0 as usize);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        for plane in 0..self.num_planes() {
            let (pattern, pattern_px) = black_pattern(&self.fmt, plane);
            let pattern = &pattern[..];
            let (xs, ys) = (self.fmt.xs[plane], self.fmt.ys[plane]);
            let row_bytes = self.row_bytes(plane);
            let px0 = (x0 >> xs) / pattern_px;
            let px1 = ((x1 + (1 << xs) - 1) >> xs).div_ceil(pattern_px);
            let start = (px0 * pattern.len()).min(row_bytes);
            let end = (px1 * pattern.len()).min(row_bytes);
            let row_start = y0 >> ys;
            let row_end = ((y1 + (1 << ys) - 1) >> ys).min(self.plane_height(plane));
            for y in row_start..row_end {
                let row = &mut self.row_mut(plane, y)[start..end];
                for (i, byte) in row.iter_mut().enumerate() {
                    *byte = pattern[i % pattern.len()];
                }
            }
        }
    }
}

impl OwnedImage {
    /// Allocate a black image with 32-byte aligned strides.
    pub fn new(fmt: ImgFmt, w: u32, h: u32) -> Result<Self, ImageError> {
        let desc = imgfmt_desc(fmt);
        if !desc.is_known() {
            return Err(ImageError::UnknownFormat(fmt));
        }
        let (offsets, stride, size) = aligned_layout(&desc, w, h);
        let mut image = Self::from_parts(desc, w, h, vec![0u8; size], offsets, stride)?;
        image.clear(0, 0, w, h);
        Ok(image)
    }

    pub fn as_view(&mut self) -> ImageView<'_> {
        FrameBuffer {
            fmt: self.fmt,
            w: self.w,
            h: self.h,
            display_w: self.display_w,
            display_h: self.display_h,
            colorspace: self.colorspace,
            levels: self.levels,
            offsets: self.offsets,
            stride: self.stride,
            data: self.data.as_mut_slice(),
        }
    }
}

fn aligned_layout(
    desc: &ImgFmtDesc,
    w: u32,
    h: u32,
) -> ([usize; MP_MAX_PLANES], [usize; MP_MAX_PLANES], usize) {
    let mut offsets = [0; MP_MAX_PLANES];
    let mut stride = [0; MP_MAX_PLANES];
    let mut size = 0;
    for p in 0..desc.num_planes as usize {
        let height = (h as usize + (1 << desc.ys[p]) - 1) >> desc.ys[p];
        offsets[p] = size;
        stride[p] = align_up(desc.row_bytes(p, w as usize), MP_STRIDE_ALIGNMENT);
        size += stride[p] * height;
    }
    (offsets, stride, size)
}

/// Byte pattern for black on `plane`, and how many pixels it covers.
fn black_pattern(desc: &ImgFmtDesc, plane: usize) -> (Vec<u8>, usize) {
    if !desc.yuv || !desc.byte_aligned {
        return (vec![0], 1);
    }
    if desc.id == ImgFmt::YUYV {
        return (vec![16, 128, 16, 128], 2);
    }
    if desc.id == ImgFmt::UYVY {
        return (vec![128, 16, 128, 16], 2);
    }
    if desc.plane_bits > 16 {
        return (vec![0], 1);
    }
    let bits = desc.plane_bits.max(8);
    let value: u16 = match plane {
        0 => 16 << (bits - 8),
        1 | 2 => 128 << (bits - 8),
        _ => 0,
    };
    let bytes = desc.bytes[plane].max(1) as usize;
    let sample_bytes = if desc.plane_bits > 8 { 2 } else { 1 };
    let sample = if sample_bytes == 2 {
        let big_endian = desc.native_endian == HOST_BIG_ENDIAN;
        if big_endian {
            value.to_be_bytes().to_vec()
        } else {
            value.to_le_bytes().to_vec()
        }
    } else {
        vec![value as u8]
    };
    // interleaved chroma (NV12) repeats the sample for each component
    (sample.repeat(bytes / sample_bytes), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_420p_is_black_and_aligned() {
        let img = OwnedImage::new(ImgFmt::YUV420P, 10, 6).unwrap();
        assert_eq!(img.num_planes(), 3);
        assert_eq!(img.stride(0), 32);
        assert_eq!(img.plane_width(1), 5);
        assert_eq!(img.plane_height(2), 3);
        assert!(img.row(0, 5).iter().all(|&b| b == 16));
        assert!(img.row(1, 2).iter().all(|&b| b == 128));
        assert!(img.row(2, 0).iter().all(|&b| b == 128));
    }

    #[test]
    fn test_copy_honours_different_strides() {
        let desc = imgfmt_desc(ImgFmt::Y8);
        let src_data: Vec<u8> = (0..4 * 8).map(|i| i as u8).collect();
        let src = FrameBuffer::from_parts(desc, 4, 4, src_data, [0; 4], [8, 0, 0, 0]).unwrap();

        let mut dst_data = vec![0xAAu8; 4 * 5];
        {
            let mut dst =
                FrameBuffer::from_parts(desc, 4, 4, dst_data.as_mut_slice(), [0; 4], [5, 0, 0, 0])
                    .unwrap();
            dst.copy_from(&src).unwrap();
        }
        assert_eq!(&dst_data[0..5], &[0, 1, 2, 3, 0xAA]);
        assert_eq!(&dst_data[5..10], &[8, 9, 10, 11, 0xAA]);
        assert_eq!(&dst_data[15..20], &[24, 25, 26, 27, 0xAA]);
    }

    #[test]
    fn test_copy_rejects_mismatches() {
        let src = OwnedImage::new(ImgFmt::YUYV, 8, 2).unwrap();
        let mut dst = OwnedImage::new(ImgFmt::UYVY, 8, 2).unwrap();
        assert!(matches!(dst.copy_from(&src), Err(ImageError::FormatMismatch { .. })));
        let mut dst = OwnedImage::new(ImgFmt::YUYV, 8, 4).unwrap();
        assert!(matches!(dst.copy_from(&src), Err(ImageError::SizeMismatch { .. })));
    }

    #[test]
    fn test_from_parts_validates_layout() {
        let desc = imgfmt_desc(ImgFmt::RGB24);
        let err = FrameBuffer::from_parts(desc, 4, 2, vec![0u8; 24], [0; 4], [8, 0, 0, 0]);
        assert_eq!(err.unwrap_err(), ImageError::StrideTooSmall { plane: 0, stride: 8, row: 12 });
        let err = FrameBuffer::from_parts(desc, 4, 2, vec![0u8; 20], [0; 4], [12, 0, 0, 0]);
        assert_eq!(err.unwrap_err(), ImageError::PlaneOutOfBounds { plane: 0, len: 20 });
        let err = FrameBuffer::from_parts(imgfmt_desc(ImgFmt::NONE), 4, 2, vec![0u8; 4], [0; 4], [4; 4]);
        assert!(matches!(err, Err(ImageError::UnknownFormat(_))));
    }

    #[test]
    fn test_clear_packed_and_high_depth() {
        let img = OwnedImage::new(ImgFmt::UYVY, 4, 1).unwrap();
        assert_eq!(img.row(0, 0), &[128, 16, 128, 16, 128, 16, 128, 16]);

        let img = OwnedImage::new(ImgFmt::YUV420P10, 2, 2).unwrap();
        let luma = u16::from_ne_bytes([img.row(0, 0)[0], img.row(0, 0)[1]]);
        let chroma = u16::from_ne_bytes([img.row(1, 0)[0], img.row(1, 0)[1]]);
        assert_eq!((luma, chroma), (64, 512));

        let img = OwnedImage::new(ImgFmt::NV12, 4, 2).unwrap();
        assert_eq!(img.row(1, 0), &[128, 128, 128, 128]);
    }

    #[test]
    fn test_partial_clear_only_touches_rectangle() {
        let mut img = OwnedImage::new(ImgFmt::Y8, 8, 4).unwrap();
        for y in 0..4 {
            img.row_mut(0, y).fill(200);
        }
        img.clear(2, 1, 4, 3);
        assert_eq!(img.row(0, 0), &[200; 8]);
        assert_eq!(img.row(0, 1), &[200, 200, 16, 16, 200, 200, 200, 200]);
        assert_eq!(img.row(0, 3), &[200; 8]);
    }

    #[test]
    fn test_owned_copy_keeps_pixels_and_display_size() {
        let mut img = OwnedImage::new(ImgFmt::RGB24, 3, 2).unwrap();
        img.row_mut(0, 1).copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        img.set_display_size(6, 2);
        let copy = img.to_owned_copy();
        assert_eq!(copy.row(0, 1), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(copy.display_size(), (6, 2));
    }
}
