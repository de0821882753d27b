//! Horizontal mirror filter.

use thiserror::Error;

use crate::image::{FrameBuffer, ImageError, OwnedImage};
use crate::imgfmt::ImgFmt;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("mirror: unsupported format {0}")]
    Unsupported(ImgFmt),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Mirrored copy of `src` in a new image.
pub fn mirror<S: AsRef<[u8]>>(src: &FrameBuffer<S>) -> Result<OwnedImage, FilterError> {
    check_format(src)?;
    let mut dst = OwnedImage::new(src.fmt.id, src.w, src.h)?;
    dst.set_display_size(src.display_w, src.display_h);
    dst.colorspace = src.colorspace;
    dst.levels = src.levels;
    mirror_into(src, &mut dst)?;
    Ok(dst)
}

/// Write the mirror image of `src` into `dst` (same format and size).
pub fn mirror_into<S, D>(src: &FrameBuffer<S>, dst: &mut FrameBuffer<D>) -> Result<(), FilterError>
where
    S: AsRef<[u8]>,
    D: AsRef<[u8]> + AsMut<[u8]>,
{
    check_format(src)?;
    if dst.fmt.id != src.fmt.id {
        return Err(ImageError::FormatMismatch {
            expected: dst.fmt.id,
            got: src.fmt.id,
        }
        .into());
    }
    if (dst.w, dst.h) != (src.w, src.h) {
        return Err(ImageError::SizeMismatch {
            expected: (dst.w, dst.h),
            got: (src.w, src.h),
        }
        .into());
    }

    let fmt = src.fmt.id;
    for plane in 0..src.num_planes() {
        let bytes = src.fmt.bytes[plane] as usize;
        let width = src.plane_width(plane);
        for y in 0..src.plane_height(plane) {
            let s = src.row(plane, y);
            let d = dst.row_mut(plane, y);
            match fmt {
                ImgFmt::UYVY => mirror_macropixels(d, s, width, [0, 3, 2, 1]),
                ImgFmt::YUYV => mirror_macropixels(d, s, width, [2, 1, 0, 3]),
                _ => {
                    for x in 0..width {
                        let from = (width - x - 1) * bytes;
                        d[x * bytes..(x + 1) * bytes].copy_from_slice(&s[from..from + bytes]);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Packed 4:2:2: chroma is shared by two pixels, so mirror whole
/// macropixels and swap the two luma samples inside each.
fn mirror_macropixels(dst: &mut [u8], src: &[u8], width: usize, order: [usize; 4]) {
    let pairs = width / 2;
    for x in 0..pairs {
        let from = (pairs - x - 1) * 4;
        for (i, &o) in order.iter().enumerate() {
            dst[x * 4 + i] = src[from + o];
        }
    }
}

fn check_format<S>(src: &FrameBuffer<S>) -> Result<(), FilterError> {
    let desc = &src.fmt;
    let whole_bytes = (0..desc.num_planes as usize).all(|p| desc.bytes[p] > 0);
    if !desc.is_known() || desc.hwaccel || !desc.byte_aligned || !whole_bytes {
        return Err(FilterError::Unsupported(desc.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_rows_are_reversed() {
        let mut img = OwnedImage::new(ImgFmt::YUV420P, 4, 2).unwrap();
        img.row_mut(0, 0).copy_from_slice(&[1, 2, 3, 4]);
        img.row_mut(1, 0).copy_from_slice(&[10, 20]);
        let out = mirror(&img).unwrap();
        assert_eq!(out.row(0, 0), &[4, 3, 2, 1]);
        assert_eq!(out.row(1, 0), &[20, 10]);
    }

    #[test]
    fn test_rgb_pixels_stay_intact() {
        let mut img = OwnedImage::new(ImgFmt::RGB24, 2, 1).unwrap();
        img.row_mut(0, 0).copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let out = mirror(&img).unwrap();
        assert_eq!(out.row(0, 0), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_interleaved_chroma_pairs_stay_intact() {
        let mut img = OwnedImage::new(ImgFmt::NV12, 4, 2).unwrap();
        img.row_mut(1, 0).copy_from_slice(&[1, 2, 3, 4]);
        let out = mirror(&img).unwrap();
        assert_eq!(out.row(1, 0), &[3, 4, 1, 2]);
    }

    #[test]
    fn test_packed_422_swaps_luma() {
        // U Y0 V Y1 | U Y2 V Y3
        let mut img = OwnedImage::new(ImgFmt::UYVY, 4, 1).unwrap();
        img.row_mut(0, 0).copy_from_slice(&[10, 1, 20, 2, 30, 3, 40, 4]);
        let out = mirror(&img).unwrap();
        assert_eq!(out.row(0, 0), &[30, 4, 40, 3, 10, 2, 20, 1]);

        // Y0 U Y1 V | Y2 U Y3 V
        let mut img = OwnedImage::new(ImgFmt::YUYV, 4, 1).unwrap();
        img.row_mut(0, 0).copy_from_slice(&[1, 10, 2, 20, 3, 30, 4, 40]);
        let out = mirror(&img).unwrap();
        assert_eq!(out.row(0, 0), &[4, 30, 3, 40, 2, 10, 1, 20]);
    }

    #[test]
    fn test_mirroring_twice_is_identity() {
        let mut img = OwnedImage::new(ImgFmt::YUV422P, 6, 3).unwrap();
        for y in 0..3 {
            for (x, b) in img.row_mut(0, y).iter_mut().enumerate() {
                *b = (y * 6 + x) as u8;
            }
        }
        let twice = mirror(&mirror(&img).unwrap()).unwrap();
        for y in 0..3 {
            assert_eq!(twice.row(0, y), img.row(0, y));
        }
    }

    #[test]
    fn test_rejects_mismatch_and_bitstream() {
        let src = OwnedImage::new(ImgFmt::YUV420P, 4, 2).unwrap();
        let mut dst = OwnedImage::new(ImgFmt::YUV420P, 8, 2).unwrap();
        assert!(matches!(
            mirror_into(&src, &mut dst),
            Err(FilterError::Image(ImageError::SizeMismatch { .. }))
        ));

        let mono = OwnedImage::new(ImgFmt::MONO, 16, 1).unwrap();
        assert!(matches!(mirror(&mono), Err(FilterError::Unsupported(ImgFmt::MONO))));
    }
}
