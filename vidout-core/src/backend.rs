//! # Display Backend Contract
//!
//! Everything the presenter needs from a display subsystem: format
//! negotiation, image allocation, the present call and a few attributes.
//! Hardware overlay APIs (Xv and friends) and the in-memory backend used
//! by tests and the player both implement [`DisplayBackend`].

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::aspect::Rect;
use crate::imgfmt::{ImgFmt, MP_MAX_PLANES};

// ============================================================================
// FourCc
// ============================================================================

/// Four-character code naming a pixel layout at the display boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const YV12: FourCc = FourCc(*b"YV12");
    pub const I420: FourCc = FourCc(*b"I420");
    pub const YUY2: FourCc = FourCc(*b"YUY2");
    pub const UYVY: FourCc = FourCc(*b"UYVY");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Little-endian u32 encoding, as display APIs expect it.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<u32> for FourCc {
    fn from(value: u32) -> Self {
        Self(value.to_le_bytes())
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "0x{:08x}", self.to_u32()),
        }
    }
}

impl FromStr for FourCc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err("fourcc must be four ASCII bytes".into());
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(FourCc(arr))
    }
}

impl Serialize for FourCc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Format Tables
// ============================================================================

/// Canonical format to display fourcc, in order of preference.
pub static FMT_TABLE: &[(ImgFmt, FourCc)] = &[
    (ImgFmt::YUV420P, FourCc::YV12),
    (ImgFmt::YUV420P, FourCc::I420),
    (ImgFmt::YUYV, FourCc::YUY2),
    (ImgFmt::UYVY, FourCc::UYVY),
];

/// Fourccs whose planes are stored in a different order than the canonical
/// format. `plane_map[n]` is the stored plane holding canonical plane `n`.
#[derive(Debug, Clone, Copy)]
pub struct PlaneQuirk {
    pub fourcc: FourCc,
    pub plane_map: [usize; MP_MAX_PLANES],
}

pub static PLANE_QUIRKS: &[PlaneQuirk] = &[PlaneQuirk {
    // V before U
    fourcc: FourCc::YV12,
    plane_map: [0, 2, 1, 3],
}];

const IDENTITY_PLANES: [usize; MP_MAX_PLANES] = [0, 1, 2, 3];

pub fn plane_map(fourcc: FourCc) -> [usize; MP_MAX_PLANES] {
    PLANE_QUIRKS
        .iter()
        .find(|q| q.fourcc == fourcc)
        .map(|q| q.plane_map)
        .unwrap_or(IDENTITY_PLANES)
}

/// Canonical format stored in a display image of this fourcc.
pub fn imgfmt_for_fourcc(fourcc: FourCc) -> Option<ImgFmt> {
    FMT_TABLE
        .iter()
        .find(|(_, fcc)| *fcc == fourcc)
        .map(|(fmt, _)| *fmt)
}

/// First fourcc in [`FMT_TABLE`] for `fmt` that the backend advertises.
pub fn negotiate_fourcc(fmt: ImgFmt, formats: &[BackendFormat]) -> Option<FourCc> {
    FMT_TABLE
        .iter()
        .filter(|(canonical, _)| *canonical == fmt)
        .map(|(_, fourcc)| *fourcc)
        .find(|fourcc| formats.iter().any(|f| f.fourcc == *fourcc))
}

// ============================================================================
// Backend Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendFormat {
    pub fourcc: FourCc,
    pub packed: bool,
}

/// Memory layout of one display image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceLayout {
    pub data_size: usize,
    pub num_planes: usize,
    pub offsets: [usize; MP_MAX_PLANES],
    pub pitches: [usize; MP_MAX_PLANES],
}

impl SurfaceLayout {
    /// Tightly packed layout the way overlay drivers report it.
    pub fn for_fourcc(fourcc: FourCc, width: u32, height: u32) -> Option<Self> {
        let (w, h) = (width as usize, height as usize);
        let mut layout = SurfaceLayout::default();
        match fourcc {
            FourCc::YV12 | FourCc::I420 => {
                let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
                layout.num_planes = 3;
                layout.pitches = [w, cw, cw, 0];
                layout.offsets = [0, w * h, w * h + cw * ch, 0];
                layout.data_size = w * h + 2 * cw * ch;
            }
            FourCc::YUY2 | FourCc::UYVY => {
                layout.num_planes = 1;
                layout.pitches[0] = w * 2;
                layout.data_size = w * 2 * h;
            }
            _ => return None,
        }
        Some(layout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u32);

/// One adaptor with a contiguous port range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdaptorInfo {
    pub name: String,
    pub base_port: u32,
    pub num_ports: u32,
    pub input: bool,
    pub image: bool,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("format {0} not supported by display")]
    UnsupportedFormat(FourCc),
    #[error("port {0} is busy")]
    PortBusy(u32),
    #[error("no such image: {0:?}")]
    NoSuchImage(SurfaceHandle),
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("display call failed: {0}")]
    Call(String),
}

/// Display subsystem capability.
pub trait DisplayBackend: Send {
    /// Formats the display accepts as (fourcc, packed) pairs
    fn list_formats(&self) -> Vec<BackendFormat>;

    /// Largest image the display scales, if it reports one
    fn max_image_size(&self) -> Option<(u32, u32)>;

    fn adaptors(&self) -> Vec<AdaptorInfo>;

    fn grab_port(&mut self, port: u32) -> Result<(), BackendError>;

    /// Create an image; the caller provides memory of `data_size` bytes
    fn create_image(
        &mut self,
        fourcc: FourCc,
        width: u32,
        height: u32,
    ) -> Result<(SurfaceHandle, SurfaceLayout), BackendError>;

    fn destroy_image(&mut self, handle: SurfaceHandle);

    /// Scale `src` of the image onto `dst` of the window
    fn put_image(
        &mut self,
        handle: SurfaceHandle,
        data: &[u8],
        src: Rect,
        dst: Rect,
    ) -> Result<(), BackendError>;

    fn window_size(&self) -> (u32, u32);

    fn draw_colorkey(&mut self, dst: Rect, colorkey: u32);

    fn get_equalizer(&self, name: &str) -> Option<i32>;

    fn set_equalizer(&mut self, name: &str, value: i32) -> Result<(), BackendError>;

    fn flush(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_display_and_parse() {
        assert_eq!(FourCc::YV12.to_string(), "YV12");
        assert_eq!("UYVY".parse::<FourCc>().unwrap(), FourCc::UYVY);
        assert!("UYV".parse::<FourCc>().is_err());
        assert_eq!(FourCc::from(FourCc::I420.to_u32()), FourCc::I420);
    }

    #[test]
    fn test_yv12_swaps_chroma_planes() {
        assert_eq!(plane_map(FourCc::YV12), [0, 2, 1, 3]);
        assert_eq!(plane_map(FourCc::I420), [0, 1, 2, 3]);
    }

    #[test]
    fn test_negotiation_follows_table_order() {
        let formats = [
            BackendFormat { fourcc: FourCc::I420, packed: false },
            BackendFormat { fourcc: FourCc::YV12, packed: false },
        ];
        assert_eq!(negotiate_fourcc(ImgFmt::YUV420P, &formats), Some(FourCc::YV12));
        assert_eq!(negotiate_fourcc(ImgFmt::YUV420P, &formats[..1]), Some(FourCc::I420));
        assert_eq!(negotiate_fourcc(ImgFmt::YUYV, &formats), None);
        assert_eq!(imgfmt_for_fourcc(FourCc::YUY2), Some(ImgFmt::YUYV));
    }

    #[test]
    fn test_reference_layouts() {
        let planar = SurfaceLayout::for_fourcc(FourCc::I420, 32, 4).unwrap();
        assert_eq!(planar.offsets, [0, 128, 160, 0]);
        assert_eq!(planar.pitches, [32, 16, 16, 0]);
        assert_eq!(planar.data_size, 192);

        let packed = SurfaceLayout::for_fourcc(FourCc::YUY2, 64, 2).unwrap();
        assert_eq!((packed.num_planes, packed.pitches[0], packed.data_size), (1, 128, 256));
        assert!(SurfaceLayout::for_fourcc(FourCc::new(*b"RGB3"), 8, 8).is_none());
    }
}
