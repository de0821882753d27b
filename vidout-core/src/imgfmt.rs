//! # Image Formats
//!
//! Symbolic pixel format ids, the name table used by options and logs, and
//! the canonical per-format descriptor (`ImgFmtDesc`) every other module uses
//! to reason about planes, subsampling and sample size.
//!
//! Descriptors are never written by hand. They are derived from the
//! lower-level component layout (see [`crate::pixdesc`]) once, when the
//! process-wide [`FormatRegistry`] is first touched.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::pixdesc::{BuiltinLayouts, LayoutFacts, LayoutSource};

/// Maximum number of planes any format may use.
pub const MP_MAX_PLANES: usize = 4;

pub(crate) const HOST_BIG_ENDIAN: bool = cfg!(target_endian = "big");

// ============================================================================
// Format Ids
// ============================================================================

/// Symbolic pixel format identifier.
///
/// `ImgFmt::NONE` (zero) is the "no format" value returned by lookups that
/// fail. Real ids live in `START + 1 .. END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ImgFmt(pub u16);

impl ImgFmt {
    pub const NONE: ImgFmt = ImgFmt(0);

    // Offset keeps ids from being confused with library pixel format numbers
    pub const START: ImgFmt = ImgFmt(1000);

    // Planar YUV
    pub const YUV444P: ImgFmt = ImgFmt(1001); // 1x1
    pub const YUV422P: ImgFmt = ImgFmt(1002); // 2x1
    pub const YUV440P: ImgFmt = ImgFmt(1003); // 1x2
    pub const YUV420P: ImgFmt = ImgFmt(1004); // 2x2
    pub const YUV411P: ImgFmt = ImgFmt(1005); // 4x1
    pub const YUV410P: ImgFmt = ImgFmt(1006); // 4x4

    // Planar YUV with 9-16 bits per sample, stored in 2 bytes with MSBs zero
    pub const YUV444P16_LE: ImgFmt = ImgFmt(1007);
    pub const YUV444P16_BE: ImgFmt = ImgFmt(1008);
    pub const YUV444P14_LE: ImgFmt = ImgFmt(1009);
    pub const YUV444P14_BE: ImgFmt = ImgFmt(1010);
    pub const YUV444P12_LE: ImgFmt = ImgFmt(1011);
    pub const YUV444P12_BE: ImgFmt = ImgFmt(1012);
    pub const YUV444P10_LE: ImgFmt = ImgFmt(1013);
    pub const YUV444P10_BE: ImgFmt = ImgFmt(1014);
    pub const YUV444P9_LE: ImgFmt = ImgFmt(1015);
    pub const YUV444P9_BE: ImgFmt = ImgFmt(1016);

    pub const YUV422P16_LE: ImgFmt = ImgFmt(1017);
    pub const YUV422P16_BE: ImgFmt = ImgFmt(1018);
    pub const YUV422P14_LE: ImgFmt = ImgFmt(1019);
    pub const YUV422P14_BE: ImgFmt = ImgFmt(1020);
    pub const YUV422P12_LE: ImgFmt = ImgFmt(1021);
    pub const YUV422P12_BE: ImgFmt = ImgFmt(1022);
    pub const YUV422P10_LE: ImgFmt = ImgFmt(1023);
    pub const YUV422P10_BE: ImgFmt = ImgFmt(1024);
    pub const YUV422P9_LE: ImgFmt = ImgFmt(1025);
    pub const YUV422P9_BE: ImgFmt = ImgFmt(1026);

    pub const YUV420P16_LE: ImgFmt = ImgFmt(1027);
    pub const YUV420P16_BE: ImgFmt = ImgFmt(1028);
    pub const YUV420P14_LE: ImgFmt = ImgFmt(1029);
    pub const YUV420P14_BE: ImgFmt = ImgFmt(1030);
    pub const YUV420P12_LE: ImgFmt = ImgFmt(1031);
    pub const YUV420P12_BE: ImgFmt = ImgFmt(1032);
    pub const YUV420P10_LE: ImgFmt = ImgFmt(1033);
    pub const YUV420P10_BE: ImgFmt = ImgFmt(1034);
    pub const YUV420P9_LE: ImgFmt = ImgFmt(1035);
    pub const YUV420P9_BE: ImgFmt = ImgFmt(1036);

    // Planar YUV with alpha in plane 3
    pub const YUVA420P: ImgFmt = ImgFmt(1037);

    // Gray
    pub const Y8: ImgFmt = ImgFmt(1038);
    pub const Y16_LE: ImgFmt = ImgFmt(1039);
    pub const Y16_BE: ImgFmt = ImgFmt(1040);

    // Packed YUV, byte accessed
    pub const YUYV: ImgFmt = ImgFmt(1041); // Y0 U  Y1 V
    pub const UYVY: ImgFmt = ImgFmt(1042); // U  Y0 V  Y1

    // Y plane + interleaved chroma plane
    pub const NV12: ImgFmt = ImgFmt(1043);
    pub const NV21: ImgFmt = ImgFmt(1044);

    // RGB, byte accessed (low address to high address)
    pub const ARGB: ImgFmt = ImgFmt(1045);
    pub const BGRA: ImgFmt = ImgFmt(1046);
    pub const BGR0: ImgFmt = ImgFmt(1047);
    pub const ABGR: ImgFmt = ImgFmt(1048);
    pub const RGBA: ImgFmt = ImgFmt(1049);
    pub const BGR24: ImgFmt = ImgFmt(1050);
    pub const RGB24: ImgFmt = ImgFmt(1051);
    pub const RGB48_LE: ImgFmt = ImgFmt(1052);
    pub const RGB48_BE: ImgFmt = ImgFmt(1053);

    // RGB accessed with bit shifts (LSB to MSB)
    pub const RGB8: ImgFmt = ImgFmt(1054); // r3 g3 b2
    pub const BGR8: ImgFmt = ImgFmt(1055);
    pub const RGB4_BYTE: ImgFmt = ImgFmt(1056); // r1 g2 b1, one pixel per byte
    pub const BGR4_BYTE: ImgFmt = ImgFmt(1057);
    pub const RGB4: ImgFmt = ImgFmt(1058); // r1 g2 b1, bit-packed
    pub const BGR4: ImgFmt = ImgFmt(1059);
    pub const MONO: ImgFmt = ImgFmt(1060); // 1 bit per pixel, bit-packed

    // RGB in endian-swapped 16 bit words
    pub const RGB12_LE: ImgFmt = ImgFmt(1061); // 4r 4g 4b 4a
    pub const RGB12_BE: ImgFmt = ImgFmt(1062);
    pub const RGB15_LE: ImgFmt = ImgFmt(1063); // 5r 5g 5b 1a
    pub const RGB15_BE: ImgFmt = ImgFmt(1064);
    pub const RGB16_LE: ImgFmt = ImgFmt(1065); // 5r 6g 5b
    pub const RGB16_BE: ImgFmt = ImgFmt(1066);
    pub const BGR12_LE: ImgFmt = ImgFmt(1067);
    pub const BGR12_BE: ImgFmt = ImgFmt(1068);
    pub const BGR15_LE: ImgFmt = ImgFmt(1069);
    pub const BGR15_BE: ImgFmt = ImgFmt(1070);
    pub const BGR16_LE: ImgFmt = ImgFmt(1071);
    pub const BGR16_BE: ImgFmt = ImgFmt(1072);

    pub const PAL8: ImgFmt = ImgFmt(1073); // palette entries are BGR32

    // Planar RGB, plane 0 is G
    pub const GBRP: ImgFmt = ImgFmt(1074);

    // Hardware decoded surfaces: plane data points at driver structures
    pub const VDPAU_MPEG1: ImgFmt = ImgFmt(1075);
    pub const VDPAU_MPEG2: ImgFmt = ImgFmt(1076);
    pub const VDPAU_H264: ImgFmt = ImgFmt(1077);
    pub const VDPAU_WMV3: ImgFmt = ImgFmt(1078);
    pub const VDPAU_VC1: ImgFmt = ImgFmt(1079);
    pub const VDPAU_MPEG4: ImgFmt = ImgFmt(1080);

    pub const VDPAU_FIRST: ImgFmt = ImgFmt::VDPAU_MPEG1;
    pub const VDPAU_LAST: ImgFmt = ImgFmt::VDPAU_MPEG4;

    pub const END: ImgFmt = ImgFmt(1081);

    // Native endian aliases
    pub const RGB32: ImgFmt = if HOST_BIG_ENDIAN { ImgFmt::ABGR } else { ImgFmt::RGBA };
    pub const BGR32: ImgFmt = if HOST_BIG_ENDIAN { ImgFmt::ARGB } else { ImgFmt::BGRA };

    pub const RGB12: ImgFmt = ne(ImgFmt::RGB12_LE, ImgFmt::RGB12_BE);
    pub const RGB15: ImgFmt = ne(ImgFmt::RGB15_LE, ImgFmt::RGB15_BE);
    pub const RGB16: ImgFmt = ne(ImgFmt::RGB16_LE, ImgFmt::RGB16_BE);
    pub const BGR12: ImgFmt = ne(ImgFmt::BGR12_LE, ImgFmt::BGR12_BE);
    pub const BGR15: ImgFmt = ne(ImgFmt::BGR15_LE, ImgFmt::BGR15_BE);
    pub const BGR16: ImgFmt = ne(ImgFmt::BGR16_LE, ImgFmt::BGR16_BE);
    pub const RGB48: ImgFmt = ne(ImgFmt::RGB48_LE, ImgFmt::RGB48_BE);

    pub const YUV444P16: ImgFmt = ne(ImgFmt::YUV444P16_LE, ImgFmt::YUV444P16_BE);
    pub const YUV444P14: ImgFmt = ne(ImgFmt::YUV444P14_LE, ImgFmt::YUV444P14_BE);
    pub const YUV444P12: ImgFmt = ne(ImgFmt::YUV444P12_LE, ImgFmt::YUV444P12_BE);
    pub const YUV444P10: ImgFmt = ne(ImgFmt::YUV444P10_LE, ImgFmt::YUV444P10_BE);
    pub const YUV444P9: ImgFmt = ne(ImgFmt::YUV444P9_LE, ImgFmt::YUV444P9_BE);

    pub const YUV422P16: ImgFmt = ne(ImgFmt::YUV422P16_LE, ImgFmt::YUV422P16_BE);
    pub const YUV422P14: ImgFmt = ne(ImgFmt::YUV422P14_LE, ImgFmt::YUV422P14_BE);
    pub const YUV422P12: ImgFmt = ne(ImgFmt::YUV422P12_LE, ImgFmt::YUV422P12_BE);
    pub const YUV422P10: ImgFmt = ne(ImgFmt::YUV422P10_LE, ImgFmt::YUV422P10_BE);
    pub const YUV422P9: ImgFmt = ne(ImgFmt::YUV422P9_LE, ImgFmt::YUV422P9_BE);

    pub const YUV420P16: ImgFmt = ne(ImgFmt::YUV420P16_LE, ImgFmt::YUV420P16_BE);
    pub const YUV420P14: ImgFmt = ne(ImgFmt::YUV420P14_LE, ImgFmt::YUV420P14_BE);
    pub const YUV420P12: ImgFmt = ne(ImgFmt::YUV420P12_LE, ImgFmt::YUV420P12_BE);
    pub const YUV420P10: ImgFmt = ne(ImgFmt::YUV420P10_LE, ImgFmt::YUV420P10_BE);
    pub const YUV420P9: ImgFmt = ne(ImgFmt::YUV420P9_LE, ImgFmt::YUV420P9_BE);

    pub const Y16: ImgFmt = ne(ImgFmt::Y16_LE, ImgFmt::Y16_BE);

    /// Every known id, in id order.
    pub fn all() -> impl Iterator<Item = ImgFmt> {
        (ImgFmt::START.0 + 1..ImgFmt::END.0).map(ImgFmt)
    }

    pub fn is_none(self) -> bool {
        self == ImgFmt::NONE
    }

    pub fn is_hwaccel(self) -> bool {
        self >= ImgFmt::VDPAU_FIRST && self <= ImgFmt::VDPAU_LAST
    }

    /// Canonical name, if the id is in the name table.
    pub fn name(self) -> Option<&'static str> {
        imgfmt_to_name(self)
    }
}

const fn ne(le: ImgFmt, be: ImgFmt) -> ImgFmt {
    if HOST_BIG_ENDIAN {
        be
    } else {
        le
    }
}

impl fmt::Display for ImgFmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

impl FromStr for ImgFmt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match imgfmt_from_name(s, false) {
            ImgFmt::NONE => Err(format!("unknown image format '{}'", s)),
            fmt => Ok(fmt),
        }
    }
}

impl Serialize for ImgFmt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u16(self.0),
        }
    }
}

// ============================================================================
// Name Table
// ============================================================================

/// Ordered name table. The first entry for an id is its canonical name.
pub static IMGFMT_NAMES: &[(&str, ImgFmt)] = &[
    ("y8", ImgFmt::Y8),
    ("y16", ImgFmt::Y16),
    ("y16le", ImgFmt::Y16_LE),
    ("y16be", ImgFmt::Y16_BE),
    ("yuyv", ImgFmt::YUYV),
    ("uyvy", ImgFmt::UYVY),
    ("nv12", ImgFmt::NV12),
    ("nv21", ImgFmt::NV21),
    ("444p", ImgFmt::YUV444P),
    ("422p", ImgFmt::YUV422P),
    ("440p", ImgFmt::YUV440P),
    ("420p", ImgFmt::YUV420P),
    ("yv12", ImgFmt::YUV420P), // old alias for UI
    ("411p", ImgFmt::YUV411P),
    ("410p", ImgFmt::YUV410P),
    ("444p16", ImgFmt::YUV444P16),
    ("444p16le", ImgFmt::YUV444P16_LE),
    ("444p16be", ImgFmt::YUV444P16_BE),
    ("444p14", ImgFmt::YUV444P14),
    ("444p14le", ImgFmt::YUV444P14_LE),
    ("444p14be", ImgFmt::YUV444P14_BE),
    ("444p12", ImgFmt::YUV444P12),
    ("444p12le", ImgFmt::YUV444P12_LE),
    ("444p12be", ImgFmt::YUV444P12_BE),
    ("444p10", ImgFmt::YUV444P10),
    ("444p10le", ImgFmt::YUV444P10_LE),
    ("444p10be", ImgFmt::YUV444P10_BE),
    ("444p9", ImgFmt::YUV444P9),
    ("444p9le", ImgFmt::YUV444P9_LE),
    ("444p9be", ImgFmt::YUV444P9_BE),
    ("422p16", ImgFmt::YUV422P16),
    ("422p16le", ImgFmt::YUV422P16_LE),
    ("422p16be", ImgFmt::YUV422P16_BE),
    ("422p14", ImgFmt::YUV422P14),
    ("422p14le", ImgFmt::YUV422P14_LE),
    ("422p14be", ImgFmt::YUV422P14_BE),
    ("422p12", ImgFmt::YUV422P12),
    ("422p12le", ImgFmt::YUV422P12_LE),
    ("422p12be", ImgFmt::YUV422P12_BE),
    ("422p10", ImgFmt::YUV422P10),
    ("422p10le", ImgFmt::YUV422P10_LE),
    ("422p10be", ImgFmt::YUV422P10_BE),
    ("422p9", ImgFmt::YUV422P9),
    ("422p9le", ImgFmt::YUV422P9_LE),
    ("422p9be", ImgFmt::YUV422P9_BE),
    ("420p16", ImgFmt::YUV420P16),
    ("420p16le", ImgFmt::YUV420P16_LE),
    ("420p16be", ImgFmt::YUV420P16_BE),
    ("420p14", ImgFmt::YUV420P14),
    ("420p14le", ImgFmt::YUV420P14_LE),
    ("420p14be", ImgFmt::YUV420P14_BE),
    ("420p12", ImgFmt::YUV420P12),
    ("420p12le", ImgFmt::YUV420P12_LE),
    ("420p12be", ImgFmt::YUV420P12_BE),
    ("420p10", ImgFmt::YUV420P10),
    ("420p10le", ImgFmt::YUV420P10_LE),
    ("420p10be", ImgFmt::YUV420P10_BE),
    ("420p9", ImgFmt::YUV420P9),
    ("420p9le", ImgFmt::YUV420P9_LE),
    ("420p9be", ImgFmt::YUV420P9_BE),
    ("420ap", ImgFmt::YUVA420P),
    ("argb", ImgFmt::ARGB),
    ("bgra", ImgFmt::BGRA),
    ("bgr0", ImgFmt::BGR0),
    ("abgr", ImgFmt::ABGR),
    ("rgba", ImgFmt::RGBA),
    ("rgb32", ImgFmt::RGB32),
    ("bgr32", ImgFmt::BGR32),
    ("bgr24", ImgFmt::BGR24),
    ("rgb24", ImgFmt::RGB24),
    ("rgb48", ImgFmt::RGB48),
    ("rgb48le", ImgFmt::RGB48_LE),
    ("rgb48be", ImgFmt::RGB48_BE),
    ("rgb8", ImgFmt::RGB8),
    ("bgr8", ImgFmt::BGR8),
    ("rgb4_byte", ImgFmt::RGB4_BYTE),
    ("bgr4_byte", ImgFmt::BGR4_BYTE),
    ("rgb4", ImgFmt::RGB4),
    ("bgr4", ImgFmt::BGR4),
    ("mono", ImgFmt::MONO),
    ("rgb12", ImgFmt::RGB12),
    ("rgb12le", ImgFmt::RGB12_LE),
    ("rgb12be", ImgFmt::RGB12_BE),
    ("rgb15", ImgFmt::RGB15),
    ("rgb15le", ImgFmt::RGB15_LE),
    ("rgb15be", ImgFmt::RGB15_BE),
    ("rgb16", ImgFmt::RGB16),
    ("rgb16le", ImgFmt::RGB16_LE),
    ("rgb16be", ImgFmt::RGB16_BE),
    ("bgr12", ImgFmt::BGR12),
    ("bgr12le", ImgFmt::BGR12_LE),
    ("bgr12be", ImgFmt::BGR12_BE),
    ("bgr15", ImgFmt::BGR15),
    ("bgr15le", ImgFmt::BGR15_LE),
    ("bgr15be", ImgFmt::BGR15_BE),
    ("bgr16", ImgFmt::BGR16),
    ("bgr16le", ImgFmt::BGR16_LE),
    ("bgr16be", ImgFmt::BGR16_BE),
    ("pal8", ImgFmt::PAL8),
    ("gbrp", ImgFmt::GBRP),
    ("vdpau_mpeg1", ImgFmt::VDPAU_MPEG1),
    ("vdpau_mpeg2", ImgFmt::VDPAU_MPEG2),
    ("vdpau_h264", ImgFmt::VDPAU_H264),
    ("vdpau_wmv3", ImgFmt::VDPAU_WMV3),
    ("vdpau_vc1", ImgFmt::VDPAU_VC1),
    ("vdpau_mpeg4", ImgFmt::VDPAU_MPEG4),
];

/// Case-insensitive name lookup. Hardware-only formats resolve to
/// `ImgFmt::NONE` unless `allow_hwaccel` is set.
pub fn imgfmt_from_name(name: &str, allow_hwaccel: bool) -> ImgFmt {
    IMGFMT_NAMES
        .iter()
        .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        .map(|&(_, fmt)| {
            if !allow_hwaccel && fmt.is_hwaccel() {
                ImgFmt::NONE
            } else {
                fmt
            }
        })
        .unwrap_or(ImgFmt::NONE)
}

pub fn imgfmt_to_name(fmt: ImgFmt) -> Option<&'static str> {
    IMGFMT_NAMES
        .iter()
        .find(|&&(_, entry)| entry == fmt)
        .map(|&(name, _)| name)
}

// ============================================================================
// Descriptor
// ============================================================================

/// Canonical description of a pixel format.
///
/// A descriptor with `id == ImgFmt::NONE` stands for "unknown format"; every
/// other field is zero/false in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImgFmtDesc {
    pub id: ImgFmt,
    pub name: Option<&'static str>,
    pub num_planes: u8,
    /// Chroma shift (log2 of the chroma pixel size)
    pub chroma_xs: u8,
    pub chroma_ys: u8,
    /// Average bits per pixel over all planes, subsampling included
    pub avg_bpp: u8,
    /// Bytes per pixel, only filled in for byte-aligned formats
    pub bytes: [u8; MP_MAX_PLANES],
    /// Bits per pixel
    pub bpp: [u8; MP_MAX_PLANES],
    /// Bits in use on plane 0
    pub plane_bits: u8,
    /// Per-plane chroma shifts (non-zero only on planes 1 and 2)
    pub xs: [u8; MP_MAX_PLANES],
    pub ys: [u8; MP_MAX_PLANES],
    /// Smallest pixel block a crop or clear may address
    pub align_x: u8,
    pub align_y: u8,

    pub planar: bool,
    pub yuv: bool,
    pub rgb: bool,
    /// Possibly includes alpha (not definitive for packed RGB)
    pub alpha: bool,
    /// All pixels start on byte boundaries
    pub byte_aligned: bool,
    /// Native endian, or <= 8 bits per pixel on plane 0
    pub native_endian: bool,
    /// Standard planar YUV: planar, yuv, same depth on every plane
    pub yuv_planar: bool,
    /// Plane data points at hardware structures, not pixels
    pub hwaccel: bool,
}

impl ImgFmtDesc {
    pub fn is_known(&self) -> bool {
        !self.id.is_none()
    }

    /// Standard planar YUV with 9 to 16 bits per sample.
    pub fn is_yuvp16(&self) -> bool {
        self.yuv_planar && self.plane_bits > 8
    }

    /// Single-plane, non-YUV format (packed RGB family).
    pub fn is_packed_rgb(&self) -> bool {
        self.rgb && !self.hwaccel && self.num_planes == 1 && self.id != ImgFmt::BGR0
    }

    /// Chroma shift and component bits for 3 or 4 plane planar YUV.
    pub fn chroma_shift(&self) -> Option<(u8, u8, u8)> {
        if self.yuv_planar && self.num_planes >= 3 {
            Some((self.chroma_xs, self.chroma_ys, self.plane_bits))
        } else {
            None
        }
    }

    /// Bytes needed for one row of `width` pixels on `plane`.
    pub fn row_bytes(&self, plane: usize, width: usize) -> usize {
        let w = (width + (1 << self.xs[plane]) - 1) >> self.xs[plane];
        (self.bpp[plane] as usize * w + 7) / 8
    }
}

/// Derive the descriptor for `id` from its component layout.
pub fn derive_descriptor(id: ImgFmt, layout: &LayoutFacts) -> ImgFmtDesc {
    let lw = layout.log2_chroma_w;
    let lh = layout.log2_chroma_h;
    let mut desc = ImgFmtDesc {
        id,
        name: imgfmt_to_name(id),
        chroma_xs: lw,
        chroma_ys: lh,
        ..Default::default()
    };

    let mut plane_depth = [0u8; MP_MAX_PLANES];
    let xs = [0, lw, lw, 0];
    let ys = [0, lh, lh, 0];
    let el_size = if layout.flags.bitstream { 1 } else { 8 };
    for comp in layout.components() {
        let p = comp.plane as usize;
        if p >= MP_MAX_PLANES {
            continue;
        }
        // multiple components per plane: the first (luma) one is definitive
        if desc.bpp[p] == 0 {
            desc.bpp[p] = comp.step * el_size;
        }
        plane_depth[p] += comp.depth;
    }

    let avg_bpp16: u32 = (0..MP_MAX_PLANES)
        .map(|p| (16 * desc.bpp[p] as u32) >> xs[p] >> ys[p])
        .sum();
    desc.avg_bpp = (avg_bpp16 / 16) as u8;

    desc.num_planes = desc.bpp.iter().filter(|&&b| b != 0).count() as u8;

    desc.native_endian = desc.bpp[0] <= 8 || layout.flags.big_endian == HOST_BIG_ENDIAN;

    desc.plane_bits = plane_depth[0];

    let flags = &layout.flags;
    if !flags.rgb && !flags.hwaccel && !flags.monochrome && !flags.palette {
        desc.yuv = true;
    } else {
        desc.rgb = true;
    }
    desc.hwaccel = flags.hwaccel;

    desc.alpha = match flags.alpha {
        Some(alpha) => alpha,
        None => desc.num_planes > 3,
    };

    let nb_components = layout.nb_components as usize;
    if desc.num_planes as usize == nb_components {
        desc.planar = true;
    }

    if desc.yuv {
        let n = desc.num_planes as usize;
        let same_depth = (0..n)
            .all(|p| plane_depth[p] == plane_depth[0] && desc.bpp[p] == desc.bpp[0]);
        if same_depth && nb_components == n {
            desc.yuv_planar = true;
        }
    }

    if !flags.hwaccel && !flags.bitstream {
        desc.byte_aligned = true;
        for p in 0..desc.num_planes as usize {
            desc.bytes[p] = desc.bpp[p] / 8;
        }
    }

    for p in 0..desc.num_planes as usize {
        desc.xs[p] = if p == 1 || p == 2 { desc.chroma_xs } else { 0 };
        desc.ys[p] = if p == 1 || p == 2 { desc.chroma_ys } else { 0 };
    }

    desc.align_x = 1 << desc.chroma_xs;
    desc.align_y = 1 << desc.chroma_ys;
    if desc.bpp[0] % 8 != 0 {
        // sub-byte pixels: expect a power of two
        desc.align_x = 8 / desc.bpp[0];
    }

    desc
}

// ============================================================================
// Registry
// ============================================================================

/// Descriptors for every known id, built once from a layout source.
pub struct FormatRegistry {
    descs: Vec<ImgFmtDesc>,
}

static GLOBAL_REGISTRY: Lazy<FormatRegistry> = Lazy::new(|| FormatRegistry::new(&BuiltinLayouts));

impl FormatRegistry {
    pub fn new(source: &dyn LayoutSource) -> Self {
        let descs = ImgFmt::all()
            .map(|id| {
                source
                    .lookup_layout(id)
                    .map(|layout| derive_descriptor(id, &layout))
                    .unwrap_or_default()
            })
            .collect();
        Self { descs }
    }

    /// Process-wide registry over the built-in layout table.
    pub fn global() -> &'static FormatRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn describe(&self, id: ImgFmt) -> ImgFmtDesc {
        let desc = id
            .0
            .checked_sub(ImgFmt::START.0 + 1)
            .and_then(|index| self.descs.get(index as usize))
            .copied()
            .unwrap_or_default();
        if !desc.is_known() {
            tracing::debug!("unknown image format: 0x{:X}", id.0);
        }
        desc
    }

    /// First native-endian standard planar YUV format with this shape.
    pub fn find_planar_yuv(&self, xs: u8, ys: u8, planes: u8, component_bits: u8) -> ImgFmt {
        self.descs
            .iter()
            .find(|desc| {
                desc.is_known()
                    && desc.yuv_planar
                    && desc.num_planes == planes
                    && desc.chroma_xs == xs
                    && desc.chroma_ys == ys
                    && desc.plane_bits == component_bits
                    && desc.native_endian
            })
            .map(|desc| desc.id)
            .unwrap_or(ImgFmt::NONE)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ImgFmtDesc> {
        self.descs.iter().filter(|d| d.is_known())
    }
}

/// Descriptor lookup in the process-wide registry.
pub fn imgfmt_desc(id: ImgFmt) -> ImgFmtDesc {
    FormatRegistry::global().describe(id)
}

pub fn find_planar_yuv(xs: u8, ys: u8, planes: u8, component_bits: u8) -> ImgFmt {
    FormatRegistry::global().find_planar_yuv(xs, ys, planes, component_bits)
}
