//! Pixel Layout Table
//!
//! Component-level layout facts for every image format: which plane each
//! component lives on, how far apart consecutive samples are, and how many
//! bits each one carries. [`crate::imgfmt`] derives its descriptors from
//! these facts and nothing else, so another layout source (a media library's
//! pixel-format table, for example) can be plugged in through
//! [`LayoutSource`].

use crate::imgfmt::ImgFmt;

/// One color component of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentLayout {
    /// Plane the component is stored on
    pub plane: u8,
    /// Distance between two samples, in bytes (bits for bitstream layouts)
    pub step: u8,
    /// Bits per sample
    pub depth: u8,
}

/// Structural flags of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutFlags {
    pub big_endian: bool,
    pub rgb: bool,
    pub hwaccel: bool,
    /// Pixels are packed at bit granularity
    pub bitstream: bool,
    pub palette: bool,
    pub monochrome: bool,
    /// `None` when the source cannot tell whether alpha is present
    pub alpha: Option<bool>,
}

impl LayoutFlags {
    pub const NONE: LayoutFlags = LayoutFlags {
        big_endian: false,
        rgb: false,
        hwaccel: false,
        bitstream: false,
        palette: false,
        monochrome: false,
        alpha: Some(false),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutFacts {
    pub components: [ComponentLayout; 4],
    pub nb_components: u8,
    pub log2_chroma_w: u8,
    pub log2_chroma_h: u8,
    pub flags: LayoutFlags,
}

impl LayoutFacts {
    pub fn components(&self) -> &[ComponentLayout] {
        let n = (self.nb_components as usize).min(self.components.len());
        &self.components[..n]
    }
}

/// Source of component layouts, keyed by format id.
pub trait LayoutSource: Send + Sync {
    fn lookup_layout(&self, id: ImgFmt) -> Option<LayoutFacts>;
}

// ============================================================================
// Built-in Table
// ============================================================================

/// Layouts for every id in [`ImgFmt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLayouts;

const NO_COMP: ComponentLayout = ComponentLayout { plane: 0, step: 0, depth: 0 };

const fn c(plane: u8, step: u8, depth: u8) -> ComponentLayout {
    ComponentLayout { plane, step, depth }
}

const fn layout(
    components: [ComponentLayout; 4],
    nb_components: u8,
    log2_chroma_w: u8,
    log2_chroma_h: u8,
    flags: LayoutFlags,
) -> LayoutFacts {
    LayoutFacts { components, nb_components, log2_chroma_w, log2_chroma_h, flags }
}

const fn yuv_planar(xs: u8, ys: u8, bits: u8, big_endian: bool) -> LayoutFacts {
    let step = if bits > 8 { 2 } else { 1 };
    layout(
        [c(0, step, bits), c(1, step, bits), c(2, step, bits), NO_COMP],
        3,
        xs,
        ys,
        LayoutFlags { big_endian, ..LayoutFlags::NONE },
    )
}

const fn gray(bits: u8, big_endian: bool) -> LayoutFacts {
    let step = if bits > 8 { 2 } else { 1 };
    layout(
        [c(0, step, bits), NO_COMP, NO_COMP, NO_COMP],
        1,
        0,
        0,
        LayoutFlags { big_endian, ..LayoutFlags::NONE },
    )
}

/// Y0 U Y1 V style packing: luma every 2 bytes, chroma every 4.
const fn packed_422() -> LayoutFacts {
    layout([c(0, 2, 8), c(0, 4, 8), c(0, 4, 8), NO_COMP], 3, 1, 0, LayoutFlags::NONE)
}

const fn semi_planar() -> LayoutFacts {
    layout([c(0, 1, 8), c(1, 2, 8), c(1, 2, 8), NO_COMP], 3, 1, 1, LayoutFlags::NONE)
}

const fn packed_rgb(step: u8, depths: [u8; 3], big_endian: bool) -> LayoutFacts {
    layout(
        [c(0, step, depths[0]), c(0, step, depths[1]), c(0, step, depths[2]), NO_COMP],
        3,
        0,
        0,
        LayoutFlags { big_endian, rgb: true, ..LayoutFlags::NONE },
    )
}

const fn packed_rgba() -> LayoutFacts {
    layout(
        [c(0, 4, 8), c(0, 4, 8), c(0, 4, 8), c(0, 4, 8)],
        4,
        0,
        0,
        LayoutFlags { rgb: true, alpha: Some(true), ..LayoutFlags::NONE },
    )
}

const fn hwaccel() -> LayoutFacts {
    layout(
        [NO_COMP; 4],
        0,
        0,
        0,
        LayoutFlags { hwaccel: true, ..LayoutFlags::NONE },
    )
}

impl LayoutSource for BuiltinLayouts {
    fn lookup_layout(&self, id: ImgFmt) -> Option<LayoutFacts> {
        let facts = match id {
            ImgFmt::YUV444P => yuv_planar(0, 0, 8, false),
            ImgFmt::YUV422P => yuv_planar(1, 0, 8, false),
            ImgFmt::YUV440P => yuv_planar(0, 1, 8, false),
            ImgFmt::YUV420P => yuv_planar(1, 1, 8, false),
            ImgFmt::YUV411P => yuv_planar(2, 0, 8, false),
            ImgFmt::YUV410P => yuv_planar(2, 2, 8, false),

            ImgFmt::YUV444P16_LE => yuv_planar(0, 0, 16, false),
            ImgFmt::YUV444P16_BE => yuv_planar(0, 0, 16, true),
            ImgFmt::YUV444P14_LE => yuv_planar(0, 0, 14, false),
            ImgFmt::YUV444P14_BE => yuv_planar(0, 0, 14, true),
            ImgFmt::YUV444P12_LE => yuv_planar(0, 0, 12, false),
            ImgFmt::YUV444P12_BE => yuv_planar(0, 0, 12, true),
            ImgFmt::YUV444P10_LE => yuv_planar(0, 0, 10, false),
            ImgFmt::YUV444P10_BE => yuv_planar(0, 0, 10, true),
            ImgFmt::YUV444P9_LE => yuv_planar(0, 0, 9, false),
            ImgFmt::YUV444P9_BE => yuv_planar(0, 0, 9, true),

            ImgFmt::YUV422P16_LE => yuv_planar(1, 0, 16, false),
            ImgFmt::YUV422P16_BE => yuv_planar(1, 0, 16, true),
            ImgFmt::YUV422P14_LE => yuv_planar(1, 0, 14, false),
            ImgFmt::YUV422P14_BE => yuv_planar(1, 0, 14, true),
            ImgFmt::YUV422P12_LE => yuv_planar(1, 0, 12, false),
            ImgFmt::YUV422P12_BE => yuv_planar(1, 0, 12, true),
            ImgFmt::YUV422P10_LE => yuv_planar(1, 0, 10, false),
            ImgFmt::YUV422P10_BE => yuv_planar(1, 0, 10, true),
            ImgFmt::YUV422P9_LE => yuv_planar(1, 0, 9, false),
            ImgFmt::YUV422P9_BE => yuv_planar(1, 0, 9, true),

            ImgFmt::YUV420P16_LE => yuv_planar(1, 1, 16, false),
            ImgFmt::YUV420P16_BE => yuv_planar(1, 1, 16, true),
            ImgFmt::YUV420P14_LE => yuv_planar(1, 1, 14, false),
            ImgFmt::YUV420P14_BE => yuv_planar(1, 1, 14, true),
            ImgFmt::YUV420P12_LE => yuv_planar(1, 1, 12, false),
            ImgFmt::YUV420P12_BE => yuv_planar(1, 1, 12, true),
            ImgFmt::YUV420P10_LE => yuv_planar(1, 1, 10, false),
            ImgFmt::YUV420P10_BE => yuv_planar(1, 1, 10, true),
            ImgFmt::YUV420P9_LE => yuv_planar(1, 1, 9, false),
            ImgFmt::YUV420P9_BE => yuv_planar(1, 1, 9, true),

            ImgFmt::YUVA420P => layout(
                [c(0, 1, 8), c(1, 1, 8), c(2, 1, 8), c(3, 1, 8)],
                4,
                1,
                1,
                LayoutFlags { alpha: Some(true), ..LayoutFlags::NONE },
            ),

            ImgFmt::Y8 => gray(8, false),
            ImgFmt::Y16_LE => gray(16, false),
            ImgFmt::Y16_BE => gray(16, true),

            ImgFmt::YUYV | ImgFmt::UYVY => packed_422(),
            ImgFmt::NV12 | ImgFmt::NV21 => semi_planar(),

            ImgFmt::ARGB | ImgFmt::BGRA | ImgFmt::ABGR | ImgFmt::RGBA => packed_rgba(),
            ImgFmt::BGR0 => packed_rgb(4, [8, 8, 8], false),
            ImgFmt::BGR24 | ImgFmt::RGB24 => packed_rgb(3, [8, 8, 8], false),
            ImgFmt::RGB48_LE => packed_rgb(6, [16, 16, 16], false),
            ImgFmt::RGB48_BE => packed_rgb(6, [16, 16, 16], true),

            ImgFmt::RGB8 | ImgFmt::BGR8 => packed_rgb(1, [3, 3, 2], false),
            ImgFmt::RGB4_BYTE | ImgFmt::BGR4_BYTE => packed_rgb(1, [1, 2, 1], false),
            ImgFmt::RGB4 | ImgFmt::BGR4 => layout(
                [c(0, 4, 1), c(0, 4, 2), c(0, 4, 1), NO_COMP],
                3,
                0,
                0,
                LayoutFlags { rgb: true, bitstream: true, ..LayoutFlags::NONE },
            ),
            ImgFmt::MONO => layout(
                [c(0, 1, 1), NO_COMP, NO_COMP, NO_COMP],
                1,
                0,
                0,
                LayoutFlags { bitstream: true, monochrome: true, ..LayoutFlags::NONE },
            ),

            ImgFmt::RGB12_LE | ImgFmt::BGR12_LE => packed_rgb(2, [4, 4, 4], false),
            ImgFmt::RGB12_BE | ImgFmt::BGR12_BE => packed_rgb(2, [4, 4, 4], true),
            ImgFmt::RGB15_LE | ImgFmt::BGR15_LE => packed_rgb(2, [5, 5, 5], false),
            ImgFmt::RGB15_BE | ImgFmt::BGR15_BE => packed_rgb(2, [5, 5, 5], true),
            ImgFmt::RGB16_LE | ImgFmt::BGR16_LE => packed_rgb(2, [5, 6, 5], false),
            ImgFmt::RGB16_BE | ImgFmt::BGR16_BE => packed_rgb(2, [5, 6, 5], true),

            ImgFmt::PAL8 => layout(
                [c(0, 1, 8), NO_COMP, NO_COMP, NO_COMP],
                1,
                0,
                0,
                LayoutFlags { palette: true, ..LayoutFlags::NONE },
            ),

            // components in R, G, B order; G is stored first
            ImgFmt::GBRP => layout(
                [c(2, 1, 8), c(0, 1, 8), c(1, 1, 8), NO_COMP],
                3,
                0,
                0,
                LayoutFlags { rgb: true, ..LayoutFlags::NONE },
            ),

            id if id.is_hwaccel() => hwaccel(),
            _ => return None,
        };
        Some(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_has_a_layout() {
        for id in ImgFmt::all() {
            assert!(BuiltinLayouts.lookup_layout(id).is_some(), "{:?}", id);
        }
        assert!(BuiltinLayouts.lookup_layout(ImgFmt::NONE).is_none());
        assert!(BuiltinLayouts.lookup_layout(ImgFmt::END).is_none());
    }

    #[test]
    fn test_component_slice_respects_count() {
        let facts = BuiltinLayouts.lookup_layout(ImgFmt::Y8).unwrap();
        assert_eq!(facts.components().len(), 1);
        let facts = BuiltinLayouts.lookup_layout(ImgFmt::VDPAU_VC1).unwrap();
        assert!(facts.components().is_empty());
        assert!(facts.flags.hwaccel);
    }
}
