//! # Surface Pool
//!
//! Two display images, each with pool-owned memory. The presenter renders
//! into slot `current` while slot `visible` stays on screen; only
//! [`SurfacePool::advance`] moves the two apart.

use thiserror::Error;

use crate::backend::{plane_map, BackendError, DisplayBackend, FourCc, SurfaceHandle, SurfaceLayout};
use crate::csp::CspDetails;
use crate::image::{align_up, ImageError, ImageView, FrameBuffer};
use crate::imgfmt::{ImgFmtDesc, MP_MAX_PLANES};

pub const NUM_BUFFERS: usize = 2;

/// Display images are allocated this many pixels wide, at least.
pub const WIDTH_ALIGNMENT: usize = 32;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("display image: {0}")]
    Backend(#[from] BackendError),
    #[error("out of memory allocating {bytes} bytes")]
    Allocation { bytes: usize },
    #[error("slot layout: {0}")]
    Layout(#[from] ImageError),
    #[error("slot {0} is not allocated")]
    NotAllocated(usize),
}

#[derive(Debug)]
struct Slot {
    handle: SurfaceHandle,
    layout: SurfaceLayout,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct SurfacePool {
    slots: [Option<Slot>; NUM_BUFFERS],
    fourcc: Option<FourCc>,
    width: u32,
    height: u32,
    current: usize,
    visible: Option<usize>,
}

impl SurfacePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free any existing slots, then create and clear `NUM_BUFFERS` images.
    pub fn allocate<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
        fourcc: FourCc,
        desc: &ImgFmtDesc,
    ) -> Result<(), SurfaceError> {
        for index in 0..NUM_BUFFERS {
            self.deallocate(backend, index);
        }
        self.current = 0;
        self.visible = None;
        self.fourcc = Some(fourcc);
        self.width = width;
        self.height = height;

        let aligned = align_up(width as usize, WIDTH_ALIGNMENT) as u32;
        for index in 0..NUM_BUFFERS {
            let (handle, layout) = backend.create_image(fourcc, aligned, height)?;
            let mut data = Vec::new();
            if data.try_reserve_exact(layout.data_size).is_err() {
                backend.destroy_image(handle);
                return Err(SurfaceError::Allocation { bytes: layout.data_size });
            }
            data.resize(layout.data_size, 0);
            self.slots[index] = Some(Slot { handle, layout, data });

            let mut view = self.view_sized(index, desc, aligned, height)?;
            view.clear(0, 0, aligned, height);
        }
        tracing::debug!(
            "allocated {} {} images of {}x{} (aligned width {})",
            NUM_BUFFERS,
            fourcc,
            width,
            height,
            aligned
        );
        Ok(())
    }

    /// Release one slot. Freed slots are skipped.
    pub fn deallocate<B: DisplayBackend + ?Sized>(&mut self, backend: &mut B, index: usize) {
        if let Some(slot) = self.slots.get_mut(index).and_then(Option::take) {
            backend.destroy_image(slot.handle);
        }
    }

    pub fn deallocate_all<B: DisplayBackend + ?Sized>(&mut self, backend: &mut B) {
        for index in 0..NUM_BUFFERS {
            self.deallocate(backend, index);
        }
        self.fourcc = None;
        self.visible = None;
        self.current = 0;
    }

    pub fn is_allocated(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Describe slot `index` as an image of the configured size.
    pub fn view_of(
        &mut self,
        index: usize,
        desc: &ImgFmtDesc,
        csp: &CspDetails,
    ) -> Result<ImageView<'_>, SurfaceError> {
        let (w, h) = (self.width, self.height);
        let mut view = self.view_sized(index, desc, w, h)?;
        view.set_colorspace_details(csp);
        Ok(view)
    }

    fn view_sized(
        &mut self,
        index: usize,
        desc: &ImgFmtDesc,
        w: u32,
        h: u32,
    ) -> Result<ImageView<'_>, SurfaceError> {
        let map = plane_map(self.fourcc.unwrap_or(FourCc::new([0; 4])));
        let slot = self
            .slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(SurfaceError::NotAllocated(index))?;
        let mut offsets = [0; MP_MAX_PLANES];
        let mut stride = [0; MP_MAX_PLANES];
        for n in 0..desc.num_planes as usize {
            offsets[n] = slot.layout.offsets[map[n]];
            stride[n] = slot.layout.pitches[map[n]];
        }
        Ok(FrameBuffer::from_parts(*desc, w, h, slot.data.as_mut_slice(), offsets, stride)?)
    }

    pub fn handle(&self, index: usize) -> Option<SurfaceHandle> {
        self.slots.get(index)?.as_ref().map(|s| s.handle)
    }

    pub fn data(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index)?.as_ref().map(|s| s.data.as_slice())
    }

    pub fn fourcc(&self) -> Option<FourCc> {
        self.fourcc
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn visible(&self) -> Option<usize> {
        self.visible
    }

    /// Make `index` the write slot again (redraw of the visible frame).
    pub fn set_current(&mut self, index: usize) {
        self.current = index % NUM_BUFFERS;
    }

    /// The write slot went on screen; move on to the other one.
    pub fn advance(&mut self) {
        self.visible = Some(self.current);
        self.current = (self.current + 1) % NUM_BUFFERS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imgfmt::{imgfmt_desc, ImgFmt};
    use crate::memory_backend::MemoryBackend;

    #[test]
    fn test_allocate_clears_to_black() {
        let mut backend = MemoryBackend::new();
        let mut pool = SurfacePool::new();
        let desc = imgfmt_desc(ImgFmt::YUV420P);
        pool.allocate(&mut backend, 20, 4, FourCc::I420, &desc).unwrap();
        assert!(pool.is_allocated());
        assert_eq!(backend.live_images(), 2);

        let data = pool.data(1).unwrap();
        assert_eq!(data.len(), 32 * 4 + 2 * 16 * 2);
        assert!(data[..128].iter().all(|&b| b == 16));
        assert!(data[128..].iter().all(|&b| b == 128));
    }

    #[test]
    fn test_reallocation_frees_slots_in_order() {
        let mut backend = MemoryBackend::new();
        let mut pool = SurfacePool::new();
        let desc = imgfmt_desc(ImgFmt::YUYV);
        pool.allocate(&mut backend, 32, 2, FourCc::YUY2, &desc).unwrap();
        let first = [pool.handle(0).unwrap(), pool.handle(1).unwrap()];
        pool.advance();
        pool.allocate(&mut backend, 64, 2, FourCc::YUY2, &desc).unwrap();
        assert_eq!(backend.destroyed, first.to_vec());
        assert_eq!((pool.current(), pool.visible()), (0, None));

        pool.deallocate_all(&mut backend);
        pool.deallocate(&mut backend, 0);
        assert_eq!(backend.destroyed.len(), 4);
        assert_eq!(backend.live_images(), 0);
    }

    #[test]
    fn test_yv12_view_swaps_chroma() {
        let mut backend = MemoryBackend::new();
        let mut pool = SurfacePool::new();
        let desc = imgfmt_desc(ImgFmt::YUV420P);
        pool.allocate(&mut backend, 32, 4, FourCc::YV12, &desc).unwrap();
        let view = pool.view_of(0, &desc, &CspDetails::default()).unwrap();
        assert_eq!(view.offset(0), 0);
        assert_eq!(view.offset(1), 32 * 4 + 16 * 2);
        assert_eq!(view.offset(2), 32 * 4);
    }

    #[test]
    fn test_advance_round_robin() {
        let mut pool = SurfacePool::new();
        let mut seen = Vec::new();
        for _ in 0..3 {
            pool.advance();
            seen.push(pool.visible().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 0]);
        assert_eq!(pool.current(), 1);
    }

    #[test]
    fn test_view_of_unallocated_slot_fails() {
        let mut pool = SurfacePool::new();
        let desc = imgfmt_desc(ImgFmt::YUV420P);
        assert!(matches!(
            pool.view_of(0, &desc, &CspDetails::default()),
            Err(SurfaceError::NotAllocated(0))
        ));
    }
}
