//! In-memory display backend.
//!
//! Keeps every presented image in a list instead of scaling it onto a
//! window. The player uses it for headless runs and the tests use it to
//! inspect what reached the display.

use std::collections::{HashMap, HashSet};

use crate::aspect::Rect;
use crate::backend::{
    AdaptorInfo, BackendError, BackendFormat, DisplayBackend, FourCc, SurfaceHandle, SurfaceLayout,
};

/// One completed `put_image` call.
#[derive(Debug, Clone)]
pub struct PresentRecord {
    pub handle: SurfaceHandle,
    pub fourcc: FourCc,
    pub src: Rect,
    pub dst: Rect,
    /// Copy of the image memory at present time
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct MemoryImage {
    fourcc: FourCc,
    layout: SurfaceLayout,
}

#[derive(Debug)]
pub struct MemoryBackend {
    formats: Vec<BackendFormat>,
    max_image_size: Option<(u32, u32)>,
    adaptors: Vec<AdaptorInfo>,
    busy_ports: HashSet<u32>,
    grabbed_port: Option<u32>,
    window: (u32, u32),
    images: HashMap<u32, MemoryImage>,
    next_handle: u32,
    failing_puts: usize,
    equalizers: HashMap<String, i32>,
    pub presents: Vec<PresentRecord>,
    pub colorkey_draws: Vec<(Rect, u32)>,
    pub flushes: usize,
    pub destroyed: Vec<SurfaceHandle>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend advertising every fourcc of the format table, one adaptor
    /// with a single port and a 640x480 window.
    pub fn new() -> Self {
        let formats = [FourCc::YV12, FourCc::I420, FourCc::YUY2, FourCc::UYVY]
            .into_iter()
            .map(|fourcc| BackendFormat {
                fourcc,
                packed: matches!(fourcc, FourCc::YUY2 | FourCc::UYVY),
            })
            .collect();
        let equalizers = ["brightness", "contrast", "hue", "saturation", "bt_709"]
            .into_iter()
            .map(|name| (name.to_string(), if name == "bt_709" { -100 } else { 0 }))
            .collect();
        Self {
            formats,
            max_image_size: None,
            adaptors: vec![AdaptorInfo {
                name: "memory".to_string(),
                base_port: 1,
                num_ports: 1,
                input: true,
                image: true,
            }],
            busy_ports: HashSet::new(),
            grabbed_port: None,
            window: (640, 480),
            images: HashMap::new(),
            next_handle: 1,
            failing_puts: 0,
            equalizers,
            presents: Vec::new(),
            colorkey_draws: Vec::new(),
            flushes: 0,
            destroyed: Vec::new(),
        }
    }

    pub fn with_formats(mut self, fourccs: &[FourCc]) -> Self {
        self.formats = fourccs
            .iter()
            .map(|&fourcc| BackendFormat {
                fourcc,
                packed: matches!(fourcc, FourCc::YUY2 | FourCc::UYVY),
            })
            .collect();
        self
    }

    pub fn with_max_image_size(mut self, w: u32, h: u32) -> Self {
        self.max_image_size = Some((w, h));
        self
    }

    pub fn with_window_size(mut self, w: u32, h: u32) -> Self {
        self.window = (w, h);
        self
    }

    pub fn with_adaptors(mut self, adaptors: Vec<AdaptorInfo>) -> Self {
        self.adaptors = adaptors;
        self
    }

    pub fn with_busy_port(mut self, port: u32) -> Self {
        self.busy_ports.insert(port);
        self
    }

    pub fn set_window_size(&mut self, w: u32, h: u32) {
        self.window = (w, h);
    }

    /// Make the next `count` put-image calls fail.
    pub fn fail_puts(&mut self, count: usize) {
        self.failing_puts = count;
    }

    pub fn grabbed_port(&self) -> Option<u32> {
        self.grabbed_port
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn last_present(&self) -> Option<&PresentRecord> {
        self.presents.last()
    }
}

impl DisplayBackend for MemoryBackend {
    fn list_formats(&self) -> Vec<BackendFormat> {
        self.formats.clone()
    }

    fn max_image_size(&self) -> Option<(u32, u32)> {
        self.max_image_size
    }

    fn adaptors(&self) -> Vec<AdaptorInfo> {
        self.adaptors.clone()
    }

    fn grab_port(&mut self, port: u32) -> Result<(), BackendError> {
        if self.busy_ports.contains(&port) {
            return Err(BackendError::PortBusy(port));
        }
        self.grabbed_port = Some(port);
        Ok(())
    }

    fn create_image(
        &mut self,
        fourcc: FourCc,
        width: u32,
        height: u32,
    ) -> Result<(SurfaceHandle, SurfaceLayout), BackendError> {
        if !self.formats.iter().any(|f| f.fourcc == fourcc) {
            return Err(BackendError::UnsupportedFormat(fourcc));
        }
        let layout = SurfaceLayout::for_fourcc(fourcc, width, height)
            .ok_or(BackendError::UnsupportedFormat(fourcc))?;
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        self.images.insert(handle.0, MemoryImage { fourcc, layout });
        tracing::debug!("memory backend: image {:?} {}x{} {}", handle, width, height, fourcc);
        Ok((handle, layout))
    }

    fn destroy_image(&mut self, handle: SurfaceHandle) {
        if self.images.remove(&handle.0).is_some() {
            self.destroyed.push(handle);
        }
    }

    fn put_image(
        &mut self,
        handle: SurfaceHandle,
        data: &[u8],
        src: Rect,
        dst: Rect,
    ) -> Result<(), BackendError> {
        let image = self
            .images
            .get(&handle.0)
            .ok_or(BackendError::NoSuchImage(handle))?;
        if self.failing_puts > 0 {
            self.failing_puts -= 1;
            return Err(BackendError::Call("injected put failure".to_string()));
        }
        let size = image.layout.data_size.min(data.len());
        self.presents.push(PresentRecord {
            handle,
            fourcc: image.fourcc,
            src,
            dst,
            data: data[..size].to_vec(),
        });
        Ok(())
    }

    fn window_size(&self) -> (u32, u32) {
        self.window
    }

    fn draw_colorkey(&mut self, dst: Rect, colorkey: u32) {
        self.colorkey_draws.push((dst, colorkey));
    }

    fn get_equalizer(&self, name: &str) -> Option<i32> {
        self.equalizers.get(name).copied()
    }

    fn set_equalizer(&mut self, name: &str, value: i32) -> Result<(), BackendError> {
        match self.equalizers.get_mut(name) {
            Some(slot) => {
                *slot = value.clamp(-100, 100);
                Ok(())
            }
            None => Err(BackendError::UnknownAttribute(name.to_string())),
        }
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_are_created_and_destroyed_once() {
        let mut backend = MemoryBackend::new();
        let (handle, layout) = backend.create_image(FourCc::YUY2, 32, 2).unwrap();
        assert_eq!(layout.data_size, 128);
        assert_eq!(backend.live_images(), 1);
        backend.destroy_image(handle);
        backend.destroy_image(handle);
        assert_eq!(backend.destroyed, vec![handle]);
    }

    #[test]
    fn test_unsupported_fourcc_is_rejected() {
        let mut backend = MemoryBackend::new().with_formats(&[FourCc::I420]);
        assert!(matches!(
            backend.create_image(FourCc::YV12, 32, 2),
            Err(BackendError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_injected_failures_then_success() {
        let mut backend = MemoryBackend::new();
        let (handle, layout) = backend.create_image(FourCc::I420, 32, 2).unwrap();
        let data = vec![7u8; layout.data_size];
        backend.fail_puts(1);
        let rect = Rect::from_size(32, 2);
        assert!(backend.put_image(handle, &data, rect, rect).is_err());
        assert!(backend.put_image(handle, &data, rect, rect).is_ok());
        assert_eq!(backend.presents.len(), 1);
        assert_eq!(backend.last_present().unwrap().data, data);
    }

    #[test]
    fn test_equalizer_values_are_clamped() {
        let mut backend = MemoryBackend::new();
        backend.set_equalizer("bt_709", 250).unwrap();
        assert_eq!(backend.get_equalizer("bt_709"), Some(100));
        assert!(backend.set_equalizer("gamma", 0).is_err());
    }
}
