//! # vidout Core
//!
//! Pixel format descriptors, frame buffers and a double-buffered video
//! output path for overlay-style displays, plus the config file parser
//! that feeds it.

// ============================================================================
// Pixel Formats
// ============================================================================
pub mod pixdesc;
pub mod imgfmt;
pub mod csp;
pub mod image;

// ============================================================================
// Display Output
// ============================================================================
pub mod backend;
pub mod memory_backend;
pub mod port;
pub mod aspect;
pub mod osd;
pub mod surface;
pub mod presenter;

// ============================================================================
// Filters
// ============================================================================
pub mod mirror;

// ============================================================================
// Configuration
// ============================================================================
pub mod config;

pub use backend::{DisplayBackend, FourCc};
pub use image::{FrameBuffer, ImageView, OwnedImage};
pub use imgfmt::{imgfmt_desc, ImgFmt, ImgFmtDesc};
pub use presenter::{Presenter, PresenterOptions, SharedPresenter, VoError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
