//! # vidout Player
//!
//! Headless player: synthesizes test frames on a decode thread and pushes
//! them through the double-buffered presenter onto the in-memory display.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use vidout_core::config::{parse_file, ConfigFile, ConfigFileError};
use vidout_core::imgfmt::FormatRegistry;
use vidout_core::memory_backend::MemoryBackend;
use vidout_core::mirror::mirror;
use vidout_core::osd::{OsdState, SubBitmap};
use vidout_core::port::XvOptions;
use vidout_core::presenter::{PresenterOptions, VoError, VoEvent};
use vidout_core::{ImgFmt, OwnedImage, Presenter, SharedPresenter};

const DEFAULT_CONFIG: &str = "vidout.conf";

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct PlayerOptions {
    vo: String,
    format: ImgFmt,
    width: u32,
    height: u32,
    frames: u32,
    mirror: bool,
    osd: bool,
    panscan: f64,
    max_width: Option<u32>,
    max_height: Option<u32>,
    profile: Option<String>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            vo: "xv".to_string(),
            format: ImgFmt::YUV420P,
            width: 640,
            height: 360,
            frames: 30,
            mirror: false,
            osd: true,
            panscan: 0.0,
            max_width: None,
            max_height: None,
            profile: None,
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => bail!("expected yes or no, got '{}'", value),
    }
}

impl PlayerOptions {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "vo" => self.vo = value.to_string(),
            "format" => self.format = value.parse().map_err(anyhow::Error::msg)?,
            "width" => self.width = value.parse().context("width")?,
            "height" => self.height = value.parse().context("height")?,
            "frames" => self.frames = value.parse().context("frames")?,
            "mirror" => self.mirror = parse_flag(value)?,
            "osd" => self.osd = parse_flag(value)?,
            "panscan" => self.panscan = value.parse().context("panscan")?,
            "max-width" => self.max_width = Some(value.parse().context("max-width")?),
            "max-height" => self.max_height = Some(value.parse().context("max-height")?),
            "profile" => self.profile = Some(value.to_string()),
            _ => tracing::warn!("unknown option '{}'", key),
        }
        Ok(())
    }

    /// Top-level config values, then the selected profile on top.
    fn apply_config(&mut self, config: &ConfigFile, cli_profile: Option<&str>) -> Result<()> {
        for option in &config.options {
            self.set(&option.key, &option.value)
                .with_context(|| format!("config option {}", option.key))?;
        }
        let profile = cli_profile.map(str::to_string).or_else(|| self.profile.clone());
        if let Some(name) = profile {
            let Some(profile) = config.profile(&name) else {
                bail!("unknown profile '{}'", name);
            };
            tracing::info!("applying profile {} ({})", name, profile.desc.as_deref().unwrap_or("-"));
            for option in &profile.options {
                self.set(&option.key, &option.value)
                    .with_context(|| format!("profile {} option {}", name, option.key))?;
            }
            self.profile = Some(name);
        }
        Ok(())
    }

    fn xv_options(&self) -> Result<XvOptions> {
        let (name, subopts) = self.vo.split_once(':').unwrap_or((self.vo.as_str(), ""));
        if name != "xv" {
            bail!("unsupported video output '{}'", name);
        }
        Ok(XvOptions::parse(subopts)?)
    }
}

struct Args {
    config: PathBuf,
    profile: Option<String>,
    overrides: Vec<(String, String)>,
    dump_config: bool,
    list_formats: bool,
}

impl Args {
    fn from_args(args: &[String]) -> Result<Self> {
        let mut parsed = Args {
            config: PathBuf::from(DEFAULT_CONFIG),
            profile: None,
            overrides: Vec::new(),
            dump_config: false,
            list_formats: false,
        };
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--dump-config" => parsed.dump_config = true,
                "--list-formats" => parsed.list_formats = true,
                "--config" => {
                    let path = iter.next().context("--config needs a path")?;
                    parsed.config = PathBuf::from(path);
                }
                "--profile" => {
                    parsed.profile = Some(iter.next().context("--profile needs a name")?.clone());
                }
                other => {
                    let option = other.trim_start_matches("--");
                    let Some((key, value)) = option.split_once('=') else {
                        bail!("expected key=value, got '{}'", other);
                    };
                    parsed.overrides.push((key.to_string(), value.to_string()));
                }
            }
        }
        Ok(parsed)
    }
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    match parse_file(path, 0) {
        Ok(config) => {
            if !config.errors.is_empty() {
                tracing::warn!("{}: {} bad lines skipped", path.display(), config.errors.len());
            }
            Ok(config)
        }
        Err(ConfigFileError::NotFound(_)) => {
            tracing::debug!("no config file at {}, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", path.display())),
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Moving diagonal gradient with constant chroma.
fn synth_frame(format: ImgFmt, width: u32, height: u32, index: u32) -> Result<OwnedImage> {
    let mut frame = OwnedImage::new(format, width, height)?;
    let luma = |x: usize, y: usize| (16 + (x + y + index as usize * 4) % 220) as u8;
    match format {
        ImgFmt::YUYV | ImgFmt::UYVY => {
            let (y_off, u_off, v_off) = if format == ImgFmt::YUYV { (0, 1, 3) } else { (1, 0, 2) };
            for y in 0..height as usize {
                let row = frame.row_mut(0, y);
                for (m, px) in row.chunks_exact_mut(4).enumerate() {
                    px[y_off] = luma(m * 2, y);
                    px[y_off + 2] = luma(m * 2 + 1, y);
                    px[u_off] = 96;
                    px[v_off] = 160;
                }
            }
        }
        _ if frame.fmt.yuv_planar && frame.fmt.plane_bits == 8 => {
            for y in 0..height as usize {
                for (x, b) in frame.row_mut(0, y).iter_mut().enumerate() {
                    *b = luma(x, y);
                }
            }
            for plane in 1..frame.num_planes().min(3) {
                let value = if plane == 1 { 96 } else { 160 };
                for y in 0..frame.plane_height(plane) {
                    frame.row_mut(plane, y).fill(value);
                }
            }
        }
        _ => bail!("cannot synthesize {} frames", format),
    }
    Ok(frame)
}

fn frame_osd(index: u32, pts: f64, width: u32) -> OsdState {
    let mut osd = OsdState::new();
    osd.vo_pts = pts;
    let progress = (index * 8) % width.max(8);
    osd.add(SubBitmap::solid(progress as i32, 8, 8, 8, [255, 255, 255]));
    osd
}

// ============================================================================
// Playback
// ============================================================================

#[derive(Debug, Default, Serialize)]
struct PlaybackStats {
    presented: u32,
    dropped: u32,
}

fn decode_thread(
    shared: SharedPresenter<MemoryBackend>,
    opts: PlayerOptions,
) -> thread::JoinHandle<Result<PlaybackStats>> {
    thread::spawn(move || {
        let mut stats = PlaybackStats::default();
        for index in 0..opts.frames {
            let mut frame = synth_frame(opts.format, opts.width, opts.height, index)?;
            if opts.mirror {
                frame = mirror(&frame)?;
            }
            let pts = index as f64 / 30.0;

            let mut vo = shared.lock();
            vo.render_into(&frame)?;
            if opts.osd {
                vo.compose_overlay(&frame_osd(index, pts, opts.width), pts)?;
            }
            match vo.present() {
                Ok(()) => stats.presented += 1,
                Err(VoError::DisplayCall(_)) => stats.dropped += 1,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(stats)
    })
}

fn run(opts: PlayerOptions) -> Result<()> {
    let mut backend = MemoryBackend::new();
    if let (Some(w), Some(h)) = (opts.max_width, opts.max_height) {
        backend = backend.with_max_image_size(w, h);
    }
    let presenter_opts = PresenterOptions {
        xv: opts.xv_options()?,
        panscan: opts.panscan,
        ..Default::default()
    };
    let mut presenter =
        Presenter::new(backend, presenter_opts).context("initializing video output")?;
    tracing::info!("video output on port {}", presenter.port());

    presenter
        .configure(opts.width, opts.height, opts.width, opts.height, opts.format)
        .context("configuring video output")?;

    let shared = presenter.into_shared();
    let stats = decode_thread(Arc::clone(&shared), opts.clone())
        .join()
        .map_err(|_| anyhow::anyhow!("decode thread panicked"))??;

    let mut vo = shared.lock();
    vo.backend_mut().set_window_size(800, 600);
    if vo.handle_events(&[VoEvent::Resize]) {
        vo.redraw(None)?;
    }
    if let Some(shot) = vo.screenshot()? {
        tracing::info!(
            "screenshot {}x{} (display {:?})",
            shot.w,
            shot.h,
            shot.display_size()
        );
    }
    tracing::info!(
        "presented {} frames, dropped {}, visible slot {:?}",
        stats.presented,
        stats.dropped,
        vo.visible_slot()
    );
    Ok(())
}

fn list_formats() {
    for desc in FormatRegistry::global().descriptors() {
        println!(
            "{:<12} planes={} bpp={} yuv={} rgb={} alpha={}",
            desc.id, desc.num_planes, desc.avg_bpp, desc.yuv, desc.rgb, desc.alpha
        );
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let args = Args::from_args(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter("vidout=info,vidout_core=info")
        .init();

    tracing::info!("vidout v{}", vidout_core::VERSION);

    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = load_config(&args.config)?;
    let mut opts = PlayerOptions::default();
    opts.apply_config(&config, args.profile.as_deref())?;
    for (key, value) in &args.overrides {
        opts.set(key, value).with_context(|| format!("option --{}", key))?;
    }

    if args.dump_config {
        #[derive(Serialize)]
        struct Dump<'a> {
            options: &'a PlayerOptions,
            config: &'a ConfigFile,
        }
        let dump = Dump {
            options: &opts,
            config: &config,
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    run(opts)
}
