//! Overlay port selection and colorkey handling.
//!
//! Suboption syntax is `port=<n>:adaptor=<n>:ck=<src>:ck-method=<m>`.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{AdaptorInfo, DisplayBackend};

/// Colorkey painted when no other value is known (green).
pub const DEFAULT_COLORKEY: u32 = 0x0000_ff00;

/// Backend attribute holding the colorkey.
pub const COLORKEY_ATTRIBUTE: &str = "colorkey";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("invalid suboption value {key}={value}")]
    InvalidValue { key: String, value: String },
    #[error("unknown suboption: {0}")]
    UnknownOption(String),
    #[error("suboption {0} needs a value")]
    MissingValue(String),
    #[error("no free overlay port ({busy} busy), another process may be using it")]
    NoFreePort { busy: u32 },
    #[error("no overlay support available")]
    NoXvSupport,
}

/// Where the colorkey value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CkSource {
    /// Use our value without telling the display
    Use,
    /// Set our value on the display
    Set,
    /// Read the display's current value
    #[default]
    Cur,
}

/// How the colorkey area gets painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CkMethod {
    None,
    /// Window background color
    Background,
    /// Filled by us on every resize
    #[default]
    Manual,
    /// Painted by the display itself
    Auto,
}

impl FromStr for CkSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "use" => Ok(CkSource::Use),
            "set" => Ok(CkSource::Set),
            "cur" => Ok(CkSource::Cur),
            _ => Err(()),
        }
    }
}

impl FromStr for CkMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CkMethod::None),
            "bg" => Ok(CkMethod::Background),
            "man" => Ok(CkMethod::Manual),
            "auto" => Ok(CkMethod::Auto),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct XvOptions {
    pub port: Option<u32>,
    pub adaptor: Option<u32>,
    pub ck: CkSource,
    pub ck_method: CkMethod,
}

impl XvOptions {
    pub fn parse(suboptions: &str) -> Result<Self, PortError> {
        let mut opts = XvOptions::default();
        for item in suboptions.split(':').filter(|s| !s.is_empty()) {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| PortError::MissingValue(item.to_string()))?;
            let invalid = || PortError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            };
            match key {
                "port" => {
                    let port: u32 = value.parse().map_err(|_| invalid())?;
                    if port == 0 {
                        return Err(invalid());
                    }
                    opts.port = Some(port);
                }
                "adaptor" => opts.adaptor = Some(value.parse().map_err(|_| invalid())?),
                "ck" => opts.ck = value.parse().map_err(|_| invalid())?,
                "ck-method" => opts.ck_method = value.parse().map_err(|_| invalid())?,
                _ => return Err(PortError::UnknownOption(key.to_string())),
            }
        }
        Ok(opts)
    }
}

fn usable(adaptor: &AdaptorInfo) -> bool {
    adaptor.input && adaptor.image
}

/// Find and grab an overlay port.
pub fn select_port<B: DisplayBackend + ?Sized>(
    backend: &mut B,
    opts: &XvOptions,
) -> Result<u32, PortError> {
    let adaptors = backend.adaptors();

    if let Some(port) = opts.port {
        let found = adaptors
            .iter()
            .filter(|a| usable(a))
            .any(|a| (a.base_port..a.base_port + a.num_ports).contains(&port));
        if found {
            match backend.grab_port(port) {
                Ok(()) => {
                    tracing::info!("using overlay port {}", port);
                    return Ok(port);
                }
                Err(e) => tracing::debug!("requested port {} unavailable: {}", port, e),
            }
        } else {
            tracing::warn!("invalid port parameter {}, choosing a port automatically", port);
        }
    }

    let mut busy = 0;
    for (i, adaptor) in adaptors.iter().enumerate() {
        if opts.adaptor.is_some_and(|want| want as usize != i) {
            continue;
        }
        if !usable(adaptor) {
            continue;
        }
        for port in adaptor.base_port..adaptor.base_port + adaptor.num_ports {
            match backend.grab_port(port) {
                Ok(()) => {
                    tracing::info!("using overlay adaptor #{} ({}) port {}", i, adaptor.name, port);
                    return Ok(port);
                }
                Err(_) => {
                    tracing::warn!("could not grab port {}", port);
                    busy += 1;
                }
            }
        }
    }

    if busy > 0 {
        Err(PortError::NoFreePort { busy })
    } else {
        Err(PortError::NoXvSupport)
    }
}

/// Resolve the colorkey to paint, `None` when colorkeying is off.
pub fn init_colorkey<B: DisplayBackend + ?Sized>(backend: &mut B, opts: &XvOptions) -> Option<u32> {
    if opts.ck_method == CkMethod::None {
        return None;
    }
    let colorkey = match opts.ck {
        CkSource::Cur => backend
            .get_equalizer(COLORKEY_ATTRIBUTE)
            .map(|v| v as u32)
            .unwrap_or(DEFAULT_COLORKEY),
        CkSource::Use => DEFAULT_COLORKEY,
        CkSource::Set => {
            if let Err(e) = backend.set_equalizer(COLORKEY_ATTRIBUTE, DEFAULT_COLORKEY as i32) {
                tracing::warn!("could not set colorkey: {}", e);
            }
            DEFAULT_COLORKEY
        }
    };
    tracing::debug!("colorkey 0x{:06x} ({:?}, {:?})", colorkey, opts.ck, opts.ck_method);
    Some(colorkey)
}
