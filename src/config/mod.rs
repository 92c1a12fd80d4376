//! Service configuration.
//!
//! Settings come from an optional TOML file, overridden by command-line
//! flags. Every field has a default so a missing file or a partial one is
//! valid:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 8080
//! mjpeg_interval_ms = 100
//!
//! [camera]
//! auto_connect = true
//! sdk_paths = ["~/zwo/lib/libASICamera2.so"]
//! bandwidth = 40
//!
//! [defaults]
//! gain = 50
//! photo_exposure = 1000000
//! video_exposure = 100000
//! ```

mod path;

pub use path::{default_config_path, home_dir, resolve_path};

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::device::default_library_paths;
use crate::error::{CamError, Result, ResultExt};
use crate::session::{SessionOptions, SessionTimings};
use crate::settings::{
    DEFAULT_GAIN, DEFAULT_STILL_EXPOSURE_MICROS, DEFAULT_STREAM_EXPOSURE_CAP_MICROS, Settings,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    pub port: u16,
    /// Delay between MJPEG parts.
    pub mjpeg_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            mjpeg_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Open the camera at startup.
    pub auto_connect: bool,
    /// Extra SDK library locations, tried before the platform defaults.
    pub sdk_paths: Vec<PathBuf>,
    /// USB bandwidth-overload percentage.
    pub bandwidth: i64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            auto_connect: true,
            sdk_paths: Vec::new(),
            bandwidth: 40,
        }
    }
}

/// Capture settings in effect at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub gain: i64,
    /// Still exposure in microseconds.
    pub photo_exposure: i64,
    /// Streaming auto-exposure ceiling in microseconds.
    pub video_exposure: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            photo_exposure: DEFAULT_STILL_EXPOSURE_MICROS,
            video_exposure: DEFAULT_STREAM_EXPOSURE_CAP_MICROS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub defaults: DefaultsConfig,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub no_connect: bool,
    /// `--sdk-lib` / `ASI_SDK_LIB`, tried before the configured paths.
    pub sdk_libs: Vec<PathBuf>,
}

impl ServiceConfig {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.settings().validate()?;
        self.bind_addr()?;
        if self.server.mjpeg_interval_ms == 0 {
            return Err(CamError::Config(
                "server.mjpeg_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !(0..=100).contains(&self.camera.bandwidth) {
            return Err(CamError::Config(format!(
                "camera.bandwidth must be a percentage (0-100), got {}",
                self.camera.bandwidth
            )));
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.no_connect {
            self.camera.auto_connect = false;
        }
        if !overrides.sdk_libs.is_empty() {
            let mut paths = overrides.sdk_libs;
            paths.append(&mut self.camera.sdk_paths);
            self.camera.sdk_paths = paths;
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            gain: self.defaults.gain,
            still_exposure_micros: self.defaults.photo_exposure,
            stream_exposure_cap_micros: self.defaults.video_exposure,
        }
    }

    pub fn session_options(&self, timings: SessionTimings) -> SessionOptions {
        SessionOptions {
            settings: self.settings(),
            bandwidth: self.camera.bandwidth,
            timings,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.server.bind.parse().map_err(|e| {
            CamError::Config(format!("Invalid bind address '{}': {e}", self.server.bind))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub const fn mjpeg_interval(&self) -> Duration {
        Duration::from_millis(self.server.mjpeg_interval_ms)
    }

    /// SDK library candidates in discovery order.
    pub fn sdk_candidates(&self) -> Vec<PathBuf> {
        self.camera
            .sdk_paths
            .iter()
            .cloned()
            .chain(default_library_paths())
            .collect()
    }
}

/// Load the configuration file at `path`.
///
/// Relative `sdk_paths` are resolved against the file's directory.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path = path.as_ref();
    info!("Loading configuration file");

    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CamError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        read => read.with_context(|| format!("Failed to read {}", path.display()))?,
    };
    debug!(bytes = content.len(), "Read config file");

    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    load_config_from_str(&content, config_dir)
}

/// Parse TOML configuration, resolving relative paths against `config_dir`.
pub fn load_config_from_str(content: &str, config_dir: &Path) -> Result<ServiceConfig> {
    let mut config: ServiceConfig =
        toml::from_str(content).map_err(|e| CamError::Config(format!("TOML: {e}")))?;

    config.camera.sdk_paths = config
        .camera
        .sdk_paths
        .iter()
        .map(|p| resolve_path(p, config_dir))
        .collect::<Result<_>>()?;

    config.validate()?;
    debug!(?config, "Configuration loaded and validated");
    Ok(config)
}

/// Load `explicit` if given; otherwise the default location if it exists;
/// otherwise built-in defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ServiceConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(&path),
        _ => {
            debug!("No config file, using defaults");
            Ok(ServiceConfig::default())
        }
    }
}
