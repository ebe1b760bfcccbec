use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use crate::foundation::error::{FramecapError, FramecapResult};

/// Symbolic capture resolution, mapped to the capture card's mode number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureFormat {
    Hd720,
    Hd1080,
}

impl CaptureFormat {
    pub const ALL: [CaptureFormat; 2] = [CaptureFormat::Hd720, CaptureFormat::Hd1080];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
        }
    }

    /// Mode identifier passed to the capture binary with `-m`.
    pub fn mode_id(self) -> u32 {
        match self {
            Self::Hd720 => 13,
            Self::Hd1080 => 14,
        }
    }
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for CaptureFormat {
    type Err = FramecapError;

    fn from_str(s: &str) -> FramecapResult<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| FramecapError::unsupported_format(s))
    }
}

/// External programs and limits used while capturing and converting.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureToolsConfig {
    /// Writes raw frames to a file and prints a running frame count on stdout.
    pub capture_binary: PathBuf,
    /// Invoked as `decoder <raw> <out_dir> <format>`; leaves one image per frame in `out_dir`.
    pub decoder: PathBuf,
    /// `ffmpeg`-compatible encoder.
    pub encoder: PathBuf,
    /// Frame ceiling passed to the capture binary with `-n`.
    pub max_frames: u64,
    pub stop_poll_attempts: u32,
    pub stop_poll_interval_ms: u64,
    /// Worker threads for cropping and renumbering; `None` uses every core.
    pub rewrite_workers: Option<usize>,
}

impl Default for CaptureToolsConfig {
    fn default() -> Self {
        Self {
            capture_binary: PathBuf::from("decklink-capture"),
            decoder: PathBuf::from("decklink-convert.sh"),
            encoder: PathBuf::from("ffmpeg"),
            max_frames: 60 * 60 * 10,
            stop_poll_attempts: 5,
            stop_poll_interval_ms: 100,
            rewrite_workers: None,
        }
    }
}

impl CaptureToolsConfig {
    /// Parse a config from a JSON file on disk. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> FramecapResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FramecapError::validation(format!("open tools config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            FramecapError::validation(format!("parse tools config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> FramecapResult<()> {
        for (name, p) in [
            ("capture_binary", &self.capture_binary),
            ("decoder", &self.decoder),
            ("encoder", &self.encoder),
        ] {
            if p.as_os_str().is_empty() {
                return Err(FramecapError::validation(format!("{name} must not be empty")));
            }
        }
        if self.max_frames == 0 {
            return Err(FramecapError::validation("max_frames must be non-zero"));
        }
        if self.stop_poll_attempts == 0 {
            return Err(FramecapError::validation(
                "stop_poll_attempts must be non-zero",
            ));
        }
        if self.rewrite_workers == Some(0) {
            return Err(FramecapError::validation(
                "rewrite_workers must be non-zero when set",
            ));
        }
        Ok(())
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/config.rs"]
mod tests;
