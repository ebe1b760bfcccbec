use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::{
    capture::{
        config::{CaptureFormat, CaptureToolsConfig},
        convert::{ConversionJob, ConversionReport, ConvertOpts, convert_capture},
        supervisor::{CaptureSupervisor, FrameCounter},
    },
    foundation::{
        core::BoundingBox,
        error::{FramecapError, FramecapResult},
    },
};

const RAW_FILE_NAME: &str = "capture.raw";

/// Where a [`CaptureController`] is in its capture lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    NotStarted,
    Capturing,
    Stopped,
    Converted,
}

/// In-memory state of one capture, from start until it has been converted.
#[derive(Debug)]
struct CaptureSession {
    /// `None` once the raw directory has been detached for inspection.
    raw_dir: Option<TempDir>,
    raw_path: PathBuf,
    output_path: PathBuf,
    format: CaptureFormat,
    started_at: String,
    metadata: Map<String, Value>,
}

/// Drives one capture at a time: start the capture binary, stop it, convert its output.
///
/// ```text
/// NotStarted -> Capturing -> Stopped -> Converted
/// ```
///
/// A failed conversion leaves the controller in `Stopped` with its raw capture on disk, so it
/// can be inspected or converted again with different options.
pub struct CaptureController {
    tools: CaptureToolsConfig,
    state: CaptureState,
    supervisor: Option<CaptureSupervisor>,
    session: Option<CaptureSession>,
    capture_area: Option<BoundingBox>,
}

impl CaptureController {
    pub fn new(tools: CaptureToolsConfig) -> FramecapResult<Self> {
        tools.validate()?;
        Ok(Self {
            tools,
            state: CaptureState::NotStarted,
            supervisor: None,
            session: None,
            capture_area: None,
        })
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn tools(&self) -> &CaptureToolsConfig {
        &self.tools
    }

    /// Crop rectangle to use instead of detecting one from the start marker.
    pub fn set_capture_area(&mut self, area: Option<BoundingBox>) {
        self.capture_area = area;
    }

    /// Raw stream of the current session, if any.
    pub fn raw_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.raw_path.as_path())
    }

    #[tracing::instrument(skip(self, output_path, metadata), fields(output = %output_path.as_ref().display()))]
    pub fn start_capture(
        &mut self,
        output_path: impl AsRef<Path>,
        format: &str,
        metadata: Map<String, Value>,
    ) -> FramecapResult<()> {
        if self.state == CaptureState::Capturing {
            return Err(FramecapError::process_control(
                "a capture is already in progress",
            ));
        }
        let format: CaptureFormat = format.parse()?;
        if self.state == CaptureState::Stopped {
            tracing::warn!("discarding a stopped capture that was never converted");
        }

        let raw_dir = tempfile::Builder::new()
            .prefix("framecap-raw-")
            .tempdir()
            .map_err(|e| {
                FramecapError::process_control(format!("create raw capture directory: {e}"))
            })?;
        let raw_path = raw_dir.path().join(RAW_FILE_NAME);

        let mut supervisor = CaptureSupervisor::new(self.tools.clone());
        supervisor.start(&raw_path, format)?;

        self.session = Some(CaptureSession {
            raw_dir: Some(raw_dir),
            raw_path,
            output_path: output_path.as_ref().to_path_buf(),
            format,
            started_at: capture_timestamp(),
            metadata,
        });
        self.supervisor = Some(supervisor);
        self.state = CaptureState::Capturing;
        tracing::info!("capture started");
        Ok(())
    }

    /// Frames captured so far; 0 when no capture has been started.
    pub fn capture_frame_number(&self) -> u64 {
        self.supervisor
            .as_ref()
            .map(CaptureSupervisor::frame_count)
            .unwrap_or(0)
    }

    /// Handle for polling the frame count from another thread.
    /// Whether the capture binary is still running. False outside [`CaptureState::Capturing`].
    pub fn capture_process_running(&mut self) -> bool {
        self.state == CaptureState::Capturing
            && self
                .supervisor
                .as_mut()
                .is_some_and(CaptureSupervisor::is_running)
    }

    pub fn frame_counter(&self) -> Option<FrameCounter> {
        self.supervisor.as_ref().map(CaptureSupervisor::counter)
    }

    pub fn terminate_capture(&mut self) -> FramecapResult<()> {
        if self.state != CaptureState::Capturing {
            tracing::info!(state = ?self.state, "no capture in progress; nothing to terminate");
            return Ok(());
        }
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.stop()?;
        }
        self.state = CaptureState::Stopped;
        tracing::info!(frames = self.capture_frame_number(), "capture terminated");
        Ok(())
    }

    /// Turn the stopped capture into an archive at the path given to
    /// [`CaptureController::start_capture`].
    pub fn convert_capture(&mut self, opts: ConvertOpts) -> FramecapResult<ConversionReport> {
        if self.state != CaptureState::Stopped {
            return Err(FramecapError::process_control(format!(
                "convert_capture needs a stopped capture (state {:?})",
                self.state
            )));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(FramecapError::process_control("no capture session to convert"));
        };

        let job = ConversionJob {
            raw_path: session.raw_path.clone(),
            output_path: session.output_path.clone(),
            format: session.format,
            capture_date: session.started_at.clone(),
            metadata: session.metadata.clone(),
            capture_area: self.capture_area,
            opts,
        };
        match convert_capture(&job, &self.tools) {
            Ok(report) => {
                self.session = None;
                self.supervisor = None;
                self.state = CaptureState::Converted;
                Ok(report)
            }
            Err(e) => {
                if let Some(dir) = session.raw_dir.take() {
                    let kept = dir.keep();
                    tracing::warn!(raw_dir = %kept.display(), "keeping raw capture after failed conversion");
                }
                Err(e)
            }
        }
    }
}

fn capture_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/capture/controller.rs"]
mod tests;
