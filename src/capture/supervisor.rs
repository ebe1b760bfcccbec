use std::{
    io::{BufRead as _, BufReader},
    path::Path,
    process::{Child, ChildStdout, Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
    },
    thread::JoinHandle,
};

use crate::{
    capture::config::{CaptureFormat, CaptureToolsConfig},
    foundation::error::{FramecapError, FramecapResult},
};

/// Lifecycle of the external capture process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Shared view of the frame count reported by the capture process.
///
/// Cloning is cheap; every clone observes the same counter.
#[derive(Clone, Debug, Default)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    fn publish(&self, frames: u64) {
        self.0.store(frames, Ordering::Release);
    }
}

/// Stdout reader thread plus a channel that disconnects when the thread returns.
struct OutputReader {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

/// Runs the capture binary as a child process and tracks how many frames it has written.
///
/// The binary is launched as
/// `<capture_binary> -o -m <mode> -p 0 -n <max_frames> -f <raw_path>` and is expected to print
/// one integer per line on stdout: the number of frames captured so far. On unix it leads its
/// own process group, and stop requests are sent to the whole group.
pub struct CaptureSupervisor {
    tools: CaptureToolsConfig,
    state: SupervisorState,
    child: Option<Child>,
    reader: Option<OutputReader>,
    finished: Arc<AtomicBool>,
    counter: FrameCounter,
}

impl CaptureSupervisor {
    pub fn new(tools: CaptureToolsConfig) -> Self {
        Self {
            tools,
            state: SupervisorState::Idle,
            child: None,
            reader: None,
            finished: Arc::new(AtomicBool::new(false)),
            counter: FrameCounter::default(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Launch the capture binary writing raw frames to `raw_path`.
    ///
    /// Fails with `ProcessControl` when already started or when the binary cannot be spawned.
    /// A failed start leaves the supervisor idle.
    #[tracing::instrument(skip(self), fields(binary = %self.tools.capture_binary.display()))]
    pub fn start(&mut self, raw_path: &Path, format: CaptureFormat) -> FramecapResult<()> {
        if self.state != SupervisorState::Idle {
            return Err(FramecapError::process_control(format!(
                "capture process already started (state {:?})",
                self.state
            )));
        }

        let mut cmd = Command::new(&self.tools.capture_binary);
        cmd.args(["-o", "-m"])
            .arg(format.mode_id().to_string())
            .args(["-p", "0", "-n"])
            .arg(self.tools.max_frames.to_string())
            .arg("-f")
            .arg(raw_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| {
            FramecapError::process_control(format!(
                "failed to spawn capture binary '{}': {e}",
                self.tools.capture_binary.display()
            ))
        })?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(FramecapError::process_control(
                "failed to open capture process stdout (unexpected)",
            ));
        };

        self.finished.store(false, Ordering::Release);
        self.reader = Some(spawn_reader(
            stdout,
            Arc::clone(&self.finished),
            self.counter.clone(),
        ));
        tracing::info!(pid = child.id(), mode = format.mode_id(), "capture process started");
        self.child = Some(child);
        self.state = SupervisorState::Running;
        Ok(())
    }

    /// Last frame count reported by the capture process; 0 until the first line arrives.
    pub fn frame_count(&self) -> u64 {
        self.counter.get()
    }

    pub fn counter(&self) -> FrameCounter {
        self.counter.clone()
    }

    /// Whether the capture process is still alive. Reaps it if it has exited on its own.
    pub fn is_running(&mut self) -> bool {
        if self.state != SupervisorState::Running {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::debug!(%status, "capture process exited");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to poll capture process");
                false
            }
        }
    }

    /// Terminate the capture process, escalating to a kill if it ignores the request.
    ///
    /// Always ends in [`SupervisorState::Stopped`]. Calling it again, or before any start,
    /// only logs a notice.
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) -> FramecapResult<()> {
        match self.state {
            SupervisorState::Idle => {
                tracing::info!("stop requested before the capture process was started");
                self.state = SupervisorState::Stopped;
                return Ok(());
            }
            SupervisorState::Stopped => {
                tracing::info!("capture process already stopped");
                return Ok(());
            }
            SupervisorState::Running | SupervisorState::Stopping => {}
        }

        self.state = SupervisorState::Stopping;
        self.finished.store(true, Ordering::Release);
        if let Some(mut child) = self.child.take() {
            self.terminate(&mut child);
        }
        if let Some(reader) = self.reader.take() {
            self.join_reader(reader);
        }
        self.state = SupervisorState::Stopped;
        tracing::info!(frames = self.frame_count(), "capture process stopped");
        Ok(())
    }

    /// Descendants that outlive the group signal can hold stdout open; the reader is then
    /// detached instead of joined.
    fn join_reader(&self, reader: OutputReader) {
        let grace = self.tools.stop_poll_interval() * self.tools.stop_poll_attempts;
        match reader.done.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    ?grace,
                    "capture output still open after the process exited; detaching reader"
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if reader.handle.join().is_err() {
                    tracing::warn!("capture output reader panicked");
                }
            }
        }
    }

    fn terminate(&self, child: &mut Child) {
        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(%status, "capture process had already exited");
            return;
        }
        request_exit(child);
        let interval = self.tools.stop_poll_interval();
        for attempt in 0..self.tools.stop_poll_attempts {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, attempt, "capture process exited");
                    return;
                }
                Ok(None) => std::thread::sleep(interval),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to poll capture process");
                    break;
                }
            }
        }

        tracing::warn!("capture process still running; killing it");
        force_exit(child);
        if let Err(e) = child.kill() {
            tracing::warn!(error = %e, "failed to kill capture process");
        }
        match child.wait() {
            Ok(status) => tracing::debug!(%status, "capture process reaped"),
            Err(e) => tracing::warn!(error = %e, "failed to reap capture process"),
        }
    }
}

impl Drop for CaptureSupervisor {
    fn drop(&mut self) {
        if matches!(
            self.state,
            SupervisorState::Running | SupervisorState::Stopping
        ) && let Err(e) = self.stop()
        {
            tracing::warn!(error = %e, "failed to stop capture process on drop");
        }
    }
}

fn spawn_reader(
    stdout: ChildStdout,
    finished: Arc<AtomicBool>,
    counter: FrameCounter,
) -> OutputReader {
    let (done_tx, done) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        let _done = done_tx;
        for line in BufReader::new(stdout).lines() {
            if finished.load(Ordering::Acquire) {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::debug!(error = %e, "capture output closed");
                    break;
                }
            };
            match line.trim().parse::<u64>() {
                Ok(frames) => counter.publish(frames),
                Err(_) => tracing::debug!(%line, "ignoring non-numeric capture output"),
            }
        }
    });
    OutputReader { handle, done }
}

/// Send `signal` to the process group led by the child.
#[cfg(unix)]
fn signal_group(child: &Child, signal: &str) {
    let sent = Command::new("kill")
        .arg(signal)
        .arg("--")
        .arg(format!("-{}", child.id()))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match sent {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::debug!(%status, signal, "kill did not succeed"),
        Err(e) => tracing::warn!(error = %e, signal, "failed to run kill"),
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) {
    signal_group(child, "-TERM");
}

#[cfg(unix)]
fn force_exit(child: &mut Child) {
    signal_group(child, "-KILL");
}

#[cfg(not(unix))]
fn force_exit(_child: &mut Child) {}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(error = %e, "failed to terminate capture process");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/supervisor.rs"]
mod tests;
