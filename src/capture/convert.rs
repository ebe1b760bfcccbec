//! Raw capture stream to capture archive.
//!
//! Conversion decodes the raw stream into stills, finds the on-screen start and end markers,
//! crops and renumbers the frames in between, optionally encodes a preview video, and writes
//! everything into a fresh archive.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;
use image::RgbImage;
use serde_json::{Map, Value};
use tempfile::TempDir;

use crate::{
    analysis::square::{CAPTURE_END_COLOR, CAPTURE_START_COLOR, find_biggest_square},
    archive::{metadata::CaptureMetadata, writer::ArchiveWriter},
    capture::config::{CaptureFormat, CaptureToolsConfig},
    foundation::{
        core::{BoundingBox, FRAME_RATE, build_thread_pool, run_batch},
        error::{FramecapError, FramecapResult},
    },
};

/// Caller overrides for [`convert_capture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertOpts {
    /// First frame of interest (1-based into the decoded stills). Detected from the start
    /// marker when unset.
    pub start_frame: Option<usize>,
    /// Last frame of interest. Detected from the end marker when unset.
    pub end_frame: Option<usize>,
    /// Encode `movie.webm` into the archive.
    pub create_video: bool,
}

impl Default for ConvertOpts {
    fn default() -> Self {
        Self {
            start_frame: None,
            end_frame: None,
            create_video: true,
        }
    }
}

/// Everything needed to turn one raw capture into an archive.
#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub raw_path: PathBuf,
    pub output_path: PathBuf,
    pub format: CaptureFormat,
    /// ISO-8601 capture start time.
    pub capture_date: String,
    /// Extra metadata fields, merged over the generated ones.
    pub metadata: Map<String, Value>,
    /// Known crop rectangle. Skips crop detection.
    pub capture_area: Option<BoundingBox>,
    pub opts: ConvertOpts,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    /// Number of stills the decoder produced.
    pub decoded_frames: usize,
    pub start_frame: usize,
    pub end_frame: usize,
    /// Exclusive upper bound of decoded stills copied after the start frame.
    pub last_frame: usize,
    /// Stills written to the archive, including the leading frame 0.
    pub written_frames: usize,
    pub capture_area: Option<BoundingBox>,
    pub frame_dimensions: (u32, u32),
    pub has_video: bool,
}

/// Run the whole conversion.
///
/// Scratch directories are removed when conversion succeeds and left in place (and logged)
/// when it fails.
#[tracing::instrument(skip_all, fields(raw = %job.raw_path.display(), out = %job.output_path.display()))]
pub fn convert_capture(
    job: &ConversionJob,
    tools: &CaptureToolsConfig,
) -> FramecapResult<ConversionReport> {
    let decode_dir = scratch_dir("framecap-decode-")?;
    let rewrite_dir = scratch_dir("framecap-frames-")?;

    match run_conversion(job, tools, decode_dir.path(), rewrite_dir.path()) {
        Ok(report) => {
            tracing::info!(
                frames = report.written_frames,
                start = report.start_frame,
                end = report.end_frame,
                "capture converted"
            );
            Ok(report)
        }
        Err(e) => {
            let decode = decode_dir.keep();
            let rewrite = rewrite_dir.keep();
            tracing::warn!(
                error = %e,
                decode_dir = %decode.display(),
                rewrite_dir = %rewrite.display(),
                "conversion failed; keeping scratch directories"
            );
            Err(e)
        }
    }
}

fn scratch_dir(prefix: &str) -> FramecapResult<TempDir> {
    Ok(tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .context("create conversion scratch directory")?)
}

fn run_conversion(
    job: &ConversionJob,
    tools: &CaptureToolsConfig,
    decode_dir: &Path,
    rewrite_dir: &Path,
) -> FramecapResult<ConversionReport> {
    decode_raw(tools, &job.raw_path, decode_dir, job.format)?;
    let files = list_frames(decode_dir)?;
    let n = files.len();
    if n == 0 {
        return Err(FramecapError::conversion("decoder produced no frames"));
    }
    let full_dims = image::image_dimensions(&files[0])
        .with_context(|| format!("read dimensions of '{}'", files[0].display()))?;

    let mut start_frame = job.opts.start_frame;
    let mut capture_area = job.capture_area;
    if (start_frame.is_none() || capture_area.is_none())
        && let Some((edge, area)) = find_start_edge(&files)?
    {
        start_frame = start_frame.or(Some(edge));
        capture_area = capture_area.or(Some(area));
    }
    let start_frame = start_frame.unwrap_or(1);
    if start_frame == 0 || start_frame > n {
        return Err(FramecapError::validation(format!(
            "start frame {start_frame} is outside 1..={n}"
        )));
    }

    let end_frame = match job.opts.end_frame {
        Some(end) => end,
        None => find_end_edge(&files)?.unwrap_or(n),
    };
    let last_frame = (n - 1).min(end_frame.saturating_add(2));
    tracing::debug!(start_frame, end_frame, last_frame, ?capture_area, "capture bounds");

    let crop = capture_area.and_then(|area| usable_crop(area, full_dims));
    let frame_dimensions = crop.map(|c| (c.width(), c.height())).unwrap_or(full_dims);

    // Frame 0 is the still just before the start; with start 1 it duplicates the first still.
    let mut plan: Vec<(usize, &Path)> = vec![(0, files[start_frame - 1].as_path())];
    plan.extend(
        (start_frame..last_frame)
            .enumerate()
            .map(|(k, j)| (k + 1, files[j].as_path())),
    );

    let pool = build_thread_pool(tools.rewrite_workers)?;
    run_batch(&pool, &plan, |&(index, src)| {
        rewrite_frame(src, &rewrite_dir.join(format!("{index}.png")), crop)
    })?;

    let video = if job.opts.create_video {
        Some(encode_video(tools, rewrite_dir)?)
    } else {
        None
    };

    let metadata =
        CaptureMetadata::new(job.capture_date.clone(), frame_dimensions).merged_with(&job.metadata)?;
    let mut writer = ArchiveWriter::create(&job.output_path)?;
    writer.write_metadata(&metadata)?;
    if let Some(bytes) = &video {
        writer.write_video(bytes)?;
    }
    for (index, _) in &plan {
        let path = rewrite_dir.join(format!("{index}.png"));
        let png = std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;
        writer.write_frame_png(*index, &png)?;
    }
    let output_path = writer.finish()?;

    Ok(ConversionReport {
        output_path,
        decoded_frames: n,
        start_frame,
        end_frame,
        last_frame,
        written_frames: plan.len(),
        capture_area: crop,
        frame_dimensions,
        has_video: video.is_some(),
    })
}

fn decode_raw(
    tools: &CaptureToolsConfig,
    raw: &Path,
    out_dir: &Path,
    format: CaptureFormat,
) -> FramecapResult<()> {
    tracing::debug!(decoder = %tools.decoder.display(), "decoding raw capture");
    let output = Command::new(&tools.decoder)
        .arg(raw)
        .arg(out_dir)
        .arg(format.name())
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            FramecapError::conversion(format!(
                "failed to run decoder '{}': {e}",
                tools.decoder.display()
            ))
        })?;
    if !output.status.success() {
        return Err(FramecapError::conversion(format!(
            "decoder exited with status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn list_frames(dir: &Path) -> FramecapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
        let entry = entry.with_context(|| format!("list '{}'", dir.display()))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort_by_cached_key(|p| natural_key(&p.file_name().unwrap_or_default().to_string_lossy()));
    Ok(files)
}

/// One run of a natural sort key. Numbers order before text at the same position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalChunk {
    Number(u64),
    Text(String),
}

/// Split `name` into alternating text and digit runs so that `frame2` sorts before `frame10`.
pub fn natural_key(name: &str) -> Vec<NaturalChunk> {
    let mut chunks = Vec::new();
    let mut rest = name;
    while let Some(c) = rest.chars().next() {
        let is_digit = c.is_ascii_digit();
        let end = rest
            .find(|ch: char| ch.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        chunks.push(if is_digit {
            NaturalChunk::Number(run.parse().unwrap_or(u64::MAX))
        } else {
            NaturalChunk::Text(run.to_string())
        });
        rest = tail;
    }
    chunks
}

fn load_rgb(path: &Path) -> FramecapResult<RgbImage> {
    Ok(image::open(path)
        .with_context(|| format!("decode '{}'", path.display()))?
        .to_rgb8())
}

/// First `i >= 1` where the start marker is on still `i - 1` and gone from still `i`, with the
/// marker box seen on `i - 1`.
fn find_start_edge(files: &[PathBuf]) -> FramecapResult<Option<(usize, BoundingBox)>> {
    let mut prev = None;
    for (i, path) in files.iter().enumerate() {
        let square = find_biggest_square(CAPTURE_START_COLOR, &load_rgb(path)?);
        if let (Some(area), None) = (prev, square) {
            tracing::debug!(frame = i, ?area, "start marker disappeared");
            return Ok(Some((i, area)));
        }
        prev = square;
    }
    Ok(None)
}

/// Scanning backward from the last still, the first `i` where the end marker is on still
/// `i + 1` and absent from still `i`.
fn find_end_edge(files: &[PathBuf]) -> FramecapResult<Option<usize>> {
    let mut next_has_marker = None;
    for i in (1..files.len()).rev() {
        let has_marker = find_biggest_square(CAPTURE_END_COLOR, &load_rgb(&files[i])?).is_some();
        if next_has_marker == Some(true) && !has_marker {
            tracing::debug!(frame = i, "end marker appears after this frame");
            return Ok(Some(i));
        }
        next_has_marker = Some(has_marker);
    }
    Ok(None)
}

fn usable_crop(area: BoundingBox, (w, h): (u32, u32)) -> Option<BoundingBox> {
    match area.clip_to(w, h).filter(|a| !a.is_degenerate()) {
        Some(crop) => Some(crop),
        None => {
            tracing::warn!(?area, width = w, height = h, "capture area is empty; not cropping");
            None
        }
    }
}

fn rewrite_frame(src: &Path, dst: &Path, crop: Option<BoundingBox>) -> FramecapResult<()> {
    let img = load_rgb(src)?;
    let img = match crop {
        Some(c) => image::imageops::crop_imm(&img, c.left, c.top, c.width(), c.height()).to_image(),
        None => img,
    };
    img.save(dst)
        .with_context(|| format!("write '{}'", dst.display()))?;
    Ok(())
}

fn encode_video(tools: &CaptureToolsConfig, frames_dir: &Path) -> FramecapResult<Vec<u8>> {
    let out = frames_dir.join("movie.webm");
    tracing::debug!(encoder = %tools.encoder.display(), "encoding capture video");
    let output = Command::new(&tools.encoder)
        .args(["-y", "-loglevel", "error", "-r"])
        .arg(FRAME_RATE.to_string())
        .arg("-i")
        .arg(frames_dir.join("%d.png"))
        .arg(&out)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            FramecapError::conversion(format!(
                "failed to spawn encoder '{}' (is it installed and on PATH?): {e}",
                tools.encoder.display()
            ))
        })?;
    if !output.status.success() {
        return Err(FramecapError::conversion(format!(
            "encoder exited with status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(std::fs::read(&out).with_context(|| format!("read encoded video '{}'", out.display()))?)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/convert.rs"]
mod tests;
