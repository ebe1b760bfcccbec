use std::{
    fs::File,
    io::Read as _,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context as _;
use image::{DynamicImage, GrayImage, RgbImage};
use zip::{ZipArchive, result::ZipError};

use crate::{
    archive::metadata::CaptureMetadata,
    foundation::{
        core::frames_to_secs,
        error::{FramecapError, FramecapResult},
    },
};

/// Archive entry holding [`CaptureMetadata`] as JSON.
pub const METADATA_ENTRY: &str = "metadata.json";

/// Archive entry holding the encoded video.
pub const VIDEO_ENTRY: &str = "movie.webm";

/// Prefix of every frame entry (`images/<index>.png`).
pub const IMAGES_PREFIX: &str = "images/";

/// Low frame indices reserved as boundary padding by the converter.
pub const RESERVED_FRAMES: usize = 2;

pub fn frame_entry_name(index: usize) -> String {
    format!("{IMAGES_PREFIX}{index}.png")
}

/// Read-only handle over a capture archive.
///
/// Frames are decoded on demand and never retained. The handle is `Sync`; concurrent readers
/// serialize only around pulling raw entry bytes out of the zip container, decoding happens
/// outside the lock.
pub struct FrameStore {
    path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
    metadata: CaptureMetadata,
    frame_count: usize,
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("path", &self.path)
            .field("frame_count", &self.frame_count)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl FrameStore {
    #[tracing::instrument]
    pub fn open(path: &Path) -> FramecapResult<Self> {
        if !path.exists() {
            return Err(FramecapError::archive(format!(
                "capture file '{}' does not exist",
                path.display()
            )));
        }
        let file = File::open(path)
            .with_context(|| format!("open capture file '{}'", path.display()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            FramecapError::archive(format!(
                "'{}' is not a capture archive: {e}",
                path.display()
            ))
        })?;

        let metadata_bytes = read_entry(&mut archive, METADATA_ENTRY)?.ok_or_else(|| {
            FramecapError::archive(format!(
                "'{}' has no {METADATA_ENTRY} entry",
                path.display()
            ))
        })?;
        let metadata = CaptureMetadata::from_json_slice(&metadata_bytes)?;

        let image_entries = archive
            .file_names()
            .filter(|name| name.starts_with(IMAGES_PREFIX) && name.len() > IMAGES_PREFIX.len() + 1)
            .count();
        let frame_count = image_entries.saturating_sub(RESERVED_FRAMES);

        tracing::debug!(
            path = %path.display(),
            frame_count,
            width = metadata.frame_dimensions.0,
            height = metadata.frame_dimensions.1,
            "opened capture archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive: Mutex::new(archive),
            metadata,
            frame_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &CaptureMetadata {
        &self.metadata
    }

    /// Number of analyzable frames: image entries minus the [`RESERVED_FRAMES`] padding.
    ///
    /// Valid indices for [`FrameStore::get_frame`] are `0..=frame_count()`.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// `(width, height)` shared by every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.metadata.frame_dimensions
    }

    /// Capture length in seconds at the fixed 60fps rate.
    pub fn length(&self) -> f64 {
        frames_to_secs(self.frame_count)
    }

    /// Raw bytes of the encoded video entry, if the archive has one.
    pub fn video(&self) -> FramecapResult<Option<Vec<u8>>> {
        let mut archive = self.lock()?;
        read_entry(&mut archive, VIDEO_ENTRY)
    }

    /// Decode frame `index`, optionally converting to 8-bit grayscale.
    pub fn get_frame(&self, index: usize, grayscale: bool) -> FramecapResult<DynamicImage> {
        if index > self.frame_count {
            return Err(FramecapError::out_of_range(index, self.frame_count));
        }

        let name = frame_entry_name(index);
        let bytes = {
            let mut archive = self.lock()?;
            read_entry(&mut archive, &name)?
        }
        .ok_or_else(|| FramecapError::missing_frame(index, self.frame_count))?;

        let img = image::load_from_memory(&bytes).map_err(|e| {
            FramecapError::archive(format!("frame entry '{name}' is not a valid image: {e}"))
        })?;

        let (w, h) = self.dimensions();
        if img.width() != w || img.height() != h {
            return Err(FramecapError::archive(format!(
                "frame {index} is {}x{}, metadata says {w}x{h}",
                img.width(),
                img.height()
            )));
        }

        Ok(if grayscale {
            DynamicImage::ImageLuma8(img.to_luma8())
        } else {
            img
        })
    }

    pub fn get_frame_rgb(&self, index: usize) -> FramecapResult<RgbImage> {
        Ok(self.get_frame(index, false)?.to_rgb8())
    }

    pub fn get_frame_luma(&self, index: usize) -> FramecapResult<GrayImage> {
        Ok(self.get_frame(index, true)?.to_luma8())
    }

    fn lock(&self) -> FramecapResult<std::sync::MutexGuard<'_, ZipArchive<File>>> {
        self.archive
            .lock()
            .map_err(|_| FramecapError::archive("archive handle poisoned by a panicked reader"))
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> FramecapResult<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(FramecapError::archive(format!(
                "failed to read entry '{name}': {e}"
            )));
        }
    };
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("read archive entry '{name}'"))?;
    Ok(Some(buf))
}

#[cfg(test)]
#[path = "../../tests/unit/archive/store.rs"]
mod tests;
