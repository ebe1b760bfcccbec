use std::{
    fs::File,
    io::{Cursor, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::DynamicImage;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::{
    archive::{
        metadata::CaptureMetadata,
        store::{METADATA_ENTRY, VIDEO_ENTRY, frame_entry_name},
    },
    foundation::error::{FramecapError, FramecapResult},
};

pub fn ensure_parent_dir(path: &Path) -> FramecapResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Streams a new capture archive to disk.
///
/// The file is created (or truncated) up front. Nothing is readable as an archive until
/// [`ArchiveWriter::finish`] writes the zip directory.
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    wrote_metadata: bool,
}

impl ArchiveWriter {
    pub fn create(path: impl Into<PathBuf>) -> FramecapResult<Self> {
        let path = path.into();
        ensure_parent_dir(&path)?;
        let file = File::create(&path)
            .with_context(|| format!("create capture archive '{}'", path.display()))?;
        Ok(Self {
            path,
            zip: ZipWriter::new(file),
            wrote_metadata: false,
        })
    }

    pub fn write_metadata(&mut self, metadata: &CaptureMetadata) -> FramecapResult<()> {
        let bytes = metadata.to_json_vec()?;
        self.write_entry(METADATA_ENTRY, &bytes, CompressionMethod::Deflated)?;
        self.wrote_metadata = true;
        Ok(())
    }

    pub fn write_video(&mut self, bytes: &[u8]) -> FramecapResult<()> {
        self.write_entry(VIDEO_ENTRY, bytes, CompressionMethod::Stored)
    }

    /// Add an already PNG-encoded frame.
    pub fn write_frame_png(&mut self, index: usize, png: &[u8]) -> FramecapResult<()> {
        self.write_entry(&frame_entry_name(index), png, CompressionMethod::Stored)
    }

    pub fn write_frame_image(&mut self, index: usize, img: &DynamicImage) -> FramecapResult<()> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .with_context(|| format!("encode frame {index} as png"))?;
        self.write_frame_png(index, &buf)
    }

    pub fn finish(mut self) -> FramecapResult<PathBuf> {
        if !self.wrote_metadata {
            return Err(FramecapError::validation(
                "capture archive must contain metadata before it is finished",
            ));
        }
        self.zip
            .finish()
            .with_context(|| format!("finalize capture archive '{}'", self.path.display()))?;
        Ok(self.path)
    }

    fn write_entry(
        &mut self,
        name: &str,
        bytes: &[u8],
        method: CompressionMethod,
    ) -> FramecapResult<()> {
        let opts = FileOptions::default().compression_method(method);
        self.zip
            .start_file(name, opts)
            .with_context(|| format!("start archive entry '{name}'"))?;
        self.zip
            .write_all(bytes)
            .with_context(|| format!("write archive entry '{name}'"))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/archive/writer.rs"]
mod tests;
