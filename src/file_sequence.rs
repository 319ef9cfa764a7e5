use std::path::{Path, PathBuf};

use anyhow::Result;
use lazy_regex::regex_captures;
use log::warn;
use walkdir::{DirEntry, WalkDir};

fn frame_index(entry: &DirEntry) -> Option<u32> {
    if !entry.file_type().is_file() {
        return None;
    }
    let file_name = entry.file_name().to_str()?;
    let (_, digits) = regex_captures!(r"^frame-(\d+)\.png$", file_name)?;
    digits.parse().ok()
}

/// Collects any file within `dir` that matches `^frame-(\d+)\.png$`, sorted by
/// the sequence index.
///
/// E.g. `frame-0.png` or `frame-12.png`
pub fn frames_blocking(dir: &Path) -> Vec<(u32, PathBuf)> {
    let walk = WalkDir::new(dir).max_depth(1).min_depth(1);
    let mut buffer = walk
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| Some((frame_index(&entry)?, entry.into_path())))
        .collect::<Vec<_>>();
    buffer.sort_by_key(|e| e.0);

    if let (Some(first), Some(last)) = (buffer.first(), buffer.last()) {
        if buffer.len() != (last.0 - first.0) as usize + 1 {
            warn!("numbers in frame file names are inconsistent");
        }
    }

    buffer
}

/// Numbered frames rendered into the scratch directory.
///
/// There is only one sequence per scratch directory, two renders sharing a
/// directory must not overlap.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    dir: PathBuf,
}

impl FrameSequence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    /// printf-style pattern understood by both the renderer and ffmpeg
    pub fn pattern(&self) -> PathBuf {
        self.dir.join("frame-%d.png")
    }
    #[cfg(test)]
    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame-{index}.png"))
    }

    pub async fn frames(&self) -> Result<Vec<(u32, PathBuf)>> {
        let dir = self.dir.clone();
        Ok(tokio::task::spawn_blocking(move || frames_blocking(&dir)).await?)
    }

    /// Deletes every frame file, other files are left alone. Returns the
    /// number of removed frames.
    pub async fn clear(&self) -> Result<usize> {
        let frames = self.frames().await?;
        for (_, path) in &frames {
            tokio::fs::remove_file(path).await?;
        }
        Ok(frames.len())
    }
}
