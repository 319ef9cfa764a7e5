use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::sticker::{Sticker, StickerFormat, StickerPack};

/// Size of the small GIF rendition
pub const SMALL_SIZE: (u32, u32) = (143, 143);

#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
}

impl OutputTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn pack(&self, pack: &StickerPack, index: usize) -> PackDir {
        PackDir {
            dir: self.root.join(pack.dir_name(index)),
        }
    }
}

/// `<root>/<pack>/`
#[derive(Debug, Clone)]
pub struct PackDir {
    dir: PathBuf,
}

impl PackDir {
    pub fn path(&self) -> &Path {
        &self.dir
    }
    pub fn apng_dir(&self) -> PathBuf {
        self.dir.join("APNG")
    }
    pub fn lottie_dir(&self) -> PathBuf {
        self.dir.join("Lottie")
    }
    pub fn small_gif_dir(&self) -> PathBuf {
        self.dir.join("GIF-143")
    }
    pub fn large_gif_dir(&self) -> PathBuf {
        self.dir.join("GIF-Large")
    }
}

/// File stems handed out within one pack.
///
/// Raster and vector stickers share the GIF directories and sanitising can
/// map different names to the same stem, so a stem that is already taken gets
/// the sticker id appended. Comparison ignores case to stay apart on
/// case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct StemSet(HashSet<String>);

impl StemSet {
    pub fn claim(&mut self, sticker: &Sticker) -> String {
        let stem = sticker.file_stem();
        if self.0.insert(stem.to_lowercase()) {
            return stem;
        }

        let mut candidate = format!("{stem}-{}", sticker.id);
        let mut n = 2;
        while !self.0.insert(candidate.to_lowercase()) {
            candidate = format!("{stem}-{}-{n}", sticker.id);
            n += 1;
        }
        candidate
    }
}

/// Every file one sticker ends up as.
#[derive(Debug, Clone)]
pub struct StickerPaths {
    /// The downloaded asset, `APNG/<name>.png` or `Lottie/<name>.json`
    pub source: PathBuf,
    pub large: PathBuf,
    pub small: PathBuf,
}

impl StickerPaths {
    /// `None` for formats that aren't converted
    pub fn new(pack: &PackDir, sticker: &Sticker, stem: &str) -> Option<Self> {
        let source = match sticker.format_type {
            StickerFormat::Apng => pack.apng_dir().join(format!("{stem}.png")),
            StickerFormat::Lottie => pack.lottie_dir().join(format!("{stem}.json")),
            StickerFormat::Other(_) => return None,
        };
        let gif = format!("{stem}.gif");

        Some(Self {
            source,
            large: pack.large_gif_dir().join(&gif),
            small: pack.small_gif_dir().join(&gif),
        })
    }

    pub fn dirs(&self) -> Vec<&Path> {
        [&self.source, &self.large, &self.small]
            .into_iter()
            .filter_map(|path| path.parent())
            .collect()
    }
}
