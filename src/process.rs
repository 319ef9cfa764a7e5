use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{debug, error, info, warn};
use simple_error::simple_error;

use crate::discord;
use crate::file_sequence::FrameSequence;
use crate::fs;
use crate::layout::{OutputTree, PackDir, StemSet, StickerPaths, SMALL_SIZE};
use crate::ports::Ports;
use crate::result_ext::LogFailure;
use crate::sticker::{PackEntry, Sticker, StickerFormat};

/// What happened to one output file of a sticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Already on disk, nothing was done
    Present,
    Produced,
    /// A prerequisite was missing
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickerReport {
    pub source: Step,
    pub large: Step,
    pub small: Step,
}

impl StickerReport {
    pub fn steps(&self) -> [Step; 3] {
        [self.source, self.large, self.small]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stickers: usize,
    pub unsupported: usize,
    /// Stickers whose directories couldn't be set up
    pub aborted: usize,
    pub produced: usize,
    pub present: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, report: &StickerReport) {
        self.stickers += 1;
        for step in report.steps() {
            match step {
                Step::Present => self.present += 1,
                Step::Produced => self.produced += 1,
                Step::Skipped => self.skipped += 1,
                Step::Failed => self.failed += 1,
            }
        }
    }
}

pub struct Processor<'a> {
    ports: Ports<'a>,
    tree: OutputTree,
    scratch: FrameSequence,
}

impl<'a> Processor<'a> {
    pub fn new(ports: Ports<'a>, out_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            ports,
            tree: OutputTree::new(out_dir),
            scratch: FrameSequence::new(scratch_dir),
        }
    }

    /// Creates the output root and the scratch directory. Nothing can be
    /// done without them, so unlike every later step this error is fatal.
    pub async fn prepare(&self) -> Result<()> {
        fs::assert_dir(self.tree.root()).await?;
        fs::assert_dir(self.scratch.dir()).await
    }

    pub async fn run(&self, packs: &[PackEntry]) -> RunSummary {
        let mut summary = RunSummary::default();

        for (i, entry) in packs.iter().enumerate() {
            let pack = &entry.sticker_pack;
            info!("processing pack '{}' ({}/{})", pack.name, i + 1, packs.len());
            let dir = self.tree.pack(pack, i);
            debug!("pack directory is `{}`", dir.path().display());
            let mut stems = StemSet::default();

            for (j, sticker) in pack.stickers.iter().enumerate() {
                info!(
                    "processing sticker '{}' ({}/{})",
                    sticker.name,
                    j + 1,
                    pack.stickers.len()
                );
                let result = self
                    .process_sticker(&dir, &mut stems, sticker)
                    .await
                    .log_failure_fmt(|| format!("couldn't process sticker `{}`", sticker.id));
                match result {
                    Some(Some(report)) => summary.record(&report),
                    Some(None) => summary.unsupported += 1,
                    None => summary.aborted += 1,
                }
            }
        }

        info!(
            "finished {} stickers: {} files produced, {} already present, {} skipped, {} failed",
            summary.stickers, summary.produced, summary.present, summary.skipped, summary.failed
        );
        if summary.unsupported > 0 || summary.aborted > 0 {
            warn!(
                "{} stickers had an unsupported format, {} couldn't be set up",
                summary.unsupported, summary.aborted
            );
        }
        summary
    }

    /// Make sure every file of `sticker` exists below `dir`, named after a
    /// stem claimed from `stems`.
    ///
    /// Only directory creation errors are returned, every other failure is
    /// logged and shows up in the report. `None` if the format isn't converted.
    pub async fn process_sticker(
        &self,
        dir: &PackDir,
        stems: &mut StemSet,
        sticker: &Sticker,
    ) -> Result<Option<StickerReport>> {
        if let StickerFormat::Other(format) = sticker.format_type {
            warn!("skipping sticker `{}`: unsupported format {format}", sticker.id);
            return Ok(None);
        }

        let stem = stems.claim(sticker);
        if stem != sticker.file_stem() {
            warn!(
                "name of sticker `{}` is already taken in this pack, using `{stem}`",
                sticker.id
            );
        }
        let paths = match StickerPaths::new(dir, sticker, &stem) {
            Some(paths) => paths,
            None => return Ok(None),
        };
        fs::assert_dirs(&paths.dirs()).await?;

        let report = match sticker.format_type {
            StickerFormat::Apng => self.process_apng(sticker, &paths).await,
            StickerFormat::Lottie => self.process_lottie(sticker, &paths).await,
            StickerFormat::Other(_) => return Ok(None),
        };
        Ok(Some(report))
    }

    async fn process_apng(&self, sticker: &Sticker, paths: &StickerPaths) -> StickerReport {
        let source = self.fetch_source(discord::apng_url(&sticker.id), &paths.source).await;

        let large = if fs::exists(&paths.large).await {
            Step::Present
        } else if !fs::exists(&paths.source).await {
            warn!("can't convert `{}` because the APNG doesn't exist", sticker.name);
            Step::Skipped
        } else {
            info!("converting large...");
            let result = self.ports.converter.apng_to_gif(&paths.source, &paths.large).await;
            self.finish(result, &paths.large, "conversion of large").await
        };

        let small = if fs::exists(&paths.small).await {
            Step::Present
        } else if !fs::exists(&paths.large).await {
            warn!(
                "can't resize `{}` to 143 because the large version doesn't exist",
                sticker.name
            );
            Step::Skipped
        } else {
            info!("resizing 143...");
            let result = self
                .ports
                .resizer
                .resize(&paths.large, &paths.small, SMALL_SIZE)
                .await;
            self.finish(result, &paths.small, "resizing of 143").await
        };

        StickerReport { source, large, small }
    }

    async fn process_lottie(&self, sticker: &Sticker, paths: &StickerPaths) -> StickerReport {
        let source = self.fetch_source(discord::lottie_url(&sticker.id), &paths.source).await;
        let small = self.render_pass(&paths.source, &paths.small, Some(SMALL_SIZE)).await;
        let large = self.render_pass(&paths.source, &paths.large, None).await;
        StickerReport { source, large, small }
    }

    async fn fetch_source(&self, url: String, dst: &Path) -> Step {
        if fs::exists(dst).await {
            debug!("`{}` was already downloaded", dst.display());
            return Step::Present;
        }

        info!("downloading `{url}`...");
        let result = self.ports.downloader.download(&url, dst).await;
        self.finish(result, dst, "download").await
    }

    /// Render `src` at `size` into the scratch directory and encode the frames
    /// to `dst`. The scratch directory holds no frames before and after.
    async fn render_pass(&self, src: &Path, dst: &Path, size: Option<(u32, u32)>) -> Step {
        let label = match size {
            Some((w, _)) => w.to_string(),
            None => "large".to_owned(),
        };

        if fs::exists(dst).await {
            return Step::Present;
        }
        if !fs::exists(src).await {
            warn!(
                "can't render {label} because `{}` doesn't exist",
                src.display()
            );
            return Step::Skipped;
        }
        if self.clear_scratch().await.is_none() {
            return Step::Failed;
        }

        info!("rendering {label}...");
        let pattern = self.scratch.pattern();
        let rendered = match self.ports.renderer.render(src, &pattern, size).await {
            Ok(()) => self.rendered_frames().await,
            Err(err) => Err(err),
        };

        let step = match rendered.log_failure_fmt(|| format!("couldn't render {label}")) {
            Some(count) => {
                info!("render complete ({label}, {count} frames)");
                let result = self.ports.encoder.encode(&pattern, dst).await;
                self.finish(result, dst, &format!("encoding of {label}")).await
            }
            None => Step::Failed,
        };

        self.clear_scratch().await;
        step
    }

    async fn rendered_frames(&self) -> Result<usize> {
        let frames = self.scratch.frames().await?;
        if frames.is_empty() {
            Err(simple_error!("renderer produced no frames").into())
        } else {
            Ok(frames.len())
        }
    }

    async fn clear_scratch(&self) -> Option<usize> {
        let removed = self
            .scratch
            .clear()
            .await
            .log_failure("couldn't clean scratch directory")?;
        if removed > 0 {
            debug!("removed {removed} frames from scratch directory");
        }
        Some(removed)
    }

    /// Turn the outcome of a step into a [`Step`], deleting whatever a failed
    /// step left at `dst` so the next run retries it.
    async fn finish(&self, result: Result<()>, dst: &Path, what: &str) -> Step {
        match result.log_failure_fmt(|| format!("{what} failed for `{}`", dst.display())) {
            Some(()) => {
                info!("{what} complete");
                Step::Produced
            }
            None => {
                let removed = fs::remove_partial(dst)
                    .await
                    .log_failure("couldn't remove partial output");
                if removed == Some(true) {
                    error!("removed partial output `{}`", dst.display());
                }
                Step::Failed
            }
        }
    }
}
