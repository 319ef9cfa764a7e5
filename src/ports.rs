//! Seams between the sticker pipeline and the outside world.
//!
//! [`crate::download::Client`] fetches assets and [`crate::binaries::Binaries`]
//! drives the external tools; tests swap both for fakes.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` and write the body to `dst`. Nothing is written on failure.
    async fn download(&self, url: &str, dst: &Path) -> Result<()>;
}

#[async_trait]
pub trait ApngConverter: Send + Sync {
    async fn apng_to_gif(&self, src: &Path, dst: &Path) -> Result<()>;
}

#[async_trait]
pub trait GifResizer: Send + Sync {
    async fn resize(&self, src: &Path, dst: &Path, size: (u32, u32)) -> Result<()>;
}

#[async_trait]
pub trait LottieRenderer: Send + Sync {
    /// Render every frame of `src` to `frames`, a `%d` file pattern.
    /// `None` keeps the animation's own size.
    async fn render(&self, src: &Path, frames: &Path, size: Option<(u32, u32)>) -> Result<()>;
}

#[async_trait]
pub trait FrameEncoder: Send + Sync {
    /// Encode the numbered frames matching `frames` into the GIF `dst`.
    async fn encode(&self, frames: &Path, dst: &Path) -> Result<()>;
}

/// Everything the pipeline needs to produce a sticker's files.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub downloader: &'a dyn Downloader,
    pub converter: &'a dyn ApngConverter,
    pub resizer: &'a dyn GifResizer,
    pub renderer: &'a dyn LottieRenderer,
    pub encoder: &'a dyn FrameEncoder,
}
