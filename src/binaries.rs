use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use anyhow::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use futures::StreamExt;
use log::{error, info};
use thiserror::Error;
use tokio::process::Command;

use crate::ports::{ApngConverter, FrameEncoder, GifResizer, LottieRenderer};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("couldn't run `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },
    #[error("`{tool}` exited with {status}: {stderr}")]
    Failed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },
}

/// Make typing key-value-pair arguments a bit nicer
trait ArgExt {
    fn arg_pair(&mut self, first: impl AsRef<OsStr>, second: impl AsRef<OsStr>) -> &mut Self;
}
impl ArgExt for Command {
    fn arg_pair(&mut self, first: impl AsRef<OsStr>, second: impl AsRef<OsStr>) -> &mut Self {
        self.arg(first).arg(second)
    }
}

fn check_output(tool: &'static str, out: Output) -> Result<(), ToolError> {
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_owned();
        Err(ToolError::Failed {
            tool,
            status: out.status,
            stderr,
        })
    } else {
        Ok(())
    }
}

async fn run(tool: &'static str, mut cmd: Command) -> Result<(), ToolError> {
    let out = cmd
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::Spawn { tool, source })?;
    check_output(tool, out)
}

/// Call the binary with its version argument, only spawning has to work
async fn check_version(name: &'static str, binary: &Path, arg: &str) -> Result<String> {
    let output = Command::new(binary).arg(arg).output().await;

    match &output {
        Ok(_) => info!("found binary `{name}` at `{}`", binary.display()),
        Err(err) => error!("couldn't find binary `{name}` at `{}`: {err}", binary.display()),
    }

    let output = output.map_err(|source| ToolError::Spawn { tool: name, source })?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().to_owned())
}

fn bin_from_env(key: &str, default: &str) -> PathBuf {
    PathBuf::from(dotenv::var(key).unwrap_or_else(|_| default.to_owned()))
}

fn size_arg((w, h): (u32, u32)) -> String {
    format!("{w}x{h}")
}

#[derive(Debug)]
pub struct Apng2Gif(PathBuf);

impl Apng2Gif {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
    pub fn path(&self) -> &Path {
        &self.0
    }
    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.0);
        cmd.arg(input).arg(output);
        cmd
    }
}

#[async_trait]
impl ApngConverter for Apng2Gif {
    async fn apng_to_gif(&self, src: &Path, dst: &Path) -> Result<()> {
        Ok(run("apng2gif", self.command(src, dst)).await?)
    }
}

#[derive(Debug)]
pub struct Gifsicle(PathBuf);

impl Gifsicle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
    pub fn path(&self) -> &Path {
        &self.0
    }
    fn command(&self, input: &Path, output: &Path, size: (u32, u32)) -> Command {
        let mut cmd = Command::new(&self.0);
        cmd.arg_pair("--resize", size_arg(size))
            .arg_pair("-i", input)
            .arg_pair("-o", output);
        cmd
    }
}

#[async_trait]
impl GifResizer for Gifsicle {
    async fn resize(&self, src: &Path, dst: &Path, size: (u32, u32)) -> Result<()> {
        Ok(run("gifsicle", self.command(src, dst, size)).await?)
    }
}

/// `puppeteer-lottie` from `puppeteer-lottie-cli`
#[derive(Debug)]
pub struct PuppeteerLottie(PathBuf);

impl PuppeteerLottie {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
    pub fn path(&self) -> &Path {
        &self.0
    }
    fn command(&self, input: &Path, frames: &Path, size: Option<(u32, u32)>) -> Command {
        let mut cmd = Command::new(&self.0);
        cmd.arg_pair("--input", input).arg_pair("--output", frames);
        if let Some((w, h)) = size {
            cmd.arg_pair("--width", w.to_string())
                .arg_pair("--height", h.to_string());
        }
        cmd.arg("--quiet");
        cmd
    }
}

#[async_trait]
impl LottieRenderer for PuppeteerLottie {
    async fn render(&self, src: &Path, frames: &Path, size: Option<(u32, u32)>) -> Result<()> {
        Ok(run("puppeteer-lottie", self.command(src, frames, size)).await?)
    }
}

#[derive(Debug, Clone, Builder)]
pub struct GifOptions {
    /// Rate the rendered frames are assumed to have
    pub input_framerate: u32,
    /// Rate of the resulting GIF
    pub fps: u32,
}

impl GifOptions {
    /// Resample, then build the palette in a first pass and apply it in a second
    pub fn filter_complex(&self) -> String {
        format!(
            "[0:v] fps={},split [a][b];[a] palettegen [p];[b][p] paletteuse",
            self.fps
        )
    }
}

#[derive(Debug)]
pub struct Ffmpeg {
    path: PathBuf,
    opt: GifOptions,
}

impl Ffmpeg {
    pub fn new(path: impl Into<PathBuf>, opt: GifOptions) -> Self {
        Self {
            path: path.into(),
            opt,
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg("-y")
            .arg_pair("-framerate", self.opt.input_framerate.to_string())
            .arg_pair("-i", input)
            .arg_pair("-filter_complex", self.opt.filter_complex())
            .arg(output);
        cmd
    }
}

#[async_trait]
impl FrameEncoder for Ffmpeg {
    async fn encode(&self, frames: &Path, dst: &Path) -> Result<()> {
        Ok(run("ffmpeg", self.command(frames, dst)).await?)
    }
}

#[derive(Debug)]
pub struct Binaries {
    pub apng_2_gif: Apng2Gif,
    pub gifsicle: Gifsicle,
    pub puppeteer_lottie: PuppeteerLottie,
    pub ffmpeg: Ffmpeg,
}

impl Binaries {
    /// Paths come from the environment (or `.env`), falling back to `PATH` lookup
    pub fn from_env() -> Result<Self> {
        let gif = GifOptionsBuilder::default()
            .input_framerate(60)
            .fps(50)
            .build()?;

        Ok(Self {
            apng_2_gif: Apng2Gif::new(bin_from_env("APNG2GIF_BIN", "apng2gif")),
            gifsicle: Gifsicle::new(bin_from_env("GIFSICLE_BIN", "gifsicle")),
            puppeteer_lottie: PuppeteerLottie::new(bin_from_env(
                "PUPPETEER_LOTTIE_BIN",
                "puppeteer-lottie",
            )),
            ffmpeg: Ffmpeg::new(bin_from_env("FFMPEG_BIN", "ffmpeg"), gif),
        })
    }

    /// Probe every binary, returns the first line each one printed or the
    /// first binary that couldn't be started.
    pub async fn check(&self, parallel: usize) -> Result<HashMap<&'static str, String>> {
        // apng2gif has no version flag, its usage text is good enough
        let to_check = [
            ("apng2gif", self.apng_2_gif.path(), "--help"),
            ("gifsicle", self.gifsicle.path(), "--version"),
            ("puppeteer-lottie", self.puppeteer_lottie.path(), "--version"),
            ("ffmpeg", self.ffmpeg.path(), "-version"),
        ];

        let results = futures::stream::iter(to_check)
            .map(|(name, path, arg)| async move { (name, check_version(name, path, arg).await) })
            .buffer_unordered(parallel.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut map = HashMap::with_capacity(results.len());
        for (name, result) in results {
            map.insert(name, result?);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn gifsicle_resizes_to_target() {
        let cmd = Gifsicle::new("gifsicle").command(
            Path::new("in.gif"),
            Path::new("out.gif"),
            (143, 143),
        );
        assert_eq!(
            args(&cmd),
            ["--resize", "143x143", "-i", "in.gif", "-o", "out.gif"]
        );
    }

    #[test]
    fn ffmpeg_uses_two_pass_palette() {
        let ffmpeg = Binaries::from_env().unwrap().ffmpeg;
        let cmd = ffmpeg.command(Path::new("temp/frame-%d.png"), Path::new("out.gif"));
        assert_eq!(
            args(&cmd),
            [
                "-y",
                "-framerate",
                "60",
                "-i",
                "temp/frame-%d.png",
                "-filter_complex",
                "[0:v] fps=50,split [a][b];[a] palettegen [p];[b][p] paletteuse",
                "out.gif",
            ]
        );
    }

    #[test]
    fn gif_options_need_every_rate() {
        let opt = GifOptionsBuilder::default()
            .input_framerate(30)
            .fps(25)
            .build()
            .unwrap();
        assert_eq!(opt.input_framerate, 30);
        assert!(opt.filter_complex().starts_with("[0:v] fps=25,"));

        assert!(GifOptionsBuilder::default().fps(25).build().is_err());
    }

    #[test]
    fn renderer_size_is_optional() {
        let renderer = PuppeteerLottie::new("puppeteer-lottie");
        let small = renderer.command(
            Path::new("a.json"),
            Path::new("frame-%d.png"),
            Some((143, 143)),
        );
        assert_eq!(
            args(&small),
            [
                "--input",
                "a.json",
                "--output",
                "frame-%d.png",
                "--width",
                "143",
                "--height",
                "143",
                "--quiet",
            ]
        );

        let large = renderer.command(Path::new("a.json"), Path::new("frame-%d.png"), None);
        assert_eq!(
            args(&large),
            ["--input", "a.json", "--output", "frame-%d.png", "--quiet"]
        );
    }

    #[test]
    fn names_stay_single_arguments() {
        let cmd = Apng2Gif::new("apng2gif").command(
            Path::new("Pack \"1\"/APNG/it's; rm -rf.png"),
            Path::new("out dir/x.gif"),
        );
        assert_eq!(
            args(&cmd),
            ["Pack \"1\"/APNG/it's; rm -rf.png", "out dir/x.gif"]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let tool = Apng2Gif::new("/nonexistent/apng2gif");
        let err = tool
            .apng_to_gif(Path::new("a.png"), Path::new("a.gif"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::Spawn { tool: "apng2gif", .. })
        ));
    }
}
