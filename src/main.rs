mod binaries;
mod discord;
mod download;
mod file_sequence;
mod fs;
mod layout;
mod logging;
mod opt;
mod ports;
mod process;
mod result_ext;
mod sticker;

use anyhow::Result;
use log::{error, info, warn};
use structopt::StructOpt;

use binaries::Binaries;
use download::Client;
use opt::Opt;
use ports::Ports;
use process::Processor;
use sticker::PackEntry;

async fn load_packs(opt: &Opt, client: &Client) -> Result<Vec<PackEntry>> {
    if !opt.live {
        let packs = sticker::load_snapshot(&opt.data).await?;
        info!("loaded {} sticker packs from `{}`", packs.len(), opt.data.display());
        return Ok(packs);
    }

    let token = discord::session_token().await?;
    let packs = discord::sticker_packs(client, &token).await?;
    if opt.save_snapshot {
        sticker::save_snapshot(&opt.data, &packs).await?;
        info!("saved sticker-pack listing to `{}`", opt.data.display());
    }
    Ok(packs)
}

async fn run(opt: Opt) -> Result<bool> {
    let binaries = Binaries::from_env()?;
    match binaries.check(4).await {
        Ok(versions) => {
            for (name, version) in versions {
                info!("{name}: {version}");
            }
            info!("checked all needed binaries");
        }
        Err(err) if opt.check => {
            error!("{err:#}");
            return Ok(false);
        }
        Err(err) => warn!("{err:#}, stickers that need it will fail"),
    }
    if opt.check {
        return Ok(true);
    }

    let client = Client::new()?;
    let packs = load_packs(&opt, &client).await?;

    let ports = Ports {
        downloader: &client,
        converter: &binaries.apng_2_gif,
        resizer: &binaries.gifsicle,
        renderer: &binaries.puppeteer_lottie,
        encoder: &binaries.ffmpeg,
    };
    let processor = Processor::new(ports, &opt.out_dir, &opt.scratch_dir);
    processor.prepare().await?;
    processor.run(&packs).await;

    Ok(true)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    if let Err(err) = logging::init() {
        eprintln!("couldn't set up logging: {err}");
    }

    let opt = Opt::from_args();

    match run(opt).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    }
}
