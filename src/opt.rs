use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "gifoid", about = "Turn Discord sticker packs into GIFs.")]
pub struct Opt {
    /// Sticker-pack listing to read, or to write with `--save-snapshot`
    #[structopt(long = "data", default_value = "data.json", parse(from_os_str))]
    pub data: PathBuf,

    /// Fetch the listing from Discord instead of reading `--data`
    #[structopt(long)]
    pub live: bool,

    /// Store the fetched listing at `--data` (needs `--live`)
    #[structopt(long, requires = "live")]
    pub save_snapshot: bool,

    /// Where to put the converted packs
    #[structopt(long = "out-dir", default_value = "stickers", parse(from_os_str))]
    pub out_dir: PathBuf,

    /// Where to render animation frames
    #[structopt(long = "scratch-dir", default_value = "temp", parse(from_os_str))]
    pub scratch_dir: PathBuf,

    /// Only check the needed binaries, don't process anything
    #[structopt(long)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usual_layout() {
        let opt = Opt::from_iter(["gifoid"]);
        assert_eq!(opt.data, PathBuf::from("data.json"));
        assert_eq!(opt.out_dir, PathBuf::from("stickers"));
        assert_eq!(opt.scratch_dir, PathBuf::from("temp"));
        assert!(!opt.live && !opt.save_snapshot && !opt.check);
    }

    #[test]
    fn save_snapshot_needs_live() {
        assert!(Opt::from_iter_safe(["gifoid", "--save-snapshot"]).is_err());
        let opt = Opt::from_iter_safe(["gifoid", "--live", "--save-snapshot"]).unwrap();
        assert!(opt.save_snapshot);
    }
}
