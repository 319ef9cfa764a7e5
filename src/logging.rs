use anyhow::Result;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

pub fn init() -> Result<()> {
    TermLogger::init(
        LevelFilter::Debug,
        ConfigBuilder::default()
            .add_filter_allow_str("gifoid")
            .set_time_level(LevelFilter::Off)
            .build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;
    Ok(())
}
