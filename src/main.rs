use anyhow::Result;
use clap::Parser as ClapParser;
use tracing::debug;

use cli::command::{Cli, Commands};
use cli::convert::cmd_convert;
use cli::process::cmd_process;
use cli::verify::cmd_verify;
use dng_decrement::logger;

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init(cli.loglevel.to_level_filter());
    debug!("{:?}", cli.command);

    match cli.command {
        Commands::Process(ref args) => cmd_process(args)?,
        Commands::Convert(ref args) => cmd_convert(args)?,
        Commands::Verify(ref args) => cmd_verify(args)?,
    }

    Ok(())
}
