mod cli;
mod config;
mod core;
mod tui;
mod util;

use clap::Parser;

use crate::cli::SystemCli;
use crate::config::Config;
use crate::core::error::PipelineError;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), PipelineError> {
    let args = SystemCli::parse();
    let cwd = std::env::current_dir().map_err(PipelineError::CurrentDir)?;
    let config = Config::from_args(&args.config, &cwd);

    match args.command {
        Some(command) => {
            util::logging::init_stderr();
            cli::execute(command, config)
        }
        None => {
            util::logging::init_file(&config.work_dir);
            tui::run(config)
        }
    }
}
