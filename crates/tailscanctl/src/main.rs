//! tailscanctl - scan a PHP debug log for recent errors

use clap::Parser;
use owo_colors::OwoColorize;

use tailscanctl::cli::Cli;
use tailscanctl::errors::EXIT_CONFIG_ERROR;
use tailscanctl::{commands, logging};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match commands::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            EXIT_CONFIG_ERROR
        }
    };

    std::process::exit(code);
}
