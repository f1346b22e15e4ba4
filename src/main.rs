#[cfg(not(feature = "cli"))]
compile_error!("The `bizdb` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use bizdb::cli;
use bizdb::cli::app::{Cli, ColorMode, Commands, ContainerCommands, SupplyCommands};
use bizdb::BizdbError;

fn main() {
    let cli = Cli::parse();

    cli::init_tracing(cli.verbose);

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, BizdbError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| BizdbError::Io(format!("cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Db { file, table, json } => {
            cli::db::execute(&cli::db::DbOptions { file, table, json }, &mut writer)
        }

        Commands::Container { command } => match command {
            ContainerCommands::List { file, json } => {
                cli::container::list(&cli::container::ListOptions { file, json }, &mut writer)
            }
            ContainerCommands::Extract {
                file,
                dir,
                deflate,
                recursive,
            } => cli::container::extract(
                &cli::container::ExtractOptions {
                    file,
                    dir,
                    deflate,
                    recursive,
                },
                &mut writer,
            ),
        },

        Commands::Supply { command } => match command {
            SupplyCommands::Unpack { file, dir } => {
                cli::supply::unpack(&cli::supply::UnpackOptions { file, dir }, &mut writer)
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
