use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "bizdb")]
#[command(about = "Reader/writer for a business-application platform's paged database, container archive, and EFD supply file formats")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Emit debug-level tracing to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect a paged database file
    Db {
        /// Path to the database file (e.g. `1Cv8.1CD`)
        #[arg(short, long)]
        file: String,

        /// Dump the rows of one table instead of the table summary
        #[arg(short, long)]
        table: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect or extract a container archive
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },

    /// Unpack an EFD supply package
    Supply {
        #[command(subcommand)]
        command: SupplyCommands,
    },
}

#[derive(Subcommand)]
pub enum ContainerCommands {
    /// List every entry in a container
    List {
        /// Path to the container file
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Extract every entry of a container to a directory
    Extract {
        /// Path to the container file
        #[arg(short, long)]
        file: String,

        /// Destination directory (must not already exist and be non-empty)
        #[arg(short, long)]
        dir: String,

        /// Raw-DEFLATE decompress each entry's payload
        #[arg(long)]
        deflate: bool,

        /// Recurse into entries that are themselves nested containers
        #[arg(long)]
        recursive: bool,
    },
}

#[derive(Subcommand)]
pub enum SupplyCommands {
    /// Unpack an EFD supply package's embedded files to a directory
    Unpack {
        /// Path to the EFD file
        #[arg(short, long)]
        file: String,

        /// Destination directory
        #[arg(short, long)]
        dir: String,
    },
}
