//! CLI tool for inspecting PyInstaller executables.

mod commands;
mod exit_codes;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Inspect and unpack PyInstaller archives
#[derive(Parser)]
#[command(name = "pyiarchive")]
#[command(author, version, about = "Inspect and unpack PyInstaller archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Environment variable holding the PYZ decryption key
    #[arg(long, value_name = "VAR", global = true)]
    key_env: Option<String>,

    /// Log debug details to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List archive contents (alias: l)
    #[command(alias = "l")]
    List {
        /// Executable or package file to list
        archive: PathBuf,

        /// Include the contents of embedded PYZ archives
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// Show archive information (alias: i)
    #[command(alias = "i")]
    Info {
        /// Executable or package file to inspect
        archive: PathBuf,
    },

    /// Extract a single entry (alias: x)
    ///
    /// Use `PYZ:MODULE` to extract a module from an embedded PYZ archive.
    #[command(alias = "x")]
    Extract {
        /// Executable or package file
        archive: PathBuf,

        /// Entry name, or `PYZ:MODULE`
        name: String,

        /// Output file (default: standard output)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Extract all entries into a directory
    ExtractAll {
        /// Executable or package file
        archive: PathBuf,

        /// Output directory
        #[arg(short = 'o', long, default_value = ".")]
        output: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(level));

    let options = commands::reader_options(cli.key_env.as_deref());

    let exit_code = match cli.command {
        Commands::List { archive, recursive } => {
            commands::list(&archive, recursive, &options, cli.format)
        }

        Commands::Info { archive } => commands::info(&archive, &options, cli.format),

        Commands::Extract {
            archive,
            name,
            output,
        } => commands::extract(&archive, &name, output.as_deref(), &options),

        Commands::ExtractAll { archive, output } => {
            commands::extract_all(&archive, &output, &options, cli.format)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
