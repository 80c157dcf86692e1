//! # cfgtool
//!
//! Command-line front end for libconfig settings files.
//!
//! ```text
//! cfgtool get app.cfg server.port
//! cfgtool set app.cfg server.port 9090
//! cfgtool list app.cfg server
//! cfgtool dump app.cfg --format json
//! cfgtool check app.cfg
//! ```

#[macro_use]
extern crate log;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

mod cmd;
mod options;

use cmd::{DumpFormat, ReadAs};

/// Query, edit and convert libconfig settings files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Base directory for relative `@include` names
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    include_dir: Option<PathBuf>,

    /// TOML file with load options
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    options: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the scalar value at a path
    Get {
        file: PathBuf,
        path: String,
        /// Read the value as this type instead of its stored type
        #[arg(long = "as", value_enum)]
        read_as: Option<ReadAs>,
    },

    /// Store a scalar literal at an existing path and save the file
    Set {
        file: PathBuf,
        path: String,
        /// Value in settings syntax, e.g. `42`, `7L`, `1.5`, `"text"`, `true`
        value: String,
        /// Write the result here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the children of a group, array or list
    List {
        file: PathBuf,
        /// Path of the aggregate; the root when omitted
        path: Option<String>,
    },

    /// Print the whole file in another format
    Dump {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = DumpFormat::Cfg)]
        format: DumpFormat,
    },

    /// Parse the file and report the first error
    Check { file: PathBuf },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let loader = options::loader(cli.options.as_deref(), cli.include_dir)?;
    debug!("load options: {:?}", loader.options());

    let output = match cli.command {
        Commands::Get {
            file,
            path,
            read_as,
        } => cmd::get(&loader.load_file(&file)?, &path, read_as)?,
        Commands::Set {
            file,
            path,
            value,
            output,
        } => {
            let mut cfg = loader.load_file(&file)?;
            cmd::set(&mut cfg, &path, &value)?;
            let target = output.unwrap_or(file);
            cfg.save_file(&target)?;
            format!("{} {path} in {}", "updated".green(), target.display())
        }
        Commands::List { file, path } => {
            cmd::list(&loader.load_file(&file)?, path.as_deref().unwrap_or(""))?
        }
        Commands::Dump { file, format } => cmd::dump(&loader.load_file(&file)?, format)?,
        Commands::Check { file } => {
            let cfg = loader.load_file(&file)?;
            format!(
                "{} {} ({} settings)",
                "ok".green().bold(),
                file.display(),
                cfg.len() - 1
            )
        }
    };
    println!("{output}");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
