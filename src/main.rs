//! vsh: a virtual shell over an in-memory filesystem.
//!
//! Usage:
//!   vsh                        # interactive session, saved to ~/.vsh/state.json
//!   vsh --no-persist           # session that is never saved
//!   vsh -c 'ls -la' -c pwd     # run lines and exit
//!   vsh --dump-state           # print the stored snapshot as JSON

mod app;
mod config;
mod render;
mod repl;
mod storage;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use vsh_core::config::PERSISTED_OUTPUT_LINES;
use vsh_core::{MemoryStorage, Shell, Storage};

use crate::app::{App, Options};
use crate::config::default_state_path;
use crate::storage::FileStorage;

#[derive(Parser, Debug)]
#[command(name = "vsh", version, about = "A virtual shell over an in-memory filesystem")]
struct Args {
    /// Snapshot file to restore from and save to
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long, conflicts_with = "state")]
    no_persist: bool,

    /// Run a line and exit; may be repeated
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    commands: Vec<String>,

    /// Directory receiving exported files and screenshots
    #[arg(long, value_name = "DIR", default_value = ".")]
    download_dir: PathBuf,

    /// Print the stored session as JSON and exit
    #[arg(long)]
    dump_state: bool,

    /// Disable ANSI colors
    #[arg(long)]
    no_color: bool,

    /// Log debug records to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    // `debug` prints through the logger, so its records stay visible by default
    let default = if verbose {
        "debug"
    } else {
        "warn,vsh_core::commands=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let storage: Box<dyn Storage> = if args.no_persist {
        Box::new(MemoryStorage::new())
    } else {
        let path = args.state.unwrap_or_else(default_state_path);
        log::debug!("using snapshot file {}", path.display());
        Box::new(FileStorage::new(path))
    };
    let shell = Shell::new(storage);

    if args.dump_state {
        let snapshot = shell.state.snapshot(PERSISTED_OUTPUT_LINES, None);
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &snapshot).context("failed to write snapshot")?;
        writeln!(stdout).context("failed to write snapshot")?;
        return Ok(());
    }

    let stdout = io::stdout();
    let color = !args.no_color && stdout.is_terminal();

    if !args.commands.is_empty() {
        let options = Options {
            color,
            echo: false,
            interactive: false,
            download_dir: args.download_dir,
        };
        let mut app = App::new(shell, stdout.lock(), options);
        app.mark_seen();
        for line in &args.commands {
            app.handle(line).context("failed to write output")?;
            if app.is_closed() {
                break;
            }
        }
        return Ok(());
    }

    let interactive = io::stdin().is_terminal();
    let options = Options {
        color,
        echo: !interactive,
        interactive,
        download_dir: args.download_dir,
    };
    if interactive {
        let mut app = App::new(shell, stdout, options);
        repl::run(&mut app)
    } else {
        let mut app = App::new(shell, stdout.lock(), options);
        app.run(io::stdin().lock())
    }
}
