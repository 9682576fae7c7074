//! hackrepl - a hackable interactive command shell
//!
//! # Quick Start
//!
//! ```text
//! hackrepl                   # Prompt as $USER with "$ "
//! hackrepl -u ada -d "> "    # Prompt "ada> "
//! hackrepl -q                # Only errors and forced output
//! ```
//!
//! # Built-in commands
//!
//! | Command | Action |
//! |---------|--------|
//! | man <cmd> | Show a command's manual |
//! | error | Show and clear captured errors |
//! | echo [text...] | Print text |
//! | sleep <ms> | Wait, then finish |

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use hackrepl::{Config, ConfigOverrides, CrosstermEditor, History, Terminal};

/// Command line options
#[derive(Debug, Default)]
struct Args {
    overrides: ConfigOverrides,
    config_path: Option<PathBuf>,
    debug: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("hackrepl {}", VERSION);
}

fn print_help() {
    eprintln!("hackrepl {} - A hackable interactive command shell", VERSION);
    eprintln!();
    eprintln!("Usage: hackrepl [OPTIONS]");
    eprintln!();
    eprintln!("Prompt options:");
    eprintln!("  -u, --user <NAME>     Name shown in the prompt (default: $USER)");
    eprintln!("  -d, --delim <TEXT>    Prompt delimiter (default: \"$ \")");
    eprintln!("  --motd <TEXT>         Message printed at startup");
    eprintln!("  --no-motd             Do not print a startup message");
    eprintln!();
    eprintln!("Output options:");
    eprintln!("  -q, --verbose         Only show errors and forced output");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.hackrepl/config.toml)");
    eprintln!("  --debug               Debug logging to ~/.hackrepl/hackrepl.log");
    eprintln!("  -V, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("At the prompt:");
    eprintln!("  man <command>         Show a command's manual");
    eprintln!("  error                 Show captured errors");
    eprintln!("  Ctrl+D / Ctrl+C       Exit");
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut i = 1;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing value for {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-u" | "--user" => {
                i += 1;
                parsed.overrides.username = Some(value(i, "--user")?);
            }
            "-d" | "--delim" => {
                i += 1;
                parsed.overrides.prompt_delim = Some(value(i, "--delim")?);
            }
            "--motd" => {
                i += 1;
                parsed.overrides.motd = Some(value(i, "--motd")?);
            }
            "--no-motd" => {
                parsed.overrides.motd = Some(String::new());
            }
            "-q" | "--verbose" => {
                parsed.overrides.verbose = Some(true);
            }
            "-c" | "--config" => {
                i += 1;
                parsed.config_path = Some(PathBuf::from(value(i, "--config")?));
            }
            "--debug" => {
                parsed.debug = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; the terminal itself belongs to the prompt.
fn init_logging(debug: bool) {
    let log_path = hackrepl::config::data_dir()
        .map(|dir| dir.join("hackrepl.log"))
        .unwrap_or_else(|| PathBuf::from("hackrepl.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(if debug { Level::DEBUG } else { Level::INFO })
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    // Panics inside commands are caught; keep the default hook from
    // printing over the prompt.
    std::panic::set_hook(Box::new(|info| {
        error!("panic: {}", info);
    }));
}

fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = env::args().collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(args.debug);
    info!("hackrepl {} starting...", VERSION);

    let base = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let config = base.merged(args.overrides);
    info!("Prompt: {}{}", config.username, config.prompt_delim);

    let editor = CrosstermEditor::new(History::persistent())
        .context("Failed to put the terminal in raw mode")?;
    let terminal = Terminal::new(config, Box::new(editor));

    let result = terminal.run();
    // Dropping the terminal drops the editor, which leaves raw mode.
    drop(terminal);

    result.context("Terminal I/O failed")?;
    info!("hackrepl exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("hackrepl")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = parse_args(&args(&["-u", "ada", "-d", "> ", "--no-motd", "-q"])).unwrap();
        assert_eq!(parsed.overrides.username.as_deref(), Some("ada"));
        assert_eq!(parsed.overrides.prompt_delim.as_deref(), Some("> "));
        assert_eq!(parsed.overrides.motd.as_deref(), Some(""));
        assert_eq!(parsed.overrides.verbose, Some(true));
        assert!(!parsed.debug);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--user"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
