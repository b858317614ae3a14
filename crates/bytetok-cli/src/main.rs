/// bytetok command-line tool — tokenize a byte stream from a file or stdin
/// with the same reader a protocol implementation would use.
///
/// # Command overview
///
/// ```text
/// bytetok <COMMAND> [OPTIONS]
///
/// Commands:
///   tokens   Print every delimiter-terminated token, one per line
///   read     Execute a typed read plan (byte, str, int, float, fixed:N)
///   help     Print help information
///
/// Global options:
///   -v, --verbose    Log reader activity to stderr
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Success                                          |
/// | 1    | Error (I/O failure, invalid token, bad plan...)  |
///
/// Tokens go to stdout; logs and errors go to stderr.
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd_read;
mod cmd_tokens;
mod input;
mod plan;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bytetok", version, about = "Delimiter-based byte stream tokenizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log reader activity (waits, EOF, rejected numbers) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Print every delimiter-terminated token, one per line.
    Tokens(TokensArgs),
    /// Execute a typed read plan against the input.
    Read(ReadArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Input options shared by every command.
///
/// ```text
/// ┌────────────────┬──────────────────────────────────────────────────┐
/// │ Flag           │ Effect                                           │
/// ├────────────────┼──────────────────────────────────────────────────┤
/// │ FILE           │ Read from this file (stdin when omitted)         │
/// │ --delimiter C  │ Token terminator; accepts \n \t \r \0 escapes    │
/// │ --chunk-size N │ Largest chunk pushed into the source at once     │
/// │ --recheck      │ Re-query the source once before declaring EOF    │
/// └────────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct InputArgs {
    /// File to tokenize. Reads stdin when omitted.
    pub file: Option<PathBuf>,

    /// Single ASCII delimiter character.
    #[arg(short, long, default_value = "\\n", value_parser = parse_delimiter)]
    pub delimiter: char,

    /// Maximum bytes pushed into the source per chunk.
    #[arg(long, default_value_t = bytetok_source::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Re-check the source once after an empty wake before reporting EOF.
    #[arg(long)]
    pub recheck: bool,
}

/// Arguments for `bytetok tokens`.
///
/// Bytes after the last delimiter are not a complete token and are
/// dropped.
#[derive(clap::Args)]
pub struct TokensArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print only the number of tokens.
    #[arg(long)]
    pub count: bool,
}

/// Arguments for `bytetok read`.
///
/// The plan is a comma-separated list of reads executed in order:
///
/// ```text
/// byte      one raw byte, printed as a number
/// str       delimiter-terminated string
/// int       delimiter-terminated non-negative integer
/// float     delimiter-terminated non-negative float
/// fixed:N   exactly N bytes as a string
/// ```
///
/// With `--repeat` the plan runs again and again until the input ends
/// cleanly at a plan boundary.
#[derive(clap::Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Comma-separated read plan, e.g. `str,int,fixed:5`.
    #[arg(short, long)]
    pub plan: String,

    /// Run the plan repeatedly until the input is exhausted.
    #[arg(long)]
    pub repeat: bool,

    /// Emit results as a JSON array instead of tab-separated lines.
    #[arg(long)]
    pub json: bool,
}

/// Parse a delimiter flag value: a single character or a backslash escape.
fn parse_delimiter(value: &str) -> Result<char, String> {
    let delimiter = match value {
        "\\n" => '\n',
        "\\t" => '\t',
        "\\r" => '\r',
        "\\0" => '\0',
        "\\\\" => '\\',
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(format!("expected a single character, got {other:?}")),
            }
        }
    };
    if !delimiter.is_ascii() {
        return Err(format!("delimiter {delimiter:?} is not ASCII"));
    }
    Ok(delimiter)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = tokio::runtime::Runtime::new()
        .context("cannot start runtime")
        .and_then(|runtime| {
            let result = runtime.block_on(async {
                match cli.command {
                    Commands::Tokens(args) => cmd_tokens::run(&args).await,
                    Commands::Read(args) => cmd_read::run(&args).await,
                }
            });
            // Stdin reads park a blocking thread that an open terminal
            // never releases.
            runtime.shutdown_background();
            result
        });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
