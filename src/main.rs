use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use lexer::{GrammarKind, HeapPool, IoOutputStream, LexError, Lexer, OutputStream, Pool, TrackingPool};
use mimalloc::MiMalloc;
use thiserror::Error;

mod config;

use crate::config::{ConfigError, FileConfig, Overrides, Settings};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Bytes of context shown after a failsafe location.
const ERROR_CONTEXT: usize = 20;

/// Streaming HTML, CSS and JavaScript minifier.
///
/// Reads FILE (or standard input when a grammar flag is given) and writes the
/// result to standard output.
#[derive(Parser, Debug)]
#[command(name = "squeeze", version, about)]
struct Cli {
    /// Treat the input as CSS
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["html", "js"])]
    css: bool,

    /// Treat the input as HTML
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "js")]
    html: bool,

    /// Treat the input as JavaScript
    #[arg(long, action = ArgAction::SetTrue)]
    js: bool,

    /// Collapse insignificant whitespace
    #[arg(long, action = ArgAction::SetTrue)]
    remove_space: bool,

    /// Drop comments
    #[arg(long, action = ArgAction::SetTrue)]
    remove_comments: bool,

    /// Same as --remove-space --remove-comments
    #[arg(long, action = ArgAction::SetTrue)]
    minify: bool,

    /// Read size in bytes [default: 8192]
    #[arg(long, value_name = "N")]
    block_size: Option<usize>,

    /// Largest partial token carried between reads [default: 1024]
    #[arg(long, value_name = "N")]
    max_setaside: Option<usize>,

    /// TOML file with defaults for the options above
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{}: unknown file extension; pass --css, --html or --js", .0.display())]
    UnknownExtension(PathBuf),
    #[error("{}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("read failed: {0}")]
    Read(io::Error),
    #[error("{}: {source}", path.display())]
    Config { path: PathBuf, source: ConfigError },
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("cannot flush output: {0}")]
    Flush(io::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => 1,
            CliError::UnknownExtension(_) => 2,
            CliError::Open { .. } | CliError::Read(_) => 3,
            CliError::Config { .. } => 4,
            CliError::Lex(_) | CliError::Flush(_) => 5,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("squeeze: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    if cli.files.len() > 1 {
        return Err(CliError::Usage("too many arguments".into()));
    }
    let path = cli.files.first().map(PathBuf::as_path);
    let kind = select_grammar(&cli, path)?;
    let settings = load_settings(&cli)?;
    if settings.block_size == 0 {
        return Err(CliError::Usage("--block-size must be at least 1".into()));
    }
    log::info!(
        target: "squeeze",
        "{kind} input, block size {}, set-aside {}",
        settings.block_size,
        settings.lexer.max_setaside
    );

    let mut input: Box<dyn Read> = match path {
        Some(path) => Box::new(File::open(path).map_err(|source| CliError::Open {
            path: path.to_path_buf(),
            source,
        })?),
        None => Box::new(io::stdin().lock()),
    };
    let pool = TrackingPool::new(HeapPool);
    let stdout = IoOutputStream::new(io::stdout().lock());
    minify_stream(kind, settings, &pool, &mut *input, stdout)?;
    log::debug!(
        target: "squeeze",
        "pool peak {} bytes over {} allocations",
        pool.peak_bytes(),
        pool.allocations()
    );
    Ok(())
}

fn select_grammar(cli: &Cli, path: Option<&Path>) -> Result<GrammarKind, CliError> {
    let explicit = if cli.css {
        Some(GrammarKind::Css)
    } else if cli.html {
        Some(GrammarKind::Html)
    } else if cli.js {
        Some(GrammarKind::Js)
    } else {
        None
    };
    if let Some(kind) = explicit {
        return Ok(kind);
    }
    let Some(path) = path else {
        return Err(CliError::Usage(
            "no input file; pass a file or --css, --html or --js to read stdin".into(),
        ));
    };
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(GrammarKind::from_extension)
        .ok_or_else(|| CliError::UnknownExtension(path.to_path_buf()))
}

fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => FileConfig::default(),
    };
    Ok(file.resolve(Overrides {
        remove_space: cli.remove_space || cli.minify,
        remove_comments: cli.remove_comments || cli.minify,
        max_setaside: cli.max_setaside,
        block_size: cli.block_size,
    }))
}

fn minify_stream<P: Pool, W: io::Write>(
    kind: GrammarKind,
    settings: Settings,
    pool: P,
    input: &mut dyn Read,
    out: IoOutputStream<W>,
) -> Result<(), CliError> {
    let mut block = pool.allocate_zeroed(settings.block_size).map_err(LexError::from)?;
    let mut lexer = Lexer::new(kind, &pool, out).with_config(settings.lexer);
    let result = pump(&mut lexer, input, &mut block);
    pool.release(block);
    result?;

    let bytes_in = lexer.bytes_in();
    let bytes_out = lexer.bytes_out();
    let elapsed = lexer.processing_time();
    if lexer.setaside_overflowed() {
        log::info!(target: "squeeze", "final token did not fit the set-aside");
    }
    lexer.output_mut().flush().map_err(CliError::Flush)?;
    drop(lexer);

    if bytes_in > 0 {
        let per_byte = elapsed.as_nanos() as f64 / bytes_in as f64;
        eprintln!(
            "{bytes_in} bytes in, {bytes_out} bytes out, {} usec ({per_byte:.2} nsec/byte)",
            elapsed.as_micros()
        );
    }
    Ok(())
}

fn pump<W: OutputStream, P: Pool>(
    lexer: &mut Lexer<W, P>,
    input: &mut dyn Read,
    block: &mut [u8],
) -> Result<(), CliError> {
    loop {
        let n = match input.read(block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CliError::Read(err)),
        };
        let data = &block[..n];
        lexer.scan(data, false)?;
        report_failsafe(lexer, data);
    }
    lexer.scan(&[], true)?;
    report_failsafe(lexer, &[]);
    Ok(())
}

fn report_failsafe<W: OutputStream, P: Pool>(lexer: &Lexer<W, P>, data: &[u8]) {
    let Some(location) = lexer.error() else {
        return;
    };
    let start = location.buffer_index.min(data.len());
    let end = (start + ERROR_CONTEXT).min(data.len());
    eprintln!(
        "parsing error detected near '{}'",
        String::from_utf8_lossy(&data[start..end])
    );
}
