//! shardqr - Split secrets into QR-transportable threshold shares
//!
//! This tool splits a secret into N textual shares (any K of which
//! reconstruct it), fragments over-long shares into QR-sized parts, and
//! combines scanned or pasted shares back into the secret.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use shardqr_core::{secret, transport, ScanNotice, ScanSession, ScanSink, SessionState};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

/// Split secrets into QR-transportable threshold shares and combine them back
#[derive(Parser, Debug)]
#[command(name = "shardqr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a secret into threshold shares
    Split(SplitArgs),
    /// Combine shares back into the secret
    Combine(CombineArgs),
    /// Collect the fragments of one share interactively from stdin
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct SplitArgs {
    #[command(flatten)]
    input: SecretInput,

    /// Total number of shares to issue
    #[arg(short = 'n', long = "shares", default_value = "3")]
    shares: u8,

    /// Minimum number of shares needed to reconstruct
    #[arg(short = 'k', long = "threshold", default_value = "2")]
    threshold: u8,

    /// Always print QR-sized fragments, even for short shares
    #[arg(long)]
    chunks: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SecretInput {
    /// The secret text to split
    #[arg(short, long)]
    secret: Option<String>,

    /// Read the secret from a file
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CombineArgs {
    /// Share tokens (alternatively use --input)
    tokens: Vec<String>,

    /// Read shares from a file: one share per line, or blank-line separated
    /// blocks of PART lines for chunked shares
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Threshold the shares were issued with
    #[arg(short = 'k', long = "threshold", default_value = "2")]
    threshold: u8,

    /// Write the recovered secret to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Stop after the first completed share instead of reading all input
    #[arg(long)]
    single: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Split(args) => run_split(&args),
        Command::Combine(args) => run_combine(&args),
        Command::Scan(args) => run_scan(&args),
    }
}

fn run_split(args: &SplitArgs) -> Result<()> {
    let secret_text = match (&args.input.secret, &args.input.input) {
        (Some(secret), _) => secret.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read secret file: {}", path.display()))?,
        (None, None) => bail!("Either --secret or --input must be specified"),
    };

    let tokens = secret::split_secret(&secret_text, args.shares, args.threshold)
        .context("Failed to split secret")?;

    for (i, token) in tokens.iter().enumerate() {
        let fragments = transport::split(token);
        println!("Share {}: {}", i + 1, token);

        if args.chunks || fragments.len() > 1 {
            for fragment in &fragments {
                println!("  {}", fragment);
            }
        }
    }

    debug!("issued {} shares", tokens.len());
    Ok(())
}

fn run_combine(args: &CombineArgs) -> Result<()> {
    let mut inputs = args.tokens.clone();

    if let Some(ref path) = args.input {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read shares file: {}", path.display()))?;
        inputs.extend(collect_share_inputs(&text));
    }

    if inputs.len() < 2 {
        bail!("At least 2 shares are required (got {})", inputs.len());
    }

    let recovered = secret::combine_shares(&inputs, args.threshold)
        .context("Unable to combine shares")?;

    match args.output {
        Some(ref path) => {
            write_secret_file(path, &recovered)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", recovered),
    }

    Ok(())
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let stdin = std::io::stdin();
    let (completed, _) = scan_fragments(stdin.lock(), ConsoleSink, args.single)?;

    if completed == 0 {
        bail!("No complete share was scanned");
    }

    debug!("collected {} complete share(s)", completed);
    Ok(())
}

/// Feed fragment lines from a reader into scan sessions.
///
/// Each completed share is delivered to the sink and a fresh session is
/// started for the next one (unless `single` is set). Returns the number
/// of completed shares and the sink; input ending mid-scan is an error
/// naming the missing parts.
fn scan_fragments<R: BufRead, S: ScanSink>(
    reader: R,
    sink: S,
    single: bool,
) -> Result<(usize, S)> {
    let mut session = ScanSession::new(sink);
    session.start();
    let mut completed = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read fragment from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        session.on_fragment(line)?;

        if session.state() == SessionState::Complete {
            completed += 1;
            if single {
                return Ok((completed, session.into_sink()));
            }
            session.start();
        }
    }

    // A session holding parts at EOF is a genuinely unfinished scan
    if let Some((have, total)) = session.progress() {
        session.cancel();
        bail!("Scan incomplete: have {} of {} parts", have, total);
    }

    Ok((completed, session.into_sink()))
}

/// Sink that narrates scan progress on stderr and prints completed tokens
/// on stdout
struct ConsoleSink;

impl ScanSink for ConsoleSink {
    fn on_progress(&mut self, collected: usize, total: usize) {
        eprintln!(
            "Scanned part {} of {}. Scan {} more.",
            collected,
            total,
            total - collected
        );
    }

    fn on_notice(&mut self, notice: &ScanNotice) {
        match notice {
            ScanNotice::DuplicatePart { index, .. } => {
                eprintln!("Part {} already scanned. Scan remaining parts.", index);
            }
            ScanNotice::MismatchedShare { expected, found } => {
                eprintln!(
                    "Expected {} parts but this fragment claims {}. Scan the correct share.",
                    expected, found
                );
            }
        }
    }

    fn on_complete(&mut self, token: &str) {
        eprintln!("Complete!");
        println!("{}", token);
    }

    fn on_aborted(&mut self) {
        eprintln!("Scan cancelled.");
    }
}

/// Group pasted share text into per-share inputs.
///
/// Blank lines separate shares. Within a block, multiple `PART` lines are
/// one chunked share; any other block contributes one share per line.
fn collect_share_inputs(text: &str) -> Vec<String> {
    let mut inputs = Vec::new();

    for block in text.split("\n\n") {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            continue;
        }

        let all_chunks = lines
            .iter()
            .all(|line| transport::Fragment::parse(line).label().is_some());

        if lines.len() > 1 && all_chunks {
            inputs.push(lines.join("\n"));
        } else {
            inputs.extend(lines.iter().map(|line| line.to_string()));
        }
    }

    inputs
}

/// Write the recovered secret to disk, creating parent directories
fn write_secret_file(output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_share_inputs_one_per_line() {
        let text = "token-one\ntoken-two\n";
        assert_eq!(collect_share_inputs(text), vec!["token-one", "token-two"]);
    }

    #[test]
    fn test_collect_share_inputs_chunk_blocks() {
        let text = "PART1OF2:AA\nPART2OF2:BB\n\ntoken-two\n";
        assert_eq!(
            collect_share_inputs(text),
            vec!["PART1OF2:AA\nPART2OF2:BB", "token-two"]
        );
    }

    #[test]
    fn test_collect_share_inputs_skips_blank_blocks() {
        assert!(collect_share_inputs("\n\n\n").is_empty());
    }

    #[test]
    fn test_write_secret_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("secret.txt");
        write_secret_file(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_split_then_combine_via_files() {
        let temp_dir = TempDir::new().unwrap();
        let shares_path = temp_dir.path().join("shares.txt");

        let tokens = secret::split_secret("file round trip", 3, 2).unwrap();
        fs::write(&shares_path, tokens[..2].join("\n")).unwrap();

        let text = fs::read_to_string(&shares_path).unwrap();
        let inputs = collect_share_inputs(&text);
        assert_eq!(inputs.len(), 2);
        assert_eq!(
            secret::combine_shares(&inputs, 2).unwrap(),
            "file round trip"
        );
    }

    #[derive(Debug, Default)]
    struct Collected(Vec<String>);

    impl ScanSink for Collected {
        fn on_complete(&mut self, token: &str) {
            self.0.push(token.to_string());
        }
    }

    #[test]
    fn test_scan_fragments_multiple_shares() {
        let input = "PART1OF2:AA\nPART2OF2:BB\n\nplain-token\nPART2OF2:DD\nPART1OF2:CC\n";
        let reader = std::io::Cursor::new(input);

        let (completed, sink) = scan_fragments(reader, Collected::default(), false).unwrap();
        assert_eq!(completed, 3);
        assert_eq!(sink.0, vec!["AABB", "plain-token", "CCDD"]);
    }

    #[test]
    fn test_scan_fragments_single_stops_early() {
        let input = "PART1OF2:AA\nPART2OF2:BB\nplain-token\n";
        let reader = std::io::Cursor::new(input);

        let (completed, sink) = scan_fragments(reader, Collected::default(), true).unwrap();
        assert_eq!(completed, 1);
        assert_eq!(sink.0, vec!["AABB"]);
    }

    #[test]
    fn test_scan_fragments_empty_input() {
        let reader = std::io::Cursor::new("");
        let (completed, sink) = scan_fragments(reader, Collected::default(), false).unwrap();
        assert_eq!(completed, 0);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn test_scan_fragments_unfinished_at_eof() {
        let reader = std::io::Cursor::new("PART1OF2:AA\n");
        let err = scan_fragments(reader, Collected::default(), false).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
