use clap::{Parser as ClapParser, Subcommand};
use log::info;
use persian_normalizer::{BatchRunner, NormalizerConfig};
use std::io::{self, BufRead, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(ClapParser)]
#[command(
    author,
    version,
    about = "Normalize informal Persian text read from stdin, one line per item"
)]
struct Cli {
    /// JSON options file; missing fields fall back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize each line as a single word.
    Word,
    /// Normalize each line as a sentence.
    Sentence {
        /// Print one token per line instead of the joined sentence.
        #[arg(long)]
        tokens: bool,
    },
    /// Read all lines, normalize them as one batch.
    Batch {
        /// Emit a JSON array instead of plain lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NormalizerConfig::from_json_file(path)?,
        None => NormalizerConfig::default(),
    };
    let runner = BatchRunner::from_config(&config)?;
    let normalizer = runner.normalizer();

    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    let start_time = Instant::now();

    match cli.command {
        Commands::Word => {
            for line in stdin.lock().lines() {
                writeln!(out, "{}", normalizer.normalize_word(&line?))?;
            }
            let stats = normalizer.cache().stats();
            info!("word cache: {} hits, {} misses", stats.hits, stats.misses);
        }
        Commands::Sentence { tokens } => {
            for line in stdin.lock().lines() {
                let line = line?;
                if tokens {
                    for token in normalizer.tokenize(&line) {
                        writeln!(out, "{}", token)?;
                    }
                } else {
                    writeln!(out, "{}", normalizer.normalize_sentence(&line))?;
                }
            }
        }
        Commands::Batch { json } => {
            let mut raw = Vec::new();
            stdin.lock().read_to_end(&mut raw)?;
            let lines: Vec<&[u8]> = raw
                .split(|&b| b == b'\n')
                .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                .collect();
            let lines = match lines.split_last() {
                Some((last, rest)) if last.is_empty() => rest,
                _ => &lines[..],
            };

            let results = runner.try_normalize_many(lines)?;
            if json {
                serde_json::to_writer(&mut out, &results)?;
                writeln!(out)?;
            } else {
                for r in &results {
                    writeln!(out, "{}", r)?;
                }
            }
            info!(
                "normalized {} lines on {} workers",
                results.len(),
                if runner.is_parallel(results.len()) { runner.workers() } else { 1 }
            );
        }
    }

    out.flush()?;
    info!("done in {:.2?}", start_time.elapsed());
    Ok(())
}
