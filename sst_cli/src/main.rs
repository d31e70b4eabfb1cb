use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use sst_core::format::{DEFAULT_BLOCK_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_ZSTD_LEVEL};
use sst_core::{CompressionKind, TableBuilder, TableOptions, TableReader};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "sstc",
    about = "Build, inspect, and read compressed sorted-table block files",
    version
)]
struct Cli {
    /// Log block-level detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a file into blocks and build a table from them
    Build {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination table file
        output: PathBuf,
        /// Block compression: none | lz4 | zstd
        #[arg(short, long, default_value = "lz4")]
        compression: String,
        /// Zstd compression level (1–22, only used with --compression zstd)
        #[arg(long, default_value_t = DEFAULT_ZSTD_LEVEL)]
        zstd_level: i32,
        /// Raw bytes per block
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Page size of the in-memory build buffer
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
    /// Print footer metadata and block index statistics
    Inspect {
        /// Table file to inspect
        file: PathBuf,
        /// Print per-block details
        #[arg(long)]
        blocks: bool,
    },
    /// Decompress a single block by index
    ReadBlock {
        /// Table file
        file: PathBuf,
        /// Zero-based block index to read
        #[arg(short, long)]
        index: usize,
        /// Write raw bytes to a file instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decompress every block back into the original byte stream
    Dump {
        /// Table file
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Time reads of randomly chosen blocks
    Bench {
        /// Table file
        file: PathBuf,
        /// Number of random blocks to read
        #[arg(short, long, default_value_t = 1000)]
        count: u64,
        /// Fixed random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn load_table(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading table file {:?}", path))
}

/// Feed `src` to the builder in `block_size` chunks. Returns raw bytes read.
fn add_blocks(builder: &mut TableBuilder, src: &mut dyn Read, block_size: usize) -> anyhow::Result<u64> {
    let mut block = vec![0u8; block_size];
    let mut total = 0u64;
    loop {
        // Fill a whole block unless the input ends first.
        let mut filled = 0;
        while filled < block_size {
            let n = src.read(&mut block[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        builder.add_block(&block[..filled])?;
        total += filled as u64;
        if filled < block_size {
            break;
        }
    }
    Ok(total)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_build(
    input: PathBuf,
    output: PathBuf,
    compression: &str,
    zstd_level: i32,
    block_size: usize,
    page_size: usize,
) -> anyhow::Result<()> {
    if block_size == 0 || page_size == 0 {
        anyhow::bail!("--block-size and --page-size must be positive");
    }
    let kind: CompressionKind = compression.parse()?;
    if !kind.is_available() {
        anyhow::bail!("compression '{}' is not available in this build", kind);
    }
    let options = TableOptions::default()
        .with_compression(kind)
        .with_zstd_level(zstd_level)
        .with_page_size(page_size);
    let mut builder = TableBuilder::new(&options);

    let t0 = Instant::now();
    let bytes_read = if input.to_str() == Some("-") {
        let stdin = io::stdin();
        let mut src = stdin.lock();
        add_blocks(&mut builder, &mut src, block_size)?
    } else {
        let file = File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
        let mut src = BufReader::new(file);
        add_blocks(&mut builder, &mut src, block_size)?
    };

    let file =
        File::create(&output).with_context(|| format!("creating output file {:?}", output))?;
    let mut dst = BufWriter::new(file);
    let footer = builder.write_table(&mut dst)?;
    dst.flush()?;
    let elapsed = t0.elapsed();

    let table_size = std::fs::metadata(&output)?.len();
    let ratio = if table_size == 0 {
        1.0
    } else {
        bytes_read as f64 / table_size as f64
    };

    eprintln!("  compression : {}", footer.kind);
    eprintln!("  block size  : {}", human_bytes(block_size as u64));
    eprintln!("  blocks      : {}", footer.block_count);
    eprintln!("  raw size    : {}", human_bytes(bytes_read));
    eprintln!("  table size  : {}", human_bytes(table_size));
    eprintln!("  ratio       : {:.2}x", ratio);
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((bytes_read as f64 / elapsed.as_secs_f64()) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_blocks: bool) -> anyhow::Result<()> {
    let table = load_table(&file)?;
    let reader = TableReader::open(&table)?;

    println!("=== Table: {:?} ===", file);
    println!();
    println!("  compression    : {} (id={})", reader.kind(), reader.kind().id());
    println!("  available      : {}", reader.kind().is_available());
    println!("  block count    : {}", reader.block_count());
    println!("  raw size       : {}", human_bytes(reader.raw_size()));
    println!("  compressed     : {}", human_bytes(reader.compressed_size()));
    println!("  file on disk   : {}", human_bytes(table.len() as u64));
    println!("  ratio          : {:.2}x", reader.ratio());

    if show_blocks {
        println!();
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>16}",
            "block", "offset", "compressed", "raw", "checksum"
        );
        println!("  {}", "-".repeat(66));
        for (i, h) in reader.handles().iter().enumerate() {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {:016x}",
                i,
                h.offset,
                human_bytes(h.compressed_len as u64),
                human_bytes(h.raw_len as u64),
                h.checksum
            );
        }
    }

    Ok(())
}

fn run_read_block(file: PathBuf, index: usize, output: Option<PathBuf>) -> anyhow::Result<()> {
    let table = load_table(&file)?;
    let reader = TableReader::open(&table)?;

    let t0 = Instant::now();
    let raw = reader
        .read_block(index)
        .with_context(|| format!("reading block {}", index))?;
    let elapsed = t0.elapsed();

    eprintln!(
        "  decoded {} in {:.3}ms",
        human_bytes(raw.len() as u64),
        elapsed.as_secs_f64() * 1000.0
    );

    match output {
        Some(path) => {
            std::fs::write(&path, &raw)?;
            eprintln!("  written to {:?}", path);
        }
        None => {
            let preview = &raw[..raw.len().min(256)];
            println!("--- block {} ({} bytes, first {} shown) ---", index, raw.len(), preview.len());
            for (i, chunk) in preview.chunks(16).enumerate() {
                print!("  {:04x}  ", i * 16);
                for b in chunk {
                    print!("{:02x} ", b);
                }
                for _ in chunk.len()..16 {
                    print!("   ");
                }
                print!("  |");
                for b in chunk {
                    if b.is_ascii_graphic() || *b == b' ' {
                        print!("{}", *b as char);
                    } else {
                        print!(".");
                    }
                }
                println!("|");
            }
            if raw.len() > 256 {
                println!("  ... ({} bytes remaining not shown)", raw.len() - 256);
            }
        }
    }

    Ok(())
}

fn run_dump(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let table = load_table(&input)?;
    let reader = TableReader::open(&table)?;

    let mut dst: Box<dyn Write> = if output.to_str() == Some("-") {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(
            File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
        ))
    };

    let t0 = Instant::now();
    let mut total_raw = 0u64;
    for idx in 0..reader.block_count() {
        let block = reader.read_block(idx)?;
        total_raw += block.len() as u64;
        dst.write_all(&block)?;
    }
    dst.flush()?;

    let elapsed = t0.elapsed();
    eprintln!("  blocks      : {}", reader.block_count());
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_bench(file: PathBuf, count: u64, seed: u64) -> anyhow::Result<()> {
    let table = load_table(&file)?;
    let reader = TableReader::open(&table)?;
    let block_count = reader.block_count() as u64;

    if block_count == 0 {
        anyhow::bail!("table has no blocks");
    }
    if count == 0 {
        anyhow::bail!("--count must be positive");
    }

    let indices: Vec<usize> = {
        let mut rng = seed;
        (0..count)
            .map(|_| {
                rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((rng >> 33) % block_count) as usize
            })
            .collect()
    };

    info!(count, block_count, "benchmarking random block reads");

    let t0 = Instant::now();
    let mut total_raw = 0u64;
    let mut latencies_us: Vec<u64> = Vec::with_capacity(indices.len());
    for &idx in &indices {
        let t = Instant::now();
        let block = reader.read_block(idx)?;
        latencies_us.push(t.elapsed().as_micros() as u64);
        total_raw += block.len() as u64;
    }
    let elapsed = t0.elapsed();
    latencies_us.sort_unstable();

    let pct = |p: f64| latencies_us[((latencies_us.len() as f64 * p) as usize).min(latencies_us.len() - 1)];

    println!();
    println!("=== Random Block Read Benchmark ===");
    println!("  blocks read : {}", count);
    println!("  total raw   : {}", human_bytes(total_raw));
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    println!(
        "  throughput  : {}/s",
        human_bytes((total_raw as f64 / elapsed.as_secs_f64()) as u64)
    );
    println!("  latency:");
    println!("    min  : {} µs", latencies_us[0]);
    println!("    p50  : {} µs", pct(0.50));
    println!("    p95  : {} µs", pct(0.95));
    println!("    p99  : {} µs", pct(0.99));
    println!("    max  : {} µs", latencies_us[latencies_us.len() - 1]);

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Build {
            input,
            output,
            compression,
            zstd_level,
            block_size,
            page_size,
        } => run_build(input, output, &compression, zstd_level, block_size, page_size),
        Commands::Inspect { file, blocks } => run_inspect(file, blocks),
        Commands::ReadBlock {
            file,
            index,
            output,
        } => run_read_block(file, index, output),
        Commands::Dump { input, output } => run_dump(input, output),
        Commands::Bench { file, count, seed } => run_bench(file, count, seed),
    }
}
