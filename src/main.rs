//! ipfreq CLI
//!
//! Streams a line-delimited log file and prints the top-N most frequent
//! IPv4 addresses found in `ip=<dotted>;` tagged fields, using N parallel
//! workers over line-aligned chunks.
//!
//! # Output Format
//!
//! One entry per line on stdout: `<dotted-ip> | <count>`
//!
//! Statistics are written to stderr upon completion:
//! `bytes=N chunks=N matches=N unique=N elapsed_ms=N throughput_mib_s=N workers=N`
//!
//! # Exit Codes
//!
//! - `0`: Success (including an empty result)
//! - `1`: I/O failure while reading the input
//! - `2`: Invalid arguments

use ipfreq::{count_file, PipelineConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} [OPTIONS] <file>

OPTIONS:
    --workers=<N>       Number of parallel workers (default: auto-detect CPU count)
    --top=<N>           Report the N most frequent addresses (default: 5)
    --chunk-size=<N>    Chunk buffer size in bytes (default: 1 MiB)
    --help, -h          Show this help message",
        exe.to_string_lossy()
    );
}

fn main() -> ExitCode {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "ipfreq".into());
    let mut path: Option<PathBuf> = None;
    let mut config = PipelineConfig::default();

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(value) = flag.strip_prefix("--workers=") {
                let n: usize = match value.parse() {
                    Ok(n) if n >= 1 => n,
                    _ => {
                        eprintln!("invalid --workers value: {}", value);
                        return ExitCode::from(2);
                    }
                };
                config.workers = n;
                config.queue_capacity = n;
                config.pool_buffers = 3 * n;
                continue;
            }
            if let Some(value) = flag.strip_prefix("--top=") {
                match value.parse() {
                    Ok(n) if n >= 1 => config.top_n = n,
                    _ => {
                        eprintln!("invalid --top value: {}", value);
                        return ExitCode::from(2);
                    }
                }
                continue;
            }
            if let Some(value) = flag.strip_prefix("--chunk-size=") {
                match value.parse() {
                    Ok(n) if n >= 1 => config.chunk_size = n,
                    _ => {
                        eprintln!("invalid --chunk-size value: {}", value);
                        return ExitCode::from(2);
                    }
                }
                continue;
            }
            match flag {
                "--help" | "-h" => {
                    print_usage(&exe);
                    return ExitCode::SUCCESS;
                }
                _ if flag.starts_with("--") => {
                    eprintln!("unknown flag: {}", flag);
                    print_usage(&exe);
                    return ExitCode::from(2);
                }
                _ => {}
            }
        }

        if path.is_some() {
            print_usage(&exe);
            return ExitCode::from(2);
        }
        path = Some(PathBuf::from(arg));
    }

    let Some(path) = path else {
        print_usage(&exe);
        return ExitCode::from(2);
    };

    if !path.is_file() {
        eprintln!("not a regular file: {}", path.display());
        return ExitCode::from(2);
    }

    let report = match count_file(&path, &config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error reading {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    if report.entries.is_empty() {
        println!("no ip= tags found (0 entries)");
    } else {
        for entry in &report.entries {
            println!("{} | {}", entry.ip, entry.count);
        }
    }

    let elapsed_secs = report.elapsed.as_secs_f64();
    let throughput_mib = if elapsed_secs > 0.0 {
        (report.bytes_read as f64 / (1024.0 * 1024.0)) / elapsed_secs
    } else {
        0.0
    };
    eprintln!(
        "bytes={} chunks={} matches={} unique={} elapsed_ms={} throughput_mib_s={:.2} workers={}",
        report.bytes_read,
        report.chunks,
        report.total_matches,
        report.unique_ips,
        report.elapsed.as_millis(),
        throughput_mib,
        report.workers
    );

    ExitCode::SUCCESS
}
