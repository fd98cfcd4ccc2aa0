//! DDR4/DDR5 command bus decoder CLI.
//!
//! This binary is the entry point for decoding logic-analyzer captures. It provides:
//! 1. **Decode:** Decode trace files or directories in parallel; write one decoded stream per
//!    file and print a summary.
//! 2. **Registry:** Validate and print the command truth table of a protocol.
//! 3. **Bounds:** Print activation and refresh upper bounds for a record length.

use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dramscope_core::analysis::Bounds;
use dramscope_core::batch::{self, BatchDecoder, BatchJob};
use dramscope_core::config::{Config, DimmConfig};
use dramscope_core::protocol::{AddressingMode, CommandTemplate, Protocol, Registry};

#[derive(Parser, Debug)]
#[command(
    name = "dramscope",
    author,
    version,
    about = "DDR4/DDR5 command bus decoder",
    long_about = "Decode DRAM commands from per-cycle command/address bus captures.\n\nExamples:\n  dramscope decode traces/\n  dramscope decode --ddr4 --1n capture.csv\n  dramscope decode --dimm dimm.json --summary-json summary.json traces/\n  dramscope registry\n  dramscope bounds --record-sec 0.064 --fgr"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Without it, RUST_LOG applies.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode trace files (or every .csv file of a directory).
    Decode {
        /// Trace files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Full configuration file (JSON); flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// DIMM configuration file (JSON).
        #[arg(long)]
        dimm: Option<PathBuf>,

        /// Decode DDR4 instead of DDR5.
        #[arg(long)]
        ddr4: bool,

        /// 1N addressing mode (second cycle one tick after the first).
        #[arg(long = "1n")]
        one_n: bool,

        /// The DIMM supports fine granularity refresh.
        #[arg(long)]
        fgr: bool,

        /// Worker threads (0 = one per core).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory for decoded streams (default: next to each input).
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Decode again even if the decoded stream already exists.
        #[arg(short, long)]
        force: bool,

        /// Write the batch summary as JSON to this file.
        #[arg(long)]
        summary_json: Option<PathBuf>,

        /// Statistics sections to print (commands, activations, top).
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Number of addresses in the "top" statistics section.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Validate and print the command truth table.
    Registry {
        /// Print the DDR4 table instead of DDR5.
        #[arg(long)]
        ddr4: bool,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print activation and refresh upper bounds for a record window.
    Bounds {
        /// Record length in seconds.
        #[arg(long)]
        record_sec: f64,

        /// DIMM configuration file (JSON).
        #[arg(long)]
        dimm: Option<PathBuf>,

        /// The DIMM supports fine granularity refresh.
        #[arg(long)]
        fgr: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Decode {
            paths,
            config,
            dimm,
            ddr4,
            one_n,
            fgr,
            workers,
            out_dir,
            force,
            summary_json,
            stats,
            top,
        } => {
            let mut config = config.as_deref().map_or_else(Config::default, load_config);
            if let Some(path) = dimm {
                config.dimm = load_dimm(&path);
            }
            if ddr4 {
                config.decoder.protocol = Protocol::Ddr4;
            }
            if one_n {
                config.decoder.addressing = AddressingMode::OneN;
            }
            if fgr {
                config.dimm.fgr = true;
            }
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            cmd_decode(
                &config,
                &paths,
                out_dir.as_deref(),
                force,
                summary_json.as_deref(),
                &stats,
                top,
            )
        }
        Commands::Registry { ddr4, json } => {
            cmd_registry(if ddr4 { Protocol::Ddr4 } else { Protocol::Ddr5 }, json)
        }
        Commands::Bounds {
            record_sec,
            dimm,
            fgr,
        } => {
            let mut dimm = dimm.as_deref().map_or_else(DimmConfig::default, load_dimm);
            if fgr {
                dimm.fgr = true;
            }
            cmd_bounds(record_sec, &dimm)
        }
    };
    process::exit(code);
}

/// Installs the stderr log subscriber. `-v` flags take precedence over `RUST_LOG`.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_or_exit(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        process::exit(1);
    })
}

fn load_config(path: &Path) -> Config {
    Config::from_json(&read_or_exit(path)).unwrap_or_else(|e| {
        eprintln!("Error in {}: {e}", path.display());
        process::exit(1);
    })
}

fn load_dimm(path: &Path) -> DimmConfig {
    let dimm: DimmConfig = serde_json::from_str(&read_or_exit(path)).unwrap_or_else(|e| {
        eprintln!("Error in {}: {e}", path.display());
        process::exit(1);
    });
    if let Err(e) = dimm.validate() {
        eprintln!("Error in {}: {e}", path.display());
        process::exit(1);
    }
    dimm
}

fn build_registry(protocol: Protocol) -> Registry {
    Registry::for_protocol(protocol).unwrap_or_else(|e| {
        eprintln!("Error: {protocol} command table is inconsistent: {e}");
        process::exit(2);
    })
}

/// Decodes every input and prints a per-file summary.
///
/// Returns 0 if every file decoded, 1 if at least one file was abandoned.
fn cmd_decode(
    config: &Config,
    paths: &[PathBuf],
    out_dir: Option<&Path>,
    force: bool,
    summary_json: Option<&Path>,
    stats: &[String],
    top: usize,
) -> i32 {
    let registry = build_registry(config.decoder.protocol);
    let decoder = match BatchDecoder::new(&registry, config) {
        Ok(decoder) => decoder,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let inputs = match batch::discover(paths) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    if let Some(dir) = out_dir {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Error creating {}: {e}", dir.display());
            return 1;
        }
    }

    let jobs: Vec<BatchJob> = inputs
        .into_iter()
        .map(|input| BatchJob::new(input, out_dir))
        .filter(|job| {
            let done = !force && job.output.as_deref().is_some_and(Path::exists);
            if done {
                info!(file = %job.input.display(), "already decoded, skipping (use --force)");
            }
            !done
        })
        .collect();
    if jobs.is_empty() {
        warn!("nothing to decode");
        return 0;
    }

    let run = match decoder.run(&jobs) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let summary = run.summary();

    println!(
        "{:<40} {:>9} {:>8} {:>10} {:>10} {:>8}",
        "file", "decoded", "unknown", "unresolved", "suppressed", "glitches"
    );
    for file in &summary.files {
        match &file.error {
            None => println!(
                "{:<40} {:>9} {:>8} {:>10} {:>10} {:>8}",
                file.file, file.decoded, file.unknown, file.unresolved, file.suppressed, file.glitches
            ),
            Some(error) => println!("{:<40} FAILED: {error}", file.file),
        }
    }
    if !stats.is_empty() {
        run.merged_stats().print_sections(stats, top);
    }

    if let Some(path) = summary_json {
        let written = serde_json::to_string_pretty(&summary)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("Error writing {}: {e}", path.display());
            return 1;
        }
    }

    i32::from(summary.failed > 0)
}

#[derive(Serialize)]
struct TruthTableRow {
    cmd: &'static str,
    cycle: &'static str,
    requirements: Vec<(&'static str, u8)>,
    fields: Vec<String>,
}

fn truth_table(template: &CommandTemplate) -> Vec<TruthTableRow> {
    let labels: &[&'static str] = if template.is_two_cycle() {
        &["first", "second"]
    } else {
        &["single"]
    };
    template
        .cycles()
        .zip(labels)
        .map(|(cycle, label)| TruthTableRow {
            cmd: template.id.name(),
            cycle: *label,
            requirements: cycle.requirements().iter().map(|(c, v)| (*c, *v)).collect(),
            fields: cycle
                .metadata()
                .iter()
                .map(|bit| format!("{}={}[{}]", bit.column, bit.field, bit.position))
                .collect(),
        })
        .collect()
}

fn cmd_registry(protocol: Protocol, json: bool) -> i32 {
    let registry = build_registry(protocol);
    let rows: Vec<TruthTableRow> = registry.templates().iter().flat_map(truth_table).collect();

    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        }
        return 0;
    }

    println!("{protocol} command table ({} templates, validated)", registry.templates().len());
    for row in &rows {
        let requirements: Vec<String> = row
            .requirements
            .iter()
            .map(|(column, value)| format!("{column}={value}"))
            .collect();
        println!("  {:<10} {:<7} {}", row.cmd, row.cycle, requirements.join(" "));
        if !row.fields.is_empty() {
            println!("  {:<10} {:<7} {}", "", "", row.fields.join(" "));
        }
    }
    0
}

fn cmd_bounds(record_sec: f64, dimm: &DimmConfig) -> i32 {
    let bounds = Bounds::compute(record_sec, dimm);
    let show = |value: Option<f64>| value.map_or_else(|| "-".to_owned(), |v| format!("{:.0} ns", v * 1e9));

    println!("Record length:        {record_sec} s");
    println!("Max ACT per bank:     {}", bounds.max_acts);
    println!(
        "Max REFab:            {:.2} (std) / {:.2} (high temperature)",
        bounds.max_refab_temp_std, bounds.max_refab_temp_high
    );
    println!(
        "Max REFsb:            {:.2} (std) / {:.2} (high temperature)",
        bounds.max_refsb_temp_std, bounds.max_refsb_temp_high
    );
    println!("tRFC:                 {}", show(bounds.t_rfc_sec));
    println!("tRFCsb:               {}", show(bounds.t_rfc_sb_sec));
    0
}
