// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk command-line front end.
//
// Entry point. Initialises logging, parses the command line and runs the
// chosen subcommand against the built-in device simulator.

mod scan;
mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use scanwerk_core::config::ScanConfig;
use scanwerk_core::error::Result;
use scanwerk_core::human_errors::humanize_error;
use scanwerk_core::quirks::QuirkTable;
use scanwerk_core::types::{Compression, ScanMode, Source};
use scanwerk_session::Sheet;

use scan::ScanJob;
use services::data_dir::prepare_output_dir;

#[derive(Parser)]
#[command(name = "scanwerk", version, about = "Document scanner driver: device profiles and simulated scans")]
struct Cli {
    /// Quirk table (JSON) used instead of the built-in one
    #[arg(long, global = true)]
    quirks: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print device profiles as JSON
    Profiles {
        /// Only the profile this product id resolves to
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Scan sheets through a simulated device, one image per side
    Scan(ScanArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Product id the simulated device reports
    #[arg(short, long, default_value = "DR-2580C")]
    model: String,
    /// Settings file (JSON); the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    #[arg(long, value_enum)]
    source: Option<SourceArg>,
    /// Resolution in dpi, both axes
    #[arg(short, long)]
    dpi: Option<u32>,
    /// Ask the device for JPEG frames
    #[arg(long)]
    jpeg: bool,
    /// Sheets in the feeder
    #[arg(short, long, default_value_t = 1)]
    sheets: usize,
    /// 1-based positions of blank sheets, comma separated
    #[arg(long, value_delimiter = ',')]
    blank: Vec<usize>,
    /// Drop sides whose coverage is at most this percentage
    #[arg(long)]
    skip_blank: Option<f64>,
    /// Output directory (default: scanwerk/scans under the XDG data dir)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Lineart,
    Halftone,
    Gray,
    Color,
}

impl From<ModeArg> for ScanMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Lineart => Self::Lineart,
            ModeArg::Halftone => Self::Halftone,
            ModeArg::Gray => Self::Gray,
            ModeArg::Color => Self::Color,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Flatbed,
    AdfFront,
    AdfBack,
    AdfDuplex,
    CardFront,
    CardBack,
    CardDuplex,
}

impl From<SourceArg> for Source {
    fn from(s: SourceArg) -> Self {
        match s {
            SourceArg::Flatbed => Self::Flatbed,
            SourceArg::AdfFront => Self::AdfFront,
            SourceArg::AdfBack => Self::AdfBack,
            SourceArg::AdfDuplex => Self::AdfDuplex,
            SourceArg::CardFront => Self::CardFront,
            SourceArg::CardBack => Self::CardBack,
            SourceArg::CardDuplex => Self::CardDuplex,
        }
    }
}

impl ScanArgs {
    fn into_job(self, quirks: QuirkTable) -> Result<ScanJob> {
        let mut config: ScanConfig = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => ScanConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(source) = self.source {
            config.source = source.into();
        }
        if let Some(dpi) = self.dpi {
            config.dpi_x = dpi;
            config.dpi_y = dpi;
        }
        if self.jpeg {
            config.compression = Compression::Jpeg;
        }
        if let Some(percent) = self.skip_blank {
            config.blank_skip_percent = percent;
        }
        let sheets = (1..=self.sheets)
            .map(|n| {
                if self.blank.contains(&n) {
                    Sheet::Blank
                } else {
                    Sheet::Pattern
                }
            })
            .collect();
        Ok(ScanJob {
            model: self.model,
            config,
            sheets,
            output: prepare_output_dir(self.output.as_deref())?,
            quirks,
        })
    }
}

fn load_quirks(path: Option<&Path>) -> Result<QuirkTable> {
    match path {
        Some(p) => QuirkTable::from_json(&std::fs::read_to_string(p)?),
        None => Ok(QuirkTable::builtin()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let quirks = load_quirks(cli.quirks.as_deref())?;
    match cli.command {
        Commands::Profiles { model } => {
            let json = match model {
                Some(model) => serde_json::to_string_pretty(&quirks.lookup(&model))?,
                None => quirks.to_json()?,
            };
            println!("{json}");
        }
        Commands::Scan(args) => {
            let job = args.into_job(quirks)?;
            let report = scan::run(&job)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "scanwerk failed");
            let human = humanize_error(&e);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let out = tmp.path().join("out");
        let cli = Cli::try_parse_from([
            "scanwerk",
            "scan",
            "--mode",
            "color",
            "--source",
            "adf-duplex",
            "--dpi",
            "200",
            "--sheets",
            "3",
            "--blank",
            "2",
            "-o",
            out.to_str().expect("utf-8 path"),
        ])
        .expect("parse");
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let job = args.into_job(QuirkTable::builtin()).expect("job");
        assert_eq!(job.config.mode, ScanMode::Color);
        assert_eq!(job.config.source, Source::AdfDuplex);
        assert_eq!((job.config.dpi_x, job.config.dpi_y), (200, 200));
        assert_eq!(job.sheets, [Sheet::Pattern, Sheet::Blank, Sheet::Pattern]);
        assert!(out.is_dir());
    }

    #[test]
    fn settings_file_is_the_base() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("cfg.json");
        std::fs::write(&path, r#"{"mode":"Gray","dpi_x":100,"dpi_y":100,"deskew":true}"#)
            .expect("write");
        let cli = Cli::try_parse_from([
            "scanwerk",
            "scan",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--dpi",
            "150",
            "-o",
            tmp.path().to_str().expect("utf-8 path"),
        ])
        .expect("parse");
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let job = args.into_job(QuirkTable::builtin()).expect("job");
        assert_eq!(job.config.mode, ScanMode::Gray);
        assert!(job.config.deskew);
        assert_eq!(job.config.dpi_x, 150);
    }

    #[test]
    fn quirk_override_replaces_table() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("quirks.json");
        std::fs::write(&path, r#"{"profiles":[{"family":"X","model_patterns":["XS-1"]}]}"#)
            .expect("write");
        let table = load_quirks(Some(&path)).expect("load");
        assert_eq!(table.profiles.len(), 1);
        assert_eq!(table.lookup("XS-100").family, "X");
    }
}
