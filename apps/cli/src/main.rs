// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! batchplan - extract 2D floor plans from building models

use anyhow::{Context, Result};
use batchplan_processing::{OutputFormat, Pipeline, PipelineConfig, RunReport, StyleName};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// Artifact to produce per storey
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Formatter {
    /// Rendered PNG floor plan
    Image,
    /// CSV of WKT polygons
    Wkt,
}

impl From<Formatter> for OutputFormat {
    fn from(f: Formatter) -> Self {
        match f {
            Formatter::Image => OutputFormat::Image,
            Formatter::Wkt => OutputFormat::Wkt,
        }
    }
}

/// Drawing style for image output
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Style {
    Professional,
    Minimal,
    Colorful,
    Technical,
}

impl From<Style> for StyleName {
    fn from(s: Style) -> Self {
        match s {
            Style::Professional => StyleName::Professional,
            Style::Minimal => StyleName::Minimal,
            Style::Colorful => StyleName::Colorful,
            Style::Technical => StyleName::Technical,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "batchplan", version, about = "Extract 2D floor plans from building models")]
struct Args {
    /// Building model files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Outputs to produce, comma separated
    #[arg(long, value_enum, value_delimiter = ',', default_value = "wkt")]
    formatter: Vec<Formatter>,

    #[arg(long, value_enum, default_value_t = Style::Professional)]
    style: Style,

    /// Image width in pixels
    #[arg(long, default_value_t = 2048, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 2048, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Maximum elements sliced per storey
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_elements: Option<u64>,

    /// Slice height above storey elevation in metres [env: BATCHPLAN_SLICE_OFFSET, default 1.5]
    #[arg(long)]
    slice_offset: Option<f64>,

    /// Distance at which segment endpoints are the same vertex (m)
    #[arg(long)]
    merge_tolerance: Option<f64>,

    /// Largest gap closed when stitching open chains (m)
    #[arg(long)]
    gap_tolerance: Option<f64>,

    /// Vertex removal threshold for simplification (m)
    #[arg(long)]
    simplify_tolerance: Option<f64>,

    /// Worker threads [env: BATCHPLAN_WORKERS, default: CPU count]
    #[arg(long)]
    workers: Option<usize>,

    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Flags layered over environment defaults
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        config.output_dir = self.output.clone();
        config.formats = self.formatter.iter().map(|&f| f.into()).collect();
        config.formats.sort();
        config.formats.dedup();
        config.style = self.style.into();
        config.width = self.width;
        config.height = self.height;
        config.max_elements = self.max_elements.map(|n| n as usize);
        if let Some(offset) = self.slice_offset {
            config.slice_offset = offset;
        }
        if let Some(tolerance) = self.merge_tolerance {
            config.merge_tolerance = tolerance;
        }
        if let Some(tolerance) = self.gap_tolerance {
            config.gap_tolerance = tolerance;
        }
        if let Some(tolerance) = self.simplify_tolerance {
            config.simplify_tolerance = tolerance;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config
    }

    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_filter().into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = args.config();
    if let Err(e) = config.validate() {
        eprintln!("error: {}", e);
        return ExitCode::from(2);
    }

    match run(config, &args.inputs) {
        Ok(report) => {
            println!("{}", report.summary());
            if report.outputs_produced() > 0 {
                ExitCode::SUCCESS
            } else {
                eprintln!("error: no floor plans generated");
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(config: PipelineConfig, inputs: &[PathBuf]) -> Result<RunReport> {
    tracing::info!(
        inputs = inputs.len(),
        output = %config.output_dir.display(),
        style = %config.style,
        workers = config.workers,
        slice_offset = config.slice_offset,
        "Starting batch"
    );

    let output_dir = config.output_dir.clone();
    let pipeline = Pipeline::new(config).context("failed to start pipeline")?;
    let report = pipeline.run(inputs);

    let report_path = output_dir.join("report.json");
    let written = std::fs::create_dir_all(&output_dir)
        .map_err(anyhow::Error::from)
        .and_then(|()| report.write_json(&report_path).map_err(anyhow::Error::from));
    if let Err(e) = written {
        tracing::warn!(path = %report_path.display(), error = %e, "Could not write run report");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["batchplan", "a.json"]).unwrap();
        let config = args.config();
        assert_eq!(config.formats, [OutputFormat::Wkt]);
        assert_eq!(config.style, StyleName::Professional);
        assert_eq!((config.width, config.height), (2048, 2048));
        assert_eq!(config.max_elements, None);
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn test_formatter_list() {
        let args =
            Args::try_parse_from(["batchplan", "a.json", "--formatter", "wkt,image,wkt"]).unwrap();
        assert_eq!(args.config().formats, [OutputFormat::Image, OutputFormat::Wkt]);
    }

    #[test]
    fn test_usage_errors() {
        assert!(Args::try_parse_from(["batchplan"]).is_err());
        assert!(Args::try_parse_from(["batchplan", "a.json", "--width", "0"]).is_err());
        assert!(Args::try_parse_from(["batchplan", "a.json", "--style", "fancy"]).is_err());
        assert!(Args::try_parse_from(["batchplan", "a.json", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_tolerance_relation_is_checked() {
        let args = Args::try_parse_from([
            "batchplan",
            "a.json",
            "--merge-tolerance",
            "0.5",
            "--gap-tolerance",
            "0.1",
        ])
        .unwrap();
        assert!(args.config().validate().is_err());
    }
}
