use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use csv::WriterBuilder;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vitals_lib::{
    catalog::Catalog,
    config::{read_config, ViewerConfig},
    io::{catalog as catalog_io, telemetry as telemetry_io},
    player::Autoplay,
    plot::{window_figure, Figure},
    scrub::{ScrubFrame, Scrubber},
    signal::format_hms,
    zones::ZoneBoundaries,
};

#[derive(Parser)]
#[command(
    name = "vitals",
    version,
    about = "Surgical heart-rate telemetry explorer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Zone boundaries for a patient age
    Zones {
        #[arg(long)]
        age: f64,
    },
    /// Per-category counts and mean heart rates from the catalog
    Categories {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        descriptions: Option<PathBuf>,
        /// Keep the catch-all "Others" category in the rollup
        #[arg(long)]
        include_others: bool,
    },
    /// Static details for one case
    CaseInfo {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        case: u32,
    },
    /// Replay playhead positions through one scrub session
    Scrub {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        telemetry: PathBuf,
        #[arg(long)]
        case: u32,
        /// Playhead percent, repeatable; replayed in the order given
        #[arg(long, required = true)]
        percent: Vec<f64>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Drive autoplay from 0 to 100 percent, one frame per tick
    Play {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        telemetry: PathBuf,
        #[arg(long)]
        case: u32,
        #[arg(long, default_value_t = 1.0)]
        step: f64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Render the windowed chart with zone shading to a PNG
    Chart {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        telemetry: PathBuf,
        #[arg(long)]
        case: u32,
        #[arg(long, default_value_t = 100.0)]
        percent: f64,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a synthetic telemetry CSV, optionally with a silent gap
    Simulate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1800)]
        duration_s: u32,
        #[arg(long, default_value_t = 75.0)]
        rate: f64,
        #[arg(long, default_value_t = 3.0)]
        jitter: f64,
        #[arg(long)]
        gap_start: Option<u32>,
        #[arg(long, default_value_t = 90)]
        gap_len: u32,
        /// Emit the gap as present-but-invalid readings instead of
        /// dropping the rows entirely
        #[arg(long)]
        gap_invalid: bool,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Zones { age } => cmd_zones(age)?,
        Commands::Categories {
            catalog,
            descriptions,
            include_others,
        } => cmd_categories(&catalog, descriptions.as_deref(), include_others)?,
        Commands::CaseInfo { catalog, case } => cmd_case_info(&catalog, case)?,
        Commands::Scrub {
            catalog,
            telemetry,
            case,
            percent,
            config,
        } => cmd_scrub(&catalog, &telemetry, case, &percent, config.as_deref())?,
        Commands::Play {
            catalog,
            telemetry,
            case,
            step,
            config,
        } => cmd_play(&catalog, &telemetry, case, step, config.as_deref())?,
        Commands::Chart {
            catalog,
            telemetry,
            case,
            percent,
            out,
            config,
        } => cmd_chart(&catalog, &telemetry, case, percent, &out, config.as_deref())?,
        Commands::Simulate {
            out,
            duration_s,
            rate,
            jitter,
            gap_start,
            gap_len,
            gap_invalid,
            seed,
        } => cmd_simulate(&out, duration_s, rate, jitter, gap_start, gap_len, gap_invalid, seed)?,
    }
    Ok(())
}

/// Compact per-frame line for scripted consumers.
#[derive(Serialize)]
struct FrameSummary {
    percent: f64,
    current_second: u32,
    time: String,
    window_start: u32,
    segments: usize,
    average: Option<f64>,
    is_missing: bool,
    gap_in_render_window: bool,
}

impl FrameSummary {
    fn from_frame(frame: &ScrubFrame) -> Self {
        Self {
            percent: frame.percent,
            current_second: frame.current_second,
            time: format_hms(frame.current_second),
            window_start: frame.window_start,
            segments: frame.segments.len(),
            average: frame.average,
            is_missing: frame.is_missing,
            gap_in_render_window: frame.gap_in_render_window,
        }
    }
}

fn viewer_config(path: Option<&Path>) -> Result<ViewerConfig> {
    match path {
        Some(path) => read_config(path),
        None => Ok(ViewerConfig::default()),
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    catalog_io::read_catalog_csv(path)
}

fn load_scrubber(
    catalog_path: &Path,
    telemetry_path: &Path,
    case: u32,
    config: &ViewerConfig,
) -> Result<Scrubber> {
    let catalog = load_catalog(catalog_path)?;
    let record = catalog
        .find_case(case)
        .ok_or_else(|| anyhow!("case {case} not found in catalog"))?;
    let series = telemetry_io::read_case_csv(telemetry_path, config.channel())?;
    Ok(Scrubber::new(
        series,
        ZoneBoundaries::for_age(record.age),
        config.scrub_config(),
    ))
}

fn cmd_zones(age: f64) -> Result<()> {
    if !age.is_finite() || age < 0.0 {
        anyhow::bail!("age must be a finite non-negative number of years");
    }
    println!("{}", serde_json::to_string(&ZoneBoundaries::for_age(age))?);
    Ok(())
}

fn cmd_categories(
    catalog_path: &Path,
    descriptions: Option<&Path>,
    include_others: bool,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let descriptions = descriptions
        .map(catalog_io::read_descriptions)
        .transpose()?;
    let summaries = catalog.category_summaries(descriptions.as_ref(), include_others);
    println!("{}", serde_json::to_string(&summaries)?);
    Ok(())
}

fn cmd_case_info(catalog_path: &Path, case: u32) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let record = catalog
        .find_case(case)
        .ok_or_else(|| anyhow!("case {case} not found in catalog"))?;
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}

fn cmd_scrub(
    catalog_path: &Path,
    telemetry_path: &Path,
    case: u32,
    percents: &[f64],
    config: Option<&Path>,
) -> Result<()> {
    let config = viewer_config(config)?;
    let mut scrubber = load_scrubber(catalog_path, telemetry_path, case, &config)?;
    for &percent in percents {
        let frame = scrubber.advance_to(percent);
        println!("{}", serde_json::to_string(&FrameSummary::from_frame(&frame))?);
    }
    Ok(())
}

fn cmd_play(
    catalog_path: &Path,
    telemetry_path: &Path,
    case: u32,
    step: f64,
    config: Option<&Path>,
) -> Result<()> {
    let config = viewer_config(config)?;
    let mut scrubber = load_scrubber(catalog_path, telemetry_path, case, &config)?;
    let mut autoplay = Autoplay::new(step);
    autoplay.start(0.0);
    let frame = scrubber.advance_to(0.0);
    println!("{}", serde_json::to_string(&FrameSummary::from_frame(&frame))?);
    while let Some(percent) = autoplay.tick() {
        let frame = scrubber.advance_to(percent);
        println!("{}", serde_json::to_string(&FrameSummary::from_frame(&frame))?);
    }
    Ok(())
}

fn cmd_chart(
    catalog_path: &Path,
    telemetry_path: &Path,
    case: u32,
    percent: f64,
    out: &Path,
    config: Option<&Path>,
) -> Result<()> {
    let config = viewer_config(config)?;
    let mut scrubber = load_scrubber(catalog_path, telemetry_path, case, &config)?;
    let frame = scrubber.advance_to(percent);
    let mut figure = window_figure(&frame, &config.palette);
    figure.title = Some(format!(
        "Case {case} at {} ({}%)",
        format_hms(frame.current_second),
        frame.percent.round()
    ));
    draw_png(out, &figure)?;
    Ok(())
}

fn draw_png(path: &Path, figure: &Figure) -> Result<()> {
    use plotters::prelude::*;

    let root = BitMapBackend::new(path, (900, 450)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            figure.title.clone().unwrap_or_else(|| "Heart rate".into()),
            ("sans-serif", 20),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(
            figure.x_domain[0]..figure.x_domain[1],
            figure.y_domain[0]..figure.y_domain[1],
        )?;
    chart
        .configure_mesh()
        .x_label_formatter(&|second: &f64| format_hms(second.max(0.0) as u32))
        .x_desc(figure.x.label.clone().unwrap_or_default())
        .y_desc(figure.y.label.clone().unwrap_or_default())
        .draw()?;

    for band in &figure.bands {
        chart.draw_series(std::iter::once(Rectangle::new(
            [
                (figure.x_domain[0], band.from_rate),
                (figure.x_domain[1], band.to_rate),
            ],
            rgb(band.color.0).mix(0.25).filled(),
        )))?;
    }
    for series in &figure.series {
        chart.draw_series(LineSeries::new(
            series.points.iter().map(|p| (p[0], p[1])),
            rgb(series.style.color.0).stroke_width(series.style.width as u32),
        ))?;
    }
    root.present()?;
    Ok(())
}

fn rgb(color: u32) -> plotters::style::RGBColor {
    plotters::style::RGBColor(
        ((color >> 16) & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        (color & 0xFF) as u8,
    )
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    out: &Path,
    duration_s: u32,
    rate: f64,
    jitter: f64,
    gap_start: Option<u32>,
    gap_len: u32,
    gap_invalid: bool,
    seed: u64,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let gap = gap_start.map(|start| (start, start.saturating_add(gap_len)));
    let mut writer = WriterBuilder::new().from_path(out)?;
    writer.write_record(["Time", telemetry_io::DEFAULT_CHANNEL])?;
    for second in 0..=duration_s {
        let in_gap = gap.map_or(false, |(start, end)| second >= start && second < end);
        if in_gap && !gap_invalid {
            continue;
        }
        let value = if in_gap {
            String::new()
        } else {
            let offset = if jitter > 0.0 {
                rng.gen_range(-jitter..=jitter)
            } else {
                0.0
            };
            format!("{:.1}", rate + offset)
        };
        writer.write_record([second.to_string(), value])?;
    }
    writer.flush()?;
    Ok(())
}
