//! Command-line interface for the content-stream redaction engine
//!
//! Modes: redact (commit), mark (translucent highlight), preview
//! (compute-only location report). Patterns are regular expressions
//! matched against each page's extracted text.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{value_parser, Arg, ArgAction, Command, ValueEnum};
use lopdf::Document;
use tracing::{error, info};

use pdfsweep::{
    AutoSweep, Color, CompositeCleanupStrategy, RegexCleanupStrategy, Result, SweepReport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Remove matched content and paint the regions opaquely (default)
    Redact,
    /// Keep content, draw a translucent overlay over each region
    Mark,
    /// Compute locations only, leave the document untouched
    Preview,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FillColor {
    Black,
    White,
    Red,
    Green,
    Blue,
}

impl From<FillColor> for Color {
    fn from(fill: FillColor) -> Self {
        match fill {
            FillColor::Black => Color::black(),
            FillColor::White => Color::Gray(1.0),
            FillColor::Red => Color::Rgb(1.0, 0.0, 0.0),
            FillColor::Green => Color::green(),
            FillColor::Blue => Color::Rgb(0.0, 0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() {
    let matches = build_cli().get_matches();

    let level = matches.get_one::<LogLevel>("verbose").unwrap_or(&LogLevel::Info);
    init_logging(level);

    let mode = *matches.get_one::<Mode>("mode").unwrap_or(&Mode::Redact);
    let input = matches.get_one::<String>("input").unwrap();

    if !PathBuf::from(input).exists() {
        error!("input file does not exist: {}", input);
        process::exit(1);
    }
    if mode != Mode::Preview && matches.get_one::<String>("output").is_none() {
        error!("--output is required for mode {:?}", mode);
        process::exit(1);
    }

    if let Err(e) = run(&matches, mode) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches, mode: Mode) -> Result<()> {
    let input = matches.get_one::<String>("input").unwrap();
    let page = matches.get_one::<u32>("page").copied();
    let color: Option<Color> = matches.get_one::<FillColor>("color").map(|&c| c.into());

    let mut composite = CompositeCleanupStrategy::new();
    for pattern in matches.get_many::<String>("pattern").unwrap() {
        let mut strategy = RegexCleanupStrategy::new(pattern)?;
        if let Some(c) = color {
            strategy = strategy.with_color(c);
        }
        composite.add(Box::new(strategy));
    }
    let sweep = AutoSweep::new(composite);

    let mut doc = Document::load(input)?;
    let report = match (mode, page) {
        (Mode::Preview, Some(n)) => sweep.get_cleanup_locations(&doc, n)?,
        (Mode::Preview, None) => sweep.tentative_clean_up(&doc)?,
        (Mode::Redact, Some(n)) => sweep.clean_up_page(&mut doc, n)?,
        (Mode::Redact, None) => sweep.clean_up(&mut doc)?,
        (Mode::Mark, Some(n)) => sweep.highlight_page(&mut doc, n)?,
        (Mode::Mark, None) => sweep.highlight(&mut doc)?,
    };

    if mode != Mode::Preview {
        let output = matches.get_one::<String>("output").unwrap();
        if !matches.get_flag("no-compress") {
            doc.compress();
        }
        doc.save(output)?;
        info!(
            locations = report.locations.len(),
            warnings = report.warnings.total(),
            "wrote {}",
            output
        );
    }

    emit_report(matches, mode, &report)?;
    Ok(())
}

fn emit_report(matches: &clap::ArgMatches, mode: Mode, report: &SweepReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match matches.get_one::<String>("report") {
        Some(path) => {
            fs::write(path, json)?;
            info!("report written to {}", path);
        }
        None if mode == Mode::Preview => println!("{}", json),
        None => {}
    }
    Ok(())
}

fn build_cli() -> Command {
    Command::new("pdfsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Locate and obscure sensitive content in PDF page streams")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input PDF file path")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output PDF file path (redact and mark modes)"),
        )
        .arg(
            Arg::new("pattern")
                .short('p')
                .long("pattern")
                .value_name("REGEX")
                .help("Pattern to redact; may be given multiple times")
                .action(ArgAction::Append)
                .required(true),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_parser(value_parser!(Mode))
                .help("Execution mode"),
        )
        .arg(
            Arg::new("page")
                .long("page")
                .value_name("N")
                .value_parser(value_parser!(u32))
                .help("Restrict processing to one page (1-based)"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_parser(value_parser!(FillColor))
                .help("Redaction fill color (default black)"),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FILE")
                .help("Write the location report as JSON"),
        )
        .arg(
            Arg::new("no-compress")
                .long("no-compress")
                .action(ArgAction::SetTrue)
                .help("Leave rewritten streams uncompressed for inspection"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_parser(value_parser!(LogLevel))
                .help("Log verbosity"),
        )
}

fn init_logging(level: &LogLevel) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter_level = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("pdfsweep={}", filter_level)))
        .with_target(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialized");
    }
}
