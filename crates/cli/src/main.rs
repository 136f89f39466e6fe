use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seatspend_core::config::Config;
use seatspend_core::engine::{AnalysisEngine, DEFAULT_FORECAST_MONTHS, DEFAULT_TREND_MONTHS};
use seatspend_core::report::AnalysisReport;
use seatspend_core::source::Snapshot;
use seatspend_core::types::{Envelope, Priority};
use seatspend_core::{analyze_dir, resolve_organization, AnalyzeOptions};

#[derive(Parser, Debug)]
#[command(
    name = "seatspend",
    version,
    about = "SaaS license spend and utilization analysis"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Snapshot directory with applications.json, licenses.json and usage exports
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    org: Option<String>,

    /// Anchor date for lookback windows (defaults to today, UTC)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    #[arg(long)]
    strict: bool,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every analysis and write report files
    #[command(alias = "analyse")]
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        months: Option<u32>,

        #[arg(long)]
        forecast_months: Option<u32>,

        #[arg(long)]
        baseline: Option<PathBuf>,

        #[arg(long)]
        budget_ratio: Option<f64>,

        #[arg(long, default_value = "seatspend-out")]
        out: PathBuf,

        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },
    /// Monthly cost totals with month-over-month growth
    Trends {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        months: Option<u32>,
    },
    /// Per-license utilization, highest first
    Utilization {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Savings opportunities, largest first
    Opportunities {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Cost projection for the coming months
    Forecast {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        months: Option<u32>,
    },
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    All,
}

struct Style {
    bold: &'static str,
    dim: &'static str,
    red: &'static str,
    green: &'static str,
    yellow: &'static str,
    cyan: &'static str,
    reset: &'static str,
}

const COLOR: Style = Style {
    bold: "\x1b[1m",
    dim: "\x1b[2m",
    red: "\x1b[31m",
    green: "\x1b[32m",
    yellow: "\x1b[33m",
    cyan: "\x1b[36m",
    reset: "\x1b[0m",
};

const PLAIN: Style = Style {
    bold: "",
    dim: "",
    red: "",
    green: "",
    yellow: "",
    cyan: "",
    reset: "",
};

fn style() -> &'static Style {
    if std::env::var_os("NO_COLOR").is_some() {
        &PLAIN
    } else {
        &COLOR
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let res = match cli.cmd {
        Commands::Analyze {
            source,
            months,
            forecast_months,
            baseline,
            budget_ratio,
            out,
            output_format,
        } => {
            let cfg = load_config(source.config.as_deref());
            let opts = AnalyzeOptions {
                organization_id: source.org.clone().or(cfg.organization_id.clone()),
                as_of: resolve_as_of(source.as_of),
                trend_months: months.or(cfg.trend_months).unwrap_or(DEFAULT_TREND_MONTHS),
                forecast_months: forecast_months
                    .or(cfg.forecast_months)
                    .unwrap_or(DEFAULT_FORECAST_MONTHS),
                strict: source.strict || cfg.strict.unwrap_or(false),
                baseline_path: baseline,
                budget_ratio: budget_ratio.or(cfg.budget_ratio),
                ..AnalyzeOptions::default()
            };
            run_analyze(&source.input, opts, &out, &output_format)
        }
        Commands::Trends { source, months } => run_endpoint(&source, |engine, org, cfg| {
            let months = months.or(cfg.trend_months).unwrap_or(DEFAULT_TREND_MONTHS);
            print_envelope(&engine.analyze_cost_trends(org, months)?)
        }),
        Commands::Utilization { source } => run_endpoint(&source, |engine, org, _| {
            print_envelope(&engine.analyze_license_utilization(org)?)
        }),
        Commands::Opportunities { source } => run_endpoint(&source, |engine, org, _| {
            print_envelope(&engine.identify_savings_opportunities(org)?)
        }),
        Commands::Forecast { source, months } => run_endpoint(&source, |engine, org, cfg| {
            let months = months
                .or(cfg.forecast_months)
                .unwrap_or(DEFAULT_FORECAST_MONTHS);
            print_envelope(&engine.generate_cost_forecast(org, months)?)
        }),
    };

    match res {
        Ok(code) => code,
        Err(e) => {
            let s = style();
            eprintln!(
                "{}{red}error:{reset} {:#}",
                s.bold,
                e,
                red = s.red,
                reset = s.reset
            );
            std::process::ExitCode::from(1)
        }
    }
}

fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(p) => Config::load(p).unwrap_or_else(|e| {
            tracing::warn!(path = %p.display(), error = %e, "failed to load config");
            eprintln!(
                "{}{}warning:{} failed to load config {}: {}",
                style().bold,
                style().yellow,
                style().reset,
                p.display(),
                e
            );
            Config::default()
        }),
        None => Config::discover().unwrap_or_default(),
    }
}

/// Loads the snapshot and hands one endpoint an engine bound to it.
fn run_endpoint<F>(source: &SourceArgs, f: F) -> anyhow::Result<std::process::ExitCode>
where
    F: FnOnce(&AnalysisEngine<&Snapshot>, &str, &Config) -> anyhow::Result<()>,
{
    let cfg = load_config(source.config.as_deref());
    let strict = source.strict || cfg.strict.unwrap_or(false);
    let opts = AnalyzeOptions {
        strict,
        ..AnalyzeOptions::default()
    };

    let snapshot = Snapshot::load_dir(
        &source.input,
        opts.parse_mode(),
        opts.max_total_bytes_scanned,
    )
    .with_context(|| format!("failed to load snapshot at {}", source.input.display()))?;
    let org = resolve_organization(
        &snapshot,
        source.org.as_deref().or(cfg.organization_id.as_deref()),
    )?;

    let engine = AnalysisEngine::new(&snapshot, resolve_as_of(source.as_of));
    f(&engine, &org, &cfg)?;
    Ok(std::process::ExitCode::from(0))
}

fn print_envelope<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&Envelope::ok(data)).context("serialize response")?;
    println!("{json}");
    Ok(())
}

fn print_banner() {
    let s = style();
    eprintln!(
        "\n  {bold}seat{reset}{cyan}|{reset}{dim}spend{reset}  {dim}license spend analysis{reset}\n",
        bold = s.bold,
        cyan = s.cyan,
        dim = s.dim,
        reset = s.reset,
    );
}

fn utilization_color(rate: f64) -> &'static str {
    let s = style();
    if rate < 10.0 {
        s.red
    } else if rate < 50.0 {
        s.yellow
    } else {
        s.green
    }
}

fn priority_color(priority: &Priority) -> &'static str {
    let s = style();
    match priority {
        Priority::High => s.red,
        Priority::Medium => s.yellow,
        Priority::Low => s.dim,
    }
}

fn money(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let (sign, cents) = if cents < 0 { ("-", -cents) } else { ("", cents) };
    let whole = (cents / 100).to_string();
    let bytes = whole.as_bytes();
    let mut result = String::with_capacity(whole.len() + whole.len() / 3 + 4);
    result.push_str(sign);
    result.push('$');
    for (i, &b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(b as char);
    }
    result.push_str(&format!(".{:02}", cents % 100));
    result
}

fn print_report(report: &AnalysisReport, written: &[PathBuf]) {
    let s = style();
    let summary = &report.summary;

    eprintln!(
        "  {dim}organization            {reset}{bold}{}{reset}",
        report.inputs.organization_id,
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );
    eprintln!(
        "  {dim}latest_monthly_cost     {reset}{bold}{}{reset}",
        money(summary.latest_monthly_cost),
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );
    eprintln!(
        "  {dim}average_utilization     {reset}{uc}{bold}{:.1}%{reset}",
        summary.average_utilization,
        dim = s.dim,
        uc = utilization_color(summary.average_utilization),
        bold = s.bold,
        reset = s.reset
    );
    eprintln!(
        "  {dim}potential_savings       {reset}{bold}{}{reset}",
        money(summary.total_potential_savings),
        dim = s.dim,
        bold = s.bold,
        reset = s.reset
    );

    if !report.opportunities.is_empty() {
        eprintln!();
        for o in &report.opportunities {
            eprintln!(
                "  {pc}{:?}{reset}  {}  {dim}{}{reset}",
                o.priority,
                o.title,
                money(o.potential_savings),
                pc = priority_color(&o.priority),
                dim = s.dim,
                reset = s.reset
            );
        }
    }

    eprintln!();
    for path in written {
        eprintln!(
            "  {dim}\u{2192} {}{reset}",
            path.display(),
            dim = s.dim,
            reset = s.reset
        );
    }
    eprintln!();
}

fn run_analyze(
    input: &Path,
    opts: AnalyzeOptions,
    out: &Path,
    output_format: &OutputFormat,
) -> anyhow::Result<std::process::ExitCode> {
    let s = style();

    print_banner();

    let report = analyze_dir(input, opts)?;

    std::fs::create_dir_all(out).with_context(|| format!("create out dir {}", out.display()))?;

    let mut written: Vec<PathBuf> = Vec::new();

    if matches!(output_format, OutputFormat::Json | OutputFormat::All) {
        let json_path = out.join("report.json");
        let json = serde_json::to_vec_pretty(&report).context("serialize report json")?;
        std::fs::write(&json_path, json)
            .with_context(|| format!("write {}", json_path.display()))?;
        written.push(json_path);
    }

    if matches!(output_format, OutputFormat::Markdown | OutputFormat::All) {
        let md_path = out.join("report.md");
        std::fs::write(&md_path, report.to_markdown())
            .with_context(|| format!("write {}", md_path.display()))?;
        written.push(md_path);
    }

    // Machine-parseable line on stdout
    println!(
        "latest_monthly_cost={:.2} potential_savings={:.2} opportunities={}",
        report.summary.latest_monthly_cost,
        report.summary.total_potential_savings,
        report.summary.opportunity_count
    );

    // Human-readable output on stderr
    print_report(&report, &written);

    let exit = match &report.budget {
        Some(b) if !b.pass => {
            eprintln!(
                "  {red}{bold}BUDGET FAILED{reset}  {dim}({:.2}x > {:.2}x budget){reset}",
                report
                    .baseline_comparison
                    .as_ref()
                    .map(|c| c.regression_ratio)
                    .unwrap_or(0.0),
                b.threshold_regression_ratio,
                red = s.red,
                bold = s.bold,
                dim = s.dim,
                reset = s.reset,
            );
            std::process::ExitCode::from(2)
        }
        _ => {
            eprintln!(
                "  {green}{bold}PASS{reset}",
                green = s.green,
                bold = s.bold,
                reset = s.reset
            );
            std::process::ExitCode::from(0)
        }
    };

    eprintln!();

    Ok(exit)
}
