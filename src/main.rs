use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use stocktally::model::{GroupOrder, SnapshotLayout};
use stocktally::{Result, ToolError, aggregate, batch};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    match cli.command {
        Command::Analyze(args) => execute_analyze(args),
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(ToolError::MissingInput(input.clone()));
        }
    }

    let layout = SnapshotLayout::from(args.layout);
    let order = args
        .group_order
        .map(GroupOrder::from)
        .unwrap_or_else(|| GroupOrder::default_for(layout));

    let batch = batch::load_batch(&args.inputs, layout);

    for issue in &batch.diagnostics {
        warn!(
            file = %issue.file,
            cell = %issue.cell,
            value = issue.value.as_deref().unwrap_or("no data"),
            "{}", issue.description
        );
    }

    if batch.is_empty() {
        return Err(ToolError::EmptyBatch);
    }

    let output = args.output.unwrap_or_else(default_report_name);
    let totals = batch::export_report(&output, &batch, layout, order)?;

    if let Some(errors_path) = &args.errors {
        batch::export_diagnostics(errors_path, &batch)?;
    }

    match args.report {
        ReportFormat::Text => {
            println!(
                "Totals: quantity = {}, purchase value = {:.2}, sale value = {:.2}",
                totals.quantity, totals.purchase_price, totals.sale_price
            );
            println!("Report written to {}", output.display());
        }
        ReportFormat::Json => {
            let summary = aggregate::summarize(&batch.records, order);
            let report = serde_json::json!({
                "files": args.inputs.len(),
                "records": batch.records.len(),
                "totals": totals,
                "summary": summary,
                "diagnostics": batch.diagnostics,
                "failures": batch.failures,
                "output": output.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn default_report_name() -> PathBuf {
    let today = Local::now().format("%Y-%m-%d");
    PathBuf::from(format!("stock_report_{today}.xlsx"))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Aggregate inventory snapshot workbooks into detail and summary reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest snapshot workbooks and export the analysis report.
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Snapshot workbook to ingest. Repeat the flag for multiple files.
    #[arg(long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Report destination. Defaults to a date-stamped name in the working
    /// directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also export the collected diagnostics to this workbook.
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Column layout of the snapshot files.
    #[arg(long, value_enum, default_value = "plain")]
    layout: LayoutKind,

    /// Sort order for summary rows. Defaults to the layout's historical order.
    #[arg(long, value_enum)]
    group_order: Option<GroupOrderKind>,

    /// Report format printed to stdout.
    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutKind {
    Plain,
    Categorized,
}

impl From<LayoutKind> for SnapshotLayout {
    fn from(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Plain => SnapshotLayout::Plain,
            LayoutKind::Categorized => SnapshotLayout::Categorized,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GroupOrderKind {
    IndexSizeProduct,
    ProductCategoryIndexSize,
}

impl From<GroupOrderKind> for GroupOrder {
    fn from(kind: GroupOrderKind) -> Self {
        match kind {
            GroupOrderKind::IndexSizeProduct => GroupOrder::IndexSizeProduct,
            GroupOrderKind::ProductCategoryIndexSize => GroupOrder::ProductCategoryIndexSize,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}
