//! Wave merge CLI
//!
//! Command-line tool for merging longitudinal study waves into one table.

mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use logging::{init_logging, LogConfig, LogFormat};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use wave_core::{
    analyze_missing, assign_waves, detect_waves, export_table, load_dataset, merge, normalize,
    parse_csv, scan_directory, validate_primary_key, wave_from_path, CellValue, Dataset,
    ExportFormat, JoinType, MergeConfig, MergeMode, MergePlan, MergeResult, MissingSummary,
    PlanInput, RowFilter, Table,
};

#[derive(Parser)]
#[command(name = "wave-cli")]
#[command(about = "Longitudinal wave merger", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for wave files and group them by study
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Parse and display a single data file
    Inspect {
        /// Path to CSV/TSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of rows to display
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Check that a primary key exists in every input
    Validate {
        /// Input files (wave taken from the file name, else by position)
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Primary key column
        #[arg(short, long)]
        key: String,
    },

    /// Merge input files into one table
    Merge {
        /// Input files (wave taken from the file name, else by position)
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Primary key column
        #[arg(short, long)]
        key: String,

        /// Wide (one row per case) or long (one row per case and wave)
        #[arg(short, long, value_enum, default_value = "wide")]
        mode: ModeArg,

        /// Join type for wide merges
        #[arg(short, long, value_enum, default_value = "inner")]
        join: JoinArg,

        /// Value to put in missing cells after merging
        #[arg(long)]
        fill: Option<String>,

        /// Drop fully identical rows after merging
        #[arg(long)]
        drop_duplicates: bool,

        /// Keep only cases present in every wave
        #[arg(long)]
        balanced: bool,

        /// Row filter COLUMN=VALUE, applied to every input that has COLUMN
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<RowFilter>,

        /// Output file path (prints a preview when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (defaults to the output file's extension)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Maximum number of rows in the preview
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Summarize missing values in a data file
    Missing {
        /// Path to CSV/TSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Also print the row-by-column missingness matrix
        #[arg(long)]
        matrix: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a merge plan file
    Run {
        /// Path to plan file (JSON)
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Create a merge plan file template
    CreatePlan {
        /// Output path for the plan file
        #[arg(short, long)]
        output: PathBuf,

        /// Input files to include
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Primary key column
        #[arg(short, long)]
        key: String,

        /// Merge mode
        #[arg(short, long, value_enum, default_value = "wide")]
        mode: ModeArg,

        /// Join type for wide merges
        #[arg(short, long, value_enum, default_value = "inner")]
        join: JoinArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Wide,
    Long,
}

impl From<ModeArg> for MergeMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Wide => MergeMode::Wide,
            ModeArg::Long => MergeMode::Long,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum JoinArg {
    Inner,
    Left,
    Right,
    Outer,
}

impl From<JoinArg> for JoinType {
    fn from(arg: JoinArg) -> Self {
        match arg {
            JoinArg::Inner => JoinType::Inner,
            JoinArg::Left => JoinType::Left,
            JoinArg::Right => JoinType::Right,
            JoinArg::Outer => JoinType::Outer,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

fn parse_filter(s: &str) -> Result<RowFilter, String> {
    RowFilter::parse(s).ok_or_else(|| format!("expected COLUMN=VALUE, got '{}'", s))
}

fn main() {
    let cli = Cli::parse();
    init_logging(
        &LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_ansi(std::io::stderr().is_terminal()),
    );

    if let Err(e) = run(cli.command) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> wave_core::Result<()> {
    match command {
        Commands::Scan { root } => cmd_scan(&root),
        Commands::Inspect { file, limit } => cmd_inspect(&file, limit),
        Commands::Validate { input, key } => cmd_validate(&input, &key),
        Commands::Merge {
            input,
            key,
            mode,
            join,
            fill,
            drop_duplicates,
            balanced,
            filter,
            output,
            format,
            limit,
        } => {
            let config = MergeConfig::new(key)
                .with_mode(mode.into())
                .with_join_type(join.into())
                .with_fill_value(fill.as_deref().map(CellValue::parse))
                .with_drop_duplicates(drop_duplicates)
                .with_balanced_panel(balanced);
            let inputs: Vec<PlanInput> = input
                .into_iter()
                .map(|path| PlanInput {
                    path,
                    wave: None,
                    filters: filter.clone(),
                })
                .collect();
            let format = format.map(ExportFormat::from);
            cmd_merge(&inputs, &config, output.as_deref(), format, limit)
        }
        Commands::Missing { file, matrix, json } => cmd_missing(&file, matrix, json),
        Commands::Run { plan } => cmd_run(&plan),
        Commands::CreatePlan {
            output,
            input,
            key,
            mode,
            join,
        } => cmd_create_plan(&output, &input, &key, mode, join),
    }
}

fn cmd_scan(roots: &[PathBuf]) -> wave_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!(
        "Found {} files in {} studies",
        result.total_files,
        result.studies.len()
    );
    println!();

    for study in &result.studies {
        println!("{} ({} files)", study.name, study.members.len());
        for (path, wave) in study.assigned_waves() {
            let detected = study
                .members
                .iter()
                .any(|m| m.path == path && m.wave.is_some());
            let marker = if detected { "" } else { " (assigned)" };
            println!("  wave {}{}: {}", wave, marker, path.display());
        }
    }

    Ok(())
}

fn cmd_inspect(file: &Path, limit: usize) -> wave_core::Result<()> {
    let table = parse_csv(file)?;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();
    print_table(&table, limit);

    Ok(())
}

fn cmd_validate(inputs: &[PathBuf], key: &str) -> wave_core::Result<()> {
    let entries: Vec<PlanInput> = inputs
        .iter()
        .map(|path| PlanInput {
            path: path.clone(),
            wave: None,
            filters: Vec::new(),
        })
        .collect();
    let datasets = load_inputs(&entries)?;
    let validation = validate_primary_key(&datasets, key);

    for ds in &datasets {
        let status = if ds.has_column(key) { "ok" } else { "MISSING" };
        println!("  wave {} ({}): {}", ds.wave, ds.source_name, status);
    }
    println!();

    if validation.ok {
        println!("Primary key '{}' present in all {} datasets", key, datasets.len());
        Ok(())
    } else {
        validation.into_result(key)
    }
}

fn cmd_merge(
    inputs: &[PlanInput],
    config: &MergeConfig,
    output: Option<&Path>,
    format: Option<ExportFormat>,
    limit: usize,
) -> wave_core::Result<()> {
    let datasets = load_inputs(inputs)?;
    let result = merge(&datasets, config)?;

    println!(
        "Merged {} datasets ({:?}): {} rows x {} columns",
        datasets.len(),
        config.mode,
        result.row_count,
        result.column_count
    );
    for warning in &result.warnings {
        println!("Warning: {}", warning);
    }

    match output {
        Some(path) => {
            let format = format.unwrap_or_else(|| ExportFormat::from_path(path));
            export_table(&result.table, path, format)?;
            println!("Exported {} rows to {}", result.row_count, path.display());
        }
        None => {
            println!();
            print_table(&result.table, limit);
        }
    }

    println!();
    print_missing_summary(&result.missing_summary);
    print_result_footer(&result);

    Ok(())
}

fn cmd_missing(file: &Path, show_matrix: bool, json: bool) -> wave_core::Result<()> {
    let table = parse_csv(file)?;
    let report = analyze_missing(&table);

    if json {
        let output = if show_matrix {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string_pretty(&report.summary)?
        };
        println!("{}", output);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!();
    print_missing_summary(&report.summary);

    if show_matrix {
        println!();
        println!("{}", table.column_names().join("\t"));
        for row in &report.matrix {
            let marks: Vec<&str> = row.iter().map(|&m| if m { "X" } else { "." }).collect();
            println!("{}", marks.join("\t"));
        }
    }

    Ok(())
}

fn cmd_run(plan_path: &Path) -> wave_core::Result<()> {
    let plan = MergePlan::load(plan_path)?;

    println!("Running plan with {} inputs", plan.inputs.len());
    println!("Key: {}", plan.config.primary_key);
    println!();

    cmd_merge(
        &plan.inputs,
        &plan.config,
        plan.output.as_deref(),
        Some(plan.format),
        10,
    )
}

fn cmd_create_plan(
    output: &Path,
    inputs: &[PathBuf],
    key: &str,
    mode: ModeArg,
    join: JoinArg,
) -> wave_core::Result<()> {
    let inputs: Vec<PlanInput> = if inputs.is_empty() {
        vec![
            PlanInput {
                path: PathBuf::from("study_w1.csv"),
                wave: None,
                filters: Vec::new(),
            },
            PlanInput {
                path: PathBuf::from("study_w2.csv"),
                wave: None,
                filters: Vec::new(),
            },
        ]
    } else {
        detect_waves(inputs)
            .into_iter()
            .map(|(path, wave)| PlanInput {
                path,
                wave: Some(wave),
                filters: Vec::new(),
            })
            .collect()
    };

    let plan = MergePlan {
        inputs,
        config: MergeConfig::new(key)
            .with_mode(mode.into())
            .with_join_type(join.into()),
        output: Some(PathBuf::from("merged.csv")),
        format: ExportFormat::Csv,
    };

    plan.save(output)?;
    println!("Created plan file: {}", output.display());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  wave-cli run --plan {}", output.display());

    Ok(())
}

/// Load and normalize inputs, giving untagged files the free wave numbers
fn load_inputs(inputs: &[PlanInput]) -> wave_core::Result<Vec<Dataset>> {
    let entries: Vec<(PathBuf, Option<u32>)> = inputs
        .iter()
        .map(|input| {
            let wave = input.wave.or_else(|| wave_from_path(&input.path));
            (input.path.clone(), wave)
        })
        .collect();
    let assigned = assign_waves(&entries);

    let mut datasets = Vec::with_capacity(inputs.len());
    for (input, (path, wave)) in inputs.iter().zip(assigned) {
        let raw = load_dataset(&path, wave)?;
        let dataset = normalize(&raw, &input.filters);
        println!(
            "Loaded wave {} from {} ({} rows)",
            dataset.wave,
            path.display(),
            dataset.row_count()
        );
        datasets.push(dataset);
    }
    Ok(datasets)
}

fn print_table(table: &Table, limit: usize) {
    let header = table.column_names();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    for row in table.rows.iter().take(limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > limit {
        println!("... ({} more rows)", table.row_count() - limit);
    }
}

fn print_missing_summary(summary: &MissingSummary) {
    println!("Missing values:");
    for col in &summary.columns {
        println!("  {:<24} {:>6} ({:.1}%)", col.column, col.count, col.percentage);
    }
}

fn print_result_footer(result: &MergeResult) {
    let total = result.missing_summary.total_missing();
    let cells = result.row_count * result.column_count;
    if cells > 0 {
        println!(
            "Total: {} of {} cells missing ({:.1}%)",
            total,
            cells,
            total as f64 * 100.0 / cells as f64
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_merge_args() {
        let cli = Cli::try_parse_from([
            "wave-cli", "merge", "-i", "a_w1.csv", "-i", "a_w2.csv", "-k", "PID", "--join",
            "outer", "--filter", "Finished=True", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Merge {
                input, join, filter, ..
            } => {
                assert_eq!(input.len(), 2);
                assert_eq!(JoinType::from(join), JoinType::Outer);
                assert_eq!(filter, vec![RowFilter::new("Finished", "True")]);
            }
            _ => panic!("expected merge command"),
        }
    }

    #[test]
    fn test_bad_filter_rejected() {
        assert!(parse_filter("Finished").is_err());
        let args = ["wave-cli", "merge", "-i", "a.csv", "-k", "PID", "--filter", "x"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
