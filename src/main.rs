//! agenda-json - command-line entry point
//!
//! `convert` turns one Excel/CSV agenda export into `agenda.json`;
//! `visibility` recomputes `regEnabled` in an existing document.

use std::path::PathBuf;
use std::process::ExitCode;

use agenda_json::{
    write_document, AgendaToJsonError, ConverterBuilder, SheetSelector, SourceProfile,
    VisibilityUpdater, DEFAULT_DENY_LIST,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for agenda-json
#[derive(Parser, Debug)]
#[command(name = "agenda-json")]
#[command(about = "Convert conference agenda exports (Excel/CSV) to a normalized JSON schedule")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a workbook or CSV export into a JSON document
    Convert(ConvertArgs),

    /// Recompute regEnabled from session titles in an existing document
    Visibility(VisibilityArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileName {
    /// Named "Agenda" worksheet, header on row 3, fixed column positions
    Agenda,
    /// First worksheet, header on row 3, columns matched by header name
    Workbook,
    /// CSV export, header on the first non-empty line
    Csv,
}

impl ProfileName {
    fn profile(self) -> SourceProfile {
        match self {
            ProfileName::Agenda => SourceProfile::agenda_sheet(),
            ProfileName::Workbook => SourceProfile::workbook(),
            ProfileName::Csv => SourceProfile::csv_export(),
        }
    }
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input workbook (.xlsx, .xlsm, .xls, .ods) or CSV file
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "agenda.json")]
    output: PathBuf,

    /// Built-in source profile (default: chosen from the input extension)
    #[arg(long, value_enum, conflicts_with = "profile_file")]
    profile: Option<ProfileName>,

    /// Load the source profile from a JSON file
    #[arg(long, value_name = "PATH")]
    profile_file: Option<PathBuf>,

    /// Worksheet name (workbooks only)
    #[arg(long)]
    sheet: Option<String>,

    /// Header row number, 1-based as shown in the spreadsheet
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    header_row: Option<u64>,

    /// Value recorded as metadata.source (default: input file name)
    #[arg(long)]
    source_label: Option<String>,

    /// Snap serial date values to the nearest minute
    #[arg(long)]
    round_to_minute: bool,

    /// Offset label appended to start/end timestamps
    #[arg(long, value_name = "OFFSET", allow_hyphen_values = true)]
    offset: Option<String>,
}

#[derive(Args, Debug)]
struct VisibilityArgs {
    /// JSON document to update in place
    #[arg(short, long, default_value = "agenda.json")]
    file: PathBuf,

    /// Title substring that disables a session (repeatable, default: "test")
    #[arg(long = "deny", value_name = "SUBSTR")]
    deny: Vec<String>,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agenda_json=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Convert(args) => convert(args),
        Command::Visibility(args) => visibility(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_profile(args: &ConvertArgs) -> Result<SourceProfile, AgendaToJsonError> {
    if let Some(path) = &args.profile_file {
        return SourceProfile::from_json_file(path);
    }
    Ok(match args.profile {
        Some(name) => name.profile(),
        None => SourceProfile::for_path(&args.input),
    })
}

fn convert(args: ConvertArgs) -> Result<(), AgendaToJsonError> {
    let profile = resolve_profile(&args)?;
    println!(
        "Reading {} (profile '{}')",
        args.input.display(),
        profile.name
    );

    let mut builder = ConverterBuilder::new().with_profile(profile);
    if let Some(sheet) = args.sheet {
        builder = builder.with_sheet_selector(SheetSelector::Name(sheet));
    }
    if let Some(row) = args.header_row {
        builder = builder.with_header_row(Some((row - 1) as usize));
    }
    if let Some(label) = args.source_label {
        builder = builder.with_source_label(label);
    }
    if args.round_to_minute {
        builder = builder.with_round_to_minute(true);
    }
    if let Some(offset) = args.offset {
        builder = builder.with_timestamp_offset(offset);
    }

    let converter = builder.build()?;
    debug!("Converter profile: {:?}", converter.profile());
    let conversion = converter.convert_file(&args.input)?;
    let report = &conversion.report;
    let document = &conversion.document;

    match &report.sheet {
        Some(sheet) => println!("Found {} data rows in sheet '{}'", report.data_rows, sheet),
        None => println!("Found {} data rows", report.data_rows),
    }
    let columns: Vec<&str> = report
        .headers
        .iter()
        .map(String::as_str)
        .filter(|header| !header.is_empty())
        .collect();
    println!("Available columns: {}", columns.join(", "));

    for session in &document.sessions {
        if session.start.is_empty() {
            println!("  ✓ {}", session.title);
        } else {
            println!("  ✓ {} ({})", session.title, session.start);
        }
    }
    if report.skipped_rows > 0 {
        println!("Skipped {} rows without a title", report.skipped_rows);
    }
    if !report.field_failures.is_empty() {
        println!(
            "{} date fields could not be parsed and were left empty",
            report.field_failures.len()
        );
    }

    if let Some(sample) = document.sessions.first() {
        println!("Sample session:\n{}", serde_json::to_string_pretty(sample)?);
    }

    write_document(document, &args.output)?;
    println!(
        "Wrote {} sessions to {}",
        document.metadata.total_sessions,
        args.output.display()
    );
    Ok(())
}

fn visibility(args: VisibilityArgs) -> Result<(), AgendaToJsonError> {
    let updater = if args.deny.is_empty() {
        VisibilityUpdater::new(DEFAULT_DENY_LIST.iter().copied())
    } else {
        VisibilityUpdater::new(&args.deny)
    };

    let report = updater.update_file(&args.file)?;
    for change in &report.changes {
        println!(
            "  {} -> {}: {}",
            change.previous, change.current, change.title
        );
    }
    println!(
        "Updated {}: {} sessions, {} enabled, {} disabled, {} changed",
        args.file.display(),
        report.total,
        report.enabled,
        report.disabled,
        report.changed
    );
    Ok(())
}
