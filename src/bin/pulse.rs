//! Pulse CLI - Command-line interface for Lesson Pulse
//!
//! Commands:
//! - ingest: Apply metric records to a store snapshot
//! - report: Ranked class report for a lesson
//! - patterns: Interaction pattern summary for a lesson
//! - score: Engagement score for one student
//! - grade: Grade a quiz submission
//! - validate: Validate metric records without applying them
//! - config: Print the effective scoring configuration
//! - doctor: Diagnose store and configuration health

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use lesson_pulse::encoder::ReportEncoder;
use lesson_pulse::schema::{QuizSubmission, RecordAdapter};
use lesson_pulse::types::{LessonId, QuizId, StudentId};
use lesson_pulse::{
    ComputeError, EngagementProcessor, InMemoryMetricStore, MetricRecord, ScoringConfig,
    PRODUCER_NAME, PULSE_VERSION,
};
use tracing::{debug, info};

/// Pulse - Engagement and attrition-risk scoring for online lessons
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Score lesson engagement and attrition risk", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply metric records to a store snapshot (created if missing)
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Store snapshot path
        #[arg(short, long)]
        store: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,
    },

    /// Ranked class report for a lesson
    Report {
        #[arg(short, long)]
        store: PathBuf,

        #[arg(short, long)]
        lesson: LessonId,

        /// Scoring config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Interaction pattern summary for a lesson
    Patterns {
        #[arg(short, long)]
        store: PathBuf,

        #[arg(short, long)]
        lesson: LessonId,

        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Engagement score for one student in one lesson
    Score {
        #[arg(short, long)]
        store: PathBuf,

        #[arg(short, long)]
        lesson: LessonId,

        #[arg(long)]
        student: StudentId,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Grade a quiz submission
    Grade {
        #[arg(short, long)]
        store: PathBuf,

        #[arg(short, long)]
        quiz: QuizId,

        /// JSON object of question id -> chosen option (use - for stdin)
        #[arg(short, long)]
        answers: PathBuf,

        /// Record the graded response for this student and save the store
        #[arg(long)]
        student: Option<StudentId>,

        /// Seconds the student took to respond
        #[arg(long, default_value = "0")]
        response_time: u64,

        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate metric records without applying them
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective scoring configuration
    Config {
        /// Scoring config JSON file to merge over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Diagnose store and configuration health
    Doctor {
        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Ingest {
            input,
            store,
            input_format,
        } => cmd_ingest(&input, &store, input_format),

        Commands::Report {
            store,
            lesson,
            config,
            output_format,
        } => {
            let processor = open_processor(&store, config.as_deref())?;
            let report = processor.class_report(lesson)?;
            print_output(&report, &output_format)
        }

        Commands::Patterns {
            store,
            lesson,
            output_format,
        } => {
            let processor = open_processor(&store, None)?;
            let summary = processor.lesson_patterns(lesson)?;
            print_output(&summary, &output_format)
        }

        Commands::Score {
            store,
            lesson,
            student,
            config,
            output_format,
        } => {
            let processor = open_processor(&store, config.as_deref())?;
            let score = processor.student_score(student, lesson)?;
            print_output(&score, &output_format)
        }

        Commands::Grade {
            store,
            quiz,
            answers,
            student,
            response_time,
            output_format,
        } => cmd_grade(&store, quiz, &answers, student, response_time, &output_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", config.to_json()?);
            Ok(())
        }

        Commands::Doctor {
            store,
            config,
            json,
        } => cmd_doctor(store.as_deref(), config.as_deref(), json),
    }
}

fn cmd_ingest(input: &Path, store: &Path, input_format: InputFormat) -> Result<(), PulseCliError> {
    let records = read_records(input, &input_format)?;
    if records.is_empty() {
        return Err(PulseCliError::NoRecords);
    }

    let mut processor = if store.exists() {
        open_processor(store, None)?
    } else {
        info!(path = %store.display(), "creating new store snapshot");
        EngagementProcessor::new()
    };

    let summary = processor.ingest(records)?;
    fs::write(store, processor.save_snapshot()?)?;

    println!(
        "Applied {} records ({} quiz submissions graded)",
        summary.applied, summary.graded_submissions
    );
    Ok(())
}

fn cmd_grade(
    store: &Path,
    quiz_id: QuizId,
    answers: &Path,
    student: Option<StudentId>,
    response_time: u64,
    output_format: &OutputFormat,
) -> Result<(), PulseCliError> {
    let answers: HashMap<String, String> = serde_json::from_str(&read_input(answers)?)?;
    let mut processor = open_processor(store, None)?;

    let result = match student {
        Some(student_id) => {
            let (result, response) = processor.submit_quiz(QuizSubmission {
                quiz_id,
                student_id,
                answers,
                response_time_seconds: response_time,
            })?;
            fs::write(store, processor.save_snapshot()?)?;
            debug!(response_id = %response.id, "recorded quiz response");
            result
        }
        None => processor.grade(quiz_id, &answers)?,
    };

    print_output(&result, output_format)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PulseCliError> {
    let records = read_records(input, &input_format)?;
    let failures = RecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                kind: f.kind.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} record (index {}): {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(PulseCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(store: Option<&Path>, config: Option<&Path>, json: bool) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = vec![DoctorCheck {
        name: "pulse_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Pulse version {}", PULSE_VERSION),
    }];

    if let Some(store_path) = store {
        checks.push(check_store(store_path));
    }

    if let Some(config_path) = config {
        let check = match load_config(Some(config_path)) {
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Scoring config valid".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            },
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (ready for `ingest --input -`)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PULSE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_store(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "store".to_string(),
            status: CheckStatus::Warning,
            message: "Store snapshot does not exist (ingest will create it)".to_string(),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match InMemoryMetricStore::from_json(&content) {
            Ok(store) => (
                CheckStatus::Ok,
                format!("Store snapshot valid ({} lessons)", store.lessons().count()),
            ),
            Err(e) => (CheckStatus::Error, format!("Invalid store snapshot: {}", e)),
        },
        Err(e) => (CheckStatus::Error, format!("Cannot read store snapshot: {}", e)),
    };

    DoctorCheck {
        name: "store".to_string(),
        status,
        message,
    }
}

// Helper functions

fn read_input(path: &Path) -> Result<String, PulseCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_records(path: &Path, format: &InputFormat) -> Result<Vec<MetricRecord>, PulseCliError> {
    let data = read_input(path)?;
    let records = match format {
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&data)?,
        InputFormat::Json => RecordAdapter::parse_array(&data)?,
    };
    Ok(records)
}

fn load_config(path: Option<&Path>) -> Result<ScoringConfig, PulseCliError> {
    match path {
        Some(path) => Ok(ScoringConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(ScoringConfig::default()),
    }
}

fn open_processor(store: &Path, config: Option<&Path>) -> Result<EngagementProcessor, PulseCliError> {
    let snapshot = fs::read_to_string(store)?;
    let processor = EngagementProcessor::from_snapshot(&snapshot)?;
    Ok(processor.with_config(load_config(config)?)?)
}

fn print_output<T: Serialize>(payload: &T, format: &OutputFormat) -> Result<(), PulseCliError> {
    let encoder = ReportEncoder::new();
    let output = match format {
        OutputFormat::Json => encoder.encode_to_json(payload)?,
        OutputFormat::JsonPretty => encoder.encode_to_json_pretty(payload)?,
    };
    println!("{}", output);
    Ok(())
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ComputeError> for PulseCliError {
    fn from(e: ComputeError) -> Self {
        PulseCliError::Compute(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Compute(e @ ComputeError::NotFound { .. }) => CliError {
                code: "NOT_FOUND".to_string(),
                message: e.to_string(),
                hint: Some("Check the ids against the store snapshot".to_string()),
            },
            PulseCliError::Compute(e @ ComputeError::Validation(_)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pulse validate' for details".to_string()),
            },
            PulseCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
