use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use customfields::domain::config_json_schema;
use customfields::io::{
    DocumentFormat, load_fields_config_value, parse_document_str, render_document, write_document,
};
use customfields::options::EngineOptions;
use customfields::registry::FieldRegistry;
use customfields::render::{HiddenSource, render_readonly, text::print_readonly};
use customfields::serialize::{SensitiveFieldRecord, custom_fields_json, reshape_sensitive_fields};
use customfields::validation::FormValidator;
use customfields::visibility::{self, refresh_invisible_fields};

#[derive(Debug, Parser)]
#[command(
    name = "customfields",
    version,
    about = "Inspect custom field records: visibility, validation, read-only views and save-time encoding"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Record key holding the custom-field values
    #[arg(long = "parent", value_name = "KEY", global = true)]
    parent: Option<String>,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH", global = true)]
    output: Option<PathBuf>,

    /// Emit compact JSON rather than pretty formatting
    #[arg(long = "no-pretty", global = true)]
    no_pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the hidden field paths of a record
    Hidden(RecordArgs),
    /// Print the save-time encoding of a record's custom fields
    Serialize {
        #[command(flatten)]
        input: RecordArgs,
        /// Drop the hidden-field bookkeeping, as for text embedded in notes
        #[arg(long = "note-text")]
        note_text: bool,
    },
    /// Print the read-only view of a record
    Show {
        #[command(flatten)]
        input: RecordArgs,
        /// Line width of the printed view
        #[arg(long = "width", default_value_t = 80)]
        width: usize,
        /// Trust the hidden-field list stored in the record
        #[arg(long = "persisted")]
        persisted: bool,
        /// Emit the view as JSON instead of text
        #[arg(long = "json")]
        json: bool,
    },
    /// Validate a record; exits with an error when it is invalid
    Validate(RecordArgs),
    /// Reshape the sensitive fields of a record into per-field rows
    Sensitive {
        /// Record source: file path, inline payload, or "-" for stdin
        #[arg(short = 'r', long = "record", value_name = "SOURCE")]
        record: String,
        /// Previously stored rows whose ids are reused
        #[arg(short = 'e', long = "existing", value_name = "SOURCE")]
        existing: Option<String>,
    },
    /// Print the JSON Schema of custom field configurations
    ConfigSchema,
}

#[derive(Debug, Args)]
struct RecordArgs {
    /// Field configuration source: file path, inline payload, or "-" for stdin
    #[arg(short = 'c', long = "config", value_name = "SOURCE")]
    config: String,
    /// Record source: file path, inline payload, or "-" for stdin
    #[arg(short = 'r', long = "record", value_name = "SOURCE")]
    record: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "running command");
    let mut options = EngineOptions::default();
    if let Some(parent) = cli.parent.as_ref() {
        options = options.with_parent_field(parent.clone());
    }
    let pretty = !cli.no_pretty;

    let output = match &cli.command {
        Command::Hidden(input) => {
            let (fields, record) = load_inputs(input)?;
            let hidden = visibility::evaluate(&fields, &options.parent_path(), &record, false);
            encode(&hidden.to_value(), pretty)?
        }
        Command::Serialize { input, note_text } => {
            let (fields, record) = load_inputs(input)?;
            let (record, _) = refresh_invisible_fields(&record, &fields, &options)?;
            custom_fields_json(&record, *note_text, &options)?
                .ok_or_else(|| eyre!("record has no '{}' object", options.parent_field))?
        }
        Command::Show {
            input,
            width,
            persisted,
            json,
        } => {
            let (fields, record) = load_inputs(input)?;
            let source = if *persisted {
                HiddenSource::Persisted
            } else {
                HiddenSource::Live
            };
            let view = render_readonly(&fields, &record, &FieldRegistry::default(), &options, source);
            if *json {
                let value = serde_json::to_value(&view).wrap_err("failed to encode view")?;
                encode(&value, pretty)?
            } else {
                print_readonly(&view, *width).trim_end().to_string()
            }
        }
        Command::Validate(input) => {
            let (fields, record) = load_inputs(input)?;
            let hidden = visibility::evaluate(&fields, &options.parent_path(), &record, false);
            let validator = FormValidator::new(&fields, &options)?;
            let report = validator.validate(&record, &hidden);
            let value = serde_json::to_value(&report).wrap_err("failed to encode report")?;
            let payload = encode(&value, pretty)?;
            emit(cli.output.as_deref(), &payload)?;
            if !report.is_valid() {
                return Err(eyre!("record has {} validation error(s)", report.len()));
            }
            return Ok(());
        }
        Command::Sensitive { record, existing } => {
            let record = load_value(record, "record")?;
            let existing: Vec<SensitiveFieldRecord> = match existing {
                Some(source) => serde_json::from_value(load_value(source, "existing rows")?)
                    .wrap_err("existing rows must be a list of sensitive field records")?,
                None => Vec::new(),
            };
            let rows = reshape_sensitive_fields(&record, &existing, &options)?;
            let value = serde_json::to_value(rows).wrap_err("failed to encode rows")?;
            encode(&value, pretty)?
        }
        Command::ConfigSchema => {
            let schema = config_json_schema().wrap_err("failed to build the configuration schema")?;
            encode(&schema, pretty)?
        }
    };

    emit(cli.output.as_deref(), &output)
}

fn encode(value: &Value, pretty: bool) -> Result<String> {
    render_document(value, DocumentFormat::Json, pretty).map_err(|err| eyre!("{err:#}"))
}

fn emit(path: Option<&Path>, payload: &str) -> Result<()> {
    write_document(path, payload).map_err(|err| eyre!("{err:#}"))
}

fn load_inputs(input: &RecordArgs) -> Result<(customfields::domain::FieldsConfig, Value)> {
    if input.config == "-" && input.record == "-" {
        return Err(eyre!(
            "cannot read config and record from stdin simultaneously; provide inline content or files"
        ));
    }
    let config = load_value(&input.config, "config")?;
    let fields = load_fields_config_value(&config)
        .map_err(|err| eyre!("{err:#}"))
        .wrap_err("invalid custom field configuration")?;
    let record = load_value(&input.record, "record")?;
    Ok((fields, record))
}

/// Reads `source` as stdin (`-`), a file, or, when no such file exists, as
/// inline content.
fn load_value(source: &str, label: &str) -> Result<Value> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .wrap_err("failed to read from stdin")?;
        return parse_contents(&buffer, DocumentFormat::default(), label);
    }

    let path = Path::new(source);
    match fs::read_to_string(path) {
        Ok(contents) => {
            let format = DocumentFormat::from_path(path).unwrap_or_default();
            parse_contents(&contents, format, label)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            parse_contents(source, DocumentFormat::default(), &format!("inline {label}"))
        }
        Err(err) => Err(err).wrap_err_with(|| format!("failed to load {label} from {}", path.display())),
    }
}

fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    match parse_document_str(contents, format) {
        Ok(value) => Ok(value),
        Err(primary) => {
            for candidate in DocumentFormat::available_formats() {
                if candidate == format {
                    continue;
                }
                if let Ok(value) = parse_document_str(contents, candidate) {
                    return Ok(value);
                }
            }
            Err(eyre!(
                "failed to parse {label}: tried {} (first error: {primary:#})",
                format_list()
            ))
        }
    }
}

fn format_list() -> String {
    DocumentFormat::available_formats()
        .into_iter()
        .map(|format| format.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
