//! What each command prints: a JSON envelope with `--json`, a short text
//! report otherwise.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "taskdeck.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text report: a header line followed by bulleted sections
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<String>,
    details: Vec<String>,
    warnings: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: &str, value: impl fmt::Display) {
        self.summary.push(format!("{key}: {value}"));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        let sections = [
            ("Summary", &self.summary),
            ("Records", &self.details),
            ("Warnings", &self.warnings),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome<'a, T: Serialize> {
    Success {
        data: &'a T,
        #[serde(skip_serializing_if = "<[String]>::is_empty")]
        warnings: &'a [String],
    },
    Error {
        error: ErrorBody,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<T: Serialize>(command: &str, outcome: Outcome<'_, T>) -> Result<()> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        outcome,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Report a finished command. `--quiet` silences the text report only.
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map_or(&[][..], |human| human.warnings.as_slice());
        return print_envelope(command, Outcome::Success { data, warnings });
    }
    match human {
        Some(human) if !options.quiet => println!("{human}"),
        _ => {}
    }
    Ok(())
}

/// Report a failed command on stdout (`--json`) or stderr
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let error = ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        };
        return print_envelope::<()>(command, Outcome::Error { error, hint });
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Command label for error envelopes, worked out before clap parses so that
/// parse failures are labelled too. Record commands keep their action.
pub fn command_label<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut words = args.into_iter().filter(|arg| !arg.starts_with('-'));
    match (words.next(), words.next()) {
        (Some(kind), Some(action)) if matches!(kind.as_str(), "task" | "epic" | "subtask") => {
            format!("{kind} {action}")
        }
        (Some(command), _) => command,
        (None, _) => "taskdeck".to_string(),
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        exit_codes::REJECTED => "rejected",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<String> {
    let hint = match err {
        Error::IntervalConflict { conflicting } => match conflicting.id() {
            Some(id) => format!("pick another time or reschedule record {id}"),
            None => "pick another time".to_string(),
        },
        Error::RecordNotFound { .. } => "taskdeck list".to_string(),
        Error::Snapshot(_) => "fix or move the snapshot file, then retry".to_string(),
        Error::InvalidConfig(_) => "fix .taskdeck.toml then retry".to_string(),
        _ => return None,
    };
    Some(hint)
}
