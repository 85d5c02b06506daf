//! Argument grammar for command text.
//!
//! The first whitespace-delimited token, case-folded, names the command.
//! Only `summarise` (also spelt `summarize`) takes an argument: an optional
//! integer percentage that sets the target summary length. Trailing tokens
//! after any other command are ignored.

use serde_json::{Map, Value, json};

use crate::errors::ParseError;
use crate::registry::CommandRegistry;

const SUMMARISE: &str = "summarise";
const SUMMARISE_ALIASES: &[&str] = &[SUMMARISE, "summarize"];
const MIN_RATIO_FLOOR: f64 = 0.05;

/// Target length of a summary, as fractions of the input length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRange {
    /// Preferred ratio.
    pub ratio: f64,
    /// Lower bound.
    pub min_ratio: f64,
    /// Upper bound.
    pub max_ratio: f64,
}

impl SummaryRange {
    /// Range used when no percentage is given: 25%, within 20-30%.
    pub const DEFAULT: Self = Self {
        ratio: 0.25,
        min_ratio: 0.20,
        max_ratio: 0.30,
    };

    /// Range centred on `percentage`, which must lie in `1..=99`.
    #[expect(
        clippy::float_arithmetic,
        reason = "summary bounds are fractions of the requested percentage"
    )]
    fn around_percentage(percentage: u8) -> Self {
        let ratio = f64::from(percentage) / 100.0;
        Self {
            ratio,
            min_ratio: (ratio * 0.9).max(MIN_RATIO_FLOOR),
            max_ratio: ratio * 1.1,
        }
    }
}

impl Default for SummaryRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Arguments extracted from command text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandArguments {
    /// The command takes no arguments.
    None,
    /// Length bounds for `summarise`.
    Summarise(SummaryRange),
}

/// Command text split into its base command and arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    base_command: String,
    arguments: CommandArguments,
}

impl ParsedCommand {
    /// Parses `text` against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is blank, names no registered
    /// command, or carries malformed `summarise` arguments.
    pub fn parse(text: &str, registry: &CommandRegistry) -> Result<Self, ParseError> {
        let mut tokens = text.split_whitespace();
        let Some(first) = tokens.next() else {
            return Err(ParseError::Empty);
        };
        let base = first.to_lowercase();

        if SUMMARISE_ALIASES.contains(&base.as_str()) {
            if !registry.contains(SUMMARISE) {
                return Err(ParseError::unknown_command(SUMMARISE));
            }
            let rest: Vec<&str> = tokens.collect();
            let range = match rest.as_slice() {
                [] => SummaryRange::DEFAULT,
                [value] => parse_percentage(value)?,
                _ => return Err(ParseError::TooManyArguments { count: rest.len() }),
            };
            return Ok(Self {
                base_command: SUMMARISE.to_owned(),
                arguments: CommandArguments::Summarise(range),
            });
        }

        if registry.contains(&base) {
            Ok(Self {
                base_command: base,
                arguments: CommandArguments::None,
            })
        } else {
            Err(ParseError::unknown_command(base))
        }
    }

    /// Normalised base command, e.g. `summarise` for `Summarize 40`.
    #[must_use]
    pub fn base_command(&self) -> &str {
        &self.base_command
    }

    /// Parsed arguments.
    #[must_use]
    pub const fn arguments(&self) -> CommandArguments {
        self.arguments
    }

    /// Backend endpoint path for this command.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("/api/{}", self.base_command)
    }

    /// JSON request body: the arguments plus `text` and `timestamp`.
    #[must_use]
    pub fn request_body(&self, input_text: &str, timestamp: u64) -> Value {
        let mut body = Map::new();
        if let CommandArguments::Summarise(range) = self.arguments {
            body.insert("ratio".to_owned(), json!(range.ratio));
            body.insert("min_ratio".to_owned(), json!(range.min_ratio));
            body.insert("max_ratio".to_owned(), json!(range.max_ratio));
        }
        body.insert("text".to_owned(), Value::from(input_text));
        body.insert("timestamp".to_owned(), Value::from(timestamp));
        Value::Object(body)
    }
}

fn parse_percentage(value: &str) -> Result<SummaryRange, ParseError> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|number| u8::try_from(number).ok())
        .filter(|percentage| (1..100).contains(percentage))
        .map(SummaryRange::around_percentage)
        .ok_or_else(|| ParseError::invalid_percentage(value))
}
