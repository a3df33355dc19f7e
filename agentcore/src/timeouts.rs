//! The `timeouts` block shared by asynchronously provisioned resources

use std::time::Duration;

use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode, Validator,
    ValidatorRequest, ValidatorResponse,
};
use tfplug::types::{Diagnostic, Dynamic};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Reads the `timeouts` block of a plan or state object, keeping
    /// `defaults` for anything unset or unparsable
    pub fn from_value(value: &Dynamic, defaults: Timeouts) -> Self {
        let block = value.get("timeouts");
        let read = |key: &str, fallback: Duration| {
            block
                .get(key)
                .as_string()
                .and_then(|s| parse_duration(s).ok())
                .unwrap_or(fallback)
        };
        Self {
            create: read("create", defaults.create),
            update: read("update", defaults.update),
            delete: read("delete", defaults.delete),
        }
    }
}

/// Schema block with one optional duration string per operation
pub fn block(update: bool) -> NestedBlock {
    let mut operations = vec!["create"];
    if update {
        operations.push("update");
    }
    operations.push("delete");

    operations
        .into_iter()
        .fold(
            NestedBlockBuilder::new("timeouts").nesting(NestingMode::Single),
            |builder, op| {
                builder.attribute(
                    AttributeBuilder::new(op, AttributeType::String)
                        .optional()
                        .description("A duration string such as \"30m\" or \"1h30m\"")
                        .validator(Box::new(DurationValidator))
                        .build(),
                )
            },
        )
        .build()
}

/// Parses durations like `45s`, `30m`, `1h30m` and `500ms`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| format!("missing unit in duration \"{}\"", input))?;
        if digits == 0 {
            return Err(format!("invalid duration \"{}\"", input));
        }
        let amount: f64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration \"{}\"", input))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds = match &rest[..unit_len] {
            "ms" => amount / 1000.0,
            "s" => amount,
            "m" => amount * 60.0,
            "h" => amount * 3600.0,
            unit => return Err(format!("unknown unit \"{}\" in duration \"{}\"", unit, input)),
        };
        total = Duration::try_from_secs_f64(seconds)
            .ok()
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration \"{}\" is too large", input))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

struct DurationValidator;

impl Validator for DurationValidator {
    fn description(&self) -> String {
        "value must be a duration string".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(value) = request.config_value.value.as_string() {
            if let Err(e) = parse_duration(value) {
                diagnostics.push(
                    Diagnostic::error("Invalid timeout duration", e)
                        .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}
