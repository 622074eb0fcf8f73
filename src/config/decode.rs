//! YAML decoding with an extended float grammar.
//!
//! Hyperparameters such as `lr: 1e-5` or `decay: 1_000.5` are routinely written
//! unquoted. Plain (unquoted) scalars are resolved against the core schema and
//! then against the grammar below; quoted and block scalars always stay
//! strings:
//!
//! - decimal floats with optional exponent and `_` digit separators
//! - exponent-only forms (`1e-5`, `-3E+2`)
//! - leading-dot forms (`.5`, `.5e+3`)
//! - sexagesimal forms (`190:20:30.15`), evaluated base 60
//! - `.inf` / `.nan` in lower, title and upper case
//!
//! Scalar style is only visible at the event level, so documents are parsed
//! with `yaml-rust2` and assembled into `serde_yaml` values. Application tags
//! (`!keep 1e-5`) are kept as tagged values.

use super::types::{ConfigMapping, ConfigValue};
use crate::error::{ConfigError, Result};
use regex_lite::Regex;
use serde_yaml::value::{Tag, TaggedValue};
use std::collections::HashMap;
use std::sync::LazyLock;
use yaml_rust2::parser::{Event, EventReceiver, Parser, Tag as EventTag};
use yaml_rust2::scanner::TScalarStyle;

static FLOAT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"[-+]?[0-9][0-9_]*\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
        r"|[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+",
        r"|\.[0-9_]+(?:[eE][-+][0-9]+)?",
        r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
        r"|[-+]?\.(?:inf|Inf|INF)",
        r"|\.(?:nan|NaN|NAN)",
        r")$",
    ))
    .expect("float grammar is a valid regex")
});

const CORE_TAG_HANDLES: [&str; 2] = ["!!", "tag:yaml.org,2002:"];

/// Parse a scalar token under the extended float grammar.
///
/// Returns `None` when the token is not a float under the grammar.
pub fn parse_float_token(token: &str) -> Option<f64> {
    if !FLOAT_GRAMMAR.is_match(token) {
        return None;
    }

    let cleaned = token.replace('_', "").to_ascii_lowercase();
    let (sign, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    match body {
        ".inf" => Some(sign * f64::INFINITY),
        ".nan" => Some(f64::NAN),
        _ if body.contains(':') => {
            let mut value = 0.0;
            let mut base = 1.0;
            for part in body.rsplit(':') {
                value += part.parse::<f64>().ok()? * base;
                base *= 60.0;
            }
            Some(sign * value)
        }
        _ => body.parse::<f64>().ok().map(|v| sign * v),
    }
}

/// Resolve a plain scalar: null, boolean, integer, then float, else string.
fn resolve_plain(text: &str) -> ConfigValue {
    if is_zero_padded(text) {
        return ConfigValue::String(text.to_string());
    }
    match text {
        "" | "~" | "null" | "Null" | "NULL" => ConfigValue::Null,
        "true" | "True" | "TRUE" => ConfigValue::Bool(true),
        "false" | "False" | "FALSE" => ConfigValue::Bool(false),
        _ => parse_int(text)
            .or_else(|| parse_float_token(text).map(ConfigValue::from))
            .or_else(|| parse_finite_float(text).map(ConfigValue::from))
            .unwrap_or_else(|| ConfigValue::String(text.to_string())),
    }
}

/// Digits with a leading zero, such as `007`, are strings.
fn is_zero_padded(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Decimal, `0x`, `0o` and `0b` integers.
fn parse_int(text: &str) -> Option<ConfigValue> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(octal) = body.strip_prefix("0o") {
        (8, octal)
    } else if let Some(binary) = body.strip_prefix("0b") {
        (2, binary)
    } else {
        (10, body)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        i64::try_from(-i128::from(magnitude)).ok().map(ConfigValue::from)
    } else {
        Some(ConfigValue::from(magnitude))
    }
}

/// Floats the grammar misses, such as `-.5` or `1E5`. Spelled-out `inf` and
/// `nan` are not floats.
fn parse_finite_float(text: &str) -> Option<f64> {
    let unsigned = match text.strip_prefix('+') {
        Some(rest) if rest.starts_with(['+', '-']) => return None,
        Some(rest) => rest,
        None => text,
    };
    unsigned.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn scalar_value(text: String, style: TScalarStyle, tag: Option<EventTag>) -> ConfigValue {
    let Some(tag) = tag else {
        return match style {
            TScalarStyle::Plain => resolve_plain(&text),
            _ => ConfigValue::String(text),
        };
    };

    if CORE_TAG_HANDLES.contains(&tag.handle.as_str()) {
        return match tag.suffix.as_str() {
            "str" => ConfigValue::String(text),
            _ => resolve_plain(&text),
        };
    }

    let name = if tag.handle == "!" {
        tag.suffix
    } else {
        format!("{}{}", tag.handle, tag.suffix)
    };
    // A bare `!` forces a string
    if name.is_empty() || name == "!" {
        return ConfigValue::String(text);
    }
    ConfigValue::Tagged(Box::new(TaggedValue {
        tag: Tag::new(name),
        value: scalar_value(text, style, None),
    }))
}

enum Frame {
    Sequence {
        anchor: usize,
        items: Vec<ConfigValue>,
    },
    Mapping {
        anchor: usize,
        entries: ConfigMapping,
        key: Option<ConfigValue>,
    },
}

/// Assembles parser events into values, one per document.
#[derive(Default)]
struct ValueBuilder {
    stack: Vec<Frame>,
    anchors: HashMap<usize, ConfigValue>,
    documents: Vec<ConfigValue>,
}

impl ValueBuilder {
    fn push(&mut self, anchor: usize, value: ConfigValue) {
        if anchor != 0 {
            self.anchors.insert(anchor, value.clone());
        }
        match self.stack.last_mut() {
            None => self.documents.push(value),
            Some(Frame::Sequence { items, .. }) => items.push(value),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                None => *key = Some(value),
                Some(k) => {
                    entries.insert(k, value);
                }
            },
        }
    }
}

impl EventReceiver for ValueBuilder {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let value = scalar_value(text, style, tag);
                self.push(anchor, value);
            }
            Event::Alias(anchor) => {
                let value = self.anchors.get(&anchor).cloned().unwrap_or_default();
                self.push(0, value);
            }
            Event::SequenceStart(anchor, ..) => self.stack.push(Frame::Sequence {
                anchor,
                items: Vec::new(),
            }),
            Event::MappingStart(anchor, ..) => self.stack.push(Frame::Mapping {
                anchor,
                entries: ConfigMapping::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence { anchor, items }) => {
                    self.push(anchor, ConfigValue::Sequence(items));
                }
                Some(Frame::Mapping { anchor, entries, .. }) => {
                    self.push(anchor, ConfigValue::Mapping(entries));
                }
                None => {}
            },
            _ => {}
        }
    }
}

/// Decode YAML text into a mapping.
///
/// `origin` names the text's source in error messages. An empty document is an
/// empty mapping; any other non-mapping document is malformed, as is a
/// top-level key that is not a string or a stream of several documents.
pub fn decode_str(text: &str, origin: &str) -> Result<ConfigMapping> {
    let mut builder = ValueBuilder::default();
    Parser::new(text.chars())
        .load(&mut builder, true)
        .map_err(|e| ConfigError::malformed(origin, e))?;

    let mut documents = builder.documents.into_iter();
    let value = documents.next().unwrap_or_default();
    if documents.next().is_some() {
        return Err(ConfigError::malformed(origin, "expected a single YAML document"));
    }

    let mapping = match value {
        ConfigValue::Null => ConfigMapping::new(),
        ConfigValue::Mapping(mapping) => mapping,
        other => {
            return Err(ConfigError::malformed(
                origin,
                format!("top level must be a mapping, found {}", describe(&other)),
            ));
        }
    };

    if let Some(key) = mapping.keys().find(|k| !k.is_string()) {
        return Err(ConfigError::malformed(
            origin,
            format!("top-level keys must be strings, found {}", describe(key)),
        ));
    }

    Ok(mapping)
}

/// Short human-readable name of a value's kind.
pub(crate) fn describe(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "boolean",
        ConfigValue::Number(_) => "number",
        ConfigValue::String(_) => "string",
        ConfigValue::Sequence(_) => "sequence",
        ConfigValue::Mapping(_) => "mapping",
        ConfigValue::Tagged(_) => "tagged value",
    }
}
