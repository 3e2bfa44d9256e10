//! Loader for generated model source.
//!
//! [`parse_source`] reads text produced by [`emit_source`](crate::emit_source)
//! back into a [`ModelDescriptor`]. Models must be declared before they are
//! referenced, which the emitter guarantees by writing nested models first;
//! the last block in the unit is the root model.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::types::{
    BindingKind, Constraint, ConstraintKind, FieldBinding, FieldDefault, ModelDescriptor,
    PrimitiveKind, SOURCE_FORMAT_VERSION,
};

/// Error raised while loading generated source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SourceError {
    /// 1-based line number, or 0 for errors about the unit as a whole.
    pub line: usize,
    pub message: String,
}

impl SourceError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

struct SourcePatterns {
    format: Regex,
    model_open: Regex,
    field: Regex,
    option: Regex,
}

static PATTERNS: LazyLock<SourcePatterns> = LazyLock::new(|| SourcePatterns {
    format: Regex::new(r"^format\s+(\S+)$").expect("static regex must compile"),
    model_open: Regex::new(r"^model\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{$")
        .expect("static regex must compile"),
    field: Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([^=]+?)\s*=\s*field\((.*)\)$")
        .expect("static regex must compile"),
    option: Regex::new(r"^Option<([A-Za-z_][A-Za-z0-9_]*)>$").expect("static regex must compile"),
});

/// Parses generated source into the root [`ModelDescriptor`].
///
/// Every model name maps to one shared descriptor, so two fields that
/// reference the same model point at the same `Arc`.
///
/// # Errors
///
/// Returns [`SourceError`] for a missing or unsupported `format` line,
/// malformed lines, duplicate model names, references to undeclared models,
/// unclosed blocks, or a unit without any model.
///
/// # Examples
///
/// ```
/// use field_schema_core::*;
/// use serde_json::json;
///
/// let specs = parse_metadata(&json!({
///     "toto": {"type": "integer", "default": 1, "minimum": 0},
///     "address": {"type": "object", "properties": {"city": {"type": "string", "default": "NYC"}}}
/// }))
/// .unwrap();
/// let model = build_model(&specs, "Inputs").unwrap();
///
/// let loaded = parse_source(&emit_source(&model)).unwrap();
/// assert_eq!(loaded, model);
/// ```
pub fn parse_source(text: &str) -> Result<ModelDescriptor, SourceError> {
    let mut parser = SourceParser::default();
    for (index, raw_line) in text.lines().enumerate() {
        parser.line(index + 1, raw_line.trim())?;
    }
    parser.finish()
}

#[derive(Default)]
struct SourceParser {
    format_seen: bool,
    open: Option<(usize, ModelDescriptor)>,
    models: HashMap<String, Arc<ModelDescriptor>>,
    last: Option<Arc<ModelDescriptor>>,
}

impl SourceParser {
    fn line(&mut self, number: usize, line: &str) -> Result<(), SourceError> {
        if line.is_empty() || line.starts_with("//") {
            return Ok(());
        }

        if let Some((_, model)) = self.open.as_mut() {
            if line == "}" {
                self.close_block();
                return Ok(());
            }
            let field = parse_field(number, line, &self.models)?;
            if model.field(&field.name).is_some() {
                return Err(SourceError::new(
                    number,
                    format!("duplicate field `{}` in model `{}`", field.name, model.name),
                ));
            }
            model.fields.push(field);
            return Ok(());
        }

        if let Some(caps) = PATTERNS.format.captures(line) {
            if self.format_seen {
                return Err(SourceError::new(number, "duplicate format declaration"));
            }
            if &caps[1] != SOURCE_FORMAT_VERSION {
                return Err(SourceError::new(
                    number,
                    format!("unsupported format `{}` (expected `{SOURCE_FORMAT_VERSION}`)", &caps[1]),
                ));
            }
            self.format_seen = true;
            return Ok(());
        }

        if let Some(caps) = PATTERNS.model_open.captures(line) {
            if !self.format_seen {
                return Err(SourceError::new(number, "missing format declaration before first model"));
            }
            let name = &caps[1];
            if self.models.contains_key(name) {
                return Err(SourceError::new(number, format!("duplicate model `{name}`")));
            }
            self.open = Some((number, ModelDescriptor::new(name)));
            return Ok(());
        }

        Err(SourceError::new(number, format!("unexpected line `{line}`")))
    }

    fn close_block(&mut self) {
        if let Some((_, model)) = self.open.take() {
            let model = Arc::new(model);
            self.models.insert(model.name.clone(), Arc::clone(&model));
            self.last = Some(model);
        }
    }

    fn finish(self) -> Result<ModelDescriptor, SourceError> {
        if let Some((opened_at, model)) = self.open {
            return Err(SourceError::new(
                opened_at,
                format!("model `{}` is never closed", model.name),
            ));
        }
        if !self.format_seen {
            return Err(SourceError::new(0, "missing format declaration"));
        }
        // Drop the name index first so the root is uniquely owned when
        // nothing else references it.
        drop(self.models);
        self.last
            .map(Arc::unwrap_or_clone)
            .ok_or_else(|| SourceError::new(0, "no model declared"))
    }
}

fn parse_field(
    number: usize,
    line: &str,
    models: &HashMap<String, Arc<ModelDescriptor>>,
) -> Result<FieldBinding, SourceError> {
    let caps = PATTERNS
        .field
        .captures(line)
        .ok_or_else(|| SourceError::new(number, format!("malformed field line `{line}`")))?;

    let name = &caps[1];
    let kind = parse_type(number, caps[2].trim(), models)?;
    let mut field = FieldBinding {
        name: name.to_string(),
        kind,
        default: FieldDefault::Null,
        description: String::new(),
        title: None,
        constraints: Vec::new(),
    };

    let args = split_arguments(&caps[3]).map_err(|message| SourceError::new(number, message))?;
    let mut presence: Option<FieldDefault> = None;
    for arg in args {
        let parsed = match arg {
            "required" => Some(FieldDefault::Required),
            "none" => Some(FieldDefault::Null),
            _ => None,
        };
        if let Some(marker) = parsed {
            set_presence(number, &mut presence, marker)?;
            continue;
        }

        let (key, raw_value) = arg
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| SourceError::new(number, format!("unexpected argument `{arg}`")))?;
        let value: Value = serde_json::from_str(raw_value).map_err(|e| {
            SourceError::new(number, format!("invalid value for `{key}`: {e}"))
        })?;

        match key {
            "default" => set_presence(number, &mut presence, FieldDefault::from_value(value))?,
            "description" => field.description = expect_string(number, key, value)?,
            "title" => field.title = Some(expect_string(number, key, value)?),
            _ => {
                let kind = ConstraintKind::from_keyword(key).ok_or_else(|| {
                    SourceError::new(number, format!("unknown argument `{key}`"))
                })?;
                let Value::Number(n) = value else {
                    return Err(SourceError::new(number, format!("`{key}` must be a number")));
                };
                field.constraints.push(Constraint { kind, value: n });
            }
        }
    }

    field.default = presence.ok_or_else(|| {
        SourceError::new(
            number,
            format!("field `{name}` needs a default, `required` or `none`"),
        )
    })?;
    Ok(field)
}

fn parse_type(
    number: usize,
    repr: &str,
    models: &HashMap<String, Arc<ModelDescriptor>>,
) -> Result<BindingKind, SourceError> {
    if let Some(kind) = PrimitiveKind::from_type_repr(repr) {
        return Ok(BindingKind::Primitive(kind));
    }

    let name = PATTERNS
        .option
        .captures(repr)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| repr.to_string());
    models
        .get(&name)
        .map(|model| BindingKind::Reference(Arc::clone(model)))
        .ok_or_else(|| {
            SourceError::new(
                number,
                format!("unknown type `{repr}` (models must be declared before use)"),
            )
        })
}

fn set_presence(
    number: usize,
    presence: &mut Option<FieldDefault>,
    value: FieldDefault,
) -> Result<(), SourceError> {
    if presence.is_some() {
        return Err(SourceError::new(
            number,
            "only one of default, `required` or `none` is allowed",
        ));
    }
    *presence = Some(value);
    Ok(())
}

fn expect_string(number: usize, key: &str, value: Value) -> Result<String, SourceError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(SourceError::new(number, format!("`{key}` must be a string"))),
    }
}

/// Splits a field argument list on top-level commas.
///
/// Commas inside JSON strings, arrays and objects do not split.
fn split_arguments(text: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced brackets in arguments".to_string())?;
            }
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_string || depth != 0 {
        return Err("unterminated string or bracket in arguments".to_string());
    }
    let tail = text[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err("empty argument".to_string());
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{build_model, emit_source, parse_metadata};

    const HEADER: &str = "format field-schema/1\n";

    #[test]
    fn test_round_trip_all_constraint_kinds() {
        let specs = parse_metadata(&json!({
            "toto": {"type": "integer", "default": 1, "minimum": -5, "maximum": 10, "description": "a, b = c"},
            "titi": {"type": "float", "default": "2.5", "minimum": 0.5},
            "code": {"type": "string", "default": "x)", "minLength": 1, "maxLength": 8, "title": "Code"},
            "tags": {"type": "list", "default": ["a,b", {"k": [1, 2]}], "minItems": 1, "maxItems": 3},
            "flag": {"type": "bool", "default": true},
            "stuff": {"type": "dict", "default": null},
            "address": {
                "type": "object",
                "description": "Home",
                "properties": {
                    "city": {"type": "string", "default": "NYC"},
                    "geo": {"type": "object", "default": null, "properties": {
                        "lat": {"type": "number", "default": 0}
                    }}
                }
            }
        }))
        .unwrap();
        let model = build_model(&specs, "InputsClass").unwrap();

        let loaded = parse_source(&emit_source(&model)).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_shared_references_resolve_to_same_model() {
        let text = format!(
            "{HEADER}model Point {{\n    x: float = field(default = 0.0)\n}}\n\
             model Segment {{\n    start: Point = field(required)\n    end: Option<Point> = field(none)\n}}\n"
        );
        let root = parse_source(&text).unwrap();

        let start = root.field("start").unwrap().nested().unwrap();
        let end = root.field("end").unwrap().nested().unwrap();
        assert!(Arc::ptr_eq(start, end));
        assert!(root.field("start").unwrap().is_required());
        assert!(!root.field("end").unwrap().is_required());
    }

    #[test]
    fn test_missing_format_rejected() {
        let err = parse_source("model A {\n}\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let err = parse_source("format field-schema/9\nmodel A {\n}\n").unwrap_err();
        assert!(err.message.contains("unsupported format"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let text = format!("{HEADER}model Root {{\n    a: Later = field(required)\n}}\nmodel Later {{\n}}\n");
        let err = parse_source(&text).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("unknown type `Later`"));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let text = format!("{HEADER}model A {{\n}}\nmodel A {{\n}}\n");
        assert!(parse_source(&text).is_err());
    }

    #[test]
    fn test_unclosed_model_rejected() {
        let text = format!("{HEADER}model A {{\n    x: integer = field(default = 1)\n");
        let err = parse_source(&text).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_conflicting_presence_rejected() {
        let text = format!("{HEADER}model A {{\n    x: integer = field(default = 1, required)\n}}\n");
        assert!(parse_source(&text).is_err());
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let text = format!("{HEADER}model A {{\n    x: integer = field(none, pattern = \"a\")\n}}\n");
        let err = parse_source(&text).unwrap_err();
        assert!(err.message.contains("unknown argument `pattern`"));
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments(r#"default = "a, b", description = "x\"y", minimum = 1"#).unwrap(),
            vec![r#"default = "a, b""#, r#"description = "x\"y""#, "minimum = 1"]
        );
        assert_eq!(split_arguments("").unwrap(), Vec::<&str>::new());
        assert!(split_arguments("none,").is_err());
        assert!(split_arguments("default = [1").is_err());
    }
}
