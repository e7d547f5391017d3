use serde_json::{Map, Value};

use super::{CodecError, EncodeOptions, is_ambiguous_literal, kind};

pub(super) fn encode(doc: &Value, opts: &EncodeOptions) -> Result<String, CodecError> {
    if opts.indent == 0 {
        return Err(CodecError::InvalidIndent);
    }
    let Value::Object(map) = doc else {
        return Err(CodecError::UnsupportedRoot(kind(doc)));
    };
    let mut encoder = Encoder {
        opts,
        lines: Vec::new(),
    };
    encoder.fields(map, 0);
    Ok(encoder.lines.join("\n"))
}

struct Encoder<'a> {
    opts: &'a EncodeOptions,
    lines: Vec<String>,
}

impl Encoder<'_> {
    fn push(&mut self, depth: usize, text: &str) {
        let pad = " ".repeat(depth * self.opts.indent);
        self.lines.push(format!("{pad}{text}"));
    }

    fn fields(&mut self, map: &Map<String, Value>, depth: usize) {
        for (key, value) in map {
            let key = encode_key(key);
            match value {
                Value::Object(inner) => {
                    self.push(depth, &format!("{key}:"));
                    self.fields(inner, depth + 1);
                }
                Value::Array(items) => self.array(&key, items, depth),
                primitive => {
                    let text = self.primitive(primitive);
                    self.push(depth, &format!("{key}: {text}"));
                }
            }
        }
    }

    /// `prefix` is the encoded key, or `"- "` for an array nested in a list.
    fn array(&mut self, prefix: &str, items: &[Value], depth: usize) {
        let delim = self.opts.delimiter;
        let header = format!("{prefix}[{}{}]", items.len(), delim.marker());

        if items.is_empty() {
            self.push(depth, &format!("{header}:"));
        } else if items.iter().all(is_primitive) {
            let values = self.join(items.iter());
            self.push(depth, &format!("{header}: {values}"));
        } else if let Some(fields) = table_fields(items) {
            let names: Vec<String> = fields.iter().map(|f| encode_key(f)).collect();
            let sep = delim.as_char().to_string();
            self.push(depth, &format!("{header}{{{}}}:", names.join(&sep)));
            for item in items {
                if let Value::Object(row) = item {
                    let cells = self.join(fields.iter().filter_map(|f| row.get(*f)));
                    self.push(depth + 1, &cells);
                }
            }
        } else {
            self.push(depth, &format!("{header}:"));
            for item in items {
                self.list_item(item, depth + 1);
            }
        }
    }

    fn list_item(&mut self, item: &Value, depth: usize) {
        match item {
            Value::Object(map) => {
                self.push(depth, "-");
                self.fields(map, depth + 1);
            }
            Value::Array(items) => self.array("- ", items, depth),
            primitive => {
                let text = self.primitive(primitive);
                self.push(depth, &format!("- {text}"));
            }
        }
    }

    fn join<'v>(&self, values: impl Iterator<Item = &'v Value>) -> String {
        let sep = self.opts.delimiter.as_char().to_string();
        values
            .map(|v| self.primitive(v))
            .collect::<Vec<_>>()
            .join(&sep)
    }

    fn primitive(&self, value: &Value) -> String {
        match value {
            Value::String(s) if needs_quotes(s, self.opts.delimiter.as_char()) => quote(s),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

const fn is_primitive(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Field names shared by every element, when the array can be written as a
/// dense table: all elements are non-empty objects with identical keys and
/// primitive values only.
fn table_fields(items: &[Value]) -> Option<Vec<&str>> {
    let Value::Object(first) = items.first()? else {
        return None;
    };
    if first.is_empty() {
        return None;
    }
    let fields: Vec<&str> = first.keys().map(String::as_str).collect();
    let uniform = items.iter().all(|item| match item {
        Value::Object(map) => {
            map.len() == fields.len()
                && map.keys().zip(&fields).all(|(k, f)| k == f)
                && map.values().all(is_primitive)
        }
        _ => false,
    });
    uniform.then_some(fields)
}

fn needs_quotes(s: &str, delimiter: char) -> bool {
    s.is_empty()
        || s.trim() != s
        || s.starts_with('-')
        || is_ambiguous_literal(s)
        || s.chars().any(|c| {
            c == delimiter
                || c.is_control()
                || matches!(c, ':' | '"' | '\\' | '[' | ']' | '{' | '}' | '#')
        })
}

fn encode_key(key: &str) -> String {
    let mut chars = key.chars();
    let bare = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if bare { key.to_owned() } else { quote(key) }
}

fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}
