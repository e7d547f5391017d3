use serde_json::{Map, Number, Value};

use super::{CodecError, DecodeOptions, Delimiter};

pub(super) fn decode(text: &str, opts: &DecodeOptions) -> Result<Value, CodecError> {
    if opts.indent == 0 {
        return Err(CodecError::InvalidIndent);
    }
    let lines = scan(text, opts)?;
    let mut parser = Parser {
        lines,
        pos: 0,
        strict: opts.strict,
    };
    let root = parser.object(0)?;
    if let Some(line) = parser.peek() {
        return Err(CodecError::syntax(line.number, "unexpected indentation"));
    }
    Ok(Value::Object(root))
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    depth: usize,
    content: &'a str,
}

fn scan<'a>(text: &'a str, opts: &DecodeOptions) -> Result<Vec<Line<'a>>, CodecError> {
    let mut lines = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let content = raw.trim_start_matches(' ');
        let spaces = raw.len() - content.len();
        if opts.strict && spaces % opts.indent != 0 {
            return Err(CodecError::syntax(
                idx + 1,
                format!("indentation of {spaces} is not a multiple of {}", opts.indent),
            ));
        }
        lines.push(Line {
            number: idx + 1,
            depth: spaces / opts.indent,
            content: content.trim_end(),
        });
    }
    Ok(lines)
}

/// Parsed `[N]`, `[N|]{a|b}:` or `[N]: x,y` header.
struct Header<'a> {
    len: usize,
    delimiter: Delimiter,
    fields: Option<Vec<String>>,
    inline: &'a str,
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    strict: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn object(&mut self, depth: usize) -> Result<Map<String, Value>, CodecError> {
        let mut map = Map::new();
        while let Some(line) = self.peek() {
            if line.depth < depth {
                break;
            }
            if line.depth > depth {
                return Err(CodecError::syntax(line.number, "unexpected indentation"));
            }
            if is_list_item(line.content) {
                return Err(CodecError::syntax(line.number, "list item outside of an array"));
            }
            self.pos += 1;
            let (key, rest) = split_key(line.content).map_err(|m| CodecError::syntax(line.number, m))?;
            let value = self.keyed_value(rest, depth, line.number)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn keyed_value(&mut self, rest: &'a str, depth: usize, number: usize) -> Result<Value, CodecError> {
        if rest.starts_with('[') {
            let header = parse_header(rest).map_err(|m| CodecError::syntax(number, m))?;
            return self.array(&header, depth, number);
        }
        let after = rest
            .strip_prefix(':')
            .ok_or_else(|| CodecError::syntax(number, "expected ':' after key"))?;
        if after.is_empty() {
            return Ok(Value::Object(self.object(depth + 1)?));
        }
        let token = after
            .strip_prefix(' ')
            .ok_or_else(|| CodecError::syntax(number, "expected a space after ':'"))?;
        primitive(token).map_err(|m| CodecError::syntax(number, m))
    }

    /// Body of an array whose header sits at `depth`; rows and items live one
    /// level deeper.
    fn array(&mut self, header: &Header<'a>, depth: usize, number: usize) -> Result<Value, CodecError> {
        let items = if let Some(fields) = &header.fields {
            self.table_rows(fields, header.delimiter, depth + 1)?
        } else if !header.inline.is_empty() {
            split_cells(header.inline, header.delimiter)
                .into_iter()
                .map(primitive)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|m| CodecError::syntax(number, m))?
        } else {
            self.list_items(depth + 1)?
        };
        if self.strict && items.len() != header.len {
            return Err(CodecError::syntax(
                number,
                format!("array declares {} items but has {}", header.len, items.len()),
            ));
        }
        Ok(Value::Array(items))
    }

    fn table_rows(
        &mut self,
        fields: &[String],
        delimiter: Delimiter,
        depth: usize,
    ) -> Result<Vec<Value>, CodecError> {
        let mut rows = Vec::new();
        while let Some(line) = self.peek() {
            if line.depth < depth {
                break;
            }
            if line.depth > depth {
                return Err(CodecError::syntax(line.number, "unexpected indentation in table"));
            }
            self.pos += 1;
            let cells = split_cells(line.content, delimiter);
            // Lenient rows drop extra cells and omit fields with no cell.
            if self.strict && cells.len() != fields.len() {
                return Err(CodecError::syntax(
                    line.number,
                    format!("row has {} cells, header has {} fields", cells.len(), fields.len()),
                ));
            }
            let mut row = Map::new();
            for (field, cell) in fields.iter().zip(cells) {
                let value = primitive(cell).map_err(|m| CodecError::syntax(line.number, m))?;
                row.insert(field.clone(), value);
            }
            rows.push(Value::Object(row));
        }
        Ok(rows)
    }

    fn list_items(&mut self, depth: usize) -> Result<Vec<Value>, CodecError> {
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            if line.depth < depth {
                break;
            }
            if line.depth > depth || !is_list_item(line.content) {
                return Err(CodecError::syntax(line.number, "expected a list item"));
            }
            self.pos += 1;
            items.push(self.list_item(line, depth)?);
        }
        Ok(items)
    }

    fn list_item(&mut self, line: Line<'a>, depth: usize) -> Result<Value, CodecError> {
        if line.content == "-" {
            return Ok(Value::Object(self.object(depth + 1)?));
        }
        let rest = &line.content[2..];
        if rest.starts_with('[') {
            let header = parse_header(rest).map_err(|m| CodecError::syntax(line.number, m))?;
            return self.array(&header, depth, line.number);
        }
        primitive(rest).map_err(|m| CodecError::syntax(line.number, m))
    }
}

fn is_list_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

fn split_key(content: &str) -> Result<(String, &str), String> {
    if content.starts_with('"') {
        return parse_quoted(content);
    }
    let end = content
        .find([':', '['])
        .ok_or_else(|| format!("expected 'key: value', found {content:?}"))?;
    if end == 0 {
        return Err("empty key".to_owned());
    }
    Ok((content[..end].to_owned(), &content[end..]))
}

fn parse_header(rest: &str) -> Result<Header<'_>, String> {
    let close = rest.find(']').ok_or("unterminated array header")?;
    let inside = &rest[1..close];
    let (count, delimiter) = if let Some(n) = inside.strip_suffix('|') {
        (n, Delimiter::Pipe)
    } else if let Some(n) = inside.strip_suffix('\t') {
        (n, Delimiter::Tab)
    } else {
        (inside, Delimiter::Comma)
    };
    let len = count
        .parse::<usize>()
        .map_err(|_| format!("invalid array length {count:?}"))?;

    let mut tail = &rest[close + 1..];
    let mut fields = None;
    if tail.starts_with('{') {
        let end = find_unquoted(tail, '}').ok_or("unterminated field list")?;
        let names = split_cells(&tail[1..end], delimiter)
            .into_iter()
            .map(|name| match parse_quoted(name) {
                Ok((key, "")) => Ok(key),
                Ok(_) => Err(format!("malformed field name {name:?}")),
                Err(_) if name.starts_with('"') => Err(format!("malformed field name {name:?}")),
                Err(_) => Ok(name.to_owned()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        fields = Some(names);
        tail = &tail[end + 1..];
    }

    let after = tail.strip_prefix(':').ok_or("expected ':' after array header")?;
    let inline = if after.is_empty() {
        after
    } else {
        after
            .strip_prefix(' ')
            .ok_or("expected a space after array header")?
    };
    Ok(Header {
        len,
        delimiter,
        fields,
        inline,
    })
}

fn primitive(token: &str) -> Result<Value, String> {
    if token.starts_with('"') {
        return match parse_quoted(token)? {
            (s, "") => Ok(Value::String(s)),
            (_, trailing) => Err(format!("unexpected {trailing:?} after quoted string")),
        };
    }
    Ok(match token {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => serde_json::from_str::<Number>(token)
            .map_or_else(|_| Value::String(token.to_owned()), Value::Number),
    })
}

/// Parse a JSON string literal at the start of `s`, returning it and the remainder.
fn parse_quoted(s: &str) -> Result<(String, &str), String> {
    if !s.starts_with('"') {
        return Err(format!("expected a quoted string, found {s:?}"));
    }
    let mut escaped = false;
    for (idx, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            let literal = &s[..=idx];
            let parsed: String =
                serde_json::from_str(literal).map_err(|e| format!("bad string {literal}: {e}"))?;
            return Ok((parsed, &s[idx + 1..]));
        }
    }
    Err(format!("unterminated string {s:?}"))
}

fn find_unquoted(s: &str, target: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if in_quotes && c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && c == target {
            return Some(idx);
        }
    }
    None
}

/// Split on `delimiter`, ignoring delimiters inside quoted cells.
fn split_cells(s: &str, delimiter: Delimiter) -> Vec<&str> {
    let sep = delimiter.as_char();
    let mut cells = Vec::new();
    let mut rest = s;
    while let Some(idx) = find_unquoted(rest, sep) {
        cells.push(&rest[..idx]);
        rest = &rest[idx + sep.len_utf8()..];
    }
    cells.push(rest);
    cells
}
