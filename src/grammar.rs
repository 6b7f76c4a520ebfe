//! Lexical helpers for the NRRD header text format: field line splitting,
//! subfield and vector tokenizing, and the number and string formatting
//! used when writing headers.
use crate::error::{NrrdError, Result};

/// Split a header line into its key and raw value.
///
/// Custom fields use `:=` and standard fields use `: `. The key is trimmed,
/// the value is returned as is. When the line holds neither delimiter, the
/// returned key is empty.
pub fn split_line(line: &str) -> (&str, &str) {
    if let Some(i) = line.find(":=") {
        (line[..i].trim(), &line[i + 2..])
    } else if let Some(i) = line.find(": ") {
        (line[..i].trim(), &line[i + 2..])
    } else {
        ("", line)
    }
}

/// Whether the line declares a custom `key:=value` field.
pub fn is_custom_line(line: &str) -> bool {
    line.contains(":=")
}

/// Normalize a standard field key: lower case, whitespace removed.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_none_token(token: &str) -> bool {
    token.is_empty() || token.eq_ignore_ascii_case("none") || token == "???"
}

/// Tokenize a field value into whitespace separated subfields.
///
/// A subfield in double quotes may contain whitespace, and its quotes are
/// removed. The unquoted tokens `none`, `???` and the empty subfield `""`
/// are mapped to `None`.
pub fn split_subfields(value: &str) -> Vec<Option<String>> {
    let mut out = Vec::new();
    let mut rest = value.trim_start();
    while !rest.is_empty() {
        if rest.starts_with('"') {
            if let Some(end) = rest[1..].find('"') {
                let quoted = &rest[1..end + 1];
                out.push(if quoted.is_empty() { None } else { Some(quoted.to_string()) });
                rest = rest[end + 2..].trim_start();
                continue;
            }
        }
        let end = rest.find(char::is_whitespace).unwrap_or_else(|| rest.len());
        let token = &rest[..end];
        if is_none_token(token) {
            out.push(None);
        } else {
            out.push(Some(token.trim_start_matches('"').to_string()));
        }
        rest = rest[end..].trim_start();
    }
    out
}

/// Tokenize a field value into vectors of the form `(a,b,c)`, where the
/// token `none` stands for a missing vector.
pub fn split_vectors(value: &str) -> Result<Vec<Option<Vec<f64>>>> {
    let mut out = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        let token_end = rest.find(char::is_whitespace).unwrap_or_else(|| rest.len());
        if &rest[..token_end] == "none" {
            out.push(None);
            rest = rest[token_end..].trim_start();
        } else if rest.starts_with('(') {
            let end = rest
                .find(')')
                .ok_or_else(|| NrrdError::MalformedNumber(rest.to_string()))?;
            let inner = rest[1..end].trim();
            if inner.is_empty() {
                return Err(NrrdError::MalformedNumber(rest[..=end].to_string()));
            }
            let v = inner.split(',').map(parse_real).collect::<Result<Vec<f64>>>()?;
            out.push(Some(v));
            rest = rest[end + 1..].trim_start();
        } else {
            return Err(NrrdError::MalformedNumber(rest[..token_end].to_string()));
        }
    }
    Ok(out)
}

/// Parse a real number, accepting `nan`, `inf`, `+inf` and `-inf` in any case.
pub fn parse_real(token: &str) -> Result<f64> {
    let t = token.trim();
    match t.to_lowercase().as_str() {
        "nan" => Ok(std::f64::NAN),
        "inf" | "+inf" => Ok(std::f64::INFINITY),
        "-inf" => Ok(std::f64::NEG_INFINITY),
        _ => t
            .parse::<f64>()
            .map_err(|_| NrrdError::MalformedNumber(t.to_string())),
    }
}

/// Parse an integer field value.
pub fn parse_integer(token: &str) -> Result<i64> {
    let t = token.trim();
    t.parse::<i64>()
        .map_err(|_| NrrdError::MalformedNumber(t.to_string()))
}

/// Format a real number the way headers are written: `nan`, `inf`, `-inf`,
/// or the shortest decimal form without a trailing `.0`.
pub fn format_real(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        if x > 0. { "inf" } else { "-inf" }.to_string()
    } else {
        let s = format!("{:?}", x);
        match s.strip_suffix(".0") {
            Some(s) => s.to_string(),
            None => s,
        }
    }
}

/// Format a vector as `(a,b,c)`, or `none` when every entry is NaN.
pub fn format_vector(v: &[f64]) -> String {
    if v.iter().all(|x| x.is_nan()) {
        return "none".to_string();
    }
    let parts: Vec<String> = v.iter().map(|x| format_real(*x)).collect();
    format!("({})", parts.join(","))
}

/// Replace line breaks so that a value fits on a single header line.
pub fn clean_field(value: &str) -> String {
    value.replace('\n', " ")
}

/// Quote a string subfield, or write `none` when it is missing.
pub fn quote_subfield(value: Option<&str>) -> String {
    match value {
        None => "none".to_string(),
        Some(v) => format!("\"{}\"", clean_field(v).replace('"', "'")),
    }
}

/// Whether a data file name holds a `printf` style integer pattern, like `I.%03d`.
pub fn has_digit_format(value: &str) -> bool {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'%' {
                i += 2;
                continue;
            }
            let mut j = i + 1;
            while j < bytes.len() && b"0123456789-.+*# ".contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'd' {
                return true;
            }
        }
        i += 1;
    }
    false
}
