//! Parsing of model replies into [`Analysis`] records.
//!
//! The reply contract is only described to the model in prose, so anything
//! can come back. Parsing accepts the two agreed shapes and reports every
//! other reply as a [`ParseError`].

use crate::analysis::{normalize_category, Analysis, ResponseFormat};
use serde_json::Value;
use thiserror::Error;

/// Keys the JSON variant must carry.
pub const JSON_KEYS: [&str; 4] = ["subject_line", "score", "template", "category"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("reply is not a list")]
    NotAList,
    #[error("reply is not a JSON object")]
    NotAnObject,
    #[error("expected 3 elements [Score, Template, Topic], got {0}")]
    WrongLength(usize),
    #[error("missing key: {0}")]
    MissingKey(&'static str),
    #[error("field {0} is not a string or number")]
    NotScalar(&'static str),
    #[error("malformed list literal: {0}")]
    Malformed(String),
}

/// Parse one model reply in the given format
pub fn parse_response(text: &str, format: ResponseFormat) -> Result<Analysis, ParseError> {
    let cleaned = strip_markdown_fence(text);
    match format {
        ResponseFormat::List => parse_list(&cleaned),
        ResponseFormat::Json => parse_object(&cleaned),
    }
}

fn parse_list(text: &str) -> Result<Analysis, ParseError> {
    if !text.starts_with('[') {
        return Err(ParseError::NotAList);
    }

    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Err(ParseError::NotAList),
        Err(_) => literal::parse_list(text)?,
    };

    if items.len() != 3 {
        return Err(ParseError::WrongLength(items.len()));
    }

    let score = scalar_text(&items[0]).ok_or(ParseError::NotScalar("score"))?;
    let template = scalar_text(&items[1]).ok_or(ParseError::NotScalar("template"))?;
    let category = scalar_text(&items[2]).ok_or(ParseError::NotScalar("category"))?;

    Ok(Analysis {
        score,
        template,
        category: normalize_category(&category),
    })
}

fn parse_object(text: &str) -> Result<Analysis, ParseError> {
    let object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        _ => return Err(ParseError::NotAnObject),
    };

    let mut fields: Vec<String> = Vec::with_capacity(JSON_KEYS.len());
    for key in JSON_KEYS {
        let value = object.get(key).ok_or(ParseError::MissingKey(key))?;
        fields.push(scalar_text(value).ok_or(ParseError::NotScalar(key))?);
    }

    // fields[0] is the echoed subject line; the user's input is what gets stored
    Ok(Analysis {
        score: fields[1].clone(),
        template: fields[2].clone(),
        category: normalize_category(&fields[3]),
    })
}

/// String or number as text; anything else is not a field value
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strip markdown code block wrappers from a reply
fn strip_markdown_fence(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an info string such as ```json or ```python, on its own line or not
        let info_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
            .unwrap_or(rest.len());
        let body = &rest[info_len..];
        if let Some(end_idx) = body.rfind("```") {
            return body[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}

/// Python-style list literals: `['90', 'Template', "Cold"]`, bare numbers allowed.
mod literal {
    use super::ParseError;
    use serde_json::Value;
    use std::iter::Peekable;
    use std::str::Chars;

    pub fn parse_list(text: &str) -> Result<Vec<Value>, ParseError> {
        let mut chars = text.chars().peekable();
        if chars.next() != Some('[') {
            return Err(ParseError::NotAList);
        }

        let mut items = Vec::new();
        loop {
            skip_whitespace(&mut chars);
            match chars.peek() {
                Some(']') if items.is_empty() => {
                    chars.next();
                    break;
                }
                Some(_) => {}
                None => return Err(ParseError::Malformed("unterminated list".to_string())),
            }

            items.push(parse_item(&mut chars)?);

            skip_whitespace(&mut chars);
            match chars.next() {
                Some(',') => {
                    // Trailing comma before the closing bracket
                    skip_whitespace(&mut chars);
                    if chars.peek() == Some(&']') {
                        chars.next();
                        break;
                    }
                }
                Some(']') => break,
                Some(other) => {
                    return Err(ParseError::Malformed(format!(
                        "unexpected character '{other}'"
                    )))
                }
                None => return Err(ParseError::Malformed("unterminated list".to_string())),
            }
        }

        if chars.any(|c| !c.is_whitespace()) {
            return Err(ParseError::Malformed("trailing text after list".to_string()));
        }
        Ok(items)
    }

    fn parse_item(chars: &mut Peekable<Chars<'_>>) -> Result<Value, ParseError> {
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                parse_quoted(chars, quote).map(Value::String)
            }
            Some(_) => {
                let mut token = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' || c == ']' || c.is_whitespace() {
                        break;
                    }
                    token.push(c);
                    chars.next();
                }
                token
                    .parse::<serde_json::Number>()
                    .map(Value::Number)
                    .map_err(|_| ParseError::Malformed(format!("unquoted value '{token}'")))
            }
            None => Err(ParseError::Malformed("unterminated list".to_string())),
        }
    }

    fn parse_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<String, ParseError> {
        let mut out = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(ParseError::Malformed("unterminated string".to_string()))
    }

    fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
    }
}
