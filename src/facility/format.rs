//! Template formatter for handler output.
//!
//! Templates use `%(field)s` placeholders with an optional `-` flag and
//! width (`%(levelname)-8s`). Handlers render each record through their
//! formatter and write the line straight to their stream.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};

use super::handler::Record;

pub const DEFAULT_FORMAT: &str = "%(message)s";
pub const BASIC_FORMAT: &str = "%(levelname)s:%(name)s:%(message)s";
const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    LevelName,
    LevelNo,
    Message,
    AscTime,
    Process,
    ThreadName,
}

impl Field {
    fn from_key(key: &str) -> Option<Field> {
        match key {
            "name" => Some(Field::Name),
            "levelname" => Some(Field::LevelName),
            "levelno" => Some(Field::LevelNo),
            "message" => Some(Field::Message),
            "asctime" => Some(Field::AscTime),
            "process" => Some(Field::Process),
            "threadName" => Some(Field::ThreadName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { field: Field, left: bool, width: usize },
}

/// A parsed output template.
#[derive(Debug, Clone)]
pub struct Formatter {
    segments: Vec<Segment>,
    datefmt: Option<String>,
}

impl Formatter {
    /// Parse `template`, validating every placeholder and the date format.
    pub fn parse(template: &str, datefmt: Option<&str>) -> Result<Self, String> {
        if let Some(datefmt) = datefmt {
            if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
                return Err(format!("invalid datefmt '{datefmt}'"));
            }
        }
        Ok(Self {
            segments: parse_template(template)?,
            datefmt: datefmt.map(str::to_owned),
        })
    }

    /// Formatter used by `basic_config`.
    pub fn basic() -> Self {
        Self {
            segments: parse_template(BASIC_FORMAT).unwrap_or_default(),
            datefmt: None,
        }
    }

    pub(crate) fn render(&self, record: &Record<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                &Segment::Field { field, left, width } => {
                    let value = self.field_value(field, record);
                    let _ = if left {
                        write!(out, "{value:<width$}")
                    } else {
                        write!(out, "{value:>width$}")
                    };
                }
            }
        }
        out
    }

    fn field_value(&self, field: Field, record: &Record<'_>) -> String {
        match field {
            Field::Name => record.logger.to_owned(),
            Field::LevelName => record.level.name().into_owned(),
            Field::LevelNo => record.level.value().to_string(),
            Field::Message => record.message.to_owned(),
            Field::AscTime => {
                let now = chrono::Local::now();
                let mut out = String::new();
                let _ = write!(out, "{}", now.format(self.datefmt.as_deref().unwrap_or(DEFAULT_DATEFMT)));
                out
            }
            Field::Process => std::process::id().to_string(),
            Field::ThreadName => std::thread::current()
                .name()
                .unwrap_or("<unnamed>")
                .to_owned(),
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            segments: vec![Segment::Field { field: Field::Message, left: false, width: 0 }],
            datefmt: None,
        }
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => literal.push('%'),
            Some('(') => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => key.push(ch),
                        None => return Err(format!("unterminated placeholder in '{template}'")),
                    }
                }
                let left = chars.next_if_eq(&'-').is_some();
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                match chars.next() {
                    Some('s' | 'd') => {}
                    other => {
                        return Err(format!(
                            "unsupported conversion {} for placeholder '{key}'",
                            other.map(|c| format!("'{c}'")).unwrap_or_else(|| "<end>".into())
                        ));
                    }
                }
                let field = Field::from_key(&key)
                    .ok_or_else(|| format!("unknown placeholder '{key}' in '{template}'"))?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field {
                    field,
                    left,
                    width: digits.parse().unwrap_or(0),
                });
            }
            _ => return Err(format!("invalid '%' directive in '{template}'")),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
