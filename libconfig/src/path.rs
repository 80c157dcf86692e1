//! Path expressions and their resolution.
//!
//! Grammar:
//!
//! ```text
//! path    ::= segment ('.' segment)*
//! segment ::= name | '[' digits ']'
//! name    ::= [A-Za-z*] [-A-Za-z0-9_*]*
//! ```
//!
//! e.g. `server.ports.[0]`. Paths only walk downwards from the node they
//! are resolved against; there is no parent segment.

use std::{fmt, str::FromStr};

use crate::{
    error::{ConfigError, Result},
    setting::Setting,
    value::SettingType,
};

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Group member.
    Name(String),
    /// Array or list element.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Name(name) => f.write_str(name),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Parsed path expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parses `expr`. The empty string is the empty path.
    pub fn parse(expr: &str) -> Result<Self> {
        if expr.is_empty() {
            return Ok(Self::default());
        }
        let segments = expr
            .split('.')
            .map(|part| parse_segment(expr, part))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

impl FromStr for Path {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

fn parse_segment(expr: &str, part: &str) -> Result<Segment> {
    if part.is_empty() {
        return Err(ConfigError::invalid_path(expr, "empty segment"));
    }
    if let Some(rest) = part.strip_prefix('[') {
        let digits = rest
            .strip_suffix(']')
            .ok_or_else(|| ConfigError::invalid_path(expr, format!("unclosed index '{part}'")))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::invalid_path(
                expr,
                format!("index '{part}' is not a non-negative integer"),
            ));
        }
        let index = digits.parse::<usize>().map_err(|e| {
            ConfigError::invalid_path(expr, format!("index '{part}' out of range: {e}"))
        })?;
        return Ok(Segment::Index(index));
    }
    if !is_valid_name(part) {
        return Err(ConfigError::invalid_path(
            expr,
            format!("'{part}' is not a valid setting name"),
        ));
    }
    Ok(Segment::Name(part.to_string()))
}

/// Whether `name` is usable as a group member name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '*')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*'))
}

/// Walks `path` downwards from `start`.
pub(crate) fn resolve<'c>(start: Setting<'c>, path: &Path) -> Result<Setting<'c>> {
    let mut current = start;
    for (depth, segment) in path.segments.iter().enumerate() {
        let next = match segment {
            Segment::Name(name) => {
                if current.setting_type() != SettingType::Group {
                    return Err(ConfigError::type_mismatch(
                        current.path(),
                        SettingType::Group.as_str(),
                        current.setting_type(),
                    ));
                }
                current.member(name)
            }
            Segment::Index(index) => {
                if !matches!(
                    current.setting_type(),
                    SettingType::Array | SettingType::List
                ) {
                    return Err(ConfigError::type_mismatch(
                        current.path(),
                        "Array or List",
                        current.setting_type(),
                    ));
                }
                current.child(*index)
            }
        };
        current = next.ok_or_else(|| {
            let mut failed = start.path_expr();
            for segment in &path.segments[..=depth] {
                failed.push(segment.clone());
            }
            ConfigError::not_found(failed.to_string())
        })?;
    }
    trace!("resolved '{path}' to {:?}", current.id());
    Ok(current)
}
