//! Command templates with fixed named placeholders.
//!
//! Templates are parsed once when a directive is loaded. Rendering is a single
//! pass over literal and placeholder segments, so substituted values are never
//! re-scanned for placeholders.

use std::collections::BTreeMap;
use std::fmt;

/// Placeholder names that are always available.
pub const AMBIENT: &[&str] = &["target", "source4", "source6"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed command template such as `ping -c 5 -I {source4} {target}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template, accepting only placeholders named in `known`.
    ///
    /// `{{` and `}}` produce literal braces.
    pub fn parse(raw: &str, known: &[&str]) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                            Some(ch) => {
                                return Err(format!("unexpected {ch:?} in placeholder"));
                            }
                            None => return Err("unterminated placeholder".into()),
                        }
                    }
                    if !known.contains(&name.as_str()) {
                        return Err(format!("unknown placeholder {{{name}}}"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err("unmatched '}'".into()),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            return Err("empty command".into());
        }
        if shlex::split(raw).is_none() {
            return Err("unbalanced quoting".into());
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template text as written in the catalog.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names used by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn uses(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Substitute every placeholder from `values`.
    ///
    /// Returns the name of the first placeholder without a value.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, String> {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Placeholder(name) => match values.get(name.as_str()) {
                    Some(v) => out.push_str(v),
                    None => return Err(name.clone()),
                },
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
