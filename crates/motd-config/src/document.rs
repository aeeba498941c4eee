//! Parsing and serialization of git-config style documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One `[name]` block and its entries, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// The last value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Section → key → value document.
///
/// Lookups ignore ASCII case in section and key names; the spelling seen
/// first is the one written back out. A repeated key resolves to its last
/// value, and a repeated section header continues the earlier section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = parse_section_header(header, line_no)?;
                current = Some(doc.section_index_or_insert(name));
                continue;
            }

            let Some(section) = current else {
                return Err(ConfigError::EntryOutsideSection { line: line_no });
            };
            let (key, value) = match line.split_once('=') {
                Some((key, rest)) => (key.trim(), parse_value(rest, line_no)?),
                // A bare key is a boolean flag, as in git.
                None => (strip_comment(line).trim(), "true".to_string()),
            };
            if !is_valid_key(key) {
                return Err(ConfigError::InvalidKey {
                    line: line_no,
                    key: key.to_string(),
                });
            }
            doc.sections[section]
                .entries
                .push((key.to_string(), value));
        }
        Ok(doc)
    }

    /// Look up `section.key`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Set `section.key` to `value`, replacing every earlier value.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let index = self.section_index_or_insert(section.to_string());
        let entries = &mut self.sections[index].entries;
        let value = value.into();
        match entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(first) => {
                entries[first].1 = value;
                let mut seen = 0usize;
                entries.retain(|(k, _)| {
                    if !k.eq_ignore_ascii_case(key) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => entries.push((key.to_string(), value)),
        }
    }

    /// Remove `section.key`. Returns `true` if anything was removed.
    pub fn unset(&mut self, section: &str, key: &str) -> bool {
        let Some(index) = self.section_index(section) else {
            return false;
        };
        let entries = &mut self.sections[index].entries;
        let before = entries.len();
        entries.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before != entries.len()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.section_index(name).map(|i| &self.sections[i])
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns `true` if the document has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.entries.is_empty())
    }

    /// Serialize to text that [`parse`](Self::parse) reads back unchanged.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.entries {
                out.push('\t');
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(&quote_value(value));
                out.push('\n');
            }
        }
        out
    }

    fn section_index(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
    }

    fn section_index_or_insert(&mut self, name: String) -> usize {
        match self.section_index(&name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn parse_section_header(header: &str, line: usize) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSection {
        line,
        reason: reason.to_string(),
    };
    let (name, trailer) = header.split_once(']').ok_or_else(|| invalid("missing ']'"))?;
    if !strip_comment(trailer).trim().is_empty() {
        return Err(invalid("unexpected text after ']'"));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("empty section name"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid("section names may only contain letters, digits, '-' and '.'"));
    }
    Ok(name.to_string())
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => false,
    }
}

fn strip_comment(s: &str) -> &str {
    match s.find(['#', ';']) {
        Some(pos) => &s[..pos],
        None => s,
    }
}

/// Decode the right-hand side of `key = value`.
///
/// Whitespace outside quotes is trimmed at both ends and kept between
/// words; `#` or `;` outside quotes starts a comment.
fn parse_value(raw: &str, line: usize) -> Result<String, ConfigError> {
    let mut out = String::new();
    let mut pending_ws = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                out.push_str(&pending_ws);
                pending_ws.clear();
            }
            '\\' => {
                let escaped = match chars.next() {
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some(other) => {
                        return Err(ConfigError::InvalidValue {
                            line,
                            reason: format!("unknown escape sequence \\{other}"),
                        })
                    }
                    None => {
                        return Err(ConfigError::InvalidValue {
                            line,
                            reason: "dangling backslash".to_string(),
                        })
                    }
                };
                out.push_str(&pending_ws);
                pending_ws.clear();
                out.push(escaped);
            }
            '#' | ';' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => {
                if !out.is_empty() {
                    pending_ws.push(c);
                }
            }
            c => {
                out.push_str(&pending_ws);
                pending_ws.clear();
                out.push(c);
            }
        }
    }

    if in_quotes {
        return Err(ConfigError::InvalidValue {
            line,
            reason: "unterminated quoted value".to_string(),
        });
    }
    Ok(out)
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['#', ';', '"', '\\', '\n', '\t', '\r']);
    if !needs_quotes {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
