//! Mapping format translator
//!
//! Writes a content model as indentation-oriented text that parses back
//! (as YAML) to the mapping the ingester reads, and as a structured
//! `serde_json::Value` of the same shape.
//!
//! Shape rules: record-holding sections are always sequences, containers
//! always mappings, dependent sections a mapping when they hold a single
//! record and a sequence otherwise.

use super::Encoder;
use crate::config::Config;
use crate::content::{ContentModel, Entry, FieldValue};
use crate::error::Result;
use crate::schema::{Section, SectionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Smallest width a folded value is wrapped to
const MIN_WRAP: usize = 20;

/// Scalars a YAML reader would resolve to something other than a string
static NON_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:",
        r"~|null|true|false|yes|no|on|off|y|n|<<",
        r"|[-+]?(?:\d[\d_]*(?:\.\d*)?(?:e[-+]?\d+)?|\.\d+(?:e[-+]?\d+)?)",
        r"|0x[0-9a-f_]+|0o[0-7_]+|0b[01_]+",
        r"|[-+]?\.inf|\.nan",
        r"|\d+(?::[0-5]?\d)+",
        r")$"
    ))
    .unwrap()
});

/// Characters that may not start a plain scalar
const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
    '`',
];

/// Encoder for the indentation-oriented text format
#[derive(Debug, Clone)]
pub struct MappingEncoder {
    width: usize,
    indent: usize,
}

impl Default for MappingEncoder {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl MappingEncoder {
    /// Create an encoder with explicit wrap width and indentation step
    pub fn new(width: usize, indent: usize) -> Self {
        Self {
            width,
            indent: indent.max(2),
        }
    }

    /// Create an encoder using the configured width and indentation
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.width(), config.indent())
    }

    /// Render the whole model
    pub fn to_text(&self, model: &ContentModel) -> Result<String> {
        let entries = model.get(None)?;
        if entries.is_empty() {
            return Ok("{}\n".to_string());
        }

        let mut emitter = Emitter {
            width: self.width,
            indent: self.indent,
            lines: Vec::new(),
        };
        emitter.entries(&entries, 0);

        let mut text = emitter.lines.join("\n");
        text.push('\n');
        Ok(text)
    }
}

impl Encoder for MappingEncoder {
    fn encode(&self, model: &ContentModel) -> Result<String> {
        self.to_text(model)
    }

    fn extension(&self) -> &'static str {
        "yaml"
    }
}

/// Encoder writing the structured mapping as JSON
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    pretty: bool,
}

impl JsonEncoder {
    /// Create a compact JSON encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Encoder for JsonEncoder {
    fn encode(&self, model: &ContentModel) -> Result<String> {
        let value = to_value(model)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// The model as a structured mapping keyed by labels
pub fn to_value(model: &ContentModel) -> Result<Value> {
    Ok(Value::Object(entries_value(&model.get(None)?)))
}

fn entries_value(entries: &[Entry]) -> Map<String, Value> {
    let mut map = Map::new();
    for entry in entries {
        let value = match entry {
            Entry::Field { value, .. } => field_value(value),
            Entry::Section { section, instances } => {
                if as_sequence(section, instances.len()) {
                    Value::Array(
                        instances
                            .iter()
                            .map(|instance| Value::Object(entries_value(instance)))
                            .collect(),
                    )
                } else {
                    Value::Object(
                        instances
                            .first()
                            .map(|instance| entries_value(instance))
                            .unwrap_or_default(),
                    )
                }
            }
        };
        map.insert(entry.label().to_string(), value);
    }
    map
}

fn field_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Bilingual { english, french } => {
            let mut halves = Map::new();
            if !english.is_empty() {
                halves.insert("english".to_string(), Value::String(english.clone()));
            }
            if !french.is_empty() {
                halves.insert("french".to_string(), Value::String(french.clone()));
            }
            Value::Object(halves)
        }
    }
}

fn as_sequence(section: &Section, count: usize) -> bool {
    match section.kind {
        SectionKind::Container => false,
        SectionKind::Record => true,
        SectionKind::Dependent => count != 1,
    }
}

struct Emitter {
    width: usize,
    indent: usize,
    lines: Vec<String>,
}

impl Emitter {
    fn entries(&mut self, entries: &[Entry], col: usize) {
        for entry in entries {
            self.entry(entry, col);
        }
    }

    fn entry(&mut self, entry: &Entry, col: usize) {
        let key = key_text(entry.label());
        match entry {
            Entry::Field { value, .. } => match value {
                FieldValue::Text(text) => self.scalar(&key, text, col),
                FieldValue::Bilingual { english, french } => {
                    self.line(col, format!("{}:", key));
                    if !english.is_empty() {
                        self.scalar("english", english, col + self.indent);
                    }
                    if !french.is_empty() {
                        self.scalar("french", french, col + self.indent);
                    }
                }
            },
            Entry::Section { section, instances } => {
                if as_sequence(section, instances.len()) {
                    self.line(col, format!("{}:", key));
                    for instance in instances {
                        self.item(instance, col + self.indent);
                    }
                } else {
                    match instances.first() {
                        Some(instance) if !instance.is_empty() => {
                            self.line(col, format!("{}:", key));
                            self.entries(instance, col + self.indent);
                        }
                        _ => self.line(col, format!("{}: {{}}", key)),
                    }
                }
            }
        }
    }

    /// One sequence item; its first line carries the `- ` marker
    fn item(&mut self, entries: &[Entry], dash_col: usize) {
        if entries.is_empty() {
            self.line(dash_col, "- {}".to_string());
            return;
        }

        let first = self.lines.len();
        self.entries(entries, dash_col + 2);
        if let Some(line) = self.lines.get_mut(first) {
            line.replace_range(dash_col..dash_col + 2, "- ");
        }
    }

    fn scalar(&mut self, key: &str, text: &str, col: usize) {
        let inline = col + key.chars().count() + 2 + text.chars().count();

        if !is_printable_line(text) {
            self.line(col, format!("{}: {}", key, quoted(text)));
        } else if inline > self.width && has_fold_point(text) {
            self.line(col, format!("{}: >-", key));
            let inner = col + self.indent;
            let available = self.width.saturating_sub(inner).max(MIN_WRAP);
            for folded in fold(text, available) {
                self.line(inner, folded);
            }
        } else if is_plain(text) {
            self.line(col, format!("{}: {}", key, text));
        } else {
            self.line(col, format!("{}: {}", key, quoted(text)));
        }
    }

    fn line(&mut self, col: usize, text: String) {
        self.lines.push(format!("{}{}", " ".repeat(col), text));
    }
}

fn key_text(label: &str) -> String {
    if is_plain(label) {
        label.to_string()
    } else {
        quoted(label)
    }
}

fn quoted(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// No line breaks, tabs or other control characters
fn is_printable_line(text: &str) -> bool {
    !text.chars().any(|c| c.is_control())
}

/// Check if a scalar can be written without quotes and read back unchanged
fn is_plain(text: &str) -> bool {
    let Some(first) = text.chars().next() else {
        return false;
    };

    is_printable_line(text)
        && !INDICATORS.contains(&first)
        && !text.starts_with(char::is_whitespace)
        && !text.ends_with(char::is_whitespace)
        && !text.ends_with(':')
        && !text.contains(": ")
        && !text.contains(" #")
        && !NON_STRING.is_match(text)
}

/// Offsets of the spaces a folded scalar may break at: single spaces
/// between two non-blank characters
fn fold_points(text: &str) -> Vec<usize> {
    let blank = |c: Option<char>| matches!(c, None | Some(' ') | Some('\t'));
    text.char_indices()
        .filter(|(i, c)| {
            *c == ' '
                && !blank(text[..*i].chars().next_back())
                && !blank(text[i + 1..].chars().next())
        })
        .map(|(i, _)| i)
        .collect()
}

fn has_fold_point(text: &str) -> bool {
    !fold_points(text).is_empty()
}

/// Greedy wrap at fold points; joining the result with single spaces
/// gives back `text`
fn fold(text: &str, width: usize) -> Vec<String> {
    let mut words = Vec::new();
    let mut start = 0;
    for point in fold_points(text) {
        words.push(&text[start..point]);
        start = point + 1;
    }
    words.push(&text[start..]);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in words {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    lines.push(current);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_scalars() {
        assert!(is_plain("Intro to Programming"));
        assert!(is_plain("2019/07"));
        assert!(is_plain("CS101"));
        assert!(!is_plain("2019"));
        assert!(!is_plain("yes"));
        assert!(!is_plain("1:30"));
        assert!(!is_plain("Note: see below"));
        assert!(!is_plain("- item"));
        assert!(!is_plain("#tag"));
        assert!(!is_plain(""));
    }

    #[test]
    fn test_fold_points_skip_double_spaces() {
        assert_eq!(fold_points("a b"), vec![1]);
        assert!(fold_points("a  b").is_empty());
        assert!(fold_points(" a").is_empty());
    }

    #[test]
    fn test_fold_wraps_greedily() {
        assert_eq!(fold("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(fold("longword x", 3), vec!["longword", "x"]);
    }

    #[test]
    fn test_long_value_uses_folded_block() {
        let mut emitter = Emitter {
            width: 30,
            indent: 4,
            lines: Vec::new(),
        };
        emitter.scalar("Course Title", "Introduction to the Theory of Computation", 0);
        assert_eq!(
            emitter.lines,
            vec![
                "Course Title: >-",
                "    Introduction to the Theory",
                "    of Computation",
            ]
        );
    }

    #[test]
    fn test_paragraphs_are_quoted() {
        let mut emitter = Emitter {
            width: 80,
            indent: 4,
            lines: Vec::new(),
        };
        emitter.scalar("Notes", "first\n\nsecond", 2);
        assert_eq!(emitter.lines, vec![r#"  Notes: "first\n\nsecond""#]);
    }

    proptest! {
        #[test]
        fn test_folding_is_lossless(words in proptest::collection::vec("[a-z]{1,12}", 1..30), width in 5usize..60) {
            let text = words.join(" ");
            prop_assert_eq!(fold(&text, width).join(" "), text);
        }

        #[test]
        fn test_emitted_scalars_read_back(text in "[ -~]{1,120}") {
            let text = text.trim().to_string();
            prop_assume!(!text.is_empty());

            let mut emitter = Emitter { width: 40, indent: 4, lines: Vec::new() };
            emitter.scalar("key", &text, 0);
            let parsed: Value = serde_yaml::from_str(&emitter.lines.join("\n")).unwrap();
            prop_assert_eq!(parsed["key"].as_str(), Some(text.as_str()));
        }
    }
}
