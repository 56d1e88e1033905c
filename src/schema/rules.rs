//! Field validation rules
//!
//! Each constraint in the schema names a government-defined rule kind by
//! numeric id. Only a subset of kinds is checked; the rest validate to
//! nothing and say so in their prompt.

use crate::content::FieldValue;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Rule kind: value length limit
pub const MAX_LENGTH: u32 = 8;
/// Rule kind: value must not be blank
pub const REQUIRED: u32 = 11;
/// Rule kind: limit on the number of `;`-separated entries
pub const MAX_COUNT: u32 = 18;
/// Rule kind: required depending on another field's value
pub const CONDITIONAL_REQUIRED: u32 = 20;
/// Rule kind: must be blank when another field is filled
pub const MUTUALLY_EXCLUSIVE: u32 = 24;

/// Comparator id meaning "equals" in conditional-required parameters
const EQUALS_OPERATOR: &str = "359";

static ID_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([^:]*?)\s*(?::.*)?$").unwrap());

/// Comparison applied by a conditional-required rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Other field equals the value
    Equals,
    /// Other field does not equal the value
    NotEquals,
}

/// A validation rule bound to one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// At most this many characters (per language for bilingual values)
    MaxLength(usize),
    /// Must not be blank
    Required,
    /// At most this many `;`-separated entries
    MaxCount(usize),
    /// Required when another field of the record compares to a value
    RequiredIf {
        /// Id of the other field
        field_id: String,
        /// Label of the other field
        field_label: String,
        /// How the other field is compared
        comparator: Comparator,
        /// Vocabulary label the other field is compared with
        value: String,
    },
    /// Must be blank when another field of the record is filled
    MutuallyExclusive {
        /// Id of the other field
        field_id: String,
        /// Label of the other field
        field_label: String,
    },
    /// A rule kind that is not checked
    NotChecked {
        /// Numeric rule kind
        kind: u32,
        /// Label of the rule definition
        label: String,
    },
}

/// Lookups a rule needs while its parameters are parsed
pub trait RuleContext {
    /// Label of a field by id
    fn field_label(&self, field_id: &str) -> Option<String>;

    /// Label of a controlled vocabulary value by table and value id
    fn vocabulary_label(&self, table_id: &str, value_id: &str) -> Option<String>;
}

fn id_prefix(part: &str) -> &str {
    ID_PREFIX
        .captures(part)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(part)
}

fn parse_count(kind: u32, parameters: &str) -> Result<usize> {
    parameters.trim().parse::<usize>().map_err(|_| {
        Error::schema(format!(
            "rule {} expects a numeric parameter, got \"{}\"",
            kind, parameters
        ))
    })
}

impl Rule {
    /// Build a rule from its kind, definition label and raw parameters
    pub fn build(
        kind: u32,
        label: &str,
        parameters: &str,
        ctx: &dyn RuleContext,
    ) -> Result<Self> {
        let rule = match kind {
            MAX_LENGTH => Rule::MaxLength(parse_count(kind, parameters)?),
            REQUIRED => Rule::Required,
            MAX_COUNT => Rule::MaxCount(parse_count(kind, parameters)?),
            CONDITIONAL_REQUIRED => {
                // "<n>;<field id>:..;<table id>:..;<operator>:..;<value id>"
                let parts: Vec<&str> = parameters.split(';').collect();
                if parts.len() < 5 {
                    return Err(Error::schema(format!(
                        "rule {} parameters \"{}\" are incomplete",
                        kind, parameters
                    )));
                }

                let field_id = id_prefix(parts[1]).to_string();
                let table_id = id_prefix(parts[2]);
                let operator = id_prefix(parts[parts.len() - 2]);
                let value_id = parts[parts.len() - 1].trim();

                let field_label = ctx.field_label(&field_id).ok_or_else(|| {
                    Error::schema(format!("rule {} refers to unknown field {}", kind, field_id))
                })?;
                let value = ctx.vocabulary_label(table_id, value_id).ok_or_else(|| {
                    Error::schema(format!(
                        "rule {} refers to unknown value {} of table {}",
                        kind, value_id, table_id
                    ))
                })?;

                let comparator = if operator == EQUALS_OPERATOR {
                    Comparator::Equals
                } else {
                    Comparator::NotEquals
                };

                Rule::RequiredIf {
                    field_id,
                    field_label,
                    comparator,
                    value,
                }
            }
            MUTUALLY_EXCLUSIVE => {
                let field_id = id_prefix(parameters).to_string();
                let field_label = ctx.field_label(&field_id).ok_or_else(|| {
                    Error::schema(format!("rule {} refers to unknown field {}", kind, field_id))
                })?;
                Rule::MutuallyExclusive {
                    field_id,
                    field_label,
                }
            }
            _ => Rule::NotChecked {
                kind,
                label: label.to_string(),
            },
        };

        Ok(rule)
    }

    /// Check a value; `siblings` holds the other field values of the record
    /// keyed by field id
    pub fn validate(
        &self,
        value: &FieldValue,
        siblings: &IndexMap<String, FieldValue>,
    ) -> Option<String> {
        let sibling_text = |id: &str| {
            siblings
                .get(id)
                .map(|v| v.display_text().to_string())
                .unwrap_or_default()
        };

        match self {
            Rule::MaxLength(max) => {
                let longest = value.parts().map(|p| p.chars().count()).max().unwrap_or(0);
                (longest > *max).then(|| format!("too long ({} > {} characters)", longest, max))
            }
            Rule::Required => value.is_empty().then(|| "null entries not allowed".to_string()),
            Rule::MaxCount(max) => {
                let count = value.entry_count();
                (count > *max).then(|| format!("too many entries ({} > {})", count, max))
            }
            Rule::RequiredIf {
                field_id,
                field_label,
                comparator,
                value: expected,
            } => {
                let other = sibling_text(field_id);
                let (triggered, relation) = match comparator {
                    Comparator::Equals => (other == *expected, "is"),
                    Comparator::NotEquals => (other != *expected, "is not"),
                };
                (value.is_empty() && triggered).then(|| {
                    format!("entry required if {} {} {}", field_label, relation, expected)
                })
            }
            Rule::MutuallyExclusive {
                field_id,
                field_label,
            } => {
                let other = sibling_text(field_id);
                (!other.is_empty() && !value.is_empty())
                    .then(|| format!("Must be left blank if using {}", field_label))
            }
            Rule::NotChecked { .. } => None,
        }
    }

    /// Human readable description of the rule
    pub fn prompt(&self) -> String {
        match self {
            Rule::MaxLength(max) => format!("Must be fewer than {} characters long.", max),
            Rule::Required => "Must not be left blank.".to_string(),
            Rule::MaxCount(max) => format!("Must have {} entries or fewer.", max),
            Rule::RequiredIf {
                field_label,
                comparator,
                value,
                ..
            } => match comparator {
                Comparator::Equals => format!("Required if {} is {}", field_label, value),
                Comparator::NotEquals => format!("Required if {} is not {}", field_label, value),
            },
            Rule::MutuallyExclusive { field_label, .. } => {
                format!("Mutually exclusive with {}.", field_label)
            }
            Rule::NotChecked { label, .. } => format!("\"{}\" -- not currently checked", label),
        }
    }
}

/// Run every rule and join the failures into one message
pub fn validate_all(
    rules: &[Rule],
    value: &FieldValue,
    siblings: &IndexMap<String, FieldValue>,
) -> Option<String> {
    let messages: Vec<String> = rules
        .iter()
        .filter_map(|rule| rule.validate(value, siblings))
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx;

    impl RuleContext for Ctx {
        fn field_label(&self, field_id: &str) -> Option<String> {
            match field_id {
                "f_status" => Some("Degree Status".to_string()),
                "f_expected" => Some("Expected Date".to_string()),
                _ => None,
            }
        }

        fn vocabulary_label(&self, table_id: &str, value_id: &str) -> Option<String> {
            (table_id == "t_status" && value_id == "v_progress").then(|| "In Progress".to_string())
        }
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_max_length() {
        let rule = Rule::build(MAX_LENGTH, "Validate Max Length", "5", &Ctx).unwrap();
        let none = IndexMap::new();
        assert_eq!(rule, Rule::MaxLength(5));
        assert!(rule.validate(&text("abcde"), &none).is_none());
        assert!(rule.validate(&text("abcdef"), &none).unwrap().starts_with("too long"));
        assert_eq!(rule.prompt(), "Must be fewer than 5 characters long.");
    }

    #[test]
    fn test_max_length_bilingual() {
        let rule = Rule::MaxLength(3);
        let value = FieldValue::Bilingual {
            english: "abc".to_string(),
            french: "abcd".to_string(),
        };
        assert!(rule.validate(&value, &IndexMap::new()).is_some());
    }

    #[test]
    fn test_required_and_count() {
        let none = IndexMap::new();
        assert!(Rule::Required.validate(&text(""), &none).is_some());
        assert!(Rule::Required.validate(&text("x"), &none).is_none());
        assert!(Rule::MaxCount(2).validate(&text("a; b"), &none).is_none());
        assert!(Rule::MaxCount(2).validate(&text("a; b; c"), &none).is_some());
    }

    #[test]
    fn test_conditional_required() {
        let rule = Rule::build(
            CONDITIONAL_REQUIRED,
            "Validate Conditional Required",
            "1;f_status:Degree Status;t_status:Degree Status;359:Equals;v_progress",
            &Ctx,
        )
        .unwrap();
        assert_eq!(rule.prompt(), "Required if Degree Status is In Progress");

        let mut siblings = IndexMap::new();
        siblings.insert("f_status".to_string(), text("In Progress"));
        assert_eq!(
            rule.validate(&text(""), &siblings).as_deref(),
            Some("entry required if Degree Status is In Progress")
        );
        assert!(rule.validate(&text("2024/05"), &siblings).is_none());

        siblings.insert("f_status".to_string(), text("Completed"));
        assert!(rule.validate(&text(""), &siblings).is_none());
    }

    #[test]
    fn test_conditional_not_equals() {
        let rule = Rule::build(
            CONDITIONAL_REQUIRED,
            "Validate Conditional Required",
            "1;f_status:x;t_status:x;360:Not Equals;v_progress",
            &Ctx,
        )
        .unwrap();
        // A blank sibling is "not In Progress"
        assert!(rule.validate(&text(""), &IndexMap::new()).is_some());
    }

    #[test]
    fn test_mutually_exclusive() {
        let rule = Rule::build(MUTUALLY_EXCLUSIVE, "Validate Exclusive", "f_expected:Expected Date", &Ctx)
            .unwrap();

        let mut siblings = IndexMap::new();
        assert!(rule.validate(&text("2020/01"), &siblings).is_none());
        siblings.insert("f_expected".to_string(), text("2024/05"));
        assert_eq!(
            rule.validate(&text("2020/01"), &siblings).as_deref(),
            Some("Must be left blank if using Expected Date")
        );
        assert!(rule.validate(&text(""), &siblings).is_none());
    }

    #[test]
    fn test_unknown_references_fail() {
        assert!(Rule::build(MUTUALLY_EXCLUSIVE, "x", "nope:Nope", &Ctx).is_err());
        assert!(Rule::build(CONDITIONAL_REQUIRED, "x", "1;f_status", &Ctx).is_err());
        assert!(Rule::build(MAX_LENGTH, "x", "many", &Ctx).is_err());
    }

    #[test]
    fn test_not_checked() {
        let rule = Rule::build(19, "Validate Primary Record Chosen", "", &Ctx).unwrap();
        assert!(rule.validate(&text(""), &IndexMap::new()).is_none());
        assert_eq!(
            rule.prompt(),
            "\"Validate Primary Record Chosen\" -- not currently checked"
        );
    }

    #[test]
    fn test_validate_all_joins_messages() {
        let rules = vec![Rule::Required, Rule::MaxLength(0), Rule::MaxCount(0)];
        let msg = validate_all(&rules, &text(""), &IndexMap::new());
        assert_eq!(msg.as_deref(), Some("null entries not allowed"));

        let msg = validate_all(&rules, &text("ab"), &IndexMap::new()).unwrap();
        assert_eq!(msg, "too long (2 > 0 characters); too many entries (1 > 0)");
    }
}
