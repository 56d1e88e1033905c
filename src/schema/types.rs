//! Field data types
//!
//! The CCV defines a small family of scalar types plus the two lookup types.
//! Unsupported types load fine and only fail when a value is translated.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Data type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `yyyy`
    Year,
    /// `yyyy/mm`
    YearMonth,
    /// `mm/dd`
    MonthDay,
    /// `yyyy-mm-dd`
    Date,
    /// Date and time (unsupported)
    Datetime,
    /// Free text
    String,
    /// Whole number
    Integer,
    /// English/French text pair
    Bilingual,
    /// Value from a controlled vocabulary table
    Vocabulary,
    /// Value from a reference table
    Reference,
    /// PubMed identifier (unsupported)
    PubMed,
    /// Elapsed time (unsupported)
    ElapsedTime,
    /// Any other type label found in the schema (unsupported)
    Other(String),
}

impl DataType {
    /// Map a schema type label to a data type
    pub fn from_label(label: &str) -> Self {
        match label {
            "Year" => DataType::Year,
            "Year Month" => DataType::YearMonth,
            "Month Day" => DataType::MonthDay,
            "Date" => DataType::Date,
            "Datetime" => DataType::Datetime,
            "String" => DataType::String,
            "Integer" | "Number" => DataType::Integer,
            "Bilingual" => DataType::Bilingual,
            "LOV" | "List Of Values" => DataType::Vocabulary,
            "Reference" | "Reference Table" => DataType::Reference,
            "PubMed" => DataType::PubMed,
            "Elapsed-Time" | "Elapsed Time" => DataType::ElapsedTime,
            other => DataType::Other(other.to_string()),
        }
    }

    /// Schema label of the type
    pub fn label(&self) -> &str {
        match self {
            DataType::Year => "Year",
            DataType::YearMonth => "Year Month",
            DataType::MonthDay => "Month Day",
            DataType::Date => "Date",
            DataType::Datetime => "Datetime",
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Bilingual => "Bilingual",
            DataType::Vocabulary => "LOV",
            DataType::Reference => "Reference",
            DataType::PubMed => "PubMed",
            DataType::ElapsedTime => "Elapsed-Time",
            DataType::Other(label) => label,
        }
    }

    /// Entry prompt shown in templates
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            DataType::Year => Some("yyyy"),
            DataType::YearMonth => Some("yyyy/mm"),
            DataType::MonthDay => Some("mm/dd"),
            DataType::Date => Some("yyyy-mm-dd"),
            _ => None,
        }
    }

    /// `format` attribute of the exchange `<value>` element
    pub fn value_format(&self) -> Option<&'static str> {
        match self {
            DataType::Year => Some("yyyy"),
            DataType::YearMonth => Some("yyyy/MM"),
            DataType::MonthDay => Some("MM/dd"),
            DataType::Date => Some("yyyy-MM-dd"),
            _ => None,
        }
    }

    /// `type` attribute of the exchange `<value>` element
    pub fn value_type(&self) -> &str {
        match self {
            DataType::Integer => "Number",
            other => other.label(),
        }
    }

    /// Check if values of this type can be written to the exchange format
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            DataType::Datetime | DataType::PubMed | DataType::ElapsedTime | DataType::Other(_)
        )
    }

    /// Check if this type resolves values through a lookup table
    pub fn is_lookup(&self) -> bool {
        matches!(self, DataType::Vocabulary | DataType::Reference)
    }

    /// Check a raw value against the type's textual format
    pub fn check_format(&self, value: &str) -> Option<String> {
        let ok = match self {
            DataType::Year => YEAR.is_match(value),
            DataType::YearMonth => {
                value.len() == 7 && NaiveDate::parse_from_str(&format!("{}/01", value), "%Y/%m/%d").is_ok()
            }
            DataType::MonthDay => {
                value.len() == 5 && NaiveDate::parse_from_str(&format!("2000/{}", value), "%Y/%m/%d").is_ok()
            }
            DataType::Date => {
                value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
            DataType::Integer => value.parse::<i64>().is_ok(),
            _ => true,
        };

        if ok {
            None
        } else {
            let expected = self.prompt().unwrap_or("a whole number");
            Some(format!("\"{}\" is not in the expected {} format", value, expected))
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A data type declared by the schema definition
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Stable external id
    pub id: String,
    /// Label in the schema language
    pub label: String,
    /// Interpreted data type
    pub data_type: DataType,
}
