//! Section templates for the text format
//!
//! A template lists every field of a section as an empty `Label:` entry,
//! preceded by comment lines describing what the field takes, followed by
//! the templates of the subsections one indentation level deeper.

use crate::config::Config;
use crate::error::Result;
use crate::schema::{Field, SchemaIndex, Section};

/// Placeholder appended to truncated comment lines
const PLACEHOLDER: &str = " ...";

const DESCRIPTION_TAG: &str = "[Description]";

/// What a template includes and how it is laid out
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Wrap width of comment lines, indentation included
    pub width: usize,
    /// Spaces per nesting level
    pub indent: usize,
    /// Maximum lines of a wrapped description; other comments are never cut
    pub max_lines: usize,
    /// Include field descriptions
    pub descriptions: bool,
    /// Include type, prompt and lookup options
    pub types: bool,
    /// Include rule prompts
    pub constraints: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            width: 80,
            indent: 4,
            max_lines: 2,
            descriptions: true,
            types: true,
            constraints: true,
        }
    }
}

impl TemplateOptions {
    /// Options using the configured width and indentation
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.width(),
            indent: config.indent(),
            ..Self::default()
        }
    }
}

/// Render the template of a section
pub fn section_template(schema: &SchemaIndex, section: &Section, options: &TemplateOptions) -> Result<String> {
    let mut lines = Vec::new();
    push_section(schema, section, options, 0, &mut lines)?;
    Ok(lines.join("\n"))
}

fn push_section(
    schema: &SchemaIndex,
    section: &Section,
    options: &TemplateOptions,
    level: usize,
    lines: &mut Vec<String>,
) -> Result<()> {
    let indent = " ".repeat(options.indent * level);

    let prefix = format!("{}# ", indent);
    for field in schema.fields_of(section) {
        for comment in field_comments(schema, field, options)? {
            let max_lines = comment.starts_with(DESCRIPTION_TAG).then_some(options.max_lines);
            lines.extend(wrap(&comment, &prefix, options.width, max_lines));
        }
        lines.push(format!("{}{}:", indent, field.label));
        lines.push(String::new());
    }

    for subsection in schema.subsections(section) {
        lines.push(format!("{}{}:", indent, subsection.label));
        lines.push(String::new());
        push_section(schema, subsection, options, level + 1, lines)?;
    }

    Ok(())
}

fn field_comments(schema: &SchemaIndex, field: &Field, options: &TemplateOptions) -> Result<Vec<String>> {
    let mut comments = Vec::new();

    if options.descriptions {
        if let Some(description) = field.description.as_deref().filter(|d| !d.trim().is_empty()) {
            comments.push(format!("{} {}", DESCRIPTION_TAG, description.trim()));
        }
    }

    if options.types {
        let mut line = format!("[Type] {}", field.data_type.label());
        if let Some(prompt) = field.data_type.prompt() {
            line.push_str(" -- ");
            line.push_str(prompt);
        }
        comments.push(line);

        if field.is_lookup() {
            let mut labels = schema.lookup_labels(field)?;
            labels.sort_unstable();
            comments.push(format!("[Options] {}", labels.join(", ")));
        }
    }

    if options.constraints {
        comments.extend(field.rules.iter().map(|rule| format!("[Constraint] {}", rule.prompt())));
    }

    Ok(comments)
}

/// Greedy wrap at whitespace; words longer than a line stay whole and the
/// last kept line ends with the placeholder when lines are dropped
fn wrap(text: &str, prefix: &str, width: usize, max_lines: Option<usize>) -> Vec<String> {
    let available = width.saturating_sub(prefix.chars().count()).max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= available {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let max_lines = max_lines.map_or(usize::MAX, |n| n.max(1));
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let limit = available.saturating_sub(PLACEHOLDER.len());
            while last.chars().count() > limit {
                match last.rfind(' ') {
                    Some(cut) => last.truncate(cut),
                    None => break,
                }
            }
            last.push_str(PLACEHOLDER);
        }
    }

    lines.into_iter().map(|line| format!("{}{}", prefix, line)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Language;
    use pretty_assertions::assert_eq;

    const CV: &str = r#"<cv>
        <type id="t_str" englishName="String"/>
        <type id="t_ym" englishName="Year Month"/>
        <type id="t_lov" englishName="LOV"/>
        <rule id="8" englishName="Max Length"/>
        <rule id="11" englishName="Required"/>
        <section id="s1" englishName="Courses Taught">
            <field id="f1" englishName="Course Title" dataType="t_str" orderIndex="1" englishDescription="Title of the course">
                <constraint id="c1" validatorRule="11"/>
                <constraint id="c2" validatorRule="8" parameters="250"/>
            </field>
            <field id="f2" englishName="Start Date" dataType="t_ym" orderIndex="2"/>
            <field id="f3" englishName="Course Level" dataType="t_lov" lookupId="lvl" orderIndex="0"/>
            <section id="s2" englishName="Co-Instructors">
                <field id="f4" englishName="Name" dataType="t_str"/>
            </section>
        </section>
    </cv>"#;

    const LOV: &str = r#"<lovs>
        <table id="lvl" englishName="Course Level">
            <code id="2" englishName="Undergraduate"/>
            <code id="1" englishName="Graduate"/>
        </table>
    </lovs>"#;

    fn schema() -> SchemaIndex {
        SchemaIndex::from_strings(CV, LOV, "<refs/>", Language::English).unwrap()
    }

    #[test]
    fn test_section_template() {
        let schema = schema();
        let section = schema.section_by_id("s1").unwrap();
        let text = section_template(&schema, section, &TemplateOptions::default()).unwrap();

        let expected = "\
# [Type] LOV
# [Options] Graduate, Undergraduate
Course Level:

# [Description] Title of the course
# [Type] String
# [Constraint] Must not be left blank.
# [Constraint] Must be fewer than 250 characters long.
Course Title:

# [Type] Year Month -- yyyy/mm
Start Date:

Co-Instructors:

    # [Type] String
    Name:
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_template_without_comments() {
        let schema = schema();
        let section = schema.section_by_id("s2").unwrap();
        let options = TemplateOptions {
            descriptions: false,
            types: false,
            constraints: false,
            ..TemplateOptions::default()
        };
        assert_eq!(section_template(&schema, section, &options).unwrap(), "Name:\n");
    }

    #[test]
    fn test_wrap_truncates_with_placeholder() {
        let lines = wrap("one two three four five six seven eight nine", "# ", 20, Some(2));
        assert_eq!(lines, vec!["# one two three four", "# five six seven ..."]);

        let lines = wrap("one two three four five six seven eight nine", "# ", 20, None);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "# eight nine");
    }

    #[test]
    fn test_only_descriptions_are_cut() {
        let schema = schema();
        let section = schema.section_by_id("s1").unwrap();
        let options = TemplateOptions {
            width: 26,
            max_lines: 1,
            ..TemplateOptions::default()
        };
        let text = section_template(&schema, section, &options).unwrap();

        assert!(text.contains("# [Description] Title ...\n"), "{}", text);
        assert!(text.contains("# [Options] Graduate,\n# Undergraduate\n"), "{}", text);
        assert!(text.contains("# [Constraint] Must be\n# fewer than 250\n# characters long.\n"), "{}", text);
    }
}
