//! Command-line interface for canadianccv

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use canadianccv::converters::{
    create_encoder, import_document, section_template, OutputFormat, TemplateOptions,
};
#[cfg(feature = "cli")]
use canadianccv::loaders::Loader;
#[cfg(feature = "cli")]
use canadianccv::schema::{FieldType, Section};
#[cfg(feature = "cli")]
use canadianccv::{Config, ContentModel, Language, SchemaIndex, SchemaSources};
#[cfg(feature = "cli")]
use serde_json::json;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "ccv")]
#[command(author, version, about = "Canadian Common CV validation and translation tool", long_about = None)]
struct Cli {
    /// Directory holding cv.xml, cv-lov.xml and cv-ref-table.xml
    #[arg(short, long, global = true, default_value = ".", value_name = "DIR")]
    schema_dir: PathBuf,

    /// TOML settings file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Schema language: english or french (overrides the settings file)
    #[arg(short, long, global = true)]
    language: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a CV from record files
    Build {
        /// YAML or TOML record files
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Output format: xml, yaml or json
        #[arg(short, long, default_value = "xml")]
        format: String,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert an exchange XML document to the text format
    Import {
        /// Exchange XML document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format: yaml or json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print an entry template for a section
    Template {
        /// Section label
        #[arg(value_name = "SECTION")]
        section: String,

        /// Label of the parent section, for labels used more than once
        #[arg(short, long)]
        parent: Option<String>,

        /// Leave out description, type and constraint comments
        #[arg(long)]
        bare: bool,
    },

    /// Show schema details for a section, field or lookup table
    Inspect {
        /// Section label
        #[arg(long)]
        section: Option<String>,

        /// Label of the parent section
        #[arg(short, long)]
        parent: Option<String>,

        /// Field label, within --section
        #[arg(long, requires = "section")]
        field: Option<String>,

        /// Controlled vocabulary or reference table label
        #[arg(short, long)]
        table: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(language) = &cli.language {
        config = config.with_language(language.parse::<Language>()?);
    }

    let sources = SchemaSources::from_dir(&cli.schema_dir);
    let schema = Arc::new(SchemaIndex::load(&sources, config.language(), &Loader::new())?);

    match cli.command {
        Commands::Build {
            files,
            format,
            pretty,
            output,
        } => cmd_build(schema, config, files, format, pretty, output),
        Commands::Import { file, format, output } => cmd_import(schema, config, file, format, output),
        Commands::Template {
            section,
            parent,
            bare,
        } => cmd_template(&schema, &config, &section, parent.as_deref(), bare),
        Commands::Inspect {
            section,
            parent,
            field,
            table,
            json,
        } => cmd_inspect(&schema, section, parent, field, table, json),
    }
}

#[cfg(feature = "cli")]
fn write_output(text: &str, output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            eprintln!("Output written to: {}", path.display());
        }
        None => println!("{}", text.trim_end_matches('\n')),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_build(
    schema: Arc<SchemaIndex>,
    config: Config,
    files: Vec<PathBuf>,
    format: String,
    pretty: bool,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let format: OutputFormat = format.parse()?;
    let encoder = create_encoder(format, &config, pretty);
    let mut model = ContentModel::new(schema, config);

    let mut skipped = 0;
    for file in &files {
        let report = model.add_file(file)?;
        skipped += report.skipped;
    }
    if skipped > 0 {
        eprintln!("{} record(s) skipped", skipped);
    }

    write_output(&encoder.encode(&model)?, output.as_deref())
}

#[cfg(feature = "cli")]
fn cmd_import(
    schema: Arc<SchemaIndex>,
    config: Config,
    file: PathBuf,
    format: String,
    output: Option<PathBuf>,
) -> CliResult<()> {
    let format: OutputFormat = format.parse()?;
    if format == OutputFormat::Xml {
        return Err("import writes yaml or json".into());
    }

    let encoder = create_encoder(format, &config, true);
    let xml = fs::read_to_string(&file)?;
    let mut model = ContentModel::new(schema, config);
    let warnings = import_document(&mut model, &xml)?;
    if !warnings.is_empty() {
        eprintln!("{} entr(ies) could not be imported", warnings.len());
    }

    write_output(&encoder.encode(&model)?, output.as_deref())
}

#[cfg(feature = "cli")]
fn cmd_template(
    schema: &SchemaIndex,
    config: &Config,
    section: &str,
    parent: Option<&str>,
    bare: bool,
) -> CliResult<()> {
    let section = schema.section_by_label(section, parent)?;
    let mut options = TemplateOptions::from_config(config);
    if bare {
        options.descriptions = false;
        options.types = false;
        options.constraints = false;
    }

    let body = section_template(schema, section, &options)?;
    println!("_section: {}", section.label);
    if let Some(parent) = &section.parent_label {
        println!("_category: {}", parent);
    }
    println!();
    print!("{}", body);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema: &SchemaIndex,
    section: Option<String>,
    parent: Option<String>,
    field: Option<String>,
    table: Option<String>,
    json_output: bool,
) -> CliResult<()> {
    if let Some(label) = table {
        return print_table_details(schema, &label, json_output);
    }

    let Some(label) = section else {
        print_schema_summary(schema, json_output)?;
        return Ok(());
    };
    let section = schema.section_by_label(&label, parent.as_deref())?;

    match field {
        Some(field) => print_field_details(schema, section, &field, json_output),
        None => print_section_details(schema, section, json_output),
    }
}

#[cfg(feature = "cli")]
fn print_schema_summary(schema: &SchemaIndex, json_output: bool) -> CliResult<()> {
    let (sections, fields, tables) = schema.stats();
    let roots: Vec<&str> = schema.root_sections().iter().map(|s| s.label.as_str()).collect();

    if json_output {
        let value = json!({
            "language": schema.language().code(),
            "sections": sections,
            "fields": fields,
            "tables": tables,
            "roots": roots,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== CCV Schema ===");
    println!("Language: {}", schema.language());
    println!("Sections: {}", sections);
    println!("Fields:   {}", fields);
    println!("Tables:   {}", tables);
    println!("\n=== Top-level Sections ===");
    for root in roots {
        println!("  {}", root);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_section_details(schema: &SchemaIndex, section: &Section, json_output: bool) -> CliResult<()> {
    let fields = schema.fields_of(section);
    let subsections = schema.subsections(section);

    if json_output {
        let value = json!({
            "id": section.id,
            "label": section.label,
            "description": section.description,
            "parent": section.parent_label,
            "kind": format!("{:?}", section.kind),
            "fields": fields.iter().map(|f| json!({
                "id": f.id,
                "label": f.label,
                "type": f.data_type.label(),
            })).collect::<Vec<_>>(),
            "sections": subsections.iter().map(|s| s.label.as_str()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== Section: {} ===", section.label);
    println!("Id:     {}", section.id);
    println!("Kind:   {:?}", section.kind);
    if let Some(parent) = &section.parent_label {
        println!("Parent: {}", parent);
    }
    if let Some(description) = &section.description {
        println!("Description: {}", description);
    }

    if !fields.is_empty() {
        println!("\nFields:");
        for field in fields {
            println!("  {} : {}", field.label, field.data_type.label());
        }
    }
    if !subsections.is_empty() {
        println!("\nSubsections:");
        for subsection in subsections {
            println!("  {}", subsection.label);
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_field_details(schema: &SchemaIndex, section: &Section, label: &str, json_output: bool) -> CliResult<()> {
    let field = schema.field(section, label)?;
    let table = match schema.field_type(field)? {
        FieldType::Vocabulary(table) => Some(table.label.as_str()),
        FieldType::Reference(table) => Some(table.label.as_str()),
        FieldType::Scalar(_) => None,
    };
    let rules: Vec<String> = field.rules.iter().map(|r| r.prompt()).collect();

    if json_output {
        let value = json!({
            "id": field.id,
            "label": field.label,
            "section": section.label,
            "description": field.description,
            "type": field.data_type.label(),
            "prompt": field.data_type.prompt(),
            "table": table,
            "rules": rules,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== Field: {} ===", field.label);
    println!("Id:      {}", field.id);
    println!("Section: {}", section.label);
    print!("Type:    {}", field.data_type.label());
    match field.data_type.prompt() {
        Some(prompt) => println!(" ({})", prompt),
        None => println!(),
    }
    if let Some(table) = table {
        println!("Table:   {}", table);
    }
    if let Some(description) = &field.description {
        println!("Description: {}", description);
    }
    for rule in rules {
        println!("  - {}", rule);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_table_details(schema: &SchemaIndex, label: &str, json_output: bool) -> CliResult<()> {
    let (id, kind, levels, values) = if let Ok(table) = schema.vocabulary_by_label(label) {
        (table.id.as_str(), "vocabulary", Vec::new(), table.labels())
    } else {
        let table = schema.reference_by_label(label)?;
        let levels = table.levels.iter().map(|l| l.label.as_str()).collect();
        (table.id.as_str(), "reference", levels, table.labels())
    };

    if json_output {
        let value = json!({
            "id": id,
            "label": label,
            "kind": kind,
            "levels": levels,
            "values": values,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== Table: {} ({}) ===", label, kind);
    println!("Id: {}", id);
    if !levels.is_empty() {
        println!("Levels: {}", levels.join(" > "));
    }
    println!("Values: {}", values.len());
    for value in values {
        println!("  {}", value);
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
