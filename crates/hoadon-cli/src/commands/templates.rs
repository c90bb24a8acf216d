//! Templates command - manage extraction templates.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use hoadon_core::invoice::TemplateStore;
use hoadon_core::models::template::{FieldSpec, FieldType, InvoiceTemplate, TemplateType};

use super::config;
use super::process::resolve_template;

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List templates
    List,

    /// Show a template as JSON
    Show {
        /// Template id or name
        template: String,
    },

    /// Add a template from flags or a JSON file
    Add(AddArgs),

    /// Remove a template
    Remove {
        /// Template id or name
        template: String,
    },
}

#[derive(Args)]
struct AddArgs {
    /// Template name
    #[arg(short, long, required_unless_present = "file")]
    name: Option<String>,

    /// Source document type: word, pdf or excel
    #[arg(short = 't', long = "type", value_parser = parse_type, default_value = "pdf")]
    template_type: TemplateType,

    /// Description
    #[arg(short, long)]
    description: Option<String>,

    /// Field mapping as name[:string|decimal|date][:required], repeatable
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, FieldSpec)>,

    /// Read the whole template from a JSON file
    #[arg(long, conflicts_with_all = ["name", "description", "fields"])]
    file: Option<PathBuf>,
}

fn parse_type(s: &str) -> Result<TemplateType, String> {
    TemplateType::from_str(s).ok_or_else(|| format!("unknown template type '{}'", s))
}

/// Parse `name[:type][:required]`.
fn parse_field(s: &str) -> Result<(String, FieldSpec), String> {
    let mut parts = s.split(':').map(str::trim);
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| format!("missing field name in '{}'", s))?;

    let mut spec = FieldSpec::default();
    for part in parts {
        match part.to_lowercase().as_str() {
            "string" => spec.field_type = FieldType::String,
            "decimal" => spec.field_type = FieldType::Decimal,
            "date" => spec.field_type = FieldType::Date,
            "required" => spec.required = true,
            other => return Err(format!("unknown field option '{}'", other)),
        }
    }

    Ok((name.to_string(), spec))
}

pub async fn run(args: TemplatesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let mut templates = TemplateStore::open(&config.storage.templates_path)?;

    match args.command {
        TemplatesCommand::List => {
            if templates.list().is_empty() {
                println!("{} No templates defined", style("ℹ").blue());
                return Ok(());
            }
            for template in templates.list() {
                println!(
                    "#{:<4} {:<30} {:<6} {} fields ({} required)",
                    template.id,
                    template.name,
                    template.template_type.as_str(),
                    template.field_mappings.len(),
                    template.required_fields().len()
                );
            }
        }
        TemplatesCommand::Show { template } => {
            let template = resolve_template(&templates, &template)?;
            println!("{}", serde_json::to_string_pretty(template)?);
        }
        TemplatesCommand::Add(add_args) => {
            let template = build_template(add_args)?;
            if templates.find_by_name(&template.name).is_some() {
                anyhow::bail!("Template '{}' already exists", template.name);
            }
            let name = template.name.clone();
            let id = templates.add(template)?;
            println!("{} Added template #{} {}", style("✓").green(), id, name);
        }
        TemplatesCommand::Remove { template } => {
            let id = resolve_template(&templates, &template)?.id;
            let removed = templates.remove(id)?;
            println!(
                "{} Removed template #{} {}",
                style("✓").green(),
                removed.id,
                removed.name
            );
        }
    }

    Ok(())
}

fn build_template(args: AddArgs) -> anyhow::Result<InvoiceTemplate> {
    if let Some(path) = args.file {
        let content = fs::read_to_string(&path)?;
        let template: InvoiceTemplate = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid template {}: {}", path.display(), e))?;
        return Ok(template);
    }

    let name = args
        .name
        .ok_or_else(|| anyhow::anyhow!("--name or --file is required"))?;
    let mut template = InvoiceTemplate::new(name, args.template_type);
    if let Some(description) = args.description {
        template = template.with_description(description);
    }
    for (field, spec) in args.fields {
        template = template.with_field(field, spec);
    }

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        let (name, spec) = parse_field("total_amount:decimal:required").unwrap();
        assert_eq!(name, "total_amount");
        assert_eq!(spec, FieldSpec::new(FieldType::Decimal, true));

        let (name, spec) = parse_field("buyer_name").unwrap();
        assert_eq!(name, "buyer_name");
        assert_eq!(spec, FieldSpec::new(FieldType::String, false));
    }

    #[test]
    fn test_parse_field_rejects_unknown_option() {
        assert!(parse_field("total:money").is_err());
        assert!(parse_field(":decimal").is_err());
    }
}
