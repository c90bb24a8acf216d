//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info};

use hoadon_core::invoice::{TemplateStore, VietInvoiceParser};
use hoadon_core::models::config::HoadonConfig;
use hoadon_core::models::invoice::Invoice;
use hoadon_core::models::template::InvoiceTemplate;
use hoadon_core::ocr::{file_extension, is_supported_file, OcrOutcome, OcrService};
use hoadon_core::store::InvoiceStore;

use super::config;
use super::output::{format_invoice, OutputFormat};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, image, or a .txt file with already recognized text)
    #[arg(required = true)]
    input: PathBuf,

    /// Extract with a saved template (id or name) instead of the invoice parser
    #[arg(short, long)]
    template: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Save the extracted invoice to the invoice store
    #[arg(long, conflicts_with = "template")]
    save: bool,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = file_extension(&args.input).unwrap_or_default();
    if extension != "txt" && !is_supported_file(&args.input) {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("invoice")
        .to_string();

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    let ocr = OcrService::from_config(&config.ocr);

    pb.set_message("Reading text...");
    pb.set_position(10);
    let text = read_text(&ocr, &args.input, &extension)?;
    if text.trim().is_empty() {
        pb.abandon();
        anyhow::bail!("No text could be extracted from {}", args.input.display());
    }

    pb.set_message("Extracting invoice data...");
    pb.set_position(70);

    let (output, confidence) = match &args.template {
        Some(reference) => {
            let templates = TemplateStore::open(&config.storage.templates_path)?;
            let template = resolve_template(&templates, reference)?;
            let outcome =
                ocr.process_text(&text, Some(template), config.extraction.confidence_threshold);
            if let Some(error) = &outcome.error {
                pb.abandon();
                anyhow::bail!("Extraction failed: {}", error);
            }
            if !outcome.meets_threshold {
                eprintln!(
                    "{} Confidence {:.1}% is below the {:.1}% threshold",
                    style("!").yellow(),
                    outcome.confidence * 100.0,
                    config.extraction.confidence_threshold * 100.0
                );
            }
            (format_outcome(&outcome, args.format)?, outcome.confidence)
        }
        None => {
            let invoice = extract_invoice(&config, &text, &filename, args.save)?;
            (format_invoice(&invoice, args.format)?, invoice.confidence)
        }
    };

    pb.set_position(100);
    pb.finish_and_clear();

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            confidence * 100.0
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            start.elapsed().as_millis()
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn read_text(ocr: &OcrService, path: &Path, extension: &str) -> anyhow::Result<String> {
    if extension == "txt" {
        return Ok(fs::read_to_string(path)?);
    }

    let result = ocr.extract_text(path)?;
    debug!(
        "{} produced {} characters in {}ms",
        result.backend,
        result.text.len(),
        result.processing_time_ms
    );
    Ok(result.text)
}

fn extract_invoice(
    config: &HoadonConfig,
    text: &str,
    filename: &str,
    save: bool,
) -> anyhow::Result<Invoice> {
    let parser = VietInvoiceParser::from_config(&config.extraction);
    let result = parser.extract_fields(text, filename);

    for warning in &result.warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
    }

    let mut invoice = Invoice::from_extracted(&result.invoice, filename, result.confidence, text);

    if save {
        let store = InvoiceStore::open(&config.storage.invoices_path)?;
        invoice.id = store.insert(invoice.clone())?;
        eprintln!(
            "{} Saved invoice #{} to {}",
            style("✓").green(),
            invoice.id,
            config.storage.invoices_path.display()
        );
    }

    Ok(invoice)
}

/// Look a template up by id, then by name.
pub fn resolve_template<'a>(
    templates: &'a TemplateStore,
    reference: &str,
) -> anyhow::Result<&'a InvoiceTemplate> {
    reference
        .parse::<u64>()
        .ok()
        .and_then(|id| templates.get(id))
        .or_else(|| templates.find_by_name(reference))
        .ok_or_else(|| anyhow::anyhow!("Template not found: {}", reference))
}

fn format_outcome(outcome: &OcrOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record(["field", "value"])?;
            for (field, value) in &outcome.structured_data {
                wtr.write_record([field.as_str(), &plain_value(value)])?;
            }
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut output = String::new();
            if let Some(template) = &outcome.template_used {
                output.push_str(&format!("Template: {}\n\n", template));
            }
            for (field, value) in &outcome.structured_data {
                output.push_str(&format!("{}: {}\n", field, plain_value(value)));
            }
            Ok(output)
        }
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoadon_core::models::template::TemplateType;

    #[test]
    fn test_resolve_template_by_id_and_name() {
        let mut templates = TemplateStore::in_memory();
        let id = templates
            .add(InvoiceTemplate::new("Điện lực", TemplateType::Pdf))
            .unwrap();

        assert_eq!(resolve_template(&templates, &id.to_string()).unwrap().id, id);
        assert_eq!(resolve_template(&templates, "điện lực").unwrap().id, id);
        assert!(resolve_template(&templates, "99").is_err());
    }

    #[test]
    fn test_plain_value() {
        assert_eq!(plain_value(&Value::String("HD001".into())), "HD001");
        assert_eq!(plain_value(&serde_json::json!(121000)), "121000");
        assert_eq!(plain_value(&Value::Null), "");
    }
}
