//! Invoices command - browse and manage the invoice store.

use std::fs;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Subcommand};
use console::style;
use serde_json::json;

use hoadon_core::analytics;
use hoadon_core::models::invoice::InvoiceStatus;
use hoadon_core::store::{vietnam_today, InvoiceFilter, InvoiceStore, Page, TimeFilter};

use super::config;
use super::output::{format_invoice, format_invoices, invoice_line, money, OutputFormat};

/// Arguments for the invoices command.
#[derive(Args)]
pub struct InvoicesArgs {
    #[command(subcommand)]
    command: InvoicesCommand,
}

#[derive(Subcommand)]
enum InvoicesCommand {
    /// List saved invoices, newest first
    List(ListArgs),

    /// Show one invoice
    Show {
        /// Invoice id
        id: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search by file name, code, seller, buyer or kind
    Search {
        /// Search text
        query: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Dashboard statistics
    Stats {
        /// Year for the monthly revenue table (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all invoices
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: OutputFormat,
    },

    /// Change the payment status of an invoice
    Status {
        /// Invoice id
        id: u64,

        /// New status (pending, paid, overdue, cancelled)
        #[arg(value_parser = parse_status)]
        status: InvoiceStatus,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Only invoices with this status
    #[arg(short, long, value_parser = parse_status)]
    status: Option<InvoiceStatus>,

    /// Time window: today, yesterday, week, month or all
    #[arg(long, value_parser = parse_period, default_value = "all")]
    period: TimeFilter,

    /// Earliest invoice date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest invoice date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Search text
    #[arg(long)]
    search: Option<String>,

    /// Page number
    #[arg(long, default_value = "1")]
    page: usize,

    /// Invoices per page
    #[arg(long, default_value = "20")]
    per_page: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn parse_status(s: &str) -> Result<InvoiceStatus, String> {
    InvoiceStatus::from_str(s).ok_or_else(|| format!("unknown status '{}'", s))
}

fn parse_period(s: &str) -> Result<TimeFilter, String> {
    TimeFilter::from_str(s).ok_or_else(|| format!("unknown period '{}'", s))
}

pub async fn run(args: InvoicesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let store = InvoiceStore::open(&config.storage.invoices_path)?;

    match args.command {
        InvoicesCommand::List(list_args) => list(&store, list_args),
        InvoicesCommand::Show { id, format } => {
            let invoice = store
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("Invoice not found: {}", id))?;
            println!("{}", format_invoice(&invoice, format)?);
            Ok(())
        }
        InvoicesCommand::Search { query, format } => {
            let found = store.search(&query);
            if found.is_empty() {
                println!("{} No invoices match '{}'", style("ℹ").blue(), query);
                return Ok(());
            }
            println!("{}", format_invoices(&found, format)?);
            Ok(())
        }
        InvoicesCommand::Stats { year, json } => stats(&store, year, json),
        InvoicesCommand::Export { output, format } => {
            let content = format_invoices(&store.all(), format)?;
            match output {
                Some(path) => {
                    fs::write(&path, content)?;
                    println!(
                        "{} Exported {} invoices to {}",
                        style("✓").green(),
                        store.len(),
                        path.display()
                    );
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        InvoicesCommand::Status { id, status } => {
            let invoice = store.set_status(id, status)?;
            println!(
                "{} Invoice #{} ({}) is now {}",
                style("✓").green(),
                invoice.id,
                invoice.invoice_code,
                invoice.status.as_str()
            );
            Ok(())
        }
    }
}

fn list(store: &InvoiceStore, args: ListArgs) -> anyhow::Result<()> {
    let mut filter = InvoiceFilter::default()
        .with_time_filter(args.period)
        .with_range(args.from, args.to);
    if let Some(status) = args.status {
        filter = filter.with_status(status);
    }
    if let Some(search) = args.search {
        filter = filter.with_search(search);
    }

    let result = store.list(&filter, Page::new(args.page, args.per_page));

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Csv => print!("{}", format_invoices(&result.items, OutputFormat::Csv)?),
        OutputFormat::Text => {
            if result.items.is_empty() {
                println!("{} No invoices found", style("ℹ").blue());
                return Ok(());
            }
            for invoice in &result.items {
                println!("{}", invoice_line(invoice));
            }
            println!();
            println!(
                "Page {}/{} ({} invoices)",
                result.page,
                result.pages.max(1),
                result.total
            );
        }
    }

    Ok(())
}

fn stats(store: &InvoiceStore, year: Option<i32>, as_json: bool) -> anyhow::Result<()> {
    let invoices = store.all();
    let today = vietnam_today();
    let year = year.unwrap_or_else(|| today.year());

    let dashboard = analytics::dashboard(&invoices, today);
    let by_kind = analytics::by_kind(&invoices);
    let statuses = analytics::status_distribution(&invoices);
    let monthly = analytics::revenue_by_month(&invoices, year);
    let customers = analytics::top_customers(&invoices);
    let growth = analytics::growth_metrics(&invoices, today);

    if as_json {
        let status_rows: Vec<_> = statuses
            .iter()
            .map(|(status, total)| {
                json!({
                    "status": status,
                    "count": total.count,
                    "total_amount": total.total_amount,
                })
            })
            .collect();
        let report = json!({
            "summary": dashboard.summary,
            "by_kind": by_kind,
            "status_distribution": status_rows,
            "revenue_by_month": monthly,
            "top_customers": customers,
            "growth": growth,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = &dashboard.summary;
    println!("{}", style("Invoices").bold());
    println!("  Total:     {}", summary.total_invoices);
    println!("  Pending:   {}", summary.pending_invoices);
    println!("  Paid:      {}", summary.paid_invoices);
    println!("  Overdue:   {}", summary.overdue_invoices);
    println!("  Cancelled: {}", summary.cancelled_invoices);
    println!();
    println!("{}", style("Revenue").bold());
    println!("  Paid:       {}", money(summary.total_revenue, "VND"));
    println!("  Pending:    {}", money(summary.pending_revenue, "VND"));
    println!("  This month: {}", money(summary.monthly_revenue, "VND"));
    println!(
        "  Growth:     {}% revenue, {}% invoices",
        growth.revenue_growth_percent, growth.invoice_growth_percent
    );

    if !by_kind.is_empty() {
        println!();
        println!("{}", style("By kind").bold());
        for (kind, total) in &by_kind {
            println!(
                "  {:<20} {:>4}  {}",
                kind.label(),
                total.count,
                money(total.total_amount, "VND")
            );
        }
    }

    let months: Vec<_> = monthly.iter().filter(|m| !m.revenue.is_zero()).collect();
    if !months.is_empty() {
        println!();
        println!("{}", style(format!("Revenue {}", year)).bold());
        for month in months {
            println!("  {}  {}", month.period, money(month.revenue, "VND"));
        }
    }

    if !customers.is_empty() {
        println!();
        println!("{}", style("Top customers").bold());
        for customer in &customers {
            println!(
                "  {:<30} {:>4}  {}",
                customer.customer_name,
                customer.invoice_count,
                money(customer.total_revenue, "VND")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_vietnamese() {
        assert_eq!(parse_status("đã thanh toán"), Ok(InvoiceStatus::Paid));
        assert!(parse_status("lost").is_err());
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("week"), Ok(TimeFilter::Week));
        assert!(parse_period("decade").is_err());
    }
}
