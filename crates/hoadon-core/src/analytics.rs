//! Aggregate statistics over stored invoices.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::invoice::{Invoice, InvoiceKind, InvoiceStatus};
use crate::store::vietnam_date;

const RECENT_LIMIT: usize = 5;
const TOP_CUSTOMERS_LIMIT: usize = 10;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_invoices: usize,
    pub pending_invoices: usize,
    pub paid_invoices: usize,
    pub overdue_invoices: usize,
    pub cancelled_invoices: usize,
    /// Sum over paid invoices.
    pub total_revenue: Decimal,
    /// Sum over pending invoices.
    pub pending_revenue: Decimal,
    /// Paid invoices dated this month.
    pub monthly_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub recent_invoices: Vec<Invoice>,
}

/// Revenue for one `YYYY-MM` period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRevenue {
    pub period: String,
    pub revenue: Decimal,
}

/// Count and sum for a group of invoices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupTotal {
    pub count: usize,
    pub total_amount: Decimal,
}

impl GroupTotal {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.total_amount += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerTotal {
    pub customer_name: String,
    pub invoice_count: usize,
    pub total_revenue: Decimal,
}

/// Current month against the previous one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthMetrics {
    pub current_revenue: Decimal,
    pub current_invoices: usize,
    pub previous_revenue: Decimal,
    pub previous_invoices: usize,
    /// Percentage change, rounded to 2 places; 0 when the previous month is empty.
    pub revenue_growth_percent: Decimal,
    pub invoice_growth_percent: Decimal,
}

fn paid(invoice: &Invoice) -> bool {
    invoice.status == InvoiceStatus::Paid
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn previous_month(date: NaiveDate) -> (i32, u32) {
    if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    }
}

fn same_month(date: NaiveDate, (year, month): (i32, u32)) -> bool {
    date.year() == year && date.month() == month
}

fn growth(current: Decimal, previous: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((current - previous) / previous * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Dashboard statistics relative to `today`.
pub fn dashboard(invoices: &[Invoice], today: NaiveDate) -> Dashboard {
    let month_start = first_of_month(today);
    let mut summary = DashboardSummary {
        total_invoices: invoices.len(),
        ..Default::default()
    };

    for invoice in invoices {
        match invoice.status {
            InvoiceStatus::Pending => {
                summary.pending_invoices += 1;
                summary.pending_revenue += invoice.total_amount;
            }
            InvoiceStatus::Paid => {
                summary.paid_invoices += 1;
                summary.total_revenue += invoice.total_amount;
                if invoice.invoice_date.is_some_and(|d| d >= month_start) {
                    summary.monthly_revenue += invoice.total_amount;
                }
            }
            InvoiceStatus::Cancelled => summary.cancelled_invoices += 1,
            InvoiceStatus::Overdue => {}
        }

        if !paid(invoice) && invoice.due_date.is_some_and(|due| due < today) {
            summary.overdue_invoices += 1;
        }
    }

    let mut recent = invoices.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    recent.truncate(RECENT_LIMIT);

    Dashboard {
        summary,
        recent_invoices: recent,
    }
}

/// Paid revenue per month of `year`, all twelve months present.
pub fn revenue_by_month(invoices: &[Invoice], year: i32) -> Vec<PeriodRevenue> {
    let mut months = [Decimal::ZERO; 12];

    for invoice in invoices.iter().filter(|i| paid(i)) {
        if let Some(date) = invoice.invoice_date.filter(|d| d.year() == year) {
            months[date.month0() as usize] += invoice.total_amount;
        }
    }

    months
        .iter()
        .enumerate()
        .map(|(i, revenue)| PeriodRevenue {
            period: format!("{}-{:02}", year, i + 1),
            revenue: *revenue,
        })
        .collect()
}

/// Paid revenue per year, ascending.
pub fn revenue_by_year(invoices: &[Invoice]) -> Vec<PeriodRevenue> {
    let mut years: BTreeMap<i32, Decimal> = BTreeMap::new();
    for invoice in invoices.iter().filter(|i| paid(i)) {
        if let Some(date) = invoice.invoice_date {
            *years.entry(date.year()).or_default() += invoice.total_amount;
        }
    }

    years
        .into_iter()
        .map(|(year, revenue)| PeriodRevenue {
            period: year.to_string(),
            revenue,
        })
        .collect()
}

/// Count and total per invoice kind.
pub fn by_kind(invoices: &[Invoice]) -> BTreeMap<InvoiceKind, GroupTotal> {
    let mut groups: BTreeMap<InvoiceKind, GroupTotal> = BTreeMap::new();
    for invoice in invoices {
        groups.entry(invoice.kind).or_default().add(invoice.total_amount);
    }
    groups
}

/// Count and total per status, in status order.
pub fn status_distribution(invoices: &[Invoice]) -> Vec<(InvoiceStatus, GroupTotal)> {
    [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ]
    .into_iter()
    .filter_map(|status| {
        let mut total = GroupTotal::default();
        for invoice in invoices.iter().filter(|i| i.status == status) {
            total.add(invoice.total_amount);
        }
        (total.count > 0).then_some((status, total))
    })
    .collect()
}

/// Buyers ranked by total invoiced amount.
pub fn top_customers(invoices: &[Invoice]) -> Vec<CustomerTotal> {
    let mut customers: BTreeMap<&str, GroupTotal> = BTreeMap::new();
    for invoice in invoices {
        customers
            .entry(invoice.buyer_name.as_str())
            .or_default()
            .add(invoice.total_amount);
    }

    let mut ranked: Vec<CustomerTotal> = customers
        .into_iter()
        .map(|(name, total)| CustomerTotal {
            customer_name: name.to_string(),
            invoice_count: total.count,
            total_revenue: total.total_amount,
        })
        .collect();
    ranked.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    ranked.truncate(TOP_CUSTOMERS_LIMIT);
    ranked
}

/// Revenue (paid, by invoice date) and invoice count (by creation date) for
/// this month against last month.
pub fn growth_metrics(invoices: &[Invoice], today: NaiveDate) -> GrowthMetrics {
    let current = (today.year(), today.month());
    let previous = previous_month(today);

    let revenue_in = |month: (i32, u32)| -> Decimal {
        invoices
            .iter()
            .filter(|i| paid(i) && i.invoice_date.is_some_and(|d| same_month(d, month)))
            .map(|i| i.total_amount)
            .sum()
    };
    let created_in = |month: (i32, u32)| -> usize {
        invoices
            .iter()
            .filter(|i| same_month(vietnam_date(i.created_at), month))
            .count()
    };

    let current_revenue = revenue_in(current);
    let previous_revenue = revenue_in(previous);
    let current_invoices = created_in(current);
    let previous_invoices = created_in(previous);

    GrowthMetrics {
        current_revenue,
        current_invoices,
        previous_revenue,
        previous_invoices,
        revenue_growth_percent: growth(current_revenue, previous_revenue),
        invoice_growth_percent: growth(
            Decimal::from(current_invoices),
            Decimal::from(previous_invoices),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(id: u64, amount: i64, status: InvoiceStatus, day: NaiveDate) -> Invoice {
        let mut invoice = Invoice::new(format!("HD{:03}", id), Decimal::from(amount));
        invoice.id = id;
        invoice.status = status;
        invoice.invoice_date = Some(day);
        invoice.created_at = Utc
            .with_ymd_and_hms(day.year(), day.month(), day.day(), 3, 0, 0)
            .unwrap();
        invoice
    }

    fn sample() -> Vec<Invoice> {
        let mut overdue = invoice(4, 40_000, InvoiceStatus::Pending, date(2024, 2, 1));
        overdue.due_date = Some(date(2024, 2, 15));
        overdue.kind = InvoiceKind::Electricity;
        overdue.buyer_name = "Trần Thị B".to_string();

        vec![
            invoice(1, 100_000, InvoiceStatus::Paid, date(2024, 3, 5)),
            invoice(2, 200_000, InvoiceStatus::Paid, date(2024, 2, 10)),
            invoice(3, 50_000, InvoiceStatus::Pending, date(2024, 3, 8)),
            overdue,
            invoice(5, 10_000, InvoiceStatus::Cancelled, date(2023, 12, 31)),
        ]
    }

    #[test]
    fn test_dashboard() {
        let dashboard = dashboard(&sample(), date(2024, 3, 10));
        let s = &dashboard.summary;

        assert_eq!(s.total_invoices, 5);
        assert_eq!(s.pending_invoices, 2);
        assert_eq!(s.paid_invoices, 2);
        assert_eq!(s.cancelled_invoices, 1);
        assert_eq!(s.overdue_invoices, 1);
        assert_eq!(s.total_revenue, Decimal::from(300_000));
        assert_eq!(s.pending_revenue, Decimal::from(90_000));
        assert_eq!(s.monthly_revenue, Decimal::from(100_000));

        let recent: Vec<u64> = dashboard.recent_invoices.iter().map(|i| i.id).collect();
        assert_eq!(recent, vec![3, 1, 2, 4, 5]);
    }

    #[test]
    fn test_revenue_by_month_zero_fills() {
        let months = revenue_by_month(&sample(), 2024);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].period, "2024-01");
        assert_eq!(months[0].revenue, Decimal::ZERO);
        assert_eq!(months[1].revenue, Decimal::from(200_000));
        assert_eq!(months[2].revenue, Decimal::from(100_000));

        let years = revenue_by_year(&sample());
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].period, "2024");
    }

    #[test]
    fn test_groupings() {
        let kinds = by_kind(&sample());
        assert_eq!(kinds[&InvoiceKind::General].count, 4);
        assert_eq!(kinds[&InvoiceKind::Electricity].total_amount, Decimal::from(40_000));

        let statuses = status_distribution(&sample());
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].0, InvoiceStatus::Pending);
        assert_eq!(statuses[0].1.total_amount, Decimal::from(90_000));

        let customers = top_customers(&sample());
        assert_eq!(customers[0].customer_name, "Unknown");
        assert_eq!(customers[0].invoice_count, 4);
    }

    #[test]
    fn test_growth_metrics() {
        let metrics = growth_metrics(&sample(), date(2024, 3, 20));
        assert_eq!(metrics.current_revenue, Decimal::from(100_000));
        assert_eq!(metrics.previous_revenue, Decimal::from(200_000));
        assert_eq!(metrics.revenue_growth_percent, Decimal::from(-50));
        assert_eq!(metrics.current_invoices, 2);
        assert_eq!(metrics.previous_invoices, 2);
        assert_eq!(metrics.invoice_growth_percent, Decimal::ZERO);

        let january = growth_metrics(&sample(), date(2024, 1, 5));
        assert_eq!(january.previous_invoices, 1);
    }
}
