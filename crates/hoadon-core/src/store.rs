//! Invoice storage: in-memory records with optional JSON file persistence.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::invoice::{Invoice, InvoiceStatus};

const VIETNAM_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Current date in Vietnam (UTC+7).
pub fn vietnam_today() -> NaiveDate {
    vietnam_date(Utc::now())
}

/// Calendar date of an instant in Vietnam (UTC+7).
pub fn vietnam_date(instant: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(VIETNAM_UTC_OFFSET_SECS) {
        Some(offset) => instant.with_timezone(&offset).date_naive(),
        None => instant.date_naive(),
    }
}

/// Relative time window for listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Today,
    Yesterday,
    /// The last seven days including today.
    Week,
    /// The current calendar month.
    Month,
    #[default]
    All,
}

impl TimeFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "today" | "hôm nay" => Some(Self::Today),
            "yesterday" | "hôm qua" => Some(Self::Yesterday),
            "week" | "tuần" => Some(Self::Week),
            "month" | "tháng" => Some(Self::Month),
            "all" | "" => Some(Self::All),
            _ => None,
        }
    }

    fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Today => date == today,
            Self::Yesterday => Some(date) == today.pred_opt(),
            Self::Week => date <= today && date > today - Duration::days(7),
            Self::Month => date.year() == today.year() && date.month() == today.month(),
            Self::All => true,
        }
    }
}

/// Filter applied by [`InvoiceStore::list`].
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub time_filter: TimeFilter,
    pub search: Option<String>,
    /// Reference date for `time_filter`; defaults to today in Vietnam.
    pub today: Option<NaiveDate>,
}

impl InvoiceFilter {
    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_time_filter(mut self, time_filter: TimeFilter) -> Self {
        self.time_filter = time_filter;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        let date = effective_date(invoice);

        self.status.is_none_or(|s| invoice.status == s)
            && self.from.is_none_or(|from| date >= from)
            && self.to.is_none_or(|to| date <= to)
            && self.time_filter.contains(date, today)
            && self
                .search
                .as_deref()
                .is_none_or(|q| matches_query(invoice, &q.to_lowercase()))
    }
}

/// Page request (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: usize,
    per_page: usize,
}

impl Page {
    pub const MAX_PER_PAGE: usize = 100;

    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}

/// Invoice date, or the Vietnam date it was created.
pub fn effective_date(invoice: &Invoice) -> NaiveDate {
    invoice
        .invoice_date
        .unwrap_or_else(|| vietnam_date(invoice.created_at))
}

fn matches_query(invoice: &Invoice, query: &str) -> bool {
    [
        invoice.filename.as_str(),
        invoice.invoice_code.as_str(),
        invoice.buyer_name.as_str(),
        invoice.seller_name.as_str(),
        invoice.kind.as_str(),
        invoice.kind.label(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(query))
}

fn newest_first(invoices: &mut [Invoice]) {
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    invoices: Vec<Invoice>,
}

impl StoreState {
    fn next_id(&self) -> u64 {
        self.invoices.iter().map(|i| i.id).max().unwrap_or(0) + 1
    }
}

/// Thread-safe invoice store.
#[derive(Debug, Default)]
pub struct InvoiceStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl InvoiceStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`, starting empty if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let invoices: Vec<Invoice> = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        info!("Loaded {} invoices from {}", invoices.len(), path.display());

        Ok(Self {
            state: RwLock::new(StoreState { invoices }),
            path: Some(path),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, invoices: &[Invoice]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(invoices)?;
        std::fs::write(path, content)
            .map_err(|e| StoreError::Persistence(format!("{}: {}", path.display(), e)))?;
        debug!("Persisted {} invoices", invoices.len());
        Ok(())
    }

    /// Write `invoices` to disk, then make them the live state.
    /// On a failed write the in-memory state is left untouched.
    fn commit(&self, state: &mut StoreState, invoices: Vec<Invoice>) -> Result<()> {
        self.persist(&invoices)?;
        state.invoices = invoices;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an invoice and return its assigned id.
    pub fn insert(&self, mut invoice: Invoice) -> Result<u64> {
        if invoice.invoice_code.trim().is_empty() {
            return Err(StoreError::Invalid("invoice code is empty".to_string()).into());
        }
        for issue in invoice.validate() {
            warn!("Invoice {}: {}", invoice.invoice_code, issue);
        }

        let mut state = self.write();
        invoice.id = state.next_id();
        let id = invoice.id;
        let mut invoices = state.invoices.clone();
        invoices.push(invoice);
        self.commit(&mut state, invoices)?;

        info!("Stored invoice {}", id);
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<Invoice> {
        self.read().invoices.iter().find(|i| i.id == id).cloned()
    }

    /// Look up by invoice code (case-insensitive), then by code appearing in the raw text.
    pub fn find_by_code(&self, code: &str) -> Option<Invoice> {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            return None;
        }

        let state = self.read();
        state
            .invoices
            .iter()
            .find(|i| i.invoice_code.to_lowercase() == code)
            .or_else(|| {
                state
                    .invoices
                    .iter()
                    .find(|i| i.raw_text.to_lowercase().contains(&code))
            })
            .cloned()
    }

    /// Most recent invoice saved from the given file name.
    pub fn find_by_filename(&self, filename: &str) -> Option<Invoice> {
        let filename = filename.to_lowercase();
        let mut matches: Vec<Invoice> = self
            .read()
            .invoices
            .iter()
            .filter(|i| i.filename.to_lowercase() == filename)
            .cloned()
            .collect();
        newest_first(&mut matches);
        matches.into_iter().next()
    }

    /// Replace an existing invoice, keeping its creation time.
    pub fn update(&self, mut invoice: Invoice) -> Result<()> {
        let mut state = self.write();
        let mut invoices = state.invoices.clone();
        let slot = invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", invoice.id)))?;

        invoice.created_at = slot.created_at;
        *slot = invoice;
        self.commit(&mut state, invoices)
    }

    pub fn set_status(&self, id: u64, status: InvoiceStatus) -> Result<Invoice> {
        let mut state = self.write();
        let mut invoices = state.invoices.clone();
        let invoice = invoices
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", id)))?;

        invoice.status = status;
        let updated = invoice.clone();
        self.commit(&mut state, invoices)?;
        Ok(updated)
    }

    pub fn delete(&self, id: u64) -> Result<Invoice> {
        let mut state = self.write();
        let mut invoices = state.invoices.clone();
        let idx = invoices
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", id)))?;

        let removed = invoices.remove(idx);
        self.commit(&mut state, invoices)?;
        Ok(removed)
    }

    /// All invoices, newest first.
    pub fn all(&self) -> Vec<Invoice> {
        let mut invoices = self.read().invoices.clone();
        newest_first(&mut invoices);
        invoices
    }

    /// Filtered, paginated listing, newest first.
    pub fn list(&self, filter: &InvoiceFilter, page: Page) -> PageResult<Invoice> {
        let today = filter.today.unwrap_or_else(vietnam_today);
        let mut matched: Vec<Invoice> = self
            .read()
            .invoices
            .iter()
            .filter(|i| filter.matches(i, today))
            .cloned()
            .collect();
        newest_first(&mut matched);

        let total = matched.len();
        let pages = total.div_ceil(page.per_page);
        let items = matched
            .into_iter()
            .skip(page.offset())
            .take(page.per_page)
            .collect();

        PageResult {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
            pages,
        }
    }

    /// Case-insensitive search over file name, code, parties and kind.
    pub fn search(&self, query: &str) -> Vec<Invoice> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<Invoice> = self
            .read()
            .invoices
            .iter()
            .filter(|i| matches_query(i, &query))
            .cloned()
            .collect();
        newest_first(&mut found);
        found
    }

    /// Invoices dated (or created, when undated) on `date`.
    pub fn by_date(&self, date: NaiveDate) -> Vec<Invoice> {
        let mut found: Vec<Invoice> = self
            .read()
            .invoices
            .iter()
            .filter(|i| effective_date(i) == date)
            .cloned()
            .collect();
        newest_first(&mut found);
        found
    }

    /// Invoices created in `[from, to)`.
    pub fn created_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Invoice> {
        let mut found: Vec<Invoice> = self
            .read()
            .invoices
            .iter()
            .filter(|i| i.created_at >= from && i.created_at < to)
            .cloned()
            .collect();
        newest_first(&mut found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::InvoiceKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(code: &str, amount: i64, day: NaiveDate, minute: u32) -> Invoice {
        let mut invoice = Invoice::new(code, Decimal::from(amount));
        invoice.invoice_date = Some(day);
        invoice.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, minute, 0).unwrap();
        invoice
    }

    fn seeded() -> InvoiceStore {
        let store = InvoiceStore::in_memory();
        let mut a = invoice("HD001", 100_000, date(2024, 3, 10), 0);
        a.buyer_name = "Nguyễn Văn An".to_string();
        a.filename = "hd001.pdf".to_string();
        let mut b = invoice("PC12DD0442433", 350_000, date(2024, 3, 9), 1);
        b.kind = InvoiceKind::Electricity;
        b.status = InvoiceStatus::Paid;
        let c = invoice("HD003", 75_000, date(2024, 2, 20), 2);
        for inv in [a, b, c] {
            store.insert(inv).unwrap();
        }
        store
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = seeded();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(2).map(|i| i.invoice_code), Some("PC12DD0442433".to_string()));
        assert!(store.insert(Invoice::new(" ", Decimal::ZERO)).is_err());
    }

    #[test]
    fn test_list_newest_first_with_pages() {
        let store = seeded();
        let page = store.list(&InvoiceFilter::default(), Page::new(1, 2));
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 2);
        let codes: Vec<_> = page.items.iter().map(|i| i.invoice_code.as_str()).collect();
        assert_eq!(codes, vec!["HD003", "PC12DD0442433"]);

        let second = store.list(&InvoiceFilter::default(), Page::new(2, 2));
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].invoice_code, "HD001");
    }

    #[test]
    fn test_list_filters() {
        let store = seeded();
        let today = date(2024, 3, 10);

        let paid = store.list(&InvoiceFilter::default().with_status(InvoiceStatus::Paid), Page::default());
        assert_eq!(paid.total, 1);

        let todays = store.list(
            &InvoiceFilter::default().with_time_filter(TimeFilter::Today).with_today(today),
            Page::default(),
        );
        assert_eq!(todays.items[0].invoice_code, "HD001");

        let yesterday = store.list(
            &InvoiceFilter::default().with_time_filter(TimeFilter::Yesterday).with_today(today),
            Page::default(),
        );
        assert_eq!(yesterday.items[0].invoice_code, "PC12DD0442433");

        let month = store.list(
            &InvoiceFilter::default().with_time_filter(TimeFilter::Month).with_today(today),
            Page::default(),
        );
        assert_eq!(month.total, 2);

        let range = store.list(
            &InvoiceFilter::default().with_range(Some(date(2024, 2, 1)), Some(date(2024, 2, 29))),
            Page::default(),
        );
        assert_eq!(range.total, 1);

        let searched = store.list(&InvoiceFilter::default().with_search("điện"), Page::default());
        assert_eq!(searched.total, 1);
    }

    #[test]
    fn test_find_and_search() {
        let store = seeded();
        assert_eq!(store.find_by_code("hd003").map(|i| i.id), Some(3));
        assert!(store.find_by_code("HD999").is_none());
        assert_eq!(store.find_by_filename("HD001.pdf").map(|i| i.id), Some(1));
        assert_eq!(store.search("văn an").len(), 1);
        assert_eq!(store.search("hd").len(), 2);
        assert!(store.search("  ").is_empty());
        assert_eq!(store.by_date(date(2024, 3, 9)).len(), 1);

        let from = Utc.with_ymd_and_hms(2024, 3, 1, 8, 1, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(store.created_between(from, to).len(), 2);
    }

    #[test]
    fn test_update_status_delete() {
        let store = seeded();
        let updated = store.set_status(1, InvoiceStatus::Paid).unwrap();
        assert_eq!(updated.status, InvoiceStatus::Paid);

        let mut edited = store.get(3).unwrap();
        edited.seller_name = "Công ty ABC".to_string();
        store.update(edited).unwrap();
        assert_eq!(store.get(3).unwrap().seller_name, "Công ty ABC");

        assert_eq!(store.delete(2).unwrap().id, 2);
        assert!(store.get(2).is_none());
        assert!(store.delete(2).is_err());
        assert!(store.set_status(42, InvoiceStatus::Paid).is_err());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("invoices.json");
        {
            let store = InvoiceStore::open(&path).unwrap();
            store.insert(invoice("HD100", 500_000, date(2024, 1, 1), 0)).unwrap();
            store.insert(invoice("HD101", 600_000, date(2024, 1, 2), 1)).unwrap();
        }

        let reopened = InvoiceStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.find_by_code("HD101").map(|i| i.id), Some(2));
        assert_eq!(reopened.insert(invoice("HD102", 1, date(2024, 1, 3), 2)).unwrap(), 3);
    }

    #[test]
    fn test_time_filter_parse() {
        assert_eq!(TimeFilter::from_str("hôm nay"), Some(TimeFilter::Today));
        assert_eq!(TimeFilter::from_str("WEEK"), Some(TimeFilter::Week));
        assert_eq!(TimeFilter::from_str("quarter"), None);
    }
    #[test]
    fn test_list_out_of_range_pages() {
        let store = seeded();

        let far = store.list(&InvoiceFilter::default(), Page::new(usize::MAX, 20));
        assert!(far.items.is_empty());
        assert_eq!(far.total, 3);
        assert_eq!(far.page, usize::MAX);

        let first = store.list(&InvoiceFilter::default(), Page::new(0, 0));
        assert_eq!((first.page, first.per_page), (1, 1));
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.pages, 3);
    }

    #[test]
    fn test_failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoices.json");
        let store = InvoiceStore::open(&path).unwrap();
        let id = store
            .insert(invoice("HD001", 100_000, date(2024, 3, 10), 0))
            .unwrap();

        // A directory where the file should be makes every write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.insert(invoice("HD002", 200_000, date(2024, 3, 11), 1)).is_err());
        assert_eq!(store.len(), 1);

        assert!(store.set_status(id, InvoiceStatus::Paid).is_err());
        assert_eq!(store.get(id).map(|i| i.status), Some(InvoiceStatus::Pending));

        let mut changed = invoice("HD001-B", 1, date(2024, 3, 10), 0);
        changed.id = id;
        assert!(store.update(changed).is_err());
        assert_eq!(store.get(id).map(|i| i.invoice_code), Some("HD001".to_string()));

        assert!(store.delete(id).is_err());
        assert_eq!(store.len(), 1);

        std::fs::remove_dir(&path).unwrap();
        let next = store
            .insert(invoice("HD003", 300_000, date(2024, 3, 12), 2))
            .unwrap();
        assert_eq!(next, 2);

        let reopened = InvoiceStore::open(&path).unwrap();
        let codes: Vec<_> = reopened.all().into_iter().map(|i| i.invoice_code).collect();
        assert_eq!(codes, vec!["HD003".to_string(), "HD001".to_string()]);
    }
}
