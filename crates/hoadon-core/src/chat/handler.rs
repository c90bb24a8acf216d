//! Pattern-based chat handler.
//!
//! Each detected [`Intent`] maps to one handler. Handlers that need free-form
//! answers go through an optional [`Responder`]; everything else is answered
//! locally from the invoice store and canned replies.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::history::{ConversationContext, ConversationStore};
use super::intent::{find_filename, is_invoice_related, mentions_file, Intent, IntentDetector};
use super::replies;
use crate::analytics;
use crate::error::Result;
use crate::invoice::rules::format_vnd;
use crate::models::config::ChatConfig;
use crate::models::invoice::Invoice;
use crate::store::{effective_date, vietnam_date, vietnam_today, InvoiceStore};
use crate::text::TextProcessor;

/// Replies produced locally from patterns and canned text.
pub const METHOD_PATTERN: &str = "pattern";
/// Replies produced by the configured [`Responder`].
pub const METHOD_RESPONDER: &str = "responder";

const DETAIL_ITEMS_SHOWN: usize = 5;
const RAW_TEXT_PREVIEW_CHARS: usize = 300;

/// Words that describe the query itself rather than what to look for.
const QUERY_WORDS: &[&str] = &[
    "xem", "tìm", "kiếm", "thông", "tin", "hiển", "thị", "hóa", "hoá", "đơn", "dữ", "liệu",
    "search", "show", "display", "data", "invoice", "tất", "cả", "giúp", "tôi", "nào",
];

/// Keywords in a data query that point at a specific file.
const DATA_FILE_KEYWORDS: &[&str] = &["từ ảnh", "mau-hoa-don", "template", "đọc ảnh"];

/// Phrases asking for counts or totals.
const AGGREGATE_WORDS: &[&str] = &[
    "bao nhiêu", "tổng", "đếm", "count", "số lượng", "thống kê", "báo cáo", "report",
];

lazy_static! {
    static ref REQUESTED_DATE: Regex = Regex::new(
        r"(?i)(?:ngày|vào)\s*(\d{1,2})[/\-](\d{1,2})(?:[/\-](\d{2,4}))?"
    ).unwrap();

    static ref TODAY: Regex = Regex::new(r"(?i)h[oô]m\s*nay|today").unwrap();
    static ref YESTERDAY: Regex = Regex::new(r"(?i)h[oô]m\s*qua|yesterday").unwrap();

    static ref INVOICE_CODE: Regex = Regex::new(
        r"(?i)([0-9]{10,}|HD[0-9]{3,}|[A-Z0-9-]{8,})"
    ).unwrap();
}

/// How the client should render a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Text,
    Markdown,
    UploadGuide,
    CameraOpen,
    CameraClose,
    CameraCapture,
    CameraHelp,
    InvoiceList,
    InvoiceDetail,
    FileAnalysis,
    Error,
    NoResults,
}

/// A chat reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,

    #[serde(rename = "type")]
    pub kind: ResponseKind,

    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Client-side action such as `open_camera`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default)]
    pub ocr_mode: bool,

    pub intent: Intent,
    pub confidence: f32,

    /// Which component produced the reply.
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    pub fn new(kind: ResponseKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            suggestions: Vec::new(),
            action: None,
            ocr_mode: false,
            intent: Intent::General,
            confidence: 0.0,
            method: METHOD_PATTERN.to_string(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// The generic reply used when handling a message failed.
    pub fn apology() -> Self {
        Self::new(ResponseKind::Error, replies::APOLOGY).with_suggestions(replies::APOLOGY_SUGGESTIONS)
    }

    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = suggestions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_intent(mut self, intent: Intent, confidence: f32) -> Self {
        self.intent = intent;
        self.confidence = confidence;
        self
    }
}

/// Source of free-form answers (an LLM client, for instance).
pub trait Responder: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Answer a message for the given intent.
    fn respond(&self, intent: Intent, message: &str, context: &ConversationContext) -> Result<String>;
}

/// Answers chat messages and keeps per-user history.
pub struct ChatHandler {
    config: ChatConfig,
    detector: IntentDetector,
    processor: TextProcessor,
    history: ConversationStore,
    store: Option<Arc<InvoiceStore>>,
    responder: Option<Box<dyn Responder>>,
}

impl ChatHandler {
    pub fn new(config: ChatConfig) -> Self {
        let history = ConversationStore::new(config.history_limit);
        Self {
            config,
            detector: IntentDetector::new(),
            processor: TextProcessor::new(),
            history,
            store: None,
            responder: None,
        }
    }

    /// Answer invoice questions from this store.
    pub fn with_store(mut self, store: Arc<InvoiceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_responder(mut self, responder: impl Responder + 'static) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn detector(&self) -> &IntentDetector {
        &self.detector
    }

    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    /// Answer one message. Never fails; errors become the apology reply.
    pub fn process_message(&self, message: &str, user_id: &str) -> ChatResponse {
        let (intent, confidence) = self.detector.detect_with_confidence(message);
        info!("User {} intent: {} ({:.2})", user_id, intent, confidence);

        let response = match self.handle_intent(intent, message, user_id) {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to handle '{}' for {}: {}", intent, user_id, e);
                ChatResponse::apology()
            }
        };
        let response = response.with_intent(intent, confidence);

        self.history
            .record(user_id, message, &response.message, response.kind, intent);
        response
    }

    fn handle_intent(&self, intent: Intent, message: &str, user_id: &str) -> Result<ChatResponse> {
        match intent {
            Intent::Greeting => Ok(self.greeting()),
            Intent::Goodbye => Ok(goodbye()),
            Intent::Help => Ok(self.help()),
            Intent::UploadImage => Ok(upload_guide()),
            Intent::CameraControl => Ok(camera_control(message)),
            Intent::ListInvoices => self.list_invoices(message),
            Intent::InvoiceDetail => self.invoice_detail(message),
            Intent::FileAnalysis => self.file_analysis(message),
            Intent::DataQuery => self.data_query(message),
            Intent::InvoiceQuery | Intent::InvoiceAnalysis | Intent::TemplateHelp => {
                self.delegated(intent, message, user_id)
            }
            Intent::General => Ok(self.general(message, user_id)),
        }
    }

    fn store(&self) -> Option<&InvoiceStore> {
        self.store.as_deref()
    }

    fn greeting(&self) -> ChatResponse {
        let template = pick(replies::GREETINGS);
        ChatResponse::new(ResponseKind::Text, template.replace("{bot}", &self.config.bot_name))
            .with_suggestions(replies::GREETING_SUGGESTIONS)
    }

    fn help(&self) -> ChatResponse {
        ChatResponse::new(
            ResponseKind::Markdown,
            replies::HELP.replace("{bot}", &self.config.bot_name),
        )
        .with_suggestions(replies::HELP_SUGGESTIONS)
    }

    fn delegated(&self, intent: Intent, message: &str, user_id: &str) -> Result<ChatResponse> {
        let suggestions: &[&str] = match intent {
            Intent::InvoiceAnalysis => &[
                "Upload file hóa đơn",
                "Hướng dẫn OCR",
                "Xem template có sẵn",
                "Tạo template mới",
            ],
            Intent::TemplateHelp => &[
                "Xem danh sách template",
                "Tạo template mới",
                "Sửa template hiện có",
                "Hướng dẫn thiết kế",
            ],
            _ => &["Tạo hóa đơn mới", "Tìm kiếm hóa đơn", "Xuất báo cáo", "Hỗ trợ khác"],
        };

        let response = match &self.responder {
            Some(responder) => {
                debug!("Delegating '{}' to {}", intent, responder.name());
                let context = self.history.context(user_id);
                let text = responder.respond(intent, message, &context)?;
                ChatResponse::new(ResponseKind::Text, text).with_method(METHOD_RESPONDER)
            }
            None => ChatResponse::new(ResponseKind::Text, replies::invoice_answer(message)),
        };
        Ok(response.with_suggestions(suggestions))
    }

    fn general(&self, message: &str, user_id: &str) -> ChatResponse {
        if let Some(responder) = &self.responder {
            let context = self.history.context(user_id);
            match responder.respond(Intent::General, message, &context) {
                Ok(text) if !text.trim().is_empty() => {
                    return ChatResponse::new(ResponseKind::Text, text)
                        .with_method(METHOD_RESPONDER)
                        .with_suggestions(replies::GENERAL_SUGGESTIONS);
                }
                Ok(_) => warn!("{} returned an empty answer", responder.name()),
                Err(e) => warn!("{} failed: {}", responder.name(), e),
            }
        }

        let text = if is_invoice_related(message) {
            replies::invoice_answer(message)
        } else {
            pick(replies::ERROR_MESSAGES)
        };
        ChatResponse::new(ResponseKind::Text, text).with_suggestions(replies::GENERAL_SUGGESTIONS)
    }

    fn list_invoices(&self, message: &str) -> Result<ChatResponse> {
        let Some(store) = self.store() else {
            return Ok(no_invoices());
        };

        let requested = requested_date(message, vietnam_today());
        let (invoices, label) = match &requested {
            Some((date, label)) => (store.by_date(*date), label.as_str()),
            None => (store.all(), ""),
        };

        if invoices.is_empty() {
            if requested.is_some() {
                return Ok(ChatResponse::new(
                    ResponseKind::NoResults,
                    format!(
                        "📄 Không tìm thấy hóa đơn nào{}.\n\n💡 Thử tìm kiếm ngày khác hoặc xem tất cả hóa đơn!",
                        label
                    ),
                )
                .with_suggestions(&["Xem danh sách hóa đơn", "Hóa đơn hôm nay", "Hóa đơn hôm qua"]));
            }
            return Ok(no_invoices());
        }

        let shown = &invoices[..invoices.len().min(self.config.max_listed_invoices)];
        let mut text = format!("📋 **Danh sách hóa đơn đã lưu{}:**\n\n", label);
        for (i, invoice) in shown.iter().enumerate() {
            text.push_str(&format!(
                "**{}.** {}\n   • **Mã HĐ:** {}\n   • **Khách hàng:** {}\n   • **Số tiền:** {}\n   • **Ngày:** {}\n\n",
                i + 1,
                invoice.kind.label(),
                invoice.invoice_code,
                invoice.buyer_name,
                format_vnd(invoice.total_amount),
                effective_date(invoice).format("%d/%m/%Y"),
            ));
        }
        if invoices.len() > shown.len() {
            text.push_str(&format!("... và {} hóa đơn khác\n", invoices.len() - shown.len()));
        }

        Ok(ChatResponse::new(ResponseKind::InvoiceList, text.trim_end())
            .with_data(serde_json::to_value(shown)?)
            .with_suggestions(&[
                "Xem chi tiết hóa đơn",
                "Mở camera chụp thêm",
                "Upload ảnh hóa đơn mới",
                "Thống kê hóa đơn",
            ]))
    }

    fn invoice_detail(&self, message: &str) -> Result<ChatResponse> {
        let Some(code) = INVOICE_CODE
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return Ok(ChatResponse::new(ResponseKind::Text, replies::MISSING_CODE)
                .with_suggestions(&["Xem danh sách hóa đơn"]));
        };

        let Some(invoice) = self.store().and_then(|s| s.find_by_code(&code)) else {
            return Ok(ChatResponse::new(
                ResponseKind::NoResults,
                format!(
                    "❌ Không tìm thấy hóa đơn với mã: **{}**\n\n💡 Thử xem danh sách tất cả hóa đơn!",
                    code
                ),
            )
            .with_suggestions(&["Xem danh sách hóa đơn", "Upload ảnh hóa đơn"]));
        };

        Ok(ChatResponse::new(ResponseKind::InvoiceDetail, format_detail(&invoice))
            .with_data(serde_json::to_value(&invoice)?)
            .with_suggestions(&["Xem danh sách hóa đơn", "Tìm hóa đơn khác", "Export dữ liệu"]))
    }

    fn file_analysis(&self, message: &str) -> Result<ChatResponse> {
        let Some(filename) = find_filename(message) else {
            return Ok(ChatResponse::new(ResponseKind::FileAnalysis, replies::FILE_GUIDE)
                .with_suggestions(&[
                    "Upload file mới",
                    "Xem lịch sử OCR",
                    "Hướng dẫn upload",
                    "Tạo template",
                ]));
        };

        match self.store().and_then(|s| s.find_by_filename(&filename)) {
            Some(invoice) => {
                let text = format!(
                    "📋 **Kết quả OCR từ file: {}**\n\n🧾 **Thông tin hóa đơn:**\n{}\n\n📊 **Độ chính xác:** {:.1}%",
                    filename,
                    format_summary(&invoice),
                    invoice.confidence * 100.0
                );
                Ok(ChatResponse::new(ResponseKind::FileAnalysis, text)
                    .with_data(serde_json::to_value(&invoice)?)
                    .with_suggestions(&[
                        "Lưu thành template",
                        "Chỉnh sửa thông tin",
                        "Xuất Excel",
                        "Phân tích file khác",
                    ]))
            }
            None => Ok(ChatResponse::new(
                ResponseKind::NoResults,
                format!(
                    "📤 **File \"{0}\" chưa được upload!**\n\n🔍 **Để xử lý file này, bạn cần:**\n1. Upload file \"{0}\" lên hệ thống trước\n2. Hệ thống sẽ tự động OCR và thông báo kết quả\n3. Sau đó bạn có thể hỏi về dữ liệu đã xử lý",
                    filename
                ),
            )
            .with_suggestions(&["Mở camera chụp ảnh", "Xem hóa đơn đã lưu", "Hướng dẫn upload"])),
        }
    }

    fn data_query(&self, message: &str) -> Result<ChatResponse> {
        let lower = message.to_lowercase();
        if mentions_file(&lower) || DATA_FILE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            debug!("File reference in data query, answering as file analysis");
            return self.file_analysis(message);
        }

        let Some(store) = self.store().filter(|s| !s.is_empty()) else {
            return Ok(no_invoices());
        };

        if !AGGREGATE_WORDS.iter().any(|w| lower.contains(w)) {
            let found = self.keyword_matches(store, message);
            if !found.is_empty() {
                let shown = &found[..found.len().min(self.config.max_listed_invoices)];
                let mut text = format!("🔍 **Tìm thấy {} hóa đơn phù hợp:**\n\n", found.len());
                for (i, invoice) in shown.iter().enumerate() {
                    text.push_str(&format!(
                        "{}. `{}` - {} - {}\n",
                        i + 1,
                        invoice.invoice_code,
                        invoice.buyer_name,
                        format_vnd(invoice.total_amount)
                    ));
                }
                return Ok(ChatResponse::new(ResponseKind::InvoiceList, text.trim_end())
                    .with_data(serde_json::to_value(shown)?));
            }
        }

        let invoices = store.all();
        let summary = analytics::dashboard(&invoices, vietnam_today()).summary;
        let total: Decimal = invoices.iter().map(|i| i.total_amount).sum();
        let text = format!(
            "📊 **Thống kê hóa đơn:**\n\n• Tổng số hóa đơn: {}\n• Chờ thanh toán: {}\n• Đã thanh toán: {}\n• Quá hạn: {}\n• Đã hủy: {}\n• Tổng giá trị: {}\n• Doanh thu đã thu: {}",
            summary.total_invoices,
            summary.pending_invoices,
            summary.paid_invoices,
            summary.overdue_invoices,
            summary.cancelled_invoices,
            format_vnd(total),
            format_vnd(summary.total_revenue),
        );
        Ok(ChatResponse::new(ResponseKind::Text, text)
            .with_data(serde_json::to_value(&summary)?)
            .with_suggestions(&["Xem danh sách hóa đơn", "Hóa đơn hôm nay"]))
    }

    /// Invoices matching any non-query keyword of the message, newest first.
    fn keyword_matches(&self, store: &InvoiceStore, message: &str) -> Vec<Invoice> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();

        for keyword in self.processor.extract_keywords(message) {
            if QUERY_WORDS.contains(&keyword.as_str()) {
                continue;
            }
            for invoice in store.search(&keyword) {
                if seen.insert(invoice.id) {
                    found.push(invoice);
                }
            }
        }

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

fn pick(options: &'static [&'static str]) -> &'static str {
    options
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
}

fn goodbye() -> ChatResponse {
    ChatResponse::new(ResponseKind::Text, pick(replies::GOODBYES))
}

fn upload_guide() -> ChatResponse {
    ChatResponse::new(ResponseKind::UploadGuide, replies::UPLOAD_GUIDE)
        .with_action("show_upload_dialog")
        .with_suggestions(replies::UPLOAD_SUGGESTIONS)
}

fn no_invoices() -> ChatResponse {
    ChatResponse::new(ResponseKind::NoResults, replies::NO_INVOICES).with_suggestions(&[
        "Mở camera chụp hóa đơn",
        "Upload ảnh hóa đơn",
        "Hướng dẫn OCR",
    ])
}

fn camera_control(message: &str) -> ChatResponse {
    let lower = message.trim().to_lowercase();
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if contains_any(&["tắt camera", "đóng camera", "close camera", "đóng máy ảnh", "tắt máy ảnh"])
        || ["đóng", "tắt", "close"].contains(&lower.as_str())
    {
        return ChatResponse::new(ResponseKind::CameraClose, replies::CAMERA_CLOSED)
            .with_action("close_camera")
            .with_suggestions(&["Mở lại camera", "Upload ảnh từ máy", "Hỗ trợ khác", "Tạo hóa đơn"]);
    }

    if contains_any(&[
        "mở camera",
        "bật camera",
        "open camera",
        "camera",
        "mở máy ảnh",
        "máy ảnh",
        "camere",
        "camara",
    ]) || ["mở", "bật", "open"].contains(&lower.as_str())
    {
        let ocr_mode = contains_any(&["hóa đơn", "ocr", "scan", "chụp"]);
        let mut text = replies::CAMERA_OPENING.to_string();
        if ocr_mode {
            text.push_str(replies::CAMERA_OCR_NOTE);
        }

        let mut response = ChatResponse::new(ResponseKind::CameraOpen, text)
            .with_action("open_camera")
            .with_suggestions(&[
                if ocr_mode { "Chụp ảnh hóa đơn" } else { "Chụp ảnh" },
                "Tắt camera",
                if ocr_mode { "Hướng dẫn OCR" } else { "Hướng dẫn sử dụng" },
            ]);
        response.ocr_mode = ocr_mode;
        return response;
    }

    if contains_any(&["chụp ảnh", "take photo", "capture", "chụp"]) {
        return ChatResponse::new(ResponseKind::CameraCapture, replies::CAMERA_CAPTURE)
            .with_action("capture_photo")
            .with_suggestions(&["Chụp ảnh hóa đơn ngay", "Phân tích OCR", "Tắt camera"]);
    }

    ChatResponse::new(ResponseKind::CameraHelp, replies::CAMERA_HELP).with_suggestions(&[
        "Mở camera",
        "Hướng dẫn chụp ảnh",
        "Upload ảnh từ máy",
    ])
}

/// Date asked for in a listing request, with its display label.
pub fn requested_date(message: &str, today: NaiveDate) -> Option<(NaiveDate, String)> {
    if let Some(caps) = REQUESTED_DATE.captures(message) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => {
                let y: i32 = y.as_str().parse().ok()?;
                if y < 100 { y + 2000 } else { y }
            }
            None => today.year(),
        };
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some((date, format!(" (Ngày {:02}/{:02}/{})", day, month, year)));
        }
    }

    if TODAY.is_match(message) {
        return Some((today, format!(" (Hôm nay - {})", today.format("%d/%m/%Y"))));
    }
    if YESTERDAY.is_match(message) {
        let yesterday = today - Duration::days(1);
        return Some((yesterday, format!(" (Hôm qua - {})", yesterday.format("%d/%m/%Y"))));
    }
    None
}

fn format_summary(invoice: &Invoice) -> String {
    let mut lines = vec![
        format!("• **Mã hóa đơn:** {}", invoice.invoice_code),
        format!("• **Loại:** {}", invoice.kind.label()),
        format!("• **Người bán:** {}", invoice.seller_name),
        format!("• **Khách hàng:** {}", invoice.buyer_name),
        format!("• **Tổng tiền:** {}", format_vnd(invoice.total_amount)),
    ];
    if let Some(date) = invoice.invoice_date {
        lines.push(format!("• **Ngày:** {}", date.format("%d/%m/%Y")));
    }
    if let Some(tax_code) = &invoice.tax_code {
        lines.push(format!("• **Mã số thuế:** {}", tax_code));
    }
    lines.join("\n")
}

fn format_detail(invoice: &Invoice) -> String {
    let mut text = String::from("📄 **CHI TIẾT HÓA ĐƠN**\n\n");
    text.push_str(&format!("**Mã hóa đơn:** {}\n", invoice.invoice_code));
    text.push_str(&format!("**Loại:** {}\n", invoice.kind.label()));
    if !invoice.filename.is_empty() {
        text.push_str(&format!("**File:** {}\n", invoice.filename));
    }
    text.push_str(&format!(
        "**Ngày lưu:** {}\n",
        vietnam_date(invoice.created_at).format("%d/%m/%Y")
    ));
    if let Some(date) = invoice.invoice_date {
        text.push_str(&format!("**Ngày hóa đơn:** {}\n", date.format("%d/%m/%Y")));
    }
    text.push_str(&format!("**Trạng thái:** {}\n\n", invoice.status.as_str()));

    text.push_str(&format!("👤 **Khách hàng:** {}\n", invoice.buyer_name));
    text.push_str(&format!("🏪 **Người bán:** {}\n", invoice.seller_name));
    if let Some(tax_code) = &invoice.tax_code {
        text.push_str(&format!("   🏢 Mã số thuế: {}\n", tax_code));
    }
    text.push_str(&format!(
        "\n💰 **Tổng cộng: {}**\n",
        format_vnd(invoice.total_amount)
    ));

    if !invoice.items.is_empty() {
        text.push_str(&format!(
            "\n📦 **SẢN PHẨM/DỊCH VỤ** ({} mục):\n",
            invoice.items.len()
        ));
        for (i, item) in invoice.items.iter().take(DETAIL_ITEMS_SHOWN).enumerate() {
            text.push_str(&format!("   {}. {}\n", i + 1, item.description));
            text.push_str(&format!("      Số lượng: {}\n", item.quantity));
            text.push_str(&format!("      Thành tiền: {}\n", format_vnd(item.amount)));
        }
        if invoice.items.len() > DETAIL_ITEMS_SHOWN {
            text.push_str(&format!(
                "   ... và {} mục khác\n",
                invoice.items.len() - DETAIL_ITEMS_SHOWN
            ));
        }
    }

    if !invoice.raw_text.trim().is_empty() {
        let preview: String = invoice.raw_text.chars().take(RAW_TEXT_PREVIEW_CHARS).collect();
        let ellipsis = if invoice.raw_text.chars().count() > RAW_TEXT_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        text.push_str(&format!("\n📝 **VĂN BẢN OCR:**\n```\n{}{}\n```\n", preview, ellipsis));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HoadonError;
    use pretty_assertions::assert_eq;
    use crate::models::invoice::InvoiceKind;

    struct EchoResponder;

    impl Responder for EchoResponder {
        fn name(&self) -> &str {
            "echo"
        }

        fn respond(&self, intent: Intent, message: &str, _: &ConversationContext) -> Result<String> {
            Ok(format!("[{}] {}", intent, message))
        }
    }

    struct BrokenResponder;

    impl Responder for BrokenResponder {
        fn name(&self) -> &str {
            "broken"
        }

        fn respond(&self, _: Intent, _: &str, _: &ConversationContext) -> Result<String> {
            Err(HoadonError::Config("no API key".to_string()))
        }
    }

    fn sample_store() -> Arc<InvoiceStore> {
        let store = InvoiceStore::in_memory();

        let mut electricity = Invoice::new("440197093785", Decimal::from(385_000));
        electricity.kind = InvoiceKind::Electricity;
        electricity.buyer_name = "Nguyễn Văn An".to_string();
        electricity.filename = "dien-thang-3.jpg".to_string();
        electricity.confidence = 0.9;
        store.insert(electricity).unwrap();

        let mut sale = Invoice::new("HD00123", Decimal::from(1_200_000));
        sale.buyer_name = "Công ty Bình Minh".to_string();
        store.insert(sale).unwrap();

        Arc::new(store)
    }

    fn handler() -> ChatHandler {
        ChatHandler::new(ChatConfig::default())
    }

    #[test]
    fn test_greeting_uses_bot_name() {
        let response = handler().process_message("xin chào", "u1");
        assert_eq!(response.intent, Intent::Greeting);
        assert_eq!(response.kind, ResponseKind::Text);
        assert_eq!(response.suggestions.len(), 4);
        assert!(
            response.message.contains("HoaDon AI") || response.message.starts_with("Chào bạn")
        );
    }

    #[test]
    fn test_goodbye_has_no_suggestions() {
        let response = handler().process_message("tạm biệt", "u1");
        assert!(replies::GOODBYES.contains(&response.message.as_str()));
        assert!(response.suggestions.is_empty());
    }

    #[test]
    fn test_camera_commands() {
        let handler = handler();

        let closed = handler.process_message("tắt camera", "u1");
        assert_eq!(closed.kind, ResponseKind::CameraClose);
        assert_eq!(closed.action.as_deref(), Some("close_camera"));

        let opened = handler.process_message("mở camera chụp hóa đơn", "u1");
        assert_eq!(opened.kind, ResponseKind::CameraOpen);
        assert_eq!(opened.action.as_deref(), Some("open_camera"));
        assert!(opened.ocr_mode);
        assert!(opened.message.ends_with(replies::CAMERA_OCR_NOTE));

        let plain = handler.process_message("camera", "u1");
        assert_eq!(plain.kind, ResponseKind::CameraOpen);
        assert!(!plain.ocr_mode);

        let capture = handler.process_message("chụp", "u1");
        assert_eq!(capture.kind, ResponseKind::CameraCapture);

        let help = handler.process_message("scan invoice", "u1");
        assert_eq!(help.kind, ResponseKind::CameraHelp);
    }

    #[test]
    fn test_help_and_upload() {
        let handler = handler();
        let help = handler.process_message("hướng dẫn", "u1");
        assert_eq!(help.kind, ResponseKind::Markdown);
        assert!(help.message.starts_with("**HoaDon AI**"));

        let upload = handler.process_message("upload ảnh", "u1");
        assert_eq!(upload.kind, ResponseKind::UploadGuide);
        assert_eq!(upload.action.as_deref(), Some("show_upload_dialog"));
    }

    #[test]
    fn test_list_invoices() {
        let handler = handler().with_store(sample_store());
        let response = handler.process_message("danh sách hóa đơn", "u1");

        assert_eq!(response.kind, ResponseKind::InvoiceList);
        assert!(response.message.contains("440197093785"));
        assert!(response.message.contains("HD00123"));
        assert!(response.message.contains("385.000 ₫"));
        assert_eq!(response.data.unwrap().as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_list_invoices_without_data() {
        let response = handler()
            .with_store(Arc::new(InvoiceStore::in_memory()))
            .process_message("danh sách hóa đơn", "u1");
        assert_eq!(response.kind, ResponseKind::NoResults);
        assert_eq!(response.message, replies::NO_INVOICES);

        let dated = handler()
            .with_store(sample_store())
            .process_message("hóa đơn theo ngày 01/01/2001", "u1");
        assert_eq!(dated.kind, ResponseKind::NoResults);
        assert!(dated.message.contains("(Ngày 01/01/2001)"));
    }

    #[test]
    fn test_invoice_detail() {
        let handler = handler().with_store(sample_store());

        let found = handler.process_message("xem hóa đơn 440197093785", "u1");
        assert_eq!(found.kind, ResponseKind::InvoiceDetail);
        assert!(found.message.contains("Nguyễn Văn An"));
        assert!(found.message.contains("Hóa đơn điện"));

        let missing = handler.process_message("xem hóa đơn", "u1");
        assert_eq!(missing.message, replies::MISSING_CODE);

        let unknown = handler.process_message("xem hóa đơn 999999999999", "u1");
        assert_eq!(unknown.kind, ResponseKind::NoResults);
        assert!(unknown.message.contains("**999999999999**"));
    }

    #[test]
    fn test_file_analysis() {
        let handler = handler().with_store(sample_store());

        let found = handler.process_message("phân tích dien-thang-3.jpg", "u1");
        assert_eq!(found.intent, Intent::FileAnalysis);
        assert_eq!(found.kind, ResponseKind::FileAnalysis);
        assert!(found.message.contains("440197093785"));
        assert!(found.message.contains("90.0%"));

        let missing = handler.process_message("xem file khac.png", "u1");
        assert_eq!(missing.kind, ResponseKind::NoResults);
        assert!(missing.message.contains("khac.png"));

        let guide = handler.process_message("xem file", "u1");
        assert_eq!(guide.message, replies::FILE_GUIDE);
    }

    #[test]
    fn test_data_query() {
        let handler = handler().with_store(sample_store());

        let stats = handler.process_message("thống kê", "u1");
        assert_eq!(stats.intent, Intent::DataQuery);
        assert!(stats.message.contains("Tổng số hóa đơn: 2"));
        assert!(stats.message.contains("Tổng giá trị: 1.585.000 ₫"));

        let search = handler.process_message("tìm kiếm Bình Minh", "u1");
        assert_eq!(search.kind, ResponseKind::InvoiceList);
        assert!(search.message.contains("HD00123"));
        assert!(!search.message.contains("440197093785"));

        let empty = ChatHandler::new(ChatConfig::default()).process_message("thống kê", "u1");
        assert_eq!(empty.kind, ResponseKind::NoResults);
    }

    #[test]
    fn test_invoice_query_without_responder() {
        let response = handler().process_message("mã số thuế là gì", "u1");
        assert_eq!(response.intent, Intent::InvoiceQuery);
        assert_eq!(response.method, METHOD_PATTERN);
        assert!(response.message.contains("13 chữ số"));
    }

    #[test]
    fn test_responder_answers() {
        let response = handler()
            .with_responder(EchoResponder)
            .process_message("phân tích", "u1");
        assert_eq!(response.message, "[invoice_analysis] phân tích");
        assert_eq!(response.method, METHOD_RESPONDER);
    }

    #[test]
    fn test_responder_error_becomes_apology() {
        let handler = handler().with_responder(BrokenResponder);

        let response = handler.process_message("tạo mẫu", "u1");
        assert_eq!(response.kind, ResponseKind::Error);
        assert_eq!(response.message, replies::APOLOGY);
        assert_eq!(response.intent, Intent::TemplateHelp);

        // General falls back to canned replies instead.
        let general = handler.process_message("abcxyz", "u1");
        assert!(replies::ERROR_MESSAGES.contains(&general.message.as_str()));
    }

    #[test]
    fn test_history_recorded() {
        let handler = handler();
        handler.process_message("xin chào", "u1");
        handler.process_message("abcxyz", "u1");

        let context = handler.history().context("u1");
        assert_eq!(context.messages.len(), 2);
        assert_eq!(context.messages[1].user, "abcxyz");
        assert_eq!(context.last_intent, Some(Intent::General));
    }

    #[test]
    fn test_requested_date() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 4).unwrap();

        let (date, label) = requested_date("hóa đơn ngày 4/10", today).unwrap();
        assert_eq!(date, today);
        assert_eq!(label, " (Ngày 04/10/2025)");

        let (date, _) = requested_date("vào 15-3-24", today).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let (date, _) = requested_date("hóa đơn hôm qua", today).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 3).unwrap());

        assert_eq!(requested_date("hom nay", today).unwrap().0, today);
        assert!(requested_date("ngày 31/2", today).is_none());
        assert!(requested_date("tất cả hóa đơn", today).is_none());
    }

    #[test]
    fn test_response_serializes_type() {
        let json = serde_json::to_value(ChatResponse::apology()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["intent"], "general");
        assert!(json.get("action").is_none());
    }
}
