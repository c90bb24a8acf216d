//! Pattern-based intent detection for chat messages.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::invoice::rules::FILENAME;
use crate::text::TextProcessor;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CameraControl,
    ListInvoices,
    InvoiceDetail,
    Greeting,
    InvoiceQuery,
    DataQuery,
    InvoiceAnalysis,
    TemplateHelp,
    Help,
    UploadImage,
    FileAnalysis,
    Goodbye,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CameraControl => "camera_control",
            Intent::ListInvoices => "list_invoices",
            Intent::InvoiceDetail => "invoice_detail",
            Intent::Greeting => "greeting",
            Intent::InvoiceQuery => "invoice_query",
            Intent::DataQuery => "data_query",
            Intent::InvoiceAnalysis => "invoice_analysis",
            Intent::TemplateHelp => "template_help",
            Intent::Help => "help",
            Intent::UploadImage => "upload_image",
            Intent::FileAnalysis => "file_analysis",
            Intent::Goodbye => "goodbye",
            Intent::General => "general",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        INTENT_PATTERNS
            .iter()
            .map(|(intent, _)| *intent)
            .chain(std::iter::once(Intent::General))
            .find(|intent| intent.as_str() == s)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrases that always mean the user is asking about a file.
pub const FILE_KEYWORDS: &[&str] = &[
    "mau-hoa-don",
    "template",
    "đọc dữ liệu từ ảnh",
    "phân tích ảnh",
    "xem ảnh",
    "đọc ảnh",
    "trả ảnh",
    "xem file",
    "dữ liệu từ ảnh",
];

const INVOICE_KEYWORDS: &[&str] = &[
    "hóa đơn",
    "invoice",
    "bill",
    "thuế",
    "tax",
    "vat",
    "thanh toán",
    "payment",
    "mã số thuế",
    "tax code",
    "xuất hóa đơn",
    "tạo hóa đơn",
    "in hóa đơn",
    "báo cáo thuế",
    "khai thuế",
    "thuế gtgt",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

lazy_static! {
    /// Intent table in priority order; the first matching pattern wins.
    static ref INTENT_PATTERNS: Vec<(Intent, Vec<Regex>)> = vec![
        (Intent::CameraControl, compile(&[
            r"(mở camera|bật camera|open camera)",
            r"(mở camere|mở camara|mở cammera)",
            r"(mở máy ảnh|bật máy ảnh|máy ảnh)",
            r"(chụp ảnh|take photo|capture|chụp)",
            r"(tắt camera|đóng camera|close camera|đóng|tắt)",
            r"camera|camere|camara",
            r"(chụp hóa đơn|scan invoice)",
        ])),
        (Intent::ListInvoices, compile(&[
            r"(danh sách.*hóa đơn|hóa đơn.*danh sách)",
            r"(xem.*danh sách.*hóa đơn|danh sách.*hóa đơn.*đã.*lưu)",
            r"(hóa đơn.*đã.*lưu|hóa đơn.*đã.*upload)",
            r"(liệt kê.*hóa đơn|show.*all.*invoice)",
            r"(xem.*tất cả.*hóa đơn|all.*invoice)",
            r"(list.*invoice|saved.*invoice)",
            r"(tìm.*hóa đơn.*ngày|xem.*hóa đơn.*hôm|hóa đơn.*theo.*ngày)",
            r"(hóa đơn.*hôm nay|hóa đơn.*hôm qua|hóa đơn.*tuần này)",
            r"\b(xem.*danh sách|danh sách)\b",
            r"\b(ds.*hóa đơn|ds hd)\b",
        ])),
        (Intent::InvoiceDetail, compile(&[
            r"(xem.*hóa đơn|chi tiết.*hóa đơn|thông tin.*hóa đơn)",
            r"(xem.*mã|chi tiết.*mã|thông tin.*mã)",
            r"(invoice.*detail|view.*invoice)",
            r"(hóa đơn.*số|hóa đơn.*mã)",
        ])),
        (Intent::Greeting, compile(&[
            r"\b(xin chào|chào|hello|hi|hey|chao)\b",
            r"\b(good morning|good afternoon|good evening)\b",
            r"\b(chào buổi sáng|chào buổi chiều|chào buổi tối)\b",
            r"^(chào|hello|hi)$",
        ])),
        (Intent::InvoiceQuery, compile(&[
            r"(hóa đơn|invoice|bill)",
            r"(mã số thuế|tax code)",
            r"(thanh toán|payment)",
            r"(VAT|thuế giá trị gia tăng)",
            r"(tạo hóa đơn|làm thế nào.*tạo)",
            r"(xuất hóa đơn|in hóa đơn)",
        ])),
        (Intent::DataQuery, compile(&[
            r"(xem dữ liệu.*hóa đơn|dữ liệu.*hóa đơn)",
            r"(xem.*hóa đơn.*đã.*upload|xem.*hóa đơn.*đã.*lưu)",
            r"(xem.*ho[aá].*[dđ].*n|xem.*c[aá]c.*ho[aá])",
            r"(ho[aá].*[dđ].*n.*[dđ][aă].*l[ưu]u)",
            r"(xem dữ liệu|dữ liệu hiện tại|data)",
            r"(xem giá|giá cả|price)",
            r"(thống kê|báo cáo|report)",
            r"(danh sách|list)",
            r"(tìm kiếm thông tin|search|tìm kiếm)",
            r"(hiển thị|show|display)",
            r"(có bao nhiêu|bao nhiêu|tổng số|đếm|count|số lượng)",
            r"(xem số|xem tổng|xem toàn bộ)",
            r"(hóa đơn|hoá đơn|ho[aá]\s*[dđ].*n|invoice)",
        ])),
        (Intent::InvoiceAnalysis, compile(&[
            r"(phân tích|analyze|extract)",
            r"(đọc hóa đơn|read invoice)",
            r"(nhận dạng|recognize|identify)",
            r"(thông tin hóa đơn|invoice information)",
        ])),
        (Intent::TemplateHelp, compile(&[
            r"(mẫu hóa đơn|template)",
            r"(tạo mẫu|create template)",
            r"(thiết kế hóa đơn|design invoice)",
        ])),
        (Intent::Help, compile(&[
            r"(help|hỗ trợ|giúp đỡ)",
            r"(hướng dẫn|guide|instruction)",
            r"(làm sao|how to|cách)",
            r"(tôi cần|i need|cần)",
        ])),
        (Intent::UploadImage, compile(&[
            r"(upload ảnh|tải ảnh|up ảnh)",
            r"(gửi ảnh|send image)",
            r"(ảnh từ máy|file ảnh)",
            r"(chọn file|select file)",
        ])),
        (Intent::FileAnalysis, compile(&[
            r"(\.jpg|\.png|\.jpeg|\.pdf)",
            r"(xem file|phân tích file)",
            r"(file.*dữ liệu|dữ liệu.*file)",
            r"(kết quả.*file|file.*kết quả)",
            r"(đọc dữ liệu từ ảnh|read data from image)",
            r"(đọc ảnh|read image)",
            r"(xử lý ảnh|process image)",
            r"(phân tích ảnh|analyze image)",
            r"(mau-hoa-don|template)",
            r"(trả ảnh|show image)",
            r"(xem ảnh|view image)",
            r"(ảnh.*gì|what.*image)",
        ])),
        (Intent::Goodbye, compile(&[
            r"(tạm biệt|goodbye|bye|see you)",
            r"(cảm ơn|thank you|thanks)",
            r"(kết thúc|end|finish)",
        ])),
    ];
}

/// Confidence reported for the filename and file keyword checks.
pub const PRECHECK_CONFIDENCE: f32 = 1.0;
/// Confidence reported for an intent table match.
pub const PATTERN_CONFIDENCE: f32 = 0.9;

/// Whether the message names an image or PDF file.
pub fn mentions_file(message: &str) -> bool {
    FILENAME.is_match(message)
}

/// First file name mentioned in the message.
pub fn find_filename(message: &str) -> Option<String> {
    FILENAME
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Keyword check for invoice-related questions.
pub fn is_invoice_related(message: &str) -> bool {
    let lower = message.to_lowercase();
    INVOICE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Detects intents with ordered regex tables.
pub struct IntentDetector {
    processor: TextProcessor,
}

impl IntentDetector {
    pub fn new() -> Self {
        Self {
            processor: TextProcessor::new(),
        }
    }

    /// Detect the intent of a message.
    pub fn detect(&self, message: &str) -> Intent {
        self.detect_with_confidence(message).0
    }

    /// Detect the intent and how it was matched.
    pub fn detect_with_confidence(&self, message: &str) -> (Intent, f32) {
        let lower = message.to_lowercase();

        if mentions_file(&lower) || FILE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            debug!("File reference in message, intent file_analysis");
            return (Intent::FileAnalysis, PRECHECK_CONFIDENCE);
        }

        let normalized = self.processor.normalize(message);

        for (intent, patterns) in INTENT_PATTERNS.iter() {
            for pattern in patterns {
                if pattern.is_match(&normalized) || pattern.is_match(&lower) {
                    debug!("Matched intent '{}' with pattern '{}'", intent, pattern.as_str());
                    return (*intent, PATTERN_CONFIDENCE);
                }
            }
        }

        debug!("No intent matched, defaulting to 'general'");
        (Intent::General, 0.0)
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}
