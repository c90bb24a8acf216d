//! Common regex patterns for Vietnamese invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Amounts: thousand-grouped (1.234.567 / 1,234,567 with optional decimals)
    // or plain digits followed by a currency marker.
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(
        r"(?i)(\(\s*)?(-\s*)?(?:(\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?)|(\d+))\s*(vnđ|vnd|đồng|đ|₫|d\b)?"
    ).unwrap();

    // Line labels used to classify amounts
    pub static ref GRAND_TOTAL_LABEL: Regex = Regex::new(
        r"(?i)(?:tổng\s+cộng|tổng\s+thanh\s+toán|tổng\s+tiền|cộng\s+tiền\s+thanh\s+toán|\btotal\b)"
    ).unwrap();

    pub static ref SUBTOTAL_LABEL: Regex = Regex::new(
        r"(?i)(?:thành\s+tiền|tạm\s+tính|cộng\s+tiền\s+hàng|tổng\s+tiền\s+hàng|sub\s*-?\s*total)"
    ).unwrap();

    pub static ref TAX_LABEL: Regex = Regex::new(
        r"(?i)(?:thuế|\bvat\b|\btax\b|gtgt)"
    ).unwrap();

    pub static ref DISCOUNT_LABEL: Regex = Regex::new(
        r"(?i)(?:giảm\s+giá|chiết\s+khấu|khuyến\s+mãi|discount)"
    ).unwrap();

    pub static ref TAX_RATE: Regex = Regex::new(
        r"(?i)(?:thuế|vat|gtgt)[^\n%]*?(\d{1,2}(?:[.,]\d+)?)\s*%"
    ).unwrap();

    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_VIETNAMESE_LONG: Regex = Regex::new(
        r"(?i)(?:ngày\s+)?(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})"
    ).unwrap();

    pub static ref ISSUE_DATE: Regex = Regex::new(
        r"(?i)(?:ngày\s+lập|ngày\s+xuất|ngày\s+hóa\s+đơn|invoice\s+date|ngày|date)[\s:]*(.+?)(?:\n|$)"
    ).unwrap();

    pub static ref DUE_DATE: Regex = Regex::new(
        r"(?i)(?:hạn\s+thanh\s+toán|hạn\s+chót|due\s+date|thanh\s+toán\s+trước)[\s:]*(.+?)(?:\n|$)"
    ).unwrap();

    // Tax code (mã số thuế): 10 digits with optional 3 digit branch suffix
    pub static ref TAX_CODE_LABELED: Regex = Regex::new(
        r"(?i)(?:mst|mã\s+số\s+thuế|tax\s+code|tax\s+id)[\s:.]*(\d{10})(?:\s*-\s*(\d{3}))?"
    ).unwrap();

    pub static ref TAX_CODE_STANDALONE: Regex = Regex::new(
        r"\b(\d{10})(?:-(\d{3}))?\b"
    ).unwrap();

    pub static ref SELLER_TAX_CODE: Regex = Regex::new(
        r"(?i)(?:đơn\s+vị\s+bán|người\s+bán|bên\s+bán|seller)[^\n]*\n?(?:[^\n]*\n){0,3}?[^\n]*?(?:mst|mã\s+số\s+thuế|tax\s+code)[\s:.]*(\d{10}(?:-\d{3})?)"
    ).unwrap();

    pub static ref BUYER_TAX_CODE: Regex = Regex::new(
        r"(?i)(?:người\s+mua|bên\s+mua|khách\s+hàng|buyer)[^\n]*\n?(?:[^\n]*\n){0,3}?[^\n]*?(?:mst|mã\s+số\s+thuế|tax\s+code)[\s:.]*(\d{10}(?:-\d{3})?)"
    ).unwrap();

    // Invoice numbers (general invoices)
    pub static ref INVOICE_CODE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:số\s+hóa\s+đơn|invoice\s+no\.?|invoice\s+number)[:\s]+([A-Z0-9\-/]+)").unwrap(),
        Regex::new(r"(?i)(?:mã|number|code)[:\s]+([A-Z0-9\-]+)").unwrap(),
        Regex::new(r"(?i)(?:HĐ|INV|invoice)[:\s]+([A-Z0-9\-]+)").unwrap(),
        Regex::new(r"\b([A-Z]{2,3}-?\d{4,8})\b").unwrap(),
    ];

    // Parties (general invoices)
    pub static ref BUYER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:họ\s+tên\s+người\s+mua|tên\s+người\s+mua|người\s+mua|bên\s+mua|khách\s+hàng|khách|buyer)(?:\s+hàng)?[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)(?:mua\s+hàng)[:\s]*([^\n]+)").unwrap(),
    ];

    pub static ref SELLER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:đơn\s+vị\s+bán\s+hàng|đơn\s+vị\s+bán|người\s+bán|bên\s+bán|seller)[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)(?:bên\s+cung\s+cấp)[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)\b(công\s+ty[^\n]+)").unwrap(),
    ];

    pub static ref PAYMENT_METHOD: Regex = Regex::new(
        r"(?i)(?:hình\s+thức\s+thanh\s+toán|phương\s+thức\s+thanh\s+toán|payment\s+method)[:\s]*([^\n]+)"
    ).unwrap();

    pub static ref ADDRESS_PATTERN: Regex = Regex::new(
        r"(?i)(?:địa\s+chỉ|dia\s+chi|address)[:\s]*([^\n]+)"
    ).unwrap();

    // MoMo receipts
    pub static ref MOMO_TRANSACTION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:mã\s+giao\s+dịch|ma\s+giao\s+dich|transaction\s+id|trans\s+id|transaction)[:\s]*([A-Z0-9\-]{6,20})").unwrap(),
        Regex::new(r"(?i)\bid[:\s]*([A-Z0-9]{8,16})(?:\s|$)").unwrap(),
        Regex::new(r"\b([A-Z]{2,4}\d{6,12})\b").unwrap(),
    ];

    pub static ref MOMO_BACKUP_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(\d{10,15})\b").unwrap(),
        Regex::new(r"\b([A-Z0-9]{10,20})\b").unwrap(),
    ];

    pub static ref MOMO_ACCOUNT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:tài\s+khoản|từ|from|sender)[:\s]*([0-9][0-9\s\-+()]*[0-9])").unwrap(),
        Regex::new(r"(?i)(?:số\s+điện\s+thoại|phone|mobile)[:\s]*([0-9+][0-9\s\-+()]*[0-9])").unwrap(),
        Regex::new(r"(?i)(?:người\s+gửi)[:\s]*([^\n]+)").unwrap(),
    ];

    pub static ref MOMO_AMOUNT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:số\s+tiền|amount|giá\s+trị|tổng\s+tiền)[:\s]*(-?[0-9][0-9,.]*)(?:\s*(?:vnd|đ|vnđ))?").unwrap(),
        Regex::new(r"(?i)(?:thành\s+tiền|total|tổng)[:\s]*(-?[0-9][0-9,.]*)(?:\s*(?:vnd|đ|vnđ))?").unwrap(),
        Regex::new(r"(?im)(-?[0-9][0-9,.]*)\s*(?:vnd|đ|vnđ)\s*$").unwrap(),
    ];

    pub static ref MOMO_DATETIME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:thời\s+gian|time|ngày)[:\s]*(\d{1,2}[/-]\d{1,2}[/-]\d{4}\s+\d{1,2}:\d{2})").unwrap(),
        Regex::new(r"(?i)(?:thời\s+gian|time|ngày)[:\s]*(\d{1,2}[/-]\d{1,2}[/-]\d{4})").unwrap(),
        Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{4}\s+\d{1,2}:\d{2})").unwrap(),
        Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{4})").unwrap(),
    ];

    pub static ref MOMO_RECIPIENT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:người\s+nhận|bên\s+nhận)[:\s]*([^\n\r]+)").unwrap(),
        Regex::new(r"(?i)(?:tên\s+cửa\s+hàng|store|shop)[:\s]*([^\n\r]+)").unwrap(),
    ];

    pub static ref CONTENT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:nội\s+dung|content|message|ghi\s+chú)[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)(?:mô\s+tả|description)[:\s]*([^\n]+)").unwrap(),
    ];

    // Electricity bills
    pub static ref CUSTOMER_CODE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:mã\s+khách\s+hàng|ma\s+khach\s+hang)[:\s]*([A-Z0-9]+)").unwrap(),
        Regex::new(r"\b([A-Z]{2,3}\d{2,}[A-Z0-9]*)\b").unwrap(),
    ];

    pub static ref CUSTOMER_NAME_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:tên\s+khách\s+hàng|tén\s+khach\s+hang|ten\s+khach\s+hang)[:\s]*([^\n\r]+)").unwrap(),
        Regex::new(r"(?im)^\s*(?:khách\s+hàng|khach\s+hang)[:\s]+([^\n\r]+)").unwrap(),
    ];

    pub static ref PERIOD_PATTERN: Regex = Regex::new(
        r"(?i)(?:kỳ\s+thanh\s+toán|kỳ|nội\s+dung|content)[:\s]*([^\n\r]+)"
    ).unwrap();

    pub static ref ELECTRICITY_AMOUNT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:số\s+tiền|amount|total|tổng\s+tiền|tổng\s+cộng)[:\s]*(\(?-?\s*[0-9][0-9,.]*\)?)(?:\s*(?:vnd|đ|vnđ|d))?").unwrap(),
        Regex::new(r"(?i)(?:thành\s+tiền|tổng)[:\s]*(\(?-?\s*[0-9][0-9,.]*\)?)(?:\s*(?:vnd|đ|vnđ|d))?").unwrap(),
        Regex::new(r"(?m)(?:^|\s)(-\s*[0-9][0-9,.]*)d?").unwrap(),
        Regex::new(r"(\(\s*[0-9][0-9,.]*)d?\s*\)").unwrap(),
    ];

    pub static ref YEAR_ONLY: Regex = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();

    // Line items: description qty unit_price total
    pub static ref LINE_ITEM: Regex = Regex::new(
        r"^(.+?)\s+(\d+(?:[.,]\d+)?)\s+([0-9][0-9,.]*)\s+([0-9][0-9,.]*)$"
    ).unwrap();

    // Uploaded file names mentioned in text
    pub static ref FILENAME: Regex = Regex::new(
        r"(?i)([\w\-.]+\.(?:jpg|jpeg|png|pdf|gif))"
    ).unwrap();
}
