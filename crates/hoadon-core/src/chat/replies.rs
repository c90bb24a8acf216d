//! Canned Vietnamese replies.

pub const GREETINGS: &[&str] = &[
    "Xin chào! Tôi là {bot}, trợ lý AI chuyên về hóa đơn. Tôi có thể giúp gì cho bạn?",
    "Chào bạn! Rất vui được hỗ trợ bạn về các vấn đề hóa đơn và thuế hôm nay!",
    "Hello! Tôi là {bot}, sẵn sàng hỗ trợ bạn mọi thắc mắc về hóa đơn.",
];

pub const GREETING_SUGGESTIONS: &[&str] = &[
    "Tôi muốn tìm hiểu về hóa đơn",
    "Làm thế nào để tạo hóa đơn?",
    "Kiểm tra thông tin thuế",
    "Hướng dẫn sử dụng hệ thống",
];

pub const GOODBYES: &[&str] = &[
    "Cảm ơn bạn đã sử dụng dịch vụ! Hẹn gặp lại! 👋",
    "Rất vui được hỗ trợ bạn. Chúc bạn một ngày tốt lành! 😊",
    "Tạm biệt! Liên hệ tôi bất cứ khi nào bạn cần hỗ trợ! 🚀",
];

/// Replies for messages nobody understood.
pub const ERROR_MESSAGES: &[&str] = &[
    "Xin lỗi, tôi không hiểu câu hỏi của bạn. Bạn có thể nói rõ hơn không?",
    "Tôi cần thêm thông tin để có thể trả lời chính xác. Bạn có thể cung cấp thêm chi tiết không?",
    "Hmm, câu hỏi này hơi khó với tôi. Bạn có thể thử hỏi theo cách khác không?",
];

pub const GENERAL_SUGGESTIONS: &[&str] =
    &["Hỏi về hóa đơn", "Cần hỗ trợ", "Hướng dẫn sử dụng", "Liên hệ admin"];

pub const APOLOGY: &str = "Xin lỗi, đã có lỗi xảy ra. Vui lòng thử lại.";
pub const APOLOGY_SUGGESTIONS: &[&str] = &["Hỗ trợ kỹ thuật", "Thử lại", "Liên hệ admin"];

pub const HELP: &str = "**{bot}** - Trợ lý AI của bạn

**Tôi có thể giúp bạn:**
• 📄 Tạo và quản lý hóa đơn
• 🔍 Tìm kiếm thông tin hóa đơn
• 📊 Tạo báo cáo thuế
• 💡 Tư vấn về quy định thuế
• 🆘 Hỗ trợ kỹ thuật

**Cách sử dụng:**
- Hỏi trực tiếp về vấn đề bạn cần hỗ trợ
- Gửi ảnh hóa đơn để tôi phân tích
- Yêu cầu tạo báo cáo cụ thể

Bạn cần hỗ trợ gì hôm nay?";

pub const HELP_SUGGESTIONS: &[&str] = &[
    "Hướng dẫn tạo hóa đơn",
    "Cách tính thuế VAT",
    "Xuất dữ liệu Excel",
    "Liên hệ hỗ trợ",
];

pub const UPLOAD_GUIDE: &str = "📷 **Hướng dẫn upload ảnh hóa đơn:**

📤 **Cách 1: Upload từ máy tính**
• Nhấn nút \"Chọn file\" hoặc kéo thả ảnh
• Chọn file ảnh (JPG, PNG, PDF)
• Hệ thống sẽ tự động OCR

📱 **Cách 2: Chụp trực tiếp**
• Nói \"mở camera\" để bật camera
• Chụp ảnh hóa đơn
• OCR tự động xử lý

🔍 **Lưu ý:**
• Ảnh rõ nét, đủ ánh sáng
• Hóa đơn phẳng, không bị che khuất
• Định dạng: JPG, PNG, PDF

Bạn muốn upload ảnh bây giờ không?";

pub const UPLOAD_SUGGESTIONS: &[&str] = &[
    "Mở camera chụp ảnh",
    "Chọn file từ máy",
    "Hướng dẫn chi tiết",
    "Xem demo OCR",
];

pub const CAMERA_CLOSED: &str = "📷 Đã tắt camera. Cảm ơn bạn đã sử dụng!";
pub const CAMERA_OPENING: &str =
    "📷 Đang mở camera cho bạn... Hãy cho phép trình duyệt truy cập camera khi có thông báo.";
pub const CAMERA_OCR_NOTE: &str = "\n\n🧾 Tôi sẽ tự động phân tích hóa đơn sau khi bạn chụp ảnh!";
pub const CAMERA_CAPTURE: &str = "📸 Nhấn nút chụp ảnh trên giao diện camera hoặc nói \"chụp\" để chụp ảnh.\n\n🤖 Sau khi chụp, tôi sẽ tự động phân tích OCR cho bạn!";
pub const CAMERA_HELP: &str = "📷 Tôi có thể giúp bạn:\n\n• **Mở camera**: \"mở camera\", \"bật camera\"\n• **Chụp ảnh**: \"chụp ảnh\", \"chụp\"\n• **Tắt camera**: \"tắt camera\", \"đóng camera\"\n\nBạn muốn làm gì với camera?";

pub const NO_INVOICES: &str = "📄 Chưa có hóa đơn nào được lưu trong hệ thống.\n\n🤖 Hãy chụp ảnh hoặc upload hóa đơn để tôi phân tích và lưu trữ!";
pub const MISSING_CODE: &str =
    "❌ Vui lòng cung cấp mã hóa đơn.\n\n💡 Ví dụ: \"Xem hóa đơn 440197093785\"";

pub const FILE_GUIDE: &str = "📁 **Phân tích file:**

Tôi có thể phân tích các file đã upload:
• File JPG, PNG: OCR thông tin hóa đơn
• File PDF: Trích xuất dữ liệu structured
• Hiển thị kết quả chi tiết

🔍 **Để xem kết quả OCR:**
Gửi tên file cụ thể (vd: \"mau-hoa-don.jpg\")
Hoặc nói \"phân tích file [tên file]\"

Bạn muốn phân tích file nào?";

const CREATE_INVOICE: &str = "Để tạo hóa đơn, bạn có thể:

1. **Tạo hóa đơn thủ công:**
   - Vào mục \"Tạo mẫu hóa đơn\"
   - Điền thông tin công ty và khách hàng
   - Nhập chi tiết hàng hóa/dịch vụ
   - Hệ thống sẽ tự động tính thuế

2. **Sử dụng template có sẵn:**
   - Chọn mẫu hóa đơn phù hợp
   - Điều chỉnh thông tin cần thiết
   - Xuất file Word hoặc PDF

Bạn cần hỗ trợ thêm về bước nào không?";

const VAT: &str = "**Thuế VAT tại Việt Nam:**

📊 **Mức thuế suất:**
- 0%: Hàng xuất khẩu, một số dịch vụ
- 5%: Hàng thiết yếu (gạo, thuốc, sách...)
- 10%: Mức thuế suất tiêu chuẩn
- Không chịu thuế: Một số dịch vụ đặc biệt

💡 **Cách tính:**
- Thuế VAT = Giá chưa thuế × Thuế suất
- Giá đã thuế = Giá chưa thuế + Thuế VAT

Bạn cần tôi tính cụ thể cho trường hợp nào không?";

const TAX_CODE: &str = "**Mã số thuế doanh nghiệp:**

🔢 **Cấu trúc:** 10 chữ số hoặc 13 chữ số
- 10 số: Doanh nghiệp chính
- 13 số: Chi nhánh (10 số + 3 số chi nhánh)

📋 **Cách tra cứu:**
- Website: thuetncn.gdt.gov.vn
- Ứng dụng iTax
- Liên hệ Chi cục thuế

⚠️ **Lưu ý:** MST phải chính xác trên hóa đơn để hợp lệ.

Bạn cần tra cứu MST cụ thể nào không?";

const INVOICE_TOPICS: &str = "Tôi hiểu bạn đang hỏi về hóa đơn. Có thể bạn muốn biết về:

• 📄 Cách tạo hóa đơn mới
• 🔍 Tìm kiếm hóa đơn đã tạo
• 📊 Báo cáo thuế và thống kê
• ⚖️ Quy định pháp luật về hóa đơn
• 💰 Cách tính thuế VAT

Bạn có thể hỏi cụ thể hơn để tôi hỗ trợ tốt nhất!";

/// Keyword answer for invoice questions, or the topic overview.
pub fn invoice_answer(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    [("tạo hóa đơn", CREATE_INVOICE), ("thuế vat", VAT), ("mã số thuế", TAX_CODE)]
        .into_iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, answer)| answer)
        .unwrap_or(INVOICE_TOPICS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_answer() {
        assert!(invoice_answer("Làm sao để TẠO HÓA ĐƠN?").starts_with("Để tạo hóa đơn"));
        assert!(invoice_answer("thuế VAT bao nhiêu").contains("Mức thuế suất"));
        assert!(invoice_answer("mã số thuế có mấy số").contains("13 chữ số"));
        assert_eq!(invoice_answer("hóa đơn là gì"), INVOICE_TOPICS);
    }
}
