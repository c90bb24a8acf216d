//! Document kind detection.

use crate::models::invoice::InvoiceKind;

const ELECTRICITY_KEYWORDS: &[&str] = &[
    "điện lực",
    "tiền điện",
    "kwh",
    "evn",
    "công ty điện lực",
    "kỳ thanh toán",
    "mã khách hàng",
    "ma khach hang",
    "tén khach hang",
    "nhà cung cấp điện",
];

const MOMO_KEYWORDS: &[&str] = &[
    "momo",
    "ví điện tử",
    "thanh toán momo",
    "transaction id",
    "mã giao dịch",
    "ma giao dich",
    "tai khoan/the vi momo",
];

const WATER_KEYWORDS: &[&str] = &["tiền nước", "nước sạch", "cấp nước", "water", "m3"];
const SALE_KEYWORDS: &[&str] = &["bán hàng", "hàng hóa", "hàng hoá", "sale", "selling"];
const SERVICE_KEYWORDS: &[&str] = &["dịch vụ", "service"];

/// Decide the document kind from its text and file name.
///
/// Electricity is checked before MoMo because electricity bills are often
/// paid through the MoMo wallet and carry its branding.
pub fn classify(text: &str, filename: &str) -> InvoiceKind {
    let text = text.to_lowercase();
    let filename = filename.to_lowercase();
    let mentions = |keywords: &[&str]| {
        keywords
            .iter()
            .any(|k| text.contains(k) || filename.contains(k))
    };

    if mentions(ELECTRICITY_KEYWORDS) {
        InvoiceKind::Electricity
    } else if mentions(MOMO_KEYWORDS) {
        InvoiceKind::MomoPayment
    } else if mentions(WATER_KEYWORDS) {
        InvoiceKind::Water
    } else if mentions(SALE_KEYWORDS) {
        InvoiceKind::Sale
    } else if mentions(SERVICE_KEYWORDS) {
        InvoiceKind::Service
    } else {
        InvoiceKind::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_electricity_before_momo() {
        let text = "Thanh toán qua MoMo\nTiền điện kỳ 01/2024\nMã khách hàng: PC12DD0442433";
        assert_eq!(classify(text, "momo.jpg"), InvoiceKind::Electricity);
    }

    #[test]
    fn test_momo() {
        assert_eq!(
            classify("Ví điện tử MoMo\nMã giao dịch: 12345678901", ""),
            InvoiceKind::MomoPayment
        );
        assert_eq!(classify("receipt", "momo-upload-api-123.jpg"), InvoiceKind::MomoPayment);
    }

    #[test]
    fn test_other_kinds() {
        assert_eq!(classify("HÓA ĐƠN TIỀN NƯỚC", ""), InvoiceKind::Water);
        assert_eq!(classify("Hóa đơn bán hàng", ""), InvoiceKind::Sale);
        assert_eq!(classify("Phí dịch vụ tháng 5", ""), InvoiceKind::Service);
        assert_eq!(classify("Phiếu thu", "scan.png"), InvoiceKind::General);
    }
}
