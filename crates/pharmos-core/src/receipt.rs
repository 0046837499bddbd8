//! # Receipt Module
//!
//! Structured receipt data and a fixed-width plain-text renderer.
//! Print-device handling is not part of this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Bill, BillItem, BillStatus, PaymentMethod};

/// Narrowest width `render_text` will lay out.
pub const MIN_RECEIPT_WIDTH: usize = 24;

/// A receipt built from a persisted bill.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub bill_number: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub doctor_name: Option<String>,
    pub items: Vec<ReceiptLine>,
    pub subtotal: Money,
    /// Display-only percentage, e.g. 12.5.
    pub discount_percent: f64,
    pub discount_amount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub status: BillStatus,
    pub served_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub product_name: String,
    pub lot_number: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

impl Receipt {
    /// Builds a receipt from a bill and its items (in any order).
    pub fn from_bill(store_name: &str, bill: &Bill, items: &[BillItem]) -> Self {
        let mut ordered: Vec<&BillItem> = items.iter().collect();
        ordered.sort_by_key(|item| item.position);

        Receipt {
            store_name: store_name.to_string(),
            bill_number: bill.bill_number.clone(),
            issued_at: bill.created_at,
            customer_name: bill.customer_name.clone(),
            customer_phone: bill.customer_phone.clone(),
            doctor_name: bill.doctor_name.clone(),
            items: ordered
                .into_iter()
                .map(|item| ReceiptLine {
                    product_name: item.product_name.clone(),
                    lot_number: item.lot_number.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price(),
                    line_total: item.line_total(),
                })
                .collect(),
            subtotal: bill.subtotal(),
            discount_percent: bill.discount_rate().percentage(),
            discount_amount: bill.discount_amount(),
            total: bill.total(),
            payment_method: bill.payment_method,
            status: bill.status,
            served_by: bill.created_by.clone(),
        }
    }

    /// Renders the receipt as plain text, `width` columns wide.
    ///
    /// ```text
    ///        CITY PHARMACY
    /// --------------------------------
    /// Bill: BILL-20260601-103000-1A2B3C4D
    /// ...
    /// Paracetamol 500mg
    ///   3 x 10.00                30.00
    /// --------------------------------
    /// Subtotal                   30.00
    /// TOTAL                      30.00
    /// ```
    pub fn render_text(&self, width: usize) -> String {
        let width = width.max(MIN_RECEIPT_WIDTH);
        let rule = "-".repeat(width);
        let mut out: Vec<String> = Vec::new();

        out.push(center(&self.store_name.to_uppercase(), width));
        out.push(rule.clone());
        out.push(format!("Bill: {}", self.bill_number));
        out.push(format!("Date: {}", self.issued_at.format("%Y-%m-%d %H:%M UTC")));
        out.push(format!("Customer: {}", self.customer_name));
        if let Some(phone) = &self.customer_phone {
            out.push(format!("Phone: {}", phone));
        }
        if let Some(doctor) = &self.doctor_name {
            out.push(format!("Doctor: {}", doctor));
        }
        out.push(rule.clone());

        for line in &self.items {
            out.push(line.product_name.clone());
            out.push(columns(
                &format!("  {} x {} ({})", line.quantity, line.unit_price, line.lot_number),
                &line.line_total.to_string(),
                width,
            ));
        }

        out.push(rule.clone());
        out.push(columns("Subtotal", &self.subtotal.to_string(), width));
        if !self.discount_amount.is_zero() {
            out.push(columns(
                &format!("Discount ({}%)", self.discount_percent),
                &format!("-{}", self.discount_amount),
                width,
            ));
        }
        out.push(columns("TOTAL", &self.total.to_string(), width));
        out.push(format!("Payment: {}", self.payment_method));
        out.push(format!("Served by: {}", self.served_by));

        if self.status == BillStatus::Cancelled {
            out.push(center("*** CANCELLED ***", width));
        }

        out.push(rule);
        out.push(center("Thank you. Get well soon!", width));

        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((width - len) / 2), text)
}

/// Left text and right-aligned value on one line. Overflow keeps one space.
fn columns(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = width.saturating_sub(used).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(discount_bps: u32, status: BillStatus) -> Bill {
        Bill {
            id: "bill-1".to_string(),
            bill_number: "BILL-20260601-103000-1A2B3C4D".to_string(),
            customer_name: "Asha Rao".to_string(),
            customer_phone: Some("98450 12345".to_string()),
            doctor_id: Some("d-1".to_string()),
            doctor_name: Some("Dr. Mehta".to_string()),
            payment_method: PaymentMethod::Upi,
            discount_bps,
            subtotal_cents: 10000,
            discount_cents: (10000 * discount_bps as i64) / 10000,
            total_cents: 10000 - (10000 * discount_bps as i64) / 10000,
            status,
            created_at: Utc::now(),
            created_by: "u-7".to_string(),
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    fn item(position: i64, name: &str, qty: i64, price: i64) -> BillItem {
        BillItem {
            id: format!("i-{}", position),
            bill_id: "bill-1".to_string(),
            batch_id: format!("b-{}", position),
            product_name: name.to_string(),
            lot_number: format!("LOT-{}", position),
            unit_price_cents: price,
            quantity: qty,
            line_total_cents: price * qty,
            position,
        }
    }

    #[test]
    fn test_from_bill_orders_items_by_position() {
        let items = vec![item(1, "Cough Syrup", 1, 4000), item(0, "Paracetamol", 6, 1000)];
        let receipt = Receipt::from_bill("City Pharmacy", &bill(0, BillStatus::Active), &items);

        assert_eq!(receipt.items[0].product_name, "Paracetamol");
        assert_eq!(receipt.items[1].product_name, "Cough Syrup");
        assert_eq!(receipt.total.cents(), 10000);
        assert_eq!(receipt.served_by, "u-7");
    }

    #[test]
    fn test_render_text_contents() {
        let items = vec![item(0, "Paracetamol 500mg", 3, 1000)];
        let receipt = Receipt::from_bill("City Pharmacy", &bill(1000, BillStatus::Active), &items);
        let text = receipt.render_text(32);

        assert!(text.contains("CITY PHARMACY"));
        assert!(text.contains("Bill: BILL-20260601-103000-1A2B3C4D"));
        assert!(text.contains("Doctor: Dr. Mehta"));
        assert!(text.contains("Discount (10%)"));
        assert!(text.contains("-10.00"));
        assert!(text.contains("Payment: UPI"));
        assert!(!text.contains("CANCELLED"));

        let total_line = text.lines().find(|l| l.starts_with("TOTAL")).unwrap();
        assert_eq!(total_line.chars().count(), 32);
        assert!(total_line.ends_with("90.00"));
    }

    #[test]
    fn test_render_text_marks_cancelled_and_hides_zero_discount() {
        let receipt = Receipt::from_bill(
            "City Pharmacy",
            &bill(0, BillStatus::Cancelled),
            &[item(0, "Paracetamol", 1, 10000)],
        );
        let text = receipt.render_text(10);

        assert!(text.contains("*** CANCELLED ***"));
        assert!(!text.contains("Discount"));
        assert!(text.lines().any(|l| l == "-".repeat(MIN_RECEIPT_WIDTH)));
    }

    #[test]
    fn test_columns_overflow_keeps_a_space() {
        assert_eq!(columns("abcdef", "123", 5), "abcdef 123");
        assert_eq!(columns("ab", "12", 8), "ab    12");
    }
}
