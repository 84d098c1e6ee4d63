//! Order domain types.

use chrono::{DateTime, Utc};

use souq_core::{OrderId, OrderNumber, OrderStatus, Price, ProductId, UserId};

/// Maximum length of free-text checkout fields.
const MAX_FIELD_LENGTH: usize = 200;
/// Maximum length of delivery notes.
const MAX_NOTES_LENGTH: usize = 500;

/// Delivery details collected at checkout.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub customer_name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub notes: Option<String>,
}

impl OrderDetails {
    /// Trim every field and check required fields and lengths.
    ///
    /// # Errors
    ///
    /// Returns a shopper-facing Arabic message naming the first invalid field.
    pub fn normalized(self) -> Result<Self, String> {
        let customer_name = required(&self.customer_name, "الاسم")?;
        let phone = normalize_phone(&self.phone).ok_or_else(|| "رقم الجوال غير صالح".to_owned())?;
        let city = required(&self.city, "المدينة")?;
        let address = required(&self.address, "العنوان")?;
        let notes = self
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
            return Err(format!("الملاحظات أطول من {MAX_NOTES_LENGTH} حرف"));
        }

        Ok(Self {
            customer_name,
            phone,
            city,
            address,
            notes,
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("حقل {field} مطلوب"));
    }
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(format!("حقل {field} أطول من {MAX_FIELD_LENGTH} حرف"));
    }
    Ok(trimmed.to_owned())
}

/// Keep digits and a leading `+`; accept 7-15 digits (E.164 range).
///
/// Arabic-Indic digits (٠-٩) are folded to ASCII.
fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let plus = trimmed.starts_with('+');
    let digits: String = trimmed
        .chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            '\u{0660}'..='\u{0669}' => char::from_digit(u32::from(c) - 0x0660, 10),
            _ => None,
        })
        .collect();
    (7..=15)
        .contains(&digits.len())
        .then(|| if plus { format!("+{digits}") } else { digits })
}

/// A placed order with its items.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub subtotal: Price,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A snapshot of a cart line at the time the order was placed.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Price,
    pub quantity: i32,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// One row of the order history list.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub subtotal: Price,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> OrderDetails {
        OrderDetails {
            customer_name: "  سارة أحمد ".to_owned(),
            phone: "+966 50 123 4567".to_owned(),
            city: "الرياض".to_owned(),
            address: "حي النخيل، شارع ١٢".to_owned(),
            notes: Some("   ".to_owned()),
        }
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_notes() {
        let d = details().normalized().unwrap();
        assert_eq!(d.customer_name, "سارة أحمد");
        assert_eq!(d.phone, "+966501234567");
        assert!(d.notes.is_none());
    }

    #[test]
    fn test_arabic_indic_digits_in_phone() {
        assert_eq!(normalize_phone("٠٥٠١٢٣٤٥٦٧").unwrap(), "0501234567");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut d = details();
        d.city = " ".to_owned();
        assert!(d.normalized().unwrap_err().contains("المدينة"));
    }

    #[test]
    fn test_short_phone_is_rejected() {
        let mut d = details();
        d.phone = "12345".to_owned();
        assert!(d.normalized().is_err());
    }
}
