//! Invoices as listed on the payments page

use serde::Serialize;
use serde_json::Value;

use crate::certificate::{day_month_year, full_name, instant, short_id};
use crate::error::RecordError;
use crate::record::{self, Object};

pub const INVOICES_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceUser {
    pub name: String,
    pub email: String,
    pub initials: String,
}

/// One invoice ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    pub id: String,
    pub invoice_id: String,
    pub user: InvoiceUser,
    pub booking_id: String,
    /// `DD/MM/YYYY, hh:mm AM`
    pub date_time: String,
    pub amount: f64,
    pub status: &'static str,
}

impl InvoiceView {
    pub fn from_object(invoice: &Object) -> Self {
        let id = record::text(invoice, &["id"]).unwrap_or_default();
        let student = record::object(invoice, &["AccUser"]);
        let snapshot = record::text(invoice, &["acc_user_name_snapshot"]);

        let user = match student {
            Some(student) => {
                let initial = |key: &str| {
                    record::text(student, &[key])
                        .and_then(|name| name.chars().next())
                        .map(String::from)
                        .unwrap_or_default()
                };
                InvoiceUser {
                    name: full_name(student),
                    email: record::object(student, &["User"])
                        .and_then(|user| record::text(user, &["email"]))
                        .unwrap_or_default(),
                    initials: format!("{}{}", initial("first_name"), initial("last_name"))
                        .to_uppercase(),
                }
            }
            None => InvoiceUser {
                name: snapshot.clone().unwrap_or_else(|| "Student".to_string()),
                email: String::new(),
                initials: short_id(snapshot.as_deref().unwrap_or("S"), 2),
            },
        };

        let booking_id = record::object(invoice, &["Payment"])
            .and_then(|payment| record::text(payment, &["booking_id"]))
            .map(|booking| format!("BK-{}", short_id(&booking, 8)))
            .unwrap_or_else(|| format!("INV-{}", short_id(&id, 8)));

        let date_time = instant(invoice, "start_date_snapshot")
            .or_else(|| instant(invoice, "created_at"))
            .map(|at| format!("{}, {}", day_month_year(&at), at.format("%I:%M %p")))
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            invoice_id: format!("INV-{}", short_id(&id, 6)),
            amount: record::number(invoice, &["total_amount"]).unwrap_or(0.0),
            status: "Paid",
            id,
            user,
            booking_id,
            date_time,
        }
    }

    /// Case-insensitive match on the student name, invoice id or booking id
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [&self.user.name, &self.invoice_id, &self.booking_id]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceStats {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
}

/// A filtered page of invoices plus totals over the whole listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceView>,
    pub stats: InvoiceStats,
    pub page: usize,
    pub total_pages: usize,
}

impl InvoicePage {
    /// `page` is 1-based; pages past the end are empty
    pub fn build(all: Vec<InvoiceView>, query: Option<&str>, page: usize) -> Self {
        let stats = InvoiceStats {
            total: all.len(),
            paid: all.len(),
            pending: 0,
        };
        let filtered: Vec<InvoiceView> = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => all.into_iter().filter(|i| i.matches(query)).collect(),
            None => all,
        };
        let page = page.max(1);
        let total_pages = filtered.len().div_ceil(INVOICES_PER_PAGE);
        let invoices = filtered
            .into_iter()
            .skip((page - 1) * INVOICES_PER_PAGE)
            .take(INVOICES_PER_PAGE)
            .collect();
        Self {
            invoices,
            stats,
            page,
            total_pages,
        }
    }
}

/// Map an invoice listing; entries that are not objects are skipped
pub fn invoice_views(raw: &Value) -> Result<Vec<InvoiceView>, RecordError> {
    Ok(record::list(raw, &["invoices", "data"], "invoices")?
        .iter()
        .filter_map(Value::as_object)
        .map(InvoiceView::from_object)
        .collect())
}
