//! Transaction commands and queries.

use chrono::NaiveDate;
use shared::{CalendarSystem, Transaction, TransactionPatch, TransactionType};

/// Create a new transaction. `date` defaults to today when not provided.
#[derive(Debug, Clone)]
pub struct CreateTransactionCommand {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category: String,
    pub account: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

/// Update fields of an existing transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionCommand {
    pub id: String,
    pub patch: TransactionPatch,
}

/// Filters applied when listing transactions. All filters are optional and
/// combine; year/month are interpreted in `calendar`.
#[derive(Debug, Clone)]
pub struct TransactionListQuery {
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub account: Option<String>,
    /// Case-insensitive match against the description.
    pub search: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub calendar: CalendarSystem,
    /// Oldest first when set; default is newest first.
    pub sort_ascending: bool,
}

impl Default for TransactionListQuery {
    fn default() -> Self {
        Self {
            transaction_type: None,
            category: None,
            account: None,
            search: None,
            year: None,
            month: None,
            calendar: CalendarSystem::Ad,
            sort_ascending: false,
        }
    }
}

/// Result of a list query with the totals of the filtered set.
#[derive(Debug, Clone)]
pub struct TransactionListResult {
    pub transactions: Vec<Transaction>,
    pub total_income: f64,
    pub total_expense: f64,
}
