//! Shared types for the Nepali Wallet expense tracker.
//!
//! This crate holds the entity shapes that cross layer boundaries: the
//! persisted aggregate and its members, the remote sync document, the input
//! shapes accepted by the store, and boundary validation. The persisted JSON
//! uses camelCase field names so blobs written by earlier builds of the app
//! load unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Current version of the persisted aggregate shape. Blobs carrying an older
/// version are migrated on load before anything else sees them.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed user id stamped on locally created transactions. Cloud sync keys the
/// remote document by the real account id; local records all share this
/// placeholder.
pub const LOCAL_USER_ID: &str = "local-user";

/// Whether a transaction moves money in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single income or expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Always non-negative; the direction comes from `transaction_type`.
    /// Enforced at the input boundary, not by the store.
    pub amount: f64,
    /// Category id. May dangle if the category was deleted without a cascade.
    pub category: String,
    /// Account id. Same caveat as `category`.
    pub account: String,
    pub description: String,
    /// Calendar date of the transaction, interpreted in the Gregorian
    /// calendar regardless of the display calendar.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An expense or income category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
}

/// A money source/destination (cash, savings, card, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub icon: String,
}

/// Singleton user settings, embedded in the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub currency: String,
    pub auto_sync: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "Rs".to_string(),
            auto_sync: false,
        }
    }
}

/// The aggregate root: the entire persisted state of the application,
/// serialized as one JSON document under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    /// Shape version of this blob. Absent in blobs written before versioning
    /// existed; those deserialize through the migration path as version 0.
    #[serde(default)]
    pub schema_version: u32,
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub custom_categories: Vec<Category>,
    #[serde(default)]
    pub custom_accounts: Vec<Account>,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for StorageData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            transactions: Vec::new(),
            custom_categories: Vec::new(),
            custom_accounts: Vec::new(),
            settings: Settings::default(),
        }
    }
}

impl StorageData {
    /// True when the aggregate carries no user-created data at all. Used by
    /// sync to refuse overwriting a cloud backup with emptiness.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.custom_categories.is_empty()
            && self.custom_accounts.is_empty()
    }
}

/// The per-user remote document: the whole local aggregate wrapped with sync
/// metadata. Last writer wins; there is no merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDocument {
    pub data: StorageData,
    /// RFC 3339 timestamp taken on the device at upload time.
    pub last_synced_at: String,
    pub user_id: String,
    /// Server-assigned timestamp; `None` until the remote store fills it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Input shape for creating a transaction. Id, user id and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category: String,
    pub account: String,
    pub description: String,
    pub date: NaiveDate,
}

/// Partial update for a transaction. `None` fields are left untouched;
/// `updated_at` is refreshed by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub account: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Input shape for a custom category; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
    pub category_type: TransactionType,
}

/// Input shape for a custom account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub icon: String,
}

/// Partial update for settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub currency: Option<String>,
    pub auto_sync: Option<bool>,
}

/// Which calendar drives date display, filtering and month bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarSystem {
    /// Gregorian (Anno Domini).
    Ad,
    /// Bikram Sambat.
    Bs,
}

impl CalendarSystem {
    pub fn label(&self) -> &'static str {
        match self {
            CalendarSystem::Ad => "AD",
            CalendarSystem::Bs => "BS",
        }
    }
}

/// Validation failures caught at the input boundary, before anything reaches
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyDescription,
    DescriptionTooLong(usize),
    AmountNotPositive,
    EmptyCategory,
    EmptyAccount,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyDescription => write!(f, "Description must not be empty"),
            ValidationError::DescriptionTooLong(len) => {
                write!(f, "Description too long ({len} characters, max 256)")
            }
            ValidationError::AmountNotPositive => write!(f, "Amount must be greater than zero"),
            ValidationError::EmptyCategory => write!(f, "A category is required"),
            ValidationError::EmptyAccount => write!(f, "An account is required"),
        }
    }
}

/// Validate a transaction before it is handed to the store. The store itself
/// accepts whatever it is given; this is the only gate.
pub fn validate_new_transaction(tx: &NewTransaction) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if tx.description.trim().is_empty() {
        errors.push(ValidationError::EmptyDescription);
    } else if tx.description.len() > 256 {
        errors.push(ValidationError::DescriptionTooLong(tx.description.len()));
    }
    if !(tx.amount > 0.0) {
        errors.push(ValidationError::AmountNotPositive);
    }
    if tx.category.trim().is_empty() {
        errors.push(ValidationError::EmptyCategory);
    }
    if tx.account.trim().is_empty() {
        errors.push(ValidationError::EmptyAccount);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Built-in expense categories, seeded in code and never persisted. They
/// exist identically on every device, so the aggregate only carries custom
/// entries.
pub fn builtin_expense_categories() -> Vec<Category> {
    [
        ("food", "Food", "🍽️", "bg-cyan-600"),
        ("transport", "Transport", "🚗", "bg-blue-500"),
        ("entertainment", "Entertainment", "🎬", "bg-purple-500"),
        ("bills", "Bills", "📄", "bg-yellow-500"),
        ("rent", "Rent Expense", "🏠", "bg-teal-500"),
        ("shopping", "Shopping", "🛍️", "bg-pink-500"),
        ("health", "Health", "🏥", "bg-green-500"),
        ("debit-transfer", "Debit Transfer", "💸", "bg-red-500"),
        ("other-expense", "Other Expense", "📦", "bg-orange-500"),
    ]
    .into_iter()
    .map(|(id, name, icon, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        category_type: TransactionType::Expense,
    })
    .collect()
}

/// Built-in income categories.
pub fn builtin_income_categories() -> Vec<Category> {
    [
        ("salary", "Salary", "💼", "bg-emerald-500"),
        ("rent-income", "Rent Income", "🏠", "bg-blue-400"),
        ("investment", "Investment", "📈", "bg-teal-500"),
        ("credit-transfer", "Credit Transfer", "💸", "bg-green-400"),
        ("carry-over", "Carry Over", "🔁", "bg-orange-500"),
        ("other-income", "Other Income", "💰", "bg-yellow-500"),
    ]
    .into_iter()
    .map(|(id, name, icon, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        category_type: TransactionType::Income,
    })
    .collect()
}

/// Built-in accounts.
pub fn builtin_accounts() -> Vec<Account> {
    [
        ("cash", "Cash", "💵"),
        ("savings", "Savings", "💰"),
        ("card", "Card", "💳"),
    ]
    .into_iter()
    .map(|(id, name, icon)| Account {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> NewTransaction {
        NewTransaction {
            transaction_type: TransactionType::Income,
            amount: 500.0,
            category: "salary".to_string(),
            account: "cash".to_string(),
            description: "January salary".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn transaction_serializes_with_camel_case_wire_names() {
        let tx = Transaction {
            id: "1700000000000".to_string(),
            user_id: LOCAL_USER_ID.to_string(),
            transaction_type: TransactionType::Expense,
            amount: 40.0,
            category: "food".to_string(),
            account: "cash".to_string(),
            description: "Lunch".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            created_at: DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["userId"], LOCAL_USER_ID);
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["createdAt"], "2024-01-15T10:30:00Z");
    }

    #[test]
    fn storage_data_round_trips_through_json() {
        let mut data = StorageData::default();
        data.custom_categories.push(Category {
            id: "custom-1".to_string(),
            name: "Pets".to_string(),
            icon: "🐾".to_string(),
            color: "bg-amber-500".to_string(),
            category_type: TransactionType::Expense,
        });

        let json = serde_json::to_string(&data).unwrap();
        let back: StorageData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn legacy_blob_without_version_field_deserializes_as_version_zero() {
        let legacy = r#"{
            "transactions": [],
            "customCategories": [],
            "customAccounts": [],
            "settings": { "currency": "Rs", "autoSync": false }
        }"#;
        let data: StorageData = serde_json::from_str(legacy).unwrap();
        assert_eq!(data.schema_version, 0);
    }

    #[test]
    fn validation_accepts_a_well_formed_transaction() {
        assert!(validate_new_transaction(&sample_transaction()).is_ok());
    }

    #[test]
    fn validation_rejects_non_positive_amounts() {
        let mut tx = sample_transaction();
        tx.amount = 0.0;
        let errors = validate_new_transaction(&tx).unwrap_err();
        assert!(errors.contains(&ValidationError::AmountNotPositive));

        tx.amount = -10.0;
        let errors = validate_new_transaction(&tx).unwrap_err();
        assert!(errors.contains(&ValidationError::AmountNotPositive));
    }

    #[test]
    fn validation_collects_every_failure() {
        let tx = NewTransaction {
            transaction_type: TransactionType::Expense,
            amount: 0.0,
            category: String::new(),
            account: String::new(),
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        let errors = validate_new_transaction(&tx).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn builtin_seeds_are_stable() {
        assert_eq!(builtin_expense_categories().len(), 9);
        assert_eq!(builtin_income_categories().len(), 6);
        assert_eq!(builtin_accounts().len(), 3);
        assert!(builtin_expense_categories()
            .iter()
            .all(|c| c.category_type == TransactionType::Expense));
    }

    #[test]
    fn empty_aggregate_is_detected() {
        let mut data = StorageData::default();
        assert!(data.is_empty());
        data.custom_accounts.push(Account {
            id: "custom-2".to_string(),
            name: "Wallet".to_string(),
            icon: "👛".to_string(),
        });
        assert!(!data.is_empty());
    }
}
