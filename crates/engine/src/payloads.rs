//! Business payloads, one per record kind.
//!
//! Amount fields are `Option<Money>`: rows coming back from the remote store
//! may omit them, and every consumer reads a missing amount as zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, Money, RecordKind, RecordPayload};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    pub owner: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub amount_minor: Option<Money>,
    pub currency: Currency,
    #[serde(default)]
    pub received_on: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

impl RecordPayload for Income {
    const KIND: RecordKind = RecordKind::Income;

    fn owner(&self) -> &str {
        &self.owner
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

/// Direction of a transaction row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidRecord(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub owner: String,
    #[serde(default)]
    pub kind: TransactionKind,
    #[serde(default)]
    pub amount_minor: Option<Money>,
    pub currency: Currency,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub occurred_on: Option<NaiveDate>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }
}

impl RecordPayload for Transaction {
    const KIND: RecordKind = RecordKind::Transaction;

    fn owner(&self) -> &str {
        &self.owner
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub value_minor: Option<Money>,
    pub currency: Currency,
}

impl RecordPayload for Asset {
    const KIND: RecordKind = RecordKind::Asset;

    fn owner(&self) -> &str {
        &self.owner
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

/// A savings goal. `current_minor` is the amount already set aside for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub target_minor: Option<Money>,
    #[serde(default)]
    pub current_minor: Option<Money>,
    pub currency: Currency,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl RecordPayload for Goal {
    const KIND: RecordKind = RecordKind::Goal;

    fn owner(&self) -> &str {
        &self.owner
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidRecord(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub limit_minor: Option<Money>,
    pub currency: Currency,
    #[serde(default)]
    pub period: BudgetPeriod,
}

impl RecordPayload for BudgetCategory {
    const KIND: RecordKind = RecordKind::BudgetCategory;

    fn owner(&self) -> &str {
        &self.owner
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}
