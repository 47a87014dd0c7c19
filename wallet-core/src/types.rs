//! Core types for wallets and their ledger
//!
//! Money is carried as `i64` minor units (cents). Every balance-changing
//! operation is a positive [`Amount`] tagged with an [`OperationType`]; the
//! sign comes from the tag, never from the amount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of minor units in one major currency unit
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Wallet identifier (128-bit, opaque)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for WalletId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly positive amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// `None` unless `minor_units > 0`
    pub fn new(minor_units: i64) -> Option<Self> {
        (minor_units > 0).then_some(Self(minor_units))
    }

    /// Convert a whole number of major units (e.g. dollars) to minor units
    pub fn from_major_units(major_units: i64) -> Option<Self> {
        major_units
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(Self::new)
    }

    /// Value in minor units
    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Amount::new(raw).ok_or_else(|| serde::de::Error::custom("amount must be positive"))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of balance-changing operation.
///
/// Internally these are CREDIT/DEBIT; on the wire and in storage they are
/// named DEPOSIT/WITHDRAW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Increases the balance
    #[serde(rename = "DEPOSIT")]
    Credit,
    /// Decreases the balance
    #[serde(rename = "WITHDRAW")]
    Debit,
}

impl OperationType {
    /// Persisted / external name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Credit => "DEPOSIT",
            OperationType::Debit => "WITHDRAW",
        }
    }

    /// Signed contribution of `amount` to a balance
    pub fn signed(&self, amount: Amount) -> i64 {
        match self {
            OperationType::Credit => amount.minor_units(),
            OperationType::Debit => -amount.minor_units(),
        }
    }

    /// Candidate balance after applying `amount`, `None` on i64 overflow.
    /// A negative result is returned as-is; rejecting it is the caller's job.
    pub fn apply_to(&self, balance: i64, amount: Amount) -> Option<i64> {
        match self {
            OperationType::Credit => balance.checked_add(amount.minor_units()),
            OperationType::Debit => balance.checked_sub(amount.minor_units()),
        }
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" | "CREDIT" => Ok(OperationType::Credit),
            "WITHDRAW" | "DEBIT" => Ok(OperationType::Debit),
            other => Err(format!(
                "unknown operation type `{}`, expected DEPOSIT or WITHDRAW",
                other
            )),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current balance snapshot of a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet ID
    pub id: WalletId,

    /// Balance in minor units, never negative
    pub balance: i64,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last mutation time (non-decreasing)
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// New wallet row with both timestamps set to `now`
    pub fn new(id: WalletId, balance: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable record of one accepted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID (UUIDv7, tiebreak for equal timestamps)
    pub id: Uuid,

    /// Wallet the entry belongs to
    pub wallet_id: WalletId,

    /// CREDIT or DEBIT
    pub operation_type: OperationType,

    /// Positive amount in minor units
    pub amount: Amount,

    /// Time of the operation
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// New entry with a fresh time-ordered ID
    pub fn new(
        wallet_id: WalletId,
        operation_type: OperationType,
        amount: Amount,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            wallet_id,
            operation_type,
            amount,
            created_at,
        }
    }

    /// Signed contribution of this entry to the wallet balance
    pub fn signed_amount(&self) -> i64 {
        self.operation_type.signed(self.amount)
    }
}

/// Sum of signed amounts; `None` on overflow
pub fn ledger_sum<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Option<i64> {
    entries
        .into_iter()
        .try_fold(0i64, |acc, entry| acc.checked_add(entry.signed_amount()))
}
