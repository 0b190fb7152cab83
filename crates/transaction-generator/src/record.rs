//! The transaction record published to Kafka and its fixed value sets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of distinct synthetic users (`user_1` ... `user_100`).
pub const USER_COUNT: u32 = 100;

/// Number of distinct synthetic locations (`location_1` ... `location_50`).
pub const LOCATION_COUNT: u32 = 50;

/// Smallest generated amount, in cents.
pub const AMOUNT_MIN_CENTS: i64 = 5_000_000;

/// Largest generated amount, in cents.
pub const AMOUNT_MAX_CENTS: i64 = 15_000_000;

/// Number of fraction digits carried by every amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Errors raised while encoding a record for the wire.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to encode transaction record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single synthetic financial transaction.
///
/// Serialized as a compact JSON object with camelCase keys. The record is
/// immutable once generated and carries no references to other records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub user_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub transaction_time: i64,
    pub merchant_id: MerchantId,
    pub transaction_type: TransactionType,
    pub location: String,
    pub payment_method: PaymentMethod,
    pub is_international: InternationalFlag,
    pub currency: Currency,
}

impl TransactionRecord {
    /// The partition key: all records for one user land on one partition.
    pub fn key(&self) -> &str {
        &self.user_id
    }

    /// Encode the record as UTF-8 JSON.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RecordError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MerchantId {
    #[serde(rename = "merchant_1")]
    Merchant1,
    #[serde(rename = "merchant_2")]
    Merchant2,
    #[serde(rename = "merchant_3")]
    Merchant3,
}

impl MerchantId {
    pub const ALL: [MerchantId; 3] = [
        MerchantId::Merchant1,
        MerchantId::Merchant2,
        MerchantId::Merchant3,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Refund,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Purchase, TransactionType::Refund];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::Paypal,
        PaymentMethod::BankTransfer,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Gbp];
}

/// `isInternational` travels as the literal text `"True"` or `"False"`,
/// not as a JSON boolean. Downstream consumers match on that text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternationalFlag {
    True,
    False,
}

impl InternationalFlag {
    pub fn as_bool(self) -> bool {
        matches!(self, InternationalFlag::True)
    }
}

impl From<bool> for InternationalFlag {
    fn from(value: bool) -> Self {
        if value {
            InternationalFlag::True
        } else {
            InternationalFlag::False
        }
    }
}
