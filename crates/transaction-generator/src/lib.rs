//! Synthetic financial-transaction generator for txn-loadgen.
//!
//! Each producer worker owns one [`TransactionGenerator`]. Records are
//! fabricated from a small non-cryptographic RNG and encoded as compact JSON
//! before they are handed to the Kafka producer.
//!
//! # Example
//!
//! ```rust
//! use transaction_generator::TransactionGenerator;
//!
//! let mut generator = TransactionGenerator::from_seed(42);
//! let record = generator.next_record(1_700_000_000);
//! let payload = record.to_json_bytes().unwrap();
//! assert!(record.key().starts_with("user_"));
//! assert!(!payload.is_empty());
//! ```

pub mod generator;
pub mod record;

// Re-exports for convenience
pub use generator::TransactionGenerator;
pub use record::{
    Currency, InternationalFlag, MerchantId, PaymentMethod, RecordError, TransactionRecord,
    TransactionType,
};
