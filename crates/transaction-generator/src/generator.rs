//! Random transaction generator.

use crate::record::{
    Currency, InternationalFlag, MerchantId, PaymentMethod, TransactionRecord, TransactionType,
    AMOUNT_MAX_CENTS, AMOUNT_MIN_CENTS, AMOUNT_SCALE, LOCATION_COUNT, USER_COUNT,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Produces transaction records from a non-cryptographic RNG.
///
/// A generator is owned by exactly one worker. Seeded generators are
/// reproducible: the same seed yields the same records, apart from the
/// `transactionTime` supplied by the caller.
pub struct TransactionGenerator {
    rng: SmallRng,
    generated: u64,
}

impl TransactionGenerator {
    /// Create a generator with a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            generated: 0,
        }
    }

    /// Create a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
            generated: 0,
        }
    }

    /// Create the generator for one worker of a pool.
    ///
    /// With a base seed every worker gets a distinct, reproducible stream;
    /// without one each worker draws its own entropy.
    pub fn for_worker(base_seed: Option<u64>, worker_id: usize) -> Self {
        match base_seed {
            Some(seed) => Self::from_seed(worker_seed(seed, worker_id)),
            None => Self::from_entropy(),
        }
    }

    /// Number of records produced so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    /// Generate the next record, stamped with `transaction_time` (Unix seconds).
    pub fn next_record(&mut self, transaction_time: i64) -> TransactionRecord {
        let rng = &mut self.rng;

        let transaction_id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
        let user_id = format!("user_{}", rng.random_range(1..=USER_COUNT));
        let cents = rng.random_range(AMOUNT_MIN_CENTS..=AMOUNT_MAX_CENTS);
        let merchant_id = pick(rng, &MerchantId::ALL);
        let transaction_type = pick(rng, &TransactionType::ALL);
        let location = format!("location_{}", rng.random_range(1..=LOCATION_COUNT));
        let payment_method = pick(rng, &PaymentMethod::ALL);
        let is_international = InternationalFlag::from(rng.random_bool(0.5));
        let currency = pick(rng, &Currency::ALL);

        self.generated += 1;

        TransactionRecord {
            transaction_id,
            user_id,
            amount: Decimal::new(cents, AMOUNT_SCALE),
            transaction_time,
            merchant_id,
            transaction_type,
            location,
            payment_method,
            is_international,
            currency,
        }
    }
}

/// Derive a per-worker seed so that workers sharing a base seed diverge.
fn worker_seed(base_seed: u64, worker_id: usize) -> u64 {
    base_seed.wrapping_add((worker_id as u64).wrapping_mul(0x9E3779B97F4A7C15))
}

fn pick<T: Copy, R: Rng>(rng: &mut R, values: &[T]) -> T {
    values[rng.random_range(0..values.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    const SAMPLE: usize = 10_000;

    fn sample(seed: u64) -> Vec<TransactionRecord> {
        let mut generator = TransactionGenerator::from_seed(seed);
        (0..SAMPLE)
            .map(|i| generator.next_record(1_700_000_000 + i as i64))
            .collect()
    }

    #[test]
    fn test_amount_range_and_scale() {
        let min = Decimal::new(AMOUNT_MIN_CENTS, AMOUNT_SCALE);
        let max = Decimal::new(AMOUNT_MAX_CENTS, AMOUNT_SCALE);

        for record in sample(42) {
            assert!(record.amount >= min && record.amount <= max, "{}", record.amount);
            assert_eq!(record.amount.scale(), AMOUNT_SCALE);
        }
    }

    #[test]
    fn test_transaction_ids_are_unique_v4() {
        let records = sample(7);
        let ids: HashSet<Uuid> = records.iter().map(|r| r.transaction_id).collect();
        assert_eq!(ids.len(), records.len());
        assert!(records
            .iter()
            .all(|r| r.transaction_id.get_version_num() == 4));
    }

    #[test]
    fn test_user_ids_are_bounded() {
        let allowed: HashSet<String> = (1..=USER_COUNT).map(|n| format!("user_{n}")).collect();
        let seen: HashSet<String> = sample(1).into_iter().map(|r| r.user_id).collect();

        assert!(seen.is_subset(&allowed));
        // With 10k draws every user should appear.
        assert_eq!(seen.len(), USER_COUNT as usize);
    }

    #[test]
    fn test_locations_are_bounded() {
        let allowed: HashSet<String> = (1..=LOCATION_COUNT)
            .map(|n| format!("location_{n}"))
            .collect();
        for record in sample(3) {
            assert!(allowed.contains(&record.location), "{}", record.location);
        }
    }

    #[test]
    fn test_enum_fields_cover_their_sets() {
        let records = sample(11);

        let merchants: HashSet<MerchantId> = records.iter().map(|r| r.merchant_id).collect();
        let types: HashSet<TransactionType> =
            records.iter().map(|r| r.transaction_type).collect();
        let methods: HashSet<PaymentMethod> = records.iter().map(|r| r.payment_method).collect();
        let currencies: HashSet<Currency> = records.iter().map(|r| r.currency).collect();
        let flags: HashSet<InternationalFlag> =
            records.iter().map(|r| r.is_international).collect();

        assert_eq!(merchants.len(), MerchantId::ALL.len());
        assert_eq!(types.len(), TransactionType::ALL.len());
        assert_eq!(methods.len(), PaymentMethod::ALL.len());
        assert_eq!(currencies.len(), Currency::ALL.len());
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn test_transaction_time_is_caller_supplied() {
        let mut generator = TransactionGenerator::from_seed(5);
        let record = generator.next_record(1_234_567_890);
        assert_eq!(record.transaction_time, 1_234_567_890);
        assert_eq!(generator.generated(), 1);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let mut a = TransactionGenerator::from_seed(99);
        let mut b = TransactionGenerator::from_seed(99);
        for _ in 0..100 {
            assert_eq!(a.next_record(0), b.next_record(0));
        }
    }

    #[test]
    fn test_workers_with_same_base_seed_diverge() {
        let mut first = TransactionGenerator::for_worker(Some(42), 0);
        let mut second = TransactionGenerator::for_worker(Some(42), 1);
        assert_ne!(
            first.next_record(0).transaction_id,
            second.next_record(0).transaction_id
        );
    }

    #[test]
    fn test_entropy_generators_differ() {
        let mut a = TransactionGenerator::from_entropy();
        let mut b = TransactionGenerator::from_entropy();
        assert_ne!(a.next_record(0).transaction_id, b.next_record(0).transaction_id);
    }
}
