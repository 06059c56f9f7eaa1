//! Test data generation for benchmarks.
//!
//! Every generator is seeded so runs are comparable.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{DataType, DictionaryCompression, Table, Value};

const SEED: u64 = 0x5eed_0001;

/// Scale factor for benchmark data generation.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// 1,000 orders; for quick iteration.
    Tiny,
    /// 10,000 orders.
    Small,
    /// 100,000 orders.
    #[default]
    Medium,
    /// 1,000,000 orders.
    Large,
}

impl Scale {
    /// Number of order rows.
    pub fn count(&self) -> usize {
        match self {
            Scale::Tiny => 1_000,
            Scale::Small => 10_000,
            Scale::Medium => 100_000,
            Scale::Large => 1_000_000,
        }
    }

    /// Number of distinct customers referenced by the orders.
    pub fn customers(&self) -> usize {
        (self.count() / 20).max(10)
    }

    /// Rows per chunk.
    pub fn chunk_size(&self) -> u32 {
        match self {
            Scale::Tiny => 256,
            Scale::Small => 1_024,
            Scale::Medium | Scale::Large => 16_384,
        }
    }
}

const REGIONS: [&str; 5] = ["north", "south", "east", "west", "central"];

/// Orders table: `id: int, customer_id: int, region: string, amount: double, quantity: long`.
pub fn generate_orders(scale: Scale, compressed: bool) -> Table {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut table = Table::with_columns(
        scale.chunk_size(),
        [
            ("id", DataType::Int),
            ("customer_id", DataType::Int),
            ("region", DataType::String),
            ("amount", DataType::Double),
            ("quantity", DataType::Long),
        ],
    );
    let customers = scale.customers() as i32;
    for id in 0..scale.count() {
        table
            .append(vec![
                Value::Int(id as i32),
                Value::Int(rng.gen_range(0..customers)),
                Value::from(REGIONS[rng.gen_range(0..REGIONS.len())]),
                Value::Double(rng.gen_range(1.0..500.0)),
                Value::Long(rng.gen_range(1..20)),
            ])
            .expect("generated row matches the orders schema");
    }
    if compressed {
        DictionaryCompression::compress_table(&mut table).expect("orders hold no reference columns");
    }
    table
}

/// Customers table: `id: int, name: string, credit: int`.
pub fn generate_customers(scale: Scale) -> Table {
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    let mut table = Table::with_columns(
        scale.chunk_size(),
        [
            ("id", DataType::Int),
            ("name", DataType::String),
            ("credit", DataType::Int),
        ],
    );
    for id in 0..scale.customers() {
        let name: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        table
            .append(vec![
                Value::Int(id as i32),
                Value::String(name),
                Value::Int(rng.gen_range(0..10_000)),
            ])
            .expect("generated row matches the customers schema");
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_deterministic() {
        let first = generate_orders(Scale::Tiny, false);
        let second = generate_orders(Scale::Tiny, true);
        assert_eq!(first.row_count(), Scale::Tiny.count());
        assert_eq!(first.rows().unwrap(), second.rows().unwrap());
        assert_eq!(generate_customers(Scale::Tiny).row_count(), Scale::Tiny.customers());
    }
}
