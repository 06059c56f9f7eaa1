//! Benchmark harness helpers.

use std::sync::{Arc, Once};

use strata_core::operators::{GetTable, Operator};
use strata_core::{Catalog, CurrentScheduler, SchedulerConfig};
use tracing_subscriber::EnvFilter;

use crate::fixtures::{generate_customers, generate_orders, Scale};

static TRACING: Once = Once::new();

/// Install a tracing subscriber once; filtered by `RUST_LOG`, warnings by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // Criterion may run several benches in one process.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}

/// Catalog with generated tables and an optional worker pool.
///
/// Holds `orders` (value columns), `orders_compressed` (dictionary columns)
/// and `customers`. Dropping the context uninstalls its scheduler.
pub struct BenchContext {
    pub catalog: Arc<Catalog>,
    pub scale: Scale,
    scheduled: bool,
}

impl BenchContext {
    /// Tables at `scale`; tasks run inline.
    pub fn new(scale: Scale) -> Self {
        init_tracing();
        let catalog = Arc::new(Catalog::new());
        catalog
            .add_table("orders", Arc::new(generate_orders(scale, false)))
            .unwrap();
        catalog
            .add_table("orders_compressed", Arc::new(generate_orders(scale, true)))
            .unwrap();
        catalog
            .add_table("customers", Arc::new(generate_customers(scale)))
            .unwrap();
        Self {
            catalog,
            scale,
            scheduled: false,
        }
    }

    /// Tables at `scale`; tasks run on `workers` threads.
    pub fn with_workers(scale: Scale, workers: usize) -> Self {
        let mut ctx = Self::new(scale);
        CurrentScheduler::init(SchedulerConfig::new(workers).with_thread_name("strata-bench"))
            .unwrap();
        ctx.scheduled = true;
        ctx
    }

    /// A leaf operator reading `table`.
    pub fn table(&self, table: &str) -> Arc<Operator> {
        Operator::new(GetTable::new(Arc::clone(&self.catalog), table).into())
    }
}

impl Drop for BenchContext {
    fn drop(&mut self) {
        if self.scheduled {
            CurrentScheduler::shutdown();
        }
    }
}
