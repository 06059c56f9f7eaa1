//! End-to-end tests for operator pipelines over the column store.

use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::operators::{
    Aggregate, AggregateDefinition, AggregateFunction, GetTable, Operator, Projection,
    ProjectionColumn, TableScan,
};
use strata_core::{
    Catalog, CurrentScheduler, DataType, DictionaryCompression, Error, ScanType, SchedulerConfig,
    Table, Value, ValuePlaceholder,
};

// The installed scheduler is process-wide.
static GLOBAL_SCHEDULER: Mutex<()> = parking_lot::const_mutex(());

const CUSTOMERS: [&str; 3] = ["ann", "bob", "cid"];

struct TestContext {
    catalog: Arc<Catalog>,
}

impl TestContext {
    fn new(compressed: bool) -> Self {
        let catalog = Arc::new(Catalog::new());
        catalog
            .add_table("orders", Arc::new(orders_table(compressed)))
            .unwrap();
        Self { catalog }
    }

    fn orders(&self) -> Arc<Operator> {
        Operator::new(GetTable::new(Arc::clone(&self.catalog), "orders").into())
    }
}

/// 20 orders in chunks of four: id, customer, amount, quantity.
fn orders_table(compressed: bool) -> Table {
    let mut table = Table::with_columns(
        4,
        [
            ("id", DataType::Int),
            ("customer", DataType::String),
            ("amount", DataType::Double),
            ("quantity", DataType::Long),
        ],
    );
    for i in 0..20 {
        table
            .append(vec![
                Value::Int(i),
                Value::from(CUSTOMERS[i as usize % 3]),
                Value::Double(i as f64 * 1.5),
                Value::Long((i % 4) as i64),
            ])
            .unwrap();
    }
    if compressed {
        DictionaryCompression::compress_table(&mut table).unwrap();
    }
    table
}

/// Per-customer (sum of ids, count, max amount) over orders with quantity >= 2,
/// in order of first occurrence.
fn expected_groups() -> Vec<Vec<Value>> {
    let mut groups: Vec<(&str, i64, i64, f64)> = Vec::new();
    for i in (0..20).filter(|i| i % 4 >= 2) {
        let customer = CUSTOMERS[i as usize % 3];
        let amount = i as f64 * 1.5;
        match groups.iter_mut().find(|(name, ..)| *name == customer) {
            Some(group) => {
                group.1 += i as i64;
                group.2 += 1;
                group.3 = group.3.max(amount);
            }
            None => groups.push((customer, i as i64, 1, amount)),
        }
    }
    groups
        .into_iter()
        .map(|(customer, sum, count, max)| {
            vec![
                Value::from(customer),
                Value::Long(sum),
                Value::Long(count),
                Value::Double(max),
            ]
        })
        .collect()
}

fn scan_and_aggregate(ctx: &TestContext) -> Arc<Table> {
    let scan = Operator::new(
        TableScan::new(
            ctx.orders(),
            3,
            ScanType::GreaterThanEquals,
            Value::Long(2),
            None,
        )
        .unwrap()
        .into(),
    );
    let aggregate = Operator::new(
        Aggregate::new(
            scan,
            vec![
                AggregateDefinition::new(0, AggregateFunction::Sum),
                AggregateDefinition::new(0, AggregateFunction::Count).with_alias("orders"),
                AggregateDefinition::new(2, AggregateFunction::Max),
            ],
            vec![1],
        )
        .unwrap()
        .into(),
    );
    aggregate.execute_tree().unwrap()
}

#[test]
fn test_scan_then_aggregate() {
    for compressed in [false, true] {
        let ctx = TestContext::new(compressed);
        let output = scan_and_aggregate(&ctx);

        assert_eq!(
            output.column_names(),
            vec!["customer", "SUM(id)", "orders", "MAX(amount)"]
        );
        assert_eq!(output.column_type(1).unwrap(), DataType::Long);
        assert_eq!(output.rows().unwrap(), expected_groups());
    }
}

#[test]
fn test_scan_output_references_the_stored_table() {
    let ctx = TestContext::new(true);
    let scan = Operator::new(
        TableScan::new(ctx.orders(), 1, ScanType::Equals, Value::from("bob"), None)
            .unwrap()
            .into(),
    );
    let output = scan.execute_tree().unwrap();

    assert!(output.is_reference_table());
    assert_eq!(output.row_count(), 7);
    let ids: Vec<i32> = (0..output.row_count())
        .map(|row| output.get_value::<i32>(0, row).unwrap())
        .collect();
    assert_eq!(ids, vec![1, 4, 7, 10, 13, 16, 19]);
}

#[test]
fn test_chained_scans_stay_one_level_deep() {
    let ctx = TestContext::new(false);
    let first = Operator::new(
        TableScan::new(ctx.orders(), 0, ScanType::GreaterThan, Value::Int(5), None)
            .unwrap()
            .into(),
    );
    let second = Operator::new(
        TableScan::new(
            first,
            2,
            ScanType::Between,
            Value::Double(12.0),
            Some(Value::Double(21.0)),
        )
        .unwrap()
        .into(),
    );
    let output = second.execute_tree().unwrap();
    let stored = ctx.catalog.get_table("orders").unwrap();

    for chunk in output.chunks() {
        for column in chunk.columns() {
            let reference = column.as_reference().unwrap();
            assert!(Arc::ptr_eq(reference.referenced_table(), &stored));
        }
    }
    let ids: Vec<i32> = (0..output.row_count())
        .map(|row| output.get_value::<i32>(0, row).unwrap())
        .collect();
    assert_eq!(ids, vec![8, 9, 10, 11, 12, 13, 14]);
}

#[test]
fn test_projection_renames_and_reorders() {
    let ctx = TestContext::new(false);
    let projection = Operator::new(
        Projection::new(
            ctx.orders(),
            [ProjectionColumn::aliased(2, "total"), ProjectionColumn::new(0)],
        )
        .unwrap()
        .into(),
    );
    let output = projection.execute_tree().unwrap();

    assert_eq!(output.column_names(), vec!["total", "id"]);
    assert_eq!(output.chunk_count(), 5);
    assert_eq!(output.value(0, 3).unwrap(), Value::Double(4.5));
    assert_eq!(output.value(1, 3).unwrap(), Value::Int(3));
}

#[test]
fn test_recreate_binds_placeholders() {
    let ctx = TestContext::new(true);
    let scan = Operator::new(
        TableScan::new(
            ctx.orders(),
            0,
            ScanType::LessThan,
            ValuePlaceholder::new(0),
            None,
        )
        .unwrap()
        .into(),
    );
    let count = Operator::new(
        Aggregate::new(
            scan,
            vec![AggregateDefinition::new(0, AggregateFunction::Count)],
            vec![],
        )
        .unwrap()
        .into(),
    );

    assert!(matches!(
        count.execute_tree(),
        Err(Error::MalformedPredicate(_))
    ));

    for (bound, expected) in [(3, 3), (10, 10), (100, 20), (0, 0)] {
        let prepared = count.recreate(&[Value::Int(bound)]).unwrap();
        assert!(!prepared.is_executed());
        let output = prepared.execute_tree().unwrap();
        assert_eq!(output.rows().unwrap(), vec![vec![Value::Long(expected)]]);
    }

    assert!(matches!(count.recreate(&[]), Err(Error::MalformedPredicate(_))));
}

#[test]
fn test_missing_table_fails_at_execution() {
    let catalog = Arc::new(Catalog::new());
    let get_table = Operator::new(GetTable::new(Arc::clone(&catalog), "missing").into());
    assert!(matches!(get_table.execute(), Err(Error::TableNotFound(_))));
}

#[test]
fn test_pipeline_on_worker_threads() {
    let _guard = GLOBAL_SCHEDULER.lock();
    let ctx = TestContext::new(true);
    let inline = scan_and_aggregate(&ctx).rows().unwrap();

    CurrentScheduler::init(SchedulerConfig::new(4)).unwrap();
    let ctx = TestContext::new(true);
    let scheduled = scan_and_aggregate(&ctx).rows().unwrap();
    CurrentScheduler::reset();

    assert_eq!(inline, scheduled);
    assert_eq!(scheduled, expected_groups());
}
