//! Per-column statistics and predicate selectivity estimation.
//!
//! Distinct count, minimum and maximum are computed lazily, at most once, by
//! running an [`Aggregate`](crate::operators::Aggregate) over the backing
//! table. Estimates assume values are uniformly distributed between min and max.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Error;
use crate::operators::{Aggregate, AggregateDefinition, AggregateFunction, Operator};
use crate::storage::Table;
use crate::types::{AllParameterVariant, ColumnId, ColumnType, DataType, ScanType, Value};

/// Type-erased column statistics.
pub trait AbstractColumnStatistics: fmt::Debug + Send + Sync {
    fn column_id(&self) -> ColumnId;

    fn data_type(&self) -> DataType;

    fn distinct_count(&self) -> Result<f32, Error>;

    /// Estimate `column <scan_type> value [AND value2]`.
    fn predicate_selectivity(
        &self,
        scan_type: ScanType,
        value: &AllParameterVariant,
        value2: Option<&Value>,
    ) -> Result<ColumnSelectivity, Error>;

    /// Estimate `column <scan_type> other_column`.
    fn two_column_predicate_selectivity(
        &self,
        scan_type: ScanType,
        other: &dyn AbstractColumnStatistics,
        value2: Option<&Value>,
    ) -> Result<TwoColumnSelectivity, Error>;

    fn as_any(&self) -> &dyn Any;
}

/// Selectivity of a column-vs-constant predicate.
#[derive(Debug, Clone)]
pub struct ColumnSelectivity {
    /// Estimated fraction of rows that qualify, in `[0, 1]`.
    pub selectivity: f32,
    /// Statistics of the column after filtering, when they differ from the input's.
    pub column_statistics: Option<Arc<dyn AbstractColumnStatistics>>,
}

impl ColumnSelectivity {
    fn new(selectivity: f32, column_statistics: Option<Arc<dyn AbstractColumnStatistics>>) -> Self {
        Self {
            selectivity,
            column_statistics,
        }
    }
}

/// Selectivity of a column-vs-column predicate.
#[derive(Debug, Clone)]
pub struct TwoColumnSelectivity {
    pub selectivity: f32,
    pub left_column_statistics: Option<Arc<dyn AbstractColumnStatistics>>,
    pub right_column_statistics: Option<Arc<dyn AbstractColumnStatistics>>,
}

/// Non-owning handle to the table statistics are computed from.
#[derive(Debug, Clone)]
pub struct TableHandle(Weak<Table>);

impl TableHandle {
    pub fn new(table: &Arc<Table>) -> Self {
        Self(Arc::downgrade(table))
    }

    /// The table, or [`Error::TableDropped`] if it no longer exists.
    pub fn upgrade(&self) -> Result<Arc<Table>, Error> {
        self.0.upgrade().ok_or(Error::TableDropped)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Statistics of one column with values of type `T`.
pub struct ColumnStatistics<T> {
    column_id: ColumnId,
    table: Option<TableHandle>,
    distinct_count: Mutex<Option<f32>>,
    min_max: Mutex<Option<(T, T)>>,
}

impl<T: ColumnType> ColumnStatistics<T> {
    /// Statistics computed on demand from `table`.
    pub fn new(column_id: ColumnId, table: &Arc<Table>) -> Self {
        Self {
            column_id,
            table: Some(TableHandle::new(table)),
            distinct_count: Mutex::new(None),
            min_max: Mutex::new(None),
        }
    }

    /// Statistics with known values, e.g. derived for a filtered column.
    pub fn with_values(column_id: ColumnId, distinct_count: f32, min: T, max: T) -> Self {
        Self {
            column_id,
            table: None,
            distinct_count: Mutex::new(Some(distinct_count)),
            min_max: Mutex::new(Some((min, max))),
        }
    }

    pub fn distinct_count(&self) -> Result<f32, Error> {
        let mut cached = self.distinct_count.lock();
        if let Some(distinct_count) = *cached {
            return Ok(distinct_count);
        }
        let distinct_count = self.compute_distinct_count()?;
        *cached = Some(distinct_count);
        Ok(distinct_count)
    }

    pub fn min(&self) -> Result<T, Error> {
        self.min_max().map(|(min, _)| min)
    }

    pub fn max(&self) -> Result<T, Error> {
        self.min_max().map(|(_, max)| max)
    }

    fn min_max(&self) -> Result<(T, T), Error> {
        let mut cached = self.min_max.lock();
        if let Some(min_max) = cached.as_ref() {
            return Ok(min_max.clone());
        }
        let min_max = self.compute_min_max()?;
        *cached = Some(min_max.clone());
        Ok(min_max)
    }

    fn backing_table(&self) -> Result<Arc<Table>, Error> {
        self.table
            .as_ref()
            .ok_or(Error::TableDropped)
            .and_then(TableHandle::upgrade)
    }

    fn aggregate(&self, aggregates: Vec<AggregateDefinition>, groupby: Vec<ColumnId>) -> Result<Arc<Table>, Error> {
        let wrapper = Operator::table_wrapper(self.backing_table()?);
        wrapper.execute()?;
        let aggregate = Operator::new(Aggregate::new(wrapper, aggregates, groupby)?.into());
        aggregate.execute()
    }

    fn compute_distinct_count(&self) -> Result<f32, Error> {
        let groups = self.aggregate(Vec::new(), vec![self.column_id])?;
        trace!(column_id = self.column_id, distinct = groups.row_count(), "Computed distinct count");
        Ok(groups.row_count() as f32)
    }

    fn compute_min_max(&self) -> Result<(T, T), Error> {
        let output = self.aggregate(
            vec![
                AggregateDefinition::new(self.column_id, AggregateFunction::Min),
                AggregateDefinition::new(self.column_id, AggregateFunction::Max),
            ],
            Vec::new(),
        )?;
        Ok((output.get_value::<T>(0, 0)?, output.get_value::<T>(1, 0)?))
    }

    fn derived(&self, distinct_count: f32, min: T, max: T) -> Option<Arc<dyn AbstractColumnStatistics>> {
        Some(Arc::new(ColumnStatistics::with_values(
            self.column_id,
            distinct_count,
            min,
            max,
        )))
    }

    fn value_selectivity(
        &self,
        scan_type: ScanType,
        value: &T,
        value2: Option<&T>,
    ) -> Result<ColumnSelectivity, Error> {
        let distinct_count = self.distinct_count()?;
        let (min, max) = self.min_max()?;
        let below_min = value.total_cmp(&min) == Ordering::Less;
        let above_max = value.total_cmp(&max) == Ordering::Greater;

        match scan_type {
            ScanType::Equals => {
                if below_min || above_max || distinct_count <= 0.0 {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                Ok(ColumnSelectivity::new(
                    1.0 / distinct_count,
                    self.derived(1.0, value.clone(), value.clone()),
                ))
            }
            ScanType::NotEquals => {
                if below_min || above_max || distinct_count <= 0.0 {
                    return Ok(ColumnSelectivity::new(1.0, None));
                }
                Ok(ColumnSelectivity::new(
                    (distinct_count - 1.0) / distinct_count,
                    self.derived(distinct_count - 1.0, min, max),
                ))
            }
            _ if !T::IS_NUMERIC => Ok(ColumnSelectivity::new(1.0, None)),
            ScanType::LessThan if T::IS_INTEGRAL => {
                if value.total_cmp(&min) != Ordering::Greater {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                if above_max {
                    return Ok(ColumnSelectivity::new(1.0, None));
                }
                let selectivity = (numeric(value) - numeric(&min)) / range(&min, &max);
                let upper = value.predecessor().unwrap_or_else(|| value.clone());
                Ok(self.ranged(selectivity, distinct_count, min, upper))
            }
            ScanType::GreaterThan if T::IS_INTEGRAL => {
                if value.total_cmp(&max) != Ordering::Less {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                if below_min {
                    return Ok(ColumnSelectivity::new(1.0, None));
                }
                let selectivity = (numeric(&max) - numeric(value)) / range(&min, &max);
                let lower = value.successor().unwrap_or_else(|| value.clone());
                Ok(self.ranged(selectivity, distinct_count, lower, max))
            }
            ScanType::LessThan | ScanType::LessThanEquals => {
                let strict = scan_type == ScanType::LessThan;
                if below_min || (strict && value.total_cmp(&min) == Ordering::Equal) {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                if value.total_cmp(&max) != Ordering::Less {
                    return Ok(ColumnSelectivity::new(1.0, None));
                }
                let selectivity = (numeric(value) - numeric(&min) + 1.0) / range(&min, &max);
                Ok(self.ranged(selectivity, distinct_count, min, value.clone()))
            }
            ScanType::GreaterThan | ScanType::GreaterThanEquals => {
                let strict = scan_type == ScanType::GreaterThan;
                if above_max || (strict && value.total_cmp(&max) == Ordering::Equal) {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                if value.total_cmp(&min) != Ordering::Greater {
                    return Ok(ColumnSelectivity::new(1.0, None));
                }
                let selectivity = (numeric(&max) - numeric(value) + 1.0) / range(&min, &max);
                Ok(self.ranged(selectivity, distinct_count, value.clone(), max))
            }
            ScanType::Between => {
                let upper = value2.ok_or_else(|| {
                    Error::MalformedPredicate("BETWEEN requires an upper bound".to_string())
                })?;
                if value.total_cmp(upper) == Ordering::Greater
                    || above_max
                    || upper.total_cmp(&min) == Ordering::Less
                {
                    return Ok(ColumnSelectivity::new(0.0, None));
                }
                let lower = if below_min { min.clone() } else { value.clone() };
                let upper = if upper.total_cmp(&max) == Ordering::Greater {
                    max.clone()
                } else {
                    upper.clone()
                };
                let selectivity = (numeric(&upper) - numeric(&lower) + 1.0) / range(&min, &max);
                Ok(self.ranged(selectivity, distinct_count, lower, upper))
            }
        }
    }

    fn ranged(&self, selectivity: f64, distinct_count: f32, min: T, max: T) -> ColumnSelectivity {
        let selectivity = selectivity.clamp(0.0, 1.0) as f32;
        ColumnSelectivity::new(
            selectivity,
            self.derived(selectivity * distinct_count, min, max),
        )
    }

    fn placeholder_selectivity(&self, scan_type: ScanType) -> Result<ColumnSelectivity, Error> {
        match scan_type {
            ScanType::Equals | ScanType::NotEquals => {
                let distinct_count = self.distinct_count()?;
                if distinct_count <= 0.0 {
                    return Ok(ColumnSelectivity::new(
                        if scan_type == ScanType::Equals { 0.0 } else { 1.0 },
                        None,
                    ));
                }
                let (min, max) = self.min_max()?;
                Ok(if scan_type == ScanType::Equals {
                    ColumnSelectivity::new(1.0 / distinct_count, self.derived(1.0, min, max))
                } else {
                    ColumnSelectivity::new(
                        (distinct_count - 1.0) / distinct_count,
                        self.derived(distinct_count - 1.0, min, max),
                    )
                })
            }
            _ => Ok(ColumnSelectivity::new(1.0, None)),
        }
    }
}

fn numeric<T: ColumnType>(value: &T) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Number of values between `min` and `max`, inclusive.
fn range<T: ColumnType>(min: &T, max: &T) -> f64 {
    numeric(max) - numeric(min) + 1.0
}

fn max_of<T: ColumnType>(a: T, b: T) -> T {
    if a.total_cmp(&b) == Ordering::Less {
        b
    } else {
        a
    }
}

fn min_of<T: ColumnType>(a: T, b: T) -> T {
    if a.total_cmp(&b) == Ordering::Greater {
        b
    } else {
        a
    }
}

impl<T: ColumnType> AbstractColumnStatistics for ColumnStatistics<T> {
    fn column_id(&self) -> ColumnId {
        self.column_id
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn distinct_count(&self) -> Result<f32, Error> {
        ColumnStatistics::distinct_count(self)
    }

    fn predicate_selectivity(
        &self,
        scan_type: ScanType,
        value: &AllParameterVariant,
        value2: Option<&Value>,
    ) -> Result<ColumnSelectivity, Error> {
        if scan_type == ScanType::Between && value2.is_none() {
            return Err(Error::MalformedPredicate(
                "BETWEEN requires an upper bound".to_string(),
            ));
        }
        match value {
            AllParameterVariant::Placeholder(_) => self.placeholder_selectivity(scan_type),
            AllParameterVariant::Value(value) => {
                let value = T::from_value(value).ok_or_else(|| T::type_mismatch(value.data_type()))?;
                let value2 = match (scan_type, value2) {
                    (ScanType::Between, Some(value2)) => Some(
                        T::from_value(value2).ok_or_else(|| T::type_mismatch(value2.data_type()))?,
                    ),
                    _ => None,
                };
                self.value_selectivity(scan_type, &value, value2.as_ref())
            }
        }
    }

    fn two_column_predicate_selectivity(
        &self,
        scan_type: ScanType,
        other: &dyn AbstractColumnStatistics,
        value2: Option<&Value>,
    ) -> Result<TwoColumnSelectivity, Error> {
        if scan_type == ScanType::Between && value2.is_none() {
            return Err(Error::MalformedPredicate(
                "BETWEEN requires an upper bound".to_string(),
            ));
        }
        let other = other
            .as_any()
            .downcast_ref::<ColumnStatistics<T>>()
            .ok_or(Error::TypeMismatch {
                expected: T::DATA_TYPE,
                actual: other.data_type(),
            })?;

        let fallback = TwoColumnSelectivity {
            selectivity: 1.0,
            left_column_statistics: None,
            right_column_statistics: None,
        };
        if !T::IS_NUMERIC || scan_type != ScanType::Equals {
            return Ok(fallback);
        }

        let (min, max) = self.min_max()?;
        let (other_min, other_max) = other.min_max()?;
        let distinct_count = self.distinct_count()?;
        let other_distinct_count = other.distinct_count()?;

        let common_min = max_of(min.clone(), other_min.clone());
        let common_max = min_of(max.clone(), other_max.clone());
        if common_min.total_cmp(&common_max) == Ordering::Greater {
            return Ok(TwoColumnSelectivity {
                selectivity: 0.0,
                left_column_statistics: None,
                right_column_statistics: None,
            });
        }

        let overlap = range(&common_min, &common_max);
        let overlap_ratio = overlap / range(&min, &max);
        let other_overlap_ratio = overlap / range(&other_min, &other_max);
        let overlapping_distinct_count = (overlap_ratio * distinct_count as f64)
            .min(other_overlap_ratio * other_distinct_count as f64);

        let (smaller, larger) = if distinct_count <= other_distinct_count {
            (distinct_count as f64, other_distinct_count as f64)
        } else {
            (other_distinct_count as f64, distinct_count as f64)
        };
        let selectivity = if larger <= 0.0 {
            0.0
        } else {
            (overlapping_distinct_count * smaller / larger) as f32
        };

        let derived_distinct_count = overlapping_distinct_count as f32;
        Ok(TwoColumnSelectivity {
            selectivity,
            left_column_statistics: self.derived(
                derived_distinct_count,
                common_min.clone(),
                common_max.clone(),
            ),
            right_column_statistics: other.derived(derived_distinct_count, common_min, common_max),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: ColumnType> fmt::Debug for ColumnStatistics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ColumnStatistics");
        debug
            .field("column_id", &self.column_id)
            .field("data_type", &T::DATA_TYPE);
        if let Some(distinct_count) = *self.distinct_count.lock() {
            debug.field("distinct_count", &distinct_count);
        }
        if let Some((min, max)) = self.min_max.lock().as_ref() {
            debug.field("min", min).field("max", max);
        }
        debug.finish()
    }
}
