use std::marker::PhantomData;

use itertools::Itertools;
use tokio_postgres::types::ToSql;

use crate::postgres::where_builder::SqlParam;

/// A multi row `INSERT` and its parameters in placeholder order.
pub struct InsertMany {
    pub query: String,
    params: Vec<Box<dyn SqlParam>>,
}

impl InsertMany {
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| &**p as &(dyn ToSql + Sync))
            .collect()
    }
}

macro_rules! value_set {
    ($($val:expr => $t:ty),+ $(,)?) => {
        crate::postgres::insert_many::ValueSet::<_, ($($t,)+)>::new([$(crate::postgres::insert_many::Value::from($val)),+])
    };
}

pub(crate) use value_set;

pub struct Value(Box<dyn SqlParam>);

impl<T> From<T> for Value
where
    T: SqlParam,
{
    fn from(value: T) -> Self {
        Self(Box::new(value))
    }
}

/// One row of values. `T` is the tuple of column types so every row of a builder has the same shape.
pub struct ValueSet<const N: usize, T> {
    values: [Value; N],
    _phantom: PhantomData<T>,
}

impl<const N: usize, T> ValueSet<N, T> {
    pub fn new(values: [Value; N]) -> Self {
        Self {
            values,
            _phantom: PhantomData,
        }
    }
}

pub struct InsertManyBuilder<const COLS: usize, T> {
    table: &'static str,
    col_names: [&'static str; COLS],
    value_sets: Vec<ValueSet<COLS, T>>,
}

impl<const COLS: usize, T> InsertManyBuilder<COLS, T> {
    pub fn new(
        table: &'static str,
        col_names: [&'static str; COLS],
        starting_set: ValueSet<COLS, T>,
    ) -> Self {
        Self {
            table,
            col_names,
            value_sets: vec![starting_set],
        }
    }

    /// `None` when there are no rows to insert.
    pub fn from_rows(
        table: &'static str,
        col_names: [&'static str; COLS],
        rows: impl IntoIterator<Item = ValueSet<COLS, T>>,
    ) -> Option<Self> {
        let mut rows = rows.into_iter();
        let mut builder = Self::new(table, col_names, rows.next()?);
        for row in rows {
            builder.add_value_set(row);
        }
        Some(builder)
    }

    pub fn add_value_set(&mut self, value: ValueSet<COLS, T>) -> &mut Self {
        self.value_sets.push(value);
        self
    }

    pub fn build(self) -> InsertMany {
        let mut query = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.table,
            self.col_names.iter().join(",")
        );

        let mut params = Vec::with_capacity(self.value_sets.len() * COLS);
        let rows = self
            .value_sets
            .into_iter()
            .map(|value_set| {
                let first = params.len() + 1;
                params.extend(value_set.values.into_iter().map(|v| v.0));
                format!("({})", (first..first + COLS).map(|n| format!("${n}")).join(","))
            })
            .join(",");
        query.push_str(&rows);

        InsertMany { query, params }
    }
}
