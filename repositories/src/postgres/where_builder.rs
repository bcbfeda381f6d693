use std::error::Error;
use std::fmt::Write;

use bytes::BytesMut;
#[cfg(test)]
use dyn_eq::DynEq;
use itertools::Itertools;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

#[cfg(not(test))]
pub trait SqlParam: ToSql + Send + Sync + 'static {}

#[cfg(not(test))]
impl<T> SqlParam for T where T: ToSql + Send + Sync + 'static {}

#[cfg(test)]
pub trait SqlParam: ToSql + Send + Sync + DynEq + 'static {}

#[cfg(test)]
impl<T> SqlParam for T where T: ToSql + Send + Sync + DynEq + 'static {}

#[cfg(test)]
dyn_eq::eq_trait_object!(SqlParam);

/// An `f64` parameter. Compares bitwise so it can be held next to `Eq` values.
#[derive(Debug, Clone, Copy)]
pub struct Float(pub f64);

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Float {}

impl ToSql for Float {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.0.to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <f64 as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// A rendered `WHERE` clause (empty when nothing was added) and its bound values.
pub struct Where {
    pub clause: String,
    params: Vec<Box<dyn SqlParam>>,
}

impl Where {
    /// Placeholder index of the next parameter appended after the filter values.
    pub fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }

    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| &**p as &(dyn ToSql + Sync))
            .collect()
    }

    /// Filter values followed by `extra`, for statements that add `LIMIT`/`OFFSET` placeholders.
    pub fn params_with<'a>(&'a self, extra: &[&'a (dyn ToSql + Sync)]) -> Vec<&'a (dyn ToSql + Sync)> {
        let mut params = self.params();
        params.extend_from_slice(extra);
        params
    }
}

/// Collects predicates joined with `AND`. Every value is bound as a parameter, column names
/// are `'static` so only code can supply them.
#[derive(Default)]
pub struct WhereBuilder {
    predicates: Vec<String>,
    params: Vec<Box<dyn SqlParam>>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, value: impl SqlParam) -> usize {
        self.params.push(Box::new(value));
        self.params.len()
    }

    /// A predicate without parameters, e.g. `h.is_active`.
    pub fn fixed(&mut self, predicate: &'static str) -> &mut Self {
        self.predicates.push(predicate.to_owned());
        self
    }

    pub fn eq(&mut self, column: &'static str, value: impl SqlParam) -> &mut Self {
        let n = self.bind(value);
        self.predicates.push(format!("{column} = ${n}"));
        self
    }

    /// Case insensitive substring match on any of `columns`, sharing one parameter.
    pub fn contains_any(&mut self, columns: &[&'static str], text: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }

        let n = self.bind(format!("%{}%", escape_like(text)));
        let mut predicate = String::from("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                predicate.push_str(" OR ");
            }
            // infallible for String
            let _ = write!(predicate, "{column} ILIKE ${n}");
        }
        predicate.push(')');
        self.predicates.push(predicate);
        self
    }

    pub fn contains(&mut self, column: &'static str, text: &str) -> &mut Self {
        self.contains_any(&[column], text)
    }

    /// Inclusive range, each missing bound is left open.
    pub fn between<T>(&mut self, column: &'static str, from: Option<T>, to: Option<T>) -> &mut Self
    where
        T: SqlParam,
    {
        if let Some(from) = from {
            let n = self.bind(from);
            self.predicates.push(format!("{column} >= ${n}"));
        }
        if let Some(to) = to {
            let n = self.bind(to);
            self.predicates.push(format!("{column} <= ${n}"));
        }
        self
    }

    pub fn build(self) -> Where {
        let clause = if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.iter().join(" AND "))
        };

        Where {
            clause,
            params: self.params,
        }
    }
}

/// Escapes the `LIKE` wildcards so user text only ever matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
