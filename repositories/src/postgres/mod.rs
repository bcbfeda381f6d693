use heritage_core::filter::SortOrder;
use heritage_core::list_criteria::ListCriteria;
use optional_field::Field;
use tokio_postgres::error::SqlState;

pub mod comments;
pub mod heritages;
pub mod initializer;
mod insert_many;
pub mod reviews;
mod rows;
pub mod saved;
mod statements;
pub mod stats;
pub mod subscriptions;
pub mod users;
mod where_builder;

pub enum ConnectionDetails {
    Url(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize postgres {0} repo")]
pub struct RepoInitErr(&'static str);

#[derive(Debug, thiserror::Error)]
#[error("failed to run postgres migrations")]
pub struct RepoMigrationErr;

/// `LIMIT`/`OFFSET` values ready to bind as `int8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SqlPage {
    pub limit: i64,
    pub offset: i64,
}

/// Offsets past what `int8` holds saturate, which reads as an empty page.
pub(crate) fn sanitize_pagination<F>(criteria: &ListCriteria<F>) -> SqlPage {
    SqlPage {
        limit: i64::try_from(criteria.limit()).unwrap_or(i64::MAX),
        offset: i64::try_from(criteria.offset()).unwrap_or(i64::MAX),
    }
}

pub(crate) fn is_unique_violation(e: &tokio_postgres::Error) -> bool {
    e.code()
        .is_some_and(|c| c.code() == SqlState::UNIQUE_VIOLATION.code())
}

pub(crate) fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

/// Splits a partial update field into the "present" flag and the value bound next to it.
pub(crate) fn field_parts<T: Clone>(field: &Field<T>) -> (bool, Option<T>) {
    match field {
        Field::Missing => (false, None),
        Field::Present(value) => (true, value.clone()),
    }
}

/// `COUNT(*)` comes back as `int8`.
pub(crate) fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use heritage_core::list_criteria::PageCriteria;
    use heritage_core::pagination::Pagination;

    #[test]
    fn pagination_is_converted_to_limit_and_offset() {
        let criteria = PageCriteria::new(Pagination::with_limit(3, 20), 10);
        let page = sanitize_pagination(&criteria);
        assert_eq!(SqlPage { limit: 20, offset: 40 }, page);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let criteria = PageCriteria::new(Pagination::with_limit(u64::MAX, 100), 10);
        assert_eq!(
            SqlPage {
                limit: 100,
                offset: i64::MAX
            },
            sanitize_pagination(&criteria)
        );
    }

    #[test]
    fn missing_field_is_not_applied() {
        assert_eq!((false, None), field_parts::<String>(&Field::Missing));
        assert_eq!((true, None), field_parts::<String>(&Field::Present(None)));
        assert_eq!(
            (true, Some("Malla".to_owned())),
            field_parts(&Field::Present(Some("Malla".to_owned())))
        );
    }

    #[test]
    fn negative_count_is_zero() {
        assert_eq!(0, count(-1));
        assert_eq!(7, count(7));
    }
}
