use heritage_core::list_criteria::ListCriteria;
use heritage_core::pagination::{Page, PageMeta};

mod admin;
mod auth;
mod comments;
mod heritages;
mod notifications;
mod reviews;
mod users;

pub use admin::*;
pub use auth::*;
pub use comments::*;
pub use heritages::*;
pub use notifications::*;
pub use reviews::*;
pub use users::*;

/// One page of a listing with the pagination block clients render.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Listing<T> {
    pub fn from_page<F>(page: Page<T>, criteria: &ListCriteria<F>) -> Self {
        Self {
            pagination: PageMeta::new(criteria.page(), criteria.limit(), page.total),
            items: page.items,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Outcome of an operation on a resource that may not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Found<T> {
    Yes(T),
    NotFound,
}

impl<T> From<Option<T>> for Found<T> {
    fn from(value: Option<T>) -> Self {
        value.map(Found::Yes).unwrap_or(Found::NotFound)
    }
}
