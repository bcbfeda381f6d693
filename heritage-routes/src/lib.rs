use error_stack::Report;

pub mod error;
mod metrics;
pub mod notifications;
mod password;
pub mod roles;
pub mod routes;
pub mod services;
pub mod state;
pub mod uploads;

#[cfg(test)]
mod tests;

pub type ServiceResult<T, E> = Result<T, Report<E>>;
pub type OptServiceResult<T, E> = Result<Option<T>, Report<E>>;
