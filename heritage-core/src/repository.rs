//! Storage seams of the application. Each trait is implemented by the postgres crate
//! and mocked in endpoint tests.

mod comments;
mod heritages;
mod reviews;
mod saved;
mod stats;
mod subscriptions;
mod users;

pub use comments::*;
pub use heritages::*;
pub use reviews::*;
pub use saved::*;
pub use stats::*;
pub use subscriptions::*;
pub use users::*;
