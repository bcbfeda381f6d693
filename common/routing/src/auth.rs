pub mod claims;
pub mod roles;
pub mod token;
pub mod user;
