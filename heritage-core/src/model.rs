pub mod comment;
pub mod heritage;
pub mod push;
pub mod review;
pub mod saved;
pub mod stats;
pub mod user;
