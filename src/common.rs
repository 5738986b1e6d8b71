pub mod counter;
pub mod error;
