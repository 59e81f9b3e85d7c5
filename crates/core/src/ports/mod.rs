mod log_reader;
mod repository;

pub use log_reader::*;
pub use repository::*;
