#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod number;
pub mod reader;

pub use config::{EofPolicy, ReaderConfig};
pub use error::ReadError;
pub use reader::StreamReader;
