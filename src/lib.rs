pub mod api;
pub mod builder;
pub mod database;
pub mod error;
pub mod inference;
pub mod lexer;
pub mod parser;
pub mod serialization;
pub mod sink;
pub mod types;
pub mod utils;

pub use api::{parse_named, parse_reader, parse_str, parse_str_with, ParsedConfig};
pub use database::ConfigurationDatabase;
pub use error::{CdbError, SourceError};
pub use parser::{parse, Engine, ParseOptions};
