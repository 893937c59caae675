use crate::database::ConfigurationDatabase;
use crate::error::{CdbError, FatalError, ParseWarning, SourceError};
use crate::lexer::ByteSource;
use crate::parser::{parse, ParseOptions};
use crate::serialization::Value;
use log::error;
use serde::{Serialize, Serializer};
use std::io::{BufReader, Read};

/// The result of a successful parse: the configuration tree and any warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    pub database: ConfigurationDatabase,
    pub warnings: Vec<ParseWarning>,
}

impl Serialize for ParsedConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.database.serialize(serializer)
    }
}

impl ParsedConfig {
    /// The configuration tree as a generic, serializable `Value`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.database.to_value()
    }

    /// The configuration tree as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// The configuration tree as YAML.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Parses a configuration document with the default options.
///
/// # Errors
///
/// Returns the first lexical, syntax, semantic or fatal error; a partially built tree
/// is discarded.
pub fn parse_str(source: &str) -> Result<ParsedConfig, CdbError> {
    parse_str_with(source, &ParseOptions::default())
}

/// Parses a configuration document with explicit options.
///
/// # Errors
///
/// See [`parse_str`].
pub fn parse_str_with(source: &str, options: &ParseOptions) -> Result<ParsedConfig, CdbError> {
    let mut database = ConfigurationDatabase::new();
    let report = parse(source.chars(), &mut database, options, None)?;
    Ok(ParsedConfig {
        database,
        warnings: report.warnings,
    })
}

/// Parses a document named `file_name`; errors carry the text for source-annotated reports.
///
/// # Errors
///
/// See [`parse_str`]. The returned [`SourceError`] labels the line the error was found on.
pub fn parse_named(
    source: &str,
    file_name: &str,
    options: &ParseOptions,
) -> Result<ParsedConfig, SourceError> {
    parse_str_with(source, options).map_err(|err| err.with_source(file_name, source))
}

/// Parses a configuration document read from `reader` as UTF-8.
///
/// # Errors
///
/// A read failure is reported as [`FatalError::Source`]; otherwise see [`parse_str`].
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<ParsedConfig, CdbError> {
    let mut source = ByteSource::new(BufReader::new(reader));
    let mut database = ConfigurationDatabase::new();
    let result = parse(source.by_ref(), &mut database, options, None);
    if let Some(err) = source.take_error() {
        let error = FatalError::Source {
            message: err.to_string(),
            line: result.as_ref().err().map_or(0, CdbError::line),
        };
        error!("{error}");
        return Err(error.into());
    }
    let report = result?;
    Ok(ParsedConfig {
        database,
        warnings: report.warnings,
    })
}
