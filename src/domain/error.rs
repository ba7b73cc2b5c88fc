//! Domain error types.

/// A parse error with position information for annotation imports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Format the error with a caret under the offending column of the input line.
    pub fn display_with_context(&self, input: &str) -> String {
        let source_line = input
            .lines()
            .nth(self.line.saturating_sub(1))
            .unwrap_or_default();
        let caret = " ".repeat(self.column.saturating_sub(1)) + "^";
        format!(
            "{line}\n{caret}\n{err}",
            line = source_line,
            caret = caret,
            err = self
        )
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        let line = err.line();
        let column = err.column();
        // serde_json appends " at line X column Y" to its Display output.
        let full = err.to_string();
        let message = match full.rfind(" at line ") {
            Some(idx) => full[..idx].to_string(),
            None => full,
        };
        Self {
            message,
            line,
            column,
        }
    }
}

/// Top-level error type for krxrank.
#[derive(Debug, thiserror::Error)]
pub enum KrxError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid annotation file: {0}")]
    Import(#[from] ParseError),

    #[error("no data for {date}")]
    NoData { date: String },

    #[error("unknown market: {0} (expected kospi or kosdaq)")]
    UnknownMarket(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&KrxError> for std::process::ExitCode {
    fn from(err: &KrxError) -> Self {
        let code: u8 = match err {
            KrxError::Io(_) => 1,
            KrxError::ConfigParse { .. } | KrxError::ConfigInvalid { .. } => 2,
            KrxError::Storage { .. } | KrxError::DataSource { .. } => 3,
            KrxError::Import(_) => 4,
            KrxError::NoData { .. }
            | KrxError::UnknownMarket(_)
            | KrxError::UnknownColumn(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
