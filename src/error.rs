/// Error types for paragraph extraction and write-back.
use thiserror::Error;

/// Result type for weft operations.
pub type Result<T> = std::result::Result<T, WeftError>;

/// Error types for weft operations.
///
/// Parsing errors carry the part name and the index of the offending event
/// within that part so callers can report where a document went wrong.
#[derive(Error, Debug)]
pub enum WeftError {
    /// XML reading or writing error
    #[error("XML error: {0}")]
    Xml(String),

    /// The event stream ended inside an open element
    #[error("Unexpected end of {part} at event {offset}: expected </{expected}>")]
    UnexpectedEof {
        part: String,
        offset: usize,
        expected: String,
    },

    /// An end element did not match the innermost open element
    #[error("Structural corruption in {part} at event {offset}: unexpected </{name}>")]
    StructuralCorruption {
        part: String,
        offset: usize,
        name: String,
    },

    /// Tracked changes were found while revisions are not being accepted
    #[error("Revision <{revision}> in {part} at event {offset} is not supported unless revisions are accepted")]
    RevisionNotSupported {
        part: String,
        offset: usize,
        revision: String,
    },

    /// A coded text references a marker that is absent from the unit's code table
    #[error("Unit {unit} references unknown code {code}")]
    UnresolvableCodeReference { unit: String, code: u32 },

    /// Coded text could not be parsed back from its string form
    #[error("Invalid coded text: {0}")]
    InvalidCodedText(String),

    /// Invalid extraction options
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for WeftError {
    fn from(err: quick_xml::Error) -> Self {
        WeftError::Xml(err.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for WeftError {
    fn from(err: quick_xml::encoding::EncodingError) -> Self {
        WeftError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for WeftError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        WeftError::Xml(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for WeftError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        WeftError::Xml(err.to_string())
    }
}

impl From<regex::Error> for WeftError {
    fn from(err: regex::Error) -> Self {
        WeftError::Config(err.to_string())
    }
}
