use std::io;

/// Reasons a PTTTL/RTTTL source can be rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("Unexpected EOF encountered")]
    UnexpectedEof,

    #[error("Expected an integer")]
    ExpectedInteger,

    #[error("Integer is too long")]
    IntegerTooLong,

    #[error("Integer is too large")]
    IntegerTooLarge,

    #[error("Name too long (maximum is {} bytes)", crate::parser::MAX_NAME_LEN - 1)]
    NameTooLong,

    #[error("Invalid option setting, expected '='")]
    MissingEquals,

    #[error("Unrecognized option key '{0}'")]
    UnrecognizedSetting(char),

    #[error("Invalid settings section")]
    InvalidSettingsSection,

    #[error("Invalid BPM (must be greater than 0)")]
    InvalidBpm,

    #[error("Invalid note duration {0} (must be 1, 2, 4, 8, 16 or 32)")]
    InvalidDuration(u32),

    #[error("Invalid octave {0} (must be 0 through 8)")]
    InvalidOctave(u32),

    #[error("Vibrato setting {0} out of range (must be 0 through 65535)")]
    VibratoOutOfRange(u32),

    #[error("Expecting a musical note name")]
    ExpectedNote,

    #[error("Invalid musical note name '{0}'")]
    InvalidNote(String),

    #[error("Invalid musical note for this octave")]
    InvalidNoteForOctave,

    #[error("Note duration of {0}ms is too long (maximum is 65535ms)")]
    NoteTooLong(u32),

    #[error("Unexpected character '{0}'")]
    UnexpectedCharacter(char),

    #[error("Exceeded maximum channel count ({})", crate::parser::MAX_CHANNELS)]
    TooManyChannels,

    #[error("All blocks must have the same number of channels")]
    InconsistentChannelCount,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} (line {line}, column {column})")]
    Parse {
        kind: ParseErrorKind,
        line: u32,
        column: u32,
    },

    #[error("Input error at line {line}, column {column}: {source}")]
    Input {
        source: io::Error,
        line: u32,
        column: u32,
    },

    #[error("Invalid channel {index} requested (song has {count} channels)")]
    InvalidChannel { index: usize, count: usize },

    #[error("Sample generator amplitude must be between 0.0 - 1.0, got {0}")]
    InvalidAmplitude(f32),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Line and column in the PTTTL source, for errors raised while parsing
    pub fn location(&self) -> Option<(u32, u32)> {
        match self {
            Error::Parse { line, column, .. } | Error::Input { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }

    /// Parse error kind, if this is a syntax or range error
    pub fn kind(&self) -> Option<&ParseErrorKind> {
        match self {
            Error::Parse { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// Snapshot of the last failure reported by a parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        let message = match err {
            Error::Parse { kind, .. } => kind.to_string(),
            Error::Input { source, .. } => format!("interface callback failed: {}", source),
            other => other.to_string(),
        };
        let (line, column) = err.location().unwrap_or((0, 0));
        Self {
            message,
            line,
            column,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            kind: ParseErrorKind::InvalidOctave(9),
            line: 3,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "Invalid octave 9 (must be 0 through 8) (line 3, column 7)"
        );
        assert_eq!(err.location(), Some((3, 7)));
    }

    #[test]
    fn test_error_info_from_input_error() {
        let err = Error::Input {
            source: io::Error::new(io::ErrorKind::Other, "disk gone"),
            line: 1,
            column: 2,
        };
        let info = ErrorInfo::from(&err);
        assert_eq!(info.line, 1);
        assert_eq!(info.column, 2);
        assert!(info.message.contains("disk gone"));
    }

    #[test]
    fn test_non_parse_error_has_no_location() {
        let err = Error::InvalidAmplitude(1.5);
        assert_eq!(err.location(), None);
        assert_eq!(err.kind(), None);
    }
}
