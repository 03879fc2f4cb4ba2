//! Error types for encoding and parsing.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Display};

use crate::ident::IdentifierGrammar;

/// A byte range in parser input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first offending byte
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Span {
    /// Create a new span
    pub const fn new(offset: usize, len: usize) -> Self {
        Span { offset, len }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.offset, span.len).into()
    }
}

/// Error type for everything the codec can fail at.
#[derive(Debug)]
pub struct JsonError {
    /// The specific kind of error
    pub kind: JsonErrorKind,
    /// Source span where the error occurred (parse errors only)
    pub span: Option<Span>,
    /// The source input (for diagnostics)
    pub source_code: Option<String>,
}

impl Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(span) = self.span {
            write!(f, " at offset {}", span.offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            JsonErrorKind::Reflection(e) => Some(e),
            _ => None,
        }
    }
}

impl JsonError {
    /// Create a new error with span information
    pub const fn new(kind: JsonErrorKind, span: Span) -> Self {
        JsonError {
            kind,
            span: Some(span),
            source_code: None,
        }
    }

    /// Create an error without span information
    pub const fn without_span(kind: JsonErrorKind) -> Self {
        JsonError {
            kind,
            span: None,
            source_code: None,
        }
    }

    /// Attach source code for rich diagnostics
    pub fn with_source(mut self, source: &str) -> Self {
        self.source_code = Some(source.to_string());
        self
    }

    /// Shorthand for a parse error at `offset`.
    pub(crate) fn parse(kind: ParseErrorKind, offset: usize, len: usize) -> Self {
        JsonError::new(JsonErrorKind::Parse(kind), Span::new(offset, len))
    }

    /// An error raised by a self-emitting value.
    pub fn custom(message: impl Into<String>) -> Self {
        JsonError::without_span(JsonErrorKind::Custom {
            message: message.into(),
        })
    }
}

impl From<ReflectError> for JsonError {
    fn from(err: ReflectError) -> Self {
        JsonError::without_span(JsonErrorKind::Reflection(err))
    }
}

impl From<std::io::Error> for JsonError {
    fn from(err: std::io::Error) -> Self {
        JsonError::without_span(JsonErrorKind::Io(err.to_string()))
    }
}

/// Specific error kinds
#[derive(Debug)]
pub enum JsonErrorKind {
    /// A property name fails the active identifier grammar after every
    /// enabled fixup was applied.
    BadPropertyName {
        /// The name as handed to the escaper
        name: String,
        /// Offending code points, in order of appearance
        code_points: Vec<u32>,
        /// The grammar the name was checked against
        grammar: IdentifierGrammar,
        /// Set when the name is a reserved word and reserved words are not
        /// allowed
        reserved_word: bool,
    },
    /// Two distinct keys of one object produce the same output name
    DuplicatePropertyName {
        /// The colliding name
        name: String,
    },
    /// A container or record was reached again while it was still being encoded
    DataStructureLoop {
        /// Type name of the container
        type_name: String,
    },
    /// Introspection failure
    Reflection(ReflectError),
    /// Malformed input
    Parse(ParseErrorKind),
    /// A date literal matched no parse format
    BadDate {
        /// The text of the literal
        text: String,
    },
    /// A date pattern with a specifier chrono does not understand
    BadDateFormat {
        /// The pattern
        format: String,
    },
    /// Error raised by a self-emitting value
    Custom {
        /// Free-form message
        message: String,
    },
    /// I/O error on a reader or writer
    Io(String),
}

impl Display for JsonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonErrorKind::BadPropertyName {
                name,
                code_points,
                grammar,
                reserved_word,
            } => {
                if *reserved_word {
                    return write!(f, "{name} is a reserved word.");
                }
                if code_points.is_empty() {
                    return write!(f, "\"{name}\" is not a valid {grammar} property name.");
                }
                write!(f, "Property name \"{name}\" is not valid for {grammar}.")?;
                for cp in code_points {
                    write!(f, " Code point U+{cp:04X} is not allowed.")?;
                }
                Ok(())
            }
            JsonErrorKind::DuplicatePropertyName { name } => {
                write!(f, "Property {name} occurs twice in the same object.")
            }
            JsonErrorKind::DataStructureLoop { type_name } => write!(
                f,
                "{type_name} includes itself which would cause infinite recursion."
            ),
            JsonErrorKind::Reflection(e) => write!(f, "{e}"),
            JsonErrorKind::Parse(e) => write!(f, "{e}"),
            JsonErrorKind::BadDate { text } => {
                write!(f, "\"{text}\" does not match any date format")
            }
            JsonErrorKind::BadDateFormat { format } => {
                write!(f, "\"{format}\" is not a valid date format")
            }
            JsonErrorKind::Custom { message } => f.write_str(message),
            JsonErrorKind::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl JsonErrorKind {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            JsonErrorKind::BadPropertyName { .. } => "jsonutil::bad_property_name",
            JsonErrorKind::DuplicatePropertyName { .. } => "jsonutil::duplicate_property_name",
            JsonErrorKind::DataStructureLoop { .. } => "jsonutil::data_structure_loop",
            JsonErrorKind::Reflection(_) => "jsonutil::reflection",
            JsonErrorKind::Parse(_) => "jsonutil::parse",
            JsonErrorKind::BadDate { .. } => "jsonutil::bad_date",
            JsonErrorKind::BadDateFormat { .. } => "jsonutil::bad_date_format",
            JsonErrorKind::Custom { .. } => "jsonutil::custom",
            JsonErrorKind::Io(_) => "jsonutil::io",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            JsonErrorKind::Parse(e) => e.label(),
            JsonErrorKind::BadDate { .. } => "unrecognized date".into(),
            _ => "error occurred here".into(),
        }
    }
}

impl miette::Diagnostic for JsonError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(core::iter::once(miette::LabeledSpan::at(
            span,
            self.kind.label(),
        ))))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match &self.kind {
            JsonErrorKind::BadPropertyName {
                reserved_word: true,
                ..
            } => Some(Box::new("enable allow_reserved_words_in_identifiers")),
            JsonErrorKind::BadPropertyName { .. } => Some(Box::new(
                "enable escape_bad_identifier_code_points or full_json_identifier_code_points",
            )),
            _ => None,
        }
    }
}

/// Grammar violations found by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A character that cannot start or continue the current construct
    UnexpectedChar {
        /// The character found
        found: char,
        /// What was expected instead
        expected: &'static str,
    },
    /// Input ended inside a value
    UnexpectedEof {
        /// What was expected before the end
        expected: &'static str,
    },
    /// Non-whitespace content after a complete top-level value
    TrailingContent,
    /// A numeric literal that cannot be converted
    InvalidNumber {
        /// The literal text
        text: String,
    },
    /// A backslash escape that is not recognized
    InvalidEscape {
        /// The escape text including the backslash
        text: String,
    },
    /// A bare word that is not a literal and not a valid identifier
    BadIdentifier {
        /// The word
        word: String,
    },
    /// Input from a reader was not valid UTF-8
    InvalidUtf8,
    /// Arrays and objects nested deeper than the configured maximum
    TooDeep {
        /// The configured maximum depth
        max: usize,
    },
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedChar { found, expected } => {
                write!(f, "unexpected character {found:?}, expected {expected}")
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            ParseErrorKind::TrailingContent => write!(f, "unexpected content after value"),
            ParseErrorKind::InvalidNumber { text } => write!(f, "invalid number `{text}`"),
            ParseErrorKind::InvalidEscape { text } => write!(f, "invalid escape `{text}`"),
            ParseErrorKind::BadIdentifier { word } => write!(f, "unexpected bare word `{word}`"),
            ParseErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            ParseErrorKind::TooDeep { max } => {
                write!(f, "arrays and objects nested deeper than {max} levels")
            }
        }
    }
}

impl ParseErrorKind {
    fn label(&self) -> String {
        match self {
            ParseErrorKind::UnexpectedChar { found, expected } => {
                alloc::format!("unexpected {found:?}, expected {expected}")
            }
            ParseErrorKind::UnexpectedEof { expected } => alloc::format!("expected {expected}"),
            ParseErrorKind::TrailingContent => "trailing content".into(),
            ParseErrorKind::InvalidNumber { .. } => "invalid number".into(),
            ParseErrorKind::InvalidEscape { .. } => "invalid escape".into(),
            ParseErrorKind::BadIdentifier { .. } => "bare word".into(),
            ParseErrorKind::InvalidUtf8 => "invalid UTF-8".into(),
            ParseErrorKind::TooDeep { .. } => "nested too deeply".into(),
        }
    }
}

/// Failure while projecting a record through its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectError {
    /// Type being reflected
    pub type_name: String,
    /// Field or accessor involved, if any
    pub member: Option<String>,
    /// What went wrong
    pub cause: ReflectErrorCause,
}

/// Why a reflection step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectErrorCause {
    /// An explicitly requested name resolves to neither a field nor a compatible accessor
    NoSuchMember,
    /// An accessor returned an error
    Invocation(String),
    /// A projection descriptor names a type nobody registered
    UnknownType,
    /// A pointer, lock or cell whose contents cannot be borrowed
    Unreadable,
    /// A value did not have the shape its accessor was registered for
    ShapeMismatch,
}

impl ReflectError {
    pub(crate) fn new(
        type_name: impl Into<String>,
        member: Option<&str>,
        cause: ReflectErrorCause,
    ) -> Self {
        ReflectError {
            type_name: type_name.into(),
            member: member.map(ToString::to_string),
            cause,
        }
    }
}

impl Display for ReflectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = &self.type_name;
        match (&self.cause, &self.member) {
            (ReflectErrorCause::NoSuchMember, Some(m)) => {
                write!(f, "{ty} has no field or accessible getter named {m}")
            }
            (ReflectErrorCause::NoSuchMember, None) => write!(f, "{ty} has no such member"),
            (ReflectErrorCause::Invocation(msg), Some(m)) => {
                write!(f, "reading {m} from {ty} failed: {msg}")
            }
            (ReflectErrorCause::Invocation(msg), None) => {
                write!(f, "reading from {ty} failed: {msg}")
            }
            (ReflectErrorCause::UnknownType, _) => write!(f, "no registered type named {ty}"),
            (ReflectErrorCause::Unreadable, _) => {
                write!(f, "the contents of {ty} cannot be borrowed for reading")
            }
            (ReflectErrorCause::ShapeMismatch, Some(m)) => {
                write!(f, "{m} was registered for a type other than {ty}")
            }
            (ReflectErrorCause::ShapeMismatch, None) => {
                write!(f, "value does not have the shape of {ty}")
            }
        }
    }
}

impl std::error::Error for ReflectError {}

/// Result type for codec operations
pub type Result<T> = core::result::Result<T, JsonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_documented_wording() {
        let loop_err = JsonErrorKind::DataStructureLoop {
            type_name: "HashMap".into(),
        };
        assert_eq!(
            loop_err.to_string(),
            "HashMap includes itself which would cause infinite recursion."
        );

        let dup = JsonErrorKind::DuplicatePropertyName { name: "x".into() };
        assert_eq!(dup.to_string(), "Property x occurs twice in the same object.");

        let bad = JsonErrorKind::BadPropertyName {
            name: "a\u{5}".into(),
            code_points: vec![5, 0x1F4A9],
            grammar: IdentifierGrammar::EcmaScript,
            reserved_word: false,
        };
        let msg = bad.to_string();
        assert!(msg.contains("Code point U+0005"), "{msg}");
        assert!(msg.contains("Code point U+1F4A9"), "{msg}");
    }

    #[test]
    fn parse_errors_carry_span() {
        use miette::Diagnostic;

        let err = JsonError::parse(ParseErrorKind::TrailingContent, 4, 1).with_source("1 2 x");
        assert_eq!(err.kind.code(), "jsonutil::parse");
        let labels: Vec<_> = err.labels().into_iter().flatten().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 4);
    }
}
