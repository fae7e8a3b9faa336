//! Error types shared across the lexing, binding and writing stages
use std::fmt::{Display, Formatter};

use crate::coords::Coords;
use crate::lexer::Token;

/// Global result type used throughout the binding pipeline
pub type BindResult<T> = Result<T, BindError>;

/// Enumeration of the broad failure categories reported by the crate
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input isn't structurally valid JSON
    MalformedInput,
    /// The input doesn't line up with the registered shape of the target type
    Schema,
    /// A JSON value couldn't be converted into the requested Rust value
    Decode,
    /// A Rust value couldn't be rendered back out as JSON
    Encode,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MalformedInput => write!(f, "malformed input"),
            ErrorKind::Schema => write!(f, "schema error"),
            ErrorKind::Decode => write!(f, "decode error"),
            ErrorKind::Encode => write!(f, "encode error"),
        }
    }
}

/// A global enumeration of error codes
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    /// Nothing to lex at all
    ZeroLengthInput,
    /// The input ran dry part way through a token or document
    EndOfInput,
    /// The supplied file couldn't be opened
    InvalidFile,
    /// An unexpected character surfaced in the input
    InvalidCharacter(char),
    /// A backslash was followed by something other than a valid escape
    InvalidEscapeSequence(String),
    /// A `\u` escape with bad hex digits, or a lone surrogate half
    InvalidUnicodeEscapeSequence(String),
    /// A numeric representation that doesn't parse
    InvalidNumericRepresentation(String),
    /// Something that started like `true`, `false` or `null` but wasn't
    InvalidKeyword(String),
    /// The document didn't start with an object
    InvalidRootObject,
    /// The structure of an object broke down mid-parse
    InvalidObject,
    /// The structure of an array broke down mid-parse
    InvalidArray,
    /// A colon should follow each object key
    PairExpected,
    /// A token arrived somewhere the grammar doesn't allow it
    UnexpectedToken(Token),
    /// Content was found after the closing brace of the root object
    TrailingContent(Token),
    /// The target type was registered without a constructor function
    NoConstructor(&'static str),
    /// Two fields on the same type map onto the same JSON name
    DuplicateField {
        type_name: &'static str,
        field: &'static str,
    },
    /// A field was excluded but the type can't be constructed without it
    ExcludedRequired {
        type_name: &'static str,
        field: &'static str,
    },
    /// The type can't be classified into any of the supported shapes
    Unclassifiable {
        type_name: &'static str,
        reason: &'static str,
    },
    /// No codec could be found for a scalar type
    UnresolvedCodec(&'static str),
    /// A custom codec was supplied for a different type than the field holds
    CodecTargetMismatch {
        type_name: &'static str,
        codec: &'static str,
    },
    /// The JSON object carried a key the target type doesn't declare
    UnmappedField {
        type_name: &'static str,
        field: String,
    },
    /// A required field never turned up in the input
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },
    /// The JSON shape at this point can't populate the target type
    ShapeMismatch {
        type_name: &'static str,
        found: &'static str,
    },
    /// The map key type can't be represented as a JSON object key
    UnsupportedKeyType(&'static str),
    /// A JSON object key failed strict conversion into the map key type
    InvalidKey { raw: String, kind: &'static str },
    /// A scalar of the wrong flavour arrived at a codec
    ScalarMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An integer fell outside the representable range of the target type
    OutOfRange {
        value: String,
        type_name: &'static str,
    },
    /// A string doesn't name any constant of the target enumeration
    InvalidEnumConstant {
        raw: String,
        type_name: &'static str,
    },
    /// A constructor asked for a field the type never declared
    UnmappedParameter {
        type_name: &'static str,
        param: &'static str,
    },
    /// A constructor asked for a field under the wrong type
    ArgumentTypeMismatch {
        type_name: &'static str,
        param: &'static str,
    },
    /// An enumeration value with no registered constant name
    UnmappedEnumConstant(&'static str),
    /// JSON has no representation for NaN or the infinities
    NonFiniteNumber(f64),
}

impl Display for Details {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Details::ZeroLengthInput => write!(f, "zero length input"),
            Details::EndOfInput => write!(f, "unexpected end of input"),
            Details::InvalidFile => write!(f, "supplied file is invalid"),
            Details::InvalidCharacter(c) => write!(f, "invalid character '{}'", c),
            Details::InvalidEscapeSequence(seq) => {
                write!(f, "invalid escape sequence \"{}\"", seq)
            }
            Details::InvalidUnicodeEscapeSequence(seq) => {
                write!(f, "invalid unicode escape sequence \"{}\"", seq)
            }
            Details::InvalidNumericRepresentation(repr) => {
                write!(f, "invalid numeric representation \"{}\"", repr)
            }
            Details::InvalidKeyword(kw) => write!(f, "invalid keyword \"{}\"", kw),
            Details::InvalidRootObject => write!(f, "document must start with an object"),
            Details::InvalidObject => write!(f, "invalid object structure"),
            Details::InvalidArray => write!(f, "invalid array structure"),
            Details::PairExpected => write!(f, "expected a key/value pair"),
            Details::UnexpectedToken(token) => write!(f, "unexpected token {:?}", token),
            Details::TrailingContent(token) => {
                write!(f, "trailing content after document: {:?}", token)
            }
            Details::NoConstructor(type_name) => {
                write!(f, "no constructor registered for {}", type_name)
            }
            Details::DuplicateField { type_name, field } => {
                write!(f, "duplicate field \"{}\" on {}", field, type_name)
            }
            Details::ExcludedRequired { type_name, field } => {
                write!(
                    f,
                    "field \"{}\" on {} is excluded but has no fallback value",
                    field, type_name
                )
            }
            Details::Unclassifiable { type_name, reason } => {
                write!(f, "{} can't be bound: {}", type_name, reason)
            }
            Details::UnresolvedCodec(type_name) => {
                write!(f, "no codec registered for {}", type_name)
            }
            Details::CodecTargetMismatch { type_name, codec } => {
                write!(
                    f,
                    "codec for {} attached to a field of type {}",
                    codec, type_name
                )
            }
            Details::UnmappedField { type_name, field } => {
                write!(f, "{} has no field mapped to \"{}\"", type_name, field)
            }
            Details::MissingField { type_name, field } => {
                write!(f, "required field \"{}\" of {} is missing", field, type_name)
            }
            Details::ShapeMismatch { type_name, found } => {
                write!(f, "can't populate {} from {}", type_name, found)
            }
            Details::UnsupportedKeyType(type_name) => {
                write!(f, "{} can't be used as an object key", type_name)
            }
            Details::InvalidKey { raw, kind } => {
                write!(f, "key \"{}\" is not a valid {}", raw, kind)
            }
            Details::ScalarMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Details::OutOfRange { value, type_name } => {
                write!(f, "{} is out of range for {}", value, type_name)
            }
            Details::InvalidEnumConstant { raw, type_name } => {
                write!(f, "\"{}\" is not a constant of {}", raw, type_name)
            }
            Details::UnmappedParameter { type_name, param } => {
                write!(f, "{} declares no field named \"{}\"", type_name, param)
            }
            Details::ArgumentTypeMismatch { type_name, param } => {
                write!(
                    f,
                    "field \"{}\" of {} requested under the wrong type",
                    param, type_name
                )
            }
            Details::UnmappedEnumConstant(type_name) => {
                write!(f, "value of {} has no registered constant name", type_name)
            }
            Details::NonFiniteNumber(value) => {
                write!(f, "{} has no JSON representation", value)
            }
        }
    }
}

/// The general error structure
#[derive(Debug, Clone, PartialEq)]
pub struct BindError {
    /// The category of the error
    pub kind: ErrorKind,
    /// The global error code for the error
    pub details: Details,
    /// Optional input coordinates
    pub coords: Option<Coords>,
}

impl Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.coords {
            Some(coords) => write!(f, "{}: {} {}", self.kind, self.details, coords),
            None => write!(f, "{}: {}", self.kind, self.details),
        }
    }
}

impl std::error::Error for BindError {}

#[macro_export]
macro_rules! malformed_error {
    ($details: expr) => {
        Err(BindError {
            kind: ErrorKind::MalformedInput,
            details: $details,
            coords: None,
        })
    };
    ($details: expr, $coords: expr) => {
        Err(BindError {
            kind: ErrorKind::MalformedInput,
            details: $details,
            coords: Some($coords),
        })
    };
}

#[macro_export]
macro_rules! schema_error {
    ($details: expr) => {
        Err(BindError {
            kind: ErrorKind::Schema,
            details: $details,
            coords: None,
        })
    };
    ($details: expr, $coords: expr) => {
        Err(BindError {
            kind: ErrorKind::Schema,
            details: $details,
            coords: Some($coords),
        })
    };
}

#[macro_export]
macro_rules! decode_error {
    ($details: expr) => {
        Err(BindError {
            kind: ErrorKind::Decode,
            details: $details,
            coords: None,
        })
    };
    ($details: expr, $coords: expr) => {
        Err(BindError {
            kind: ErrorKind::Decode,
            details: $details,
            coords: Some($coords),
        })
    };
}

#[macro_export]
macro_rules! encode_error {
    ($details: expr) => {
        Err(BindError {
            kind: ErrorKind::Encode,
            details: $details,
            coords: None,
        })
    };
    ($details: expr, $coords: expr) => {
        Err(BindError {
            kind: ErrorKind::Encode,
            details: $details,
            coords: Some($coords),
        })
    };
}
