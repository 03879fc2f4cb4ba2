#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(macro_expanded_macro_exports_accessed_by_absolute_paths))]
#![doc = include_str!("../README.md")]

extern crate alloc;
extern crate self as jsonutil;

mod config;
pub use config::{Config, ConfigDefaults, DEFAULT_MAX_DEPTH, ENV_PREFIX, IndentPadding};

mod date;
pub use date::{DEFAULT_GEN_FORMAT, DEFAULT_PARSE_FORMATS, DateEncoding, DateFormats};

mod error;
pub use error::{
    JsonError, JsonErrorKind, ParseErrorKind, ReflectError, ReflectErrorCause, Result, Span,
};

mod escape;
pub use escape::{EscapeRole, escape, escape_property_name, unescape};

mod ident;
pub use ident::{
    IdentifierGrammar, RESERVED_WORDS, is_identifier_part, is_identifier_start,
    is_reserved_word, is_valid_identifier,
};

mod number;
pub use number::{
    BigNumber, DecimalFormat, Number, NumberFormat, NumberFormatRef, NumberKind, is_json_number,
};

mod parser;
pub use parser::{from_reader, parse, parse_with_config};

pub mod reflect;

mod serialize;
pub use serialize::{peek_to_string, to_string, to_string_with_config, to_writer, to_writer_std};

mod value;
pub use value::{JsonValue, PrimitiveArray};

mod write;
pub use write::{JsonWrite, StdWriteAdapter};

pub use facet::Facet;

// Field attributes for records, written as `#[facet(jsonutil::private)]`.
//
// Fields without a visibility attribute are public. Transient fields, and
// fields marked `#[facet(skip)]` or `#[facet(skip_serializing)]`, are left
// out unless a projection asks for them by name.
facet::define_attr_grammar! {
    ns "jsonutil";
    crate_path ::jsonutil;

    /// Record field attributes understood by the encoder.
    pub enum Attr {
        /// Readable only at the `private` privacy level
        Private,
        /// Readable at the `package` privacy level and below
        Package,
        /// Readable at the `protected` privacy level and below
        Protected,
        /// Left out unless requested by name
        Transient,
    }
}
