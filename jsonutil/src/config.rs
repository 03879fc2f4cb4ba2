//! Encoder and parser configuration, and the process-wide defaults they
//! start from.
//!
//! A [`Config`] is an owned value; every entry point borrows one for the
//! duration of the call, so a call never observes later changes. Configs
//! built with [`Config::new`] start from a snapshot of [`ConfigDefaults`],
//! which can be populated from `JSONUTIL_*` environment variables.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::LazyLock;

use facet::Facet;
use facet_core::Shape;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::date::{DateEncoding, DateFormats};
use crate::error::Result;
use crate::ident::IdentifierGrammar;
use crate::number::{NumberFormat, NumberFormatRef, NumberKind};
use crate::reflect::{ProjectionSpec, Visibility};

/// How deeply arrays and objects may nest in parsed text by default.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Strings used for pretty printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentPadding {
    /// Written once per nesting level at the start of each line
    pub indent: String,
    /// Written before each member and before a closing bracket
    pub newline: String,
}

impl IndentPadding {
    /// Padding with the given indent and newline strings.
    pub fn new(indent: impl Into<String>, newline: impl Into<String>) -> Self {
        IndentPadding {
            indent: indent.into(),
            newline: newline.into(),
        }
    }
}

impl Default for IndentPadding {
    fn default() -> Self {
        IndentPadding::new("\t", "\n")
    }
}

/// Options for encoding and parsing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Check property names against the identifier grammar (default: true)
    pub validate_property_names: bool,
    /// Allow ECMAScript reserved words as property names
    pub allow_reserved_words_in_identifiers: bool,
    /// Escape code points that fail the identifier grammar instead of failing
    pub escape_bad_identifier_code_points: bool,
    /// Check property names against the JSON grammar instead of ECMAScript
    pub full_json_identifier_code_points: bool,
    /// Escape every code point above U+007F
    pub escape_non_ascii: bool,
    /// Escape every code point above U+FFFF
    pub escape_surrogates: bool,
    /// Write `\u{X}` instead of surrogate pairs
    pub use_ecma6: bool,
    /// Copy valid JSON escapes in strings through unchanged
    pub pass_through_escapes: bool,
    /// Decode escapes in strings and re-escape only what has to be
    pub unescape_where_possible: bool,
    /// Quote property names (default: true); unquoted names are only written
    /// when they are valid ECMAScript identifiers and not reserved
    pub quote_identifier: bool,
    /// Write strings that look like JSON numbers without quotes
    pub encode_numeric_strings_as_numbers: bool,
    /// Parse all-numeric arrays into fixed-width numeric arrays
    pub use_primitive_arrays: bool,
    /// Parse every number as an arbitrary precision decimal
    pub use_big_numbers: bool,
    /// Deepest nesting of arrays and objects the parser accepts
    /// (default: [`DEFAULT_MAX_DEPTH`])
    pub max_depth: usize,
    /// Memoize record projections in the process-wide cache
    pub cache_reflection_data: bool,
    /// How dates are written and whether strings are parsed as dates
    pub date_encoding: DateEncoding,
    /// Date generation and parse patterns
    pub date_formats: DateFormats,
    /// Custom number formats by runtime kind
    pub number_formats: HashMap<NumberKind, NumberFormatRef>,
    /// Most restrictive visibility reflection may read (default: public)
    pub reflection_privacy: Visibility,
    /// Projections by record type
    pub reflect_specs: IndexMap<&'static Shape, ProjectionSpec>,
    /// Pretty printing; compact output when `None`
    pub indent_padding: Option<IndentPadding>,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    /// The hard-coded defaults, ignoring [`ConfigDefaults`].
    pub fn builtin() -> Self {
        Config {
            validate_property_names: true,
            allow_reserved_words_in_identifiers: false,
            escape_bad_identifier_code_points: false,
            full_json_identifier_code_points: false,
            escape_non_ascii: false,
            escape_surrogates: false,
            use_ecma6: false,
            pass_through_escapes: false,
            unescape_where_possible: false,
            quote_identifier: true,
            encode_numeric_strings_as_numbers: false,
            use_primitive_arrays: false,
            use_big_numbers: false,
            max_depth: DEFAULT_MAX_DEPTH,
            cache_reflection_data: false,
            date_encoding: DateEncoding::Plain,
            date_formats: DateFormats::default(),
            number_formats: HashMap::new(),
            reflection_privacy: Visibility::Public,
            reflect_specs: IndexMap::new(),
            indent_padding: None,
        }
    }

    /// A snapshot of the process-wide defaults.
    pub fn new() -> Self {
        ConfigDefaults::snapshot()
    }

    /// The grammar property names are checked against.
    pub fn identifier_grammar(&self) -> IdentifierGrammar {
        if self.full_json_identifier_code_points {
            IdentifierGrammar::JsonFull
        } else {
            IdentifierGrammar::EcmaScript
        }
    }

    /// The custom format for numbers of `kind`, if one is registered.
    pub fn number_format(&self, kind: NumberKind) -> Option<&dyn NumberFormat> {
        self.number_formats.get(&kind).map(|f| &**f)
    }

    /// The projection for records of `shape`: the registered one, or all
    /// fields.
    pub fn projection_for(&self, shape: &'static Shape) -> Cow<'_, ProjectionSpec> {
        match self.reflect_specs.get(shape) {
            Some(spec) => Cow::Borrowed(spec),
            None => Cow::Owned(ProjectionSpec::for_shape(shape)),
        }
    }

    /// Register a projection, replacing any earlier one for the same type.
    pub fn add_reflect_spec(&mut self, spec: ProjectionSpec) {
        self.reflect_specs.insert(spec.shape(), spec);
    }

    /// Register a projection parsed from a `Type,field,name=alias`
    /// descriptor.
    pub fn add_reflect_descriptor(&mut self, descriptor: &str) -> Result<()> {
        let spec = ProjectionSpec::parse(descriptor)?;
        self.add_reflect_spec(spec);
        Ok(())
    }

    /// Forget the projection registered for `T`.
    pub fn remove_reflect_spec<T: Facet<'static>>(&mut self) -> Option<ProjectionSpec> {
        self.reflect_specs.shift_remove(T::SHAPE)
    }

    /// Register a custom format for numbers of `kind`.
    pub fn add_number_format(&mut self, kind: NumberKind, format: impl NumberFormat + 'static) {
        self.number_formats.insert(kind, Arc::new(format));
    }
}

macro_rules! with_flags {
    ($($(#[$meta:meta])* $name:ident => $field:ident;)*) => {
        impl Config {
            $(
                $(#[$meta])*
                pub fn $name(mut self, on: bool) -> Self {
                    self.$field = on;
                    self
                }
            )*
        }
    };
}

with_flags! {
    /// See [`Config::validate_property_names`].
    with_validate_property_names => validate_property_names;
    /// See [`Config::allow_reserved_words_in_identifiers`].
    with_allow_reserved_words_in_identifiers => allow_reserved_words_in_identifiers;
    /// See [`Config::escape_bad_identifier_code_points`].
    with_escape_bad_identifier_code_points => escape_bad_identifier_code_points;
    /// See [`Config::full_json_identifier_code_points`].
    with_full_json_identifier_code_points => full_json_identifier_code_points;
    /// See [`Config::escape_non_ascii`].
    with_escape_non_ascii => escape_non_ascii;
    /// See [`Config::escape_surrogates`].
    with_escape_surrogates => escape_surrogates;
    /// See [`Config::use_ecma6`].
    with_use_ecma6 => use_ecma6;
    /// See [`Config::pass_through_escapes`].
    with_pass_through_escapes => pass_through_escapes;
    /// See [`Config::unescape_where_possible`].
    with_unescape_where_possible => unescape_where_possible;
    /// See [`Config::quote_identifier`].
    with_quote_identifier => quote_identifier;
    /// See [`Config::encode_numeric_strings_as_numbers`].
    with_encode_numeric_strings_as_numbers => encode_numeric_strings_as_numbers;
    /// See [`Config::use_primitive_arrays`].
    with_use_primitive_arrays => use_primitive_arrays;
    /// See [`Config::use_big_numbers`].
    with_use_big_numbers => use_big_numbers;
    /// See [`Config::cache_reflection_data`].
    with_cache_reflection_data => cache_reflection_data;
}

impl Config {
    /// Set the date encoding.
    pub fn with_date_encoding(mut self, encoding: DateEncoding) -> Self {
        self.date_encoding = encoding;
        self
    }

    /// Replace the date formats.
    pub fn with_date_formats(mut self, formats: DateFormats) -> Self {
        self.date_formats = formats;
        self
    }

    /// Set the deepest nesting the parser accepts.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the reflection privacy level.
    pub fn with_reflection_privacy(mut self, privacy: Visibility) -> Self {
        self.reflection_privacy = privacy;
        self
    }

    /// Register a custom number format.
    pub fn with_number_format(
        mut self,
        kind: NumberKind,
        format: impl NumberFormat + 'static,
    ) -> Self {
        self.add_number_format(kind, format);
        self
    }

    /// Register a projection.
    pub fn with_reflect_spec(mut self, spec: ProjectionSpec) -> Self {
        self.add_reflect_spec(spec);
        self
    }

    /// Pretty print with the given padding, or compact output with `None`.
    pub fn with_indent_padding(mut self, padding: Option<IndentPadding>) -> Self {
        self.indent_padding = padding;
        self
    }
}

// ============================================================================
// Process-wide defaults
// ============================================================================

static DEFAULTS: LazyLock<RwLock<Config>> = LazyLock::new(|| RwLock::new(Config::builtin()));

/// Prefix of every environment variable [`ConfigDefaults::load_env`] reads.
pub const ENV_PREFIX: &str = "JSONUTIL_";

/// The process-wide configuration new [`Config`]s start from.
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// A copy of the current defaults.
    pub fn snapshot() -> Config {
        DEFAULTS.read().clone()
    }

    /// Replace the defaults.
    pub fn set(cfg: Config) {
        *DEFAULTS.write() = cfg;
    }

    /// Change the defaults in place.
    pub fn update(f: impl FnOnce(&mut Config)) {
        f(&mut DEFAULTS.write());
    }

    /// Go back to [`Config::builtin`].
    pub fn reset() {
        Self::set(Config::builtin());
    }

    /// Apply `JSONUTIL_*` variables from the process environment.
    pub fn load_env() {
        Self::load_from(std::env::vars());
    }

    /// Apply `JSONUTIL_*` variables from `vars`. Values that do not parse
    /// are logged and ignored.
    ///
    /// Booleans use the option name in upper case (`JSONUTIL_ESCAPE_NON_ASCII`)
    /// and accept `true`/`false`, `yes`/`no` and `1`/`0`. Projections come
    /// from `JSONUTIL_REFLECT_CLASS_0`, `_1` and so on, up to
    /// `JSONUTIL_MAX_REFLECT_INDEX` if it is set and otherwise up to the
    /// first missing index. `JSONUTIL_DATE_PARSE_FORMATS` holds parse
    /// patterns separated by `|`.
    pub fn load_from<I, K, V>(vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|k| (k.to_string(), v.as_ref().to_string()))
            })
            .collect();
        if vars.is_empty() {
            return;
        }
        Self::update(|cfg| apply_vars(cfg, &vars));
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn bool_option<'a>(cfg: &'a mut Config, name: &str) -> Option<&'a mut bool> {
    Some(match name {
        "VALIDATE_PROPERTY_NAMES" => &mut cfg.validate_property_names,
        "ALLOW_RESERVED_WORDS_IN_IDENTIFIERS" => &mut cfg.allow_reserved_words_in_identifiers,
        "ESCAPE_BAD_IDENTIFIER_CODE_POINTS" => &mut cfg.escape_bad_identifier_code_points,
        "FULL_JSON_IDENTIFIER_CODE_POINTS" => &mut cfg.full_json_identifier_code_points,
        "ESCAPE_NON_ASCII" => &mut cfg.escape_non_ascii,
        "ESCAPE_SURROGATES" => &mut cfg.escape_surrogates,
        "USE_ECMA6" => &mut cfg.use_ecma6,
        "PASS_THROUGH_ESCAPES" => &mut cfg.pass_through_escapes,
        "UNESCAPE_WHERE_POSSIBLE" => &mut cfg.unescape_where_possible,
        "QUOTE_IDENTIFIER" => &mut cfg.quote_identifier,
        "ENCODE_NUMERIC_STRINGS_AS_NUMBERS" => &mut cfg.encode_numeric_strings_as_numbers,
        "USE_PRIMITIVE_ARRAYS" => &mut cfg.use_primitive_arrays,
        "USE_BIG_NUMBERS" => &mut cfg.use_big_numbers,
        "CACHE_REFLECTION_DATA" => &mut cfg.cache_reflection_data,
        _ => return None,
    })
}

const REFLECT_CLASS: &str = "REFLECT_CLASS_";

fn apply_vars(cfg: &mut Config, vars: &HashMap<String, String>) {
    for (name, value) in vars {
        let (name, value) = (name.as_str(), value.as_str());
        if let Some(flag) = bool_option(cfg, name) {
            match parse_bool(value) {
                Some(on) => {
                    debug!(name, on, "default set from environment");
                    *flag = on;
                }
                None => debug!(name, value, "ignoring unparsable boolean"),
            }
            continue;
        }
        match name {
            "REFLECTION_PRIVACY" => match value.parse::<Visibility>() {
                Ok(privacy) => cfg.reflection_privacy = privacy,
                Err(err) => debug!(value, %err, "ignoring reflection privacy"),
            },
            "DATE_ENCODING" => match value.trim().to_ascii_lowercase().as_str() {
                "plain" => cfg.date_encoding = DateEncoding::Plain,
                "strings" => cfg.date_encoding = DateEncoding::Strings,
                "objects" => cfg.date_encoding = DateEncoding::Objects,
                _ => debug!(value, "ignoring date encoding"),
            },
            "DATE_GEN_FORMAT" => {
                let offset = cfg.date_formats.gen_offset();
                if let Err(err) = cfg.date_formats.set_gen_format(value, offset) {
                    debug!(value, %err, "ignoring date generation format");
                }
            }
            "DATE_PARSE_FORMATS" => {
                for format in value.split('|').filter(|f| !f.is_empty()) {
                    if let Err(err) = cfg.date_formats.add_parse_format(format) {
                        debug!(format, %err, "ignoring date parse format");
                    }
                }
            }
            "MAX_DEPTH" => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.max_depth = n,
                _ => debug!(value, "ignoring max depth"),
            },
            "MAX_REFLECT_INDEX" => {}
            other if other.starts_with(REFLECT_CLASS) => {}
            other => debug!(name = other, "ignoring unknown setting"),
        }
    }

    let max_index = vars
        .get("MAX_REFLECT_INDEX")
        .and_then(|v| match v.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                debug!(value = v.as_str(), "ignoring max reflect index");
                None
            }
        });
    let mut descriptors: Vec<&String> = Vec::new();
    for index in 0.. {
        if max_index.is_some_and(|max| index > max) {
            break;
        }
        match vars.get(&alloc::format!("{REFLECT_CLASS}{index}")) {
            Some(descriptor) => descriptors.push(descriptor),
            None if max_index.is_none() => break,
            None => {}
        }
    }
    for descriptor in descriptors {
        if let Err(err) = cfg.add_reflect_descriptor(descriptor) {
            debug!(descriptor = descriptor.as_str(), %err, "ignoring projection descriptor");
        }
    }
}
