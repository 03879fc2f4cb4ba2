//! Identifier grammars for property names.
//!
//! Two grammars are supported. [`IdentifierGrammar::EcmaScript`] follows the
//! ECMAScript `IdentifierStart`/`IdentifierPart` productions: letters,
//! letter numbers, `$` and `_` may start a name; combining marks, decimal
//! digits, connector punctuation, ZWNJ and ZWJ may continue it.
//! [`IdentifierGrammar::JsonFull`] is what `JSON.parse()` accepts: any
//! assigned code point at or above U+0020, with no separate start rule.
//!
//! Code points are taken as `u32` so that surrogates and out-of-range values
//! can be classified (they are never valid).

use core::fmt;

use unicode_general_category::{GeneralCategory, get_general_category};

/// Which identifier grammar property names are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdentifierGrammar {
    /// ECMAScript identifier rules (names usable unquoted in `eval()`)
    #[default]
    EcmaScript,
    /// Anything `JSON.parse()` accepts as a key
    JsonFull,
}

impl fmt::Display for IdentifierGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierGrammar::EcmaScript => f.write_str("ECMAScript"),
            IdentifierGrammar::JsonFull => f.write_str("JSON"),
        }
    }
}

const ZWNJ: u32 = 0x200C;
const ZWJ: u32 = 0x200D;

/// Words that cannot be used as unquoted ECMAScript property names.
pub const RESERVED_WORDS: &[&str] = &[
    "abstract", "await", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "debugger", "default", "delete", "do", "double", "else", "enum", "export",
    "extends", "false", "final", "finally", "float", "for", "function", "goto", "if",
    "implements", "import", "in", "instanceof", "int", "interface", "let", "long", "native",
    "new", "null", "package", "private", "protected", "public", "return", "short", "static",
    "super", "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try",
    "typeof", "var", "void", "volatile", "while", "with", "yield",
];

/// Returns true if `word` is an ECMAScript reserved word.
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.binary_search(&word).is_ok()
}

/// Returns true if `code_point` may start a property name under `grammar`.
pub fn is_identifier_start(code_point: u32, grammar: IdentifierGrammar) -> bool {
    let Some(c) = char::from_u32(code_point) else {
        return false;
    };
    match grammar {
        IdentifierGrammar::JsonFull => is_json_code_point(c),
        IdentifierGrammar::EcmaScript => is_ecma_start(c),
    }
}

/// Returns true if `code_point` may appear after the first position of a
/// property name under `grammar`.
pub fn is_identifier_part(code_point: u32, grammar: IdentifierGrammar) -> bool {
    let Some(c) = char::from_u32(code_point) else {
        return false;
    };
    match grammar {
        IdentifierGrammar::JsonFull => is_json_code_point(c),
        IdentifierGrammar::EcmaScript => is_ecma_part(c),
    }
}

/// Returns true if the whole of `name` is a valid identifier under `grammar`.
///
/// Empty names are only valid under [`IdentifierGrammar::JsonFull`].
pub fn is_valid_identifier(name: &str, grammar: IdentifierGrammar) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => grammar == IdentifierGrammar::JsonFull,
        Some(first) => {
            is_identifier_start(first as u32, grammar)
                && chars.all(|c| is_identifier_part(c as u32, grammar))
        }
    }
}

fn is_json_code_point(c: char) -> bool {
    c >= ' ' && get_general_category(c) != GeneralCategory::Unassigned
}

fn is_ecma_start(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphabetic() || c == '$' || c == '_';
    }
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
            | GeneralCategory::LetterNumber
    )
}

fn is_ecma_part(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || c == '$' || c == '_';
    }
    if is_ecma_start(c) || c as u32 == ZWNJ || c as u32 == ZWJ {
        return true;
    }
    matches!(
        get_general_category(c),
        GeneralCategory::NonspacingMark
            | GeneralCategory::SpacingMark
            | GeneralCategory::DecimalNumber
            | GeneralCategory::ConnectorPunctuation
    )
}
