//! String literal and property name escaping.
//!
//! String literals always escape `"`, `\` and control characters. The
//! remaining knobs on [`Config`] decide what happens to non-ASCII text and to
//! backslash escapes that are already present in the input:
//!
//! - `escape_non_ascii` writes every code point above U+007F as `\uXXXX`
//!   (a surrogate pair above U+FFFF, or `\u{X}` when `use_ecma6` is set);
//!   `escape_surrogates` does the same for code points above U+FFFF only.
//! - `pass_through_escapes` copies valid JSON escapes through unchanged.
//!   Legacy ECMAScript escapes (`\v`, `\'`, octal and `\xNN`) are decoded and
//!   re-escaped since JSON has no syntax for them.
//! - `unescape_where_possible` decodes every recognized escape and escapes
//!   the result again as if it had been literal text.
//!
//! Property names additionally have to satisfy the configured identifier
//! grammar; see [`escape_property_name`].

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::Config;
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::ident::{IdentifierGrammar, is_identifier_part, is_identifier_start, is_reserved_word};
use crate::write::JsonWrite;

/// What a piece of text is being escaped as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeRole {
    /// The contents of a string value
    StringLiteral,
    /// An object key
    PropertyName,
}

/// Escape `text` for use in the given role, without surrounding quotes.
pub fn escape(text: &str, role: EscapeRole, cfg: &Config) -> Result<String> {
    match role {
        EscapeRole::StringLiteral => {
            let mut out = String::with_capacity(text.len() + 2);
            write_string_content(&mut out, text, cfg);
            Ok(out)
        }
        EscapeRole::PropertyName => escape_property_name(text, cfg),
    }
}

/// Decode every backslash escape the parser understands.
///
/// Unpaired surrogate escapes decode to U+FFFD. A backslash that does not
/// start a valid escape is kept as is.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if c == '\\'
            && let Some(esc) = scan_escape(text, i)
        {
            let (cp, len) = esc.decode(text, i);
            out.push(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER));
            i += len;
            continue;
        }
        out.push(c);
        i += c.len_utf8();
    }
    out
}

// ============================================================================
// Escape sequence scanning, shared with the parser
// ============================================================================

/// A backslash escape found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Escape {
    /// Bytes consumed, including the backslash
    pub len: usize,
    pub kind: EscapeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeKind {
    /// `\"`, `\\`, `\/`, `\b`, `\f`, `\n`, `\r`, `\t`
    Short(char),
    /// `\uXXXX`, possibly one half of a surrogate pair
    Unit(u16),
    /// `\u{X}`
    CodePoint(u32),
    /// `\v`, `\'`, octal and `\xNN`
    Legacy(char),
    /// A backslash before any other character
    Identity(char),
}

impl Escape {
    /// The decoded code point and the bytes consumed, joining a `\uXXXX`
    /// high surrogate with a following low surrogate escape.
    pub(crate) fn decode(&self, text: &str, at: usize) -> (u32, usize) {
        match self.kind {
            EscapeKind::Short(c) | EscapeKind::Legacy(c) | EscapeKind::Identity(c) => {
                (c as u32, self.len)
            }
            EscapeKind::CodePoint(cp) => (cp, self.len),
            EscapeKind::Unit(hi) => match surrogate_pair(text, at, hi) {
                Some(cp) => (cp, 12),
                None => (hi as u32, self.len),
            },
        }
    }
}

fn surrogate_pair(text: &str, at: usize, hi: u16) -> Option<u32> {
    if !(0xD800..=0xDBFF).contains(&hi) {
        return None;
    }
    let next = scan_escape(text, at + 6)?;
    match next.kind {
        EscapeKind::Unit(lo) if (0xDC00..=0xDFFF).contains(&lo) => {
            Some(0x10000 + (((hi as u32) & 0x3FF) << 10) + ((lo as u32) & 0x3FF))
        }
        _ => None,
    }
}

/// Recognize the escape starting at `text[at]`, which must be a backslash.
///
/// Returns `None` for a trailing backslash and for malformed `\u` or `\x`
/// escapes.
pub(crate) fn scan_escape(text: &str, at: usize) -> Option<Escape> {
    let bytes = text.as_bytes();
    if bytes.get(at) != Some(&b'\\') {
        return None;
    }
    let next = text[at + 1..].chars().next()?;
    let short = |c: char| {
        Some(Escape {
            len: 2,
            kind: EscapeKind::Short(c),
        })
    };
    match next {
        '"' => short('"'),
        '\\' => short('\\'),
        '/' => short('/'),
        'b' => short('\u{8}'),
        'f' => short('\u{C}'),
        'n' => short('\n'),
        'r' => short('\r'),
        't' => short('\t'),
        'v' => Some(Escape {
            len: 2,
            kind: EscapeKind::Legacy('\u{B}'),
        }),
        '\'' => Some(Escape {
            len: 2,
            kind: EscapeKind::Legacy('\''),
        }),
        'u' => {
            if bytes.get(at + 2) == Some(&b'{') {
                let close = text[at + 3..].find('}')?;
                let digits = &text[at + 3..at + 3 + close];
                if digits.is_empty() || digits.len() > 6 {
                    return None;
                }
                let cp = u32::from_str_radix(digits, 16).ok()?;
                (cp <= 0x10FFFF).then_some(Escape {
                    len: close + 4,
                    kind: EscapeKind::CodePoint(cp),
                })
            } else {
                let unit = hex_digits(bytes, at + 2, 4)?;
                Some(Escape {
                    len: 6,
                    kind: EscapeKind::Unit(unit as u16),
                })
            }
        }
        'x' => {
            let value = hex_digits(bytes, at + 2, 2)?;
            Some(Escape {
                len: 4,
                kind: EscapeKind::Legacy(char::from_u32(value)?),
            })
        }
        '0'..='7' => {
            let max_digits = if next <= '3' { 3 } else { 2 };
            let mut value = 0u32;
            let mut len = 0;
            while len < max_digits {
                match bytes.get(at + 1 + len) {
                    Some(d @ b'0'..=b'7') => {
                        value = value * 8 + (d - b'0') as u32;
                        len += 1;
                    }
                    _ => break,
                }
            }
            Some(Escape {
                len: len + 1,
                kind: EscapeKind::Legacy(char::from_u32(value)?),
            })
        }
        other => Some(Escape {
            len: 1 + other.len_utf8(),
            kind: EscapeKind::Identity(other),
        }),
    }
}

fn hex_digits(bytes: &[u8], start: usize, count: usize) -> Option<u32> {
    let digits = bytes.get(start..start + count)?;
    digits.iter().try_fold(0u32, |acc, b| {
        let d = (*b as char).to_digit(16)?;
        Some(acc * 16 + d)
    })
}

// ============================================================================
// String literals
// ============================================================================

/// Write `text` as a quoted JSON string literal.
pub(crate) fn write_string<W: JsonWrite + ?Sized>(out: &mut W, text: &str, cfg: &Config) {
    out.write(b"\"");
    write_string_content(out, text, cfg);
    out.write(b"\"");
}

/// Write the escaped contents of a string literal, without quotes.
pub(crate) fn write_string_content<W: JsonWrite + ?Sized>(out: &mut W, text: &str, cfg: &Config) {
    // Clean ASCII runs (no quote, backslash or control byte) need no escaping
    // under any configuration, so they are copied 16 bytes at a time. The
    // first chunk that is not clean hands the rest of the text to the
    // per-character path, which needs lookahead for backslash escapes.
    const STEP_SIZE: usize = 16;
    type Chunk = [u8; STEP_SIZE];

    let mut s = text;
    while let Some(Ok(chunk)) = s.as_bytes().get(..STEP_SIZE).map(Chunk::try_from) {
        let window = u128::from_ne_bytes(chunk);
        let completely_ascii = window & 0x80808080808080808080808080808080 == 0;
        let quote_free = !contains_byte(window, b'"');
        let backslash_free = !contains_byte(window, b'\\');
        let control_char_free = top_three_bits_set(window);
        if completely_ascii && quote_free && backslash_free && control_char_free {
            out.write(&chunk);
            s = &s[STEP_SIZE..];
        } else {
            break;
        }
    }

    let handle_escapes = cfg.pass_through_escapes || cfg.unescape_where_possible;
    let mut i = 0;
    while let Some(c) = s[i..].chars().next() {
        if c == '\\'
            && handle_escapes
            && let Some(esc) = scan_escape(s, i)
            && let Some(used) = write_existing_escape(out, s, i, esc, cfg)
        {
            i += used;
            continue;
        }
        write_char(out, c, cfg);
        i += c.len_utf8();
    }
}

/// Deal with an escape that is already present in a string literal.
/// Returns the number of bytes consumed, or `None` if the backslash should
/// be escaped like any other character.
fn write_existing_escape<W: JsonWrite + ?Sized>(
    out: &mut W,
    s: &str,
    at: usize,
    esc: Escape,
    cfg: &Config,
) -> Option<usize> {
    let unescape = cfg.unescape_where_possible;
    match esc.kind {
        EscapeKind::Identity(_) => None,
        EscapeKind::Short(c) => {
            if unescape {
                write_char(out, c, cfg);
            } else {
                out.write_str(&s[at..at + esc.len]);
            }
            Some(esc.len)
        }
        EscapeKind::Unit(_) => {
            let (cp, len) = esc.decode(s, at);
            match char::from_u32(cp) {
                Some(c) if unescape => write_char(out, c, cfg),
                // lone surrogates cannot be decoded, so they always stay escaped
                _ => out.write_str(&s[at..at + len]),
            }
            Some(len)
        }
        EscapeKind::CodePoint(cp) => {
            let c = char::from_u32(cp)?;
            if !unescape && cfg.use_ecma6 {
                out.write_str(&s[at..at + esc.len]);
            } else {
                write_char(out, c, cfg);
            }
            Some(esc.len)
        }
        EscapeKind::Legacy(c) => {
            write_char(out, c, cfg);
            Some(esc.len)
        }
    }
}

fn short_escape(c: char) -> Option<&'static [u8]> {
    Some(match c {
        '"' => b"\\\"",
        '\\' => b"\\\\",
        '\n' => b"\\n",
        '\r' => b"\\r",
        '\t' => b"\\t",
        '\u{08}' => b"\\b",
        '\u{0C}' => b"\\f",
        _ => return None,
    })
}

/// Writes a single escaped character of a string literal.
fn write_char<W: JsonWrite + ?Sized>(out: &mut W, c: char, cfg: &Config) {
    if let Some(esc) = short_escape(c) {
        out.write(esc);
        return;
    }
    let cp = c as u32;
    if cp < 0x20 || cp == 0x2028 || cp == 0x2029 {
        write_unit(out, cp);
    } else if c.is_ascii() {
        out.write(&[c as u8]);
    } else if cfg.escape_non_ascii || (cp > 0xFFFF && cfg.escape_surrogates) {
        write_code_point_escape(out, cp, cfg.use_ecma6);
    } else {
        let mut buf = [0; 4];
        out.write(c.encode_utf8(&mut buf).as_bytes());
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// `\uXXXX` with uppercase hex digits.
fn write_unit<W: JsonWrite + ?Sized>(out: &mut W, unit: u32) {
    let nibble = |shift: u32| HEX[((unit >> shift) & 0xF) as usize];
    out.write(&[b'\\', b'u', nibble(12), nibble(8), nibble(4), nibble(0)]);
}

/// Escape a code point: `\uXXXX` in the BMP, otherwise a surrogate pair or
/// a single `\u{X}` escape.
fn write_code_point_escape<W: JsonWrite + ?Sized>(out: &mut W, cp: u32, use_ecma6: bool) {
    if cp <= 0xFFFF {
        write_unit(out, cp);
    } else if use_ecma6 {
        out.write(b"\\u{");
        let mut shift = (32 - cp.leading_zeros()).div_ceil(4) * 4;
        while shift > 0 {
            shift -= 4;
            out.write(&[HEX[((cp >> shift) & 0xF) as usize]]);
        }
        out.write(b"}");
    } else {
        let v = cp - 0x10000;
        write_unit(out, 0xD800 + (v >> 10));
        write_unit(out, 0xDC00 + (v & 0x3FF));
    }
}

#[inline]
const fn contains_byte(window: u128, byte: u8) -> bool {
    let pattern = u128::from_ne_bytes([byte; 16]);
    let xor_result = window ^ pattern;
    let has_zero = (xor_result.wrapping_sub(0x01010101010101010101010101010101))
        & !xor_result
        & 0x80808080808080808080808080808080;
    has_zero != 0
}

/// For each of the 16 u8s that make up a u128, check if any of the top three bits is set.
#[inline]
const fn top_three_bits_set(value: u128) -> bool {
    let xor_result = value & 0xe0e0e0e0e0e0e0e0e0e0e0e0e0e0e0e0;
    let has_zero = (xor_result.wrapping_sub(0x01010101010101010101010101010101))
        & !xor_result
        & 0x80808080808080808080808080808080;
    has_zero == 0
}

// ============================================================================
// Property names
// ============================================================================

/// Escape an object key, checking it against the configured identifier
/// grammar.
///
/// `\uXXXX` (and `\u{X}`) escapes whose code point is valid at their
/// position are kept as written; every other escape is decoded first and the
/// result validated like literal text. Code points that fail the grammar are
/// escaped when `escape_bad_identifier_code_points` is set and reported as
/// [`JsonErrorKind::BadPropertyName`] otherwise. With
/// `validate_property_names` off the key is escaped like a string literal.
pub fn escape_property_name(name: &str, cfg: &Config) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    if !cfg.validate_property_names {
        write_string_content(&mut out, name, cfg);
        return Ok(out);
    }
    if !cfg.allow_reserved_words_in_identifiers && is_reserved_word(name) {
        return Err(JsonError::without_span(JsonErrorKind::BadPropertyName {
            name: name.into(),
            code_points: Vec::new(),
            grammar: cfg.identifier_grammar(),
            reserved_word: true,
        }));
    }

    let grammar = cfg.identifier_grammar();
    if name.is_empty() && grammar == IdentifierGrammar::EcmaScript {
        return Err(bad_name(name, Vec::new(), grammar));
    }

    let mut names = NameWriter {
        out: &mut out,
        bad: Vec::new(),
        grammar,
        cfg,
    };
    let mut position = 0;
    let mut i = 0;
    while let Some(c) = name[i..].chars().next() {
        if c == '\\'
            && let Some(esc) = scan_escape(name, i)
        {
            let (cp, len) = esc.decode(name, i);
            let keep = match esc.kind {
                EscapeKind::Unit(_) => true,
                EscapeKind::CodePoint(_) => cfg.use_ecma6,
                _ => false,
            };
            if keep && names.valid_at(cp, position) {
                names.out.push_str(&name[i..i + len]);
            } else {
                names.push(cp, position);
            }
            i += len;
        } else {
            names.push(c as u32, position);
            i += c.len_utf8();
        }
        position += 1;
    }

    let bad = names.bad;
    if bad.is_empty() {
        Ok(out)
    } else {
        Err(bad_name(name, bad, grammar))
    }
}

fn bad_name(name: &str, code_points: Vec<u32>, grammar: IdentifierGrammar) -> JsonError {
    JsonError::without_span(JsonErrorKind::BadPropertyName {
        name: name.into(),
        code_points,
        grammar,
        reserved_word: false,
    })
}

struct NameWriter<'a> {
    out: &'a mut String,
    bad: Vec<u32>,
    grammar: IdentifierGrammar,
    cfg: &'a Config,
}

impl NameWriter<'_> {
    fn valid_at(&self, cp: u32, position: usize) -> bool {
        if position == 0 {
            is_identifier_start(cp, self.grammar)
        } else {
            is_identifier_part(cp, self.grammar)
        }
    }

    fn push(&mut self, cp: u32, position: usize) {
        let json_full = self.grammar == IdentifierGrammar::JsonFull;
        let decoded = char::from_u32(cp);
        if self.valid_at(cp, position) {
            match decoded {
                Some(c) if json_full && (c == '"' || c == '\\') => {
                    self.out.write(short_escape(c).unwrap_or_default());
                }
                Some('\u{2028}' | '\u{2029}') => write_unit(self.out, cp),
                Some(c) if c.is_ascii() || !self.cfg.escape_non_ascii => self.out.push(c),
                _ => write_code_point_escape(self.out, cp, self.cfg.use_ecma6),
            }
        } else if self.cfg.escape_bad_identifier_code_points {
            match decoded.and_then(short_escape) {
                Some(esc) if json_full => self.out.write(esc),
                _ => write_code_point_escape(self.out, cp, self.cfg.use_ecma6),
            }
        } else {
            self.bad.push(cp);
        }
    }
}
