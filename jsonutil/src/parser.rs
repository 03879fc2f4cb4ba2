//! A recursive-descent parser for a superset of JSON.
//!
//! On top of standard JSON it accepts single-quoted strings, bare identifier
//! keys, ECMAScript escapes, `NaN`, `Infinity` and `-Infinity`, hexadecimal
//! integers, `//` and `/* */` comments, trailing commas and `new Date("...")`
//! literals. Anything after the top-level value other than whitespace and
//! comments is an error, and so is nesting arrays and objects deeper than
//! [`Config::max_depth`].

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use indexmap::IndexMap;
use tracing::trace;

use crate::config::Config;
use crate::date::DateEncoding;
use crate::error::{JsonError, JsonErrorKind, ParseErrorKind, Result, Span};
use crate::escape::scan_escape;
use crate::ident::{IdentifierGrammar, is_identifier_part, is_identifier_start};
use crate::number::{BigNumber, Number};
use crate::value::{JsonValue, PrimitiveArray};

/// Parses JSON text using the process-wide defaults.
///
/// # Example
///
/// ```
/// let value = jsonutil::parse("{a: 'x', b: [1, 2.5], c: NaN}").unwrap();
/// assert_eq!(value.get("a").and_then(|v| v.as_str()), Some("x"));
/// assert!(value.get("c").and_then(|v| v.as_f64()).is_some_and(f64::is_nan));
/// ```
pub fn parse(text: &str) -> Result<JsonValue> {
    parse_with_config(text, &Config::new())
}

/// Parses JSON text.
pub fn parse_with_config(text: &str, cfg: &Config) -> Result<JsonValue> {
    Parser::new(text, cfg)
        .document()
        .map_err(|e| e.with_source(text))
}

/// Reads a `std::io::Read` to the end and parses it.
pub fn from_reader<R: std::io::Read>(mut reader: R, cfg: &Config) -> Result<JsonValue> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        JsonError::parse(ParseErrorKind::InvalidUtf8, e.utf8_error().valid_up_to(), 1)
    })?;
    parse_with_config(&text, cfg)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    cfg: &'a Config,
    depth: usize,
}

fn is_word_start(c: char) -> bool {
    is_identifier_start(c as u32, IdentifierGrammar::EcmaScript)
}

fn is_word_part(c: char) -> bool {
    is_identifier_part(c as u32, IdentifierGrammar::EcmaScript)
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, cfg: &'a Config) -> Self {
        Parser {
            src,
            pos: 0,
            cfg,
            depth: 0,
        }
    }

    /// Step into an array or object; `self.pos` is at its opening bracket.
    fn descend(&mut self) -> Result<()> {
        if self.depth >= self.cfg.max_depth {
            return Err(JsonError::parse(
                ParseErrorKind::TooDeep {
                    max: self.cfg.max_depth,
                },
                self.pos,
                1,
            ));
        }
        self.depth += 1;
        self.pos += 1;
        Ok(())
    }

    fn document(&mut self) -> Result<JsonValue> {
        let value = self.value()?;
        self.skip_whitespace()?;
        if self.pos < self.src.len() {
            return Err(JsonError::parse(
                ParseErrorKind::TrailingContent,
                self.pos,
                self.src.len() - self.pos,
            ));
        }
        Ok(value)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn unexpected(&self, expected: &'static str) -> JsonError {
        match self.peek_char() {
            Some(found) => JsonError::parse(
                ParseErrorKind::UnexpectedChar { found, expected },
                self.pos,
                found.len_utf8(),
            ),
            None => JsonError::parse(ParseErrorKind::UnexpectedEof { expected }, self.pos, 0),
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<()> {
        self.skip_whitespace()?;
        if self.peek_char() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Skip whitespace and comments.
    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                match trimmed[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => {
                        self.pos += trimmed.len();
                        return Err(self.unexpected("end of comment"));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn value(&mut self) -> Result<JsonValue> {
        self.skip_whitespace()?;
        match self.peek_char() {
            None => Err(self.unexpected("a value")),
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some(q @ ('"' | '\'')) => {
                let start = self.pos;
                let s = self.string(q)?;
                self.string_value(s, start)
            }
            Some('-' | '0'..='9' | '.') => self.number(),
            Some(c) if is_word_start(c) => self.word(),
            Some(_) => Err(self.unexpected("a value")),
        }
    }

    fn string_value(&self, s: String, start: usize) -> Result<JsonValue> {
        if self.cfg.date_encoding == DateEncoding::Strings
            && let Some(date) = self.cfg.date_formats.parse(&s)
        {
            trace!(offset = start, "string literal read as date");
            return Ok(JsonValue::Date(date));
        }
        Ok(JsonValue::String(s))
    }

    fn object(&mut self) -> Result<JsonValue> {
        self.descend()?;
        let mut members = IndexMap::new();
        loop {
            self.skip_whitespace()?;
            let key = match self.peek_char() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(q @ ('"' | '\'')) => self.string(q)?,
                Some(c) if is_word_start(c) => self.bare_word().to_string(),
                _ => return Err(self.unexpected("a property name or '}'")),
            };
            self.expect(':', "':'")?;
            let value = self.value()?;
            members.insert(key, value);

            self.skip_whitespace()?;
            match self.peek_char() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
        self.depth -= 1;
        Ok(JsonValue::Object(members))
    }

    fn array(&mut self) -> Result<JsonValue> {
        self.descend()?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace()?;
            if self.peek_char() == Some(']') {
                self.pos += 1;
                break;
            }
            items.push(self.value()?);

            self.skip_whitespace()?;
            match self.peek_char() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        self.depth -= 1;

        if self.cfg.use_primitive_arrays && !items.is_empty() {
            let numbers: Option<Vec<&Number>> = items.iter().map(JsonValue::as_number).collect();
            if let Some(array) = numbers.and_then(|n| PrimitiveArray::narrowest(&n)) {
                trace!(len = array.len(), "array read as primitive array");
                return Ok(JsonValue::PrimitiveArray(array));
            }
        }
        Ok(JsonValue::Array(items))
    }

    /// Read a quoted string; `self.pos` is at the opening quote.
    fn string(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = self.rest();
            let Some(stop) = rest.find([quote, '\\']) else {
                self.pos = self.src.len();
                return Err(JsonError::parse(
                    ParseErrorKind::UnexpectedEof {
                        expected: "closing quote",
                    },
                    start,
                    self.src.len() - start,
                ));
            };
            out.push_str(&rest[..stop]);
            self.pos += stop;
            if rest[stop..].starts_with(quote) {
                self.pos += quote.len_utf8();
                return Ok(out);
            }
            let Some(escape) = scan_escape(self.src, self.pos) else {
                let end = self.src[self.pos + 1..]
                    .chars()
                    .next()
                    .map_or(self.src.len(), |c| self.pos + 1 + c.len_utf8());
                return Err(JsonError::parse(
                    ParseErrorKind::InvalidEscape {
                        text: self.src[self.pos..end].to_string(),
                    },
                    self.pos,
                    end - self.pos,
                ));
            };
            let (cp, len) = escape.decode(self.src, self.pos);
            out.push(char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER));
            self.pos += len;
        }
    }

    fn bare_word(&mut self) -> &'a str {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        chars.next();
        let end = chars
            .find(|(_, c)| !is_word_part(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        &rest[..end]
    }

    fn word(&mut self) -> Result<JsonValue> {
        let start = self.pos;
        let word = self.bare_word();
        match word {
            "null" => Ok(JsonValue::Null),
            "true" => Ok(JsonValue::Bool(true)),
            "false" => Ok(JsonValue::Bool(false)),
            "NaN" => Ok(JsonValue::Number(Number::F64(f64::NAN))),
            "Infinity" => Ok(JsonValue::Number(Number::F64(f64::INFINITY))),
            "new" => self.date_literal(start),
            _ => Err(JsonError::parse(
                ParseErrorKind::BadIdentifier {
                    word: word.to_string(),
                },
                start,
                word.len(),
            )),
        }
    }

    /// `new Date("...")`, with `new` already consumed.
    fn date_literal(&mut self, start: usize) -> Result<JsonValue> {
        self.skip_whitespace()?;
        let word_start = self.pos;
        if self.bare_word() != "Date" {
            self.pos = word_start;
            return Err(self.unexpected("Date"));
        }
        self.expect('(', "'('")?;
        self.skip_whitespace()?;
        let text = match self.peek_char() {
            Some(q @ ('"' | '\'')) => self.string(q)?,
            _ => return Err(self.unexpected("a date string")),
        };
        self.expect(')', "')'")?;
        match self.cfg.date_formats.parse(&text) {
            Some(date) => Ok(JsonValue::Date(date)),
            None => Err(JsonError::new(
                JsonErrorKind::BadDate { text },
                Span::new(start, self.pos - start),
            )),
        }
    }

    fn number(&mut self) -> Result<JsonValue> {
        use lexical_parse_float::FromLexical as _;
        use lexical_parse_integer::FromLexical as _;

        let start = self.pos;
        let rest = self.rest();
        let negative = rest.starts_with('-');
        let unsigned = if negative { &rest[1..] } else { rest };

        if unsigned.starts_with("Infinity") {
            self.pos += rest.len() - unsigned.len() + "Infinity".len();
            let inf = if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            };
            return Ok(JsonValue::Number(Number::F64(inf)));
        }

        if unsigned.starts_with("0x") || unsigned.starts_with("0X") {
            return self.hex_number(start, negative, &unsigned[2..]);
        }

        let bytes = self.src.as_bytes();
        let mut pos = start + usize::from(negative);
        let mut float = false;
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'.') {
            float = true;
            pos += 1;
            while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
                pos += 1;
            }
        }
        if matches!(bytes.get(pos), Some(b'e' | b'E')) {
            float = true;
            pos += 1;
            if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                pos += 1;
            }
            while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
                pos += 1;
            }
        }
        self.pos = pos;

        let text = &self.src[start..pos];
        let invalid = || invalid_number(text, start);
        let Some(text) = normalize_number(text) else {
            return Err(invalid());
        };
        let big = || BigNumber::new(text.as_ref()).map(Number::Big).ok_or_else(invalid);

        let number = if self.cfg.use_big_numbers {
            big()?
        } else if float {
            match f64::from_lexical(text.as_bytes()) {
                Ok(f) if f.is_finite() => Number::F64(f),
                Ok(_) => big()?,
                Err(_) => return Err(invalid()),
            }
        } else {
            match i64::from_lexical(text.as_bytes()) {
                Ok(n) => Number::I64(n),
                Err(_) => big()?,
            }
        };
        Ok(JsonValue::Number(number))
    }

    fn hex_number(&mut self, start: usize, negative: bool, digits: &str) -> Result<JsonValue> {
        let len = digits
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(digits.len());
        self.pos = start + usize::from(negative) + 2 + len;
        let text = &self.src[start..self.pos];
        let value = i64::from_str_radix(&digits[..len], 16)
            .ok()
            .and_then(|n| if negative { n.checked_neg() } else { Some(n) });
        match value {
            Some(n) if self.cfg.use_big_numbers => BigNumber::new(n.to_string())
                .map(|b| JsonValue::Number(Number::Big(b)))
                .ok_or_else(|| invalid_number(text, start)),
            Some(n) => Ok(JsonValue::Number(Number::I64(n))),
            None => Err(invalid_number(text, start)),
        }
    }
}

/// Rewrite a lexed numeric literal in strict JSON form, dropping redundant
/// leading zeros and supplying the digits a bare `.` leaves out, so `012`,
/// `.5` and `5.` read the same whichever number type they end up in. `None`
/// if the mantissa has no digits at all.
fn normalize_number(text: &str) -> Option<Cow<'_, str>> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(body) => ("-", body),
        None => ("", text),
    };
    let (mantissa, exponent) = body.split_at(body.find(['e', 'E']).unwrap_or(body.len()));
    if !mantissa.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let (int, frac) = match mantissa.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (mantissa, None),
    };
    let significant = int.trim_start_matches('0');
    let int_ok = int == "0" || (!int.is_empty() && significant.len() == int.len());
    if int_ok && frac.is_none_or(|f| !f.is_empty()) {
        return Some(Cow::Borrowed(text));
    }

    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(sign);
    out.push_str(if significant.is_empty() { "0" } else { significant });
    if let Some(frac) = frac.filter(|f| !f.is_empty()) {
        out.push('.');
        out.push_str(frac);
    }
    out.push_str(exponent);
    Some(Cow::Owned(out))
}

fn invalid_number(text: &str, start: usize) -> JsonError {
    JsonError::parse(
        ParseErrorKind::InvalidNumber {
            text: text.to_string(),
        },
        start,
        text.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_builtin(text: &str) -> Result<JsonValue> {
        parse_with_config(text, &Config::builtin())
    }

    fn parse_kind(text: &str) -> Option<ParseErrorKind> {
        match parse_builtin(text).err()?.kind {
            JsonErrorKind::Parse(kind) => Some(kind),
            _ => None,
        }
    }

    #[test]
    fn literals() {
        assert_eq!(parse_builtin("null").ok(), Some(JsonValue::Null));
        assert_eq!(parse_builtin(" true ").ok(), Some(JsonValue::Bool(true)));
        assert_eq!(
            parse_builtin("Infinity").ok().and_then(|v| v.as_f64()),
            Some(f64::INFINITY)
        );
        assert_eq!(
            parse_builtin("-Infinity").ok().and_then(|v| v.as_f64()),
            Some(f64::NEG_INFINITY)
        );
        assert!(
            parse_builtin("NaN")
                .ok()
                .and_then(|v| v.as_f64())
                .is_some_and(f64::is_nan)
        );
        assert_eq!(parse_builtin("'foo'").ok(), Some(JsonValue::from("foo")));
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_builtin("-12").ok(), Some(JsonValue::from(-12i64)));
        assert_eq!(parse_builtin("0x1F").ok(), Some(JsonValue::from(31i64)));
        assert_eq!(parse_builtin("-0x10").ok(), Some(JsonValue::from(-16i64)));
        assert_eq!(parse_builtin("2.5e3").ok(), Some(JsonValue::from(2500.0)));
        let big = parse_builtin("123456789012345678901234567890").ok();
        assert!(matches!(big, Some(JsonValue::Number(Number::Big(_)))));
        let huge = parse_builtin("1e400").ok();
        assert!(matches!(huge, Some(JsonValue::Number(Number::Big(_)))));

        let cfg = Config::builtin().with_use_big_numbers(true);
        let exact = parse_with_config("12345.67890", &cfg).ok();
        assert!(matches!(
            exact,
            Some(JsonValue::Number(Number::Big(b))) if b.as_str() == "12345.67890"
        ));
        assert!(matches!(
            parse_kind("-"),
            Some(ParseErrorKind::InvalidNumber { .. })
        ));
    }

    #[test]
    fn lenient_numbers_read_the_same_in_both_modes() {
        let big = Config::builtin().with_use_big_numbers(true);
        for (text, expected) in [
            ("012", 12.0),
            (".5", 0.5),
            ("-.5", -0.5),
            ("5.", 5.0),
            ("007.25e1", 72.5),
            ("-0", 0.0),
        ] {
            let native = parse_builtin(text).ok().and_then(|v| v.as_f64());
            let precise = parse_with_config(text, &big).ok();
            assert_eq!(native, Some(expected), "{text}");
            assert!(
                matches!(&precise, Some(JsonValue::Number(Number::Big(_)))),
                "{text}: {precise:?}"
            );
            assert_eq!(precise.and_then(|v| v.as_f64()), Some(expected), "{text}");
        }
        let literals: Vec<String> = parse_with_config("[012, .5, -00.5e1]", &big)
            .ok()
            .and_then(|v| v.as_array().map(|a| a.to_vec()))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| match v {
                JsonValue::Number(Number::Big(b)) => Some(b.as_str().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(literals, ["12", "0.5", "-0.5e1"]);
        for bad in ["-", ".", "1e", "-.e5"] {
            assert!(
                matches!(parse_kind(bad), Some(ParseErrorKind::InvalidNumber { .. })),
                "{bad}"
            );
            assert!(parse_with_config(bad, &big).is_err(), "{bad}");
        }
    }

    #[test]
    fn nesting_is_limited() {
        let deep = |n: usize| "[".repeat(n) + &"]".repeat(n);
        let cfg = Config::builtin().with_max_depth(4);
        assert!(parse_with_config(&deep(4), &cfg).is_ok());
        let err = parse_with_config(&deep(5), &cfg).err();
        assert!(matches!(
            err.as_ref().map(|e| &e.kind),
            Some(JsonErrorKind::Parse(ParseErrorKind::TooDeep { max: 4 }))
        ));
        assert_eq!(err.and_then(|e| e.span), Some(Span::new(4, 1)));
        assert!(parse_with_config("{a:{b:{c:{d:{}}}}}", &cfg).is_err());
        assert!(parse_with_config("[[], [], [[[]]]]", &cfg).is_ok());

        assert_eq!(Config::builtin().max_depth, crate::config::DEFAULT_MAX_DEPTH);
        let nested = deep(100_000);
        assert!(matches!(
            parse_builtin(&nested).err().map(|e| e.kind),
            Some(JsonErrorKind::Parse(ParseErrorKind::TooDeep { max: 512 }))
        ));
    }

    #[test]
    fn strings_and_escapes() {
        let value =
            parse_builtin(r#"["a\"b", 'it\'s', "\x41\101\u{1F4A9}\uD83D\uDCA9", "\uD800"]"#);
        let strings: Vec<String> = value
            .ok()
            .and_then(|v| v.as_array().map(|a| a.to_vec()))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        assert_eq!(
            strings,
            ["a\"b", "it's", "AA\u{1F4A9}\u{1F4A9}", "\u{FFFD}"]
        );
        assert!(matches!(
            parse_kind(r#""\u12""#),
            Some(ParseErrorKind::InvalidEscape { .. })
        ));
        assert!(matches!(
            parse_kind(r#""open"#),
            Some(ParseErrorKind::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn objects_with_bare_keys_and_comments() {
        let text = "{ // leading\n c: 5, /* block */ 'd': [1, 2,], }";
        let value = parse_builtin(text).ok();
        let object = value.as_ref().and_then(JsonValue::as_object);
        assert_eq!(
            object.map(|o| o.keys().cloned().collect::<Vec<_>>()),
            Some(vec!["c".to_string(), "d".to_string()])
        );
        assert_eq!(
            value.as_ref().and_then(|v| v.get("c")).and_then(JsonValue::as_i64),
            Some(5)
        );
    }

    #[test]
    fn trailing_content_is_rejected() {
        assert_eq!(parse_kind("1 2"), Some(ParseErrorKind::TrailingContent));
        assert_eq!(parse_kind("{} // done"), None);
        let err = parse_builtin("[1, 2] x").err();
        assert_eq!(err.and_then(|e| e.span), Some(Span::new(7, 1)));
    }

    #[test]
    fn bad_words() {
        assert!(matches!(
            parse_kind("undefined"),
            Some(ParseErrorKind::BadIdentifier { word }) if word == "undefined"
        ));
        assert!(matches!(
            parse_kind("{a 1}"),
            Some(ParseErrorKind::UnexpectedChar { found: '1', .. })
        ));
        assert!(matches!(
            parse_kind("/* open"),
            Some(ParseErrorKind::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn dates() {
        let value = parse_builtin(r#"new Date("2015-09-16T14:08:34.034Z")"#).ok();
        assert!(matches!(value, Some(JsonValue::Date(_))));

        let plain = parse_builtin(r#""2015-09-16""#).ok();
        assert_eq!(plain, Some(JsonValue::from("2015-09-16")));
        let cfg = Config::builtin().with_date_encoding(DateEncoding::Strings);
        let decoded = parse_with_config(r#""2015-09-16""#, &cfg).ok();
        assert!(matches!(decoded, Some(JsonValue::Date(_))));

        let err = parse_builtin(r#"new Date("yesterday")"#).err().map(|e| e.kind);
        assert!(matches!(err, Some(JsonErrorKind::BadDate { .. })));
    }

    #[test]
    fn primitive_arrays() {
        let cfg = Config::builtin().with_use_primitive_arrays(true);
        let ints = parse_with_config("[1,2,-3,4]", &cfg).ok();
        assert_eq!(
            ints,
            Some(JsonValue::PrimitiveArray(PrimitiveArray::I8(vec![1, 2, -3, 4])))
        );
        let mixed = parse_with_config("[1,'a']", &cfg).ok();
        assert!(matches!(mixed, Some(JsonValue::Array(_))));
        let empty = parse_with_config("[]", &cfg).ok();
        assert_eq!(empty, Some(JsonValue::Array(vec![])));
    }

    #[test]
    fn reader_input() {
        let cfg = Config::builtin();
        let value = from_reader(&b"{\"a\": [true]}"[..], &cfg).ok();
        assert_eq!(
            value.as_ref().and_then(|v| v.get("a")),
            Some(&JsonValue::Array(vec![JsonValue::Bool(true)]))
        );
        let err = from_reader(&b"\"\xff\""[..], &cfg).err();
        assert!(matches!(
            err.map(|e| e.kind),
            Some(JsonErrorKind::Parse(ParseErrorKind::InvalidUtf8))
        ));
    }
}
