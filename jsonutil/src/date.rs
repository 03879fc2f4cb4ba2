//! Date generation and parse formats.
//!
//! Dates are always held as `DateTime<Utc>`. Generation uses a single
//! strftime pattern rendered in a configurable offset; parsing tries RFC 3339
//! first and then every registered pattern in registration order. Patterns
//! without a zone are read as UTC.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use tracing::trace;

use crate::error::{JsonError, JsonErrorKind, Result};

/// How dates are written, and whether the parser decodes date strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateEncoding {
    /// Dates are written as strings in the generation format; string
    /// literals are never decoded into dates.
    #[default]
    Plain,
    /// Dates are written as strings in the generation format and string
    /// literals that match a parse format are decoded into dates.
    Strings,
    /// Dates are written as `new Date("...")`, which only `eval()` and this
    /// parser understand.
    Objects,
}

/// Default generation pattern.
pub const DEFAULT_GEN_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default parse patterns, tried after RFC 3339.
pub const DEFAULT_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d",
];

/// The generation format and the ordered list of parse formats.
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormats {
    gen_format: String,
    gen_offset: FixedOffset,
    parse_formats: Vec<String>,
}

impl Default for DateFormats {
    fn default() -> Self {
        DateFormats {
            gen_format: DEFAULT_GEN_FORMAT.to_string(),
            gen_offset: utc_offset(),
            parse_formats: DEFAULT_PARSE_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

impl DateFormats {
    /// The strftime pattern used to write dates.
    pub fn gen_format(&self) -> &str {
        &self.gen_format
    }

    /// The offset dates are rendered in.
    pub fn gen_offset(&self) -> FixedOffset {
        self.gen_offset
    }

    /// Parse patterns in the order they are tried.
    pub fn parse_formats(&self) -> &[String] {
        &self.parse_formats
    }

    /// Replace the generation pattern. The pattern is also tried first when
    /// parsing, so text written with it reads back.
    ///
    /// Fails with [`JsonErrorKind::BadDateFormat`] if the pattern has a
    /// specifier chrono does not know; the current pattern is kept.
    pub fn set_gen_format(
        &mut self,
        format: impl Into<String>,
        offset: FixedOffset,
    ) -> Result<()> {
        let format = format.into();
        check_format(&format)?;
        self.gen_format = format;
        self.gen_offset = offset;
        Ok(())
    }

    /// Append a parse pattern; earlier patterns win. Patterns are checked
    /// like [`DateFormats::set_gen_format`] checks them.
    pub fn add_parse_format(&mut self, format: impl Into<String>) -> Result<()> {
        let format = format.into();
        check_format(&format)?;
        if !self.parse_formats.contains(&format) {
            self.parse_formats.push(format);
        }
        Ok(())
    }

    /// Drop every registered parse pattern (RFC 3339 and the generation
    /// pattern are still tried).
    pub fn clear_parse_formats(&mut self) {
        self.parse_formats.clear();
    }

    /// Render `dt` with the generation pattern.
    pub fn format(&self, dt: &DateTime<Utc>) -> Result<String> {
        let mut text = String::new();
        write!(
            text,
            "{}",
            dt.with_timezone(&self.gen_offset).format(&self.gen_format)
        )
        .map_err(|_| bad_format(&self.gen_format))?;
        Ok(text)
    }

    /// Parse `text` with RFC 3339, the generation pattern and then each
    /// registered parse pattern; first match wins.
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        core::iter::once(&self.gen_format)
            .chain(self.parse_formats.iter())
            .find_map(|fmt| {
                let parsed = parse_with(text, fmt, self.gen_offset);
                if parsed.is_some() {
                    trace!(fmt, text, "date matched");
                }
                parsed
            })
    }
}

fn bad_format(format: &str) -> JsonError {
    JsonError::without_span(JsonErrorKind::BadDateFormat {
        format: format.to_string(),
    })
}

fn check_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(bad_format(format));
    }
    Ok(())
}

fn parse_with(text: &str, fmt: &str, zone: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
        return Some(dt.with_timezone(&Utc));
    }
    // A literal `Z` in the pattern means the text is UTC even though the
    // pattern has no zone specifier.
    let zone = if fmt.ends_with('Z') && !fmt.ends_with("%Z") {
        utc_offset()
    } else if fmt.contains("%z") || fmt.contains("%#z") || fmt.contains("%:z") {
        return None;
    } else {
        zone
    };
    let naive = NaiveDateTime::parse_from_str(text, fmt).ok().or_else(|| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })?;
    naive
        .and_local_timezone(zone)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
