//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DateError {
    #[error("Unsupported locale: {0}")]
    UnknownLocale(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),

    #[error("Invalid timestamp {value}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Formats backend timestamps for display
#[derive(Debug, Clone)]
pub struct DateFormatter {
    /// strftime pattern converted from the Unicode pattern
    format: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// Create a formatter from a Unicode pattern (`dd MMM yyyy`), a locale
    /// tag (`pt-BR`) and an IANA time zone name
    pub fn new(pattern: &str, locale: &str, timezone: &str) -> Result<Self, DateError> {
        let locale =
            parse_locale(locale).ok_or_else(|| DateError::UnknownLocale(locale.to_string()))?;
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| DateError::UnknownTimeZone(timezone.to_string()))?;

        Ok(Self {
            format: unicode_to_chrono_format(pattern),
            locale,
            timezone,
        })
    }

    /// Format an ISO 8601 timestamp
    pub fn format(&self, timestamp: &str) -> Result<String, DateError> {
        let date = parse_timestamp(timestamp)?;
        Ok(date
            .with_timezone(&self.timezone)
            .format_localized(&self.format, self.locale)
            .to_string())
    }

    /// Format an optional timestamp, passing `None` through
    pub fn format_opt(&self, timestamp: Option<&str>) -> Result<Option<String>, DateError> {
        timestamp.map(|t| self.format(t)).transpose()
    }
}

/// Parse a timestamp with a `Z`, `+00:00` or `+0000` offset
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, DateError> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map_err(|source| DateError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

/// Map a BCP 47 style tag to a chrono locale
fn parse_locale(tag: &str) -> Option<Locale> {
    let locale = match tag.replace('-', "_").as_str() {
        "pt_BR" | "pt" => Locale::pt_BR,
        "pt_PT" => Locale::pt_PT,
        "en_US" | "en" => Locale::en_US,
        "en_GB" => Locale::en_GB,
        "es_ES" | "es" => Locale::es_ES,
        "fr_FR" | "fr" => Locale::fr_FR,
        "de_DE" | "de" => Locale::de_DE,
        "it_IT" | "it" => Locale::it_IT,
        "ja_JP" | "ja" => Locale::ja_JP,
        "zh_CN" | "zh" => Locale::zh_CN,
        _ => return None,
    };
    Some(locale)
}

/// Convert a Unicode (date-fns) pattern to a chrono format string
///
/// Letters repeat to select the width (`MMM` → abbreviated month), text in
/// single quotes is copied literally and `''` is a quote.
fn unicode_to_chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                result.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        result.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut result, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut result, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        i += run;

        let token = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('E', 4) => "%A",
            ('E', _) => "%a",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('a', _) => "%p",
            _ => {
                for _ in 0..run {
                    push_literal(&mut result, c);
                }
                continue;
            }
        };
        result.push_str(token);
    }

    result
}

fn push_literal(result: &mut String, c: char) {
    if c == '%' {
        result.push_str("%%");
    } else {
        result.push(c);
    }
}
