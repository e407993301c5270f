//! Date and time transformers.
//!
//! Formats are strftime strings. A format without any `%` is read as the
//! letter style (`Y-m-d H:i:s`) and converted with [`to_strftime`]; a
//! backslash escapes the next letter.

use super::{Options, TransformCx, ValueError, ValueTransformer};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::value::{json_kind, AttrValue};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde_json::Value;
use std::fmt::Write;

type Outcome<T> = std::result::Result<T, ValueError>;

/// Convert a letter-style date format to strftime. Formats that already
/// contain `%` are returned unchanged.
pub fn to_strftime(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }
    let mut out = String::with_capacity(format.len() * 2);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        let mapped = match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                continue;
            }
            'd' => "%d",
            'j' => "%-d",
            'D' => "%a",
            'l' => "%A",
            'N' => "%u",
            'w' => "%w",
            'W' => "%V",
            'F' => "%B",
            'M' => "%b",
            'm' => "%m",
            'n' => "%-m",
            'Y' => "%Y",
            'y' => "%y",
            'a' => "%P",
            'A' => "%p",
            'g' => "%-I",
            'G' => "%-H",
            'h' => "%I",
            'H' => "%H",
            'i' => "%M",
            's' => "%S",
            'u' => "%6f",
            'v' => "%3f",
            'O' => "%z",
            'P' => "%:z",
            'T' => "%Z",
            'U' => "%s",
            'c' => "%Y-%m-%dT%H:%M:%S%:z",
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(mapped);
    }
    out
}

fn checked_format(format: &str) -> Result<String> {
    let converted = to_strftime(format);
    if StrftimeItems::new(&converted).any(|item| matches!(item, Item::Error)) {
        return Err(Error::config(format!("invalid date format '{format}'")));
    }
    Ok(converted)
}

fn parse_offset(timezone: &str) -> Result<FixedOffset> {
    let tz = timezone.trim();
    if tz.eq_ignore_ascii_case("utc") || tz == "Z" {
        return Ok(Utc.fix());
    }
    DateTime::parse_from_str(&format!("2000-01-01T00:00:00{tz}"), "%Y-%m-%dT%H:%M:%S%:z")
        .map(|dt| *dt.offset())
        .map_err(|_| Error::config(format!("invalid timezone offset '{timezone}'")))
}

fn render(formatted: impl std::fmt::Display) -> Outcome<String> {
    let mut out = String::new();
    write!(out, "{formatted}").map_err(|_| ValueError::parse("", "cannot render with this format"))?;
    Ok(out)
}

fn from_timestamp(seconds: i64) -> Outcome<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| ValueError::parse(seconds.to_string(), "timestamp out of range"))
}

/// `datetime`
#[derive(Debug, Clone)]
pub struct DateTimeTransformer {
    format: String,
    offset: FixedOffset,
}

impl DateTimeTransformer {
    pub fn new(options: &Options, config: &EngineConfig) -> Result<Self> {
        let format = checked_format(options.format.as_deref().unwrap_or(&config.datetime_format))?;
        let offset = match &options.timezone {
            Some(tz) => parse_offset(tz)?,
            None => Utc.fix(),
        };
        Ok(Self { format, offset })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse with the configured format, then fall back to RFC 3339.
    ///
    /// Inputs without an offset are placed in the configured timezone; inputs
    /// without a time are placed at midnight.
    fn parse(&self, s: &str) -> Outcome<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_str(s, &self.format) {
            return Ok(dt);
        }
        let naive = NaiveDateTime::parse_from_str(s, &self.format).ok().or_else(|| {
            NaiveDate::parse_from_str(s, &self.format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
        if let Some(naive) = naive {
            return self
                .offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| ValueError::parse(s, "ambiguous local time"));
        }
        DateTime::parse_from_rfc3339(s).map_err(|e| ValueError::parse(s, e))
    }
}

impl ValueTransformer for DateTimeTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::String(s) => self.parse(s.trim()).map(AttrValue::DateTime),
            Value::Number(n) => match n.as_i64() {
                Some(seconds) => from_timestamp(seconds)
                    .map(|dt| AttrValue::DateTime(dt.with_timezone(&self.offset))),
                None => Err(ValueError::parse(n.to_string(), "not a timestamp")),
            },
            other => Err(ValueError::mismatch("datetime", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        let dt = match value {
            AttrValue::DateTime(dt) => *dt,
            AttrValue::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default();
                self.offset
                    .from_local_datetime(&midnight)
                    .single()
                    .ok_or_else(|| ValueError::parse(d.to_string(), "ambiguous local time"))?
            }
            other => return Err(ValueError::mismatch("datetime", other.kind())),
        };
        render(dt.format(&self.format)).map(Value::String)
    }

    fn scalar_type(&self) -> &'static str {
        "string"
    }
}

/// `date`
#[derive(Debug, Clone)]
pub struct DateTransformer {
    format: String,
}

impl DateTransformer {
    pub fn new(options: &Options, config: &EngineConfig) -> Result<Self> {
        let format = checked_format(options.format.as_deref().unwrap_or(&config.date_format))?;
        Ok(Self { format })
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl ValueTransformer for DateTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        let Value::String(s) = raw else {
            return Err(ValueError::mismatch("date", json_kind(raw)));
        };
        let s = s.trim();
        NaiveDate::parse_from_str(s, &self.format)
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
            .map(AttrValue::Date)
            .map_err(|e| ValueError::parse(s, e))
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value.as_date() {
            Some(date) => render(date.format(&self.format)).map(Value::String),
            None => Err(ValueError::mismatch("date", value.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "string"
    }
}

/// `timestamp`: seconds since the Unix epoch on the raw side.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampTransformer;

impl ValueTransformer for TimestampTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        let seconds = match raw {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| ValueError::parse(n.to_string(), "not a timestamp"))?,
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(seconds) => seconds,
                Err(_) => {
                    return DateTime::parse_from_rfc3339(s.trim())
                        .map(AttrValue::DateTime)
                        .map_err(|e| ValueError::parse(s.as_str(), e))
                }
            },
            other => return Err(ValueError::mismatch("timestamp", json_kind(other))),
        };
        from_timestamp(seconds).map(AttrValue::DateTime)
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::DateTime(dt) => Ok(Value::from(dt.timestamp())),
            AttrValue::Date(d) => Ok(Value::from(
                d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp(),
            )),
            AttrValue::Int(i) => Ok(Value::from(*i)),
            other => Err(ValueError::mismatch("timestamp", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "int"
    }
}
