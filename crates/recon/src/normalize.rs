//! Value normalization: raw cells to comparable values.
//!
//! Numbers, percentages and thousands-separated text all become
//! `Normalized::Number`; placeholders become `Absent`; anything else is
//! compared as canonical text. Dates are not normalized here, see
//! [`same_date`].

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use crate::model::{format_number, RawValue};

/// Canonical form of a cell for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Absent,
    Number(f64),
    Text(String),
}

impl Normalized {
    /// Text used when at least one side is not numeric.
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Absent => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Placeholder strings that mean "no value".
const NA_MARKERS: [&str; 3] = ["", "-", "nan"];

pub fn normalize(value: &RawValue) -> Normalized {
    match value {
        RawValue::Empty => Normalized::Absent,
        RawValue::Number(n) if n.is_nan() => Normalized::Absent,
        RawValue::Number(n) => Normalized::Number(*n),
        RawValue::Bool(b) => Normalized::Text(b.to_string()),
        RawValue::DateTime(_) => Normalized::Text(value.display_text()),
        RawValue::Text(s) => normalize_text(s),
    }
}

pub fn normalize_text(raw: &str) -> Normalized {
    let stripped: String = raw.chars().filter(|c| *c != ',' && *c != '，').collect();
    let s = stripped.trim();

    if NA_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return Normalized::Absent;
    }

    match parse_number(s) {
        Some(n) => Normalized::Number(n),
        None => Normalized::Text(canonical(s)),
    }
}

/// Parse a plain or percent number. Rejects inf/NaN spellings.
fn parse_number(s: &str) -> Option<f64> {
    if let Some(body) = s.strip_suffix('%') {
        return body
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| n / 100.0);
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Lowercase, and drop a trailing `.0` so "12" and "12.0" style text agree.
fn canonical(s: &str) -> String {
    let lower = s.to_lowercase();
    match lower.strip_suffix(".0") {
        Some(head) => head.to_string(),
        None => lower,
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y年%m月%d日 %H:%M:%S",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Parse a cell into a calendar date. `None` means "not a date".
pub fn parse_date(value: &RawValue) -> Option<NaiveDate> {
    match value {
        RawValue::DateTime(dt) => Some(dt.date()),
        RawValue::Number(n) => excel_serial_to_date(*n),
        RawValue::Text(s) => parse_date_text(s.trim()),
        RawValue::Empty | RawValue::Bool(_) => None,
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    // 1900 date system. Serials below 61 predate Excel's phantom 1900-02-29.
    let base = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    // Compact YYYYMMDD
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // Date followed by a time we don't recognize: judge the date part alone.
    let head = s.split_whitespace().next()?;
    if head.len() < s.len() {
        return DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok());
    }

    None
}

/// Year/month/day equality. Fails closed: any unparsable side is unequal.
pub fn same_date(a: &RawValue, b: &RawValue) -> bool {
    match (parse_date(a), parse_date(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}
