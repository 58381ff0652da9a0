//! Recognition and decomposition of KGTK literal syntax.
//!
//! Literals are recognized by prefix and internal structure:
//!
//! - *String*: `"text"` with backslash-escaped inner quotes
//! - *Language-qualified string*: `'text'@lang` or `'text'@lang-suffix`
//! - *Date/time*: `^` followed by relaxed ISO-8601, optional `/precision`
//! - *Quantity*: signed mantissa, optional exponent, optional
//!   `[±lo,±hi]` tolerance, optional SI or `Q`-prefixed unit
//! - *Geo-coordinate*: `@lat/lon`
//! - *Symbol*: anything that is none of the above
//!
//! The parse functions here are pure and return `None` on any input that
//! does not have the requested shape; the scalar UDF layer maps that to
//! SQL NULL.

use std::sync::LazyLock;

use regex::Regex;

const NUM: &str = r"[-+]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?";

static STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"(?:[^"\\]|\\.)*"$"#).unwrap()
});

static LQSTRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^'(?P<text>.*)'@(?P<lang_suffix>(?P<lang>[a-zA-Z]+)(?P<suffix>-[a-zA-Z0-9]+)?)$")
        .unwrap()
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\^(?P<date_and_time>(?P<date>(?P<year>[-+]?[0-9]{3,4})(?:-(?P<month>[0-9]{2})(?:-(?P<day>[0-9]{2}))?)?)(?:T(?P<time>(?P<hour>[0-9]{2})(?::(?P<minutes>[0-9]{2})(?::(?P<seconds>[0-9]{2}))?)?(?P<zone>Z|[-+][0-9]{2}(?::[0-9]{2})?)?))?)(?:/(?P<precision>[0-9]{1,2}))?$",
    )
    .unwrap()
});

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<numeral>{NUM})(?P<tolerance>\[(?P<low>{NUM}),(?P<high>{NUM})\])?(?:(?P<wd>Q[0-9]+)|(?P<si>[a-zA-Z%][a-zA-Z%0-9]*))?$"
    ))
    .unwrap()
});

static GEO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^@(?P<lat>{NUM})/(?P<long>{NUM})$")).unwrap()
});

/// True if `value` is a KGTK string literal (`"…"`).
pub fn is_string(value: &str) -> bool {
    STRING_RE.is_match(value)
}

/// True if `value` is a KGTK language-qualified string literal.
pub fn is_lqstring(value: &str) -> bool {
    LQSTRING_RE.is_match(value)
}

/// True if `value` is a KGTK date/time literal.
pub fn is_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// True if `value` is a plain number (no unit, no tolerance).
pub fn is_number(value: &str) -> bool {
    matches!(parse_quantity(value), Some(q) if q.tolerance.is_none() && q.si_units.is_none() && q.wd_units.is_none())
}

/// True if `value` is a dimensioned or toleranced quantity.
pub fn is_quantity(value: &str) -> bool {
    matches!(parse_quantity(value), Some(q) if q.tolerance.is_some() || q.si_units.is_some() || q.wd_units.is_some())
}

/// True if `value` is a KGTK geo-coordinate literal.
pub fn is_geo_coords(value: &str) -> bool {
    GEO_RE.is_match(value)
}

/// True if `value` is a symbol, i.e. matches no other literal shape.
pub fn is_symbol(value: &str) -> bool {
    !is_string(value)
        && !is_lqstring(value)
        && !is_date(value)
        && !is_number(value)
        && !is_quantity(value)
        && !is_geo_coords(value)
}

/// Wrap `value` in string quotes unless it already is a string.
pub fn stringify(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}

/// Strip the surrounding quotes of a string literal; other values pass
/// through unchanged.
pub fn unstringify(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Decomposed language-qualified string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LqString<'a> {
    /// Text between the first and last single quote
    pub text: &'a str,
    pub lang: &'a str,
    /// `-`-prefixed region suffix, if present
    pub suffix: Option<&'a str>,
    /// `lang` and `suffix` combined
    pub lang_suffix: &'a str,
}

pub fn parse_lqstring(value: &str) -> Option<LqString<'_>> {
    let caps = LQSTRING_RE.captures(value)?;
    Some(LqString {
        text: caps.name("text")?.as_str(),
        lang: caps.name("lang")?.as_str(),
        suffix: caps.name("suffix").map(|m| m.as_str()),
        lang_suffix: caps.name("lang_suffix")?.as_str(),
    })
}

/// Decomposed date/time literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime<'a> {
    /// `YYYY[-MM[-DD]]` portion
    pub date: &'a str,
    /// `hh[:mm[:ss]][zone]` portion, if present
    pub time: Option<&'a str>,
    /// Date and time joined with `T`, zone included, precision excluded
    pub date_and_time: &'a str,
    pub year: i64,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub hour: Option<i64>,
    pub minutes: Option<i64>,
    pub seconds: Option<i64>,
    /// `Z` or `±hh[:mm]`
    pub zone: Option<&'a str>,
    /// Calendar precision 0-14, if present
    pub precision: Option<i64>,
}

pub fn parse_date(value: &str) -> Option<DateTime<'_>> {
    let caps = DATE_RE.captures(value)?;
    let int = |name: &str| -> Option<i64> {
        caps.name(name).and_then(|m| m.as_str().parse().ok())
    };
    let precision = match caps.name("precision") {
        Some(m) => {
            let p: i64 = m.as_str().parse().ok()?;
            if !(0..=14).contains(&p) {
                return None;
            }
            Some(p)
        }
        None => None,
    };
    Some(DateTime {
        date: caps.name("date")?.as_str(),
        time: caps.name("time").map(|m| m.as_str()),
        date_and_time: caps.name("date_and_time")?.as_str(),
        year: int("year")?,
        month: int("month"),
        day: int("day"),
        hour: int("hour"),
        minutes: int("minutes"),
        seconds: int("seconds"),
        zone: caps.name("zone").map(|m| m.as_str()),
        precision,
    })
}

/// Decomposed quantity (or plain number) literal
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity<'a> {
    /// Mantissa and exponent exactly as written
    pub numeral: &'a str,
    /// `[±lo,±hi]` exactly as written
    pub tolerance: Option<&'a str>,
    pub low_tolerance: Option<f64>,
    pub high_tolerance: Option<f64>,
    pub si_units: Option<&'a str>,
    pub wd_units: Option<&'a str>,
}

impl Quantity<'_> {
    /// Numeric value: an integer when written without a fraction or
    /// exponent, a float otherwise.
    pub fn number(&self) -> Number {
        if !self.numeral.contains(['.', 'e', 'E']) {
            if let Ok(n) = self.numeral.parse::<i64>() {
                return Number::Int(n);
            }
        }
        Number::Float(self.numeral.parse().unwrap_or(f64::NAN))
    }
}

/// An integer-or-float numeric result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_int(&self) -> i64 {
        match *self {
            Self::Int(n) => n,
            Self::Float(x) => x as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match *self {
            Self::Int(n) => n as f64,
            Self::Float(x) => x,
        }
    }
}

pub fn parse_quantity(value: &str) -> Option<Quantity<'_>> {
    let caps = QUANTITY_RE.captures(value)?;
    let float = |name: &str| -> Option<f64> {
        caps.name(name).and_then(|m| m.as_str().parse().ok())
    };
    Some(Quantity {
        numeral: caps.name("numeral")?.as_str(),
        tolerance: caps.name("tolerance").map(|m| m.as_str()),
        low_tolerance: float("low"),
        high_tolerance: float("high"),
        si_units: caps.name("si").map(|m| m.as_str()),
        wd_units: caps.name("wd").map(|m| m.as_str()),
    })
}

/// Decomposed geo-coordinate literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoords {
    pub lat: f64,
    pub long: f64,
}

pub fn parse_geo_coords(value: &str) -> Option<GeoCoords> {
    let caps = GEO_RE.captures(value)?;
    Some(GeoCoords {
        lat: caps.name("lat")?.as_str().parse().ok()?,
        long: caps.name("long")?.as_str().parse().ok()?,
    })
}
