//! Scalar user-defined functions over KGTK literals.
//!
//! Every function is a pure, deterministic map from one or two strings to
//! a scalar; invalid input yields NULL (`None`). The registry is keyed by
//! upper-cased name and bulk-loaded into the store at connection time
//! (see `store`).
//!
//! `_string`-suffixed accessors wrap their textual result as a KGTK
//! string; the plain variants return the raw component.

use std::num::NonZeroUsize;
use std::sync::LazyLock;

use fancy_regex::Regex;
use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::value::{
    self, Number, parse_date, parse_geo_coords, parse_lqstring, parse_quantity,
};

/// A scalar UDF result. `None` stands for SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn bool(b: bool) -> Option<Scalar> {
        Some(Scalar::Int(b as i64))
    }

    fn text(s: impl Into<String>) -> Option<Scalar> {
        Some(Scalar::Text(s.into()))
    }

    /// Wrap a textual component as a KGTK string.
    fn string(s: &str) -> Option<Scalar> {
        Some(Scalar::Text(format!("\"{s}\"")))
    }

    fn int(n: i64) -> Option<Scalar> {
        Some(Scalar::Int(n))
    }

    fn float(x: f64) -> Option<Scalar> {
        Some(Scalar::Float(x))
    }

    fn number(n: Number) -> Option<Scalar> {
        match n {
            Number::Int(v) => Scalar::int(v),
            Number::Float(v) => Scalar::float(v),
        }
    }
}

/// Implementation of a registered function
#[derive(Clone, Copy)]
pub enum UdfImpl {
    Unary(fn(&str) -> Option<Scalar>),
    Binary(fn(&str, &str) -> Option<Scalar>),
}

/// A scalar function registered with the store on connect
#[derive(Clone, Copy)]
pub struct UserFunction {
    pub name: &'static str,
    pub arity: usize,
    pub imp: UdfImpl,
}

/// Aggregate functions supported by the underlying engine.
pub const AGGREGATE_FUNCTIONS: [&str; 7] =
    ["AVG", "COUNT", "GROUP_CONCAT", "MAX", "MIN", "SUM", "TOTAL"];

/// True if `name` is an aggregate function supported by the engine.
pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS
        .iter()
        .any(|agg| name.eq_ignore_ascii_case(agg))
}

/// Look up a user function by (case-insensitive) name.
pub fn lookup(name: &str) -> Option<&'static UserFunction> {
    registry().get(name.to_uppercase().as_str())
}

/// True if a user function with this name has been registered.
pub fn is_user_function(name: &str) -> bool {
    lookup(name).is_some()
}

/// All registered literal functions, keyed by upper-cased name.
pub fn registry() -> &'static FxHashMap<String, UserFunction> {
    static REGISTRY: LazyLock<FxHashMap<String, UserFunction>> = LazyLock::new(|| {
        let mut map = FxHashMap::default();
        let mut reg1 = |name: &'static str, f: fn(&str) -> Option<Scalar>| {
            map.insert(
                name.to_uppercase(),
                UserFunction {
                    name,
                    arity: 1,
                    imp: UdfImpl::Unary(f),
                },
            );
        };

        // predicates
        reg1("kgtk_string", |v| Scalar::bool(value::is_string(v)));
        reg1("kgtk_lqstring", |v| Scalar::bool(value::is_lqstring(v)));
        reg1("kgtk_date", |v| Scalar::bool(value::is_date(v)));
        reg1("kgtk_number", |v| Scalar::bool(value::is_number(v)));
        reg1("kgtk_quantity", |v| Scalar::bool(value::is_quantity(v)));
        reg1("kgtk_geo_coords", |v| Scalar::bool(value::is_geo_coords(v)));
        reg1("kgtk_symbol", |v| Scalar::bool(value::is_symbol(v)));

        // string utilities
        reg1("kgtk_stringify", |v| Scalar::text(value::stringify(v)));
        reg1("kgtk_unstringify", |v| Scalar::text(value::unstringify(v)));

        // language-qualified strings
        reg1("kgtk_lqstring_text", |v| {
            Scalar::text(parse_lqstring(v)?.text)
        });
        reg1("kgtk_lqstring_text_string", |v| {
            Scalar::string(parse_lqstring(v)?.text)
        });
        reg1("kgtk_lqstring_lang", |v| {
            Scalar::text(parse_lqstring(v)?.lang)
        });
        reg1("kgtk_lqstring_lang_suffix", |v| {
            Scalar::text(parse_lqstring(v)?.lang_suffix)
        });
        reg1("kgtk_lqstring_suffix", |v| {
            Scalar::text(parse_lqstring(v)?.suffix?)
        });

        // dates
        reg1("kgtk_date_date", |v| {
            Scalar::text(format!("^{}", parse_date(v)?.date))
        });
        reg1("kgtk_date_time", |v| {
            Scalar::text(format!("^{}", parse_date(v)?.time?))
        });
        reg1("kgtk_date_and_time", |v| {
            Scalar::text(format!("^{}", parse_date(v)?.date_and_time))
        });
        reg1("kgtk_date_year", |v| Scalar::int(parse_date(v)?.year));
        reg1("kgtk_date_month", |v| Scalar::int(parse_date(v)?.month?));
        reg1("kgtk_date_day", |v| Scalar::int(parse_date(v)?.day?));
        reg1("kgtk_date_hour", |v| Scalar::int(parse_date(v)?.hour?));
        reg1("kgtk_date_minutes", |v| {
            Scalar::int(parse_date(v)?.minutes?)
        });
        reg1("kgtk_date_seconds", |v| {
            Scalar::int(parse_date(v)?.seconds?)
        });
        reg1("kgtk_date_zone", |v| Scalar::text(parse_date(v)?.zone?));
        reg1("kgtk_date_zone_string", |v| {
            Scalar::string(parse_date(v)?.zone?)
        });
        reg1("kgtk_date_precision", |v| {
            Scalar::int(parse_date(v)?.precision?)
        });

        // quantities
        reg1("kgtk_quantity_numeral", |v| {
            Scalar::text(parse_quantity(v)?.numeral)
        });
        reg1("kgtk_quantity_numeral_string", |v| {
            Scalar::string(parse_quantity(v)?.numeral)
        });
        reg1("kgtk_quantity_number", |v| {
            Scalar::number(parse_quantity(v)?.number())
        });
        reg1("kgtk_quantity_number_int", |v| {
            Scalar::int(parse_quantity(v)?.number().as_int())
        });
        reg1("kgtk_quantity_number_float", |v| {
            Scalar::float(parse_quantity(v)?.number().as_float())
        });
        reg1("kgtk_quantity_si_units", |v| {
            Scalar::text(parse_quantity(v)?.si_units?)
        });
        reg1("kgtk_quantity_wd_units", |v| {
            Scalar::text(parse_quantity(v)?.wd_units?)
        });
        reg1("kgtk_quantity_tolerance", |v| {
            Scalar::text(parse_quantity(v)?.tolerance?)
        });
        reg1("kgtk_quantity_tolerance_string", |v| {
            Scalar::string(parse_quantity(v)?.tolerance?)
        });
        reg1("kgtk_quantity_low_tolerance", |v| {
            Scalar::float(parse_quantity(v)?.low_tolerance?)
        });
        reg1("kgtk_quantity_high_tolerance", |v| {
            Scalar::float(parse_quantity(v)?.high_tolerance?)
        });

        // geo-coordinates
        reg1("kgtk_geo_coords_lat", |v| {
            Scalar::float(parse_geo_coords(v)?.lat)
        });
        reg1("kgtk_geo_coords_long", |v| {
            Scalar::float(parse_geo_coords(v)?.long)
        });

        map.insert(
            "KGTK_REGEX".to_string(),
            UserFunction {
                name: "kgtk_regex",
                arity: 2,
                imp: UdfImpl::Binary(kgtk_regex),
            },
        );
        map
    });
    &REGISTRY
}

/// Size of the compiled-pattern cache
const REGEX_CACHE_SIZE: usize = 100;

static REGEX_CACHE: LazyLock<Mutex<LruCache<String, Option<Regex>>>> = LazyLock::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(REGEX_CACHE_SIZE).unwrap_or_else(|| unreachable!()),
    ))
});

/// Regex matcher implementing the Cypher `=~` semantics: the pattern must
/// match the whole string. Patterns may use back-references, so this goes
/// through fancy-regex rather than the linear-time engine. Compiled
/// patterns are LRU-cached; a malformed pattern yields NULL.
fn kgtk_regex(value: &str, pattern: &str) -> Option<Scalar> {
    let mut cache = REGEX_CACHE.lock();
    let compiled = cache.get_or_insert(pattern.to_string(), || {
        Regex::new(&format!("^(?:{pattern})$")).ok()
    });
    let re = compiled.as_ref()?;
    match re.is_match(value) {
        Ok(matched) => Some(Scalar::Int(matched as i64)),
        Err(_) => None,
    }
}
