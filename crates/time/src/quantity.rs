//! Physical quantities: an exact rational magnitude paired with units.
//!
//! This is the small slice of unit algebra the time authority needs.  Magnitudes are [BigRational] so that `1us / 1ns`
//! is exactly 1000 rather than something within an epsilon of it; tick factors are derived from these divisions and must
//! come out identically on every rank.
//!
//! Text is `number [prefix]unit (('*'|'/') [prefix]unit)*`, for example `2.5us`, `100 MHz`, `8b/s`.  Hertz is stored as
//! inverse seconds, so `1Hz` and `1/s` are the same quantity.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use num::bigint::BigInt;
use num::rational::BigRational;
use num::{One, Signed, ToPrimitive, Zero};
use regex::Regex;

use crate::errors::QuantityError;

lazy_static! {
    static ref QUANTITY_RE: Regex =
        Regex::new(r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*([A-Za-z*/]*)\s*$")
            .expect("The quantity regex is a valid constant");
}

/// Decimal SI prefixes, as `(prefix, power of ten)`.
const SI_PREFIXES: [(&str, i32); 16] = [
    ("y", -24),
    ("z", -21),
    ("a", -18),
    ("f", -15),
    ("p", -12),
    ("n", -9),
    ("u", -6),
    ("m", -3),
    ("k", 3),
    ("M", 6),
    ("G", 9),
    ("T", 12),
    ("P", 15),
    ("E", 18),
    ("Z", 21),
    ("Y", 24),
];

/// Largest decimal exponent accepted in text.  Anything beyond this is a typo, not a time.
const MAX_EXPONENT: i32 = 512;

/// Binary prefixes, as `(prefix, power of two)`.
const BINARY_PREFIXES: [(&str, usize); 4] = [("Ki", 10), ("Mi", 20), ("Gi", 30), ("Ti", 40)];

fn pow10(exp: i32) -> BigRational {
    let magnitude = num::pow(BigInt::from(10), exp.unsigned_abs() as usize);
    if exp >= 0 {
        BigRational::from_integer(magnitude)
    } else {
        BigRational::new(BigInt::one(), magnitude)
    }
}

fn pow2(exp: usize) -> BigRational {
    BigRational::from_integer(num::pow(BigInt::from(2), exp))
}

/// Units as a product of base units raised to integer powers.
///
/// The empty product is a dimensionless quantity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Units {
    dims: BTreeMap<String, i32>,
}

impl Units {
    pub fn dimensionless() -> Units {
        Default::default()
    }

    fn base(name: &str) -> Units {
        let mut dims = BTreeMap::new();
        dims.insert(name.to_string(), 1);
        Units { dims }
    }

    pub fn seconds() -> Units {
        Self::base("s")
    }

    pub fn hertz() -> Units {
        Self::seconds().invert()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_empty()
    }

    fn combine(&self, other: &Units, sign: i32) -> Units {
        let mut dims = self.dims.clone();
        for (name, exp) in other.dims.iter() {
            let entry = dims.entry(name.clone()).or_insert(0);
            *entry += sign * exp;
            if *entry == 0 {
                dims.remove(name);
            }
        }
        Units { dims }
    }

    #[must_use]
    pub fn multiply(&self, other: &Units) -> Units {
        self.combine(other, 1)
    }

    #[must_use]
    pub fn divide(&self, other: &Units) -> Units {
        self.combine(other, -1)
    }

    #[must_use]
    pub fn invert(&self) -> Units {
        Units::dimensionless().divide(self)
    }

    /// Parse the unit portion of a quantity, returning the scale contributed by any prefixes alongside the units.
    pub fn parse(text: &str) -> Result<(BigRational, Units), QuantityError> {
        let mut scale = BigRational::one();
        let mut units = Units::dimensionless();

        if text.is_empty() {
            return Ok((scale, units));
        }

        let malformed = || QuantityError::Malformed(text.to_string());
        let mut rest = text;
        let mut dividing = false;
        let mut first = true;

        loop {
            let end = rest.find(['*', '/']).unwrap_or(rest.len());
            let token = &rest[..end];

            if token.is_empty() {
                // Only `/s` style leading division may omit the numerator.
                if !(first && rest[end..].starts_with('/')) {
                    return Err(malformed());
                }
            } else {
                let (token_scale, token_units) = parse_unit_token(token);
                if dividing {
                    scale /= token_scale;
                    units = units.divide(&token_units);
                } else {
                    scale *= token_scale;
                    units = units.multiply(&token_units);
                }
            }

            if end == rest.len() {
                break;
            }

            dividing = rest[end..].starts_with('/');
            rest = &rest[end + 1..];
            first = false;
        }

        Ok((scale, units))
    }
}

fn known_unit(name: &str) -> Option<Units> {
    match name {
        "s" => Some(Units::seconds()),
        "Hz" => Some(Units::hertz()),
        "B" | "b" => Some(Units::base(name)),
        _ => None,
    }
}

/// Resolve a single token such as `us`, `GHz` or `m`.
///
/// A whole-token match on a known unit wins, then a prefix followed by a known unit.  Anything else is taken as an
/// opaque base unit, so `m` is metres and not a dangling milli prefix.
fn parse_unit_token(token: &str) -> (BigRational, Units) {
    if let Some(u) = known_unit(token) {
        return (BigRational::one(), u);
    }

    for (prefix, exp) in BINARY_PREFIXES.iter() {
        if let Some(u) = token.strip_prefix(*prefix).and_then(known_unit) {
            return (pow2(*exp), u);
        }
    }

    for (prefix, exp) in SI_PREFIXES.iter() {
        if let Some(u) = token.strip_prefix(*prefix).and_then(known_unit) {
            return (pow10(*exp), u);
        }
    }

    (BigRational::one(), Units::base(token))
}

/// Parse a decimal with optional fraction and exponent into an exact rational.
fn parse_number(text: &str) -> Result<BigRational, QuantityError> {
    let malformed = || QuantityError::Malformed(text.to_string());

    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(i) => (
            &text[..i],
            text[i + 1..].parse::<i32>().map_err(|_| malformed())?,
        ),
        None => (text, 0),
    };

    let (negative, mantissa) = match mantissa.as_bytes().first() {
        Some(b'-') => (true, &mantissa[1..]),
        Some(b'+') => (false, &mantissa[1..]),
        _ => (false, mantissa),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", whole, fraction);
    let mut value: BigInt = digits.parse().map_err(|_| malformed())?;
    if negative {
        value = -value;
    }

    let fraction_len = i32::try_from(fraction.len()).map_err(|_| malformed())?;
    let exponent = exponent
        .checked_sub(fraction_len)
        .filter(|e| e.abs() <= MAX_EXPONENT)
        .ok_or_else(malformed)?;
    Ok(BigRational::from_integer(value) * pow10(exponent))
}

/// A magnitude with units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quantity {
    value: BigRational,
    units: Units,
}

impl Quantity {
    pub fn new(value: BigRational, units: Units) -> Quantity {
        Quantity { value, units }
    }

    pub fn parse(text: &str) -> Result<Quantity, QuantityError> {
        let caps = QUANTITY_RE
            .captures(text)
            .ok_or_else(|| QuantityError::Malformed(text.to_string()))?;
        let number = parse_number(&caps[1])?;
        let (scale, units) = Units::parse(&caps[2])?;
        Ok(Quantity {
            value: number * scale,
            units,
        })
    }

    pub fn value(&self) -> &BigRational {
        &self.value
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    /// Does this quantity carry exactly the units written in `unit_text`?  Prefixes are ignored, so `has_units("s")`
    /// and `has_units("ns")` agree.
    pub fn has_units(&self, unit_text: &str) -> bool {
        match Units::parse(unit_text) {
            Ok((_, u)) => u == self.units,
            Err(_) => false,
        }
    }

    pub fn is_time(&self) -> bool {
        self.units == Units::seconds()
    }

    pub fn is_frequency(&self) -> bool {
        self.units == Units::hertz()
    }

    pub fn is_positive(&self) -> bool {
        self.value.is_positive()
    }

    pub fn div(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        if other.value.is_zero() {
            return Err(QuantityError::DivisionByZero);
        }
        Ok(Quantity {
            value: &self.value / &other.value,
            units: self.units.divide(&other.units),
        })
    }

    pub fn invert(&self) -> Result<Quantity, QuantityError> {
        if self.value.is_zero() {
            return Err(QuantityError::DivisionByZero);
        }
        Ok(Quantity {
            value: self.value.recip(),
            units: self.units.invert(),
        })
    }

    /// Multiply by a plain integer.
    #[must_use]
    pub fn scaled_by(&self, factor: u64) -> Quantity {
        Quantity {
            value: &self.value * BigRational::from_integer(BigInt::from(factor)),
            units: self.units.clone(),
        }
    }

    /// Round to the nearest integer, with halves going away from zero.
    pub fn rounded_value(&self) -> BigInt {
        self.value.round().to_integer()
    }

    /// Lossy conversion of the magnitude, for diagnostics and comparisons against float limits.
    pub fn value_f64(&self) -> f64 {
        self.value.to_f64().unwrap_or(f64::NAN)
    }

    /// Format with the SI prefix that puts the magnitude in `[1, 1000)`, e.g. `0.001s` becomes `1ms`.
    pub fn to_string_best_si(&self) -> String {
        if self.value.is_zero() {
            return format!("0{}", self.units);
        }

        let magnitude = self.value.abs();
        let one = BigRational::one();
        let thousand = BigRational::from_integer(BigInt::from(1000));
        let exp = (-8..=8)
            .map(|k| k * 3)
            .find(|e| {
                let scaled = &magnitude / pow10(*e);
                scaled >= one && scaled < thousand
            })
            .unwrap_or(if magnitude < one { -24 } else { 24 });
        let prefix = SI_PREFIXES
            .iter()
            .find(|(_, e)| *e == exp)
            .map(|(p, _)| *p)
            .unwrap_or("");
        let scaled = (&self.value / pow10(exp)).to_f64().unwrap_or(f64::NAN);
        format!("{}{}{}", scaled, prefix, self.units)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Quantity, QuantityError> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Units::hertz() {
            return write!(f, "Hz");
        }

        let render = |name: &str, exp: i32| {
            if exp == 1 {
                name.to_string()
            } else {
                format!("{}^{}", name, exp)
            }
        };

        let numerator = self
            .dims
            .iter()
            .filter(|(_, e)| **e > 0)
            .map(|(n, e)| render(n, *e))
            .collect::<Vec<_>>();
        let denominator = self
            .dims
            .iter()
            .filter(|(_, e)| **e < 0)
            .map(|(n, e)| render(n, -*e))
            .collect::<Vec<_>>();

        if numerator.is_empty() && !denominator.is_empty() {
            write!(f, "1")?;
        } else {
            write!(f, "{}", numerator.join("*"))?;
        }
        for d in denominator {
            write!(f, "/{}", d)?;
        }
        Ok(())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_integer() {
            write!(f, "{}{}", self.value.to_integer(), self.units)
        } else {
            write!(f, "{}{}", self.value_f64(), self.units)
        }
    }
}
