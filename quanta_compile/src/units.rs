use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use crate::error::{runtime_error, ErrorMsg, RuntimeError};

/// A derived physical dimension: dimension names mapped to their exponents.
///
/// Exponents are never zero. Every operation that builds a unit prunes
/// cancelled dimensions, so two units describing the same dimension always
/// compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unit {
    dims: BTreeMap<String, i64>,
}

impl Unit {
    /// The unit with a single dimension raised to the first power.
    pub fn dimension(name: &str) -> Self {
        Self {
            dims: BTreeMap::from([(name.to_string(), 1)]),
        }
    }

    /// Builds the unit `n1*n2*.../d1*d2*...`.
    pub fn from_factors<'a>(
        nominator: impl IntoIterator<Item = &'a str>,
        denominator: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RuntimeError> {
        let unit = nominator
            .into_iter()
            .try_fold(Self::default(), |unit, name| {
                unit.multiply(&Self::dimension(name))
            })?;
        denominator.into_iter().try_fold(unit, |unit, name| {
            unit.divide(&Self::dimension(name))
        })
    }

    pub fn exponent(&self, name: &str) -> i64 {
        self.dims.get(name).copied().unwrap_or_default()
    }

    pub fn dims(&self) -> impl Iterator<Item = (&str, i64)> {
        self.dims.iter().map(|(name, exp)| (name.as_str(), *exp))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn multiply(&self, other: &Self) -> Result<Self, RuntimeError> {
        self.combine(other, i64::checked_add)
    }

    pub fn divide(&self, other: &Self) -> Result<Self, RuntimeError> {
        self.combine(other, i64::checked_sub)
    }

    pub fn inverse(&self) -> Result<Self, RuntimeError> {
        Self::default().divide(self)
    }

    fn combine(
        &self,
        other: &Self,
        op: fn(i64, i64) -> Option<i64>,
    ) -> Result<Self, RuntimeError> {
        let mut dims = self.dims.clone();
        for (name, exp) in &other.dims {
            let current = dims.entry(name.clone()).or_default();
            *current = op(*current, *exp).ok_or_else(|| {
                runtime_error(
                    ErrorMsg::IntegerOverflow,
                    format!("exponent of dimension `{name}` out of range"),
                )
            })?;
        }
        Ok(Self { dims }.reduce())
    }

    fn reduce(mut self) -> Self {
        self.dims.retain(|_, exp| *exp != 0);
        self
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let positive = self
            .dims()
            .filter(|(_, exp)| *exp > 0)
            .map(|(name, exp)| format!("{name}^{exp}"))
            .collect::<String>();
        let negative = self
            .dims()
            .filter(|(_, exp)| *exp < 0)
            .map(|(name, exp)| format!("{name}^{}", -exp))
            .collect::<String>();
        match (positive.is_empty(), negative.is_empty()) {
            (_, true) => write!(f, "({positive})"),
            (true, false) => write!(f, "(1/{negative})"),
            (false, false) => write!(f, "({positive}/{negative})"),
        }
    }
}

/// The numeric tower shared by plain numbers and physical magnitudes.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(d) => f.write_str(&format_double(*d)),
        }
    }
}

/// Doubles always show a fractional part so they read differently from ints.
pub fn format_double(d: f64) -> String {
    let s = d.to_string();
    if d.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Double(d) => d,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(n) => n == 0,
            Self::Double(d) => d == 0.0,
        }
    }

    pub fn add(self, rhs: Self) -> Result<Self, RuntimeError> {
        self.arith(rhs, "+", i64::checked_add, |a, b| a + b)
    }

    pub fn subtract(self, rhs: Self) -> Result<Self, RuntimeError> {
        self.arith(rhs, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(self, rhs: Self) -> Result<Self, RuntimeError> {
        self.arith(rhs, "*", i64::checked_mul, |a, b| a * b)
    }

    /// Int by Int rounds towards negative infinity, everything else is a
    /// double division.
    pub fn divide(self, rhs: Self) -> Result<Self, RuntimeError> {
        if rhs.is_zero() {
            return Err(runtime_error(
                ErrorMsg::DivisionByZero,
                format!("{self} / {rhs}"),
            ));
        }
        self.arith(rhs, "/", floor_div, |a, b| a / b)
    }

    pub fn negate(self) -> Result<Self, RuntimeError> {
        match self {
            Self::Int(n) => n
                .checked_neg()
                .map(Self::Int)
                .ok_or_else(|| runtime_error(ErrorMsg::IntegerOverflow, format!("-{n}"))),
            Self::Double(d) => Ok(Self::Double(-d)),
        }
    }

    fn arith(
        self,
        rhs: Self,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        double_op: fn(f64, f64) -> f64,
    ) -> Result<Self, RuntimeError> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => int_op(a, b)
                .map(Self::Int)
                .ok_or_else(|| runtime_error(ErrorMsg::IntegerOverflow, format!("{a} {op} {b}"))),
            _ => Ok(Self::Double(double_op(self.as_f64(), rhs.as_f64()))),
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// A magnitude carrying a physical unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Phys {
    pub magnitude: Number,
    pub unit: Unit,
}

impl Display for Phys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.magnitude, self.unit)
    }
}

impl Phys {
    pub fn new(magnitude: Number, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn add(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.check_units(rhs, "+")?;
        Ok(Self::new(self.magnitude.add(rhs.magnitude)?, self.unit.clone()))
    }

    pub fn subtract(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.check_units(rhs, "-")?;
        Ok(Self::new(
            self.magnitude.subtract(rhs.magnitude)?,
            self.unit.clone(),
        ))
    }

    pub fn multiply(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        Ok(Self::new(
            self.magnitude.multiply(rhs.magnitude)?,
            self.unit.multiply(&rhs.unit)?,
        ))
    }

    pub fn divide(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        Ok(Self::new(
            self.magnitude.divide(rhs.magnitude)?,
            self.unit.divide(&rhs.unit)?,
        ))
    }

    pub fn scale(&self, factor: Number) -> Result<Self, RuntimeError> {
        Ok(Self::new(self.magnitude.multiply(factor)?, self.unit.clone()))
    }

    pub fn shrink(&self, divisor: Number) -> Result<Self, RuntimeError> {
        Ok(Self::new(self.magnitude.divide(divisor)?, self.unit.clone()))
    }

    /// `n / self`, which inverts the unit.
    pub fn divide_into(&self, n: Number) -> Result<Self, RuntimeError> {
        Ok(Self::new(n.divide(self.magnitude)?, self.unit.inverse()?))
    }

    pub fn negate(&self) -> Result<Self, RuntimeError> {
        Ok(Self::new(self.magnitude.negate()?, self.unit.clone()))
    }

    fn check_units(&self, rhs: &Self, op: &str) -> Result<(), RuntimeError> {
        if self.unit != rhs.unit {
            return Err(runtime_error(
                ErrorMsg::UnitMismatch,
                format!("cannot apply `{op}` to {} and {}", self.unit, rhs.unit),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit(nominator: &[&str], denominator: &[&str]) -> Unit {
        Unit::from_factors(nominator.iter().copied(), denominator.iter().copied()).unwrap()
    }

    #[test]
    fn unit_display() {
        assert_eq!(unit(&["m"], &["s"]).to_string(), "(m^1/s^1)");
        assert_eq!(unit(&["m"], &["s", "s", "s"]).to_string(), "(m^1/s^3)");
        assert_eq!(unit(&["kg", "m", "m"], &[]).to_string(), "(kg^1m^2)");
        assert_eq!(unit(&[], &["s", "s"]).to_string(), "(1/s^2)");
        assert_eq!(unit(&[], &[]).to_string(), "()");
        assert_eq!(unit(&["s", "kg"], &[]).to_string(), "(kg^1s^1)");
    }

    #[test]
    fn unit_cancels() {
        let speed = unit(&["m"], &["s"]);
        let product = speed.multiply(&unit(&["s"], &[])).unwrap();
        assert_eq!(product, unit(&["m"], &[]));
        assert_eq!(product.exponent("s"), 0);
        assert!(unit(&["m"], &["m"]).is_dimensionless());
        assert_eq!(speed.inverse().unwrap(), unit(&["s"], &["m"]));
    }

    #[test]
    fn int_division_floors() {
        let div = |a, b| Number::Int(a).divide(Number::Int(b)).unwrap();
        assert_eq!(div(7, 2), Number::Int(3));
        assert_eq!(div(-7, 2), Number::Int(-4));
        assert_eq!(div(7, -2), Number::Int(-4));
        assert_eq!(div(-8, 2), Number::Int(-4));
        assert_eq!(
            Number::Int(7).divide(Number::Double(2.0)).unwrap(),
            Number::Double(3.5)
        );
    }

    #[test]
    fn division_by_zero() {
        for (a, b) in [
            (Number::Int(1), Number::Int(0)),
            (Number::Double(1.0), Number::Int(0)),
            (Number::Int(1), Number::Double(0.0)),
            (Number::Double(1.0), Number::Double(-0.0)),
        ] {
            assert_eq!(a.divide(b).unwrap_err().msg, ErrorMsg::DivisionByZero);
        }
    }

    #[test]
    fn integer_overflow() {
        let err = Number::Int(i64::MAX).add(Number::Int(1)).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::IntegerOverflow);
        let err = Number::Int(i64::MIN).divide(Number::Int(-1)).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::IntegerOverflow);
        assert!(Number::Int(i64::MIN).negate().is_err());
    }

    #[test]
    fn number_display() {
        assert_eq!(Number::Int(-3).to_string(), "-3");
        assert_eq!(Number::Double(3.0).to_string(), "3.0");
        assert_eq!(Number::Double(0.25).to_string(), "0.25");
    }

    #[test]
    fn phys_arithmetic() {
        let a = Phys::new(Number::Int(1), unit(&["m"], &["s"]));
        let b = Phys::new(Number::Int(3), unit(&["m"], &["s", "s"]));
        assert_eq!(a.multiply(&b).unwrap().to_string(), "3*(m^2/s^3)");
        assert_eq!(a.add(&a).unwrap().to_string(), "2*(m^1/s^1)");

        let err = a.add(&b).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::UnitMismatch);
        assert_eq!(err.detail, "cannot apply `+` to (m^1/s^1) and (m^1/s^2)");

        let inverted = a.divide_into(Number::Double(2.0)).unwrap();
        assert_eq!(inverted.to_string(), "2.0*(s^1/m^1)");
    }

    fn dimension() -> impl Strategy<Value = &'static str> {
        prop::sample::select(&["m", "s", "kg", "A"][..])
    }

    fn arbitrary_unit() -> impl Strategy<Value = Unit> {
        (
            prop::collection::vec(dimension(), 0..6),
            prop::collection::vec(dimension(), 0..6),
        )
            .prop_map(|(n, d)| Unit::from_factors(n, d).unwrap())
    }

    proptest! {
        #[test]
        fn no_zero_exponents(a in arbitrary_unit(), b in arbitrary_unit()) {
            for u in [a.multiply(&b).unwrap(), a.divide(&b).unwrap()] {
                prop_assert!(u.dims().all(|(_, exp)| exp != 0));
            }
        }

        #[test]
        fn unit_over_itself_is_dimensionless(u in arbitrary_unit()) {
            let ratio = u.divide(&u).unwrap();
            prop_assert!(ratio.is_dimensionless());
            prop_assert_eq!(u.multiply(&ratio).unwrap(), u);
        }

        #[test]
        fn multiply_then_divide_restores(a in arbitrary_unit(), b in arbitrary_unit()) {
            prop_assert_eq!(a.multiply(&b).unwrap().divide(&b).unwrap(), a);
        }
    }
}
