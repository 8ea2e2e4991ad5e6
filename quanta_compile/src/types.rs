use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    rc::Rc,
};

use quanta_syntax::{
    ast::{BinOp, Block, FuncDecl, Param, TypeName},
    token::{Position, Span},
};

use crate::{
    error::{runtime_error, ErrorMsg, RuntimeError},
    interpret::Interpreter,
    units::{format_double, Number, Phys, Unit},
};

/// A runtime value together with the source it was produced from.
///
/// Reading a variable hands out a clone, so no two bindings ever share a
/// value.
#[derive(Clone, Debug)]
pub struct Value {
    pub ty: Type,
    pub span: Option<Span>,
}

/// Values compare by content, wherever they came from.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.ty, f)
    }
}

impl From<Type> for Value {
    fn from(ty: Type) -> Self {
        Self { ty, span: None }
    }
}

impl Value {
    pub fn new(ty: Type, span: Span) -> Self {
        Self {
            ty,
            span: Some(span),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn pos(&self) -> Option<Position> {
        self.span.map(|s| s.start)
    }

    pub fn is_signal(&self) -> bool {
        matches!(self.ty, Type::Return(_) | Type::Break | Type::Continue)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
    Unit(Unit),
    Phys(Phys),
    Func(Func),
    NativeFunc(NativeFunc),
    // Control flow signals
    Return(Option<Box<Value>>),
    Break,
    Continue,
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(d) => f.write_str(&format_double(*d)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Unit(u) => write!(f, "{u}"),
            Self::Phys(p) => write!(f, "{p}"),
            Self::Func(func) => write!(f, "{func}"),
            Self::NativeFunc(func) => write!(f, "{func}"),
            Self::Return(Some(value)) => write!(f, "{value}"),
            Self::Return(None) => f.write_str("return"),
            Self::Break => f.write_str("break"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

impl From<Number> for Type {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(n) => Self::Int(n),
            Number::Double(d) => Self::Double(d),
        }
    }
}

impl Type {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Unit(_) => "unit",
            Self::Phys(_) => "phys",
            Self::Func(_) | Self::NativeFunc(_) => "function",
            Self::Return(_) => "return",
            Self::Break => "break",
            Self::Continue => "continue",
        }
    }

    /// Whether a value of this type may be bound to something declared `ty`.
    pub fn is(&self, ty: TypeName) -> bool {
        matches!(
            (self, ty),
            (Self::Int(_), TypeName::Int)
                | (Self::Double(_), TypeName::Double)
                | (Self::Bool(_), TypeName::Bool)
                | (Self::Str(_), TypeName::Str)
                | (Self::Unit(_), TypeName::Unit)
                | (Self::Phys(_), TypeName::Phys)
        )
    }

    pub fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn number(&self) -> Option<Number> {
        match self {
            Self::Int(n) => Some(Number::Int(*n)),
            Self::Double(d) => Some(Number::Double(*d)),
            _ => None,
        }
    }

    /// Truth value of a condition. Numbers are true unless zero.
    pub fn truthy(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(_) | Self::Double(_) => self.number().map(|n| !n.is_zero()),
            _ => None,
        }
    }

    pub fn binary(&self, op: BinOp, rhs: &Self) -> Result<Self, RuntimeError> {
        match op {
            BinOp::Plus => self.add(rhs),
            BinOp::Minus => self.subtract(rhs),
            BinOp::Star => self.multiply(rhs),
            BinOp::Slash => self.divide(rhs),
            BinOp::EqualEqual => self.equal(rhs),
            BinOp::BangEqual => self.not_equal(rhs),
            BinOp::Less => self.less(rhs),
            BinOp::LessEqual => self.less_equal(rhs),
            BinOp::Greater => self.greater(rhs),
            BinOp::GreaterEqual => self.greater_equal(rhs),
            BinOp::And => self.and(rhs),
            BinOp::Or => self.or(rhs),
        }
    }

    pub fn add(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs) {
            (Self::Str(a), Self::Str(b)) => Ok(Self::Str(format!("{a}{b}"))),
            (Self::Unit(a), Self::Unit(_)) => Ok(Self::Unit(a.clone())),
            (Self::Phys(a), Self::Phys(b)) => Ok(Self::Phys(a.add(b)?)),
            _ => match (self.number(), rhs.number()) {
                (Some(a), Some(b)) => Ok(a.add(b)?.into()),
                _ => Err(self.invalid(BinOp::Plus, rhs)),
            },
        }
    }

    pub fn subtract(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs) {
            (Self::Unit(a), Self::Unit(_)) => Ok(Self::Unit(a.clone())),
            (Self::Phys(a), Self::Phys(b)) => Ok(Self::Phys(a.subtract(b)?)),
            _ => match (self.number(), rhs.number()) {
                (Some(a), Some(b)) => Ok(a.subtract(b)?.into()),
                _ => Err(self.invalid(BinOp::Minus, rhs)),
            },
        }
    }

    pub fn multiply(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs) {
            (Self::Str(s), Self::Int(n)) | (Self::Int(n), Self::Str(s)) => repeat(s, *n),
            (Self::Unit(a), Self::Unit(b)) => Ok(Self::Unit(a.multiply(b)?)),
            (Self::Phys(a), Self::Phys(b)) => Ok(Self::Phys(a.multiply(b)?)),
            (Self::Phys(p), other) | (other, Self::Phys(p)) => match other.number() {
                Some(factor) => Ok(Self::Phys(p.scale(factor)?)),
                None => Err(self.invalid(BinOp::Star, rhs)),
            },
            _ => match (self.number(), rhs.number()) {
                (Some(a), Some(b)) => Ok(a.multiply(b)?.into()),
                _ => Err(self.invalid(BinOp::Star, rhs)),
            },
        }
    }

    pub fn divide(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs) {
            (Self::Unit(a), Self::Unit(b)) => Ok(Self::Unit(a.divide(b)?)),
            (Self::Phys(a), Self::Phys(b)) => Ok(Self::Phys(a.divide(b)?)),
            (Self::Phys(p), other) => match other.number() {
                Some(divisor) => Ok(Self::Phys(p.shrink(divisor)?)),
                None => Err(self.invalid(BinOp::Slash, rhs)),
            },
            (other, Self::Phys(p)) => match other.number() {
                Some(n) => Ok(Self::Phys(p.divide_into(n)?)),
                None => Err(self.invalid(BinOp::Slash, rhs)),
            },
            _ => match (self.number(), rhs.number()) {
                (Some(a), Some(b)) => Ok(a.divide(b)?.into()),
                _ => Err(self.invalid(BinOp::Slash, rhs)),
            },
        }
    }

    pub fn equal(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        let eq = match (self, rhs) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Unit(a), Self::Unit(b)) => a == b,
            (Self::Phys(a), Self::Phys(b)) => a == b,
            _ => match (self.number(), rhs.number()) {
                (Some(a), Some(b)) => a == b,
                _ => return Err(self.invalid(BinOp::EqualEqual, rhs)),
            },
        };
        Ok(Self::Bool(eq))
    }

    pub fn not_equal(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match self.equal(rhs) {
            Ok(Self::Bool(eq)) => Ok(Self::Bool(!eq)),
            _ => Err(self.invalid(BinOp::BangEqual, rhs)),
        }
    }

    pub fn less(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.compare(BinOp::Less, rhs, |a, b| a < b)
    }

    pub fn less_equal(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.compare(BinOp::LessEqual, rhs, |a, b| a <= b)
    }

    pub fn greater(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.compare(BinOp::Greater, rhs, |a, b| a > b)
    }

    pub fn greater_equal(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        self.compare(BinOp::GreaterEqual, rhs, |a, b| a >= b)
    }

    /// Both operands are always evaluated, the left one must be a bool.
    pub fn and(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs.truthy()) {
            (Self::Bool(a), Some(b)) => Ok(Self::Bool(*a && b)),
            _ => Err(self.invalid(BinOp::And, rhs)),
        }
    }

    pub fn or(&self, rhs: &Self) -> Result<Self, RuntimeError> {
        match (self, rhs.truthy()) {
            (Self::Bool(a), Some(b)) => Ok(Self::Bool(*a || b)),
            _ => Err(self.invalid(BinOp::Or, rhs)),
        }
    }

    pub fn not(&self) -> Result<Self, RuntimeError> {
        match self {
            Self::Bool(b) => Ok(Self::Bool(!b)),
            _ => Err(self.invalid_unary("not")),
        }
    }

    pub fn negate(&self) -> Result<Self, RuntimeError> {
        match self {
            Self::Phys(p) => Ok(Self::Phys(p.negate()?)),
            _ => match self.number() {
                Some(n) => Ok(n.negate()?.into()),
                None => Err(self.invalid_unary("-")),
            },
        }
    }

    pub fn identity(&self) -> Result<Self, RuntimeError> {
        match self {
            Self::Int(_) | Self::Double(_) | Self::Phys(_) => Ok(self.clone()),
            _ => Err(self.invalid_unary("+")),
        }
    }

    fn compare(
        &self,
        op: BinOp,
        rhs: &Self,
        cmp: fn(Number, Number) -> bool,
    ) -> Result<Self, RuntimeError> {
        match (self.number(), rhs.number()) {
            (Some(a), Some(b)) => Ok(Self::Bool(cmp(a, b))),
            _ => Err(self.invalid(op, rhs)),
        }
    }

    fn invalid(&self, op: BinOp, rhs: &Self) -> RuntimeError {
        runtime_error(
            ErrorMsg::InvalidOperation,
            format!("`{op}` is not defined for {} and {}", self.name(), rhs.name()),
        )
    }

    fn invalid_unary(&self, op: &str) -> RuntimeError {
        runtime_error(
            ErrorMsg::InvalidUnaryOperation,
            format!("`{op}` is not defined for {}", self.name()),
        )
    }
}

/// Longest string, in bytes, that repetition may build.
pub const MAX_STRING_LEN: usize = 1 << 28;

fn repeat(s: &str, n: i64) -> Result<Type, RuntimeError> {
    let count = usize::try_from(n).unwrap_or_default();
    let fits = s
        .len()
        .checked_mul(count)
        .is_some_and(|len| len <= MAX_STRING_LEN);
    if !fits {
        return Err(runtime_error(
            ErrorMsg::IntegerOverflow,
            format!("cannot repeat a string {n} times"),
        ));
    }
    Ok(Type::Str(s.repeat(count)))
}

pub trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        call_site: Position,
    ) -> Result<Option<Value>, RuntimeError>;
}

/// A user-defined function.
#[derive(Clone, Debug)]
pub struct Func {
    pub decl: Rc<FuncDecl>,
    /// Bindings of the frame the function was defined in. Empty for
    /// functions defined at the top level, which see globals directly.
    pub closure: Rc<HashMap<String, Value>>,
}

/// Two functions are the same if they come from the same definition.
impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.decl, &other.decl)
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self
            .params()
            .iter()
            .map(|p| format!("{}: {}", p.ident, p.ty))
            .collect::<Vec<String>>()
            .join(", ");
        write!(
            f,
            "function {}({params}) -> {}",
            self.name(),
            self.return_type()
        )
    }
}

impl Func {
    pub fn new(decl: Rc<FuncDecl>, closure: Rc<HashMap<String, Value>>) -> Self {
        Self { decl, closure }
    }

    pub fn params(&self) -> &[Param] {
        &self.decl.params
    }

    pub fn return_type(&self) -> TypeName {
        self.decl.return_type
    }

    pub fn body(&self) -> &Block {
        &self.decl.body
    }
}

impl Callable for Func {
    fn name(&self) -> &str {
        &self.decl.ident.name
    }
    fn arity(&self) -> usize {
        self.decl.params.len()
    }
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        call_site: Position,
    ) -> Result<Option<Value>, RuntimeError> {
        interpreter.call_func(self, args, call_site)
    }
}

pub type NativeBody = fn(&mut Interpreter, Vec<Value>) -> Result<Option<Value>, RuntimeError>;

/// A function provided by the interpreter itself. Parameters accept any type.
#[derive(Clone)]
pub struct NativeFunc {
    pub name: String,
    pub params: Vec<String>,
    pub body: NativeBody,
}

impl PartialEq for NativeFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl Debug for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunc")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl Display for NativeFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "native function {}({})", self.name, self.params.join(", "))
    }
}

impl Callable for NativeFunc {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        self.params.len()
    }
    fn call(
        &self,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
        _: Position,
    ) -> Result<Option<Value>, RuntimeError> {
        (self.body)(interpreter, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phys(magnitude: Number, nominator: &[&str], denominator: &[&str]) -> Type {
        let unit =
            Unit::from_factors(nominator.iter().copied(), denominator.iter().copied()).unwrap();
        Type::Phys(Phys::new(magnitude, unit))
    }

    #[test]
    fn numeric_tower() {
        assert_eq!(Type::Int(2).add(&Type::Int(3)).unwrap(), Type::Int(5));
        assert_eq!(
            Type::Int(2).add(&Type::Double(0.5)).unwrap(),
            Type::Double(2.5)
        );
        assert_eq!(Type::Int(7).divide(&Type::Int(2)).unwrap(), Type::Int(3));
        assert_eq!(
            Type::Double(7.0).divide(&Type::Int(2)).unwrap(),
            Type::Double(3.5)
        );
        assert_eq!(
            Type::Int(1).less(&Type::Double(1.5)).unwrap(),
            Type::Bool(true)
        );
        assert_eq!(
            Type::Int(2).equal(&Type::Double(2.0)).unwrap(),
            Type::Bool(true)
        );
    }

    #[test]
    fn division_by_zero() {
        for divisor in [Type::Int(0), Type::Double(0.0)] {
            let err = Type::Int(10).divide(&divisor).unwrap_err();
            assert_eq!(err.msg, ErrorMsg::DivisionByZero);
        }
        let err = phys(Number::Int(1), &["m"], &[])
            .divide(&Type::Int(0))
            .unwrap_err();
        assert_eq!(err.msg, ErrorMsg::DivisionByZero);
    }

    #[test]
    fn strings() {
        let s = Type::Str("ab".to_string());
        assert_eq!(s.add(&s).unwrap(), Type::Str("abab".to_string()));
        assert_eq!(
            s.multiply(&Type::Int(3)).unwrap(),
            Type::Str("ababab".to_string())
        );
        assert_eq!(
            Type::Int(2).multiply(&s).unwrap(),
            Type::Str("abab".to_string())
        );
        assert_eq!(
            s.multiply(&Type::Int(-1)).unwrap(),
            Type::Str(String::default())
        );
        assert_eq!(s.equal(&s).unwrap(), Type::Bool(true));
        assert!(s.less(&s).is_err());
    }

    #[test]
    fn oversized_repetition() {
        let s = Type::Str("ab".to_string());
        let err = s.multiply(&Type::Int(i64::MAX)).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::IntegerOverflow);
        assert_eq!(err.detail, format!("cannot repeat a string {} times", i64::MAX));

        let half = (MAX_STRING_LEN / 2) as i64;
        assert!(s.multiply(&Type::Int(half + 1)).is_err());
    }

    #[test]
    fn invalid_operation_names_both_types() {
        let err = Type::Bool(true).add(&Type::Int(1)).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::InvalidOperation);
        assert_eq!(err.detail, "`+` is not defined for bool and int");

        let err = Type::Str("a".to_string())
            .not_equal(&Type::Int(1))
            .unwrap_err();
        assert_eq!(err.detail, "`!=` is not defined for string and int");

        let err = Type::Str("a".to_string()).negate().unwrap_err();
        assert_eq!(err.msg, ErrorMsg::InvalidUnaryOperation);
    }

    #[test]
    fn logic() {
        let (t, f) = (Type::Bool(true), Type::Bool(false));
        assert_eq!(t.and(&f).unwrap(), f);
        assert_eq!(f.or(&t).unwrap(), t);
        assert_eq!(t.and(&Type::Int(2)).unwrap(), t);
        assert_eq!(t.and(&Type::Double(0.0)).unwrap(), f);
        assert_eq!(t.not().unwrap(), f);
        assert!(Type::Int(1).and(&t).is_err());
        assert!(Type::Int(1).not().is_err());
    }

    #[test]
    fn units_and_phys() {
        let speed = phys(Number::Int(3), &["m"], &["s"]);
        assert_eq!(speed.to_string(), "3*(m^1/s^1)");

        let time = phys(Number::Int(2), &["s"], &[]);
        assert_eq!(speed.multiply(&time).unwrap().to_string(), "6*(m^1)");
        assert_eq!(
            Type::Double(0.5).multiply(&speed).unwrap().to_string(),
            "1.5*(m^1/s^1)"
        );
        assert_eq!(
            Type::Int(6).divide(&time).unwrap().to_string(),
            "3*(1/s^1)"
        );
        assert_eq!(speed.negate().unwrap().to_string(), "-3*(m^1/s^1)");

        let err = speed.subtract(&time).unwrap_err();
        assert_eq!(err.msg, ErrorMsg::UnitMismatch);

        let unit = Type::Unit(Unit::dimension("m"));
        let other = Type::Unit(Unit::dimension("s"));
        assert_eq!(unit.add(&other).unwrap(), unit);
        assert_eq!(unit.multiply(&other).unwrap().to_string(), "(m^1s^1)");
        assert_eq!(unit.equal(&other).unwrap(), Type::Bool(false));
    }

    #[test]
    fn value_display() {
        assert_eq!(Type::Double(2.0).to_string(), "2.0");
        assert_eq!(Type::Bool(false).to_string(), "false");
        assert_eq!(Type::Str("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn truthiness() {
        assert_eq!(Type::Int(0).truthy(), Some(false));
        assert_eq!(Type::Double(0.1).truthy(), Some(true));
        assert_eq!(Type::Str(String::default()).truthy(), None);
    }

    #[test]
    fn declared_types() {
        assert!(Type::Int(1).is(TypeName::Int));
        assert!(!Type::Int(1).is(TypeName::Double));
        assert!(!Type::Bool(true).is(TypeName::Void));
        assert!(Type::Str("s".to_string()).is(TypeName::Str));
        assert!(Type::Int(1).same_kind(&Type::Int(2)));
        assert!(!Type::Int(1).same_kind(&Type::Double(1.0)));
    }
}
