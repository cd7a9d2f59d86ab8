//! # Filtering Primitives
//!
//! Building blocks used to express the predicate of a document query.
//!
//! -   _Value_ ([`Value`]): a scalar literal (integer, float, text or boolean).
//!
//! -   _Operation_ ([`Op`]): the logical predicate, *how* a document field is compared
//!     against one or more values (`Eq`, `Lt`, `In`, ...).
//!
//! -   _Expression_ ([`Expr`]): binds a document [`Field`] to an [`Op`], e.g.
//!     *"category = Electronics"*.
//!
//! -   _Filter_ ([`Filter`]): the conjunction of all expressions that a document must
//!     satisfy to be returned.
//!
//! A [`Filter`] can either be compiled into a parameterised SQL query (see
//! [`super::ClausesCompiler`]) or evaluated directly against a JSON document
//! with [`Filter::matches`].

use std::cmp::Ordering;

use serde_json::Value as Json;

use super::Error;

/// Floating point value type alias
pub type Float = f64;
/// Integer value type alias
pub type Integer = i64;
/// Literal type alias
pub type Text = String;

/// A scalar literal used on the right hand side of an operation.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    Integer(Integer),
    Float(Float),
    Text(Text),
    Boolean(bool),
}

impl Value {
    pub fn to_json(&self) -> Json {
        match self {
            Self::Integer(v) => Json::from(*v),
            Self::Float(v) => Json::from(*v),
            Self::Text(v) => Json::from(v.as_str()),
            Self::Boolean(v) => Json::from(*v),
        }
    }

    /// Compares a document value against this literal.
    ///
    /// Returns [`None`] when the two values are not comparable (different types),
    /// which never satisfies any comparison operation.
    fn compare(&self, doc: &Json) -> Option<Ordering> {
        match (self, doc) {
            (Self::Text(v), Json::String(d)) => Some(d.as_str().cmp(v.as_str())),
            (Self::Boolean(v), Json::Bool(d)) => Some(d.cmp(v)),
            (Self::Integer(v), Json::Number(d)) => d.as_f64()?.partial_cmp(&(*v as f64)),
            (Self::Float(v), Json::Number(d)) => d.as_f64()?.partial_cmp(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Indicates which operations are supported by a value type.
///
/// By default, all operations are unsupported (`false`).
/// These checks are performed at **runtime**.
pub trait IsSupportedOp {
    fn support_eq(&self) -> bool {
        false
    }
    fn support_ordering(&self) -> bool {
        false
    }
    fn support_in(&self) -> bool {
        false
    }
}

impl IsSupportedOp for Value {
    fn support_eq(&self) -> bool {
        true
    }

    fn support_ordering(&self) -> bool {
        !matches!(self, Self::Boolean(_))
    }

    fn support_in(&self) -> bool {
        true
    }
}

/// Represents the logical operator to apply to a field for filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum Op<T> {
    /// Equal
    Eq(T),
    /// Not equal
    Neq(T),
    /// Less than or equal
    Leq(T),
    /// Greater than or equal
    Geq(T),
    /// Less than
    Lt(T),
    /// Greater than
    Gt(T),
    /// Field is defined
    Ex,
    /// Field is not defined
    Nex,
    /// Found in a set
    In(Vec<T>),
}

impl<T> Op<T>
where
    T: IsSupportedOp,
{
    pub fn is_supported_op(&self) -> bool {
        match self {
            Op::Eq(v) | Op::Neq(v) => v.support_eq(),
            Op::Leq(v) | Op::Geq(v) | Op::Lt(v) | Op::Gt(v) => v.support_ordering(),
            Op::Ex | Op::Nex => true,
            Op::In(items) => !items.is_empty() && items.iter().all(IsSupportedOp::support_in),
        }
    }
}

impl<T> Op<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Eq(_) => "eq",
            Op::Neq(_) => "neq",
            Op::Leq(_) => "leq",
            Op::Geq(_) => "geq",
            Op::Lt(_) => "lt",
            Op::Gt(_) => "gt",
            Op::Ex => "ex",
            Op::Nex => "nex",
            Op::In(_) => "in",
        }
    }
}

impl Op<Value> {
    /// Evaluates the operation against the value found in the document (if any).
    fn eval(&self, doc: Option<&Json>) -> bool {
        let Some(doc) = doc else {
            return matches!(self, Op::Nex);
        };

        match self {
            Op::Eq(v) => v.compare(doc) == Some(Ordering::Equal),
            Op::Neq(v) => matches!(v.compare(doc), Some(o) if o != Ordering::Equal),
            Op::Lt(v) => v.compare(doc) == Some(Ordering::Less),
            Op::Leq(v) => matches!(v.compare(doc), Some(Ordering::Less | Ordering::Equal)),
            Op::Gt(v) => v.compare(doc) == Some(Ordering::Greater),
            Op::Geq(v) => matches!(v.compare(doc), Some(Ordering::Greater | Ordering::Equal)),
            Op::Ex => true,
            Op::Nex => false,
            Op::In(items) => items
                .iter()
                .any(|v| v.compare(doc) == Some(Ordering::Equal)),
        }
    }
}

/// A dotted path to a document property (e.g. `category` or `address.zip`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    value: String,
}

impl Field {
    pub fn try_new(v: impl Into<String>) -> Result<Self, Error> {
        let value = v.into();
        if value.split('.').any(str::is_empty) {
            return Err(Error::BadField { field: value });
        }
        Ok(Self { value })
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.value.split('.')
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn lookup<'a>(&self, doc: &'a Json) -> Option<&'a Json> {
        self.segments().try_fold(doc, |node, segment| node.get(segment))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A single constraint, binding a [`Field`] to an [`Op`].
#[derive(Debug, Clone)]
pub struct Expr<T>(Field, Op<T>);

impl<T> Expr<T> {
    pub fn field(&self) -> &Field {
        &self.0
    }

    pub fn op(&self) -> &Op<T> {
        &self.1
    }

    pub fn into_parts(self) -> (Field, Op<T>) {
        (self.0, self.1)
    }
}

impl<T> From<(Field, Op<T>)> for Expr<T> {
    fn from(value: (Field, Op<T>)) -> Self {
        Self(value.0, value.1)
    }
}

/// The conjunction of expressions a document must satisfy.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    group: Vec<Expr<Value>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a filter with a single equality expression.
    pub fn eq(field: &str, value: impl Into<Value>) -> Result<Self, Error> {
        Self::new().and(field, Op::Eq(value.into()))
    }

    /// Appends an expression to the filter.
    pub fn and(mut self, field: &str, op: Op<Value>) -> Result<Self, Error> {
        let field = Field::try_new(field)?;
        self.group.push(Expr(field, op));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr<Value>> {
        self.group.iter()
    }

    /// Returns true if the document satisfies every expression of the filter.
    pub fn matches(&self, doc: &Json) -> bool {
        self.group
            .iter()
            .all(|expr| expr.op().eval(expr.field().lookup(doc)))
    }
}

impl IntoIterator for Filter {
    type Item = Expr<Value>;
    type IntoIter = std::vec::IntoIter<Expr<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.group.into_iter()
    }
}
