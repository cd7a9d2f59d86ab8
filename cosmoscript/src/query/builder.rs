use serde::Serialize;

use super::{Error, Expr, Field, Filter, IsSupportedOp, Op, Value};

/// Alias used for the queried container in every generated statement
const ROOT_ALIAS: &str = "c";

/// A named parameter bound to a query, serialized as `{"name": "@p0", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value: serde_json::Value,
}

/// A parameterised SQL query ready to be sent to the service.
///
/// Literal values never appear inside `query`, they are always bound through
/// `parameters`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub query: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Default)]
pub struct CompilerResult {
    pub clauses: Vec<String>,
    pub parameters: Vec<Parameter>,
}

impl CompilerResult {
    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Compiles a [`Filter`] into a `SELECT` statement over a container.
///
/// Errors are latched: once an expression fails to compile every following
/// call is a no-op and the error is returned by [`ClausesCompiler::compile`].
#[derive(Default)]
pub struct ClausesCompiler {
    result: CompilerResult,
    error: Option<Error>,
}

impl ClausesCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expr(mut self, expr: Expr<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }

        let (field, op) = expr.into_parts();

        if !op.is_supported_op() {
            self.error = Some(Error::UnsupportedOp {
                field: field.value().to_owned(),
                op: op.name(),
            });
            return self;
        }

        let column = column_fmt(&field);
        let clause = match op {
            Op::Eq(v) => format!("{column} = {}", self.bind(v)),
            Op::Neq(v) => format!("{column} != {}", self.bind(v)),
            Op::Leq(v) => format!("{column} <= {}", self.bind(v)),
            Op::Geq(v) => format!("{column} >= {}", self.bind(v)),
            Op::Lt(v) => format!("{column} < {}", self.bind(v)),
            Op::Gt(v) => format!("{column} > {}", self.bind(v)),
            Op::Ex => format!("IS_DEFINED({column})"),
            Op::Nex => format!("NOT IS_DEFINED({column})"),
            Op::In(items) => {
                let names: Vec<String> = items.into_iter().map(|v| self.bind(v)).collect();
                format!("{column} IN ({})", names.join(", "))
            }
        };

        self.result.clauses.push(clause);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        for expr in filter {
            self = self.expr(expr);
        }
        self
    }

    pub fn compile(self) -> Result<CompiledQuery, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut query = format!("SELECT * FROM {ROOT_ALIAS}");
        if !self.result.is_unfiltered() {
            query.push_str(" WHERE ");
            query.push_str(&self.result.clauses.join(" AND "));
        }

        Ok(CompiledQuery {
            query,
            parameters: self.result.parameters,
        })
    }

    /// Registers a new parameter and returns its name
    fn bind(&mut self, value: Value) -> String {
        let name = format!("@p{}", self.result.parameters.len());
        self.result.parameters.push(Parameter {
            name: name.clone(),
            value: value.to_json(),
        });
        name
    }
}

/// Formats a field as a property access on the root alias using the bracket
/// notation (`c["address"]["zip"]`), so that any property name is accepted.
fn column_fmt(field: &Field) -> String {
    field.segments().fold(ROOT_ALIAS.to_owned(), |mut acc, segment| {
        // serializing a `&str` into JSON cannot fail
        let quoted = serde_json::Value::from(segment).to_string();
        acc.push('[');
        acc.push_str(&quoted);
        acc.push(']');
        acc
    })
}

impl TryFrom<Filter> for CompiledQuery {
    type Error = Error;

    fn try_from(filter: Filter) -> Result<Self, Self::Error> {
        ClausesCompiler::new().filter(filter).compile()
    }
}
