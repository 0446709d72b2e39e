//! Scalar function registry.
//!
//! Functions operate row-at-a-time over `Field`s; `Action::ApplyFunction`
//! drives them across a whole column. This mirrors how `Column`'s own
//! `filter`/`permute`/`replicate` are expressed in terms of
//! `get_as_field`/`insert_from` rather than per-variant vectorized loops —
//! consistent with the "tagged variant, not virtual dispatch" design note,
//! it does cost a match per row. A JIT-fused tight loop is named in spec
//! §4.C as optional; this registry is the always-available interpreter
//! fallback it falls back to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::column::Field;
use crate::error::{EngineError, EngineResult, ErrorCode};

pub trait Function: Send + Sync {
    fn name(&self) -> &str;

    /// Apply to one row's worth of (already null-checked, non-null) arguments.
    fn apply(&self, args: &[Field]) -> EngineResult<Field>;

    /// Default ClickHouse-style null propagation: NULL in, NULL out. A
    /// handful of functions (e.g. `ifNull`, `coalesce`) would override this;
    /// none of the builtins below need to.
    fn is_null_propagating(&self) -> bool {
        true
    }
}

macro_rules! numeric_binop {
    ($name:ident, $sym:literal, $op:expr) => {
        pub struct $name;
        impl Function for $name {
            fn name(&self) -> &str {
                $sym
            }
            fn apply(&self, args: &[Field]) -> EngineResult<Field> {
                let [a, b] = args else {
                    return Err(EngineError::new(ErrorCode::ParameterOutOfBound, concat!($sym, " takes 2 arguments")));
                };
                let (a, b) = (
                    a.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, concat!($sym, ": non-numeric argument")))?,
                    b.as_f64().ok_or_else(|| EngineError::new(ErrorCode::TypeMismatch, concat!($sym, ": non-numeric argument")))?,
                );
                Ok(Field::Float64($op(a, b)))
            }
        }
    };
}

numeric_binop!(Plus, "plus", |a: f64, b: f64| a + b);
numeric_binop!(Minus, "minus", |a: f64, b: f64| a - b);
numeric_binop!(Multiply, "multiply", |a: f64, b: f64| a * b);
numeric_binop!(Divide, "divide", |a: f64, b: f64| a / b);

macro_rules! comparison {
    ($name:ident, $sym:literal, $op:expr) => {
        pub struct $name;
        impl Function for $name {
            fn name(&self) -> &str {
                $sym
            }
            fn apply(&self, args: &[Field]) -> EngineResult<Field> {
                let [a, b] = args else {
                    return Err(EngineError::new(ErrorCode::ParameterOutOfBound, concat!($sym, " takes 2 arguments")));
                };
                let ord = a.compare(b, true);
                Ok(Field::UInt64($op(ord) as u64))
            }
        }
    };
}

comparison!(Equals, "equals", |o: std::cmp::Ordering| o.is_eq());
comparison!(NotEquals, "notEquals", |o: std::cmp::Ordering| o.is_ne());
comparison!(Less, "less", |o: std::cmp::Ordering| o.is_lt());
comparison!(Greater, "greater", |o: std::cmp::Ordering| o.is_gt());
comparison!(LessOrEquals, "lessOrEquals", |o: std::cmp::Ordering| o.is_le());
comparison!(GreaterOrEquals, "greaterOrEquals", |o: std::cmp::Ordering| o.is_ge());

pub struct And;
impl Function for And {
    fn name(&self) -> &str {
        "and"
    }
    fn apply(&self, args: &[Field]) -> EngineResult<Field> {
        let all = args.iter().all(|f| f.as_f64().map(|v| v != 0.0).unwrap_or(false));
        Ok(Field::UInt64(all as u64))
    }
}

pub struct Or;
impl Function for Or {
    fn name(&self) -> &str {
        "or"
    }
    fn apply(&self, args: &[Field]) -> EngineResult<Field> {
        let any = args.iter().any(|f| f.as_f64().map(|v| v != 0.0).unwrap_or(false));
        Ok(Field::UInt64(any as u64))
    }
}

pub struct Not;
impl Function for Not {
    fn name(&self) -> &str {
        "not"
    }
    fn apply(&self, args: &[Field]) -> EngineResult<Field> {
        let [a] = args else {
            return Err(EngineError::new(ErrorCode::ParameterOutOfBound, "not takes 1 argument"));
        };
        Ok(Field::UInt64(!a.as_f64().map(|v| v != 0.0).unwrap_or(false) as u64))
    }
}

pub struct ToString;
impl Function for ToString {
    fn name(&self) -> &str {
        "toString"
    }
    fn apply(&self, args: &[Field]) -> EngineResult<Field> {
        let [a] = args else {
            return Err(EngineError::new(ErrorCode::ParameterOutOfBound, "toString takes 1 argument"));
        };
        Ok(Field::String(match a {
            Field::UInt64(v) => v.to_string(),
            Field::Int64(v) => v.to_string(),
            Field::Float64(v) => v.to_string(),
            Field::String(s) => s.clone(),
            Field::Null => "NULL".to_string(),
            Field::Array(items) => format!("{items:?}"),
        }))
    }
}

/// Name-keyed lookup table; `Action::ApplyFunction` resolves against one of
/// these rather than holding a function pointer directly, so a query plan
/// can be serialized/replayed without capturing closures.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self { functions: HashMap::new() }
    }

    pub fn register(&mut self, f: Arc<dyn Function>) {
        self.functions.insert(f.name().to_string(), f);
    }

    pub fn get(&self, name: &str) -> EngineResult<Arc<dyn Function>> {
        self.functions.get(name).cloned().ok_or_else(|| {
            EngineError::new(ErrorCode::UnknownIdentifier, format!("unknown function '{name}'"))
        })
    }

    /// The builtins every engine instance starts with; user-defined
    /// functions (none exist here — no UDF surface is in scope) would be
    /// `register`ed on top.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register(Arc::new(Plus));
        r.register(Arc::new(Minus));
        r.register(Arc::new(Multiply));
        r.register(Arc::new(Divide));
        r.register(Arc::new(Equals));
        r.register(Arc::new(NotEquals));
        r.register(Arc::new(Less));
        r.register(Arc::new(Greater));
        r.register(Arc::new(LessOrEquals));
        r.register(Arc::new(GreaterOrEquals));
        r.register(Arc::new(And));
        r.register(Arc::new(Or));
        r.register(Arc::new(Not));
        r.register(Arc::new(ToString));
        r
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
