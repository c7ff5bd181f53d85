//! Functions that array operations apply to elements

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use ecow::EcoString;

use crate::{AplError, AplResult, Env, ErrorKind, Value};

bitflags! {
    /// The unboxed fast paths a function supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptimisationFlags: u8 {
        const MONADIC_LONG = 1;
        const MONADIC_DOUBLE = 1 << 1;
        const DYADIC_LONG_LONG = 1 << 2;
        const DYADIC_DOUBLE_DOUBLE = 1 << 3;
    }
}

/// A function that can be applied to values
///
/// Only [`Function::name`] is required. Every evaluation form has a default
/// that either fails as unimplemented or falls back to the boxed form. The
/// unboxed forms are only called when [`Function::flags`] advertises them.
pub trait Function: Send + Sync {
    fn name(&self) -> &str;
    fn flags(&self) -> OptimisationFlags {
        OptimisationFlags::empty()
    }
    fn eval1(&self, a: &Value, env: &Env) -> AplResult<Value> {
        let _ = a;
        Err(unimplemented_form(self.name(), "monadically", env))
    }
    fn eval2(&self, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        let _ = (a, b);
        Err(unimplemented_form(self.name(), "dyadically", env))
    }
    fn eval1_long(&self, a: i64, env: &Env) -> AplResult<i64> {
        long_result(self.eval1(&Value::Long(a), env)?, env)
    }
    fn eval1_double(&self, a: f64, env: &Env) -> AplResult<f64> {
        self.eval1(&Value::Double(a), env)?.ensure_double(env)
    }
    /// Apply the function to two longs
    ///
    /// A result that does not fit 64 bits is an arithmetic overflow error
    /// carrying the exact result.
    fn eval2_long(&self, a: i64, b: i64, env: &Env) -> AplResult<i64> {
        long_result(self.eval2(&Value::Long(a), &Value::Long(b), env)?, env)
    }
    fn eval2_double(&self, a: f64, b: f64, env: &Env) -> AplResult<f64> {
        self.eval2(&Value::Double(a), &Value::Double(b), env)?
            .ensure_double(env)
    }
    /// The value reducing an empty axis produces
    fn identity(&self) -> Option<Value> {
        None
    }
}

pub type FunctionRef = Arc<dyn Function>;

fn unimplemented_form(name: &str, form: &str, env: &Env) -> AplError {
    env.error(
        ErrorKind::Unimplemented,
        format!("{name} cannot be called {form}"),
    )
}

/// Read a result through the long accessor, reporting big integers as overflow
pub(crate) fn long_result(value: Value, env: &Env) -> AplResult<i64> {
    match value {
        Value::Long(n) => Ok(n),
        Value::BigInt(big) => Err(crate::Overflow(Arc::unwrap_or_clone(big)).into()),
        value => value.ensure_long(env),
    }
}

type Monadic = dyn Fn(&Value, &Env) -> AplResult<Value> + Send + Sync;
type Dyadic = dyn Fn(&Value, &Value, &Env) -> AplResult<Value> + Send + Sync;

/// A function defined by Rust closures
#[derive(Clone)]
pub struct NativeFn {
    name: EcoString,
    monadic: Option<Arc<Monadic>>,
    dyadic: Option<Arc<Dyadic>>,
    identity: Option<Value>,
}

impl NativeFn {
    pub fn new(name: impl Into<EcoString>) -> Self {
        NativeFn {
            name: name.into(),
            monadic: None,
            dyadic: None,
            identity: None,
        }
    }
    pub fn monadic(
        mut self,
        f: impl Fn(&Value, &Env) -> AplResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.monadic = Some(Arc::new(f));
        self
    }
    pub fn dyadic(
        mut self,
        f: impl Fn(&Value, &Value, &Env) -> AplResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.dyadic = Some(Arc::new(f));
        self
    }
    pub fn with_identity(mut self, identity: impl Into<Value>) -> Self {
        self.identity = Some(identity.into());
        self
    }
    pub fn into_ref(self) -> FunctionRef {
        Arc::new(self)
    }
}

impl Function for NativeFn {
    fn name(&self) -> &str {
        &self.name
    }
    fn eval1(&self, a: &Value, env: &Env) -> AplResult<Value> {
        match &self.monadic {
            Some(f) => f(a, env),
            None => Err(unimplemented_form(&self.name, "monadically", env)),
        }
    }
    fn eval2(&self, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        match &self.dyadic {
            Some(f) => f(a, b, env),
            None => Err(unimplemented_form(&self.name, "dyadically", env)),
        }
    }
    fn identity(&self) -> Option<Value> {
        self.identity.clone()
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_forms_are_unimplemented() {
        let env = Env::default();
        let f = NativeFn::new("first").monadic(|a, env| a.value_at(0, env));
        assert!(f.eval1(&Value::longs([4, 5]), &env).is_ok());
        let err = f.eval2(&Value::Long(1), &Value::Long(2), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert!(err.message().contains("first"));
    }

    #[test]
    fn unboxed_forms_fall_back() {
        let env = Env::default();
        let f = NativeFn::new("plus")
            .dyadic(|a, b, env| crate::Primitive::Add.eval2(a, b, env))
            .with_identity(0i64);
        assert_eq!(f.eval2_long(2, 3, &env).unwrap(), 5);
        assert!(f.eval2_long(i64::MAX, 1, &env).unwrap_err().is_overflow());
        assert_eq!(f.eval2_double(0.5, 0.25, &env).unwrap(), 0.75);
        assert!(f.flags().is_empty());
        assert!(matches!(f.identity(), Some(Value::Long(0))));
    }
}
