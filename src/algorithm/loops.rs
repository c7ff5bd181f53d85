//! Each

use crate::{
    array::{Array, ArrayView},
    AplResult, Dimensions, Env, FunctionRef, Value,
};

/// Call a function on `each` element of a value
///
/// Unlike the elementwise builtins, the function sees whole elements, so
/// nested arrays are passed to it intact.
pub fn each(f: FunctionRef, a: &Value, env: &Env) -> AplResult<Value> {
    if !a.is_array() {
        return f.eval1(a, env);
    }
    log::trace!("each {} over {a:?}", f.name());
    Ok(Value::Array(Array::new(Each {
        f,
        source: a.clone(),
    })))
}

struct Each {
    f: FunctionRef,
    source: Value,
}

impl ArrayView for Each {
    fn name(&self) -> &'static str {
        "each"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let a = self.source.value_at(index, env)?;
        self.f.eval1(&a, env)
    }
}

/// Call a function on corresponding elements of two values
///
/// A rank-0 operand is paired with every element of the other. Otherwise
/// both operands must have the same shape.
pub fn each2(f: FunctionRef, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
    if !a.is_array() && !b.is_array() {
        return f.eval2(a, b, env);
    }
    let dims = if a.rank() == 0 {
        b.dimensions().clone()
    } else if b.rank() == 0 || a.dimensions() == b.dimensions() {
        a.dimensions().clone()
    } else {
        return Err(env.mismatch(a.dimensions(), b.dimensions()));
    };
    log::trace!("each {} over {a:?} and {b:?}", f.name());
    Ok(Value::Array(Array::new(Each2 {
        f,
        a: a.clone(),
        b: b.clone(),
        dims,
    })))
}

struct Each2 {
    f: FunctionRef,
    a: Value,
    b: Value,
    dims: Dimensions,
}

impl ArrayView for Each2 {
    fn name(&self) -> &'static str {
        "each"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let i = if self.a.rank() == 0 { 0 } else { index };
        let j = if self.b.rank() == 0 { 0 } else { index };
        let a = self.a.value_at(i, env)?;
        let b = self.b.value_at(j, env)?;
        self.f.eval2(&a, &b, env)
    }
}
