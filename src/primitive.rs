//! The elementwise builtin functions

use std::{fmt, sync::Arc};

use enum_iterator::{all, Sequence};

use crate::{
    algorithm::pervade,
    function::{Function, FunctionRef, OptimisationFlags},
    pervade::*,
    AplResult, Env, ErrorKind, Value,
};

/// An elementwise builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence)]
pub enum Primitive {
    // Dyadic
    Add,
    Sub,
    Mul,
    Div,
    Residue,
    Pow,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    // Monadic
    Neg,
    Abs,
    Not,
    Floor,
    Ceil,
    Signum,
    BitNot,
}

use Primitive::*;

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Add => "add",
            Sub => "subtract",
            Mul => "multiply",
            Div => "divide",
            Residue => "residue",
            Pow => "power",
            Min => "minimum",
            Max => "maximum",
            Eq => "equals",
            Ne => "not equals",
            Lt => "less than",
            Le => "less or equal",
            Gt => "greater than",
            Ge => "greater or equal",
            And => "and",
            Or => "or",
            BitAnd => "bitwise and",
            BitOr => "bitwise or",
            BitXor => "bitwise xor",
            Neg => "negate",
            Abs => "magnitude",
            Not => "not",
            Floor => "floor",
            Ceil => "ceiling",
            Signum => "signum",
            BitNot => "bitwise not",
        }
    }
    pub fn glyph(&self) -> Option<char> {
        Some(match self {
            Add => '+',
            Sub => '-',
            Mul => '×',
            Div => '÷',
            Residue => '|',
            Pow => '*',
            Min => '⌊',
            Max => '⌈',
            Eq => '=',
            Ne => '≠',
            Lt => '<',
            Le => '≤',
            Gt => '>',
            Ge => '≥',
            And => '∧',
            Or => '∨',
            Not => '~',
            _ => return None,
        })
    }
    pub fn from_name(name: &str) -> Option<Self> {
        all::<Primitive>().find(|prim| prim.name() == name)
    }
    pub fn is_monadic(&self) -> bool {
        matches!(self, Neg | Abs | Not | Floor | Ceil | Signum | BitNot)
    }
    pub fn flags(&self) -> OptimisationFlags {
        const LL: OptimisationFlags = OptimisationFlags::DYADIC_LONG_LONG;
        const DD: OptimisationFlags = OptimisationFlags::DYADIC_DOUBLE_DOUBLE;
        const ML: OptimisationFlags = OptimisationFlags::MONADIC_LONG;
        const MD: OptimisationFlags = OptimisationFlags::MONADIC_DOUBLE;
        match self {
            Add | Sub | Mul | Residue | Min | Max => LL.union(DD),
            Div => DD,
            Pow => OptimisationFlags::empty(),
            Eq | Ne | Lt | Le | Gt | Ge => LL,
            And | Or | BitAnd | BitOr | BitXor => LL,
            Neg | Abs => ML.union(MD),
            Not | Floor | Ceil | Signum | BitNot => ML,
        }
    }
    /// The identity element used when reducing an empty axis
    pub fn identity(&self) -> Option<Value> {
        Some(match self {
            Add | Sub | Residue | Ne | Lt | Gt | Or | BitOr | BitXor => Value::Long(0),
            Mul | Div | Pow | Eq | Le | Ge | And => Value::Long(1),
            BitAnd => Value::Long(-1),
            Min => Value::Double(f64::INFINITY),
            Max => Value::Double(f64::NEG_INFINITY),
            _ => return None,
        })
    }
    pub fn into_ref(self) -> FunctionRef {
        Arc::new(self)
    }
    fn wrong_arity(&self, env: &Env) -> crate::AplError {
        let form = if self.is_monadic() {
            "dyadically"
        } else {
            "monadically"
        };
        env.error(
            ErrorKind::Unimplemented,
            format!("{} cannot be called {form}", self.name()),
        )
    }
    /// Apply the builtin to one single value
    pub fn scalar1(&self, a: &Value, env: &Env) -> AplResult<Value> {
        match self {
            Neg => neg::generic(a, env),
            Abs => abs::generic(a, env),
            Not => not::generic(a, env),
            Floor => floor::generic(a, env),
            Ceil => ceil::generic(a, env),
            Signum => signum::generic(a, env),
            BitNot => bit_not::generic(a, env),
            _ => Err(self.wrong_arity(env)),
        }
    }
    /// Apply the builtin to two single values
    pub fn scalar2(&self, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        match self {
            Add => add::generic(a, b, env),
            Sub => sub::generic(a, b, env),
            Mul => mul::generic(a, b, env),
            Div => div::generic(a, b, env),
            Residue => residue::generic(a, b, env),
            Pow => pow::generic(a, b, env),
            Min => min::generic(a, b, env),
            Max => max::generic(a, b, env),
            Eq => is_eq::generic(a, b, env),
            Ne => is_ne::generic(a, b, env),
            Lt => is_lt::generic(a, b, env),
            Le => is_le::generic(a, b, env),
            Gt => is_gt::generic(a, b, env),
            Ge => is_ge::generic(a, b, env),
            And => and::generic(a, b, env),
            Or => or::generic(a, b, env),
            BitAnd => bit_and::generic(a, b, env),
            BitOr => bit_or::generic(a, b, env),
            BitXor => bit_xor::generic(a, b, env),
            _ => Err(self.wrong_arity(env)),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.glyph() {
            Some(glyph) => write!(f, "{glyph}"),
            None => write!(f, "{}", self.name()),
        }
    }
}

impl Function for Primitive {
    fn name(&self) -> &str {
        Primitive::name(self)
    }
    fn flags(&self) -> OptimisationFlags {
        Primitive::flags(self)
    }
    fn eval1(&self, a: &Value, env: &Env) -> AplResult<Value> {
        if !self.is_monadic() {
            return Err(self.wrong_arity(env));
        }
        pervade::monadic(*self, a, env)
    }
    fn eval2(&self, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        if self.is_monadic() {
            return Err(self.wrong_arity(env));
        }
        pervade::dyadic(*self, a, b, env)
    }
    fn eval1_long(&self, a: i64, env: &Env) -> AplResult<i64> {
        Ok(match self {
            Neg => neg::long(a)?,
            Abs => abs::long(a)?,
            Not => not::long(a, env)?,
            Floor => floor::long(a),
            Ceil => ceil::long(a),
            Signum => signum::long(a),
            BitNot => bit_not::long(a),
            _ => return Err(self.wrong_arity(env)),
        })
    }
    fn eval1_double(&self, a: f64, env: &Env) -> AplResult<f64> {
        match self {
            Neg => Ok(neg::double(a)),
            Abs => Ok(abs::double(a)),
            _ => self.scalar1(&Value::Double(a), env)?.ensure_double(env),
        }
    }
    fn eval2_long(&self, a: i64, b: i64, env: &Env) -> AplResult<i64> {
        Ok(match self {
            Add => add::long_long(a, b)?,
            Sub => sub::long_long(a, b)?,
            Mul => mul::long_long(a, b)?,
            Residue => residue::long_long(a, b),
            Min => min::long_long(a, b),
            Max => max::long_long(a, b),
            Eq => is_eq::long_long(a, b),
            Ne => is_ne::long_long(a, b),
            Lt => is_lt::long_long(a, b),
            Le => is_le::long_long(a, b),
            Gt => is_gt::long_long(a, b),
            Ge => is_ge::long_long(a, b),
            And => and::long_long(a, b, env)?,
            Or => or::long_long(a, b, env)?,
            BitAnd => bit_and::long_long(a, b),
            BitOr => bit_or::long_long(a, b),
            BitXor => bit_xor::long_long(a, b),
            _ => {
                let result = self.scalar2(&Value::Long(a), &Value::Long(b), env)?;
                return match result {
                    Value::BigInt(big) => {
                        Err(crate::Overflow(Arc::unwrap_or_clone(big)).into())
                    }
                    other => other.ensure_long(env),
                };
            }
        })
    }
    fn eval2_double(&self, a: f64, b: f64, env: &Env) -> AplResult<f64> {
        match self {
            Add => Ok(add::double_double(a, b)),
            Sub => Ok(sub::double_double(a, b)),
            Mul => Ok(mul::double_double(a, b)),
            Div => div::double_double(a, b, env),
            Residue => Ok(residue::double_double(a, b)),
            Min => min::double_double(a, b, env),
            Max => max::double_double(a, b, env),
            _ => self
                .scalar2(&Value::Double(a), &Value::Double(b), env)?
                .ensure_double(env),
        }
    }
    fn identity(&self) -> Option<Value> {
        Primitive::identity(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longs() -> [i64; 7] {
        [-7, -1, 0, 1, 2, 5, 1 << 40]
    }

    #[test]
    fn names_round_trip() {
        for prim in all::<Primitive>() {
            assert_eq!(Primitive::from_name(prim.name()), Some(prim));
        }
    }

    #[test]
    fn long_fast_paths_agree_with_generic() {
        let env = Env::default();
        for prim in all::<Primitive>() {
            let flags = prim.flags();
            for a in longs() {
                if flags.contains(OptimisationFlags::MONADIC_LONG) {
                    let generic = prim.scalar1(&Value::Long(a), &env);
                    let fast = prim.eval1_long(a, &env);
                    match (generic, fast) {
                        (Ok(g), Ok(f)) => assert!(matches!(g, Value::Long(n) if n == f), "{prim:?} {a}"),
                        (Err(_), Err(_)) => {}
                        (g, f) => panic!("{prim:?} {a}: {g:?} vs {f:?}"),
                    }
                }
                if !flags.contains(OptimisationFlags::DYADIC_LONG_LONG) {
                    continue;
                }
                for b in longs() {
                    let generic = prim.scalar2(&Value::Long(a), &Value::Long(b), &env);
                    let fast = prim.eval2_long(a, b, &env);
                    match (generic, fast) {
                        (Ok(g), Ok(f)) => {
                            assert!(matches!(g, Value::Long(n) if n == f), "{prim:?} {a} {b}")
                        }
                        (Ok(Value::BigInt(_)), Err(e)) => assert!(e.is_overflow()),
                        (Err(_), Err(_)) => {}
                        (g, f) => panic!("{prim:?} {a} {b}: {g:?} vs {f:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn double_fast_paths_agree_with_generic() {
        let env = Env::default();
        let doubles = [-2.5, 0.0, 1.0, 3.75, f64::NAN];
        for prim in all::<Primitive>() {
            if !prim.flags().contains(OptimisationFlags::DYADIC_DOUBLE_DOUBLE) {
                continue;
            }
            for a in doubles {
                for b in doubles {
                    let generic = prim.scalar2(&Value::Double(a), &Value::Double(b), &env);
                    let fast = prim.eval2_double(a, b, &env);
                    match (generic, fast) {
                        (Ok(g), Ok(f)) => {
                            let g = g.ensure_double(&env).unwrap();
                            assert!(g == f || g.is_nan() && f.is_nan(), "{prim:?} {a} {b}")
                        }
                        (Err(_), Err(_)) => {}
                        (g, f) => panic!("{prim:?} {a} {b}: {g:?} vs {f:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn extremes_of_nan_are_domain_errors() {
        let env = Env::default();
        for prim in [Min, Max] {
            let err = prim.eval2_double(f64::NAN, 1.0, &env).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Domain);
            let err = prim.eval2_double(1.0, f64::NAN, &env).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Domain);
        }
        assert_eq!(Max.eval2_double(-0.5, 2.0, &env).unwrap(), 2.0);
    }

    #[test]
    fn wrong_arity_is_unimplemented() {
        let env = Env::default();
        let err = Neg.eval2(&Value::Long(1), &Value::Long(2), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        let err = Add.eval1(&Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
    }
}
