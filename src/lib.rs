/*!
Lazy multidimensional array values for APL-family language runtimes

Arrays are [`Value`]s whose elements are produced on demand by an
[`ArrayView`]. Builtins such as reshape, rotate, transpose and reduce
construct new views over their arguments instead of copying them, so long
chains of array operations only do work for the elements that are actually
read. [`Value::collapse`] forces a value into concrete storage.

```
use apl_array::{algorithm::{reduce, structure}, Env, Primitive, Value};

let env = Env::default();
let matrix = structure::reshape(&Value::longs([2, 3]), &Value::longs(1..=6), &env).unwrap();
let sums = reduce::reduce(Primitive::Add.into_ref(), &matrix, 1, &env).unwrap();
assert_eq!(sums.to_longs(&env).unwrap(), [6, 15]);
```
*/

pub mod algorithm;
pub mod array;
pub mod complex;
mod env;
mod error;
pub mod format;
pub mod function;
pub mod numeric;
pub mod pervade;
mod primitive;
mod shape;
pub mod storage;
mod value;

pub use {
    array::{Array, ArrayView, SpecialisedType},
    env::{Env, EnvConfig, InterruptHandle},
    error::{AplError, AplResult, ErrorKind, Overflow, Span},
    format::FormatStyle,
    function::{Function, FunctionRef, NativeFn, OptimisationFlags},
    primitive::Primitive,
    shape::Dimensions,
    value::{Symbol, Value, ValueKey},
};
