use apl_array::{
    algorithm::{combine, monadic, permute, structure},
    Dimensions, Env, Value,
};
use quickcheck::quickcheck;

/// Up to four small axes
fn small_dims(sizes: &[u8]) -> Dimensions {
    Dimensions::new(sizes.iter().take(4).map(|&s| s as usize % 5))
}

fn same_elements(a: &Value, b: &Value, env: &Env) -> bool {
    a.dimensions() == b.dimensions() && a.to_longs(env).ok() == b.to_longs(env).ok()
}

quickcheck! {
    fn index_bijection(sizes: Vec<u8>) -> bool {
        let env = Env::default();
        let dims = small_dims(&sizes);
        (0..dims.content_size()).all(|p| {
            let position = dims.position_from_index(p);
            dims.index_from_position(&position, &env).ok() == Some(p)
        })
    }

    fn reshape_to_own_shape(data: Vec<i64>, rows: u8) -> bool {
        let env = Env::default();
        let rows = rows as usize % 4 + 1;
        let cols = data.len() / rows;
        let shape = Value::longs([rows as i64, cols as i64]);
        let matrix = structure::reshape(&shape, &Value::longs(data), &env).unwrap();
        let again = structure::reshape(&shape, &matrix, &env).unwrap();
        same_elements(&matrix, &again, &env)
    }

    fn take_then_drop_rebuilds(data: Vec<i64>, k: usize) -> bool {
        let env = Env::default();
        let k = (k % (data.len() + 1)) as i64;
        let source = Value::longs(data);
        let front = structure::take(&Value::Long(k), &source, &env).unwrap();
        let back = structure::drop(&Value::Long(k), &source, &env).unwrap();
        let joined = combine::concatenate(&front, &back, None, &env).unwrap();
        let tail = (source.size() as i64) - k;
        let back_first = structure::take(&Value::Long(-tail), &source, &env).unwrap();
        let front_last = structure::drop(&Value::Long(-tail), &source, &env).unwrap();
        let rejoined = combine::concatenate(&front_last, &back_first, None, &env).unwrap();
        same_elements(&joined, &source, &env) && same_elements(&rejoined, &source, &env)
    }

    fn rotate_round_trip(data: Vec<i64>, k: i32) -> bool {
        let env = Env::default();
        let source = Value::longs(data);
        let k = k as i64;
        let there = permute::rotate(&Value::Long(k), &source, 0, &env).unwrap();
        let back = permute::rotate(&Value::Long(-k), &there, 0, &env).unwrap();
        same_elements(&back, &source, &env)
    }

    fn transpose_involution(sizes: Vec<u8>, keys: Vec<u32>) -> bool {
        let env = Env::default();
        let mut sizes = sizes;
        sizes.truncate(4);
        if sizes.is_empty() {
            sizes.push(3);
        }
        let dims = small_dims(&sizes);
        let rank = dims.rank();
        let mut perm: Vec<usize> = (0..rank).collect();
        perm.sort_by_key(|&i| keys.get(i).copied().unwrap_or(0));
        let mut inverse = vec![0; rank];
        for (i, &p) in perm.iter().enumerate() {
            inverse[p] = i;
        }
        let as_axes = |axes: &[usize]| Value::longs(axes.iter().map(|&a| a as i64));
        let shape = Value::longs(dims.iter().map(|&d| d as i64));
        let n = monadic::iota(&Value::Long(dims.content_size() as i64), &env).unwrap();
        let source = structure::reshape(&shape, &n, &env).unwrap();
        let there = permute::transpose(&as_axes(&perm), &source, &env).unwrap();
        let back = permute::transpose(&as_axes(&inverse), &there, &env).unwrap();
        same_elements(&back, &source, &env)
    }
}
