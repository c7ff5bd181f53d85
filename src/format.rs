//! Turning values into text for consumers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{complex::Complex, AplResult, Env, Value};

/// How [`Value::formatted`] renders a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormatStyle {
    /// APL display form: space-separated elements, high minus for negatives
    #[default]
    Plain,
    /// Source-like text with brackets, commas and quoted characters
    Readable,
    /// A grid with aligned columns and boxed nested arrays
    Pretty,
}

impl Value {
    /// Format the value as text
    ///
    /// Doubles are shown with the environment's print precision in
    /// significant digits. Every element is read, so errors raised by lazy
    /// views surface here.
    pub fn formatted(&self, style: FormatStyle, env: &Env) -> AplResult<String> {
        let precision = env.config().print_precision.max(1);
        let fmt = Formatter { precision, env };
        match style {
            FormatStyle::Plain => fmt.plain(self),
            FormatStyle::Readable => fmt.readable(self),
            FormatStyle::Pretty => Ok(grid_string(fmt.grid(self)?)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formatted(FormatStyle::Plain, &Env::default()) {
            Ok(s) => write!(f, "{s}"),
            Err(e) => write!(f, "<{e}>"),
        }
    }
}

type Grid = Vec<Vec<char>>;

struct Formatter<'a> {
    precision: usize,
    env: &'a Env,
}

impl Formatter<'_> {
    fn scalar(&self, value: &Value, style: FormatStyle) -> String {
        let text = match value {
            Value::Long(n) => n.to_string(),
            Value::Double(d) => self.double(*d, style),
            Value::Complex(Complex { re, im }) => {
                if *im == 0.0 {
                    self.double(*re, style)
                } else {
                    format!("{}J{}", self.double(*re, style), self.double(*im, style))
                }
            }
            Value::BigInt(b) => b.to_string(),
            Value::Rational(r) => format!("{}r{}", r.numer(), r.denom()),
            Value::Char(c) if style == FormatStyle::Readable => return format!("{c:?}"),
            Value::Char(c) => return c.to_string(),
            Value::Symbol(sym) => return sym.to_string(),
            Value::Array(array) => return format!("{array:?}"),
        };
        match style {
            FormatStyle::Readable => text,
            _ => text.replace('-', "¯"),
        }
    }

    fn double(&self, d: f64, style: FormatStyle) -> String {
        let text = format_double(d, self.precision);
        if style == FormatStyle::Readable && d.is_finite() && !text.contains(['.', 'E']) {
            format!("{text}.0")
        } else {
            text
        }
    }

    fn elements(&self, value: &Value) -> AplResult<Vec<Value>> {
        (0..value.size())
            .map(|i| {
                self.env.check_interrupted()?;
                value.value_at(i, self.env)
            })
            .collect()
    }

    fn plain(&self, value: &Value) -> AplResult<String> {
        if !value.is_array() {
            return Ok(self.scalar(value, FormatStyle::Plain));
        }
        let dims = value.dimensions();
        let values = self.elements(value)?;
        if dims.is_scalar() {
            return self.plain_element(&values[0]);
        }
        let row_len = dims.last().copied().unwrap_or(1).max(1);
        let chars = all_chars(&values);
        let mut out = String::new();
        for (r, row) in values.chunks(row_len).enumerate() {
            if r > 0 {
                out.push('\n');
                out.extend(std::iter::repeat('\n').take(separators(dims, r)));
            }
            if chars {
                out.extend(row.iter().map(|v| self.scalar(v, FormatStyle::Plain)));
                continue;
            }
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&self.plain_element(v)?);
            }
        }
        Ok(out)
    }

    fn plain_element(&self, value: &Value) -> AplResult<String> {
        if value.is_array() {
            Ok(format!("({})", self.plain(value)?))
        } else {
            Ok(self.scalar(value, FormatStyle::Plain))
        }
    }

    fn readable(&self, value: &Value) -> AplResult<String> {
        if !value.is_array() {
            return Ok(self.scalar(value, FormatStyle::Readable));
        }
        let dims = value.dimensions();
        let values = self.elements(value)?;
        if dims.is_scalar() {
            return Ok(format!("⊂{}", self.readable(&values[0])?));
        }
        if values.is_empty() && dims.rank() > 1 {
            let shape: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            return Ok(format!("reshape([{}], [])", shape.join(", ")));
        }
        self.readable_cells(&values, &dims[..])
    }

    fn readable_cells(&self, values: &[Value], dims: &[usize]) -> AplResult<String> {
        if dims.len() > 1 {
            let cell_size: usize = dims[1..].iter().product();
            let cells = (values.chunks(cell_size))
                .map(|cell| self.readable_cells(cell, &dims[1..]))
                .collect::<AplResult<Vec<_>>>()?;
            return Ok(format!("[{}]", cells.join(", ")));
        }
        if all_chars(values) {
            let s: String = (values.iter())
                .filter_map(|v| match v {
                    Value::Char(c) => Some(*c),
                    _ => None,
                })
                .collect();
            return Ok(format!("{s:?}"));
        }
        let items = (values.iter())
            .map(|v| self.readable(v))
            .collect::<AplResult<Vec<_>>>()?;
        Ok(format!("[{}]", items.join(", ")))
    }

    fn grid(&self, value: &Value) -> AplResult<Grid> {
        if !value.is_array() {
            return Ok(vec![self.scalar(value, FormatStyle::Pretty).chars().collect()]);
        }
        let dims = value.dimensions();
        let values = self.elements(value)?;
        if dims.is_scalar() {
            return self.element_grid(&values[0]);
        }
        if values.is_empty() {
            return Ok(Grid::new());
        }
        if dims.rank() == 1 && all_chars(&values) {
            return Ok(vec![(values.iter())
                .map(|v| self.scalar(v, FormatStyle::Pretty))
                .collect::<String>()
                .chars()
                .collect()]);
        }
        // Lay the elements out in a grid of cells
        let columns = dims.last().copied().unwrap_or(1).max(1);
        let cells = (values.iter())
            .map(|v| Ok((self.element_grid(v)?, is_number(v))))
            .collect::<AplResult<Vec<_>>>()?;
        let mut widths = vec![0; columns];
        for (i, (cell, _)) in cells.iter().enumerate() {
            widths[i % columns] = widths[i % columns].max(grid_width(cell));
        }
        let mut grid = Grid::new();
        for (r, row) in cells.chunks(columns).enumerate() {
            if r > 0 {
                grid.extend(std::iter::repeat(Vec::new()).take(separators(dims, r)));
            }
            let height = row.iter().map(|(cell, _)| cell.len()).max().unwrap_or(0);
            for line in 0..height {
                let mut out = Vec::new();
                for (c, (cell, right)) in row.iter().enumerate() {
                    if c > 0 {
                        out.push(' ');
                    }
                    let text = cell.get(line).map(Vec::as_slice).unwrap_or_default();
                    let pad = widths[c] - text.len();
                    if *right {
                        out.extend(std::iter::repeat(' ').take(pad));
                        out.extend(text);
                    } else {
                        out.extend(text);
                        out.extend(std::iter::repeat(' ').take(pad));
                    }
                }
                grid.push(out);
            }
        }
        Ok(grid)
    }

    fn element_grid(&self, value: &Value) -> AplResult<Grid> {
        let grid = self.grid(value)?;
        Ok(if value.is_array() { boxed(grid) } else { grid })
    }
}

/// Format a double with at most `precision` significant digits
///
/// Very large and very small magnitudes use an `E` exponent.
pub fn format_double(d: f64, precision: usize) -> String {
    if d.is_nan() {
        return "NaN".into();
    }
    if d.is_infinite() {
        return if d > 0.0 { "∞" } else { "-∞" }.into();
    }
    if d == 0.0 {
        return "0".into();
    }
    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, d);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -5 || exponent >= precision as i32 {
        return format!("{}E{exponent}", trim_fraction(mantissa));
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{d:.decimals$}")).into()
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn all_chars(values: &[Value]) -> bool {
    !values.is_empty() && values.iter().all(|v| matches!(v, Value::Char(_)))
}

fn is_number(value: &Value) -> bool {
    !matches!(value, Value::Char(_) | Value::Symbol(_) | Value::Array(_))
}

/// The number of blank lines before row `r` of a value laid out by rows
fn separators(dims: &[usize], r: usize) -> usize {
    let rank = dims.len();
    if rank < 3 {
        return 0;
    }
    let mut blanks = 0;
    let mut block = dims[rank - 2].max(1);
    for axis in (0..rank - 2).rev() {
        if r % block != 0 {
            break;
        }
        blanks += 1;
        block *= dims[axis].max(1);
    }
    blanks
}

fn grid_width(grid: &Grid) -> usize {
    grid.iter().map(Vec::len).max().unwrap_or(0)
}

fn boxed(grid: Grid) -> Grid {
    let width = grid_width(&grid);
    let edge = |left, right| {
        let mut row = vec![left];
        row.extend(std::iter::repeat('─').take(width));
        row.push(right);
        row
    };
    let mut out = vec![edge('┌', '┐')];
    for mut row in grid {
        row.resize(width, ' ');
        row.insert(0, '│');
        row.push('│');
        out.push(row);
    }
    out.push(edge('└', '┘'));
    out
}

fn grid_string(grid: Grid) -> String {
    let lines: Vec<String> = (grid.into_iter())
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect();
    lines.join("\n")
}
