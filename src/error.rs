use std::{fmt, path::Path, sync::Arc};

use num::BigInt;
use thiserror::Error;

use crate::shape::Dimensions;

/// A location in source code
///
/// The array core never interprets spans. They are attached to errors so
/// that the front end can point at the offending code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: Option<Arc<Path>>,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span {
            file: None,
            line,
            col,
        }
    }
    pub fn in_file(mut self, file: impl Into<Arc<Path>>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file.to_string_lossy())?;
        }
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The kind of an [`AplError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Shape mismatch, wrong rank, or an invalid axis size
    Dimensions,
    /// A flat index or coordinate outside the array
    IndexOutOfBounds,
    /// An axis argument that does not name an axis
    IllegalAxis,
    /// A value outside a function's domain
    Domain,
    /// An operand type a function does not support
    IncompatibleType,
    /// A 64-bit integer operation overflowed
    ///
    /// This is always recovered by promoting to arbitrary precision.
    ArithmeticOverflow,
    /// A function was called in a form it does not support
    Unimplemented,
    /// Evaluation was interrupted
    Interrupted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Dimensions => write!(f, "Dimensions error"),
            ErrorKind::IndexOutOfBounds => write!(f, "Index out of bounds"),
            ErrorKind::IllegalAxis => write!(f, "Illegal axis"),
            ErrorKind::Domain => write!(f, "Domain error"),
            ErrorKind::IncompatibleType => write!(f, "Incompatible type"),
            ErrorKind::ArithmeticOverflow => write!(f, "Arithmetic overflow"),
            ErrorKind::Unimplemented => write!(f, "Unimplemented"),
            ErrorKind::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// An error produced while building or reading array values
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}{}", span_suffix(.span))]
pub struct AplError {
    kind: ErrorKind,
    message: String,
    span: Option<Span>,
    index: Option<(usize, usize)>,
    overflow: Option<Arc<BigInt>>,
}

pub type AplResult<T = ()> = Result<T, AplError>;

impl AplError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        AplError {
            kind,
            message: message.into(),
            span: None,
            index: None,
            overflow: None,
        }
    }
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
    /// The offending index and the size it was checked against
    pub fn index(&self) -> Option<(usize, usize)> {
        self.index
    }
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        if self.span.is_none() {
            self.span = span;
        }
        self
    }
    pub fn with_index(mut self, index: usize, size: usize) -> Self {
        self.index = Some((index, size));
        self
    }
    pub(crate) fn dimensions_mismatch(a: &Dimensions, b: &Dimensions) -> Self {
        AplError::new(
            ErrorKind::Dimensions,
            format!("Dimensions {a} and {b} do not match"),
        )
    }
    /// Check if this error is a recoverable arithmetic overflow
    pub fn is_overflow(&self) -> bool {
        self.kind == ErrorKind::ArithmeticOverflow
    }
    /// Take the exact result carried by an arithmetic overflow
    pub fn into_overflow(mut self) -> Result<BigInt, Self> {
        if self.kind != ErrorKind::ArithmeticOverflow {
            return Err(self);
        }
        match self.overflow.take() {
            Some(big) => Ok(Arc::unwrap_or_clone(big)),
            None => Err(self),
        }
    }
}

fn span_suffix(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" (at {span})"),
        None => String::new(),
    }
}

/// A 64-bit integer operation that overflowed, with its exact result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow(pub BigInt);

impl From<Overflow> for AplError {
    fn from(Overflow(big): Overflow) -> Self {
        let mut error = AplError::new(
            ErrorKind::ArithmeticOverflow,
            format!("{big} does not fit in a 64-bit integer"),
        );
        error.overflow = Some(Arc::new(big));
        error
    }
}
