//! The evaluation context threaded through view construction and element access

use std::{
    env,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

use crate::{AplError, AplResult, Dimensions, ErrorKind, Span};

/// Settings that affect evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// The largest element count any constructed array may have
    pub max_array_size: usize,
    /// The number of significant digits used when formatting doubles
    pub print_precision: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            max_array_size: u32::MAX as usize,
            print_precision: 10,
        }
    }
}

impl EnvConfig {
    pub const MAX_SIZE_VAR: &'static str = "APL_ARRAY_MAX_SIZE";
    pub const PRINT_PRECISION_VAR: &'static str = "APL_ARRAY_PRINT_PRECISION";
    /// Load the config, overriding defaults from environment variables
    pub fn from_env() -> Self {
        let mut config = EnvConfig::default();
        if let Some(size) = read_var(Self::MAX_SIZE_VAR) {
            config.max_array_size = size;
        }
        if let Some(precision) = read_var(Self::PRINT_PRECISION_VAR) {
            config.print_precision = precision;
        }
        config
    }
}

fn read_var(name: &str) -> Option<usize> {
    let text = env::var(name).ok()?;
    match text.trim().parse() {
        Ok(n) => Some(n),
        Err(e) => {
            log::warn!("Ignoring {name}={text:?}: {e}");
            None
        }
    }
}

/// A cloneable handle used to interrupt a running evaluation
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Ask the evaluation to stop at its next check
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    /// Clear a previous interrupt request
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The evaluation context
///
/// Cloning an `Env` is cheap. Clones share the config and interrupt flag.
#[derive(Debug, Clone, Default)]
pub struct Env {
    config: Arc<EnvConfig>,
    interrupt: InterruptHandle,
    span: Option<Span>,
}

impl Env {
    pub fn new(config: EnvConfig) -> Self {
        Env {
            config: Arc::new(config),
            interrupt: InterruptHandle::default(),
            span: None,
        }
    }
    /// Create a context configured from environment variables
    pub fn from_env() -> Self {
        Self::new(EnvConfig::from_env())
    }
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }
    /// Get a context that attributes errors to `span`
    pub fn at(&self, span: Span) -> Self {
        Env {
            span: Some(span),
            ..self.clone()
        }
    }
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }
    /// Create an error at this context's span
    pub fn error(&self, kind: ErrorKind, message: impl ToString) -> AplError {
        AplError::new(kind, message.to_string()).with_span(self.span.clone())
    }
    pub(crate) fn index_error(&self, index: usize, size: usize) -> AplError {
        self.error(
            ErrorKind::IndexOutOfBounds,
            format!("Index {index} is out of bounds for an array of size {size}"),
        )
        .with_index(index, size)
    }
    pub(crate) fn mismatch(&self, a: &Dimensions, b: &Dimensions) -> AplError {
        AplError::dimensions_mismatch(a, b).with_span(self.span.clone())
    }
    /// Fail if an interrupt has been requested
    pub fn check_interrupted(&self) -> AplResult {
        if self.interrupt.is_interrupted() {
            Err(self.error(ErrorKind::Interrupted, "Evaluation was interrupted"))
        } else {
            Ok(())
        }
    }
    /// Make sure an array with these dimensions may be constructed
    pub fn validate_size(&self, dims: &Dimensions) -> AplResult<usize> {
        match dims.checked_content_size() {
            Some(size) if size <= self.config.max_array_size => Ok(size),
            Some(size) => Err(self.error(
                ErrorKind::Dimensions,
                format!(
                    "An array of shape {dims} would have {size} elements, \
                    which is more than the maximum of {}",
                    self.config.max_array_size
                ),
            )),
            None => Err(self.error(
                ErrorKind::Dimensions,
                format!("An array of shape {dims} is too large"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_is_shared() {
        let env = Env::default();
        let other = env.at(Span::new(1, 1));
        env.interrupt_handle().interrupt();
        let err = other.check_interrupted().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert_eq!(err.span(), Some(&Span::new(1, 1)));
        env.interrupt_handle().clear();
        assert!(other.check_interrupted().is_ok());
    }

    #[test]
    fn size_limit() {
        let env = Env::new(EnvConfig {
            max_array_size: 100,
            ..EnvConfig::default()
        });
        assert_eq!(env.validate_size(&Dimensions::from([10, 10])).unwrap(), 100);
        let err = env.validate_size(&Dimensions::from([10, 11])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        assert!(env
            .validate_size(&Dimensions::from([usize::MAX, 2]))
            .is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: EnvConfig = serde_json::from_str(r#"{"print_precision": 4}"#).unwrap();
        assert_eq!(config.print_precision, 4);
        assert_eq!(config.max_array_size, EnvConfig::default().max_array_size);
    }
}
