// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error taxonomy, error scopes and uncaptured-error routing.

use super::api::shader::{CompilationMessage, CompilationMessageType};
use super::api::util::ShaderStage;
use std::fmt;

/// Result alias used by every fallible `Gfx*` call.
pub type GfxResult<T> = Result<T, GfxError>;

/// Coarse classification of a [`GfxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The call broke an API rule (bad descriptor, stale id, wrong state).
    Validation,
    /// The implementation could not allocate.
    OutOfMemory,
    /// The native API failed for a reason outside the caller's control.
    Internal,
    /// The device is lost or destroyed.
    DeviceLost,
    /// The backend cannot express the request.
    Unsupported,
    /// A shader stage failed to compile or link.
    ShaderCompilation,
    /// A pipeline could not be built from valid modules.
    PipelineCreation,
}

impl ErrorKind {
    /// Stable lowercase name (`"out-of-memory"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::OutOfMemory => "out-of-memory",
            ErrorKind::Internal => "internal",
            ErrorKind::DeviceLost => "device-lost",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::ShaderCompilation => "shader-compilation",
            ErrorKind::PipelineCreation => "pipeline-creation",
        }
    }

    /// The error-scope filter that captures this kind.
    ///
    /// Device loss is delivered through the lost signal and never enters a scope.
    pub fn filter(self) -> Option<ErrorFilter> {
        match self {
            ErrorKind::Validation
            | ErrorKind::Unsupported
            | ErrorKind::ShaderCompilation
            | ErrorKind::PipelineCreation => Some(ErrorFilter::Validation),
            ErrorKind::OutOfMemory => Some(ErrorFilter::OutOfMemory),
            ErrorKind::Internal => Some(ErrorFilter::Internal),
            ErrorKind::DeviceLost => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every error a `Gfx*` call can return.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxError {
    /// See [`ErrorKind::Validation`].
    Validation(String),
    /// See [`ErrorKind::OutOfMemory`].
    OutOfMemory(String),
    /// See [`ErrorKind::Internal`].
    Internal(String),
    /// See [`ErrorKind::DeviceLost`].
    DeviceLost(String),
    /// See [`ErrorKind::Unsupported`].
    Unsupported(String),
    /// A shader failed to compile or a program failed to link.
    ShaderCompilation {
        /// Stage that failed, `None` for link failures.
        stage: Option<ShaderStage>,
        /// Summary line.
        message: String,
        /// Structured diagnostics parsed from the driver log.
        diagnostics: Vec<CompilationMessage>,
    },
    /// A pipeline could not be created.
    PipelineCreation {
        /// Label of the pipeline descriptor.
        label: Option<String>,
        /// Summary line.
        message: String,
    },
}

impl GfxError {
    /// Builds a [`GfxError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        GfxError::Validation(message.into())
    }

    /// Builds a [`GfxError::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        GfxError::Unsupported(message.into())
    }

    /// Builds a [`GfxError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        GfxError::Internal(message.into())
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GfxError::Validation(_) => ErrorKind::Validation,
            GfxError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            GfxError::Internal(_) => ErrorKind::Internal,
            GfxError::DeviceLost(_) => ErrorKind::DeviceLost,
            GfxError::Unsupported(_) => ErrorKind::Unsupported,
            GfxError::ShaderCompilation { .. } => ErrorKind::ShaderCompilation,
            GfxError::PipelineCreation { .. } => ErrorKind::PipelineCreation,
        }
    }

    /// Human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            GfxError::Validation(m)
            | GfxError::OutOfMemory(m)
            | GfxError::Internal(m)
            | GfxError::DeviceLost(m)
            | GfxError::Unsupported(m) => m,
            GfxError::ShaderCompilation { message, .. }
            | GfxError::PipelineCreation { message, .. } => message,
        }
    }

    /// Diagnostics carried by a shader error; empty for other kinds.
    pub fn diagnostics(&self) -> &[CompilationMessage] {
        match self {
            GfxError::ShaderCompilation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::ShaderCompilation {
                stage, diagnostics, ..
            } => {
                match stage {
                    Some(stage) => write!(f, "shader-compilation ({stage:?}): {}", self.message())?,
                    None => write!(f, "shader-compilation (link): {}", self.message())?,
                }
                let errors = diagnostics
                    .iter()
                    .filter(|d| d.severity == CompilationMessageType::Error)
                    .count();
                if errors > 0 {
                    write!(f, " [{errors} error(s)]")?;
                }
                Ok(())
            }
            GfxError::PipelineCreation {
                label: Some(label), ..
            } => write!(f, "pipeline-creation '{label}': {}", self.message()),
            _ => write!(f, "{}: {}", self.kind(), self.message()),
        }
    }
}

impl std::error::Error for GfxError {}

/// Filter of an error scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFilter {
    /// Captures validation, unsupported, shader and pipeline errors.
    Validation,
    /// Captures allocation failures.
    OutOfMemory,
    /// Captures internal native failures.
    Internal,
}

impl ErrorFilter {
    /// `true` when an error of `kind` is captured by this filter.
    pub fn matches(self, kind: ErrorKind) -> bool {
        kind.filter() == Some(self)
    }
}

/// Callback receiving errors no scope captured.
pub type UncapturedErrorHandler = Box<dyn Fn(&GfxError)>;

#[derive(Debug)]
struct ErrorScope {
    filter: ErrorFilter,
    error: Option<GfxError>,
}

/// The device-owned LIFO stack of error scopes.
///
/// [`report`](Self::report) routes an error to the innermost scope whose
/// filter matches; each scope keeps the first error it receives. Errors no
/// scope captures go to the uncaptured handler, and are logged when
/// `log_uncaptured` is set.
pub struct ErrorScopeStack {
    scopes: Vec<ErrorScope>,
    handler: Option<UncapturedErrorHandler>,
    log_uncaptured: bool,
}

impl fmt::Debug for ErrorScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorScopeStack")
            .field("scopes", &self.scopes)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl Default for ErrorScopeStack {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ErrorScopeStack {
    /// Creates an empty stack.
    pub fn new(log_uncaptured: bool) -> Self {
        Self {
            scopes: Vec::new(),
            handler: None,
            log_uncaptured,
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Opens a scope.
    pub fn push(&mut self, filter: ErrorFilter) {
        self.scopes.push(ErrorScope {
            filter,
            error: None,
        });
    }

    /// Closes the innermost scope and returns the first error it captured.
    pub fn pop(&mut self) -> GfxResult<Option<GfxError>> {
        match self.scopes.pop() {
            Some(scope) => Ok(scope.error),
            None => Err(GfxError::validation("pop_error_scope called on an empty error scope stack")),
        }
    }

    /// Filter of the innermost scope.
    pub fn innermost_filter(&self) -> Option<ErrorFilter> {
        self.scopes.last().map(|s| s.filter)
    }

    /// Routes `error`; returns `true` when a scope captured it.
    pub fn report(&mut self, error: &GfxError) -> bool {
        let Some(filter) = error.kind().filter() else {
            return false;
        };
        if let Some(scope) = self.scopes.iter_mut().rev().find(|s| s.filter == filter) {
            if scope.error.is_none() {
                scope.error = Some(error.clone());
            }
            return true;
        }
        if self.log_uncaptured {
            log::error!("Uncaptured GPU error: {error}");
        }
        if let Some(handler) = &self.handler {
            handler(error);
        }
        false
    }

    /// Installs the uncaptured-error callback, replacing any previous one.
    pub fn set_uncaptured_handler(&mut self, handler: UncapturedErrorHandler) {
        self.handler = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn kinds_map_to_filters() {
        assert_eq!(ErrorKind::ShaderCompilation.filter(), Some(ErrorFilter::Validation));
        assert_eq!(ErrorKind::Unsupported.filter(), Some(ErrorFilter::Validation));
        assert_eq!(ErrorKind::OutOfMemory.filter(), Some(ErrorFilter::OutOfMemory));
        assert_eq!(ErrorKind::DeviceLost.filter(), None);
        assert!(ErrorFilter::Internal.matches(ErrorKind::Internal));
    }

    #[test]
    fn pop_on_empty_stack_is_validation() {
        let mut stack = ErrorScopeStack::new(false);
        let err = stack.pop().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn innermost_matching_scope_keeps_first_error() {
        let mut stack = ErrorScopeStack::new(false);
        stack.push(ErrorFilter::Validation);
        stack.push(ErrorFilter::OutOfMemory);

        assert!(stack.report(&GfxError::validation("first")));
        assert!(stack.report(&GfxError::validation("second")));
        assert!(stack.report(&GfxError::OutOfMemory("oom".into())));

        let oom = stack.pop().unwrap().unwrap();
        assert_eq!(oom.kind(), ErrorKind::OutOfMemory);
        let validation = stack.pop().unwrap().unwrap();
        assert_eq!(validation.message(), "first");
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn unmatched_errors_reach_the_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut stack = ErrorScopeStack::new(false);
        let sink = seen.clone();
        stack.set_uncaptured_handler(Box::new(move |e| sink.borrow_mut().push(e.kind())));
        stack.push(ErrorFilter::OutOfMemory);

        assert!(!stack.report(&GfxError::internal("driver")));
        assert!(!stack.report(&GfxError::DeviceLost("gone".into())));
        assert_eq!(*seen.borrow(), vec![ErrorKind::Internal]);
        assert_eq!(stack.pop().unwrap(), None);
    }

    #[test]
    fn display_includes_kind() {
        let err = GfxError::unsupported("resolve targets");
        assert_eq!(err.to_string(), "unsupported: resolve targets");
        let shader = GfxError::ShaderCompilation {
            stage: Some(ShaderStage::Fragment),
            message: "compile failed".into(),
            diagnostics: Vec::new(),
        };
        assert_eq!(shader.to_string(), "shader-compilation (Fragment): compile failed");
    }
}
