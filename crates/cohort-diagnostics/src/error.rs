//! Run-level error types

use crate::{
    COH0001, COH0100, COH0101, COH0102, COH0103, COH0104, COH0105, COH0106, COH0107, COH0108,
    COH0109, COH0110, COH0302, COH0400, COH0401, COH0402, ErrorCode, SourceLocation, Span,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A run-stopping error rendered with location and context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} - {}", self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        if let Some(help) = &self.help {
            write!(f, " ({})", help)?;
        }
        Ok(())
    }
}

/// Main engine error type.
///
/// Every variant aborts the run. Configuration errors are raised while compiling a
/// study, before any patient data is touched.
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// Expression or date syntax error
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        expression: String,
        location: Option<SourceLocation>,
    },

    /// Unusable rule set (cycle, undeclared reference, bad constant)
    #[error("{code}: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        /// Declaration the error was raised for, if any
        variable: Option<String>,
        context: Option<String>,
    },

    /// A suppressed count leaked into an emitted value
    #[error("{code}: {message}")]
    Disclosure {
        code: ErrorCode,
        message: String,
        measure: String,
    },

    /// Internal or environment failure
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
    },

    /// The run was cancelled before all patients were dispatched
    #[error("COH0402: run cancelled")]
    Cancelled,
}

impl CohortError {
    /// Create a parse error
    pub fn parse(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            location: None,
        }
    }

    /// Create a parse error located at a byte offset of the expression
    pub fn parse_at_offset(message: impl Into<String>, expression: &str, offset: usize) -> Self {
        Self::Parse {
            code: COH0001,
            message: message.into(),
            expression: expression.to_string(),
            location: Some(SourceLocation::from_span(Span::point(offset), expression)),
        }
    }

    /// Create a configuration error
    pub fn config(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            variable: None,
            context: None,
        }
    }

    /// A variable (transitively) depends on itself. `cycle` lists the path with the
    /// first variable repeated at the end.
    pub fn cyclic_dependency(cycle: &[String]) -> Self {
        Self::Config {
            code: COH0102,
            message: format!("Cyclic dependency: {}", cycle.join(" -> ")),
            variable: cycle.first().cloned(),
            context: None,
        }
    }

    pub fn undeclared_variable(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        let name = name.into();
        let referenced_by = referenced_by.into();
        Self::Config {
            code: COH0100,
            message: format!("'{}' references undeclared variable '{}'", referenced_by, name),
            variable: Some(referenced_by),
            context: None,
        }
    }

    pub fn duplicate_variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Config {
            code: COH0101,
            message: format!("Variable '{}' is declared more than once", name),
            variable: Some(name),
            context: None,
        }
    }

    /// The expression of `variable` parsed but cannot be compiled
    pub fn expression_compile(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            code: COH0103,
            message: message.into(),
            variable: Some(variable.into()),
            context: None,
        }
    }

    pub fn division_by_zero(variable: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Config {
            code: COH0104,
            message: "Division by a constant zero".to_string(),
            variable: Some(variable.into()),
            context: Some(expression.into()),
        }
    }

    pub fn malformed_date_expression(
        variable: impl Into<String>,
        expression: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            code: COH0105,
            message: format!("Malformed date expression '{}': {}", expression.into(), reason.into()),
            variable: Some(variable.into()),
            context: None,
        }
    }

    pub fn unknown_codelist(variable: impl Into<String>, codelist: impl Into<String>) -> Self {
        Self::Config {
            code: COH0106,
            message: format!("Unknown codelist '{}'", codelist.into()),
            variable: Some(variable.into()),
            context: None,
        }
    }

    pub fn invalid_declaration(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            code: COH0107,
            message: message.into(),
            variable: Some(variable.into()),
            context: None,
        }
    }

    pub fn invalid_measure(measure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            code: COH0108,
            message: format!("Measure '{}': {}", measure.into(), message.into()),
            variable: None,
            context: None,
        }
    }

    pub fn invalid_codelist(message: impl Into<String>) -> Self {
        Self::config(COH0109, message)
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::config(COH0110, message)
    }

    /// Attach the declaration an error was raised for, keeping the innermost one
    pub fn in_variable(self, name: &str) -> Self {
        match self {
            Self::Config {
                code,
                message,
                variable: None,
                context,
            } => Self::Config {
                code,
                message,
                variable: Some(name.to_string()),
                context,
            },
            Self::Parse {
                code,
                message,
                expression,
                location,
            } => Self::Parse {
                code,
                message: format!("in '{}': {}", name, message),
                expression,
                location,
            },
            other => other,
        }
    }

    pub fn suppression_violation(measure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Disclosure {
            code: COH0401,
            message: message.into(),
            measure: measure.into(),
        }
    }

    pub fn patient_enumeration(message: impl Into<String>) -> Self {
        Self::System {
            code: COH0302,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::System {
            code: COH0400,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Disclosure { code, .. } => *code,
            Self::System { code, .. } => *code,
            Self::Cancelled => COH0402,
        }
    }

    /// True for errors raised while compiling a rule set
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Config { .. })
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse {
                code,
                message,
                location,
                ..
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(loc) = location {
                    diag = diag.with_location(loc.clone());
                }
                diag
            }
            Self::Config {
                code,
                message,
                variable,
                context,
            } => {
                let message = match variable {
                    Some(name) => format!("{} (variable '{}')", message, name),
                    None => message.clone(),
                };
                let mut diag = Diagnostic::error(*code, message);
                if let Some(ctx) = context {
                    diag = diag.with_help(ctx.clone());
                } else if let Some(help) = code.info().help {
                    diag = diag.with_help(help);
                }
                diag
            }
            Self::Disclosure {
                code,
                message,
                measure,
            } => Diagnostic::error(*code, format!("{} (measure '{}')", message, measure)),
            Self::System { code, message } => Diagnostic::error(*code, message.clone()),
            Self::Cancelled => Diagnostic::error(COH0402, "run cancelled"),
        }
    }
}
