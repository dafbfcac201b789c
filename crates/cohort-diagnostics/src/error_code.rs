//! Engine error codes following a structured numbering system
//!
//! Error code ranges:
//! - COH0001-COH0099: Parse errors (expression and date syntax)
//! - COH0100-COH0199: Configuration errors (graph build, declarations)
//! - COH0200-COH0299: Evaluation errors (per-patient, recovered)
//! - COH0300-COH0399: Event store errors (per-patient, recovered)
//! - COH0400-COH0499: Disclosure and system errors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_config_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_event_store_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COH{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(3, ErrorInfo::new("Invalid identifier"));
    map.insert(4, ErrorInfo::new("Invalid literal"));
    map.insert(5, ErrorInfo::new("Invalid date expression"));

    // Configuration errors (0100-0199)
    map.insert(100, ErrorInfo::new("Undeclared variable")
        .with_help("Declare the variable exactly once, either top-level or nested"));
    map.insert(101, ErrorInfo::new("Duplicate variable declaration"));
    map.insert(102, ErrorInfo::new("Cyclic variable dependency")
        .with_help("A variable may not depend on itself, directly or transitively"));
    map.insert(103, ErrorInfo::new("Expression compile error"));
    map.insert(104, ErrorInfo::new("Division by zero in constant expression"));
    map.insert(105, ErrorInfo::new("Malformed date expression"));
    map.insert(106, ErrorInfo::new("Unknown codelist"));
    map.insert(107, ErrorInfo::new("Invalid variable declaration"));
    map.insert(108, ErrorInfo::new("Invalid measure declaration"));
    map.insert(109, ErrorInfo::new("Invalid codelist"));
    map.insert(110, ErrorInfo::new("Invalid engine configuration"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Date resolution failed"));
    map.insert(201, ErrorInfo::new("Variable unresolved"));

    // Event store errors (0300-0399)
    map.insert(300, ErrorInfo::new("Event store query failed"));
    map.insert(301, ErrorInfo::new("Event store query timed out"));
    map.insert(302, ErrorInfo::new("Patient enumeration failed"));

    // Disclosure and system errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Suppression policy violation")
        .with_help("A suppressed count must never contribute to an emitted rate"));
    map.insert(402, ErrorInfo::new("Run cancelled"));

    map
});

// Parse errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);

// Configuration errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);
pub const COH0104: ErrorCode = ErrorCode::new(104);
pub const COH0105: ErrorCode = ErrorCode::new(105);
pub const COH0106: ErrorCode = ErrorCode::new(106);
pub const COH0107: ErrorCode = ErrorCode::new(107);
pub const COH0108: ErrorCode = ErrorCode::new(108);
pub const COH0109: ErrorCode = ErrorCode::new(109);
pub const COH0110: ErrorCode = ErrorCode::new(110);

// Evaluation errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);

// Event store errors
pub const COH0300: ErrorCode = ErrorCode::new(300);
pub const COH0301: ErrorCode = ErrorCode::new(301);
pub const COH0302: ErrorCode = ErrorCode::new(302);

// Disclosure and system errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
