//! # Terminal status attached to a cancellation.
//!
//! [`Status`] is the immutable outcome value a context carries once it is
//! cancelled: an ok flag, a numeric code, and a human-readable message.
//! The context tree never inspects it — it only stores whatever was passed
//! to `cancel` and hands it back verbatim from `Context::status`.
//!
//! ## Construction
//! All shapes are covered by [`Status::new`] plus builder steps:
//! - `Status::default()` — ok, code 0, empty message
//! - `Status::new(false)` — not-ok, code 0, empty message
//! - `Status::new(false).with_code(7)`
//! - `Status::new(false).with_message("timeout")`
//! - `Status::new(false).with_code(7).with_message("timeout")`
//!
//! ## Provenance macros
//! [`format_status!`] and [`format_status_line!`] build a `Status` whose
//! message is the concatenation of arbitrary `Display` arguments plus the
//! call-site module path (and `#file:line` for the latter). Useful for
//! diagnostics; not part of the cancellation core's contract.
//!
//! ## Example
//! ```rust
//! use ctxtree::Status;
//!
//! let st = Status::new(false).with_code(7).with_message("timeout");
//! assert!(!st.ok());
//! assert_eq!(st.code(), 7);
//! assert_eq!(st.message(), "timeout");
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Immutable outcome value recorded at cancellation time.
///
/// Cheap to clone (`Arc<str>` message) and comparable, so tests and callers
/// can assert on the exact status that propagated through a subtree.
///
/// `Status` implements [`std::error::Error`] (`Display` is the message), so a
/// not-ok status can be propagated with `?` by callers that treat it as a
/// failure. The context tree itself never does — ok and not-ok statuses are
/// stored and returned identically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Status {
    ok: bool,
    code: i32,
    message: Arc<str>,
}

impl Default for Status {
    /// Returns the ok status: `ok = true`, `code = 0`, empty message.
    fn default() -> Self {
        Self::new(true)
    }
}

impl Status {
    /// Creates a status with the given ok flag, code 0 and an empty message.
    pub fn new(ok: bool) -> Self {
        Self {
            ok,
            code: 0,
            message: Arc::from(""),
        }
    }

    /// Sets the numeric code.
    #[inline]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Sets the human-readable message.
    #[inline]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns whether this status represents a successful outcome.
    #[inline]
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Returns the numeric code (0 unless set).
    #[inline]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the message (empty unless set).
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Builds a [`Status`] from an ok flag, a code and any number of `Display`
/// arguments, concatenated without separators and suffixed with `@` and the
/// call-site module path.
///
/// # Example
/// ```rust
/// use ctxtree::format_status;
///
/// let st = format_status!(false, 100, "attempt ", 3, " failed");
/// assert!(!st.ok());
/// assert_eq!(st.code(), 100);
/// assert!(st.message().starts_with("attempt 3 failed@"));
/// ```
#[macro_export]
macro_rules! format_status {
    ($ok:expr, $code:expr $(, $arg:expr)* $(,)?) => {{
        let mut message = ::std::string::String::new();
        $(message.push_str(&::std::format!("{}", $arg));)*
        message.push('@');
        message.push_str(::std::module_path!());
        $crate::Status::new($ok).with_code($code).with_message(message)
    }};
}

/// Same as [`format_status!`], additionally appending `#file:line` of the
/// call site to the message.
#[macro_export]
macro_rules! format_status_line {
    ($ok:expr, $code:expr $(, $arg:expr)* $(,)?) => {{
        let mut message = ::std::string::String::new();
        $(message.push_str(&::std::format!("{}", $arg));)*
        message.push('@');
        message.push_str(::std::module_path!());
        message.push('#');
        message.push_str(::std::file!());
        message.push(':');
        message.push_str(&::std::format!("{}", ::std::line!()));
        $crate::Status::new($ok).with_code($code).with_message(message)
    }};
}
