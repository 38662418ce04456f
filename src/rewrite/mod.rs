pub mod parser;
pub mod resolver;
pub mod validator;

pub use parser::{PathParser, ParsedPath, SplitRemainder};
pub use resolver::RewriteEngine;
pub use validator::{FsProbe, TargetProbe};

/// Terminal outcome of a rewrite decision.
///
/// Exactly two outcomes are observable per request: a redirect to the
/// rewritten location, or the not-found response. The reason carried by
/// `NotFound` exists for logs and metrics only and is never surfaced to the
/// client as a distinguishable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Redirect { location: String },
    NotFound { reason: NotFoundReason },
}

/// Why a request fell through to the not-found response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// URI does not fit the versioned-path shape. The common case.
    NoMatch,
    /// URI version equals the installed version; redirecting would loop.
    VersionCurrent,
    /// Rewritten path does not exist under the document root.
    TargetMissing,
}

impl NotFoundReason {
    /// Stable label used for metrics and access log entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundReason::NoMatch => "no_match",
            NotFoundReason::VersionCurrent => "version_current",
            NotFoundReason::TargetMissing => "target_missing",
        }
    }
}
