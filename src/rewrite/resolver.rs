use anyhow::Result;
use tracing::debug;

use crate::config::RedirectConfig;
use super::parser::{split_remainder, PathParser};
use super::validator::{FsProbe, TargetProbe};
use super::{NotFoundReason, Outcome};

/// The rewrite decision engine.
///
/// Built once from configuration and shared across requests; holds no
/// per-request state, so concurrent use needs no synchronization. Every
/// decision is deterministic given the URI, the installed version, and the
/// probe's answer.
pub struct RewriteEngine {
    parser: PathParser,
    current_version: String,
    probe: Box<dyn TargetProbe>,
}

impl RewriteEngine {
    pub fn new(config: &RedirectConfig) -> Result<Self> {
        Self::with_probe(config, Box::new(FsProbe::new(&config.document_root)))
    }

    /// Construct with an explicit probe. Used by tests to avoid the disk.
    pub fn with_probe(config: &RedirectConfig, probe: Box<dyn TargetProbe>) -> Result<Self> {
        Ok(Self {
            parser: PathParser::new(&config.version_marker)?,
            current_version: config.current_version.clone(),
            probe,
        })
    }

    /// Decide the outcome for a sanitized request URI.
    ///
    /// The upstream rewrite layer only forwards URIs that already looked
    /// versioned, but that pre-filter is an optimization; the shape is
    /// re-checked here and any non-matching URI lands on not-found.
    pub fn decide(&self, uri: &str) -> Outcome {
        let Some(parsed) = self.parser.parse(uri) else {
            return Outcome::NotFound {
                reason: NotFoundReason::NoMatch,
            };
        };

        // Equal version means the resource genuinely does not exist in the
        // installed release; redirecting would loop through this handler.
        if parsed.version == self.current_version {
            debug!(uri, version = parsed.version, "URI already references the installed version");
            return Outcome::NotFound {
                reason: NotFoundReason::VersionCurrent,
            };
        }

        let split = split_remainder(parsed.remainder);
        let rewritten = format!("{}{}{}", parsed.prefix, self.current_version, split.path);

        if !self.probe.exists(&rewritten) {
            debug!(uri, target = %rewritten, "Rewritten target does not exist");
            return Outcome::NotFound {
                reason: NotFoundReason::TargetMissing,
            };
        }

        debug!(uri, target = %rewritten, "Rewriting stale version reference");
        Outcome::Redirect {
            location: format!("{}{}", rewritten, split.query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProbe {
        exists: bool,
    }

    impl TargetProbe for CannedProbe {
        fn exists(&self, _rewritten_path: &str) -> bool {
            self.exists
        }
    }

    #[derive(Clone)]
    struct RecordingProbe {
        seen: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl TargetProbe for RecordingProbe {
        fn exists(&self, rewritten_path: &str) -> bool {
            self.seen.lock().unwrap().push(rewritten_path.to_string());
            true
        }
    }

    fn config() -> RedirectConfig {
        RedirectConfig {
            current_version: "7.5.0".to_string(),
            document_root: "/var/www/app".to_string(),
            version_marker: "_v".to_string(),
            contact_email: "ops@example.org".to_string(),
            home_url: "/".to_string(),
        }
    }

    fn engine(exists: bool) -> RewriteEngine {
        RewriteEngine::with_probe(&config(), Box::new(CannedProbe { exists })).unwrap()
    }

    #[test]
    fn stale_version_with_existing_target_redirects() {
        let outcome = engine(true).decide("/app_v7.3.0/index.php?pid=22");
        assert_eq!(
            outcome,
            Outcome::Redirect {
                location: "/app_v7.5.0/index.php?pid=22".to_string()
            }
        );
    }

    #[test]
    fn current_version_is_not_found() {
        let outcome = engine(true).decide("/app_v7.5.0/index.php");
        assert_eq!(
            outcome,
            Outcome::NotFound {
                reason: NotFoundReason::VersionCurrent
            }
        );
    }

    #[test]
    fn missing_target_is_not_found() {
        let outcome = engine(false).decide("/app_v7.3.0/ControlCenter/");
        assert_eq!(
            outcome,
            Outcome::NotFound {
                reason: NotFoundReason::TargetMissing
            }
        );
    }

    #[test]
    fn unversioned_uri_is_not_found_without_probing() {
        // The probe answering true must not matter when the URI never parses.
        let outcome = engine(true).decide("/about.html");
        assert_eq!(
            outcome,
            Outcome::NotFound {
                reason: NotFoundReason::NoMatch
            }
        );
    }

    #[test]
    fn query_string_preserved_verbatim() {
        let outcome = engine(true).decide("/app_v7.3.0/index.php?pid=21&page=x&id=1");
        let Outcome::Redirect { location } = outcome else {
            panic!("expected redirect");
        };
        assert_eq!(location, "/app_v7.5.0/index.php?pid=21&page=x&id=1");
    }

    #[test]
    fn redirect_target_reparses_to_current_version() {
        let Outcome::Redirect { location } = engine(true).decide("/app_v7.3.0/index.php?pid=22")
        else {
            panic!("expected redirect");
        };

        let parser = PathParser::new("_v").unwrap();
        let reparsed = parser.parse(&location).unwrap();
        assert_eq!(reparsed.version, "7.5.0");
        assert_eq!(reparsed.remainder, "/index.php?pid=22");
    }

    #[test]
    fn probe_sees_path_without_query() {
        let probe = RecordingProbe {
            seen: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        let engine = RewriteEngine::with_probe(&config(), Box::new(probe.clone())).unwrap();
        engine.decide("/app_v7.3.0/index.php?pid=22");

        let seen = probe.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["/app_v7.5.0/index.php"]);
    }

    #[test]
    fn exact_string_comparison_not_semantic() {
        // "07.5.0" differs textually from "7.5.0", so it is rewritten.
        let outcome = engine(true).decide("/app_v07.5.0/index.php");
        assert_eq!(
            outcome,
            Outcome::Redirect {
                location: "/app_v7.5.0/index.php".to_string()
            }
        );
    }

    #[test]
    fn prefix_and_remainder_survive_rewrite() {
        let Outcome::Redirect { location } =
            engine(true).decide("/sites/app_v1.0.0/data/export.php?fmt=csv")
        else {
            panic!("expected redirect");
        };
        assert_eq!(location, "/sites/app_v7.5.0/data/export.php?fmt=csv");
    }
}
