use std::path::PathBuf;

/// Existence check for a candidate rewritten path.
///
/// The decision engine only needs a yes/no answer, so the filesystem sits
/// behind this trait and tests can substitute a canned probe.
pub trait TargetProbe: Send + Sync {
    /// Whether a file or directory exists at the document-root-relative path.
    fn exists(&self, rewritten_path: &str) -> bool;
}

/// Probe backed by the real document root. Read-only, a single stat per call.
#[derive(Debug, Clone)]
pub struct FsProbe {
    document_root: PathBuf,
}

impl FsProbe {
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
        }
    }
}

impl TargetProbe for FsProbe {
    fn exists(&self, rewritten_path: &str) -> bool {
        // Joining an absolute path would discard the root entirely.
        let relative = rewritten_path.trim_start_matches('/');
        self.document_root.join(relative).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_existing_file() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("app_v7.5.0")).unwrap();
        fs::write(root.path().join("app_v7.5.0/index.php"), "<?php").unwrap();

        let probe = FsProbe::new(root.path());
        assert!(probe.exists("/app_v7.5.0/index.php"));
    }

    #[test]
    fn finds_existing_directory() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("app_v7.5.0/ControlCenter")).unwrap();

        let probe = FsProbe::new(root.path());
        assert!(probe.exists("/app_v7.5.0/ControlCenter/"));
        assert!(probe.exists("/app_v7.5.0"));
    }

    #[test]
    fn missing_target_reports_false() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("app_v7.5.0")).unwrap();

        let probe = FsProbe::new(root.path());
        assert!(!probe.exists("/app_v7.5.0/ControlCenter/"));
        assert!(!probe.exists("/app_v7.4.0/index.php"));
    }
}
