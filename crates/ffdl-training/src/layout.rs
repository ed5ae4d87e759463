use std::path::{Path, PathBuf};

pub const DEFAULT_RESULT_PATH: &str = "/tmp/training_id.txt";

/// Local files a launch run produces inside its work directory.
///
/// Default layout is the process working directory:
/// `model.zip`, `manifest.yml` and the `ffdl` log CLI.
#[derive(Debug, Clone)]
pub struct WorkLayout {
    root: PathBuf,
}

impl WorkLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn model_archive_path(&self) -> PathBuf {
        self.root.join("model.zip")
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.yml")
    }

    #[must_use]
    pub fn log_cli_path(&self) -> PathBuf {
        self.root.join("ffdl")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = WorkLayout::new(temp.path().join("work"));
        layout.ensure_dirs().unwrap();

        assert!(layout.root().is_dir());
        assert!(layout.model_archive_path().ends_with("work/model.zip"));
        assert!(layout.manifest_path().ends_with("work/manifest.yml"));
        assert!(layout.log_cli_path().ends_with("work/ffdl"));
    }
}
