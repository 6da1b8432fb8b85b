//! Runtime directory layout.
//!
//! A fixed set of top-level directories is guaranteed to exist after
//! provisioning. Creation is idempotent; a directory that already exists is
//! not an error, and a directory that cannot be created is reported without
//! aborting the run.

use std::path::{Path, PathBuf};

use crate::ui::UserInterface;

/// Where recordings are dropped for analysis.
pub const DATA_DIR: &str = "flight_recordings";

/// Analysis output.
pub const OUTPUT_DIR: &str = "results";

/// Transient artifacts (derived manifests and the like); not stable
/// across runs.
pub const SCRATCH_DIR: &str = ".tmp";

/// Log files and the provisioning report.
pub const LOGS_DIR: &str = "logs";

/// All directories guaranteed to exist after provisioning.
pub const RUNTIME_DIRS: [&str; 4] = [DATA_DIR, OUTPUT_DIR, SCRATCH_DIR, LOGS_DIR];

/// Scratch directory under a project root.
pub fn scratch_dir(project_root: &Path) -> PathBuf {
    project_root.join(SCRATCH_DIR)
}

/// Logs directory under a project root.
pub fn logs_dir(project_root: &Path) -> PathBuf {
    project_root.join(LOGS_DIR)
}

/// Create the runtime directory layout under `project_root`.
///
/// Returns the number of directories that could not be created.
pub fn create_layout(project_root: &Path, ui: &mut dyn UserInterface) -> usize {
    let mut failures = 0;
    for dir in RUNTIME_DIRS {
        let path = project_root.join(dir);
        match std::fs::create_dir_all(&path) {
            Ok(()) => ui.success(&format!("Directory ready: {}", dir)),
            Err(e) => {
                ui.error(&format!("Failed to create directory '{}': {}", dir, e));
                failures += 1;
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;

    #[test]
    fn creates_all_runtime_directories() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut ui = MockUI::new();

        let failures = create_layout(temp.path(), &mut ui);

        assert_eq!(failures, 0);
        for dir in RUNTIME_DIRS {
            assert!(temp.path().join(dir).is_dir());
        }
    }

    #[test]
    fn creation_is_idempotent() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut ui = MockUI::new();

        assert_eq!(create_layout(temp.path(), &mut ui), 0);
        assert_eq!(create_layout(temp.path(), &mut ui), 0);
    }

    #[test]
    fn failure_on_one_directory_does_not_stop_others() {
        let temp = tempfile::TempDir::new().unwrap();
        // Occupy one directory name with a file.
        std::fs::write(temp.path().join(DATA_DIR), b"not a dir").unwrap();
        let mut ui = MockUI::new();

        let failures = create_layout(temp.path(), &mut ui);

        assert_eq!(failures, 1);
        assert!(temp.path().join(OUTPUT_DIR).is_dir());
        assert!(temp.path().join(SCRATCH_DIR).is_dir());
        assert!(temp.path().join(LOGS_DIR).is_dir());
        assert!(ui.errors().iter().any(|e| e.contains(DATA_DIR)));
    }
}
