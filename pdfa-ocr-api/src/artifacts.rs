//! Scratch directories and per-request file names
//!
//! Every request gets a fresh UUID v4. Its upload lands in
//! `<upload_dir>/<uuid>_input.pdf` and the engine writes
//! `<output_dir>/<uuid>_output.pdf`. The input path is held by a
//! [`tempfile::TempPath`], so it is unlinked whenever the request's
//! [`RequestArtifacts`] is dropped, whichever way the handler exits.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

const INPUT_SUFFIX: &str = "_input.pdf";
const OUTPUT_SUFFIX: &str = "_output.pdf";

/// The two process-wide scratch directories
#[derive(Debug, Clone)]
pub struct ArtifactDirs {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

/// Result of [`ArtifactDirs::sweep`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

impl ArtifactDirs {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they do not exist yet
    pub async fn ensure(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    /// Reserve the input and output names for a new request
    ///
    /// The input file is created empty and exclusively, so an identifier
    /// clash surfaces as an error instead of two requests sharing a file.
    pub async fn allocate(&self) -> io::Result<RequestArtifacts> {
        let id = Uuid::new_v4();
        let upload_dir = self.upload_dir.clone();

        let input = tokio::task::spawn_blocking(move || {
            let prefix = id.to_string();
            tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(INPUT_SUFFIX)
                .rand_bytes(0)
                .tempfile_in(upload_dir)
                .map(|file| file.into_temp_path())
        })
        .await
        .map_err(io::Error::other)??;
        let output = self.output_dir.join(format!("{id}{OUTPUT_SUFFIX}"));

        debug!(request_id = %id, input = %input.display(), "Allocated request artifacts");

        Ok(RequestArtifacts { id, input, output })
    }

    /// Delete every file in both directories
    ///
    /// Meant for shutdown, when no request is in flight. Subdirectories are
    /// left alone; a file that cannot be removed is logged and counted.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for dir in [&self.upload_dir, &self.output_dir] {
            sweep_dir(dir, &mut report).await;
        }
        report
    }
}

async fn sweep_dir(dir: &Path, report: &mut SweepReport) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list directory for cleanup");
            report.failed += 1;
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Directory listing failed during cleanup");
                report.failed += 1;
                break;
            }
        };

        match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Cannot inspect file");
                report.failed += 1;
                continue;
            }
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot remove file");
                report.failed += 1;
            }
        }
    }
}

/// Files owned by one conversion request
///
/// Dropping this removes the input file. The output file is left in place;
/// its fate is decided by the response path.
#[derive(Debug)]
pub struct RequestArtifacts {
    id: Uuid,
    input: TempPath,
    output: PathBuf,
}

impl RequestArtifacts {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Remove a partially written output after a failed conversion
    pub async fn discard_output(&self) {
        match tokio::fs::remove_file(&self.output).await {
            Ok(()) => debug!(request_id = %self.id, "Discarded partial output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(request_id = %self.id, error = %e, "Cannot remove partial output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn dirs(root: &TempDir) -> ArtifactDirs {
        ArtifactDirs::new(root.path().join("uploads"), root.path().join("outputs"))
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);

        dirs.ensure().await.unwrap();
        dirs.ensure().await.unwrap();

        assert!(dirs.upload_dir().is_dir());
        assert!(dirs.output_dir().is_dir());
    }

    #[tokio::test]
    async fn test_allocate_names_share_identifier() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        let artifacts = dirs.allocate().await.unwrap();
        let id = artifacts.id().to_string();

        assert_eq!(
            artifacts.input_path(),
            dirs.upload_dir().join(format!("{id}_input.pdf"))
        );
        assert_eq!(
            artifacts.output_path(),
            dirs.output_dir().join(format!("{id}_output.pdf"))
        );
        assert!(artifacts.input_path().exists());
        assert!(!artifacts.output_path().exists());
    }

    #[tokio::test]
    async fn test_drop_removes_input_only() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        let artifacts = dirs.allocate().await.unwrap();
        let input = artifacts.input_path().to_path_buf();
        let output = artifacts.output_path().to_path_buf();
        std::fs::write(&input, b"%PDF").unwrap();
        std::fs::write(&output, b"%PDF").unwrap();

        drop(artifacts);

        assert!(!input.exists());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_drop_tolerates_missing_input() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        let artifacts = dirs.allocate().await.unwrap();
        std::fs::remove_file(artifacts.input_path()).unwrap();
        drop(artifacts);

        assert_eq!(file_count(dirs.upload_dir()), 0);
    }

    #[tokio::test]
    async fn test_allocate_is_unique() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        let mut all = Vec::new();
        for _ in 0..100 {
            all.push(dirs.allocate().await.unwrap());
        }
        let ids: HashSet<_> = all.iter().map(|a| a.id()).collect();

        assert_eq!(ids.len(), 100);
        assert_eq!(file_count(dirs.upload_dir()), 100);
    }

    #[tokio::test]
    async fn test_discard_output() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        let artifacts = dirs.allocate().await.unwrap();
        artifacts.discard_output().await;
        std::fs::write(artifacts.output_path(), b"partial").unwrap();
        artifacts.discard_output().await;

        assert!(!artifacts.output_path().exists());
    }

    #[tokio::test]
    async fn test_sweep_removes_files_in_both_dirs() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(&root);
        dirs.ensure().await.unwrap();

        std::fs::write(dirs.upload_dir().join("a_input.pdf"), b"a").unwrap();
        std::fs::write(dirs.output_dir().join("a_output.pdf"), b"a").unwrap();
        std::fs::write(dirs.output_dir().join("b_output.pdf"), b"b").unwrap();
        std::fs::create_dir(dirs.output_dir().join("nested")).unwrap();

        let report = dirs.sweep().await;

        assert_eq!(report, SweepReport { removed: 3, failed: 0 });
        assert_eq!(file_count(dirs.upload_dir()), 0);
        assert_eq!(file_count(dirs.output_dir()), 1);
    }

    #[tokio::test]
    async fn test_sweep_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let report = dirs(&root).sweep().await;
        assert_eq!(report, SweepReport::default());
    }
}
