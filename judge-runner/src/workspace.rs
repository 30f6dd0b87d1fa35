use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::Error, languages::LanguageStrategy};

const INPUT_FILE_NAME: &str = "input.txt";

/// Per-request directory holding the source file, build artifacts and the
/// captured stdin.
///
/// Everything is removed when the workspace is reaped, which happens at the
/// latest when it is dropped.
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    /// Files written by the materializer
    tracked: Vec<PathBuf>,
    strategy: Option<Arc<dyn LanguageStrategy>>,
    reaped: bool,
}

impl Workspace {
    /// Create `<root>/<id>`, creating `root` too when absent.
    pub async fn create(root: &Path, id: Uuid) -> Result<Self, Error> {
        let dir = root.join(id.to_string());
        fs::create_dir_all(&dir)
            .await
            .map_err(Error::Materialization)?;
        debug!(request_id = %id, "Created workspace at {}", dir.display());

        Ok(Self {
            id,
            dir,
            tracked: Vec::new(),
            strategy: None,
            reaped: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(INPUT_FILE_NAME)
    }

    /// Write `code` verbatim under the file name the strategy mandates.
    pub async fn materialize(
        &mut self,
        code: &str,
        strategy: Arc<dyn LanguageStrategy>,
    ) -> Result<PathBuf, Error> {
        let path = self.dir.join(strategy.source_file_name(self.id));
        self.tracked.push(path.clone());
        self.strategy = Some(strategy);

        fs::write(&path, code)
            .await
            .map_err(Error::Materialization)?;
        debug!(request_id = %self.id, "Wrote source file {}", path.display());
        Ok(path)
    }

    pub async fn write_input(&mut self, input: &str) -> Result<PathBuf, Error> {
        let path = self.input_path();
        self.tracked.push(path.clone());

        fs::write(&path, input)
            .await
            .map_err(Error::Materialization)?;
        Ok(path)
    }

    /// Delete every artifact and the directory itself. Runs at most once;
    /// failures are logged and never returned.
    pub fn reap(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;

        let mut paths = std::mem::take(&mut self.tracked);
        if let Some(strategy) = &self.strategy {
            paths.extend(strategy.cleanup_paths(&self.dir, self.id));
        }
        for path in &paths {
            remove_path(self.id, path);
        }

        // Programs may leave files of their own behind
        if let Err(e) = std::fs::remove_dir(&self.dir) {
            if e.kind() == std::io::ErrorKind::NotFound {
                return;
            }
            debug!(request_id = %self.id, "Workspace not empty after cleanup: {}", e);
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                warn!(
                    request_id = %self.id,
                    "Failed to remove workspace {}: {}",
                    self.dir.display(),
                    e
                );
            }
        }
        debug!(request_id = %self.id, "Reaped workspace {}", self.dir.display());
    }
}

fn remove_path(id: Uuid, path: &Path) {
    let removed = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match removed {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(request_id = %id, "Already gone: {}", path.display());
        }
        Err(e) => warn!(request_id = %id, "Failed to remove {}: {}", path.display(), e),
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.reap();
    }
}
