//! Hot reload of the model artifact on file changes
//!
//! The parent directory is watched rather than the file itself so that
//! editors and deploy tools replacing the file through a rename are seen.
//! Bursts of events are collapsed into one reload.

use super::ModelRegistry;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Reloads the registry whenever the artifact file changes
pub struct ArtifactWatcher {
    registry: Arc<ModelRegistry>,
    path: PathBuf,
    debounce: Duration,
}

impl ArtifactWatcher {
    pub fn new(registry: Arc<ModelRegistry>, path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching; stops when the returned handle is dropped
    pub async fn start(self) -> Result<WatcherHandle> {
        let file_name = self
            .path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("Artifact path {} has no file name", self.path.display()))?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) if is_relevant(&event, &file_name) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Artifact watcher error"),
            },
            notify::Config::default(),
        )
        .context("Failed to create filesystem watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        info!(path = %self.path.display(), "Watching model artifact for changes");

        let registry = self.registry;
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}

                debug!("Artifact changed, reloading");
                let registry = Arc::clone(&registry);
                match tokio::task::spawn_blocking(move || registry.reload()).await {
                    Ok(status) => debug!(
                        model_loaded = status.model_loaded,
                        model_version = %status.model_version,
                        "Reload finished"
                    ),
                    Err(e) => warn!(error = %e, "Reload task failed"),
                }
            }
            debug!("Watcher channel closed");
        });

        Ok(WatcherHandle {
            _watcher: watcher,
            task,
        })
    }
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name().map(|n| n == file_name.as_os_str()).unwrap_or(false))
}

/// Handle to a running watcher
/// Stops watching when dropped
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
