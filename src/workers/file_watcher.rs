use notify::event::{EventKind, ModifyKind};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::services::BalanceImportService;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Excel workbooks only, skipping Office lock files (`~$name.xlsx`)
pub fn is_watched_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false)
}

/// Create and content/rename modifications schedule an import; access, metadata-only
/// changes and removals do not.
pub fn is_change_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Per-path debounce over filesystem events.
///
/// Each event pushes the path's deadline to `now + debounce`; a path is due once its
/// deadline has passed with no newer event.
#[derive(Debug)]
pub struct DebounceTracker {
    debounce: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl DebounceTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: HashMap::new(),
        }
    }

    /// (Re)schedule `path`; returns false for files that are not watched
    pub fn schedule(&mut self, path: &Path, now: Instant) -> bool {
        if !is_watched_file(path) {
            return false;
        }
        let reset = self
            .pending
            .insert(path.to_path_buf(), now + self.debounce)
            .is_some();
        debug!(
            "{} {}",
            if reset { "Debounce reset for" } else { "Change detected in" },
            path.display()
        );
        true
    }

    pub fn forget(&mut self, path: &Path) {
        if self.pending.remove(path).is_some() {
            debug!("Dropped pending import of removed {}", path.display());
        }
    }

    /// Remove and return every path whose quiet period has passed
    pub fn due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready.sort();
        ready
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Background worker watching the data directory and importing changed workbooks.
///
/// Filesystem events arrive from a `notify` watcher through a tokio channel; a ticker
/// checks debounce deadlines. Imports run one at a time on the worker's own task.
pub struct FileWatcher {
    data_dir: PathBuf,
    import_service: BalanceImportService,
    check_interval: Duration,
    tracker: DebounceTracker,
}

impl FileWatcher {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        import_service: BalanceImportService,
        check_interval: Duration,
        debounce: Duration,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            import_service,
            check_interval,
            tracker: DebounceTracker::new(debounce),
        }
    }

    /// Start a non-recursive watch on the data directory.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn watch(&self) -> notify::Result<(RecommendedWatcher, mpsc::Receiver<Event>)> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(&self.data_dir, RecursiveMode::NonRecursive)?;
        Ok((watcher, rx))
    }

    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn run(mut self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.data_dir).await {
            error!("Cannot create data directory: {}", e);
        }

        let (_watcher, mut events) = match self.watch() {
            Ok(watch) => watch,
            Err(e) => {
                error!(error = %e, "Cannot watch data directory, file watcher stopped");
                return;
            }
        };
        info!(
            check_interval_ms = self.check_interval.as_millis() as u64,
            "File watcher started"
        );

        let mut ticker = interval(self.check_interval);
        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        self.handle_event(&event, Instant::now());
                    }
                    None => {
                        warn!("Watch channel closed, file watcher stopped");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.import_due(Instant::now()).await;
                }
            }
        }
    }

    /// Feed one filesystem event; returns the paths it (re)scheduled
    pub fn handle_event(&mut self, event: &Event, now: Instant) -> Vec<PathBuf> {
        if matches!(event.kind, EventKind::Remove(_)) {
            for path in &event.paths {
                self.tracker.forget(path);
            }
            return Vec::new();
        }
        if !is_change_event(&event.kind) {
            return Vec::new();
        }

        let scheduled: Vec<PathBuf> = event
            .paths
            .iter()
            .filter(|path| self.tracker.schedule(path, now))
            .cloned()
            .collect();
        if !scheduled.is_empty() {
            debug!(
                "Scheduled {} files, {} pending",
                scheduled.len(),
                self.tracker.pending_count()
            );
        }
        scheduled
    }

    /// Import every path whose debounce window has passed
    pub async fn import_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let due = self.tracker.due(now);
        for path in &due {
            match self.import_service.process_file(path).await {
                Ok(summary) => info!(
                    "Imported {} ({} years, {} warnings)",
                    path.display(),
                    summary.years.len(),
                    summary.warnings.len()
                ),
                Err(e) => warn!("Import of {} failed: {}", path.display(), e),
            }
        }
        due
    }
}
