//! Hot-reload watcher for the config file.
//!
//! Wraps a `notify` filesystem watcher around one backing file, collapses bursts
//! of raw events (editors love truncate-then-write) behind a single reset-on-event
//! debounce timer, and re-runs the loader when the timer fires uninterrupted. The
//! safety property everything here serves: a broken edit never displaces the
//! last-known-good configuration. On reload failure the previous record stays
//! current and the failure is published as a [`ChangeEvent`] carrying the error.
//!
//! Consumers receive immutable ChangeEvents on an mpsc channel and react in their
//! own tasks; the watch loop never waits on them. Events for the file are
//! delivered in the order their debounce windows closed. The channel is closed
//! exactly once, when the loop exits, so consumers detect shutdown by closure.

use crate::error::Result;
use crate::loader::{LoadOptions, LoadedConfig, load};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// What happened to the backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One watcher outcome. Immutable after emission.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    /// The freshly loaded record on a successful reload; `None` for deletions
    /// and failed reloads.
    pub config: Option<Arc<LoadedConfig>>,
    /// The load failure, if the reload hit a system error.
    pub error: Option<String>,
}

/// Tunables for the watch loop.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period before a burst of raw events becomes one reload.
    pub debounce: Duration,
    /// Outbound event channel capacity. Overflow drops the event with a warning
    /// rather than stalling the loop.
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            channel_capacity: 64,
        }
    }
}

// Lifecycle states, one-way.
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

struct Lifecycle {
    stop_tx: watch::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

/// Handle to a running config watcher.
///
/// Dropping the handle cancels the loop; [`ConfigWatcher::stop`] does so
/// explicitly and waits for the loop to exit before returning, so no reload can
/// execute after teardown began.
pub struct ConfigWatcher {
    current: Arc<ArcSwap<LoadedConfig>>,
    lifecycle: Mutex<Option<Lifecycle>>,
    state: AtomicU8,
}

impl ConfigWatcher {
    /// Start watching the file behind `initial` and return the handle plus the
    /// event stream.
    ///
    /// `initial` becomes the last-known-good record; `options` are re-used
    /// verbatim for every reload.
    pub fn spawn(
        path: impl Into<PathBuf>,
        initial: LoadedConfig,
        options: LoadOptions,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let path = path.into();
        let watch_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name: OsString = path
            .file_name()
            .map(Into::into)
            .ok_or_else(|| crate::error::ConfigError::FileNotFound { path: path.clone() })?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut fs_watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )?;
        // Watch the parent directory: editors that replace-by-rename would
        // otherwise detach a watch on the file itself.
        fs_watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        let current = Arc::new(ArcSwap::from_pointee(initial));
        let (stop_tx, stop_rx) = watch::channel(());
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);

        info!(path = %path.display(), debounce_ms = config.debounce.as_millis() as u64, "config watcher started");

        let loop_state = WatchLoop {
            fs_watcher,
            path,
            file_name,
            options,
            debounce: config.debounce,
            current: Arc::clone(&current),
            event_tx,
        };
        let task = tokio::spawn(loop_state.run(raw_rx, stop_rx));

        Ok((
            Self {
                current,
                lifecycle: Mutex::new(Some(Lifecycle { stop_tx, task })),
                state: AtomicU8::new(STATE_RUNNING),
            },
            event_rx,
        ))
    }

    /// The last-known-good record. Lock-free.
    pub fn current(&self) -> Arc<LoadedConfig> {
        self.current.load_full()
    }

    /// Whether the watch loop is still running.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    /// Stop the watcher and wait for the loop to exit.
    ///
    /// Safe to call more than once, including concurrently: every caller
    /// returns only after the loop has exited. The lock is held across the
    /// join so a second caller queues behind the one doing the teardown. The
    /// underlying OS watch is released when the loop drops its notifier.
    pub async fn stop(&self) {
        let mut guard = self.lifecycle.lock().await;
        let Some(lifecycle) = guard.take() else {
            return;
        };
        let _ = lifecycle.stop_tx.send(());
        if let Err(join_err) = lifecycle.task.await {
            error!("config watch loop panicked: {join_err}");
        }
        self.state.store(STATE_STOPPED, Ordering::Release);
    }
}

struct WatchLoop {
    // Held for its side effect; dropping it releases the OS watch.
    fs_watcher: RecommendedWatcher,
    path: PathBuf,
    file_name: OsString,
    options: LoadOptions,
    debounce: Duration,
    current: Arc<ArcSwap<LoadedConfig>>,
    event_tx: mpsc::Sender<ChangeEvent>,
}

impl WatchLoop {
    async fn run(
        mut self,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        mut stop_rx: watch::Receiver<()>,
    ) {
        // A deletion and a re-creation inside one window stay distinct entries;
        // consecutive write-like events collapse into one.
        let mut pending: VecDeque<ChangeKind> = VecDeque::new();

        let timer = tokio::time::sleep(Duration::from_secs(86_400));
        tokio::pin!(timer);

        loop {
            tokio::select! {
                // Ok means an explicit stop; Err means the handle was dropped.
                _ = stop_rx.changed() => break,

                raw = raw_rx.recv() => match raw {
                    Some(Ok(event)) => {
                        if let Some(kind) = self.classify(&event) {
                            debug!(?kind, "raw file event, debounce timer reset");
                            queue_kind(&mut pending, kind);
                            timer.as_mut().reset(Instant::now() + self.debounce);
                        }
                    }
                    Some(Err(e)) => {
                        error!("file watcher error: {e}");
                    }
                    None => {
                        debug!("notify channel closed, stopping watch loop");
                        break;
                    }
                },

                _ = &mut timer, if !pending.is_empty() => {
                    while let Some(kind) = pending.pop_front() {
                        self.process(kind).await;
                    }
                }
            }
        }

        // Dropping the notifier here releases the OS watch; dropping the event
        // sender closes the channel exactly once.
        drop(self.fs_watcher);
        info!(path = %self.path.display(), "config watcher stopped");
    }

    /// Map a raw notify event touching our file to a change kind.
    fn classify(&self, event: &notify::Event) -> Option<ChangeKind> {
        let ours = |p: &PathBuf| p.file_name().is_some_and(|name| name == self.file_name);
        if !event.paths.iter().any(ours) {
            return None;
        }

        match event.kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => Some(ChangeKind::Deleted),
                RenameMode::To => Some(ChangeKind::Created),
                // Both: paths[0] is the old name, paths[1] the new one.
                RenameMode::Both => {
                    if event.paths.last().is_some_and(ours) {
                        Some(ChangeKind::Created)
                    } else {
                        Some(ChangeKind::Deleted)
                    }
                }
                _ => {
                    if self.path.is_file() {
                        Some(ChangeKind::Updated)
                    } else {
                        Some(ChangeKind::Deleted)
                    }
                }
            },
            EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Updated),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }

    async fn process(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Deleted => {
                // The last-known-good record is deliberately untouched.
                warn!(path = %self.path.display(), "config file deleted, keeping current configuration");
                self.emit(ChangeEvent {
                    kind: ChangeKind::Deleted,
                    path: self.path.clone(),
                    timestamp: Utc::now(),
                    config: None,
                    error: None,
                })
                .await;
            }
            ChangeKind::Created | ChangeKind::Updated => match load(&self.options) {
                Ok(loaded) => {
                    let loaded = Arc::new(loaded);
                    self.current.store(Arc::clone(&loaded));
                    info!(
                        path = %self.path.display(),
                        findings = loaded.findings.len(),
                        "configuration reloaded"
                    );
                    self.emit(ChangeEvent {
                        kind,
                        path: self.path.clone(),
                        timestamp: Utc::now(),
                        config: Some(loaded),
                        error: None,
                    })
                    .await;
                }
                Err(e) => {
                    error!(
                        path = %self.path.display(),
                        "reload failed, keeping current configuration: {e}"
                    );
                    self.emit(ChangeEvent {
                        kind,
                        path: self.path.clone(),
                        timestamp: Utc::now(),
                        config: None,
                        error: Some(e.to_string()),
                    })
                    .await;
                }
            },
        }
    }

    async fn emit(&self, event: ChangeEvent) {
        // try_send keeps a slow or absent consumer from stalling the loop.
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(kind = ?event.kind, "event channel full, dropping change event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event receiver dropped, continuing to track current config");
            }
        }
    }
}

/// Queue a change kind, collapsing consecutive write-like events.
fn queue_kind(pending: &mut VecDeque<ChangeKind>, kind: ChangeKind) {
    let write_like = |k: &ChangeKind| matches!(k, ChangeKind::Created | ChangeKind::Updated);
    match pending.back() {
        Some(last) if write_like(last) && write_like(&kind) => {}
        Some(ChangeKind::Deleted) if kind == ChangeKind::Deleted => {}
        _ => pending.push_back(kind),
    }
}
