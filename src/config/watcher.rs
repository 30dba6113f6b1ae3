// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Live reload of the configuration file

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Config;

/// Polls a configuration file and publishes every valid new version.
///
/// A reload that fails to read or validate is logged and ignored; the last
/// good configuration stays current.
pub struct ConfigWatcher {
    path: PathBuf,
    poll_interval: Duration,
}

impl ConfigWatcher {
    /// Watch `path`, re-reading it every `poll_interval`
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }

    /// Start polling on a background task until `shutdown` fires
    pub fn spawn(
        self,
        initial: Config,
        mut shutdown: broadcast::Receiver<()>,
    ) -> watch::Receiver<Arc<Config>> {
        let (tx, rx) = watch::channel(Arc::new(initial));

        tokio::spawn(async move {
            let mut last_seen = std::fs::read_to_string(&self.path).ok();
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Watching configuration file {:?} for changes", self.path);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let current = match std::fs::read_to_string(&self.path) {
                            Ok(content) => content,
                            Err(e) => {
                                debug!("Configuration file {:?} unreadable: {}", self.path, e);
                                continue;
                            }
                        };
                        // an empty read is usually an editor mid-save
                        if current.trim().is_empty() || last_seen.as_deref() == Some(current.as_str()) {
                            continue;
                        }
                        last_seen = Some(current.clone());

                        info!("{:?} has been modified, reloading", self.path);
                        match Config::from_toml_str(&current) {
                            Ok(config) => {
                                if tx.send(Arc::new(config)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring invalid configuration update: {:#}", e),
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            debug!("Configuration watcher stopped");
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reload_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rules]\nminimum_duration = \"5s\"\n").unwrap();

        let (shutdown_tx, _) = broadcast::channel(1);
        let initial = Config::load(&path).unwrap();
        let mut rx = ConfigWatcher::new(&path, Duration::from_millis(10))
            .spawn(initial, shutdown_tx.subscribe());

        // invalid content is ignored
        std::fs::write(&path, "[rules]\nminimum_duration = \"soon\"\n").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rx.borrow().rules.minimum_duration, Duration::from_secs(5));

        std::fs::write(&path, "[rules]\nminimum_duration = \"20s\"\n").unwrap();
        let reloaded = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow_and_update().rules.minimum_duration == Duration::from_secs(20) {
                    break;
                }
            }
        })
        .await;
        assert!(reloaded.is_ok(), "watcher did not notice the change");

        let _ = shutdown_tx.send(());
    }
}
