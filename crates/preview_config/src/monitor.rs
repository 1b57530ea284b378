use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::Sender;

const DEBOUNCE_DELAY: Duration = Duration::from_millis(10);

/// The fallback for `RecommendedWatcher` polling.
const FALLBACK_POLLING_TIMEOUT: Duration = Duration::from_secs(1);

/// Watches the config file and reloads it on change.
///
/// `sender` is notified after every successful reload, a malformed file is
/// logged and the previous config stays in effect.
pub fn watch(sender: Sender<()>) {
    let Some(config_file) = crate::config_file() else {
        return;
    };

    // Only watch regular files, `metadata` resolves symbolic links.
    if !config_file
        .metadata()
        .map_or(false, |metadata| metadata.file_type().is_file())
    {
        return;
    }

    let path = match config_file.canonicalize() {
        Ok(canonical_path) => match config_file.symlink_metadata() {
            Ok(metadata) if metadata.file_type().is_symlink() => canonical_path,
            _ => config_file.clone(),
        },
        _ => return,
    };

    let (tx, rx) = mpsc::channel();
    let mut watcher = match RecommendedWatcher::new(
        tx,
        Config::default().with_poll_interval(FALLBACK_POLLING_TIMEOUT),
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::error!("Unable to watch config file: {err}");
            return;
        }
    };

    let spawned = std::thread::Builder::new()
        .name("config-watcher".into())
        .spawn(move || {
            if let Err(err) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                tracing::debug!("Unable to watch config file {:?}: {err}", path);
                return;
            }

            let mut debouncing_deadline: Option<Instant> = None;
            let mut received_events = Vec::new();

            loop {
                // `recv_timeout` debounces the bursts of events an editor
                // produces when saving a file.
                let event = match debouncing_deadline.as_ref() {
                    Some(debouncing_deadline) => rx.recv_timeout(
                        debouncing_deadline.saturating_duration_since(Instant::now()),
                    ),
                    None => {
                        let event = rx.recv().map_err(Into::into);
                        debouncing_deadline.replace(Instant::now() + DEBOUNCE_DELAY);
                        event
                    }
                };

                match event {
                    Ok(Ok(event)) => match event.kind {
                        EventKind::Any
                        | EventKind::Create(_)
                        | EventKind::Modify(_)
                        | EventKind::Other => {
                            received_events.push(event);
                        }
                        _ => (),
                    },
                    Err(RecvTimeoutError::Timeout) => {
                        debouncing_deadline = None;

                        if received_events
                            .drain(..)
                            .flat_map(|event| event.paths.into_iter())
                            .any(|modified_path| modified_path.eq(&path))
                        {
                            match crate::reload_config() {
                                Some(err) => {
                                    tracing::error!(?path, "Invalid config file, ignored: {err}");
                                }
                                None => {
                                    tracing::debug!(?path, "Config reloaded");
                                    let _ = sender.try_send(());
                                }
                            }
                        }
                    }
                    Ok(Err(err)) => {
                        tracing::debug!("Config watcher errors: {err:?}");
                    }
                    Err(err) => {
                        tracing::debug!("Config watcher channel dropped unexpectedly: {err}");
                        break;
                    }
                };
            }
        });

    if let Err(err) = spawned {
        tracing::error!("Failed to spawn config-watcher thread: {err}");
    }
}
