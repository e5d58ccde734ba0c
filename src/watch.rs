use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use tracing::{error, info};

/// Snapshot files whose change triggers a new run.
fn is_snapshot_change(event: &DebouncedEvent) -> bool {
    event.kind == DebouncedEventKind::Any
        && event
            .path
            .extension()
            .is_some_and(|ext| ext == "json" || ext == "toml")
}

/// Watch the store directory for changes and run the callback on each change.
/// The callback is also invoked once immediately on startup.
pub fn watch_and_run<F>(dir: &Path, mut callback: F) -> anyhow::Result<()>
where
    F: FnMut(),
{
    callback();

    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    debouncer
        .watcher()
        .watch(dir, notify::RecursiveMode::Recursive)?;

    eprintln!("\nWatching {} for changes (Ctrl-C to stop)…", dir.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if events.iter().any(is_snapshot_change) {
                    info!("Snapshot change detected, regenerating");
                    eprintln!("\n--- Snapshot change detected, regenerating ---\n");
                    callback();
                }
            }
            Ok(Err(e)) => {
                error!("Watch error: {}", e);
            }
            Err(e) => {
                error!("Channel error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn event(path: &str) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        }
    }

    #[test]
    fn only_snapshot_files_trigger() {
        assert!(is_snapshot_change(&event("/store/trust/1234.json")));
        assert!(is_snapshot_change(&event("/store/shibsynth.toml")));
        assert!(!is_snapshot_change(&event("/store/.shibsynth.lock")));
        assert!(!is_snapshot_change(&event("/store/notes.txt")));
    }
}
