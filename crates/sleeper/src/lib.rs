use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use nyx_core::Shutdown;

const TIMESTAMP_FORMAT: &str = "%Y-%b-%d %H:%M:%S";
const POLL_SLICE: Duration = Duration::from_millis(500);

/// Enforces a minimum spacing between scheduler runs, surviving container
/// restarts by persisting the last completion time to disk.
pub struct Sleeper {
    state_path: PathBuf,
}

impl Sleeper {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Stalls until `hours` have elapsed since the last recorded completion,
    /// or until `shutdown` fires. Always persists the new completion time
    /// before returning, even if it had nothing to wait for.
    pub async fn sleep(&self, hours: i64, shutdown: &Shutdown) {
        let hours = hours.max(0);
        if let Some(last) = self.read_last() {
            let target = last + chrono::Duration::hours(hours);
            loop {
                if shutdown.is_stopping() {
                    break;
                }
                let remaining = target - Local::now().naive_local();
                let remaining_secs = remaining.num_seconds();
                if remaining_secs <= 0 {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(POLL_SLICE) => {}
                    _ = shutdown.stopped() => break,
                }
            }
        }
        // Persisted unconditionally: a cancelled wait still counts as this
        // run's completion time for the next invocation.
        self.save_now();
    }

    fn read_last(&self) -> Option<NaiveDateTime> {
        let raw = std::fs::read_to_string(&self.state_path).ok()?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
    }

    fn save_now(&self) {
        let formatted = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
        if let Err(e) = std::fs::write(&self.state_path, formatted) {
            tracing::warn!(error = %e, path = ?self.state_path, "failed to persist sleeper state");
        }
    }
}

/// Exposed for tests and for operators inspecting the on-disk contract
/// without reaching into a `Sleeper` instance.
pub fn state_path_default(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join("sleeper.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_run_does_not_block() {
        let path = std::env::temp_dir().join(format!("nyx-sleeper-test-{}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let sleeper = Sleeper::new(&path);
        let shutdown = Shutdown::new();

        let start = std::time::Instant::now();
        sleeper.sleep(24, &shutdown).await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn malformed_state_file_is_treated_as_first_run() {
        let path = std::env::temp_dir().join(format!("nyx-sleeper-bad-{}", std::process::id()));
        std::fs::write(&path, "not a timestamp").unwrap();
        let sleeper = Sleeper::new(&path);
        let shutdown = Shutdown::new();

        let start = std::time::Instant::now();
        sleeper.sleep(24, &shutdown).await;
        assert!(start.elapsed() < Duration::from_secs(2));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn stop_token_interrupts_the_wait() {
        let path = std::env::temp_dir().join(format!("nyx-sleeper-cancel-{}", std::process::id()));
        let stale = Local::now().naive_local() - chrono::Duration::hours(1);
        std::fs::write(&path, stale.format(TIMESTAMP_FORMAT).to_string()).unwrap();
        let sleeper = Sleeper::new(&path);
        let shutdown = Shutdown::new();
        shutdown.stop();

        let start = std::time::Instant::now();
        sleeper.sleep(24, &shutdown).await;
        assert!(start.elapsed() < Duration::from_secs(2));

        // A cancelled wait must still persist the completion time, not the
        // stale pre-run timestamp.
        let saved = sleeper.read_last().expect("timestamp persisted");
        assert!(saved > stale);
        let _ = std::fs::remove_file(&path);
    }
}
