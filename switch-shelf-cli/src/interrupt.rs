//! Ctrl-C handling for long-running scans.
//!
//! The first Ctrl-C asks the running scan to stop and keep its partial
//! results. A second one exits immediately.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

static CANCEL: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Flag set by Ctrl-C. The listener starts on first use.
pub(crate) fn cancel_flag() -> Arc<AtomicBool> {
    CANCEL
        .get_or_init(|| {
            let flag = Arc::new(AtomicBool::new(false));
            spawn_listener(Arc::clone(&flag));
            flag
        })
        .clone()
}

fn spawn_listener(flag: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_io().build() {
                Ok(rt) => rt,
                Err(e) => {
                    log::debug!("Ctrl-C handler unavailable: {e}");
                    return;
                }
            };
            rt.block_on(async {
                if !cancel_on(&flag, tokio::signal::ctrl_c()).await {
                    return;
                }
                log::warn!(
                    "{} Interrupted; stopping after the files in progress (Ctrl-C again to quit)",
                    "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
                );
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        log::debug!("Ctrl-C handler unavailable: {e}");
    }
}

/// Wait for `signal`, then raise `flag`. Returns whether the flag was raised.
async fn cancel_on<F>(flag: &AtomicBool, signal: F) -> bool
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            flag.store(true, Ordering::Relaxed);
            true
        }
        Err(e) => {
            log::debug!("Ctrl-C handler unavailable: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[tokio::test]
    async fn test_signal_raises_flag() {
        let flag = AtomicBool::new(false);
        assert!(cancel_on(&flag, async { Ok(()) }).await);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_failed_listener_leaves_flag() {
        let flag = AtomicBool::new(false);
        let failed = async { Err(Error::new(ErrorKind::Unsupported, "no signals")) };
        assert!(!cancel_on(&flag, failed).await);
        assert!(!flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let first = cancel_flag();
        let second = cancel_flag();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
