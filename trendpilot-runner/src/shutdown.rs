//! Ctrl-C handling for the scheduler loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Install a Ctrl-C handler and return the stop flag it raises.
///
/// The scheduler notices the flag between cycles and while waiting, so a
/// running cycle always completes. Only one handler can be installed per
/// process.
pub fn stop_on_interrupt() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            info!("interrupt received, stopping after the current cycle");
        }
    })?;
    Ok(stop)
}
