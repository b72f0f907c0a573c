use tokio::task::JoinHandle;
use tracing::debug;

/// Owner of the optional repeating score-refresh task.
///
/// Nothing schedules refreshes yet: there is no refresh protocol, so
/// [`PollingController::update_values`] does nothing. The controller exists so
/// the handle has one explicit owner and is cancelled when that owner goes away.
#[derive(Debug, Default)]
pub struct PollingController {
    timer: Option<JoinHandle<()>>,
}

impl PollingController {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    /// Extension point for refreshing scores. Intentionally a no-op.
    pub fn update_values(&self) {}

    #[allow(dead_code)]
    /// Install a repeating task, cancelling any previous one.
    pub fn schedule(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.timer.replace(handle) {
            previous.abort();
        }
    }

    #[allow(dead_code)]
    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some()
    }

    /// Cancel the scheduled task if there is one; safe to call at any time.
    pub fn stop_updates(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("stopped score updates");
        }
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.stop_updates();
    }
}
