use tracing::info;

pub type ProgressCallback = Box<dyn Fn(String) + Send + Sync>;

/// Append-only stream of human-readable progress lines.
///
/// Every line goes to `tracing`; a host that wants to show progress attaches a
/// callback and receives the same lines in order.
pub struct ProgressLog {
    callback: Option<ProgressCallback>,
}

impl ProgressLog {
    pub fn new(callback: ProgressCallback) -> Self {
        Self { callback: Some(callback) }
    }

    pub fn silent() -> Self {
        Self { callback: None }
    }

    pub fn line(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        if let Some(ref callback) = self.callback {
            callback(message);
        }
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::silent()
    }
}
