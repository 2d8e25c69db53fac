use notify_rust::{Notification, Timeout};

const APP_NAME: &str = "Virtual Event Scheduler";
const NOTIFICATION_TIMEOUT_MS: u32 = 10_000;

/// Best-effort desktop notification delivery.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
        }
    }

    /// Deliver a notification. Failures are logged and swallowed, with the
    /// reminder text echoed to the log so a broken notification backend
    /// never stalls the poll loop or loses the reminder entirely.
    pub fn notify(&self, title: &str, message: &str) {
        let result = Notification::new()
            .appname(&self.app_name)
            .summary(title)
            .body(message)
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS))
            .show();

        match result {
            Ok(_) => tracing::info!("Desktop notification sent: {} - {}", title, message),
            Err(e) => {
                tracing::error!("Failed to send desktop notification: {}", e);
                tracing::info!("Console reminder: {} - {}", title, message);
            }
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}
