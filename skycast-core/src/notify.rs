use chrono::Duration;

/// Minimum spacing between "new weather" notifications.
pub fn notification_interval() -> Duration {
    Duration::days(1)
}

/// Whether a notification should fire, given the user's preference and the
/// time since the last one. Pure decision; the orchestrator owns the side
/// effects and the timestamp update.
pub fn should_notify(enabled: bool, elapsed_since_last: Duration) -> bool {
    enabled && elapsed_since_last >= notification_interval()
}

/// Fire-and-forget "new weather is available" signal. The core does not wait
/// for or inspect any acknowledgment.
pub trait NotificationSink: Send + Sync {
    fn notify_new_weather(&self);
}
