//! Termination of reclaimed applications.

/// Receives a notification for every application swept by a collection.
///
/// Calls are fire-and-forget: the reaper neither waits for the application
/// to exit nor inspects the outcome, so implementations must not block.
pub trait Terminator {
    /// Request termination of the application with the given canonical URL.
    fn kill_application(&self, url: &str);
}

impl<F> Terminator for F
where
    F: Fn(&str),
{
    fn kill_application(&self, url: &str) {
        self(url)
    }
}
