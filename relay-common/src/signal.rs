/// Broadcast shutdown signal consumed cooperatively by every long-running
/// task: HTTP server, worker pool, retry timer wheel, scheduler loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
