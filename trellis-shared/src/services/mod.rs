/// Core services
///
/// Each service owns a pool handle and runs one transaction per operation:
/// resolve the target, authorize the caller, mutate, emit notifications,
/// commit. Dropping an operation's future before commit rolls it back.
///
/// - `projects`: Projects and memberships
/// - `tasks`: Task lifecycle
/// - `notifications`: Per-user notification log
/// - `analysis`: Project snapshots and the external summarizer

pub mod analysis;
pub mod notifications;
pub mod projects;
pub mod tasks;
