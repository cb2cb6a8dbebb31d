//! # Task System Core Trait
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The returned `Output` travels back to the main thread
//! 4. The owner drains outputs with `TaskManager::drain_completed()` and applies them
//!
//! ## Thread Safety
//! - A `Task` and its `Output` must be `Send` to cross threads
//! - Tasks own all their data; nothing is shared with the main thread while they run

/// A unit of work that runs on a background worker.
///
/// Tasks should be self-contained: everything they read is moved into them
/// before they are published, and everything they produce is returned in
/// `Output`. They must not touch main-thread state.
pub trait Task: Send + 'static {
    /// Value handed back to the main thread.
    type Output: Send + 'static;

    /// Performs the work. Runs on a worker thread.
    fn process(self) -> Self::Output;
}
