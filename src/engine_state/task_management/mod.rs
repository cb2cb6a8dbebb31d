//! # Task Management System
//!
//! This module provides a small worker pool for executing tasks off the main
//! thread. The main thread publishes tasks and later polls for their outputs;
//! it never blocks on a worker.
//!
//! ## Architecture Overview
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskChannel`: Communication channel between the main thread and one worker thread
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Tasks that find every worker busy wait in a FIFO queue
//! 4. Workers process tasks and send the outputs back
//! 5. The owner polls outputs with `drain_completed()`, bounded per call
//!
//! ## Example Usage
//! ```no_run
//! use voxel_streaming::engine_state::task_management::{task::Task, TaskManager};
//!
//! struct Square(u64);
//!
//! impl Task for Square {
//!     type Output = u64;
//!     fn process(self) -> u64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! let mut task_manager = TaskManager::new(2);
//! task_manager.publish_task(Square(3));
//!
//! // In the main loop:
//! task_manager.process_queued_tasks();
//! for output in task_manager.drain_completed(10) {
//!     println!("{output}");
//! }
//! ```

pub mod task;

use std::{
    collections::VecDeque,
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
};

use log::{info, warn};
use task::Task;

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task outputs from worker
/// - `num_tasks_in_flight`: Tasks sent to the worker whose output has not been drained yet
/// - `disconnected`: The worker is gone; the channel is skipped from then on
/// - `worker`: Handle to the worker thread, joined on shutdown
#[derive(Debug)]
pub struct TaskChannel<T: Task> {
    task_sender: Sender<T>,
    result_receiver: Receiver<T::Output>,
    num_tasks_in_flight: usize,
    disconnected: bool,
    worker: JoinHandle<()>,
}

impl<T: Task> TaskChannel<T> {
    /// Marks the worker as gone. Its in-flight tasks are lost.
    fn disconnect(&mut self, idx: usize) {
        if !self.disconnected {
            warn!(
                "Worker {} disconnected, {} tasks lost",
                idx, self.num_tasks_in_flight
            );
        }
        self.disconnected = true;
        self.num_tasks_in_flight = 0;
    }

    fn free_slots(&self) -> usize {
        if self.disconnected {
            0
        } else {
            MAX_TASKS_IN_FLIGHT.saturating_sub(self.num_tasks_in_flight)
        }
    }
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
/// - `next_drain_channel`: Channel polled first by the next `drain_completed()`
///
/// # Implementation Notes
/// - Dropping the manager shuts the workers down
/// - Worker thread panics won't crash the application; that worker's tasks are
///   lost and its channel is retired
pub struct TaskManager<T: Task> {
    channels: Vec<TaskChannel<T>>,
    queued_tasks: VecDeque<T>,
    current_channel: usize,
    next_drain_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Outputs waiting to be drained count as in flight, so a slow consumer
/// throttles submission instead of letting outputs pile up.
pub const MAX_TASKS_IN_FLIGHT: usize = 4;

impl<T: Task> TaskManager<T> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<T>();
            let (result_tx, result_rx) = channel::<T::Output>();

            let worker = thread::spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                disconnected: false,
                worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            next_drain_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was handed to the worker
    /// - `Err(task)` if the worker disconnected, so the task can go to another channel
    fn try_send_task(&mut self, task: T, channel_idx: usize) -> Result<(), T> {
        let channel = &mut self.channels[channel_idx];
        match channel.task_sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(err) => {
                channel.disconnect(channel_idx);
                Err(err.0)
            }
        }
    }

    /// Finds an available worker channel using round-robin from the last used one.
    ///
    /// # Returns
    /// - `Some(usize)` index of a live channel below `MAX_TASKS_IN_FLIGHT`
    /// - `None` if all channels are busy, disconnected, or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&idx| self.channels[idx].free_slots() > 0)
    }

    /// Number of tasks the live workers can take right now without queueing.
    pub fn available_slots(&self) -> usize {
        self.channels.iter().map(TaskChannel::free_slots).sum()
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: T) -> bool {
        let mut task = task;
        while let Some(channel_idx) = self.find_available_channel() {
            match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    return true;
                }
                Err(returned) => task = returned,
            }
        }

        self.queued_tasks.push_back(task);
        false
    }

    /// Moves queued tasks to workers until the queue is empty or every worker is busy.
    ///
    /// Tasks are sent in FIFO order. A task refused by a disconnected worker
    /// stays at the front and goes to the next live channel.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                break;
            };
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };

            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Collects at most `max` finished outputs without blocking.
    ///
    /// Channels are visited round-robin, starting after the last channel that
    /// produced output, so no single worker starves the rest.
    pub fn drain_completed(&mut self, max: usize) -> Vec<T::Output> {
        let mut outputs = Vec::new();
        let count = self.channels.len();
        let mut idle_channels = 0;

        while outputs.len() < max && idle_channels < count {
            let idx = self.next_drain_channel;
            self.next_drain_channel = (idx + 1) % count;

            let channel = &mut self.channels[idx];
            match channel.result_receiver.try_recv() {
                Ok(output) => {
                    channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                    outputs.push(output);
                    idle_channels = 0;
                }
                Err(TryRecvError::Empty) => idle_channels += 1,
                Err(TryRecvError::Disconnected) => {
                    channel.disconnect(idx);
                    idle_channels += 1;
                }
            }
        }

        outputs
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Number of tasks sent to workers whose output has not been drained.
    pub fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Whether every published task has been drained.
    pub fn is_idle(&self) -> bool {
        self.queued() == 0 && self.in_flight() == 0
    }

    /// Stops accepting work, discards queued tasks and undrained outputs, and
    /// joins the workers.
    ///
    /// A task already executing is allowed to finish; its output is dropped.
    pub fn shutdown(&mut self) {
        let discarded = self.queued_tasks.len() + self.in_flight();
        self.queued_tasks.clear();

        for channel in self.channels.drain(..) {
            let TaskChannel {
                task_sender,
                result_receiver,
                worker,
                ..
            } = channel;
            drop(task_sender);
            drop(result_receiver);
            if worker.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }

        if discarded > 0 {
            info!("Task manager shut down, discarded {} pending tasks", discarded);
        }
    }
}

impl<T: Task> Drop for TaskManager<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
