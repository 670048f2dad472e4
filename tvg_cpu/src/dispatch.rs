// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running preparation tasks, on a worker pool when available.

use std::sync::{Mutex, PoisonError};

use tvg_common::mempool::MemPool;

use crate::task::Task;

#[cfg(feature = "multithreading")]
use {
    crossbeam_channel::Receiver,
    rayon::{ThreadPool, ThreadPoolBuilder},
    std::cell::RefCell,
    std::sync::Arc,
    thread_local::ThreadLocal,
};

/// Where a task currently is.
#[derive(Debug)]
pub(crate) enum Slot {
    /// Prepared, or never submitted.
    Ready(Task),
    /// Being prepared on a worker.
    #[cfg(feature = "multithreading")]
    Running(Receiver<Task>),
    /// The worker preparing the task went away.
    Lost,
}

impl Slot {
    /// Wait for the task to be prepared and borrow it.
    pub(crate) fn wait(&mut self) -> Option<&mut Task> {
        #[cfg(feature = "multithreading")]
        if let Self::Running(rx) = self {
            let next = match rx.recv() {
                Ok(task) => Self::Ready(task),
                Err(_) => {
                    log::warn!("a preparation task was lost");
                    Self::Lost
                }
            };
            *self = next;
        }
        match self {
            Self::Ready(task) => Some(task),
            _ => None,
        }
    }

    /// Wait for the task and take it out of the slot.
    pub(crate) fn take(&mut self) -> Option<Task> {
        self.wait()?;
        match std::mem::replace(self, Self::Lost) {
            Self::Ready(task) => Some(task),
            _ => None,
        }
    }
}

/// Runs tasks with a memory pool per thread.
pub(crate) struct Scheduler {
    #[cfg(feature = "multithreading")]
    thread_pool: Option<ThreadPool>,
    #[cfg(feature = "multithreading")]
    pools: Arc<ThreadLocal<RefCell<MemPool>>>,
    /// The pool of the calling thread, used when tasks run inline.
    local: Mutex<MemPool>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// A scheduler with `threads` workers. With zero workers tasks run inline.
    pub(crate) fn new(threads: usize) -> Self {
        #[cfg(feature = "multithreading")]
        let thread_pool = if threads == 0 {
            None
        } else {
            match ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("tvg-worker-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    log::warn!("falling back to inline preparation: {err}");
                    None
                }
            }
        };
        #[cfg(not(feature = "multithreading"))]
        if threads > 0 {
            log::debug!("built without multithreading, ignoring {threads} worker threads");
        }

        Self {
            #[cfg(feature = "multithreading")]
            thread_pool,
            #[cfg(feature = "multithreading")]
            pools: Arc::new(ThreadLocal::new()),
            local: Mutex::new(MemPool::new()),
        }
    }

    /// Number of worker threads.
    pub(crate) fn threads(&self) -> usize {
        #[cfg(feature = "multithreading")]
        if let Some(pool) = &self.thread_pool {
            return pool.current_num_threads();
        }
        0
    }

    /// Prepare `task`, asynchronously if there are workers.
    pub(crate) fn request(&self, mut task: Task) -> Slot {
        #[cfg(feature = "multithreading")]
        if let Some(thread_pool) = &self.thread_pool {
            let (tx, rx) = crossbeam_channel::bounded(1);
            let pools = Arc::clone(&self.pools);
            thread_pool.spawn(move || {
                let pool = pools.get_or(|| RefCell::new(MemPool::new()));
                task.run(&mut pool.borrow_mut());
                // The slot may have been dropped without waiting.
                let _ = tx.send(task);
            });
            return Slot::Running(rx);
        }

        let mut pool = self.local.lock().unwrap_or_else(PoisonError::into_inner);
        task.run(&mut pool);
        Slot::Ready(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ShapeTask;
    use tvg_common::path::RenderPath;
    use tvg_common::region::RenderRegion;
    use tvg_common::render::RenderUpdateFlag;
    use tvg_common::shape::{RenderColor, RenderShape};

    fn task() -> Task {
        let mut path = RenderPath::new();
        path.add_rect(0.0, 0.0, 10.0, 10.0);
        let mut task = ShapeTask {
            shape: RenderShape::new(path, RenderColor::new(0, 0, 0, 255)),
            ..ShapeTask::default()
        };
        task.base.clip_box = RenderRegion::new(0, 0, 20, 20);
        task.base.update(&Default::default(), 255, RenderUpdateFlag::ALL);
        Task::Shape(Box::new(task))
    }

    #[test]
    fn inline_tasks_are_ready() {
        let scheduler = Scheduler::new(0);
        assert_eq!(scheduler.threads(), 0);
        let mut slot = scheduler.request(task());
        assert!(matches!(slot, Slot::Ready(_)));
        assert!(slot.wait().is_some_and(|t| t.base().valid));
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn workers_hand_tasks_back() {
        let scheduler = Scheduler::new(2);
        let mut slots: Vec<_> = (0..8).map(|_| scheduler.request(task())).collect();
        for slot in &mut slots {
            let task = slot.take().unwrap();
            assert_eq!(task.base().cur_box, RenderRegion::new(0, 0, 10, 10));
        }
        assert!(slots.iter().all(|s| matches!(s, Slot::Lost)));
    }
}
