// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide engine state shared by all software renderers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::Scheduler;

#[derive(Debug)]
struct Engine {
    scheduler: Arc<Scheduler>,
    renderers: usize,
}

static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

fn engine() -> MutexGuard<'static, Option<Engine>> {
    ENGINE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Initialize the engine with `threads` worker threads.
///
/// Has no effect if the engine is already running.
pub fn init(threads: usize) -> bool {
    let mut engine = engine();
    if let Some(running) = engine.as_ref() {
        log::debug!(
            "engine already running with {} threads",
            running.scheduler.threads()
        );
        return true;
    }
    *engine = Some(Engine {
        scheduler: Arc::new(Scheduler::new(threads)),
        renderers: 0,
    });
    true
}

/// Tear the engine down. Fails while any renderer is alive.
pub fn term() -> bool {
    let mut engine = engine();
    match engine.as_ref() {
        None => false,
        Some(running) if running.renderers > 0 => {
            log::warn!("engine still used by {} renderers", running.renderers);
            false
        }
        Some(_) => {
            *engine = None;
            true
        }
    }
}

/// Register a renderer, starting the engine with `threads` workers if needed.
pub(crate) fn acquire(threads: usize) -> Arc<Scheduler> {
    let mut engine = engine();
    let running = engine.get_or_insert_with(|| Engine {
        scheduler: Arc::new(Scheduler::new(threads)),
        renderers: 0,
    });
    running.renderers += 1;
    Arc::clone(&running.scheduler)
}

/// Unregister a renderer.
pub(crate) fn release() {
    if let Some(running) = engine().as_mut() {
        running.renderers = running.renderers.saturating_sub(1);
    }
}
