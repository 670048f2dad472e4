// Copyright 2025 the ThorVG Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide bookkeeping of GPU renderers.
//!
//! The GL entry points belong to the host, so the engine only counts renderers to decide
//! when [`term`] may tear it down.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Engine {
    renderers: usize,
}

static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

fn engine() -> MutexGuard<'static, Option<Engine>> {
    ENGINE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Initialize the engine. Has no effect if it is already running.
pub fn init() -> bool {
    engine().get_or_insert_with(Engine::default);
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

pub(crate) fn acquire() {
    engine().get_or_insert_with(Engine::default).renderers += 1;
}

pub(crate) fn release() {
    if let Some(running) = engine().as_mut() {
        running.renderers = running.renderers.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Other tests create renderers concurrently, so only the refusal is checked.
    #[test]
    fn term_waits_for_renderers() {
        assert!(init());
        acquire();
        assert!(!term());
        release();
    }
}
