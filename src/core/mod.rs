// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Core engine module - event state, deferred evaluation and orchestration

mod clock;
mod engine;
mod event_bus;
mod event_table;
mod scheduler;

pub use clock::Clock;
pub use engine::Engine;
pub use event_bus::{EngineEvent, EngineEventKind, EventBus};
pub use event_table::EventTable;
pub use scheduler::{DeferredQueue, Deferral, TimerHandle};
