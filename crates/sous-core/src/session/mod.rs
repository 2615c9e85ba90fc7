//! Live execution state machine.
//!
//! `transitions` holds the pure transition graphs and undo-window
//! arithmetic; `service` is the authoritative store-backed path (server
//! clock enforces undo deadlines); `live` is the optimistic cook-mode
//! engine with structural rollback.

pub mod live;
pub mod service;
pub mod transitions;

pub use live::{LiveSession, UndoKind, UndoableAction};
pub use transitions::{
    is_valid_run_transition, is_valid_task_transition, undo_deadline, undo_window_open,
    UNDO_WINDOW_SECS,
};
