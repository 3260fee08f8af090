//! Pure decision logic: deadlines, overdue detection, board placement and
//! failure-mode risk scoring.
//!
//! # Responsibility
//! - Compute every derived value from explicit inputs (`today`, policy,
//!   snapshot). Nothing here reads the clock or holds UI state.
//!
//! # Invariants
//! - All functions are deterministic for the same inputs.
//! - Only `board::reconcile` performs writes, through a caller-provided sink.

pub mod board;
pub mod date_math;
pub mod deadline;
pub mod decision;
pub mod effect;
pub mod indicators;
pub mod overdue;
pub mod risk;
pub mod root_cause;
