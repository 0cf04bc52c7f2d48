//! Voice session coordination
//!
//! This module provides the `SessionCoordinator` that owns the
//! conversation transcript and sequences each turn across the recognition
//! session, the response generator and the synthesis session.

mod coordinator;

pub use coordinator::{CoordinatorSettings, SessionCoordinator};
