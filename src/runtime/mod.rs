//! Async front end: one task owns the registry, callers talk to it through
//! a cloneable handle.

/// Events broadcast after each command.
pub mod events;
/// Command loop and handle.
pub mod handle;
