//! Conversation session stores for Kai.
//!
//! All stores implement `kai_core::SessionStore`. History lives only in
//! process memory; persistence across restarts is out of scope.

pub mod in_memory;

pub use in_memory::InMemorySessionStore;
