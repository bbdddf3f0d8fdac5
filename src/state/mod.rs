//! Client-side state owned by the controller.
//!
//! DESIGN
//! ======
//! The history log is the source of truth for what the conversation looks
//! like; the front ends only project it. State is split so the controller's
//! invariants (append-only history, two-state loading flag) each live in one
//! small type.

pub mod chat;
pub mod history;
