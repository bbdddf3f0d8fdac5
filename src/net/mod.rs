//! Transport: the Socket.IO connection task and the events it reports.

pub mod events;
pub mod socket;
