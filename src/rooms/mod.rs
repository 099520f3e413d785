//! Room registry.
//!
//! Rooms are named partitions of the message sequence. A room exists once a
//! message targets it or once it is created explicitly; there is no delete.
//! Each room keeps a sliding window of its newest messages.

mod registry;

pub use registry::RoomRegistry;
