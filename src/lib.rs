//! Arena client - predictive simulation and snapshot reconciliation for a
//! 1v1 arena battler
//!
//! The server is authoritative and pushes full snapshots. Between snapshots
//! the client advances its own copy of the battle every frame and merges
//! each snapshot in without visible snapping.

pub mod client;
pub mod config;
pub mod game;
pub mod util;
pub mod ws;
