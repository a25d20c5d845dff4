//! Wire protocol spoken with the match server

pub mod protocol;
