#![doc = include_str!("../README.md")]

//! # SQL connection boundary
//!
//! Everything above this crate speaks in terms of [`Statement`]s and
//! [`Row`]s; everything below it is the engine.

#![forbid(unsafe_code)]

mod connection;
mod sqlite;
mod traits;
mod types;

pub use self::connection::*;
pub use self::sqlite::{ConnectOptions, Sqlite};
pub use self::traits::*;
pub use self::types::*;
