//! Core building blocks of the courier producer daemon.
//!
//! The surrounding daemon accepts application messages over a local datagram
//! socket, buffers them in a bounded in-memory pool, and routes them by topic
//! towards the downstream broker. This crate holds the pieces of that pipeline
//! that have to be exact: the wire codec for client-submitted datagrams, the
//! message handle backed by the bounded pool, and the concurrent per-topic
//! accounting of message lifecycle states.
//!
//! The broker client, the dispatch pipeline, and the socket loop live in the
//! daemon crates and are not part of this library.

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

mod anomaly;
mod assembly;
mod config;
mod courier_error;
mod input;
mod msg;
mod pool;
pub mod protocol;
mod tracker;
pub mod util;

pub use crate::anomaly::{AnomalySnapshot, AnomalyTracker};
pub use crate::assembly::Core;
pub use crate::config::CoreConfig;
pub use crate::courier_error::{CourierError, CourierResult};
pub use crate::input::{
    build_msg_from_datagram, try_create_any_partition_msg, try_create_partition_key_msg,
};
pub use crate::msg::{Msg, MsgState, Routing};
pub use crate::pool::{Lease, Pool};
pub use crate::tracker::{MsgStateTracker, TopicStats, TopicStatsItem};
