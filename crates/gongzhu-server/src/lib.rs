//! The Gongzhu table server.
//!
//! One process hosts one table of four seats. Each accepted connection
//! gets a [`agent::PlayerAgent`]: a listener task that parses inbound
//! protocol lines and a lifecycle task that walks the seat through the
//! per-round phase sequence. A single [`table::Table`] driver task owns
//! the round state machine and advances only when every seat has
//! contributed to the current phase's barrier.
//!
//! All cross-task hand-off goes through `gongzhu-barrier` count
//! changes, admitted through a per-frame signal gate; the mutex-guarded
//! shared state is limited to the seat occupancy table, the gate, and
//! the running totals.

pub mod agent;
pub mod config;
mod error;
pub mod net;
pub mod table;

pub use config::ServerConfig;
pub use error::ServerError;
pub use net::GameServer;
pub use table::Table;
