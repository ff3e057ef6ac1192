//! A compliant-enough implementation of the IEC 60870-5-104
//! telecontrol protocol: a client endpoint, a server/RTU endpoint, and
//! the deterministic hydropower process simulator the server exposes.
//!
//! # Examples
//!
//! ```no_run
//! use iec104::client;
//! use std::time::Duration;
//!
//! # fn main() {
//! let mut session = match client::connect("127.0.0.1", 2404, Duration::from_secs(5)) {
//!     Ok(session) => session,
//!     Err(e) => {
//!         println!("{:?}", e.to_string());
//!         return;
//!     }
//! };
//!
//! match session.request_data() {
//!     Ok(points) => println!("points: {:?}", points),
//!     Err(e) => println!("{:?}", e.to_string()),
//! }
//! # }
//! ```
pub mod apci;
pub mod asdu;
pub mod client;
pub mod constant;
pub mod error;
pub mod link;
pub mod registry;
pub mod server;
pub mod types;
