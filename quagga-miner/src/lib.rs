//! Block template construction and internal mining for Quagga.
//!
//! Given the current chain tip, a mempool snapshot, and a miner reward
//! recipient, this crate produces candidate blocks that are internally
//! consistent and valid under the activated consensus rules, then searches
//! the Equihash proof-of-work space for them.
//!
//! The heart of the crate is [`template::build_template`], which selects
//! mempool transactions under capacity and dependency constraints
//! ([`select`]), constructs the coinbase transaction ([`coinbase`]),
//! and finalizes the block header ([`template`], [`difficulty`],
//! [`check`]). The [`worker`] module drives the whole loop on parallel
//! mining threads.

#![doc(html_root_url = "https://docs.quagga.cash/quagga_miner")]
#![warn(missing_docs)]

pub mod address;
pub mod chain;
pub mod check;
pub mod coin_view;
pub mod coinbase;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod mempool;
pub mod policy;
pub mod prover;
pub mod script;
pub mod select;
pub mod solver;
pub mod template;
pub mod unified;
pub mod worker;

#[cfg(test)]
mod tests;

pub use address::MinerAddress;
pub use config::Config;
pub use error::{MinerError, SubmitError, TemplateError};
pub use template::BlockTemplate;
