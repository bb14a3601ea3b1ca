//! Core Quagga data structures.
//!
//! This crate provides definitions of the core data structures for Quagga,
//! a Zcash-style proof-of-work chain: blocks, transactions, amounts,
//! transparent and shielded transfer components, consensus parameters, and
//! proof-of-work types.

#![doc(html_root_url = "https://docs.quagga.cash/quagga_chain")]
#![warn(missing_docs)]

#[macro_use]
extern crate serde;

pub mod amount;
pub mod block;
pub mod fmt;
pub mod orchard;
pub mod parameters;
pub mod primitives;
pub mod sapling;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod value_balance;
pub mod work;
