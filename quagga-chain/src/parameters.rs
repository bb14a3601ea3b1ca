//! Consensus parameters for the Quagga chain.
//!
//! The functions in this module and its children are pure: they answer
//! upgrade-activation and subsidy questions for a height, with no I/O and
//! no state.

mod network;
mod network_upgrade;

pub mod subsidy;

pub use network::Network;
pub use network_upgrade::{
    ConsensusBranchId, NetworkUpgrade, POW_AVERAGING_WINDOW, POW_MEDIAN_BLOCK_SPAN,
};
