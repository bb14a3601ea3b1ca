//! Error types for template construction and mining.

use thiserror::Error;

use quagga_chain::amount;

/// Errors that stop a mining thread.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Neither the wallet nor the config provided a valid recipient.
    #[error("no miner address available (mining requires a wallet or the mineraddress option)")]
    NoMinerAddress,

    /// The configured miner address does not decode for this network.
    #[error("invalid miner address: {0}")]
    InvalidMinerAddress(String),

    /// Template production failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Errors from block template production.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The assembled template failed the outbound validity dry-run.
    ///
    /// This indicates a programmer bug or a consensus edge, so it is
    /// propagated rather than retried.
    #[error("assembled block template failed validity check: {0}")]
    TemplateInvalid(String),

    /// The coinbase builder failed.
    #[error(transparent)]
    Coinbase(#[from] crate::coinbase::CoinbaseError),

    /// Amount arithmetic overflowed while totalling fees or rewards.
    #[error("amount calculation overflowed: {0}")]
    Amount(#[from] amount::Error),
}

/// Errors from submitting a mined block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The chain tip moved while the solver was running: the solved block
    /// no longer extends the best chain.
    #[error("mined block is stale: chain tip changed during the solver run")]
    StaleBlock,

    /// The block failed validation.
    #[error("mined block was rejected: {0}")]
    Rejected(String),
}
