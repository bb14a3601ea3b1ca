//! Mining configuration.

use serde::{Deserialize, Serialize};

use quagga_chain::block::MAX_BLOCK_BYTES;

use crate::solver::SolverStrategy;

/// The default value for `block_priority_size`: the share of the block
/// reserved for priority-ordered transactions.
pub const DEFAULT_BLOCK_PRIORITY_SIZE: u64 = 1_000_000;

/// Byte limits used during transaction selection, after clamping.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockSizeLimits {
    /// The largest block the assembler will create.
    pub max_size: u64,
    /// Below this cumulative byte offset, priority ordering governs.
    pub priority_size: u64,
    /// Below this cumulative byte offset, free transactions are admitted
    /// even if their fee rate is below the relay threshold.
    pub min_size: u64,
}

/// Mining configuration section.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The encoded address used for miner payouts: a transparent address,
    /// a Sapling payment address, or a unified address (which resolves to
    /// its preferred receiver at the target height).
    ///
    /// Mining threads terminate at startup if this is unset or invalid.
    pub miner_address: Option<String>,

    /// The largest block to create, in bytes.
    ///
    /// Clamped to `[1000, MAX_BLOCK_BYTES - 1000]`.
    pub block_max_size: u64,

    /// How much of the block should be dedicated to high-priority
    /// transactions, included regardless of the fees they pay.
    ///
    /// Clamped to `block_max_size`.
    pub block_priority_size: u64,

    /// The block is filled with free transactions until there are no more
    /// or the block reaches this size.
    ///
    /// Clamped to `block_max_size`.
    pub block_min_size: u64,

    /// Override the block version.
    ///
    /// Only honored on networks where blocks are mined on demand, to test
    /// forking scenarios.
    pub block_version: Option<u32>,

    /// Emit a log line with the priority and fee rate of each transaction
    /// accepted into a template.
    pub print_priority: bool,

    /// Selects the Equihash solver implementation.
    ///
    /// Any value other than `default` or `tromp` fails configuration
    /// deserialization at startup.
    pub equihash_solver: SolverStrategy,

    /// Enable the internal miner.
    pub gen: bool,

    /// The number of mining threads. `-1` uses one thread per host core.
    pub gen_proc_limit: i32,

    /// Wait for connected peers and a synced chain before mining.
    ///
    /// Defaults to the network's own preference; in regtest mode we expect
    /// to fly solo.
    pub mining_requires_peers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            miner_address: None,
            block_max_size: MAX_BLOCK_BYTES,
            block_priority_size: DEFAULT_BLOCK_PRIORITY_SIZE,
            block_min_size: 0,
            block_version: None,
            print_priority: false,
            equihash_solver: SolverStrategy::Default,
            gen: false,
            gen_proc_limit: -1,
            mining_requires_peers: true,
        }
    }
}

impl Config {
    /// Returns the selection byte limits, clamped to sane ranges:
    ///
    /// - `max_size` to `[1000, MAX_BLOCK_BYTES - 1000]`,
    /// - `priority_size` and `min_size` to `[0, max_size]`.
    pub fn block_size_limits(&self) -> BlockSizeLimits {
        let max_size = self.block_max_size.clamp(1000, MAX_BLOCK_BYTES - 1000);
        let priority_size = self.block_priority_size.min(max_size);
        let min_size = self.block_min_size.min(max_size);

        BlockSizeLimits {
            max_size,
            priority_size,
            min_size,
        }
    }

    /// Returns the number of mining threads to spawn.
    pub fn mining_threads(&self) -> usize {
        if self.gen_proc_limit < 0 {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        } else {
            self.gen_proc_limit as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undersized_max_is_clamped_up() {
        let config = Config {
            block_max_size: 500,
            ..Config::default()
        };
        assert_eq!(config.block_size_limits().max_size, 1000);
    }

    #[test]
    fn oversized_max_is_clamped_down() {
        let config = Config {
            block_max_size: MAX_BLOCK_BYTES * 10,
            ..Config::default()
        };
        assert_eq!(config.block_size_limits().max_size, MAX_BLOCK_BYTES - 1000);
    }

    #[test]
    fn priority_size_is_clamped_to_max() {
        let config = Config {
            block_max_size: 100_000,
            block_priority_size: 200_000,
            block_min_size: 150_000,
            ..Config::default()
        };
        let limits = config.block_size_limits();
        assert_eq!(limits.priority_size, limits.max_size);
        assert_eq!(limits.min_size, limits.max_size);
    }

    #[test]
    fn unknown_solver_fails_deserialization() {
        let parsed: Result<Config, _> =
            serde_json::from_str(r#"{ "equihash_solver": "turbo" }"#);
        assert!(parsed.is_err());

        let parsed: Config = serde_json::from_str(r#"{ "equihash_solver": "tromp" }"#).unwrap();
        assert_eq!(parsed.equihash_solver, SolverStrategy::Tromp);
    }
}
