use std::fmt;

use crate::block;

/// An enum describing the possible network choices.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Network {
    /// The production network.
    #[default]
    Mainnet,

    /// The oldest public test network.
    Testnet,

    /// A local, single-node test network, where blocks are mined on demand.
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "Mainnet",
            Network::Testnet => "Testnet",
            Network::Regtest => "Regtest",
        })
    }
}

impl Network {
    /// Returns `true` if this network is a test network.
    pub fn is_a_test_network(&self) -> bool {
        *self != Network::Mainnet
    }

    /// Returns `true` if blocks are only mined on demand, rather than by a
    /// continuous proof-of-work race.
    ///
    /// On these networks the internal miner stops after each found block,
    /// and the block version can be overridden for fork testing.
    pub fn mine_blocks_on_demand(&self) -> bool {
        *self == Network::Regtest
    }

    /// Returns `true` if mining should wait for connected peers and a
    /// synced chain before starting work.
    ///
    /// In regtest mode we expect to fly solo.
    pub fn mining_requires_peers(&self) -> bool {
        *self != Network::Regtest
    }

    /// Returns the Equihash parameters `(n, k)` for this network.
    pub fn equihash_params(&self) -> (u32, u32) {
        match self {
            Network::Mainnet | Network::Testnet => (200, 9),
            Network::Regtest => (48, 5),
        }
    }

    /// Returns `true` if the chain value pool balances are tracked for this
    /// network, so miners can avoid producing turnstile-violating blocks.
    ///
    /// Implements the monitoring switch from [ZIP-209].
    ///
    /// [ZIP-209]: https://zips.z.cash/zip-0209
    pub fn zip209_enabled(&self) -> bool {
        true
    }

    /// Returns the height from which the future-timestamp soft fork rule
    /// applies: block times are capped at the median-time-past plus
    /// `MAX_FUTURE_BLOCK_TIME_MTP`.
    pub fn future_timestamp_soft_fork_height(&self) -> block::Height {
        match self {
            Network::Mainnet => block::Height(2_000_000),
            Network::Testnet => block::Height(1_500_000),
            Network::Regtest => block::Height(1),
        }
    }

    /// Returns `true` if the future-timestamp soft fork is in effect at
    /// `height`.
    pub fn future_timestamp_soft_fork_active(&self, height: block::Height) -> bool {
        height >= self.future_timestamp_soft_fork_height()
    }

    /// Returns the height after which minimum-difficulty blocks are
    /// permitted, or `None` if they never are.
    ///
    /// Based on [ZIP-208].
    ///
    /// [ZIP-208]: https://zips.z.cash/zip-0208#minimum-difficulty-blocks-on-the-test-network
    pub fn min_difficulty_blocks_after(&self) -> Option<block::Height> {
        match self {
            Network::Mainnet => None,
            Network::Testnet => Some(block::Height(299_187)),
            Network::Regtest => Some(block::Height(0)),
        }
    }
}
