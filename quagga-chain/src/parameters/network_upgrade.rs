//! Network upgrade consensus parameters for the Quagga chain.

use NetworkUpgrade::*;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound::*;

use chrono::{DateTime, Duration, Utc};

use crate::block;
use crate::parameters::{Network, Network::*};

/// A network upgrade.
///
/// Network upgrades can change the network protocol or consensus rules in
/// incompatible ways.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NetworkUpgrade {
    /// The protocol for a Genesis block.
    ///
    /// Genesis blocks use a different set of consensus rules from other
    /// BeforeOverwinter blocks, so we treat them like a separate network
    /// upgrade.
    Genesis,
    /// The protocol before the Overwinter upgrade.
    BeforeOverwinter,
    /// The protocol after the Overwinter upgrade.
    Overwinter,
    /// The protocol after the Sapling upgrade.
    Sapling,
    /// The protocol after the Blossom upgrade.
    Blossom,
    /// The protocol after the Heartwood upgrade.
    Heartwood,
    /// The protocol after the Canopy upgrade.
    Canopy,
    /// The protocol after the NU5 upgrade, which includes the Orchard
    /// shielded protocol and the v5 transaction format.
    Nu5,
}

impl fmt::Display for NetworkUpgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Mainnet network upgrade activation heights.
///
/// This is actually a bijective map, but it is const, so we use a vector,
/// and do the uniqueness check in the unit tests.
pub(crate) const MAINNET_ACTIVATION_HEIGHTS: &[(block::Height, NetworkUpgrade)] = &[
    (block::Height(0), Genesis),
    (block::Height(1), BeforeOverwinter),
    (block::Height(347_500), Overwinter),
    (block::Height(419_200), Sapling),
    (block::Height(653_600), Blossom),
    (block::Height(903_000), Heartwood),
    (block::Height(1_046_400), Canopy),
    (block::Height(1_687_104), Nu5),
];

/// Testnet network upgrade activation heights.
///
/// This is actually a bijective map, but it is const, so we use a vector,
/// and do the uniqueness check in the unit tests.
pub(crate) const TESTNET_ACTIVATION_HEIGHTS: &[(block::Height, NetworkUpgrade)] = &[
    (block::Height(0), Genesis),
    (block::Height(1), BeforeOverwinter),
    (block::Height(207_500), Overwinter),
    (block::Height(280_000), Sapling),
    (block::Height(584_000), Blossom),
    (block::Height(903_800), Heartwood),
    (block::Height(1_028_500), Canopy),
    (block::Height(1_842_420), Nu5),
];

/// Regtest network upgrade activation heights.
///
/// Activation heights must be distinct, so the upgrades activate on
/// consecutive early heights: freshly mined regtest blocks use the newest
/// formats almost straight away.
pub(crate) const REGTEST_ACTIVATION_HEIGHTS: &[(block::Height, NetworkUpgrade)] = &[
    (block::Height(0), Genesis),
    (block::Height(1), BeforeOverwinter),
    (block::Height(2), Overwinter),
    (block::Height(3), Sapling),
    (block::Height(4), Blossom),
    (block::Height(5), Heartwood),
    (block::Height(6), Canopy),
    (block::Height(7), Nu5),
];

/// The Consensus Branch Id, used to bind transactions and blocks to a
/// particular network upgrade.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct ConsensusBranchId(u32);

impl From<ConsensusBranchId> for u32 {
    fn from(branch: ConsensusBranchId) -> u32 {
        branch.0
    }
}

/// Network Upgrade Consensus Branch Ids.
///
/// Branch ids are the same for mainnet and testnet. If there is a testnet
/// rollback after a bug, the branch id changes.
///
/// Branch ids were introduced in the Overwinter upgrade, so there are no
/// Genesis or BeforeOverwinter branch ids.
///
/// This is actually a bijective map, but it is const, so we use a vector,
/// and do the uniqueness check in the unit tests.
pub(crate) const CONSENSUS_BRANCH_IDS: &[(NetworkUpgrade, ConsensusBranchId)] = &[
    (Overwinter, ConsensusBranchId(0x5ba81b19)),
    (Sapling, ConsensusBranchId(0x76b809bb)),
    (Blossom, ConsensusBranchId(0x2bb40e60)),
    (Heartwood, ConsensusBranchId(0xf5b9230b)),
    (Canopy, ConsensusBranchId(0xe9ff75a6)),
    (Nu5, ConsensusBranchId(0xc2d6d0b4)),
];

/// The target block spacing before Blossom.
const PRE_BLOSSOM_POW_TARGET_SPACING: i64 = 150;

/// The target block spacing after Blossom activation.
pub(crate) const POST_BLOSSOM_POW_TARGET_SPACING: i64 = 75;

/// The averaging window for difficulty threshold arithmetic mean
/// calculations.
///
/// `PoWAveragingWindow` in the Zcash specification.
pub const POW_AVERAGING_WINDOW: usize = 17;

/// The median block span for time median calculations.
///
/// `PoWMedianBlockSpan` in the Zcash specification.
pub const POW_MEDIAN_BLOCK_SPAN: usize = 11;

/// The multiplier used to derive the testnet minimum difficulty block time
/// gap threshold.
///
/// Based on <https://zips.z.cash/zip-0208#minimum-difficulty-blocks-on-the-test-network>
const TESTNET_MINIMUM_DIFFICULTY_GAP_MULTIPLIER: i32 = 6;

impl NetworkUpgrade {
    /// Returns a BTreeMap of activation heights and network upgrades for
    /// `network`.
    ///
    /// This is actually a bijective map.
    pub(crate) fn activation_list(network: Network) -> BTreeMap<block::Height, NetworkUpgrade> {
        match network {
            Mainnet => MAINNET_ACTIVATION_HEIGHTS,
            Testnet => TESTNET_ACTIVATION_HEIGHTS,
            Regtest => REGTEST_ACTIVATION_HEIGHTS,
        }
        .iter()
        .cloned()
        .collect()
    }

    /// Returns the current network upgrade for `network` and `height`.
    pub fn current(network: Network, height: block::Height) -> NetworkUpgrade {
        NetworkUpgrade::activation_list(network)
            .range(..=height)
            .map(|(_, nu)| *nu)
            .next_back()
            .expect("every height has a current network upgrade")
    }

    /// Returns the next network upgrade for `network` and `height`.
    ///
    /// Returns None if there is no higher network upgrade.
    pub fn next(network: Network, height: block::Height) -> Option<NetworkUpgrade> {
        NetworkUpgrade::activation_list(network)
            .range((Excluded(height), Unbounded))
            .map(|(_, nu)| *nu)
            .next()
    }

    /// Returns `true` if this network upgrade is active at `height` on
    /// `network`.
    ///
    /// An upgrade is active at its own activation height and all later
    /// heights.
    pub fn is_active_at(&self, network: Network, height: block::Height) -> bool {
        self.activation_height(network)
            .map(|activation_height| height >= activation_height)
            .unwrap_or(false)
    }

    /// Returns `true` if `height` is this network upgrade's activation
    /// height on `network`.
    pub fn is_activation_height(&self, network: Network, height: block::Height) -> bool {
        self.activation_height(network) == Some(height)
    }

    /// Returns the activation height for this network upgrade on `network`.
    ///
    /// Returns None if this network upgrade is a future upgrade, and its
    /// activation height has not been set yet.
    pub fn activation_height(&self, network: Network) -> Option<block::Height> {
        NetworkUpgrade::activation_list(network)
            .iter()
            .filter(|(_, nu)| nu == &self)
            .map(|(height, _)| *height)
            .next()
    }

    /// Returns a HashMap of NetworkUpgrades and their ConsensusBranchIds.
    ///
    /// Branch ids are the same for mainnet and testnet.
    ///
    /// This is actually a bijective map.
    pub(crate) fn branch_id_list() -> HashMap<NetworkUpgrade, ConsensusBranchId> {
        CONSENSUS_BRANCH_IDS.iter().cloned().collect()
    }

    /// Returns the consensus branch id for this network upgrade.
    ///
    /// Returns None if this network upgrade has no consensus branch id.
    pub fn branch_id(&self) -> Option<ConsensusBranchId> {
        NetworkUpgrade::branch_id_list().get(self).cloned()
    }

    /// Returns the network upgrade for a consensus branch id.
    pub fn from_branch_id(branch_id: u32) -> Option<NetworkUpgrade> {
        CONSENSUS_BRANCH_IDS
            .iter()
            .find(|id| id.1 == ConsensusBranchId(branch_id))
            .map(|id| id.0)
    }

    /// Returns the target block spacing for the network upgrade.
    pub fn target_spacing(&self) -> Duration {
        let spacing_seconds = match self {
            Genesis | BeforeOverwinter | Overwinter | Sapling => PRE_BLOSSOM_POW_TARGET_SPACING,
            Blossom | Heartwood | Canopy | Nu5 => POST_BLOSSOM_POW_TARGET_SPACING,
        };

        Duration::seconds(spacing_seconds)
    }

    /// Returns the target block spacing for `network` and `height`.
    ///
    /// See [`NetworkUpgrade::target_spacing`] for details.
    pub fn target_spacing_for_height(network: Network, height: block::Height) -> Duration {
        NetworkUpgrade::current(network, height).target_spacing()
    }

    /// Returns the minimum difficulty block spacing for `network` and
    /// `height`. Returns `None` if the minimum difficulty consensus rule is
    /// not active.
    ///
    /// Based on <https://zips.z.cash/zip-0208#minimum-difficulty-blocks-on-the-test-network>
    pub fn minimum_difficulty_spacing_for_height(
        network: Network,
        height: block::Height,
    ) -> Option<Duration> {
        match network.min_difficulty_blocks_after() {
            None => None,
            Some(start_height) if height <= start_height => None,
            Some(_) => {
                let network_upgrade = NetworkUpgrade::current(network, height);
                Some(network_upgrade.target_spacing() * TESTNET_MINIMUM_DIFFICULTY_GAP_MULTIPLIER)
            }
        }
    }

    /// Returns true if the gap between `block_time` and
    /// `previous_block_time` is greater than the minimum difficulty time
    /// gap for `network` and `block_height`.
    ///
    /// Returns false on Mainnet, when `block_height` is not past the
    /// minimum difficulty start height, and when the time gap is too small.
    ///
    /// `block_time` can be less than, equal to, or greater than
    /// `previous_block_time`, because block times are provided by miners.
    ///
    /// Implements the minimum difficulty adjustment from ZIPs 205 and 208.
    pub fn is_min_difficulty_block(
        network: Network,
        block_height: block::Height,
        block_time: DateTime<Utc>,
        previous_block_time: DateTime<Utc>,
    ) -> bool {
        let block_time_gap = block_time - previous_block_time;
        if let Some(min_difficulty_gap) =
            NetworkUpgrade::minimum_difficulty_spacing_for_height(network, block_height)
        {
            block_time_gap > min_difficulty_gap
        } else {
            false
        }
    }

    /// Returns the averaging window timespan for the network upgrade.
    ///
    /// `AveragingWindowTimespan` from the Zcash specification.
    pub fn averaging_window_timespan(&self) -> Duration {
        self.target_spacing() * (POW_AVERAGING_WINDOW as _)
    }

    /// Returns the averaging window timespan for `network` and `height`.
    ///
    /// See [`NetworkUpgrade::averaging_window_timespan`] for details.
    pub fn averaging_window_timespan_for_height(
        network: Network,
        height: block::Height,
    ) -> Duration {
        NetworkUpgrade::current(network, height).averaging_window_timespan()
    }
}

impl ConsensusBranchId {
    /// Returns the current consensus branch id for `network` and `height`.
    ///
    /// Returns None if the network has no branch id at this height.
    pub fn current(network: Network, height: block::Height) -> Option<ConsensusBranchId> {
        NetworkUpgrade::current(network, height).branch_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_lists_are_bijective() {
        for network in [Mainnet, Testnet, Regtest] {
            let list = NetworkUpgrade::activation_list(network);
            assert_eq!(list.len(), MAINNET_ACTIVATION_HEIGHTS.len());
        }
    }

    #[test]
    fn branch_ids_are_bijective() {
        let list = NetworkUpgrade::branch_id_list();
        assert_eq!(list.len(), CONSENSUS_BRANCH_IDS.len());
    }

    #[test]
    fn current_and_activation() {
        assert_eq!(
            NetworkUpgrade::current(Mainnet, block::Height(0)),
            Genesis
        );
        assert_eq!(
            NetworkUpgrade::current(Mainnet, block::Height(1_046_400)),
            Canopy
        );
        assert!(Canopy.is_activation_height(Mainnet, block::Height(1_046_400)));
        assert!(!Canopy.is_active_at(Mainnet, block::Height(1_046_399)));
        assert!(Nu5.is_active_at(Mainnet, block::Height(1_687_104)));
    }

    #[test]
    fn regtest_activates_everything_early() {
        assert_eq!(NetworkUpgrade::current(Regtest, block::Height(0)), Genesis);
        assert_eq!(NetworkUpgrade::current(Regtest, block::Height(7)), Nu5);
        assert!(Canopy.is_active_at(Regtest, block::Height(100)));
    }

    #[test]
    fn min_difficulty_spacing() {
        // Mainnet never has min difficulty blocks
        assert_eq!(
            NetworkUpgrade::minimum_difficulty_spacing_for_height(
                Mainnet,
                block::Height(1_000_000)
            ),
            None
        );

        // Testnet min difficulty gap is 6 target spacings
        assert_eq!(
            NetworkUpgrade::minimum_difficulty_spacing_for_height(
                Testnet,
                block::Height(1_000_000)
            ),
            Some(Duration::seconds(POST_BLOSSOM_POW_TARGET_SPACING * 6))
        );
    }
}
