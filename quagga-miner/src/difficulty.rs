//! Difficulty adjustment for new block templates.
//!
//! Implements `GetNextWorkRequired` semantics: the mean of the previous
//! averaging window's targets, scaled by the dampened and bounded ratio
//! of the actual to expected timespan.

use chrono::{DateTime, Duration, Utc};

use quagga_chain::{
    block::Height,
    parameters::{Network, NetworkUpgrade, POW_AVERAGING_WINDOW, POW_MEDIAN_BLOCK_SPAN},
    work::difficulty::{CompactDifficulty, ExpandedDifficulty, U256},
};

use crate::chain::ChainInfo;

/// The damping factor for difficulty adjustment.
///
/// `PoWDampingFactor` in the Zcash specification.
const POW_DAMPING_FACTOR: i32 = 4;

/// The maximum upward difficulty adjustment percentage.
///
/// `PoWMaxAdjustUp` in the Zcash specification.
const POW_MAX_ADJUST_UP_PERCENT: i32 = 16;

/// The maximum downward difficulty adjustment percentage.
///
/// `PoWMaxAdjustDown` in the Zcash specification.
const POW_MAX_ADJUST_DOWN_PERCENT: i32 = 32;

/// Contains the context needed to calculate the adjusted difficulty for a
/// candidate block.
pub struct AdjustedDifficulty {
    /// The `header.time` field of the candidate block.
    candidate_time: DateTime<Utc>,
    /// The coinbase height of the candidate block.
    candidate_height: Height,
    /// The configured network.
    network: Network,
    /// The `difficulty_threshold`s of the previous
    /// `POW_AVERAGING_WINDOW + POW_MEDIAN_BLOCK_SPAN` (28) blocks, in
    /// reverse height order.
    relevant_difficulty_thresholds: Vec<CompactDifficulty>,
    /// The `time`s of the previous 28 blocks, in reverse height order.
    ///
    /// Only the first and last `POW_MEDIAN_BLOCK_SPAN` times are used.
    relevant_times: Vec<DateTime<Utc>>,
}

impl AdjustedDifficulty {
    /// Initialise the difficulty adjustment context for a candidate block
    /// with time `candidate_time`, mined on top of the tip described by
    /// `chain_info`.
    ///
    /// # Panics
    ///
    /// If `chain_info` carries fewer than 28 relevant blocks, on a chain
    /// that is at least 28 blocks long.
    pub fn new_from_chain_info(
        chain_info: &ChainInfo,
        candidate_time: DateTime<Utc>,
    ) -> AdjustedDifficulty {
        AdjustedDifficulty {
            candidate_time,
            candidate_height: chain_info.next_block_height(),
            network: chain_info.network,
            relevant_difficulty_thresholds: chain_info.relevant_difficulty_thresholds.clone(),
            relevant_times: chain_info.relevant_times.clone(),
        }
    }

    /// Calculate the expected `difficulty_threshold` for the candidate
    /// block.
    ///
    /// Implements `ThresholdBits` from the Zcash specification, and the
    /// testnet minimum difficulty adjustment from ZIPs 205 and 208.
    pub fn expected_difficulty_threshold(&self) -> CompactDifficulty {
        if NetworkUpgrade::is_min_difficulty_block(
            self.network,
            self.candidate_height,
            self.candidate_time,
            self.relevant_times[0],
        ) {
            return ExpandedDifficulty::target_difficulty_limit(self.network).to_compact();
        }

        self.threshold_bits()
    }

    /// Calculate the `difficulty_threshold` for the candidate block,
    /// ignoring the testnet minimum difficulty rule.
    fn threshold_bits(&self) -> CompactDifficulty {
        // Chains that are shorter than the averaging window stay at the
        // proof-of-work limit.
        if self.relevant_difficulty_thresholds.len()
            < POW_AVERAGING_WINDOW + POW_MEDIAN_BLOCK_SPAN
        {
            return ExpandedDifficulty::target_difficulty_limit(self.network).to_compact();
        }

        let mean_target = self.mean_target_difficulty();
        let median_timespan = self.median_timespan_bounded();

        let averaging_window_timespan = NetworkUpgrade::averaging_window_timespan_for_height(
            self.network,
            self.candidate_height,
        );

        let threshold = (mean_target / (averaging_window_timespan.num_seconds() as u64))
            * (median_timespan.num_seconds() as u64);
        let threshold = std::cmp::min(
            ExpandedDifficulty::target_difficulty_limit(self.network),
            threshold,
        );

        threshold.to_compact()
    }

    /// Calculate the arithmetic mean of the averaging window's expanded
    /// targets.
    fn mean_target_difficulty(&self) -> ExpandedDifficulty {
        let averaging_window_thresholds =
            &self.relevant_difficulty_thresholds[0..POW_AVERAGING_WINDOW];

        // Since the PoW limits are `2^251 - 1` or less, the sum of 17
        // expanded difficulties is `2^256 - 17` or less, which fits.
        let total: ExpandedDifficulty = averaging_window_thresholds
            .iter()
            .map(|compact| {
                compact
                    .to_expanded()
                    .expect("difficulty thresholds in chain state are valid")
            })
            .sum();
        let total: U256 = total.into();

        (total / (POW_AVERAGING_WINDOW as u64)).into()
    }

    /// Calculate the dampened and bounded median timespan of the averaging
    /// window.
    ///
    /// `ActualTimespanBounded` from the Zcash specification.
    fn median_timespan_bounded(&self) -> Duration {
        let averaging_window_timespan = NetworkUpgrade::averaging_window_timespan_for_height(
            self.network,
            self.candidate_height,
        );

        let damped = {
            let actual = self.median_timespan();
            averaging_window_timespan
                + (actual - averaging_window_timespan) / POW_DAMPING_FACTOR
        };

        let lower_bound = averaging_window_timespan * (100 - POW_MAX_ADJUST_UP_PERCENT) / 100;
        let upper_bound = averaging_window_timespan * (100 + POW_MAX_ADJUST_DOWN_PERCENT) / 100;

        damped.clamp(lower_bound, upper_bound)
    }

    /// Calculate the median timespan: the difference of the median times
    /// at the near and far ends of the relevant window.
    fn median_timespan(&self) -> Duration {
        let newer_median = Self::median_time(
            self.relevant_times[0..POW_MEDIAN_BLOCK_SPAN]
                .to_vec(),
        );
        let older_median = Self::median_time(
            self.relevant_times[POW_AVERAGING_WINDOW..POW_AVERAGING_WINDOW + POW_MEDIAN_BLOCK_SPAN]
                .to_vec(),
        );

        newer_median - older_median
    }

    /// Calculate the median of `times`.
    ///
    /// The median is the middle timestamp of the sorted span.
    fn median_time(mut times: Vec<DateTime<Utc>>) -> DateTime<Utc> {
        times.sort();
        times[times.len() / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use quagga_chain::{block, sapling};

    fn chain_info_with_spacing(network: Network, spacing_seconds: i64) -> ChainInfo {
        let limit = ExpandedDifficulty::target_difficulty_limit(network).to_compact();
        let tip_time = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();

        ChainInfo {
            network,
            tip_hash: block::Hash([0; 32]),
            tip_height: Height(2_000_000),
            relevant_difficulty_thresholds: vec![limit; 28],
            relevant_times: (0..28)
                .map(|i| tip_time - Duration::seconds(spacing_seconds * i))
                .collect(),
            sapling_tree: sapling::tree::NoteCommitmentTree::default(),
            history_roots: Default::default(),
            chain_value_pools: None,
        }
    }

    #[test]
    fn on_target_spacing_keeps_the_limit() {
        // When blocks arrive exactly on target spacing at the difficulty
        // limit, the next threshold stays at the limit (it cannot get any
        // easier).
        let info = chain_info_with_spacing(Network::Mainnet, 75);
        let adjusted =
            AdjustedDifficulty::new_from_chain_info(&info, info.relevant_times[0]);
        assert_eq!(
            adjusted.expected_difficulty_threshold(),
            ExpandedDifficulty::target_difficulty_limit(Network::Mainnet).to_compact(),
        );
    }

    #[test]
    fn fast_blocks_raise_difficulty() {
        // Blocks arriving much faster than the target spacing push the
        // threshold below the limit (more difficult).
        let info = chain_info_with_spacing(Network::Mainnet, 10);
        let adjusted =
            AdjustedDifficulty::new_from_chain_info(&info, info.relevant_times[0]);

        let threshold = adjusted.expected_difficulty_threshold();
        let limit =
            ExpandedDifficulty::target_difficulty_limit(Network::Mainnet).to_compact();
        assert!(
            threshold.to_expanded().unwrap() < limit.to_expanded().unwrap(),
            "faster blocks must produce a harder (smaller) target",
        );
    }

    #[test]
    fn testnet_min_difficulty_gap() {
        let info = chain_info_with_spacing(Network::Testnet, 75);

        // A candidate more than 6 target spacings after the tip gets the
        // minimum difficulty.
        let late_candidate = info.relevant_times[0] + Duration::seconds(75 * 6 + 1);
        let adjusted = AdjustedDifficulty::new_from_chain_info(&info, late_candidate);
        assert_eq!(
            adjusted.expected_difficulty_threshold(),
            ExpandedDifficulty::target_difficulty_limit(Network::Testnet).to_compact(),
        );
    }

    #[test]
    fn short_chains_stay_at_the_limit() {
        let mut info = chain_info_with_spacing(Network::Regtest, 75);
        info.relevant_difficulty_thresholds.truncate(5);
        info.relevant_times.truncate(5);

        let adjusted =
            AdjustedDifficulty::new_from_chain_info(&info, info.relevant_times[0]);
        assert_eq!(
            adjusted.threshold_bits(),
            ExpandedDifficulty::target_difficulty_limit(Network::Regtest).to_compact(),
        );
    }
}
