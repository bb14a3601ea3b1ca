//! Block subsidy, funding stream, and founders' reward calculations.
//!
//! The calculations in this module follow the Zcash protocol specification
//! [§7.8][7.8], with Quagga's own recipient tables.
//!
//! [7.8]: https://zips.z.cash/protocol/protocol.pdf#subsidies

use std::ops::Range;

use crate::{
    amount::{Amount, Error, NonNegative, COIN},
    block::Height,
    parameters::{Network, NetworkUpgrade::*},
    sapling,
    transparent::Script,
};

#[cfg(test)]
mod tests;

/// The largest block subsidy, used before the first halving.
///
/// We use `25 / 2` instead of `12.5`, so that we can calculate the correct
/// value without using floating-point.
pub const MAX_BLOCK_SUBSIDY: u64 = ((25 * COIN) / 2) as u64;

/// Used as a multiplier to get the new halving interval after Blossom.
///
/// Calculated as `PRE_BLOSSOM_POW_TARGET_SPACING /
/// POST_BLOSSOM_POW_TARGET_SPACING`.
pub const BLOSSOM_POW_TARGET_SPACING_RATIO: u64 = 2;

/// The divisor used for founders' reward calculations: the founders'
/// reward is 20% of the block subsidy.
pub const FOUNDERS_FRACTION_DIVISOR: u64 = 5;

/// The funding stream receiver categories.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FundingStreamReceiver {
    /// The electric coin company stream.
    Ecc,
    /// The foundation stream.
    Foundation,
    /// The major grants stream.
    MajorGrants,
}

/// The numerator for each funding stream receiver category, as described
/// in [ZIP-214].
///
/// [ZIP-214]: https://zips.z.cash/zip-0214
pub const FUNDING_STREAM_RECEIVER_NUMERATORS: &[(FundingStreamReceiver, u64)] = &[
    (FundingStreamReceiver::Ecc, 7),
    (FundingStreamReceiver::Foundation, 5),
    (FundingStreamReceiver::MajorGrants, 8),
];

/// Denominator as described in [ZIP-214].
///
/// [ZIP-214]: https://zips.z.cash/zip-0214
pub const FUNDING_STREAM_RECEIVER_DENOMINATOR: u64 = 100;

/// A funding stream recipient: the address flavor a stream pays to.
///
/// This is the shielded subset of the miner-address sum: transparent
/// streams pay a P2SH script, shielded streams pay a Sapling payment
/// address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FundingStreamRecipient {
    /// Pay the stream to a transparent script.
    Transparent(Script),
    /// Pay the stream to a Sapling address.
    Sapling(sapling::PaymentAddress),
}

/// A per-height funding stream element: who gets paid, and how much.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundingStreamElement {
    /// The receiver category of this stream.
    pub receiver: FundingStreamReceiver,
    /// The recipient address of this stream at the requested height.
    pub recipient: FundingStreamRecipient,
    /// The stream's share of the block subsidy at the requested height.
    pub value: Amount<NonNegative>,
}

/// The first halving height on Testnet, as described in [§7.10][7.10].
///
/// On Mainnet and Regtest the first halving coincides with Canopy
/// activation, so it is derived rather than constant.
///
/// [7.10]: https://zips.z.cash/protocol/protocol.pdf#fundingstreams
const FIRST_HALVING_TESTNET: Height = Height(1_116_000);

/// The first halving height on Regtest, derived from the regtest halving
/// interval and Blossom activation height.
const FIRST_HALVING_REGTEST: Height = Height(284);

impl Network {
    /// Returns the height of the end of the slow-start mining period.
    pub fn slow_start_interval(&self) -> Height {
        match self {
            Network::Mainnet | Network::Testnet => Height(20_000),
            Network::Regtest => Height(0),
        }
    }

    /// `SlowStartShift()` as described in [protocol specification §7.7][7.7].
    ///
    /// [7.7]: https://zips.z.cash/protocol/protocol.pdf#subsidies
    pub fn slow_start_shift(&self) -> Height {
        Height(self.slow_start_interval().0 / 2)
    }

    /// Returns the pre-Blossom halving interval for this network.
    pub fn pre_blossom_halving_interval(&self) -> Height {
        match self {
            Network::Mainnet | Network::Testnet => Height(840_000),
            Network::Regtest => Height(144),
        }
    }

    /// Returns the post-Blossom halving interval for this network.
    pub fn post_blossom_halving_interval(&self) -> Height {
        Height(self.pre_blossom_halving_interval().0 * BLOSSOM_POW_TARGET_SPACING_RATIO as u32)
    }

    /// Returns the minimum height after the first halving, as described in
    /// [protocol specification §7.10][7.10].
    ///
    /// [7.10]: https://zips.z.cash/protocol/protocol.pdf#fundingstreams
    pub fn height_for_first_halving(&self) -> Height {
        match self {
            Network::Mainnet => Canopy
                .activation_height(*self)
                .expect("canopy activation height is set"),
            Network::Testnet => FIRST_HALVING_TESTNET,
            Network::Regtest => FIRST_HALVING_REGTEST,
        }
    }

    /// Returns the funding stream height range for this network.
    ///
    /// Funding streams are active from Canopy activation to the second
    /// halving (first halving on Regtest, so regtest templates exercise
    /// the post-stream era quickly).
    pub fn funding_stream_height_range(&self) -> Range<Height> {
        match self {
            Network::Mainnet => Height(1_046_400)..Height(2_726_400),
            Network::Testnet => Height(1_028_500)..Height(2_796_000),
            Network::Regtest => Height(6)..FIRST_HALVING_REGTEST,
        }
    }
}

/// The divisor used for halvings.
///
/// `1 << Halving(height)`, as described in [protocol specification
/// §7.7][7.7].
///
/// Returns `None` if the divisor would overflow a `u64`: every subsidy
/// is zero from that height onwards.
///
/// [7.7]: https://zips.z.cash/protocol/protocol.pdf#subsidies
pub fn halving_divisor(height: Height, network: Network) -> Option<u64> {
    assert!(
        height >= network.slow_start_interval(),
        "subsidy is not defined during the slow-start interval",
    );

    let blossom_height = Blossom
        .activation_height(network)
        .expect("blossom activation height is set");

    let halving_shift = if height >= blossom_height {
        let scaled_pre_blossom_height =
            (blossom_height - network.slow_start_shift()) as u64 * BLOSSOM_POW_TARGET_SPACING_RATIO;
        let post_blossom_height = (height - blossom_height) as u64;
        (scaled_pre_blossom_height + post_blossom_height)
            / (network.post_blossom_halving_interval().0 as u64)
    } else {
        let scaled_pre_blossom_height = (height - network.slow_start_shift()) as u64;
        scaled_pre_blossom_height / (network.pre_blossom_halving_interval().0 as u64)
    };

    if halving_shift < 64 {
        Some(1 << halving_shift)
    } else {
        None
    }
}

/// `BlockSubsidy(height)` as described in [protocol specification
/// §7.7][7.7].
///
/// [7.7]: https://zips.z.cash/protocol/protocol.pdf#subsidies
pub fn block_subsidy(height: Height, network: Network) -> Result<Amount<NonNegative>, Error> {
    let blossom_height = Blossom
        .activation_height(network)
        .expect("blossom activation height is set");

    let Some(halving_div) = halving_divisor(height, network) else {
        return Amount::try_from(0i64);
    };

    if height >= blossom_height {
        let scaled_max_block_subsidy = MAX_BLOCK_SUBSIDY / BLOSSOM_POW_TARGET_SPACING_RATIO;
        // in future halvings, this calculation might not be exact:
        // Amount division is integer division, which truncates
        Amount::try_from(scaled_max_block_subsidy / halving_div)
    } else {
        // this calculation is exact, because the halving divisor is 1 here
        Amount::try_from(MAX_BLOCK_SUBSIDY / halving_div)
    }
}

/// `MinerSubsidy(height)` as described in [protocol specification
/// §7.7][7.7].
///
/// `non_miner_reward` is the founders' reward or the funding stream total.
/// If all the rewards for a block go to the miner, use `None`.
///
/// [7.7]: https://zips.z.cash/protocol/protocol.pdf#subsidies
pub fn miner_subsidy(
    height: Height,
    network: Network,
    non_miner_reward: Option<Amount<NonNegative>>,
) -> Result<Amount<NonNegative>, Error> {
    if let Some(non_miner_reward) = non_miner_reward {
        block_subsidy(height, network)? - non_miner_reward
    } else {
        block_subsidy(height, network)
    }
}

/// Returns the `fs.Value(height)` for each active stream receiver, paired
/// with the stream's recipient at `height`, in protocol order.
///
/// Returns an empty vector outside the funding stream height range.
pub fn funding_stream_elements(
    height: Height,
    network: Network,
    block_subsidy: Amount<NonNegative>,
) -> Result<Vec<FundingStreamElement>, Error> {
    if !network.funding_stream_height_range().contains(&height) {
        return Ok(Vec::new());
    }

    let mut elements = Vec::with_capacity(FUNDING_STREAM_RECEIVER_NUMERATORS.len());
    for &(receiver, numerator) in FUNDING_STREAM_RECEIVER_NUMERATORS {
        // - Spec equation: `fs.value = floor(block_subsidy(height) *
        //   (fs.numerator / fs.denominator))`. Rust integer division
        //   truncates towards zero, which is `floor()` for positive values.
        let value = ((block_subsidy * numerator)? / FUNDING_STREAM_RECEIVER_DENOMINATOR)?;

        elements.push(FundingStreamElement {
            receiver,
            recipient: funding_stream_recipient(height, network, receiver),
            value,
        });
    }

    Ok(elements)
}

/// Returns the address change period, as described in [protocol
/// specification §7.10][7.10].
///
/// [7.10]: https://zips.z.cash/protocol/protocol.pdf#fundingstreams
fn funding_stream_address_period(height: Height, network: Network) -> u32 {
    // Spec equation: `address_period = floor((height - (height_for_halving(1)
    // - post_blossom_halving_interval)) / funding_stream_address_change_interval)`.
    (height.0 + network.post_blossom_halving_interval().0 - network.height_for_first_halving().0)
        / funding_stream_address_change_interval(network).0
}

/// The number of Mainnet recipient table entries per receiver.
///
/// The address change interval is derived from this count on every
/// network; the Testnet tables carry an extra entry because the Testnet
/// funding stream range is not aligned to its first halving.
const FUNDING_STREAMS_NUM_ADDRESSES_MAINNET: u32 = 2;

/// Returns the interval at which funding stream addresses change.
fn funding_stream_address_change_interval(network: Network) -> Height {
    Height(network.post_blossom_halving_interval().0 / FUNDING_STREAMS_NUM_ADDRESSES_MAINNET)
}

/// Returns the number of entries in each receiver's recipient table for
/// `network`.
fn funding_stream_num_addresses(network: Network) -> usize {
    match network {
        Network::Mainnet | Network::Regtest => 2,
        Network::Testnet => 3,
    }
}

/// Returns the position in the recipient table for each funding stream, as
/// described in [protocol specification §7.10][7.10].
///
/// [7.10]: https://zips.z.cash/protocol/protocol.pdf#fundingstreams
fn funding_stream_address_index(height: Height, network: Network) -> usize {
    let num_addresses = funding_stream_num_addresses(network);

    let index = 1u32
        .checked_add(funding_stream_address_period(height, network))
        .expect("no overflow should happen in this sum")
        .checked_sub(funding_stream_address_period(
            network.funding_stream_height_range().start,
            network,
        ))
        .expect("no overflow should happen in this sub") as usize;

    assert!(index > 0 && index <= num_addresses);
    // the spec formula outputs an index starting at 1, but our recipient
    // tables start at zero
    index - 1
}

/// Returns the recipient corresponding to a height, network, and funding
/// stream receiver.
pub fn funding_stream_recipient(
    height: Height,
    network: Network,
    receiver: FundingStreamReceiver,
) -> FundingStreamRecipient {
    let index = funding_stream_address_index(height, network);

    match receiver {
        FundingStreamReceiver::Ecc => {
            let raw = match network {
                Network::Mainnet => &recipients::ECC_SAPLING_MAINNET[..],
                Network::Testnet => &recipients::ECC_SAPLING_TESTNET[..],
                Network::Regtest => &recipients::ECC_SAPLING_REGTEST[..],
            };
            FundingStreamRecipient::Sapling(sapling::PaymentAddress::from_bytes(raw[index]))
        }
        FundingStreamReceiver::Foundation | FundingStreamReceiver::MajorGrants => {
            let table = match (receiver, network) {
                (FundingStreamReceiver::Foundation, Network::Mainnet) => {
                    &recipients::FOUNDATION_P2SH_MAINNET[..]
                }
                (FundingStreamReceiver::Foundation, Network::Testnet) => {
                    &recipients::FOUNDATION_P2SH_TESTNET[..]
                }
                (FundingStreamReceiver::Foundation, Network::Regtest) => {
                    &recipients::FOUNDATION_P2SH_REGTEST[..]
                }
                (_, Network::Mainnet) => &recipients::MAJOR_GRANTS_P2SH_MAINNET[..],
                (_, Network::Testnet) => &recipients::MAJOR_GRANTS_P2SH_TESTNET[..],
                (_, Network::Regtest) => &recipients::MAJOR_GRANTS_P2SH_REGTEST[..],
            };
            FundingStreamRecipient::Transparent(Script::pay_to_script_hash(&table[index]))
        }
    }
}

/// `FoundersReward(height)` as described in [protocol specification
/// §7.7][7.7].
///
/// [7.7]: https://zips.z.cash/protocol/protocol.pdf#subsidies
pub fn founders_reward(height: Height, network: Network) -> Result<Amount<NonNegative>, Error> {
    if halving_divisor(height, network) == Some(1) {
        // this calculation is exact, because the block subsidy is divisible
        // by the founders' fraction divisor until long after the first
        // halving
        block_subsidy(height, network)? / FOUNDERS_FRACTION_DIVISOR
    } else {
        Amount::try_from(0i64)
    }
}

/// Returns the last height at which the founders' reward is paid.
///
/// The founders' reward ends without replacement if Canopy is not
/// activated by this height + 1.
pub fn last_founders_reward_height(network: Network) -> Height {
    Height(network.height_for_first_halving().0 - 1)
}

/// The interval at which the founders' reward address changes, before
/// Blossom.
const FOUNDER_ADDRESS_CHANGE_INTERVAL: u32 = 210_000;

/// Returns the founders' reward P2SH script for the given height, as
/// described in [protocol specification §7.8][7.8].
///
/// # Panics
///
/// If `height` is past the last founders' reward height.
///
/// [7.8]: https://zips.z.cash/protocol/canopy.pdf#foundersreward
pub fn founders_reward_script(height: Height, network: Network) -> Script {
    assert!(
        height <= last_founders_reward_height(network),
        "no founders' reward script after the first halving",
    );

    let blossom_height = Blossom
        .activation_height(network)
        .expect("blossom activation height is set");

    // After Blossom, the address change interval doubles in block units,
    // because the block spacing halved.
    let mut adjusted_height = height;
    if height >= blossom_height {
        adjusted_height = Height(
            blossom_height.0
                + ((height.0 - blossom_height.0) / (BLOSSOM_POW_TARGET_SPACING_RATIO as u32)),
        );
    }

    let address_index = 1 + (adjusted_height.0 / FOUNDER_ADDRESS_CHANGE_INTERVAL);

    let table = match network {
        Network::Mainnet | Network::Regtest => &recipients::FOUNDERS_P2SH_MAINNET[..],
        Network::Testnet => &recipients::FOUNDERS_P2SH_TESTNET[..],
    };

    Script::pay_to_script_hash(&table[(address_index - 1) as usize])
}

/// The raw recipient tables for funding streams and the founders' reward.
///
/// Sapling recipients are raw payment address encodings (11-byte
/// diversifier followed by the 32-byte transmission key); transparent
/// recipients are P2SH script hashes.
mod recipients {
    /// ECC Sapling payment addresses, Mainnet.
    pub(super) const ECC_SAPLING_MAINNET: [[u8; 43]; 2] = [
        [
            0x07, 0xf5, 0x6a, 0xf3, 0x63, 0xa7, 0x6f, 0xe7, 0x9e, 0xb6, 0x4f, 0xcb, 0x03, 0x62,
            0x11, 0x31, 0xdb, 0x18, 0x2b, 0xc3, 0xb7, 0x54, 0x9d, 0xbf, 0xac, 0x1e, 0xcd, 0x97,
            0x58, 0x55, 0x2f, 0xd8, 0xb5, 0xdf, 0x00, 0x21, 0x59, 0x4d, 0x0b, 0xf8, 0x9c, 0xcd,
            0xf0,
        ],
        [
            0x0c, 0x42, 0xd7, 0x3c, 0xfe, 0xe0, 0x9b, 0x36, 0xeb, 0xda, 0xa7, 0x2c, 0x48, 0x3e,
            0xc4, 0x7e, 0x80, 0x99, 0xb4, 0x0f, 0xcf, 0x0f, 0xf0, 0x3b, 0x83, 0x35, 0x65, 0x17,
            0xea, 0xcb, 0x6a, 0x54, 0x2b, 0xa4, 0x1f, 0x8d, 0xe8, 0x59, 0x4d, 0xa5, 0x63, 0xba,
            0x69,
        ],
    ];

    /// ECC Sapling payment addresses, Testnet.
    pub(super) const ECC_SAPLING_TESTNET: [[u8; 43]; 3] = [
        [
            0xe8, 0xca, 0xde, 0x96, 0x8b, 0xc6, 0xd3, 0x5b, 0x9f, 0x50, 0x11, 0xdf, 0x86, 0x37,
            0xfa, 0xfd, 0x1f, 0xc9, 0xc9, 0x49, 0xde, 0x9e, 0x5c, 0xe4, 0xb8, 0xee, 0x36, 0xcb,
            0x3e, 0x03, 0x58, 0x13, 0x25, 0x3a, 0x08, 0x3f, 0x1b, 0x60, 0x4f, 0x97, 0xc9, 0xb3,
            0x9d,
        ],
        [
            0xe0, 0x70, 0xb3, 0x75, 0xd1, 0x58, 0x8b, 0x96, 0xd2, 0x5f, 0x6a, 0x7d, 0x89, 0x69,
            0x5e, 0x23, 0x6b, 0x8e, 0x9f, 0x52, 0x41, 0x2d, 0xaa, 0x27, 0xe6, 0xa7, 0x7e, 0x8d,
            0xef, 0x54, 0x42, 0x60, 0x03, 0x03, 0xb9, 0x86, 0xc0, 0xac, 0x32, 0x5f, 0x81, 0x79,
            0x04,
        ],
        [
            0xb8, 0xa8, 0x62, 0xd3, 0x33, 0x3d, 0xe1, 0xa4, 0x01, 0xb7, 0x3b, 0x14, 0x20, 0xbb,
            0xfa, 0xa8, 0x4b, 0x35, 0x71, 0x74, 0xec, 0xfa, 0x4b, 0x04, 0x60, 0x77, 0x3b, 0xd1,
            0xa0, 0x05, 0x63, 0x84, 0xf9, 0x8a, 0x51, 0xf6, 0x22, 0x2c, 0xd9, 0x96, 0xf6, 0xdc,
            0xc2,
        ],
    ];

    /// ECC Sapling payment addresses, Regtest.
    pub(super) const ECC_SAPLING_REGTEST: [[u8; 43]; 2] = [
        [
            0x9e, 0xc8, 0xaf, 0xd9, 0xf8, 0x03, 0x85, 0xae, 0xae, 0xe8, 0xbb, 0x34, 0xbb, 0x99,
            0xd8, 0x91, 0x2d, 0x55, 0xd6, 0x72, 0x33, 0x28, 0xd0, 0xaf, 0x45, 0x89, 0x2c, 0x1b,
            0x6d, 0x21, 0xcf, 0x9a, 0xbd, 0x17, 0x97, 0x18, 0xf8, 0x8a, 0xec, 0x07, 0xb1, 0x84,
            0xfa,
        ],
        [
            0x18, 0x89, 0x66, 0x9b, 0xdd, 0x53, 0xf7, 0xe5, 0x00, 0xc8, 0xa5, 0x2b, 0x28, 0xff,
            0x47, 0x59, 0xb1, 0x39, 0xb0, 0x6e, 0x56, 0x81, 0x06, 0xe7, 0xb7, 0x13, 0xf2, 0xe3,
            0x2f, 0xcf, 0x2d, 0x4b, 0x9b, 0x2f, 0x86, 0xb4, 0xd5, 0x24, 0x74, 0x0b, 0xae, 0x4b,
            0x14,
        ],
    ];

    /// Foundation P2SH script hashes, Mainnet.
    pub(super) const FOUNDATION_P2SH_MAINNET: [[u8; 20]; 2] = [
        [
            0x7f, 0x52, 0x8b, 0x37, 0xf4, 0xa5, 0xb6, 0x68, 0x29, 0xe0, 0xc8, 0x36, 0x1c, 0xea,
            0x19, 0x05, 0xca, 0xb7, 0xba, 0x17,
        ],
        [
            0x27, 0xe3, 0xef, 0x3b, 0xd4, 0x69, 0xfc, 0xc8, 0x9f, 0xd0, 0x1e, 0x85, 0x09, 0x9b,
            0x0a, 0x9e, 0x88, 0xf4, 0x4b, 0xf4,
        ],
    ];

    /// Foundation P2SH script hashes, Testnet.
    pub(super) const FOUNDATION_P2SH_TESTNET: [[u8; 20]; 3] = [
        [
            0xe1, 0x95, 0x0f, 0x69, 0x35, 0xa1, 0x5e, 0x36, 0xbc, 0x67, 0x10, 0xca, 0x63, 0x08,
            0x6c, 0xf3, 0xc3, 0x09, 0x11, 0x1a,
        ],
        [
            0x96, 0xce, 0x02, 0xab, 0x4b, 0x43, 0x56, 0xe9, 0xb5, 0x5d, 0x7d, 0xf2, 0x33, 0x28,
            0xea, 0xb1, 0x75, 0x89, 0x98, 0x97,
        ],
        [
            0x43, 0xec, 0x9f, 0xa4, 0x14, 0xc1, 0xbc, 0x72, 0x71, 0xa4, 0xb4, 0x33, 0x9f, 0x3a,
            0xa3, 0xfb, 0x7d, 0x59, 0x85, 0x63,
        ],
    ];

    /// Foundation P2SH script hashes, Regtest.
    pub(super) const FOUNDATION_P2SH_REGTEST: [[u8; 20]; 2] = [
        [
            0x92, 0xfe, 0xf3, 0xac, 0x27, 0xb4, 0x37, 0xb8, 0x8b, 0xb9, 0xd1, 0xc3, 0x78, 0xc7,
            0x2c, 0x1d, 0x70, 0x77, 0xf2, 0xc6,
        ],
        [
            0x08, 0xad, 0x45, 0x14, 0x64, 0xa8, 0x48, 0x5d, 0xf2, 0x6e, 0x4a, 0x13, 0xa6, 0x0a,
            0x3e, 0xbe, 0xe3, 0xdb, 0xa2, 0x48,
        ],
    ];

    /// Major grants P2SH script hashes, Mainnet.
    pub(super) const MAJOR_GRANTS_P2SH_MAINNET: [[u8; 20]; 2] = [
        [
            0x55, 0xb8, 0xd4, 0x5a, 0x3a, 0xb5, 0x31, 0x0d, 0xfd, 0x35, 0x59, 0x64, 0xa8, 0xc4,
            0xa2, 0xac, 0xb2, 0x98, 0xb8, 0x47,
        ],
        [
            0xf6, 0xaa, 0x0f, 0x28, 0x8c, 0x6a, 0x83, 0xb9, 0x31, 0x20, 0x8f, 0x07, 0xb6, 0xc8,
            0xeb, 0xac, 0x55, 0xa2, 0x4c, 0x24,
        ],
    ];

    /// Major grants P2SH script hashes, Testnet.
    pub(super) const MAJOR_GRANTS_P2SH_TESTNET: [[u8; 20]; 3] = [
        [
            0x43, 0x5c, 0x67, 0x24, 0x1e, 0x4d, 0xd2, 0x13, 0xcd, 0x3c, 0x9e, 0x84, 0x1b, 0xbe,
            0x03, 0x25, 0xf3, 0x48, 0x16, 0xd1,
        ],
        [
            0x21, 0x7e, 0x0b, 0xcd, 0xdf, 0x05, 0x24, 0x6a, 0xd9, 0x63, 0x02, 0xcd, 0x7b, 0x4f,
            0x11, 0xee, 0x5e, 0xb5, 0x70, 0x7a,
        ],
        [
            0xd5, 0x0d, 0xdc, 0x1d, 0xe4, 0xa2, 0xaf, 0xd6, 0x19, 0x9c, 0x1b, 0x38, 0x72, 0x14,
            0xf0, 0xf3, 0xc6, 0xa5, 0x17, 0xd6,
        ],
    ];

    /// Major grants P2SH script hashes, Regtest.
    pub(super) const MAJOR_GRANTS_P2SH_REGTEST: [[u8; 20]; 2] = [
        [
            0x2f, 0x6f, 0x34, 0x33, 0x25, 0x71, 0x3c, 0x8a, 0x07, 0xe9, 0x15, 0x0f, 0x38, 0xdc,
            0x81, 0xd0, 0xb1, 0xb3, 0x2c, 0x40,
        ],
        [
            0x9b, 0x01, 0x5a, 0x99, 0x1b, 0x4e, 0x1a, 0xa0, 0xd1, 0xb1, 0xf3, 0xa8, 0x97, 0xfa,
            0xf0, 0x2e, 0xb5, 0x13, 0x1a, 0x72,
        ],
    ];

    /// Founders' reward P2SH script hashes, Mainnet.
    pub(super) const FOUNDERS_P2SH_MAINNET: [[u8; 20]; 5] = [
        [
            0x8b, 0x93, 0x0b, 0x6f, 0xd3, 0xcb, 0xac, 0x9d, 0x80, 0xbe, 0x50, 0xc1, 0x61, 0x77,
            0x9a, 0x1b, 0x18, 0x76, 0x72, 0x54,
        ],
        [
            0xd5, 0xe2, 0x9b, 0x83, 0x3d, 0xc4, 0xbb, 0xde, 0xc2, 0xfe, 0x9e, 0x7a, 0x98, 0x44,
            0xa5, 0x0a, 0xb9, 0xda, 0x2f, 0x2e,
        ],
        [
            0x8c, 0xdd, 0x58, 0x83, 0x6b, 0x64, 0xda, 0x9c, 0x41, 0x10, 0xb7, 0x48, 0xc7, 0x78,
            0x26, 0xf3, 0xf1, 0xdf, 0x61, 0x1a,
        ],
        [
            0x67, 0x74, 0x80, 0xa9, 0xf7, 0x6e, 0xf6, 0xbe, 0xda, 0xa6, 0xf3, 0x6d, 0x6a, 0xdd,
            0x50, 0xeb, 0x2c, 0x1d, 0x78, 0x3d,
        ],
        [
            0xbb, 0xae, 0x71, 0x5e, 0xe0, 0x56, 0xc3, 0xdf, 0xd7, 0xf8, 0xa5, 0xbe, 0x2f, 0xc8,
            0x14, 0x5d, 0x43, 0x4c, 0x63, 0x30,
        ],
    ];

    /// Founders' reward P2SH script hashes, Testnet.
    pub(super) const FOUNDERS_P2SH_TESTNET: [[u8; 20]; 5] = [
        [
            0xb6, 0x80, 0xde, 0x22, 0xab, 0x24, 0x60, 0x9a, 0x0d, 0xb5, 0x95, 0xad, 0x32, 0x98,
            0x74, 0x1c, 0xdb, 0x25, 0x1d, 0x0e,
        ],
        [
            0x79, 0x62, 0xba, 0x8b, 0x5c, 0xe6, 0x19, 0xad, 0xeb, 0xfe, 0x47, 0x57, 0xd5, 0x73,
            0x8f, 0xfe, 0x0c, 0xaf, 0x8f, 0x6b,
        ],
        [
            0x47, 0xaa, 0x6d, 0x59, 0xc8, 0x4e, 0xf8, 0x7f, 0x37, 0xa1, 0x43, 0xad, 0x2e, 0xf7,
            0x9c, 0x59, 0xe8, 0x89, 0xc0, 0x82,
        ],
        [
            0x17, 0x5e, 0x1a, 0x92, 0x84, 0xaa, 0x52, 0x3a, 0x89, 0xa4, 0x5f, 0xa1, 0x89, 0x79,
            0x61, 0xba, 0xdd, 0x9a, 0x85, 0x5c,
        ],
        [
            0xce, 0x4d, 0xdc, 0x14, 0x1f, 0x38, 0x2d, 0xe3, 0x58, 0x1f, 0x90, 0xc7, 0x86, 0x40,
            0x92, 0x50, 0xdc, 0x11, 0x3a, 0x7b,
        ],
    ];
}
