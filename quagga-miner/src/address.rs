//! Miner reward recipients.

use std::fmt;

use quagga_chain::{
    block::Height,
    orchard,
    parameters::{Network, NetworkUpgrade},
    sapling,
    transparent::{self, Script},
};

use crate::{error::MinerError, unified};

/// The recipient of the miner's share of a block's rewards.
///
/// Decoded once at mining startup from the `miner_address` config option,
/// and dispatched on throughout the coinbase builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MinerAddress {
    /// Pay the miner to a transparent script.
    Transparent(Script),
    /// Pay the miner to a Sapling shielded address.
    Sapling(sapling::PaymentAddress),
    /// Pay the miner to an Orchard shielded address.
    Orchard(orchard::Address),
}

impl fmt::Display for MinerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinerAddress::Transparent(_) => f.write_str("transparent miner address"),
            MinerAddress::Sapling(_) => f.write_str("sapling miner address"),
            MinerAddress::Orchard(_) => f.write_str("orchard miner address"),
        }
    }
}

impl MinerAddress {
    /// Returns `true` when the miner's share is paid into a shielded pool.
    pub fn is_shielded(&self) -> bool {
        !matches!(self, MinerAddress::Transparent(_))
    }

    /// Decodes a miner address from its configured encoding.
    ///
    /// Supports transparent Base58Check addresses, Sapling Bech32
    /// addresses, and unified addresses. Unified addresses resolve to
    /// their preferred receiver at the target height: Orchard receivers
    /// are only usable once NU5 is active.
    ///
    /// The `height` is the next block height when mining starts, so a
    /// unified address with an Orchard component starts being used as
    /// soon as the chain reaches NU5.
    pub fn decode(
        encoded: &str,
        network: Network,
        height: Height,
    ) -> Result<MinerAddress, MinerError> {
        // Transparent Base58Check addresses
        if let Ok(address) = encoded.parse::<transparent::Address>() {
            if address.network() != expected_transparent_network(network) {
                return Err(MinerError::InvalidMinerAddress(format!(
                    "transparent address is for {}, expected {network}",
                    address.network(),
                )));
            }
            return Ok(MinerAddress::Transparent(
                address.create_script_from_address(),
            ));
        }

        // Sapling Bech32 addresses
        if let Ok((address_network, address)) = sapling::PaymentAddress::decode(encoded) {
            if address_network != network {
                return Err(MinerError::InvalidMinerAddress(format!(
                    "sapling address is for {address_network}, expected {network}",
                )));
            }
            return Ok(MinerAddress::Sapling(address));
        }

        // Unified addresses
        if let Ok(receivers) = unified::decode(encoded, network) {
            return Self::preferred_recipient(&receivers, network, height).ok_or_else(|| {
                MinerError::InvalidMinerAddress(
                    "unified address has no receiver usable for mining at this height"
                        .to_string(),
                )
            });
        }

        Err(MinerError::InvalidMinerAddress(format!(
            "unrecognized address encoding: {encoded:?}",
        )))
    }

    /// Resolve a unified address's receivers to the preferred miner
    /// recipient at `height`.
    ///
    /// Orchard is preferred over Sapling, which is preferred over
    /// transparent receivers; an Orchard receiver is skipped below NU5
    /// activation.
    fn preferred_recipient(
        receivers: &[unified::Receiver],
        network: Network,
        height: Height,
    ) -> Option<MinerAddress> {
        let nu5_active = NetworkUpgrade::Nu5.is_active_at(network, height);

        let mut best: Option<MinerAddress> = None;
        for receiver in receivers {
            let candidate = match receiver {
                unified::Receiver::Orchard(raw) if nu5_active => {
                    // Orchard is the most preferred receiver, stop looking.
                    return Some(MinerAddress::Orchard(orchard::Address(*raw)));
                }
                unified::Receiver::Orchard(_) => continue,
                unified::Receiver::Sapling(raw) => {
                    MinerAddress::Sapling(sapling::PaymentAddress::from_bytes(*raw))
                }
                unified::Receiver::P2sh(hash) => {
                    MinerAddress::Transparent(Script::pay_to_script_hash(hash))
                }
                unified::Receiver::P2pkh(hash) => {
                    MinerAddress::Transparent(Script::pay_to_public_key_hash(hash))
                }
                unified::Receiver::Unknown { .. } => continue,
            };

            best = match (best, candidate) {
                (None, candidate) => Some(candidate),
                (Some(MinerAddress::Sapling(address)), _) => {
                    Some(MinerAddress::Sapling(address))
                }
                (Some(MinerAddress::Transparent(_)), candidate @ MinerAddress::Sapling(_)) => {
                    Some(candidate)
                }
                (best, _) => best,
            };
        }

        best
    }
}

/// Transparent addresses use Testnet encodings on every test network.
fn expected_transparent_network(network: Network) -> Network {
    match network {
        Network::Mainnet => Network::Mainnet,
        Network::Testnet | Network::Regtest => Network::Testnet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_address_decodes_to_script() {
        let address = transparent::Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [9; 20],
        };
        let miner =
            MinerAddress::decode(&address.to_string(), Network::Mainnet, Height(1_100_000))
                .unwrap();

        assert!(!miner.is_shielded());
        assert_eq!(
            miner,
            MinerAddress::Transparent(Script::pay_to_public_key_hash(&[9; 20])),
        );
    }

    #[test]
    fn sapling_address_decodes() {
        let address = sapling::PaymentAddress::from_bytes([3; 43]);
        let miner = MinerAddress::decode(
            &address.encode(Network::Mainnet),
            Network::Mainnet,
            Height(1_100_000),
        )
        .unwrap();

        assert!(miner.is_shielded());
        assert_eq!(miner, MinerAddress::Sapling(address));
    }

    #[test]
    fn wrong_network_is_rejected() {
        let address = sapling::PaymentAddress::from_bytes([3; 43]);
        let result = MinerAddress::decode(
            &address.encode(Network::Testnet),
            Network::Mainnet,
            Height(1_100_000),
        );
        assert!(matches!(result, Err(MinerError::InvalidMinerAddress(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let result = MinerAddress::decode("not-an-address", Network::Mainnet, Height(1));
        assert!(matches!(result, Err(MinerError::InvalidMinerAddress(_))));
    }

    #[test]
    fn unified_prefers_orchard_only_after_nu5() {
        let receivers = vec![
            unified::Receiver::P2pkh([1; 20]),
            unified::Receiver::Sapling([2; 43]),
            unified::Receiver::Orchard([3; 43]),
        ];

        // Orchard receiver wins once NU5 is active.
        let nu5 = NetworkUpgrade::Nu5
            .activation_height(Network::Mainnet)
            .unwrap();
        let miner =
            MinerAddress::preferred_recipient(&receivers, Network::Mainnet, nu5).unwrap();
        assert_eq!(miner, MinerAddress::Orchard(orchard::Address([3; 43])));

        // Before NU5, fall back to the Sapling receiver.
        let before = Height(nu5.0 - 1);
        let miner =
            MinerAddress::preferred_recipient(&receivers, Network::Mainnet, before).unwrap();
        assert_eq!(
            miner,
            MinerAddress::Sapling(sapling::PaymentAddress::from_bytes([2; 43])),
        );
    }
}
