//! Transparent address types.

use std::{fmt, io};

use crate::{
    parameters::Network,
    serialization::{sha256d, SerializationError},
    transparent::Script,
};

/// Magic numbers used to identify what networks transparent addresses are
/// associated with.
mod magics {
    pub mod p2sh {
        pub const MAINNET: [u8; 2] = [0x1c, 0xbd];
        pub const TESTNET: [u8; 2] = [0x1c, 0xba];
    }

    pub mod p2pkh {
        pub const MAINNET: [u8; 2] = [0x1c, 0xb8];
        pub const TESTNET: [u8; 2] = [0x1d, 0x25];
    }
}

/// Transparent Zcash-style addresses: the Bitcoin address format, with a
/// two-byte version prefix.
///
/// In Transparent Addresses, the Bitcoin `OP_CHECKSIG` script is still
/// used for pay-to-public-key-hash, and `OP_HASH160` for
/// pay-to-script-hash.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum Address {
    /// P2SH (Pay to Script Hash) addresses
    PayToScriptHash {
        /// The network this address is associated with.
        network: Network,
        /// 20 bytes specifying a script hash.
        script_hash: [u8; 20],
    },

    /// P2PKH (Pay to Public Key Hash) addresses
    PayToPublicKeyHash {
        /// The network this address is associated with.
        network: Network,
        /// 20 bytes specifying a public key hash, which is a RIPEMD-160
        /// hash of a SHA-256 hash of a compressed ECDSA key encoding.
        pub_key_hash: [u8; 20],
    },
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("TransparentAddress");

        match self {
            Address::PayToScriptHash {
                network,
                script_hash,
            } => debug_struct
                .field("network", network)
                .field("script_hash", &hex::encode(script_hash))
                .finish(),
            Address::PayToPublicKeyHash {
                network,
                pub_key_hash,
            } => debug_struct
                .field("network", network)
                .field("pub_key_hash", &hex::encode(pub_key_hash))
                .finish(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = Vec::with_capacity(22);

        let (magic, hash) = match self {
            Address::PayToScriptHash {
                network,
                script_hash,
            } => (
                match network {
                    Network::Mainnet => magics::p2sh::MAINNET,
                    Network::Testnet | Network::Regtest => magics::p2sh::TESTNET,
                },
                script_hash,
            ),
            Address::PayToPublicKeyHash {
                network,
                pub_key_hash,
            } => (
                match network {
                    Network::Mainnet => magics::p2pkh::MAINNET,
                    Network::Testnet | Network::Regtest => magics::p2pkh::TESTNET,
                },
                pub_key_hash,
            ),
        };

        io::Write::write_all(&mut bytes, &magic).expect("writing to a vec never fails");
        io::Write::write_all(&mut bytes, hash).expect("writing to a vec never fails");

        f.write_str(&bs58::encode(bytes).with_check().into_string())
    }
}

impl std::str::FromStr for Address {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .with_check(None)
            .into_vec()
            .map_err(|_| SerializationError::Parse("t-addr has invalid base58check encoding"))?;

        if bytes.len() != 22 {
            return Err(SerializationError::Parse("t-addr has invalid length"));
        }

        let magic = [bytes[0], bytes[1]];
        let hash: [u8; 20] = bytes[2..22].try_into().expect("22 byte address");

        match magic {
            magics::p2sh::MAINNET => Ok(Address::PayToScriptHash {
                network: Network::Mainnet,
                script_hash: hash,
            }),
            magics::p2sh::TESTNET => Ok(Address::PayToScriptHash {
                network: Network::Testnet,
                script_hash: hash,
            }),
            magics::p2pkh::MAINNET => Ok(Address::PayToPublicKeyHash {
                network: Network::Mainnet,
                pub_key_hash: hash,
            }),
            magics::p2pkh::TESTNET => Ok(Address::PayToPublicKeyHash {
                network: Network::Testnet,
                pub_key_hash: hash,
            }),
            _ => Err(SerializationError::Parse("t-addr has unknown version")),
        }
    }
}

impl Address {
    /// Returns the network this address is associated with.
    pub fn network(&self) -> Network {
        match self {
            Address::PayToScriptHash { network, .. } => *network,
            Address::PayToPublicKeyHash { network, .. } => *network,
        }
    }

    /// Create a lock script that pays to this address.
    pub fn create_script_from_address(&self) -> Script {
        match self {
            Address::PayToScriptHash { script_hash, .. } => Script::pay_to_script_hash(script_hash),
            Address::PayToPublicKeyHash { pub_key_hash, .. } => {
                Script::pay_to_public_key_hash(pub_key_hash)
            }
        }
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

/// Double-SHA256 checksum helper used by the Base58Check encoding above.
///
/// `bs58`'s check feature computes this internally; this helper is only
/// used by tests to cross-check encodings.
#[cfg(test)]
pub(crate) fn address_checksum(payload: &[u8]) -> [u8; 4] {
    let digest = sha256d::digest(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_base58check() {
        let address = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [0x7e; 20],
        };

        let encoded = address.to_string();
        assert!(encoded.starts_with("t1"), "unexpected prefix: {encoded}");

        let parsed: Address = encoded.parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn p2sh_address_prefix() {
        let address = Address::PayToScriptHash {
            network: Network::Mainnet,
            script_hash: [0x11; 20],
        };
        assert!(address.to_string().starts_with("t3"));
    }

    #[test]
    fn checksum_matches_bs58() {
        let address = Address::PayToPublicKeyHash {
            network: Network::Testnet,
            pub_key_hash: [0x01; 20],
        };
        let encoded = address.to_string();
        let decoded = bs58::decode(&encoded).into_vec().unwrap();

        let (payload, checksum) = decoded.split_at(decoded.len() - 4);
        assert_eq!(checksum, address_checksum(payload));

        let parsed: Address = encoded.parse().unwrap();
        assert_eq!(parsed.network(), Network::Testnet);
    }

    #[test]
    fn script_construction_matches_address_kind() {
        let p2sh = Address::PayToScriptHash {
            network: Network::Mainnet,
            script_hash: [0x22; 20],
        };
        assert!(p2sh.create_script_from_address().is_pay_to_script_hash());

        let p2pkh = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [0x22; 20],
        };
        assert_eq!(p2pkh.create_script_from_address().sigop_count(false), 1);
    }
}
