//! Sapling key and address types.
//!
//! Only the public address components are defined here: spending and
//! viewing keys live in the wallet, which this crate does not depend on.

use std::{
    fmt,
    io::{self, Read},
};

use bech32::{FromBase32, ToBase32, Variant};

use crate::{
    parameters::Network,
    serialization::{ReadZcashExt, SerializationError, ZcashDeserialize, ZcashSerialize},
};

/// The human-readable parts of Sapling payment address encodings.
mod human_readable_parts {
    pub const MAINNET: &str = "zs";
    pub const TESTNET: &str = "ztestsapling";
    pub const REGTEST: &str = "zregtestsapling";
}

/// A diversifier, as described in [protocol specification §4.2.2][ps].
///
/// [ps]: https://zips.z.cash/protocol/protocol.pdf#saplingkeycomponents
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Diversifier(pub [u8; 11]);

impl fmt::Debug for Diversifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Diversifier")
            .field(&hex::encode(self.0))
            .finish()
    }
}

/// A transmission key, the diversified payment address component that
/// notes are encrypted to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TransmissionKey(pub [u8; 32]);

impl fmt::Debug for TransmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("TransmissionKey")
            .field(&hex::encode(self.0))
            .finish()
    }
}

/// A Sapling shielded payment address.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PaymentAddress {
    /// The diversifier component.
    pub diversifier: Diversifier,
    /// The transmission key component.
    pub transmission_key: TransmissionKey,
}

impl fmt::Debug for PaymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PaymentAddress")
            .field("diversifier", &self.diversifier)
            .field("transmission_key", &self.transmission_key)
            .finish()
    }
}

impl PaymentAddress {
    /// Returns the raw encoding of this address: the 11 diversifier bytes
    /// followed by the 32 transmission key bytes.
    pub fn to_bytes(&self) -> [u8; 43] {
        let mut bytes = [0; 43];
        bytes[..11].copy_from_slice(&self.diversifier.0);
        bytes[11..].copy_from_slice(&self.transmission_key.0);
        bytes
    }

    /// Parses a payment address from its raw 43-byte encoding.
    pub fn from_bytes(bytes: [u8; 43]) -> Self {
        let mut diversifier = [0; 11];
        diversifier.copy_from_slice(&bytes[..11]);
        let mut transmission_key = [0; 32];
        transmission_key.copy_from_slice(&bytes[11..]);

        Self {
            diversifier: Diversifier(diversifier),
            transmission_key: TransmissionKey(transmission_key),
        }
    }

    /// Encodes this address in its Bech32 form for `network`.
    pub fn encode(&self, network: Network) -> String {
        let hrp = match network {
            Network::Mainnet => human_readable_parts::MAINNET,
            Network::Testnet => human_readable_parts::TESTNET,
            Network::Regtest => human_readable_parts::REGTEST,
        };

        bech32::encode(hrp, self.to_bytes().to_base32(), Variant::Bech32)
            .expect("hrp is always valid")
    }

    /// Decodes a Bech32 Sapling payment address, returning the network its
    /// human-readable part names.
    pub fn decode(input: &str) -> Result<(Network, Self), SerializationError> {
        let (hrp, data, variant) = bech32::decode(input)
            .map_err(|_| SerializationError::Parse("invalid bech32 encoding"))?;

        if variant != Variant::Bech32 {
            return Err(SerializationError::Parse(
                "sapling addresses use the original bech32 checksum",
            ));
        }

        let network = match hrp.as_str() {
            human_readable_parts::MAINNET => Network::Mainnet,
            human_readable_parts::TESTNET => Network::Testnet,
            human_readable_parts::REGTEST => Network::Regtest,
            _ => {
                return Err(SerializationError::Parse(
                    "unknown sapling address prefix",
                ))
            }
        };

        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|_| SerializationError::Parse("invalid bech32 data"))?;
        let bytes: [u8; 43] = bytes
            .try_into()
            .map_err(|_| SerializationError::Parse("sapling addresses are 43 bytes"))?;

        Ok((network, Self::from_bytes(bytes)))
    }
}

impl ZcashSerialize for PaymentAddress {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&self.to_bytes())
    }
}

impl ZcashDeserialize for PaymentAddress {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut bytes = [0; 43];
        reader.read_exact(&mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_address_bytes_round_trip() {
        let mut bytes = [0u8; 43];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = i as u8;
        }

        let address = PaymentAddress::from_bytes(bytes);
        assert_eq!(address.to_bytes(), bytes);
    }

    #[test]
    fn payment_address_bech32_round_trip() {
        let address = PaymentAddress::from_bytes([7; 43]);

        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            let encoded = address.encode(network);
            let (parsed_network, parsed) = PaymentAddress::decode(&encoded).unwrap();
            assert_eq!(parsed_network, network);
            assert_eq!(parsed, address);
        }
    }

    #[test]
    fn mainnet_address_prefix() {
        let address = PaymentAddress::from_bytes([7; 43]);
        assert!(address.encode(Network::Mainnet).starts_with("zs1"));
    }
}
