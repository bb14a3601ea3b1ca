//! Unified address parsing, following [ZIP-316].
//!
//! Only the container format is handled here: receivers are surfaced as
//! raw bytes, and the caller chooses among them.
//!
//! [ZIP-316]: https://zips.z.cash/zip-0316

use bech32::{FromBase32, ToBase32, Variant};

use quagga_chain::parameters::Network;

/// The human-readable parts of unified address encodings.
mod human_readable_parts {
    pub const MAINNET: &str = "u";
    pub const TESTNET: &str = "utest";
    pub const REGTEST: &str = "uregtest";
}

/// A single receiver inside a unified address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receiver {
    /// A transparent pay-to-public-key-hash receiver (typecode 0x00).
    P2pkh([u8; 20]),
    /// A transparent pay-to-script-hash receiver (typecode 0x01).
    P2sh([u8; 20]),
    /// A Sapling payment address receiver (typecode 0x02).
    Sapling([u8; 43]),
    /// An Orchard raw address receiver (typecode 0x03).
    Orchard([u8; 43]),
    /// A receiver with a typecode this node does not understand.
    ///
    /// Must be carried, not rejected, so that addresses from newer
    /// protocol versions keep working.
    Unknown {
        /// The unrecognized typecode.
        typecode: u64,
        /// The raw receiver data.
        data: Vec<u8>,
    },
}

impl Receiver {
    fn typecode(&self) -> u64 {
        match self {
            Receiver::P2pkh(_) => 0x00,
            Receiver::P2sh(_) => 0x01,
            Receiver::Sapling(_) => 0x02,
            Receiver::Orchard(_) => 0x03,
            Receiver::Unknown { typecode, .. } => *typecode,
        }
    }

    fn data(&self) -> &[u8] {
        match self {
            Receiver::P2pkh(data) => data,
            Receiver::P2sh(data) => data,
            Receiver::Sapling(data) => data,
            Receiver::Orchard(data) => data,
            Receiver::Unknown { data, .. } => data,
        }
    }
}

/// An error from unified address parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnifiedAddressError {
    /// The bech32m container is malformed.
    #[error("malformed unified address encoding")]
    MalformedEncoding,
    /// The address is for a different network.
    #[error("unified address is for a different network")]
    WrongNetwork,
    /// The jumbled padding does not match the human-readable part.
    #[error("unified address padding check failed")]
    BadPadding,
    /// The receiver list is malformed.
    #[error("malformed unified address receiver list")]
    MalformedReceivers,
}

/// The length of the trailing padding block: the human-readable part,
/// padded with zero bytes.
const PADDING_LEN: usize = 16;

fn hrp_for(network: Network) -> &'static str {
    match network {
        Network::Mainnet => human_readable_parts::MAINNET,
        Network::Testnet => human_readable_parts::TESTNET,
        Network::Regtest => human_readable_parts::REGTEST,
    }
}

fn padding_for(hrp: &str) -> [u8; PADDING_LEN] {
    let mut padding = [0; PADDING_LEN];
    padding[..hrp.len()].copy_from_slice(hrp.as_bytes());
    padding
}

/// Decode a unified address for `network`, returning its receivers in
/// encoding order.
pub fn decode(encoded: &str, network: Network) -> Result<Vec<Receiver>, UnifiedAddressError> {
    let (hrp, data, variant) =
        bech32::decode(encoded).map_err(|_| UnifiedAddressError::MalformedEncoding)?;

    if variant != Variant::Bech32m {
        return Err(UnifiedAddressError::MalformedEncoding);
    }
    if hrp != hrp_for(network) {
        return Err(UnifiedAddressError::WrongNetwork);
    }

    let jumbled =
        Vec::<u8>::from_base32(&data).map_err(|_| UnifiedAddressError::MalformedEncoding)?;
    let mut message =
        f4jumble::f4jumble_inv(&jumbled).ok_or(UnifiedAddressError::MalformedEncoding)?;

    if message.len() < PADDING_LEN {
        return Err(UnifiedAddressError::MalformedEncoding);
    }
    let padding = message.split_off(message.len() - PADDING_LEN);
    if padding != padding_for(&hrp) {
        return Err(UnifiedAddressError::BadPadding);
    }

    parse_receivers(&message)
}

/// Encode receivers as a unified address for `network`.
///
/// Receivers must be supplied in ascending typecode order.
pub fn encode(receivers: &[Receiver], network: Network) -> String {
    let hrp = hrp_for(network);

    let mut message = Vec::new();
    for receiver in receivers {
        write_compact(&mut message, receiver.typecode());
        write_compact(&mut message, receiver.data().len() as u64);
        message.extend_from_slice(receiver.data());
    }
    message.extend_from_slice(&padding_for(hrp));

    let jumbled = f4jumble::f4jumble(&message).expect("receiver lists are within jumble bounds");

    bech32::encode(hrp, jumbled.to_base32(), Variant::Bech32m).expect("hrp is always valid")
}

fn parse_receivers(mut message: &[u8]) -> Result<Vec<Receiver>, UnifiedAddressError> {
    let mut receivers = Vec::new();

    while !message.is_empty() {
        let typecode = read_compact(&mut message)?;
        let length = read_compact(&mut message)? as usize;
        if message.len() < length {
            return Err(UnifiedAddressError::MalformedReceivers);
        }
        let (data, rest) = message.split_at(length);
        message = rest;

        let receiver = match (typecode, length) {
            (0x00, 20) => Receiver::P2pkh(data.try_into().expect("length checked")),
            (0x01, 20) => Receiver::P2sh(data.try_into().expect("length checked")),
            (0x02, 43) => Receiver::Sapling(data.try_into().expect("length checked")),
            (0x03, 43) => Receiver::Orchard(data.try_into().expect("length checked")),
            (0x00..=0x03, _) => return Err(UnifiedAddressError::MalformedReceivers),
            (typecode, _) => Receiver::Unknown {
                typecode,
                data: data.to_vec(),
            },
        };
        receivers.push(receiver);
    }

    if receivers.is_empty() {
        return Err(UnifiedAddressError::MalformedReceivers);
    }

    Ok(receivers)
}

fn write_compact(out: &mut Vec<u8>, n: u64) {
    use quagga_chain::serialization::WriteZcashExt;
    out.write_compactsize(n).expect("writing to a vec never fails");
}

fn read_compact(message: &mut &[u8]) -> Result<u64, UnifiedAddressError> {
    use quagga_chain::serialization::ReadZcashExt;
    message
        .read_compactsize()
        .map_err(|_| UnifiedAddressError::MalformedReceivers)
}

/// The F4Jumble unkeyed permutation from [ZIP-316], and its inverse.
///
/// [ZIP-316]: https://zips.z.cash/zip-0316#jumbling
mod f4jumble {
    const MIN_LEN: usize = 48;
    const MAX_LEN: usize = 4_194_368;

    fn left_len(len: usize) -> usize {
        usize::min(64, len / 2)
    }

    /// The G round function: a variable-length BLAKE2b-512 stream.
    fn g_round(i: u8, u: &[u8], out_len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(out_len);
        let mut j: u16 = 0;
        while out.len() < out_len {
            let mut personal = [0u8; 16];
            personal[..13].copy_from_slice(b"UA_F4Jumble_G");
            personal[13] = i;
            personal[14..].copy_from_slice(&j.to_le_bytes());

            let hash = blake2b_simd::Params::new()
                .hash_length(64)
                .personal(&personal)
                .hash(u);
            let take = usize::min(64, out_len - out.len());
            out.extend_from_slice(&hash.as_bytes()[..take]);
            j += 1;
        }
        out
    }

    /// The H round function: a single BLAKE2b hash of the left length.
    fn h_round(i: u8, u: &[u8], out_len: usize) -> Vec<u8> {
        let mut personal = [0u8; 16];
        personal[..13].copy_from_slice(b"UA_F4Jumble_H");
        personal[13] = i;

        blake2b_simd::Params::new()
            .hash_length(out_len)
            .personal(&personal)
            .hash(u)
            .as_bytes()
            .to_vec()
    }

    fn xor(lhs: &mut [u8], rhs: &[u8]) {
        for (l, r) in lhs.iter_mut().zip(rhs) {
            *l ^= r;
        }
    }

    /// Apply the F4Jumble permutation to `message`.
    ///
    /// Returns `None` if the message length is out of bounds.
    pub(super) fn f4jumble(message: &[u8]) -> Option<Vec<u8>> {
        if message.len() < MIN_LEN || message.len() > MAX_LEN {
            return None;
        }

        let ll = left_len(message.len());
        let (a, b) = message.split_at(ll);
        let mut a = a.to_vec();
        let mut b = b.to_vec();

        xor(&mut b, &g_round(0, &a, b.len()));
        xor(&mut a, &h_round(0, &b, ll));
        xor(&mut b, &g_round(1, &a, b.len()));
        xor(&mut a, &h_round(1, &b, ll));

        a.extend_from_slice(&b);
        Some(a)
    }

    /// Invert the F4Jumble permutation.
    ///
    /// Returns `None` if the message length is out of bounds.
    pub(super) fn f4jumble_inv(jumbled: &[u8]) -> Option<Vec<u8>> {
        if jumbled.len() < MIN_LEN || jumbled.len() > MAX_LEN {
            return None;
        }

        let ll = left_len(jumbled.len());
        let (c, d) = jumbled.split_at(ll);
        let mut a = c.to_vec();
        let mut b = d.to_vec();

        xor(&mut a, &h_round(1, &b, ll));
        xor(&mut b, &g_round(1, &a, b.len()));
        xor(&mut a, &h_round(0, &b, ll));
        xor(&mut b, &g_round(0, &a, b.len()));

        a.extend_from_slice(&b);
        Some(a)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn jumble_round_trips() {
            let message: Vec<u8> = (0..140u8).collect();
            let jumbled = f4jumble(&message).unwrap();
            assert_ne!(jumbled, message);
            assert_eq!(f4jumble_inv(&jumbled).unwrap(), message);
        }

        #[test]
        fn out_of_bounds_lengths_are_rejected() {
            assert!(f4jumble(&[0; MIN_LEN - 1]).is_none());
            assert!(f4jumble_inv(&[0; MIN_LEN - 1]).is_none());
        }

        proptest::proptest! {
            #[test]
            fn jumble_inverts_for_all_lengths(message in proptest::collection::vec(
                proptest::prelude::any::<u8>(),
                MIN_LEN..=256,
            )) {
                let jumbled = f4jumble(&message).expect("length is in bounds");
                proptest::prop_assert_eq!(f4jumble_inv(&jumbled).expect("length is in bounds"), message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_address_round_trips() {
        let receivers = vec![
            Receiver::P2pkh([1; 20]),
            Receiver::Sapling([2; 43]),
            Receiver::Orchard([3; 43]),
        ];

        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            let encoded = encode(&receivers, network);
            let decoded = decode(&encoded, network).unwrap();
            assert_eq!(decoded, receivers);
        }
    }

    #[test]
    fn mainnet_address_is_rejected_on_testnet() {
        let receivers = vec![Receiver::Orchard([3; 43])];
        let encoded = encode(&receivers, Network::Mainnet);
        assert_eq!(
            decode(&encoded, Network::Testnet),
            Err(UnifiedAddressError::WrongNetwork),
        );
    }

    #[test]
    fn unknown_receivers_are_carried() {
        let receivers = vec![
            Receiver::Sapling([2; 43]),
            Receiver::Unknown {
                typecode: 0x07,
                data: vec![0xAA; 32],
            },
        ];
        let encoded = encode(&receivers, Network::Mainnet);
        let decoded = decode(&encoded, Network::Mainnet).unwrap();
        assert_eq!(decoded, receivers);
    }
}
