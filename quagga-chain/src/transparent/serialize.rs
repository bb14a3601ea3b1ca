//! Consensus-critical serialization of transparent components.

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    block,
    serialization::{
        ReadZcashExt, SerializationError, TrustedPreallocate, WriteZcashExt, ZcashDeserialize,
        ZcashDeserializeInto, ZcashSerialize, MAX_PROTOCOL_MESSAGE_LEN,
    },
    transaction,
};

use super::{CoinbaseData, Input, OutPoint, Output, Script};

/// The maximum length of the combined coinbase height and coinbase data,
/// in bytes. This is the consensus limit on the coinbase scriptSig.
pub const MAX_COINBASE_DATA_LEN: usize = 100;

impl ZcashSerialize for OutPoint {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        writer.write_all(&self.hash.0[..])?;
        writer.write_u32::<LittleEndian>(self.index)?;
        Ok(())
    }
}

impl ZcashDeserialize for OutPoint {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        Ok(OutPoint {
            hash: transaction::Hash(reader.read_32_bytes()?),
            index: reader.read_u32::<LittleEndian>()?,
        })
    }
}

// Coinbase inputs include block heights (BIP34). These are not encoded
// directly, but as a Bitcoin script that pushes the block height to the
// stack when executed. The script data is otherwise unused. Because we want
// to *parse* transactions into an internal representation where illegal
// states are unrepresentable, we need just enough parsing of Bitcoin
// scripts to parse the coinbase height and split off the rest of the
// (inert) coinbase data.

fn parse_coinbase_height(
    mut data: Vec<u8>,
) -> Result<(block::Height, CoinbaseData), SerializationError> {
    use block::Height;
    match (data.first(), data.len()) {
        // Genesis block does not include a height.
        (Some(0x00), _) => Ok((Height(0), CoinbaseData(data))),
        // Blocks 1 through 16 inclusive encode block height with OP_N opcodes.
        (Some(op_n @ 0x51..=0x60), len) if len >= 1 => Ok((
            Height((op_n - 0x50) as u32),
            CoinbaseData(data.split_off(1)),
        )),
        // Blocks 17 through 128 exclusive encode block height with the `0x01` opcode.
        // The Bitcoin encoding requires that the most significant byte is below 0x80.
        (Some(0x01), len) if len >= 2 && data[1] < 0x80 => {
            Ok((Height(data[1] as u32), CoinbaseData(data.split_off(2))))
        }
        // Blocks 128 through 32768 exclusive encode block height with the `0x02` opcode.
        (Some(0x02), len) if len >= 3 && data[2] < 0x80 => Ok((
            Height(data[1] as u32 + ((data[2] as u32) << 8)),
            CoinbaseData(data.split_off(3)),
        )),
        // Blocks 32768 through 2**23 exclusive encode block height with the `0x03` opcode.
        (Some(0x03), len) if len >= 4 && data[3] < 0x80 => Ok((
            Height(data[1] as u32 + ((data[2] as u32) << 8) + ((data[3] as u32) << 16)),
            CoinbaseData(data.split_off(4)),
        )),
        // Blocks 2**23 and above encode block height with the `0x04` opcode.
        (Some(0x04), len) if len >= 5 && data[4] < 0x80 => {
            let h = data[1] as u32
                + ((data[2] as u32) << 8)
                + ((data[3] as u32) << 16)
                + ((data[4] as u32) << 24);
            if h <= Height::MAX.0 {
                Ok((Height(h), CoinbaseData(data.split_off(5))))
            } else {
                Err(SerializationError::Parse("invalid block height"))
            }
        }
        _ => Err(SerializationError::Parse(
            "could not parse BIP34 height in coinbase data",
        )),
    }
}

pub(super) fn coinbase_height_len(height: block::Height) -> usize {
    // We can't write this as a match statement on stable until exclusive
    // range guards are stabilized.
    if let 0 = height.0 {
        0
    } else if let _h @ 1..=16 = height.0 {
        1
    } else if let _h @ 17..=127 = height.0 {
        2
    } else if let _h @ 128..=32767 = height.0 {
        3
    } else if let _h @ 32768..=8_388_607 = height.0 {
        4
    } else if let _h @ 8_388_608..=block::Height::MAX_AS_U32 = height.0 {
        5
    } else {
        panic!("invalid coinbase height");
    }
}

fn write_coinbase_height<W: io::Write>(height: block::Height, mut w: W) -> Result<(), io::Error> {
    // The Bitcoin encoding requires that the most significant byte is below
    // 0x80, so the ranges run up to 2^{n-1} rather than 2^n.
    if let 0 = height.0 {
        // Genesis block does not include a height.
    } else if let h @ 1..=16 = height.0 {
        w.write_u8(0x50 + (h as u8))?;
    } else if let h @ 17..=127 = height.0 {
        w.write_u8(0x01)?;
        w.write_u8(h as u8)?;
    } else if let h @ 128..=32767 = height.0 {
        w.write_u8(0x02)?;
        w.write_u16::<LittleEndian>(h as u16)?;
    } else if let h @ 32768..=8_388_607 = height.0 {
        w.write_u8(0x03)?;
        w.write_u8(h as u8)?;
        w.write_u8((h >> 8) as u8)?;
        w.write_u8((h >> 16) as u8)?;
    } else if let h @ 8_388_608..=block::Height::MAX_AS_U32 = height.0 {
        w.write_u8(0x04)?;
        w.write_u32::<LittleEndian>(h)?;
    } else {
        panic!("invalid coinbase height");
    }
    Ok(())
}

impl ZcashSerialize for Input {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            } => {
                outpoint.zcash_serialize(&mut writer)?;
                unlock_script.zcash_serialize(&mut writer)?;
                writer.write_u32::<LittleEndian>(*sequence)?;
            }
            Input::Coinbase {
                height,
                data,
                sequence,
            } => {
                writer.write_all(&[0; 32][..])?;
                writer.write_u32::<LittleEndian>(0xffff_ffff)?;
                let height_len = coinbase_height_len(*height);
                let total_len = height_len + data.as_ref().len();
                writer.write_compactsize(total_len as u64)?;
                write_coinbase_height(*height, &mut writer)?;
                writer.write_all(data.as_ref())?;
                writer.write_u32::<LittleEndian>(*sequence)?;
            }
        }
        Ok(())
    }
}

impl ZcashDeserialize for Input {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        // This inlines the OutPoint deserialization to peek at the hash
        // value and detect whether we have a coinbase input.
        let bytes = reader.read_32_bytes()?;
        if bytes == [0; 32] {
            if reader.read_u32::<LittleEndian>()? != 0xffff_ffff {
                return Err(SerializationError::Parse("wrong index in coinbase"));
            }
            let len = reader.read_compactsize()?;
            if len > MAX_COINBASE_DATA_LEN as u64 {
                return Err(SerializationError::Parse("coinbase has too much data"));
            }
            let mut data = vec![0; len as usize];
            reader.read_exact(&mut data[..])?;
            let (height, data) = parse_coinbase_height(data)?;
            let sequence = reader.read_u32::<LittleEndian>()?;
            Ok(Input::Coinbase {
                height,
                data,
                sequence,
            })
        } else {
            Ok(Input::PrevOut {
                outpoint: OutPoint {
                    hash: transaction::Hash(bytes),
                    index: reader.read_u32::<LittleEndian>()?,
                },
                unlock_script: Script::zcash_deserialize(&mut reader)?,
                sequence: reader.read_u32::<LittleEndian>()?,
            })
        }
    }
}

impl ZcashSerialize for Output {
    fn zcash_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        self.value.zcash_serialize(&mut writer)?;
        self.lock_script.zcash_serialize(&mut writer)?;
        Ok(())
    }
}

impl ZcashDeserialize for Output {
    fn zcash_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let reader = &mut reader;

        Ok(Output {
            value: reader.zcash_deserialize_into()?,
            lock_script: Script::zcash_deserialize(reader)?,
        })
    }
}

/// A serialized transparent input is at least 41 bytes: a 36 byte outpoint,
/// a 1 byte script length, and a 4 byte sequence number.
const MIN_TRANSPARENT_INPUT_SIZE: u64 = 41;

/// A serialized transparent output is at least 9 bytes: an 8 byte amount
/// and a 1 byte script length.
const MIN_TRANSPARENT_OUTPUT_SIZE: u64 = 9;

impl TrustedPreallocate for Input {
    fn max_allocation() -> u64 {
        MAX_PROTOCOL_MESSAGE_LEN as u64 / MIN_TRANSPARENT_INPUT_SIZE
    }
}

impl TrustedPreallocate for Output {
    fn max_allocation() -> u64 {
        MAX_PROTOCOL_MESSAGE_LEN as u64 / MIN_TRANSPARENT_OUTPUT_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_input_round_trip() {
        for height in [1u32, 16, 17, 127, 128, 32_767, 32_768, 1_046_400, 8_388_608] {
            let input = Input::Coinbase {
                height: block::Height(height),
                data: CoinbaseData(vec![0x00]),
                sequence: 0xffff_ffff,
            };
            let bytes = input.zcash_serialize_to_vec().unwrap();
            let parsed: Input = bytes.as_slice().zcash_deserialize_into().unwrap();
            assert_eq!(parsed, input, "height {height}");
        }
    }

    #[test]
    fn oversized_coinbase_data_is_rejected() {
        let input = Input::Coinbase {
            height: block::Height(1_000_000),
            data: CoinbaseData(vec![0; MAX_COINBASE_DATA_LEN]),
            sequence: 0,
        };
        let bytes = input.zcash_serialize_to_vec().unwrap();
        let parsed: Result<Input, _> = bytes.as_slice().zcash_deserialize_into();
        assert!(parsed.is_err());
    }

    #[test]
    fn prevout_input_round_trip() {
        let input = Input::PrevOut {
            outpoint: OutPoint {
                hash: transaction::Hash([3; 32]),
                index: 7,
            },
            unlock_script: Script::new(&[0x51]),
            sequence: 0,
        };
        let bytes = input.zcash_serialize_to_vec().unwrap();
        let parsed: Input = bytes.as_slice().zcash_deserialize_into().unwrap();
        assert_eq!(parsed, input);
    }
}
