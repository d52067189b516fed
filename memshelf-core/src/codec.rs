// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Item frame encoding with checksums.
//!
//! Every item written to a backend is a small fixed header followed by the
//! `serde_json` payload:
//!
//! ```text
//! +-------+---------+-----------+-------------+-----------+
//! | magic | version | crc32 LE  | length LE   | payload   |
//! | 4 B   | 1 B     | 4 B       | 8 B         | length B  |
//! +-------+---------+-----------+-------------+-----------+
//! ```
//!
//! Decoding validates integrity at every read and fails immediately on a
//! mismatch - a reader never sees a half-written or foreign file as a value.
//!
//! JSON has no spelling for NaN or infinities, so encoding rejects values
//! containing them instead of letting them turn into `null`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::ser::{self, Serialize, Serializer};

use crate::error::{ShelfError, ShelfResult};

/// Frame magic bytes.
pub const FRAME_MAGIC: [u8; 4] = *b"MSHF";

/// Current frame version.
pub const FRAME_VERSION: u8 = 1;

/// Header length in bytes.
pub const HEADER_LEN: usize = 4 + 1 + 4 + 8;

/// Codec for shelf items.
pub struct ItemCodec;

impl ItemCodec {
    /// Serialize a value and wrap it in a checksummed frame.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> ShelfResult<Vec<u8>> {
        value
            .serialize(FiniteFloats)
            .map_err(|e| ShelfError::Serialization { message: e.0 })?;

        let payload = serde_json::to_vec(value).map_err(|e| ShelfError::Serialization {
            message: e.to_string(),
        })?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&FRAME_MAGIC);
        frame.push(FRAME_VERSION);
        frame.extend_from_slice(&Self::calculate_checksum(&payload).to_le_bytes());
        frame.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Validate a frame and deserialize its payload.
    pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> ShelfResult<T> {
        let payload = Self::validate_frame(frame)?;
        serde_json::from_slice(payload).map_err(|e| ShelfError::Serialization {
            message: e.to_string(),
        })
    }

    /// Calculate CRC32 checksum for a payload.
    pub fn calculate_checksum(payload: &[u8]) -> u32 {
        crc32fast::hash(payload)
    }

    /// Check header and checksum, returning the payload slice.
    pub fn validate_frame(frame: &[u8]) -> ShelfResult<&[u8]> {
        if frame.len() < HEADER_LEN {
            return Err(ShelfError::CorruptItem {
                reason: format!("frame too short for header: {} bytes", frame.len()),
            });
        }

        if frame[0..4] != FRAME_MAGIC {
            return Err(ShelfError::CorruptItem {
                reason: "bad magic".to_string(),
            });
        }

        if frame[4] != FRAME_VERSION {
            return Err(ShelfError::CorruptItem {
                reason: format!("unsupported frame version {}", frame[4]),
            });
        }

        let expected = u32::from_le_bytes([frame[5], frame[6], frame[7], frame[8]]);
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&frame[9..HEADER_LEN]);
        let declared = u64::from_le_bytes(len_bytes);

        let payload = &frame[HEADER_LEN..];
        if payload.len() as u64 != declared {
            return Err(ShelfError::CorruptItem {
                reason: format!(
                    "length mismatch: header says {}, found {}",
                    declared,
                    payload.len()
                ),
            });
        }

        let actual = Self::calculate_checksum(payload);
        if actual != expected {
            return Err(ShelfError::CorruptItem {
                reason: format!(
                    "checksum mismatch: expected {:#010x}, got {:#010x}",
                    expected, actual
                ),
            });
        }

        Ok(payload)
    }
}

/// Walks a value and fails on the first NaN or infinite float.
#[derive(Clone, Copy)]
struct FiniteFloats;

#[derive(Debug)]
struct NonFinite(String);

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NonFinite {}

impl ser::Error for NonFinite {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        Self(msg.to_string())
    }
}

fn check_finite(value: f64) -> Result<(), NonFinite> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(NonFinite(format!("non-finite float {} cannot be stored", value)))
    }
}

impl Serializer for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_i8(self, _: i8) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_i16(self, _: i16) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_i32(self, _: i32) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_i64(self, _: i64) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_i128(self, _: i128) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_u8(self, _: u8) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_u16(self, _: u16) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_u32(self, _: u32) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_u64(self, _: u64) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_u128(self, _: u128) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_f32(self, v: f32) -> Result<(), NonFinite> {
        check_finite(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<(), NonFinite> {
        check_finite(v)
    }
    fn serialize_char(self, _: char) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_str(self, _: &str) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_none(self) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), NonFinite> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<(), NonFinite> {
        Ok(())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple(self, _: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, NonFinite> {
        Ok(self)
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), NonFinite> {
        key.serialize(*self)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = NonFinite;
    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(*self)
    }
    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_frame_layout() {
        let frame = ItemCodec::encode(&42u32).unwrap();
        assert_eq!(&frame[0..4], b"MSHF");
        assert_eq!(frame[4], FRAME_VERSION);
        assert_eq!(&frame[HEADER_LEN..], b"42");
    }

    #[test]
    fn test_decode_structured_value() {
        let mut value = HashMap::new();
        value.insert("a".to_string(), vec![1.5f64, -2.25]);
        let frame = ItemCodec::encode(&value).unwrap();
        let back: HashMap<String, Vec<f64>> = ItemCodec::decode(&frame).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let mut frame = ItemCodec::encode("hello").unwrap();
        let last = frame.len() - 2;
        frame[last] ^= 0xFF;
        let err = ItemCodec::decode::<String>(&frame).unwrap_err();
        assert!(matches!(err, ShelfError::CorruptItem { .. }));
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = ItemCodec::encode(&vec![1, 2, 3]).unwrap();
        assert!(ItemCodec::validate_frame(&frame[..HEADER_LEN - 1]).is_err());
        assert!(ItemCodec::validate_frame(&frame[..frame.len() - 1]).is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut frame = ItemCodec::encode(&true).unwrap();
        frame[0] = b'X';
        assert!(ItemCodec::validate_frame(&frame).is_err());
    }

    #[test]
    fn test_type_mismatch_is_serialization_error() {
        let frame = ItemCodec::encode("text").unwrap();
        let err = ItemCodec::decode::<u64>(&frame).unwrap_err();
        assert!(matches!(err, ShelfError::Serialization { .. }));
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        let err = ItemCodec::encode(&vec![Some(f64::NAN), Some(f64::INFINITY)]).unwrap_err();
        assert!(matches!(err, ShelfError::Serialization { .. }));
        assert!(err.to_string().contains("non-finite"));

        assert!(ItemCodec::encode(&vec![f64::NAN, 2.0]).is_err());
        assert!(ItemCodec::encode(&(1u8, f32::NEG_INFINITY)).is_err());

        let mut nested = HashMap::new();
        nested.insert("weights".to_string(), vec![0.5, f64::NEG_INFINITY]);
        assert!(ItemCodec::encode(&nested).is_err());

        // Finite extremes still pass.
        assert!(ItemCodec::encode(&vec![f64::MAX, f64::MIN_POSITIVE, -0.0]).is_ok());
    }

    #[test]
    fn test_float_roundtrip_is_exact() {
        let values: Vec<f64> = vec![0.1, 1.0 / 3.0, std::f64::consts::PI, 1e-300, 123456.789];
        let frame = ItemCodec::encode(&values).unwrap();
        let back: Vec<f64> = ItemCodec::decode(&frame).unwrap();
        assert_eq!(back, values);
    }
}
