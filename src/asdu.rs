//! ASDU (Application Service Data Unit) encode/decode: the data unit
//! identifier (TypeID, VSQ, COT, originator, CASDU), the IOA, and a
//! single TypeID-dependent information element. VSQ is always 0x01 —
//! this system never packs more than one information object per ASDU.

use crate::error::{BadFrameReason, Error};
use crate::types::{Cot, Measurement, TypeId};

pub const VSQ: u8 = 0x01;
pub const QOI_STATION_INTERROGATION: u8 = 0x14;
pub const QOS_DEFAULT: u8 = 0x80;
pub const QDS_GOOD: u8 = 0x00;

const HEADER_LEN: usize = 9;

/// The fixed-position fields every ASDU carries ahead of its
/// information element, decodable even when the TypeID is not one
/// this crate understands. Used by the server dispatcher to build an
/// `UnknownIoa`/unknown-type reply without a full typed decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsduHeader {
    pub type_raw: u8,
    pub cot_raw: u8,
    pub casdu: u16,
    pub ioa: u32,
}

impl AsduHeader {
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::BadFrame(BadFrameReason::Truncated));
        }
        Ok(AsduHeader {
            type_raw: buf[0],
            cot_raw: buf[2],
            casdu: u16::from_le_bytes([buf[4], buf[5]]),
            ioa: u32::from(buf[6]) | (u32::from(buf[7]) << 8) | (u32::from(buf[8]) << 16),
        })
    }
}

/// The information element carried after the IOA, shaped by TypeID.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Bool(bool),
    Float(f32),
    Interrogation,
}

impl Payload {
    pub fn as_measurement(&self) -> Option<Measurement> {
        match self {
            Payload::Bool(b) => Some(Measurement::Bool(*b)),
            Payload::Float(f) => Some(Measurement::Float32(*f)),
            Payload::Interrogation => None,
        }
    }
}

impl From<Measurement> for Payload {
    fn from(m: Measurement) -> Self {
        match m {
            Measurement::Bool(b) => Payload::Bool(b),
            Measurement::Float32(f) => Payload::Float(f),
        }
    }
}

/// A single decoded ASDU: one information object, matching this
/// system's fixed VSQ=1.
#[derive(Debug, Clone, PartialEq)]
pub struct Asdu {
    pub type_id: TypeId,
    pub cot_raw: u8,
    pub casdu: u16,
    pub ioa: u32,
    pub payload: Payload,
}

impl Asdu {
    pub fn new(type_id: TypeId, cot: Cot, casdu: u16, ioa: u32, payload: Payload) -> Self {
        Asdu {
            type_id,
            cot_raw: cot.as_raw(),
            casdu,
            ioa,
            payload,
        }
    }

    /// The symbolic cause of transmission, or `None` if this ASDU
    /// carries a COT byte this crate does not assign meaning to.
    pub fn cot(&self) -> Option<Cot> {
        Cot::from_raw(self.cot_raw)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(14);
        out.push(self.type_id.as_raw());
        out.push(VSQ);
        out.push(self.cot_raw);
        out.push(0x00);
        out.extend_from_slice(&self.casdu.to_le_bytes());
        out.push((self.ioa & 0xFF) as u8);
        out.push(((self.ioa >> 8) & 0xFF) as u8);
        out.push(((self.ioa >> 16) & 0xFF) as u8);
        match self.payload {
            Payload::Bool(b) => out.push(if b { 0x01 } else { 0x00 }),
            Payload::Float(f) => {
                out.extend_from_slice(&f.to_le_bytes());
                let qualifier = match self.type_id {
                    TypeId::SetpointCommand => QOS_DEFAULT,
                    _ => QDS_GOOD,
                };
                out.push(qualifier);
            }
            Payload::Interrogation => out.push(QOI_STATION_INTERROGATION),
        }
        out
    }

    /// Decode a full ASDU. Fails with `BadFrame(UnknownType)` if the
    /// TypeID is outside the set this crate speaks; callers that need
    /// the COT/IOA anyway for an error-path reply should call
    /// `AsduHeader::decode` directly.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let header = AsduHeader::decode(buf)?;
        let type_id = TypeId::from_raw(header.type_raw)
            .ok_or(Error::BadFrame(BadFrameReason::UnknownType(header.type_raw)))?;
        let rest = &buf[HEADER_LEN..];
        let payload = match type_id {
            TypeId::SinglePoint | TypeId::SingleCommand => {
                if rest.is_empty() {
                    return Err(Error::BadFrame(BadFrameReason::Truncated));
                }
                Payload::Bool(rest[0] & 0x01 == 0x01)
            }
            TypeId::ShortFloat | TypeId::SetpointCommand => {
                if rest.len() < 4 {
                    return Err(Error::BadFrame(BadFrameReason::Truncated));
                }
                let f = f32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
                Payload::Float(f)
            }
            TypeId::Interrogation => Payload::Interrogation,
        };
        Ok(Asdu {
            type_id,
            cot_raw: header.cot_raw,
            casdu: header.casdu,
            ioa: header.ioa,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_asdu_round_trips() {
        let asdu = Asdu::new(TypeId::SinglePoint, Cot::Activation, 1, 1100, Payload::Bool(true));
        let encoded = asdu.encode();
        let decoded = Asdu::decode(&encoded).unwrap();
        assert_eq!(decoded, asdu);
    }

    #[test]
    fn float_asdu_round_trips() {
        let asdu = Asdu::new(
            TypeId::ShortFloat,
            Cot::Interrogated,
            1,
            10013,
            Payload::Float(15.0),
        );
        let encoded = asdu.encode();
        assert_eq!(encoded.len(), HEADER_LEN + 5);
        let decoded = Asdu::decode(&encoded).unwrap();
        assert_eq!(decoded, asdu);
    }

    #[test]
    fn interrogation_asdu_carries_qoi() {
        let asdu = Asdu::new(TypeId::Interrogation, Cot::Activation, 1, 0, Payload::Interrogation);
        let encoded = asdu.encode();
        assert_eq!(*encoded.last().unwrap(), QOI_STATION_INTERROGATION);
    }

    #[test]
    fn unknown_type_still_exposes_header() {
        let mut bytes = Asdu::new(TypeId::SinglePoint, Cot::UnknownIoa, 1, 42, Payload::Bool(false))
            .encode();
        bytes[0] = 0xEE;
        let err = Asdu::decode(&bytes).unwrap_err();
        match err {
            Error::BadFrame(BadFrameReason::UnknownType(t)) => assert_eq!(t, 0xEE),
            other => panic!("unexpected error: {:?}", other),
        }
        let header = AsduHeader::decode(&bytes).unwrap();
        assert_eq!(header.ioa, 42);
        assert_eq!(header.cot_raw, Cot::UnknownIoa.as_raw());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        assert!(Asdu::decode(&[1, 2, 3]).is_err());
    }
}
