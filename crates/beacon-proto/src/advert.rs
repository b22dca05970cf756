//! Vendor framing for beacon advertisements.
//!
//! Packets travel as the manufacturer-specific data of a beacon
//! advertisement. The 16-bit company identifier in front of the payload is
//! the only filter the channel has: every device in range hears every
//! advertisement, so anything carrying another company id is dropped here,
//! before packet decoding.
//!
//! ```text
//! manufacturer data: [company_id lo][company_id hi][packet bytes ...]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Packet,
    errors::{ProtocolError, Result},
};

/// Company identifier used by this deployment.
pub const DEFAULT_COMPANY_ID: u16 = 0x1234;

/// One advertisement as seen by the transport: vendor id plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Advertisement {
    /// Company identifier from the manufacturer data header
    pub company_id: u16,
    /// Packet bytes following the company identifier
    pub data: Bytes,
}

impl Advertisement {
    /// Wrap an encoded packet for broadcast under `company_id`.
    #[must_use]
    pub fn new(company_id: u16, data: impl Into<Bytes>) -> Self {
        Self { company_id, data: data.into() }
    }

    /// Encode `packet` and wrap it under `company_id`.
    #[must_use]
    pub fn from_packet(company_id: u16, packet: &Packet) -> Self {
        Self::new(company_id, packet.encode())
    }

    /// Serialize to the manufacturer-specific data layout.
    #[must_use]
    pub fn to_manufacturer_data(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.data.len());
        buf.put_u16_le(self.company_id);
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// Parse the manufacturer-specific data layout.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ManufacturerDataTooShort` if fewer than two bytes
    pub fn from_manufacturer_data(raw: &[u8]) -> Result<Self> {
        let [lo, hi, rest @ ..] = raw else {
            return Err(ProtocolError::ManufacturerDataTooShort(raw.len()));
        };
        Ok(Self {
            company_id: u16::from_le_bytes([*lo, *hi]),
            data: Bytes::copy_from_slice(rest),
        })
    }
}

impl Packet {
    /// Filter by vendor and decode the advertised packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::ForeignVendor` if the company id does not match
    /// - Any error from [`Packet::decode`]
    pub fn from_advertisement(advert: &Advertisement, company_id: u16) -> Result<Self> {
        if advert.company_id != company_id {
            return Err(ProtocolError::ForeignVendor {
                expected: company_id,
                actual: advert.company_id,
            });
        }
        Self::decode(&advert.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manufacturer_data_is_little_endian() {
        let advert = Advertisement::from_packet(DEFAULT_COMPANY_ID, &Packet::PeerDead);
        assert_eq!(advert.to_manufacturer_data().as_ref(), &[0x34, 0x12, 3]);
    }

    #[test]
    fn parse_manufacturer_data() {
        let advert = Advertisement::from_manufacturer_data(&[0x34, 0x12, 2, 5, 9]).unwrap();
        assert_eq!(advert.company_id, DEFAULT_COMPANY_ID);
        assert_eq!(advert.data.as_ref(), &[2, 5, 9]);
    }

    #[test]
    fn manufacturer_data_needs_company_id() {
        assert_eq!(
            Advertisement::from_manufacturer_data(&[0x34]),
            Err(ProtocolError::ManufacturerDataTooShort(1))
        );
    }

    #[test]
    fn foreign_vendor_is_rejected_before_decoding() {
        let advert = Advertisement::new(0x4C00, vec![1, 5, 2, 9]);
        assert_eq!(
            Packet::from_advertisement(&advert, DEFAULT_COMPANY_ID),
            Err(ProtocolError::ForeignVendor { expected: DEFAULT_COMPANY_ID, actual: 0x4C00 })
        );
    }

    #[test]
    fn matching_vendor_decodes() {
        let advert = Advertisement::new(DEFAULT_COMPANY_ID, vec![1, 5, 2, 9]);
        assert_eq!(
            Packet::from_advertisement(&advert, DEFAULT_COMPANY_ID),
            Ok(Packet::Event { origin: 5, code: 2, sequence: 9 })
        );
    }
}
