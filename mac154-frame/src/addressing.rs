//! Addressing fields readers and writers.

use super::{Error, Result};
use super::{FrameControlRepr, FrameType};

/// An IEEE 802.15.4 address.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Address {
    Absent,
    Short([u8; 2]),
    Extended([u8; 8]),
}

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address::Short([0xff; 2]);

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !self.is_broadcast()
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Return the short address as a `u16`, if this is a short address.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Address::Short(value) => Some(u16::from_be_bytes(*value)),
            _ => None,
        }
    }

    /// Create a short address from a `u16`.
    pub const fn from_u16(value: u16) -> Self {
        Address::Short(value.to_be_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Absent => &[],
            Address::Short(value) => value,
            Address::Extended(value) => value,
        }
    }

    /// Return the length of the address in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Address::Absent => 0,
            Address::Short(_) => 2,
            Address::Extended(_) => 8,
        }
    }
}

impl From<Address> for AddressingMode {
    fn from(value: Address) -> Self {
        match value {
            Address::Absent => AddressingMode::Absent,
            Address::Short(_) => AddressingMode::Short,
            Address::Extended(_) => AddressingMode::Extended,
        }
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Address::Absent => write!(f, "absent"),
            Address::Short(value) => write!(f, "{:02x}:{:02x}", value[0], value[1]),
            Address::Extended(value) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7]
            ),
        }
    }
}

/// IEEE 802.15.4 addressing mode.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum AddressingMode {
    Absent = 0b00,
    Short = 0b10,
    Extended = 0b11,
    Unknown,
}

impl AddressingMode {
    /// Return the size of the address in octets.
    pub fn size(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Short => 2,
            Self::Extended => 8,
            Self::Unknown => 0,
        }
    }
}

impl From<u8> for AddressingMode {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Absent,
            0b10 => Self::Short,
            0b11 => Self::Extended,
            _ => Self::Unknown,
        }
    }
}

/// Presence of the individual addressing fields derived from a frame
/// control field, following the 2003/2006 PAN ID compression rule.
fn address_present_flags(
    fc: &FrameControlRepr,
) -> Option<(bool, AddressingMode, bool, AddressingMode)> {
    use AddressingMode::*;
    match (fc.dst_addressing_mode, fc.src_addressing_mode) {
        (Absent, Absent) => Some((false, Absent, false, Absent)),
        (Absent, src) => Some((false, Absent, true, src)),
        (dst, Absent) => Some((true, dst, false, Absent)),
        (dst, src) if fc.pan_id_compression => Some((true, dst, false, src)),
        (dst, src) => Some((true, dst, true, src)),
    }
}

/// A reader for the IEEE 802.15.4 Addressing Fields.
pub struct AddressingFields<T: AsRef<[u8]>> {
    buffer: T,
    fc: FrameControlRepr,
}

impl<T: AsRef<[u8]>> AddressingFields<T> {
    /// Create a new [`AddressingFields`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short to contain the
    /// addressing fields described by the frame control field.
    pub fn new(buffer: T, fc: FrameControlRepr) -> Result<Self> {
        let af = Self::new_unchecked(buffer, fc);

        if !af.check_len() {
            return Err(Error::Truncated);
        }

        Ok(af)
    }

    /// Check if the buffer is large enough to contain the addressing fields.
    fn check_len(&self) -> bool {
        let Some((dst_pan_id, dst_addr, src_pan_id, src_addr)) = address_present_flags(&self.fc)
        else {
            return false;
        };

        let expected = (dst_pan_id as usize * 2)
            + dst_addr.size()
            + (src_pan_id as usize * 2)
            + src_addr.size();

        self.buffer.as_ref().len() >= expected
    }

    /// Create a new [`AddressingFields`] reader without length checking.
    pub fn new_unchecked(buffer: T, fc: FrameControlRepr) -> Self {
        Self { buffer, fc }
    }

    /// Return the length of the Addressing Fields in octets.
    pub fn len(&self) -> usize {
        let Some((dst_pan_id, dst_addr, src_pan_id, src_addr)) = address_present_flags(&self.fc)
        else {
            return 0;
        };

        (dst_pan_id as usize * 2) + dst_addr.size() + (src_pan_id as usize * 2) + src_addr.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_address(&self, mode: AddressingMode, offset: usize) -> Option<Address> {
        match mode {
            AddressingMode::Absent => None,
            AddressingMode::Short => {
                let mut raw = [0u8; 2];
                raw.copy_from_slice(&self.buffer.as_ref()[offset..offset + 2]);
                raw.reverse();
                Some(Address::Short(raw))
            }
            AddressingMode::Extended => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.buffer.as_ref()[offset..offset + 8]);
                raw.reverse();
                Some(Address::Extended(raw))
            }
            AddressingMode::Unknown => None,
        }
    }

    /// Return the IEEE 802.15.4 destination [`Address`] if not absent.
    pub fn dst_address(&self) -> Option<Address> {
        let (dst_pan_id, dst_addr, _, _) = address_present_flags(&self.fc)?;
        let offset = if dst_pan_id { 2 } else { 0 };
        self.read_address(dst_addr, offset)
    }

    /// Return the IEEE 802.15.4 source [`Address`] if not absent.
    pub fn src_address(&self) -> Option<Address> {
        let (dst_pan_id, dst_addr, src_pan_id, src_addr) = address_present_flags(&self.fc)?;
        let offset =
            (dst_pan_id as usize * 2) + dst_addr.size() + (src_pan_id as usize * 2);
        self.read_address(src_addr, offset)
    }

    /// Return the IEEE 802.15.4 destination PAN ID if not elided.
    pub fn dst_pan_id(&self) -> Option<u16> {
        let (dst_pan_id, _, _, _) = address_present_flags(&self.fc)?;
        if dst_pan_id {
            let b = &self.buffer.as_ref()[..2];
            Some(u16::from_le_bytes([b[0], b[1]]))
        } else {
            None
        }
    }

    /// Return the IEEE 802.15.4 source PAN ID if not elided.
    pub fn src_pan_id(&self) -> Option<u16> {
        let (dst_pan_id, dst_addr, src_pan_id, _) = address_present_flags(&self.fc)?;
        if src_pan_id {
            let offset = (dst_pan_id as usize * 2) + dst_addr.size();
            let b = &self.buffer.as_ref()[offset..][..2];
            Some(u16::from_le_bytes([b[0], b[1]]))
        } else {
            None
        }
    }
}

/// A high-level representation of the IEEE 802.15.4 Addressing Fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct AddressingFieldsRepr {
    /// Destination PAN identifier.
    pub dst_pan_id: Option<u16>,
    /// Destination address.
    pub dst_address: Option<Address>,
    /// Source PAN identifier.
    pub src_pan_id: Option<u16>,
    /// Source address.
    pub src_address: Option<Address>,
}

impl AddressingFieldsRepr {
    /// Parse the Addressing Fields from the given reader.
    pub fn parse<T: AsRef<[u8]>>(addressing: &AddressingFields<T>) -> Self {
        Self {
            dst_pan_id: addressing.dst_pan_id(),
            dst_address: addressing.dst_address(),
            src_pan_id: addressing.src_pan_id(),
            src_address: addressing.src_address(),
        }
    }

    /// Validate the Addressing Fields against a frame control field.
    pub fn validate(&self, fc: &FrameControlRepr) -> Result<()> {
        if fc.frame_type == FrameType::Data
            && matches!(
                (self.dst_address, self.src_address),
                (None | Some(Address::Absent), None | Some(Address::Absent))
            )
        {
            return Err(Error::Malformed);
        }

        Ok(())
    }

    /// Return the length of the Addressing Fields in octets.
    pub fn buffer_len(&self) -> usize {
        self.dst_pan_id.map_or(0, |_| 2)
            + self.dst_address.map_or(0, |a| a.len())
            + self.src_pan_id.map_or(0, |_| 2)
            + self.src_address.map_or(0, |a| a.len())
    }

    /// Emit the Addressing Fields into the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        let mut offset = 0;

        if let Some(id) = self.dst_pan_id {
            buffer[offset..][..2].copy_from_slice(&id.to_le_bytes());
            offset += 2;
        }

        if let Some(addr) = self.dst_address {
            offset += emit_address(&mut buffer[offset..], addr);
        }

        if let Some(id) = self.src_pan_id {
            buffer[offset..][..2].copy_from_slice(&id.to_le_bytes());
            offset += 2;
        }

        if let Some(addr) = self.src_address {
            emit_address(&mut buffer[offset..], addr);
        }
    }
}

/// Write an address to the front of a buffer in wire order, returning the
/// number of octets written.
pub(crate) fn emit_address(buffer: &mut [u8], address: Address) -> usize {
    match address {
        Address::Absent => 0,
        Address::Short(value) => {
            let mut raw = value;
            raw.reverse();
            buffer[..2].copy_from_slice(&raw);
            2
        }
        Address::Extended(value) => {
            let mut raw = value;
            raw.reverse();
            buffer[..8].copy_from_slice(&raw);
            8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameVersion;

    fn fc(
        dst: AddressingMode,
        src: AddressingMode,
        pan_id_compression: bool,
    ) -> FrameControlRepr {
        FrameControlRepr {
            frame_type: FrameType::Data,
            security_enabled: false,
            frame_pending: false,
            ack_request: false,
            pan_id_compression,
            dst_addressing_mode: dst,
            frame_version: FrameVersion::Ieee802154_2006,
            src_addressing_mode: src,
        }
    }

    #[test]
    fn is_broadcast() {
        assert!(Address::BROADCAST.is_broadcast());
        assert!(Address::Short([0xff, 0xff]).is_broadcast());
        assert!(!Address::Short([0xff, 0xfe]).is_broadcast());

        assert!(!Address::BROADCAST.is_unicast());
        assert!(Address::Short([0xff, 0xfe]).is_unicast());
    }

    #[test]
    fn short_address_u16() {
        assert_eq!(Address::from_u16(0x1234), Address::Short([0x12, 0x34]));
        assert_eq!(Address::Short([0x12, 0x34]).as_u16(), Some(0x1234));
        assert_eq!(Address::Absent.as_u16(), None);
    }

    #[test]
    fn compressed_short_addressing() {
        // dst pan id, dst short, src short; src pan id elided.
        let data = [0xcd, 0xab, 0x02, 0x00, 0x01, 0x00];
        let af = AddressingFields::new(
            &data[..],
            fc(AddressingMode::Short, AddressingMode::Short, true),
        )
        .unwrap();

        assert_eq!(af.len(), 6);
        assert_eq!(af.dst_pan_id(), Some(0xabcd));
        assert_eq!(af.dst_address(), Some(Address::Short([0x00, 0x02])));
        assert_eq!(af.src_pan_id(), None);
        assert_eq!(af.src_address(), Some(Address::Short([0x00, 0x01])));
    }

    #[test]
    fn uncompressed_mixed_addressing() {
        let data = [
            0xcd, 0xab, 0xff, 0xff, 0x34, 0x12, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
        ];
        let af = AddressingFields::new(
            &data[..],
            fc(AddressingMode::Short, AddressingMode::Extended, false),
        )
        .unwrap();

        assert_eq!(af.len(), 14);
        assert_eq!(af.dst_pan_id(), Some(0xabcd));
        assert_eq!(af.dst_address(), Some(Address::BROADCAST));
        assert_eq!(af.src_pan_id(), Some(0x1234));
        assert_eq!(
            af.src_address(),
            Some(Address::Extended([1, 2, 3, 4, 5, 6, 7, 8]))
        );
    }

    #[test]
    fn source_only_addressing() {
        let data = [0x34, 0x12, 0x01, 0x00];
        let af = AddressingFields::new(
            &data[..],
            fc(AddressingMode::Absent, AddressingMode::Short, false),
        )
        .unwrap();

        assert_eq!(af.dst_pan_id(), None);
        assert_eq!(af.dst_address(), None);
        assert_eq!(af.src_pan_id(), Some(0x1234));
        assert_eq!(af.src_address(), Some(Address::Short([0x00, 0x01])));
    }

    #[test]
    fn repr_round_trip() {
        let repr = AddressingFieldsRepr {
            dst_pan_id: Some(0xabcd),
            dst_address: Some(Address::Short([0x00, 0x02])),
            src_pan_id: None,
            src_address: Some(Address::Extended([1, 2, 3, 4, 5, 6, 7, 8])),
        };

        let mut buffer = [0u8; 12];
        assert_eq!(repr.buffer_len(), 12);
        repr.emit(&mut buffer);

        let af = AddressingFields::new(
            &buffer[..],
            fc(AddressingMode::Short, AddressingMode::Extended, true),
        )
        .unwrap();
        assert_eq!(AddressingFieldsRepr::parse(&af), repr);
    }
}
