//! Beacon frame payload fields: superframe specification, GTS fields and
//! the pending address list.

use heapless::Vec;

use crate::addressing::emit_address;

use super::{Address, Error, GtsDirection, Result};

/// The maximum number of octets in the beacon payload
/// (aMaxBeaconPayloadLength).
pub const MAX_BEACON_PAYLOAD_LEN: usize = 52;

/// The maximum number of GTS descriptors in a beacon frame.
pub const MAX_GTS_DESCRIPTORS: usize = 7;

/// The maximum number of pending short or extended addresses each.
pub const MAX_PENDING_ADDRESSES: usize = 7;

/// Indicates the frequency at which the beacon is transmitted.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum BeaconOrder {
    /// The beacon is transmitted at an interval of
    /// `aBaseSuperframeDuration * 2^{beacon_order}` symbols.
    Order(u8),
    /// The beacon is transmitted on demand.
    OnDemand,
}

impl From<u8> for BeaconOrder {
    fn from(value: u8) -> Self {
        match value {
            value @ 0..=14 => Self::Order(value),
            _ => Self::OnDemand,
        }
    }
}

impl From<BeaconOrder> for u8 {
    fn from(value: BeaconOrder) -> Self {
        match value {
            BeaconOrder::Order(value) => value,
            BeaconOrder::OnDemand => 15,
        }
    }
}

/// The length of the active portion of the superframe.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum SuperframeOrder {
    /// The superframe duration is
    /// `aBaseSuperframeDuration * 2^{superframe_order}` symbols.
    Order(u8),
    /// The superframe is inactive after the beacon.
    Inactive,
}

impl From<u8> for SuperframeOrder {
    fn from(value: u8) -> Self {
        match value {
            value @ 0..=14 => Self::Order(value),
            _ => Self::Inactive,
        }
    }
}

impl From<SuperframeOrder> for u8 {
    fn from(value: SuperframeOrder) -> Self {
        match value {
            SuperframeOrder::Order(value) => value,
            SuperframeOrder::Inactive => 15,
        }
    }
}

/// A reader/writer for the IEEE 802.15.4 Superframe Specification field.
pub struct SuperframeSpecification<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> SuperframeSpecification<T> {
    /// Create a new [`SuperframeSpecification`] reader/writer from a given
    /// buffer.
    pub fn new(buffer: T) -> Result<Self> {
        let spec = Self::new_unchecked(buffer);

        if !spec.check_len() {
            return Err(Error::Truncated);
        }

        Ok(spec)
    }

    fn check_len(&self) -> bool {
        self.buffer.as_ref().len() >= 2
    }

    /// Create a new [`SuperframeSpecification`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    fn bits(&self) -> u16 {
        let b = &self.buffer.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the beacon order field value.
    pub fn beacon_order(&self) -> BeaconOrder {
        BeaconOrder::from((self.bits() & 0x0f) as u8)
    }

    /// Return the superframe order field value.
    pub fn superframe_order(&self) -> SuperframeOrder {
        SuperframeOrder::from(((self.bits() >> 4) & 0x0f) as u8)
    }

    /// Return the final CAP slot field value.
    pub fn final_cap_slot(&self) -> u8 {
        ((self.bits() >> 8) & 0x0f) as u8
    }

    /// Return the battery life extension field value.
    pub fn battery_life_extension(&self) -> bool {
        (self.bits() >> 12) & 0b1 == 1
    }

    /// Return the PAN coordinator field value.
    pub fn pan_coordinator(&self) -> bool {
        (self.bits() >> 14) & 0b1 == 1
    }

    /// Return the association permit field value.
    pub fn association_permit(&self) -> bool {
        (self.bits() >> 15) & 0b1 == 1
    }
}

/// A high-level representation of the Superframe Specification field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct SuperframeSpecificationRepr {
    pub beacon_order: BeaconOrder,
    pub superframe_order: SuperframeOrder,
    pub final_cap_slot: u8,
    pub battery_life_extension: bool,
    pub pan_coordinator: bool,
    pub association_permit: bool,
}

impl Default for SuperframeSpecificationRepr {
    fn default() -> Self {
        Self::nonbeacon()
    }
}

impl SuperframeSpecificationRepr {
    /// A superframe specification for a nonbeacon-enabled PAN.
    pub fn nonbeacon() -> Self {
        Self {
            beacon_order: BeaconOrder::OnDemand,
            superframe_order: SuperframeOrder::Inactive,
            final_cap_slot: 0x0f,
            battery_life_extension: false,
            pan_coordinator: false,
            association_permit: false,
        }
    }

    /// Parse a Superframe Specification field.
    pub fn parse<T: AsRef<[u8]>>(spec: &SuperframeSpecification<T>) -> Self {
        Self {
            beacon_order: spec.beacon_order(),
            superframe_order: spec.superframe_order(),
            final_cap_slot: spec.final_cap_slot(),
            battery_life_extension: spec.battery_life_extension(),
            pan_coordinator: spec.pan_coordinator(),
            association_permit: spec.association_permit(),
        }
    }

    /// Emit the field into the first two octets of the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        let mut bits = u8::from(self.beacon_order) as u16;
        bits |= (u8::from(self.superframe_order) as u16) << 4;
        bits |= ((self.final_cap_slot & 0x0f) as u16) << 8;
        bits |= (self.battery_life_extension as u16) << 12;
        bits |= (self.pan_coordinator as u16) << 14;
        bits |= (self.association_permit as u16) << 15;
        buffer[..2].copy_from_slice(&bits.to_le_bytes());
    }
}

/// A single GTS descriptor advertised in a beacon frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct GtsDescriptor {
    /// Short address of the device owning the slot.
    pub short_address: u16,
    /// Superframe slot at which the GTS begins. A value of zero signals a
    /// denied allocation request.
    pub starting_slot: u8,
    /// Number of contiguous superframe slots the GTS occupies.
    pub length: u8,
    /// Direction of the slot, from the device's perspective.
    pub direction: GtsDirection,
}

/// A high-level representation of the beacon GTS fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GtsFieldsRepr {
    /// Whether the coordinator accepts GTS requests.
    pub permit: bool,
    /// The advertised GTS descriptors.
    pub descriptors: Vec<GtsDescriptor, MAX_GTS_DESCRIPTORS>,
}

impl GtsFieldsRepr {
    /// Parse the GTS fields from the front of the given buffer.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.is_empty() {
            return Err(Error::Truncated);
        }

        let spec = buffer[0];
        let count = (spec & 0b111) as usize;
        let permit = spec & 0x80 != 0;

        let mut descriptors = Vec::new();
        if count > 0 {
            if buffer.len() < 2 + count * 3 {
                return Err(Error::Truncated);
            }

            let directions = buffer[1];
            for i in 0..count {
                let d = &buffer[2 + i * 3..][..3];
                let direction = if directions >> i & 0b1 == 1 {
                    GtsDirection::Receive
                } else {
                    GtsDirection::Transmit
                };
                // count <= 7, so the push cannot fail
                let _ = descriptors.push(GtsDescriptor {
                    short_address: u16::from_le_bytes([d[0], d[1]]),
                    starting_slot: d[2] & 0x0f,
                    length: d[2] >> 4,
                    direction,
                });
            }
        }

        Ok(Self {
            permit,
            descriptors,
        })
    }

    /// Return the length of the GTS fields in octets.
    pub fn buffer_len(&self) -> usize {
        if self.descriptors.is_empty() {
            1
        } else {
            2 + self.descriptors.len() * 3
        }
    }

    /// Emit the GTS fields into the front of the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        buffer[0] = (self.descriptors.len() as u8 & 0b111)
            | if self.permit { 0x80 } else { 0x00 };

        if self.descriptors.is_empty() {
            return;
        }

        let mut directions = 0u8;
        for (i, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.direction == GtsDirection::Receive {
                directions |= 1 << i;
            }

            let d = &mut buffer[2 + i * 3..][..3];
            d[..2].copy_from_slice(&descriptor.short_address.to_le_bytes());
            d[2] = (descriptor.starting_slot & 0x0f) | (descriptor.length << 4);
        }
        buffer[1] = directions;
    }
}

/// A high-level representation of the beacon pending address fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingAddressRepr {
    /// Short addresses with pending indirect data.
    pub short_addresses: Vec<u16, MAX_PENDING_ADDRESSES>,
    /// Extended addresses with pending indirect data.
    pub extended_addresses: Vec<[u8; 8], MAX_PENDING_ADDRESSES>,
}

impl PendingAddressRepr {
    /// Parse the pending address fields from the front of the given buffer.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        if buffer.is_empty() {
            return Err(Error::Truncated);
        }

        let spec = buffer[0];
        let short_count = (spec & 0b111) as usize;
        let extended_count = ((spec >> 4) & 0b111) as usize;

        if buffer.len() < 1 + short_count * 2 + extended_count * 8 {
            return Err(Error::Truncated);
        }

        let mut short_addresses = Vec::new();
        let mut extended_addresses = Vec::new();
        let mut offset = 1;

        for _ in 0..short_count {
            let b = &buffer[offset..][..2];
            let _ = short_addresses.push(u16::from_le_bytes([b[0], b[1]]));
            offset += 2;
        }

        for _ in 0..extended_count {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buffer[offset..][..8]);
            raw.reverse();
            let _ = extended_addresses.push(raw);
            offset += 8;
        }

        Ok(Self {
            short_addresses,
            extended_addresses,
        })
    }

    /// Return the length of the pending address fields in octets.
    pub fn buffer_len(&self) -> usize {
        1 + self.short_addresses.len() * 2 + self.extended_addresses.len() * 8
    }

    /// Emit the pending address fields into the front of the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        buffer[0] = (self.short_addresses.len() as u8 & 0b111)
            | ((self.extended_addresses.len() as u8 & 0b111) << 4);

        let mut offset = 1;
        for address in &self.short_addresses {
            buffer[offset..][..2].copy_from_slice(&address.to_le_bytes());
            offset += 2;
        }

        for address in &self.extended_addresses {
            offset += emit_address(&mut buffer[offset..], Address::Extended(*address));
        }
    }

    /// Query whether an address is listed as having pending data.
    pub fn contains(&self, address: &Address) -> bool {
        match address {
            Address::Short(raw) => self
                .short_addresses
                .iter()
                .any(|a| *a == u16::from_be_bytes(*raw)),
            Address::Extended(raw) => self.extended_addresses.iter().any(|a| a == raw),
            Address::Absent => false,
        }
    }
}

/// A high-level representation of a beacon frame's MAC payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BeaconRepr {
    /// The superframe specification.
    pub superframe_spec: SuperframeSpecificationRepr,
    /// The GTS specification and descriptor list.
    pub gts: GtsFieldsRepr,
    /// The pending address list.
    pub pending_addresses: PendingAddressRepr,
    /// The application-supplied beacon payload.
    pub payload: Vec<u8, MAX_BEACON_PAYLOAD_LEN>,
}

impl BeaconRepr {
    /// Parse a beacon frame's MAC payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let spec = SuperframeSpecification::new(payload)?;
        let superframe_spec = SuperframeSpecificationRepr::parse(&spec);

        let gts = GtsFieldsRepr::parse(&payload[2..])?;
        let mut offset = 2 + gts.buffer_len();

        let pending_addresses = PendingAddressRepr::parse(&payload[offset..])?;
        offset += pending_addresses.buffer_len();

        let mut beacon_payload = Vec::new();
        beacon_payload
            .extend_from_slice(&payload[offset..])
            .map_err(|()| Error::Malformed)?;

        Ok(Self {
            superframe_spec,
            gts,
            pending_addresses,
            payload: beacon_payload,
        })
    }

    /// Return the length of the beacon MAC payload in octets.
    pub fn buffer_len(&self) -> usize {
        2 + self.gts.buffer_len() + self.pending_addresses.buffer_len() + self.payload.len()
    }

    /// Emit the beacon MAC payload into the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        self.superframe_spec.emit(buffer);

        let mut offset = 2;
        self.gts.emit(&mut buffer[offset..]);
        offset += self.gts.buffer_len();

        self.pending_addresses.emit(&mut buffer[offset..]);
        offset += self.pending_addresses.buffer_len();

        buffer[offset..][..self.payload.len()].copy_from_slice(&self.payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superframe_specification() {
        let data = [0xff, 0x0f];
        let spec = SuperframeSpecification::new(&data[..]).unwrap();
        assert_eq!(spec.beacon_order(), BeaconOrder::OnDemand);
        assert_eq!(spec.superframe_order(), SuperframeOrder::Inactive);
        assert_eq!(spec.final_cap_slot(), 0x0f);
        assert!(!spec.battery_life_extension());
        assert!(!spec.pan_coordinator());
        assert!(!spec.association_permit());

        let data = [0x66, 0xcf];
        let spec = SuperframeSpecification::new(&data[..]).unwrap();
        assert_eq!(spec.beacon_order(), BeaconOrder::Order(6));
        assert_eq!(spec.superframe_order(), SuperframeOrder::Order(6));
        assert_eq!(spec.final_cap_slot(), 0x0f);
        assert!(spec.pan_coordinator());
        assert!(spec.association_permit());
    }

    #[test]
    fn superframe_specification_round_trip() {
        let repr = SuperframeSpecificationRepr {
            beacon_order: BeaconOrder::Order(6),
            superframe_order: SuperframeOrder::Order(4),
            final_cap_slot: 0x0b,
            battery_life_extension: false,
            pan_coordinator: true,
            association_permit: true,
        };

        let mut buffer = [0u8; 2];
        repr.emit(&mut buffer);

        let parsed = SuperframeSpecificationRepr::parse(
            &SuperframeSpecification::new(&buffer[..]).unwrap(),
        );
        assert_eq!(parsed, repr);
    }

    #[test]
    fn gts_fields() {
        let repr = GtsFieldsRepr::parse(&[0b0000_0000]).unwrap();
        assert!(!repr.permit);
        assert!(repr.descriptors.is_empty());

        let repr = GtsFieldsRepr::parse(&[0b1000_0000]).unwrap();
        assert!(repr.permit);
        assert!(repr.descriptors.is_empty());

        let data = [0x82, 0x01, 0x34, 0x12, 0x11, 0x78, 0x56, 0x14];
        let repr = GtsFieldsRepr::parse(&data).unwrap();
        assert!(repr.permit);
        assert_eq!(repr.descriptors.len(), 2);

        assert_eq!(
            repr.descriptors[0],
            GtsDescriptor {
                short_address: 0x1234,
                starting_slot: 1,
                length: 1,
                direction: GtsDirection::Receive,
            }
        );
        assert_eq!(
            repr.descriptors[1],
            GtsDescriptor {
                short_address: 0x5678,
                starting_slot: 4,
                length: 1,
                direction: GtsDirection::Transmit,
            }
        );

        let mut buffer = [0u8; 8];
        assert_eq!(repr.buffer_len(), 8);
        repr.emit(&mut buffer);
        assert_eq!(buffer, data);
    }

    #[test]
    fn pending_addresses() {
        let data = [
            0x12, 0x34, 0x12, 0x78, 0x56, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
        ];
        let repr = PendingAddressRepr::parse(&data).unwrap();
        assert_eq!(repr.short_addresses.len(), 2);
        assert_eq!(repr.extended_addresses.len(), 1);
        assert_eq!(repr.short_addresses[0], 0x1234);
        assert_eq!(repr.short_addresses[1], 0x5678);
        assert!(repr.contains(&Address::from_u16(0x1234)));
        assert!(repr.contains(&Address::Extended([1, 2, 3, 4, 5, 6, 7, 8])));
        assert!(!repr.contains(&Address::from_u16(0x4321)));
    }

    #[test]
    fn pending_addresses_spec_counts() {
        // Spec octet advertises 2 short addresses, but only the first and
        // part of the second are present.
        assert_eq!(
            PendingAddressRepr::parse(&[0x02, 0x34, 0x12, 0x78]),
            Err(Error::Truncated)
        );
    }

    #[test]
    fn beacon_repr_round_trip() {
        let mut repr = BeaconRepr {
            superframe_spec: SuperframeSpecificationRepr {
                beacon_order: BeaconOrder::Order(6),
                superframe_order: SuperframeOrder::Order(6),
                final_cap_slot: 0x0f,
                battery_life_extension: false,
                pan_coordinator: true,
                association_permit: true,
            },
            gts: GtsFieldsRepr {
                permit: true,
                descriptors: Vec::new(),
            },
            pending_addresses: PendingAddressRepr::default(),
            payload: Vec::new(),
        };
        repr.pending_addresses.short_addresses.push(0x1234).unwrap();
        repr.payload.extend_from_slice(&[0xde, 0xad]).unwrap();

        let mut buffer = [0u8; MAX_BEACON_PAYLOAD_LEN + 16];
        let len = repr.buffer_len();
        repr.emit(&mut buffer[..len]);

        assert_eq!(BeaconRepr::parse(&buffer[..len]).unwrap(), repr);
    }
}
