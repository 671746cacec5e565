//! High-level frame representations.

use heapless::Vec;

use super::{
    AddressingFieldsRepr, BeaconRepr, Error, Frame, FrameControlRepr, FrameType, MacCommand,
    Result,
};

/// The maximum number of octets in a MAC payload (aMaxMACPayloadSize).
pub const MAX_MAC_PAYLOAD_LEN: usize = 118;

/// The typed MAC payload of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayloadRepr {
    /// A beacon frame payload.
    Beacon(BeaconRepr),
    /// A data frame payload. Empty payloads are valid: a data frame
    /// without payload is the null data frame used to answer polls.
    Data(Vec<u8, MAX_MAC_PAYLOAD_LEN>),
    /// A MAC command frame payload.
    Command(MacCommand),
    /// An acknowledgment frame carries no payload.
    Ack,
}

impl FramePayloadRepr {
    /// Return the frame type matching this payload.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Beacon(_) => FrameType::Beacon,
            Self::Data(_) => FrameType::Data,
            Self::Command(_) => FrameType::MacCommand,
            Self::Ack => FrameType::Ack,
        }
    }
}

/// A high-level representation of an IEEE 802.15.4 frame, excluding the
/// FCS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRepr {
    /// The frame control field.
    pub frame_control: FrameControlRepr,
    /// The sequence number.
    pub sequence_number: u8,
    /// The addressing fields.
    pub addressing: AddressingFieldsRepr,
    /// The typed payload.
    pub payload: FramePayloadRepr,
}

impl FrameRepr {
    /// Parse an IEEE 802.15.4 frame.
    pub fn parse<T: AsRef<[u8]>>(reader: &Frame<T>) -> Result<Self> {
        let frame_control = FrameControlRepr::parse(&reader.frame_control())?;
        let addressing = AddressingFieldsRepr::parse(&reader.addressing()?);
        let payload = reader.payload()?;

        let payload = match frame_control.frame_type {
            FrameType::Beacon => FramePayloadRepr::Beacon(BeaconRepr::parse(payload)?),
            FrameType::Data => {
                let mut data = Vec::new();
                data.extend_from_slice(payload).map_err(|()| Error::Malformed)?;
                FramePayloadRepr::Data(data)
            }
            FrameType::MacCommand => FramePayloadRepr::Command(MacCommand::parse(payload)?),
            FrameType::Ack => FramePayloadRepr::Ack,
            FrameType::Unknown => return Err(Error::Malformed),
        };

        Ok(Self {
            frame_control,
            sequence_number: reader.sequence_number(),
            addressing,
            payload,
        })
    }

    /// Validate the frame representation.
    pub fn validate(&self) -> Result<()> {
        if self.frame_control.frame_type != self.payload.frame_type() {
            return Err(Error::Malformed);
        }

        self.addressing.validate(&self.frame_control)
    }

    /// Return the length of the frame when emitted into a buffer,
    /// excluding the FCS.
    pub fn buffer_len(&self) -> usize {
        let payload_len = match &self.payload {
            FramePayloadRepr::Beacon(beacon) => beacon.buffer_len(),
            FramePayloadRepr::Data(data) => data.len(),
            FramePayloadRepr::Command(command) => command.buffer_len(),
            FramePayloadRepr::Ack => 0,
        };

        2 + 1 + self.addressing.buffer_len() + payload_len
    }

    /// Emit the frame into a writer. The writer's buffer must be exactly
    /// [`buffer_len`](Self::buffer_len) octets long.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, frame: &mut Frame<T>) {
        frame.set_frame_control(&self.frame_control);
        frame.set_sequence_number(self.sequence_number);
        frame.set_addressing_fields(&self.addressing);

        // The header was just written, so the payload offset is valid.
        let payload = match frame.payload_mut() {
            Ok(payload) => payload,
            Err(_) => unreachable!(),
        };

        match &self.payload {
            FramePayloadRepr::Beacon(beacon) => beacon.emit(payload),
            FramePayloadRepr::Data(data) => payload[..data.len()].copy_from_slice(data),
            FramePayloadRepr::Command(command) => command.emit(payload),
            FramePayloadRepr::Ack => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Address, AddressingMode, CapabilityInformation, FrameVersion, SuperframeSpecificationRepr,
    };

    fn round_trip(repr: &FrameRepr) {
        let mut buffer = std::vec![0u8; repr.buffer_len()];
        repr.emit(&mut Frame::new_unchecked(&mut buffer[..]));

        let parsed = FrameRepr::parse(&Frame::new(&buffer[..]).unwrap()).unwrap();
        assert_eq!(&parsed, repr);
    }

    #[test]
    fn data_frame_round_trip() {
        let addressing_modes = [
            AddressingMode::Absent,
            AddressingMode::Short,
            AddressingMode::Extended,
        ];

        for dst_mode in addressing_modes {
            for src_mode in addressing_modes {
                if dst_mode == AddressingMode::Absent && src_mode == AddressingMode::Absent {
                    continue;
                }

                for compression in [false, true] {
                    // PAN ID compression requires both addresses present.
                    if compression
                        && (dst_mode == AddressingMode::Absent
                            || src_mode == AddressingMode::Absent)
                    {
                        continue;
                    }

                    let address = |mode| match mode {
                        AddressingMode::Short => Address::Short([0x00, 0x02]),
                        AddressingMode::Extended => {
                            Address::Extended([1, 2, 3, 4, 5, 6, 7, 8])
                        }
                        _ => Address::Absent,
                    };

                    let dst_present = dst_mode != AddressingMode::Absent;
                    let src_present = src_mode != AddressingMode::Absent;

                    let mut data = Vec::new();
                    data.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]).unwrap();

                    let repr = FrameRepr {
                        frame_control: FrameControlRepr {
                            frame_type: FrameType::Data,
                            security_enabled: false,
                            frame_pending: false,
                            ack_request: true,
                            pan_id_compression: compression,
                            dst_addressing_mode: dst_mode,
                            frame_version: FrameVersion::Ieee802154_2006,
                            src_addressing_mode: src_mode,
                        },
                        sequence_number: 0x42,
                        addressing: AddressingFieldsRepr {
                            dst_pan_id: dst_present.then_some(0xabcd),
                            dst_address: dst_present.then(|| address(dst_mode)),
                            src_pan_id: (src_present && !compression).then_some(0xabcd),
                            src_address: src_present.then(|| address(src_mode)),
                        },
                        payload: FramePayloadRepr::Data(data),
                    };

                    round_trip(&repr);
                }
            }
        }
    }

    #[test]
    fn command_frame_round_trip() {
        let repr = FrameRepr {
            frame_control: FrameControlRepr {
                frame_type: FrameType::MacCommand,
                security_enabled: false,
                frame_pending: false,
                ack_request: true,
                pan_id_compression: false,
                dst_addressing_mode: AddressingMode::Short,
                frame_version: FrameVersion::Ieee802154_2003,
                src_addressing_mode: AddressingMode::Extended,
            },
            sequence_number: 0x01,
            addressing: AddressingFieldsRepr {
                dst_pan_id: Some(0xabcd),
                dst_address: Some(Address::Short([0x00, 0x00])),
                src_pan_id: Some(0xffff),
                src_address: Some(Address::Extended([1, 2, 3, 4, 5, 6, 7, 8])),
            },
            payload: FramePayloadRepr::Command(MacCommand::AssociationRequest(
                CapabilityInformation::ALLOCATE_ADDRESS,
            )),
        };

        round_trip(&repr);
    }

    #[test]
    fn beacon_frame_round_trip() {
        let mut beacon = BeaconRepr {
            superframe_spec: SuperframeSpecificationRepr {
                beacon_order: crate::BeaconOrder::Order(6),
                superframe_order: crate::SuperframeOrder::Order(6),
                final_cap_slot: 0x0f,
                battery_life_extension: false,
                pan_coordinator: true,
                association_permit: true,
            },
            ..Default::default()
        };
        beacon.payload.extend_from_slice(&[1, 2, 3]).unwrap();

        let repr = FrameRepr {
            frame_control: FrameControlRepr {
                frame_type: FrameType::Beacon,
                security_enabled: false,
                frame_pending: false,
                ack_request: false,
                pan_id_compression: false,
                dst_addressing_mode: AddressingMode::Absent,
                frame_version: FrameVersion::Ieee802154_2003,
                src_addressing_mode: AddressingMode::Short,
            },
            sequence_number: 0x17,
            addressing: AddressingFieldsRepr {
                dst_pan_id: None,
                dst_address: None,
                src_pan_id: Some(0xabcd),
                src_address: Some(Address::Short([0x00, 0x00])),
            },
            payload: FramePayloadRepr::Beacon(beacon),
        };

        round_trip(&repr);
    }
}
