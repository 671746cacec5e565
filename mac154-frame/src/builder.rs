//! A helper for building IEEE 802.15.4 frames.

use heapless::Vec;

use super::{
    Address, AddressingFieldsRepr, BeaconRepr, Error, FrameControlRepr, FramePayloadRepr,
    FrameRepr, FrameType, FrameVersion, MacCommand, Result,
};

pub struct Beacon;
pub struct Ack;
pub struct Data;
pub struct Command;

/// A helper for building IEEE 802.15.4 frames.
///
/// The builder assembles a [`FrameRepr`]; [`finalize`](Self::finalize)
/// applies the PAN ID compression rule and returns the representation
/// ready to be emitted.
pub struct FrameBuilder<T> {
    frame: FrameRepr,
    r#type: core::marker::PhantomData<T>,
}

fn frame_control(frame_type: FrameType) -> FrameControlRepr {
    FrameControlRepr {
        frame_type,
        security_enabled: false,
        frame_pending: false,
        ack_request: false,
        pan_id_compression: false,
        dst_addressing_mode: crate::AddressingMode::Absent,
        frame_version: FrameVersion::Ieee802154_2003,
        src_addressing_mode: crate::AddressingMode::Absent,
    }
}

impl FrameBuilder<Ack> {
    /// Create a new builder for an immediate acknowledgment frame.
    pub fn new_imm_ack(sequence_number: u8) -> Self {
        Self {
            frame: FrameRepr {
                frame_control: frame_control(FrameType::Ack),
                sequence_number,
                addressing: AddressingFieldsRepr::default(),
                payload: FramePayloadRepr::Ack,
            },
            r#type: core::marker::PhantomData,
        }
    }
}

impl FrameBuilder<Beacon> {
    /// Create a new builder for a beacon frame.
    pub fn new_beacon(beacon: BeaconRepr) -> Self {
        Self {
            frame: FrameRepr {
                frame_control: frame_control(FrameType::Beacon),
                sequence_number: 0,
                addressing: AddressingFieldsRepr::default(),
                payload: FramePayloadRepr::Beacon(beacon),
            },
            r#type: core::marker::PhantomData,
        }
    }
}

impl FrameBuilder<Data> {
    /// Create a new builder for a data frame.
    pub fn new_data(payload: &[u8]) -> Self {
        let mut data = Vec::new();
        // Oversized payloads are caught in finalize.
        let overflow = data.extend_from_slice(payload).is_err();

        let mut builder = Self {
            frame: FrameRepr {
                frame_control: frame_control(FrameType::Data),
                sequence_number: 0,
                addressing: AddressingFieldsRepr::default(),
                payload: FramePayloadRepr::Data(data),
            },
            r#type: core::marker::PhantomData,
        };

        if overflow {
            // Poison the frame type so finalize fails.
            builder.frame.frame_control.frame_type = FrameType::Unknown;
        }

        builder
    }
}

impl FrameBuilder<Command> {
    /// Create a new builder for a MAC command frame.
    pub fn new_command(command: MacCommand) -> Self {
        let mut builder = Self {
            frame: FrameRepr {
                frame_control: frame_control(FrameType::MacCommand),
                sequence_number: 0,
                addressing: AddressingFieldsRepr::default(),
                payload: FramePayloadRepr::Command(command),
            },
            r#type: core::marker::PhantomData,
        };

        // MAC command frames are acknowledged unless broadcast; the
        // caller clears the flag for broadcast commands via the
        // destination address in finalize.
        builder.frame.frame_control.ack_request = true;
        builder
    }
}

impl<T> FrameBuilder<T> {
    /// Set the frame sequence number.
    pub fn set_sequence_number(mut self, sequence_number: u8) -> Self {
        self.frame.sequence_number = sequence_number;
        self
    }

    /// Set the frame version.
    pub fn set_frame_version(mut self, version: FrameVersion) -> Self {
        self.frame.frame_control.frame_version = version;
        self
    }

    /// Set the acknowledgment request field.
    pub fn set_ack_request(mut self, ack_request: bool) -> Self {
        self.frame.frame_control.ack_request = ack_request;
        self
    }

    /// Set the frame pending field.
    pub fn set_frame_pending(mut self, frame_pending: bool) -> Self {
        self.frame.frame_control.frame_pending = frame_pending;
        self
    }

    /// Set the destination PAN ID.
    pub fn set_dst_pan_id(mut self, pan_id: u16) -> Self {
        self.frame.addressing.dst_pan_id = Some(pan_id);
        self
    }

    /// Set the source PAN ID.
    pub fn set_src_pan_id(mut self, pan_id: u16) -> Self {
        self.frame.addressing.src_pan_id = Some(pan_id);
        self
    }

    /// Set the destination address and addressing mode.
    pub fn set_dst_address(mut self, address: Address) -> Self {
        self.frame.frame_control.dst_addressing_mode = address.into();
        self.frame.addressing.dst_address = match address {
            Address::Absent => None,
            address => Some(address),
        };
        self
    }

    /// Set the source address and addressing mode.
    pub fn set_src_address(mut self, address: Address) -> Self {
        self.frame.frame_control.src_addressing_mode = address.into();
        self.frame.addressing.src_address = match address {
            Address::Absent => None,
            address => Some(address),
        };
        self
    }

    /// Finalize the frame builder, returning the frame representation.
    ///
    /// Checks and sets the PAN ID compression field: when both addresses
    /// are present and the PAN IDs are equal, the source PAN ID is elided
    /// and the compression bit set; when only one address is present, the
    /// other side's PAN ID must be absent.
    pub fn finalize(mut self) -> Result<FrameRepr> {
        if self.frame.frame_control.frame_type == FrameType::Unknown {
            return Err(Error::Malformed);
        }

        if matches!(self.frame.frame_control.frame_type, FrameType::Ack) {
            // Acknowledgment frames carry no addressing fields.
            self.frame.addressing = AddressingFieldsRepr::default();
            return Ok(self.frame);
        }

        let addr = &mut self.frame.addressing;
        match (
            addr.dst_address,
            addr.src_address,
            addr.dst_pan_id,
            addr.src_pan_id,
        ) {
            (Some(dst), Some(_), Some(dst_pan_id), Some(src_pan_id)) => {
                if dst_pan_id == src_pan_id {
                    self.frame.frame_control.pan_id_compression = true;
                    addr.src_pan_id = None;
                }

                // Broadcast frames are never acknowledged.
                if dst.is_broadcast() {
                    self.frame.frame_control.ack_request = false;
                }
            }
            (Some(dst), None, Some(_), _) => {
                self.frame.frame_control.pan_id_compression = false;
                addr.src_pan_id = None;

                if dst.is_broadcast() {
                    self.frame.frame_control.ack_request = false;
                }
            }
            (None, Some(_), _, Some(_)) => {
                self.frame.frame_control.pan_id_compression = false;
                addr.dst_pan_id = None;
            }
            _ => return Err(Error::Malformed),
        }

        self.frame.validate()?;

        Ok(self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frame;

    #[test]
    fn emit_imm_ack() {
        let imm_ack = FrameBuilder::new_imm_ack(1).finalize().unwrap();

        let mut buffer = std::vec![0; imm_ack.buffer_len()];
        imm_ack.emit(&mut Frame::new_unchecked(&mut buffer[..]));

        assert_eq!(buffer, [0x02, 0x00, 0x01]);
    }

    #[test]
    fn pan_id_compression_applied() {
        let frame = FrameBuilder::new_data(&[0x2b])
            .set_sequence_number(1)
            .set_dst_pan_id(0xabcd)
            .set_dst_address(Address::Short([0x00, 0x02]))
            .set_src_pan_id(0xabcd)
            .set_src_address(Address::Short([0x00, 0x01]))
            .finalize()
            .unwrap();

        assert!(frame.frame_control.pan_id_compression);
        assert_eq!(frame.addressing.src_pan_id, None);
        assert_eq!(frame.buffer_len(), 2 + 1 + 6 + 1);
    }

    #[test]
    fn differing_pan_ids_not_compressed() {
        let frame = FrameBuilder::new_data(&[0x2b])
            .set_dst_pan_id(0xabcd)
            .set_dst_address(Address::Short([0x00, 0x02]))
            .set_src_pan_id(0x1234)
            .set_src_address(Address::Short([0x00, 0x01]))
            .finalize()
            .unwrap();

        assert!(!frame.frame_control.pan_id_compression);
        assert_eq!(frame.addressing.src_pan_id, Some(0x1234));
    }

    #[test]
    fn broadcast_clears_ack_request() {
        let frame = FrameBuilder::new_command(MacCommand::BeaconRequest)
            .set_dst_pan_id(0xffff)
            .set_dst_address(Address::BROADCAST)
            .finalize()
            .unwrap();

        assert!(!frame.frame_control.ack_request);
    }

    #[test]
    fn missing_addressing_rejected() {
        assert!(FrameBuilder::new_data(&[0x2b]).finalize().is_err());
    }
}
