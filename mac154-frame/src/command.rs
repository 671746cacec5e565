//! MAC command frame payloads.
//!
//! The payload of a MAC command frame starts with a one-octet command
//! frame identifier, followed by the command-specific content. The
//! identifier values are fixed by the standard.

use bitflags::bitflags;

use super::{Error, Result};

/// MAC command frame identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum CommandFrameId {
    AssociationRequest = 0x01,
    AssociationResponse = 0x02,
    DisassociationNotification = 0x03,
    DataRequest = 0x04,
    PanIdConflictNotification = 0x05,
    OrphanNotification = 0x06,
    BeaconRequest = 0x07,
    CoordinatorRealignment = 0x08,
    GtsRequest = 0x09,
}

impl TryFrom<u8> for CommandFrameId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::AssociationRequest),
            0x02 => Ok(Self::AssociationResponse),
            0x03 => Ok(Self::DisassociationNotification),
            0x04 => Ok(Self::DataRequest),
            0x05 => Ok(Self::PanIdConflictNotification),
            0x06 => Ok(Self::OrphanNotification),
            0x07 => Ok(Self::BeaconRequest),
            0x08 => Ok(Self::CoordinatorRealignment),
            0x09 => Ok(Self::GtsRequest),
            _ => Err(Error::Malformed),
        }
    }
}

bitflags! {
    /// Capability Information field of the association request command.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CapabilityInformation: u8 {
        /// The device is capable of becoming the PAN coordinator.
        const ALTERNATE_PAN_COORDINATOR = 0b0000_0001;
        /// The device is a full-function device.
        const FULL_FUNCTION_DEVICE = 0b0000_0010;
        /// The device is mains powered.
        const MAINS_POWERED = 0b0000_0100;
        /// The receiver stays enabled during idle periods.
        const RX_ON_WHEN_IDLE = 0b0000_1000;
        /// The device can send and receive secured frames.
        const SECURITY_CAPABLE = 0b0100_0000;
        /// The device requests a short address from the coordinator.
        const ALLOCATE_ADDRESS = 0b1000_0000;
    }
}

/// Status carried in an association response command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum AssociationStatus {
    Successful = 0x00,
    PanAtCapacity = 0x01,
    PanAccessDenied = 0x02,
}

impl TryFrom<u8> for AssociationStatus {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Successful),
            0x01 => Ok(Self::PanAtCapacity),
            0x02 => Ok(Self::PanAccessDenied),
            _ => Err(Error::Malformed),
        }
    }
}

/// Reason carried in a disassociation notification command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum DisassociationReason {
    /// The coordinator wishes the device to leave the PAN.
    CoordinatorWishesDeviceToLeave = 0x01,
    /// The device wishes to leave the PAN.
    DeviceWishesToLeave = 0x02,
}

impl TryFrom<u8> for DisassociationReason {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::CoordinatorWishesDeviceToLeave),
            0x02 => Ok(Self::DeviceWishesToLeave),
            _ => Err(Error::Malformed),
        }
    }
}

/// GTS direction, from the perspective of the requesting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum GtsDirection {
    /// The device transmits during the slot.
    Transmit,
    /// The device receives during the slot.
    Receive,
}

/// Characteristics type of a GTS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum GtsCharacteristicsType {
    Deallocate,
    Allocate,
}

/// GTS Characteristics field of the GTS request command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct GtsCharacteristics {
    /// Number of superframe slots requested.
    pub length: u8,
    /// Direction of the slot.
    pub direction: GtsDirection,
    /// Whether the slot is to be allocated or deallocated.
    pub characteristics_type: GtsCharacteristicsType,
}

impl GtsCharacteristics {
    /// Parse the one-octet GTS Characteristics field.
    pub fn from_octet(octet: u8) -> Self {
        Self {
            length: octet & 0x0f,
            direction: if octet & 0x10 != 0 {
                GtsDirection::Receive
            } else {
                GtsDirection::Transmit
            },
            characteristics_type: if octet & 0x20 != 0 {
                GtsCharacteristicsType::Allocate
            } else {
                GtsCharacteristicsType::Deallocate
            },
        }
    }

    /// Return the one-octet wire encoding.
    pub fn as_octet(&self) -> u8 {
        let mut octet = self.length & 0x0f;
        if self.direction == GtsDirection::Receive {
            octet |= 0x10;
        }
        if self.characteristics_type == GtsCharacteristicsType::Allocate {
            octet |= 0x20;
        }
        octet
    }
}

/// Content of a coordinator realignment command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct CoordinatorRealignment {
    /// The PAN identifier the coordinator intends to use.
    pub pan_id: u16,
    /// The short address of the coordinator.
    pub coord_short_address: u16,
    /// The channel the coordinator intends to use.
    pub channel: u8,
    /// The short address of the orphaned device, or `0xffff` when the
    /// realignment is broadcast to the PAN.
    pub device_short_address: u16,
    /// The channel page, present in 2006 frames only.
    pub channel_page: Option<u8>,
}

/// A high-level representation of a MAC command frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacCommand {
    AssociationRequest(CapabilityInformation),
    AssociationResponse {
        short_address: u16,
        status: AssociationStatus,
    },
    DisassociationNotification(DisassociationReason),
    DataRequest,
    PanIdConflictNotification,
    OrphanNotification,
    BeaconRequest,
    CoordinatorRealignment(CoordinatorRealignment),
    GtsRequest(GtsCharacteristics),
}

impl MacCommand {
    /// Return the command frame identifier.
    pub fn command_id(&self) -> CommandFrameId {
        match self {
            Self::AssociationRequest(_) => CommandFrameId::AssociationRequest,
            Self::AssociationResponse { .. } => CommandFrameId::AssociationResponse,
            Self::DisassociationNotification(_) => CommandFrameId::DisassociationNotification,
            Self::DataRequest => CommandFrameId::DataRequest,
            Self::PanIdConflictNotification => CommandFrameId::PanIdConflictNotification,
            Self::OrphanNotification => CommandFrameId::OrphanNotification,
            Self::BeaconRequest => CommandFrameId::BeaconRequest,
            Self::CoordinatorRealignment(_) => CommandFrameId::CoordinatorRealignment,
            Self::GtsRequest(_) => CommandFrameId::GtsRequest,
        }
    }

    /// Parse a MAC command frame payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(Error::Truncated);
        }

        let id = CommandFrameId::try_from(payload[0])?;
        let content = &payload[1..];

        match id {
            CommandFrameId::AssociationRequest => {
                if content.is_empty() {
                    return Err(Error::Truncated);
                }
                Ok(Self::AssociationRequest(
                    CapabilityInformation::from_bits_truncate(content[0]),
                ))
            }
            CommandFrameId::AssociationResponse => {
                if content.len() < 3 {
                    return Err(Error::Truncated);
                }
                Ok(Self::AssociationResponse {
                    short_address: u16::from_le_bytes([content[0], content[1]]),
                    status: AssociationStatus::try_from(content[2])?,
                })
            }
            CommandFrameId::DisassociationNotification => {
                if content.is_empty() {
                    return Err(Error::Truncated);
                }
                Ok(Self::DisassociationNotification(
                    DisassociationReason::try_from(content[0])?,
                ))
            }
            CommandFrameId::DataRequest => Ok(Self::DataRequest),
            CommandFrameId::PanIdConflictNotification => Ok(Self::PanIdConflictNotification),
            CommandFrameId::OrphanNotification => Ok(Self::OrphanNotification),
            CommandFrameId::BeaconRequest => Ok(Self::BeaconRequest),
            CommandFrameId::CoordinatorRealignment => {
                if content.len() < 7 {
                    return Err(Error::Truncated);
                }
                Ok(Self::CoordinatorRealignment(CoordinatorRealignment {
                    pan_id: u16::from_le_bytes([content[0], content[1]]),
                    coord_short_address: u16::from_le_bytes([content[2], content[3]]),
                    channel: content[4],
                    device_short_address: u16::from_le_bytes([content[5], content[6]]),
                    channel_page: content.get(7).copied(),
                }))
            }
            CommandFrameId::GtsRequest => {
                if content.is_empty() {
                    return Err(Error::Truncated);
                }
                Ok(Self::GtsRequest(GtsCharacteristics::from_octet(content[0])))
            }
        }
    }

    /// Return the length of the command payload when emitted.
    pub fn buffer_len(&self) -> usize {
        1 + match self {
            Self::AssociationRequest(_) => 1,
            Self::AssociationResponse { .. } => 3,
            Self::DisassociationNotification(_) => 1,
            Self::DataRequest
            | Self::PanIdConflictNotification
            | Self::OrphanNotification
            | Self::BeaconRequest => 0,
            Self::CoordinatorRealignment(r) => 7 + r.channel_page.map_or(0, |_| 1),
            Self::GtsRequest(_) => 1,
        }
    }

    /// Emit the command payload into the given buffer.
    pub fn emit(&self, buffer: &mut [u8]) {
        buffer[0] = self.command_id() as u8;
        let content = &mut buffer[1..];

        match self {
            Self::AssociationRequest(capability) => content[0] = capability.bits(),
            Self::AssociationResponse {
                short_address,
                status,
            } => {
                content[..2].copy_from_slice(&short_address.to_le_bytes());
                content[2] = *status as u8;
            }
            Self::DisassociationNotification(reason) => content[0] = *reason as u8,
            Self::DataRequest
            | Self::PanIdConflictNotification
            | Self::OrphanNotification
            | Self::BeaconRequest => {}
            Self::CoordinatorRealignment(r) => {
                content[..2].copy_from_slice(&r.pan_id.to_le_bytes());
                content[2..4].copy_from_slice(&r.coord_short_address.to_le_bytes());
                content[4] = r.channel;
                content[5..7].copy_from_slice(&r.device_short_address.to_le_bytes());
                if let Some(page) = r.channel_page {
                    content[7] = page;
                }
            }
            Self::GtsRequest(characteristics) => content[0] = characteristics.as_octet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn association_request_round_trip() {
        let command = MacCommand::AssociationRequest(
            CapabilityInformation::ALLOCATE_ADDRESS | CapabilityInformation::RX_ON_WHEN_IDLE,
        );

        let mut buffer = [0u8; 2];
        assert_eq!(command.buffer_len(), 2);
        command.emit(&mut buffer);
        assert_eq!(buffer, [0x01, 0x88]);

        assert_eq!(MacCommand::parse(&buffer).unwrap(), command);
    }

    #[test]
    fn association_response_round_trip() {
        let command = MacCommand::AssociationResponse {
            short_address: 0x1234,
            status: AssociationStatus::Successful,
        };

        let mut buffer = [0u8; 4];
        command.emit(&mut buffer);
        assert_eq!(buffer, [0x02, 0x34, 0x12, 0x00]);

        assert_eq!(MacCommand::parse(&buffer).unwrap(), command);
    }

    #[test]
    fn data_request() {
        let command = MacCommand::DataRequest;

        let mut buffer = [0u8; 1];
        assert_eq!(command.buffer_len(), 1);
        command.emit(&mut buffer);
        assert_eq!(buffer, [0x04]);

        assert_eq!(MacCommand::parse(&buffer).unwrap(), command);
    }

    #[test]
    fn coordinator_realignment_round_trip() {
        let command = MacCommand::CoordinatorRealignment(CoordinatorRealignment {
            pan_id: 0xbeef,
            coord_short_address: 0x0000,
            channel: 11,
            device_short_address: 0xffff,
            channel_page: Some(0),
        });

        let mut buffer = [0u8; 9];
        assert_eq!(command.buffer_len(), 9);
        command.emit(&mut buffer);
        assert_eq!(MacCommand::parse(&buffer).unwrap(), command);
    }

    #[test]
    fn gts_characteristics_octet() {
        let characteristics = GtsCharacteristics {
            length: 2,
            direction: GtsDirection::Receive,
            characteristics_type: GtsCharacteristicsType::Allocate,
        };
        assert_eq!(characteristics.as_octet(), 0x32);
        assert_eq!(
            GtsCharacteristics::from_octet(0x32),
            characteristics
        );
    }

    #[test]
    fn unknown_command_id() {
        assert_eq!(MacCommand::parse(&[0x42]), Err(Error::Malformed));
        assert_eq!(MacCommand::parse(&[]), Err(Error::Truncated));
    }
}
