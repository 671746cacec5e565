//! Frame Control field readers and writers.

use super::AddressingMode;
use super::{Error, Result};

/// IEEE 802.15.4 frame type.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum FrameType {
    Beacon = 0b000,
    Data = 0b001,
    Ack = 0b010,
    MacCommand = 0b011,
    Unknown,
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            0b000 => Self::Beacon,
            0b001 => Self::Data,
            0b010 => Self::Ack,
            0b011 => Self::MacCommand,
            _ => Self::Unknown,
        }
    }
}

/// IEEE 802.15.4 frame version.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum FrameVersion {
    Ieee802154_2003 = 0b00,
    Ieee802154_2006 = 0b01,
    Unknown,
}

impl From<u8> for FrameVersion {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Ieee802154_2003,
            0b01 => Self::Ieee802154_2006,
            _ => Self::Unknown,
        }
    }
}

/// A reader/writer for the IEEE 802.15.4 Frame Control field.
pub struct FrameControl<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> FrameControl<T> {
    /// Create a new [`FrameControl`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short.
    pub fn new(buffer: T) -> Result<Self> {
        let fc = Self::new_unchecked(buffer);

        if !fc.check_len() {
            return Err(Error::Truncated);
        }

        Ok(fc)
    }

    /// Returns `false` if the buffer is too short to contain the Frame
    /// Control field.
    fn check_len(&self) -> bool {
        self.buffer.as_ref().len() >= 2
    }

    /// Create a new [`FrameControl`] reader/writer from a given buffer
    /// without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    fn bits(&self) -> u16 {
        let b = &self.buffer.as_ref()[..2];
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the [`FrameType`] field.
    pub fn frame_type(&self) -> FrameType {
        FrameType::from((self.bits() & 0b111) as u8)
    }

    /// Returns `true` when the security enabled field is set.
    pub fn security_enabled(&self) -> bool {
        ((self.bits() >> 3) & 0b1) == 1
    }

    /// Returns `true` when the frame pending field is set.
    pub fn frame_pending(&self) -> bool {
        ((self.bits() >> 4) & 0b1) == 1
    }

    /// Returns `true` when the acknowledgment request field is set.
    pub fn ack_request(&self) -> bool {
        ((self.bits() >> 5) & 0b1) == 1
    }

    /// Returns `true` when the PAN ID compression field is set.
    pub fn pan_id_compression(&self) -> bool {
        ((self.bits() >> 6) & 0b1) == 1
    }

    /// Return the destination [`AddressingMode`].
    pub fn dst_addressing_mode(&self) -> AddressingMode {
        AddressingMode::from(((self.bits() >> 10) & 0b11) as u8)
    }

    /// Return the [`FrameVersion`] of the frame.
    pub fn frame_version(&self) -> FrameVersion {
        FrameVersion::from(((self.bits() >> 12) & 0b11) as u8)
    }

    /// Return the source [`AddressingMode`].
    pub fn src_addressing_mode(&self) -> AddressingMode {
        AddressingMode::from(((self.bits() >> 14) & 0b11) as u8)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> FrameControl<T> {
    fn set_bits(&mut self, bits: u16) {
        self.buffer.as_mut()[..2].copy_from_slice(&bits.to_le_bytes());
    }

    fn set_field(&mut self, shift: u16, mask: u16, value: u16) {
        let bits = (self.bits() & !(mask << shift)) | ((value & mask) << shift);
        self.set_bits(bits);
    }

    /// Set the frame type field.
    pub fn set_frame_type(&mut self, frame_type: FrameType) {
        self.set_field(0, 0b111, frame_type as u16);
    }

    /// Set the security enabled field.
    pub fn set_security_enabled(&mut self, enabled: bool) {
        self.set_field(3, 0b1, enabled as u16);
    }

    /// Set the frame pending field.
    pub fn set_frame_pending(&mut self, pending: bool) {
        self.set_field(4, 0b1, pending as u16);
    }

    /// Set the acknowledgment request field.
    pub fn set_ack_request(&mut self, request: bool) {
        self.set_field(5, 0b1, request as u16);
    }

    /// Set the PAN ID compression field.
    pub fn set_pan_id_compression(&mut self, compression: bool) {
        self.set_field(6, 0b1, compression as u16);
    }

    /// Set the destination addressing mode field.
    pub fn set_dst_addressing_mode(&mut self, mode: AddressingMode) {
        self.set_field(10, 0b11, mode as u16);
    }

    /// Set the frame version field.
    pub fn set_frame_version(&mut self, version: FrameVersion) {
        self.set_field(12, 0b11, version as u16);
    }

    /// Set the source addressing mode field.
    pub fn set_src_addressing_mode(&mut self, mode: AddressingMode) {
        self.set_field(14, 0b11, mode as u16);
    }
}

/// A high-level representation of the Frame Control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct FrameControlRepr {
    pub frame_type: FrameType,
    pub security_enabled: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    pub pan_id_compression: bool,
    pub dst_addressing_mode: AddressingMode,
    pub frame_version: FrameVersion,
    pub src_addressing_mode: AddressingMode,
}

impl FrameControlRepr {
    /// Parse a Frame Control field into its high-level representation.
    pub fn parse<T: AsRef<[u8]>>(fc: &FrameControl<T>) -> Result<Self> {
        let repr = Self {
            frame_type: fc.frame_type(),
            security_enabled: fc.security_enabled(),
            frame_pending: fc.frame_pending(),
            ack_request: fc.ack_request(),
            pan_id_compression: fc.pan_id_compression(),
            dst_addressing_mode: fc.dst_addressing_mode(),
            frame_version: fc.frame_version(),
            src_addressing_mode: fc.src_addressing_mode(),
        };

        if repr.frame_type == FrameType::Unknown {
            return Err(Error::Malformed);
        }

        if repr.frame_version == FrameVersion::Unknown {
            return Err(Error::Malformed);
        }

        if repr.dst_addressing_mode == AddressingMode::Unknown
            || repr.src_addressing_mode == AddressingMode::Unknown
        {
            return Err(Error::Malformed);
        }

        Ok(repr)
    }

    /// Emit the representation into a Frame Control writer.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, fc: &mut FrameControl<T>) {
        fc.set_bits(0);
        fc.set_frame_type(self.frame_type);
        fc.set_security_enabled(self.security_enabled);
        fc.set_frame_pending(self.frame_pending);
        fc.set_ack_request(self.ack_request);
        fc.set_pan_id_compression(self.pan_id_compression);
        fc.set_dst_addressing_mode(self.dst_addressing_mode);
        fc.set_frame_version(self.frame_version);
        fc.set_src_addressing_mode(self.src_addressing_mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_frame_control() {
        // Data frame, ack request, PAN ID compression, short addressing.
        let data = [0x61, 0x88];
        let fc = FrameControl::new(&data[..]).unwrap();

        assert_eq!(fc.frame_type(), FrameType::Data);
        assert!(!fc.security_enabled());
        assert!(!fc.frame_pending());
        assert!(fc.ack_request());
        assert!(fc.pan_id_compression());
        assert_eq!(fc.dst_addressing_mode(), AddressingMode::Short);
        assert_eq!(fc.frame_version(), FrameVersion::Ieee802154_2003);
        assert_eq!(fc.src_addressing_mode(), AddressingMode::Short);
    }

    #[test]
    fn emit_matches_parse() {
        let repr = FrameControlRepr {
            frame_type: FrameType::MacCommand,
            security_enabled: false,
            frame_pending: true,
            ack_request: true,
            pan_id_compression: false,
            dst_addressing_mode: AddressingMode::Short,
            frame_version: FrameVersion::Ieee802154_2006,
            src_addressing_mode: AddressingMode::Extended,
        };

        let mut buffer = [0u8; 2];
        repr.emit(&mut FrameControl::new_unchecked(&mut buffer[..]));

        let parsed = FrameControlRepr::parse(&FrameControl::new(&buffer[..]).unwrap()).unwrap();
        assert_eq!(parsed, repr);
    }

    #[test]
    fn too_short() {
        assert!(FrameControl::new(&[0x61][..]).is_err());
    }
}
