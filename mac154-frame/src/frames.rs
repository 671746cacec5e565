//! Readers and writers for whole MAC protocol data units.

use super::{
    AddressingFields, AddressingFieldsRepr, Error, FrameControl, FrameControlRepr, Result,
};

/// The maximum size of a PHY service data unit in octets
/// (aMaxPHYPacketSize).
pub const MAX_PHY_PACKET_SIZE: usize = 127;

/// The size of the frame check sequence in octets.
pub const FCS_LEN: usize = 2;

/// A reader/writer for an IEEE 802.15.4 MPDU, excluding the FCS.
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    /// Create a new [`Frame`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer does not contain a well-formed
    /// header, or [`Error::SecurityNotSupported`] if the security enabled
    /// bit is set.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Self::new_unchecked(buffer);

        if frame.buffer.as_ref().len() < 3 {
            return Err(Error::Truncated);
        }

        let fc = FrameControlRepr::parse(&frame.frame_control())?;

        if fc.security_enabled {
            return Err(Error::SecurityNotSupported);
        }

        // Validates the addressing field length against the frame control.
        frame.addressing()?;

        Ok(frame)
    }

    /// Create a new [`Frame`] reader/writer without validation.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Consume the reader and return the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return a [`FrameControl`] reader.
    pub fn frame_control(&self) -> FrameControl<&'_ [u8]> {
        FrameControl::new_unchecked(&self.buffer.as_ref()[..2])
    }

    /// Return the sequence number of the frame.
    pub fn sequence_number(&self) -> u8 {
        self.buffer.as_ref()[2]
    }

    /// Return an [`AddressingFields`] reader.
    pub fn addressing(&self) -> Result<AddressingFields<&'_ [u8]>> {
        let fc = FrameControlRepr::parse(&self.frame_control())?;
        AddressingFields::new(&self.buffer.as_ref()[3..], fc)
    }

    /// Return the MAC payload following the header.
    pub fn payload(&self) -> Result<&'_ [u8]> {
        let offset = 3 + self.addressing()?.len();
        Ok(&self.buffer.as_ref()[offset..])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    /// Write the frame control field.
    pub fn set_frame_control(&mut self, repr: &FrameControlRepr) {
        repr.emit(&mut FrameControl::new_unchecked(
            &mut self.buffer.as_mut()[..2],
        ));
    }

    /// Write the sequence number.
    pub fn set_sequence_number(&mut self, sequence_number: u8) {
        self.buffer.as_mut()[2] = sequence_number;
    }

    /// Write the addressing fields. The frame control field must have been
    /// written first.
    pub fn set_addressing_fields(&mut self, repr: &AddressingFieldsRepr) {
        repr.emit(&mut self.buffer.as_mut()[3..]);
    }

    /// Return the mutable MAC payload region following the header. The
    /// frame control and addressing fields must have been written first.
    pub fn payload_mut(&mut self) -> Result<&'_ mut [u8]> {
        let offset = 3 + self.addressing()?.len();
        Ok(&mut self.buffer.as_mut()[offset..])
    }
}

/// A reader for an IEEE 802.15.4 MPDU including its 16-bit frame check
/// sequence.
pub struct FrameWithFcs<T: AsRef<[u8]>> {
    buffer: T,
}

// The FCS field contains a 16-bit ITU-T CRC, using the x^16 + x^12 + x^5 + 1
// polynomial with initial and final values 0x0000, calculated over the
// entire frame excluding the FCS field itself.
const CRC_16_IEEE802154: crc::Algorithm<u16> = crc::Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0x0000,
    refin: true,
    refout: true,
    xorout: 0x0000,
    check: 0x2189,
    residue: 0x0000,
};

impl<T: AsRef<[u8]>> FrameWithFcs<T> {
    /// Create a new [`FrameWithFcs`] from a given buffer, checking the FCS.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Self::new_unchecked(buffer);

        if frame.buffer.as_ref().len() < 2 + FCS_LEN {
            return Err(Error::Truncated);
        }

        if !frame.check_fcs() {
            return Err(Error::FcsMismatch);
        }

        Ok(frame)
    }

    /// Create a new [`FrameWithFcs`] from a given buffer without checking
    /// the FCS.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Calculate the frame check sequence over the frame content.
    #[inline]
    pub fn calculate_fcs(&self) -> u16 {
        crc::Crc::<u16>::new(&CRC_16_IEEE802154).checksum(self.content())
    }

    /// Check the frame check sequence of the frame.
    #[inline]
    pub fn check_fcs(&self) -> bool {
        self.calculate_fcs() == self.fcs()
    }

    /// Return the content of the frame, excluding the FCS.
    pub fn content(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.buffer.as_ref().len() - FCS_LEN]
    }

    /// Return the frame check sequence of the frame.
    pub fn fcs(&self) -> u16 {
        let b = self.buffer.as_ref();
        u16::from_le_bytes([b[b.len() - 2], b[b.len() - 1]])
    }

    /// Return a [`Frame`] reader over the content, excluding the FCS.
    pub fn frame(&self) -> Result<Frame<&'_ [u8]>> {
        Frame::new(self.content())
    }
}

/// Compute and append the frame check sequence over `buffer`, whose last
/// two octets are the FCS field.
pub fn write_fcs(buffer: &mut [u8]) {
    let content_len = buffer.len() - FCS_LEN;
    let fcs = crc::Crc::<u16>::new(&CRC_16_IEEE802154).checksum(&buffer[..content_len]);
    buffer[content_len..].copy_from_slice(&fcs.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, FrameType};

    #[test]
    fn read_data_frame() {
        let mpdu = hex::decode("61887acdab0200010026c8").unwrap();
        let frame = Frame::new(&mpdu[..]).unwrap();

        assert_eq!(frame.frame_control().frame_type(), FrameType::Data);
        assert!(frame.frame_control().ack_request());
        assert_eq!(frame.sequence_number(), 0x7a);

        let addressing = frame.addressing().unwrap();
        assert_eq!(addressing.dst_pan_id(), Some(0xabcd));
        assert_eq!(addressing.dst_address(), Some(Address::Short([0x00, 0x02])));
        assert_eq!(addressing.src_pan_id(), None);
        assert_eq!(addressing.src_address(), Some(Address::Short([0x00, 0x01])));

        assert_eq!(frame.payload().unwrap(), &[0x26, 0xc8]);
    }

    #[test]
    fn security_bit_rejected() {
        // Same frame with the security enabled bit set.
        let mpdu = hex::decode("69887acdab0200010026c8").unwrap();
        assert!(matches!(
            Frame::new(&mpdu[..]),
            Err(Error::SecurityNotSupported)
        ));
    }

    #[test]
    fn fcs_round_trip() {
        let mut mpdu = hex::decode("61887acdab0200010026c80000").unwrap();
        write_fcs(&mut mpdu);

        let frame = FrameWithFcs::new(&mpdu[..]).unwrap();
        assert!(frame.check_fcs());
        assert_eq!(frame.frame().unwrap().sequence_number(), 0x7a);

        // Corrupt one octet and the check fails.
        let mut corrupted = mpdu.clone();
        corrupted[4] ^= 0xff;
        assert!(matches!(
            FrameWithFcs::new(&corrupted[..]),
            Err(Error::FcsMismatch)
        ));
    }
}
