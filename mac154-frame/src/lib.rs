//! Zero-copy read and write structures for IEEE 802.15.4-2006 MAC frames.
//!
//! Each reader contains the following functions:
//! - [`new`]: Create a new reader, validating the buffer.
//! - [`new_unchecked`]: Create a new reader without validation.
//!
//! The most important reader is the [`Frame`] reader, used to read a full
//! MAC protocol data unit (MPDU). It provides access to:
//! - [`frame_control`]: a [`FrameControl`] reader.
//! - [`sequence_number`]: the DSN or BSN of the frame.
//! - [`addressing`]: an [`AddressingFields`] reader.
//! - [`payload`]: the MAC payload following the header.
//!
//! For working with frames as plain values, every field group also has an
//! owned `*Repr` counterpart with `parse`, `buffer_len` and `emit`:
//! [`FrameRepr`] covers a whole frame, [`BeaconRepr`] the beacon payload,
//! and [`MacCommand`] the MAC command payloads. New outgoing frames are
//! assembled with the [`FrameBuilder`].
//!
//! ## Reading a frame
//! ```
//! use mac154_frame::{Frame, FrameType, Address};
//!
//! let mpdu = [
//!     0x61, 0x88, 0x7a, 0xcd, 0xab, 0x02, 0x00, 0x01, 0x00, 0x2a, 0x2b,
//! ];
//! let frame = Frame::new(&mpdu[..]).unwrap();
//! assert_eq!(frame.frame_control().frame_type(), FrameType::Data);
//! assert_eq!(frame.sequence_number(), 0x7a);
//!
//! let addressing = frame.addressing().unwrap();
//! assert_eq!(addressing.dst_pan_id(), Some(0xabcd));
//! assert_eq!(addressing.dst_address(), Some(Address::Short([0x00, 0x02])));
//! ```
//!
//! ## Writing a frame
//! ```
//! use mac154_frame::{Address, Frame, FrameBuilder};
//!
//! let repr = FrameBuilder::new_data(&[0x2a, 0x2b])
//!     .set_sequence_number(0x7a)
//!     .set_dst_pan_id(0xabcd)
//!     .set_dst_address(Address::Short([0x00, 0x02]))
//!     .set_src_pan_id(0xabcd)
//!     .set_src_address(Address::Short([0x00, 0x01]))
//!     .finalize()
//!     .unwrap();
//!
//! let mut buffer = [0u8; 127];
//! let len = repr.buffer_len();
//! repr.emit(&mut Frame::new_unchecked(&mut buffer[..len]));
//! ```
//!
//! [`new`]: Frame::new
//! [`new_unchecked`]: Frame::new_unchecked
//! [`frame_control`]: Frame::frame_control
//! [`sequence_number`]: Frame::sequence_number
//! [`addressing`]: Frame::addressing
//! [`payload`]: Frame::payload
#![no_std]
#![deny(unsafe_code)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

mod frame_control;
pub use frame_control::*;

mod addressing;
pub use addressing::*;

mod command;
pub use command::*;

mod beacon;
pub use beacon::*;

mod frames;
pub use frames::*;

mod repr;
pub use repr::*;

mod builder;
pub use builder::FrameBuilder;

/// An error that can occur when reading or writing an IEEE 802.15.4 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Error {
    /// The buffer is too short to contain the structure.
    Truncated,
    /// A field value or field combination is not representable.
    Malformed,
    /// The security-enabled bit is set, but no security feature is
    /// compiled in.
    SecurityNotSupported,
    /// The frame check sequence does not match the frame content.
    FcsMismatch,
}

/// A type alias for `Result<T, mac154_frame::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
