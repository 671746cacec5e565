//! An IEEE 802.15.4-2006 MAC sublayer implementation.
//!
//! The [`mac::MacService`] turns a byte-oriented radio transceiver into a
//! managed PAN node acting as device, coordinator or PAN coordinator. The
//! host application drives it by calling [`mac::MacService::wpan_task`] in
//! a loop and forwarding radio and timer events.

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
pub(crate) mod utils;

pub use mac154_frame as frame;

pub mod mac;
pub mod phy;
pub mod time;
