//! The boundary towards the transceiver abstraction layer.
//!
//! The MAC drives the radio through the [`Radio`] trait and learns about
//! completed operations through [`MacService`] entry points: every accepted
//! [`Radio::transmit`] eventually produces exactly one
//! [`MacService::tx_done`] call, received frames arrive through
//! [`MacService::frame_received`], and a finished energy-detect scan
//! reports through [`MacService::ed_scan_done`].
//!
//! [`MacService`]: crate::mac::MacService
//! [`MacService::tx_done`]: crate::mac::MacService::tx_done
//! [`MacService::frame_received`]: crate::mac::MacService::frame_received
//! [`MacService::ed_scan_done`]: crate::mac::MacService::ed_scan_done

use crate::time::{Duration, Instant};

/// The maximum size of a PHY service data unit in octets.
pub const MAX_PHY_PACKET_SIZE: usize = 127;

/// The number of symbols it takes to transmit one octet.
pub const SYMBOLS_PER_OCTET: u32 = 2;

/// The duration of the synchronization header in symbols.
pub const SHR_DURATION_SYMBOLS: u32 = 10;

/// Return the on-air duration of a frame of `mpdu_len` octets in symbols,
/// including the synchronization and PHY headers.
pub const fn frame_duration_symbols(mpdu_len: usize) -> u32 {
    SHR_DURATION_SYMBOLS + (1 + mpdu_len as u32) * SYMBOLS_PER_OCTET
}

/// The result of a completed frame transmission, reported by the radio
/// through [`MacService::tx_done`](crate::mac::MacService::tx_done).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The frame was transmitted, and acknowledged if requested.
    Ok,
    /// The frame was acknowledged with the frame pending bit set.
    FramePending,
    /// No acknowledgment was received after all retries.
    NoAck,
    /// The channel was never clear during CSMA-CA.
    ChannelAccessFailure,
    /// The frame does not fit the remaining time in the current slot or
    /// superframe.
    FrameTooLong,
}

impl TxStatus {
    /// Query whether the frame reached its destination. A pending-frame
    /// acknowledgment is a successful transmission.
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Ok | TxStatus::FramePending)
    }
}

/// The channel access mode used for a transmission.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsmaMode {
    /// Transmit immediately, without CSMA-CA and without waiting an
    /// inter-frame spacing.
    NoCsmaNoIfs,
    /// Transmit without CSMA-CA after a short inter-frame spacing.
    NoCsmaWithIfs,
    /// Unslotted CSMA-CA.
    Unslotted,
    /// Slotted CSMA-CA, aligned to the superframe backoff slots.
    Slotted,
}

/// An error reported by the radio when it cannot accept an operation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The radio is already busy with another operation, or too close to
    /// its next scheduled beacon transmission.
    Busy,
    /// The requested channel or page is not supported.
    UnsupportedChannel,
}

/// A buffer holding one frame: a one-octet PHY length prefix followed by
/// up to 127 MPDU octets (the last two being the FCS field).
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// The PHY length prefix and frame content.
    pub data: [u8; 1 + MAX_PHY_PACKET_SIZE],
    /// Link quality of the reception this buffer was filled by, if any.
    pub lqi: u8,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            data: [0u8; 1 + MAX_PHY_PACKET_SIZE],
            lqi: 0,
        }
    }
}

impl FrameBuffer {
    /// Return the MPDU length recorded in the PHY length prefix.
    pub fn mpdu_len(&self) -> usize {
        usize::min(self.data[0] as usize, MAX_PHY_PACKET_SIZE)
    }

    /// Set the PHY length prefix.
    pub fn set_mpdu_len(&mut self, len: usize) {
        debug_assert!(len <= MAX_PHY_PACKET_SIZE);
        self.data[0] = len as u8;
    }

    /// Return the MPDU, including the FCS field.
    pub fn mpdu(&self) -> &[u8] {
        &self.data[1..1 + self.mpdu_len()]
    }

    /// Return the mutable MPDU, including the FCS field.
    pub fn mpdu_mut(&mut self) -> &mut [u8] {
        let len = self.mpdu_len();
        &mut self.data[1..1 + len]
    }
}

/// The transceiver abstraction consumed by the MAC.
///
/// All operations are non-blocking: `transmit` and `ed_start` only accept
/// work, and completion is reported asynchronously to the MAC service.
pub trait Radio {
    /// Hand a frame to the transceiver for transmission. On acceptance,
    /// exactly one `tx_done` callback will follow.
    fn transmit(
        &mut self,
        frame: &FrameBuffer,
        csma: CsmaMode,
        retries: bool,
    ) -> Result<(), RadioError>;

    /// Hand a beacon frame to the transceiver for immediate transmission
    /// at the beacon slot boundary. Periodic beacons are fire-and-forget;
    /// no `tx_done` follows.
    fn transmit_beacon(&mut self, frame: &FrameBuffer) -> Result<(), RadioError>;

    /// Start an energy-detect measurement over the given duration. On
    /// acceptance, one `ed_scan_done` callback will follow.
    fn ed_start(&mut self, duration: Duration) -> Result<(), RadioError>;

    /// Enable or disable the receiver.
    fn rx_enable(&mut self, enabled: bool);

    /// Select the logical channel.
    fn set_channel(&mut self, channel: u8) -> Result<(), RadioError>;

    /// Select the channel page.
    fn set_channel_page(&mut self, page: u8) -> Result<(), RadioError>;

    /// Program the PAN ID used for address filtering.
    fn set_pan_id(&mut self, pan_id: u16);

    /// Program the short address used for address filtering.
    fn set_short_address(&mut self, address: u16);

    /// Program the extended address used for address filtering.
    fn set_extended_address(&mut self, address: [u8; 8]);

    /// Put the transceiver to sleep.
    fn sleep(&mut self);

    /// Wake the transceiver up.
    fn wakeup(&mut self);
}

/// A monotonic time source.
pub trait Clock {
    /// Return the current time.
    fn now(&self) -> Instant;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Mutable state shared between a [`TestRadio`] and the test body.
    #[derive(Default)]
    pub struct TestRadioState {
        pub transmitted: Vec<(FrameBuffer, CsmaMode)>,
        pub beacons: Vec<FrameBuffer>,
        pub ed_scans: Vec<Duration>,
        pub channel: u8,
        /// Every channel selected, in order.
        pub channel_history: Vec<u8>,
        pub page: u8,
        pub pan_id: u16,
        pub short_address: u16,
        pub extended_address: [u8; 8],
        pub rx_enabled: bool,
        pub sleeping: bool,
        /// When set, `transmit` rejects the frame.
        pub reject_tx: bool,
        /// When set, `set_channel` rejects the channel.
        pub reject_channel: bool,
    }

    /// A radio double recording every operation the MAC performs.
    #[derive(Clone, Default)]
    pub struct TestRadio {
        pub state: Rc<RefCell<TestRadioState>>,
    }

    impl TestRadio {
        pub fn tx_count(&self) -> usize {
            self.state.borrow().transmitted.len()
        }

        pub fn last_transmitted(&self) -> FrameBuffer {
            self.state.borrow().transmitted.last().unwrap().0.clone()
        }
    }

    impl Radio for TestRadio {
        fn transmit(
            &mut self,
            frame: &FrameBuffer,
            csma: CsmaMode,
            _retries: bool,
        ) -> Result<(), RadioError> {
            let mut state = self.state.borrow_mut();
            if state.reject_tx {
                return Err(RadioError::Busy);
            }
            state.transmitted.push((frame.clone(), csma));
            Ok(())
        }

        fn transmit_beacon(&mut self, frame: &FrameBuffer) -> Result<(), RadioError> {
            self.state.borrow_mut().beacons.push(frame.clone());
            Ok(())
        }

        fn ed_start(&mut self, duration: Duration) -> Result<(), RadioError> {
            self.state.borrow_mut().ed_scans.push(duration);
            Ok(())
        }

        fn rx_enable(&mut self, enabled: bool) {
            self.state.borrow_mut().rx_enabled = enabled;
        }

        fn set_channel(&mut self, channel: u8) -> Result<(), RadioError> {
            let mut state = self.state.borrow_mut();
            if state.reject_channel {
                return Err(RadioError::UnsupportedChannel);
            }
            state.channel = channel;
            state.channel_history.push(channel);
            Ok(())
        }

        fn set_channel_page(&mut self, page: u8) -> Result<(), RadioError> {
            self.state.borrow_mut().page = page;
            Ok(())
        }

        fn set_pan_id(&mut self, pan_id: u16) {
            self.state.borrow_mut().pan_id = pan_id;
        }

        fn set_short_address(&mut self, address: u16) {
            self.state.borrow_mut().short_address = address;
        }

        fn set_extended_address(&mut self, address: [u8; 8]) {
            self.state.borrow_mut().extended_address = address;
        }

        fn sleep(&mut self) {
            self.state.borrow_mut().sleeping = true;
        }

        fn wakeup(&mut self) {
            self.state.borrow_mut().sleeping = false;
        }
    }

    /// A manually advanced clock.
    #[derive(Clone, Default)]
    pub struct TestClock {
        pub now_us: Rc<RefCell<i64>>,
    }

    impl TestClock {
        pub fn advance(&self, duration: Duration) {
            *self.now_us.borrow_mut() += duration.as_us();
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            Instant::from_us(*self.now_us.borrow())
        }
    }
}
