//! The indirect transmission mailbox.
//!
//! A coordinator holds frames here until the destination polls for them
//! with a data request command. Entries stay queued while in transit; the
//! transmission outcome router removes them only on a terminal success
//! status, so a failed delivery is retried at the next poll.

use heapless::Vec;

use crate::frame::{Address, FrameBuilder, FrameControl, FrameRepr};
use crate::mac::constants::*;
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{
    frame_buffer_from, InFlightTx, MacService, QueuedFrame, QueuedKind, UpperLayer,
};
use crate::phy::{Clock, CsmaMode, Radio};

/// The queue of frames awaiting an indirect transmission.
#[derive(Default)]
pub(crate) struct IndirectQueue {
    entries: Vec<QueuedFrame, MAX_INDIRECT_TRANSACTIONS>,
}

impl IndirectQueue {
    /// Append a frame, in FIFO order.
    pub fn append(&mut self, frame: QueuedFrame) -> Result<(), ()> {
        self.entries.push(frame).map_err(|_| ())
    }

    /// Find the first frame for a destination that is not already in
    /// transit. `skip` frames matching the same destination are passed
    /// over, allowing a look-ahead for a second pending frame.
    pub fn find(&self, dst_pan_id: u16, dst_address: &Address, skip: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                !e.in_transit && e.dst_pan_id == dst_pan_id && e.dst_address == *dst_address
            })
            .map(|(index, _)| index)
            .nth(skip)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut QueuedFrame> {
        self.entries.get_mut(index)
    }

    /// Remove and return the entry currently marked in transit.
    pub fn take_in_transit(&mut self) -> Option<QueuedFrame> {
        let index = self.entries.iter().position(|e| e.in_transit)?;
        Some(self.entries.remove(index))
    }

    /// Clear the in-transit mark after a failed transmission.
    pub fn clear_in_transit(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.in_transit = false;
        }
    }

    /// Remove a queued data frame by its MSDU handle. In-transit frames
    /// cannot be purged.
    pub fn purge(&mut self, msdu_handle: u8) -> bool {
        let index = self.entries.iter().position(|e| {
            !e.in_transit && e.kind == QueuedKind::Data { handle: msdu_handle }
        });

        match index {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Age every entry by one persistence period, removing and returning
    /// the expired ones.
    pub fn age(&mut self) -> Vec<QueuedFrame, MAX_INDIRECT_TRANSACTIONS> {
        let mut expired = Vec::new();

        let mut index = 0;
        while index < self.entries.len() {
            let entry = &mut self.entries[index];
            entry.lifetime = entry.lifetime.saturating_sub(1);
            if entry.lifetime == 0 && !entry.in_transit {
                let _ = expired.push(self.entries.remove(index));
            } else {
                index += 1;
            }
        }

        expired
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// The destinations to advertise in the beacon pending address list.
    pub fn pending_addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter().map(|e| &e.dst_address)
    }
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Queue a frame for indirect transmission and make sure the
    /// persistence timer ages it.
    pub(crate) fn indirect_queue_frame(&mut self, frame: QueuedFrame) -> Result<(), ()> {
        self.indirect.append(frame)?;

        if !self.timers.is_armed(Timeout::DataPersistence) {
            let now = self.clock.now();
            self.timers
                .arm_after(Timeout::DataPersistence, now, PERSISTENCE_CHECK_INTERVAL);
        }

        Ok(())
    }

    /// A data request command arrived: serve the first pending frame for
    /// the requester, or answer with a null data frame.
    pub(crate) fn process_data_request(&mut self, frame: &FrameRepr) {
        if !self.state.is_coordinator() {
            debug!("ignoring data request, not a coordinator");
            return;
        }

        let Some(requester) = frame.addressing.src_address else {
            return;
        };

        // The source PAN ID of the request must match the destination
        // PAN ID of the pending frame.
        let requester_pan_id = frame
            .addressing
            .src_pan_id
            .or(frame.addressing.dst_pan_id)
            .unwrap_or(BROADCAST_PAN_ID);

        let Some(index) = self.indirect.find(requester_pan_id, &requester, 0) else {
            self.tx_null_data_frame(requester_pan_id, requester);
            return;
        };

        // A second matching frame sets the frame pending bit of the one
        // going out now.
        let more_pending = self.indirect.find(requester_pan_id, &requester, 1).is_some();

        let entry = match self.indirect.get_mut(index) {
            Some(entry) => entry,
            None => return,
        };

        entry.in_transit = true;
        if more_pending {
            let mut fc = FrameControl::new_unchecked(&mut entry.buffer.data[1..3]);
            fc.set_frame_pending(true);
        }

        let buffer = entry.buffer.clone();

        // Transmitted without CSMA, quickly after the acknowledgment of
        // the data request.
        if self
            .start_transmission(
                &buffer,
                CsmaMode::NoCsmaWithIfs,
                false,
                InFlightTx::IndirectTransaction,
            )
            .is_err()
        {
            // Too close to the next beacon; the frame stays queued for
            // the next poll.
            self.indirect.clear_in_transit();
        }
    }

    /// Answer an empty poll with a null data frame so the requester's
    /// receiver can stop waiting.
    pub(crate) fn tx_null_data_frame(&mut self, dst_pan_id: u16, dst_address: Address) {
        let src_address = match self.pib.short_address {
            NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR => match self.pib.extended_address {
                Some(extended) => Address::Extended(extended),
                None => return,
            },
            short => Address::from_u16(short),
        };

        let sequence_number = self.pib.next_dsn();
        let Ok(repr) = FrameBuilder::new_data(&[])
            .set_sequence_number(sequence_number)
            .set_dst_pan_id(dst_pan_id)
            .set_dst_address(dst_address)
            .set_src_pan_id(self.pib.pan_id)
            .set_src_address(src_address)
            .set_ack_request(false)
            .finalize()
        else {
            return;
        };

        let frame = frame_buffer_from(&repr);
        if self
            .start_transmission(&frame, CsmaMode::NoCsmaWithIfs, false, InFlightTx::NullFrame)
            .is_err()
        {
            self.sleep_trans();
        }
    }

    /// The persistence period elapsed; age the queue and expire stale
    /// transactions.
    pub(crate) fn handle_persistence_timeout(&mut self) {
        let expired = self.indirect.age();

        for entry in expired {
            match entry.kind {
                QueuedKind::Data { handle } => {
                    self.data_confirm(handle, MacStatus::TransactionExpired);
                }
                QueuedKind::AssociationResponse | QueuedKind::Disassociation => {
                    let own = match self.pib.extended_address {
                        Some(extended) => Address::Extended(extended),
                        None => Address::Absent,
                    };
                    self.comm_status(
                        entry.dst_pan_id,
                        own,
                        entry.dst_address,
                        MacStatus::TransactionExpired,
                    );
                }
            }
        }

        if !self.indirect.is_empty() {
            let now = self.clock.now();
            self.timers
                .arm_after(Timeout::DataPersistence, now, PERSISTENCE_CHECK_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::FrameBuffer;

    fn entry(dst: Address, handle: u8) -> QueuedFrame {
        QueuedFrame {
            buffer: FrameBuffer::default(),
            kind: QueuedKind::Data { handle },
            dst_pan_id: 0x1234,
            dst_address: dst,
            in_transit: false,
            lifetime: 2,
        }
    }

    #[test]
    fn find_skips_in_transit() {
        let mut queue = IndirectQueue::default();
        let dst = Address::from_u16(0x0002);

        queue.append(entry(dst, 1)).unwrap();
        queue.append(entry(dst, 2)).unwrap();

        assert_eq!(queue.find(0x1234, &dst, 0), Some(0));
        assert_eq!(queue.find(0x1234, &dst, 1), Some(1));
        assert_eq!(queue.find(0x1234, &dst, 2), None);

        queue.get_mut(0).unwrap().in_transit = true;
        assert_eq!(queue.find(0x1234, &dst, 0), Some(1));

        // Wrong PAN ID never matches.
        assert_eq!(queue.find(0x4321, &dst, 0), None);
    }

    #[test]
    fn take_in_transit_removes_exactly_one() {
        let mut queue = IndirectQueue::default();
        let dst = Address::from_u16(0x0002);

        queue.append(entry(dst, 1)).unwrap();
        queue.append(entry(dst, 2)).unwrap();
        queue.get_mut(1).unwrap().in_transit = true;

        let taken = queue.take_in_transit().unwrap();
        assert_eq!(taken.kind, QueuedKind::Data { handle: 2 });
        assert!(queue.take_in_transit().is_none());
        assert_eq!(queue.find(0x1234, &dst, 0), Some(0));
    }

    #[test]
    fn purge_by_handle() {
        let mut queue = IndirectQueue::default();
        let dst = Address::from_u16(0x0002);

        queue.append(entry(dst, 7)).unwrap();
        assert!(!queue.purge(8));
        assert!(queue.purge(7));
        assert!(queue.is_empty());
    }

    #[test]
    fn aging_expires_entries() {
        let mut queue = IndirectQueue::default();
        let dst = Address::from_u16(0x0002);

        queue.append(entry(dst, 1)).unwrap();
        assert!(queue.age().is_empty());
        let expired = queue.age();
        assert_eq!(expired.len(), 1);
        assert!(queue.is_empty());
    }
}
