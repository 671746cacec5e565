//! The beacon engine: building, scheduling and retransmitting beacons,
//! and superframe timing.

use heapless::{Deque, Vec};

use crate::frame::{
    Address, BeaconOrder, BeaconRepr, FrameBuilder, FrameRepr, PendingAddressRepr,
    SuperframeOrder, SuperframeSpecificationRepr, MAX_BEACON_PAYLOAD_LEN,
};
use crate::mac::constants::*;
use crate::mac::mlme::scan::PanDescriptor;
use crate::mac::state::{ScanState, SuperframeState};
use crate::mac::timers::Timeout;
use crate::mac::{frame_buffer_from, InFlightTx, MacService, QueuedFrame, QueuedKind, UpperLayer};
use crate::phy::{Clock, CsmaMode, FrameBuffer, Radio};
use crate::time::Duration;

/// MLME-BEACON-NOTIFY.indication parameters.
#[derive(Debug, Clone)]
pub struct BeaconNotifyIndication {
    pub bsn: u8,
    pub pan_descriptor: PanDescriptor,
    pub pending_addresses: PendingAddressRepr,
    pub payload: Vec<u8, MAX_BEACON_PAYLOAD_LEN>,
}

/// State of the beacon engine.
pub(crate) struct BeaconContext {
    /// The prepared beacon, handed to the radio when the beacon timer
    /// fires.
    pub frame: FrameBuffer,
    /// The last superframe slot of the contention access period.
    pub final_cap_slot: u8,
    /// Frames awaiting the next beacon-synchronized broadcast slot.
    pub broadcast_queue: Deque<QueuedFrame, MAX_BROADCAST_TRANSACTIONS>,
}

impl Default for BeaconContext {
    fn default() -> Self {
        Self {
            frame: FrameBuffer::default(),
            final_cap_slot: FINAL_CAP_SLOT_DEFAULT,
            broadcast_queue: Deque::new(),
        }
    }
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Build the beacon frame for the next beacon transmission.
    pub(crate) fn prepare_beacon(&mut self) {
        let beacon_order = self.pib.beacon_order;
        let superframe_order = self.pib.superframe_order;

        let mut pending_addresses = PendingAddressRepr::default();
        for address in self.indirect.pending_addresses() {
            match address {
                Address::Short(raw) => {
                    let short = u16::from_be_bytes(*raw);
                    if !pending_addresses.short_addresses.contains(&short) {
                        let _ = pending_addresses.short_addresses.push(short);
                    }
                }
                Address::Extended(extended) => {
                    if !pending_addresses.extended_addresses.contains(extended) {
                        let _ = pending_addresses.extended_addresses.push(*extended);
                    }
                }
                Address::Absent => {}
            }
        }

        let beacon = BeaconRepr {
            superframe_spec: SuperframeSpecificationRepr {
                beacon_order: BeaconOrder::from(beacon_order),
                superframe_order: SuperframeOrder::from(superframe_order),
                final_cap_slot: self.beacon.final_cap_slot,
                battery_life_extension: self.pib.battery_life_extension,
                pan_coordinator: self.pib.pan_coordinator,
                association_permit: self.pib.association_permit,
            },
            gts: self.beacon_gts_fields(),
            pending_addresses,
            payload: self.pib.beacon_payload.clone(),
        };

        let src_address = match self.pib.short_address {
            NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR => match self.pib.extended_address {
                Some(extended) => Address::Extended(extended),
                None => return,
            },
            short => Address::from_u16(short),
        };

        let sequence_number = self.pib.next_bsn();
        let Ok(repr) = FrameBuilder::new_beacon(beacon)
            .set_sequence_number(sequence_number)
            .set_src_pan_id(self.pib.pan_id)
            .set_src_address(src_address)
            .set_frame_pending(!self.beacon.broadcast_queue.is_empty())
            .finalize()
        else {
            return;
        };

        self.beacon.frame = frame_buffer_from(&repr);
    }

    /// Begin beacon-enabled operation: the first beacon is transmitted
    /// right away and the timer chain keeps the interval from then on.
    pub(crate) fn start_beacon_timer(&mut self) {
        self.prepare_beacon();

        // The beacon timer computes the next transmission from the time
        // of the previous beacon; pretend one was transmitted an interval
        // ago so the chain starts now.
        let interval =
            Duration::from_symbols(beacon_interval_symbols(self.pib.beacon_order));
        self.pib.beacon_tx_time = self.clock.now() - interval;

        self.handle_beacon_timer();
    }

    /// The beacon interval elapsed: hand the prepared beacon to the radio
    /// and immediately schedule the next interval.
    pub(crate) fn handle_beacon_timer(&mut self) {
        if !self.pib.beacon_enabled() {
            // The network transitioned to nonbeacon-enabled operation;
            // the timer chain stops here.
            return;
        }

        self.trx_wakeup();

        // While scanning, the beacon slot stays silent but the timing
        // chain continues.
        if self.scan_state == ScanState::Idle {
            if self.radio.transmit_beacon(&self.beacon.frame).is_err() {
                warn!("radio rejected beacon transmission");
            }
            self.gts_table_age();
        }

        let interval =
            Duration::from_symbols(beacon_interval_symbols(self.pib.beacon_order));
        let now = self.clock.now();

        // Absolute-time arithmetic: add beacon intervals to the previous
        // transmission time until a timer in the future can be armed.
        let mut next_beacon = self.pib.beacon_tx_time + interval;
        loop {
            next_beacon = next_beacon + interval;
            if self.timers.arm_at(Timeout::Beacon, now, next_beacon).is_ok() {
                break;
            }
        }

        self.pib.beacon_tx_time = next_beacon - interval;
        self.gts.superframe_start = self.pib.beacon_tx_time;
        self.superframe_state = SuperframeState::Cap;

        // The preparation timer leads the next beacon by a fixed margin.
        let mut next_prep = next_beacon - Duration::from_symbols(BEACON_PREP_TIME);
        while self
            .timers
            .arm_at(Timeout::BeaconPreparation, now, next_prep)
            .is_err()
        {
            next_prep = next_prep + interval;
        }

        // The superframe-end timer exists only with an inactive portion.
        if self.pib.superframe_order < self.pib.beacon_order {
            let duration = superframe_duration_symbols(self.pib.superframe_order);
            self.timers.arm_after(
                Timeout::SuperframeEnd,
                now,
                Duration::from_symbols(duration),
            );
        }

        // With GTS slots allocated, the CFP begins at the end of the CAP.
        if self.beacon.final_cap_slot < FINAL_CAP_SLOT_DEFAULT
            && self.pib.superframe_order < NON_BEACON_ORDER
        {
            let cap_symbols = slot_duration_symbols(self.pib.superframe_order)
                * (self.beacon.final_cap_slot as u32 + 1);
            self.timers
                .arm_after(Timeout::CapEnd, now, Duration::from_symbols(cap_symbols));
        } else {
            self.timers.stop(Timeout::CapEnd);
        }

        // Exactly one pending broadcast frame follows each beacon.
        if self.scan_state == ScanState::Idle {
            self.tx_pending_broadcast_data();
        }
    }

    /// The preparation lead time was reached; rebuild the beacon content
    /// for the upcoming transmission.
    pub(crate) fn handle_beacon_preparation_timer(&mut self) {
        self.trx_wakeup();
        self.prepare_beacon();
    }

    /// The active portion of the superframe ended.
    pub(crate) fn handle_superframe_end(&mut self) {
        self.superframe_state = SuperframeState::Inactive;
        self.sleep_trans();
    }

    /// Transmit one frame from the broadcast queue, right after the
    /// beacon announcing it.
    fn tx_pending_broadcast_data(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        let Some(queued) = self.beacon.broadcast_queue.pop_front() else {
            return;
        };

        let QueuedKind::Data { handle } = queued.kind else {
            return;
        };

        if self
            .start_transmission(
                &queued.buffer,
                CsmaMode::NoCsmaWithIfs,
                false,
                InFlightTx::BroadcastData { handle },
            )
            .is_err()
        {
            // Give the frame back; it goes out after the next beacon.
            let _ = self.beacon.broadcast_queue.push_front(queued);
        }
    }

    /// A beacon request command arrived: a coordinator in a
    /// nonbeacon-enabled network answers with an on-demand beacon.
    pub(crate) fn process_beacon_request(&mut self, _frame: &FrameRepr) {
        if !self.state.is_coordinator() || self.pib.beacon_enabled() {
            return;
        }

        if self.in_flight.is_some() {
            return;
        }

        self.prepare_beacon();
        let frame = self.beacon.frame.clone();
        if self
            .start_transmission(&frame, CsmaMode::Unslotted, false, InFlightTx::Beacon)
            .is_err()
        {
            self.sleep_trans();
        }
    }
}
