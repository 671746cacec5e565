//! Guaranteed time slot management.
//!
//! The coordinator carves GTS slots from the end of the contention access
//! period and advertises them in its beacons; a device requests slots
//! with the GTS request command and learns the outcome from the beacon
//! descriptors. During the contention-free period a per-slot timer chain
//! advances the superframe state through each occupied slot and fires at
//! most one queued frame transmission per slot.

use heapless::{Deque, Vec};

use crate::frame::{
    Address, BeaconRepr, FrameBuilder, FrameRepr, GtsCharacteristics, GtsCharacteristicsType,
    GtsDescriptor, GtsDirection, GtsFieldsRepr, MacCommand,
};
use crate::mac::constants::*;
use crate::mac::state::{MacState, SuperframeState, SyncState};
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{
    frame_buffer_from, InFlightTx, MacEvent, MacService, QueuedFrame, QueuedKind, UpperLayer,
};
use crate::phy::{frame_duration_symbols, Clock, CsmaMode, Radio, TxStatus};
use crate::time::{Duration, Instant};

/// MLME-GTS.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtsRequest {
    pub characteristics: GtsCharacteristics,
}

/// MLME-GTS.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtsConfirm {
    pub characteristics: GtsCharacteristics,
    pub status: MacStatus,
}

/// MLME-GTS.indication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GtsIndication {
    /// Short address of the device the slot belongs to.
    pub device_address: u16,
    pub characteristics: GtsCharacteristics,
}

/// Allocation state of a device-side GTS entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum GtsEntryState {
    #[default]
    Idle,
    /// The GTS request command went out; awaiting the descriptor in a
    /// beacon.
    ReqSent,
    Allocated,
}

/// A device-side GTS table entry, indexed by slot direction.
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Default)]
pub(crate) struct DeviceGtsEntry {
    pub state: GtsEntryState,
    pub length: u8,
    pub starting_slot: u8,
    /// Beacons left to wait for a descriptor after a request.
    pub wait_beacons: u8,
    /// Frames awaiting the own transmit slot.
    pub tx_queue: Deque<QueuedFrame, MAX_GTS_TRANSACTIONS>,
}

/// A coordinator-side GTS table entry.
#[cfg_attr(feature = "std", derive(Debug))]
pub(crate) struct CoordGtsEntry {
    pub device_short: u16,
    pub direction: GtsDirection,
    pub length: u8,
    /// Zero marks a denied request that is only advertised, never
    /// scheduled.
    pub starting_slot: u8,
    /// Beacons the descriptor remains advertised in.
    pub persistence: u8,
    /// Idle superframes before the slot is reclaimed.
    pub expiry: u16,
    /// Frames awaiting the device's receive slot.
    pub tx_queue: Deque<QueuedFrame, MAX_GTS_TRANSACTIONS>,
}

/// GTS state of the node.
#[derive(Default)]
pub(crate) struct GtsContext {
    /// Device side: slot per direction (transmit, receive).
    pub device: [DeviceGtsEntry; MAX_GTS_ON_DEVICE],
    /// Coordinator side: allocated and advertised slots.
    pub coord: Vec<CoordGtsEntry, MAX_GTS_ON_PAN_COORD>,
    /// Start of the current superframe, set at beacon transmission or
    /// reception.
    pub superframe_start: Instant,
}

fn device_index(direction: GtsDirection) -> usize {
    match direction {
        GtsDirection::Transmit => 0,
        GtsDirection::Receive => 1,
    }
}

fn expiry_superframes(beacon_order: u8) -> u16 {
    // 2*2^(8-BO) superframes for BO 0..=8, two superframes above that.
    if beacon_order <= 8 {
        2 * (1 << (8 - beacon_order as u16))
    } else {
        2
    }
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Request or release a guaranteed time slot. Device side.
    pub(crate) fn mlme_gts_request(&mut self, request: GtsRequest) {
        let characteristics = request.characteristics;

        if self.state != MacState::Associated
            || matches!(self.pib.short_address, NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR)
        {
            self.gts_confirm(characteristics, MacStatus::NoShortAddress);
            return;
        }

        if !self.pib.beacon_enabled() || self.sync_state != SyncState::TrackingBeacon {
            self.gts_confirm(characteristics, MacStatus::InvalidParameter);
            return;
        }

        let index = device_index(characteristics.direction);
        let entry = &self.gts.device[index];

        let valid = match characteristics.characteristics_type {
            GtsCharacteristicsType::Allocate => {
                entry.state == GtsEntryState::Idle
                    && (1..=0x0f).contains(&characteristics.length)
            }
            GtsCharacteristicsType::Deallocate => {
                entry.state == GtsEntryState::Allocated
                    && entry.length == characteristics.length
            }
        };

        if !valid {
            self.gts_confirm(characteristics, MacStatus::InvalidParameter);
            return;
        }

        let sequence_number = self.pib.next_dsn();
        let Ok(repr) = FrameBuilder::new_command(MacCommand::GtsRequest(characteristics))
            .set_sequence_number(sequence_number)
            .set_dst_pan_id(self.pib.pan_id)
            .set_dst_address(Address::from_u16(self.pib.coord_short_address))
            .set_src_pan_id(self.pib.pan_id)
            .set_src_address(Address::from_u16(self.pib.short_address))
            .finalize()
        else {
            self.gts_confirm(characteristics, MacStatus::InvalidParameter);
            return;
        };

        let frame = frame_buffer_from(&repr);
        if self
            .start_transmission(
                &frame,
                CsmaMode::Unslotted,
                true,
                InFlightTx::GtsRequest { characteristics },
            )
            .is_err()
        {
            self.gts_confirm(characteristics, MacStatus::ChannelAccessFailure);
            self.sleep_trans();
        }
    }

    pub(crate) fn gts_confirm(
        &mut self,
        characteristics: GtsCharacteristics,
        status: MacStatus,
    ) {
        self.queue_event(MacEvent::MlmeGtsConfirm(GtsConfirm {
            characteristics,
            status,
        }));
    }

    /// Route the transmission outcome of a GTS request command.
    pub(crate) fn gts_request_done(
        &mut self,
        status: TxStatus,
        characteristics: GtsCharacteristics,
    ) {
        if !status.is_success() {
            self.gts_confirm(characteristics, status.into());
            self.sleep_trans();
            return;
        }

        let entry = &mut self.gts.device[device_index(characteristics.direction)];
        match characteristics.characteristics_type {
            GtsCharacteristicsType::Allocate => {
                entry.state = GtsEntryState::ReqSent;
                entry.length = characteristics.length;
                entry.wait_beacons = GTS_DESC_PERSISTENCE_TIME;
            }
            GtsCharacteristicsType::Deallocate => {
                entry.state = GtsEntryState::Idle;
                entry.starting_slot = 0;
                entry.tx_queue.clear();
                self.gts_confirm(characteristics, MacStatus::Success);
            }
        }

        self.sleep_trans();
    }

    /// Update the device tables from the GTS descriptors of a tracked
    /// beacon.
    pub(crate) fn gts_device_beacon_update(&mut self, beacon: &BeaconRepr, beacon_time: Instant) {
        self.gts.superframe_start = beacon_time;

        let own_short = self.pib.short_address;
        let superframe_order = self.pib.superframe_order;

        let mut seen = [false; MAX_GTS_ON_DEVICE];
        for descriptor in beacon
            .gts
            .descriptors
            .iter()
            .filter(|d| d.short_address == own_short)
        {
            let index = device_index(descriptor.direction);
            seen[index] = true;

            let entry = &mut self.gts.device[index];
            let characteristics = GtsCharacteristics {
                length: descriptor.length,
                direction: descriptor.direction,
                characteristics_type: GtsCharacteristicsType::Allocate,
            };

            match entry.state {
                GtsEntryState::ReqSent => {
                    if descriptor.starting_slot == 0 {
                        entry.state = GtsEntryState::Idle;
                        self.queue_event(MacEvent::MlmeGtsConfirm(GtsConfirm {
                            characteristics,
                            status: MacStatus::Denied,
                        }));
                    } else {
                        entry.state = GtsEntryState::Allocated;
                        entry.starting_slot = descriptor.starting_slot;
                        entry.length = descriptor.length;
                        self.queue_event(MacEvent::MlmeGtsConfirm(GtsConfirm {
                            characteristics,
                            status: MacStatus::Success,
                        }));
                    }
                }
                GtsEntryState::Allocated => {
                    // The coordinator may shift slots around.
                    entry.starting_slot = descriptor.starting_slot;
                }
                GtsEntryState::Idle => {}
            }
        }

        // Count down request windows that got no descriptor.
        let mut timed_out: Vec<GtsCharacteristics, MAX_GTS_ON_DEVICE> = Vec::new();
        for (index, entry) in self.gts.device.iter_mut().enumerate() {
            if entry.state == GtsEntryState::ReqSent && !seen[index] {
                entry.wait_beacons = entry.wait_beacons.saturating_sub(1);
                if entry.wait_beacons == 0 {
                    entry.state = GtsEntryState::Idle;
                    let _ = timed_out.push(GtsCharacteristics {
                        length: entry.length,
                        direction: if index == 0 {
                            GtsDirection::Transmit
                        } else {
                            GtsDirection::Receive
                        },
                        characteristics_type: GtsCharacteristicsType::Allocate,
                    });
                }
            }
        }
        for characteristics in timed_out {
            self.queue_event(MacEvent::MlmeGtsConfirm(GtsConfirm {
                characteristics,
                status: MacStatus::NoData,
            }));
        }

        // Arm the slot timer for the own transmit slot.
        let tx_entry = &self.gts.device[device_index(GtsDirection::Transmit)];
        if tx_entry.state == GtsEntryState::Allocated && !tx_entry.tx_queue.is_empty() {
            let slot = tx_entry.starting_slot;
            let offset = slot_duration_symbols(superframe_order) * slot as u32;
            let deadline = beacon_time + Duration::from_symbols(offset);
            let now = self.clock.now();
            let _ = self.timers.arm_at(Timeout::GtsSlot(slot), now, deadline);
        }
    }

    /// Tear down every device-side slot after a loss of synchronization.
    pub(crate) fn gts_device_teardown(&mut self) {
        let mut torn_down: Vec<GtsCharacteristics, MAX_GTS_ON_DEVICE> = Vec::new();

        for (index, entry) in self.gts.device.iter_mut().enumerate() {
            if entry.state == GtsEntryState::Idle {
                continue;
            }

            let _ = torn_down.push(GtsCharacteristics {
                length: entry.length,
                direction: if index == 0 {
                    GtsDirection::Transmit
                } else {
                    GtsDirection::Receive
                },
                characteristics_type: GtsCharacteristicsType::Deallocate,
            });

            entry.state = GtsEntryState::Idle;
            entry.starting_slot = 0;
            entry.tx_queue.clear();
        }

        for characteristics in torn_down {
            self.queue_event(MacEvent::MlmeGtsIndication(GtsIndication {
                device_address: self.pib.short_address,
                characteristics,
            }));
        }
    }

    /// A GTS request command arrived at the PAN coordinator.
    pub(crate) fn process_gts_request(
        &mut self,
        frame: &FrameRepr,
        characteristics: GtsCharacteristics,
    ) {
        if self.state != MacState::PanCoordStarted || !self.pib.beacon_enabled() {
            return;
        }

        let Some(device_short) = frame.addressing.src_address.and_then(|a| a.as_u16()) else {
            return;
        };

        match characteristics.characteristics_type {
            GtsCharacteristicsType::Allocate => {
                self.gts_allocate(device_short, characteristics)
            }
            GtsCharacteristicsType::Deallocate => {
                self.gts_deallocate(device_short, characteristics.direction, true)
            }
        }
    }

    fn gts_allocate(&mut self, device_short: u16, characteristics: GtsCharacteristics) {
        let duplicate = self.gts.coord.iter().any(|e| {
            e.device_short == device_short && e.direction == characteristics.direction
        });

        let occupied = self.allocated_slot_count() as u32 + characteristics.length as u32;
        let cap_symbols = (NUM_SUPERFRAME_SLOTS.saturating_sub(occupied))
            * slot_duration_symbols(self.pib.superframe_order);

        let grant = self.pib.gts_permit
            && !duplicate
            && !self.gts.coord.is_full()
            && characteristics.length >= 1
            && occupied < NUM_SUPERFRAME_SLOTS
            && cap_symbols >= MIN_CAP_LENGTH;

        let starting_slot = if grant {
            (NUM_SUPERFRAME_SLOTS - occupied) as u8
        } else {
            // A denied request is advertised with starting slot zero so
            // the device learns the outcome.
            0
        };

        let entry = CoordGtsEntry {
            device_short,
            direction: characteristics.direction,
            length: characteristics.length,
            starting_slot,
            persistence: GTS_DESC_PERSISTENCE_TIME,
            expiry: expiry_superframes(self.pib.beacon_order),
            tx_queue: Deque::new(),
        };

        if self.gts.coord.push(entry).is_err() {
            return;
        }

        if grant {
            self.beacon.final_cap_slot = starting_slot - 1;
            self.queue_event(MacEvent::MlmeGtsIndication(GtsIndication {
                device_address: device_short,
                characteristics,
            }));
        }
    }

    fn gts_deallocate(&mut self, device_short: u16, direction: GtsDirection, indicate: bool) {
        let Some(index) = self
            .gts
            .coord
            .iter()
            .position(|e| e.device_short == device_short && e.direction == direction)
        else {
            return;
        };

        let removed = self.gts.coord.remove(index);

        // Close the gap: reassign the remaining slots from the end of the
        // superframe downwards, restoring exactly the removed length to
        // the CAP.
        let mut next_slot = NUM_SUPERFRAME_SLOTS as u8;
        for entry in self.gts.coord.iter_mut().filter(|e| e.starting_slot > 0) {
            next_slot -= entry.length;
            entry.starting_slot = next_slot;
            entry.persistence = entry.persistence.max(1);
        }
        self.beacon.final_cap_slot = next_slot - 1;

        if indicate {
            self.queue_event(MacEvent::MlmeGtsIndication(GtsIndication {
                device_address: removed.device_short,
                characteristics: GtsCharacteristics {
                    length: removed.length,
                    direction: removed.direction,
                    characteristics_type: GtsCharacteristicsType::Deallocate,
                },
            }));
        }
    }

    fn allocated_slot_count(&self) -> u8 {
        self.gts
            .coord
            .iter()
            .filter(|e| e.starting_slot > 0)
            .map(|e| e.length)
            .sum()
    }

    /// Age the coordinator table at each transmitted beacon: descriptors
    /// stop being advertised once their persistence window closed, and
    /// slots nobody used are reclaimed.
    pub(crate) fn gts_table_age(&mut self) {
        let mut expired: Vec<(u16, GtsDirection), MAX_GTS_ON_PAN_COORD> = Vec::new();

        for entry in self.gts.coord.iter_mut() {
            if entry.persistence > 0 {
                entry.persistence -= 1;
            }

            if entry.starting_slot > 0 && entry.expiry > 0 {
                entry.expiry -= 1;
                if entry.expiry == 0 {
                    let _ = expired.push((entry.device_short, entry.direction));
                }
            }
        }

        // Denied descriptors disappear once their advertisement window
        // closed.
        while let Some(index) = self
            .gts
            .coord
            .iter()
            .position(|e| e.starting_slot == 0 && e.persistence == 0)
        {
            self.gts.coord.remove(index);
        }

        for (device_short, direction) in expired {
            self.gts_deallocate(device_short, direction, true);
        }
    }

    /// Refresh the expiry countdown after traffic in a device's slot.
    pub(crate) fn gts_mark_active(&mut self, device_short: u16) {
        let beacon_order = self.pib.beacon_order;
        for entry in self
            .gts
            .coord
            .iter_mut()
            .filter(|e| e.device_short == device_short)
        {
            entry.expiry = expiry_superframes(beacon_order);
        }
    }

    /// Build the GTS beacon fields from the advertised entries.
    pub(crate) fn beacon_gts_fields(&self) -> GtsFieldsRepr {
        let mut fields = GtsFieldsRepr {
            permit: self.pib.gts_permit,
            descriptors: Vec::new(),
        };

        for entry in self.gts.coord.iter().filter(|e| e.persistence > 0) {
            let _ = fields.descriptors.push(GtsDescriptor {
                short_address: entry.device_short,
                starting_slot: entry.starting_slot,
                length: entry.length,
                direction: entry.direction,
            });
        }

        fields
    }

    /// Queue a frame for transmission in a guaranteed slot. Device side
    /// queues into its own transmit slot; the coordinator queues into the
    /// device's receive slot.
    pub(crate) fn gts_queue_frame(
        &mut self,
        queued: QueuedFrame,
    ) -> Result<(), MacStatus> {
        if self.state.is_coordinator() {
            let device_short = queued
                .dst_address
                .as_u16()
                .ok_or(MacStatus::InvalidGts)?;

            let entry = self
                .gts
                .coord
                .iter_mut()
                .find(|e| {
                    e.device_short == device_short
                        && e.direction == GtsDirection::Receive
                        && e.starting_slot > 0
                })
                .ok_or(MacStatus::InvalidGts)?;

            entry
                .tx_queue
                .push_back(queued)
                .map_err(|_| MacStatus::TransactionOverflow)
        } else {
            let entry = &mut self.gts.device[device_index(GtsDirection::Transmit)];
            if entry.state != GtsEntryState::Allocated {
                return Err(MacStatus::InvalidGts);
            }

            entry
                .tx_queue
                .push_back(queued)
                .map_err(|_| MacStatus::TransactionOverflow)
        }
    }

    /// The contention access period ended; enter the contention-free
    /// period.
    pub(crate) fn handle_cap_end(&mut self) {
        let first_cfp_slot = self.beacon.final_cap_slot + 1;
        if first_cfp_slot < NUM_SUPERFRAME_SLOTS as u8 {
            self.handle_gts_slot(first_cfp_slot);
        }
    }

    /// A CFP slot begins: fire at most one queued frame for it and chain
    /// the timer to the next occupied slot.
    pub(crate) fn handle_gts_slot(&mut self, slot: u8) {
        self.superframe_state = SuperframeState::Cfp(slot);

        if self.state.is_coordinator() {
            self.coord_slot_start(slot);
            self.arm_next_coord_slot(slot);
        } else {
            self.device_slot_start(slot);
        }
    }

    fn coord_slot_start(&mut self, slot: u8) {
        let Some(index) = self
            .gts
            .coord
            .iter()
            .position(|e| e.starting_slot == slot && e.starting_slot > 0)
        else {
            return;
        };

        match self.gts.coord[index].direction {
            GtsDirection::Transmit => {
                // The device transmits; make sure we listen.
                self.trx_wakeup();
                self.radio.rx_enable(true);
            }
            GtsDirection::Receive => {
                self.gts_tx_from_queue(true, index);
            }
        }
    }

    fn arm_next_coord_slot(&mut self, slot: u8) {
        let Some(next_slot) = self
            .gts
            .coord
            .iter()
            .filter(|e| e.starting_slot > slot)
            .map(|e| e.starting_slot)
            .min()
        else {
            return;
        };

        let offset = slot_duration_symbols(self.pib.superframe_order) * next_slot as u32;
        let deadline = self.gts.superframe_start + Duration::from_symbols(offset);
        let now = self.clock.now();
        let _ = self
            .timers
            .arm_at(Timeout::GtsSlot(next_slot), now, deadline);
    }

    fn device_slot_start(&mut self, slot: u8) {
        let index = device_index(GtsDirection::Transmit);
        if self.gts.device[index].state == GtsEntryState::Allocated
            && self.gts.device[index].starting_slot == slot
        {
            self.gts_tx_from_queue(false, index);
        }
    }

    /// Transmit the first queued frame of a slot, when it fits.
    fn gts_tx_from_queue(&mut self, coordinator: bool, index: usize) {
        if self.in_flight.is_some() {
            return;
        }

        let superframe_order = self.pib.superframe_order;

        let (queue, slot_length) = if coordinator {
            let entry = &mut self.gts.coord[index];
            (&mut entry.tx_queue, entry.length)
        } else {
            let entry = &mut self.gts.device[index];
            (&mut entry.tx_queue, entry.length)
        };

        let Some(front) = queue.front_mut() else {
            return;
        };

        // The frame must fit the remaining slot time.
        let slot_symbols = slot_duration_symbols(superframe_order) * slot_length as u32;
        if frame_duration_symbols(front.buffer.mpdu_len()) > slot_symbols {
            let kind = front.kind;
            queue.pop_front();
            if let QueuedKind::Data { handle } = kind {
                self.data_confirm(handle, MacStatus::FrameTooLong);
            }
            return;
        }

        front.in_transit = true;
        let frame = front.buffer.clone();
        let tag = InFlightTx::GtsData {
            coordinator,
            index: index as u8,
        };

        if self
            .start_transmission(&frame, CsmaMode::NoCsmaNoIfs, false, tag)
            .is_err()
        {
            let queue = if coordinator {
                &mut self.gts.coord[index].tx_queue
            } else {
                &mut self.gts.device[index].tx_queue
            };
            if let Some(front) = queue.front_mut() {
                front.in_transit = false;
            }
        }
    }

    /// Route the transmission outcome of a frame sent in a guaranteed
    /// slot.
    pub(crate) fn gts_data_done(&mut self, status: TxStatus, coordinator: bool, index: usize) {
        let queue = if coordinator {
            match self.gts.coord.get_mut(index) {
                Some(entry) => &mut entry.tx_queue,
                None => return,
            }
        } else {
            &mut self.gts.device[index].tx_queue
        };

        let Some(front) = queue.front_mut() else {
            return;
        };

        front.in_transit = false;
        if status.is_success() {
            let kind = front.kind;
            queue.pop_front();
            if let QueuedKind::Data { handle } = kind {
                self.data_confirm(handle, status.into());
            }
        }

        self.sleep_trans();
    }
}
