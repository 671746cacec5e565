//! Beacon synchronization and tracking.

use crate::frame::{
    Address, BeaconOrder, CoordinatorRealignment, FrameBuilder, FramePayloadRepr, FrameRepr,
    MacCommand, SuperframeOrder,
};
use crate::mac::constants::*;
use crate::mac::state::{MacState, PollState, ScanState, SuperframeState, SyncState};
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{frame_buffer_from, InFlightTx, MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, CsmaMode, Radio};
use crate::time::Duration;

/// MLME-SYNC.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub channel: u8,
    pub channel_page: u8,
    /// Whether to keep tracking beacons after the first one.
    pub track_beacon: bool,
}

/// MLME-SYNC-LOSS.indication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLossIndication {
    pub loss_reason: MacStatus,
    pub pan_id: u16,
    pub channel: u8,
    pub channel_page: u8,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Synchronize with the beacons of the coordinator.
    pub(crate) fn mlme_sync_request(&mut self, request: SyncRequest) {
        if !self.pib.beacon_enabled() {
            // There is nothing to synchronize with on a
            // nonbeacon-enabled PAN.
            self.sync_loss(MacStatus::BeaconLoss);
            return;
        }

        self.trx_wakeup();
        if self.radio.set_channel(request.channel).is_err()
            || self.radio.set_channel_page(request.channel_page).is_err()
        {
            self.sync_loss(MacStatus::BeaconLoss);
            return;
        }
        self.pib.current_channel = request.channel;
        self.pib.current_page = request.channel_page;

        self.sync_state = if request.track_beacon {
            SyncState::TrackingBeacon
        } else {
            SyncState::Once
        };

        self.radio.rx_enable(true);
        self.arm_missed_beacon_timer();
    }

    fn arm_missed_beacon_timer(&mut self) {
        let interval = beacon_interval_symbols(self.pib.beacon_order);
        let now = self.clock.now();
        self.timers.arm_after(
            Timeout::MissedBeacon,
            now,
            Duration::from_symbols(interval * MAX_LOST_BEACONS),
        );
    }

    /// Too many beacons were missed in a row.
    pub(crate) fn handle_missed_beacon(&mut self) {
        self.sync_loss(MacStatus::BeaconLoss);
    }

    /// Declare the synchronization lost: tear down device GTS state and
    /// tell the next higher layer why.
    pub(crate) fn sync_loss(&mut self, loss_reason: MacStatus) {
        self.sync_state = SyncState::Never;
        self.timers.stop(Timeout::MissedBeacon);

        self.gts_device_teardown();

        self.queue_event(MacEvent::MlmeSyncLossIndication(SyncLossIndication {
            loss_reason,
            pan_id: self.pib.pan_id,
            channel: self.pib.current_channel,
            channel_page: self.pib.current_page,
        }));

        self.sleep_trans();
    }

    /// A beacon frame arrived.
    pub(crate) fn process_beacon_frame(&mut self, frame: &FrameRepr, lqi: u8) {
        if self.scan_state != ScanState::Idle {
            self.scan_record_beacon(frame, lqi);
            return;
        }

        let FramePayloadRepr::Beacon(beacon) = &frame.payload else {
            return;
        };

        // A second coordinator claiming our PAN ID is a conflict. The
        // PAN coordinator handles it locally; a device notifies its
        // coordinator first.
        if frame.addressing.src_pan_id == Some(self.pib.pan_id)
            && self.detect_pan_id_conflict(frame)
        {
            return;
        }

        if !self.beacon_from_coordinator(frame) {
            return;
        }

        if self.sync_state == SyncState::Never {
            return;
        }

        // Adopt the coordinator's superframe configuration and restart
        // the tracking window.
        self.pib.beacon_order = u8::from(beacon.superframe_spec.beacon_order);
        self.pib.superframe_order = u8::from(beacon.superframe_spec.superframe_order);
        self.superframe_state = SuperframeState::Cap;

        match self.sync_state {
            SyncState::Once => self.sync_state = SyncState::Never,
            SyncState::TrackingBeacon | SyncState::BeforeAssoc => {
                if matches!(
                    beacon.superframe_spec.beacon_order,
                    BeaconOrder::Order(_)
                ) {
                    self.arm_missed_beacon_timer();
                }
            }
            SyncState::Never => {}
        }

        let beacon_time = self.clock.now();
        self.gts_device_beacon_update(beacon, beacon_time);

        // The inactive portion lets the radio rest until the next
        // beacon.
        if let (SuperframeOrder::Order(so), BeaconOrder::Order(bo)) = (
            beacon.superframe_spec.superframe_order,
            beacon.superframe_spec.beacon_order,
        ) {
            if so < bo {
                let duration = superframe_duration_symbols(so);
                self.timers.arm_after(
                    Timeout::SuperframeEnd,
                    beacon_time,
                    Duration::from_symbols(duration),
                );
            }
        }

        // A pending-address match triggers an automatic poll.
        let own_listed = self.own_address_pending(frame);
        if own_listed
            && self.pib.auto_request
            && self.poll_state == PollState::Idle
            && self.in_flight.is_none()
        {
            let dst = frame
                .addressing
                .src_address
                .map(|address| (self.pib.pan_id, address));
            if self.build_and_tx_data_req(false, false, dst).is_err() {
                // Recovered locally; the radio goes back to sleep.
                self.sleep_trans();
            }
        }

        if !beacon.payload.is_empty() {
            let descriptor = crate::mac::mlme::scan::PanDescriptor {
                coord_pan_id: frame.addressing.src_pan_id.unwrap_or(self.pib.pan_id),
                coord_address: frame.addressing.src_address.unwrap_or(Address::Absent),
                channel: self.pib.current_channel,
                page: self.pib.current_page,
                superframe_spec: beacon.superframe_spec,
                gts_permit: beacon.gts.permit,
                link_quality: lqi,
            };

            self.queue_event(MacEvent::MlmeBeaconNotifyIndication(
                crate::mac::beacon::BeaconNotifyIndication {
                    bsn: frame.sequence_number,
                    pan_descriptor: descriptor,
                    pending_addresses: beacon.pending_addresses.clone(),
                    payload: beacon.payload.clone(),
                },
            ));
        }
    }

    fn beacon_from_coordinator(&self, frame: &FrameRepr) -> bool {
        if frame.addressing.src_pan_id != Some(self.pib.pan_id) {
            return false;
        }

        match frame.addressing.src_address {
            Some(Address::Short(_)) => {
                frame.addressing.src_address.and_then(|a| a.as_u16())
                    == Some(self.pib.coord_short_address)
            }
            Some(Address::Extended(extended)) => {
                self.pib.coord_extended_address == Some(extended)
            }
            _ => false,
        }
    }

    fn own_address_pending(&self, frame: &FrameRepr) -> bool {
        let FramePayloadRepr::Beacon(beacon) = &frame.payload else {
            return false;
        };

        let short = Address::from_u16(self.pib.short_address);
        if !matches!(self.pib.short_address, NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR)
            && beacon.pending_addresses.contains(&short)
        {
            return true;
        }

        self.pib
            .extended_address
            .map(Address::Extended)
            .is_some_and(|extended| beacon.pending_addresses.contains(&extended))
    }

    /// Check a beacon for a PAN ID conflict. Returns `true` when the
    /// beacon was consumed by conflict handling.
    fn detect_pan_id_conflict(&mut self, frame: &FrameRepr) -> bool {
        let FramePayloadRepr::Beacon(beacon) = &frame.payload else {
            return false;
        };

        if !beacon.superframe_spec.pan_coordinator {
            return false;
        }

        match self.state {
            MacState::PanCoordStarted => {
                // Another PAN coordinator on our PAN ID; we only hear it,
                // the devices report it.
                self.sync_loss(MacStatus::PanIdConflict);
                true
            }
            MacState::Associated if self.pib.associated_pan_coord => {
                if self.beacon_from_coordinator(frame) {
                    return false;
                }
                self.tx_pan_id_conflict_notification();
                true
            }
            _ => false,
        }
    }

    /// Notify the own PAN coordinator of a PAN ID conflict; the sync loss
    /// indication follows once the notification went out.
    fn tx_pan_id_conflict_notification(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        let Some(own_extended) = self.pib.extended_address else {
            return;
        };
        let Some(coord_extended) = self.pib.coord_extended_address else {
            return;
        };

        let sequence_number = self.pib.next_dsn();
        let Ok(repr) = FrameBuilder::new_command(MacCommand::PanIdConflictNotification)
            .set_sequence_number(sequence_number)
            .set_dst_pan_id(self.pib.pan_id)
            .set_dst_address(Address::Extended(coord_extended))
            .set_src_pan_id(self.pib.pan_id)
            .set_src_address(Address::Extended(own_extended))
            .finalize()
        else {
            return;
        };

        let frame = frame_buffer_from(&repr);
        if self
            .start_transmission(&frame, CsmaMode::Unslotted, true, InFlightTx::PanIdConflict)
            .is_err()
        {
            self.sleep_trans();
        }
    }

    /// A PAN ID conflict notification command arrived at the PAN
    /// coordinator.
    pub(crate) fn process_pan_id_conflict(&mut self, _frame: &FrameRepr) {
        if self.state != MacState::PanCoordStarted {
            return;
        }

        self.sync_loss(MacStatus::PanIdConflict);
    }

    /// A coordinator realignment command arrived outside an orphan scan:
    /// the PAN is being reconfigured.
    pub(crate) fn process_coord_realignment(&mut self, realignment: &CoordinatorRealignment) {
        self.pib.pan_id = realignment.pan_id;
        self.radio.set_pan_id(realignment.pan_id);
        self.pib.coord_short_address = realignment.coord_short_address;
        if self.radio.set_channel(realignment.channel).is_ok() {
            self.pib.current_channel = realignment.channel;
        }
        if let Some(page) = realignment.channel_page {
            if self.radio.set_channel_page(page).is_ok() {
                self.pib.current_page = page;
            }
        }

        self.queue_event(MacEvent::MlmeSyncLossIndication(SyncLossIndication {
            loss_reason: MacStatus::Realignment,
            pan_id: self.pib.pan_id,
            channel: self.pib.current_channel,
            channel_page: self.pib.current_page,
        }));
    }
}
