//! The channel scan engine.
//!
//! One scan at a time iterates the requested channels from lowest to
//! highest. The per-channel work depends on the scan type: sample energy,
//! probe with a beacon request, listen, or probe with an orphan
//! notification. Completion of the per-channel step re-enters
//! [`scan_proceed`] until every requested channel was visited or an early
//! termination rule applies.
//!
//! [`scan_proceed`]: MacService::scan_proceed

use heapless::Vec;

use crate::frame::{
    Address, CoordinatorRealignment, FrameBuilder, FrameRepr, MacCommand,
    SuperframeSpecificationRepr,
};
use crate::mac::constants::*;
use crate::mac::state::ScanState;
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{frame_buffer_from, InFlightTx, MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};
use crate::time::Duration;

/// The type of a channel scan.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Ed,
    Active,
    Passive,
    Orphan,
}

/// MLME-SCAN.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// Bitmap of the logical channels to scan.
    pub scan_channels: u32,
    /// Per-channel duration exponent.
    pub scan_duration: u8,
    pub channel_page: u8,
}

/// Record of a discovered coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanDescriptor {
    pub coord_pan_id: u16,
    pub coord_address: Address,
    pub channel: u8,
    pub page: u8,
    pub superframe_spec: SuperframeSpecificationRepr,
    pub gts_permit: bool,
    pub link_quality: u8,
}

/// MLME-SCAN.confirm parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfirm {
    pub status: MacStatus,
    pub scan_type: ScanType,
    pub channel_page: u8,
    /// Channels requested but never visited; the caller can resume with
    /// this mask.
    pub unscanned_channels: u32,
    pub ed_levels: Vec<u8, MAX_ED_LEVELS>,
    pub pan_descriptors: Vec<PanDescriptor, MAX_PAN_DESCRIPTORS>,
}

/// Working state of the scan engine.
pub(crate) struct ScanContext {
    pub scan_type: ScanType,
    pub duration: u8,
    pub page: u8,
    pub current_channel: u8,
    pub unscanned: u32,
    /// The PAN ID to restore after an active or passive scan.
    pub saved_pan_id: u16,
    pub ed_levels: Vec<u8, MAX_ED_LEVELS>,
    pub descriptors: Vec<PanDescriptor, MAX_PAN_DESCRIPTORS>,
    pub realignment_received: bool,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Scan a set of channels.
    pub(crate) fn mlme_scan_request(&mut self, request: ScanRequest) {
        if self.scan_state != ScanState::Idle {
            self.queue_event(MacEvent::MlmeScanConfirm(ScanConfirm {
                status: MacStatus::ScanInProgress,
                scan_type: request.scan_type,
                channel_page: request.channel_page,
                unscanned_channels: request.scan_channels & ALL_CHANNELS_MASK,
                ed_levels: Vec::new(),
                pan_descriptors: Vec::new(),
            }));
            return;
        }

        self.trx_wakeup();

        let saved_pan_id = self.pib.pan_id;
        if matches!(request.scan_type, ScanType::Active | ScanType::Passive) {
            // All beacons are accepted regardless of the current PAN
            // while the scan runs.
            self.pib.pan_id = BROADCAST_PAN_ID;
            self.radio.set_pan_id(BROADCAST_PAN_ID);
        }

        if self.radio.set_channel_page(request.channel_page).is_err() {
            self.pib.pan_id = saved_pan_id;
            self.radio.set_pan_id(saved_pan_id);
            self.queue_event(MacEvent::MlmeScanConfirm(ScanConfirm {
                status: MacStatus::InvalidParameter,
                scan_type: request.scan_type,
                channel_page: request.channel_page,
                unscanned_channels: request.scan_channels & ALL_CHANNELS_MASK,
                ed_levels: Vec::new(),
                pan_descriptors: Vec::new(),
            }));
            return;
        }

        self.scan = Some(ScanContext {
            scan_type: request.scan_type,
            duration: request.scan_duration,
            page: request.channel_page,
            current_channel: MIN_CHANNEL,
            unscanned: request.scan_channels & ALL_CHANNELS_MASK,
            saved_pan_id,
            ed_levels: Vec::new(),
            descriptors: Vec::new(),
            realignment_received: false,
        });

        self.scan_proceed();
    }

    /// Advance to the next requested channel, or finish the scan once
    /// every channel was visited or an early termination rule applies.
    pub(crate) fn scan_proceed(&mut self) {
        loop {
            let Some(scan) = self.scan.as_mut() else {
                return;
            };

            if scan.current_channel > MAX_CHANNEL {
                break;
            }

            // Active and passive scans stop early once the descriptor
            // storage is exhausted, so the caller gets the correct set of
            // unscanned channels back and can resume. An orphan scan
            // stops at the first realignment.
            if matches!(scan.scan_type, ScanType::Active | ScanType::Passive)
                && self.pib.auto_request
                && scan.descriptors.is_full()
            {
                break;
            }

            if scan.scan_type == ScanType::Orphan && scan.realignment_received {
                break;
            }

            let channel = scan.current_channel;
            if scan.unscanned & (1u32 << channel) == 0 {
                scan.current_channel += 1;
                continue;
            }

            self.scan_state = match scan.scan_type {
                ScanType::Ed => ScanState::Ed,
                ScanType::Active => ScanState::Active,
                ScanType::Passive => ScanState::Passive,
                ScanType::Orphan => ScanState::Orphan,
            };

            if self.radio.set_channel(channel).is_err() {
                // Channel not supported, continue with the next one.
                let scan = self.scan.as_mut().unwrap();
                scan.current_channel += 1;
                continue;
            }

            self.scan_set_complete();
            return;
        }

        self.finish_scan();
    }

    /// The channel is selected; start the per-channel work.
    fn scan_set_complete(&mut self) {
        let Some(scan) = self.scan.as_ref() else {
            return;
        };

        match scan.scan_type {
            ScanType::Ed => {
                let duration =
                    Duration::from_symbols(scan_duration_symbols(scan.duration));
                self.set_in_flight(InFlightTx::EdScan);
                if self.radio.ed_start(duration).is_err() {
                    self.in_flight = None;
                    self.handle_scan_duration_timeout();
                }
            }
            ScanType::Active => {
                if self.send_scan_command(true).is_err() {
                    // The probe could not be sent; pretend the channel
                    // scan elapsed so the engine moves on.
                    self.handle_scan_duration_timeout();
                }
            }
            ScanType::Passive => {
                self.radio.rx_enable(true);
                let symbols = scan_duration_symbols(scan.duration);
                let now = self.clock.now();
                self.timers.arm_after(
                    Timeout::ScanDuration,
                    now,
                    Duration::from_symbols(symbols),
                );
            }
            ScanType::Orphan => {
                if self.send_scan_command(false).is_err() {
                    self.handle_scan_duration_timeout();
                }
            }
        }
    }

    /// Transmit the scan probe: a beacon request or an orphan
    /// notification command.
    fn send_scan_command(&mut self, beacon_request: bool) -> Result<(), MacStatus> {
        let sequence_number = self.pib.next_dsn();

        let (command, tag) = if beacon_request {
            (MacCommand::BeaconRequest, InFlightTx::BeaconRequest)
        } else {
            (
                MacCommand::OrphanNotification,
                InFlightTx::OrphanNotification,
            )
        };

        let mut builder = FrameBuilder::new_command(command)
            .set_sequence_number(sequence_number)
            .set_dst_pan_id(BROADCAST_PAN_ID)
            .set_dst_address(Address::BROADCAST);

        if !beacon_request {
            // The orphan notification identifies the orphan by its
            // extended address.
            let own_extended = self
                .pib
                .extended_address
                .ok_or(MacStatus::InvalidParameter)?;
            builder = builder
                .set_src_pan_id(BROADCAST_PAN_ID)
                .set_src_address(Address::Extended(own_extended));
        }

        let repr = builder
            .finalize()
            .map_err(|_| MacStatus::InvalidParameter)?;

        let frame = frame_buffer_from(&repr);
        self.start_transmission(&frame, CsmaMode::Unslotted, false, tag)
            .map_err(|_| MacStatus::ChannelAccessFailure)
    }

    /// The scan probe transmission finished; start listening for the
    /// scan duration, or move on when the probe never made it out.
    pub(crate) fn scan_send_complete(&mut self, status: TxStatus) {
        let Some(scan) = self.scan.as_ref() else {
            return;
        };

        if !status.is_success() {
            self.handle_scan_duration_timeout();
            return;
        }

        let symbols = match scan.scan_type {
            // An orphaned device waits up to macResponseWaitTime for the
            // coordinator realignment.
            ScanType::Orphan => self.pib.response_wait_symbols(),
            _ => scan_duration_symbols(scan.duration),
        };

        self.radio.rx_enable(true);
        let now = self.clock.now();
        self.timers
            .arm_after(Timeout::ScanDuration, now, Duration::from_symbols(symbols));
    }

    /// An energy-detect measurement finished.
    pub fn ed_scan_done(&mut self, energy_level: u8) {
        let in_flight = self.take_in_flight();
        debug_assert!(
            matches!(in_flight, Some(InFlightTx::EdScan)),
            "unexpected energy scan completion"
        );

        let Some(scan) = self.scan.as_mut() else {
            return;
        };

        let _ = scan.ed_levels.push(energy_level);
        self.handle_scan_duration_timeout();
    }

    /// The per-channel scan duration elapsed; mark the channel visited
    /// and continue.
    pub(crate) fn handle_scan_duration_timeout(&mut self) {
        let Some(scan) = self.scan.as_mut() else {
            return;
        };

        scan.unscanned &= !(1u32 << scan.current_channel);
        scan.current_channel += 1;
        self.scan_proceed();
    }

    /// A beacon arrived while scanning; record one PAN descriptor per
    /// distinct coordinator.
    pub(crate) fn scan_record_beacon(&mut self, frame: &FrameRepr, lqi: u8) {
        let Some(scan) = self.scan.as_mut() else {
            return;
        };

        if !matches!(scan.scan_type, ScanType::Active | ScanType::Passive) {
            return;
        }

        let (Some(coord_pan_id), Some(coord_address)) = (
            frame.addressing.src_pan_id,
            frame.addressing.src_address,
        ) else {
            return;
        };

        let crate::frame::FramePayloadRepr::Beacon(beacon) = &frame.payload else {
            return;
        };

        let descriptor = PanDescriptor {
            coord_pan_id,
            coord_address,
            channel: scan.current_channel,
            page: scan.page,
            superframe_spec: beacon.superframe_spec,
            gts_permit: beacon.gts.permit,
            link_quality: lqi,
        };

        let duplicate = scan.descriptors.iter().any(|d| {
            d.coord_pan_id == descriptor.coord_pan_id
                && d.coord_address == descriptor.coord_address
                && d.channel == descriptor.channel
                && d.page == descriptor.page
        });

        if !duplicate {
            let _ = scan.descriptors.push(descriptor);
        }
    }

    /// A coordinator realignment command arrived while orphan-scanning.
    pub(crate) fn process_orphan_realignment(&mut self, realignment: &CoordinatorRealignment) {
        let Some(scan) = self.scan.as_mut() else {
            return;
        };

        if scan.scan_type != ScanType::Orphan || scan.realignment_received {
            return;
        }

        scan.realignment_received = true;
        scan.unscanned &= !(1u32 << scan.current_channel);
        self.timers.stop(Timeout::ScanDuration);

        // Adopt the realigned configuration.
        self.pib.pan_id = realignment.pan_id;
        self.radio.set_pan_id(realignment.pan_id);
        self.pib.coord_short_address = realignment.coord_short_address;
        if realignment.device_short_address != BROADCAST_SHORT_ADDR {
            self.pib.short_address = realignment.device_short_address;
            self.radio.set_short_address(realignment.device_short_address);
        }
        if self.radio.set_channel(realignment.channel).is_ok() {
            self.pib.current_channel = realignment.channel;
        }
        if let Some(page) = realignment.channel_page {
            if self.radio.set_channel_page(page).is_ok() {
                self.pib.current_page = page;
            }
        }

        self.scan_proceed();
    }

    /// Every requested channel was visited or a termination rule fired;
    /// produce the confirm.
    fn finish_scan(&mut self) {
        let Some(scan) = self.scan.take() else {
            return;
        };

        let status = match scan.scan_type {
            ScanType::Ed => MacStatus::Success,
            ScanType::Active | ScanType::Passive => {
                if !self.pib.auto_request {
                    MacStatus::Success
                } else if scan.descriptors.is_full() {
                    MacStatus::LimitReached
                } else if scan.descriptors.is_empty() {
                    MacStatus::NoBeacon
                } else {
                    MacStatus::Success
                }
            }
            ScanType::Orphan => {
                if scan.realignment_received {
                    MacStatus::Success
                } else {
                    MacStatus::NoBeacon
                }
            }
        };

        if matches!(scan.scan_type, ScanType::Active | ScanType::Passive) {
            // Restore macPANId after the scan.
            self.pib.pan_id = scan.saved_pan_id;
            self.radio.set_pan_id(scan.saved_pan_id);
        }

        self.scan_state = ScanState::Idle;
        self.queue_event(MacEvent::MlmeScanConfirm(ScanConfirm {
            status,
            scan_type: scan.scan_type,
            channel_page: scan.page,
            unscanned_channels: scan.unscanned,
            ed_levels: scan.ed_levels,
            pan_descriptors: scan.descriptors,
        }));

        self.sleep_trans();
    }
}
