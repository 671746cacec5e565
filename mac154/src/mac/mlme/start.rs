//! MLME-START handling.

use crate::frame::{Address, CoordinatorRealignment, FrameBuilder, MacCommand};
use crate::mac::constants::*;
use crate::mac::state::{MacState, ScanState};
use crate::mac::status::MacStatus;
use crate::mac::{frame_buffer_from, InFlightTx, MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};

/// MLME-START.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub pan_id: u16,
    pub channel: u8,
    pub channel_page: u8,
    pub beacon_order: u8,
    pub superframe_order: u8,
    /// Whether the node becomes the PAN coordinator rather than a
    /// coordinator within an existing PAN.
    pub pan_coordinator: bool,
    pub battery_life_extension: bool,
    /// Whether a coordinator realignment command announces the new
    /// configuration to the existing PAN first.
    pub coord_realignment: bool,
}

/// MLME-START.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartConfirm {
    pub status: MacStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Start a PAN, or begin using a new superframe configuration.
    pub(crate) fn mlme_start_request(&mut self, request: StartRequest) {
        if matches!(self.pib.short_address, NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR) {
            self.start_confirm(MacStatus::NoShortAddress);
            return;
        }

        let valid_orders = request.beacon_order <= NON_BEACON_ORDER
            && (request.superframe_order <= request.beacon_order
                || request.superframe_order == NON_BEACON_ORDER);
        if !valid_orders || self.scan_state != ScanState::Idle {
            self.start_confirm(MacStatus::InvalidParameter);
            return;
        }

        if request.coord_realignment && self.state.is_coordinator() {
            // Announce the new configuration on the old one; it is only
            // adopted once the realignment made it out.
            if self.tx_coord_realignment(&request).is_ok() {
                self.pending_start = Some(request);
            } else {
                self.start_confirm(MacStatus::ChannelAccessFailure);
            }
            return;
        }

        self.apply_start_parameters(&request);
    }

    fn tx_coord_realignment(&mut self, request: &StartRequest) -> Result<(), MacStatus> {
        let sequence_number = self.pib.next_dsn();
        let repr = FrameBuilder::new_command(MacCommand::CoordinatorRealignment(
            CoordinatorRealignment {
                pan_id: request.pan_id,
                coord_short_address: self.pib.short_address,
                channel: request.channel,
                device_short_address: BROADCAST_SHORT_ADDR,
                channel_page: Some(request.channel_page),
            },
        ))
        .set_sequence_number(sequence_number)
        .set_dst_pan_id(BROADCAST_PAN_ID)
        .set_dst_address(Address::BROADCAST)
        .set_src_pan_id(self.pib.pan_id)
        .set_src_address(Address::from_u16(self.pib.short_address))
        .finalize()
        .map_err(|_| MacStatus::InvalidParameter)?;

        let frame = frame_buffer_from(&repr);
        self.start_transmission(
            &frame,
            CsmaMode::Unslotted,
            false,
            InFlightTx::CoordRealignment,
        )
        .map_err(|_| MacStatus::ChannelAccessFailure)
    }

    /// Route the transmission outcome of the realignment broadcast.
    pub(crate) fn coord_realignment_done(&mut self, status: TxStatus) {
        let Some(request) = self.pending_start.take() else {
            self.sleep_trans();
            return;
        };

        if status.is_success() {
            self.apply_start_parameters(&request);
        } else {
            self.start_confirm(status.into());
            self.sleep_trans();
        }
    }

    fn apply_start_parameters(&mut self, request: &StartRequest) {
        self.trx_wakeup();
        if self.radio.set_channel(request.channel).is_err()
            || self.radio.set_channel_page(request.channel_page).is_err()
        {
            self.start_confirm(MacStatus::InvalidParameter);
            return;
        }

        self.pib.current_channel = request.channel;
        self.pib.current_page = request.channel_page;
        self.pib.pan_id = request.pan_id;
        self.radio.set_pan_id(request.pan_id);
        self.pib.beacon_order = request.beacon_order;
        self.pib.superframe_order = if request.beacon_order == NON_BEACON_ORDER {
            NON_BEACON_ORDER
        } else {
            request.superframe_order
        };
        self.pib.pan_coordinator = request.pan_coordinator;
        self.pib.battery_life_extension = request.battery_life_extension;

        self.state = if request.pan_coordinator {
            MacState::PanCoordStarted
        } else {
            MacState::Coordinator
        };

        if self.pib.beacon_enabled() {
            // The first beacon goes out before anything else on the new
            // configuration.
            self.start_beacon_timer();
        } else {
            self.radio.rx_enable(true);
        }

        self.start_confirm(MacStatus::Success);
    }

    pub(crate) fn start_confirm(&mut self, status: MacStatus) {
        self.queue_event(MacEvent::MlmeStartConfirm(StartConfirm { status }));
    }
}
