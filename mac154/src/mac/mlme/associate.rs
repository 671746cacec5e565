//! MLME-ASSOCIATE handling, device and coordinator side.

use crate::frame::{
    Address, AssociationStatus, CapabilityInformation, FrameBuilder, FrameRepr, MacCommand,
};
use crate::mac::constants::*;
use crate::mac::state::{MacState, PollState, ScanState};
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{
    frame_buffer_from, InFlightTx, MacEvent, MacService, QueuedFrame, QueuedKind, UpperLayer,
};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};
use crate::time::Duration;

/// MLME-ASSOCIATE.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateRequest {
    pub channel: u8,
    pub channel_page: u8,
    pub coord_pan_id: u16,
    pub coord_address: Address,
    pub capability: CapabilityInformation,
}

/// MLME-ASSOCIATE.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateConfirm {
    /// The short address allocated by the coordinator, or 0xffff when the
    /// association failed.
    pub short_address: u16,
    pub status: MacStatus,
}

/// MLME-ASSOCIATE.indication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateIndication {
    pub device_address: [u8; 8],
    pub capability: CapabilityInformation,
}

/// MLME-ASSOCIATE.response parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateResponse {
    pub device_address: [u8; 8],
    pub short_address: u16,
    pub status: AssociationStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Associate with a coordinator. Device side of the procedure.
    pub(crate) fn mlme_associate_request(&mut self, request: AssociateRequest) {
        if self.scan_state != ScanState::Idle || self.poll_state != PollState::Idle {
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::Denied);
            return;
        }

        let Some(own_extended) = self.pib.extended_address else {
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::InvalidParameter);
            return;
        };

        if matches!(request.coord_address, Address::Absent)
            || request.coord_pan_id == BROADCAST_PAN_ID
        {
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::InvalidParameter);
            return;
        }

        self.trx_wakeup();
        if self.radio.set_channel(request.channel).is_err()
            || self.radio.set_channel_page(request.channel_page).is_err()
        {
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::InvalidParameter);
            return;
        }
        self.pib.current_channel = request.channel;
        self.pib.current_page = request.channel_page;

        // The node adopts the PAN it is joining before the request goes
        // out, so the coordinator's response passes address filtering.
        self.pib.pan_id = request.coord_pan_id;
        self.radio.set_pan_id(request.coord_pan_id);
        match request.coord_address {
            Address::Short(_) => {
                self.pib.coord_short_address = request.coord_address.as_u16().unwrap_or(0);
            }
            Address::Extended(extended) => {
                self.pib.coord_short_address = NO_SHORT_ADDR;
                self.pib.coord_extended_address = Some(extended);
            }
            Address::Absent => unreachable!(),
        }

        // An association request always uses the extended source address
        // with the broadcast source PAN.
        let sequence_number = self.pib.next_dsn();
        let repr = match FrameBuilder::new_command(MacCommand::AssociationRequest(
            request.capability,
        ))
        .set_sequence_number(sequence_number)
        .set_dst_pan_id(request.coord_pan_id)
        .set_dst_address(request.coord_address)
        .set_src_pan_id(BROADCAST_PAN_ID)
        .set_src_address(Address::Extended(own_extended))
        .finalize()
        {
            Ok(repr) => repr,
            Err(_) => {
                self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::InvalidParameter);
                return;
            }
        };

        self.pending_association = Some(request);

        let frame = frame_buffer_from(&repr);
        if self
            .start_transmission(
                &frame,
                CsmaMode::Unslotted,
                true,
                InFlightTx::AssociationRequest,
            )
            .is_err()
        {
            self.pending_association = None;
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::ChannelAccessFailure);
            self.sleep_trans();
        }
    }

    pub(crate) fn associate_confirm(&mut self, short_address: u16, status: MacStatus) {
        self.queue_event(MacEvent::MlmeAssociateConfirm(AssociateConfirm {
            short_address,
            status,
        }));
    }

    /// Route the transmission outcome of an association request command.
    pub(crate) fn association_request_done(&mut self, status: TxStatus) {
        match status {
            TxStatus::NoAck | TxStatus::ChannelAccessFailure | TxStatus::FrameTooLong => {
                // The broadcast short address is reported when the
                // association attempt failed.
                self.pending_association = None;
                self.associate_confirm(BROADCAST_SHORT_ADDR, status.into());
                self.sleep_trans();
            }
            TxStatus::Ok | TxStatus::FramePending => {
                self.poll_state = PollState::AwaitAssocResponse;

                let now = self.clock.now();
                self.timers.arm_after(
                    Timeout::ResponseWait,
                    now,
                    Duration::from_symbols(self.pib.response_wait_symbols()),
                );
            }
        }
    }

    /// The response wait time elapsed; poll the coordinator for the
    /// association response.
    pub(crate) fn handle_response_wait_timeout(&mut self) {
        if self.poll_state != PollState::AwaitAssocResponse {
            return;
        }

        if self.build_and_tx_data_req(false, true, None).is_err() {
            self.poll_state = PollState::Idle;
            self.pending_association = None;
            self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::ChannelAccessFailure);
            self.sleep_trans();
            return;
        }

        // The overall procedure timeout is armed once the data request
        // went out, from the transmission outcome router.
        let now = self.clock.now();
        self.timers.arm_after(
            Timeout::PollWait,
            now,
            Duration::from_symbols(self.pib.max_frame_total_wait_time as u32),
        );
    }

    /// An association response command arrived. Device side.
    pub(crate) fn process_associate_response(
        &mut self,
        frame: &FrameRepr,
        short_address: u16,
        status: AssociationStatus,
    ) {
        if self.poll_state != PollState::AwaitAssocResponse {
            debug!("unexpected association response");
            return;
        }

        let own_extended = self.pib.extended_address;
        match frame.addressing.dst_address {
            Some(Address::Extended(extended)) if Some(extended) == own_extended => {}
            _ => return,
        }

        self.timers.stop(Timeout::ResponseWait);
        self.timers.stop(Timeout::PollWait);
        self.poll_state = PollState::Idle;
        self.pending_association = None;

        match status {
            AssociationStatus::Successful => {
                self.pib.short_address = short_address;
                self.radio.set_short_address(short_address);
                if let Some(Address::Extended(coord)) = frame.addressing.src_address {
                    self.pib.coord_extended_address = Some(coord);
                }
                self.pib.associated_pan_coord = true;
                self.state = MacState::Associated;
                self.associate_confirm(short_address, MacStatus::Success);
            }
            AssociationStatus::PanAtCapacity | AssociationStatus::PanAccessDenied => {
                self.pib.pan_id = BROADCAST_PAN_ID;
                self.radio.set_pan_id(BROADCAST_PAN_ID);
                self.associate_confirm(BROADCAST_SHORT_ADDR, MacStatus::Denied);
            }
        }

        self.sleep_trans();
    }

    /// An association request command arrived. Coordinator side.
    pub(crate) fn process_associate_request(
        &mut self,
        frame: &FrameRepr,
        capability: CapabilityInformation,
    ) {
        if !self.state.is_coordinator() || !self.pib.association_permit {
            debug!("ignoring association request, not accepting associations");
            return;
        }

        let Some(Address::Extended(device_address)) = frame.addressing.src_address else {
            return;
        };

        self.queue_event(MacEvent::MlmeAssociateIndication(AssociateIndication {
            device_address,
            capability,
        }));
    }

    /// Answer an association request. The response is always transmitted
    /// indirectly; the comm-status indication follows once the device has
    /// polled it.
    pub(crate) fn mlme_associate_response(&mut self, response: AssociateResponse) {
        let Some(own_extended) = self.pib.extended_address else {
            self.comm_status(
                self.pib.pan_id,
                Address::Absent,
                Address::Extended(response.device_address),
                MacStatus::InvalidParameter,
            );
            return;
        };

        let sequence_number = self.pib.next_dsn();
        let repr = match FrameBuilder::new_command(MacCommand::AssociationResponse {
            short_address: response.short_address,
            status: response.status,
        })
        .set_sequence_number(sequence_number)
        .set_dst_pan_id(self.pib.pan_id)
        .set_dst_address(Address::Extended(response.device_address))
        .set_src_pan_id(self.pib.pan_id)
        .set_src_address(Address::Extended(own_extended))
        .finalize()
        {
            Ok(repr) => repr,
            Err(_) => {
                self.comm_status(
                    self.pib.pan_id,
                    Address::Extended(own_extended),
                    Address::Extended(response.device_address),
                    MacStatus::InvalidParameter,
                );
                return;
            }
        };

        let queued = QueuedFrame {
            buffer: frame_buffer_from(&repr),
            kind: QueuedKind::AssociationResponse,
            dst_pan_id: self.pib.pan_id,
            dst_address: Address::Extended(response.device_address),
            in_transit: false,
            lifetime: self.pib.transaction_persistence_time,
        };

        if self.indirect_queue_frame(queued).is_err() {
            self.comm_status(
                self.pib.pan_id,
                Address::Extended(own_extended),
                Address::Extended(response.device_address),
                MacStatus::TransactionOverflow,
            );
        }
    }
}
