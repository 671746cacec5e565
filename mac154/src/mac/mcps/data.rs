//! MCPS-DATA handling.

use heapless::Vec;

use crate::frame::{
    Address, AddressingMode, FrameBuilder, FramePayloadRepr, FrameRepr, MAX_MAC_PAYLOAD_LEN,
};
use crate::mac::constants::*;
use crate::mac::state::{PollState, SuperframeState};
use crate::mac::status::MacStatus;
use crate::mac::{
    frame_buffer_from, InFlightTx, MacEvent, MacService, QueuedFrame, QueuedKind, UpperLayer,
};
use crate::phy::{Clock, CsmaMode, Radio};

/// Transmission options of an MCPS-DATA.request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    /// Request an acknowledgment.
    pub ack: bool,
    /// Queue the frame for the destination to poll it, instead of
    /// transmitting directly.
    pub indirect: bool,
    /// Transmit in a guaranteed time slot.
    pub gts: bool,
}

/// MCPS-DATA.request parameters.
#[derive(Debug, Clone)]
pub struct DataRequest {
    pub src_addr_mode: AddressingMode,
    pub dst_pan_id: u16,
    pub dst_address: Address,
    pub msdu: Vec<u8, MAX_MAC_PAYLOAD_LEN>,
    pub msdu_handle: u8,
    pub tx_options: TxOptions,
}

/// MCPS-DATA.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataConfirm {
    pub msdu_handle: u8,
    pub status: MacStatus,
}

/// MCPS-DATA.indication parameters.
#[derive(Debug, Clone)]
pub struct DataIndication {
    pub src_pan_id: u16,
    pub src_address: Address,
    pub dst_pan_id: u16,
    pub dst_address: Address,
    pub msdu: Vec<u8, MAX_MAC_PAYLOAD_LEN>,
    pub dsn: u8,
    pub lqi: u8,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Transfer data to another device.
    pub(crate) fn mcps_data_request(&mut self, request: DataRequest) {
        let handle = request.msdu_handle;

        if matches!(request.dst_address, Address::Absent)
            && request.src_addr_mode == AddressingMode::Absent
        {
            self.data_confirm(handle, MacStatus::InvalidAddress);
            return;
        }

        let src_address = match request.src_addr_mode {
            AddressingMode::Absent => Address::Absent,
            AddressingMode::Short => match self.pib.short_address {
                // Fall back to the extended address until a short one is
                // assigned.
                NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR => match self.pib.extended_address {
                    Some(extended) => Address::Extended(extended),
                    None => {
                        self.data_confirm(handle, MacStatus::InvalidParameter);
                        return;
                    }
                },
                short => Address::from_u16(short),
            },
            AddressingMode::Extended => match self.pib.extended_address {
                Some(extended) => Address::Extended(extended),
                None => {
                    self.data_confirm(handle, MacStatus::InvalidParameter);
                    return;
                }
            },
            AddressingMode::Unknown => {
                self.data_confirm(handle, MacStatus::InvalidParameter);
                return;
            }
        };

        let sequence_number = self.pib.next_dsn();
        let mut builder = FrameBuilder::new_data(&request.msdu)
            .set_sequence_number(sequence_number)
            .set_ack_request(request.tx_options.ack);

        if !matches!(request.dst_address, Address::Absent) {
            builder = builder
                .set_dst_pan_id(request.dst_pan_id)
                .set_dst_address(request.dst_address);
        }

        if !matches!(src_address, Address::Absent) {
            builder = builder
                .set_src_pan_id(self.pib.pan_id)
                .set_src_address(src_address);
        }

        let repr = match builder.finalize() {
            Ok(repr) => repr,
            Err(_) => {
                self.data_confirm(handle, MacStatus::InvalidParameter);
                return;
            }
        };

        let queued = QueuedFrame {
            buffer: frame_buffer_from(&repr),
            kind: QueuedKind::Data { handle },
            dst_pan_id: request.dst_pan_id,
            dst_address: request.dst_address,
            in_transit: false,
            lifetime: self.pib.transaction_persistence_time,
        };

        if request.tx_options.gts {
            if let Err(status) = self.gts_queue_frame(queued) {
                self.data_confirm(handle, status);
            }
            return;
        }

        if request.tx_options.indirect && self.state.is_coordinator() {
            if self.indirect_queue_frame(queued).is_err() {
                self.data_confirm(handle, MacStatus::TransactionOverflow);
            }
            return;
        }

        if request.dst_address.is_broadcast()
            && self.state.is_coordinator()
            && self.pib.beacon_enabled()
        {
            // Broadcast frames of a beaconing coordinator go out right
            // after a beacon, one per beacon interval.
            if self.beacon.broadcast_queue.push_back(queued).is_err() {
                self.data_confirm(handle, MacStatus::TransactionOverflow);
            }
            return;
        }

        let csma = if self.pib.beacon_enabled()
            && self.superframe_state == SuperframeState::Cap
        {
            CsmaMode::Slotted
        } else {
            CsmaMode::Unslotted
        };

        if self
            .start_transmission(&queued.buffer, csma, true, InFlightTx::Data { handle })
            .is_err()
        {
            self.data_confirm(handle, MacStatus::ChannelAccessFailure);
            self.sleep_trans();
        }
    }

    /// Generate an MCPS-DATA.confirm.
    pub(crate) fn data_confirm(&mut self, msdu_handle: u8, status: MacStatus) {
        self.queue_event(MacEvent::McpsDataConfirm(DataConfirm {
            msdu_handle,
            status,
        }));
    }

    /// A data frame arrived.
    pub(crate) fn process_data_frame(&mut self, frame: &FrameRepr, lqi: u8) {
        let FramePayloadRepr::Data(msdu) = &frame.payload else {
            return;
        };

        // A frame with an empty payload is the null data frame a
        // coordinator sends when nothing is pending.
        let null_frame = msdu.is_empty();
        let polled = self.resolve_poll(null_frame);

        if null_frame {
            if polled {
                self.sleep_trans();
            }
            return;
        }

        // Traffic in a guaranteed slot keeps the slot alive.
        if matches!(self.superframe_state, SuperframeState::Cfp(_)) {
            if let Some(src_short) = frame.addressing.src_address.and_then(|a| a.as_u16()) {
                self.gts_mark_active(src_short);
            }
        }

        self.queue_event(MacEvent::McpsDataIndication(DataIndication {
            src_pan_id: frame
                .addressing
                .src_pan_id
                .or(frame.addressing.dst_pan_id)
                .unwrap_or(BROADCAST_PAN_ID),
            src_address: frame.addressing.src_address.unwrap_or(Address::Absent),
            dst_pan_id: frame.addressing.dst_pan_id.unwrap_or(BROADCAST_PAN_ID),
            dst_address: frame.addressing.dst_address.unwrap_or(Address::Absent),
            msdu: msdu.clone(),
            dsn: frame.sequence_number,
            lqi,
        }));

        // More pending data announced by the sender triggers another
        // implicit poll.
        if frame.frame_control.frame_pending
            && self.pib.auto_request
            && self.poll_state == PollState::Idle
            && self.in_flight.is_none()
        {
            let dst = frame
                .addressing
                .src_address
                .map(|address| {
                    (
                        frame
                            .addressing
                            .src_pan_id
                            .or(frame.addressing.dst_pan_id)
                            .unwrap_or(self.pib.pan_id),
                        address,
                    )
                });
            if self.build_and_tx_data_req(false, false, dst).is_err() {
                self.sleep_trans();
            }
        } else if polled {
            self.sleep_trans();
        }
    }
}
