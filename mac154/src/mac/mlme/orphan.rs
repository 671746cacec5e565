//! Orphan notification handling, coordinator side.

use crate::frame::{
    Address, CoordinatorRealignment, FrameBuilder, FrameRepr, MacCommand,
};
use crate::mac::constants::*;
use crate::mac::status::MacStatus;
use crate::mac::{frame_buffer_from, InFlightTx, MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};

/// MLME-ORPHAN.indication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanIndication {
    pub orphan_address: [u8; 8],
}

/// MLME-ORPHAN.response parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanResponse {
    pub orphan_address: [u8; 8],
    /// The short address the orphan had been allocated.
    pub short_address: u16,
    /// Whether the orphan is a member of this PAN.
    pub associated_member: bool,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// An orphan notification command arrived.
    pub(crate) fn process_orphan_notification(&mut self, frame: &FrameRepr) {
        if !self.state.is_coordinator() {
            return;
        }

        let Some(Address::Extended(orphan_address)) = frame.addressing.src_address else {
            return;
        };

        self.queue_event(MacEvent::MlmeOrphanIndication(OrphanIndication {
            orphan_address,
        }));
    }

    /// Realign an orphaned device that is a member of this PAN.
    pub(crate) fn mlme_orphan_response(&mut self, response: OrphanResponse) {
        if !response.associated_member {
            // Not our device; the orphan keeps scanning.
            return;
        }

        let Some(own_extended) = self.pib.extended_address else {
            return;
        };

        let sequence_number = self.pib.next_dsn();
        let repr = match FrameBuilder::new_command(MacCommand::CoordinatorRealignment(
            CoordinatorRealignment {
                pan_id: self.pib.pan_id,
                coord_short_address: self.pib.short_address,
                channel: self.pib.current_channel,
                device_short_address: response.short_address,
                channel_page: Some(self.pib.current_page),
            },
        ))
        .set_sequence_number(sequence_number)
        .set_dst_pan_id(BROADCAST_PAN_ID)
        .set_dst_address(Address::Extended(response.orphan_address))
        .set_src_pan_id(self.pib.pan_id)
        .set_src_address(Address::Extended(own_extended))
        .finalize()
        {
            Ok(repr) => repr,
            Err(_) => return,
        };

        let frame = frame_buffer_from(&repr);
        let tag = InFlightTx::OrphanRealignment {
            pan_id: self.pib.pan_id,
            device_address: Address::Extended(response.orphan_address),
        };

        if self
            .start_transmission(&frame, CsmaMode::Unslotted, true, tag)
            .is_err()
        {
            self.comm_status(
                self.pib.pan_id,
                Address::Extended(own_extended),
                Address::Extended(response.orphan_address),
                MacStatus::ChannelAccessFailure,
            );
            self.sleep_trans();
        }
    }

    /// Route the transmission outcome of an orphan realignment command.
    pub(crate) fn orphan_realignment_done(
        &mut self,
        status: TxStatus,
        pan_id: u16,
        device_address: Address,
    ) {
        let src_address = match self.pib.extended_address {
            Some(extended) => Address::Extended(extended),
            None => Address::Absent,
        };

        self.comm_status(pan_id, src_address, device_address, status.into());
        self.sleep_trans();
    }
}
