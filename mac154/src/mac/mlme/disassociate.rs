//! MLME-DISASSOCIATE handling.

use crate::frame::{Address, DisassociationReason, FrameBuilder, FrameRepr, MacCommand};
use crate::mac::state::MacState;
use crate::mac::status::MacStatus;
use crate::mac::{
    frame_buffer_from, InFlightTx, MacEvent, MacService, QueuedFrame, QueuedKind, UpperLayer,
};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};

/// MLME-DISASSOCIATE.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassociateRequest {
    pub device_pan_id: u16,
    pub device_address: Address,
    pub reason: DisassociationReason,
    /// Whether the notification is queued for an indirect transmission.
    pub tx_indirect: bool,
}

/// MLME-DISASSOCIATE.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassociateConfirm {
    pub status: MacStatus,
    pub device_pan_id: u16,
    pub device_address: Address,
}

/// MLME-DISASSOCIATE.indication parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassociateIndication {
    pub device_address: [u8; 8],
    pub reason: DisassociationReason,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Leave the PAN, or remove a device from it.
    pub(crate) fn mlme_disassociate_request(&mut self, request: DisassociateRequest) {
        if request.device_pan_id != self.pib.pan_id {
            self.disassociate_confirm(MacStatus::InvalidParameter, &request);
            return;
        }

        let Some(own_extended) = self.pib.extended_address else {
            self.disassociate_confirm(MacStatus::InvalidParameter, &request);
            return;
        };

        // Disassociating from the own coordinator forces the transition
        // back to idle once the notification is out.
        let own = self.addresses_coordinator(&request.device_address);

        let sequence_number = self.pib.next_dsn();
        let repr = match FrameBuilder::new_command(MacCommand::DisassociationNotification(
            request.reason,
        ))
        .set_sequence_number(sequence_number)
        .set_dst_pan_id(request.device_pan_id)
        .set_dst_address(request.device_address)
        .set_src_pan_id(self.pib.pan_id)
        .set_src_address(Address::Extended(own_extended))
        .finalize()
        {
            Ok(repr) => repr,
            Err(_) => {
                self.disassociate_confirm(MacStatus::InvalidParameter, &request);
                return;
            }
        };

        if request.tx_indirect && self.state.is_coordinator() && !own {
            let queued = QueuedFrame {
                buffer: frame_buffer_from(&repr),
                kind: QueuedKind::Disassociation,
                dst_pan_id: request.device_pan_id,
                dst_address: request.device_address,
                in_transit: false,
                lifetime: self.pib.transaction_persistence_time,
            };

            if self.indirect_queue_frame(queued).is_err() {
                self.disassociate_confirm(MacStatus::TransactionOverflow, &request);
            }
            return;
        }

        let frame = frame_buffer_from(&repr);
        if self
            .start_transmission(
                &frame,
                CsmaMode::Unslotted,
                true,
                InFlightTx::Disassociation {
                    own,
                    pan_id: request.device_pan_id,
                    device_address: request.device_address,
                },
            )
            .is_err()
        {
            self.disassociate_confirm(MacStatus::ChannelAccessFailure, &request);
            self.sleep_trans();
        }
    }

    fn disassociate_confirm(&mut self, status: MacStatus, request: &DisassociateRequest) {
        self.queue_event(MacEvent::MlmeDisassociateConfirm(DisassociateConfirm {
            status,
            device_pan_id: request.device_pan_id,
            device_address: request.device_address,
        }));
    }

    fn addresses_coordinator(&self, address: &Address) -> bool {
        match address {
            Address::Short(_) => address.as_u16() == Some(self.pib.coord_short_address),
            Address::Extended(extended) => {
                self.pib.coord_extended_address.as_ref() == Some(extended)
            }
            Address::Absent => false,
        }
    }

    /// Route the transmission outcome of a directly transmitted
    /// disassociation notification.
    pub(crate) fn disassociation_done(
        &mut self,
        status: TxStatus,
        own: bool,
        pan_id: u16,
        device_address: Address,
    ) {
        self.queue_event(MacEvent::MlmeDisassociateConfirm(DisassociateConfirm {
            status: status.into(),
            device_pan_id: pan_id,
            device_address,
        }));

        // Only an associated device goes to idle on transmission of a
        // disassociation notification.
        if own && self.state == MacState::Associated {
            self.idle_trans();
        }

        self.sleep_trans();
    }

    /// A disassociation notification command arrived.
    pub(crate) fn process_disassociation_notification(
        &mut self,
        frame: &FrameRepr,
        reason: DisassociationReason,
    ) {
        let Some(Address::Extended(device_address)) = frame.addressing.src_address else {
            debug!("disassociation notification without extended source");
            return;
        };

        self.queue_event(MacEvent::MlmeDisassociateIndication(
            DisassociateIndication {
                device_address,
                reason,
            },
        ));

        // When the own coordinator expels us, the device returns to idle.
        if self.state == MacState::Associated
            && reason == DisassociationReason::CoordinatorWishesDeviceToLeave
            && self.pib.coord_extended_address == Some(device_address)
        {
            self.idle_trans();
        }
    }
}
