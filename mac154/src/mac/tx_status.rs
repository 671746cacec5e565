//! The transmission outcome router.
//!
//! Every frame handed to the radio eventually produces exactly one
//! [`tx_done`](MacService::tx_done) call. The in-flight tag recorded at
//! transmission time decides which confirm or indication the outcome
//! turns into, which queue the frame leaves, and which follow-up timer is
//! armed. This is the single place where the busy state is cleared.

use crate::mac::status::MacStatus;
use crate::mac::{InFlightTx, MacService, QueuedKind, UpperLayer};
use crate::phy::{Clock, Radio, TxStatus};

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Radio callback: the outstanding transmission finished.
    pub fn tx_done(&mut self, status: TxStatus) {
        let Some(tag) = self.take_in_flight() else {
            // A completion with nothing in flight is dropped; it belongs
            // to a transmission forgotten by a reset.
            return;
        };

        match tag {
            InFlightTx::Data { handle } | InFlightTx::BroadcastData { handle } => {
                self.data_confirm(handle, status.into());
                self.sleep_trans();
            }
            InFlightTx::IndirectTransaction => self.indirect_transaction_done(status),
            InFlightTx::GtsData { coordinator, index } => {
                self.gts_data_done(status, coordinator, index as usize)
            }
            InFlightTx::NullFrame => self.sleep_trans(),
            InFlightTx::Beacon => self.sleep_trans(),
            InFlightTx::BeaconRequest | InFlightTx::OrphanNotification => {
                self.scan_send_complete(status)
            }
            InFlightTx::DataRequest { explicit } => self.data_request_done(status, explicit),
            InFlightTx::AssociationRequest => self.association_request_done(status),
            InFlightTx::Disassociation {
                own,
                pan_id,
                device_address,
            } => self.disassociation_done(status, own, pan_id, device_address),
            InFlightTx::OrphanRealignment {
                pan_id,
                device_address,
            } => self.orphan_realignment_done(status, pan_id, device_address),
            InFlightTx::CoordRealignment => self.coord_realignment_done(status),
            InFlightTx::PanIdConflict => {
                self.sync_loss(MacStatus::PanIdConflict);
            }
            InFlightTx::GtsRequest { characteristics } => {
                self.gts_request_done(status, characteristics)
            }
            InFlightTx::EdScan => {
                debug_assert!(false, "energy scans complete through ed_scan_done");
            }
        }
    }

    /// Terminal handling of a frame from the indirect queue: removed only
    /// on success, retried on the next poll otherwise.
    fn indirect_transaction_done(&mut self, status: TxStatus) {
        if status.is_success() {
            let Some(entry) = self.indirect.take_in_transit() else {
                self.sleep_trans();
                return;
            };

            match entry.kind {
                QueuedKind::Data { handle } => {
                    self.data_confirm(handle, status.into());
                }
                QueuedKind::AssociationResponse => {
                    // The comm-status indication is generated only now,
                    // once the device actually fetched the response.
                    let own = match self.pib.extended_address {
                        Some(extended) => crate::frame::Address::Extended(extended),
                        None => crate::frame::Address::Absent,
                    };
                    self.comm_status(
                        entry.dst_pan_id,
                        own,
                        entry.dst_address,
                        MacStatus::Success,
                    );
                }
                QueuedKind::Disassociation => {
                    self.queue_event(crate::mac::MacEvent::MlmeDisassociateConfirm(
                        crate::mac::mlme::disassociate::DisassociateConfirm {
                            status: MacStatus::Success,
                            device_pan_id: entry.dst_pan_id,
                            device_address: entry.dst_address,
                        },
                    ));
                }
            }
        } else {
            self.indirect.clear_in_transit();
        }

        self.sleep_trans();
    }
}
