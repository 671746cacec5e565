//! Routing of queued requests and received frames to their handlers.

use crate::frame::{
    Address, Error, Frame, FramePayloadRepr, FrameRepr, MacCommand, FCS_LEN,
};
use crate::mac::state::ScanState;
use crate::mac::status::MacStatus;
use crate::mac::{MacRequest, MacService, UpperLayer};
use crate::phy::{Clock, FrameBuffer, Radio};

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Invoke the handler of a queued NHLE request.
    pub(crate) fn dispatch_request(&mut self, request: MacRequest) {
        trace!("dispatching {:?}", request.command_id());

        match request {
            MacRequest::McpsDataRequest(request) => self.mcps_data_request(request),
            MacRequest::McpsPurgeRequest(request) => self.mcps_purge_request(request),
            MacRequest::MlmeAssociateRequest(request) => self.mlme_associate_request(request),
            MacRequest::MlmeAssociateResponse(response) => {
                self.mlme_associate_response(response)
            }
            MacRequest::MlmeDisassociateRequest(request) => {
                self.mlme_disassociate_request(request)
            }
            MacRequest::MlmeGetRequest(request) => self.mlme_get_request(request),
            MacRequest::MlmeGtsRequest(request) => self.mlme_gts_request(request),
            MacRequest::MlmeOrphanResponse(response) => self.mlme_orphan_response(response),
            MacRequest::MlmeResetRequest(request) => self.mlme_reset_request(request),
            MacRequest::MlmeRxEnableRequest(request) => self.mlme_rx_enable_request(request),
            MacRequest::MlmeScanRequest(request) => self.mlme_scan_request(request),
            MacRequest::MlmeSetRequest(value) => self.mlme_set_request(value),
            MacRequest::MlmeStartRequest(request) => self.mlme_start_request(request),
            MacRequest::MlmeSyncRequest(request) => self.mlme_sync_request(request),
            MacRequest::MlmePollRequest(request) => self.mlme_poll_request(request),
        }
    }

    /// Decode a received frame and route it to the matching state
    /// machine. The decoded representation is processed completely before
    /// this returns; it does not survive the call.
    pub(crate) fn process_tal_frame(&mut self, buffer: FrameBuffer) {
        let lqi = buffer.lqi;
        let mpdu = buffer.mpdu();

        if mpdu.len() < FCS_LEN + 3 {
            debug!("dropping runt frame");
            return;
        }

        let content = &mpdu[..mpdu.len() - FCS_LEN];
        let repr = match Frame::new(content).and_then(|frame| FrameRepr::parse(&frame)) {
            Ok(repr) => repr,
            Err(Error::SecurityNotSupported) => {
                // Secured frames cannot be processed without the security
                // module; this is surfaced, never silently dropped.
                self.comm_status(
                    self.pib.pan_id,
                    Address::Absent,
                    Address::Absent,
                    MacStatus::UnsupportedSecurity,
                );
                return;
            }
            Err(err) => {
                debug!("dropping undecodable frame: {:?}", err);
                return;
            }
        };

        match &repr.payload {
            FramePayloadRepr::Beacon(_) => self.process_beacon_frame(&repr, lqi),
            FramePayloadRepr::Data(_) => {
                // Everything but beacons is ignored while scanning.
                if self.scan_state == ScanState::Idle {
                    self.process_data_frame(&repr, lqi);
                }
            }
            FramePayloadRepr::Ack => {
                // Acknowledgments are consumed below the MAC.
            }
            FramePayloadRepr::Command(command) => {
                let command = *command;
                self.process_command_frame(&repr, command);
            }
        }
    }

    fn process_command_frame(&mut self, repr: &FrameRepr, command: MacCommand) {
        // During a scan, only the coordinator realignment answering an
        // orphan notification is of interest.
        if self.scan_state != ScanState::Idle {
            if let MacCommand::CoordinatorRealignment(realignment) = command {
                if self.scan_state == ScanState::Orphan {
                    self.process_orphan_realignment(&realignment);
                }
            }
            return;
        }

        match command {
            MacCommand::AssociationRequest(capability) => {
                self.process_associate_request(repr, capability)
            }
            MacCommand::AssociationResponse {
                short_address,
                status,
            } => self.process_associate_response(repr, short_address, status),
            MacCommand::DisassociationNotification(reason) => {
                self.process_disassociation_notification(repr, reason)
            }
            MacCommand::DataRequest => self.process_data_request(repr),
            MacCommand::PanIdConflictNotification => self.process_pan_id_conflict(repr),
            MacCommand::OrphanNotification => self.process_orphan_notification(repr),
            MacCommand::BeaconRequest => self.process_beacon_request(repr),
            MacCommand::CoordinatorRealignment(realignment) => {
                self.process_coord_realignment(&realignment)
            }
            MacCommand::GtsRequest(characteristics) => {
                self.process_gts_request(repr, characteristics)
            }
        }
    }
}
