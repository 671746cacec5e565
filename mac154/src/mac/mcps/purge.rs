//! MCPS-PURGE handling.

use crate::mac::status::MacStatus;
use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, Radio};

/// MCPS-PURGE.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeRequest {
    pub msdu_handle: u8,
}

/// MCPS-PURGE.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeConfirm {
    pub msdu_handle: u8,
    pub status: MacStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Remove a queued indirect frame before it is retrieved.
    pub(crate) fn mcps_purge_request(&mut self, request: PurgeRequest) {
        let status = if self.indirect.purge(request.msdu_handle) {
            MacStatus::Success
        } else {
            MacStatus::InvalidHandle
        };

        self.queue_event(MacEvent::McpsPurgeConfirm(PurgeConfirm {
            msdu_handle: request.msdu_handle,
            status,
        }));
    }
}
