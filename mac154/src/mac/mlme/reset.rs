//! MLME-RESET handling.

use crate::mac::pib::Pib;
use crate::mac::state::{MacState, PollState, ScanState, SuperframeState, SyncState};
use crate::mac::status::MacStatus;
use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, Radio};

/// MLME-RESET.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRequest {
    /// Whether the PIB is reset to its defaults as well.
    pub set_default_pib: bool,
}

/// MLME-RESET.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetConfirm {
    pub status: MacStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Reset the MAC sublayer. Flushes every queue, stops every timer and
    /// returns all state machines to idle. A transmission still owned by
    /// the radio is forgotten; its completion must not be delivered after
    /// this call.
    pub(crate) fn mlme_reset_request(&mut self, request: ResetRequest) {
        self.timers.stop_all();

        self.rx_frames.clear();
        self.events.clear();
        self.indirect.flush();
        self.beacon = Default::default();
        self.gts = Default::default();
        self.scan = None;
        self.pending_association = None;
        self.pending_start = None;
        self.in_flight = None;

        self.state = MacState::Idle;
        self.poll_state = PollState::Idle;
        self.scan_state = ScanState::Idle;
        self.sync_state = SyncState::Never;
        self.superframe_state = SuperframeState::Cap;
        self.rx_enabled = false;

        if request.set_default_pib {
            self.pib = Pib::default();
            self.radio.set_pan_id(self.pib.pan_id);
            self.radio.set_short_address(self.pib.short_address);
        }

        self.sleep_trans();

        self.queue_event(MacEvent::MlmeResetConfirm(ResetConfirm {
            status: MacStatus::Success,
        }));
    }
}
