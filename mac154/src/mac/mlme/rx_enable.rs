//! MLME-RX-ENABLE handling.

use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, Radio};
use crate::time::Duration;

/// MLME-RX-ENABLE.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEnableRequest {
    /// The number of symbols the receiver is to be enabled for. Zero
    /// disables the receiver.
    pub rx_on_duration: u32,
}

/// MLME-RX-ENABLE.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEnableConfirm {
    pub status: MacStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Enable the receiver for a bounded window.
    pub(crate) fn mlme_rx_enable_request(&mut self, request: RxEnableRequest) {
        if request.rx_on_duration == 0 {
            self.rx_enabled = false;
            self.timers.stop(Timeout::RxEnable);
            self.sleep_trans();
        } else {
            self.trx_wakeup();
            self.rx_enabled = true;
            self.radio.rx_enable(true);
            let now = self.clock.now();
            self.timers.arm_after(
                Timeout::RxEnable,
                now,
                Duration::from_symbols(request.rx_on_duration),
            );
        }

        self.queue_event(MacEvent::MlmeRxEnableConfirm(RxEnableConfirm {
            status: MacStatus::Success,
        }));
    }

    /// The receiver-on window ended.
    pub(crate) fn handle_rx_enable_timeout(&mut self) {
        self.rx_enabled = false;
        self.sleep_trans();
    }
}
