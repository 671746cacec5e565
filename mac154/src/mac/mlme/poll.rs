//! MLME-POLL handling and the shared data request command builder.

use crate::frame::{Address, FrameBuilder, MacCommand};
use crate::mac::constants::*;
use crate::mac::state::{PollState, ScanState};
use crate::mac::status::MacStatus;
use crate::mac::timers::Timeout;
use crate::mac::{frame_buffer_from, InFlightTx, MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, CsmaMode, Radio, TxStatus};
use crate::time::Duration;

/// MLME-POLL.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub coord_pan_id: u16,
    pub coord_address: Address,
}

/// MLME-POLL.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfirm {
    pub status: MacStatus,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Poll the coordinator for pending data.
    pub(crate) fn mlme_poll_request(&mut self, request: PollRequest) {
        if self.poll_state != PollState::Idle || self.scan_state != ScanState::Idle {
            self.poll_confirm(MacStatus::Denied);
            return;
        }

        if let Err(status) = self.build_and_tx_data_req(
            true,
            false,
            Some((request.coord_pan_id, request.coord_address)),
        ) {
            self.poll_confirm(status);
            self.sleep_trans();
        }
    }

    pub(crate) fn poll_confirm(&mut self, status: MacStatus) {
        self.queue_event(MacEvent::MlmePollConfirm(PollConfirm { status }));
    }

    /// Build and transmit a data request command frame.
    ///
    /// `explicit` distinguishes an MLME-POLL.request poll from an
    /// implicit poll triggered by a pending-address match or an
    /// association procedure. With `force_own_extended`, the source
    /// addressing uses the extended address regardless of an assigned
    /// short address, as required while associating. Without an explicit
    /// destination, the frame is addressed to the coordinator recorded in
    /// the PIB.
    ///
    /// Any reason the frame cannot be built or handed to the radio is
    /// reported back as a status; the caller decides whether to surface
    /// it.
    pub(crate) fn build_and_tx_data_req(
        &mut self,
        explicit: bool,
        force_own_extended: bool,
        explicit_dst: Option<(u16, Address)>,
    ) -> Result<(), MacStatus> {
        // Timer-driven polls may race an ongoing transmission.
        if self.in_flight.is_some() {
            return Err(MacStatus::ChannelAccessFailure);
        }

        let src_address = if force_own_extended {
            Address::Extended(self.pib.extended_address.ok_or(MacStatus::InvalidParameter)?)
        } else {
            match self.pib.short_address {
                NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR => Address::Extended(
                    self.pib.extended_address.ok_or(MacStatus::InvalidParameter)?,
                ),
                short => Address::from_u16(short),
            }
        };

        let (dst_pan_id, dst_address) = match explicit_dst {
            Some(dst) => dst,
            None => match self.pib.coord_short_address {
                NO_SHORT_ADDR | UNKNOWN_SHORT_ADDR => (
                    self.pib.pan_id,
                    Address::Extended(
                        self.pib
                            .coord_extended_address
                            .ok_or(MacStatus::InvalidParameter)?,
                    ),
                ),
                short => (self.pib.pan_id, Address::from_u16(short)),
            },
        };

        let sequence_number = self.pib.next_dsn();
        let repr = FrameBuilder::new_command(MacCommand::DataRequest)
            .set_sequence_number(sequence_number)
            .set_dst_pan_id(dst_pan_id)
            .set_dst_address(dst_address)
            .set_src_pan_id(self.pib.pan_id)
            .set_src_address(src_address)
            .finalize()
            .map_err(|_| MacStatus::InvalidParameter)?;

        let frame = frame_buffer_from(&repr);
        self.start_transmission(
            &frame,
            CsmaMode::Unslotted,
            true,
            InFlightTx::DataRequest { explicit },
        )
        .map_err(|_| MacStatus::ChannelAccessFailure)
    }

    /// Route the transmission outcome of a data request command.
    pub(crate) fn data_request_done(&mut self, status: TxStatus, explicit: bool) {
        // In the middle of an association procedure the data request only
        // fetches the association response; the response wait timing is
        // owned by the association state machine.
        if self.poll_state == PollState::AwaitAssocResponse {
            if !matches!(status, TxStatus::Ok | TxStatus::FramePending) {
                self.associate_confirm(BROADCAST_SHORT_ADDR, status.into());
                self.poll_state = PollState::Idle;
                self.pending_association = None;
                self.sleep_trans();
            }
            return;
        }

        if explicit {
            if status != TxStatus::FramePending {
                // Nothing is pending for us; the poll is answered
                // immediately.
                let confirm_status = match status {
                    TxStatus::Ok => MacStatus::NoData,
                    other => other.into(),
                };
                self.poll_confirm(confirm_status);
                self.sleep_trans();
                return;
            }

            self.poll_state = PollState::Explicit;
        } else {
            if !status.is_success() {
                // An implicit poll that could not be sent is recovered
                // locally; the radio returns to sleep.
                self.sleep_trans();
                return;
            }

            self.poll_state = PollState::Implicit;
        }

        let now = self.clock.now();
        self.timers.arm_after(
            Timeout::PollWait,
            now,
            Duration::from_symbols(self.pib.max_frame_total_wait_time as u32),
        );
    }

    /// The poll wait time elapsed without a data response.
    pub(crate) fn handle_poll_wait_timeout(&mut self) {
        match self.poll_state {
            PollState::Explicit => {
                self.poll_confirm(MacStatus::NoData);
            }
            PollState::Implicit => {}
            PollState::AwaitAssocResponse | PollState::Idle => return,
        }

        self.poll_state = PollState::Idle;
        self.sleep_trans();
    }

    /// A data frame answering an outstanding poll arrived. Returns `true`
    /// when the frame resolved a poll.
    pub(crate) fn resolve_poll(&mut self, null_frame: bool) -> bool {
        match self.poll_state {
            PollState::Explicit => {
                self.timers.stop(Timeout::PollWait);
                self.poll_confirm(if null_frame {
                    MacStatus::NoData
                } else {
                    MacStatus::Success
                });
            }
            PollState::Implicit => {
                self.timers.stop(Timeout::PollWait);
            }
            PollState::AwaitAssocResponse | PollState::Idle => return false,
        }

        self.poll_state = PollState::Idle;
        true
    }
}
