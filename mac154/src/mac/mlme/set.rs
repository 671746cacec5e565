//! MLME-SET handling.

use crate::mac::pib::{PibAttribute, PibValue};
use crate::mac::status::MacStatus;
use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, Radio};

/// MLME-SET.confirm parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetConfirm {
    pub status: MacStatus,
    pub attribute: PibAttribute,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Write a PIB attribute on behalf of the next higher layer. Writes
    /// that affect address filtering or the channel are forwarded to the
    /// radio.
    pub(crate) fn mlme_set_request(&mut self, value: PibValue) {
        let attribute = value.attribute();
        let status = self.write_attribute(value);

        self.queue_event(MacEvent::MlmeSetConfirm(SetConfirm { status, attribute }));
    }

    fn write_attribute(&mut self, value: PibValue) -> MacStatus {
        match value {
            PibValue::AssociationPermit(permit) => self.pib.association_permit = permit,
            PibValue::AutoRequest(auto_request) => self.pib.auto_request = auto_request,
            PibValue::BeaconPayload(payload) => self.pib.beacon_payload = payload,
            PibValue::Bsn(bsn) => self.pib.bsn = bsn,
            PibValue::CoordExtendedAddress(address) => {
                self.pib.coord_extended_address = Some(address)
            }
            PibValue::CoordShortAddress(address) => self.pib.coord_short_address = address,
            PibValue::Dsn(dsn) => self.pib.dsn = dsn,
            PibValue::ExtendedAddress(address) => {
                self.pib.extended_address = Some(address);
                self.radio.set_extended_address(address);
            }
            PibValue::GtsPermit(permit) => self.pib.gts_permit = permit,
            PibValue::PanId(pan_id) => {
                self.pib.pan_id = pan_id;
                self.radio.set_pan_id(pan_id);
            }
            PibValue::ResponseWaitTime(time) => {
                if !(2..=64).contains(&time) {
                    return MacStatus::InvalidParameter;
                }
                self.pib.response_wait_time = time;
            }
            PibValue::RxOnWhenIdle(rx_on) => {
                self.pib.rx_on_when_idle = rx_on;
                if rx_on {
                    self.trx_wakeup();
                    self.radio.rx_enable(true);
                } else {
                    self.sleep_trans();
                }
            }
            PibValue::SecurityEnabled(enabled) => {
                // No security module is compiled in.
                if enabled {
                    return MacStatus::InvalidParameter;
                }
                self.pib.security_enabled = false;
            }
            PibValue::ShortAddress(address) => {
                self.pib.short_address = address;
                self.radio.set_short_address(address);
            }
            PibValue::TransactionPersistenceTime(time) => {
                self.pib.transaction_persistence_time = time
            }
            PibValue::CurrentChannel(channel) => {
                if self.radio.set_channel(channel).is_err() {
                    return MacStatus::InvalidParameter;
                }
                self.pib.current_channel = channel;
            }
            PibValue::CurrentPage(page) => {
                if self.radio.set_channel_page(page).is_err() {
                    return MacStatus::InvalidParameter;
                }
                self.pib.current_page = page;
            }
            PibValue::BeaconOrder(_) | PibValue::SuperframeOrder(_) => {
                // Only changed through MLME-START.
                return MacStatus::ReadOnly;
            }
        }

        MacStatus::Success
    }
}
