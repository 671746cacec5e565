//! MLME-GET handling.

use crate::mac::pib::{PibAttribute, PibValue};
use crate::mac::status::MacStatus;
use crate::mac::{MacEvent, MacService, UpperLayer};
use crate::phy::{Clock, Radio};

/// MLME-GET.request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRequest {
    pub attribute: PibAttribute,
}

/// MLME-GET.confirm parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetConfirm {
    pub status: MacStatus,
    pub attribute: PibAttribute,
    pub value: Option<PibValue>,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Read a PIB attribute on behalf of the next higher layer.
    pub(crate) fn mlme_get_request(&mut self, request: GetRequest) {
        let value = self.read_attribute(request.attribute);

        let status = match (&value, request.attribute) {
            // The extended addresses are only readable once assigned.
            (None, _) => MacStatus::UnsupportedAttribute,
            _ => MacStatus::Success,
        };

        self.queue_event(MacEvent::MlmeGetConfirm(GetConfirm {
            status,
            attribute: request.attribute,
            value,
        }));
    }

    fn read_attribute(&self, attribute: PibAttribute) -> Option<PibValue> {
        let pib = &self.pib;
        Some(match attribute {
            PibAttribute::AssociationPermit => {
                PibValue::AssociationPermit(pib.association_permit)
            }
            PibAttribute::AutoRequest => PibValue::AutoRequest(pib.auto_request),
            PibAttribute::BeaconPayload => PibValue::BeaconPayload(pib.beacon_payload.clone()),
            PibAttribute::Bsn => PibValue::Bsn(pib.bsn),
            PibAttribute::CoordExtendedAddress => {
                PibValue::CoordExtendedAddress(pib.coord_extended_address?)
            }
            PibAttribute::CoordShortAddress => {
                PibValue::CoordShortAddress(pib.coord_short_address)
            }
            PibAttribute::Dsn => PibValue::Dsn(pib.dsn),
            PibAttribute::ExtendedAddress => PibValue::ExtendedAddress(pib.extended_address?),
            PibAttribute::GtsPermit => PibValue::GtsPermit(pib.gts_permit),
            PibAttribute::PanId => PibValue::PanId(pib.pan_id),
            PibAttribute::ResponseWaitTime => {
                PibValue::ResponseWaitTime(pib.response_wait_time)
            }
            PibAttribute::RxOnWhenIdle => PibValue::RxOnWhenIdle(pib.rx_on_when_idle),
            PibAttribute::SecurityEnabled => PibValue::SecurityEnabled(pib.security_enabled),
            PibAttribute::ShortAddress => PibValue::ShortAddress(pib.short_address),
            PibAttribute::TransactionPersistenceTime => {
                PibValue::TransactionPersistenceTime(pib.transaction_persistence_time)
            }
            PibAttribute::CurrentChannel => PibValue::CurrentChannel(pib.current_channel),
            PibAttribute::CurrentPage => PibValue::CurrentPage(pib.current_page),
            PibAttribute::BeaconOrder => PibValue::BeaconOrder(pib.beacon_order),
            PibAttribute::SuperframeOrder => PibValue::SuperframeOrder(pib.superframe_order),
        })
    }
}
