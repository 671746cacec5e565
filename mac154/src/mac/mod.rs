//! The MAC sublayer engine.
//!
//! [`MacService`] owns the PIB, every state machine and all queues of the
//! MAC. The host application drives it cooperatively:
//!
//! - [`MacService::post_request`] queues MLME/MCPS requests from the next
//!   higher layer,
//! - [`MacService::wpan_task`] is called in a loop; each call services due
//!   timers, then delivers at most one queued confirm/indication to the
//!   upper layer and processes at most one queued request or received
//!   frame,
//! - radio completions re-enter the engine through
//!   [`MacService::tx_done`], [`MacService::frame_received`] and
//!   [`MacService::ed_scan_done`].
//!
//! Received frames are decoded into a single working representation and
//! fully processed before the call returns; no decoded state survives
//! across task invocations.
//!
//! At most one radio transmission is outstanding at any time. The
//! `in_flight` slot both serializes transmissions and tags the frame so
//! the transmission outcome router can generate the matching confirm.

pub mod beacon;
pub mod command;
pub mod constants;
pub mod dispatch;
pub mod indirect;
pub mod mcps;
pub mod mlme;
pub mod pib;
pub mod state;
pub mod status;
pub mod timers;
pub mod tx_status;

#[cfg(test)]
pub(crate) mod testutil;

use heapless::Deque;

use crate::frame::{Address, FrameRepr, GtsCharacteristics, FCS_LEN};
use crate::phy::{Clock, CsmaMode, FrameBuffer, Radio, RadioError};

pub use command::{CommandId, MacEvent, MacRequest};
pub use status::MacStatus;

use beacon::BeaconContext;
use mlme::associate::AssociateRequest;
use mlme::gts::GtsContext;
use mlme::scan::ScanContext;
use mlme::start::StartRequest;
use indirect::IndirectQueue;
use pib::Pib;
use state::{MacState, PollState, ScanState, SuperframeState, SyncState};
use timers::{TimerTable, Timeout};

/// Capacity of the NHLE request queue.
const REQUEST_QUEUE_CAPACITY: usize = 4;

/// Capacity of the queue of received, not yet processed frames.
const RX_QUEUE_CAPACITY: usize = 4;

/// Capacity of the MAC to NHLE confirm/indication queue.
const EVENT_QUEUE_CAPACITY: usize = 8;

/// The next higher layer entity: receives every confirm and indication
/// the MAC produces.
pub trait UpperLayer {
    /// Deliver one confirm or indication. Invoked from `wpan_task`, at
    /// most once per call.
    fn mac_event(&mut self, event: MacEvent);
}

/// What kind of frame sits in a transmission queue, deciding which
/// confirm its terminal transmission status produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueuedKind {
    /// An MCPS data frame.
    Data { handle: u8 },
    /// An association response, always sent indirectly.
    AssociationResponse,
    /// A disassociation notification sent indirectly.
    Disassociation,
}

/// A frame waiting in the indirect, broadcast or GTS queue.
#[cfg_attr(feature = "std", derive(Debug))]
#[derive(Clone)]
pub(crate) struct QueuedFrame {
    pub buffer: FrameBuffer,
    pub kind: QueuedKind,
    pub dst_pan_id: u16,
    pub dst_address: Address,
    /// Set while the frame is handed to the radio; the entry stays
    /// queued until a terminal transmission status arrives.
    pub in_transit: bool,
    /// Remaining lifetime in units of aBaseSuperframeDuration.
    pub lifetime: u16,
}

/// The tag of the one transmission (or energy scan) currently owned by
/// the radio. Holding a value is what "MAC busy" means; the variant tells
/// the outcome router which state machine the completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InFlightTx {
    /// A directly transmitted MCPS data frame.
    Data { handle: u8 },
    /// A broadcast data frame drained from the broadcast queue.
    BroadcastData { handle: u8 },
    /// A frame from the indirect queue, marked in transit there.
    IndirectTransaction,
    /// A frame from a GTS queue, marked in transit there.
    GtsData { coordinator: bool, index: u8 },
    /// A null data frame answering an empty poll.
    NullFrame,
    /// An on-demand beacon answering a beacon request command.
    Beacon,
    /// A beacon request command, transmitted during an active scan.
    BeaconRequest,
    /// An orphan notification command, transmitted during an orphan scan.
    OrphanNotification,
    /// A data request command polling the coordinator.
    DataRequest { explicit: bool },
    /// An association request command.
    AssociationRequest,
    /// A directly transmitted disassociation notification.
    Disassociation {
        own: bool,
        pan_id: u16,
        device_address: Address,
    },
    /// A coordinator realignment command answering an orphan
    /// notification.
    OrphanRealignment {
        pan_id: u16,
        device_address: Address,
    },
    /// A broadcast coordinator realignment command preceding a PAN
    /// reconfiguration.
    CoordRealignment,
    /// A PAN ID conflict notification command.
    PanIdConflict,
    /// A GTS request command.
    GtsRequest {
        characteristics: GtsCharacteristics,
    },
    /// An energy-detect measurement; completed by `ed_scan_done` instead
    /// of `tx_done`.
    EdScan,
}

/// The MAC sublayer service.
pub struct MacService<R: Radio, C: Clock, U: UpperLayer> {
    pub(crate) radio: R,
    pub(crate) clock: C,
    pub(crate) upper_layer: U,
    /// PAN Information Base.
    pub pib: Pib,
    pub(crate) state: MacState,
    pub(crate) poll_state: PollState,
    pub(crate) scan_state: ScanState,
    pub(crate) sync_state: SyncState,
    pub(crate) superframe_state: SuperframeState,
    pub(crate) radio_sleeping: bool,
    /// Set while an MLME-RX-ENABLE window keeps the receiver on.
    pub(crate) rx_enabled: bool,
    pub(crate) in_flight: Option<InFlightTx>,
    pub(crate) timers: TimerTable,
    pub(crate) requests: Deque<MacRequest, REQUEST_QUEUE_CAPACITY>,
    pub(crate) rx_frames: Deque<FrameBuffer, RX_QUEUE_CAPACITY>,
    pub(crate) events: Deque<MacEvent, EVENT_QUEUE_CAPACITY>,
    pub(crate) indirect: IndirectQueue,
    pub(crate) beacon: BeaconContext,
    pub(crate) gts: GtsContext,
    pub(crate) scan: Option<ScanContext>,
    /// The association request a device is currently carrying out.
    pub(crate) pending_association: Option<AssociateRequest>,
    /// The start request waiting for its realignment broadcast to finish.
    pub(crate) pending_start: Option<StartRequest>,
}

impl<R: Radio, C: Clock, U: UpperLayer> MacService<R, C, U> {
    /// Create a new MAC service around a radio, a time source and the
    /// next higher layer.
    pub fn new(radio: R, clock: C, upper_layer: U) -> Self {
        Self {
            radio,
            clock,
            upper_layer,
            pib: Pib::default(),
            state: MacState::default(),
            poll_state: PollState::default(),
            scan_state: ScanState::default(),
            sync_state: SyncState::default(),
            superframe_state: SuperframeState::default(),
            radio_sleeping: false,
            rx_enabled: false,
            in_flight: None,
            timers: TimerTable::default(),
            requests: Deque::new(),
            rx_frames: Deque::new(),
            events: Deque::new(),
            indirect: IndirectQueue::default(),
            beacon: BeaconContext::default(),
            gts: GtsContext::default(),
            scan: None,
            pending_association: None,
            pending_start: None,
        }
    }

    /// Queue an MLME/MCPS request for processing. Returns the request
    /// when the queue is full.
    pub fn post_request(&mut self, request: MacRequest) -> Result<(), MacRequest> {
        self.requests.push_back(request).map_err(|request| {
            warn!("request queue full, rejecting request");
            request
        })
    }

    /// Hand a received frame to the MAC. Called by the radio integration
    /// for every frame that passed filtering and FCS validation.
    pub fn frame_received(&mut self, frame: FrameBuffer) {
        if self.rx_frames.push_back(frame).is_err() {
            warn!("rx queue full, dropping frame");
        }
    }

    /// Run one step of the MAC task. Returns `true` when any work was
    /// done; the host should keep calling until it returns `false`.
    pub fn wpan_task(&mut self) -> bool {
        self.service_timers();

        if let Some(event) = self.events.pop_front() {
            self.upper_layer.mac_event(event);
            return true;
        }

        if self.in_flight.is_none() {
            if let Some(frame) = self.rx_frames.pop_front() {
                self.process_tal_frame(frame);
                return true;
            }

            if let Some(request) = self.requests.pop_front() {
                self.dispatch_request(request);
                return true;
            }
        }

        false
    }

    /// Queue a confirm or indication towards the upper layer.
    pub(crate) fn queue_event(&mut self, event: MacEvent) {
        if self.events.push_back(event).is_err() {
            // Nothing sensible left to do with the event.
            warn!("event queue full, dropping confirm/indication");
        }
    }

    /// Hand a frame to the radio and record the in-flight tag.
    ///
    /// On acceptance, exactly one [`tx_done`](Self::tx_done) call will
    /// clear the tag again.
    pub(crate) fn start_transmission(
        &mut self,
        frame: &FrameBuffer,
        csma: CsmaMode,
        retries: bool,
        tag: InFlightTx,
    ) -> Result<(), RadioError> {
        debug_assert!(self.in_flight.is_none(), "transmission already in flight");

        self.trx_wakeup();
        self.radio.transmit(frame, csma, retries)?;
        self.in_flight = Some(tag);
        Ok(())
    }

    /// Mark the MAC busy with a non-transmission radio operation.
    pub(crate) fn set_in_flight(&mut self, tag: InFlightTx) {
        debug_assert!(self.in_flight.is_none(), "MAC is already busy");
        self.in_flight = Some(tag);
    }

    /// Clear the in-flight tag. Called exactly once per completed radio
    /// operation, from the transmission outcome router.
    pub(crate) fn take_in_flight(&mut self) -> Option<InFlightTx> {
        debug_assert!(self.in_flight.is_some(), "MAC was not busy");
        self.in_flight.take()
    }

    /// Wake the transceiver up if it is sleeping.
    pub(crate) fn trx_wakeup(&mut self) {
        if self.radio_sleeping {
            self.radio.wakeup();
            self.radio_sleeping = false;
        }
    }

    /// Put the transceiver to sleep when no activity requires it to stay
    /// awake.
    pub(crate) fn sleep_trans(&mut self) {
        let active_superframe = self.pib.beacon_enabled()
            && self.superframe_state != SuperframeState::Inactive;

        let busy = self.in_flight.is_some()
            || self.rx_enabled
            || self.pib.rx_on_when_idle
            || self.scan_state != ScanState::Idle
            || self.poll_state != PollState::Idle
            || active_superframe
            || self.sync_state == SyncState::TrackingBeacon
            || self.sync_state == SyncState::BeforeAssoc;

        if busy {
            return;
        }

        self.radio.rx_enable(false);
        if !self.radio_sleeping {
            self.radio.sleep();
            self.radio_sleeping = true;
        }
    }

    /// Return the node to the idle state, as after a disassociation or a
    /// failed start.
    pub(crate) fn idle_trans(&mut self) {
        self.state = MacState::Idle;
        self.poll_state = PollState::Idle;
        self.sync_state = SyncState::Never;
        self.superframe_state = SuperframeState::Cap;

        self.timers.stop(Timeout::Beacon);
        self.timers.stop(Timeout::BeaconPreparation);
        self.timers.stop(Timeout::SuperframeEnd);
        self.timers.stop(Timeout::MissedBeacon);
        self.timers.stop(Timeout::PollWait);

        self.pib.beacon_order = constants::NON_BEACON_ORDER;
        self.pib.superframe_order = constants::NON_BEACON_ORDER;
        self.pib.coord_short_address = constants::UNKNOWN_SHORT_ADDR;
        self.pib.coord_extended_address = None;
        self.pib.associated_pan_coord = false;

        self.sleep_trans();
    }

    /// Generate an MLME-COMM-STATUS.indication.
    pub(crate) fn comm_status(
        &mut self,
        pan_id: u16,
        src_address: Address,
        dst_address: Address,
        status: MacStatus,
    ) {
        self.queue_event(MacEvent::MlmeCommStatusIndication(
            command::CommStatusIndication {
                pan_id,
                src_address,
                dst_address,
                status,
            },
        ));
    }

    /// Expire due timers and run their continuations.
    fn service_timers(&mut self) {
        loop {
            let now = self.clock.now();
            let Some(timeout) = self.timers.next_due(now) else {
                break;
            };
            self.handle_timeout(timeout);
        }
    }

    fn handle_timeout(&mut self, timeout: Timeout) {
        match timeout {
            Timeout::Beacon => self.handle_beacon_timer(),
            Timeout::BeaconPreparation => self.handle_beacon_preparation_timer(),
            Timeout::SuperframeEnd => self.handle_superframe_end(),
            Timeout::CapEnd => self.handle_cap_end(),
            Timeout::GtsSlot(slot) => self.handle_gts_slot(slot),
            Timeout::ResponseWait => self.handle_response_wait_timeout(),
            Timeout::PollWait => self.handle_poll_wait_timeout(),
            Timeout::ScanDuration => self.handle_scan_duration_timeout(),
            Timeout::DataPersistence => self.handle_persistence_timeout(),
            Timeout::RxEnable => self.handle_rx_enable_timeout(),
            Timeout::MissedBeacon => self.handle_missed_beacon(),
        }
    }
}

/// Emit a frame representation into a fresh frame buffer, reserving the
/// FCS field in the PHY length.
pub(crate) fn frame_buffer_from(repr: &FrameRepr) -> FrameBuffer {
    let mut buffer = FrameBuffer::default();
    let len = repr.buffer_len();
    buffer.set_mpdu_len(len + FCS_LEN);
    repr.emit(&mut crate::frame::Frame::new_unchecked(
        &mut buffer.data[1..1 + len],
    ));
    buffer
}

#[cfg(test)]
mod tests {
    use super::constants::*;
    use super::mcps::data::{DataRequest, TxOptions};
    use super::mlme::gts::GtsEntryState;
    use super::mlme::scan::{ScanRequest, ScanType};
    use super::mlme::start::StartRequest;
    use super::state::{MacState, SyncState};
    use super::testutil::{drive, service, TestMac};
    use super::timers::Timeout;
    use super::*;
    use crate::frame::{
        AddressingMode, BeaconOrder, BeaconRepr, FrameBuilder, FramePayloadRepr,
        GtsCharacteristicsType, GtsDescriptor, GtsDirection, MacCommand, SuperframeOrder,
        SuperframeSpecificationRepr,
    };
    use crate::phy::TxStatus;
    use crate::time::Duration;

    use heapless::Vec as HVec;

    const EXTENDED: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    const PAN_ID: u16 = 0x1234;

    fn start_pan_coordinator(mac: &mut TestMac, beacon_order: u8, superframe_order: u8) {
        mac.pib.extended_address = Some(EXTENDED);
        mac.pib.short_address = 0x0000;
        mac.pib.association_permit = true;

        mac.post_request(MacRequest::MlmeStartRequest(StartRequest {
            pan_id: PAN_ID,
            channel: 11,
            channel_page: 0,
            beacon_order,
            superframe_order,
            pan_coordinator: true,
            battery_life_extension: false,
            coord_realignment: false,
        }))
        .unwrap();
        drive(mac);
    }

    fn incoming_data_request(from_short: u16) -> FrameBuffer {
        let repr = FrameBuilder::new_command(MacCommand::DataRequest)
            .set_sequence_number(0x11)
            .set_dst_pan_id(PAN_ID)
            .set_dst_address(Address::from_u16(0x0000))
            .set_src_pan_id(PAN_ID)
            .set_src_address(Address::from_u16(from_short))
            .finalize()
            .unwrap();
        frame_buffer_from(&repr)
    }

    fn incoming_beacon(src_pan_id: u16, src_short: u16, beacon: BeaconRepr) -> FrameBuffer {
        let repr = FrameBuilder::new_beacon(beacon)
            .set_sequence_number(0x42)
            .set_src_pan_id(src_pan_id)
            .set_src_address(Address::from_u16(src_short))
            .finalize()
            .unwrap();
        frame_buffer_from(&repr)
    }

    #[test]
    fn start_as_pan_coordinator_transmits_first_beacon() {
        let (mut mac, radio, _clock, events) = service();

        start_pan_coordinator(&mut mac, 6, 6);

        assert_eq!(mac.state, MacState::PanCoordStarted);
        assert!(mac.timers.is_armed(Timeout::Beacon));
        assert!(mac.timers.is_armed(Timeout::BeaconPreparation));
        assert_eq!(radio.state.borrow().beacons.len(), 1);

        assert!(events.borrow().iter().any(|event| matches!(
            event,
            MacEvent::MlmeStartConfirm(confirm) if confirm.status == MacStatus::Success
        )));
    }

    #[test]
    fn bsn_increments_per_transmitted_beacon() {
        let (mut mac, radio, clock, _events) = service();

        start_pan_coordinator(&mut mac, 6, 6);
        let first_bsn = radio.state.borrow().beacons[0].mpdu()[2];

        clock.advance(Duration::from_symbols(beacon_interval_symbols(6) + 60));
        drive(&mut mac);

        let beacons = radio.state.borrow().beacons.clone();
        assert_eq!(beacons.len(), 2);
        assert_eq!(beacons[1].mpdu()[2], first_bsn.wrapping_add(1));
    }

    #[test]
    fn dsn_increments_per_transmitted_data_frame() {
        let (mut mac, radio, _clock, events) = service();
        mac.pib.extended_address = Some(EXTENDED);
        mac.pib.short_address = 0x0001;
        mac.pib.pan_id = PAN_ID;

        for handle in 0..2u8 {
            let mut msdu = HVec::new();
            msdu.extend_from_slice(&[0xde, 0xad]).unwrap();

            mac.post_request(MacRequest::McpsDataRequest(DataRequest {
                src_addr_mode: AddressingMode::Short,
                dst_pan_id: PAN_ID,
                dst_address: Address::from_u16(0x0002),
                msdu,
                msdu_handle: handle,
                tx_options: TxOptions {
                    ack: true,
                    ..Default::default()
                },
            }))
            .unwrap();
            drive(&mut mac);
            mac.tx_done(TxStatus::Ok);
            drive(&mut mac);
        }

        let state = radio.state.borrow();
        assert_eq!(state.transmitted.len(), 2);
        let first_dsn = state.transmitted[0].0.mpdu()[2];
        assert_eq!(state.transmitted[1].0.mpdu()[2], first_dsn.wrapping_add(1));
        drop(state);

        let confirms = events
            .borrow()
            .iter()
            .filter(|event| matches!(event, MacEvent::McpsDataConfirm(_)))
            .count();
        assert_eq!(confirms, 2);
    }

    #[test]
    fn active_scan_visits_requested_channels_in_order() {
        let (mut mac, radio, clock, events) = service();
        mac.pib.extended_address = Some(EXTENDED);

        mac.post_request(MacRequest::MlmeScanRequest(ScanRequest {
            scan_type: ScanType::Active,
            scan_channels: 0b10110,
            scan_duration: 2,
            channel_page: 0,
        }))
        .unwrap();
        drive(&mut mac);

        // One beacon request per visited channel; a coordinator answers
        // on the first channel.
        assert_eq!(radio.tx_count(), 1);
        mac.tx_done(TxStatus::Ok);
        drive(&mut mac);

        let beacon = BeaconRepr {
            superframe_spec: SuperframeSpecificationRepr {
                beacon_order: BeaconOrder::Order(6),
                superframe_order: SuperframeOrder::Order(6),
                final_cap_slot: 0x0f,
                battery_life_extension: false,
                pan_coordinator: true,
                association_permit: true,
            },
            ..Default::default()
        };
        mac.frame_received(incoming_beacon(0xbeef, 0x0000, beacon));
        drive(&mut mac);

        for _ in 0..2 {
            clock.advance(Duration::from_symbols(scan_duration_symbols(2) + 10));
            drive(&mut mac);
            mac.tx_done(TxStatus::Ok);
            drive(&mut mac);
        }
        clock.advance(Duration::from_symbols(scan_duration_symbols(2) + 10));
        drive(&mut mac);

        assert_eq!(radio.tx_count(), 3);
        assert_eq!(radio.state.borrow().channel_history, [1, 2, 4]);

        let events = events.borrow();
        let confirm = events
            .iter()
            .find_map(|event| match event {
                MacEvent::MlmeScanConfirm(confirm) => Some(confirm.clone()),
                _ => None,
            })
            .expect("scan confirm");

        assert_eq!(confirm.status, MacStatus::Success);
        assert_eq!(confirm.unscanned_channels, 0);
        assert_eq!(confirm.pan_descriptors.len(), 1);
        assert_eq!(confirm.pan_descriptors[0].coord_pan_id, 0xbeef);
        assert_eq!(confirm.pan_descriptors[0].channel, 1);
    }

    #[test]
    fn empty_poll_answered_with_null_data_frame() {
        let (mut mac, radio, _clock, events) = service();
        start_pan_coordinator(&mut mac, 15, 15);

        mac.frame_received(incoming_data_request(0x0002));
        drive(&mut mac);

        let state = radio.state.borrow();
        assert_eq!(state.transmitted.len(), 1);
        let buffer = state.transmitted[0].0.clone();
        drop(state);

        let mpdu = buffer.mpdu();
        let frame = crate::frame::Frame::new(&mpdu[..mpdu.len() - FCS_LEN]).unwrap();
        let repr = FrameRepr::parse(&frame).unwrap();
        match repr.payload {
            FramePayloadRepr::Data(payload) => assert!(payload.is_empty()),
            _ => panic!("expected a null data frame"),
        }

        mac.tx_done(TxStatus::Ok);
        drive(&mut mac);

        // No frame was consumed, so no data confirm is generated.
        assert!(!events
            .borrow()
            .iter()
            .any(|event| matches!(event, MacEvent::McpsDataConfirm(_))));
    }

    #[test]
    fn indirect_frame_retried_until_terminal_success() {
        let (mut mac, radio, _clock, events) = service();
        start_pan_coordinator(&mut mac, 15, 15);

        let mut msdu = HVec::new();
        msdu.extend_from_slice(&[0x2a]).unwrap();
        mac.post_request(MacRequest::McpsDataRequest(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::from_u16(0x0002),
            msdu,
            msdu_handle: 42,
            tx_options: TxOptions {
                ack: true,
                indirect: true,
                ..Default::default()
            },
        }))
        .unwrap();
        drive(&mut mac);

        // Queued, not transmitted.
        assert_eq!(radio.tx_count(), 0);

        // First poll: the frame goes out but is never acknowledged, so it
        // stays queued.
        mac.frame_received(incoming_data_request(0x0002));
        drive(&mut mac);
        assert_eq!(radio.tx_count(), 1);
        mac.tx_done(TxStatus::NoAck);
        drive(&mut mac);

        assert!(!events
            .borrow()
            .iter()
            .any(|event| matches!(event, MacEvent::McpsDataConfirm(_))));
        assert!(mac
            .indirect
            .find(PAN_ID, &Address::from_u16(0x0002), 0)
            .is_some());

        // Second poll succeeds; only now the frame leaves the queue and
        // the deferred confirm is generated.
        mac.frame_received(incoming_data_request(0x0002));
        drive(&mut mac);
        assert_eq!(radio.tx_count(), 2);
        mac.tx_done(TxStatus::Ok);
        drive(&mut mac);

        assert!(events.borrow().iter().any(|event| matches!(
            event,
            MacEvent::McpsDataConfirm(confirm)
                if confirm.msdu_handle == 42 && confirm.status == MacStatus::Success
        )));
        assert!(mac
            .indirect
            .find(PAN_ID, &Address::from_u16(0x0002), 0)
            .is_none());
    }

    #[test]
    fn gts_allocation_confirmed_by_beacon_descriptor() {
        let (mut mac, _radio, _clock, events) = service();
        mac.pib.extended_address = Some(EXTENDED);
        mac.pib.short_address = 0x0005;
        mac.pib.pan_id = PAN_ID;
        mac.pib.coord_short_address = 0x0000;
        mac.pib.beacon_order = 6;
        mac.pib.superframe_order = 6;
        mac.state = MacState::Associated;
        mac.sync_state = SyncState::TrackingBeacon;

        let characteristics = crate::frame::GtsCharacteristics {
            length: 2,
            direction: GtsDirection::Receive,
            characteristics_type: GtsCharacteristicsType::Allocate,
        };

        mac.post_request(MacRequest::MlmeGtsRequest(super::mlme::gts::GtsRequest {
            characteristics,
        }))
        .unwrap();
        drive(&mut mac);
        mac.tx_done(TxStatus::Ok);
        drive(&mut mac);

        assert_eq!(mac.gts.device[1].state, GtsEntryState::ReqSent);

        let mut beacon = BeaconRepr {
            superframe_spec: SuperframeSpecificationRepr {
                beacon_order: BeaconOrder::Order(6),
                superframe_order: SuperframeOrder::Order(6),
                final_cap_slot: 0x0d,
                battery_life_extension: false,
                pan_coordinator: true,
                association_permit: true,
            },
            ..Default::default()
        };
        beacon
            .gts
            .descriptors
            .push(GtsDescriptor {
                short_address: 0x0005,
                starting_slot: 14,
                length: 2,
                direction: GtsDirection::Receive,
            })
            .unwrap();

        mac.frame_received(incoming_beacon(PAN_ID, 0x0000, beacon));
        drive(&mut mac);

        assert_eq!(mac.gts.device[1].state, GtsEntryState::Allocated);
        assert!(events.borrow().iter().any(|event| matches!(
            event,
            MacEvent::MlmeGtsConfirm(confirm) if confirm.status == MacStatus::Success
        )));

        // A second, conflicting allocation for the same direction is
        // rejected outright.
        mac.post_request(MacRequest::MlmeGtsRequest(super::mlme::gts::GtsRequest {
            characteristics,
        }))
        .unwrap();
        drive(&mut mac);

        assert!(events.borrow().iter().any(|event| matches!(
            event,
            MacEvent::MlmeGtsConfirm(confirm)
                if confirm.status == MacStatus::InvalidParameter
        )));
    }

    #[test]
    fn coordinator_gts_allocation_respects_cap_minimum() {
        let (mut mac, _radio, _clock, events) = service();
        start_pan_coordinator(&mut mac, 6, 0);

        // With superframe order zero a slot is only 60 symbols; nine
        // slots would shrink the CAP below aMinCAPLength.
        let repr = FrameBuilder::new_command(MacCommand::GtsRequest(
            crate::frame::GtsCharacteristics {
                length: 9,
                direction: GtsDirection::Transmit,
                characteristics_type: GtsCharacteristicsType::Allocate,
            },
        ))
        .set_sequence_number(9)
        .set_dst_pan_id(PAN_ID)
        .set_dst_address(Address::from_u16(0x0000))
        .set_src_pan_id(PAN_ID)
        .set_src_address(Address::from_u16(0x0007))
        .finalize()
        .unwrap();
        mac.frame_received(frame_buffer_from(&repr));
        drive(&mut mac);

        // The request is answered with a denied descriptor, never an
        // indication.
        assert_eq!(mac.gts.coord.len(), 1);
        assert_eq!(mac.gts.coord[0].starting_slot, 0);
        assert_eq!(mac.beacon.final_cap_slot, FINAL_CAP_SLOT_DEFAULT);
        assert!(!events
            .borrow()
            .iter()
            .any(|event| matches!(event, MacEvent::MlmeGtsIndication(_))));
    }
}
