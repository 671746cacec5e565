//! The queued primitives exchanged with the next higher layer.
//!
//! Every primitive carries a fixed command identifier; the identifiers of
//! requests, confirms and indications share one id space, which is also
//! what the serialized host interface uses as the first body octet of a
//! tagged buffer.

use crate::frame::Address;

use super::beacon::BeaconNotifyIndication;
use super::mcps::data::{DataConfirm, DataIndication, DataRequest};
use super::mcps::purge::{PurgeConfirm, PurgeRequest};
use super::mlme::associate::{
    AssociateConfirm, AssociateIndication, AssociateRequest, AssociateResponse,
};
use super::mlme::disassociate::{
    DisassociateConfirm, DisassociateIndication, DisassociateRequest,
};
use super::mlme::get::{GetConfirm, GetRequest};
use super::mlme::gts::{GtsConfirm, GtsIndication, GtsRequest};
use super::mlme::orphan::{OrphanIndication, OrphanResponse};
use super::mlme::poll::{PollConfirm, PollRequest};
use super::mlme::reset::{ResetConfirm, ResetRequest};
use super::mlme::rx_enable::{RxEnableConfirm, RxEnableRequest};
use super::mlme::scan::{ScanConfirm, ScanRequest};
use super::mlme::set::SetConfirm;
use super::mlme::start::{StartConfirm, StartRequest};
use super::mlme::sync::{SyncLossIndication, SyncRequest};
use super::pib::PibValue;
use super::status::MacStatus;

/// The command identifiers of every queued primitive. The values are part
/// of the host protocol and must not change.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    TalDataIndication = 0x00,

    MlmeAssociateRequest = 0x01,
    MlmeAssociateResponse = 0x02,
    MlmeDisassociateRequest = 0x03,
    MlmeGetRequest = 0x04,
    MlmeOrphanResponse = 0x05,
    MlmeResetRequest = 0x06,
    MlmeRxEnableRequest = 0x07,
    MlmeScanRequest = 0x08,
    MlmeSetRequest = 0x09,
    MlmeStartRequest = 0x0a,
    MlmeSyncRequest = 0x0b,
    MlmePollRequest = 0x0c,
    McpsDataRequest = 0x0d,
    McpsPurgeRequest = 0x0e,
    MlmeGtsRequest = 0x0f,

    McpsDataConfirm = 0x10,
    McpsDataIndication = 0x11,
    McpsPurgeConfirm = 0x12,
    MlmeAssociateIndication = 0x13,
    MlmeAssociateConfirm = 0x14,
    MlmeBeaconNotifyIndication = 0x15,
    MlmeCommStatusIndication = 0x16,
    MlmeDisassociateConfirm = 0x17,
    MlmeDisassociateIndication = 0x18,
    MlmeGetConfirm = 0x19,
    MlmeOrphanIndication = 0x1a,
    MlmePollConfirm = 0x1b,
    MlmeResetConfirm = 0x1c,
    MlmeRxEnableConfirm = 0x1d,
    MlmeScanConfirm = 0x1e,
    MlmeSetConfirm = 0x1f,
    MlmeStartConfirm = 0x20,
    MlmeSyncLossIndication = 0x21,
    MlmeGtsConfirm = 0x22,
    MlmeGtsIndication = 0x23,

    MacIncFrame = 0x24,
}

/// An MLME-COMM-STATUS.indication, reporting the outcome of a
/// transmission initiated by a response primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommStatusIndication {
    pub pan_id: u16,
    pub src_address: Address,
    pub dst_address: Address,
    pub status: MacStatus,
}

/// A request primitive queued from the NHLE towards the MAC.
#[derive(Debug, Clone)]
pub enum MacRequest {
    McpsDataRequest(DataRequest),
    McpsPurgeRequest(PurgeRequest),
    MlmeAssociateRequest(AssociateRequest),
    MlmeAssociateResponse(AssociateResponse),
    MlmeDisassociateRequest(DisassociateRequest),
    MlmeGetRequest(GetRequest),
    MlmeGtsRequest(GtsRequest),
    MlmeOrphanResponse(OrphanResponse),
    MlmeResetRequest(ResetRequest),
    MlmeRxEnableRequest(RxEnableRequest),
    MlmeScanRequest(ScanRequest),
    MlmeSetRequest(PibValue),
    MlmeStartRequest(StartRequest),
    MlmeSyncRequest(SyncRequest),
    MlmePollRequest(PollRequest),
}

impl MacRequest {
    /// Return the command identifier of the request.
    pub fn command_id(&self) -> CommandId {
        match self {
            Self::McpsDataRequest(_) => CommandId::McpsDataRequest,
            Self::McpsPurgeRequest(_) => CommandId::McpsPurgeRequest,
            Self::MlmeAssociateRequest(_) => CommandId::MlmeAssociateRequest,
            Self::MlmeAssociateResponse(_) => CommandId::MlmeAssociateResponse,
            Self::MlmeDisassociateRequest(_) => CommandId::MlmeDisassociateRequest,
            Self::MlmeGetRequest(_) => CommandId::MlmeGetRequest,
            Self::MlmeGtsRequest(_) => CommandId::MlmeGtsRequest,
            Self::MlmeOrphanResponse(_) => CommandId::MlmeOrphanResponse,
            Self::MlmeResetRequest(_) => CommandId::MlmeResetRequest,
            Self::MlmeRxEnableRequest(_) => CommandId::MlmeRxEnableRequest,
            Self::MlmeScanRequest(_) => CommandId::MlmeScanRequest,
            Self::MlmeSetRequest(_) => CommandId::MlmeSetRequest,
            Self::MlmeStartRequest(_) => CommandId::MlmeStartRequest,
            Self::MlmeSyncRequest(_) => CommandId::MlmeSyncRequest,
            Self::MlmePollRequest(_) => CommandId::MlmePollRequest,
        }
    }
}

/// A confirm or indication primitive queued from the MAC towards the
/// NHLE.
#[derive(Debug, Clone)]
pub enum MacEvent {
    McpsDataConfirm(DataConfirm),
    McpsDataIndication(DataIndication),
    McpsPurgeConfirm(PurgeConfirm),
    MlmeAssociateIndication(AssociateIndication),
    MlmeAssociateConfirm(AssociateConfirm),
    MlmeBeaconNotifyIndication(BeaconNotifyIndication),
    MlmeCommStatusIndication(CommStatusIndication),
    MlmeDisassociateConfirm(DisassociateConfirm),
    MlmeDisassociateIndication(DisassociateIndication),
    MlmeGetConfirm(GetConfirm),
    MlmeGtsConfirm(GtsConfirm),
    MlmeGtsIndication(GtsIndication),
    MlmeOrphanIndication(OrphanIndication),
    MlmePollConfirm(PollConfirm),
    MlmeResetConfirm(ResetConfirm),
    MlmeRxEnableConfirm(RxEnableConfirm),
    MlmeScanConfirm(ScanConfirm),
    MlmeSetConfirm(SetConfirm),
    MlmeStartConfirm(StartConfirm),
    MlmeSyncLossIndication(SyncLossIndication),
}

impl MacEvent {
    /// Return the command identifier of the confirm or indication.
    pub fn command_id(&self) -> CommandId {
        match self {
            Self::McpsDataConfirm(_) => CommandId::McpsDataConfirm,
            Self::McpsDataIndication(_) => CommandId::McpsDataIndication,
            Self::McpsPurgeConfirm(_) => CommandId::McpsPurgeConfirm,
            Self::MlmeAssociateIndication(_) => CommandId::MlmeAssociateIndication,
            Self::MlmeAssociateConfirm(_) => CommandId::MlmeAssociateConfirm,
            Self::MlmeBeaconNotifyIndication(_) => CommandId::MlmeBeaconNotifyIndication,
            Self::MlmeCommStatusIndication(_) => CommandId::MlmeCommStatusIndication,
            Self::MlmeDisassociateConfirm(_) => CommandId::MlmeDisassociateConfirm,
            Self::MlmeDisassociateIndication(_) => CommandId::MlmeDisassociateIndication,
            Self::MlmeGetConfirm(_) => CommandId::MlmeGetConfirm,
            Self::MlmeGtsConfirm(_) => CommandId::MlmeGtsConfirm,
            Self::MlmeGtsIndication(_) => CommandId::MlmeGtsIndication,
            Self::MlmeOrphanIndication(_) => CommandId::MlmeOrphanIndication,
            Self::MlmePollConfirm(_) => CommandId::MlmePollConfirm,
            Self::MlmeResetConfirm(_) => CommandId::MlmeResetConfirm,
            Self::MlmeRxEnableConfirm(_) => CommandId::MlmeRxEnableConfirm,
            Self::MlmeScanConfirm(_) => CommandId::MlmeScanConfirm,
            Self::MlmeSetConfirm(_) => CommandId::MlmeSetConfirm,
            Self::MlmeStartConfirm(_) => CommandId::MlmeStartConfirm,
            Self::MlmeSyncLossIndication(_) => CommandId::MlmeSyncLossIndication,
        }
    }
}
