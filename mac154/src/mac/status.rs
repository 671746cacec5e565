//! MAC status codes carried by confirms and indications.

use crate::phy::TxStatus;

/// IEEE 802.15.4-2006 MAC status codes, values per Table 78.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacStatus {
    Success = 0x00,
    /// A received frame was secured, but security is not available.
    UnsupportedSecurity = 0xdf,
    /// The beacon of the coordinator was lost while synchronized.
    BeaconLoss = 0xe0,
    /// The CSMA-CA mechanism never found a clear channel.
    ChannelAccessFailure = 0xe1,
    /// The request was denied by the coordinator.
    Denied = 0xe2,
    /// The frame is too long to fit its slot or superframe.
    FrameTooLong = 0xe5,
    /// The requested GTS operation is not valid.
    InvalidGts = 0xe6,
    /// No queued frame matches the given handle.
    InvalidHandle = 0xe7,
    /// A request parameter is out of range or unsupported.
    InvalidParameter = 0xe8,
    /// No acknowledgment was received after all retries.
    NoAck = 0xe9,
    /// No beacon was received during a scan or synchronization attempt.
    NoBeacon = 0xea,
    /// A poll finished without pending data at the coordinator.
    NoData = 0xeb,
    /// The device has no short address.
    NoShortAddress = 0xec,
    /// A PAN identifier conflict was detected and reported.
    PanIdConflict = 0xee,
    /// A coordinator realignment command was received.
    Realignment = 0xef,
    /// An indirect transaction expired before it was retrieved.
    TransactionExpired = 0xf0,
    /// The indirect transaction queue is full.
    TransactionOverflow = 0xf1,
    /// The PIB attribute is not supported.
    UnsupportedAttribute = 0xf4,
    /// The addressing of a request is inconsistent.
    InvalidAddress = 0xf5,
    /// The scan result storage limit was reached.
    LimitReached = 0xfa,
    /// The PIB attribute is read-only.
    ReadOnly = 0xfb,
    /// Another scan is already in progress.
    ScanInProgress = 0xfc,
}

impl From<TxStatus> for MacStatus {
    fn from(status: TxStatus) -> Self {
        match status {
            TxStatus::Ok | TxStatus::FramePending => MacStatus::Success,
            TxStatus::NoAck => MacStatus::NoAck,
            TxStatus::ChannelAccessFailure => MacStatus::ChannelAccessFailure,
            TxStatus::FrameTooLong => MacStatus::FrameTooLong,
        }
    }
}
