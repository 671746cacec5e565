//! The interacting MAC state machines.

/// Overall role of the node within the PAN.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacState {
    /// The node is neither associated nor has it started a network.
    #[default]
    Idle,
    /// The device has successfully associated.
    Associated,
    /// A coordinator has started a network with the PAN ID of the PAN
    /// coordinator it is associated with.
    Coordinator,
    /// The PAN coordinator has successfully started its network.
    PanCoordStarted,
}

impl MacState {
    /// Query whether the node accepts requests that only a coordinator
    /// can serve.
    pub fn is_coordinator(&self) -> bool {
        matches!(self, MacState::Coordinator | MacState::PanCoordStarted)
    }
}

/// Status of an outstanding poll or association procedure. Not used by a
/// PAN coordinator.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    /// No polling ongoing.
    #[default]
    Idle,
    /// An association request frame was transmitted; awaiting the
    /// association response.
    AwaitAssocResponse,
    /// Explicit poll caused by an MLME-POLL.request; data request frame
    /// acknowledged, awaiting the data response.
    Explicit,
    /// Implicit poll caused by a pending-address match in a beacon or a
    /// frame-pending acknowledgment; awaiting the data response.
    Implicit,
}

/// Status of an ongoing channel scan. Mutually exclusive with polling.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// No scanning ongoing.
    #[default]
    Idle,
    /// Energy-detect scan ongoing.
    Ed,
    /// Active scan ongoing.
    Active,
    /// Passive scan ongoing.
    Passive,
    /// Orphan scan ongoing.
    Orphan,
}

/// How beacons of the parent coordinator are tracked.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Do not track beacons.
    #[default]
    Never,
    /// Track the next beacon only.
    Once,
    /// Track beacons continuously.
    TrackingBeacon,
    /// Track beacons continuously before association, in order to obtain
    /// synchronization with the desired network.
    BeforeAssoc,
}

/// Position within the superframe of a beacon-enabled network.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuperframeState {
    /// The contention access period.
    #[default]
    Cap,
    /// The contention-free period, currently in the given superframe
    /// slot.
    Cfp(u8),
    /// The inactive portion of the superframe.
    Inactive,
}
