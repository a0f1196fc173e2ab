//! The location state machine.
//!
//! [`LocationStateMachine`] owns the single current-location slot
//! (`status`, `data`, `error`) and is the only writer of it. An acquisition
//! cycle walks
//!
//! ```text
//! requesting_permission -> fetching_location -> fetching_address -> success
//!          |                      |                    |
//!   permission_denied           error                error
//! ```
//!
//! Each cycle is tagged with a generation number when it starts. Every write a
//! cycle makes is conditional on its generation still being the latest, so a
//! slow cycle that finishes after a newer one (or after a clear or a manual
//! pick) is dropped instead of overwriting fresher state.
//!
//! The handle is cheap to clone. Consumers read [`LocationStateMachine::snapshot`]
//! or follow changes through [`LocationStateMachine::subscribe`].

use crate::acquirer::CoordinateAcquirer;
use crate::error::LocationError;
use crate::models::{AddressComponents, LocationData, LocationStatus};
use crate::platform::PermissionService;
use crate::resolver::AddressResolver;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Read-only view of the location slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationState {
    pub status: LocationStatus,
    pub data: Option<LocationData>,
    pub error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl LocationState {
    /// Generation of the last operation that wrote this state.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// How a [`LocationStateMachine::refresh_location`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to completion and wrote this terminal status.
    Applied(LocationStatus),
    /// A newer cycle, clear or manual pick took over; nothing was written.
    Superseded,
}

/// The collaborators one acquisition cycle needs.
pub struct LocationPipeline {
    pub permissions: Arc<dyn PermissionService>,
    pub acquirer: CoordinateAcquirer,
    pub resolver: AddressResolver,
}

struct Inner {
    pipeline: LocationPipeline,
    slot: watch::Sender<LocationState>,
}

#[derive(Clone)]
pub struct LocationStateMachine {
    inner: Arc<Inner>,
}

impl LocationStateMachine {
    pub fn new(pipeline: LocationPipeline) -> Self {
        let (slot, _) = watch::channel(LocationState::default());
        Self {
            inner: Arc::new(Inner { pipeline, slot }),
        }
    }

    /// Creates the machine and, when `auto_fetch` is set, starts exactly one
    /// acquisition cycle in the background. Must be called inside a Tokio
    /// runtime. Location is never re-fetched on a timer.
    pub fn launch(pipeline: LocationPipeline, auto_fetch: bool) -> Self {
        let machine = Self::new(pipeline);
        if auto_fetch {
            let background = machine.clone();
            tokio::spawn(async move {
                background.refresh_location().await;
            });
        }
        machine
    }

    pub fn snapshot(&self) -> LocationState {
        self.inner.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.inner.slot.subscribe()
    }

    /// Runs a full acquisition cycle from `requesting_permission`, whatever the
    /// current state. Starting a new cycle supersedes any cycle in flight.
    pub async fn refresh_location(&self) -> CycleOutcome {
        let generation = self.begin_cycle();
        info!(generation, "Starting location cycle");

        let outcome = match self.run_cycle(generation).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(generation, "Location fetch error: {}", err);
                let status = match err {
                    LocationError::PermissionDenied => LocationStatus::PermissionDenied,
                    _ => LocationStatus::Error,
                };
                let message = err.to_string();
                self.apply(generation, status, |state| state.error = Some(message))
            }
        };

        match outcome {
            CycleOutcome::Applied(status) => info!(generation, %status, "Location cycle finished"),
            CycleOutcome::Superseded => {
                debug!(generation, "Location cycle superseded, result dropped")
            }
        }
        outcome
    }

    /// Back to `idle` with no data and no error. No external calls.
    pub fn clear_location(&self) {
        self.inner.slot.send_modify(|state| {
            state.generation += 1;
            state.status = LocationStatus::Idle;
            state.data = None;
            state.error = None;
        });
    }

    /// Adopts a location chosen elsewhere (e.g. the picker) as the current one.
    /// Status becomes `success`, the error is cleared, and any cycle still in
    /// flight is superseded.
    pub fn set_location_data(&self, data: LocationData) {
        self.inner.slot.send_modify(|state| {
            state.generation += 1;
            state.status = LocationStatus::Success;
            state.data = Some(data);
            state.error = None;
        });
    }

    fn begin_cycle(&self) -> u64 {
        let mut generation = 0;
        self.inner.slot.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.status = LocationStatus::RequestingPermission;
            state.error = None;
        });
        generation
    }

    /// Writes `status` (and whatever `update` changes) only if `generation` is
    /// still the latest. Watchers are not notified of dropped writes.
    fn apply(
        &self,
        generation: u64,
        status: LocationStatus,
        update: impl FnOnce(&mut LocationState),
    ) -> CycleOutcome {
        let applied = self.inner.slot.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.status = status;
            update(state);
            true
        });

        if applied {
            CycleOutcome::Applied(status)
        } else {
            CycleOutcome::Superseded
        }
    }

    fn advance(&self, generation: u64, status: LocationStatus) -> bool {
        self.apply(generation, status, |_| {}) != CycleOutcome::Superseded
    }

    async fn has_permission(&self) -> bool {
        let permissions = &self.inner.pipeline.permissions;

        match permissions.check().await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => warn!("Permission check failed: {}", e),
        }

        match permissions.request().await {
            Ok(granted) => granted,
            Err(e) => {
                warn!("Permission request failed: {}", e);
                false
            }
        }
    }

    async fn run_cycle(&self, generation: u64) -> Result<CycleOutcome, LocationError> {
        let pipeline = &self.inner.pipeline;

        if !self.has_permission().await {
            return Err(LocationError::PermissionDenied);
        }

        if !self.advance(generation, LocationStatus::FetchingLocation) {
            return Ok(CycleOutcome::Superseded);
        }
        let coords = pipeline.acquirer.acquire_coordinates().await?;

        if !self.advance(generation, LocationStatus::FetchingAddress) {
            return Ok(CycleOutcome::Superseded);
        }
        let outcome = match pipeline.resolver.resolve_address(coords).await {
            Ok(address) => {
                let data = LocationData::new(coords, address);
                self.apply(generation, LocationStatus::Success, |state| {
                    state.data = Some(data);
                    state.error = None;
                })
            }
            Err(err) => {
                // The fix is still good; keep it with a blank address.
                error!(generation, "Address resolution failed for {}: {}", coords, err);
                let data = LocationData::new(coords, AddressComponents::default());
                let message = err.to_string();
                self.apply(generation, LocationStatus::Error, |state| {
                    state.data = Some(data);
                    state.error = Some(message);
                })
            }
        };

        Ok(outcome)
    }
}
