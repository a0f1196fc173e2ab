//! Manual location picker: debounced place search plus selection.
//!
//! Every keystroke cancels the search scheduled by the previous one and
//! schedules a new one after the debounce delay, so only the query the user
//! settled on reaches the provider. Searches already in flight are not
//! aborted; instead every query gets a sequence number and a response is only
//! adopted if no newer query has been typed since.
//!
//! Selecting a prediction resolves its details and hands the result to the
//! [`LocationStateMachine`] through `set_location_data`. While that is in
//! flight `is_selecting` is set and further selections are refused.

use crate::error::LocationError;
use crate::models::{LocationData, PlacePrediction};
use crate::places::PlaceSearchClient;
use crate::state::{CycleOutcome, LocationStateMachine};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the picker UI renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickerState {
    pub visible: bool,
    pub query: String,
    pub predictions: Vec<PlacePrediction>,
    pub is_searching: bool,
    pub is_selecting: bool,
    seq: u64,
}

struct Inner {
    places: PlaceSearchClient,
    location: LocationStateMachine,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<PickerState>,
}

#[derive(Clone)]
pub struct LocationPicker {
    inner: Arc<Inner>,
}

impl LocationPicker {
    pub fn new(
        places: PlaceSearchClient,
        location: LocationStateMachine,
        debounce: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PickerState::default());
        Self {
            inner: Arc::new(Inner {
                places,
                location,
                debounce,
                pending: Mutex::new(None),
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> PickerState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PickerState> {
        self.inner.state.subscribe()
    }

    pub fn open(&self) {
        self.inner.state.send_modify(|state| state.visible = true);
    }

    /// Hides the picker and forgets the query, its predictions and any
    /// scheduled search.
    pub fn close(&self) {
        self.cancel_pending();
        self.inner.state.send_modify(|state| {
            state.seq += 1;
            state.visible = false;
            state.query.clear();
            state.predictions.clear();
            state.is_searching = false;
        });
    }

    pub fn clear_query(&self) {
        self.on_query_change("");
    }

    /// Records the new query text and schedules a search for it.
    ///
    /// Queries too short to search clear the predictions right away.
    pub fn on_query_change(&self, text: impl Into<String>) {
        let query = text.into();
        self.cancel_pending();

        let searchable = self.inner.places.is_searchable(&query);
        let mut seq = 0;
        self.inner.state.send_modify(|state| {
            state.seq += 1;
            seq = state.seq;
            state.query = query.clone();
            if !searchable {
                state.predictions.clear();
                state.is_searching = false;
            }
        });

        if !searchable {
            return;
        }

        let picker = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(picker.inner.debounce).await;
            // Detached so that a later keystroke only cancels the timer, never
            // a request already on the wire.
            tokio::spawn(async move { picker.run_search(seq, query).await });
        });
        *self.lock_pending() = Some(handle);
    }

    /// Resolves `prediction` and makes it the current location.
    ///
    /// Fails with [`LocationError::SelectionInProgress`] while another
    /// selection is running. Detail errors are returned to the caller only;
    /// the shared location state is left untouched.
    pub async fn select(
        &self,
        prediction: &PlacePrediction,
    ) -> Result<LocationData, LocationError> {
        let mut claimed = false;
        self.inner.state.send_if_modified(|state| {
            if state.is_selecting {
                return false;
            }
            state.is_selecting = true;
            claimed = true;
            true
        });
        if !claimed {
            return Err(LocationError::SelectionInProgress);
        }

        let result = self.inner.places.resolve_prediction(prediction).await;
        self.inner.state.send_modify(|state| state.is_selecting = false);

        match &result {
            Ok(data) => {
                info!("Selected place {} ({})", data.address.primary_text, data.coords);
                self.inner.location.set_location_data(data.clone());
                self.close();
            }
            Err(e) => warn!("Place details error: {}", e),
        }
        result
    }

    /// Closes the picker and runs a normal GPS acquisition cycle instead.
    pub async fn use_current_location(&self) -> CycleOutcome {
        self.close();
        self.inner.location.refresh_location().await
    }

    async fn run_search(&self, seq: u64, query: String) {
        let started = self.inner.state.send_if_modified(|state| {
            if state.seq != seq {
                return false;
            }
            state.is_searching = true;
            true
        });
        if !started {
            return;
        }

        let bias = self.inner.location.snapshot().data.map(|d| d.coords);
        let predictions = self.inner.places.search_places(&query, bias).await;

        let adopted = self.inner.state.send_if_modified(|state| {
            if state.seq != seq {
                return false;
            }
            state.predictions = predictions;
            state.is_searching = false;
            true
        });
        if !adopted {
            debug!("Dropping stale results for {:?}", query);
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.lock_pending().take() {
            handle.abort();
        }
    }
}
