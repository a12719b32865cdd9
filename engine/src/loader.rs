//! Data-source integration: async boundaries backed by fetch functions.
//!
//! A [`Loader`] is created per render. Every boundary it builds registers
//! with it, which is what lets pre-seeded values (known before rendering, or
//! arriving later) short-circuit fetches, and what lets the loader report each
//! resolution as a [`Chunk`] and collect the prefetch payload.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures_util::FutureExt;
use futures_util::future::{self, Either, Shared};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use strand_core::{AsyncBoundary, ResolveFuture, View};
use strand_types::{BoundaryId, Chunk, LoadError, LoadState, PrefetchPayload};

/// Maps a boundary's state to the content its fragment shows.
pub type ViewFn = Rc<dyn Fn(&LoadState) -> View>;

type Fetch = Box<dyn FnOnce() -> ResolveFuture>;
type Listener = Rc<dyn Fn(&BoundaryId, &Value)>;

#[derive(Default)]
struct Registry {
    boundaries: RefCell<HashMap<BoundaryId, Weak<LoadBoundary>>>,
    seeded: RefCell<HashMap<BoundaryId, Value>>,
    resolved: RefCell<PrefetchPayload>,
    listeners: RefCell<Vec<Listener>>,
}

impl Registry {
    fn record(&self, id: &BoundaryId, value: &Value) {
        self.resolved.borrow_mut().insert(id, value.clone());
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(id, value);
        }
    }
}

/// Per-render registry of data boundaries.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct Loader {
    registry: Rc<Registry>,
}

impl Loader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader whose boundaries resolve from `initial` without fetching.
    #[must_use]
    pub fn with_initial(initial: PrefetchPayload) -> Self {
        let loader = Self::new();
        loader.seed(initial);
        loader
    }

    /// Build a boundary view.
    ///
    /// `fetch` runs at most once, and never when a value for `id` is seeded
    /// before the boundary is resolved.
    pub fn load<F, Fut, T, E, V>(&self, id: BoundaryId, fetch: F, view: V) -> View
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        T: Serialize,
        E: fmt::Display,
        V: Fn(&LoadState) -> View + 'static,
    {
        View::Load(self.boundary(id, fetch, view))
    }

    /// Like [`Loader::load`], returning the boundary handle itself.
    pub fn boundary<F, Fut, T, E, V>(&self, id: BoundaryId, fetch: F, view: V) -> Rc<LoadBoundary>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        T: Serialize,
        E: fmt::Display,
        V: Fn(&LoadState) -> View + 'static,
    {
        let fetch_id = id.clone();
        let fetch: Fetch = Box::new(move || {
            let pending = fetch();
            async move {
                let value = pending
                    .await
                    .map_err(|err| LoadError::new(fetch_id.clone(), err))?;
                serde_json::to_value(value).map_err(|err| LoadError::new(fetch_id, err))
            }
            .boxed_local()
        });

        let state = match self.registry.seeded.borrow().get(&id) {
            Some(value) => LoadState::Ready(value.clone()),
            None => LoadState::Pending,
        };

        let boundary = Rc::new(LoadBoundary {
            id: id.clone(),
            state: RefCell::new(state),
            fetch: RefCell::new(Some(fetch)),
            in_flight: RefCell::new(None),
            seed_signal: RefCell::new(None),
            announced: Cell::new(false),
            view: Rc::new(view),
            registry: Rc::clone(&self.registry),
        });

        let previous = self
            .registry
            .boundaries
            .borrow_mut()
            .insert(id, Rc::downgrade(&boundary));
        if previous.is_some_and(|old| old.strong_count() > 0) {
            tracing::debug!(id = %boundary.id, "Boundary id registered twice; newest wins");
        }
        boundary
    }

    /// Supply a value for `id`.
    ///
    /// A registered boundary takes it immediately; otherwise it is buffered
    /// and applied when a boundary with that id registers. A fetch that has
    /// not started is skipped, and one already in flight is abandoned.
    pub fn set_data(&self, id: &BoundaryId, value: Value) {
        self.registry
            .seeded
            .borrow_mut()
            .insert(id.clone(), value.clone());
        let live = self
            .registry
            .boundaries
            .borrow()
            .get(id)
            .and_then(Weak::upgrade);
        if let Some(boundary) = live {
            boundary.set_data(value);
        }
    }

    /// Supply many values at once. See [`Loader::set_data`].
    pub fn seed(&self, payload: PrefetchPayload) {
        for (raw, value) in payload {
            match BoundaryId::new(raw) {
                Ok(id) => self.set_data(&id, value),
                Err(err) => tracing::warn!("Ignoring seeded value: {err}"),
            }
        }
    }

    /// Register a callback invoked once per boundary that resolves with a value,
    /// in settlement order. Failures are never reported here.
    pub fn on_resolve(&self, listener: impl Fn(&BoundaryId, &Value) + 'static) {
        self.registry.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Receive every resolution as a [`Chunk`].
    #[must_use]
    pub fn chunk_channel(&self) -> mpsc::UnboundedReceiver<Chunk> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_resolve(move |id, value| {
            // A dropped receiver just means nobody is listening any more.
            let _ = tx.send(Chunk::new(id.clone(), value.clone()));
        });
        rx
    }

    /// Every value resolved so far, keyed by boundary id.
    #[must_use]
    pub fn data(&self) -> PrefetchPayload {
        self.registry.resolved.borrow().clone()
    }

    /// The live boundary registered under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &BoundaryId) -> Option<Rc<LoadBoundary>> {
        self.registry
            .boundaries
            .borrow()
            .get(id)
            .and_then(Weak::upgrade)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("registered", &self.registry.boundaries.borrow().len())
            .field("resolved", &self.registry.resolved.borrow().len())
            .finish_non_exhaustive()
    }
}

/// An async boundary backed by a one-shot fetch.
pub struct LoadBoundary {
    id: BoundaryId,
    state: RefCell<LoadState>,
    fetch: RefCell<Option<Fetch>>,
    in_flight: RefCell<Option<Shared<ResolveFuture>>>,
    seed_signal: RefCell<Option<oneshot::Sender<Value>>>,
    announced: Cell<bool>,
    view: ViewFn,
    registry: Rc<Registry>,
}

impl LoadBoundary {
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Record the fetch outcome. A value seeded while the fetch was in flight
    /// takes precedence over whatever the fetch produced.
    fn settle(&self, outcome: Result<Value, LoadError>) -> Result<Value, LoadError> {
        self.in_flight.borrow_mut().take();
        self.seed_signal.borrow_mut().take();
        let settled = {
            let mut state = self.state.borrow_mut();
            match (&*state, outcome) {
                (LoadState::Ready(seeded), _) => Ok(seeded.clone()),
                (_, Ok(value)) => {
                    *state = LoadState::Ready(value.clone());
                    Ok(value)
                }
                (_, Err(err)) => {
                    *state = LoadState::Failed(err.clone());
                    Err(err)
                }
            }
        };
        match &settled {
            Ok(value) => self.announce(value),
            Err(err) => tracing::debug!(id = %self.id, "Boundary fetch failed: {}", err.message()),
        }
        settled
    }

    fn announce(&self, value: &Value) {
        if self.announced.replace(true) {
            return;
        }
        tracing::debug!(id = %self.id, "Boundary resolved");
        self.registry.record(&self.id, value);
    }
}

impl AsyncBoundary for LoadBoundary {
    fn id(&self) -> &BoundaryId {
        &self.id
    }

    fn resolve(self: Rc<Self>) -> ResolveFuture {
        if let Some(shared) = self.in_flight.borrow().as_ref() {
            return shared.clone().boxed_local();
        }

        let settled = match &*self.state.borrow() {
            LoadState::Ready(value) => Some(Ok(value.clone())),
            LoadState::Failed(err) => Some(Err(err.clone())),
            LoadState::Pending => None,
        };
        if let Some(outcome) = settled {
            return async move {
                if let Ok(value) = &outcome {
                    self.announce(value);
                }
                outcome
            }
            .boxed_local();
        }

        let Some(fetch) = self.fetch.borrow_mut().take() else {
            let err = LoadError::new(self.id.clone(), "fetch was abandoned before settling");
            return future::ready(Err(err)).boxed_local();
        };

        let (seed_tx, seed_rx) = oneshot::channel();
        *self.seed_signal.borrow_mut() = Some(seed_tx);

        let this = Rc::clone(&self);
        let shared = async move {
            // A value seeded mid-flight settles the boundary without waiting
            // for the fetch, which is dropped.
            let outcome = match future::select(fetch(), seed_rx).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right((Ok(seeded), _)) => Ok(seeded),
                Either::Right((Err(_), pending)) => pending.await,
            };
            this.settle(outcome)
        }
        .boxed_local()
        .shared();
        *self.in_flight.borrow_mut() = Some(shared.clone());
        shared.boxed_local()
    }

    fn data(&self) -> Option<Value> {
        self.state.borrow().value().cloned()
    }

    fn set_data(&self, value: Value) {
        if self.announced.get() {
            self.registry.resolved.borrow_mut().insert(&self.id, value.clone());
        }
        *self.state.borrow_mut() = LoadState::Ready(value.clone());
        if let Some(signal) = self.seed_signal.borrow_mut().take() {
            // The receiver is gone only if the in-flight future was dropped.
            let _ = signal.send(value);
        }
    }

    fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Ready(_))
    }

    fn is_settled(&self) -> bool {
        !self.state.borrow().is_pending()
    }

    fn view(&self) -> View {
        (self.view)(&self.state.borrow())
    }
}

impl fmt::Debug for LoadBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadBoundary")
            .field("id", &self.id)
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}
