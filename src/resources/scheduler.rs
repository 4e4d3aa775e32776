//! Concurrent asset loading.
//!
//! [`AssetLoadScheduler`] issues load requests without blocking the caller and runs
//! them out of band: on the tokio runtime natively, on the browser's microtask queue
//! on the web. Completion handlers never touch shared state directly. Instead they
//! return a [`Mutation`] that is sent through a single channel and applied by whoever
//! owns the receiver, which makes the receiver the only place state is changed.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::resources::{Asset, AssetKind, AssetSource, LoadError, LoadFuture};

/// A deferred change to `T`, produced off the main loop and applied on it.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) + Send>;

#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> MaybeSend for T {}

/// Browser futures are single threaded and need not be `Send`.
#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSend for T {}

/// One asset to load. Consumed by the scheduler exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub kind: AssetKind,
    pub source: String,
}

impl LoadRequest {
    pub fn new(kind: AssetKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn mesh(source: impl Into<String>) -> Self {
        Self::new(AssetKind::Mesh, source)
    }

    pub fn texture(source: impl Into<String>) -> Self {
        Self::new(AssetKind::Texture, source)
    }

    pub fn font(source: impl Into<String>) -> Self {
        Self::new(AssetKind::Font, source)
    }
}

pub struct AssetLoadScheduler<T: 'static> {
    source: Arc<dyn AssetSource>,
    updates: UnboundedSender<Mutation<T>>,
    pending: Arc<AtomicUsize>,
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Handle,
}

impl<T: 'static> Clone for AssetLoadScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            updates: self.updates.clone(),
            pending: self.pending.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static> AssetLoadScheduler<T> {
    /// Creates a scheduler and the receiving end of its update channel.
    ///
    /// Natively this must be called from within a tokio runtime; use
    /// [`with_handle`](Self::with_handle) otherwise.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(source: impl AssetSource) -> anyhow::Result<(Self, UnboundedReceiver<Mutation<T>>)> {
        let runtime = tokio::runtime::Handle::try_current()?;
        Ok(Self::with_handle(source, runtime))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new(source: impl AssetSource) -> anyhow::Result<(Self, UnboundedReceiver<Mutation<T>>)> {
        let (updates, receiver) = unbounded();
        let scheduler = Self {
            source: Arc::new(source),
            updates,
            pending: Arc::new(AtomicUsize::new(0)),
        };
        Ok((scheduler, receiver))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_handle(
        source: impl AssetSource,
        runtime: tokio::runtime::Handle,
    ) -> (Self, UnboundedReceiver<Mutation<T>>) {
        let (updates, receiver) = unbounded();
        let scheduler = Self {
            source: Arc::new(source),
            updates,
            pending: Arc::new(AtomicUsize::new(0)),
            runtime,
        };
        (scheduler, receiver)
    }

    /// The future of a single request. Nothing happens until it is polled.
    pub fn load(&self, request: LoadRequest) -> LoadFuture {
        let LoadRequest { kind, source } = request;
        let fut = self.source.load(kind, &source);
        Box::pin(async move {
            let asset = fut.await?;
            if asset.kind() != kind {
                return Err(LoadError::wrong_kind(&source, kind, asset.kind()));
            }
            Ok(asset)
        })
    }

    /// Loads `request` in the background and calls exactly one of the continuations.
    ///
    /// `on_complete` may return a mutation, which is queued for the owner of the
    /// update channel. Failures are final, the request is never retried.
    pub fn submit<F, E>(&self, request: LoadRequest, on_complete: F, on_error: E)
    where
        F: FnOnce(Asset) -> Option<Mutation<T>> + MaybeSend + 'static,
        E: FnOnce(LoadError) + MaybeSend + 'static,
    {
        let path = request.source.clone();
        let fut = self.load(request);
        let updates = self.updates.clone();
        self.spawn(async move {
            if updates.is_closed() {
                on_error(LoadError::Cancelled { path });
                return None;
            }
            match fut.await {
                Ok(asset) => on_complete(asset),
                Err(err) => {
                    on_error(err);
                    None
                }
            }
        });
    }

    /// Runs `task` in the background and queues the mutation it resolves to, if any.
    pub fn spawn<Fut>(&self, task: Fut)
    where
        Fut: Future<Output = Option<Mutation<T>>> + MaybeSend + 'static,
    {
        let updates = self.updates.clone();
        let pending = self.pending.clone();
        pending.fetch_add(1, Ordering::SeqCst);
        let task = async move {
            if let Some(update) = task.await {
                if updates.unbounded_send(update).is_err() {
                    log::debug!("Dropping a finished load, nobody is receiving updates anymore");
                }
            }
            // only after the update is queued, so `pending() == 0` means all are visible
            pending.fetch_sub(1, Ordering::SeqCst);
        };
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.runtime.spawn(task);
        }
        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(task);
        }
    }

    /// Number of spawned loads that have not settled yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
