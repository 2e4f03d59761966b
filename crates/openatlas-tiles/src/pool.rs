//! Worker pool that takes tile fetches off the render thread.
//!
//! The render pass requests tiles it is missing and keeps drawing; workers
//! fetch and decode in the background, populate the shared [`TileCache`],
//! and post a redraw signal the host render loop polls. The pool records
//! the generation each tile was last requested in; bumping the generation
//! at the start of a frame makes queued requests best-effort cancellable,
//! while re-requesting a tile refreshes its recorded generation so tiles
//! visible across frames are never starved. A fetch already in flight
//! always completes and populates the cache; late completion never
//! corrupts it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::cache::TileCache;
use crate::fetch::TileFetcher;
use crate::index::TileId;

struct WorkItem {
    id: TileId,
    url: String,
}

pub struct FetchPool {
    cache: Arc<TileCache>,
    work_tx: Sender<WorkItem>,
    redraw_rx: Mutex<Receiver<TileId>>,
    /// Queued tiles mapped to the generation they were last requested in.
    queued: Arc<Mutex<HashMap<TileId, u64>>>,
    generation: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl FetchPool {
    /// Spawn `workers` fetch threads over a shared work queue.
    pub fn new(workers: usize, cache: Arc<TileCache>, fetcher: Arc<dyn TileFetcher>) -> Self {
        let workers = workers.max(1);
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>();
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (redraw_tx, redraw_rx) = mpsc::channel();
        let queued = Arc::new(Mutex::new(HashMap::new()));
        let generation = Arc::new(AtomicU64::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        log::info!("starting tile fetch pool with {workers} workers");

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            let work_rx = Arc::clone(&work_rx);
            let redraw_tx = redraw_tx.clone();
            let queued = Arc::clone(&queued);
            let generation = Arc::clone(&generation);
            let shutdown = Arc::clone(&shutdown);

            let handle = thread::Builder::new()
                .name(format!("tile-fetch-{i}"))
                .spawn(move || {
                    Self::worker_loop(
                        cache, fetcher, work_rx, redraw_tx, queued, generation, shutdown,
                    );
                })
                .expect("failed to spawn tile fetch worker");
            handles.push(handle);
        }

        Self {
            cache,
            work_tx,
            redraw_rx: Mutex::new(redraw_rx),
            queued,
            generation,
            shutdown,
            workers: handles,
        }
    }

    fn worker_loop(
        cache: Arc<TileCache>,
        fetcher: Arc<dyn TileFetcher>,
        work_rx: Arc<Mutex<Receiver<WorkItem>>>,
        redraw_tx: Sender<TileId>,
        queued: Arc<Mutex<HashMap<TileId, u64>>>,
        generation: Arc<AtomicU64>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            let item = {
                let receiver = work_rx.lock().unwrap();
                receiver.recv_timeout(Duration::from_millis(100))
            };
            let item = match item {
                Ok(item) => item,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            // Drop the item unless the tile was requested again in the
            // current generation; a re-request refreshes the recorded
            // generation, so only tiles no frame still wants are dropped.
            let current = generation.load(Ordering::SeqCst);
            {
                let mut queued = queued.lock().unwrap();
                let still_wanted = matches!(queued.get(&item.id), Some(&gen) if gen >= current);
                if !still_wanted {
                    queued.remove(&item.id);
                    log::debug!("dropping stale fetch request for tile {}", item.id);
                    continue;
                }
            }

            let result = cache.get_or_fetch(item.id, &item.url, fetcher.as_ref());
            queued.lock().unwrap().remove(&item.id);
            if result.is_some() {
                let _ = redraw_tx.send(item.id);
            }
        }
    }

    /// Queue a fetch for a tile that missed the cache. Non-blocking; a
    /// tile already cached, queued, or in flight is not queued again, but
    /// a request for a queued tile refreshes its recorded generation and
    /// keeps the queued item live across [`FetchPool::begin_frame`].
    pub fn request(&self, id: TileId, url: String) {
        if self.cache.contains(id) || self.cache.is_in_flight(id) {
            return;
        }
        let current = self.generation.load(Ordering::SeqCst);
        {
            let mut queued = self.queued.lock().unwrap();
            if let Some(latest) = queued.get_mut(&id) {
                *latest = current;
                return;
            }
            queued.insert(id, current);
        }
        let item = WorkItem { id, url };
        if self.work_tx.send(item).is_err() {
            log::warn!("tile fetch pool is shut down; dropping request for {id}");
            self.queued.lock().unwrap().remove(&id);
        }
    }

    /// Invalidate requests queued before this call. Tiles the new frame
    /// still wants are re-requested during its render pass, refreshing
    /// their recorded generation; anything not re-requested is dropped
    /// when a worker picks it up.
    pub fn begin_frame(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Drain tiles completed since the last poll. A non-empty result means
    /// the host should schedule a redraw.
    pub fn poll_completed(&self) -> Vec<TileId> {
        let receiver = self.redraw_rx.lock().unwrap();
        receiver.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.queued.lock().unwrap().len()
    }
}

impl Drop for FetchPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
