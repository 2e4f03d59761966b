//! In-memory tile image cache with LRU eviction and request coalescing.
//!
//! The cache guarantees at most one underlying fetch per tile key: a
//! request for a key that is already being fetched waits for the in-flight
//! result over a channel instead of issuing a duplicate network call.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::RgbaImage;

use crate::fetch::{TileError, TileFetcher};
use crate::index::TileId;

/// A decoded tile ready for compositing.
pub type TileImage = Arc<RgbaImage>;

/// Default cache bound in tiles (~128 MB of 256x256 RGBA worst case).
pub const DEFAULT_CAPACITY: usize = 512;

struct CacheEntry {
    image: TileImage,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(image: TileImage) -> Self {
        Self {
            image,
            last_accessed: Instant::now(),
        }
    }

    fn touch(&mut self) -> TileImage {
        self.last_accessed = Instant::now();
        Arc::clone(&self.image)
    }
}

struct CacheState {
    entries: HashMap<TileId, CacheEntry>,
    /// Waiters registered for a key whose fetch is in flight. Presence of
    /// the key marks the fetch as in flight even with no waiters yet.
    in_flight: HashMap<TileId, Vec<Sender<Option<TileImage>>>>,
}

/// Bounded tile image cache shared between the render pass and the fetch
/// pool. Entries live until evicted; eviction is LRU by entry count.
pub struct TileCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Non-blocking lookup; touches the entry on a hit.
    pub fn get(&self, id: TileId) -> Option<TileImage> {
        let mut state = self.state.lock().unwrap();
        state.entries.get_mut(&id).map(CacheEntry::touch)
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.state.lock().unwrap().entries.contains_key(&id)
    }

    /// True when a fetch for the key is currently in flight.
    pub fn is_in_flight(&self, id: TileId) -> bool {
        self.state.lock().unwrap().in_flight.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().entries.clear();
    }

    /// Insert a decoded image, evicting least-recently-used entries to
    /// stay within capacity. Late insertions after the key stopped being
    /// visible are harmless.
    pub fn insert(&self, id: TileId, image: TileImage) {
        let mut state = self.state.lock().unwrap();
        Self::insert_locked(&mut state, self.capacity, id, image);
    }

    /// Resolve a tile: cache hit, wait on an in-flight fetch, or perform
    /// the fetch on the calling thread. A fetch or decode failure caches
    /// nothing and yields `None`; the tile is simply absent this frame.
    pub fn get_or_fetch(
        &self,
        id: TileId,
        url: &str,
        fetcher: &dyn TileFetcher,
    ) -> Option<TileImage> {
        let waiter = {
            let mut state = self.state.lock().unwrap();
            if let Some(entry) = state.entries.get_mut(&id) {
                return Some(entry.touch());
            }
            if let Some(waiters) = state.in_flight.get_mut(&id) {
                let (tx, rx) = mpsc::channel();
                waiters.push(tx);
                Some(rx)
            } else {
                state.in_flight.insert(id, Vec::new());
                None
            }
        };

        if let Some(rx) = waiter {
            log::debug!("coalescing request for tile {id}");
            return rx.recv().ok().flatten();
        }

        // This thread owns the fetch; the lock is released while it runs.
        let result = fetcher
            .fetch(url)
            .and_then(|bytes| decode_tile(&bytes))
            .map(Arc::new);

        let mut state = self.state.lock().unwrap();
        let waiters = state.in_flight.remove(&id).unwrap_or_default();
        match result {
            Ok(image) => {
                Self::insert_locked(&mut state, self.capacity, id, Arc::clone(&image));
                for waiter in waiters {
                    let _ = waiter.send(Some(Arc::clone(&image)));
                }
                Some(image)
            }
            Err(err) => {
                log::warn!("tile {id} unavailable: {err}");
                for waiter in waiters {
                    let _ = waiter.send(None);
                }
                None
            }
        }
    }

    fn insert_locked(state: &mut CacheState, capacity: usize, id: TileId, image: TileImage) {
        while state.entries.len() >= capacity && !state.entries.contains_key(&id) {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    state.entries.remove(&key);
                    log::debug!("evicted tile {key} from cache");
                }
                None => break,
            }
        }
        state.entries.insert(id, CacheEntry::new(image));
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn decode_tile(bytes: &[u8]) -> Result<RgbaImage, TileError> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|err| TileError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;
    use std::thread;

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgba8(RgbaImage::new(2, 2));
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn tile_image() -> TileImage {
        Arc::new(RgbaImage::new(2, 2))
    }

    /// Fetcher returning a fixed payload, counting calls.
    struct CountingFetcher {
        payload: Result<Vec<u8>, TileError>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn ok() -> Self {
            Self {
                payload: Ok(png_bytes()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                payload: Err(TileError::Fetch("unreachable".into())),
                calls: AtomicUsize::new(0),
            }
        }

        fn garbage() -> Self {
            Self {
                payload: Ok(vec![0xDE, 0xAD, 0xBE, 0xEF]),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TileFetcher for CountingFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, TileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload.clone()
        }
    }

    /// Fetcher that signals when the fetch starts and blocks until released.
    struct BlockingFetcher {
        started: Sender<()>,
        release: Mutex<Receiver<()>>,
        calls: AtomicUsize,
    }

    impl TileFetcher for BlockingFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, TileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.started.send(());
            let _ = self.release.lock().unwrap().recv();
            Ok(png_bytes())
        }
    }

    #[test]
    fn test_hit_after_fetch() {
        let cache = TileCache::new(8);
        let fetcher = CountingFetcher::ok();
        let id = TileId::new(5, 1, 2);

        assert!(cache.get_or_fetch(id, "u", &fetcher).is_some());
        assert!(cache.get_or_fetch(id, "u", &fetcher).is_some());
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fetch_failure_caches_nothing() {
        let cache = TileCache::new(8);
        let fetcher = CountingFetcher::failing();
        let id = TileId::new(5, 1, 2);

        assert!(cache.get_or_fetch(id, "u", &fetcher).is_none());
        assert!(cache.is_empty());
        assert!(!cache.is_in_flight(id));
        // Not retried within a call, but a later call may try again.
        assert!(cache.get_or_fetch(id, "u", &fetcher).is_none());
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn test_decode_failure_caches_nothing() {
        let cache = TileCache::new(8);
        let fetcher = CountingFetcher::garbage();
        assert!(cache.get_or_fetch(TileId::new(3, 0, 0), "u", &fetcher).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_requests_coalesce_to_one_fetch() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let fetcher = Arc::new(BlockingFetcher {
            started: started_tx,
            release: Mutex::new(release_rx),
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(TileCache::new(8));
        let id = TileId::new(6, 10, 20);

        let first = {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            thread::spawn(move || cache.get_or_fetch(id, "u", fetcher.as_ref()))
        };
        // Wait until the first request's fetch is actually in flight.
        started_rx.recv().unwrap();

        let second = {
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            thread::spawn(move || cache.get_or_fetch(id, "u", fetcher.as_ref()))
        };
        while !cache.is_in_flight(id) {
            thread::yield_now();
        }

        release_tx.send(()).unwrap();
        let a = first.join().unwrap();
        let b = second.join().unwrap();

        assert!(a.is_some());
        assert!(b.is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lru_eviction_by_count() {
        let cache = TileCache::new(2);
        let first = TileId::new(1, 0, 0);
        let second = TileId::new(1, 1, 0);
        let third = TileId::new(1, 0, 1);

        cache.insert(first, tile_image());
        thread::sleep(std::time::Duration::from_millis(5));
        cache.insert(second, tile_image());
        thread::sleep(std::time::Duration::from_millis(5));
        // Touch the oldest so the middle entry becomes the LRU victim.
        assert!(cache.get(first).is_some());
        thread::sleep(std::time::Duration::from_millis(5));
        cache.insert(third, tile_image());

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(first));
        assert!(!cache.contains(second));
        assert!(cache.contains(third));
    }

    #[test]
    fn test_reinsert_does_not_evict_others() {
        let cache = TileCache::new(2);
        let a = TileId::new(1, 0, 0);
        let b = TileId::new(1, 1, 0);
        cache.insert(a, tile_image());
        cache.insert(b, tile_image());
        cache.insert(a, tile_image());
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(b));
    }

    #[test]
    fn test_late_insert_after_clear() {
        // A fetch completing after the visible set moved on must not
        // corrupt the cache.
        let cache = TileCache::new(4);
        let id = TileId::new(2, 1, 1);
        cache.insert(id, tile_image());
        cache.clear();
        cache.insert(id, tile_image());
        assert!(cache.contains(id));
    }
}
