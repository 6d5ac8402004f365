use jukebox_catalog::models::{Category, ClientId, ResolvedItem};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Entries live for a day unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Longer TTLs are clamped to this; `Instant` cannot be pushed arbitrarily far
/// into the future.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

pub type CacheKey = (ClientId, Category);

/// Counter bumped every time a client's cached categories are invalidated.
///
/// Taken before resolving, it lets [`CategoryCache::put_if_current()`] refuse
/// results computed from entries that have since changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    items: Vec<ResolvedItem>,
    expires_at: Instant,
}
impl CacheEntry {
    fn new(items: Vec<ResolvedItem>, ttl: Duration) -> Self {
        Self {
            items,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, CacheEntry>,
    generations: HashMap<ClientId, Generation>,
}
impl State {
    fn generation(&self, client: &ClientId) -> Generation {
        self.generations.get(client).copied().unwrap_or_default()
    }
}

/// Per-(client, category) time-bounded store of resolved items.
///
/// Entries are only ever replaced whole, never patched. A read before expiry
/// returns exactly the list last stored for that key (same items, same order);
/// a read after expiry returns `None`, never stale data.
///
/// # Examples
///
/// ```
/// use jukebox_cache::CategoryCache;
/// use jukebox_catalog::models::{Category, ClientId};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = CategoryCache::default();
/// let client = ClientId::from("kitchen");
/// cache.put(&client, Category::Music, Vec::new()).await;
/// assert!(cache.is_valid(&client, Category::Music).await);
/// assert!(!cache.is_valid(&client, Category::Radio).await);
/// # }
/// ```
#[derive(Debug)]
pub struct CategoryCache {
    ttl: Duration,
    state: RwLock<State>,
}
impl Default for CategoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
impl CategoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_TTL),
            state: RwLock::new(State::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(client: &ClientId, category: Category) -> CacheKey {
        (client.clone(), category)
    }

    /// Fresh items for the key, or `None` if absent or expired.
    pub async fn get(&self, client: &ClientId, category: Category) -> Option<Vec<ResolvedItem>> {
        let state = self.state.read().await;
        let entry = state.entries.get(&Self::key(client, category))?;
        if !entry.is_valid_at(Instant::now()) {
            tracing::debug!(%client, %category, "Cache entry expired");
            return None;
        }
        tracing::debug!(%client, %category, items = entry.items.len(), "Cache hit");
        Some(entry.items.clone())
    }

    /// Store (or overwrite) the items for a key, expiring one TTL from now.
    pub async fn put(&self, client: &ClientId, category: Category, items: Vec<ResolvedItem>) {
        let entry = CacheEntry::new(items, self.ttl);
        self.state.write().await.entries.insert(Self::key(client, category), entry);
    }

    /// The client's current generation, to be passed back to
    /// [`put_if_current()`](Self::put_if_current).
    pub async fn generation(&self, client: &ClientId) -> Generation {
        self.state.read().await.generation(client)
    }

    /// Like [`put()`](Self::put), but only if the client has not been
    /// invalidated since `generation` was taken. Returns whether the items
    /// were stored.
    pub async fn put_if_current(
        &self,
        client: &ClientId,
        category: Category,
        items: Vec<ResolvedItem>,
        generation: Generation,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation(client) != generation {
            tracing::debug!(%client, %category, "Discarding items resolved before invalidation");
            return false;
        }
        state.entries.insert(Self::key(client, category), CacheEntry::new(items, self.ttl));
        true
    }

    pub async fn is_valid(&self, client: &ClientId, category: Category) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .await
            .entries
            .get(&Self::key(client, category))
            .is_some_and(|entry| entry.is_valid_at(now))
    }

    /// Drop every category cached for one client and start a new generation
    /// for it.
    pub async fn invalidate(&self, client: &ClientId) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|(owner, _), _| owner != client);
        let removed = before - state.entries.len();
        let next = Generation(state.generation(client).0.wrapping_add(1));
        state.generations.insert(client.clone(), next);
        tracing::debug!(%client, removed, "Invalidated cached categories");
        removed
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_valid_at(now));
        before - state.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn items(titles: &[&str]) -> Vec<ResolvedItem> {
        titles
            .iter()
            .map(|title| ResolvedItem::catalog(title.to_lowercase(), *title, Category::Audiobook))
            .collect()
    }

    fn client() -> ClientId {
        ClientId::from("livingroom")
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_preserves_order() {
        let cache = CategoryCache::default();
        let stored = items(&["Zebra", "Apple", "Mango"]);
        cache.put(&client(), Category::Audiobook, stored.clone()).await;
        tokio::time::advance(DEFAULT_TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get(&client(), Category::Audiobook).await, Some(stored));
    }

    #[rstest]
    #[case::at_expiry(Duration::ZERO)]
    #[case::after_expiry(Duration::from_secs(3600))]
    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_absent(#[case] past: Duration) {
        let cache = CategoryCache::default();
        cache.put(&client(), Category::Music, items(&["One"])).await;
        tokio::time::advance(DEFAULT_TTL + past).await;
        assert_eq!(cache.get(&client(), Category::Music).await, None);
        assert!(!cache.is_valid(&client(), Category::Music).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_extends() {
        let cache = CategoryCache::new(Duration::from_secs(100));
        cache.put(&client(), Category::Music, items(&["Old"])).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        cache.put(&client(), Category::Music, items(&["New"])).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get(&client(), Category::Music).await, Some(items(&["New"])));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = CategoryCache::default();
        let other = ClientId::from("bedroom");
        cache.put(&client(), Category::Music, items(&["Mine"])).await;
        assert_eq!(cache.get(&client(), Category::Radio).await, None);
        assert_eq!(cache.get(&other, Category::Music).await, None);
    }

    #[tokio::test]
    async fn test_invalidate_only_touches_one_client() {
        let cache = CategoryCache::default();
        let other = ClientId::from("bedroom");
        cache.put(&client(), Category::Music, items(&["A"])).await;
        cache.put(&client(), Category::Radio, items(&["B"])).await;
        cache.put(&other, Category::Music, items(&["C"])).await;
        assert_eq!(cache.invalidate(&client()).await, 2);
        assert!(!cache.is_valid(&client(), Category::Music).await);
        assert!(cache.is_valid(&other, Category::Music).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = CategoryCache::new(Duration::from_secs(10));
        cache.put(&client(), Category::Music, items(&["A"])).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.put(&client(), Category::Radio, items(&["B"])).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_valid(&client(), Category::Radio).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_clamped() {
        let cache = CategoryCache::new(Duration::MAX);
        assert_eq!(cache.ttl(), MAX_TTL);
        cache.put(&client(), Category::Music, items(&["Forever"])).await;
        tokio::time::advance(DEFAULT_TTL * 365).await;
        assert_eq!(cache.get(&client(), Category::Music).await, Some(items(&["Forever"])));
    }

    #[tokio::test]
    async fn test_put_if_current_rejects_after_invalidate() {
        let cache = CategoryCache::default();
        let other = ClientId::from("bedroom");
        let before = cache.generation(&client()).await;
        let other_before = cache.generation(&other).await;
        cache.invalidate(&client()).await;
        assert!(!cache.put_if_current(&client(), Category::Music, items(&["Stale"]), before).await);
        assert_eq!(cache.get(&client(), Category::Music).await, None);
        // Other clients keep their generation.
        assert!(cache.put_if_current(&other, Category::Music, items(&["Theirs"]), other_before).await);

        let current = cache.generation(&client()).await;
        assert_ne!(current, before);
        assert!(cache.put_if_current(&client(), Category::Music, items(&["Fresh"]), current).await);
        assert_eq!(cache.get(&client(), Category::Music).await, Some(items(&["Fresh"])));
    }
}
