//! In-memory [`LedgerStore`] with optimistic concurrency control.
//!
//! Every document (and every match roster, as a collection) carries a
//! version. A transaction remembers the version of everything it reads and
//! buffers its writes. At commit the store re-checks those versions under
//! its lock: if any moved, the commit fails with
//! [`LedgerError::Conflict`] and nothing is applied. Otherwise all writes
//! land at once and their versions are bumped.
//!
//! The lock is held only for individual reads and for the commit, never
//! across the caller's closure.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Mutex, MutexGuard},
};

use matchpot_types::{
    AuditEntry, LedgerError, Match, MatchId, MatchPlayer, PaymentRequest, RequestId, Result,
    UserId, Wallet,
};

use crate::store::{LedgerStore, LedgerTransaction, RequestFilter};

/// Version key of a document or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DocKey {
    Wallet(UserId),
    Request(RequestId),
    Match(MatchId),
    Roster(MatchId),
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wallet(u) => write!(f, "wallets/{u}"),
            Self::Request(r) => write!(f, "requests/{r}"),
            Self::Match(m) => write!(f, "matches/{m}"),
            Self::Roster(m) => write!(f, "matches/{m}/players"),
        }
    }
}

#[derive(Default)]
struct State {
    wallets: HashMap<UserId, Wallet>,
    requests: BTreeMap<RequestId, PaymentRequest>,
    matches: HashMap<MatchId, Match>,
    players: BTreeMap<(MatchId, UserId), MatchPlayer>,
    audit: Vec<AuditEntry>,
    versions: HashMap<DocKey, u64>,
    commits: u64,
}

impl State {
    fn version(&self, key: DocKey) -> u64 {
        self.versions.get(&key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: DocKey) {
        *self.versions.entry(key).or_insert(0) += 1;
    }
}

/// Reference ledger store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Store("in-memory store lock poisoned".into()))
    }

    /// Committed wallet, if any.
    pub fn wallet(&self, user_id: UserId) -> Result<Option<Wallet>> {
        Ok(self.lock()?.wallets.get(&user_id).cloned())
    }

    /// Every committed wallet.
    pub fn wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self.lock()?.wallets.values().cloned().collect())
    }

    /// Committed audit trail, oldest first.
    pub fn audit_log(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.lock()?.audit.clone())
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> Result<u64> {
        Ok(self.lock()?.commits)
    }
}

impl LedgerStore for InMemoryStore {
    fn run_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTransaction) -> Result<T>,
    {
        let mut tx = MemoryTransaction::new(self);
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn query_requests(&self, filter: &RequestFilter) -> Result<Vec<PaymentRequest>> {
        let state = self.lock()?;
        Ok(state
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

/// One open transaction: observed versions plus buffered writes.
struct MemoryTransaction<'s> {
    store: &'s InMemoryStore,
    observed: HashMap<DocKey, u64>,
    wallets: HashMap<UserId, Wallet>,
    requests: HashMap<RequestId, PaymentRequest>,
    matches: HashMap<MatchId, Match>,
    players: BTreeMap<(MatchId, UserId), MatchPlayer>,
    audit: Vec<AuditEntry>,
}

impl<'s> MemoryTransaction<'s> {
    fn new(store: &'s InMemoryStore) -> Self {
        Self {
            store,
            observed: HashMap::new(),
            wallets: HashMap::new(),
            requests: HashMap::new(),
            matches: HashMap::new(),
            players: BTreeMap::new(),
            audit: Vec::new(),
        }
    }

    /// Remember the first version seen for `key`.
    fn observe(&mut self, state: &State, key: DocKey) {
        self.observed
            .entry(key)
            .or_insert_with(|| state.version(key));
    }

    fn commit(self) -> Result<()> {
        let store = self.store;
        let mut state = store.lock()?;

        for (key, seen) in &self.observed {
            if state.version(*key) != *seen {
                tracing::debug!(key = %key, "Optimistic commit rejected");
                return Err(LedgerError::Conflict(format!("{key} changed concurrently")));
            }
        }

        for (user_id, wallet) in self.wallets {
            state.wallets.insert(user_id, wallet);
            state.bump(DocKey::Wallet(user_id));
        }
        for (id, request) in self.requests {
            state.requests.insert(id, request);
            state.bump(DocKey::Request(id));
        }
        for (id, record) in self.matches {
            state.matches.insert(id, record);
            state.bump(DocKey::Match(id));
        }
        for (key, player) in self.players {
            state.players.insert(key, player);
            state.bump(DocKey::Roster(key.0));
        }
        state.audit.extend(self.audit);
        state.commits += 1;
        Ok(())
    }
}

impl LedgerTransaction for MemoryTransaction<'_> {
    fn wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>> {
        if let Some(w) = self.wallets.get(&user_id) {
            return Ok(Some(w.clone()));
        }
        let store = self.store;
        let state = store.lock()?;
        self.observe(&state, DocKey::Wallet(user_id));
        Ok(state.wallets.get(&user_id).cloned())
    }

    fn put_wallet(&mut self, wallet: Wallet) -> Result<()> {
        self.wallets.insert(wallet.user_id, wallet);
        Ok(())
    }

    fn request(&mut self, id: RequestId) -> Result<Option<PaymentRequest>> {
        if let Some(r) = self.requests.get(&id) {
            return Ok(Some(r.clone()));
        }
        let store = self.store;
        let state = store.lock()?;
        self.observe(&state, DocKey::Request(id));
        Ok(state.requests.get(&id).cloned())
    }

    fn put_request(&mut self, request: PaymentRequest) -> Result<()> {
        self.requests.insert(request.id, request);
        Ok(())
    }

    fn insert_request(&mut self, request: PaymentRequest) -> Result<bool> {
        if self.request(request.id)?.is_some() {
            return Ok(false);
        }
        self.requests.insert(request.id, request);
        Ok(true)
    }

    fn match_record(&mut self, id: MatchId) -> Result<Option<Match>> {
        if let Some(m) = self.matches.get(&id) {
            return Ok(Some(m.clone()));
        }
        let store = self.store;
        let state = store.lock()?;
        self.observe(&state, DocKey::Match(id));
        Ok(state.matches.get(&id).cloned())
    }

    fn put_match(&mut self, record: Match) -> Result<()> {
        self.matches.insert(record.id, record);
        Ok(())
    }

    fn roster(&mut self, match_id: MatchId) -> Result<Vec<MatchPlayer>> {
        let store = self.store;
        let state = store.lock()?;
        self.observe(&state, DocKey::Roster(match_id));

        let lo = (match_id, UserId::from_bytes([0x00; 16]));
        let hi = (match_id, UserId::from_bytes([0xff; 16]));
        let mut roster: BTreeMap<UserId, MatchPlayer> = state
            .players
            .range(lo..=hi)
            .map(|((_, user), p)| (*user, p.clone()))
            .collect();
        drop(state);

        for ((m, user), p) in &self.players {
            if *m == match_id {
                roster.insert(*user, p.clone());
            }
        }
        Ok(roster.into_values().collect())
    }

    fn put_player(&mut self, player: MatchPlayer) -> Result<()> {
        self.players
            .insert((player.match_id, player.user_id), player);
        Ok(())
    }

    fn append_audit(&mut self, entry: AuditEntry) -> Result<()> {
        self.audit.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn funded(store: &InMemoryStore, user: UserId, available: i64) {
        store
            .run_transaction(|tx| {
                let mut w = Wallet::empty(user);
                w.available = Decimal::new(available, 0);
                tx.put_wallet(w)
            })
            .unwrap();
    }

    #[test]
    fn committed_writes_are_visible() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        funded(&store, user, 100);
        let w = store.wallet(user).unwrap().unwrap();
        assert_eq!(w.available, Decimal::new(100, 0));
        assert_eq!(store.commit_count().unwrap(), 1);
    }

    #[test]
    fn failed_closure_discards_writes() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let result: Result<()> = store.run_transaction(|tx| {
            tx.put_wallet(Wallet::empty(user))?;
            Err(LedgerError::validation("abort"))
        });
        assert!(result.is_err());
        assert!(store.wallet(user).unwrap().is_none());
        assert_eq!(store.commit_count().unwrap(), 0);
    }

    #[test]
    fn reads_see_own_writes() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        store
            .run_transaction(|tx| {
                assert!(tx.wallet(user)?.is_none());
                tx.put_wallet(Wallet::empty(user))?;
                assert!(tx.wallet(user)?.is_some());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn concurrent_write_causes_conflict() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        funded(&store, user, 100);

        let err = store
            .run_transaction(|tx| {
                let mut w = tx.wallet(user)?.unwrap();
                // A competing transaction commits in between.
                funded(&store, user, 500);
                w.available -= Decimal::new(10, 0);
                tx.put_wallet(w)
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(err.is_retryable());

        // The competing write survived; the conflicting one did not.
        let w = store.wallet(user).unwrap().unwrap();
        assert_eq!(w.available, Decimal::new(500, 0));
    }

    #[test]
    fn insert_request_is_create_if_absent() {
        let store = InMemoryStore::new();
        let req = PaymentRequest::dummy_deposit(UserId::new(), Decimal::new(100, 0));
        let first = store
            .run_transaction(|tx| tx.insert_request(req.clone()))
            .unwrap();
        let second = store
            .run_transaction(|tx| tx.insert_request(req.clone()))
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(store.query_requests(&RequestFilter::new()).unwrap().len(), 1);
    }

    #[test]
    fn roster_merges_buffered_players() {
        use chrono::Utc;
        use matchpot_types::PlayerStatus;

        let store = InMemoryStore::new();
        let match_id = MatchId::new();
        let other_match = MatchId::new();
        let player = |m: MatchId| MatchPlayer {
            match_id: m,
            user_id: UserId::new(),
            fee_locked: Decimal::new(20, 0),
            joined_at: Utc::now(),
            status: PlayerStatus::Joined,
        };
        store
            .run_transaction(|tx| {
                tx.put_player(player(match_id))?;
                tx.put_player(player(other_match))
            })
            .unwrap();

        store
            .run_transaction(|tx| {
                assert_eq!(tx.roster(match_id)?.len(), 1);
                tx.put_player(player(match_id))?;
                assert_eq!(tx.roster(match_id)?.len(), 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn roster_read_conflicts_with_concurrent_join() {
        use chrono::Utc;
        use matchpot_types::PlayerStatus;

        let store = InMemoryStore::new();
        let match_id = MatchId::new();
        let join = |user: UserId| MatchPlayer {
            match_id,
            user_id: user,
            fee_locked: Decimal::ZERO,
            joined_at: Utc::now(),
            status: PlayerStatus::Joined,
        };

        let err = store
            .run_transaction(|tx| {
                assert!(tx.roster(match_id)?.is_empty());
                store.run_transaction(|inner| inner.put_player(join(UserId::new())))?;
                tx.put_player(join(UserId::new()))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }
}
