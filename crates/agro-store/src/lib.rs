#![deny(warnings)]

//! Caller-owned persistence for AgroProfit.
//!
//! The core crates are pure; this crate owns everything stateful: a
//! string key-value store with get/put semantics, JSON records for users
//! and simulations, and the read-modify-write that feeds a completed
//! simulation through the progression tracker exactly once per
//! simulation id.

use agro_core::{validate_input, SimulationInput, SimulationResult, UserProgression};
use agro_progress::{apply_simulation_completed, ProgressError, Transition};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const KEY_USERS: &str = "agro_users";
const KEY_SIMULATIONS: &str = "agro_simulations";
const KEY_APPLIED: &str = "agro_applied_events";
const KEY_SEQ: &str = "agro_seq";

/// Errors produced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no user with id {0}")]
    UnknownUser(String),
    #[error("no user with email {0}")]
    UnknownEmail(String),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("simulation {0} was already applied")]
    DuplicateEvent(String),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Validation(#[from] agro_core::ValidationError),
}

/// Minimal string key-value store: the opaque get/put collaborator the
/// core is specified against.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: the whole map is loaded on open and rewritten on
/// every put. Data volumes are tiny (one household's simulations), so
/// the rewrite stays cheap.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(JsonFileStore { path, entries })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// A registered user and their progression. No credential fields; login
/// is out of scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub progression: UserProgression,
}

/// A persisted simulation result owned by one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: String,
    pub user_id: String,
    pub result: SimulationResult,
    pub created_at: DateTime<Utc>,
}

/// Typed database over a [`KvStore`], mirroring the original key layout
/// (`agro_users`, `agro_simulations`) plus an applied-event set that
/// guarantees each simulation updates progression at most once.
pub struct AgroDb<S: KvStore> {
    store: S,
}

impl<S: KvStore> AgroDb<S> {
    pub fn new(store: S) -> Self {
        AgroDb { store }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.store.get(key)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(T::default()),
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        self.store.put(key, serde_json::to_string(value)?)
    }

    fn next_id(&mut self, prefix: &str) -> Result<String, StoreError> {
        let seq: u64 = self.load(KEY_SEQ)?;
        self.save(KEY_SEQ, &(seq + 1))?;
        Ok(format!("{prefix}_{}", seq + 1))
    }

    pub fn users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.load(KEY_USERS)
    }

    /// Register a user. Emails are unique, compared case-insensitively.
    pub fn create_user(
        &mut self,
        name: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, StoreError> {
        let mut users = self.users()?;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::EmailTaken(email.to_string()));
        }
        let user = UserRecord {
            id: self.next_id("user")?,
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            progression: UserProgression::default(),
        };
        users.push(user.clone());
        self.save(KEY_USERS, &users)?;
        info!(user = %user.id, email = %user.email, "user created");
        Ok(user)
    }

    pub fn user_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        self.users()?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| StoreError::UnknownEmail(email.to_string()))
    }

    pub fn user_by_id(&self, id: &str) -> Result<UserRecord, StoreError> {
        self.users()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::UnknownUser(id.to_string()))
    }

    /// Persist a computed result for a user. The record is immutable
    /// once stored.
    pub fn add_simulation(
        &mut self,
        user_id: &str,
        result: SimulationResult,
        now: DateTime<Utc>,
    ) -> Result<SimulationRecord, StoreError> {
        self.user_by_id(user_id)?;
        let mut sims: Vec<SimulationRecord> = self.load(KEY_SIMULATIONS)?;
        let record = SimulationRecord {
            id: self.next_id("sim")?,
            user_id: user_id.to_string(),
            result,
            created_at: now,
        };
        sims.push(record.clone());
        self.save(KEY_SIMULATIONS, &sims)?;
        info!(sim = %record.id, user = %record.user_id, crop = %record.result.crop, "simulation saved");
        Ok(record)
    }

    /// A user's stored simulations, newest first.
    pub fn simulations_by_user(&self, user_id: &str) -> Result<Vec<SimulationRecord>, StoreError> {
        let mut sims: Vec<SimulationRecord> = self.load(KEY_SIMULATIONS)?;
        sims.retain(|s| s.user_id == user_id);
        sims.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sims)
    }

    /// Feed one completed simulation through the progression tracker as
    /// an atomic read-modify-write of the user's stored state.
    ///
    /// The simulation id is checked against the applied-event set first,
    /// so redelivery (a double submit, a retried import) is rejected
    /// instead of double-counting points.
    pub fn record_completed_simulation(
        &mut self,
        user_id: &str,
        sim_id: &str,
        points_earned: i64,
        now: DateTime<Utc>,
    ) -> Result<Transition, StoreError> {
        let mut applied: BTreeSet<String> = self.load(KEY_APPLIED)?;
        if applied.contains(sim_id) {
            return Err(StoreError::DuplicateEvent(sim_id.to_string()));
        }

        let mut users = self.users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;

        let transition = apply_simulation_completed(&user.progression, points_earned, now)?;
        user.progression = transition.progression.clone();

        applied.insert(sim_id.to_string());
        self.save(KEY_USERS, &users)?;
        self.save(KEY_APPLIED, &applied)?;
        Ok(transition)
    }

    /// End-to-end submission: validate, compute, persist the result, and
    /// apply progression for it, returning both the stored record and
    /// the transition.
    pub fn submit_simulation(
        &mut self,
        user_id: &str,
        input: &SimulationInput,
        points_earned: i64,
        now: DateTime<Utc>,
    ) -> Result<(SimulationRecord, Transition), StoreError> {
        validate_input(input)?;
        // A negative award would fail progression after the record is
        // already stored; reject it before persisting anything.
        if points_earned < 0 {
            return Err(ProgressError::NegativePoints(points_earned).into());
        }
        let result = agro_econ::compute_simulation(input, now);
        let record = self.add_simulation(user_id, result, now)?;
        let transition = self.record_completed_simulation(user_id, &record.id, points_earned, now)?;
        Ok((record, transition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::{AreaUnit, CropCode};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn db() -> AgroDb<MemoryStore> {
        AgroDb::new(MemoryStore::default())
    }

    fn padi_input() -> SimulationInput {
        agro_econ::input_from_profile(&CropCode::new("padi"), Decimal::ONE, AreaUnit::Hectare)
    }

    #[test]
    fn create_and_find_user() {
        let mut db = db();
        let user = db.create_user("Petani Demo", "demo@agroprofit.com", at()).unwrap();
        assert_eq!(user.progression, UserProgression::default());
        let found = db.user_by_email("DEMO@agroprofit.com").unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(db.user_by_id(&user.id).unwrap().name, "Petani Demo");
    }

    #[test]
    fn duplicate_email_rejected() {
        let mut db = db();
        db.create_user("A", "a@x.com", at()).unwrap();
        assert!(matches!(
            db.create_user("B", "A@X.com", at()),
            Err(StoreError::EmailTaken(_))
        ));
    }

    #[test]
    fn unknown_user_errors() {
        let db = db();
        assert!(matches!(
            db.user_by_id("user_9"),
            Err(StoreError::UnknownUser(_))
        ));
        assert!(matches!(
            db.user_by_email("nobody@x.com"),
            Err(StoreError::UnknownEmail(_))
        ));
    }

    #[test]
    fn submit_updates_progression_and_history() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        let (record, transition) = db.submit_simulation(&user.id, &padi_input(), 20, at()).unwrap();
        assert_eq!(record.result.total_cost, Decimal::new(6_500_000, 0));
        assert_eq!(transition.progression.points, 20);
        assert_eq!(transition.progression.simulations_count, 1);

        let stored = db.user_by_id(&user.id).unwrap();
        assert_eq!(stored.progression, transition.progression);
        let history = db.simulations_by_user(&user.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);
    }

    #[test]
    fn history_is_newest_first() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        let earlier = at();
        let later = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        db.submit_simulation(&user.id, &padi_input(), 20, earlier).unwrap();
        db.submit_simulation(&user.id, &padi_input(), 20, later).unwrap();
        let history = db.simulations_by_user(&user.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at, later);
        assert_eq!(history[1].created_at, earlier);
    }

    #[test]
    fn replayed_event_is_rejected_and_state_unchanged() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        let (record, _) = db.submit_simulation(&user.id, &padi_input(), 20, at()).unwrap();

        let before = db.user_by_id(&user.id).unwrap().progression;
        let err = db
            .record_completed_simulation(&user.id, &record.id, 20, at())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEvent(_)));
        assert_eq!(db.user_by_id(&user.id).unwrap().progression, before);
    }

    #[test]
    fn invalid_input_is_rejected_before_persisting() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        let mut input = padi_input();
        input.land_area = Decimal::ZERO;
        assert!(matches!(
            db.submit_simulation(&user.id, &input, 20, at()),
            Err(StoreError::Validation(_))
        ));
        assert!(db.simulations_by_user(&user.id).unwrap().is_empty());
    }

    #[test]
    fn negative_points_surface_progress_error() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        assert!(matches!(
            db.submit_simulation(&user.id, &padi_input(), -5, at()),
            Err(StoreError::Progress(ProgressError::NegativePoints(-5)))
        ));
        assert!(db.simulations_by_user(&user.id).unwrap().is_empty());
        assert_eq!(db.user_by_id(&user.id).unwrap().progression, UserProgression::default());
    }

    #[test]
    fn five_submissions_earn_novice() {
        let mut db = db();
        let user = db.create_user("A", "a@x.com", at()).unwrap();
        let mut last = None;
        for _ in 0..5 {
            let (_, t) = db.submit_simulation(&user.id, &padi_input(), 20, at()).unwrap();
            last = Some(t);
        }
        let t = last.unwrap();
        assert_eq!(t.awarded.len(), 1);
        assert_eq!(t.awarded[0].name, "Novice");
        assert_eq!(t.progression.level(), 2); // 100 points
        assert_eq!(t.level_up, Some((1, 2)));
    }

    #[test]
    fn file_store_round_trips_across_reopen() {
        let dir = std::env::temp_dir().join("agro-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("store-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let user_id = {
            let mut db = AgroDb::new(JsonFileStore::open(&path).unwrap());
            let user = db.create_user("A", "a@x.com", at()).unwrap();
            db.submit_simulation(&user.id, &padi_input(), 20, at()).unwrap();
            user.id
        };

        let db = AgroDb::new(JsonFileStore::open(&path).unwrap());
        let user = db.user_by_id(&user_id).unwrap();
        assert_eq!(user.progression.points, 20);
        assert_eq!(db.simulations_by_user(&user_id).unwrap().len(), 1);

        std::fs::remove_file(&path).unwrap();
    }
}
