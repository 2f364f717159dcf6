use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use tracing::{debug, warn};

use crate::db::LocalStore;
use crate::models::{
    DEFAULT_BASAL_RATE_KJ, DaySummary, EnergyStatus, EnergySummary, EnergyUnit, LogEntry, LogKind,
    NewLogEntry, Profile, SettingKey, WeightEntry, kj_to_kcal, normalize_gender,
};

/// Source of the current local wall time.
///
/// The CLI uses [`SystemClock`]; tests pin the time with [`FixedClock`] so
/// timestamps and local dates are deterministic.
pub trait Clock: Send {
    fn now(&self) -> DateTime<FixedOffset>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Initializing,
    Ready,
}

type ReadyHook = Box<dyn FnOnce() + Send>;

/// Running energy totals for the current process plus the cached profile.
///
/// Totals start at zero and only grow. Mutations update memory first and then
/// persist on a best-effort basis: a store failure is logged and the in-memory
/// value is kept.
pub struct CalorieCounter {
    store: LocalStore,
    clock: Box<dyn Clock>,
    consumed_kj: f64,
    spent_kj: f64,
    basal_rate_kj: f64,
    profile: Profile,
    state: ModelState,
    on_ready: Option<ReadyHook>,
}

impl CalorieCounter {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            clock: Box::new(SystemClock),
            consumed_kj: 0.0,
            spent_kj: 0.0,
            basal_rate_kj: DEFAULT_BASAL_RATE_KJ,
            profile: Profile::default(),
            state: ModelState::Uninitialized,
            on_ready: None,
        }
    }

    /// Construct and immediately initialize.
    pub fn load(store: LocalStore) -> Self {
        let mut counter = Self::new(store);
        counter.initialize();
        counter
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_basal_rate(mut self, basal_rate_kj: f64) -> Self {
        self.basal_rate_kj = basal_rate_kj;
        self
    }

    /// Register the hook fired when the model becomes ready. Replaces any
    /// earlier hook. If the model is already ready the hook runs immediately.
    pub fn on_ready(&mut self, hook: impl FnOnce() + Send + 'static) {
        if self.state == ModelState::Ready {
            hook();
        } else {
            self.on_ready = Some(Box::new(hook));
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ModelState::Ready
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Load the last known weight and the profile settings, then become ready.
    ///
    /// Each field loads on its own; one that fails stays empty and the model
    /// still becomes ready.
    pub fn initialize(&mut self) {
        if self.state != ModelState::Uninitialized {
            return;
        }
        self.state = ModelState::Initializing;

        self.profile = self.load_profile();
        debug!(profile = ?self.profile, "profile loaded");

        self.state = ModelState::Ready;
        if let Some(hook) = self.on_ready.take() {
            hook();
        }
    }

    fn load_profile(&self) -> Profile {
        let weight = loaded("weight", self.store.latest_weight()).map(|w| w.weight);
        let height = loaded(
            SettingKey::Height.as_str(),
            self.store.get_setting::<f64>(SettingKey::Height.as_str()),
        );
        let dob = loaded(
            SettingKey::Dob.as_str(),
            self.store.get_setting::<NaiveDate>(SettingKey::Dob.as_str()),
        );
        let gender = loaded(
            SettingKey::Gender.as_str(),
            self.store.get_setting::<String>(SettingKey::Gender.as_str()),
        )
        .map(|g| normalize_gender(&g));
        Profile {
            weight,
            height,
            dob,
            gender,
        }
    }

    // --- Energy ---

    /// Record eaten food. Returns the stored entry, or `None` if it could not
    /// be persisted; the consumed total is updated either way.
    pub fn add_food(
        &mut self,
        food: Option<&str>,
        quantity: Option<f64>,
        amount: f64,
        unit: EnergyUnit,
    ) -> Option<LogEntry> {
        let energy_kj = unit.to_kj(amount);
        self.consumed_kj += energy_kj;

        let now = self.clock.now();
        let entry = NewLogEntry {
            kind: LogKind::Food,
            food: food.map(str::to_string),
            quantity,
            energy_kj,
            timestamp: now.timestamp_millis(),
            local_date: now.date_naive(),
        };
        match self.store.add_log_entry(&entry) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("failed to save food log entry: {e:#}");
                None
            }
        }
    }

    /// Record activity. Kept in memory only.
    pub fn add_activity(&mut self, amount: f64, unit: EnergyUnit) {
        self.spent_kj += unit.to_kj(amount);
    }

    pub fn basal_rate_kj(&self) -> f64 {
        self.basal_rate_kj
    }

    pub fn energy_in_kj(&self) -> f64 {
        self.consumed_kj
    }

    pub fn energy_in_kcal(&self) -> f64 {
        kj_to_kcal(self.energy_in_kj())
    }

    pub fn energy_out_kj(&self) -> f64 {
        self.basal_rate_kj + self.spent_kj
    }

    pub fn energy_out_kcal(&self) -> f64 {
        kj_to_kcal(self.energy_out_kj())
    }

    pub fn status(&self) -> EnergyStatus {
        EnergyStatus::classify(self.energy_in_kj() / self.energy_out_kj())
    }

    pub fn summary(&self) -> EnergySummary {
        EnergySummary::new(self.energy_in_kj(), self.energy_out_kj())
    }

    /// Persisted food for one local date against the basal rate.
    pub fn day_summary(&self, date: NaiveDate) -> Result<DaySummary> {
        let entries = self.store.log_entries_for_date(date)?;
        let energy_in_kj: f64 = entries.iter().map(|e| e.energy_kj).sum();
        Ok(DaySummary {
            date,
            entries,
            energy: EnergySummary::new(energy_in_kj, self.basal_rate_kj),
        })
    }

    /// Log entries with `start < timestamp <= end` (no upper bound when `end`
    /// is `None`), oldest first.
    pub fn query_log_entries(&self, start: i64, end: Option<i64>) -> Result<Vec<LogEntry>> {
        self.store.query_log_range(start, end)
    }

    // --- Profile ---

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn weight(&self) -> Option<f64> {
        self.profile.weight
    }

    #[allow(clippy::float_cmp)]
    pub fn set_weight(&mut self, weight: f64) {
        if self.profile.weight == Some(weight) {
            return;
        }
        self.profile.weight = Some(weight);
        let entry = WeightEntry {
            local_date: self.clock.now().date_naive(),
            weight,
        };
        if let Err(e) = self.store.put_weight(&entry) {
            warn!("failed to save weight: {e:#}");
        }
    }

    pub fn height(&self) -> Option<f64> {
        self.profile.height
    }

    #[allow(clippy::float_cmp)]
    pub fn set_height(&mut self, height: f64) {
        if self.profile.height == Some(height) {
            return;
        }
        self.profile.height = Some(height);
        self.save_setting(SettingKey::Height, &height);
    }

    pub fn dob(&self) -> Option<NaiveDate> {
        self.profile.dob
    }

    pub fn set_dob(&mut self, dob: NaiveDate) {
        if self.profile.dob == Some(dob) {
            return;
        }
        self.profile.dob = Some(dob);
        self.save_setting(SettingKey::Dob, &dob);
    }

    pub fn gender(&self) -> Option<&str> {
        self.profile.gender.as_deref()
    }

    pub fn set_gender(&mut self, gender: &str) {
        let gender = normalize_gender(gender);
        if self.profile.gender.as_deref() == Some(gender.as_str()) {
            return;
        }
        self.profile.gender = Some(gender.clone());
        self.save_setting(SettingKey::Gender, &gender);
    }

    fn save_setting<T: serde::Serialize + ?Sized>(&self, key: SettingKey, value: &T) {
        if let Err(e) = self.store.set_setting(key.as_str(), value) {
            warn!(setting = key.as_str(), "failed to save setting: {e:#}");
        }
    }
}

fn loaded<T>(field: &str, result: Result<Option<T>>) -> Option<T> {
    result.unwrap_or_else(|e| {
        warn!(field, "failed to load profile field, leaving it empty: {e:#}");
        None
    })
}
