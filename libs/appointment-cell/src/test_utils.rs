//! Fakes for exercising the booking saga without Redis, PostgREST or the
//! doctor service.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::{CacheError, RemoteError, StoreError};
use crate::models::{Appointment, CreateAppointmentRequest, SlotAvailability, SlotRef};
use crate::services::{
    AppointmentCache, AppointmentStore, BookingCoordinator, BookingMetrics, CachedAppointmentStore,
    InMemoryAppointmentCache, InMemoryAppointmentStore, SlotAvailabilityClient,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct TestConfig {
    pub remote_timeout_secs: u64,
    pub cache_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            remote_timeout_secs: 5,
            cache_timeout_secs: 5,
            cache_ttl_secs: 300,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            remote_timeout_secs: self.remote_timeout_secs,
            cache_timeout_secs: self.cache_timeout_secs,
            cache_ttl_secs: self.cache_ttl_secs,
            ..AppConfig::default()
        }
    }
}

/// A fixed, whole-second slot time.
pub fn slot_time(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 15, hour, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn booking_request(user_id: Uuid, doctor_id: Uuid, date: DateTime<Utc>) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        user_id,
        doctor_id,
        date,
        notes: Some("annual check-up".to_string()),
    }
}

// ==============================================================================
// DOCTOR SERVICE
// ==============================================================================

/// How the fake doctor service applies `set_availability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotWriteMode {
    /// Blind idempotent write; always succeeds.
    Overwrite,
    /// Refuses (`success: false`) when the slot already holds the target value.
    CompareAndSwap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCall {
    Check(SlotRef),
    Set(SlotRef, bool),
}

/// In-memory doctor schedule. Unknown slots are available. Every call is
/// recorded, including failed ones, and yields once before running so that
/// concurrent sagas interleave.
pub struct FakeSlotClient {
    mode: SlotWriteMode,
    slots: Mutex<HashMap<SlotRef, bool>>,
    calls: Mutex<Vec<SlotCall>>,
    fail_checks: AtomicBool,
    fail_reservations: AtomicBool,
    fail_releases: AtomicBool,
    reject_writes: AtomicBool,
    hang: AtomicBool,
}

impl Default for FakeSlotClient {
    fn default() -> Self {
        Self::with_mode(SlotWriteMode::Overwrite)
    }
}

impl FakeSlotClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: SlotWriteMode) -> Self {
        Self {
            mode,
            slots: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_checks: AtomicBool::new(false),
            fail_reservations: AtomicBool::new(false),
            fail_releases: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            hang: AtomicBool::new(false),
        }
    }

    pub fn is_available(&self, slot: SlotRef) -> bool {
        lock(&self.slots).get(&slot).copied().unwrap_or(true)
    }

    pub fn set_slot(&self, slot: SlotRef, available: bool) {
        lock(&self.slots).insert(slot, available);
    }

    pub fn calls(&self) -> Vec<SlotCall> {
        lock(&self.calls).clone()
    }

    /// Only the `set_availability` calls, in order.
    pub fn set_calls(&self) -> Vec<(SlotRef, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SlotCall::Set(slot, available) => Some((slot, available)),
                SlotCall::Check(_) => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn fail_checks(&self, fail: bool) {
        self.fail_checks.store(fail, Ordering::SeqCst);
    }

    /// `set_availability(.., false)` returns a transport error.
    pub fn fail_reservations(&self, fail: bool) {
        self.fail_reservations.store(fail, Ordering::SeqCst);
    }

    /// `set_availability(.., true)` returns a transport error.
    pub fn fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    /// Writes answer `success: false` without changing the slot.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Calls never complete.
    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    async fn enter(&self, call: SlotCall) {
        lock(&self.calls).push(call);
        tokio::task::yield_now().await;
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl SlotAvailabilityClient for FakeSlotClient {
    async fn check_availability(&self, slot: SlotRef) -> Result<SlotAvailability, RemoteError> {
        self.enter(SlotCall::Check(slot)).await;

        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }

        Ok(if self.is_available(slot) {
            SlotAvailability::available()
        } else {
            SlotAvailability::unavailable("slot already booked")
        })
    }

    async fn set_availability(&self, slot: SlotRef, available: bool) -> Result<bool, RemoteError> {
        self.enter(SlotCall::Set(slot, available)).await;

        let failing = if available {
            self.fail_releases.load(Ordering::SeqCst)
        } else {
            self.fail_reservations.load(Ordering::SeqCst)
        };
        if failing {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let mut slots = lock(&self.slots);
        let current = slots.get(&slot).copied().unwrap_or(true);
        if self.mode == SlotWriteMode::CompareAndSwap && current == available {
            return Ok(false);
        }
        slots.insert(slot, available);
        Ok(true)
    }
}

// ==============================================================================
// DURABLE STORE
// ==============================================================================

#[derive(Debug, Default)]
pub struct StoreCallCounts {
    pub creates: AtomicUsize,
    pub gets: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub lists: AtomicUsize,
}

/// In-memory store that counts calls and fails on demand.
#[derive(Default)]
pub struct FlakyAppointmentStore {
    inner: InMemoryAppointmentStore,
    counts: StoreCallCounts,
    fail_create: AtomicBool,
    fail_get: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, bypassing counters and failure injection.
    pub fn inner(&self) -> &InMemoryAppointmentStore {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.counts.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.counts.lists.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.counts.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.counts.deletes.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.counts.updates.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Database(format!("injected {} failure", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AppointmentStore for FlakyAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        self.counts.creates.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_create, "create")?;
        self.inner.create(appointment).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.counts.gets.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_get, "get")?;
        self.inner.get_by_id(id).await
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        self.counts.updates.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_update, "update")?;
        self.inner.update(appointment).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.counts.deletes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.counts.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_by_user(user_id).await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.counts.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_by_doctor(doctor_id).await
    }
}

// ==============================================================================
// CACHE
// ==============================================================================

/// In-memory cache that can be switched to failing or hanging.
#[derive(Default)]
pub struct FlakyAppointmentCache {
    inner: InMemoryAppointmentCache,
    failing: AtomicBool,
    hang: AtomicBool,
}

impl FlakyAppointmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryAppointmentCache {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    async fn enter(&self) -> Result<(), CacheError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("injected cache failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentCache for FlakyAppointmentCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.enter().await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.enter().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.enter().await?;
        self.inner.delete(key).await
    }
}

// ==============================================================================
// WIRED-UP SAGA
// ==============================================================================

/// Coordinator over a cached store, with every collaborator faked.
pub struct BookingHarness {
    pub slots: Arc<FakeSlotClient>,
    pub store: Arc<FlakyAppointmentStore>,
    pub cache: Arc<FlakyAppointmentCache>,
    pub metrics: Arc<BookingMetrics>,
    pub cached_store: Arc<CachedAppointmentStore>,
    pub coordinator: Arc<BookingCoordinator>,
}

impl BookingHarness {
    pub fn new() -> Self {
        Self::with_slots(FakeSlotClient::new())
    }

    pub fn with_slots(slots: FakeSlotClient) -> Self {
        let config = TestConfig::default().to_app_config();
        let slots = Arc::new(slots);
        let store = Arc::new(FlakyAppointmentStore::new());
        let cache = Arc::new(FlakyAppointmentCache::new());
        let metrics = Arc::new(BookingMetrics::new());

        let cached_store = Arc::new(CachedAppointmentStore::new(
            store.clone(),
            cache.clone(),
            metrics.clone(),
            &config,
        ));
        let coordinator = Arc::new(BookingCoordinator::new(
            slots.clone(),
            cached_store.clone(),
            metrics.clone(),
            &config,
        ));

        Self {
            slots,
            store,
            cache,
            metrics,
            cached_store,
            coordinator,
        }
    }
}

impl Default for BookingHarness {
    fn default() -> Self {
        Self::new()
    }
}
