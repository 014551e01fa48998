// libs/appointment-cell/src/services/cached_store.rs
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::{CacheError, StoreError};
use crate::models::Appointment;
use crate::services::cache::AppointmentCache;
use crate::services::metrics::BookingMetrics;
use crate::services::store::AppointmentStore;

/// Cache keys. The rendered form is what lands in Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Appointment(Uuid),
    UserList(Uuid),
    DoctorList(Uuid),
}

impl CacheKey {
    /// Every key whose value could contain `appointment`.
    pub fn affected_by(appointment: &Appointment) -> [CacheKey; 3] {
        [
            CacheKey::Appointment(appointment.id),
            CacheKey::UserList(appointment.user_id),
            CacheKey::DoctorList(appointment.doctor_id),
        ]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Appointment(id) => write!(f, "appointment:{}", id),
            CacheKey::UserList(user_id) => write!(f, "appointments:user:{}", user_id),
            CacheKey::DoctorList(doctor_id) => write!(f, "appointments:doctor:{}", doctor_id),
        }
    }
}

/// Read-through / write-invalidate decorator over an [`AppointmentStore`].
///
/// Reads consult the cache first and fall back to the store on a miss, a cache
/// error, a timeout or an undecodable entry. Writes hit the store first and
/// only invalidate after the store confirmed the change. Cache failures are
/// logged and swallowed.
pub struct CachedAppointmentStore {
    store: Arc<dyn AppointmentStore>,
    cache: Arc<dyn AppointmentCache>,
    metrics: Arc<BookingMetrics>,
    ttl: Duration,
    cache_timeout: Duration,
}

impl CachedAppointmentStore {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        cache: Arc<dyn AppointmentCache>,
        metrics: Arc<BookingMetrics>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            ttl: config.cache_ttl(),
            cache_timeout: config.cache_timeout(),
        }
    }

    async fn with_timeout<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = Result<T, CacheError>> + Send,
    {
        tokio::time::timeout(self.cache_timeout, op)
            .await
            .unwrap_or(Err(CacheError::Timeout))
    }

    async fn read_cached<T>(&self, key: CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let key = key.to_string();
        match self.with_timeout(self.cache.get(&key)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("Cache hit for {}", key);
                    self.metrics.record_cache_hit();
                    Some(value)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    self.metrics.record_cache_error();
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for {}", key);
                self.metrics.record_cache_miss();
                None
            }
            Err(e) => {
                warn!("Cache read failed for {}, falling back to store: {}", key, e);
                self.metrics.record_cache_error();
                None
            }
        }
    }

    async fn populate<T>(&self, key: CacheKey, value: &T)
    where
        T: Serialize + Sync,
    {
        let key = key.to_string();
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize value for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.with_timeout(self.cache.set(&key, raw, self.ttl)).await {
            warn!("Cache populate failed for {}: {}", key, e);
            self.metrics.record_cache_error();
        }
    }

    async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            let key = key.to_string();
            if let Err(e) = self.with_timeout(self.cache.delete(&key)).await {
                warn!("Cache invalidation failed for {}: {}", key, e);
                self.metrics.record_cache_error();
            }
        }
    }

    async fn read_through<T, F>(&self, key: CacheKey, load: F) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: std::future::Future<Output = Result<T, StoreError>> + Send,
    {
        if let Some(cached) = self.read_cached(key).await {
            return Ok(cached);
        }

        let value = load.await?;
        self.populate(key, &value).await;
        Ok(value)
    }
}

#[async_trait]
impl AppointmentStore for CachedAppointmentStore {
    async fn create(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let created = self.store.create(appointment).await?;
        self.invalidate(&CacheKey::affected_by(&created)).await;
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.read_through(CacheKey::Appointment(id), self.store.get_by_id(id))
            .await
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        // Identity fields never change, so these are the only keys holding it.
        let updated = self.store.update(appointment).await?;
        self.invalidate(&CacheKey::affected_by(&updated)).await;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        // The list keys are only known from the record itself.
        let existing = self.store.get_by_id(id).await?;

        self.store.delete(id).await?;
        self.invalidate(&CacheKey::affected_by(&existing)).await;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.read_through(CacheKey::UserList(user_id), self.store.list_by_user(user_id))
            .await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.read_through(CacheKey::DoctorList(doctor_id), self.store.list_by_doctor(doctor_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_in_wire_format() {
        let id = Uuid::parse_str("4f1c2d3e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            CacheKey::Appointment(id).to_string(),
            "appointment:4f1c2d3e-0000-4000-8000-000000000001"
        );
        assert_eq!(
            CacheKey::UserList(id).to_string(),
            "appointments:user:4f1c2d3e-0000-4000-8000-000000000001"
        );
        assert_eq!(
            CacheKey::DoctorList(id).to_string(),
            "appointments:doctor:4f1c2d3e-0000-4000-8000-000000000001"
        );
    }
}
