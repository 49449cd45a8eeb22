use crate::error::DomainError;
use crate::model::leave_type::{LeaveCategory, LeaveType, LeaveTypePatch, NewLeaveType};
use crate::store::LeaveStore;
use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

/// Leave type catalog with a read-through cache in front of the
/// store. Types are consulted on every lifecycle operation and
/// change rarely, so cache hits carry almost all reads.
pub struct TypeCatalog {
    store: Arc<dyn LeaveStore>,
    cache: Cache<u64, LeaveType>,
}

/// Canonical types ensured by `seed_defaults`.
pub struct DefaultTypes {
    pub annual: LeaveType,
    pub sick: LeaveType,
}

impl TypeCatalog {
    pub fn new(store: Arc<dyn LeaveStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(3600)) // 1h TTL
            .build();
        Self { store, cache }
    }

    pub async fn create(&self, new: NewLeaveType) -> Result<LeaveType, DomainError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::Validation("leave type name must not be empty".into()));
        }
        let ty = self.store.insert_type(new).await?;
        self.cache.insert(ty.id, ty.clone()).await;
        Ok(ty)
    }

    pub async fn get(&self, id: u64) -> Result<LeaveType, DomainError> {
        if let Some(ty) = self.cache.get(&id).await {
            return Ok(ty);
        }
        let ty = self.store.fetch_type(id).await?;
        self.cache.insert(id, ty.clone()).await;
        Ok(ty)
    }

    pub async fn list(&self) -> Result<Vec<LeaveType>, DomainError> {
        self.store.list_types().await
    }

    pub async fn update(&self, id: u64, patch: LeaveTypePatch) -> Result<LeaveType, DomainError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::Validation("leave type name must not be empty".into()));
            }
        }
        let ty = self.store.update_type(id, patch).await?;
        self.cache.insert(id, ty.clone()).await;
        Ok(ty)
    }

    pub async fn delete(&self, id: u64) -> Result<(), DomainError> {
        self.store.delete_type(id).await?;
        self.cache.invalidate(&id).await;
        Ok(())
    }

    /// Idempotently ensure the two canonical types exist. Matching is
    /// by name, so re-running a bootstrap never duplicates them.
    pub async fn seed_defaults(&self) -> Result<DefaultTypes, DomainError> {
        let annual = match self.store.find_type_by_name("Annual Leave").await? {
            Some(ty) => ty,
            None => {
                self.create(NewLeaveType {
                    name: "Annual Leave".into(),
                    category: LeaveCategory::Annual,
                    requires_approval: true,
                    deducts_balance: true,
                    description: Some("Planned yearly time off".into()),
                })
                .await?
            }
        };
        let sick = match self.store.find_type_by_name("Sick Leave").await? {
            Some(ty) => ty,
            None => {
                self.create(NewLeaveType {
                    name: "Sick Leave".into(),
                    category: LeaveCategory::Sick,
                    requires_approval: false,
                    deducts_balance: true,
                    description: Some("Unplanned illness, no approval needed".into()),
                })
                .await?
            }
        };
        Ok(DefaultTypes { annual, sick })
    }

    /// Pre-populate the cache from MySQL at startup (batched stream,
    /// best effort).
    pub async fn warmup(&self, pool: &MySqlPool) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (u64,)>("SELECT id FROM leave_types").fetch(pool);

        let mut total = 0usize;
        while let Some(row) = stream.next().await {
            let (id,) = row?;
            if let Ok(ty) = self.store.fetch_type(id).await {
                self.cache.insert(id, ty).await;
                total += 1;
            }
        }

        log::info!("Leave type cache warmup complete: {} types", total);
        Ok(())
    }
}
