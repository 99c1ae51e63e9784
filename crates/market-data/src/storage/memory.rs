//! 인메모리 캐시 테이블.
//!
//! 데이터베이스가 설정되지 않았을 때의 대체 저장소이자 테스트용 백엔드입니다.
//! 프로세스 재시작 시 모든 항목이 사라집니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CacheRecord, CacheTable};
use crate::error::Result;

/// HashMap 기반 캐시 테이블.
#[derive(Debug, Default)]
pub struct MemoryCacheTable {
    rows: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryCacheTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 행 수 (만료 여부 무관).
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// 저장된 모든 키를 정렬하여 반환합니다.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rows.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheTable for MemoryCacheTable {
    async fn get(&self, id: &str) -> Result<Option<CacheRecord>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, record: CacheRecord) -> Result<()> {
        self.rows.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.rows.write().await.remove(id).is_some())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|id, _| !id.starts_with(prefix));
        Ok(before - rows.len())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<usize> {
        let mut rows = self.rows.write().await;
        let count = rows.len();
        rows.retain(|_, record| !record.is_expired_at(before));
        Ok(count - rows.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
