//! 按上下文划分的服务缓存
//!
//! 每个容器为空上下文持有一个缓存，并为见到的每个上下文对象各持有一个。
//! 上下文缓存以对象标识为键，在上下文首次使用时登记释放钩子，
//! 上下文不可达后整块移除，连同其中缓存的服务实例。
//!
//! 释放钩子以缓存表为所有者，容器被丢弃后长期存活的上下文不再保留它的钩子。

use crate::registry::ServiceKey;
use dashmap::DashMap;
use di_abstractions::ServiceInstance;
use infrastructure_common::{ContextId, ContextValue, DependencyResult, ReleaseHook};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// 单个上下文标识的服务缓存
///
/// 读写由自身的锁串行化，不同上下文之间互不竞争
#[derive(Debug, Default)]
pub struct ContextCache {
    slots: Mutex<HashMap<ServiceKey, ServiceInstance>>,
}

impl ContextCache {
    pub fn get(&self, key: &ServiceKey) -> Option<ServiceInstance> {
        self.slots.lock().get(key).cloned()
    }

    /// 写入缓存槽，已有实例时后写入者胜出
    pub fn insert(&self, key: ServiceKey, service: ServiceInstance) {
        self.slots.lock().insert(key, service);
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

type ContextMap = DashMap<ContextId, Arc<ContextCache>>;

/// 容器持有的全部上下文缓存
#[derive(Debug, Default)]
pub(crate) struct ContextCaches {
    detached: Arc<ContextCache>,
    by_context: Arc<ContextMap>,
}

impl ContextCaches {
    /// 获取（必要时创建）上下文对应的缓存
    ///
    /// 新的上下文会登记释放钩子；无法观察释放的上下文返回使用错误，
    /// 不会被缓存。
    pub(crate) fn for_context(
        &self,
        context: Option<&dyn ContextValue>,
    ) -> DependencyResult<Arc<ContextCache>> {
        let Some(context) = context else {
            return Ok(Arc::clone(&self.detached));
        };

        let id = context.identity();
        if let Some(cache) = self.by_context.get(&id) {
            return Ok(Arc::clone(cache.value()));
        }

        let caches: Weak<ContextMap> = Arc::downgrade(&self.by_context);
        context.on_release(ReleaseHook::new(&self.by_context, move |id| {
            if let Some(caches) = caches.upgrade() {
                if let Some((_, cache)) = caches.remove(&id) {
                    debug!(context_id = id, services = cache.len(), "移除上下文缓存");
                }
            }
        }))?;

        let cache = self
            .by_context
            .entry(id)
            .or_insert_with(|| Arc::new(ContextCache::default()));
        Ok(Arc::clone(cache.value()))
    }

    /// 当前仍被跟踪的上下文数（不含空上下文）
    pub(crate) fn tracked_contexts(&self) -> usize {
        self.by_context.len()
    }
}
