//! 解析上下文
//!
//! 上下文对象的类型用于在专用工厂之间选择，对象标识则界定缓存的生命周期。
//!
//! Rust 没有垃圾回收器的终结回调，这里用显式的释放钩子代替：[`Context`]
//! 持有一个共享分配，最后一个句柄被丢弃时依次调用已登记的钩子，
//! 容器借此移除该上下文的缓存。应用自己持有的 `Arc<T>` 也能作为上下文标识，
//! 但无法观察其释放，在需要缓存时会得到使用错误。

use crate::errors::{DependencyError, DependencyResult};
use crate::metadata::ContextType;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// 上下文对象标识（分配地址）
pub type ContextId = usize;

type ReleaseCallback = Box<dyn FnOnce(ContextId) + Send>;

/// 上下文被释放时调用的钩子
///
/// 钩子弱引用登记它的所有者。所有者被丢弃后钩子失效，
/// 在下一次登记时从上下文中移除；同一个所有者只保留一个钩子。
pub struct ReleaseHook {
    owner: Weak<dyn Any + Send + Sync>,
    callback: ReleaseCallback,
}

impl ReleaseHook {
    /// 创建绑定到 `owner` 生命周期的钩子
    pub fn new<T, F>(owner: &Arc<T>, callback: F) -> Self
    where
        T: Any + Send + Sync,
        F: FnOnce(ContextId) + Send + 'static,
    {
        let owner: Weak<dyn Any + Send + Sync> = Arc::downgrade(owner) as Weak<T>;
        Self {
            owner,
            callback: Box::new(callback),
        }
    }

    /// 所有者是否仍然存在
    pub fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn same_owner(&self, other: &ReleaseHook) -> bool {
        Weak::ptr_eq(&self.owner, &other.owner)
    }

    fn fire(self, id: ContextId) {
        if self.is_live() {
            (self.callback)(id);
        }
    }
}

impl fmt::Debug for ReleaseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseHook")
            .field("live", &self.is_live())
            .finish()
    }
}

/// 可以作为上下文的类型
///
/// 通过 [`ContextKind::bases`] 按声明顺序列出直接基类，构成上下文类型层次
pub trait ContextKind: Any + Send + Sync + fmt::Debug {
    /// 直接基类，按声明顺序
    fn bases() -> Vec<ContextType>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// 解析时传入的上下文值
pub trait ContextValue: Send + Sync {
    /// 上下文的运行时类型
    fn context_type(&self) -> ContextType;

    /// 对象标识，不是值相等
    fn identity(&self) -> ContextId;

    /// 用于诊断的描述
    fn describe(&self) -> String;

    /// 登记释放钩子
    ///
    /// 无法观察释放的上下文返回使用错误
    fn on_release(&self, hook: ReleaseHook) -> DependencyResult<()> {
        drop(hook);
        Err(DependencyError::usage(format!(
            "上下文 {} 无法被弱观察，请使用 Context 包装",
            self.describe()
        )))
    }
}

struct ContextInner {
    value: Box<dyn Any + Send + Sync>,
    context_type: ContextType,
    description: String,
    hooks: Mutex<Vec<ReleaseHook>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let id = self as *const ContextInner as ContextId;
        let hooks = std::mem::take(self.hooks.get_mut());
        if !hooks.is_empty() {
            tracing::trace!(context = %self.description, hooks = hooks.len(), "上下文已释放");
        }
        for hook in hooks {
            hook.fire(id);
        }
    }
}

/// 可观察释放的上下文句柄
///
/// 克隆句柄共享同一个标识，所有句柄都被丢弃后触发释放钩子
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// 包装上下文值
    pub fn new<T: ContextKind>(value: T) -> Self {
        let description = format!("{value:?}");
        Self {
            inner: Arc::new(ContextInner {
                value: Box::new(value),
                context_type: ContextType::of::<T>(),
                description,
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn downcast_ref<T: ContextKind>(&self) -> Option<&T> {
        self.inner.value.downcast_ref::<T>()
    }

    pub fn is<T: ContextKind>(&self) -> bool {
        self.inner.value.is::<T>()
    }

    pub fn id(&self) -> ContextId {
        Arc::as_ptr(&self.inner) as ContextId
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 仍然有效的释放钩子数量
    pub fn release_hook_count(&self) -> usize {
        let mut hooks = self.inner.hooks.lock();
        hooks.retain(ReleaseHook::is_live);
        hooks.len()
    }
}

impl ContextValue for Context {
    fn context_type(&self) -> ContextType {
        self.inner.context_type
    }

    fn identity(&self) -> ContextId {
        self.id()
    }

    fn describe(&self) -> String {
        self.inner.description.clone()
    }

    fn on_release(&self, hook: ReleaseHook) -> DependencyResult<()> {
        let mut hooks = self.inner.hooks.lock();
        hooks.retain(ReleaseHook::is_live);
        if hook.is_live() && !hooks.iter().any(|existing| existing.same_owner(&hook)) {
            hooks.push(hook);
        }
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.inner.description).finish()
    }
}

/// 应用自行持有的共享对象：有标识，但无法观察释放
impl<T: ContextKind> ContextValue for Arc<T> {
    fn context_type(&self) -> ContextType {
        ContextType::of::<T>()
    }

    fn identity(&self) -> ContextId {
        Arc::as_ptr(self) as *const () as ContextId
    }

    fn describe(&self) -> String {
        format!("{:?}", self.as_ref())
    }
}
