//! 元数据定义
//!
//! 提供能力（服务契约）和上下文类型的标识

use crate::context::ContextKind;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 通用能力的占位类型
enum AnyService {}

/// 能力标识
///
/// 调用方请求的抽象服务契约，按类型标识比较而不是按结构比较。
/// `dyn Trait` 同样可以作为能力使用。
#[derive(Clone, Copy)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    /// 从类型获取能力标识
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 通用能力，`Container::get` 未指定能力时使用
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<AnyService>(),
            name: "Any",
        }
    }

    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<AnyService>()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::any()
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 所有非空上下文共同的根类型
#[derive(Debug)]
pub struct AnyContext;

impl ContextKind for AnyContext {}

/// 上下文类型
///
/// 按类型标识比较，附带声明顺序的直接基类列表
#[derive(Clone, Copy)]
pub struct ContextType {
    id: TypeId,
    name: &'static str,
    bases: fn() -> Vec<ContextType>,
}

impl ContextType {
    /// 从上下文类型获取描述
    pub fn of<T: ContextKind>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            bases: T::bases,
        }
    }

    /// 通用上下文根类型，匹配任意非空上下文
    pub fn any() -> Self {
        Self::of::<AnyContext>()
    }

    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<AnyContext>()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// 声明顺序的直接基类
    pub fn bases(&self) -> Vec<ContextType> {
        (self.bases)()
    }

    /// 上下文类型链：自身、祖先（从具体到一般），最后是 [`ContextType::any`]
    ///
    /// 优先使用 C3 线性化；层次结构不存在 C3 线性化时，退化为深度优先、
    /// 从左到右、去重（保留首次出现）的顺序。每个类型只计算一次。
    pub fn linearize(&self) -> Arc<[ContextType]> {
        if let Some(chain) = LINEARIZATIONS.get(&self.id) {
            return Arc::clone(chain.value());
        }

        let mut chain = c3_linearize(*self).unwrap_or_else(|| {
            tracing::warn!(
                context_type = self.name,
                "上下文类型层次不存在 C3 线性化，退化为深度优先顺序"
            );
            depth_first(*self)
        });
        if !chain.iter().any(ContextType::is_any) {
            chain.push(Self::any());
        }

        let chain: Arc<[ContextType]> = chain.into();
        LINEARIZATIONS
            .entry(self.id)
            .or_insert_with(|| Arc::clone(&chain));
        chain
    }
}

static LINEARIZATIONS: Lazy<DashMap<TypeId, Arc<[ContextType]>>> = Lazy::new(DashMap::new);

fn c3_linearize(ty: ContextType) -> Option<Vec<ContextType>> {
    let bases = ty.bases();
    let mut sequences = Vec::with_capacity(bases.len() + 1);
    for base in &bases {
        sequences.push(c3_linearize(*base)?);
    }
    sequences.push(bases);

    let mut result = vec![ty];
    loop {
        sequences.retain(|sequence| !sequence.is_empty());
        if sequences.is_empty() {
            return Some(result);
        }

        // 候选项：某个序列的头部，且不出现在任何序列的尾部
        let candidate = sequences.iter().map(|sequence| sequence[0]).find(|head| {
            sequences
                .iter()
                .all(|sequence| !sequence[1..].contains(head))
        })?;

        result.push(candidate);
        for sequence in &mut sequences {
            if sequence[0] == candidate {
                sequence.remove(0);
            }
        }
    }
}

fn depth_first(ty: ContextType) -> Vec<ContextType> {
    fn visit(ty: ContextType, out: &mut Vec<ContextType>) {
        if out.contains(&ty) {
            return;
        }
        out.push(ty);
        for base in ty.bases() {
            visit(base, out);
        }
    }

    let mut out = Vec::new();
    visit(ty, &mut out);
    out
}

impl PartialEq for ContextType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContextType {}

impl Hash for ContextType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextType({})", self.name)
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

fn short_type_name(name: &str) -> &str {
    // 泛型参数中也可能包含 `::`，只截取最外层路径
    let outer = name.split('<').next().unwrap_or(name);
    let start = outer.rfind("::").map_or(0, |index| index + 2);
    &name[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Base;
    #[derive(Debug)]
    struct Left;
    #[derive(Debug)]
    struct Right;
    #[derive(Debug)]
    struct Diamond;

    impl ContextKind for Base {}

    impl ContextKind for Left {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Base>()]
        }
    }

    impl ContextKind for Right {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Base>()]
        }
    }

    impl ContextKind for Diamond {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Left>(), ContextType::of::<Right>()]
        }
    }

    // X(A, B), Y(B, A)：无法 C3 线性化
    #[derive(Debug)]
    struct X;
    #[derive(Debug)]
    struct Y;
    #[derive(Debug)]
    struct Conflict;

    impl ContextKind for X {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Left>(), ContextType::of::<Right>()]
        }
    }

    impl ContextKind for Y {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<Right>(), ContextType::of::<Left>()]
        }
    }

    impl ContextKind for Conflict {
        fn bases() -> Vec<ContextType> {
            vec![ContextType::of::<X>(), ContextType::of::<Y>()]
        }
    }

    fn names(chain: &[ContextType]) -> Vec<&'static str> {
        chain.iter().map(ContextType::short_name).collect()
    }

    #[test]
    fn test_capability_identity() {
        assert_eq!(Capability::of::<String>(), Capability::of::<String>());
        assert_ne!(Capability::of::<String>(), Capability::of::<u32>());
        assert_ne!(Capability::of::<String>(), Capability::any());
        assert!(Capability::default().is_any());
        assert_eq!(Capability::of::<Vec<String>>().short_name(), "Vec<alloc::string::String>");
    }

    #[test]
    fn test_single_inheritance_chain() {
        let chain = ContextType::of::<Left>().linearize();
        assert_eq!(names(&chain), vec!["Left", "Base", "AnyContext"]);
    }

    #[test]
    fn test_diamond_follows_c3() {
        let chain = ContextType::of::<Diamond>().linearize();
        assert_eq!(
            names(&chain),
            vec!["Diamond", "Left", "Right", "Base", "AnyContext"]
        );
    }

    #[test]
    fn test_inconsistent_hierarchy_falls_back_to_depth_first() {
        let chain = ContextType::of::<Conflict>().linearize();
        assert_eq!(
            names(&chain),
            vec!["Conflict", "X", "Left", "Base", "Right", "Y", "AnyContext"]
        );
    }

    #[test]
    fn test_linearization_is_cached() {
        let first = ContextType::of::<Diamond>().linearize();
        let second = ContextType::of::<Diamond>().linearize();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
