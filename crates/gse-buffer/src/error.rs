//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义虚拟缓冲 / 虚拟分片的全部失败语义，让上层封装与重组逻辑可以精确映射为协议级错误；
//! - 区分“资源耗尽”“容量越界”“别名冲突”“生命周期违规”四类，便于调用方决定是否放弃当前 PDU。
//!
//! ## 设计要求（What）
//! - 所有变体派生 [`thiserror::Error`]，兼容 `std::error::Error` 与 `?` 传播；
//! - 每个变体提供稳定错误码（[`VirtualBufferError::code`]），日志与告警以错误码为维度聚合；
//! - 内部不变量破坏（窗口越出分配区域等）不属于本枚举，一律以断言终止。

use thiserror::Error;

/// 本 crate 的统一返回类型。
pub type Result<T, E = VirtualBufferError> = core::result::Result<T, E>;

/// 错误类别，与错误码前缀一一对应。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// 底层内存无法获得。
    ResourceExhaustion,
    /// 请求的负载超过预留空间。
    Capacity,
    /// 操作会破坏“同一分配至多两个视图”的约束。
    Aliasing,
    /// 在非法的生命周期状态下释放或复制。
    Lifecycle,
}

/// 虚拟缓冲层的错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：每个操作要么完整成功，要么返回一个具体的失败原因且不留下副作用；
///   调用方据此决定丢弃 PDU、等待兄弟视图释放，或把错误上抛为“PDU 过大”等协议错误。
/// - **契约 (What)**：
///   - 所有变体均为 `Clone + Eq`，便于在测试中直接比较；
///   - 携带的数值字段（请求长度、当前视图数）仅用于诊断，不参与控制流。
/// - **风险 (Trade-offs)**：`NoActiveViews` 与 `ReferencedByViews` 在类型系统约束下通常不可达，
///   出现即说明计数被破坏，应视为缺陷而非输入问题。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum VirtualBufferError {
    /// 无法分配底层区域，或区域长度计算溢出。
    #[error("unable to allocate a virtual buffer of {requested} bytes")]
    AllocationFailed { requested: usize },

    /// 拷贝的负载长于分配时预留的负载容量。
    #[error("payload of {requested} bytes exceeds the {available} bytes reserved for data")]
    CapacityExceeded { requested: usize, available: usize },

    /// 同一分配上存在多个视图时拒绝覆写负载。
    #[error("{views} fragments share the virtual buffer, payload copy refused")]
    MultipleViewsActive { views: usize },

    /// 分配已经被两个视图引用，不能再复制出第三个。
    #[error("virtual buffer already referenced by {views} fragments")]
    TooManyViews { views: usize },

    /// 源分片为空，没有可拆分的数据。
    #[error("source fragment is empty, nothing to duplicate")]
    EmptySource,

    /// 释放时分配的视图计数已经为零（重复释放）。
    #[error("virtual buffer has no active fragment to release")]
    NoActiveViews,

    /// 仍有视图引用时尝试销毁分配。
    #[error("virtual buffer still referenced by {views} fragments")]
    ReferencedByViews { views: usize },

    /// 兄弟视图持有的字节借用与本次借用冲突。
    #[error("virtual buffer region is already borrowed by a fragment")]
    RegionBorrowed,
}

impl VirtualBufferError {
    /// 返回稳定的点分错误码。
    pub fn code(&self) -> &'static str {
        match self {
            VirtualBufferError::AllocationFailed { .. } => "vbuf.alloc_failed",
            VirtualBufferError::CapacityExceeded { .. } => "vfrag.data_too_long",
            VirtualBufferError::MultipleViewsActive { .. } => "vfrag.multiple_access",
            VirtualBufferError::TooManyViews { .. } => "vfrag.too_many_views",
            VirtualBufferError::EmptySource => "vfrag.empty",
            VirtualBufferError::NoActiveViews => "vfrag.no_active_view",
            VirtualBufferError::ReferencedByViews { .. } => "vbuf.still_referenced",
            VirtualBufferError::RegionBorrowed => "vbuf.region_borrowed",
        }
    }

    /// 返回错误所属类别。
    pub fn kind(&self) -> ErrorKind {
        match self {
            VirtualBufferError::AllocationFailed { .. } => ErrorKind::ResourceExhaustion,
            VirtualBufferError::CapacityExceeded { .. } => ErrorKind::Capacity,
            VirtualBufferError::MultipleViewsActive { .. }
            | VirtualBufferError::TooManyViews { .. }
            | VirtualBufferError::RegionBorrowed => ErrorKind::Aliasing,
            VirtualBufferError::EmptySource
            | VirtualBufferError::NoActiveViews
            | VirtualBufferError::ReferencedByViews { .. } => ErrorKind::Lifecycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_kind_prefixes() {
        let alloc = VirtualBufferError::AllocationFailed { requested: 8 };
        assert_eq!(alloc.kind(), ErrorKind::ResourceExhaustion);
        assert!(alloc.code().starts_with("vbuf."));

        let aliasing = VirtualBufferError::TooManyViews { views: 2 };
        assert_eq!(aliasing.kind(), ErrorKind::Aliasing);
        assert_eq!(aliasing.code(), "vfrag.too_many_views");

        assert_eq!(VirtualBufferError::EmptySource.kind(), ErrorKind::Lifecycle);
        assert_eq!(VirtualBufferError::RegionBorrowed.kind(), ErrorKind::Aliasing);
    }

    #[test]
    fn display_carries_diagnostic_fields() {
        let err = VirtualBufferError::CapacityExceeded {
            requested: 120,
            available: 100,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("120"), "应包含请求长度：{rendered}");
        assert!(rendered.contains("100"), "应包含可用容量：{rendered}");
    }
}
