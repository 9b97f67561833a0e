//! 预留空间布局：每块虚拟缓冲在负载之外额外携带的头部 / 尾部字节。
//!
//! # 模块定位（Why）
//! - GSE 头部在封装时原地写入负载之前，CRC32 尾部追加在最后一个分片之后；
//!   分配时一次性预留这两段空间，后续只移动视图边界即可，无需重新分配或拷贝。
//! - 布局以值类型出现，便于在测试或其它封装协议中替换为不同的头部上限。
//!
//! # 契约（What）
//! - 区域长度恒为 `capacity + max_header_len + trailer_len`，计算溢出视为分配失败；
//! - 视图初始位置恒为区域起点之后的 `max_header_len` 字节处。

use crate::error::{Result, VirtualBufferError};

/// GSE 头部的最大长度：2 字节固定头 + 1 字节 FragID + 2 字节 Total Length
/// + 2 字节 Protocol Type + 6 字节 Label。
pub const MAX_HEADER_LENGTH: usize = 13;

/// CRC32 尾部长度。
pub const CRC_LENGTH: usize = 4;

/// 同一块虚拟缓冲允许同时存在的最大视图数：父视图加一个拆分出的子视图。
pub const MAX_VIEWS_PER_BUFFER: usize = 2;

/// 描述虚拟缓冲两端预留空间的布局参数。
///
/// # 教案式说明
/// - **意图 (Why)**：把“头部最大长度”和“尾部长度”从常量提升为可注入参数，
///   缓冲层本身不关心具体协议，只负责保证这两段空间存在。
/// - **契约 (What)**：
///   - `max_header_len`：视图起点之前的预留字节数，必须不小于任何可能写入的头部；
///   - `trailer_len`：负载容量之后的预留字节数，用于追加完整性校验尾部；
///   - 启用 `serde` 特性时可从配置源反序列化，缺省字段回落到 GSE 取值。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ReserveLayout {
    /// 头部预留字节数。
    pub max_header_len: usize,
    /// 尾部预留字节数。
    pub trailer_len: usize,
}

impl ReserveLayout {
    /// GSE 协议使用的布局。
    pub const GSE: ReserveLayout = ReserveLayout {
        max_header_len: MAX_HEADER_LENGTH,
        trailer_len: CRC_LENGTH,
    };

    /// 以显式参数构造布局。
    pub const fn new(max_header_len: usize, trailer_len: usize) -> Self {
        Self {
            max_header_len,
            trailer_len,
        }
    }

    /// 两端预留空间之和；溢出时返回 `None`。
    pub fn reserved(&self) -> Option<usize> {
        self.max_header_len.checked_add(self.trailer_len)
    }

    /// 计算承载 `capacity` 字节负载所需的区域长度。
    ///
    /// 任何一步加法溢出都报告为 [`VirtualBufferError::AllocationFailed`]，
    /// 因为这样的长度同样无法从分配器获得。
    pub fn buffer_len(&self, capacity: usize) -> Result<usize> {
        self.reserved()
            .and_then(|reserved| capacity.checked_add(reserved))
            .ok_or(VirtualBufferError::AllocationFailed {
                requested: usize::MAX,
            })
    }

    /// 给定区域长度，返回其中可用于负载的字节数。
    pub fn payload_capacity(&self, region_len: usize) -> usize {
        match self.reserved() {
            Some(reserved) => region_len.saturating_sub(reserved),
            None => 0,
        }
    }
}

impl Default for ReserveLayout {
    fn default() -> Self {
        Self::GSE
    }
}
