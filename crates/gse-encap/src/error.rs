//! 封装上下文的错误域：在缓冲层错误之上补充协议级语义。

use gse_buffer::VirtualBufferError;
use thiserror::Error;

/// 封装上下文错误。
///
/// # 教案式说明
/// - **意图 (Why)**：缓冲层只知道“容量不足”“视图过多”；封装层需要把它们翻译成
///   “PDU 过大无法封装”等协议语义，供上层决定丢弃还是告警。
/// - **契约 (What)**：缓冲层错误通过 `#[from]` 原样包装，`?` 可直接传播。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EncapError {
    /// 缓冲层操作失败。
    #[error(transparent)]
    Buffer(#[from] VirtualBufferError),

    /// PDU 加上协议类型与标签后超过 Total Length 字段的表示范围。
    #[error("PDU of {length} bytes is too large to encapsulate (max {max})")]
    PduTooLong { length: usize, max: usize },

    /// 标签类型字段取值不在 0..=3。
    #[error("invalid label type {0}")]
    InvalidLabelType(u8),
}

impl EncapError {
    /// 稳定错误码；缓冲层错误沿用其自身错误码。
    pub fn code(&self) -> &'static str {
        match self {
            EncapError::Buffer(inner) => inner.code(),
            EncapError::PduTooLong { .. } => "encap.pdu_too_long",
            EncapError::InvalidLabelType(_) => "encap.invalid_label_type",
        }
    }
}
