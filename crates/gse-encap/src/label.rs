//! GSE 标签与标签类型。
//!
//! 标签类型占据 GSE 固定头中的 2 个比特：
//!
//! ```text
//! 0 = 6 字节标签   1 = 3 字节标签   2 = 广播（无标签）   3 = 复用上一个标签（无标签）
//! ```

use crate::error::EncapError;

/// 标签类型字段。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum LabelType {
    /// 6 字节标签。
    SixBytes = 0,
    /// 3 字节标签。
    ThreeBytes = 1,
    /// 广播，不携带标签。
    Broadcast = 2,
    /// 复用同一帧中上一个分片的标签，不携带标签。
    Reuse = 3,
}

impl LabelType {
    /// 该类型在头部中占用的标签字节数。
    pub fn label_len(self) -> usize {
        match self {
            LabelType::SixBytes => 6,
            LabelType::ThreeBytes => 3,
            LabelType::Broadcast | LabelType::Reuse => 0,
        }
    }

    /// 字段的线上取值。
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LabelType {
    type Error = EncapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LabelType::SixBytes),
            1 => Ok(LabelType::ThreeBytes),
            2 => Ok(LabelType::Broadcast),
            3 => Ok(LabelType::Reuse),
            other => Err(EncapError::InvalidLabelType(other)),
        }
    }
}

/// 标签值，变体与 [`LabelType`] 一一对应。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Label {
    /// 6 字节标签（通常为 MAC 地址）。
    SixBytes([u8; 6]),
    /// 3 字节标签。
    ThreeBytes([u8; 3]),
    /// 广播。
    Broadcast,
    /// 复用上一个标签。
    Reuse,
}

impl Label {
    /// 标签对应的类型字段。
    pub fn label_type(&self) -> LabelType {
        match self {
            Label::SixBytes(_) => LabelType::SixBytes,
            Label::ThreeBytes(_) => LabelType::ThreeBytes,
            Label::Broadcast => LabelType::Broadcast,
            Label::Reuse => LabelType::Reuse,
        }
    }

    /// 标签字节数。
    pub fn len(&self) -> usize {
        self.label_type().label_len()
    }

    /// 是否不携带标签字节。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 标签的线上字节。
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Label::SixBytes(bytes) => bytes,
            Label::ThreeBytes(bytes) => bytes,
            Label::Broadcast | Label::Reuse => &[],
        }
    }
}
