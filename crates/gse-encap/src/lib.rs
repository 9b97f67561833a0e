//! `gse-encap` 是虚拟分片的直接消费者：GSE 封装上下文。
//!
//! # 模块定位（Why）
//! - 上下文持有恰好一个承载 PDU 的 [`gse_buffer::VirtualFragment`]，外加 Label、Label Type、
//!   Protocol Type、Total Length、QoS / FragID 与分片计数；
//! - 头部编码、CRC 与分片状态机不在此处实现，本 crate 只约定它们读取的上下文边界。
//!
//! # 错误映射（How）
//! - 缓冲层错误以 [`EncapError::Buffer`] 原样包装；
//! - 超出 16 比特 Total Length 的 PDU 在分配之前即以 [`EncapError::PduTooLong`] 拒绝。

mod context;
mod error;
mod label;

pub use context::{EncapContext, MAX_TOTAL_LENGTH, PROTOCOL_TYPE_LENGTH};
pub use error::EncapError;
pub use label::{Label, LabelType};
