use gse_buffer::{FragmentFactory, VirtualFragment};
use tracing::{debug, warn};

use crate::{
    error::EncapError,
    label::{Label, LabelType},
};

/// Protocol Type 字段长度。
pub const PROTOCOL_TYPE_LENGTH: usize = 2;

/// Total Length 字段（16 比特）可表示的最大值。
pub const MAX_TOTAL_LENGTH: usize = 0xFFFF;

/// 封装上下文：持有一个承载 PDU 的虚拟分片与封装所需的协议字段。
///
/// # 教案式说明
/// - **意图 (Why)**：分片 / 重组状态机按 QoS 维护上下文，每个上下文对应一个正在被切分的 PDU；
///   PDU 字节留在虚拟分片里，上下文只额外记录头部字段。
/// - **契约 (What)**：
///   - `total_length = pdu_len + 2 + label_len`，构造时校验其不超过 16 比特；
///   - [`frag_number`](Self::frag_number) 直接委托给底层分片的视图计数，
///     据此判断当前是否已有一个拆出的分片尚未释放；
///   - `fragment_count` 记录已发出的分片数，由封装逻辑通过 [`record_fragment`](Self::record_fragment) 推进。
#[derive(Debug)]
pub struct EncapContext {
    vfrag: VirtualFragment,
    label: Label,
    total_length: u16,
    protocol_type: u16,
    qos: u8,
    frag_nbr: u32,
}

impl EncapContext {
    /// 以已经承载 PDU 的分片构造上下文。
    ///
    /// 长度越界时返回 [`EncapError::PduTooLong`]，分片随错误一并释放。
    pub fn new(
        vfrag: VirtualFragment,
        label: Label,
        protocol_type: u16,
        qos: u8,
    ) -> Result<Self, EncapError> {
        let total_length = total_length(vfrag.len(), &label)?;
        debug!(
            pdu_len = vfrag.len(),
            total_length, qos, "encapsulation context created"
        );
        Ok(Self {
            vfrag,
            label,
            total_length,
            protocol_type,
            qos,
            frag_nbr: 0,
        })
    }

    /// 拷贝 `pdu` 到新分配的分片并构造上下文。
    ///
    /// 长度在分配之前校验，过长的 PDU 不会产生任何分配。
    pub fn from_pdu(
        factory: &FragmentFactory,
        pdu: &[u8],
        label: Label,
        protocol_type: u16,
        qos: u8,
    ) -> Result<Self, EncapError> {
        total_length(pdu.len(), &label)?;
        let vfrag = factory.create_view_with_data(pdu.len(), pdu)?;
        Self::new(vfrag, label, protocol_type, qos)
    }

    /// 承载 PDU 的分片。
    pub fn fragment(&self) -> &VirtualFragment {
        &self.vfrag
    }

    /// 可变访问承载 PDU 的分片，用于拆分后平移。
    pub fn fragment_mut(&mut self) -> &mut VirtualFragment {
        &mut self.vfrag
    }

    /// 封装使用的标签。
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// 标签对应的类型字段。
    pub fn label_type(&self) -> LabelType {
        self.label.label_type()
    }

    /// Total Length 字段：PDU、Protocol Type 与标签的字节数之和。
    pub fn total_length(&self) -> u16 {
        self.total_length
    }

    /// Protocol Type 字段（EtherType）。
    pub fn protocol_type(&self) -> u16 {
        self.protocol_type
    }

    /// QoS 值，同时用作 FragID。
    pub fn qos(&self) -> u8 {
        self.qos
    }

    /// 已发出的分片数。
    pub fn fragment_count(&self) -> u32 {
        self.frag_nbr
    }

    /// 记录一个分片已发出，返回更新后的计数。
    pub fn record_fragment(&mut self) -> u32 {
        self.frag_nbr = self.frag_nbr.saturating_add(1);
        self.frag_nbr
    }

    /// 底层分配当前的视图数。
    pub fn frag_number(&self) -> usize {
        self.vfrag.view_count()
    }

    /// 释放上下文持有的分片。
    pub fn release(self) -> Result<(), EncapError> {
        self.vfrag.release()?;
        Ok(())
    }

    /// 交出分片所有权，丢弃协议字段。
    pub fn into_fragment(self) -> VirtualFragment {
        self.vfrag
    }
}

fn total_length(pdu_len: usize, label: &Label) -> Result<u16, EncapError> {
    let max = MAX_TOTAL_LENGTH - PROTOCOL_TYPE_LENGTH - label.len();
    if pdu_len > max {
        warn!(pdu_len, max, "PDU too large to encapsulate");
        return Err(EncapError::PduTooLong {
            length: pdu_len,
            max,
        });
    }
    Ok((pdu_len + PROTOCOL_TYPE_LENGTH + label.len()) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_length_counts_protocol_type_and_label() {
        let ctx = EncapContext::from_pdu(
            &FragmentFactory::default(),
            &[0u8; 100],
            Label::SixBytes([1; 6]),
            0x0800,
            3,
        )
        .expect("构造上下文应成功");
        assert_eq!(ctx.total_length(), 108);
        assert_eq!(ctx.label_type(), LabelType::SixBytes);
        assert_eq!(ctx.protocol_type(), 0x0800);
        assert_eq!(ctx.qos(), 3);
        assert_eq!(ctx.fragment_count(), 0);
    }

    #[test]
    fn boundary_pdu_length_is_accepted() {
        assert_eq!(total_length(65533, &Label::Broadcast), Ok(0xFFFF));
        assert_eq!(
            total_length(65528, &Label::SixBytes([0; 6])),
            Err(EncapError::PduTooLong {
                length: 65528,
                max: 65527
            })
        );
    }
}
