//! 虚拟分片性质验证
//!
//! - **核心目标 (Why)**：对任意容量与负载组合验证创建、拷贝、拆分的契约，而不是只检查几个手选样例。
//! - **设计手法 (How)**：使用 Proptest 生成 `(capacity, payload, split_len)`；
//!   负载长度既可能落在容量以内，也可能越界，分别断言成功路径与失败路径。

use std::{cell::Cell, rc::Rc};

use gse_buffer::{
    FragmentFactory, ReleaseObserver, ReleasedBuffer, VirtualBufferError, VirtualFragment,
};
use proptest::prelude::*;

#[derive(Default)]
struct CountingObserver {
    releases: Cell<usize>,
}

impl ReleaseObserver for CountingObserver {
    fn on_release(&self, _released: ReleasedBuffer) {
        self.releases.set(self.releases.get() + 1);
    }
}

proptest! {
    /// 任意容量的空分片长度为 0、视图数为 1。
    #[test]
    fn prop_created_view_is_empty_and_exclusive(capacity in 0usize..4096) {
        let view = VirtualFragment::create(capacity).expect("合理容量的分配应成功");
        prop_assert_eq!(view.len(), 0);
        prop_assert_eq!(view.view_count(), 1);
        prop_assert_eq!(view.capacity(), capacity);
    }

    /// 容量足够时负载逐字节往返；不足时报告越界并归还分配。
    #[test]
    fn prop_create_with_data_roundtrip_or_unwind(
        capacity in 0usize..256,
        payload in proptest::collection::vec(any::<u8>(), 0..320),
    ) {
        let observer = Rc::new(CountingObserver::default());
        let factory = FragmentFactory::default().with_observer(observer.clone());
        match factory.create_view_with_data(capacity, &payload) {
            Ok(view) => {
                prop_assert!(payload.len() <= capacity);
                prop_assert_eq!(&*view.bytes(), payload.as_slice());
                prop_assert_eq!(view.view_count(), 1);
                drop(view);
            }
            Err(err) => {
                prop_assert!(payload.len() > capacity);
                prop_assert_eq!(
                    err,
                    VirtualBufferError::CapacityExceeded {
                        requested: payload.len(),
                        available: capacity,
                    }
                );
            }
        }
        prop_assert_eq!(observer.releases.get(), 1);
    }

    /// 拆分长度为 `min(L, father.len)`，内容为父分片前缀，计数在双方同步为 2。
    #[test]
    fn prop_duplicate_takes_clamped_prefix(
        payload in proptest::collection::vec(any::<u8>(), 1..128),
        split_len in 0usize..256,
    ) {
        let father = VirtualFragment::create_with_data(payload.len(), &payload)
            .expect("创建应成功");
        let child = father.duplicate(split_len).expect("非空分片拆分应成功");
        let expected = split_len.min(payload.len());
        prop_assert_eq!(child.len(), expected);
        prop_assert_eq!(&*child.bytes(), &payload[..expected]);
        prop_assert_eq!(father.view_count(), 2);
        prop_assert_eq!(child.view_count(), 2);
        prop_assert!(father.duplicate(1).is_err());
    }
}
