use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt, mem,
    rc::Rc,
};

use tracing::{trace, warn};

use crate::{
    error::{Result, VirtualBufferError},
    layout::{MAX_VIEWS_PER_BUFFER, ReserveLayout},
    window::Window,
};

/// `ReleaseObserver` 描述虚拟缓冲被销毁时的通知入口。
///
/// # 设计初衷（Why）
/// - 分配区域只在最后一个视图释放时销毁；把这一刻显式化，上层就能统计活跃分配、
///   校验“恰好销毁一次”，而无需在每个调用点自行追踪计数。
///
/// # 契约定义（What）
/// - 每块虚拟缓冲在其视图计数由 1 归零时调用 `on_release` 恰好一次；
/// - 调用发生在底层内存已归还之后，实现不得 panic，否则 `Drop` 路径会中止进程。
pub trait ReleaseObserver {
    /// 通知一块虚拟缓冲已销毁。
    fn on_release(&self, released: ReleasedBuffer);
}

/// 一次销毁动作携带的上下文。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReleasedBuffer {
    length: usize,
    layout: ReserveLayout,
}

impl ReleasedBuffer {
    /// 构造销毁记录。
    pub(crate) fn new(length: usize, layout: ReserveLayout) -> Self {
        Self { length, layout }
    }

    /// 被销毁区域的总长度（含预留空间）。
    pub fn length(&self) -> usize {
        self.length
    }

    /// 该区域使用的预留布局。
    pub fn layout(&self) -> ReserveLayout {
        self.layout
    }

    /// 区域中用于负载的字节数。
    pub fn payload_capacity(&self) -> usize {
        self.layout.payload_capacity(self.length)
    }
}

/// 虚拟缓冲：一段连续堆内存及引用它的视图计数。
///
/// # 角色定位（Why）
/// - 多个 [`VirtualFragment`](crate::VirtualFragment) 通过 `Rc` 共享同一块缓冲，
///   但“是否还能再拆分”“何时销毁”由显式的 `view_count` 决定，而不是 `Rc` 的强引用数；
///   这样上限 2 是一条领域约束，在 `duplicate` 中检查，而非泛型共享指针的副作用。
///
/// # 结构设计（How）
/// - `region`：长度固定的字节区域，`RefCell` 保证同一线程内的读写借用不冲突；
/// - `view_count`：当前存活视图数，取值恒在 `0..=2`；
/// - `released`：区域是否已归还，用于断言“恰好销毁一次”。
///
/// # 契约说明（What）
/// - 创建时 `view_count == 0`，由第一个视图挂接；
/// - 只有 `view_count == 0` 时才允许销毁，否则返回 [`VirtualBufferError::ReferencedByViews`]；
/// - 类型是 `!Send`/`!Sync`，一块缓冲及其视图被限制在单一线程内。
pub(crate) struct VirtualBuffer {
    region: RefCell<Vec<u8>>,
    length: usize,
    layout: ReserveLayout,
    view_count: Cell<usize>,
    released: Cell<bool>,
    observer: Option<Rc<dyn ReleaseObserver>>,
}

impl VirtualBuffer {
    /// 分配 `length` 字节的区域，初始视图计数为 0。
    ///
    /// 分配器无法满足请求时返回 [`VirtualBufferError::AllocationFailed`]，不会中止进程。
    pub(crate) fn allocate(
        length: usize,
        layout: ReserveLayout,
        observer: Option<Rc<dyn ReleaseObserver>>,
    ) -> Result<Self> {
        let mut region = Vec::new();
        if region.try_reserve_exact(length).is_err() {
            warn!(length, "virtual buffer allocation failed");
            return Err(VirtualBufferError::AllocationFailed { requested: length });
        }
        region.resize(length, 0);
        trace!(length, "virtual buffer allocated");
        Ok(Self {
            region: RefCell::new(region),
            length,
            layout,
            view_count: Cell::new(0),
            released: Cell::new(false),
            observer,
        })
    }

    /// 区域总长度，即区域末尾偏移。
    pub(crate) fn len(&self) -> usize {
        self.length
    }

    pub(crate) fn layout(&self) -> ReserveLayout {
        self.layout
    }

    pub(crate) fn view_count(&self) -> usize {
        self.view_count.get()
    }

    /// 登记一个新视图，返回登记后的计数。
    ///
    /// 调用方负责事先检查上限；超过上限说明检查被绕过，属于内部缺陷。
    pub(crate) fn attach(&self) -> usize {
        let views = self.view_count.get() + 1;
        assert!(
            views <= MAX_VIEWS_PER_BUFFER,
            "virtual buffer attached to {views} fragments"
        );
        self.view_count.set(views);
        views
    }

    /// 注销一个视图；计数归零时销毁区域。返回注销后的计数。
    pub(crate) fn detach(&self) -> Result<usize> {
        let views = self.view_count.get();
        if views == 0 {
            warn!("fragment released twice: virtual buffer has no active view");
            return Err(VirtualBufferError::NoActiveViews);
        }
        let views = views - 1;
        self.view_count.set(views);
        if views == 0 {
            self.release()?;
        }
        Ok(views)
    }

    /// 归还区域内存并通知观察者。
    pub(crate) fn release(&self) -> Result<()> {
        let views = self.view_count.get();
        if views != 0 {
            warn!(views, "refusing to free a referenced virtual buffer");
            return Err(VirtualBufferError::ReferencedByViews { views });
        }
        assert!(
            !self.released.replace(true),
            "virtual buffer of {} bytes released twice",
            self.length
        );
        drop(mem::take(&mut *self.region.borrow_mut()));
        trace!(length = self.length, "virtual buffer freed");
        if let Some(observer) = &self.observer {
            observer.on_release(ReleasedBuffer::new(self.length, self.layout));
        }
        Ok(())
    }

    /// 借出窗口覆盖的只读字节。
    pub(crate) fn bytes(&self, window: Window) -> Ref<'_, [u8]> {
        Ref::map(self.region.borrow(), |region| {
            &region[window.start()..window.end()]
        })
    }

    /// 借出窗口覆盖的可写字节。
    pub(crate) fn bytes_mut(&self, window: Window) -> RefMut<'_, [u8]> {
        RefMut::map(self.region.borrow_mut(), |region| {
            &mut region[window.start()..window.end()]
        })
    }

    /// 与 [`bytes`](Self::bytes) 相同，但区域正被可写借出时返回错误而不是 panic。
    pub(crate) fn try_bytes(&self, window: Window) -> Result<Ref<'_, [u8]>> {
        let region = self.region.try_borrow().map_err(|_| {
            warn!(%window, "virtual buffer region is mutably borrowed");
            VirtualBufferError::RegionBorrowed
        })?;
        Ok(Ref::map(region, |region| {
            &region[window.start()..window.end()]
        }))
    }

    /// 与 [`bytes_mut`](Self::bytes_mut) 相同，但区域已被借出时返回错误而不是 panic。
    pub(crate) fn try_bytes_mut(&self, window: Window) -> Result<RefMut<'_, [u8]>> {
        let region = self.region.try_borrow_mut().map_err(|_| {
            warn!(%window, "virtual buffer region is already borrowed");
            VirtualBufferError::RegionBorrowed
        })?;
        Ok(RefMut::map(region, |region| {
            &mut region[window.start()..window.end()]
        }))
    }

    #[cfg(test)]
    pub(crate) fn force_view_count(&self, views: usize) {
        self.view_count.set(views);
    }
}

impl fmt::Debug for VirtualBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualBuffer")
            .field("length", &self.length)
            .field("layout", &self.layout)
            .field("view_count", &self.view_count.get())
            .field("released", &self.released.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        releases: Cell<usize>,
        last_length: Cell<usize>,
    }

    impl ReleaseObserver for Counting {
        fn on_release(&self, released: ReleasedBuffer) {
            self.releases.set(self.releases.get() + 1);
            self.last_length.set(released.length());
        }
    }

    #[test]
    fn allocate_starts_without_views() {
        let vbuf = VirtualBuffer::allocate(117, ReserveLayout::GSE, None).expect("分配应成功");
        assert_eq!(vbuf.len(), 117);
        assert_eq!(vbuf.view_count(), 0);
        assert_eq!(vbuf.bytes(Window::new(0, 117, 117)).len(), 117);
    }

    #[test]
    fn allocate_reports_unobtainable_memory() {
        let err = VirtualBuffer::allocate(usize::MAX, ReserveLayout::GSE, None)
            .expect_err("超过 isize::MAX 的请求不可能被满足");
        assert_eq!(
            err,
            VirtualBufferError::AllocationFailed {
                requested: usize::MAX
            }
        );
    }

    #[test]
    fn release_is_refused_while_views_remain() {
        let observer = Rc::new(Counting::default());
        let vbuf = VirtualBuffer::allocate(32, ReserveLayout::GSE, Some(observer.clone()))
            .expect("分配应成功");
        vbuf.attach();
        assert_eq!(
            vbuf.release(),
            Err(VirtualBufferError::ReferencedByViews { views: 1 })
        );
        assert_eq!(observer.releases.get(), 0, "拒绝销毁时不得通知观察者");

        assert_eq!(vbuf.detach(), Ok(0));
        assert_eq!(observer.releases.get(), 1);
        assert_eq!(observer.last_length.get(), 32);
    }

    #[test]
    fn detach_without_views_is_rejected() {
        let vbuf = VirtualBuffer::allocate(8, ReserveLayout::GSE, None).expect("分配应成功");
        assert_eq!(vbuf.detach(), Err(VirtualBufferError::NoActiveViews));
        assert_eq!(vbuf.view_count(), 0);
    }

    #[test]
    #[should_panic(expected = "attached to 3 fragments")]
    fn third_attach_is_fatal() {
        let vbuf = VirtualBuffer::allocate(8, ReserveLayout::GSE, None).expect("分配应成功");
        vbuf.attach();
        vbuf.attach();
        vbuf.attach();
    }
}
