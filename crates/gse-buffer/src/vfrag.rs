use std::{
    cell::{Ref, RefMut},
    fmt,
    rc::Rc,
};

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use crate::{
    error::{Result, VirtualBufferError},
    layout::{MAX_VIEWS_PER_BUFFER, ReserveLayout},
    vbuf::{ReleaseObserver, VirtualBuffer},
    window::Window,
};

/// `FragmentFactory` 负责按布局创建虚拟分片，并为其分配注入销毁观察者。
///
/// # 设计动机（Why）
/// - 预留布局与观察者是“每块分配”的配置，而不是每次调用的参数；
///   将它们收拢到工厂中，封装器只需持有一个工厂即可反复创建分片。
/// - [`VirtualFragment::create`] 等便捷入口使用默认工厂（GSE 布局、无观察者）。
///
/// # 契约说明（What）
/// - 工厂本身无状态，克隆代价为一次 `Rc` 计数递增；
/// - 由同一工厂创建的所有分配共享同一个观察者实例。
#[derive(Clone, Default)]
pub struct FragmentFactory {
    layout: ReserveLayout,
    observer: Option<Rc<dyn ReleaseObserver>>,
}

impl FragmentFactory {
    /// 使用指定布局创建工厂。
    pub fn new(layout: ReserveLayout) -> Self {
        Self {
            layout,
            observer: None,
        }
    }

    /// 为之后创建的每块分配注入销毁观察者。
    pub fn with_observer(mut self, observer: Rc<dyn ReleaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// 工厂使用的预留布局。
    pub fn layout(&self) -> ReserveLayout {
        self.layout
    }

    /// 创建一个可承载 `capacity` 字节负载的空分片。
    ///
    /// # 契约
    /// - 区域长度为 `capacity + max_header_len + trailer_len`；
    /// - 返回的分片长度为 0，起点位于头部预留空间之后，视图计数为 1；
    /// - 内存不足或长度溢出时返回 [`VirtualBufferError::AllocationFailed`]，不留下任何分配。
    pub fn create_view(&self, capacity: usize) -> Result<VirtualFragment> {
        let length = self.layout.buffer_len(capacity)?;
        let vbuf = VirtualBuffer::allocate(length, self.layout, self.observer.clone())?;
        let window = Window::empty_at(self.layout.max_header_len, length);
        let fragment = VirtualFragment::attach(Rc::new(vbuf), window);
        debug!(capacity, length, "virtual fragment created");
        Ok(fragment)
    }

    /// 创建分片并拷贝 `data` 作为其负载。
    ///
    /// 任一步失败都会先释放已创建的分片，再返回原始错误。
    pub fn create_view_with_data(&self, capacity: usize, data: &[u8]) -> Result<VirtualFragment> {
        let mut fragment = self.create_view(capacity)?;
        if let Err(err) = fragment.copy_payload(data) {
            if let Err(release_err) = fragment.release() {
                error!(error = %release_err, "failed to unwind fragment after copy failure");
            }
            return Err(err);
        }
        Ok(fragment)
    }
}

impl fmt::Debug for FragmentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentFactory")
            .field("layout", &self.layout)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

/// `VirtualFragment` 是虚拟缓冲上的一段有界视图 `[start, end)`。
///
/// # 设计动机（Why）
/// - 封装与重组都需要在同一块内存上切出分片、剥离头部、追加尾部，而不拷贝负载；
///   视图只持有对缓冲的共享引用与一个受检窗口，所有“移动”都是偏移量运算。
/// - 同一缓冲至多被两个视图引用（父视图与一次拆分得到的子视图），
///   从而限制平移操作可能影响到的观察者数量。
///
/// # 架构关系（How）
/// - `vbuf`：通过 `Rc` 共享的 [`VirtualBuffer`]，其 `view_count` 记录领域意义上的视图数；
/// - `window`：受检区间，任何修改都重新校验 `start <= end <= region_len`；
/// - `released`：显式 [`release`](Self::release) 之后置位，避免 `Drop` 重复注销。
///
/// # 契约说明（What）
/// - 显式释放走 [`release`](Self::release) 并返回结果；直接丢弃时 `Drop` 执行同样的注销，
///   失败只记录日志；
/// - 最后一个视图注销时缓冲被销毁，且只销毁一次；
/// - 类型为 `!Send`/`!Sync`：一块分配及其视图只能在单一线程内使用。
pub struct VirtualFragment {
    vbuf: Rc<VirtualBuffer>,
    window: Window,
    released: bool,
}

impl VirtualFragment {
    /// 以 GSE 布局创建空分片，等价于 `FragmentFactory::default().create_view(capacity)`。
    pub fn create(capacity: usize) -> Result<Self> {
        FragmentFactory::default().create_view(capacity)
    }

    /// 以 GSE 布局创建分片并拷贝负载。
    pub fn create_with_data(capacity: usize, data: &[u8]) -> Result<Self> {
        FragmentFactory::default().create_view_with_data(capacity, data)
    }

    fn attach(vbuf: Rc<VirtualBuffer>, window: Window) -> Self {
        vbuf.attach();
        Self {
            vbuf,
            window,
            released: false,
        }
    }

    /// 将 `data` 拷贝到头部预留空间之后，并令分片恰好覆盖这段负载。
    ///
    /// # 契约
    /// - 缓冲被多个视图引用时返回 [`VirtualBufferError::MultipleViewsActive`]，避免改写兄弟视图的字节；
    /// - `data` 长于负载容量时返回 [`VirtualBufferError::CapacityExceeded`]；
    /// - 失败时分片保持原状。
    pub fn copy_payload(&mut self, data: &[u8]) -> Result<()> {
        let views = self.view_count();
        if views > 1 {
            warn!(views, "payload copy refused on a shared virtual buffer");
            return Err(VirtualBufferError::MultipleViewsActive { views });
        }
        let layout = self.vbuf.layout();
        let available = layout.payload_capacity(self.vbuf.len());
        if data.len() > available {
            warn!(
                requested = data.len(),
                available, "payload does not fit the virtual buffer"
            );
            return Err(VirtualBufferError::CapacityExceeded {
                requested: data.len(),
                available,
            });
        }
        let start = layout.max_header_len;
        let window = Window::new(start, start + data.len(), self.vbuf.len());
        self.vbuf.bytes_mut(window).copy_from_slice(data);
        self.window = window;
        trace!(length = data.len(), "payload copied into virtual fragment");
        Ok(())
    }

    /// 在同一缓冲上复制出子分片，覆盖 `[start, start + min(length, len))`。
    ///
    /// # 契约
    /// - 当前分片为空时返回 [`VirtualBufferError::EmptySource`]；
    /// - 缓冲已有两个视图时返回 [`VirtualBufferError::TooManyViews`]；
    /// - 成功后父子两侧的 [`view_count`](Self::view_count) 均为 2，负载字节不发生拷贝。
    pub fn duplicate(&self, length: usize) -> Result<VirtualFragment> {
        if self.is_empty() {
            return Err(VirtualBufferError::EmptySource);
        }
        let views = self.view_count();
        if views >= MAX_VIEWS_PER_BUFFER {
            warn!(views, "duplicate refused: virtual buffer already split");
            return Err(VirtualBufferError::TooManyViews { views });
        }
        let window = self.window.prefix(length, self.vbuf.len());
        let child = Self::attach(Rc::clone(&self.vbuf), window);
        debug!(
            requested = length,
            length = child.len(),
            "virtual fragment duplicated"
        );
        Ok(child)
    }

    /// 将起点前移 `start_delta`、终点前移 `end_delta` 字节，长度随之重算。
    ///
    /// 调用方负责保证结果仍满足 `start <= end <= region_len`（例如剥离已解析的头部、
    /// 纳入已写好的尾部）；违背时视为内部缺陷并 panic，而不是截断。
    #[track_caller]
    pub fn shift(&mut self, start_delta: usize, end_delta: usize) {
        self.window = self
            .window
            .advanced(start_delta, end_delta, self.vbuf.len());
        trace!(
            start = self.window.start(),
            end = self.window.end(),
            "virtual fragment shifted"
        );
    }

    /// 将起点后退 `start_delta`、终点后退 `end_delta` 字节。
    ///
    /// 用于在负载前暴露头部预留空间以原地写入头部，或剔除已校验的 CRC 尾部；
    /// 越过区域起点或令 `start > end` 时 panic。
    #[track_caller]
    pub fn rewind(&mut self, start_delta: usize, end_delta: usize) {
        self.window = self
            .window
            .rewound(start_delta, end_delta, self.vbuf.len());
        trace!(
            start = self.window.start(),
            end = self.window.end(),
            "virtual fragment rewound"
        );
    }

    /// 注销本视图；若它是缓冲的最后一个视图，则同时销毁缓冲。
    ///
    /// 缓冲视图计数已为 0 时返回 [`VirtualBufferError::NoActiveViews`]，不做任何修改。
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        let remaining = self.vbuf.detach()?;
        debug!(remaining, "virtual fragment released");
        Ok(())
    }

    /// 当前引用同一缓冲的视图数。
    pub fn view_count(&self) -> usize {
        self.vbuf.view_count()
    }

    /// 分片长度。
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// 分片是否不含负载。
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// 分片在区域内的受检窗口。
    pub fn window(&self) -> Window {
        self.window
    }

    /// 起点偏移。
    pub fn start(&self) -> usize {
        self.window.start()
    }

    /// 终点偏移（不含）。
    pub fn end(&self) -> usize {
        self.window.end()
    }

    /// 区域中可承载的负载字节数。
    pub fn capacity(&self) -> usize {
        self.vbuf.layout().payload_capacity(self.vbuf.len())
    }

    /// 起点之前尚可用于写入头部的字节数。
    pub fn headroom(&self) -> usize {
        self.window.start()
    }

    /// 终点之后尚可用于追加尾部的字节数。
    pub fn tailroom(&self) -> usize {
        self.vbuf.len() - self.window.end()
    }

    /// 分配所用的预留布局。
    pub fn layout(&self) -> ReserveLayout {
        self.vbuf.layout()
    }

    /// 两个分片是否引用同一块虚拟缓冲。
    pub fn shares_buffer_with(&self, other: &VirtualFragment) -> bool {
        Rc::ptr_eq(&self.vbuf, &other.vbuf)
    }

    /// 借出分片覆盖的字节。
    ///
    /// # Panics
    /// 借用作用于整块区域而不是本窗口：兄弟视图的 [`bytes_mut`](Self::bytes_mut) 借用
    /// 尚未归还时 panic，即使两个窗口互不重叠。不确定时使用 [`try_bytes`](Self::try_bytes)。
    pub fn bytes(&self) -> Ref<'_, [u8]> {
        self.vbuf.bytes(self.window)
    }

    /// 可写借出分片覆盖的字节，用于原地写入头部或尾部。
    ///
    /// # Panics
    /// 借用作用于整块区域：兄弟视图的 [`bytes`](Self::bytes) 或 `bytes_mut` 借用尚未归还时 panic，
    /// 即使两个窗口互不重叠。先把兄弟视图的内容取出（例如 [`to_bytes`](Self::to_bytes)）再写入，
    /// 或使用 [`try_bytes_mut`](Self::try_bytes_mut)。
    pub fn bytes_mut(&mut self) -> RefMut<'_, [u8]> {
        self.vbuf.bytes_mut(self.window)
    }

    /// 借出分片覆盖的字节；区域正被可写借出时返回 [`VirtualBufferError::RegionBorrowed`]。
    pub fn try_bytes(&self) -> Result<Ref<'_, [u8]>> {
        self.vbuf.try_bytes(self.window)
    }

    /// 可写借出分片覆盖的字节；区域已被借出时返回 [`VirtualBufferError::RegionBorrowed`]。
    pub fn try_bytes_mut(&mut self) -> Result<RefMut<'_, [u8]>> {
        self.vbuf.try_bytes_mut(self.window)
    }

    /// 拷贝分片内容为 [`Bytes`]，交给传输层发送。
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.bytes())
    }
}

impl Drop for VirtualFragment {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.vbuf.detach() {
            error!(error = %err, code = err.code(), "implicit fragment release failed");
        }
    }
}

impl fmt::Debug for VirtualFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFragment")
            .field("window", &self.window)
            .field("vbuf", &self.vbuf)
            .finish()
    }
}
