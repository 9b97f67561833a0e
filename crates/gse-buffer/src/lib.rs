//! `gse-buffer` 提供 GSE 封装栈底层的缓冲所有权原语。
//!
//! # 模块定位（Why）
//! - 协议代码需要在同一块堆内存上构建、拆分、丢弃分片视图，而不拷贝负载；
//!   同时在负载前后预留空间，让头部与 CRC 尾部之后可以原地写入。
//! - 本 crate 只负责内存与视图的生命周期：不解析负载，不实现分片 / 重组状态机，
//!   也不提供线程同步。
//!
//! # 设计概要（How）
//! - `vbuf` 模块中的虚拟缓冲拥有唯一的字节区域，并记录引用它的视图数；
//! - [`VirtualFragment`] 是区域上的受检窗口 `[start, end)`，可以拷贝负载、拆分出一个子视图、
//!   平移边界；最后一个视图释放时区域随之销毁；
//! - [`Window`] 把 `start <= end <= region_len` 收敛为类型不变量，越界一律 panic；
//! - [`ReserveLayout`] 与 [`FragmentFactory`] 提供预留空间与销毁观察者的配置入口。
//!
//! # 并发模型（What）
//! - 视图通过 `Rc` 共享分配，因此既不是 `Send` 也不是 `Sync`：
//!   一块分配及其视图只能被单一线程（或单一任务）持有，跨线程使用必须由上层串行化后重新创建。
//!
//! ```
//! use gse_buffer::VirtualFragment;
//!
//! let mut pdu = VirtualFragment::create(100)?;
//! pdu.copy_payload(b"ABCDEFGHIJ")?;
//! let head = pdu.duplicate(4)?;
//! assert_eq!(&*head.bytes(), b"ABCD");
//! assert_eq!(pdu.view_count(), 2);
//! pdu.release()?;
//! head.release()?;
//! # Ok::<(), gse_buffer::VirtualBufferError>(())
//! ```

mod error;
mod layout;
mod vbuf;
mod vfrag;
mod window;

pub use error::{ErrorKind, Result, VirtualBufferError};
pub use layout::{CRC_LENGTH, MAX_HEADER_LENGTH, MAX_VIEWS_PER_BUFFER, ReserveLayout};
pub use vbuf::{ReleaseObserver, ReleasedBuffer};
pub use vfrag::{FragmentFactory, VirtualFragment};
pub use window::Window;
