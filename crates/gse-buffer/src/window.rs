//! 视图窗口：分配区域内 `[start, end)` 的受检区间。
//!
//! # 设计动机（Why）
//! - 视图边界的每一次变化（创建、拷贝、拆分、平移）都必须维持
//!   `0 <= start <= end <= region_len`；把这条不变量收敛到一个类型里，
//!   所有构造路径都经过同一处检查，而不是散落在各个操作中。
//! - 越界只可能来自尺寸计算缺陷或调用方违背平移契约，不是可恢复的输入错误，
//!   因此无论 debug 还是 release 构建都以 panic 终止，绝不截断或回绕。

use core::fmt;

/// 分配区域内的半开区间 `[start, end)`，偏移量相对区域起点。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Window {
    start: usize,
    end: usize,
}

impl Window {
    /// 构造窗口并校验其落在长度为 `limit` 的区域内。
    #[track_caller]
    pub(crate) fn new(start: usize, end: usize, limit: usize) -> Self {
        assert!(
            start <= end && end <= limit,
            "fragment window [{start}, {end}) escapes its {limit}-byte virtual buffer"
        );
        Self { start, end }
    }

    /// 在 `start` 处构造空窗口。
    #[track_caller]
    pub(crate) fn empty_at(start: usize, limit: usize) -> Self {
        Self::new(start, start, limit)
    }

    /// 起点偏移。
    pub fn start(&self) -> usize {
        self.start
    }

    /// 终点偏移（不含）。
    pub fn end(&self) -> usize {
        self.end
    }

    /// 窗口长度。
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 窗口是否不含任何字节。
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 同起点、长度截断为 `min(len, self.len())` 的前缀窗口。
    pub(crate) fn prefix(self, len: usize, limit: usize) -> Self {
        let len = len.min(self.len());
        Self::new(self.start, self.start + len, limit)
    }

    /// 两端分别向区域末尾移动。
    #[track_caller]
    pub(crate) fn advanced(self, start_delta: usize, end_delta: usize, limit: usize) -> Self {
        match (
            self.start.checked_add(start_delta),
            self.end.checked_add(end_delta),
        ) {
            (Some(start), Some(end)) => Self::new(start, end, limit),
            _ => overflow(self, "advance", start_delta, end_delta),
        }
    }

    /// 两端分别向区域起点移动。
    #[track_caller]
    pub(crate) fn rewound(self, start_delta: usize, end_delta: usize, limit: usize) -> Self {
        match (
            self.start.checked_sub(start_delta),
            self.end.checked_sub(end_delta),
        ) {
            (Some(start), Some(end)) => Self::new(start, end, limit),
            _ => overflow(self, "rewind", start_delta, end_delta),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cold]
#[track_caller]
fn overflow(window: Window, op: &str, start_delta: usize, end_delta: usize) -> ! {
    panic!("cannot {op} fragment window {window} by ({start_delta}, {end_delta}): offset overflow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_clamped_to_current_length() {
        let window = Window::new(13, 23, 117);
        assert_eq!(window.prefix(4, 117), Window::new(13, 17, 117));
        assert_eq!(window.prefix(400, 117), window);
        assert_eq!(window.prefix(0, 117).len(), 0);
    }

    #[test]
    fn advance_and_rewind_are_symmetric() {
        let window = Window::new(13, 23, 117);
        let moved = window.advanced(2, 4, 117);
        assert_eq!((moved.start(), moved.end()), (15, 27));
        assert_eq!(moved.rewound(2, 4, 117), window);
    }

    #[test]
    #[should_panic(expected = "escapes")]
    fn end_past_region_is_fatal() {
        let _ = Window::new(13, 23, 117).advanced(0, 95, 117);
    }

    #[test]
    #[should_panic(expected = "escapes")]
    fn start_past_end_is_fatal() {
        let _ = Window::new(13, 23, 117).advanced(11, 0, 117);
    }

    #[test]
    #[should_panic(expected = "offset overflow")]
    fn rewind_before_region_start_is_fatal() {
        let _ = Window::new(13, 23, 117).rewound(14, 0, 117);
    }
}
