//! 编码进度通知的接收端契约。
//!
//! - **Why**：大文件上传期间调用方需要字节级进度；上报通道必须是被动
//!   接收端，绝不反向阻塞或使编码逻辑失败；
//! - **What**：编码器在每个文件分块落盘后与整次编码结束时各至少上报一
//!   次 `(已写字节数, 预期总字节数)`，且已写字节数单调不减；
//! - **How**：实现本 trait，或用 [`FnReporter`] 把 `FnMut(u64, u64)`
//!   闭包适配进来（编码器另提供 `with_progress_fn` 便捷入口）。

/// 进度通知接收端。
///
/// 编码器独占持有并内联调用；实现不得 panic，也不应执行长耗时操作，
/// 否则会拖慢编码主路径。
pub trait ProgressReporter {
    /// 接收一次进度通知。
    ///
    /// - `bytes_so_far`：整次编码累计已写字节数，单调不减；
    /// - `total_expected`：调用方声明的预期总长度，`0` 表示未知。
    fn report(&mut self, bytes_so_far: u64, total_expected: u64);
}

/// 把 `FnMut(u64, u64)` 闭包适配为 [`ProgressReporter`]。
///
/// 单独成型而非对所有闭包做一揽子实现，是为了给 [`NoopReporter`] 等
/// 具名实现留出相容空间。
#[derive(Debug, Clone, Copy)]
pub struct FnReporter<F>(F);

impl<F> FnReporter<F>
where
    F: FnMut(u64, u64),
{
    /// 包装一个进度闭包。
    pub fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> ProgressReporter for FnReporter<F>
where
    F: FnMut(u64, u64),
{
    fn report(&mut self, bytes_so_far: u64, total_expected: u64) {
        (self.0)(bytes_so_far, total_expected)
    }
}

/// 丢弃所有通知的缺省接收端。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&mut self, _bytes_so_far: u64, _total_expected: u64) {}
}
