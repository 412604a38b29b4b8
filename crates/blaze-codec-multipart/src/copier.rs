//! 固定分块的流复制，附带按块进度回调。
//!
//! # 教案背景（Why）
//! - 文件源可能远大于可用内存，必须以固定尺寸分块搬运而非整体缓冲；
//! - 每块落盘后立即回调进度，调用方才能在慢速 I/O 期间持续观察字节级
//!   进展；
//! - 读失败与写失败需要区分上报，上层据此映射为不同的稳定错误码。
//!
//! # 契约说明（What）
//! - 回调参数是**本次复制**的累计字节数，不含编码整体偏移，由调用方
//!   自行叠加运行总量；
//! - 源读取器由调用方作用域独占持有，本函数借用引用，成功与失败路径
//!   均在作用域结束时确定性释放（关闭）。

use std::io::{Read, Write};

/// 参考分块尺寸，与原始实现保持一致。
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// 允许的最小分块尺寸，分块必须为不小于该值的 2 的幂。
pub const MIN_CHUNK_SIZE: usize = 512;

/// 复制过程中的失败侧别。
///
/// 读侧与写侧的 `std::io::Error` 分别携带，供上层映射为
/// `multipart.source_read` 或 `multipart.sink_write`。
#[derive(Debug)]
pub enum CopyError {
    /// 源流读取失败。
    Read(std::io::Error),
    /// 目标写入失败。
    Write(std::io::Error),
}

/// 将 `reader` 的全部字节按 `chunk_size` 分块复制到 `sink`。
///
/// # 执行步骤（How）
/// 1. 以栈外 `vec` 缓冲循环读取，读到 0 字节即视为源耗尽；
/// 2. 每块完整写入 `sink` 后累加计数并回调 `on_chunk(本次复制累计字节数)`；
/// 3. 返回实际复制的总字节数。
///
/// # 失败语义
/// 读写任一侧失败立即中止并返回对应 [`CopyError`]；不重试，已写出字节
/// 不回滚。
pub fn copy_with_progress<R, W, F>(
    reader: &mut R,
    sink: &mut W,
    chunk_size: usize,
    mut on_chunk: F,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(u64),
{
    let mut buffer = vec![0u8; chunk_size];
    let mut copied: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(err) => return Err(CopyError::Read(err)),
        };
        sink.write_all(&buffer[..read]).map_err(CopyError::Write)?;
        copied += read as u64;
        on_chunk(copied);
    }
}

/// 将调用方配置的分块尺寸收敛为合法值：不小于 [`MIN_CHUNK_SIZE`] 的 2 的幂。
///
/// 非法输入向上取整到下一个 2 的幂并夹到下限，保证复制路径无需再校验。
pub(crate) fn clamp_chunk_size(requested: usize) -> usize {
    requested.max(MIN_CHUNK_SIZE).next_power_of_two()
}
