//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为编码器对外暴露的失败语义提供集中定义：只有源流打开、源流读取与
//!   目标写入三类 I/O 故障会穿透 `encode` 边界；
//! - MIME 查表缺失与 `Content-Type` 边界参数畸形均在本 crate 内部静默降级，
//!   **不会**出现在该错误域中。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `thiserror::Error` 以兼容 `std::error::Error` 生态；
//! - 每个变体对应一个稳定字符串错误码（见 [`codes`]），遵循
//!   `<域>.<语义>` 约定，便于日志、指标与告警系统做精确聚合；
//! - 变体均满足 `Send + Sync + 'static`，可安全跨线程传播。
//!
//! ## 扩展建议（How）
//! - 新增变体时必须同时在 [`codes`] 登记错误码并更新 [`EncodeError::code`]；
//! - 底层 `std::io::Error` 通过 `#[source]` 保留，排障时可沿 `source()`
//!   链路还原原始系统调用失败。

use std::io;

use thiserror::Error;

/// 稳定错误码常量，命名遵循 `<域>.<语义>` 约定。
///
/// - **意图 (Why)**：让可观测链路按码值聚合，而非解析错误消息文本；
/// - **契约 (What)**：常量值一经发布不得变更，新增只能追加。
pub mod codes {
    /// 源流工厂打开流失败。
    pub const SOURCE_OPEN: &str = "multipart.source_open";
    /// 从已打开的源流读取失败。
    pub const SOURCE_READ: &str = "multipart.source_read";
    /// 向目标写入器写出失败。
    pub const SINK_WRITE: &str = "multipart.sink_write";
}

/// 编码调用的终态错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方只会观察到"完整字节总数"或"单一终态错误"，
///   不存在部分成功的结果类型；该枚举即后者的全集。
/// - **契约 (What)**：
///   - `SourceOpen` / `SourceRead` 携带受影响的文件源名称，定位具体分部；
///   - `SinkWrite` 不携带分部信息，因为目标流失败与具体分部无关；
///   - 任一变体出现即意味着整次编码中止，已写出的字节不会回滚。
/// - **设计权衡 (Trade-offs)**：使用 `String` 保存源名称，牺牲少量堆分配
///   换取错误消息的可读性；热路径上错误构造本身已是冷分支。
#[derive(Debug, Error)]
pub enum EncodeError {
    /// 文件源的流工厂返回失败，分部头尚未写出前触发则目标流保持干净。
    #[error("failed to open stream for source `{name}`: {source}")]
    SourceOpen {
        /// 受影响的文件源名称。
        name: String,
        /// 底层打开失败原因。
        #[source]
        source: io::Error,
    },

    /// 已打开的源流在分块读取过程中失败。
    #[error("failed to read from source `{name}`: {source}")]
    SourceRead {
        /// 受影响的文件源名称。
        name: String,
        /// 底层读取失败原因。
        #[source]
        source: io::Error,
    },

    /// 目标写入器拒绝写入，通常意味着连接已不可用。
    #[error("failed to write multipart body to sink: {source}")]
    SinkWrite {
        /// 底层写入失败原因。
        #[source]
        source: io::Error,
    },
}

impl EncodeError {
    /// 返回变体对应的稳定错误码。
    ///
    /// - **Why**：观测系统按码值而非消息聚合；
    /// - **What**：返回 [`codes`] 中登记的 `'static` 字符串，永不变更。
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceOpen { .. } => codes::SOURCE_OPEN,
            Self::SourceRead { .. } => codes::SOURCE_READ,
            Self::SinkWrite { .. } => codes::SINK_WRITE,
        }
    }
}
