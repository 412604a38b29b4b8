//! 按文件名推断分部 `Content-Type` 的查表策略。
//!
//! # 教案背景（Why）
//! - 文件分部的 MIME 类型直接影响写出的头部字节，必须在编码前确定；
//! - 受限运行环境可能没有可用的扩展名查找表，该缺失属于可恢复的环境
//!   限制而非逻辑错误，因此解析失败一律降级为通用二进制类型，绝不越过
//!   本模块边界抛出。
//!
//! # 使用概览（How）
//! - 默认实现 [`ExtensionMimeLookup`] 基于 `mime_guess` 的扩展名表；
//! - 需要自定义表（或模拟"表不可用"场景）时实现 [`MimeLookup`] 并注入
//!   编码器即可；
//! - [`resolve`] 聚合查表与回退逻辑，调用方永远拿到非空类型字符串。

/// 查不到映射时使用的通用二进制类型。
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 文件名到 MIME 类型的查找策略接口。
///
/// - **契约 (What)**：返回 `None` 表示无映射或查找设施不可用，由上层
///   统一降级；实现不得 panic；
/// - **共享约束**：实现应为只读状态，满足 `Send + Sync` 以便编码器跨
///   线程持有。
pub trait MimeLookup: Send + Sync {
    /// 依据文件名（通常凭扩展名）返回最佳猜测的 MIME 类型。
    fn mime_for(&self, file_name: &str) -> Option<String>;
}

/// 基于 `mime_guess` 扩展名表的默认查找实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionMimeLookup;

impl MimeLookup for ExtensionMimeLookup {
    fn mime_for(&self, file_name: &str) -> Option<String> {
        mime_guess::from_path(file_name)
            .first()
            .map(|mime| mime.essence_str().to_owned())
    }
}

/// 解析文件分部应使用的 MIME 类型，查表失败降级为 [`OCTET_STREAM`]。
pub fn resolve(lookup: &dyn MimeLookup, file_name: &str) -> String {
    match lookup.mime_for(file_name) {
        Some(mime) => mime,
        None => {
            tracing::warn!(
                target: "blaze.multipart",
                file_name,
                "mime lookup missed, falling back to application/octet-stream"
            );
            OCTET_STREAM.to_owned()
        }
    }
}
