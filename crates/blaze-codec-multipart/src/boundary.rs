//! 多分部边界令牌的解析与生成。
//!
//! - **Why**：边界令牌既要尊重调用方在 `Content-Type` 头中预先声明的值
//!   （例如跨请求复用同一令牌），又要在缺失时可独立生成，保证编码永不因
//!   边界问题失败；
//! - **How**：取头部值中首个 `=` 之后的文本；缺失或畸形时回退为当前
//!   Unix 毫秒时间戳的十六进制渲染；
//! - **What**：[`resolve`] 总是返回非空字符串，无错误路径。

use std::time::{SystemTime, UNIX_EPOCH};

/// 从可选的 `Content-Type` 头部值解析边界令牌，失败时回退为时间戳生成。
///
/// # 契约说明
/// - **输入**：`content_type` 为请求头原始值，例如
///   `multipart/form-data; boundary=abc123`；
/// - **后置条件**：返回非空令牌；头部缺失、不含 `=` 或参数为空串时走生成
///   路径；
/// - **边界语义**：按原样取首个 `=` 之后的**全部**文本，不剥离引号，调用
///   方声明什么就用什么（畸形值属于调用方接受的边缘场景）。
pub fn resolve(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split_once('='))
        .map(|(_, token)| token.to_owned())
        .filter(|token| !token.is_empty())
        .unwrap_or_else(generate)
}

/// 以当前 Unix 毫秒时间戳的 base-16 渲染生成边界令牌。
///
/// 时钟早于纪元的异常环境下按零值渲染，仍保证非空返回。
fn generate() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("{millis:x}")
}
