//! 文件分部表单字段名的派生规则。
//!
//! - **Why**：多个文件源在未显式命名时若共用同一字段名，服务端表单解析
//!   会发生键冲突；单文件场景又应保持基础名原样以兼容既有接口；
//! - **What**：显式名按位置优先；缺省时单文件用基础名，多文件追加
//!   1 起始的十进制序号。

/// 计算第 `index` 个文件源应使用的表单字段名。
///
/// # 契约说明
/// - `base`：请求级基础字段名；
/// - `explicit`：按位置对应的显式名序列，允许短于文件源总数；
/// - `index` / `total`：当前源的下标与文件源总数；
/// - **后置条件**：`explicit[index]` 存在则原样返回；否则 `total == 1`
///   时返回 `base`，`total > 1` 时返回 `base` 拼接 `index + 1`。
pub fn field_name(base: &str, explicit: &[String], index: usize, total: usize) -> String {
    if let Some(name) = explicit.get(index) {
        return name.clone();
    }
    if total == 1 {
        base.to_owned()
    } else {
        format!("{base}{}", index + 1)
    }
}
