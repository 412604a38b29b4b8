#![warn(missing_docs)]
#![doc = r#"
# blaze-codec-multipart

## 设计动机（Why）
- **定位**：本 crate 提供流式的 `multipart/form-data` 编码核心，把一组
  具名文本字段与若干文件源交织为单一的、符合 RFC 语义的 HTTP 请求体
  字节序列。
- **架构角色**：作为上传链路中最难的一环，它要在不整体缓冲负载的前提
  下精确累计内容长度，并在慢速 I/O 期间持续上报字节级进度；HTTP 的
  请求/响应生命周期、重试与连接管理均是外部协作者，不在本 crate 内。
- **设计理念**：强调"契约边界内的静默降级"与"I/O 失败的单一终态"——
  MIME 查表与边界参数解析的一切问题在模块内部降级为文档化缺省值，
  只有打开/读取/写入三类 I/O 失败会穿透 `encode` 边界。

## 核心契约（What）
- **输入条件**：调用方提供 [`EncodingRequest`]（字段集合、文件源序列、
  按位置的命名与 MIME 覆盖、排序旗标、预期总长度）与任意
  `std::io::Write` 目标；
- **输出保障**：成功时返回的 [`EncodingResult`] 总字节数恰等于写入目标
  的字节数（文件负载按声明长度核算）；失败时返回携带稳定错误码的
  [`EncodeError`]，已写字节不回滚；
- **进度语义**：`(已写字节数, 预期总字节数)` 在每个文件分块后与编码
  结束时上报，序列单调不减，末次值等于返回总数。

## 实现策略（How）
- 叶子模块各司其职：[`boundary`] 解析或生成边界令牌，[`mime`] 做可插拔
  的扩展名查表，[`naming`] 派生文件分部字段名，[`copier`] 分块搬运并
  回调进度，[`progress`] 定义被动接收端契约；
- [`encoder`] 编排以上全部，按排序旗标写出字段组与文件组，收尾写出
  `--<边界>--` 分隔线。

## 风险与考量（Trade-offs）
- **声明长度 vs 实测长度**：文件分部计入总量的是声明长度（与上游原始
  行为一致，预先计算 `Content-Length` 依赖于此）；源流实际产出不符时
  总数与真实写出量会偏离，取舍记录见仓库根 DESIGN.md；
- **不设防的调用方取值**：字段值或文件名与边界令牌碰撞属于调用方接受
  的边缘场景，本 crate 不做校验；
- **串行编码**：目标是有序字节流，单次 `encode` 内部不并行；整次调用
  可由调用方放到独立工作线程上执行。
"#]

pub mod boundary;
pub mod copier;
pub mod error;
pub mod mime;
pub mod naming;
pub mod progress;

mod encoder;

pub use encoder::{
    EncodingRequest, EncodingResult, FieldSet, FileSource, MultipartEncoder, SourceFactory,
};
pub use error::EncodeError;
pub use mime::{ExtensionMimeLookup, MimeLookup, OCTET_STREAM};
pub use progress::{FnReporter, NoopReporter, ProgressReporter};
