//! # encoder 模块说明
//!
//! ## 角色定位（Why）
//! - 本模块是编排中枢：把标量字段分部与文件流分部交织进同一个符合
//!   RFC 语义的 `multipart/form-data` 字节序列，全程不整体缓冲负载；
//! - 逐段累计精确字节总数，保证返回值可直接用作定长 HTTP 载荷的
//!   `Content-Length` 依据；
//! - 慢速 I/O（大文件）期间持续推送字节级进度，上报通道为被动接收端，
//!   不反向阻塞编码。
//!
//! ## 执行逻辑（How）
//! - 边界令牌在请求构造时解析一次（[`crate::boundary`]），整次编码与收尾
//!   分隔线共用；
//! - 依排序旗标决定（字段组, 文件组）或（文件组, 字段组）的先后；两组
//!   内部各按输入迭代顺序写出；
//! - 文件分部的字段名经 [`crate::naming`] 派生，MIME 类型按位置覆盖序列
//!   优先、否则走 [`crate::mime`] 查表；负载字节由 [`crate::copier`]
//!   分块搬运；
//! - 每个文件复制完成后，累计**声明长度**而非实测长度（与原始行为一致，
//!   取舍见 DESIGN.md），随后写出行终止符；
//! - 收尾写出 `--<边界>--` + CRLF，并以最终累计值再上报一次进度。
//!
//! ## 失败语义（What）
//! - 打开、读取、写入任一 I/O 失败立即中止整次编码并向调用方抛出
//!   [`EncodeError`]；已写出的字节不回滚（目标通常是在线连接体），调用
//!   方应废弃连接而非尝试续传；
//! - MIME 与边界解析问题在各自模块内部静默降级，绝不出现在本模块的
//!   错误路径上。
//!
//! ## 并发与资源（Trade-offs）
//! - 单次 `encode` 是严格串行的单遍执行：目标是有序字节流，分部必须按
//!   定义顺序落盘，内部并行没有意义；
//! - 每个源流由所在迭代轮次独占持有，成功与失败路径均在轮次结束时确定
//!   性释放；
//! - 编码器自身不跨调用持留状态，并发的多次 `encode` 间无共享可变状态
//!   （唯一可共享的 MIME 查找表要求只读）。

use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::boundary;
use crate::copier::{self, CopyError, DEFAULT_CHUNK_SIZE};
use crate::error::EncodeError;
use crate::mime::{self, ExtensionMimeLookup, MimeLookup};
use crate::naming;
use crate::progress::{FnReporter, NoopReporter, ProgressReporter};

/// 默认的请求级基础字段名，与原始实现保持一致。
const DEFAULT_BASE_NAME: &str = "file";

/// 产出全新可读流的零参工厂，支持重试场景下的重复读取。
pub type SourceFactory = Box<dyn Fn() -> io::Result<Box<dyn Read>> + Send + Sync>;

/// 一个待上传的文件源：名称、声明字节长度与可重复打开的流工厂。
///
/// # 教案式说明
/// - **意图 (Why)**：上传可能因外层重试被多次编码，流工厂保证每次编码
///   都能拿到全新的可读流，本 crate 无需跨尝试管理流生命周期；
/// - **契约 (What)**：`length` 为声明长度，参与总量核算与进度分母；实际
///   流若与声明不符，总量按声明核算（见 DESIGN.md 的取舍记录）；
/// - **风险 (Trade-offs)**：工厂以 `Box<dyn Fn>` 持有，牺牲一次装箱换取
///   对文件、内存缓冲与测试桩的统一接入。
pub struct FileSource {
    name: String,
    length: u64,
    factory: SourceFactory,
}

impl FileSource {
    /// 以显式名称、声明长度与流工厂构造文件源。
    pub fn new<F>(name: impl Into<String>, length: u64, factory: F) -> Self
    where
        F: Fn() -> io::Result<Box<dyn Read>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            length,
            factory: Box::new(factory),
        }
    }

    /// 从文件系统路径构造文件源：名称取自文件名，长度取自元数据。
    ///
    /// - **Why**：封装最常见的"上传磁盘文件"场景，工厂每次调用重新打开
    ///   文件以支持重复读取；
    /// - **What**：路径无文件名部分时以完整路径字符串兜底；元数据读取
    ///   失败直接返回 `io::Error`，由调用方决定是否降级。
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path: PathBuf = path.as_ref().to_owned();
        let length = std::fs::metadata(&path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let opened = path.clone();
        Ok(Self::new(name, length, move || {
            std::fs::File::open(&opened).map(|file| Box::new(file) as Box<dyn Read>)
        }))
    }

    /// 上传文件名，同时作为 MIME 查表的依据。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明字节长度。
    pub fn length(&self) -> u64 {
        self.length
    }

    /// 调用工厂打开一条全新的可读流。
    pub(crate) fn open(&self) -> io::Result<Box<dyn Read>> {
        (self.factory)()
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// 有序的表单字段集合，允许重名，每个条目各自成为一个分部。
#[derive(Debug, Default, Clone)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    /// 构造空字段集合。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个字段；值以字符串表示写出，重名合法。
    pub fn append(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries.push((name.into(), value.to_string()));
        self
    }

    /// Builder 风格的追加，便于链式构造。
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.append(name, value);
        self
    }

    /// 按插入顺序迭代 `(名称, 值)` 对。
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// 字段条目数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 集合是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 单次编码调用消费的聚合输入。
///
/// # 契约说明
/// - 字段集合与文件源序列各自保序；显式字段名与 MIME 覆盖序列按位置
///   对应文件源，允许短于源总数，缺位回退派生规则；
/// - 边界令牌在构造时经 [`boundary::resolve`] 解析定型，可通过
///   [`EncodingRequest::boundary`] 读取以回填请求头；
/// - `expected_length` 为调用方声明的预期总长度，仅作进度分母，`0`
///   表示未知；
/// - 实例仅供一次 HTTP 请求尝试使用，不跨尝试持留状态。
pub struct EncodingRequest {
    fields: FieldSet,
    sources: Vec<FileSource>,
    explicit_names: Vec<String>,
    mime_overrides: Vec<String>,
    base_name: String,
    boundary: String,
    fields_first: bool,
    expected_length: u64,
}

impl EncodingRequest {
    /// 依据可选的 `Content-Type` 头部值构造请求，边界即刻解析定型。
    pub fn new(content_type_header: Option<&str>) -> Self {
        Self {
            fields: FieldSet::new(),
            sources: Vec::new(),
            explicit_names: Vec::new(),
            mime_overrides: Vec::new(),
            base_name: DEFAULT_BASE_NAME.to_owned(),
            boundary: boundary::resolve(content_type_header),
            fields_first: true,
            expected_length: 0,
        }
    }

    /// 设置标量字段集合。
    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }

    /// 追加一个文件源，保持追加顺序。
    pub fn with_source(mut self, source: FileSource) -> Self {
        self.sources.push(source);
        self
    }

    /// 设置按位置对应文件源的显式字段名序列。
    pub fn with_field_names(mut self, names: Vec<String>) -> Self {
        self.explicit_names = names;
        self
    }

    /// 设置按位置对应文件源的 MIME 类型覆盖序列。
    pub fn with_mime_overrides(mut self, overrides: Vec<String>) -> Self {
        self.mime_overrides = overrides;
        self
    }

    /// 覆盖派生字段名所用的基础名（默认 `file`）。
    pub fn with_base_name(mut self, base: impl Into<String>) -> Self {
        self.base_name = base.into();
        self
    }

    /// 设置两组分部的相对顺序：`true` 为字段组先行（默认）。
    pub fn with_fields_first(mut self, fields_first: bool) -> Self {
        self.fields_first = fields_first;
        self
    }

    /// 声明预期总长度，仅作进度通知的分母。
    pub fn with_expected_length(mut self, length: u64) -> Self {
        self.expected_length = length;
        self
    }

    /// 本次编码使用的边界令牌，可供调用方回填 `Content-Type` 头。
    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

impl fmt::Debug for EncodingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodingRequest")
            .field("fields", &self.fields.len())
            .field("sources", &self.sources.len())
            .field("boundary", &self.boundary)
            .field("fields_first", &self.fields_first)
            .field("expected_length", &self.expected_length)
            .finish_non_exhaustive()
    }
}

/// 编码成功的结果：精确字节总数与实际使用的边界令牌。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingResult {
    total_bytes: u64,
    boundary: String,
}

impl EncodingResult {
    /// 写入目标的精确字节总数，含全部边界、头部、CRLF 与负载。
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 本次编码使用的边界令牌。
    pub fn boundary(&self) -> &str {
        &self.boundary
    }
}

/// 串行的 multipart/form-data 流式编码器。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合边界解析、字段命名、MIME 查表、分块复制与进度
///   上报，向调用方暴露单一 `encode(request, sink)` 操作；
/// - **契约 (What)**：进度接收端由编码器独占持有并内联调用；MIME 查找
///   表要求只读，可在多个编码器间安全共享；
/// - **执行 (How)**：见模块级说明的完整写出序列；
/// - **权衡 (Trade-offs)**：查找表与接收端以 trait 对象持有，牺牲单态化
///   收益换取稳定的对外类型签名。
pub struct MultipartEncoder {
    chunk_size: usize,
    mime_lookup: Box<dyn MimeLookup>,
    reporter: Box<dyn ProgressReporter>,
}

impl MultipartEncoder {
    /// 构造缺省编码器：1024 字节分块、扩展名查表、丢弃进度。
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            mime_lookup: Box::new(ExtensionMimeLookup),
            reporter: Box::new(NoopReporter),
        }
    }

    /// 配置分块尺寸；非法值收敛为不小于 512 的 2 的幂。
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = copier::clamp_chunk_size(chunk_size);
        self
    }

    /// 注入自定义 MIME 查找策略。
    pub fn with_mime_lookup(mut self, lookup: impl MimeLookup + 'static) -> Self {
        self.mime_lookup = Box::new(lookup);
        self
    }

    /// 注入进度通知接收端。
    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// 以 `FnMut(u64, u64)` 闭包注入进度接收端的便捷入口。
    pub fn with_progress_fn(self, callback: impl FnMut(u64, u64) + 'static) -> Self {
        self.with_reporter(FnReporter::new(callback))
    }

    /// 将请求编码为完整的 multipart 字节流写入 `sink`。
    ///
    /// # 契约说明
    /// - **后置条件**：成功时返回的总字节数恰等于写入 `sink` 的字节数
    ///   （文件负载按声明长度核算）；进度序列单调不减，末次上报值等于
    ///   返回总数；
    /// - **失败语义**：任一 I/O 失败立即中止，已写字节不回滚，无重试。
    pub fn encode<W>(
        &mut self,
        request: &EncodingRequest,
        sink: &mut W,
    ) -> Result<EncodingResult, EncodeError>
    where
        W: Write + ?Sized,
    {
        let mut total: u64 = 0;

        if request.fields_first {
            total = self.write_fields(request, sink, total)?;
            total = self.write_sources(request, sink, total)?;
        } else {
            total = self.write_sources(request, sink, total)?;
            total = self.write_fields(request, sink, total)?;
        }

        // 收尾分隔线：`--<边界>--` + CRLF。
        total += write_str(sink, &format!("--{}--", request.boundary))?;
        total += write_crlf(sink)?;

        self.reporter.report(total, request.expected_length);
        tracing::debug!(
            target: "blaze.multipart",
            total_bytes = total,
            boundary = %request.boundary,
            field_parts = request.fields.len(),
            file_parts = request.sources.len(),
            "multipart body encoded"
        );

        Ok(EncodingResult {
            total_bytes: total,
            boundary: request.boundary.clone(),
        })
    }

    /// 写出字段组：每个 `(名称, 值)` 对一个 `text/plain` 分部。
    fn write_fields<W>(
        &mut self,
        request: &EncodingRequest,
        sink: &mut W,
        mut total: u64,
    ) -> Result<u64, EncodeError>
    where
        W: Write + ?Sized,
    {
        for (name, value) in request.fields.iter() {
            total += write_str(sink, &format!("--{}", request.boundary))?;
            total += write_crlf(sink)?;
            total += write_str(
                sink,
                &format!("Content-Disposition: form-data; name=\"{name}\""),
            )?;
            total += write_crlf(sink)?;
            total += write_str(sink, "Content-Type: text/plain")?;
            total += write_crlf(sink)?;
            total += write_crlf(sink)?;
            total += write_str(sink, value)?;
            total += write_crlf(sink)?;
            tracing::trace!(target: "blaze.multipart", part = %name, "field part encoded");
        }
        Ok(total)
    }

    /// 写出文件组：命名派生、MIME 解析、头部落盘后分块搬运负载。
    fn write_sources<W>(
        &mut self,
        request: &EncodingRequest,
        sink: &mut W,
        mut total: u64,
    ) -> Result<u64, EncodeError>
    where
        W: Write + ?Sized,
    {
        let source_count = request.sources.len();
        for (index, source) in request.sources.iter().enumerate() {
            let field_name = naming::field_name(
                &request.base_name,
                &request.explicit_names,
                index,
                source_count,
            );
            let content_type = match request.mime_overrides.get(index) {
                Some(explicit) => explicit.clone(),
                None => mime::resolve(self.mime_lookup.as_ref(), source.name()),
            };

            total += write_str(sink, &format!("--{}", request.boundary))?;
            total += write_crlf(sink)?;
            total += write_str(
                sink,
                &format!(
                    "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{}\"",
                    source.name()
                ),
            )?;
            total += write_crlf(sink)?;
            total += write_str(sink, &format!("Content-Type: {content_type}"))?;
            total += write_crlf(sink)?;
            total += write_crlf(sink)?;

            // 源流仅存活于本轮迭代，成功与失败路径均在轮次结束时关闭。
            let mut stream = source.open().map_err(|err| EncodeError::SourceOpen {
                name: source.name().to_owned(),
                source: err,
            })?;
            let offset = total;
            let expected = request.expected_length;
            let reporter = self.reporter.as_mut();
            let copied = copier::copy_with_progress(
                stream.as_mut(),
                sink,
                self.chunk_size,
                |chunk_total| reporter.report(offset + chunk_total, expected),
            )
            .map_err(|err| match err {
                CopyError::Read(source_err) => EncodeError::SourceRead {
                    name: source.name().to_owned(),
                    source: source_err,
                },
                CopyError::Write(source_err) => EncodeError::SinkWrite { source: source_err },
            })?;
            drop(stream);

            // 总量按声明长度核算，而非实测复制量；取舍记录见 DESIGN.md。
            total += source.length();
            total += write_crlf(sink)?;
            tracing::trace!(
                target: "blaze.multipart",
                part = %field_name,
                filename = %source.name(),
                declared = source.length(),
                copied,
                "file part encoded"
            );
        }
        Ok(total)
    }
}

impl Default for MultipartEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MultipartEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartEncoder")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

/// 写出一段 UTF-8 文本并返回其字节数；写失败映射为 `SinkWrite`。
fn write_str<W>(sink: &mut W, text: &str) -> Result<u64, EncodeError>
where
    W: Write + ?Sized,
{
    let bytes = text.as_bytes();
    sink.write_all(bytes)
        .map_err(|source| EncodeError::SinkWrite { source })?;
    Ok(bytes.len() as u64)
}

/// 写出一个 CRLF 行终止符并返回其字节数。
fn write_crlf<W>(sink: &mut W) -> Result<u64, EncodeError>
where
    W: Write + ?Sized,
{
    sink.write_all(b"\r\n")
        .map_err(|source| EncodeError::SinkWrite { source })?;
    Ok(2)
}
