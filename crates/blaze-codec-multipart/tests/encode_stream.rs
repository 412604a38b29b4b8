//! multipart 编码流的集成验收。
//!
//! # 教案级注释概览
//! - **核心目标 (Why)**：在公开 API 层面逐条核对线上契约——分部框架字节、
//!   两组分部的相对顺序、命名派生、MIME 降级、总量核算与失败语义；
//! - **设计手法 (How)**：以 `Vec<u8>` 作为计数目标验证"返回总数 == 实际
//!   写出字节数"；以最小化的测试内解析器做往返校验，不引入额外解析
//!   依赖；
//! - **边界 (What)**：测试数据均为 ASCII 文本，避免与边界令牌碰撞——
//!   碰撞防护本就不在编码器契约内。

use std::io::{self, Cursor, Read};

use blaze_codec_multipart::{
    EncodeError, EncodingRequest, FieldSet, FileSource, MimeLookup, MultipartEncoder,
};

fn memory_source(name: &str, payload: &'static [u8]) -> FileSource {
    FileSource::new(name, payload.len() as u64, move || {
        Ok(Box::new(Cursor::new(payload)) as Box<dyn Read>)
    })
}

/// 测试内最小 multipart 解析器：返回每个分部的（头部行集合, 内容文本）。
///
/// 仅支持 ASCII 文本负载，用于往返校验；生产解析不在本 crate 范围。
fn parse_parts(body: &str, boundary: &str) -> Vec<(Vec<String>, String)> {
    let delimiter = format!("--{boundary}\r\n");
    let closing = format!("--{boundary}--\r\n");
    assert!(body.ends_with(&closing), "body must end with closing line");
    let trimmed = &body[..body.len() - closing.len()];
    trimmed
        .split(&delimiter)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (head, tail) = segment
                .split_once("\r\n\r\n")
                .expect("part has blank line after headers");
            let headers = head.split("\r\n").map(str::to_owned).collect();
            let content = tail
                .strip_suffix("\r\n")
                .expect("part content ends with CRLF")
                .to_owned();
            (headers, content)
        })
        .collect()
}

#[test]
fn fields_only_stream_has_one_part_per_field_in_order() {
    // Why: N 个字段必须产出 N 个分部，顺序与插入顺序一致，随后是收尾线。
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd")).with_fields(
        FieldSet::new()
            .with("first", "1")
            .with("second", "two")
            .with("third", 3),
    );
    let mut sink = Vec::new();
    let result = MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink.clone()).expect("ascii body");
    let parts = parse_parts(&body, "bnd");
    assert_eq!(parts.len(), 3);
    let names: Vec<&String> = parts.iter().map(|(headers, _)| &headers[0]).collect();
    assert!(names[0].contains("name=\"first\""));
    assert!(names[1].contains("name=\"second\""));
    assert!(names[2].contains("name=\"third\""));
    assert_eq!(parts[2].1, "3");
    assert_eq!(result.total_bytes(), sink.len() as u64);
}

#[test]
fn derived_names_follow_single_and_multi_source_rules() {
    // Why: 单文件保持基础名，多文件按 1 起始序号消歧，这是表单键的对外契约。
    let single = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(memory_source("a.txt", b"A"));
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&single, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    assert!(body.contains("name=\"file\"; filename=\"a.txt\""));

    let multi = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(memory_source("a.txt", b"A"))
        .with_source(memory_source("b.txt", b"B"));
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&multi, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    assert!(body.contains("name=\"file1\"; filename=\"a.txt\""));
    assert!(body.contains("name=\"file2\"; filename=\"b.txt\""));
}

#[test]
fn explicit_names_and_base_name_override_derivation() {
    // Why: 显式名按位置优先，缺位回退到自定义基础名加序号的派生规则。
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_base_name("upload")
        .with_field_names(vec!["avatar".to_owned()])
        .with_source(memory_source("a.txt", b"A"))
        .with_source(memory_source("b.txt", b"B"));
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    assert!(body.contains("name=\"avatar\"; filename=\"a.txt\""));
    assert!(body.contains("name=\"upload2\"; filename=\"b.txt\""));
}

#[test]
fn custom_chunk_size_changes_report_granularity() {
    // Why: 分块尺寸决定进度上报粒度，1500 字节按 512 分块应产生 3 次分块上报。
    let payload: &[u8] = &[7u8; 1500];
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd")).with_source(
        FileSource::new("c.bin", payload.len() as u64, move || {
            Ok(Box::new(Cursor::new(payload)) as Box<dyn Read>)
        }),
    );
    let mut sink = Vec::new();
    let reports = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let collected = reports.clone();
    MultipartEncoder::new()
        .with_chunk_size(512)
        .with_progress_fn(move |so_far, total| collected.borrow_mut().push((so_far, total)))
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    // 3 次分块上报 + 收尾 1 次。
    assert_eq!(reports.borrow().len(), 4);
}

#[test]
fn ordering_flag_controls_group_order_only() {
    // Why: 排序旗标只交换两组分部的先后，不改变组内顺序。
    let build = |fields_first: bool| {
        EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
            .with_fields(FieldSet::new().with("a", "1"))
            .with_source(memory_source("f.txt", b"hello"))
            .with_fields_first(fields_first)
    };

    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&build(true), &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    let field_at = body.find("name=\"a\"").expect("field part present");
    let file_at = body.find("filename=\"f.txt\"").expect("file part present");
    assert!(field_at < file_at, "fields first puts the field part ahead");

    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&build(false), &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    let field_at = body.find("name=\"a\"").expect("field part present");
    let file_at = body.find("filename=\"f.txt\"").expect("file part present");
    assert!(file_at < field_at, "files first puts the file part ahead");
}

#[test]
fn round_trip_preserves_values_and_contents() {
    // Why: 编码产物必须能被标准分部语法还原出原始字段值与文件内容。
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_fields(FieldSet::new().with("k1", "v1").with("k2", "v2"))
        .with_source(memory_source("doc.txt", b"file body"));
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8(sink).expect("ascii body");
    let parts = parse_parts(&body, "bnd");
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].1, "v1");
    assert_eq!(parts[1].1, "v2");
    assert!(parts[2].0[0].contains("filename=\"doc.txt\""));
    assert_eq!(parts[2].1, "file body");
}

#[test]
fn mime_lookup_miss_emits_octet_stream_header() {
    // Why: 查表无命中时文件分部头必须降级为通用二进制类型。
    struct NoTable;
    impl MimeLookup for NoTable {
        fn mime_for(&self, _file_name: &str) -> Option<String> {
            None
        }
    }
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(memory_source("data.bin", b"\x00\x01"));
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .with_mime_lookup(NoTable)
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    let body = String::from_utf8_lossy(&sink);
    assert!(body.contains("Content-Type: application/octet-stream"));
}

#[test]
fn generated_boundary_is_hex_and_reaches_result() {
    // Why: 无 Content-Type 头时边界走十六进制时间戳生成，且经结果回传调用方。
    let request = EncodingRequest::new(None).with_fields(FieldSet::new().with("a", "1"));
    assert!(!request.boundary().is_empty());
    assert!(request.boundary().chars().all(|c| c.is_ascii_hexdigit()));
    let mut sink = Vec::new();
    let result = MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    assert_eq!(result.boundary(), request.boundary());
}

#[test]
fn progress_reports_are_monotonic_and_end_at_total() {
    // Why: 进度序列必须单调不减，末次上报值等于返回总数，分母为声明总长。
    let payload: &[u8] = &[42u8; 3000];
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_fields(FieldSet::new().with("a", "1"))
        .with_source(FileSource::new("big.bin", payload.len() as u64, move || {
            Ok(Box::new(Cursor::new(payload)) as Box<dyn Read>)
        }))
        .with_expected_length(10_000);
    let mut sink = Vec::new();
    let reports = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink_reports = reports.clone();
    let result = MultipartEncoder::new()
        .with_progress_fn(move |so_far, total| sink_reports.borrow_mut().push((so_far, total)))
        .encode(&request, &mut sink)
        .expect("encode succeeds");

    let reports = reports.borrow();
    // 3000 字节按 1024 分块应产生 3 次分块上报，外加收尾 1 次。
    assert_eq!(reports.len(), 4);
    assert!(reports.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(reports.iter().all(|(_, total)| *total == 10_000));
    assert_eq!(reports.last().expect("final report").0, result.total_bytes());
    assert_eq!(result.total_bytes(), sink.len() as u64);
}

#[test]
fn declared_length_wins_over_measured() {
    // Why: 钉住"总量按声明长度核算"的既有行为——源流少产出时返回总数
    //      按声明值偏离真实写出量，取舍记录见 DESIGN.md。
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(FileSource::new("short.bin", 10, || {
            // 声明 10 字节，实际只产出 4 字节。
            Ok(Box::new(Cursor::new(b"abcd".to_vec())) as Box<dyn Read>)
        }));
    let mut sink = Vec::new();
    let result = MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    assert_eq!(result.total_bytes(), sink.len() as u64 + 6);
}

#[test]
fn read_failure_mid_copy_surfaces_with_source_name() {
    // Why: 复制中途的读失败必须指认源名称并中止整次编码，已写字节保留。
    struct HalfThenFail {
        served: bool,
    }
    impl Read for HalfThenFail {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "torn"))
            } else {
                self.served = true;
                buf[..3].copy_from_slice(b"abc");
                Ok(3)
            }
        }
    }
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(FileSource::new("torn.bin", 6, || {
            Ok(Box::new(HalfThenFail { served: false }) as Box<dyn Read>)
        }));
    let mut sink = Vec::new();
    let err = MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect_err("read failure expected");
    match &err {
        EncodeError::SourceRead { name, .. } => assert_eq!(name, "torn.bin"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.code(), "multipart.source_read");
    assert!(!sink.is_empty(), "headers already written stay written");
}

#[test]
fn source_factory_supports_re_encoding() {
    // Why: 流工厂每次调用产出全新流，同一请求可被完整编码两次（重试场景）。
    let request = EncodingRequest::new(Some("multipart/form-data; boundary=bnd"))
        .with_source(memory_source("r.txt", b"again"));
    let mut encoder = MultipartEncoder::new();
    let mut first = Vec::new();
    let mut second = Vec::new();
    encoder
        .encode(&request, &mut first)
        .expect("first encode succeeds");
    encoder
        .encode(&request, &mut second)
        .expect("second encode succeeds");
    assert_eq!(first, second);
}

#[test]
fn from_path_source_reads_file_contents() {
    // Why: 路径便捷构造必须取文件名与元数据长度，并能真实读出内容。
    let path = std::env::temp_dir().join(format!(
        "blaze-multipart-{}-{:?}.txt",
        std::process::id(),
        std::thread::current().id()
    ));
    std::fs::write(&path, b"from disk").expect("write fixture");
    let source = FileSource::from_path(&path).expect("source from path");
    assert_eq!(source.length(), 9);
    let request =
        EncodingRequest::new(Some("multipart/form-data; boundary=bnd")).with_source(source);
    let mut sink = Vec::new();
    MultipartEncoder::new()
        .encode(&request, &mut sink)
        .expect("encode succeeds");
    std::fs::remove_file(&path).expect("remove fixture");
    let body = String::from_utf8(sink).expect("ascii body");
    assert!(body.contains("from disk"));
}
