//! `--info` 使用的文本概览。

use std::fmt::Write as _;

use emf_core::geometry::RectL;
use emf_io::DecodeOutcome;

/// 头部字段、记录统计与诊断的多行概览。
pub fn describe(outcome: &DecodeOutcome) -> String {
    let metafile = &outcome.metafile;
    let header = metafile.header();
    let mut out = String::new();

    let _ = writeln!(out, "EMF 头部：");
    let _ = writeln!(out, "  版本 = 0x{:08X}", header.version);
    let _ = writeln!(out, "  边界 = {}", rect(&header.bounds));
    let _ = writeln!(out, "  框架(0.01mm) = {}", rect(&header.frame));
    let _ = writeln!(
        out,
        "  参考设备 = {}x{} 像素, {}x{} mm",
        header.device.cx, header.device.cy, header.millimeters.cx, header.millimeters.cy
    );
    if let Some(micrometers) = header.micrometers {
        let _ = writeln!(out, "  参考设备(微米) = {}x{}", micrometers.cx, micrometers.cy);
    }
    let _ = writeln!(
        out,
        "  声明记录数 = {}, 句柄数 = {}, 调色板项 = {}",
        header.records, header.handles, header.palette_entries
    );
    if let Some(description) = header.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "  描述 = {description:?}");
    }

    let _ = writeln!(out, "回放记录数 = {}", metafile.len());
    for (name, count) in metafile.record_histogram() {
        let _ = writeln!(out, "  - {name}: {count}");
    }
    let _ = writeln!(
        out,
        "EOF = {}",
        if metafile.eof().is_some() { "有" } else { "缺失" }
    );

    if outcome.diagnostics.is_empty() {
        let _ = writeln!(out, "诊断：无");
    } else {
        let _ = writeln!(out, "诊断（{} 条）：", outcome.diagnostics.len());
        for diagnostic in &outcome.diagnostics {
            let _ = writeln!(out, "  - {diagnostic}");
        }
    }
    if let Some(fatal) = &outcome.fatal {
        let _ = writeln!(out, "解码中断：{fatal}");
    }
    out
}

fn rect(rect: &RectL) -> String {
    format!(
        "({}, {}) - ({}, {})",
        rect.left, rect.top, rect.right, rect.bottom
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use emf_core::geometry::SizeL;
    use emf_core::record::{EMF_SIGNATURE, Eof, Header, Metafile, Record};
    use emf_io::{DecodeError, Diagnostic, DiagnosticKind};

    fn header() -> Header {
        Header {
            bounds: RectL::new(0, 0, 99, 49),
            frame: RectL::new(0, 0, 2646, 1323),
            signature: EMF_SIGNATURE,
            version: 0x0001_0000,
            bytes: 0,
            records: 4,
            handles: 2,
            reserved: 0,
            description_len: 0,
            description_offset: 0,
            palette_entries: 0,
            device: SizeL::new(1024, 768),
            millimeters: SizeL::new(320, 240),
            pixel_format: None,
            micrometers: None,
            description: Some("demo".to_string()),
            header_size: 108,
        }
    }

    #[test]
    fn summary_lists_header_histogram_and_eof() {
        let mut metafile = Metafile::new(header());
        metafile.push(Record::SaveDc);
        metafile.push(Record::SaveDc);
        metafile.set_eof(Eof {
            palette: Vec::new(),
            size_last: 20,
        });
        let outcome = DecodeOutcome {
            metafile,
            diagnostics: Vec::new(),
            fatal: None,
        };
        let text = describe(&outcome);
        assert!(text.contains("版本 = 0x00010000"));
        assert!(text.contains("边界 = (0, 0) - (99, 49)"));
        assert!(text.contains("描述 = \"demo\""));
        assert!(text.contains("回放记录数 = 2"));
        assert!(text.contains("诊断：无"));
        assert!(text.contains("EOF = 有"));
    }

    #[test]
    fn summary_reports_diagnostics_and_interruption() {
        let outcome = DecodeOutcome {
            metafile: Metafile::new(header()),
            diagnostics: vec![Diagnostic::stream(120, DiagnosticKind::MissingEof)],
            fatal: Some(DecodeError::InvalidRecordSize {
                offset: 120,
                size: 3,
            }),
        };
        let text = describe(&outcome);
        assert!(text.contains("诊断（1 条）"));
        assert!(text.contains("EOF = 缺失"));
        assert!(text.contains("解码中断：record at offset 120 declares invalid size 3"));
    }
}
