//! Multimodal stream over binary documents, images and logs.
//!
//! DOCX text is extracted locally before analysis. An unreadable PDF is
//! skipped without failing the stream.

use std::fs;

use know_pipe::config::Config;
use know_pipe::gateway::{AnalysisContent, ContentKind, ScriptedGateway};
use know_pipe::models::MediaKind;
use know_pipe::pipeline::RunContext;
use know_pipe::progress::NoProgress;
use know_pipe::stream_media::extract_media_insights;
use tempfile::TempDir;

/// Minimal docx (ZIP) whose word/document.xml holds one paragraph.
fn minimal_docx_with_text(phrase: &str) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            phrase
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn media_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("runbook.docx"), minimal_docx_with_text("rotate the signing keys quarterly")).unwrap();
    fs::write(root.join("broken.pdf"), b"not a pdf at all").unwrap();
    fs::write(root.join("flow.png"), [0x89u8, b'P', b'N', b'G']).unwrap();
    fs::write(root.join("worker.log"), "WARN queue depth 900\n".repeat(5)).unwrap();
    fs::write(root.join("main.rs"), "fn main() {}").unwrap();
    tmp
}

#[tokio::test]
async fn each_media_kind_reaches_the_gateway_in_its_own_form() {
    let tmp = media_dir();
    let config = Config::minimal();
    let gateway = ScriptedGateway::new("Implementation Approach:\n- Keep runbooks next to code\n");
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let insights = extract_media_insights(&[tmp.path().to_path_buf()], &ctx)
        .await
        .unwrap();

    let calls = gateway.calls();
    // docx, png and log; the broken pdf never produces a request.
    assert_eq!(calls.len(), 3);

    let docx = calls
        .iter()
        .find(|c| c.kind == ContentKind::Documentation)
        .expect("docx request");
    assert_eq!(
        docx.content,
        AnalysisContent::Text("rotate the signing keys quarterly".to_string())
    );

    let image = calls.iter().find(|c| c.kind == ContentKind::Image).expect("image request");
    assert_eq!(image.content, AnalysisContent::ImagePath(tmp.path().join("flow.png")));

    assert!(calls.iter().any(|c| c.kind == ContentKind::Logs));

    assert_eq!(insights[&MediaKind::BinaryDoc].len(), 1);
    assert_eq!(insights[&MediaKind::Image].len(), 1);
    assert_eq!(insights[&MediaKind::Logs].len(), 1);
    assert_eq!(
        insights[&MediaKind::BinaryDoc][0].implementation(),
        ["Keep runbooks next to code"]
    );
}

#[tokio::test]
async fn soft_failures_skip_files_without_failing_the_stream() {
    let tmp = media_dir();
    let config = Config::minimal();
    let gateway = ScriptedGateway::new("Error analyzing content: upstream timeout");
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let insights = extract_media_insights(&[tmp.path().to_path_buf()], &ctx)
        .await
        .unwrap();
    assert!(insights.is_empty());
    assert_eq!(gateway.calls().len(), 3);
}

#[tokio::test]
async fn missing_source_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal();
    let gateway = ScriptedGateway::new("anything");
    let ctx = RunContext::new(&config, &gateway, &NoProgress);

    let insights = extract_media_insights(&[tmp.path().join("nowhere")], &ctx)
        .await
        .unwrap();
    assert!(insights.is_empty());
    assert!(gateway.calls().is_empty());
}
