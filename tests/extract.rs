//! Extraction of generated PDF, DOCX and PPTX documents, through the same
//! path uploads take (bytes → scratch file → text → chunks).

use std::io::Write;

use std::sync::Arc;

use docchat::embedding::DisabledProvider;
use docchat::extract::{extract_bytes, ExtractError, FileExtractor, TextExtractor};
use docchat::generation::DisabledGenerator;
use docchat::ingest::{prepare_documents, UploadedDocument};
use docchat::session::{Services, Session, SessionSettings, SessionState};
use docchat_core::chunk::ChunkingConfig;
use docchat_core::RagError;

/// Single-page PDF drawing `phrase` in Helvetica, with a correct xref table.
fn minimal_pdf_with_text(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    pdf_from_objects(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>".to_string(),
        stream(&content),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ])
}

/// Structurally valid PDF whose content stream selects a font the page
/// never defines.
fn pdf_with_undefined_font() -> Vec<u8> {
    pdf_from_objects(&[
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        stream("BT /F9 12 Tf 100 700 Td (hello) Tj ET"),
    ])
}

fn stream(content: &str) -> String {
    format!("<< /Length {} >> stream\n{}\nendstream", content.len(), content)
}

/// Objects are numbered from 1; object 1 is the catalog.
fn pdf_from_objects(objects: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", objects.len() + 1).as_bytes(),
    );
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn zip_with_entries(entries: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    zip_with_entries(&[("word/document.xml", xml)])
}

fn slide(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><p:sld xmlns:p=\"p\" xmlns:a=\"a\"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
        text
    )
}

#[test]
fn pdf_text_layer_is_extracted() {
    let text = extract_bytes(&minimal_pdf_with_text("quarterly revenue grew"), "pdf").unwrap();
    assert!(text.contains("quarterly revenue grew"), "got: {text:?}");
}

#[test]
fn docx_paragraphs_become_lines() {
    let bytes = docx_with_paragraphs(&["First paragraph.", "Second paragraph."]);
    let text = extract_bytes(&bytes, "docx").unwrap();
    assert_eq!(text, "First paragraph.\nSecond paragraph.\n");
}

#[test]
fn docx_without_document_xml_fails() {
    let bytes = zip_with_entries(&[("word/styles.xml", "<w:styles/>".to_string())]);
    assert!(matches!(extract_bytes(&bytes, "docx"), Err(ExtractError::Ooxml(_))));
}

#[test]
fn pptx_slides_are_read_in_numeric_order() {
    let bytes = zip_with_entries(&[
        ("ppt/slides/slide10.xml", slide("ten")),
        ("ppt/slides/slide2.xml", slide("two")),
        ("ppt/slides/slide1.xml", slide("one")),
    ]);
    let text = extract_bytes(&bytes, "pptx").unwrap();
    assert_eq!(text, "one\n\ntwo\n\nten");
}

#[test]
fn file_extractor_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.docx");
    std::fs::write(&path, docx_with_paragraphs(&["On disk."])).unwrap();
    assert_eq!(FileExtractor.extract(&path).unwrap(), "On disk.\n");
}

#[test]
fn mixed_upload_is_chunked_per_document() {
    let docs = vec![
        UploadedDocument::new("a.pdf", minimal_pdf_with_text("alpha document text")),
        UploadedDocument::new("b.docx", docx_with_paragraphs(&["beta document text"])),
        UploadedDocument::new("c.txt", "gamma document text"),
    ];
    let corpus = prepare_documents(&docs, &ChunkingConfig::default(), &FileExtractor, None).unwrap();

    let names: Vec<&str> = corpus.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.docx", "c.txt"]);
    assert_eq!(corpus.chunks.len(), 3);
    assert!(corpus.chunks[0].text.contains("alpha"));
    assert_eq!(corpus.chunks[1].text, "beta document text");
    assert_eq!(corpus.chunks[2].text, "gamma document text");
}

#[test]
fn corrupt_pdf_aborts_the_upload() {
    let docs = vec![
        UploadedDocument::new("ok.txt", "fine"),
        UploadedDocument::new("broken.pdf", b"not a pdf".to_vec()),
    ];
    let err = prepare_documents(&docs, &ChunkingConfig::default(), &FileExtractor, None).unwrap_err();
    match err {
        RagError::Extraction { document, message } => {
            assert_eq!(document, "broken.pdf");
            assert!(message.contains("PDF"), "got: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn pdf_parser_crash_is_an_extraction_error() {
    match extract_bytes(&pdf_with_undefined_font(), "pdf") {
        Err(ExtractError::Pdf(message)) => assert!(message.contains("PDF"), "got: {message}"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn pdf_with_undefined_font_leaves_session_empty() {
    let services = Services::new(Arc::new(DisabledProvider), Arc::new(DisabledGenerator));
    let mut session = Session::new(SessionSettings::default(), services).unwrap();
    let docs = vec![UploadedDocument::new("odd.pdf", pdf_with_undefined_font())];

    match session.upload(&docs).await {
        Err(RagError::Extraction { document, .. }) => assert_eq!(document, "odd.pdf"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.sources().is_empty());
}
