//! Script loading integration tests

use std::io::Write;
use std::path::Path;

use rehearsal_partner::{Error, Script};

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "balcon.json",
        r#"{
            "title": "Le balcon",
            "language": "fr",
            "ai_character": "juliette",
            "lines": [
                {"speaker": "Romeo", "text": "Elle parle."},
                {"speaker": " JULIETTE ", "text": "Hélas !"},
                {"speaker": "romeo", "text": "Oh ! parle encore."}
            ]
        }"#,
    );

    let script = Script::load(&path, Some("NOBODY")).unwrap();
    assert_eq!(script.title(), "Le balcon");
    assert_eq!(script.len(), 3);
    // The file's own hint wins over the default
    assert_eq!(script.ai_character(), Some("JULIETTE"));
    assert_eq!(script.line_counts(), [("JULIETTE", 1), ("ROMEO", 2)]);
}

#[test]
fn test_load_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "scene.TXT",
        "ROMEO: Elle parle.\n\n(Juliette soupire)\nJULIETTE: Hélas !\n",
    );

    let script = Script::load(&path, Some("Juliette")).unwrap();
    assert_eq!(script.len(), 2);
    assert_eq!(script.ai_character(), Some("JULIETTE"));
    assert_eq!(script.language(), "fr");
}

/// Minimal Word document with one paragraph per entry
fn write_docx(dir: &Path, name: &str, paragraphs: &[&str]) -> std::path::PathBuf {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );

    let path = dir.join(name);
    let mut archive = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    archive.start_file("word/document.xml", options).unwrap();
    archive.write_all(xml.as_bytes()).unwrap();
    archive.finish().unwrap();
    path
}

#[test]
fn test_load_docx_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_docx(
        dir.path(),
        "Balcon.DOCX",
        &[
            "Acte II, scène 2",
            "Romeo : Elle parle.",
            "",
            "juliette: Hélas ! Roméo, Roméo !",
        ],
    );

    let script = Script::load(&path, Some("JULIETTE")).unwrap();
    assert_eq!(script.title(), "Script importé (.docx)");
    assert_eq!(script.language(), "fr");
    assert_eq!(script.len(), 2);
    assert_eq!(script.lines()[0].speaker, "ROMEO");
    assert_eq!(script.lines()[1].text, "Hélas ! Roméo, Roméo !");
    // Word imports carry no AI hint
    assert_eq!(script.ai_character(), None);
}

#[test]
fn test_corrupt_docx_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "scene.docx", "not really a document");

    assert!(matches!(
        Script::load(&path, None),
        Err(Error::MalformedScript(_))
    ));
}

#[test]
fn test_unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "scene.pdf", "%PDF-1.7");

    assert!(matches!(
        Script::load(&path, None),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[test]
fn test_malformed_json_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let no_lines = write(dir.path(), "a.json", r#"{"title": "x"}"#);
    let not_a_list = write(dir.path(), "b.json", r#"{"lines": "A: hi"}"#);
    let empty_entry = write(dir.path(), "c.json", r#"{"lines": [{}]}"#);

    for path in [no_lines, not_a_list, empty_entry] {
        assert!(
            matches!(Script::load(&path, None), Err(Error::MalformedScript(_))),
            "{} should be malformed",
            path.display()
        );
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Script::load(&dir.path().join("absent.json"), None),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_speaker_position_follows_sorted_speakers() {
    let script = Script::from_text("ROMEO: Elle parle.\nJuliette: Hélas !\nNOURRICE: Madame !", None)
        .unwrap();

    // JULIETTE, NOURRICE, ROMEO
    assert_eq!(script.speaker_position("juliette"), Some(0));
    assert_eq!(script.speaker_position(" Romeo "), Some(2));
    assert_eq!(script.speaker_position("MERCUTIO"), None);
}
