//! Plain-text and Word script import
//!
//! One utterance per line (or per paragraph), `SPEAKER: text`. Lines without
//! a `:` are stage directions or blank and are skipped.

use std::io::{Read, Seek};

use quick_xml::events::Event;

use super::{RawLine, RawScript};
use crate::{Error, Result};

/// Title given to scripts imported from text
pub const TEXT_IMPORT_TITLE: &str = "Script importé (.txt)";

/// Title given to scripts imported from Word documents
pub const DOCX_IMPORT_TITLE: &str = "Script importé (.docx)";

/// Archive member holding the body of a `.docx`
const DOCX_BODY: &str = "word/document.xml";

/// Parse `SPEAKER: text` lines into a raw script
pub fn parse_text(content: &str, ai_character: Option<&str>) -> RawScript {
    let lines: Vec<RawLine> = content
        .lines()
        .filter_map(|raw| raw.split_once(':'))
        .map(|(speaker, text)| RawLine::new(speaker.trim(), text.trim()))
        .collect();

    tracing::debug!(lines = lines.len(), "parsed text script");

    RawScript {
        title: Some(TEXT_IMPORT_TITLE.to_string()),
        language: Some(super::DEFAULT_LANGUAGE.to_string()),
        ai_character: ai_character.map(str::to_string),
        lines: Some(lines),
    }
}

/// Parse a Word document whose paragraphs are `SPEAKER: text` lines
///
/// Imported documents carry no AI character hint.
///
/// # Errors
///
/// Returns error if the archive or its body cannot be read
pub fn parse_docx<R: Read + Seek>(reader: R) -> Result<RawScript> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| Error::MalformedScript(format!("not a .docx archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| Error::MalformedScript(format!("missing {DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)?;

    let paragraphs = docx_paragraphs(&xml)?;
    tracing::debug!(paragraphs = paragraphs.len(), "read docx body");

    let mut raw = parse_text(&paragraphs.join("\n"), None);
    raw.title = Some(DOCX_IMPORT_TITLE.to_string());
    Ok(raw)
}

/// Visible text of each `<w:p>` in a WordprocessingML body
fn docx_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::MalformedScript(format!("invalid .docx body: {e}")))?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => current.push('\t'),
                b"br" if in_run => current.push(' '),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(text) if in_text => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::MalformedScript(format!("invalid .docx text: {e}")))?;
                current.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
