//! Text extraction for the file types the planner can read.
//!
//! Every reader returns at most `word_limit` whitespace-separated words. A
//! file that fails to parse is not an error for the run: its text becomes
//! `"Error reading <name>: <reason>"` and it is planned like any other file.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{open_workbook, Reader, Xlsx};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, Run, RunChild, TableCellContent, TableChild, TableRowChild,
};
use rayon::prelude::*;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::algo::clustering::FileEntry;
use crate::algo::tokenizer::{preprocess, truncate_words};
use crate::error::{FoldersError, Result};

/// Extensions with a text reader, lowercase without the dot.
pub const READABLE_EXTENSIONS: &[&str] = &[
    "txt", "html", "md", "csv", "pdf", "docx", "odt", "odp", "xlsx", "pptx", "ppt",
];

static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</(?:text:p|text:h|a:p)>|<(?:text:s|text:tab|text:line-break|a:br)\s*/>")
        .expect("valid paragraph regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|(lt|gt|quot|apos|amp));").expect("valid entity regex")
});

static SLIDE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid slide regex"));

/// Whether `filename` has an extension with a text reader.
pub fn is_readable(filename: &str) -> bool {
    let ext = crate::algo::misc::extension_of(filename);
    READABLE_EXTENSIONS.contains(&ext.as_str())
}

/// Read up to `word_limit` words from `path`.
///
/// Extraction failures are folded into the returned text and logged.
pub fn read_file(path: &Path, word_limit: usize) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match extract_text(path) {
        Ok(text) => truncate_words(&text, word_limit),
        Err(e) => {
            warn!(file = %name, "{e}");
            format!("Error reading {name}: {e}")
        }
    }
}

/// Full text of `path` according to its extension.
pub fn extract_text(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "html" | "md" | "csv" => read_plain(path),
        "pdf" => read_pdf(path),
        "docx" => read_docx(path),
        "odt" | "odp" => read_zipped_xml(path, "content.xml"),
        "xlsx" => read_xlsx(path),
        "pptx" | "ppt" => read_slides(path),
        other => Err(FoldersError::Extraction(format!("no reader for extension '{other}'"))),
    }
}

fn read_plain(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    // pdf_extract panics on some malformed fonts
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&bytes)
    })) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(FoldersError::Extraction(format!("PDF extraction failed: {e}"))),
        Err(_) => Err(FoldersError::Extraction(
            "PDF extraction panicked, likely malformed fonts".into(),
        )),
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| FoldersError::Extraction(format!("Failed to read zip archive: {e}")))
}

fn read_entry(archive: &mut ZipArchive<File>, entry: &str) -> Result<String> {
    let mut file = archive
        .by_name(entry)
        .map_err(|e| FoldersError::Extraction(format!("{entry}: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn read_docx(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| FoldersError::Extraction(format!("Failed to parse DOCX: {e}")))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => paragraph_text(paragraph, &mut text),
            DocumentChild::Table(table) => {
                for row in &table.rows {
                    let TableChild::TableRow(row) = row;
                    for cell in &row.cells {
                        let TableRowChild::TableCell(cell) = cell;
                        for content in &cell.children {
                            if let TableCellContent::Paragraph(paragraph) = content {
                                paragraph_text(paragraph, &mut text);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(text)
}

/// Run text of a DOCX paragraph, hyperlinks included, followed by a space.
fn paragraph_text(paragraph: &Paragraph, out: &mut String) {
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => run_text(run, out),
            ParagraphChild::Hyperlink(link) => {
                for child in &link.children {
                    if let ParagraphChild::Run(run) = child {
                        run_text(run, out);
                    }
                }
            }
            _ => {}
        }
    }
    out.push(' ');
}

fn run_text(run: &Run, out: &mut String) {
    for child in &run.children {
        if let RunChild::Text(text) = child {
            out.push_str(&text.text);
        }
    }
}

fn read_zipped_xml(path: &Path, entry: &str) -> Result<String> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, entry)?;
    Ok(xml_text(&xml))
}

fn read_slides(path: &Path) -> Result<String> {
    let mut archive = open_archive(path)?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_ENTRY.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut text = String::new();
    for (_, entry) in &slides {
        let xml = read_entry(&mut archive, entry)?;
        text.push_str(&xml_text(&xml));
        text.push(' ');
    }
    Ok(text)
}

fn read_xlsx(path: &Path) -> Result<String> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| FoldersError::Extraction(format!("Failed to open XLSX: {e}")))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| FoldersError::Extraction(format!("Failed to read sheet: {e}")))?,
        None => return Ok(String::new()),
    };

    let mut text = String::new();
    for row in range.rows() {
        for cell in row {
            let value = cell.to_string();
            if !value.is_empty() {
                text.push_str(&value);
                text.push(' ');
            }
        }
    }
    Ok(text)
}

/// Visible text of an office XML part.
///
/// Paragraph and break elements become spaces, every other tag is removed and
/// entities are decoded: the predefined five plus decimal and hex character
/// references.
pub fn xml_text(xml: &str) -> String {
    let spaced = PARAGRAPH_END.replace_all(xml, " ");
    let stripped = TAG.replace_all(&spaced, "");
    decode_entities(&stripped)
}

/// Single pass, so `&amp;#233;` stays the literal text `&#233;`.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let code = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok()
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else {
                let named = match &caps[3] {
                    "lt" => "<",
                    "gt" => ">",
                    "quot" => "\"",
                    "apos" => "'",
                    _ => "&",
                };
                return named.to_string();
            };
            // Invalid code points are kept as written
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Read the top level of `dir`.
///
/// Regular files are taken in name order. Files with a reader become
/// [`FileEntry`] values holding their preprocessed text; the rest are returned
/// by name for extension bucketing. Subdirectories are ignored.
pub fn scan_directory(
    dir: &Path,
    word_limit: usize,
    stop_words: &HashSet<String>,
) -> Result<(Vec<FileEntry>, Vec<String>)> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let (readable, misc): (Vec<String>, Vec<String>) = names.into_iter().partition(|n| is_readable(n));

    let entries: Vec<FileEntry> = readable
        .par_iter()
        .map(|name| {
            let raw = read_file(&dir.join(name), word_limit);
            FileEntry::new(name.clone(), preprocess(&raw, stop_words))
        })
        .collect();

    debug!(
        dir = %dir.display(),
        readable = entries.len(),
        misc = misc.len(),
        "scanned directory"
    );
    Ok((entries, misc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn readable_extensions_case_insensitive() {
        assert!(is_readable("notes.TXT"));
        assert!(is_readable("deck.pptx"));
        assert!(!is_readable("photo.jpg"));
        assert!(!is_readable("Makefile"));
    }

    #[test]
    fn plain_text_respects_word_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one two  three\nfour five").unwrap();
        assert_eq!(read_file(&path, 3), "one two three");
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, b"caf\xff menu").unwrap();
        assert!(read_file(&path, 10).ends_with("menu"));
    }

    #[test]
    fn broken_document_becomes_error_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "not a zip").unwrap();
        assert!(read_file(&path, 10).starts_with("Error reading broken.docx:"));
    }

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let mut docx = docx_rs::Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
        }
        docx.build().pack(File::create(path).unwrap()).unwrap();
    }

    #[test]
    fn xml_text_strips_tags() {
        let xml = "<text:p><text:span>Hello</text:span></text:p><text:p>Tom &amp; Jerry</text:p>";
        assert_eq!(xml_text(xml).split_whitespace().collect::<Vec<_>>(), vec!["Hello", "Tom", "&", "Jerry"]);
    }

    #[test]
    fn xml_text_decodes_character_references() {
        let xml = "<text:p>caf&#233; don&#8217;t &#x2014; &lt;ok&gt;</text:p>";
        assert_eq!(xml_text(xml).trim(), "café don\u{2019}t \u{2014} <ok>");
    }

    #[test]
    fn xml_text_decodes_once() {
        assert_eq!(xml_text("&amp;#233; &#xZZ; &#1114112;"), "&#233; &#xZZ; &#1114112;");
    }

    #[test]
    fn docx_body_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.docx");
        write_docx(&path, &["quarterly", "report"]);
        assert_eq!(read_file(&path, 10), "quarterly report");
    }

    #[test]
    fn docx_keeps_accents_and_curly_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.docx");
        write_docx(&path, &["café don\u{2019}t"]);
        assert_eq!(read_file(&path, 10), "café don\u{2019}t");
    }

    #[test]
    fn odt_character_references_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.odt");
        write_zip(&path, &[("content.xml", "<office:text><text:p>r&#233;sum&#xE9;</text:p></office:text>")]);
        assert_eq!(read_file(&path, 10), "résumé");
    }

    #[test]
    fn odt_content_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay.odt");
        write_zip(&path, &[("content.xml", "<office:text><text:p>garden</text:p><text:p>roses</text:p></office:text>")]);
        assert_eq!(read_file(&path, 10), "garden roses");
    }

    #[test]
    fn slides_are_read_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_zip(
            &path,
            &[
                ("ppt/slides/slide10.xml", "<p:sld><a:p><a:t>last</a:t></a:p></p:sld>"),
                ("ppt/slides/slide2.xml", "<p:sld><a:p><a:t>second</a:t></a:p></p:sld>"),
                ("ppt/slides/slide1.xml", "<p:sld><a:p><a:t>first</a:t></a:p></p:sld>"),
                ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
            ],
        );
        assert_eq!(read_file(&path, 10), "first second last");
    }

    #[test]
    fn legacy_ppt_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.ppt");
        std::fs::write(&path, [0xd0, 0xcf, 0x11, 0xe0]).unwrap();
        assert!(read_file(&path, 10).starts_with("Error reading old.ppt:"));
    }

    #[test]
    fn scan_splits_readable_and_misc() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "The budget for 2024 has 12 items").unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("c.jpg"), [0u8; 4]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let stop: HashSet<String> = ["the", "for", "has"].iter().map(|s| s.to_string()).collect();
        let (entries, misc) = scan_directory(dir.path(), 200, &stop).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(entries[1].content, "budget 2024 items");
        assert_eq!(misc, vec!["c.jpg"]);
    }

    #[test]
    fn scan_missing_directory_is_io_error() {
        let result = scan_directory(Path::new("/no/such/dir"), 10, &HashSet::new());
        assert!(matches!(result, Err(FoldersError::Io(_))));
    }
}
