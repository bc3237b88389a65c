//! Word-processor loader (.docx).
//!
//! Reads `word/document.xml` and emits paragraph text in document order.
//! Tables are flattened: one line per row, cells separated by tabs, the
//! paragraphs inside a cell joined by spaces. Nested tables are folded into
//! the enclosing cell.

use super::ooxml::{open_package, read_part, unreadable};
use crate::error::DynamoError;
use quick_xml::events::Event;
use quick_xml::Reader;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract plain text from a .docx package.
pub fn extract(source_id: &str, bytes: &[u8]) -> Result<String, DynamoError> {
    let mut package = open_package(source_id, bytes)?;
    let xml = read_part(source_id, &mut package, DOCUMENT_PART)?
        .ok_or_else(|| unreadable(source_id, format!("missing {DOCUMENT_PART}")))?;
    document_text(source_id, &xml)
}

fn document_text(source_id: &str, xml: &str) -> Result<String, DynamoError> {
    let mut reader = Reader::from_str(xml);

    let mut out = String::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut table_depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| unreadable(source_id, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row.clear(),
                b"w:tc" if table_depth == 1 => cell.clear(),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => paragraph.push('\t'),
                b"w:br" | b"w:cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| unreadable(source_id, e))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = paragraph.trim();
                    if table_depth > 0 {
                        if !text.is_empty() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(text);
                        }
                    } else {
                        out.push_str(text);
                        out.push('\n');
                    }
                    paragraph.clear();
                }
                b"w:tc" if table_depth == 1 => row.push(cell.trim().to_string()),
                b"w:tr" if table_depth == 1 => {
                    let line = row
                        .iter()
                        .filter(|c| !c.is_empty())
                        .cloned()
                        .collect::<Vec<_>>()
                        .join("\t");
                    if !line.is_empty() {
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
                b"w:tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
