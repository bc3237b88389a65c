//! Slide-deck loader (.pptx).
//!
//! Slides are read from `ppt/slides/slideN.xml` in numeric order (so
//! `slide10` follows `slide9`). Slides marked hidden (`show="0"`) are
//! skipped. Each DrawingML paragraph (`a:p`) becomes one line; slides are
//! separated by a blank line.

use super::ooxml::{open_package, part_names, read_part, unreadable};
use crate::error::DynamoError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Extract visible slide text from a .pptx package.
pub fn extract(source_id: &str, bytes: &[u8]) -> Result<String, DynamoError> {
    let mut package = open_package(source_id, bytes)?;

    let mut slides: Vec<(u32, String)> = part_names(&package)
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    if slides.is_empty() {
        return Err(unreadable(source_id, "presentation has no slides"));
    }
    slides.sort_unstable_by_key(|(n, _)| *n);

    let mut out = String::new();
    for (_, part) in slides {
        let Some(xml) = read_part(source_id, &mut package, &part)? else {
            continue;
        };
        if let Some(text) = slide_text(source_id, &xml)? {
            let text = text.trim();
            if !text.is_empty() {
                out.push_str(text);
                out.push_str("\n\n");
            }
        }
    }
    Ok(out)
}

/// `ppt/slides/slide12.xml` → `Some(12)`; layouts, masters and rels → `None`.
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn is_hidden(e: &BytesStart<'_>) -> bool {
    matches!(
        e.try_get_attribute("show"),
        Ok(Some(attr)) if matches!(attr.value.as_ref(), b"0" | b"false")
    )
}

/// Text of one slide, or `None` when the slide is hidden.
fn slide_text(source_id: &str, xml: &str) -> Result<Option<String>, DynamoError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| unreadable(source_id, e))? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:sld" if is_hidden(&e) => return Ok(None),
                b"a:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"a:br" => paragraph.push('\n'),
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| unreadable(source_id, e))?;
                paragraph.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        out.push_str(line);
                        out.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::fixtures::zip_parts;
    use super::*;

    fn slide(body: &str, hidden: bool) -> String {
        let show = if hidden { r#" show="0""# } else { "" };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"{show}><p:cSld><p:spTree><p:sp><p:txBody>{body}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    fn para(text: &str) -> String {
        format!("<a:p><a:r><a:t>{text}</a:t></a:r></a:p>")
    }

    #[test]
    fn slides_in_numeric_order() {
        let s1 = slide(&para("Intro"), false);
        let s2 = slide(&para("Cells"), false);
        let s10 = slide(&(para("Summary") + &para("Questions?")), false);
        let bytes = zip_parts(&[
            ("ppt/slides/slide10.xml", &s10),
            ("ppt/slides/slide2.xml", &s2),
            ("ppt/slides/slide1.xml", &s1),
            ("ppt/slideLayouts/slideLayout1.xml", &slide(&para("Layout"), false)),
        ]);
        let text = extract("deck.pptx", &bytes).unwrap();
        assert_eq!(text, "Intro\n\nCells\n\nSummary\nQuestions?\n\n");
    }

    #[test]
    fn hidden_slides_skipped() {
        let bytes = zip_parts(&[
            ("ppt/slides/slide1.xml", &slide(&para("Visible"), false)),
            ("ppt/slides/slide2.xml", &slide(&para("Secret"), true)),
        ]);
        let text = extract("deck.pptx", &bytes).unwrap();
        assert!(text.contains("Visible"));
        assert!(!text.contains("Secret"));
    }

    #[test]
    fn no_slides_is_unreadable() {
        let bytes = zip_parts(&[("ppt/presentation.xml", "<p:presentation/>")]);
        let err = extract("empty.pptx", &bytes).unwrap_err();
        assert!(matches!(err, DynamoError::UnreadableDocument { .. }));
    }

    #[test]
    fn slide_number_parsing() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }
}
