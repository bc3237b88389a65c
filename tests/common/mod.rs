//! Shared fixtures for the integration tests: in-memory documents and
//! scripted model / transcript fakes.

#![allow(dead_code)]

use async_trait::async_trait;
use dynamo_flashcards::{
    Completion, DynamoConfig, DynamoError, FlashcardService, GenerationOptions, TextGenerator,
    Transcript, TranscriptSource, VideoLink,
};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Documents ────────────────────────────────────────────────────────────────

pub fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(body.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn inline_cell(col: char, row: usize, text: &str) -> String {
    format!(r#"<c r="{col}{row}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

/// A one-sheet .xlsx workbook named "Terms" holding `rows` of two text cells.
pub fn xlsx_workbook(rows: &[(&str, &str)]) -> Vec<u8> {
    let sheet_rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, (a, b))| {
            let r = i + 1;
            format!(
                r#"<row r="{r}">{}{}</row>"#,
                inline_cell('A', r, a),
                inline_cell('B', r, b)
            )
        })
        .collect();

    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    let workbook = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Terms" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
    );

    zip_parts(&[
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", root_rels),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels),
        ("xl/worksheets/sheet1.xml", &sheet),
    ])
}

/// A minimal .docx whose body holds one paragraph per entry.
pub fn docx_document(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    zip_parts(&[("word/document.xml", &document)])
}

/// A JSON reply holding `n` numbered flashcards.
pub fn json_reply(n: usize) -> String {
    let cards: Vec<String> = (1..=n)
        .map(|i| format!(r#"{{"question": "Question {i}?", "answer": "Answer {i}."}}"#))
        .collect();
    format!("[{}]", cards.join(", "))
}

// ── Model fake ───────────────────────────────────────────────────────────────

/// Replies from a script, one entry per call, and records every prompt.
pub struct ScriptedGenerator {
    replies: Mutex<Vec<Result<String, DynamoError>>>,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<GenerationOptions>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, DynamoError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn replying(reply: impl Into<String>) -> Arc<Self> {
        Self::new(vec![Ok(reply.into())])
    }

    /// A generator that sleeps for `delay` before answering.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(vec![Ok(json_reply(1))]),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<GenerationOptions> {
        self.options.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<Completion, DynamoError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(options);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop();
        match next {
            Some(Ok(text)) => Ok(Completion {
                text,
                input_tokens: 100,
                output_tokens: 50,
            }),
            Some(Err(e)) => Err(e),
            None => Err(DynamoError::Internal("script exhausted".into())),
        }
    }
}

// ── Transcript fake ──────────────────────────────────────────────────────────

/// Serves one fixed transcript (or none) and counts fetches.
pub struct FakeTranscripts {
    transcript: Option<Transcript>,
    fetches: AtomicUsize,
}

impl FakeTranscripts {
    pub fn with(text: &str, length_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            transcript: Some(Transcript {
                title: Some("Lecture".into()),
                length_secs: Some(length_secs),
                text: text.to_string(),
            }),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn none() -> Arc<Self> {
        Arc::new(Self {
            transcript: None,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptSource for FakeTranscripts {
    async fn fetch(&self, link: &VideoLink) -> Result<Transcript, DynamoError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.transcript
            .clone()
            .ok_or_else(|| DynamoError::TranscriptUnavailable {
                url: link.url.clone(),
                reason: "no captions or auto-generated transcript".into(),
            })
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

pub fn service(
    config: DynamoConfig,
    generator: Arc<ScriptedGenerator>,
    transcripts: Arc<FakeTranscripts>,
) -> FlashcardService {
    FlashcardService::with_parts(config, generator, transcripts)
}

pub fn quiet_config() -> DynamoConfig {
    DynamoConfig::builder()
        .summarize_transcripts(false)
        .build()
        .expect("valid config")
}
