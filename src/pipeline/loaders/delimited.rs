//! Delimited-text loader (.csv, .tsv).
//!
//! Rows are re-serialised as `header: value` lines with a blank line between
//! records, so the model sees which column each value came from. Empty
//! values are omitted; ragged rows are tolerated.

use super::ooxml::unreadable;
use crate::error::DynamoError;

/// Field delimiter for a file name: tab for `.tsv`, comma otherwise.
pub fn delimiter_for(name: &str) -> u8 {
    if name.to_ascii_lowercase().ends_with(".tsv") {
        b'\t'
    } else {
        b','
    }
}

/// Parse delimited text and re-serialise it as labelled lines.
pub fn extract(source_id: &str, bytes: &[u8], delimiter: u8) -> Result<String, DynamoError> {
    // Excel likes to prepend a UTF-8 BOM to CSV exports.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(source_id, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut out = String::new();
    for result in reader.records() {
        let record = result.map_err(|e| unreadable(source_id, e))?;

        let mut lines = Vec::with_capacity(record.len());
        for (i, value) in record.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            match headers.get(i).filter(|h| !h.is_empty()) {
                Some(h) => lines.push(format!("{h}: {value}")),
                None => lines.push(format!("column {}: {value}", i + 1)),
            }
        }
        if lines.is_empty() {
            continue;
        }
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_become_labelled_blocks() {
        let csv = b"term,definition\nosmosis,water crossing a membrane\n , \nATP, energy currency \n";
        let text = extract("bio.csv", csv, b',').unwrap();
        assert_eq!(
            text,
            "term: osmosis\ndefinition: water crossing a membrane\n\nterm: ATP\ndefinition: energy currency\n\n"
        );
    }

    #[test]
    fn ragged_rows_and_missing_headers() {
        let csv = b"a,b\n1,2,3\n";
        let text = extract("r.csv", csv, b',').unwrap();
        assert_eq!(text, "a: 1\nb: 2\ncolumn 3: 3\n\n");
    }

    #[test]
    fn tsv_delimiter() {
        assert_eq!(delimiter_for("Data.TSV"), b'\t');
        assert_eq!(delimiter_for("data.csv"), b',');
        let text = extract("t.tsv", b"q\ta\nwhy\tbecause\n", b'\t').unwrap();
        assert_eq!(text, "q: why\na: because\n\n");
    }

    #[test]
    fn bom_stripped() {
        let text = extract("bom.csv", b"\xEF\xBB\xBFname\nAda\n", b',').unwrap();
        assert_eq!(text, "name: Ada\n\n");
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        let err = extract("bad.csv", b"h\n\xFF\xFE\n", b',').unwrap_err();
        assert!(matches!(err, DynamoError::UnreadableDocument { .. }));
    }

    #[test]
    fn header_only_yields_no_text() {
        assert_eq!(extract("h.csv", b"a,b\n", b',').unwrap(), "");
    }
}
