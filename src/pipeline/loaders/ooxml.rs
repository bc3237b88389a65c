//! Shared helpers for Office Open XML packages (.docx, .pptx).
//!
//! Both formats are zip archives of XML parts; loaders only ever need to
//! list part names and read a part as UTF-8.
//!
//! Decompressed sizes are capped: a package may expand to at most
//! [`MAX_PACKAGE_BYTES`] in total and [`MAX_PART_BYTES`] per part, whatever
//! its compressed size.

use crate::error::DynamoError;
use std::fmt::Display;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Largest decompressed size of a single part.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Largest decompressed size of a whole package.
const MAX_PACKAGE_BYTES: u64 = 256 * 1024 * 1024;

/// Wrap any parser error as [`DynamoError::UnreadableDocument`].
pub(crate) fn unreadable(source_id: &str, detail: impl Display) -> DynamoError {
    DynamoError::UnreadableDocument {
        source_id: source_id.to_string(),
        detail: detail.to_string(),
    }
}

/// Open `bytes` as a zip package, rejecting packages that expand past
/// [`MAX_PACKAGE_BYTES`].
///
/// Legacy binary formats and password-protected Office files (which are OLE
/// compound documents, not zips) fail here.
pub(crate) fn open_package<'a>(source_id: &str, bytes: &'a [u8]) -> Result<Package<'a>, DynamoError> {
    let mut package = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| unreadable(source_id, format!("not a valid Office package ({e}); encrypted or legacy files are not supported")))?;
    check_expanded_size(source_id, &mut package, MAX_PACKAGE_BYTES)?;
    Ok(package)
}

/// Fail when the declared decompressed size of all parts exceeds `limit`.
fn check_expanded_size(
    source_id: &str,
    package: &mut Package<'_>,
    limit: u64,
) -> Result<(), DynamoError> {
    let mut total: u64 = 0;
    for i in 0..package.len() {
        let file = package.by_index_raw(i).map_err(|e| unreadable(source_id, e))?;
        total = total.saturating_add(file.size());
    }
    if total > limit {
        return Err(unreadable(
            source_id,
            format!("package expands to {total} bytes, more than the {limit} byte limit"),
        ));
    }
    Ok(())
}

/// Read a part as a string. `Ok(None)` when the part does not exist.
pub(crate) fn read_part(
    source_id: &str,
    package: &mut Package<'_>,
    name: &str,
) -> Result<Option<String>, DynamoError> {
    read_part_limited(source_id, package, name, MAX_PART_BYTES)
}

fn read_part_limited(
    source_id: &str,
    package: &mut Package<'_>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, DynamoError> {
    let file = match package.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(unreadable(source_id, e)),
    };
    let too_large = || unreadable(source_id, format!("part '{name}' expands past the {limit} byte limit"));
    if file.size() > limit {
        return Err(too_large());
    }
    // The declared size can lie; never read more than one byte past the limit.
    let mut xml = String::new();
    file.take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| unreadable(source_id, format!("part '{name}': {e}")))?;
    if xml.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(Some(xml))
}

/// All part names in the package.
pub(crate) fn part_names(package: &Package<'_>) -> Vec<String> {
    package.file_names().map(str::to_string).collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! In-memory zip builder shared by loader tests.

    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(body.as_bytes()).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}
