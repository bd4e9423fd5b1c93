//! Input resolution and archiving of uploaded reports.
//!
//! Every report is validated before pdfium sees it: the file must exist, be
//! readable and start with the `%PDF` magic bytes, so callers get a
//! meaningful error rather than a pdfium failure. Uploads are then archived
//! verbatim in the reports directory under their original file name; a
//! second upload with the same name replaces the first.

use crate::error::LabSheetError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate a local file: it must exist, be readable and look like a PDF.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, LabSheetError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(LabSheetError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(PDF_MAGIC.len());
            f.take(PDF_MAGIC.len() as u64)
                .read_to_end(&mut head)
                .map_err(|e| LabSheetError::InvalidInput {
                    input: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            if !head.starts_with(PDF_MAGIC) {
                return Err(LabSheetError::NotAPdf {
                    path,
                    magic: leading_bytes(&head),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(LabSheetError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(LabSheetError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Check that in-memory bytes start with the PDF magic.
///
/// Inputs shorter than the magic itself are rejected too.
pub fn check_pdf_bytes(bytes: &[u8], file_name: &str) -> Result<(), LabSheetError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(LabSheetError::NotAPdf {
            path: PathBuf::from(file_name),
            magic: leading_bytes(bytes),
        });
    }
    Ok(())
}

/// First four bytes, zero-padded when the input is shorter.
fn leading_bytes(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}

/// Reduce an upload name to its final path component.
///
/// `../../etc/passwd.pdf` becomes `passwd.pdf`; names without a final
/// component (`""`, `..`, `/`) are rejected.
pub fn upload_file_name(name: &str) -> Result<String, LabSheetError> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| LabSheetError::InvalidInput {
            input: name.to_string(),
            reason: "upload name has no file name component".into(),
        })
}

/// Save `bytes` verbatim as `reports_dir/<file name>`, replacing any
/// existing file with that name.
pub fn archive_bytes(
    bytes: &[u8],
    file_name: &str,
    reports_dir: &Path,
) -> Result<PathBuf, LabSheetError> {
    let target = reports_dir.join(upload_file_name(file_name)?);
    let archive_err = |e: std::io::Error| LabSheetError::ArchiveWriteFailed {
        path: target.clone(),
        source: e,
    };

    std::fs::create_dir_all(reports_dir).map_err(archive_err)?;
    std::fs::write(&target, bytes).map_err(archive_err)?;

    info!("Archived upload to {}", target.display());
    Ok(target)
}

/// Copy an already validated local report into the reports directory.
pub fn archive_file(source: &Path, reports_dir: &Path) -> Result<PathBuf, LabSheetError> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LabSheetError::InvalidInput {
            input: source.display().to_string(),
            reason: "path has no UTF-8 file name".into(),
        })?;
    let target = reports_dir.join(name);

    // Archiving a file onto itself would truncate it.
    if paths_equal(source, &target) {
        debug!("{} is already in the reports directory", source.display());
        return Ok(target);
    }

    let archive_err = |e: std::io::Error| LabSheetError::ArchiveWriteFailed {
        path: target.clone(),
        source: e,
    };
    std::fs::create_dir_all(reports_dir).map_err(archive_err)?;
    std::fs::copy(source, &target).map_err(archive_err)?;

    info!("Archived {} to {}", source.display(), target.display());
    Ok(target)
}

fn paths_equal(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn resolve_missing_file() {
        let err = resolve_local("/nonexistent/report.pdf").unwrap_err();
        assert!(matches!(err, LabSheetError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "notes.pdf", b"PK\x03\x04zip");
        match resolve_local(&path).unwrap_err() {
            LabSheetError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolve_accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "report.pdf", b"%PDF-1.7\n");
        assert_eq!(resolve_local(&path).unwrap(), path);
    }

    #[test]
    fn check_bytes() {
        assert!(check_pdf_bytes(b"%PDF-1.4", "a.pdf").is_ok());
        assert!(matches!(
            check_pdf_bytes(b"GIF89a", "a.pdf"),
            Err(LabSheetError::NotAPdf { .. })
        ));
    }

    #[test]
    fn upload_name_strips_directories() {
        assert_eq!(upload_file_name("../../etc/blood.pdf").unwrap(), "blood.pdf");
        assert_eq!(upload_file_name("report.pdf").unwrap(), "report.pdf");
        assert!(upload_file_name("..").is_err());
        assert!(upload_file_name("").is_err());
    }

    #[test]
    fn archive_bytes_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("sample_reports");

        let first = archive_bytes(b"%PDF-first", "report.pdf", &reports).unwrap();
        let second = archive_bytes(b"%PDF-second", "report.pdf", &reports).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"%PDF-second");
    }

    #[test]
    fn archive_file_copies_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "cbc.pdf", b"%PDF-1.5 body");
        let reports = dir.path().join("reports");

        let target = archive_file(&source, &reports).unwrap();
        assert_eq!(target, reports.join("cbc.pdf"));
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5 body");
        assert!(source.exists());
    }

    #[test]
    fn archive_file_onto_itself_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "cbc.pdf", b"%PDF-1.5 body");

        let target = archive_file(&source, dir.path()).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5 body");
    }

    #[test]
    fn short_inputs_are_not_pdfs() {
        for bytes in [&b""[..], b"%P", b"%PD"] {
            assert!(matches!(
                check_pdf_bytes(bytes, "tiny.pdf"),
                Err(LabSheetError::NotAPdf { .. })
            ));
        }
        match check_pdf_bytes(b"%P", "tiny.pdf").unwrap_err() {
            LabSheetError::NotAPdf { magic, .. } => assert_eq!(&magic, b"%P\0\0"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolve_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.pdf", b"");
        match resolve_local(&path).unwrap_err() {
            LabSheetError::NotAPdf { magic, .. } => assert_eq!(magic, [0u8; 4]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
