use std::path::Path;

use lopdf::{Dictionary, Document, Object};

use pdfmeta_core::PdfInfo;

use crate::backends::decode_pdf_string;

/// Info-dictionary entries copied into [`PdfInfo::metadata`], as
/// (output key, PDF key).
const INFO_KEYS: &[(&str, &[u8])] = &[
    ("title", b"Title"),
    ("author", b"Author"),
    ("subject", b"Subject"),
    ("creator", b"Creator"),
    ("producer", b"Producer"),
    ("creation_date", b"CreationDate"),
];

/// Read container-level attributes of a PDF.
///
/// Never fails: an unreadable or unparsable file yields the defaults (with
/// `file_size` still filled in when the file can be stat'ed) and an error
/// log line.
pub fn get_pdf_info(path: &Path) -> PdfInfo {
    let mut info = PdfInfo {
        file_size: std::fs::metadata(path).ok().map(|m| m.len()),
        ..Default::default()
    };

    match Document::load(path) {
        Ok(doc) => fill_from_document(&doc, &mut info),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not read PDF info");
            info.encrypted = declares_encryption(path);
        }
    }

    info
}

/// Raw scan for an `/Encrypt` entry, for files lopdf cannot load (typically
/// because it cannot decrypt them).
fn declares_encryption(path: &Path) -> bool {
    const KEY: &[u8] = b"/Encrypt";
    std::fs::read(path)
        .map(|bytes| bytes.windows(KEY.len()).any(|w| w == KEY))
        .unwrap_or(false)
}

fn fill_from_document(doc: &Document, info: &mut PdfInfo) {
    info.num_pages = Some(doc.get_pages().len());
    info.encrypted = doc.trailer.get(b"Encrypt").is_ok();
    info.pdf_version = Some(doc.version.clone());

    if let Some(dict) = info_dictionary(doc) {
        for (key, pdf_key) in INFO_KEYS {
            let value = dict
                .get(pdf_key)
                .ok()
                .and_then(|obj| obj.as_str().ok())
                .map(decode_pdf_string);
            info.metadata.insert(key.to_string(), value);
        }
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}
