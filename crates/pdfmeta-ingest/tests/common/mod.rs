//! Shared fixtures: lopdf-generated PDFs and a call-counting mock backend.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use pdfmeta_core::{BackendError, PdfBackend};

/// Write a PDF with one page per entry of `pages`, each page showing its
/// lines top to bottom in Courier.
pub fn write_pdf(path: &Path, pages: &[&[&str]], title: Option<&str>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal("Ana Perez"),
            "Producer" => Object::string_literal("pdfmeta test suite"),
        });
        doc.trailer.set("Info", info_id);
    }

    doc.save(path).unwrap();
}

/// First page of a plausible Spanish-language article.
pub const ARTICLE_PAGE: &[&str] = &[
    "Revista de Ingenieria, Volume 8, ISSN 2145-9371",
    "RECUPERACION DE METADATOS EN ARTICULOS CIENTIFICOS",
    "Universidad Nacional",
    "Facultad de Ingenieria",
    "Bogota, Colombia",
    "Ana Maria Perez, Luis Gomez Ruiz",
    "ana.perez@unal.edu.co, lgomez@unal.edu.co",
    "Recibido 2021 Publicado 2022",
    "DOI: 10.15446/rev.ing.v8n1.98765",
    "Resumen",
    "Este trabajo presenta un metodo para recuperar metadatos",
    "bibliograficos de archivos PDF academicos con heuristicas.",
    "Palabras clave: metadatos; PDF; heuristicas.",
    "1. Introduccion",
];

pub fn article_pdf(dir: &Path) -> PathBuf {
    let path = dir.join("article.pdf");
    write_pdf(&path, &[ARTICLE_PAGE], Some("Recuperacion de metadatos"));
    path
}

/// What a [`MockBackend`] does when called.
#[derive(Clone)]
pub enum MockBehavior {
    Text(String),
    Fail,
    Panic,
}

/// Backend double that records how often (and with what page limit) it
/// was called.
#[derive(Clone)]
pub struct MockBackend {
    pub name: &'static str,
    pub behavior: MockBehavior,
    pub calls: Arc<AtomicUsize>,
    pub last_max_pages: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(name: &'static str, behavior: MockBehavior) -> Self {
        Self {
            name,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            last_max_pages: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PdfBackend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract_text(&self, _path: &Path, max_pages: usize) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_pages.store(max_pages, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Text(t) => Ok(t.clone()),
            MockBehavior::Fail => Err(BackendError::ExtractionError("mock failure".into())),
            MockBehavior::Panic => panic!("mock backend panic"),
        }
    }
}

pub fn long_text() -> String {
    "Structured text from a well-behaved backend. ".repeat(5)
}
