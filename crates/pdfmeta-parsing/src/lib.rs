//! Field recognizers for text extracted from academic PDFs.
//!
//! Every function here is pure: it takes the extracted text, never touches
//! I/O, and returns the field's empty default (`None` or an empty `Vec`) when
//! nothing is found, including for empty input.

pub mod authors;
pub mod dates;
pub mod identifiers;
pub mod section;
pub mod text_processing;
pub mod title;

pub use authors::extract_authors;
pub use dates::{extract_year, extract_year_with_current};
pub use identifiers::{extract_doi, extract_emails, extract_issn};
pub use section::{extract_abstract, extract_keywords};
pub use title::extract_title;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_recognizers_accept_empty_text() {
        assert_eq!(extract_title(""), None);
        assert!(extract_authors("").is_empty());
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_doi(""), None);
        assert_eq!(extract_issn(""), None);
        assert_eq!(extract_abstract(""), None);
        assert!(extract_keywords("").is_empty());
        assert!(extract_emails("").is_empty());
    }

    #[test]
    fn recognizers_on_a_realistic_first_page() {
        let text = "\
Revista de Ingeniería, Volume 8, ISSN 2145-9371
RECUPERACIÓN DE METADATOS EN ARTÍCULOS CIENTÍFICOS
Universidad Nacional
Facultad de Ingeniería
Bogotá, Colombia
Ana María Pérez, Luis Gómez Ruiz
ana.perez@unal.edu.co, lgomez@unal.edu.co
Recibido: 2021-03-04 Publicado: 2022-01-15
DOI: 10.15446/rev.ing.v8n1.98765.
Resumen
Este trabajo presenta un método para recuperar metadatos bibliográficos de \
archivos PDF académicos mediante heurísticas sobre el texto extraído.
Palabras clave: metadatos; PDF; heurísticas.
1. Introducción
";
        assert_eq!(
            extract_title(text).as_deref(),
            Some("RECUPERACIÓN DE METADATOS EN ARTÍCULOS CIENTÍFICOS")
        );
        assert_eq!(extract_authors(text), vec!["Ana María Pérez", "Luis Gómez Ruiz"]);
        assert_eq!(extract_year_with_current(text, 2026), Some(2022));
        assert_eq!(extract_doi(text).as_deref(), Some("10.15446/rev.ing.v8n1.98765"));
        assert_eq!(extract_issn(text).as_deref(), Some("2145-9371"));
        assert!(extract_abstract(text).unwrap().starts_with("Este trabajo presenta"));
        assert_eq!(extract_keywords(text), vec!["metadatos", "PDF", "heurísticas"]);
        assert_eq!(
            extract_emails(text),
            vec!["ana.perez@unal.edu.co", "lgomez@unal.edu.co"]
        );
    }
}
