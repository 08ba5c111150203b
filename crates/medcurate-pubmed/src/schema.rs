//! Arrow schema for parsed Medline shards
//!
//! Every column is text so shards load into a relational table without type
//! mapping. Multi-valued fields are JSON arrays (`authors`, `affiliations`,
//! `mesh_terms`) or `; `-joined lists (`keywords`, `publication_types`).

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

/// Medline articles schema
pub static ARTICLES: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        // === Identifiers ===
        Field::new("pmid", DataType::Utf8, false),
        Field::new("doi", DataType::Utf8, true),
        Field::new("pmc", DataType::Utf8, true),
        // === Text ===
        Field::new("title", DataType::Utf8, true),
        Field::new("abstract", DataType::Utf8, true),
        // === Source ===
        Field::new("journal", DataType::Utf8, true),
        Field::new("pubdate", DataType::Utf8, true),
        // === People ===
        Field::new("authors", DataType::Utf8, true),
        Field::new("affiliations", DataType::Utf8, true),
        // === Indexing ===
        Field::new("keywords", DataType::Utf8, true),
        Field::new("mesh_terms", DataType::Utf8, true),
        Field::new("publication_types", DataType::Utf8, true),
        Field::new("language", DataType::Utf8, true),
    ]))
});

pub fn articles() -> SchemaRef {
    ARTICLES.clone()
}
