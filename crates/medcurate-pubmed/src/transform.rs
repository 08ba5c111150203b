//! Transform MedlineArticle to Arrow RecordBatch

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::error::ArrowError;

use crate::parser::{Author, MedlineArticle, MeshTerm};
use crate::schema;

/// Rows per batch written to the sink
pub const BATCH_SIZE: usize = 10_000;

/// Column-wise accumulator for building RecordBatches from articles
#[derive(Debug, Default)]
pub struct ArticleAccumulator {
    pmid: Vec<String>,
    doi: Vec<Option<String>>,
    pmc: Vec<Option<String>>,
    title: Vec<Option<String>>,
    abstract_text: Vec<Option<String>>,
    journal: Vec<Option<String>>,
    pubdate: Vec<Option<String>>,
    authors: Vec<Option<String>>,
    affiliations: Vec<Option<String>>,
    keywords: Vec<Option<String>>,
    mesh_terms: Vec<Option<String>>,
    publication_types: Vec<Option<String>>,
    language: Vec<Option<String>>,
}

impl ArticleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, article: MedlineArticle) {
        self.authors.push(authors_to_json(&article.authors));
        self.affiliations
            .push(affiliations_to_json(&article.authors));
        self.mesh_terms.push(mesh_to_json(&article.mesh_terms));
        self.keywords.push(join_list(&article.keywords));
        self.publication_types
            .push(join_list(&article.publication_types));

        self.pmid.push(article.pmid);
        self.doi.push(article.doi);
        self.pmc.push(article.pmc);
        self.title.push(article.title);
        self.abstract_text.push(article.abstract_text);
        self.journal.push(article.journal);
        self.pubdate.push(article.pubdate);
        self.language.push(article.language);
    }

    pub fn len(&self) -> usize {
        self.pmid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pmid.is_empty()
    }

    /// Drain accumulated rows into a batch matching [`schema::ARTICLES`]
    pub fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.pmid))),
            Arc::new(StringArray::from(std::mem::take(&mut self.doi))),
            Arc::new(StringArray::from(std::mem::take(&mut self.pmc))),
            Arc::new(StringArray::from(std::mem::take(&mut self.title))),
            Arc::new(StringArray::from(std::mem::take(&mut self.abstract_text))),
            Arc::new(StringArray::from(std::mem::take(&mut self.journal))),
            Arc::new(StringArray::from(std::mem::take(&mut self.pubdate))),
            Arc::new(StringArray::from(std::mem::take(&mut self.authors))),
            Arc::new(StringArray::from(std::mem::take(&mut self.affiliations))),
            Arc::new(StringArray::from(std::mem::take(&mut self.keywords))),
            Arc::new(StringArray::from(std::mem::take(&mut self.mesh_terms))),
            Arc::new(StringArray::from(std::mem::take(
                &mut self.publication_types,
            ))),
            Arc::new(StringArray::from(std::mem::take(&mut self.language))),
        ];

        RecordBatch::try_new(schema::articles(), arrays)
    }
}

fn authors_to_json(authors: &[Author]) -> Option<String> {
    if authors.is_empty() {
        return None;
    }

    let arr: Vec<serde_json::Value> = authors
        .iter()
        .map(|a| {
            serde_json::json!({
                "last_name": a.last_name,
                "fore_name": a.fore_name,
                "initials": a.initials,
            })
        })
        .collect();

    serde_json::to_string(&arr).ok()
}

fn affiliations_to_json(authors: &[Author]) -> Option<String> {
    let all_affs: Vec<&str> = authors
        .iter()
        .flat_map(|a| a.affiliations.iter().map(String::as_str))
        .collect();

    if all_affs.is_empty() {
        return None;
    }

    serde_json::to_string(&all_affs).ok()
}

fn mesh_to_json(terms: &[MeshTerm]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }

    let arr: Vec<serde_json::Value> = terms
        .iter()
        .map(|t| {
            serde_json::json!({
                "descriptor": t.descriptor,
                "descriptor_ui": t.descriptor_ui,
                "is_major": t.is_major_topic,
            })
        })
        .collect();

    serde_json::to_string(&arr).ok()
}

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn accumulator_basic() {
        let mut acc = ArticleAccumulator::new();
        assert!(acc.is_empty());

        acc.push(MedlineArticle {
            pmid: "12345".to_string(),
            title: Some("Test".to_string()),
            ..Default::default()
        });
        assert_eq!(acc.len(), 1);

        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 13);
        assert!(acc.is_empty());
    }

    #[test]
    fn empty_lists_are_null() {
        let mut acc = ArticleAccumulator::new();
        acc.push(MedlineArticle {
            pmid: "1".to_string(),
            ..Default::default()
        });
        let batch = acc.take_batch().unwrap();
        for column in ["authors", "affiliations", "keywords", "mesh_terms"] {
            let idx = batch.schema().index_of(column).unwrap();
            assert!(batch.column(idx).is_null(0), "{column} should be null");
        }
    }

    #[test]
    fn authors_to_json_populated() {
        let authors = vec![Author {
            last_name: Some("Smith".to_string()),
            fore_name: Some("John".to_string()),
            initials: Some("J".to_string()),
            affiliations: vec!["MIT".to_string()],
        }];
        let json = authors_to_json(&authors).unwrap();
        assert!(json.contains("\"last_name\":\"Smith\""));
        assert_eq!(affiliations_to_json(&authors).unwrap(), r#"["MIT"]"#);
    }

    #[test]
    fn mesh_to_json_marks_major() {
        let terms = vec![MeshTerm {
            descriptor: "Radionuclide Imaging".to_string(),
            descriptor_ui: Some("D011877".to_string()),
            is_major_topic: true,
        }];
        let json = mesh_to_json(&terms).unwrap();
        assert!(json.contains("D011877"));
        assert!(json.contains("\"is_major\":true"));
    }

    #[test]
    fn lists_join_with_semicolons() {
        assert_eq!(
            join_list(&["SPECT".to_string(), "PET".to_string()]).as_deref(),
            Some("SPECT; PET")
        );
        assert!(join_list(&[]).is_none());
    }
}
