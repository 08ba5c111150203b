//! Worker for converting one Medline XML file into a Parquet shard

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use medcurate_core::ParquetSink;

use crate::parser::parse_medline_xml;
use crate::transform::{ArticleAccumulator, BATCH_SIZE};

/// A local Medline file and the shard stem it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// `pubmed23n0001.xml.gz` → `pubmed23n0001`
    pub stem: String,
}

impl InputFile {
    /// Recognize `*.xml.gz` and `*.xml`; anything else is not an input
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with('.') {
            return None;
        }
        let stem = name
            .strip_suffix(".xml.gz")
            .or_else(|| name.strip_suffix(".xml"))?;
        if stem.is_empty() {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            stem: stem.to_string(),
        })
    }

    pub fn is_gzip(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
    }

    /// `<output_dir>/<stem>.parquet`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.parquet", self.stem))
    }
}

/// Read the whole document, decompressing gzip input
fn read_document(input: &InputFile) -> Result<String> {
    let file = File::open(&input.path)
        .with_context(|| format!("Failed to open {}", input.path.display()))?;
    let mut xml = String::new();
    if input.is_gzip() {
        MultiGzDecoder::new(BufReader::new(file)).read_to_string(&mut xml)
    } else {
        BufReader::new(file).read_to_string(&mut xml)
    }
    .with_context(|| format!("Failed to read {}", input.path.display()))?;
    Ok(xml)
}

/// Parse one input and write `<stem>.parquet`. Returns the article count.
///
/// Nothing is published under the final name unless every article was
/// written. A document without articles still produces an empty shard.
pub fn process_file(input: &InputFile, output_dir: &Path, zstd_level: i32) -> Result<usize> {
    let xml = read_document(input)?;
    let articles = parse_medline_xml(&xml)
        .with_context(|| format!("Failed to parse {}", input.path.display()))?;
    drop(xml);

    let schema = crate::schema::articles();
    let mut sink = ParquetSink::new(&input.stem, output_dir, &schema, zstd_level)
        .context("Failed to create parquet sink")?;

    let mut acc = ArticleAccumulator::new();
    let written = (|| -> Result<()> {
        for article in articles {
            acc.push(article);
            if acc.len() >= BATCH_SIZE {
                sink.write_batch(&acc.take_batch()?)?;
            }
        }
        if !acc.is_empty() {
            sink.write_batch(&acc.take_batch()?)?;
        }
        Ok(())
    })();

    if let Err(e) = written {
        sink.abort();
        return Err(e).with_context(|| format!("Failed to write shard {}", input.stem));
    }
    let count = sink.finalize().context("Failed to finalize parquet")?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_file_stems() {
        let gz = InputFile::from_path(Path::new("/in/pubmed23n0001.xml.gz")).unwrap();
        assert_eq!(gz.stem, "pubmed23n0001");
        assert!(gz.is_gzip());

        let plain = InputFile::from_path(Path::new("/in/sample.xml")).unwrap();
        assert_eq!(plain.stem, "sample");
        assert!(!plain.is_gzip());

        assert_eq!(
            plain.output_path(Path::new("/out")),
            PathBuf::from("/out/sample.parquet")
        );
    }

    #[test]
    fn non_inputs_rejected() {
        assert!(InputFile::from_path(Path::new("/in/readme.txt")).is_none());
        assert!(InputFile::from_path(Path::new("/in/.hidden.xml")).is_none());
        assert!(InputFile::from_path(Path::new("/in/.xml.gz")).is_none());
        assert!(InputFile::from_path(Path::new("/in/x.xml.gz.md5")).is_none());
    }
}
