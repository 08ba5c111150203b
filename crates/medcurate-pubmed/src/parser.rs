//! Medline/PubMed XML parser using quick-xml
//!
//! Pull parser over `PubmedArticleSet` and `MedlineCitationSet` documents.
//! Any XML error fails the whole document: a half-parsed file is never
//! turned into a shard.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parsed citation, reduced to the fields the curation pipeline stores
#[derive(Debug, Default, Clone)]
pub struct MedlineArticle {
    pub pmid: String,
    pub doi: Option<String>,
    pub pmc: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; free text for `MedlineDate`
    pub pubdate: Option<String>,
    pub language: Option<String>,
    pub authors: Vec<Author>,
    pub keywords: Vec<String>,
    pub mesh_terms: Vec<MeshTerm>,
    pub publication_types: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Author {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub affiliations: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct MeshTerm {
    pub descriptor: String,
    pub descriptor_ui: Option<String>,
    pub is_major_topic: bool,
}

/// Parse every citation in a Medline XML document.
///
/// Citations without a PMID are dropped.
pub fn parse_medline_xml(xml: &str) -> Result<Vec<MedlineArticle>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut articles = Vec::new();
    let mut buf = Vec::new();

    loop {
        let article = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"PubmedArticle" => {
                Some(parse_article(&mut reader)?)
            }
            // MedlineCitationSet files carry bare citations
            Ok(Event::Start(e)) if e.name().as_ref() == b"MedlineCitation" => {
                let mut article = MedlineArticle::default();
                parse_medline_citation(&mut reader, &mut article)?;
                Some(article)
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("XML parse error at byte {}", reader.buffer_position())
                });
            }
            _ => None,
        };
        buf.clear();

        match article {
            Some(article) if !article.pmid.is_empty() => articles.push(article),
            Some(_) => log::debug!("Dropping citation without PMID"),
            None => {}
        }
    }

    Ok(articles)
}

fn parse_article(reader: &mut Reader<&[u8]>) -> Result<MedlineArticle> {
    let mut article = MedlineArticle::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"MedlineCitation" => parse_medline_citation(reader, &mut article)?,
                b"PubmedData" => parse_pubmed_data(reader, &mut article)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"PubmedArticle" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(article)
}

fn parse_medline_citation(reader: &mut Reader<&[u8]>, article: &mut MedlineArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                // First PMID wins; CommentsCorrections nest more of them
                b"PMID" if article.pmid.is_empty() => article.pmid = read_text(reader)?,
                b"Article" => parse_article_element(reader, article)?,
                b"MeshHeadingList" => article.mesh_terms = parse_mesh_list(reader)?,
                b"KeywordList" => article
                    .keywords
                    .extend(parse_list(reader, b"Keyword", b"KeywordList")?),
                b"CommentsCorrectionsList" => {
                    skip_element(reader, b"CommentsCorrectionsList")?
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"MedlineCitation" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_article_element(reader: &mut Reader<&[u8]>, article: &mut MedlineArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Journal" => parse_journal(reader, article)?,
                b"ArticleTitle" => {
                    article.title = non_empty(read_text_content(reader, b"ArticleTitle")?)
                }
                b"Abstract" => article.abstract_text = non_empty(parse_abstract(reader)?),
                b"AuthorList" => article.authors = parse_author_list(reader)?,
                b"Language" => article.language = non_empty(read_text(reader)?),
                b"PublicationTypeList" => {
                    article.publication_types =
                        parse_list(reader, b"PublicationType", b"PublicationTypeList")?
                }
                b"ELocationID" => {
                    let is_doi = attr(&e, b"EIdType").as_deref() == Some("doi");
                    let value = read_text(reader)?;
                    if is_doi && article.doi.is_none() {
                        article.doi = non_empty(value);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Article" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_journal(reader: &mut Reader<&[u8]>, article: &mut MedlineArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Title" => article.journal = non_empty(read_text(reader)?),
                b"PubDate" => article.pubdate = parse_pub_date(reader)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Journal" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_pub_date(reader: &mut Reader<&[u8]>) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let mut year = None;
    let mut month = None;
    let mut day = None;
    let mut medline_date = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"Year" => year = non_empty(read_text(reader)?),
                b"Month" => month = parse_month(&read_text(reader)?),
                b"Day" => day = read_text(reader)?.parse::<u32>().ok(),
                b"MedlineDate" => medline_date = non_empty(read_text(reader)?),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"PubDate" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(match (year, month, day) {
        (Some(y), Some(m), Some(d)) => Some(format!("{y}-{m:02}-{d:02}")),
        (Some(y), Some(m), None) => Some(format!("{y}-{m:02}")),
        (Some(y), None, _) => Some(y),
        (None, _, _) => medline_date,
    })
}

fn parse_month(s: &str) -> Option<u32> {
    // Numeric or three-letter English month
    if let Ok(n) = s.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let month = match s.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_abstract(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text_parts = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"AbstractText" => {
                text_parts.push(read_text_content(reader, b"AbstractText")?);
            }
            Event::End(e) if e.name().as_ref() == b"Abstract" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text_parts.join(" "))
}

fn parse_author_list(reader: &mut Reader<&[u8]>) -> Result<Vec<Author>> {
    let mut authors = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"Author" => {
                authors.push(parse_author(reader)?);
            }
            Event::End(e) if e.name().as_ref() == b"AuthorList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(authors)
}

fn parse_author(reader: &mut Reader<&[u8]>) -> Result<Author> {
    let mut author = Author::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"LastName" => author.last_name = non_empty(read_text(reader)?),
                b"ForeName" => author.fore_name = non_empty(read_text(reader)?),
                b"Initials" => author.initials = non_empty(read_text(reader)?),
                // Collective names stand in for a person
                b"CollectiveName" => author.last_name = non_empty(read_text(reader)?),
                b"Affiliation" => {
                    if let Some(aff) = non_empty(read_text(reader)?) {
                        author.affiliations.push(aff);
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"Author" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(author)
}

fn parse_mesh_list(reader: &mut Reader<&[u8]>) -> Result<Vec<MeshTerm>> {
    let mut terms = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"DescriptorName" => {
                let descriptor_ui = attr(&e, b"UI");
                let is_major_topic = attr(&e, b"MajorTopicYN").as_deref() == Some("Y");
                terms.push(MeshTerm {
                    descriptor: read_text(reader)?,
                    descriptor_ui,
                    is_major_topic,
                });
            }
            Event::End(e) if e.name().as_ref() == b"MeshHeadingList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(terms)
}

/// Collect the text of every `item` element until `end`
fn parse_list(reader: &mut Reader<&[u8]>, item: &[u8], end: &[u8]) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == item => {
                if let Some(text) = non_empty(read_text_content(reader, item)?) {
                    items.push(text);
                }
            }
            Event::End(e) if e.name().as_ref() == end => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

fn parse_pubmed_data(reader: &mut Reader<&[u8]>, article: &mut MedlineArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"ArticleIdList" => parse_article_id_list(reader, article)?,
                b"ReferenceList" => skip_element(reader, b"ReferenceList")?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"PubmedData" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn parse_article_id_list(reader: &mut Reader<&[u8]>, article: &mut MedlineArticle) -> Result<()> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"ArticleId" => {
                let id_type = attr(&e, b"IdType").unwrap_or_default();
                let value = non_empty(read_text(reader)?);
                match id_type.as_str() {
                    "doi" => article.doi = value.or(article.doi.take()),
                    "pmc" => article.pmc = value,
                    _ => {}
                }
            }
            Event::End(e) if e.name().as_ref() == b"ArticleIdList" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn skip_element(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end_tag {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Read text content until next end tag
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::End(_) => break,
            Event::Start(_) => {
                // Inline markup such as <i>, <sup>
                text.push_str(&read_text(reader)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Read text content of a specific element, flattening nested tags
fn read_text_content(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&e.unescape()?);
            }
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth -= 1;
                if depth == 0 && e.name().as_ref() == end_tag {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">12345</PMID>
      <Article>
        <Journal>
          <Title>Journal of Nuclear Medicine</Title>
          <JournalIssue>
            <PubDate>
              <Year>2021</Year>
              <Month>Mar</Month>
              <Day>5</Day>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Tc-99m <i>in vivo</i> imaging</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Background text.</AbstractText>
          <AbstractText Label="RESULTS">Results text.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author>
            <LastName>Smith</LastName>
            <ForeName>John</ForeName>
            <Initials>J</Initials>
            <AffiliationInfo>
              <Affiliation>University of Test</Affiliation>
            </AffiliationInfo>
          </Author>
          <Author>
            <CollectiveName>PET Study Group</CollectiveName>
          </Author>
        </AuthorList>
        <Language>eng</Language>
        <PublicationTypeList>
          <PublicationType UI="D016428">Journal Article</PublicationType>
        </PublicationTypeList>
      </Article>
      <MeshHeadingList>
        <MeshHeading>
          <DescriptorName UI="D011877" MajorTopicYN="Y">Radionuclide Imaging</DescriptorName>
          <QualifierName UI="Q000379" MajorTopicYN="N">methods</QualifierName>
        </MeshHeading>
      </MeshHeadingList>
      <KeywordList Owner="NOTNLM">
        <Keyword MajorTopicYN="N">SPECT</Keyword>
        <Keyword MajorTopicYN="N">technetium</Keyword>
      </KeywordList>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites">
          <PMID Version="1">999</PMID>
        </CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">12345</ArticleId>
        <ArticleId IdType="doi">10.1234/jnm.2021</ArticleId>
        <ArticleId IdType="pmc">PMC7654321</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn parse_basic_article() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        assert_eq!(articles.len(), 1);

        let article = &articles[0];
        assert_eq!(article.pmid, "12345");
        assert_eq!(article.doi.as_deref(), Some("10.1234/jnm.2021"));
        assert_eq!(article.pmc.as_deref(), Some("PMC7654321"));
        assert_eq!(article.journal.as_deref(), Some("Journal of Nuclear Medicine"));
        assert_eq!(article.language.as_deref(), Some("eng"));
        assert_eq!(article.publication_types, vec!["Journal Article"]);
        assert_eq!(article.keywords, vec!["SPECT", "technetium"]);
    }

    #[test]
    fn nested_pmids_do_not_override() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        assert_eq!(articles[0].pmid, "12345");
    }

    #[test]
    fn title_flattens_inline_markup() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        assert_eq!(articles[0].title.as_deref(), Some("Tc-99m in vivo imaging"));
    }

    #[test]
    fn structured_abstract_is_joined() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        assert_eq!(
            articles[0].abstract_text.as_deref(),
            Some("Background text. Results text.")
        );
    }

    #[test]
    fn pubdate_formats() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        assert_eq!(articles[0].pubdate.as_deref(), Some("2021-03-05"));
        assert_eq!(parse_month("12"), Some(12));
        assert_eq!(parse_month("September"), Some(9));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month(""), None);
    }

    #[test]
    fn medline_date_fallback() {
        let xml = r#"<MedlineCitationSet><MedlineCitation><PMID>1</PMID><Article>
            <Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
            </Article></MedlineCitation></MedlineCitationSet>"#;
        let articles = parse_medline_xml(xml).unwrap();
        assert_eq!(articles[0].pubdate.as_deref(), Some("1998 Dec-1999 Jan"));
    }

    #[test]
    fn authors_and_collective_names() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        let authors = &articles[0].authors;
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].last_name.as_deref(), Some("Smith"));
        assert_eq!(authors[0].affiliations, vec!["University of Test"]);
        assert_eq!(authors[1].last_name.as_deref(), Some("PET Study Group"));
        assert!(authors[1].fore_name.is_none());
    }

    #[test]
    fn mesh_descriptors_only() {
        let articles = parse_medline_xml(SAMPLE_XML).unwrap();
        let mesh = &articles[0].mesh_terms;
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh[0].descriptor, "Radionuclide Imaging");
        assert_eq!(mesh[0].descriptor_ui.as_deref(), Some("D011877"));
        assert!(mesh[0].is_major_topic);
    }

    #[test]
    fn missing_pmid_is_dropped() {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation>\
                   <Article><ArticleTitle>x</ArticleTitle></Article>\
                   </MedlineCitation></PubmedArticle></PubmedArticleSet>";
        assert!(parse_medline_xml(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_fails_document() {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID>1</PMID>\
                   </Wrong></PubmedArticle></PubmedArticleSet>";
        assert!(parse_medline_xml(xml).is_err());
    }

    #[test]
    fn empty_document() {
        assert!(parse_medline_xml("<PubmedArticleSet/>").unwrap().is_empty());
    }
}
