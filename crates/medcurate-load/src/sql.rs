//! SQL text for the curated table

use std::path::Path;

/// Auto-incrementing row id
pub const TAB_ID: &str = "tab_id";
/// Columns every curated table carries after the source columns
pub const CLASS_VALUE: &str = "class_value";
pub const CLEAN_ABSTRACT: &str = "clean_abstract";
pub const CLEAN_TITLE: &str = "clean_title";

const DERIVED: [&str; 4] = [TAB_ID, CLASS_VALUE, CLEAN_ABSTRACT, CLEAN_TITLE];

/// Double-quote an identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn sequence_name(table: &str) -> String {
    format!("{table}_{TAB_ID}_seq")
}

/// Source columns with derived names removed, first occurrence kept
pub fn source_columns(columns: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for c in columns {
        if !DERIVED.contains(&c.as_str()) && !out.contains(c) {
            out.push(c.clone());
        }
    }
    out
}

/// Sequence + table DDL: `tab_id`, source columns as VARCHAR, derived columns
pub fn create_table(table: &str, columns: &[String]) -> String {
    let mut cols = vec![format!(
        "{TAB_ID} BIGINT PRIMARY KEY DEFAULT nextval({})",
        quote_literal(&sequence_name(table))
    )];
    cols.extend(
        source_columns(columns)
            .iter()
            .map(|c| format!("{} VARCHAR", quote_ident(c))),
    );
    cols.push(format!("{CLASS_VALUE} DOUBLE"));
    cols.push(format!("{CLEAN_ABSTRACT} VARCHAR"));
    cols.push(format!("{CLEAN_TITLE} VARCHAR"));

    format!(
        "CREATE SEQUENCE IF NOT EXISTS {seq};
         CREATE TABLE {table} (\n    {cols}\n);",
        seq = quote_ident(&sequence_name(table)),
        table = quote_ident(table),
        cols = cols.join(",\n    ")
    )
}

/// Parameterized insert over `columns` (everything but `tab_id`)
pub fn insert(table: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_ident(table),
        names.join(", ")
    )
}

/// Column names of a parquet file, in file order
pub fn describe_parquet(path: &Path) -> String {
    format!(
        "SELECT column_name FROM (DESCRIBE SELECT * FROM read_parquet({}))",
        quote_literal(&path.to_string_lossy())
    )
}

pub fn table_exists() -> &'static str {
    "SELECT count(*) FROM information_schema.tables WHERE table_name = ?"
}

pub fn table_columns() -> &'static str {
    "SELECT column_name FROM information_schema.columns \
     WHERE table_name = ? ORDER BY ordinal_position"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn derived_columns_not_duplicated() {
        let cols = vec![
            "pmid".to_string(),
            "class_value".to_string(),
            "abstract".to_string(),
            "pmid".to_string(),
        ];
        assert_eq!(source_columns(&cols), vec!["pmid", "abstract"]);
    }

    #[test]
    fn create_table_layout() {
        let ddl = create_table("imagenome", &["pmid".to_string(), "abstract".to_string()]);
        assert!(ddl.contains("CREATE SEQUENCE IF NOT EXISTS \"imagenome_tab_id_seq\""));
        assert!(ddl.contains("tab_id BIGINT PRIMARY KEY DEFAULT nextval('imagenome_tab_id_seq')"));
        assert!(ddl.contains("\"pmid\" VARCHAR"));
        assert!(ddl.contains("class_value DOUBLE"));
        assert!(ddl.contains("clean_title VARCHAR"));
    }

    #[test]
    fn insert_has_one_placeholder_per_column() {
        let sql = insert("t", &["a".to_string(), "b".to_string()]);
        assert_eq!(sql, "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?)");
    }
}
