use crate::domain::model::MappingItem;
use crate::utils::error::{Result, TransferError};
use std::io::Read;
use std::path::Path;

const FOLDER_COLUMNS: [&str; 3] = ["foldername", "folder", "folder_name"];
const CATEGORY_COLUMNS: [&str; 3] = ["categoryid", "category", "category_id"];

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_ascii_lowercase().as_str()))
}

/// 讀取「資料夾 → 分類」對應表
pub fn load_mapping_file<P: AsRef<Path>>(path: P) -> Result<Vec<MappingItem>> {
    let file = std::fs::File::open(path.as_ref())?;
    let items = parse_mapping(file)?;
    tracing::info!(
        "📋 Loaded {} mapping items from {}",
        items.len(),
        path.as_ref().display()
    );
    Ok(items)
}

/// 第一列為標題；欄名不分大小寫。空白列略過，缺值的列回報列號（標題為第 1 列）。
pub fn parse_mapping<R: Read>(reader: R) -> Result<Vec<MappingItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let folder_col = find_column(&headers, &FOLDER_COLUMNS).ok_or_else(|| {
        TransferError::validation("mapping", "missing folder column (FolderName)")
    })?;
    let category_col = find_column(&headers, &CATEGORY_COLUMNS).ok_or_else(|| {
        TransferError::validation("mapping", "missing category column (CategoryId)")
    })?;

    let mut items = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        let folder = record.get(folder_col).unwrap_or_default();
        let category = record.get(category_col).unwrap_or_default();

        if record.iter().all(str::is_empty) {
            continue;
        }
        if folder.is_empty() || category.is_empty() {
            return Err(TransferError::validation(
                format!("mapping row {}", row),
                "both folder and category are required",
            ));
        }

        items.push(MappingItem::new(folder, category));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_standard_headers() {
        let csv = "FolderName,CategoryId\ncats,1001\ndogs,1002\n";
        let items = parse_mapping(csv.as_bytes()).unwrap();
        assert_eq!(
            items,
            vec![MappingItem::new("cats", "1001"), MappingItem::new("dogs", "1002")]
        );
    }

    #[test]
    fn test_header_aliases_and_extra_columns() {
        let csv = "Notes, category_id ,FOLDER\nfirst,7,birds\n";
        let items = parse_mapping(csv.as_bytes()).unwrap();
        assert_eq!(items, vec![MappingItem::new("birds", "7")]);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let csv = "folder,category\ncats,1\n,\n\ndogs,2\n";
        let items = parse_mapping(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].folder_name, "dogs");
    }

    #[test]
    fn test_missing_value_reports_row() {
        let csv = "folder,category\ncats,1\ndogs,\n";
        let err = parse_mapping(csv.as_bytes()).unwrap_err();
        match err {
            TransferError::Validation { field, .. } => assert_eq!(field, "mapping row 3"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_column() {
        let csv = "folder,name\ncats,x\n";
        assert!(matches!(
            parse_mapping(csv.as_bytes()),
            Err(TransferError::Validation { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"FolderName,CategoryId\nsunsets,42\n").unwrap();

        let items = load_mapping_file(file.path()).unwrap();
        assert_eq!(items, vec![MappingItem::new("sunsets", "42")]);
    }
}
