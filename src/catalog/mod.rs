//! Catalog: tables, schemas, and data file locations described by a JSON
//! manifest (`tdb_manifest.json`).
//!
//! The manifest is read-only for queries. Writers serialize through the
//! advisory lockfile and replace the manifest atomically.

mod lockfile;

pub use lockfile::Lockfile;

use crate::data::{ColumnId, DataType, TableId};
use crate::{Result, ToyDbError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk format of a table's data files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Csv,
    Parquet,
}

impl StorageFormat {
    pub fn parse(s: &str) -> Option<StorageFormat> {
        match s {
            "csv" => Some(StorageFormat::Csv),
            "parquet" => Some(StorageFormat::Parquet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageFormat::Csv => "csv",
            StorageFormat::Parquet => "parquet",
        }
    }
}

/// Column description within a table schema
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// One data file backing a table
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub row_count: Option<i64>,
}

/// Ordered table schema with lookup by column identity and name
#[derive(Debug, Clone, Default)]
pub struct Schema {
    column_ids: Vec<ColumnId>,
    by_id: AHashMap<ColumnId, ColumnMeta>,
}

impl Schema {
    pub fn add_column(&mut self, id: ColumnId, meta: ColumnMeta) {
        self.column_ids.push(id.clone());
        self.by_id.insert(id, meta);
    }

    pub fn column_ids(&self) -> &[ColumnId] {
        &self.column_ids
    }

    pub fn len(&self) -> usize {
        self.column_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_ids.is_empty()
    }

    pub fn column(&self, id: &ColumnId) -> Option<&ColumnMeta> {
        self.by_id.get(id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<(&ColumnId, &ColumnMeta)> {
        self.column_ids
            .iter()
            .find(|id| id.name() == name)
            .map(|id| (id, &self.by_id[id]))
    }
}

/// Everything the engine knows about one table
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub id: TableId,
    pub format: StorageFormat,
    pub schema: Schema,
    pub files: Vec<FileEntry>,
}

// Manifest wire format.

#[derive(Debug, Serialize, Deserialize)]
struct ManifestDoc {
    tables: Vec<TableDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDoc {
    name: String,
    id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_name: Option<String>,
    format: String,
    #[serde(default)]
    schema: Vec<ColumnDoc>,
    #[serde(default)]
    files: Vec<FileDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ColumnDoc {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    // Missing means nullable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nullable: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileDoc {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row_count: Option<i64>,
}

/// Loaded catalog. Table ids come from the manifest; column ids are
/// assigned at load time by numbering columns within each table from 1.
#[derive(Debug)]
pub struct Catalog {
    manifest_path: PathBuf,
    base_dir: PathBuf,
    table_order: Vec<TableId>,
    by_name: AHashMap<String, TableId>,
    by_id: AHashMap<TableId, TableMetadata>,
}

impl Catalog {
    /// Load and validate a manifest. File paths inside resolve relative
    /// to the manifest's parent directory.
    pub fn load(manifest_path: impl Into<PathBuf>) -> Result<Catalog> {
        let manifest_path = manifest_path.into();
        let text = fs::read_to_string(&manifest_path).map_err(|err| {
            ToyDbError::Catalog(format!(
                "cannot read manifest '{}': {}",
                manifest_path.display(),
                err
            ))
        })?;
        let doc: ManifestDoc = serde_json::from_str(&text).map_err(|err| {
            ToyDbError::Catalog(format!(
                "malformed manifest '{}': {}",
                manifest_path.display(),
                err
            ))
        })?;

        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut catalog = Catalog {
            manifest_path,
            base_dir,
            table_order: Vec::with_capacity(doc.tables.len()),
            by_name: AHashMap::with_capacity(doc.tables.len()),
            by_id: AHashMap::with_capacity(doc.tables.len()),
        };

        for table in doc.tables {
            let table_id = TableId::new(table.id, table.name.clone());
            let format = StorageFormat::parse(&table.format).ok_or_else(|| {
                ToyDbError::Catalog(format!(
                    "table '{}' has unknown format '{}'",
                    table.name, table.format
                ))
            })?;

            let mut schema = Schema::default();
            for (ordinal, col) in table.schema.iter().enumerate() {
                let data_type = DataType::parse(&col.type_name).ok_or_else(|| {
                    ToyDbError::Catalog(format!(
                        "column '{}.{}' has unknown type '{}'",
                        table.name, col.name, col.type_name
                    ))
                })?;
                let column_id =
                    ColumnId::with_table(ordinal as u64 + 1, col.name.clone(), table_id.clone());
                schema.add_column(
                    column_id,
                    ColumnMeta {
                        name: col.name.clone(),
                        data_type,
                        nullable: col.nullable.unwrap_or(true),
                    },
                );
            }

            let files = table
                .files
                .iter()
                .map(|f| FileEntry { path: PathBuf::from(&f.path), row_count: f.row_count })
                .collect();

            if catalog.by_name.contains_key(&table.name) {
                return Err(ToyDbError::Catalog(format!(
                    "duplicate table '{}' in manifest",
                    table.name
                )));
            }
            catalog.by_name.insert(table.name.clone(), table_id.clone());
            catalog.table_order.push(table_id.clone());
            catalog
                .by_id
                .insert(table_id.clone(), TableMetadata { id: table_id, format, schema, files });
        }

        log::info!(
            "loaded catalog '{}' with {} tables",
            catalog.manifest_path.display(),
            catalog.table_order.len()
        );
        Ok(catalog)
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Tables in manifest order.
    pub fn list_tables(&self) -> &[TableId] {
        &self.table_order
    }

    pub fn table_by_name(&self, name: &str) -> Option<&TableMetadata> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn table_by_id(&self, id: &TableId) -> Option<&TableMetadata> {
        self.by_id.get(id)
    }

    /// Resolve a column name within a table to its identity.
    pub fn resolve_column(&self, table: &TableId, column_name: &str) -> Result<ColumnId> {
        let meta = self
            .by_id
            .get(table)
            .ok_or_else(|| ToyDbError::TableNotFound(table.name().to_string()))?;
        meta.schema
            .column_by_name(column_name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| {
                ToyDbError::ColumnNotFound(format!("{}.{}", table.name(), column_name))
            })
    }

    /// Type of a column previously resolved through this catalog.
    pub fn column_type(&self, column: &ColumnId) -> Result<DataType> {
        let table = column.table().ok_or_else(|| {
            ToyDbError::ColumnNotFound(format!("column '{}' has no owning table", column.name()))
        })?;
        let meta = self
            .by_id
            .get(table)
            .ok_or_else(|| ToyDbError::TableNotFound(table.name().to_string()))?;
        meta.schema
            .column(column)
            .map(|c| c.data_type)
            .ok_or_else(|| ToyDbError::ColumnNotFound(column.name().to_string()))
    }

    /// Absolute path of a table data file.
    pub fn resolve_file(&self, entry: &FileEntry) -> PathBuf {
        if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            self.base_dir.join(&entry.path)
        }
    }

    /// Persist the catalog back to its manifest: lock `<manifest>.lock`,
    /// write a temp file, atomically rename it over the manifest, unlock.
    pub fn save(&self) -> Result<()> {
        let doc = ManifestDoc {
            tables: self
                .table_order
                .iter()
                .map(|table_id| {
                    let meta = &self.by_id[table_id];
                    TableDoc {
                        name: table_id.name().to_string(),
                        id: table_id.id(),
                        id_name: None,
                        format: meta.format.as_str().to_string(),
                        schema: meta
                            .schema
                            .column_ids()
                            .iter()
                            .filter_map(|id| meta.schema.column(id))
                            .map(|col| ColumnDoc {
                                name: col.name.clone(),
                                type_name: col.data_type.to_string(),
                                nullable: Some(col.nullable),
                            })
                            .collect(),
                        files: meta
                            .files
                            .iter()
                            .map(|f| FileDoc {
                                path: f.path.to_string_lossy().into_owned(),
                                row_count: f.row_count,
                            })
                            .collect(),
                    }
                })
                .collect(),
        };

        let mut lock_path = self.manifest_path.clone().into_os_string();
        lock_path.push(".lock");
        let mut lock = Lockfile::new(PathBuf::from(lock_path));
        lock.lock()?;

        let mut tmp_path = self.manifest_path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|err| ToyDbError::Catalog(format!("cannot serialize manifest: {}", err)))?;
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &self.manifest_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"{
        "tables": [
            {
                "name": "users",
                "id": 11699830787864871553,
                "id_name": "users",
                "format": "csv",
                "schema": [
                    { "name": "id", "type": "INT64", "nullable": false },
                    { "name": "name", "type": "STRING", "nullable": false },
                    { "name": "age", "type": "INT32", "nullable": false },
                    { "name": "city", "type": "STRING", "nullable": true },
                    { "name": "created_at", "type": "STRING" }
                ],
                "files": [ { "path": "users.csv", "row_count": 10 } ]
            },
            {
                "name": "orders",
                "id": 14579454068846827673,
                "format": "csv",
                "schema": [
                    { "name": "id", "type": "INT64", "nullable": false },
                    { "name": "user_id", "type": "INT64", "nullable": false },
                    { "name": "total_amount", "type": "DOUBLE", "nullable": false }
                ],
                "files": [ { "path": "orders.csv" } ]
            }
        ]
    }"#;

    fn write_manifest(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("tdb_manifest.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(write_manifest(&dir, MANIFEST)).unwrap();

        assert_eq!(catalog.list_tables().len(), 2);

        let users = catalog.table_by_name("users").unwrap();
        assert_eq!(users.id.id(), 11699830787864871553);
        assert_eq!(users.format, StorageFormat::Csv);
        assert_eq!(users.schema.len(), 5);
        assert_eq!(users.files.len(), 1);
        assert_eq!(users.files[0].row_count, Some(10));

        let (city_id, city) = users.schema.column_by_name("city").unwrap();
        assert_eq!(city.data_type, DataType::String);
        assert!(city.nullable);
        assert_eq!(city_id.id(), 4);

        // Missing nullable defaults to true.
        let (_, created) = users.schema.column_by_name("created_at").unwrap();
        assert!(created.nullable);

        let (id_col, id_meta) = users.schema.column_by_name("id").unwrap();
        assert_eq!(id_col.id(), 1);
        assert!(!id_meta.nullable);
    }

    #[test]
    fn test_column_ids_numbered_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(write_manifest(&dir, MANIFEST)).unwrap();

        let users = catalog.table_by_name("users").unwrap();
        let orders = catalog.table_by_name("orders").unwrap();
        let ids: Vec<u64> = users.schema.column_ids().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        let ids: Vec<u64> = orders.schema.column_ids().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(write_manifest(&dir, MANIFEST)).unwrap();

        let users = catalog.table_by_name("users").unwrap().id.clone();
        let age = catalog.resolve_column(&users, "age").unwrap();
        assert_eq!(catalog.column_type(&age).unwrap(), DataType::Int32);

        assert!(matches!(
            catalog.resolve_column(&users, "missing"),
            Err(ToyDbError::ColumnNotFound(_))
        ));
        assert!(matches!(
            catalog.resolve_column(&TableId::new(99, "ghost"), "id"),
            Err(ToyDbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_file_paths_resolve_relative_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(write_manifest(&dir, MANIFEST)).unwrap();

        let users = catalog.table_by_name("users").unwrap();
        let path = catalog.resolve_file(&users.files[0]);
        assert_eq!(path, dir.path().join("users.csv"));
    }

    #[test]
    fn test_invalid_manifests() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Catalog::load(dir.path().join("nonexistent.json")),
            Err(ToyDbError::Catalog(_))
        ));
        assert!(matches!(
            Catalog::load(write_manifest(&dir, "{ invalid json }")),
            Err(ToyDbError::Catalog(_))
        ));
        assert!(matches!(
            Catalog::load(write_manifest(&dir, r#"{"other": "data"}"#)),
            Err(ToyDbError::Catalog(_))
        ));

        let bad_type = MANIFEST.replace("INT64", "INT128");
        assert!(matches!(
            Catalog::load(write_manifest(&dir, &bad_type)),
            Err(ToyDbError::Catalog(_))
        ));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, MANIFEST);
        let catalog = Catalog::load(&path).unwrap();

        catalog.save().unwrap();

        let reloaded = Catalog::load(&path).unwrap();
        assert_eq!(reloaded.list_tables().len(), 2);
        let users = reloaded.table_by_name("users").unwrap();
        assert_eq!(users.schema.len(), 5);
        assert!(dir.path().join("tdb_manifest.json.lock").exists());
    }
}
