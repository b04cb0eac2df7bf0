//! External collaborator traits and their local implementations.
//!
//! The host system owns file storage, record persistence and the category
//! directory; the pipeline consumes them through these traits. Filesystem
//! and JSON-file implementations are provided for standalone operation, and
//! in-memory implementations (see [`memory`]) back the test suites.
//!
//! Paths handed to [`FileStore`] are opaque `folder/name` strings - the
//! store decides what they mean. The artifact namespace is append/rename
//! only: the sweep moves processed artifacts out of scan scope instead of
//! mutating them.

use receipts_core::{Category, ExpenseRecord, ReceiptError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File storage the pipeline reads receipts from and the analysis service
/// writes artifacts into.
pub trait FileStore: Send + Sync {
    /// Read a file's bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Write a file, creating parent folders as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Move a file. Used to archive processed artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or the move fails.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete(&self, path: &str) -> Result<()>;

    /// File names directly inside a folder. A missing folder is an empty
    /// listing, not an error - the artifact namespace appears lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder exists but cannot be read.
    fn list(&self, folder: &str) -> Result<Vec<String>>;

    /// Whether a file exists.
    fn exists(&self, path: &str) -> bool;

    /// Create a folder (and parents) if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    fn create_folder(&self, folder: &str) -> Result<()>;
}

/// Persistence for [`ExpenseRecord`]s, keyed by `file_id`.
pub trait RecordStore: Send + Sync {
    /// Fetch the record for a file, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Persistence`] if the store cannot be read.
    fn get(&self, file_id: &str) -> Result<Option<ExpenseRecord>>;

    /// Insert or replace the record for `record.file_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Persistence`] if the write fails.
    fn upsert(&self, record: &ExpenseRecord) -> Result<()>;

    /// All records created by one user.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Persistence`] if the store cannot be read.
    fn list_by_user(&self, user_id: &str) -> Result<Vec<ExpenseRecord>>;

    /// All records still waiting on their analysis artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Persistence`] if the store cannot be read.
    fn list_in_flight(&self) -> Result<Vec<ExpenseRecord>>;
}

/// Read-only expense category directory.
///
/// Queried fresh for every extraction so live category changes take effect
/// immediately; implementations must not cache on the pipeline's behalf.
pub trait CategoryDirectory: Send + Sync {
    /// Current category list.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn list(&self) -> Result<Vec<Category>>;
}

/// [`FileStore`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    /// Create a store rooted at `root`.
    #[must_use = "creates the filesystem file store"]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileStore for FsFileStore {
    fn load(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.resolve(path))?)
    }

    fn save(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::write(full, bytes)?)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(fs::rename(self.resolve(from), target)?)
    }

    fn delete(&self, path: &str) -> Result<()> {
        Ok(fs::remove_file(self.resolve(path))?)
    }

    fn list(&self, folder: &str) -> Result<Vec<String>> {
        let dir = self.resolve(folder);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn create_folder(&self, folder: &str) -> Result<()> {
        Ok(fs::create_dir_all(self.resolve(folder))?)
    }
}

/// [`RecordStore`] keeping one JSON document per record.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    /// Create a store writing into `dir`, created lazily.
    #[must_use = "creates the JSON record store"]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, file_id: &str) -> PathBuf {
        // File IDs are opaque and may contain separators; flatten them.
        let safe: String = file_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn read_record(path: &Path) -> Result<ExpenseRecord> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ReceiptError::Persistence(format!("corrupt record {}: {e}", path.display())))
    }

    fn read_all(&self) -> Result<Vec<ExpenseRecord>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                records.push(Self::read_record(&path)?);
            }
        }
        Ok(records)
    }
}

impl RecordStore for JsonRecordStore {
    fn get(&self, file_id: &str) -> Result<Option<ExpenseRecord>> {
        let path = self.record_path(file_id);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::read_record(&path)?))
    }

    fn upsert(&self, record: &ExpenseRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(self.record_path(&record.file_id), json)
            .map_err(|e| ReceiptError::Persistence(format!("record write failed: {e}")))
    }

    fn list_by_user(&self, user_id: &str) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    fn list_in_flight(&self) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .collect())
    }
}

/// [`CategoryDirectory`] read from a JSON file on every call, honoring live
/// edits to the category list.
#[derive(Debug, Clone)]
pub struct JsonCategoryDirectory {
    path: PathBuf,
}

impl JsonCategoryDirectory {
    /// Create a directory backed by a JSON array of categories at `path`.
    #[must_use = "creates the JSON category directory"]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CategoryDirectory for JsonCategoryDirectory {
    fn list(&self) -> Result<Vec<Category>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ReceiptError::Persistence(format!("corrupt category list: {e}")))
    }
}

/// In-memory implementations backing tests and local dry runs.
pub mod memory {
    use super::{CategoryDirectory, FileStore, RecordStore};
    use receipts_core::{Category, ExpenseRecord, ReceiptError, Result};
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    /// [`FileStore`] over a `HashMap`, with `folder/name` path semantics.
    #[derive(Debug, Default)]
    pub struct MemoryFileStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryFileStore {
        /// Create an empty store.
        #[must_use = "creates the in-memory file store"]
        pub fn new() -> Self {
            Self::default()
        }

        fn missing(path: &str) -> ReceiptError {
            ReceiptError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {path}"),
            ))
        }
    }

    impl FileStore for MemoryFileStore {
        fn load(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .expect("file store lock")
                .get(path)
                .cloned()
                .ok_or_else(|| Self::missing(path))
        }

        fn save(&self, path: &str, bytes: &[u8]) -> Result<()> {
            self.files
                .lock()
                .expect("file store lock")
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        fn rename(&self, from: &str, to: &str) -> Result<()> {
            let mut files = self.files.lock().expect("file store lock");
            let bytes = files.remove(from).ok_or_else(|| Self::missing(from))?;
            files.insert(to.to_string(), bytes);
            Ok(())
        }

        fn delete(&self, path: &str) -> Result<()> {
            self.files
                .lock()
                .expect("file store lock")
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| Self::missing(path))
        }

        fn list(&self, folder: &str) -> Result<Vec<String>> {
            let prefix = format!("{}/", folder.trim_end_matches('/'));
            let files = self.files.lock().expect("file store lock");
            let mut names: Vec<String> = files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(ToString::to_string)
                .collect();
            names.sort();
            Ok(names)
        }

        fn exists(&self, path: &str) -> bool {
            self.files.lock().expect("file store lock").contains_key(path)
        }

        fn create_folder(&self, _folder: &str) -> Result<()> {
            Ok(())
        }
    }

    /// [`RecordStore`] over a `HashMap` keyed by `file_id`.
    #[derive(Debug, Default)]
    pub struct MemoryRecordStore {
        records: Mutex<HashMap<String, ExpenseRecord>>,
    }

    impl MemoryRecordStore {
        /// Create an empty store.
        #[must_use = "creates the in-memory record store"]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of records held. Lets tests assert the idempotency
        /// invariant directly.
        #[must_use = "returns the record count"]
        pub fn len(&self) -> usize {
            self.records.lock().expect("record store lock").len()
        }

        /// Whether the store is empty.
        #[must_use = "returns whether the store is empty"]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl RecordStore for MemoryRecordStore {
        fn get(&self, file_id: &str) -> Result<Option<ExpenseRecord>> {
            Ok(self
                .records
                .lock()
                .expect("record store lock")
                .get(file_id)
                .cloned())
        }

        fn upsert(&self, record: &ExpenseRecord) -> Result<()> {
            self.records
                .lock()
                .expect("record store lock")
                .insert(record.file_id.clone(), record.clone());
            Ok(())
        }

        fn list_by_user(&self, user_id: &str) -> Result<Vec<ExpenseRecord>> {
            Ok(self
                .records
                .lock()
                .expect("record store lock")
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect())
        }

        fn list_in_flight(&self) -> Result<Vec<ExpenseRecord>> {
            Ok(self
                .records
                .lock()
                .expect("record store lock")
                .values()
                .filter(|r| !r.status.is_terminal())
                .cloned()
                .collect())
        }
    }

    /// [`CategoryDirectory`] over a fixed list.
    #[derive(Debug, Default)]
    pub struct StaticCategoryDirectory {
        categories: Vec<Category>,
    }

    impl StaticCategoryDirectory {
        /// Create a directory serving `categories`.
        #[must_use = "creates the static category directory"]
        pub fn new(categories: Vec<Category>) -> Self {
            Self { categories }
        }
    }

    impl CategoryDirectory for StaticCategoryDirectory {
        fn list(&self) -> Result<Vec<Category>> {
            Ok(self.categories.clone())
        }
    }
}
