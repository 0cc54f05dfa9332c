//! Disk manager for page-level file I/O.

use parking_lot::Mutex;
use sigfile_common::config::StorageConfig;
use sigfile_common::page::{FileKind, ItemPage, PageId};
use sigfile_common::{Result, SigFileError};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Directory holding the relation files.
    pub data_dir: PathBuf,
    /// Page size of every paged file.
    pub page_size: usize,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
    /// Upper bound on pages per paged file.
    pub max_pages_per_file: Option<u32>,
}

impl DiskManagerConfig {
    /// Builds a disk configuration from storage settings and a page size.
    pub fn from_storage(storage: &StorageConfig, page_size: usize) -> Self {
        Self {
            data_dir: storage.data_dir.clone(),
            page_size,
            fsync_enabled: storage.fsync_enabled,
            max_pages_per_file: storage.max_pages_per_file,
        }
    }
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self::from_storage(&StorageConfig::default(), sigfile_common::DEFAULT_PAGE_SIZE)
    }
}

/// Manages reading and writing pages of the five files of one relation.
///
/// Files are named `<relation>.<suffix>` inside the data directory and are
/// opened on first use.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// Relation name.
    name: String,
    /// Open file handles keyed by kind.
    files: Mutex<HashMap<FileKind, FileHandle>>,
}

/// Handle for an open relation file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Number of pages in the file (0 for the info file).
    num_pages: u32,
}

impl DiskManager {
    /// Creates a disk manager for relation `name`.
    pub fn new(config: DiskManagerConfig, name: &str) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            name: name.to_string(),
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the path of one of relation `name`'s files.
    pub fn relation_path(data_dir: &Path, name: &str, kind: FileKind) -> PathBuf {
        data_dir.join(format!("{}.{}", name, kind.suffix()))
    }

    /// Returns the path of one of this relation's files.
    pub fn file_path(&self, kind: FileKind) -> PathBuf {
        Self::relation_path(&self.config.data_dir, &self.name, kind)
    }

    /// Opens a file, creating it if missing.
    fn open_file(&self, kind: FileKind, truncate: bool) -> Result<()> {
        let mut files = self.files.lock();

        if !truncate && files.contains_key(&kind) {
            return Ok(());
        }

        let path = self.file_path(kind);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&path)?;

        let num_pages = match kind {
            FileKind::Info => 0,
            _ => (file.metadata()?.len() / self.config.page_size as u64) as u32,
        };

        files.insert(kind, FileHandle { file, num_pages });

        Ok(())
    }

    /// Creates (or empties) all five files of the relation.
    pub fn create_files(&self) -> Result<()> {
        self.open_file(FileKind::Info, true)?;
        for kind in FileKind::PAGED {
            self.open_file(kind, true)?;
        }
        Ok(())
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<ItemPage> {
        self.open_file(page_id.file, false)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&page_id.file)
            .ok_or_else(|| SigFileError::IoError(format!("file {} not open", page_id.file)))?;

        if page_id.page_num >= handle.num_pages {
            return Err(SigFileError::PageNotFound {
                page_id: page_id.to_string(),
            });
        }

        let offset = page_id.page_num as u64 * self.config.page_size as u64;
        handle.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; self.config.page_size];
        handle.file.read_exact(&mut buffer)?;

        Ok(ItemPage::from_bytes(buffer))
    }

    /// Writes an existing page back to disk.
    pub fn write_page(&self, page_id: PageId, page: &ItemPage) -> Result<()> {
        if page.size() != self.config.page_size {
            return Err(SigFileError::Internal(format!(
                "page {} is {} bytes, file pages are {}",
                page_id,
                page.size(),
                self.config.page_size
            )));
        }

        self.open_file(page_id.file, false)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&page_id.file)
            .ok_or_else(|| SigFileError::IoError(format!("file {} not open", page_id.file)))?;

        if page_id.page_num >= handle.num_pages {
            return Err(SigFileError::PageNotFound {
                page_id: page_id.to_string(),
            });
        }

        let offset = page_id.page_num as u64 * self.config.page_size as u64;
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(page.as_bytes())?;

        if self.config.fsync_enabled {
            handle.file.sync_data()?;
        }

        Ok(())
    }

    /// Appends an empty page to a paged file.
    ///
    /// Returns the PageId of the newly allocated page.
    pub fn allocate_page(&self, kind: FileKind) -> Result<PageId> {
        if kind == FileKind::Info {
            return Err(SigFileError::Internal("info file is not paged".to_string()));
        }

        self.open_file(kind, false)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&kind)
            .ok_or_else(|| SigFileError::IoError(format!("file {} not open", kind)))?;

        let page_num = handle.num_pages;
        if let Some(limit) = self.config.max_pages_per_file {
            if page_num >= limit {
                return Err(SigFileError::FilePageLimit {
                    file: format!("{}.{}", self.name, kind.suffix()),
                    limit,
                });
            }
        }

        // Write an empty page to extend the file
        let offset = page_num as u64 * self.config.page_size as u64;
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(ItemPage::new(self.config.page_size).as_bytes())?;

        if self.config.fsync_enabled {
            handle.file.sync_data()?;
        }

        handle.num_pages = page_num + 1;
        debug!(relation = %self.name, file = %kind, page_num, "page allocated");

        Ok(PageId::new(kind, page_num))
    }

    /// Returns the number of pages in a paged file.
    pub fn num_pages(&self, kind: FileKind) -> Result<u32> {
        self.open_file(kind, false)?;

        let files = self.files.lock();
        let handle = files
            .get(&kind)
            .ok_or_else(|| SigFileError::IoError(format!("file {} not open", kind)))?;

        Ok(handle.num_pages)
    }

    /// Overwrites the info record from offset 0.
    pub fn write_info(&self, record: &[u8]) -> Result<()> {
        self.open_file(FileKind::Info, false)?;

        let mut files = self.files.lock();
        let handle = files
            .get_mut(&FileKind::Info)
            .ok_or_else(|| SigFileError::IoError("info file not open".to_string()))?;

        handle.file.seek(SeekFrom::Start(0))?;
        handle.file.write_all(record)?;
        handle.file.set_len(record.len() as u64)?;
        handle.file.sync_all()?;
        Ok(())
    }

    /// Closes all open files.
    pub fn close_all(&self) -> Result<()> {
        let mut files = self.files.lock();
        for (_, handle) in files.drain() {
            handle.file.sync_all()?;
        }
        Ok(())
    }

    /// Closes and deletes all five files of the relation.
    pub fn delete_files(&self) -> Result<()> {
        self.close_all()?;
        for kind in [FileKind::Info].into_iter().chain(FileKind::PAGED) {
            let path = self.file_path(kind);
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.close_all();
    }
}
