//! DOCX package access.
//!
//! A `DocxPackage` holds every archive entry in memory, in archive order.
//! Reading never keeps the archive open; writing produces a fresh archive
//! and publishes it atomically.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxError, Result};
use crate::rels::{self, Relationships};

/// Conventional location of the main document part.
pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Content-types part name.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const ROOT_RELS_PART: &str = "_rels/.rels";

/// One archive entry.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// An in-memory DOCX package.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<Entry>,
    main_part: String,
}

impl DocxPackage {
    /// Open a package from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let package = Self::from_reader(file)?;
        info!(
            "Opened package {} ({} parts)",
            path.display(),
            package.entries.len()
        );
        Ok(package)
    }

    /// Read a package from raw archive bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Read a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
            file.read_to_end(&mut data)?;
            entries.push(Entry {
                name: file.name().to_string(),
                data,
                is_dir: file.is_dir(),
            });
        }
        Self::from_entries(entries)
    }

    /// Build a package from `(name, bytes)` parts.
    pub fn from_parts<N, D>(parts: impl IntoIterator<Item = (N, D)>) -> Result<Self>
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let entries = parts
            .into_iter()
            .map(|(name, data)| Entry {
                name: name.into(),
                data: data.into(),
                is_dir: false,
            })
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut package = Self {
            entries,
            main_part: DEFAULT_MAIN_PART.to_string(),
        };
        package.main_part = package.locate_main_part()?;
        debug!("Main document part: {}", package.main_part);
        Ok(package)
    }

    /// Find the main part through the package relationships, falling back
    /// to the conventional name.
    fn locate_main_part(&self) -> Result<String> {
        let from_rels = match self.part(ROOT_RELS_PART) {
            Some(bytes) => Relationships::parse(ROOT_RELS_PART, bytes)?
                .find(rels::REL_OFFICE_DOCUMENT)
                .map(|rel| rels::resolve_target("", &rel.target))
                .filter(|name| self.part(name).is_some()),
            None => None,
        };
        match from_rels {
            Some(name) => Ok(name),
            None if self.part(DEFAULT_MAIN_PART).is_some() => Ok(DEFAULT_MAIN_PART.to_string()),
            None => Err(DocxError::MissingPart(DEFAULT_MAIN_PART.to_string())),
        }
    }

    /// Name of the main document part.
    pub fn main_part_name(&self) -> &str {
        &self.main_part
    }

    /// Bytes of the main document part.
    pub fn main_part(&self) -> Result<&[u8]> {
        self.part(&self.main_part)
            .ok_or_else(|| DocxError::MissingPart(self.main_part.clone()))
    }

    /// Bytes of a part, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.trim_start_matches('/');
        self.entries
            .iter()
            .find(|entry| !entry.is_dir && entry.name == name)
            .map(|entry| entry.data.as_slice())
    }

    /// Replace a part, or append it when it does not exist yet.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        let name = name.trim_start_matches('/');
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
                is_dir: false,
            }),
        }
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name.as_str())
    }

    /// Relationships of the main part (empty if it has none).
    pub fn main_relationships(&self) -> Result<Relationships> {
        let name = rels::rels_part_for(&self.main_part);
        match self.part(&name) {
            Some(bytes) => Relationships::parse(&name, bytes),
            None => Ok(Relationships::new()),
        }
    }

    /// Resolve a part related to the main part, falling back to a
    /// conventional name next to it.
    pub fn related_part_name(&self, rel_type: &str, fallback: &str) -> Result<Option<String>> {
        let related = self
            .main_relationships()?
            .find(rel_type)
            .map(|rel| rels::resolve_target(&self.main_part, &rel.target));
        let fallback = rels::resolve_target(&self.main_part, fallback);
        Ok(related
            .into_iter()
            .chain(std::iter::once(fallback))
            .find(|name| self.part(name).is_some()))
    }

    /// Location of the comments part, if the package has one.
    pub fn comments_part_name(&self) -> Result<Option<String>> {
        self.related_part_name(rels::REL_COMMENTS, "comments.xml")
    }

    /// Location of the numbering part, if the package has one.
    pub fn numbering_part_name(&self) -> Result<Option<String>> {
        self.related_part_name(rels::REL_NUMBERING, "numbering.xml")
    }

    /// Serialize the package to archive bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.clone(), options)?;
            } else {
                writer.start_file(entry.name.clone(), options)?;
                writer.write_all(&entry.data)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Write the package to `path`.
    ///
    /// The archive is written to a temporary file in the destination
    /// directory and renamed into place once complete; on any failure the
    /// temporary file is removed and `path` is left untouched.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        info!("Saved package to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
