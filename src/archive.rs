//! Reading package fragment roots packed as jar/zip archives.

use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("cannot open archive {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read zip structure of {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("no entry {entry} in {}", .path.display())]
    MissingEntry { path: PathBuf, entry: String },

    #[error("cannot read entry {entry} of {}: {source}", .path.display())]
    Entry {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ArchiveError> for ModelError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Open { path, source } => ModelError::io(path.display().to_string(), source),
            ArchiveError::Entry { path, entry, source } => {
                ModelError::io(format!("{}!{entry}", path.display()), source)
            }
            other => ModelError::invalid_contents(other.to_string(), "unreadable archive"),
        }
    }
}

/// Packages of an archive with the class files each holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveListing {
    /// Dotted package name to class file names; the default package is `""`.
    pub packages: BTreeMap<String, Vec<String>>,
    pub non_java_resources: usize,
}

fn open(path: &Path) -> Result<(File, Mmap), ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime of the mmap.
    // The mmap is dropped before the file, ensuring memory safety.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((file, mmap))
}

pub fn list(path: &Path) -> Result<ArchiveListing, ArchiveError> {
    let (_file, mmap) = open(path)?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..])).map_err(|source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let mut listing = ArchiveListing::default();
    listing.packages.insert(String::new(), Vec::new());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let name = entry.name().replace('\\', "/");
        let (dir, file_name) = match name.rsplit_once('/') {
            Some((dir, file_name)) => (dir, file_name),
            None => ("", name.as_str()),
        };
        let package = dir.replace('/', ".");
        if file_name.is_empty() || !file_name.ends_with(".class") || !is_package_name(&package) {
            if !file_name.is_empty() {
                listing.non_java_resources += 1;
            } else if is_package_name(&package) {
                add_package(&mut listing.packages, &package);
            }
            continue;
        }
        add_package(&mut listing.packages, &package);
        if let Some(files) = listing.packages.get_mut(&package) {
            files.push(file_name.to_string());
        }
    }
    for files in listing.packages.values_mut() {
        files.sort();
    }
    Ok(listing)
}

fn is_package_name(name: &str) -> bool {
    name.is_empty()
        || name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
}

/// Registers `package` and all its enclosing packages.
fn add_package(packages: &mut BTreeMap<String, Vec<String>>, package: &str) {
    let mut prefix = String::new();
    for segment in package.split('.').filter(|s| !s.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);
        packages.entry(prefix.clone()).or_default();
    }
}

pub fn entry_name(package: &str, file_name: &str) -> String {
    if package.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{file_name}", package.replace('.', "/"))
    }
}

pub fn read_entry(path: &Path, entry: &str) -> Result<Vec<u8>, ArchiveError> {
    let (_file, mmap) = open(path)?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..])).map_err(|source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingEntry {
                path: path.to_path_buf(),
                entry: entry.to_string(),
            });
        }
        Err(source) => {
            return Err(ArchiveError::Zip {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).map_err(|source| ArchiveError::Entry {
        path: path.to_path_buf(),
        entry: entry.to_string(),
        source,
    })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }

        zip.finish()?;
        Ok(())
    }

    #[test]
    fn listing_groups_class_files_by_package() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", b"a"),
                ("org/example/A$Inner.class", b""),
                ("Top.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let listing = list(&jar)?;
        assert_eq!(
            listing.packages.get("org.example"),
            Some(&vec!["A$Inner.class".to_string(), "A.class".to_string()])
        );
        assert!(listing.packages.contains_key("org"));
        assert_eq!(listing.packages.get(""), Some(&vec!["Top.class".to_string()]));
        assert!(!listing.packages.contains_key("META-INF"));
        assert_eq!(listing.non_java_resources, 1);

        assert_eq!(read_entry(&jar, &entry_name("org.example", "A.class"))?, b"a");
        let missing = read_entry(&jar, "org/example/B.class").unwrap_err();
        assert!(matches!(missing, ArchiveError::MissingEntry { .. }));
        Ok(())
    }

    #[test]
    fn unreadable_archive_maps_to_io_status() {
        let err: ModelError = list(Path::new("/nonexistent/lib.jar")).unwrap_err().into();
        assert_eq!(err.status(), crate::error::ModelStatus::IoException);
    }
}
