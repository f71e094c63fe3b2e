//! Directory walks for folder roots and for bulk indexing.

use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Every file under `base_path` with the given extension, found by a
/// parallel walk.
pub fn find_files(base_path: &Path, extension: &str) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == extension) {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut files: Vec<PathBuf> = rx.iter().collect();
    files.sort();
    files
}

/// Dotted names of the packages under a source folder. The default package
/// `""` is always present; directories whose names are not identifiers are
/// left out together with everything below them.
pub fn package_names(root: &Path) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    names.insert(String::new());

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_some_and(|t| t.is_dir())
                || entry.file_name().to_str().is_some_and(is_identifier)
        })
        .build();

    for entry in walker.flatten() {
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        names.insert(name.join("."));
    }
    names
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageEntries {
    pub compilation_units: Vec<String>,
    pub class_files: Vec<String>,
    pub non_java_resources: usize,
}

/// Files directly inside a package directory.
pub fn package_entries(dir: &Path) -> PackageEntries {
    let mut entries = PackageEntries::default();
    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .max_depth(Some(1))
        .build();

    for entry in walker.flatten() {
        if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            entries.non_java_resources += 1;
            continue;
        };
        if name.ends_with(".java") {
            entries.compilation_units.push(name.to_string());
        } else if name.ends_with(".class") {
            entries.class_files.push(name.to_string());
        } else {
            entries.non_java_resources += 1;
        }
    }
    entries.compilation_units.sort();
    entries.class_files.sort();
    entries
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    #[test]
    fn packages_and_entries_of_a_source_folder() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path();
        fs::create_dir_all(src.join("org/example"))?;
        fs::create_dir_all(src.join("META-INF"))?;
        fs::write(src.join("org/example/A.java"), "class A {}")?;
        fs::write(src.join("org/example/B.java"), "class B {}")?;
        fs::write(src.join("org/example/notes.txt"), "")?;
        fs::write(src.join("Top.java"), "class Top {}")?;

        let names = package_names(src);
        assert!(names.contains(""));
        assert!(names.contains("org"));
        assert!(names.contains("org.example"));
        assert!(!names.contains("META-INF"));

        let entries = package_entries(&src.join("org/example"));
        assert_eq!(entries.compilation_units, vec!["A.java", "B.java"]);
        assert_eq!(entries.non_java_resources, 1);

        let found = find_files(src, "java");
        assert_eq!(found.len(), 3);
        Ok(())
    }
}
