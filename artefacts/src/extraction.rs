//! Nested archive extraction for release bundles.
//!
//! A bundle is a `.tar.xz` whose members are themselves uncompressed `.tar`
//! archives, one per runner component. Extraction streams the outer archive
//! until the requested member is found and unpacks that member directly,
//! without spilling the inner archive to disk.

use log::trace;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Reads members out of release bundles.
#[cfg_attr(test, mockall::automock)]
pub trait BundleReader {
    /// Unpacks the inner archive stored at `member` into `dest_dir`.
    ///
    /// Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::MissingMember`] if the bundle has no such
    /// member, [`ExtractionError::PathTraversal`] if an inner entry would
    /// escape `dest_dir`, and [`ExtractionError::Io`] on I/O failures.
    fn extract_member(
        &self,
        bundle: &Path,
        member: &str,
        dest_dir: &Path,
    ) -> Result<usize, ExtractionError>;

    /// Lists bundle members whose normalised path starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Io`] if the bundle cannot be read.
    fn list_members(&self, bundle: &Path, prefix: &str) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The bundle does not contain the requested member.
    #[error("{member} not found in {}", bundle.display())]
    MissingMember {
        /// The bundle that was searched.
        bundle: PathBuf,
        /// The member that was requested.
        member: String,
    },

    /// The inner archive contains no entries.
    #[error("component archive {member} is empty")]
    EmptyArchive {
        /// The empty member.
        member: String,
    },
}

/// Default reader using `tar` over an `xz2` decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct XzBundleReader;

impl XzBundleReader {
    fn open(bundle: &Path) -> Result<tar::Archive<xz2::read::XzDecoder<File>>, ExtractionError> {
        let file = File::open(bundle)?;
        Ok(tar::Archive::new(xz2::read::XzDecoder::new(file)))
    }
}

impl BundleReader for XzBundleReader {
    fn extract_member(
        &self,
        bundle: &Path,
        member: &str,
        dest_dir: &Path,
    ) -> Result<usize, ExtractionError> {
        let wanted = normalise_member(member);
        let mut archive = Self::open(bundle)?;
        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let name = normalise_member(&entry.path()?.to_string_lossy()).to_owned();
            if name != wanted {
                continue;
            }
            trace!("unpacking {name} into {}", dest_dir.display());
            let count = unpack_inner(&mut entry, dest_dir)?;
            if count == 0 {
                return Err(ExtractionError::EmptyArchive { member: name });
            }
            return Ok(count);
        }
        Err(ExtractionError::MissingMember {
            bundle: bundle.to_path_buf(),
            member: wanted.to_owned(),
        })
    }

    fn list_members(&self, bundle: &Path, prefix: &str) -> Result<Vec<String>, ExtractionError> {
        let mut archive = Self::open(bundle)?;
        let mut members = Vec::new();
        for entry_result in archive.entries()? {
            let entry = entry_result?;
            let path = entry.path()?;
            let name = normalise_member(&path.to_string_lossy()).to_owned();
            if name.starts_with(prefix) {
                members.push(name);
            }
        }
        Ok(members)
    }
}

/// Unpacks every entry of the inner tar read from `reader` into `dest_dir`.
fn unpack_inner(reader: &mut dyn Read, dest_dir: &Path) -> Result<usize, ExtractionError> {
    std::fs::create_dir_all(dest_dir)?;
    let mut inner = tar::Archive::new(reader);
    let mut count = 0;
    for entry_result in inner.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;
        if let Some(target) = entry.link_name()? {
            validate_entry_path(&target)?;
        }
        count += 1;
        if entry_path
            .components()
            .all(|component| matches!(component, Component::CurDir))
        {
            continue;
        }

        // Hard-link targets resolve against `dest_dir`, not the working directory.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractionError::PathTraversal {
                path: entry_path.display().to_string(),
            });
        }
    }
    Ok(count)
}

/// Strips any leading `./` so members match regardless of how the bundle
/// was packed.
fn normalise_member(name: &str) -> &str {
    let mut name = name;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir | Component::Prefix(_)) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BundleBuilder;
    use rstest::rstest;

    const MEMBER: &str = "runners/py-genlayer/ab/c123.tar";

    #[test]
    fn extracts_nested_member() {
        let temp = tempfile::tempdir().expect("temp dir");
        let bundle = BundleBuilder::new()
            .component("py-genlayer", "abc123", &[("src/genlayer/__init__.py", "x = 1\n")])
            .component("py-genlayer", "zz9999", &[("other.py", "")])
            .write_to(temp.path().join("bundle.tar.xz"))
            .expect("write bundle");
        let dest = temp.path().join("out");

        let count = XzBundleReader
            .extract_member(&bundle, MEMBER, &dest)
            .expect("extract");

        assert!(count >= 1);
        let content =
            std::fs::read_to_string(dest.join("src/genlayer/__init__.py")).expect("read file");
        assert_eq!(content, "x = 1\n");
        assert!(!dest.join("other.py").exists());
    }

    #[test]
    fn matches_members_packed_with_dot_prefix() {
        let temp = tempfile::tempdir().expect("temp dir");
        let bundle = BundleBuilder::new()
            .dot_prefixed()
            .component("py-genlayer", "abc123", &[("a.py", "")])
            .write_to(temp.path().join("bundle.tar.xz"))
            .expect("write bundle");

        let members = XzBundleReader
            .list_members(&bundle, "runners/py-genlayer/")
            .expect("list");

        assert_eq!(members, vec![MEMBER.to_owned()]);
        XzBundleReader
            .extract_member(&bundle, MEMBER, &temp.path().join("out"))
            .expect("extract dot-prefixed member");
    }

    #[test]
    fn missing_member_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        let bundle = BundleBuilder::new()
            .component("py-genlayer", "abc123", &[("a.py", "")])
            .write_to(temp.path().join("bundle.tar.xz"))
            .expect("write bundle");

        let result = XzBundleReader.extract_member(
            &bundle,
            "runners/py-genlayer/zz/9999.tar",
            &temp.path().join("out"),
        );

        assert!(matches!(result, Err(ExtractionError::MissingMember { .. })));
    }

    #[test]
    fn rejects_traversal_inside_component() {
        let temp = tempfile::tempdir().expect("temp dir");
        let bundle = BundleBuilder::new()
            .raw_component("py-genlayer", "abc123", &[("../evil.py", "boom")])
            .write_to(temp.path().join("bundle.tar.xz"))
            .expect("write bundle");
        let dest = temp.path().join("out");

        let result = XzBundleReader.extract_member(&bundle, MEMBER, &dest);

        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
        assert!(!temp.path().join("evil.py").exists());
    }

    #[test]
    fn hard_links_resolve_inside_the_destination() {
        let mut inner = tar::Builder::new(Vec::new());
        let body = b"shared = True\n";
        let mut file = tar::Header::new_gnu();
        file.set_size(body.len() as u64);
        file.set_mode(0o644);
        inner
            .append_data(&mut file, "pkg/a.py", &body[..])
            .expect("append file");
        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Link);
        link.set_size(0);
        link.set_mode(0o644);
        inner
            .append_link(&mut link, "pkg/b.py", "pkg/a.py")
            .expect("append link");
        let bytes = inner.into_inner().expect("finish inner tar");
        let temp = tempfile::tempdir().expect("temp dir");
        let dest = temp.path().join("out");
        std::fs::create_dir_all(&dest).expect("create dest");

        let count = unpack_inner(&mut bytes.as_slice(), &dest).expect("unpack");

        assert_eq!(count, 2);
        let linked = std::fs::read(dest.join("pkg/b.py")).expect("read linked file");
        assert_eq!(linked, body);
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(Path::new(bad_path));
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[rstest]
    #[case::plain("src/genlayer/__init__.py")]
    #[case::current_dir("./src/a.py")]
    fn accepts_normal_paths(#[case] path: &str) {
        assert!(validate_entry_path(Path::new(path)).is_ok());
    }

    #[rstest]
    #[case::plain("runners/a.tar", "runners/a.tar")]
    #[case::dotted("./runners/a.tar", "runners/a.tar")]
    #[case::doubled("././runners/a.tar", "runners/a.tar")]
    fn normalises_member_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalise_member(raw), expected);
    }
}
