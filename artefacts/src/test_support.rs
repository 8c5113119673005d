//! Fixture bundles for tests.
//!
//! [`BundleBuilder`] writes a real `.tar.xz` release bundle whose members are
//! nested runner `.tar` archives laid out exactly as in a GenVM release.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::resolver::STD_RUNNER;
use crate::runner_ref::member_path;

struct Member {
    path: String,
    files: Vec<(String, Vec<u8>)>,
    raw: bool,
}

/// Builds release bundles for tests.
///
/// # Examples
///
/// ```
/// use genvm_artefacts::test_support::BundleBuilder;
///
/// # fn demo() -> std::io::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let bundle = BundleBuilder::new()
///     .core_runner("abc123", "std001")
///     .component("py-lib-genlayer-std", "std001", &[("src/genlayer/__init__.py", "")])
///     .write_to(dir.path().join("genvm-universal-v0.1.0.tar.xz"))?;
/// assert!(bundle.is_file());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct BundleBuilder {
    members: Vec<Member>,
    dot_prefix: bool,
}

impl BundleBuilder {
    /// Starts an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes outer member names with a leading `./`.
    #[must_use]
    pub fn dot_prefixed(mut self) -> Self {
        self.dot_prefix = true;
        self
    }

    /// Adds a runner component containing `files` as `(path, content)` pairs.
    #[must_use]
    pub fn component(self, runner_type: &str, hash: &str, files: &[(&str, &str)]) -> Self {
        self.push(runner_type, hash, files, false)
    }

    /// Adds a runner component whose entry names are written unvalidated,
    /// allowing hostile paths such as `../evil.py`.
    #[must_use]
    pub fn raw_component(self, runner_type: &str, hash: &str, files: &[(&str, &str)]) -> Self {
        self.push(runner_type, hash, files, true)
    }

    /// Adds a `py-genlayer` runner whose manifest pins the standard library
    /// at `std_hash`.
    #[must_use]
    pub fn core_runner(self, hash: &str, std_hash: &str) -> Self {
        let manifest = format!(r#"{{"Seq":[{{"Depends":"{STD_RUNNER}:{std_hash}"}}]}}"#);
        self.component("py-genlayer", hash, &[("runner.json", manifest.as_str())])
    }

    fn push(mut self, runner_type: &str, hash: &str, files: &[(&str, &str)], raw: bool) -> Self {
        self.members.push(Member {
            path: member_path(runner_type, hash),
            files: files
                .iter()
                .map(|(name, content)| ((*name).to_owned(), content.as_bytes().to_vec()))
                .collect(),
            raw,
        });
        self
    }

    /// Writes the bundle to `path` and returns it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any archive layer cannot be written.
    pub fn write_to(self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoder = xz2::write::XzEncoder::new(File::create(&path)?, 6);
        let mut outer = tar::Builder::new(encoder);
        for member in &self.members {
            let inner = inner_archive(member)?;
            let name = if self.dot_prefix {
                format!("./{}", member.path)
            } else {
                member.path.clone()
            };
            let mut header = file_header(inner.len());
            outer.append_data(&mut header, name, inner.as_slice())?;
        }
        outer.into_inner()?.finish()?;
        Ok(path)
    }
}

fn inner_archive(member: &Member) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in &member.files {
        let mut header = file_header(content.len());
        if member.raw {
            set_raw_name(&mut header, name)?;
            header.set_cksum();
            builder.append(&header, content.as_slice())?;
        } else {
            builder.append_data(&mut header, name, content.as_slice())?;
        }
    }
    builder.into_inner()
}

fn file_header(len: usize) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(len as u64);
    header.set_mode(0o644);
    header
}

fn set_raw_name(header: &mut tar::Header, name: &str) -> io::Result<()> {
    let field = &mut header.as_old_mut().name;
    let bytes = name.as_bytes();
    let slot = field.get_mut(..bytes.len()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("entry name too long: {name}"))
    })?;
    slot.copy_from_slice(bytes);
    Ok(())
}
