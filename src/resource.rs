//! Resource resolution and installation.
//!
//! Processing steps name auxiliary resources — models, dictionaries — by
//! bare name in their parameters. Resolution turns such a name into an
//! absolute path through an ordered, short-circuiting candidate search:
//!
//! 1. the name itself, if it already points at an existing path
//! 2. the caller's working directory
//! 3. the step's bundled module resource directory, if it has one
//! 4. the user-level data directory
//!    (`$XDG_DATA_HOME/pageflow-resources/<step>/`)
//! 5. the system-level directories
//!    (`/usr/local/share/pageflow-resources/<step>/`, `/usr/share/...`)
//!
//! The candidate list is produced lazily and the first existing entry
//! wins. An unresolvable name fails with a [`ResourceError::NotFound`]
//! that carries both the resource and the requesting step, so callers can
//! print an actionable hint.
//!
//! ## Installation
//!
//! [`install_resource`] materializes a resource from a local source into a
//! data directory. Three kinds: plain file, directory (copied
//! recursively), and archive (extracted to a temp dir, then the configured
//! inner path is promoted to the final location). Network download is a
//! collaborator's job, not this module's.

use flate2::read::GzDecoder;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xz2::read::XzDecoder;

/// Subdirectory name for resource storage under data directories.
const RESOURCE_DIR: &str = "pageflow-resources";

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(
        "could not resolve '{resource}' for step '{step}' — install it with \
         'pageflow resource install'"
    )]
    NotFound { resource: String, step: String },
    #[error("unable to handle extraction of archive {0}")]
    UnknownArchiveKind(PathBuf),
    #[error("source is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("path '{0}' not found in archive")]
    MissingInArchive(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The step-specific resource directories, preference order. Entries may
/// not exist; callers filter.
fn data_dirs(step: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let user = env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")));
    if let Some(user) = user {
        dirs.push(user.join(RESOURCE_DIR).join(step));
    }
    dirs.push(PathBuf::from("/usr/local/share").join(RESOURCE_DIR).join(step));
    dirs.push(PathBuf::from("/usr/share").join(RESOURCE_DIR).join(step));
    dirs
}

/// Candidate locations for `name`, lazily produced in search order.
pub fn resource_candidates(
    name: &str,
    step: &str,
    cwd: &Path,
    module_dir: Option<&Path>,
) -> impl Iterator<Item = PathBuf> {
    let cwd = cwd.join(name);
    let module = module_dir.map(|d| d.join(name));
    let data: Vec<PathBuf> = data_dirs(step).into_iter().map(|d| d.join(name)).collect();
    std::iter::once(cwd).chain(module).chain(data)
}

/// Resolve a resource name to an absolute location, or fail with a
/// distinguished not-found condition naming resource and step.
pub fn resolve_resource(
    name: &str,
    step: &str,
    cwd: &Path,
    module_dir: Option<&Path>,
) -> Result<PathBuf, ResourceError> {
    let direct = Path::new(name);
    if direct.exists() {
        debug!(resource = name, "resolved as literal path");
        return Ok(direct.to_path_buf());
    }
    if let Some(found) = resource_candidates(name, step, cwd, module_dir).find(|c| c.exists()) {
        debug!(resource = name, path = %found.display(), "resolved resource");
        return Ok(found);
    }
    Err(ResourceError::NotFound {
        resource: name.to_string(),
        step: step.to_string(),
    })
}

/// All resources installed for `step` across the module and data
/// directories, sorted by file name.
pub fn list_resources(step: &str, module_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let dirs = module_dir
        .map(Path::to_path_buf)
        .into_iter()
        .chain(data_dirs(step));
    for dir in dirs {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            out.push(entry.path());
        }
    }
    out.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    out
}

/// How a resource source should be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceKind {
    #[default]
    File,
    Directory,
    Archive,
}

/// Knobs for [`install_resource`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub kind: ResourceKind,
    /// Installed name. Absent means the source's file name.
    pub name: Option<String>,
    /// Replace an existing target instead of keeping it.
    pub overwrite: bool,
    /// For archives: the path inside the archive that becomes the
    /// resource. `.` promotes the whole extracted tree.
    pub path_in_archive: PathBuf,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            kind: ResourceKind::File,
            name: None,
            overwrite: false,
            path_in_archive: PathBuf::from("."),
        }
    }
}

/// Materialize a resource from a local `source` into
/// `<basedir>/<step>/<name>` and return the installed path.
pub fn install_resource(
    source: &Path,
    basedir: &Path,
    step: &str,
    opts: &InstallOptions,
) -> Result<PathBuf, ResourceError> {
    let name = match &opts.name {
        Some(name) => name.clone(),
        None => source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resource".to_string()),
    };
    let destdir = basedir.join(step);
    let target = destdir.join(&name);

    if target.exists() {
        if !opts.overwrite {
            warn!(
                target = %target.display(),
                "target already exists and overwrite is not set, skipping installation"
            );
            return Ok(target);
        }
        info!(target = %target.display(), "removing existing target");
        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else {
            fs::remove_file(&target)?;
        }
    }
    fs::create_dir_all(&destdir)?;

    match opts.kind {
        ResourceKind::File => {
            info!(source = %source.display(), target = %target.display(), "copying file");
            fs::copy(source, &target)?;
        }
        ResourceKind::Directory => {
            info!(source = %source.display(), target = %target.display(), "copying directory");
            copy_dir(source, &target)?;
        }
        ResourceKind::Archive => {
            let extracted = tempfile::tempdir()?;
            extract_archive(source, extracted.path())?;
            promote(extracted.path(), &opts.path_in_archive, &target)?;
        }
    }
    Ok(target)
}

/// Extract `source` into `dest`, detecting the archive kind from the file
/// name. Anything but zip, gzip-tar or xz-tar is a hard failure.
fn extract_archive(source: &Path, dest: &Path) -> Result<(), ResourceError> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    info!(source = %source.display(), "extracting archive");
    if name.ends_with(".zip") {
        let mut archive = zip::ZipArchive::new(File::open(source)?)?;
        archive.extract(dest)?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        tar::Archive::new(GzDecoder::new(File::open(source)?)).unpack(dest)?;
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        tar::Archive::new(XzDecoder::new(File::open(source)?)).unpack(dest)?;
    } else {
        return Err(ResourceError::UnknownArchiveKind(source.to_path_buf()));
    }
    Ok(())
}

/// Move the configured inner path of an extracted archive to `target`.
fn promote(extracted: &Path, inner: &Path, target: &Path) -> Result<(), ResourceError> {
    let source = extracted.join(inner);
    if !source.exists() {
        return Err(ResourceError::MissingInArchive(inner.to_path_buf()));
    }
    if source.is_dir() {
        copy_dir(&source, target)?;
    } else {
        fs::copy(&source, target)?;
    }
    Ok(())
}

/// Recursive directory copy preserving the tree shape.
fn copy_dir(source: &Path, target: &Path) -> Result<(), ResourceError> {
    if !source.is_dir() {
        return Err(ResourceError::NotADirectory(source.to_path_buf()));
    }
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .expect("walkdir stays under its root");
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn literal_existing_path_resolves_to_itself() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("model.bin");
        fs::write(&model, b"weights").unwrap();

        let resolved = resolve_resource(
            model.to_str().unwrap(),
            "pageflow-ocr",
            tmp.path(),
            None,
        )
        .unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn cwd_candidate_wins_over_module_dir() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path().join("cwd");
        let module = tmp.path().join("module");
        fs::create_dir_all(&cwd).unwrap();
        fs::create_dir_all(&module).unwrap();
        fs::write(cwd.join("model.bin"), b"cwd").unwrap();
        fs::write(module.join("model.bin"), b"module").unwrap();

        let resolved =
            resolve_resource("model.bin", "pageflow-ocr", &cwd, Some(&module)).unwrap();
        assert_eq!(resolved, cwd.join("model.bin"));
    }

    #[test]
    fn module_dir_is_searched_after_cwd() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("module");
        fs::create_dir_all(&module).unwrap();
        fs::write(module.join("dict.txt"), b"words").unwrap();

        let resolved =
            resolve_resource("dict.txt", "pageflow-ocr", tmp.path(), Some(&module)).unwrap();
        assert_eq!(resolved, module.join("dict.txt"));
    }

    #[test]
    fn unresolved_name_carries_resource_and_step() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_resource("missing.bin", "pageflow-ocr", tmp.path(), None).unwrap_err();
        match err {
            ResourceError::NotFound { resource, step } => {
                assert_eq!(resource, "missing.bin");
                assert_eq!(step, "pageflow-ocr");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn candidates_are_in_search_order() {
        let cwd = Path::new("/work");
        let module = Path::new("/opt/module");
        let candidates: Vec<_> =
            resource_candidates("m.bin", "step", cwd, Some(module)).collect();
        assert_eq!(candidates[0], Path::new("/work/m.bin"));
        assert_eq!(candidates[1], Path::new("/opt/module/m.bin"));
        assert!(candidates.len() >= 4);
    }

    // =========================================================================
    // Installation: file and directory
    // =========================================================================

    #[test]
    fn install_plain_file() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.bin");
        fs::write(&source, b"weights").unwrap();
        let base = tmp.path().join("data");

        let installed =
            install_resource(&source, &base, "pageflow-ocr", &InstallOptions::default()).unwrap();
        assert_eq!(installed, base.join("pageflow-ocr/model.bin"));
        assert_eq!(fs::read(&installed).unwrap(), b"weights");
    }

    #[test]
    fn install_with_explicit_name() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("v3-final.bin");
        fs::write(&source, b"weights").unwrap();

        let installed = install_resource(
            &source,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                name: Some("default.bin".into()),
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert!(installed.ends_with("step/default.bin"));
    }

    #[test]
    fn existing_target_without_overwrite_is_kept() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.bin");
        fs::write(&source, b"new").unwrap();
        let base = tmp.path().join("data");
        fs::create_dir_all(base.join("step")).unwrap();
        fs::write(base.join("step/model.bin"), b"old").unwrap();

        let installed =
            install_resource(&source, &base, "step", &InstallOptions::default()).unwrap();
        assert_eq!(fs::read(&installed).unwrap(), b"old");
    }

    #[test]
    fn overwrite_replaces_existing_target() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("model.bin");
        fs::write(&source, b"new").unwrap();
        let base = tmp.path().join("data");
        fs::create_dir_all(base.join("step")).unwrap();
        fs::write(base.join("step/model.bin"), b"old").unwrap();

        let installed = install_resource(
            &source,
            &base,
            "step",
            &InstallOptions {
                overwrite: true,
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(fs::read(&installed).unwrap(), b"new");
    }

    #[test]
    fn install_directory_copies_tree() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("modeldir");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("a.txt"), b"a").unwrap();
        fs::write(source.join("sub/b.txt"), b"b").unwrap();

        let installed = install_resource(
            &source,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Directory,
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(fs::read(installed.join("a.txt")).unwrap(), b"a");
        assert_eq!(fs::read(installed.join("sub/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn install_directory_from_file_fails() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("notadir.bin");
        fs::write(&source, b"x").unwrap();

        let err = install_resource(
            &source,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Directory,
                ..InstallOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::NotADirectory(_)));
    }

    // =========================================================================
    // Installation: archives
    // =========================================================================

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut tar = tar::Builder::new(gz);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append_data(&mut header, name, *content).unwrap();
        }
        tar.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn install_tar_gz_archive_whole_tree() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("model.tar.gz");
        write_tar_gz(&archive, &[("weights.bin", b"w"), ("meta/info.txt", b"i")]);

        let installed = install_resource(
            &archive,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Archive,
                name: Some("model".into()),
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(fs::read(installed.join("weights.bin")).unwrap(), b"w");
        assert_eq!(fs::read(installed.join("meta/info.txt")).unwrap(), b"i");
    }

    #[test]
    fn path_in_archive_promotes_inner_file() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("bundle.tar.gz");
        write_tar_gz(&archive, &[("release/v3/model.bin", b"w")]);

        let installed = install_resource(
            &archive,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Archive,
                name: Some("model.bin".into()),
                path_in_archive: PathBuf::from("release/v3/model.bin"),
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert!(installed.is_file());
        assert_eq!(fs::read(&installed).unwrap(), b"w");
    }

    #[test]
    fn missing_path_in_archive_fails() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("bundle.tar.gz");
        write_tar_gz(&archive, &[("model.bin", b"w")]);

        let err = install_resource(
            &archive,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Archive,
                path_in_archive: PathBuf::from("nope.bin"),
                ..InstallOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::MissingInArchive(_)));
    }

    #[test]
    fn install_zip_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("model.zip");
        let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
        writer
            .start_file("weights.bin", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"w").unwrap();
        writer.finish().unwrap();

        let installed = install_resource(
            &archive,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Archive,
                name: Some("model".into()),
                ..InstallOptions::default()
            },
        )
        .unwrap();
        assert_eq!(fs::read(installed.join("weights.bin")).unwrap(), b"w");
    }

    #[test]
    fn unrecognized_archive_kind_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("model.rar");
        fs::write(&archive, b"not really").unwrap();

        let err = install_resource(
            &archive,
            &tmp.path().join("data"),
            "step",
            &InstallOptions {
                kind: ResourceKind::Archive,
                ..InstallOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::UnknownArchiveKind(_)));
    }
}
