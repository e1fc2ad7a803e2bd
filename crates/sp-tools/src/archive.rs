//! Single-executable extraction from release archives.
//!
//! Release packages ship the executable next to docs, licenses and sibling
//! tools. [`extract`] walks the entries once, picks the first regular file
//! that looks like the wanted executable, and streams it to
//! `<dest_dir>/<target>`. Nothing is buffered beyond the copy buffer: zip
//! entries are read through random access, tar entries as they come off the
//! decompressor.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use sp_core::{Error, Result};
use tracing::{debug, info};

/// Supported archive containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip), random access per entry.
    Zip,
    /// Uncompressed tar (.tar).
    Tar,
    /// Gzip-compressed tar (.tar.gz, .tgz).
    TarGz,
    /// XZ-compressed tar (.tar.xz).
    TarXz,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or file name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Conventional file suffix, used for temporary download names.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::Tar => ".tar",
            Self::TarGz => ".tar.gz",
            Self::TarXz => ".tar.xz",
        }
    }
}

/// Extract the entry matching `target` from `archive` into `dest_dir`.
///
/// Returns the path of the written executable. Fails with
/// [`Error::NotFoundInArchive`] when a full scan finds no matching entry.
pub fn extract(
    archive: &Path,
    format: ArchiveFormat,
    dest_dir: &Path,
    target: &str,
) -> Result<PathBuf> {
    info!(
        "Extracting {target} from {:?} archive {}",
        format,
        archive.display()
    );

    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(target);

    let found = match format {
        ArchiveFormat::Zip => extract_zip(archive, &dest, target)?,
        ArchiveFormat::Tar => {
            let file = File::open(archive)?;
            extract_tar(BufReader::new(file), &dest, target)?
        }
        ArchiveFormat::TarGz => {
            let file = File::open(archive)?;
            extract_tar(flate2::read::GzDecoder::new(BufReader::new(file)), &dest, target)?
        }
        ArchiveFormat::TarXz => {
            let file = File::open(archive)?;
            extract_tar(xz2::read::XzDecoder::new(BufReader::new(file)), &dest, target)?
        }
    };

    if !found {
        return Err(Error::NotFoundInArchive {
            target: target.to_string(),
            archive: archive.to_path_buf(),
        });
    }

    make_executable(&dest)?;
    debug!("Extracted {}", dest.display());
    Ok(dest)
}

/// Whether an archive entry named `entry` is the executable `target`.
///
/// The entry's file name must contain the target's base name (its name
/// without `.exe`), nothing in the entry path may mention `doc`, and the
/// file extension must match the target's (none, or `.exe`), which keeps
/// `ffmpeg.html` and `ffmpeg.txt` out.
pub fn entry_matches(entry: &str, target: &str) -> bool {
    let normalized = entry.replace('\\', "/").to_lowercase();
    let target = target.to_lowercase();
    let base = target.strip_suffix(".exe").unwrap_or(&target);

    let Some(file_name) = normalized.rsplit('/').next().filter(|n| !n.is_empty()) else {
        return false;
    };
    if !file_name.contains(base) || normalized.contains("doc") {
        return false;
    }

    let extension = |name: &str| Path::new(name).extension().map(|e| e.to_os_string());
    extension(file_name) == extension(&target)
}

fn extract_zip(archive: &Path, dest: &Path, target: &str) -> Result<bool> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| zip_error(archive, e))?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| zip_error(archive, e))?;
        if !entry.is_file() || !entry_matches(entry.name(), target) {
            continue;
        }
        debug!("Selected zip entry {}", entry.name());
        write_entry(&mut entry, dest)?;
        return Ok(true);
    }
    Ok(false)
}

fn extract_tar<R: Read>(reader: R, dest: &Path, target: &str) -> Result<bool> {
    let mut tar = tar::Archive::new(reader);
    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        if !entry_matches(&name, target) {
            continue;
        }
        debug!("Selected tar entry {name}");
        write_entry(&mut entry, dest)?;
        return Ok(true);
    }
    Ok(false)
}

fn write_entry(entry: &mut impl Read, dest: &Path) -> Result<()> {
    let mut out = File::create(dest)?;
    io::copy(entry, &mut out)?;
    out.sync_all()?;
    Ok(())
}

fn zip_error(archive: &Path, e: zip::result::ZipError) -> Error {
    Error::Io {
        source: io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {e}", archive.display()),
        ),
    }
}

/// Sets the executable bits on Unix; a no-op elsewhere.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
