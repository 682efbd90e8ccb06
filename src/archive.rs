//! Package archive format
//!
//! An `.ep` archive is a gzip-compressed tar rooted at the package's build
//! output, always carrying `ermine.json` at its root so the embedded config
//! can be re-parsed without the original source tree.

use crate::error::{ErmineError, ErmineResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::{Archive, Builder, Header};
use tracing::debug;

/// File name of the embedded config at the archive root
pub const EMBEDDED_CONFIG: &str = "ermine.json";

/// Write a package archive from a build output directory.
///
/// When `config_json` is given it is written as the root `ermine.json`,
/// shadowing any copy already inside `src_dir`.
pub fn write_package(
    src_dir: &Path,
    dest: &Path,
    config_json: Option<&str>,
) -> ErmineResult<()> {
    let file = File::create(dest)
        .map_err(|e| ErmineError::io(format!("creating archive {}", dest.display()), e))?;
    let enc = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(enc);

    if let Some(json) = config_json {
        append_config(&mut builder, json.as_bytes())?;
    } else if !src_dir.join(EMBEDDED_CONFIG).exists() {
        return Err(ErmineError::ArchiveInvalid {
            path: dest.to_path_buf(),
            reason: format!("{} missing from build output", EMBEDDED_CONFIG),
        });
    }

    for entry in std::fs::read_dir(src_dir)
        .map_err(|e| ErmineError::io(format!("reading {}", src_dir.display()), e))?
    {
        let entry = entry.map_err(|e| ErmineError::io("reading dir entry", e))?;
        let path = entry.path();
        let name = entry.file_name();

        // The explicit config entry shadows the on-disk copy
        if config_json.is_some() && name.to_string_lossy() == EMBEDDED_CONFIG {
            continue;
        }
        // The archive may be written into the directory being packed
        if path == dest {
            continue;
        }
        // Materialized dependencies are cached separately, never bundled
        if path.is_dir() && name.to_string_lossy() == "deps" {
            continue;
        }

        if path.is_dir() {
            builder
                .append_dir_all(&name, &path)
                .map_err(|e| ErmineError::io(format!("archiving {}", path.display()), e))?;
        } else {
            builder
                .append_path_with_name(&path, &name)
                .map_err(|e| ErmineError::io(format!("archiving {}", path.display()), e))?;
        }
    }

    let enc = builder
        .into_inner()
        .map_err(|e| ErmineError::io("finalizing archive", e))?;
    enc.finish()
        .map_err(|e| ErmineError::io("flushing archive", e))?;

    debug!("wrote package archive {}", dest.display());
    Ok(())
}

fn append_config<W: std::io::Write>(builder: &mut Builder<W>, bytes: &[u8]) -> ErmineResult<()> {
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, EMBEDDED_CONFIG, bytes)
        .map_err(|e| ErmineError::io("appending embedded config", e))
}

/// Read the embedded `ermine.json` out of an archive without unpacking it
pub fn read_embedded_config(archive_path: &Path) -> ErmineResult<String> {
    let file = File::open(archive_path)
        .map_err(|e| ErmineError::io(format!("opening {}", archive_path.display()), e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| ErmineError::io("reading archive entries", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ErmineError::io("reading archive entry", e))?;
        let path = entry
            .path()
            .map_err(|e| ErmineError::io("reading entry path", e))?;

        let is_config = path
            .file_name()
            .map(|n| n == EMBEDDED_CONFIG)
            .unwrap_or(false)
            && path.components().count() <= 2;

        if is_config {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| ErmineError::io("reading embedded config", e))?;
            return Ok(content);
        }
    }

    Err(ErmineError::ArchiveInvalid {
        path: archive_path.to_path_buf(),
        reason: format!("no {} at archive root", EMBEDDED_CONFIG),
    })
}

/// Unpack an `.ep` archive (gzip tar) into a directory
pub fn unpack(archive_path: &Path, dest: &Path) -> ErmineResult<()> {
    std::fs::create_dir_all(dest)
        .map_err(|e| ErmineError::io(format!("creating {}", dest.display()), e))?;

    let file = File::open(archive_path)
        .map_err(|e| ErmineError::io(format!("opening {}", archive_path.display()), e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dest).map_err(|e| {
        ErmineError::io(format!("unpacking {}", archive_path.display()), e)
    })?;

    debug!("unpacked {} into {}", archive_path.display(), dest.display());
    Ok(())
}

/// Unpack a plain (uncompressed) tar, as used by runtime release downloads
pub fn unpack_tar(archive_path: &Path, dest: &Path) -> ErmineResult<()> {
    let file = File::open(archive_path)
        .map_err(|e| ErmineError::io(format!("opening {}", archive_path.display()), e))?;
    let mut archive = Archive::new(file);
    archive.unpack(dest).map_err(|e| {
        ErmineError::io(format!("unpacking {}", archive_path.display()), e)
    })?;
    Ok(())
}
