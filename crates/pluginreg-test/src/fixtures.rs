//! Metadata documents and archive builders.
//!
//! Builders write into memory and panic on failure; they are only used to
//! set up tests.

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use pluginreg_core::runtime_artifact_identifier;

/// A `.plugin.registry.yaml` document for `name` declaring `file` as the
/// artifact of the running platform.
#[must_use]
pub fn metadata(name: &str, file: &str) -> String {
    format!(
        "name: {name}\nartifacts:\n  {platform}:\n    file: {file}\n",
        platform = runtime_artifact_identifier()
    )
}

/// A metadata document with a version and no artifacts, as found inside
/// an archive.
#[must_use]
pub fn inner_metadata(name: &str, version: &str) -> String {
    format!("name: {name}\nversion: {version}\n")
}

/// A zip archive of `(path, data, mode)` entries.
///
/// # Panics
///
/// Panics if the archive cannot be written.
#[must_use]
pub fn zip(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, mode) in entries {
        writer
            .start_file(
                *name,
                zip::write::FileOptions::default().unix_permissions(*mode),
            )
            .expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// An uncompressed tar archive of `(path, data, mode)` entries.
///
/// # Panics
///
/// Panics if the archive cannot be written.
#[must_use]
pub fn tar(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(u64::try_from(data.len()).expect("entry size"));
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, *data)
            .expect("append tar entry");
    }
    builder.into_inner().expect("finish tar")
}

/// Gzip-compress `data`.
///
/// # Panics
///
/// Panics if compression fails.
#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// A gzip-compressed tarball of `(path, data, mode)` entries.
#[must_use]
pub fn tarball(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    gzip(&tar(entries))
}

/// Entries of a packaged plugin: metadata plus an executable named after
/// the plugin. With `parent`, both sit under a `<name>/` directory.
#[must_use]
pub fn plugin_entries(name: &str, version: &str, parent: bool) -> Vec<(String, Vec<u8>, u32)> {
    let prefix = if parent {
        format!("{name}/")
    } else {
        String::new()
    };
    vec![
        (
            format!("{prefix}{}", pluginreg_core::METADATA_FILE),
            inner_metadata(name, version).into_bytes(),
            0o644,
        ),
        (format!("{prefix}{name}"), plugin_binary(name), 0o755),
    ]
}

/// Contents of the fake plugin executable.
#[must_use]
pub fn plugin_binary(name: &str) -> Vec<u8> {
    format!("#!/bin/sh\necho {name}\n").into_bytes()
}

/// A zip holding a packaged plugin.
#[must_use]
pub fn plugin_zip(name: &str, version: &str, parent: bool) -> Vec<u8> {
    zip(&borrow(&plugin_entries(name, version, parent)))
}

/// A gzip-compressed tarball holding a packaged plugin.
#[must_use]
pub fn plugin_tarball(name: &str, version: &str, parent: bool) -> Vec<u8> {
    tarball(&borrow(&plugin_entries(name, version, parent)))
}

fn borrow(entries: &[(String, Vec<u8>, u32)]) -> Vec<(&str, &[u8], u32)> {
    entries
        .iter()
        .map(|(path, data, mode)| (path.as_str(), data.as_slice(), *mode))
        .collect()
}
