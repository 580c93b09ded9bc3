use crate::error::CommonError;
use flate2::read::GzDecoder;
use lzma_rs::xz_decompress;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outer compression layer of a file, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    None,
}

pub fn detect_compression(name: &str) -> Compression {
    let lower = name.to_lowercase();
    if lower.ends_with(".gz") || lower.ends_with(".tgz") {
        Compression::Gzip
    } else if lower.ends_with(".xz") || lower.ends_with(".txz") {
        Compression::Xz
    } else {
        Compression::None
    }
}

/// Strip the last extension from a file name or URL.
///
/// `foo.tar.gz` becomes `foo.tar`; a name without an extension is
/// returned unchanged. Dots in directory components are ignored.
pub fn strip_last_extension(name: &str) -> &str {
    let base_start = name.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    match name[base_start..].rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..base_start + dot],
    }
}

/// Remove one layer of compression from `src`, writing the result into
/// `target_dir` under the name with its last extension stripped.
pub fn decompress_one_layer(src: &Path, target_dir: &Path) -> Result<PathBuf, CommonError> {
    let name = src
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CommonError::Archive(format!("invalid file name: {}", src.display())))?;

    let decode: fn(File, &mut BufWriter<File>) -> Result<(), CommonError> =
        match detect_compression(name) {
            Compression::Gzip => |input, writer| {
                io::copy(&mut GzDecoder::new(input), writer)?;
                Ok(())
            },
            Compression::Xz => |input, writer| {
                xz_decompress(&mut BufReader::new(input), writer)
                    .map_err(|err| CommonError::Archive(err.to_string()))
            },
            Compression::None => {
                return Err(CommonError::UnsupportedCompression(name.to_string()));
            }
        };

    fs::create_dir_all(target_dir)?;
    let output = target_dir.join(decompressed_name(name));
    let mut writer = BufWriter::new(File::create(&output)?);
    decode(File::open(src)?, &mut writer)?;
    writer.flush()?;

    Ok(output)
}

fn decompressed_name(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower.ends_with(".tgz") || lower.ends_with(".txz") {
        format!("{}.tar", &name[..name.len() - 4])
    } else {
        strip_last_extension(name).to_string()
    }
}
