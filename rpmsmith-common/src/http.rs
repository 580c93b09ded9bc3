use crate::error::CommonError;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Last path segment of a URL, ignoring any query string or fragment.
pub fn url_file_name(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// Download `url` into `target_dir`, keeping the URL's file name.
///
/// `file://` URLs are copied from the local filesystem; `http://` and
/// `https://` URLs are streamed to disk.
pub fn fetch_to(url: &str, target_dir: &Path) -> Result<PathBuf, CommonError> {
    let name = url_file_name(url).ok_or_else(|| CommonError::UnsupportedUrl(url.to_string()))?;
    fs::create_dir_all(target_dir)?;
    let output = target_dir.join(name);

    if let Some(path) = url.strip_prefix("file://") {
        fs::copy(path, &output)?;
        return Ok(output);
    }

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CommonError::UnsupportedUrl(url.to_string()));
    }

    let mut response = ureq::get(url)
        .call()
        .map_err(|e| CommonError::Http(e.to_string()))?;
    let mut file = File::create(&output)?;
    io::copy(&mut response.body_mut().as_reader(), &mut file)
        .map_err(|e| CommonError::Http(e.to_string()))?;

    Ok(output)
}
