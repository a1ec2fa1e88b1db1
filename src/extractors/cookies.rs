use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Cookie material written to disk for the lifetime of one request.
///
/// Every request gets its own file, created exclusively and readable by the owner only, so
/// concurrent requests never share or delete each other's cookies. The file is removed
/// when the guard is dropped.
#[derive(Debug)]
pub struct CookieFile {
    file: Option<NamedTempFile>,
}

impl CookieFile {
    /// Write `content` to a fresh `<dir>/cookies-<request_key>-XXXXXX.txt`.
    ///
    /// Returns `Ok(None)` when no cookies are configured.
    pub fn provision(content: Option<&str>, dir: &Path, request_key: &str) -> io::Result<Option<Self>> {
        let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };

        fs_err::create_dir_all(dir)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("cookies-{}-", request_key))
            .suffix(".txt")
            .tempfile_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        tracing::debug!("Cookie file written: {}", file.path().display());

        Ok(Some(Self { file: Some(file) }))
    }

    pub fn path(&self) -> &Path {
        match &self.file {
            Some(file) => file.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for CookieFile {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let path = file.path().to_path_buf();
        match file.close() {
            Ok(()) => tracing::info!("Cookie file removed: {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Failed to remove cookie file {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[test]
    fn test_provision_without_content_is_noop() {
        let dir = TempDir::new().unwrap();
        assert!(assert_ok!(CookieFile::provision(None, dir.path(), "a")).is_none());
        assert!(assert_ok!(CookieFile::provision(Some("  \n"), dir.path(), "a")).is_none());
        assert_eq!(fs_err::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_provision_writes_verbatim_and_removes_on_drop() {
        let dir = TempDir::new().unwrap();
        let content = "# Netscape HTTP Cookie File\n.youtube.com\tTRUE\t/\tTRUE\t0\tSID\tsecret\n";

        let cookie = assert_ok!(CookieFile::provision(Some(content), dir.path(), "10_20_abcd")).unwrap();
        let path = cookie.path().to_path_buf();
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("cookies-10_20_abcd-"));
        assert!(name.ends_with(".txt"));
        assert_eq!(fs_err::read_to_string(&path).unwrap(), content);

        drop(cookie);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_cookie_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cookie = CookieFile::provision(Some("SID\tsecret"), dir.path(), "1_2_abcd").unwrap().unwrap();
        let mode = fs_err::metadata(cookie.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "cookie file mode is {:o}", mode);
    }

    #[test]
    fn test_same_key_never_shares_a_file() {
        let dir = TempDir::new().unwrap();
        let first = CookieFile::provision(Some("old"), dir.path(), "same").unwrap().unwrap();
        let second = CookieFile::provision(Some("new"), dir.path(), "same").unwrap().unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(fs_err::read_to_string(first.path()).unwrap(), "old");

        drop(first);
        assert!(second.path().exists());
        assert_eq!(fs_err::read_to_string(second.path()).unwrap(), "new");
    }

    #[test]
    fn test_file_removed_externally_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let cookie = CookieFile::provision(Some("SID"), dir.path(), "gone").unwrap().unwrap();
        fs_err::remove_file(cookie.path()).unwrap();
        drop(cookie);
        assert_eq!(fs_err::read_dir(dir.path()).unwrap().count(), 0);
    }
}
