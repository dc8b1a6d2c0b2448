use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::{Rng, distr::Alphanumeric};
use tokio::fs;
use tracing::{info, warn};

/// Mount point under which stored objects are served back over HTTP.
pub const PUBLIC_MOUNT: &str = "/assets";

/// Disk-backed object store for uploaded media.
///
/// Objects live as flat files under `{dir}`, optionally one directory level
/// deep (`avatars/{key}`). Public URLs are resolved against a configured
/// base; a store without a base can hold objects but cannot resolve URLs,
/// which fails the upload flow at its ResolvingUrl step.
pub struct Storage {
    dir: PathBuf,
    public_base: Option<String>,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_base: Option<String>) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());
        Ok(Self { dir, public_base })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Write an object under the given key. Creates the parent directory
    /// for prefixed keys. Overwrites silently; keys are generated to be
    /// collision-resistant, not checked.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing object {key}"))?;
        Ok(())
    }

    /// Publicly resolvable URL for a stored key. Errors when no public
    /// base is configured.
    pub fn public_url(&self, key: &str) -> Result<String> {
        let base = self
            .public_base
            .as_deref()
            .context("no public base URL configured")?;
        Ok(format!("{}{}/{}", base.trim_end_matches('/'), PUBLIC_MOUNT, key))
    }

    /// Inverse of `public_url`: the storage key a URL refers to, or None
    /// for foreign URLs.
    pub fn key_for_url(&self, url: &str) -> Option<String> {
        let base = self.public_base.as_deref()?;
        let prefix = format!("{}{}/", base.trim_end_matches('/'), PUBLIC_MOUNT);
        url.strip_prefix(&prefix).map(str::to_string)
    }

    /// Delete an object; a missing file is treated as already deleted.
    pub async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted object {key}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {key} already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        fs::metadata(self.object_path(key)).await.is_ok()
    }

    /// All object keys on disk, relative to the storage root. Walks the
    /// root plus one directory level, matching the key shapes we generate.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if entry.file_type().await?.is_dir() {
                let mut sub = fs::read_dir(entry.path()).await?;
                while let Some(child) = sub.next_entry().await? {
                    if child.file_type().await?.is_file() {
                        if let Ok(child_name) = child.file_name().into_string() {
                            keys.push(format!("{name}/{child_name}"));
                        }
                    }
                }
            } else {
                keys.push(name);
            }
        }
        Ok(keys)
    }

    /// Time since the object was last written; zero when the clock is
    /// unhelpful. Used by the orphan sweep's grace period.
    pub async fn modified_age(&self, key: &str) -> Result<Duration> {
        let meta = fs::metadata(self.object_path(key)).await?;
        let modified = meta.modified()?;
        Ok(modified.elapsed().unwrap_or(Duration::ZERO))
    }
}

/// Collision-resistant object key: random token plus millisecond timestamp,
/// preserving the original file extension. An optional prefix places the
/// key one directory level down (`avatars/...`).
pub fn generate_object_key(original_name: &str, prefix: Option<&str>) -> String {
    let token: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    let millis = chrono::Utc::now().timestamp_millis();
    let ext = file_extension(original_name).unwrap_or("bin");

    match prefix {
        Some(prefix) => format!("{prefix}/{token}_{millis}.{ext}"),
        None => format!("{token}_{millis}.{ext}"),
    }
}

/// Extension of an uploaded filename, if it has a sane one.
pub fn file_extension(name: &str) -> Option<&str> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Keys come from our own generator, but guard against traversal anyway.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == ".." || part.is_empty()) {
        bail!("invalid object key: {key}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), Some("http://localhost:8350".into()))
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn store_read_delete_roundtrip() {
        let (_guard, storage) = test_storage().await;

        storage.store("abc_1.png", b"png bytes").await.unwrap();
        assert!(storage.exists("abc_1.png").await);
        assert_eq!(fs::read(storage.object_path("abc_1.png")).await.unwrap(), b"png bytes");

        storage.delete("abc_1.png").await.unwrap();
        assert!(!storage.exists("abc_1.png").await);
        // Deleting again is fine
        storage.delete("abc_1.png").await.unwrap();
    }

    #[tokio::test]
    async fn prefixed_keys_get_their_own_directory() {
        let (_guard, storage) = test_storage().await;
        storage.store("avatars/x_2.jpg", b"jpg").await.unwrap();
        storage.store("top_3.gif", b"gif").await.unwrap();

        let mut keys = storage.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["avatars/x_2.jpg".to_string(), "top_3.gif".to_string()]);
    }

    #[tokio::test]
    async fn public_url_roundtrips_through_key_for_url() {
        let (_guard, storage) = test_storage().await;
        let url = storage.public_url("avatars/x.png").unwrap();
        assert_eq!(url, "http://localhost:8350/assets/avatars/x.png");
        assert_eq!(storage.key_for_url(&url).as_deref(), Some("avatars/x.png"));
        assert_eq!(storage.key_for_url("https://elsewhere.example/img.png"), None);
    }

    #[tokio::test]
    async fn missing_base_fails_url_resolution_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), None).await.unwrap();
        storage.store("k_1.png", b"ok").await.unwrap();
        assert!(storage.public_url("k_1.png").is_err());
    }

    #[tokio::test]
    async fn traversal_keys_rejected() {
        let (_guard, storage) = test_storage().await;
        assert!(storage.store("../escape.png", b"no").await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }

    #[test]
    fn generated_keys_are_unique_and_keep_extension() {
        let a = generate_object_key("photo.PNG", None);
        let b = generate_object_key("photo.PNG", None);
        assert_ne!(a, b);
        assert!(a.ends_with(".PNG"));
        assert!(a.contains('_'));

        let avatar = generate_object_key("face.jpg", Some("avatars"));
        assert!(avatar.starts_with("avatars/"));
        assert!(avatar.ends_with(".jpg"));
    }

    #[test]
    fn extension_parsing_is_conservative() {
        assert_eq!(file_extension("clip.mp4"), Some("mp4"));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("bad.ext!"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
