use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use stockroom_db::Database;
use stockroom_storage::Storage;

/// Background reconciliation for the upload flow's documented gap: an
/// object written before a failed record insert has no referencing row
/// and would otherwise live forever.
///
/// Runs on an interval, lists stored objects, keeps everything a
/// media_assets.file_url or profiles.avatar_url still points at, and
/// deletes unreferenced objects older than the grace period. The grace
/// period keeps in-flight uploads (object stored, row not yet written)
/// out of reach.
pub async fn run_sweep_loop(
    db: Arc<Database>,
    storage: Arc<Storage>,
    interval_secs: u64,
    grace: Duration,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match sweep_orphans(&db, &storage, grace).await {
            Ok(count) => {
                if count > 0 {
                    info!("Sweep: removed {} orphaned objects", count);
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}

pub async fn sweep_orphans(
    db: &Arc<Database>,
    storage: &Storage,
    grace: Duration,
) -> anyhow::Result<usize> {
    let db = db.clone();
    let urls = tokio::task::spawn_blocking(move || db.referenced_file_urls()).await??;

    let referenced: HashSet<String> = urls
        .iter()
        .filter_map(|url| storage.key_for_url(url))
        .collect();

    let mut removed = 0;
    for key in storage.list_keys().await? {
        if referenced.contains(&key) {
            continue;
        }
        match storage.modified_age(&key).await {
            Ok(age) if age < grace => continue,
            Ok(_) => {}
            Err(e) => {
                warn!("Sweep: could not stat {key}: {e}");
                continue;
            }
        }
        if let Err(e) = storage.delete(&key).await {
            warn!("Sweep: could not delete {key}: {e}");
            continue;
        }
        removed += 1;
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use stockroom_db::models::NewMediaAsset;

    async fn fixtures() -> (tempfile::TempDir, Arc<Database>, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), Some("http://localhost:8350".into()))
            .await
            .unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        (dir, db, Arc::new(storage))
    }

    async fn seed_referenced_asset(db: &Database, storage: &Storage, key: &str) {
        storage.store(key, b"referenced").await.unwrap();
        let id = Uuid::new_v4().to_string();
        db.insert_media_asset(&NewMediaAsset {
            id: &id,
            title: "Kept",
            description: None,
            file_url: &storage.public_url(key).unwrap(),
            format: "png",
            asset_type: "image",
            category_id: None,
            uploader_id: None,
            is_recommended: false,
        })
        .unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_only_unreferenced_objects_past_grace() {
        let (_guard, db, storage) = fixtures().await;

        seed_referenced_asset(&db, &storage, "kept_1.png").await;
        storage.store("orphan_1.png", b"orphan").await.unwrap();

        // Zero grace: every unreferenced object is fair game
        let removed = sweep_orphans(&db, &storage, Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(storage.exists("kept_1.png").await);
        assert!(!storage.exists("orphan_1.png").await);
    }

    #[tokio::test]
    async fn young_orphans_survive_the_grace_period() {
        let (_guard, db, storage) = fixtures().await;
        storage.store("fresh_1.png", b"in flight").await.unwrap();

        let removed = sweep_orphans(&db, &storage, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(storage.exists("fresh_1.png").await);
    }

    #[tokio::test]
    async fn avatar_references_also_protect_objects() {
        let (_guard, db, storage) = fixtures().await;

        let user = Uuid::new_v4().to_string();
        db.create_profile(&user, "u@example.com", "hash", None).unwrap();
        storage.store("avatars/kept_2.jpg", b"face").await.unwrap();
        db.update_avatar_url(&user, &storage.public_url("avatars/kept_2.jpg").unwrap())
            .unwrap();
        storage.store("avatars/orphan_2.jpg", b"old face").await.unwrap();

        let removed = sweep_orphans(&db, &storage, Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(storage.exists("avatars/kept_2.jpg").await);
        assert!(!storage.exists("avatars/orphan_2.jpg").await);
    }

    #[tokio::test]
    async fn foreign_urls_never_match_local_objects() {
        let (_guard, db, storage) = fixtures().await;

        // A row pointing at a foreign host must not shield a local object
        // that merely shares the file name.
        let id = Uuid::new_v4().to_string();
        db.insert_media_asset(&NewMediaAsset {
            id: &id,
            title: "Foreign",
            description: None,
            file_url: "https://cdn.example.net/assets/shared.png",
            format: "png",
            asset_type: "image",
            category_id: None,
            uploader_id: None,
            is_recommended: false,
        })
        .unwrap();
        storage.store("shared.png", b"local").await.unwrap();

        let removed = sweep_orphans(&db, &storage, Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!storage.exists("shared.png").await);
    }
}
