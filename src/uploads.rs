//! Post images on disk, under the configured media directory.

use std::path::{Component, Path, PathBuf};

use crate::forms::post::UploadedImage;

const POST_IMAGE_DIR: &str = "posts_images";

/// Write a validated image and return its name relative to `media_dir`.
pub async fn save_image(media_dir: &Path, image: &UploadedImage) -> std::io::Result<String> {
    let ext = image.image_extension().unwrap_or_else(|| "bin".to_string());
    let name = format!("{}/{}.{}", POST_IMAGE_DIR, uuid::Uuid::now_v7(), ext);

    let path = media_dir.join(&name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &image.data).await?;
    Ok(name)
}

/// Best-effort removal of a replaced or orphaned image.
pub async fn remove_image(media_dir: &Path, name: &str) {
    let Some(path) = resolve(media_dir, name) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Could not remove image {}: {}", path.display(), e);
    }
}

/// Drop an image written for a save that then failed, unless the post already had it.
pub async fn discard_unsaved(media_dir: &Path, written: Option<&str>, kept: Option<&str>) {
    if let Some(name) = written {
        if Some(name) != kept {
            remove_image(media_dir, name).await;
        }
    }
}

/// Join a request path onto `media_dir`, refusing anything that could escape it.
pub fn resolve(media_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(media_dir.join(relative))
}

/// Public URL of a stored image.
pub fn image_url(name: &str) -> String {
    format!("/media/{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[test]
    fn resolve_rejects_traversal() {
        let base = Path::new("/srv/media");
        assert_eq!(
            resolve(base, "posts_images/a.png"),
            Some(PathBuf::from("/srv/media/posts_images/a.png"))
        );
        assert_eq!(resolve(base, "../secret"), None);
        assert_eq!(resolve(base, "/etc/passwd"), None);
        assert_eq!(resolve(base, "a/../../b"), None);
        assert_eq!(resolve(base, ""), None);
    }

    #[tokio::test]
    async fn save_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let image = UploadedImage {
            file_name: "cat.gif".into(),
            data: Bytes::from_static(b"GIF89a...."),
        };
        let name = save_image(tmp.path(), &image).await.unwrap();
        assert!(name.starts_with("posts_images/"));
        assert!(name.ends_with(".gif"));
        assert!(tmp.path().join(&name).exists());
        assert_eq!(image_url(&name), format!("/media/{}", name));

        remove_image(tmp.path(), &name).await;
        assert!(!tmp.path().join(&name).exists());
    }

    #[tokio::test]
    async fn failed_save_discards_only_the_new_file() {
        let tmp = tempfile::tempdir().unwrap();
        let image = UploadedImage {
            file_name: "cat.png".into(),
            data: Bytes::from_static(b"\x89PNG\r\n\x1a\n...."),
        };
        let old = save_image(tmp.path(), &image).await.unwrap();
        let new = save_image(tmp.path(), &image).await.unwrap();

        discard_unsaved(tmp.path(), Some(&old), Some(&old)).await;
        assert!(tmp.path().join(&old).exists());

        discard_unsaved(tmp.path(), Some(&new), Some(&old)).await;
        assert!(!tmp.path().join(&new).exists());
        assert!(tmp.path().join(&old).exists());

        discard_unsaved(tmp.path(), None, Some(&old)).await;
        assert!(tmp.path().join(&old).exists());
    }
}
