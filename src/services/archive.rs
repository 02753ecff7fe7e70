use std::io::{Cursor, Write};

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use uuid::Uuid;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    error::{AppError, AppResult},
    storage::SourceFetcher,
};

pub const MANIFEST_NAME: &str = "metadata.json";
const STICKER_EXTENSION: &str = "webp";

/// One sticker to place in the archive, in pack order.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub id: Uuid,
    pub title: Option<String>,
    pub source_url: String,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    stickers: Vec<ManifestSticker<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestSticker<'a> {
    id: Uuid,
    title: Option<&'a str>,
    file: String,
}

/// `01_<id>.webp`, `02_<id>.webp`, ... by 1-based position.
pub fn entry_file_name(position: usize, id: Uuid) -> String {
    format!("{:02}_{}.{}", position, id, STICKER_EXTENSION)
}

/// Folder name for the pack inside the archive; `None` puts entries at the root.
fn folder_name(pack_name: &str) -> Option<String> {
    let cleaned: String = pack_name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | ':'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Fetches every sticker source and packs them, plus a `metadata.json`
/// manifest, into a deflate-compressed ZIP.
///
/// At most `concurrency` fetches are in flight. Entries keep input order. Any
/// failed fetch fails the whole archive.
pub async fn build_pack_archive(
    fetcher: &dyn SourceFetcher,
    entries: &[ArchiveEntry],
    pack_name: &str,
    author: Option<&str>,
    concurrency: usize,
) -> AppResult<Vec<u8>> {
    let urls: Vec<String> = entries.iter().map(|entry| entry.source_url.clone()).collect();
    let sources: Vec<bytes::Bytes> =
        stream::iter(urls)
            .map(|url| async move { fetcher.fetch(&url).await })
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

    let prefix = folder_name(pack_name)
        .map(|folder| format!("{}/", folder))
        .unwrap_or_default();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    if !prefix.is_empty() {
        zip.add_directory(prefix.clone(), options)
            .map_err(archive_error)?;
    }

    let mut manifest = Manifest {
        name: pack_name,
        author,
        stickers: Vec::with_capacity(entries.len()),
    };

    for (index, (entry, data)) in entries.iter().zip(&sources).enumerate() {
        let file = entry_file_name(index + 1, entry.id);
        zip.start_file(format!("{}{}", prefix, file), options)
            .map_err(archive_error)?;
        zip.write_all(data).map_err(archive_error)?;

        manifest.stickers.push(ManifestSticker {
            id: entry.id,
            title: entry.title.as_deref(),
            file,
        });
    }

    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| anyhow::anyhow!("Failed to serialize manifest: {}", e))?;
    zip.start_file(format!("{}{}", prefix, MANIFEST_NAME), options)
        .map_err(archive_error)?;
    zip.write_all(&manifest_json).map_err(archive_error)?;

    let cursor = zip.finish().map_err(archive_error)?;
    Ok(cursor.into_inner())
}

fn archive_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(anyhow::anyhow!("Failed to write archive: {}", e))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io::Read,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use bytes::Bytes;
    use zip::ZipArchive;

    use super::*;

    /// Serves canned bodies, sleeping longer for earlier entries so that
    /// completion order is the reverse of input order.
    struct FakeFetcher {
        bodies: HashMap<String, Bytes>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(bodies: HashMap<String, Bytes>) -> Self {
            Self {
                bodies,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> AppResult<Bytes> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = url
                .rsplit('/')
                .next()
                .and_then(|n| n.parse::<u64>().ok())
                .map(|n| 50u64.saturating_sub(n * 5))
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::Upstream(format!("Failed to fetch {}: HTTP 404", url)))
        }
    }

    fn entries(n: usize) -> (Vec<ArchiveEntry>, HashMap<String, Bytes>) {
        let mut list = Vec::new();
        let mut bodies = HashMap::new();
        for i in 0..n {
            let url = format!("http://src.test/{}", i);
            bodies.insert(url.clone(), Bytes::from(format!("image-{}", i)));
            list.push(ArchiveEntry {
                id: Uuid::new_v4(),
                title: Some(format!("Sticker {}", i)),
                source_url: url,
            });
        }
        (list, bodies)
    }

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
        let mut file = archive.by_name(name).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[tokio::test]
    async fn archive_has_ordered_entries_and_manifest() {
        let (list, bodies) = entries(3);
        let fetcher = FakeFetcher::new(bodies);

        let bytes = build_pack_archive(&fetcher, &list, "My Pack", Some("Ana"), 8)
            .await
            .unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let files: Vec<String> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect();
        assert_eq!(files.len(), 4);

        for (i, entry) in list.iter().enumerate() {
            let name = format!("My Pack/{}", entry_file_name(i + 1, entry.id));
            assert!(name.contains(&format!("/{:02}_", i + 1)));
            assert_eq!(read_entry(&mut archive, &name), format!("image-{}", i).into_bytes());
        }

        let manifest: serde_json::Value =
            serde_json::from_slice(&read_entry(&mut archive, "My Pack/metadata.json")).unwrap();
        assert_eq!(manifest["name"], "My Pack");
        assert_eq!(manifest["author"], "Ana");
        let stickers = manifest["stickers"].as_array().unwrap();
        assert_eq!(stickers.len(), 3);
        for (i, entry) in list.iter().enumerate() {
            assert_eq!(stickers[i]["id"], entry.id.to_string());
            assert_eq!(stickers[i]["title"], format!("Sticker {}", i));
            assert_eq!(stickers[i]["file"], entry_file_name(i + 1, entry.id));
        }
    }

    #[tokio::test]
    async fn entries_are_deflated() {
        let (list, _) = entries(1);
        let mut bodies = HashMap::new();
        bodies.insert(list[0].source_url.clone(), Bytes::from(vec![b'a'; 4096]));
        let fetcher = FakeFetcher::new(bodies);

        let bytes = build_pack_archive(&fetcher, &list, "p", None, 1).await.unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let name = format!("p/{}", entry_file_name(1, list[0].id));
        let file = archive.by_name(&name).unwrap();

        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert!(file.compressed_size() < file.size());
    }

    #[tokio::test]
    async fn manifest_omits_missing_author() {
        let (list, bodies) = entries(1);
        let fetcher = FakeFetcher::new(bodies);

        let bytes = build_pack_archive(&fetcher, &list, "Solo", None, 4).await.unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_slice(&read_entry(&mut archive, "Solo/metadata.json")).unwrap();

        assert!(manifest.get("author").is_none());
    }

    #[tokio::test]
    async fn unusable_pack_name_writes_to_root() {
        let (list, bodies) = entries(2);
        let fetcher = FakeFetcher::new(bodies);

        let bytes = build_pack_archive(&fetcher, &list, " / ", None, 4).await.unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();

        assert!(names.contains(&MANIFEST_NAME));
        assert!(names.iter().all(|n| !n.contains('/')));
    }

    #[tokio::test]
    async fn one_failed_fetch_fails_everything() {
        let (list, mut bodies) = entries(5);
        bodies.remove(&list[3].source_url);
        let fetcher = FakeFetcher::new(bodies);

        let result = build_pack_archive(&fetcher, &list, "Broken", None, 8).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn fetches_respect_concurrency_cap() {
        let (list, bodies) = entries(10);
        let fetcher = FakeFetcher::new(bodies);

        build_pack_archive(&fetcher, &list, "Capped", None, 3)
            .await
            .unwrap();

        let peak = fetcher.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight fetches was {}", peak);
        assert!(peak >= 2);
    }

    #[test]
    fn file_names_are_zero_padded() {
        let id = Uuid::nil();
        assert_eq!(
            entry_file_name(1, id),
            "01_00000000-0000-0000-0000-000000000000.webp"
        );
        assert!(entry_file_name(12, id).starts_with("12_"));
    }
}
