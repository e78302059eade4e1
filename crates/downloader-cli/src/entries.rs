use std::path::PathBuf;

use anyhow::Context;
use app_config::common::EntriesGroup;
use app_extractor::UrlRecognizer;
use tracing::{debug, warn};

/// Every link to download: explicit URLs as given, then the post links found
/// in the text files and the free text, without duplicates
pub async fn collect_urls(entries: &EntriesGroup) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::new();

    for url in &entries.urls {
        push_unique(&mut urls, url.trim().to_string());
    }

    for path in &entries.text_files {
        let text = read_text(path).await?;
        let found = UrlRecognizer::find_all(&text);
        debug!(?path, count = found.len(), "Scanned text file");

        if found.is_empty() {
            warn!(?path, "No post links in file");
        }

        for url in found {
            push_unique(&mut urls, url);
        }
    }

    for text in &entries.text {
        let found = UrlRecognizer::find_all(text);

        if found.is_empty() {
            warn!(?text, "No post links in entry, ignoring it");
        }

        for url in found {
            push_unique(&mut urls, url);
        }
    }

    Ok(urls)
}

fn push_unique(urls: &mut Vec<String>, url: String) {
    if !url.is_empty() && !urls.contains(&url) {
        urls.push(url);
    }
}

async fn read_text(path: &PathBuf) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merges_all_entry_kinds() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("links.txt");
        std::fs::write(
            &file,
            "saved https://www.instagram.com/p/FILE1/ and https://www.instagram.com/p/URL1/",
        )
        .expect("write");

        let entries = EntriesGroup {
            urls: vec!["https://www.instagram.com/p/URL1/".to_string(), " ".to_string()],
            text_files: vec![file],
            text: vec![
                "see https://instagram.com/reel/TEXT1/, nice".to_string(),
                "nothing here".to_string(),
            ],
        };

        let urls = collect_urls(&entries).await.expect("collects");

        assert_eq!(
            urls,
            vec![
                "https://www.instagram.com/p/URL1/",
                "https://www.instagram.com/p/FILE1/",
                "https://instagram.com/reel/TEXT1/",
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let entries = EntriesGroup {
            text_files: vec![PathBuf::from("/definitely/not/here.txt")],
            ..EntriesGroup::default()
        };

        assert!(collect_urls(&entries).await.is_err());
    }
}
