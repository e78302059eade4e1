use app_extractor::{ItemKind, Media};
use app_helpers::file_name::{file_name_with_extension, sanitize_file_name, MAX_FILENAME_LENGTH};
use tracing::trace;
use url::Url;

/// Room left for `.<ext>` and a uniqueness suffix
const STEM_BUDGET: usize = MAX_FILENAME_LENGTH - 16;

/// `<owner>_<shortcode>[_<index>]`, with the index counted from 1
#[must_use]
pub fn media_file_stem(media: &Media, index: Option<usize>) -> String {
    let mut stem = media
        .owner_handle
        .as_deref()
        .filter(|x| !x.is_empty())
        .map_or_else(|| media.shortcode.clone(), |owner| format!("{owner}_{}", media.shortcode));

    if let Some(index) = index {
        stem = format!("{stem}_{}", index + 1);
    }

    sanitize_file_name(&stem, STEM_BUDGET).unwrap_or_else(|| "media".to_string())
}

fn url_extension(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let file = url.path_segments()?.last()?;
    let (_, ext) = file.rsplit_once('.')?;

    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|x| x.is_ascii_alphanumeric()) {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

fn content_type_extension(content_type: Option<&str>) -> Option<String> {
    let mime = content_type?.split(';').next()?.trim();

    mime2ext::mime2ext(mime).map(|x| x.to_string())
}

/// Pick the extension for a download: sniffed from the bytes, else from the
/// content type, else from the URL, else a default for the kind
#[must_use]
pub fn extension_for(bytes: &[u8], content_type: Option<&str>, url: &str, kind: ItemKind) -> String {
    let sniffed = infer::get(bytes).map(|x| x.extension().to_string());
    trace!(?sniffed, ?content_type, "Picking extension");

    sniffed
        .or_else(|| content_type_extension(content_type))
        .or_else(|| url_extension(url))
        .unwrap_or_else(|| {
            match kind {
                ItemKind::Image => "jpg",
                ItemKind::Video => "mp4",
            }
            .to_string()
        })
}

#[must_use]
pub fn file_name(stem: &str, extension: &str) -> String {
    file_name_with_extension(stem, extension)
}
