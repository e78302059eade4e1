use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Carousel,
}

/// Kind of a single downloadable item. Carousels are made of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Image,
    Video,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselItem {
    pub display_url: String,
    pub kind: ItemKind,
    pub video_url: Option<String>,
}

impl CarouselItem {
    /// `None` if there is no display URL to show for the item
    #[must_use]
    pub fn new(display_url: String, video_url: Option<String>) -> Option<Self> {
        if display_url.is_empty() {
            return None;
        }

        let video_url = video_url.filter(|x| !x.is_empty());
        let kind = if video_url.is_some() {
            ItemKind::Video
        } else {
            ItemKind::Image
        };

        Some(Self {
            display_url,
            kind,
            video_url,
        })
    }

    #[must_use]
    pub fn image(display_url: String) -> Option<Self> {
        Self::new(display_url, None)
    }

    /// The URL that has to be downloaded to get the full item
    #[must_use]
    pub fn download_url(&self) -> &str {
        match (self.kind, &self.video_url) {
            (ItemKind::Video, Some(url)) => url,
            _ => &self.display_url,
        }
    }
}

/// Normalized description of one post, whichever response it came from.
///
/// An empty `display_url` means no preview image could be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub shortcode: String,
    pub kind: MediaKind,
    pub display_url: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub caption: Option<String>,
    pub timestamp: Option<i64>,
    pub owner_handle: Option<String>,
    pub items: Vec<CarouselItem>,
    pub is_low_resolution: bool,
}

impl Media {
    #[must_use]
    pub fn new(shortcode: impl Into<String>) -> Self {
        Self {
            shortcode: shortcode.into(),
            kind: MediaKind::Image,
            display_url: String::new(),
            thumbnail_url: None,
            video_url: None,
            caption: None,
            timestamp: None,
            owner_handle: None,
            items: Vec::new(),
            is_low_resolution: false,
        }
    }

    #[must_use]
    pub fn has_display_url(&self) -> bool {
        !self.display_url.is_empty()
    }

    #[must_use]
    pub fn is_carousel(&self) -> bool {
        self.kind == MediaKind::Carousel
    }

    /// Number of files a download of this media produces
    #[must_use]
    pub fn item_count(&self) -> usize {
        if self.is_carousel() {
            self.items.len()
        } else {
            1
        }
    }

    /// Applies the kind rule shared by every parser: carousel if there are
    /// items, else video if flagged as one, else image.
    #[must_use]
    pub fn with_kind_from(mut self, is_video: bool) -> Self {
        self.kind = if !self.items.is_empty() {
            MediaKind::Carousel
        } else if is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        };

        self
    }
}
