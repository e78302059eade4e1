pub mod embed;
pub mod html;
pub mod media_object;
pub mod meta_tags;
pub mod page;
pub mod response;

pub use embed::parse_embed_html;
pub use media_object::parse_media_object;
pub use meta_tags::parse_meta_tags;
pub use page::parse_page_html;
pub use response::{parse_response, ResponseShape};
