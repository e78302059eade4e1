use std::path::PathBuf;

use clap::{Args, ValueEnum, ValueHint};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validators::{
    validate_is_absolute_url, validate_is_directory, validate_is_files,
    value_parser_parse_base_url, value_parser_parse_valid_directory,
    value_parser_parse_valid_file,
};

#[derive(Debug, Clone, Serialize, Deserialize, ValueEnum)]
pub enum DumpConfigType {
    Json,
    Toml,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args, Validate)]
#[allow(clippy::option_option)]
#[clap(next_help_heading = Some("Run options"))]
pub struct RunConfig {
    /// Dump the config to stdout
    #[arg(long, value_enum, default_value = None)]
    pub dump_config: Option<Option<DumpConfigType>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Instagram endpoints"))]
pub struct EndpointConfig {
    /// Base URL of the website
    #[arg(long, default_value = "https://www.instagram.com", env = "IGDL_INSTAGRAM_BASE_URL", value_hint = ValueHint::Url, value_parser = value_parser_parse_base_url())]
    #[validate(custom(function = "validate_is_absolute_url"))]
    pub instagram_base_url: String,

    /// Base URL of the private app API
    #[arg(long, default_value = "https://i.instagram.com", env = "IGDL_INSTAGRAM_API_BASE_URL", value_hint = ValueHint::Url, value_parser = value_parser_parse_base_url())]
    #[validate(custom(function = "validate_is_absolute_url"))]
    pub instagram_api_base_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            instagram_base_url: "https://www.instagram.com".to_string(),
            instagram_api_base_url: "https://i.instagram.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Network"))]
pub struct NetworkConfig {
    /// Total time allowed for one request, in seconds
    #[arg(long, default_value_t = 30, env = "IGDL_REQUEST_TIMEOUT_SECS")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Time allowed to establish a connection, in seconds
    #[arg(long, default_value_t = 10, env = "IGDL_CONNECT_TIMEOUT_SECS")]
    #[validate(range(min = 1, max = 120))]
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Download options"))]
pub struct DownloadConfig {
    /// Directory to download files to
    ///
    /// Must exist.
    #[clap(short = 'd', long, default_value = ".", env = "IGDL_OUTPUT_DIRECTORY", value_hint = ValueHint::DirPath, value_parser = value_parser_parse_valid_directory())]
    #[validate(custom(function = "validate_is_directory"))]
    pub output_directory: PathBuf,

    /// Pause between the items of a multi-item post, in milliseconds
    #[arg(long, default_value_t = 0, env = "IGDL_ITEM_DELAY_MS")]
    #[validate(range(max = 60_000))]
    pub item_delay_ms: u64,

    /// How many posts are resolved and downloaded at the same time
    #[arg(long, default_value_t = 4, env = "IGDL_MAX_CONCURRENT_TASKS")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrent_tasks: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            item_delay_ms: 0,
            max_concurrent_tasks: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Args, Validate)]
#[clap(next_help_heading = Some("Authentication"))]
pub struct AuthConfig {
    /// JSON file holding a saved session
    ///
    /// Defaults to `credentials.json` in the user config directory.
    #[arg(long, env = "IGDL_CREDENTIALS_FILE", value_hint = ValueHint::FilePath)]
    pub credentials_file: Option<PathBuf>,

    /// Raw `Cookie` header of a logged in browser session
    ///
    /// Takes precedence over the credentials file.
    #[arg(long, env = "IGDL_COOKIE", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Default, Args, Serialize, Deserialize, Validate)]
#[group(required = true, multiple = true)]
pub struct EntriesGroup {
    /// Post URLs to download
    #[clap(short = 'u', long = "url")]
    pub urls: Vec<String>,

    /// Files of free text to scan for post links
    #[clap(short = 't', long = "text-file", value_hint = ValueHint::FilePath, value_parser = value_parser_parse_valid_file())]
    #[validate(custom(function = "validate_is_files"))]
    pub text_files: Vec<PathBuf>,

    /// Free text to scan for post links
    ///
    /// Every post link found in the text is downloaded, anything else is ignored.
    #[clap(id = "TEXT")]
    pub text: Vec<String>,
}
