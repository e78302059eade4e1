pub mod cli;
pub mod common;
pub mod validators;

use std::{env, path::PathBuf, time::Duration};

use clap::Parser;
use cli::CliArgs;
use common::DumpConfigType;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use validator::Validate;

static CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub static APPLICATION_NAME: &str = "instagram-downloader";
pub static ORGANIZATION_NAME: &str = "allypost";
pub static ORGANIZATION_QUALIFIER: &str = "net";

const CREDENTIALS_FILE_NAME: &str = "credentials.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(skip)]
    #[validate(nested)]
    pub run: common::RunConfig,

    /// Where the Instagram website and API live
    #[validate(nested)]
    pub endpoint: common::EndpointConfig,

    #[validate(nested)]
    pub network: common::NetworkConfig,

    #[validate(nested)]
    pub download: common::DownloadConfig,

    #[validate(nested)]
    pub auth: common::AuthConfig,

    #[serde(skip)]
    #[validate(nested)]
    pub entries: common::EntriesGroup,
}
impl Config {
    #[must_use]
    #[inline]
    pub fn global() -> &'static Self {
        &CONFIG
    }

    #[must_use]
    #[inline]
    pub fn config_dir() -> Option<PathBuf> {
        Self::get_project_dir().map(|x| x.config_dir().into())
    }

    #[must_use]
    #[inline]
    pub fn cache_dir() -> PathBuf {
        Self::get_project_dir().map_or_else(
            || env::temp_dir().join(APPLICATION_NAME),
            |x| x.cache_dir().into(),
        )
    }

    /// The configured credentials file, else the one in the config directory
    #[must_use]
    pub fn credentials_file(&self) -> Option<PathBuf> {
        self.auth
            .credentials_file
            .clone()
            .or_else(|| Self::config_dir().map(|x| x.join(CREDENTIALS_FILE_NAME)))
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout_secs)
    }

    #[must_use]
    pub const fn item_delay(&self) -> Duration {
        Duration::from_millis(self.download.item_delay_ms)
    }

    pub fn dump_config_if_needed<T>(data: &T, dump_type: &Option<Option<DumpConfigType>>)
    where
        T: Serialize + ?Sized,
    {
        let Some(dump_type) = dump_type else {
            return;
        };

        let out = match dump_type {
            None | Some(DumpConfigType::Json) => {
                serde_json::to_string_pretty(data).map_err(|e| e.to_string())
            }
            Some(DumpConfigType::Toml) => toml::to_string_pretty(data).map_err(|e| e.to_string()),
        };

        match out {
            Ok(out) => {
                println!("{}", out.trim());
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("Failed to serialize config: {e}");
                std::process::exit(1);
            }
        }
    }

    #[inline]
    pub fn validate_config_and_exit<T: Validate>(conf: T) -> T {
        if let Err(e) = conf.validate() {
            eprintln!("Errors validating configuration:");
            print_validation_errors(&e, "  ", 1);
            std::process::exit(1);
        }

        conf
    }

    /// Build the config from explicit arguments instead of the process'
    #[must_use]
    pub fn from_args(args: CliArgs) -> Self {
        Self::default().merge_with_cli(args)
    }

    fn new() -> Self {
        let args = CliArgs::parse();

        Self::from_args(args).validate_self().dump_if_needed()
    }

    fn merge_with_cli(mut self, args: CliArgs) -> Self {
        self.run = args.run;
        self.endpoint = args.endpoint;
        self.network = args.network;
        self.download = args.download;
        self.auth = args.auth;
        self.entries = args.entries;

        self
    }

    fn dump_if_needed(self) -> Self {
        Self::dump_config_if_needed(&self, &self.run.dump_config);
        self
    }

    #[inline]
    fn validate_self(self) -> Self {
        Self::validate_config_and_exit(self)
    }

    #[inline]
    fn get_project_dir() -> Option<ProjectDirs> {
        ProjectDirs::from(ORGANIZATION_QUALIFIER, ORGANIZATION_NAME, APPLICATION_NAME)
    }
}

pub fn print_validation_errors(e: &validator::ValidationErrors, prefix: &str, level: usize) {
    let level = level.max(1);
    for (e_name, e) in e.errors() {
        match e {
            validator::ValidationErrorsKind::Field(e) => {
                let prefix_rep = prefix.repeat(level);
                eprintln!(
                    "{prefix_rep}{e_name}:\n{}",
                    e.iter()
                        .map(|x| format!("{} {:?}", x.code, x.params))
                        .fold(String::new(), |acc, a| format!(
                            "{acc}{prefix_rep}{prefix}- {a}\n"
                        ))
                        .trim_end()
                );
            }

            validator::ValidationErrorsKind::Struct(e) => {
                eprintln!("{}{}:", prefix, e_name);
                print_validation_errors(e, prefix, level + 1);
            }

            validator::ValidationErrorsKind::List(e) => {
                eprintln!("{}{}:", prefix, e_name);
                for e in e.values() {
                    print_validation_errors(e, prefix, level + 1);
                }
            }
        }
    }
}
