use clap::{ArgAction, Parser};
use serde::{Deserialize, Serialize};

use crate::common;

/// Download images and videos from Instagram posts.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[clap(disable_help_flag = true)]
pub struct CliArgs {
    /// Print help
    #[clap(action = ArgAction::Help, long)]
    help: Option<bool>,

    #[command(flatten)]
    pub run: common::RunConfig,

    #[command(flatten)]
    pub endpoint: common::EndpointConfig,

    #[command(flatten)]
    pub network: common::NetworkConfig,

    #[command(flatten)]
    pub download: common::DownloadConfig,

    #[command(flatten)]
    pub auth: common::AuthConfig,

    #[command(flatten)]
    pub entries: common::EntriesGroup,
}
