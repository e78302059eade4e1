use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use url::Url;
use validator::ValidationError;

fn check_absolute_url(s: &str) -> Result<Url, String> {
    let parsed = Url::parse(s).map_err(|e| format!("URL must be absolute: {e}"))?;

    if parsed.cannot_be_a_base() {
        return Err("URL must be absolute".to_string());
    }

    Ok(parsed)
}

fn check_directory(path: &Path) -> Result<(), &'static str> {
    if !path.exists() {
        return Err("Directory does not exist");
    }

    if !path.is_dir() {
        return Err("Path is not a directory");
    }

    Ok(())
}

fn check_file(path: &Path) -> Result<(), &'static str> {
    if !path.exists() {
        return Err("File does not exist");
    }

    if !path.is_file() {
        return Err("Path is not a valid file");
    }

    Ok(())
}

pub fn validate_is_absolute_url<'a, T>(url: T) -> Result<(), ValidationError>
where
    T: Into<Cow<'a, str>>,
{
    check_absolute_url(url.into().as_ref())
        .map(|_| ())
        .map_err(|_| ValidationError::new("URL must be absolute"))
}

pub fn validate_is_directory(path: &Path) -> Result<(), ValidationError> {
    check_directory(path).map_err(ValidationError::new)
}

pub fn validate_is_files(paths: &Vec<PathBuf>) -> Result<(), ValidationError> {
    for path in paths {
        check_file(path).map_err(ValidationError::new)?;
    }

    Ok(())
}

/// Parses an absolute URL, handing it back without a trailing `/`
#[must_use]
pub fn value_parser_parse_base_url() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        check_absolute_url(s)?;

        Ok::<_, String>(s.trim_end_matches('/').to_string())
    }
}

#[must_use]
pub fn value_parser_parse_valid_directory() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        let path = Path::new(s);

        check_directory(path)?;

        path.canonicalize()
            .map_err(|_| "Failed to canonicalize path")
    }
}

#[must_use]
pub fn value_parser_parse_valid_file() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        let path = Path::new(s);

        check_file(path)?;

        path.canonicalize()
            .map_err(|_| "Failed to canonicalize path")
    }
}
