//! Validators for user-supplied integration values
//!
//! Each returns the message to show before asking again.

use envsync_api::{is_valid_identifier, ParamKind, ParamSpec};
use url::Url;

pub fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("This value is required".to_string())
    } else {
        Ok(())
    }
}

/// Well-formed absolute URL with a host
pub fn url(value: &str) -> Result<(), String> {
    match Url::parse(value.trim()) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        _ => Err("Please enter a valid URL (e.g., https://yourcompany.atlassian.net)".to_string()),
    }
}

/// Endpoint for a custom integration: an http(s) URL
pub fn endpoint(value: &str) -> Result<(), String> {
    url(value)?;
    match Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err("Endpoint must use http or https".to_string()),
    }
}

/// Value for a declared parameter
pub fn param(spec: &ParamSpec, value: &str) -> Result<(), String> {
    if spec.required {
        required(value)?;
    }
    if spec.kind == ParamKind::Url && !value.trim().is_empty() {
        url(value)?;
    }
    Ok(())
}

/// New integration identifier: `[a-z0-9-]+` and not already in use
pub fn identifier(value: &str, taken: &[String]) -> Result<(), String> {
    if !is_valid_identifier(value) {
        return Err(
            "Use lowercase letters, digits and dashes only (e.g., my-server)".to_string(),
        );
    }
    if taken.iter().any(|t| t == value) {
        return Err(format!("'{}' is already configured in this run", value));
    }
    Ok(())
}

/// Parameter entry for a custom integration: `NAME=value`, or empty to finish
pub fn param_pair(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    let Some((name, val)) = value.split_once('=') else {
        return Err("Use NAME=value".to_string());
    };
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_uppercase() || c == '_')
        .unwrap_or(false);
    if !head_ok || !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Err("Parameter names use A-Z, 0-9 and _ (e.g., API_TOKEN)".to_string());
    }
    param(&ParamSpec::new(name, "custom parameter").required(), val)
}
