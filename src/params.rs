//! Query parameter validation for the streaming endpoints.
//!
//! Parameters arrive as raw pairs so duplicates stay visible: each
//! single-valued parameter must appear exactly once, and rejection happens
//! before any connection upgrade.

use std::fmt;

use kubecast_types::{LogTarget, StreamRequest, TailOptions};

/// Rejection of a malformed request, surfaced as a 400 response.
#[derive(Debug, PartialEq, Eq)]
pub enum ParamError {
    Missing(&'static str),
    Duplicated(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is missing"),
            Self::Duplicated(key) => write!(f, "{key} specified multiple times"),
            Self::Invalid(key) => write!(f, "{key} is invalid"),
        }
    }
}

fn values<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn exactly_one(pairs: &[(String, String)], key: &'static str) -> Result<String, ParamError> {
    match values(pairs, key).as_slice() {
        [] => Err(ParamError::Missing(key)),
        [value] if !value.is_empty() => Ok((*value).to_string()),
        [_] => Err(ParamError::Invalid(key)),
        _ => Err(ParamError::Duplicated(key)),
    }
}

fn tail_options(pairs: &[(String, String)]) -> Result<TailOptions, ParamError> {
    match values(pairs, "tailLines").as_slice() {
        [] => Ok(TailOptions::default()),
        [value] => value
            .parse::<i64>()
            .ok()
            .filter(|lines| *lines >= 0)
            .map(TailOptions::with_tail)
            .ok_or(ParamError::Invalid("tailLines")),
        _ => Err(ParamError::Duplicated("tailLines")),
    }
}

/// Validate the single-source endpoint's parameters.
pub fn single_request(pairs: &[(String, String)]) -> Result<StreamRequest, ParamError> {
    let name = exactly_one(pairs, "name")?;
    let namespace = exactly_one(pairs, "namespace")?;
    let container = exactly_one(pairs, "container")?;
    let tail = tail_options(pairs)?;

    Ok(StreamRequest::Single {
        target: LogTarget::new(namespace, name, container),
        tail,
    })
}

/// Validate the multi-source endpoint's parameters.
pub fn multi_request(pairs: &[(String, String)]) -> Result<StreamRequest, ParamError> {
    let namespace = exactly_one(pairs, "namespace")?;
    let image_selectors: Vec<String> = values(pairs, "imageSelector")
        .into_iter()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    if image_selectors.is_empty() {
        return Err(ParamError::Missing("imageSelector"));
    }
    let tail = tail_options(pairs)?;

    Ok(StreamRequest::Multi {
        namespace,
        image_selectors,
        tail,
    })
}
