//! Image reference parsing
//!
//! References are resolved in three steps, each a small predicate that can
//! be tested on its own:
//!
//! 1. strip a trailing `@digest`
//! 2. decide whether the last `:` introduces a tag or a registry port
//! 3. decide whether the first path segment is a registry host
//!
//! Anything without a registry host is a Docker Hub path.

use crate::types::ImageReference;
use regex::Regex;
use scangate_core::{Error, Result};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Registry assumed when a reference names none
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag assumed when a reference carries none
pub const DEFAULT_TAG: &str = "latest";

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[+._-][a-z0-9]+)*:[a-zA-Z0-9=_-]+$").expect("valid digest regex")
});

/// What the last `:` of a reference separates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColonRole {
    /// `name:tag`
    Tag,
    /// `host:port`
    Port,
}

/// Result of tag/port disambiguation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagSplit<'a> {
    name: &'a str,
    tag: Option<&'a str>,
}

/// Whether `candidate` is an `algorithm:encoded` content digest
pub fn is_digest(candidate: &str) -> bool {
    DIGEST_RE.is_match(candidate)
}

/// Split on the first `@`; the right side is the digest candidate
pub fn split_digest(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (reference, None),
    }
}

/// Classify the colon at `idx` (the last colon of `reference`).
///
/// - text after the colon contains `/`: the colon sits inside the host (`localhost:5000/app`)
/// - text before the colon contains `/`: a path precedes it, so it is a tag
/// - text before the colon contains `.`: a domain with no path yet, so a port
/// - otherwise a bare `name:tag`
pub fn classify_colon(reference: &str, idx: usize) -> ColonRole {
    let before = &reference[..idx];
    let after = &reference[idx + 1..];

    if after.contains('/') {
        ColonRole::Port
    } else if before.contains('/') {
        ColonRole::Tag
    } else if before.contains('.') {
        ColonRole::Port
    } else {
        ColonRole::Tag
    }
}

/// Whether the first path segment names a registry host rather than a
/// Docker Hub namespace.
///
/// A `.` marks a domain. A `:` before the first `/` can only be a port,
/// whichever role the last colon of the reference played.
pub fn is_registry_host(candidate: &str) -> bool {
    candidate.contains('.') || candidate.contains(':')
}

fn split_tag(reference: &str) -> TagSplit<'_> {
    match reference.rfind(':') {
        None => TagSplit {
            name: reference,
            tag: None,
        },
        Some(idx) => match classify_colon(reference, idx) {
            ColonRole::Tag => TagSplit {
                name: &reference[..idx],
                tag: Some(&reference[idx + 1..]),
            },
            ColonRole::Port => TagSplit {
                name: reference,
                tag: None,
            },
        },
    }
}

fn split_host(name: &str) -> (&str, &str) {
    match name.split_once('/') {
        Some((candidate, rest)) if is_registry_host(candidate) => (candidate, rest),
        _ => (DEFAULT_REGISTRY, name),
    }
}

/// Parse an image reference string like "gcr.io/project/image:v1.0@sha256:abcd"
///
/// An `@` suffix that is not an `algorithm:encoded` digest is dropped and the
/// rest of the reference parses as usual.
///
/// A bare `host:port` with no repository path (`registry.io:5000`) is
/// rejected with `Error::Parse` rather than read as a Docker Hub repository
/// named after the host.
pub fn parse_image_reference(input: &str) -> Result<ImageReference> {
    if input.is_empty() {
        return Err(Error::parse(input, "empty reference"));
    }
    if input.chars().any(char::is_whitespace) {
        return Err(Error::parse(input, "reference contains whitespace"));
    }

    let (working, digest) = split_digest(input);
    let digest = match digest {
        Some(d) if is_digest(d) => Some(d.to_string()),
        Some(d) => {
            debug!("Ignoring unrecognized digest '{}' in {}", d, input);
            None
        }
        None => None,
    };

    let split = split_tag(working);
    let tag = match split.tag {
        Some("") => return Err(Error::parse(input, "empty tag")),
        Some(tag) => tag.to_string(),
        None => DEFAULT_TAG.to_string(),
    };

    let (registry, repository) = split_host(split.name);

    if registry.is_empty() {
        return Err(Error::parse(input, "empty registry host"));
    }
    if repository.is_empty() {
        return Err(Error::parse(input, "empty repository"));
    }
    if repository.starts_with('/') || repository.ends_with('/') || repository.contains("//") {
        return Err(Error::parse(input, "empty repository path component"));
    }
    if repository.contains(':') {
        return Err(Error::parse(
            input,
            "repository contains a colon (registry port without a path?)",
        ));
    }

    trace!(
        "Parsed {} -> registry={} repository={} tag={}",
        input,
        registry,
        repository,
        tag
    );

    Ok(ImageReference {
        registry: registry.to_string(),
        repository: repository.to_string(),
        tag,
        digest,
    })
}

impl ImageReference {
    /// Parse an image reference string like "ghcr.io/org/app:v3.0.0"
    pub fn parse(s: &str) -> Result<Self> {
        parse_image_reference(s)
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_image_reference(s)
    }
}
