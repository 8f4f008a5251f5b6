//! Parse command

use crate::cli::ParseArgs;
use crate::output;
use anyhow::{Context, Result};
use camino::Utf8Path;
use scangate_image::ImageReference;
use serde::Serialize;

#[derive(Serialize)]
struct ParseOutput<'a> {
    reference: &'a ImageReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    mirrored: Option<&'a ImageReference>,
}

pub fn run(args: ParseArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let reference = ImageReference::parse(&args.reference)
        .with_context(|| format!("Cannot parse '{}'", args.reference))?;

    let mirrored = if args.mirrored {
        let config = super::load_config(config_path)?;
        Some(reference.mirrored(config.mirrors()))
    } else {
        None
    };

    if args.json {
        return output::json(&ParseOutput {
            reference: &reference,
            mirrored: mirrored.as_ref(),
        });
    }

    output::header(&reference.to_string());
    output::kv("Registry", &reference.registry);
    output::kv("Repository", &reference.repository);
    output::kv("Tag", &reference.tag);
    output::kv("Digest", reference.digest.as_deref().unwrap_or("-"));

    if let Some(mirrored) = mirrored {
        output::kv("Fetch from", &mirrored.to_string());
    }

    Ok(())
}
