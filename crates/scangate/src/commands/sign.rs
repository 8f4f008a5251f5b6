//! Sign and verify commands

use crate::cli::{RequestArgs, SignArgs, VerifyArgs};
use crate::output;
use anyhow::{anyhow, Context, Result};
use scangate_aqua::{sign, verify_request, RequestSigner, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use scangate_core::SystemClock;
use serde::Serialize;
use std::fs;
use std::sync::Arc;

#[derive(Serialize)]
struct SignOutput {
    timestamp: String,
    signature: String,
}

pub fn run(args: SignArgs) -> Result<()> {
    let body = read_body(&args.request)?;
    let method = args.request.method.to_ascii_uppercase();

    let timestamp = match args.timestamp {
        Some(ts) => ts,
        None => RequestSigner::new(Some(&args.request.secret), Arc::new(SystemClock)).timestamp(),
    };

    let signature = sign(&method, &args.request.url, &timestamp, &body, &args.request.secret)
        .context("Failed to sign request")?;

    if args.json {
        return output::json(&SignOutput {
            timestamp,
            signature,
        });
    }

    println!("{}: {}", TIMESTAMP_HEADER, timestamp);
    println!("{}: {}", SIGNATURE_HEADER, signature);
    Ok(())
}

pub fn verify(args: VerifyArgs) -> Result<()> {
    let body = read_body(&args.request)?;
    let method = args.request.method.to_ascii_uppercase();

    if verify_request(
        &method,
        &args.request.url,
        &args.timestamp,
        &body,
        &args.signature,
        &args.request.secret,
    ) {
        output::success("Signature valid");
        Ok(())
    } else {
        output::error("Signature does not match");
        Err(anyhow!("signature verification failed"))
    }
}

fn read_body(args: &RequestArgs) -> Result<Vec<u8>> {
    match (&args.body, &args.body_file) {
        (Some(body), _) => Ok(body.as_bytes().to_vec()),
        (None, Some(path)) => {
            fs::read(path).with_context(|| format!("Failed to read body from {}", path))
        }
        (None, None) => Ok(Vec::new()),
    }
}
