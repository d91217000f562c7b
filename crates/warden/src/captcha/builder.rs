//! Offline pool builder (`--generate N`).
//!
//! Renders CAPTCHAs in parallel batches until `n` distinct answer hashes
//! are collected, then writes the pool file.

use base64::{Engine, engine::general_purpose::STANDARD};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use warden_common::WardenError;
use warden_common::crypto::hash;

use super::generator::CaptchaRenderer;
use super::pool::Pool;

/// Upper bound on CAPTCHAs rendered per parallel batch
const BATCH_SIZE: usize = 256;

/// Render `n` unique CAPTCHAs into a pool
pub fn build_pool(renderer: &dyn CaptchaRenderer, n: usize) -> Result<Pool, WardenError> {
    if n == 0 {
        return Err(WardenError::Pool("pool size must be positive".to_string()));
    }

    let pb = ProgressBar::new(n as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40} {pos}/{len} unique CAPTCHAs")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let start = Instant::now();
    let mut map: HashMap<String, String> = HashMap::with_capacity(n);
    let mut duplicates = 0usize;

    while map.len() < n {
        let wanted = (n - map.len()).min(BATCH_SIZE);

        let batch = (0..wanted)
            .into_par_iter()
            .map(|_| renderer.render())
            .collect::<Result<Vec<_>, _>>()?;

        for captcha in batch {
            if map.len() == n {
                break;
            }
            let key = hash(&[captcha.text.to_uppercase().as_str()]);
            if map.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            map.insert(key, STANDARD.encode(&captcha.jpeg));
        }

        pb.set_position(map.len() as u64);
    }

    pb.finish_and_clear();
    tracing::info!(
        count = map.len(),
        duplicates,
        elapsed = ?start.elapsed(),
        "Generated unique CAPTCHAs"
    );

    Pool::from_map(map)
}

/// Build a pool of `n` CAPTCHAs and write it to `path`
pub fn generate_pool_file(
    path: &Path,
    n: usize,
    renderer: &dyn CaptchaRenderer,
) -> Result<Pool, WardenError> {
    let pool = build_pool(renderer, n)?;
    pool.save(path)?;
    tracing::info!(count = pool.len(), path = ?path, "CAPTCHA pool written");
    Ok(pool)
}
