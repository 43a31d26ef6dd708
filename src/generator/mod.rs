//! Short-code minting.
//!
//! Codes are sampled from a fixed alphabet instead of a sequential counter:
//! a counter would serialize every creation and leak creation volume through
//! the codes themselves. Uniqueness comes from the store's atomic
//! `insert_if_absent` — on collision the generator resamples, and after a
//! bounded number of collisions at one length it escalates to a longer code,
//! so code-space exhaustion surfaces as an explicit `CapacityExhausted`
//! instead of an unbounded retry loop.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::errors::{Result, SnaplinkError};
use crate::storage::{Link, LinkStore};

pub struct CodeGenerator {
    alphabet: Vec<char>,
    code_length: usize,
    max_code_length: usize,
    max_retries: u32,
    collision_target: f64,
}

impl CodeGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            alphabet: config.alphabet.chars().collect(),
            code_length: config.code_length,
            max_code_length: config.max_code_length,
            max_retries: config.max_retries,
            collision_target: config.collision_target,
        }
    }

    /// The length the collision target demands at `current_links` stored
    /// codes, when that exceeds the configured starting length.
    ///
    /// Checked at startup against the live store count; a deficit means the
    /// operator should raise `generator.code_length` before the retry loop
    /// starts burning attempts on a crowded length.
    pub fn length_deficit(&self, current_links: u64) -> Option<usize> {
        let required = required_length(current_links, self.collision_target, self.alphabet.len());
        (required > self.code_length).then_some(required)
    }

    /// Sample one candidate code of the given length.
    pub fn sample(&self, length: usize) -> String {
        std::iter::repeat_with(|| self.alphabet[rand::random_range(0..self.alphabet.len())])
            .take(length)
            .collect()
    }

    /// Mint a unique code for `destination` and commit it to the store.
    ///
    /// The store's create-if-absent is the only serialization point:
    /// independent creations never contend. `AlreadyExists` is consumed
    /// here and never escapes to callers.
    pub async fn mint(
        &self,
        store: &Arc<dyn LinkStore>,
        destination: String,
        owner_id: String,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Link> {
        let mut length = self.code_length;

        loop {
            for attempt in 0..self.max_retries {
                let code = self.sample(length);
                let link = Link::new(
                    code.clone(),
                    destination.clone(),
                    owner_id.clone(),
                    expires_at,
                );

                match store.insert_if_absent(link.clone()).await {
                    Ok(()) => {
                        if attempt > 0 {
                            debug!(
                                "CodeGenerator: minted '{}' after {} collision(s)",
                                code, attempt
                            );
                        }
                        return Ok(link);
                    }
                    Err(SnaplinkError::AlreadyExists(_)) => {
                        debug!(
                            "CodeGenerator: collision on '{}' (attempt {}/{}, length {})",
                            code,
                            attempt + 1,
                            self.max_retries,
                            length
                        );
                    }
                    Err(e) => return Err(e),
                }
            }

            if length >= self.max_code_length {
                warn!(
                    "CodeGenerator: {} retries exhausted at max length {}",
                    self.max_retries, self.max_code_length
                );
                return Err(SnaplinkError::capacity_exhausted(format!(
                    "no free code found after {} attempts at length {}",
                    self.max_retries, self.max_code_length
                )));
            }

            // 当前长度碰撞过多，说明该码长空间过满，升长一级
            length += 1;
            warn!("CodeGenerator: escalating code length to {}", length);
        }
    }
}

/// Smallest code length whose birthday collision bound stays below `target`
/// for `projected_links` stored codes.
///
/// Uses the standard approximation P(collision) ≈ n² / (2 * N) with
/// N = alphabet_len^length, evaluated in log-space to avoid overflow.
pub fn required_length(projected_links: u64, target: f64, alphabet_len: usize) -> usize {
    assert!(alphabet_len >= 2, "alphabet must have at least 2 symbols");
    assert!(target > 0.0 && target < 1.0, "target must be in (0, 1)");

    let n = projected_links.max(1) as f64;
    // log2(N) 需要满足: 2*log2(n) - log2(2*target) <= length * log2(alphabet)
    let needed_bits = 2.0 * n.log2() - (2.0 * target).log2();
    let bits_per_char = (alphabet_len as f64).log2();

    (needed_bits / bits_per_char).ceil().max(1.0) as usize
}
