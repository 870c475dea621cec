//! Public tracking-code generation.
//!
//! Codes look like `EXP-2025-K3HT-9WQX`. The 8-character body is drawn
//! uniformly from an alphabet that excludes 0/O/1/I so codes survive being
//! read over a counter or a phone call. Uniqueness is not guaranteed here;
//! the `documents.tracking_code` unique constraint is authoritative and
//! callers regenerate on a violation.

use chrono::{Datelike, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const BODY_LEN: usize = 8;

/// Source of candidate tracking codes. The seam exists so tests can pin
/// the produced codes and exercise the collision-retry path.
pub trait CodeGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_tracking_code()
    }
}

pub fn generate_tracking_code() -> String {
    generate_for_year(Utc::now().year())
}

fn generate_for_year(year: i32) -> String {
    let mut rng = rand::thread_rng();
    let mut body = String::with_capacity(BODY_LEN + 1);
    for i in 0..BODY_LEN {
        if i == 4 {
            body.push('-');
        }
        let idx = rng.gen_range(0..ALPHABET.len());
        body.push(ALPHABET[idx] as char);
    }
    format!("EXP-{year}-{body}")
}
