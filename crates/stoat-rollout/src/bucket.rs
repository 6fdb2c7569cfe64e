//! Deterministic cohort bucketing
//!
//! A tenant's bucket for a feature is the first eight bytes of
//! `SHA-256("{tenant}_{feature}")`, read big-endian, modulo 100. The value is
//! independent of the rollout percentage and of the process, so raising the
//! percentage only ever adds tenants to the cohort.

use sha2::{Digest, Sha256};
use stoat_core::TenantId;

/// Number of buckets; percentages index into `0..BUCKETS`.
pub const BUCKETS: u64 = 100;

/// Bucket in `0..100` for `tenant` and `feature`.
pub fn bucket(tenant: &TenantId, feature: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(tenant.as_str().as_bytes());
    hasher.update(b"_");
    hasher.update(feature.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % BUCKETS) as u8
}

/// Whether a bucket falls inside a cohort of `percentage` percent.
pub fn in_cohort(bucket: u8, percentage: u8) -> bool {
    bucket < percentage
}
