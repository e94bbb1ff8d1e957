//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `calen_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("calen_core ping={}", calen_core::ping());
    println!("calen_core version={}", calen_core::core_version());
}
