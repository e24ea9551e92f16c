//! Guard hot-path benchmarks
//!
//! ```bash
//! cargo bench --features=benchmarks
//! ```
//!
//! Reports land in `target/criterion/`. Every admitted query pays for one
//! analysis and one rate-limit increment, so those are what is measured.

pub mod analyzer;
