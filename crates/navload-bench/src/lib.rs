//! navload Benchmark Suite
//!
//! Criterion benchmarks comparing per-parent relationship loading against
//! batched hash-join loading.
//!
//! # Benchmark Categories
//!
//! - **Load**: Naive per-parent queries vs one query per hop
//! - **Multi-hop**: Cascading through `posts.comments`
//! - **Modifiers**: Pushed-down vs in-memory `Where`/`OrderBy`
//! - **Resolve**: Path resolution with and without the resolution cache

pub mod fixtures;
pub mod harness;

pub use fixtures::{generate_comments, generate_posts, generate_users, Scale};
pub use harness::TestContext;
