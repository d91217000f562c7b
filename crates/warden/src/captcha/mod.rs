//! CAPTCHA pool: offline generation and the in-memory image set.
//!
//! Images are rendered ahead of time (`--generate`) and persisted to a
//! single pool file; request handlers only ever sample from the loaded pool.

mod builder;
mod generator;
mod pool;

pub use builder::generate_pool_file;
pub use generator::GlyphRenderer;
pub use pool::Pool;
