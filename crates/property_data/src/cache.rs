mod in_memory;
mod redis_cache;

pub use in_memory::*;
pub use redis_cache::*;
