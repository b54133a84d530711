mod expand;

pub use expand::{expand_env, expand_env_with};
