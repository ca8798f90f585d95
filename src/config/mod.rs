//! Configuration for a crawl session (§6).
//!
//! TOML in, a validated [`Config`] out; [`compute_config_hash`] lets the
//! scheduler detect a changed config across a resumed session.

mod parser;
mod types;
mod validation;

pub use types::{
    AuthConfig, AuthType, Config, CustomRule, FiltersConfig, NormalisationConfig, OutputConfig,
    PolitenessConfig, RedirectPolicy, RedirectsConfig, RobotsConfig, StorageFlags,
    ThresholdsConfig, TraversalConfig, TraversalMode, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
