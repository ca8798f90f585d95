//! URL handling: normalization (§4.1), host/domain extraction, and
//! wildcard matching for extension/content-type allow-lists.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, registrable_domain, same_domain, same_host};
pub use matcher::matches_wildcard;
pub use normalize::{is_idempotent, normalize_url, normalize_with, NormalizeOptions};
