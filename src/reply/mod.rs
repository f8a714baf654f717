pub mod fallback;
pub mod normalize;
pub mod quick;

pub use fallback::{FallbackSelector, Topic};
pub use normalize::{NormalizeError, Normalizer, ProviderResponse};
pub use quick::QuickReplyCache;
