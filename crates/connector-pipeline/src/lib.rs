//! # connector-pipeline
//!
//! The send/receive conversion pipeline shared by every host connector.
//!
//! ## Send
//!
//! A [`DocumentSession`] enumerates the host selection, lets the
//! [`CacheInvalidationPolicy`] evict objects whose conversion settings
//! changed, and hands the selection to the [`RootObjectBuilder`]. The
//! builder separates instance placements ([`InstanceDeduplicator`]),
//! collects shared materials, colors and groups ([`ProxyAggregator`]),
//! converts each object or reuses its cached reference, and assembles a
//! root collection mirroring the host layers.
//!
//! ## Receive
//!
//! [`RootObjectUnpacker`] walks a received root depth-first, pairing each
//! object with the collection chain above it, and reads the proxy tables
//! back by their well-known keys.

pub mod builder;
pub mod dedup;
pub mod error;
pub mod invalidation;
pub mod metrics;
pub mod models;
pub mod proxies;
pub mod session;
pub mod unpacker;

mod tree;

pub use builder::RootObjectBuilder;
pub use dedup::{InstanceDeduplicator, UnpackedSelection};
pub use error::BuildError;
pub use invalidation::CacheInvalidationPolicy;
pub use metrics::{BuildMetrics, MetricsSnapshot};
pub use models::{
    BuildOutcome, BuildProgress, BuildRequest, BuildState, ConversionResult, ProgressReporter,
    RootObjectBuild,
};
pub use proxies::ProxyAggregator;
pub use session::DocumentSession;
pub use unpacker::{ObjectTraversal, OrphanReference, RootObjectUnpacker, TraversalContext, UnpackedRoot};
