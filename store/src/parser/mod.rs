//! Parsing pipeline: serialized RDF in, batches of quads out.
//!
//! Parsing runs on a dedicated worker thread ([`worker::ParseWorker`]) and
//! talks to the host only through the messages in [`protocol`]. The host
//! drives a [`worker::ParseSession`] and acknowledges each batch before the
//! worker produces the next one.

pub mod format;
pub mod prefixes;
pub mod protocol;
pub mod worker;

pub use format::RdfFormat;
pub use protocol::{canonicalize_quad, HostMessage, RequestId, WireQuad, WireTerm, WorkerMessage};
pub use worker::{ParseSession, ParseWorker, DEFAULT_BATCH_SIZE};
