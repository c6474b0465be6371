//! Remote access to the declaration registry
//!
//! `Transport` is the only seam through which the pipeline touches the
//! network. The production implementation drives a blocking `ureq` agent on
//! tokio's blocking pool; tests use `testing::ScriptedTransport`.

pub mod transport;
pub mod locate;

#[cfg(test)]
pub mod testing;

pub use transport::{HttpResponse, Transport, UreqTransport};
pub use locate::{normalize_declaration_url, resolve, version_from_url, virtual_path_for};
