//! Request scheduling for the remote guild API: a single throttled bottleneck with
//! priority/normal admission, plus a client that retries server errors under it.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use client::{ApiClient, ApiClientOptions, ChronicleScope, RosterApi};
pub use dispatcher::{Admission, RequestPermit, RequestScheduler, Turn};
pub use error::ApiError;
pub use transport::{HttpTransport, RawResponse, RemoteRequest, Transport};
