//! Remote image server access.
//!
//! The acquisition core talks to the server only through [`TileTransport`].
//! [`HttpTransport`] is the production implementation: it speaks to a Deep
//! Zoom style viewer/proxy pair and owns the retry policy.
//!
//! ```text
//! Viewer.aspx?ref={page_id}                      -> page listing (HTML)
//! Proxy.ashx?view={page_id}.xml                  -> page descriptor (DZI XML)
//! Proxy.ashx?view={page_id}_files/{zoom}/{x}_{y}.jpg -> tile bytes
//! ```

mod dzi;
mod http;
mod listing;
mod source;

pub use dzi::parse_dzi_descriptor;
pub use http::{
    HttpTransport, HttpTransportConfig, RetryPolicy, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT,
};
pub use listing::{page_id_from_viewer_url, parse_page_list};
pub use source::TileTransport;
