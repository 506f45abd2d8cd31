// pagesync-client: joins a page's editing room over a duplex socket,
// mirrors the authoritative line list, and pushes ordered line-granular
// commits with pull-then-retry conflict handling.

pub mod client;
pub mod error;
pub mod fetch;
pub mod room;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use error::Error;
pub use fetch::{ensure_editable_page, FetchError, PageFetcher};
pub use room::{PageRoom, PageUpdates, RoomOptions};
pub use stream::EventStream;
pub use transport::{ServerEvent, SocketConnector, SocketTransport};
