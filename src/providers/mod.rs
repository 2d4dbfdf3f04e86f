//! Balance feed: the source abstraction, an HTTP implementation and the
//! polling service.

pub mod http;
pub mod poller;
pub mod traits;

pub use http::HttpBalanceSource;
pub use poller::BalancePoller;
pub use traits::{BalanceSource, BalanceSourceError};
