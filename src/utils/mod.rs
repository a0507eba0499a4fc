pub mod keyed_mutex;
pub mod retry;

pub use keyed_mutex::KeyedMutex;
pub use retry::{retry_on_transient, IsTransient, RetryConfig};
