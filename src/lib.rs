pub mod config;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod transfer;

pub use config::{Config, GitConfig, Overrides};
pub use protocol::{ProtocolTransport, serve};
pub use session::{Session, SessionError};
pub use storage::{ByteStore, StoreError};
