//! Git LFS custom transfer protocol.
//!
//! This module implements the agent side of the protocol git-lfs speaks with a standalone
//! transfer agent: message formats, line framing over stdin/stdout, and the session loop
//! that routes each request to an upload or a download.
//!
//! # Overview
//!
//! git-lfs starts the agent, sends one `init` request and waits for an empty `{}`
//! acknowledgement. It then sends `upload`/`download` requests one at a time; for each
//! one the agent streams `progress` events and finishes with exactly one `complete`
//! event. A `terminate` request, or closing the input, ends the session.
//!
//! ```text
//! -> {"event":"init","operation":"download","remote":"origin"}
//! <- {}
//! -> {"event":"download","oid":"abc","size":3}
//! <- {"event":"progress","oid":"abc","bytesSoFar":3,"bytesSinceLast":3}
//! <- {"event":"complete","oid":"abc","path":"/repo/lfs-download-abc.tmp"}
//! -> {"event":"terminate"}
//! ```
//!
//! # Key Components
//!
//! - [`Request`]: A decoded inbound line.
//! - [`Event`]: An outbound `progress` or `complete` message.
//! - [`ProtocolTransport`]: Line-delimited JSON over a reader/writer pair, flushed per message.
//! - [`serve`]: The session loop; [`TransferAgent`] serves the individual transfers.
//!
//! # Errors
//!
//! A broken handshake, a session that cannot be opened, an undecodable line or a closed
//! output pipe end the session with an [`AgentError`]. Anything that goes wrong inside a
//! single transfer is reported to git-lfs as a `complete` event with error code
//! [`ERROR_CODE_TRANSFER`] and the session carries on.
//!
//! # See Also
//!
//! - [`transfer`](crate::transfer): The chunked copy that produces progress.
//! - [`storage`](crate::storage): Where the object bytes come from and go to.
mod request;
mod response;
mod server;
mod transport;

pub use request::{DownloadRequest, InitRequest, Operation, Request, UploadRequest};
pub use response::{Ack, ERROR_CODE_TRANSFER, Event, TransferError};
pub use server::{AgentError, OperationError, TransferAgent, serve};
pub use transport::{ProtocolTransport, TransportError};
