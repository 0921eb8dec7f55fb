use std::{
    error::Error as StdError,
    fs::File,
    io::{self, BufRead, Read, Write},
    path::PathBuf,
};

use log::{debug, error, info};
use thiserror::Error;

use crate::{
    session::{PartialFile, Session},
    storage::StoreError,
    transfer::{Progress, transfer},
};

use super::{
    DownloadRequest, Event, InitRequest, ProtocolTransport, Request, UploadRequest,
    transport::TransportError,
};

/// Failures that end the agent process.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("failed to open session: {0}")]
    Session(#[source] Box<dyn StdError + Send + Sync>),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of a single transfer; reported to git-lfs, never fatal.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("failed to {action} {}: {source}", path.display())]
    Local {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("transfer interrupted: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Rejected(String),

    /// The progress stream to git-lfs broke; the session cannot continue.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Runs one agent session over `transport`.
///
/// The first request must be `init`; only then is `open_session` called, and the empty
/// acknowledgement is written once it succeeded. Requests are then served one at a time
/// until `terminate` or the end of input. Returns the number of transfer requests served.
pub fn serve<R, W, F, E>(
    transport: &mut ProtocolTransport<R, W>,
    open_session: F,
) -> Result<usize, AgentError>
where
    R: BufRead,
    W: Write,
    F: FnOnce(&InitRequest) -> Result<Session, E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let init = match transport.read_request()? {
        Some(Request::Init(init)) => init,
        Some(other) => {
            return Err(AgentError::Handshake(format!(
                "expected 'init', got {other:?}"
            )));
        }
        None => {
            return Err(AgentError::Handshake(
                "input closed before 'init'".to_string(),
            ));
        }
    };
    debug!("handshake: {init:?}");

    let session = open_session(&init).map_err(|e| AgentError::Session(e.into()))?;
    transport.write_ack()?;

    let agent = TransferAgent::new(&session);
    let mut served = 0;

    loop {
        match transport.read_request()? {
            None => {
                info!("input closed after {served} requests");
                break;
            }
            Some(Request::Terminate) => {
                info!("terminated after {served} requests");
                break;
            }
            Some(Request::Init(_)) => {
                return Err(AgentError::Handshake(
                    "unexpected 'init' after handshake".to_string(),
                ));
            }
            Some(request) => {
                agent.dispatch(request, transport)?;
                served += 1;
            }
        }
    }

    Ok(served)
}

/// Routes transfer requests to the session's store.
pub struct TransferAgent<'a> {
    session: &'a Session,
}

impl<'a> TransferAgent<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Serves one request, writing its progress and exactly one `complete` event.
    ///
    /// Only a failure to write to git-lfs is returned; every other failure becomes an
    /// error `complete` event.
    pub fn dispatch<R: BufRead, W: Write>(
        &self,
        request: Request,
        transport: &mut ProtocolTransport<R, W>,
    ) -> Result<(), TransportError> {
        let mut emit = |event: &Event| transport.write_event(event);
        let (oid, result) = match request {
            Request::Download(req) => {
                let result = self.download(&req, &mut emit);
                (req.oid, result)
            }
            Request::Upload(req) => {
                let result = self.upload(&req, &mut emit);
                (req.oid, result)
            }
            Request::Unknown { event, oid } => (
                oid,
                Err(OperationError::Rejected(format!(
                    "unsupported event '{event}'"
                ))),
            ),
            Request::Malformed { oid, reason } => (oid, Err(OperationError::Rejected(reason))),
            other @ (Request::Init(_) | Request::Terminate) => {
                return Err(TransportError::Protocol(format!(
                    "{other:?} is not a transfer request"
                )));
            }
        };

        let complete = completion(&oid, result)?;
        transport.write_event(&complete)
    }

    /// Streams object `oid` into `lfs-download-<oid>.tmp`. The file is removed again if
    /// anything fails before it is complete.
    pub fn download<F>(
        &self,
        req: &DownloadRequest,
        emit: &mut F,
    ) -> Result<Event, OperationError>
    where
        F: FnMut(&Event) -> Result<(), TransportError>,
    {
        let path = self.session.download_path(&req.oid);
        debug!(
            "downloading {}/{} ({} bytes) to {}",
            self.session.url(),
            req.oid,
            req.size,
            path.display()
        );

        let mut source = self.session.store().open_read(&req.oid)?;
        let mut destination =
            PartialFile::create(path.clone()).map_err(|source| OperationError::Local {
                action: "create",
                path,
                source,
            })?;

        let bytes = transfer(&req.oid, &mut source, &mut destination, |p| {
            report(&mut *emit, p)
        })?;
        let path = destination.finish()?;

        debug!("downloaded {} ({bytes} bytes)", req.oid);
        Ok(Event::downloaded(&req.oid, path))
    }

    /// Streams the local file at `req.path` into object `oid`. The object is only
    /// committed once every byte was written.
    pub fn upload<F>(
        &self,
        req: &UploadRequest,
        emit: &mut F,
    ) -> Result<Event, OperationError>
    where
        F: FnMut(&Event) -> Result<(), TransportError>,
    {
        debug!(
            "uploading {} ({} bytes) to {}/{}",
            req.path.display(),
            req.size,
            self.session.url(),
            req.oid
        );

        let mut source = File::open(&req.path).map_err(|source| OperationError::Local {
            action: "open",
            path: req.path.clone(),
            source,
        })?;
        self.upload_from(&req.oid, &mut source, emit)
    }

    /// Streams `source` into object `oid`, committing it only after the last chunk.
    pub fn upload_from<R, F>(
        &self,
        oid: &str,
        source: &mut R,
        emit: &mut F,
    ) -> Result<Event, OperationError>
    where
        R: Read + ?Sized,
        F: FnMut(&Event) -> Result<(), TransportError>,
    {
        let mut destination = self.session.store().open_write(oid)?;

        let bytes = transfer(oid, source, &mut destination, |p| report(&mut *emit, p))?;
        destination.commit()?;

        debug!("uploaded {oid} ({bytes} bytes)");
        Ok(Event::uploaded(oid))
    }
}

/// The `complete` event closing a transfer. Only a broken progress stream escapes.
fn completion(oid: &str, result: Result<Event, OperationError>) -> Result<Event, TransportError> {
    match result {
        Ok(complete) => Ok(complete),
        Err(OperationError::Transport(e)) => Err(e),
        Err(e) => {
            error!("transfer of {oid} failed: {e:?}");
            Ok(Event::failed(oid, e.to_string()))
        }
    }
}

fn report<F>(emit: &mut F, progress: &Progress<'_>) -> Result<(), OperationError>
where
    F: FnMut(&Event) -> Result<(), TransportError>,
{
    emit(&Event::Progress {
        oid: progress.oid.to_string(),
        bytes_so_far: progress.bytes_so_far,
        bytes_since_last: progress.bytes_since_last,
    })?;
    Ok(())
}
