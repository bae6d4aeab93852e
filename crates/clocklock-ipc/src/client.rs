//! Client side of the clocklockd socket

use clocklock_api::{Command, Event, Request, Response, ResponsePayload, ResponseResult};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::{IpcError, IpcResult};

/// Read one line and decode it. EOF is `ConnectionClosed`.
async fn read_message<T: DeserializeOwned>(
    reader: &mut BufReader<OwnedReadHalf>,
) -> IpcResult<T> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::ConnectionClosed);
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// Request/response connection to clocklockd
pub struct IpcClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let (read_half, write_half) = UnixStream::connect(socket_path).await?.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            next_request_id: 1,
        })
    }

    /// Send one command and wait for its response, error responses included
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut line = serde_json::to_string(&Request::new(request_id, command))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let response: Response = read_message(&mut self.reader).await?;
        if response.request_id != request_id {
            return Err(IpcError::MismatchedResponse {
                expected: request_id,
                got: response.request_id,
            });
        }
        Ok(response)
    }

    /// Like `send`, but an error response becomes `IpcError::Rejected`
    pub async fn call(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(info) => Err(IpcError::Rejected(info)),
        }
    }

    /// Turn this connection into an event feed
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        self.call(Command::SubscribeEvents).await?;
        Ok(EventStream {
            reader: self.reader,
        })
    }
}

/// Events pushed by clocklockd after `subscribe`
pub struct EventStream {
    reader: BufReader<OwnedReadHalf>,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        read_message(&mut self.reader).await
    }
}
