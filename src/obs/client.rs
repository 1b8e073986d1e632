//! obs-websocket v5 client.
//!
//! Implements the Hello/Identify handshake and the request-response
//! pattern with UUID correlation over a single WebSocket connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::auth::auth_response;
use super::error::ObsError;
use super::InputControl;

/// RPC version this client speaks.
const RPC_VERSION: u32 = 1;

/// How long to wait for a response to a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

/// Client connected and identified to an OBS Studio instance.
///
/// Requests are sent as op 6 messages with a UUID `requestId`; the read
/// pump resolves the matching op 7 response through a pending map. OBS
/// event messages (op 5) are ignored, this client only drives input
/// settings.
pub struct ObsClient {
    write_tx: mpsc::Sender<tungstenite::Message>,
    pending: Pending,
    cancel: CancellationToken,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
}

impl ObsClient {
    /// Connect to obs-websocket and perform the Identify handshake.
    ///
    /// A single attempt: the caller decides whether an unreachable OBS is
    /// fatal. When the server's Hello carries an authentication challenge
    /// the password is required.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, the handshake, or
    /// authentication fails.
    pub async fn connect(host: &str, port: u16, password: Option<&str>) -> Result<Self, ObsError> {
        let url = format!("ws://{host}:{port}");
        let (mut ws, _) = connect_async(url.as_str()).await?;

        let hello = next_json(&mut ws).await?;
        if hello["op"] != 0 {
            return Err(ObsError::Handshake(format!(
                "expected Hello (op 0), got: {hello}"
            )));
        }

        let mut identify = json!({
            "op": 1,
            "d": { "rpcVersion": RPC_VERSION },
        });
        if let Some(auth) = hello["d"].get("authentication") {
            let Some(password) = password else {
                return Err(ObsError::AuthRequired);
            };
            let challenge = auth["challenge"].as_str().unwrap_or_default();
            let salt = auth["salt"].as_str().unwrap_or_default();
            identify["d"]["authentication"] =
                Value::String(auth_response(password, salt, challenge));
        }
        ws.send(tungstenite::Message::text(identify.to_string()))
            .await?;

        // Identified (op 2), or a close frame on bad credentials.
        let identified = next_json(&mut ws).await?;
        if identified["op"] != 2 {
            return Err(ObsError::Handshake(format!(
                "expected Identified (op 2), got: {identified}"
            )));
        }

        let (write, read) = ws.split();
        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(64);
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let write_handle = tokio::spawn(write_pump(write, write_rx, cancel.clone()));
        let read_handle = tokio::spawn(read_pump(
            read,
            Arc::clone(&pending),
            write_tx.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            write_tx,
            pending,
            cancel,
            _read_handle: read_handle,
            _write_handle: write_handle,
        })
    }

    /// Send a request and wait for its response data.
    async fn request(&self, request_type: &str, request_data: Value) -> Result<Value, ObsError> {
        let id = uuid::Uuid::new_v4().to_string();
        let msg = json!({
            "op": 6,
            "d": {
                "requestType": request_type,
                "requestId": id,
                "requestData": request_data,
            },
        });

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        self.write_tx
            .send(tungstenite::Message::text(msg.to_string()))
            .await
            .map_err(|_| ObsError::Closed)?;

        let result = tokio::time::timeout(REQUEST_TIMEOUT, rx).await;

        // Clean up pending entry on any exit path.
        self.pending.lock().await.remove(&id);

        let d = match result {
            Ok(Ok(d)) => d,
            Ok(Err(_)) => return Err(ObsError::Closed),
            Err(_) => return Err(ObsError::Timeout),
        };

        let status = &d["requestStatus"];
        if status["result"].as_bool() != Some(true) {
            return Err(ObsError::RequestFailed {
                code: u16::try_from(status["code"].as_u64().unwrap_or(0)).unwrap_or(0),
                comment: status["comment"].as_str().unwrap_or_default().to_string(),
            });
        }

        Ok(d.get("responseData")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Gracefully close the connection.
    pub async fn close(&self) {
        let _ = self
            .write_tx
            .send(tungstenite::Message::Close(None))
            .await;
        self.cancel.cancel();
    }
}

impl Drop for ObsClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
    }
}

#[async_trait]
impl InputControl for ObsClient {
    async fn input_settings(&self, input: &str) -> Result<Map<String, Value>, ObsError> {
        let data = self
            .request("GetInputSettings", json!({ "inputName": input }))
            .await?;
        Ok(data
            .get("inputSettings")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_input_settings(
        &self,
        input: &str,
        settings: Map<String, Value>,
        overlay: bool,
    ) -> Result<(), ObsError> {
        self.request(
            "SetInputSettings",
            json!({
                "inputName": input,
                "inputSettings": settings,
                "overlay": overlay,
            }),
        )
        .await?;
        Ok(())
    }
}

/// Read the next JSON text message during the handshake phase.
async fn next_json(ws: &mut WsStream) -> Result<Value, ObsError> {
    loop {
        let msg = ws.next().await.ok_or(ObsError::Closed)??;
        match msg {
            tungstenite::Message::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            tungstenite::Message::Ping(payload) => {
                ws.send(tungstenite::Message::Pong(payload)).await?;
            }
            tungstenite::Message::Close(_) => return Err(ObsError::Closed),
            _ => {}
        }
    }
}

/// Forward outgoing messages from the channel to the socket.
async fn write_pump(
    mut write: SplitSink<WsStream, tungstenite::Message>,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                let Some(msg) = msg else { break };
                let is_close = matches!(msg, tungstenite::Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::debug!(error = %e, "OBS write failed");
                    break;
                }
                if is_close {
                    break;
                }
            }
        }
    }
}

/// Resolve op 7 responses against the pending request map.
async fn read_pump(
    mut read: SplitStream<WsStream>,
    pending: Pending,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            msg = read.next() => {
                let Some(msg) = msg else { break };
                match msg {
                    Ok(tungstenite::Message::Text(text)) => {
                        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                            tracing::debug!("Ignoring malformed OBS message");
                            continue;
                        };
                        if value["op"] == 7 {
                            if let Some(id) = value["d"]["requestId"].as_str() {
                                if let Some(tx) = pending.lock().await.remove(id) {
                                    let _ = tx.send(value["d"].clone());
                                }
                            }
                        }
                        // op 5 events are not consumed by this client.
                    }
                    Ok(tungstenite::Message::Ping(payload)) => {
                        let _ = write_tx.send(tungstenite::Message::Pong(payload)).await;
                    }
                    Ok(tungstenite::Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(error = %e, "OBS read failed");
                        break;
                    }
                }
            }
        }
    }
}
