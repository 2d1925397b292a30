//! QUIC transport for the client.
//!
//! Provides [`ConnectedClient`], which opens the single bidirectional stream
//! a session lives on and bridges it to a pair of frame channels. Protocol
//! logic stays in the Sans-IO [`crate::Session`].
//!
//! The handle is owned by exactly one runtime. Dropping it (or its
//! [`ConnectionGuard`]) or calling [`ConnectedClient::stop`] ends the
//! connection.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::BytesMut;
use easel_proto::{ALPN_PROTOCOL, Frame};
use quinn::{ClientConfig, Endpoint, RecvStream, SendStream};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Give up on the handshake after this long
    pub connect_timeout: Duration,
    /// Close the connection after this much silence
    pub idle_timeout: Duration,
    /// Keep-alive interval, shorter than the idle timeout
    pub keep_alive_interval: Duration,
    /// Frames buffered in each direction
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            keep_alive_interval: Duration::from_secs(10),
            channel_capacity: 32,
        }
    }
}

impl TransportConfig {
    /// Short timeouts for local servers and tests.
    pub fn development() -> Self {
        Self { connect_timeout: Duration::from_secs(2), ..Self::default() }
    }
}

/// Handle to a connected client with QUIC transport.
///
/// Frames are sent and received via the channels; an internal task handles
/// the QUIC I/O. `from_server` closes when the connection is lost.
pub struct ConnectedClient {
    /// Send frames to the server.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive frames from the server.
    pub from_server: mpsc::Receiver<Frame>,
    guard: ConnectionGuard,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.guard.stop();
    }

    /// Split into the two channels and the guard keeping the connection up.
    pub fn into_parts(self) -> (mpsc::Sender<Frame>, mpsc::Receiver<Frame>, ConnectionGuard) {
        (self.to_server, self.from_server, self.guard)
    }
}

/// Owns the connection task. Dropping it closes the connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectionGuard {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Connect to an Easel server via QUIC with default settings.
pub async fn connect(server_addr: &str) -> Result<ConnectedClient, TransportError> {
    connect_with_config(server_addr, TransportConfig::default()).await
}

/// Connect to an Easel server via QUIC.
///
/// Completes the handshake and opens the session stream before returning.
pub async fn connect_with_config(
    server_addr: &str,
    config: TransportConfig,
) -> Result<ConnectedClient, TransportError> {
    let addr: SocketAddr = server_addr
        .parse()
        .map_err(|e| TransportError::Connection(format!("invalid address: {e}")))?;

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], 0));
    let mut endpoint = Endpoint::client(bind_addr)
        .map_err(|e| TransportError::Connection(format!("endpoint creation failed: {e}")))?;
    endpoint.set_default_client_config(insecure_client_config(&config)?);

    let connecting = endpoint
        .connect(addr, "localhost")
        .map_err(|e| TransportError::Connection(format!("connect failed: {e}")))?;

    let connection = tokio::time::timeout(config.connect_timeout, connecting)
        .await
        .map_err(|_| TransportError::Connection("handshake timed out".to_string()))?
        .map_err(|e| TransportError::Connection(format!("connection failed: {e}")))?;

    let (send, recv) = connection
        .open_bi()
        .await
        .map_err(|e| TransportError::Stream(format!("open_bi failed: {e}")))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(config.channel_capacity.max(1));
    let (from_server_tx, from_server_rx) = mpsc::channel::<Frame>(config.channel_capacity.max(1));

    let handle = tokio::spawn(run_connection(
        endpoint,
        connection,
        send,
        recv,
        to_server_rx,
        from_server_tx,
    ));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        guard: ConnectionGuard { abort_handle: handle.abort_handle() },
    })
}

/// Run the connection, bridging between channels and the session stream.
async fn run_connection(
    endpoint: Endpoint,
    connection: quinn::Connection,
    send: SendStream,
    recv: RecvStream,
    to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<Frame>,
) {
    let reader = tokio::spawn(read_frames(recv, from_server));

    if let Err(e) = write_frames(send, to_server).await {
        tracing::debug!("Outbound stream ended: {}", e);
    }

    reader.abort();
    connection.close(0u32.into(), b"client closed");
    endpoint.wait_idle().await;
}

/// Forward frames from the channel onto the stream, in order.
async fn write_frames(
    mut send: SendStream,
    mut to_server: mpsc::Receiver<Frame>,
) -> Result<(), TransportError> {
    let mut buf = BytesMut::new();

    while let Some(frame) = to_server.recv().await {
        buf.clear();
        frame
            .encode(&mut buf)
            .map_err(|e| TransportError::Protocol(format!("encode failed: {e}")))?;
        send.write_all(&buf)
            .await
            .map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;
    }

    send.finish().map_err(|e| TransportError::Stream(format!("finish failed: {e}")))
}

/// Split the inbound stream into frames and hand them to the runtime.
async fn read_frames(mut recv: RecvStream, from_server: mpsc::Sender<Frame>) {
    let mut buf = BytesMut::with_capacity(4096);
    let mut chunk = vec![0u8; 4096];

    loop {
        loop {
            match Frame::take_from(&mut buf) {
                Ok(Some(frame)) => {
                    if from_server.send(frame).await.is_err() {
                        return;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Dropping connection, undecodable frame: {}", e);
                    return;
                },
            }
        }

        match recv.read(&mut chunk).await {
            Ok(Some(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Inbound stream ended: {}", e);
                return;
            },
        }
    }
}

/// Create an insecure client config that accepts any certificate.
///
/// WARNING: Development only. Production should verify certificates.
fn insecure_client_config(config: &TransportConfig) -> Result<ClientConfig, TransportError> {
    let mut crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
        .with_no_client_auth();

    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(crypto)
        .map_err(|e| TransportError::Connection(format!("invalid TLS config: {e}")))?;
    let mut client_config = ClientConfig::new(Arc::new(crypto));

    let idle_timeout = quinn::IdleTimeout::try_from(config.idle_timeout)
        .map_err(|e| TransportError::Connection(format!("invalid idle timeout: {e}")))?;
    let mut transport = quinn::TransportConfig::default();
    transport.max_idle_timeout(Some(idle_timeout));
    transport.keep_alive_interval(Some(config.keep_alive_interval));
    client_config.transport_config(Arc::new(transport));

    Ok(client_config)
}

/// Certificate verifier that accepts any certificate (insecure, for
/// development).
#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
