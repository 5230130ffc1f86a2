//! Session/protocol client
//!
//! Serializes protocol commands onto the outbound line writer and tracks the
//! role the client believes it holds.
//!
//! ## Optimistic roles
//!
//! The server never sends a reliable ACK for authentication, so the role
//! changes as soon as the corresponding lines are *sent*. A wrong admin token
//! leaves a session that believes it is Admin while the server ignores its
//! commands. This mirrors the server protocol as deployed.

pub mod poll;

pub use poll::spawn_poller;

use std::fmt;

use tokio::io::AsyncWrite;

use crate::error::{CoreError, Result};
use crate::protocol::{LineCodec, WireFormat};
use crate::transport::{Closer, LineWriter};
use crate::types::{ProtocolCommand, Verb};

/// Role the client holds for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Unauthenticated,
    Observer,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Unauthenticated => "UNAUTHENTICATED",
            Role::Observer => "OBSERVER",
            Role::Admin => "ADMIN",
        })
    }
}

/// Role asked for during the handshake
#[derive(Clone, PartialEq, Eq)]
pub enum RoleRequest {
    Observer,
    Admin { token: String },
}

impl RoleRequest {
    pub fn is_admin(&self) -> bool {
        matches!(self, RoleRequest::Admin { .. })
    }
}

// Manual Debug keeps the token out of logs
impl fmt::Debug for RoleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRequest::Observer => f.write_str("Observer"),
            RoleRequest::Admin { .. } => f.write_str("Admin { token: <redacted> }"),
        }
    }
}

/// Protocol client over one connection's outbound half
pub struct Session<W> {
    writer: LineWriter<W>,
    format: WireFormat,
    role: Role,
}

impl<W> Session<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: LineWriter<W>, format: WireFormat) -> Self {
        Self {
            writer,
            format,
            role: Role::Unauthenticated,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn closer(&self) -> &Closer {
        self.writer.closer()
    }

    /// Greet the server, subscribe and optionally claim the admin role
    ///
    /// - Tokenized: `HELLO TLP/1.0`, `SUBSCRIBE`, then `AUTH ADMIN <token>`
    /// - JSON: a HELLO frame carrying the role (and token), then one
    ///   `GET_DATA` so the first snapshot arrives before the next push
    ///
    /// The role moves out of `Unauthenticated` exactly once, after the last
    /// line is sent.
    pub async fn handshake(&mut self, request: &RoleRequest) -> Result<Role> {
        if self.role != Role::Unauthenticated {
            return Err(CoreError::InvalidState(format!(
                "handshake already done (role {})",
                self.role
            )));
        }

        match (self.format, request) {
            (WireFormat::Tokenized, _) => {
                self.send(&ProtocolCommand::Hello).await?;
                self.send(&ProtocolCommand::Subscribe).await?;
                if let RoleRequest::Admin { token } = request {
                    self.send(&ProtocolCommand::AuthAdmin {
                        token: token.clone(),
                    })
                    .await?;
                }
            }
            (WireFormat::JsonFragment, RoleRequest::Observer) => {
                self.send(&ProtocolCommand::Hello).await?;
                self.send(&ProtocolCommand::GetData).await?;
            }
            (WireFormat::JsonFragment, RoleRequest::Admin { token }) => {
                self.send(&ProtocolCommand::AuthAdmin {
                    token: token.clone(),
                })
                .await?;
                self.send(&ProtocolCommand::GetData).await?;
            }
        }

        self.role = if request.is_admin() {
            tracing::warn!("Admin role assumed without server confirmation");
            Role::Admin
        } else {
            Role::Observer
        };
        tracing::info!(role = %self.role, format = %self.format, "Handshake sent");
        Ok(self.role)
    }

    pub async fn hello(&mut self) -> Result<()> {
        self.send(&ProtocolCommand::Hello).await
    }

    pub async fn subscribe(&mut self) -> Result<()> {
        self.send(&ProtocolCommand::Subscribe).await
    }

    /// Send the admin token and assume the admin role
    ///
    /// Only valid after `handshake`. The token is sent in cleartext. Only the
    /// server can reject it, and a rejection does not downgrade the local role.
    pub async fn auth_admin(&mut self, token: &str) -> Result<()> {
        if self.role == Role::Unauthenticated {
            return Err(CoreError::InvalidState("auth_admin before handshake".into()));
        }

        self.send(&ProtocolCommand::AuthAdmin {
            token: token.to_string(),
        })
        .await?;

        if self.role != Role::Admin {
            tracing::warn!(from = %self.role, "Admin role assumed without server confirmation");
            self.role = Role::Admin;
        }
        Ok(())
    }

    pub async fn list_users(&mut self) -> Result<()> {
        self.send(&ProtocolCommand::ListUsers).await
    }

    /// Send a movement command. Rejected locally unless the role is Admin.
    pub async fn command(&mut self, verb: Verb) -> Result<()> {
        self.send(&ProtocolCommand::Command(verb)).await
    }

    /// Request an immediate telemetry snapshot (JSON format only)
    pub async fn get_data(&mut self) -> Result<()> {
        self.send(&ProtocolCommand::GetData).await
    }

    /// Liveness check (JSON format only)
    pub async fn ping(&mut self) -> Result<()> {
        self.send(&ProtocolCommand::Ping).await
    }

    /// Close both directions of the connection
    ///
    /// The listener sees end-of-stream and stops cleanly.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.writer.closer().is_closed() {
            return Ok(());
        }
        self.writer.closer().close();
        tracing::info!("Disconnected");
        // Peer may already be gone; the local close is what matters
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("Shutdown after close failed: {}", e);
        }
        Ok(())
    }

    async fn send(&mut self, cmd: &ProtocolCommand) -> Result<()> {
        if cmd.requires_admin() && self.role != Role::Admin {
            tracing::warn!(role = %self.role, "Refusing {} without admin role", cmd.name());
            return Err(CoreError::PermissionDenied {
                command: cmd.name(),
            });
        }

        let line = LineCodec::encode(cmd, self.format)?;
        self.writer.send_line(&line).await?;
        tracing::debug!("Sent {}", cmd.name());
        Ok(())
    }
}
