use anyhow::Result;
use lockstep_eightball::{random_reply, SHUTDOWN_COMMAND};
use lockstep_transport::{Connection, State, TransportConfig, TransportError};
use std::net::SocketAddr;
use tracing::{info, warn};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let mut bind: SocketAddr = "0.0.0.0:12345".parse()?;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                bind = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing --bind value"))?
                    .parse()?;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let mut rng = rand::rng();
    let mut conn = Connection::server(bind, TransportConfig::default())?;
    if let Some(addr) = conn.local_addr() {
        info!(%addr, "eightball server listening");
    }

    loop {
        conn.ensure_established()?;

        let question = match conn.receive() {
            Ok(question) => question,
            Err(TransportError::ProtocolViolation { state, kind }) => {
                warn!(%state, ?kind, "protocol violation; dropping client");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if question.is_empty() && conn.state() == State::Closed {
            // Peer hung up; go back to listening for the next client.
            info!("client disconnected");
            continue;
        }

        let question = String::from_utf8_lossy(&question);
        info!(%question, "question received");

        if question == SHUTDOWN_COMMAND {
            warn!("shutdown command received, closing");
            conn.close()?;
            break;
        }

        let reply = random_reply(&mut rng);
        conn.send(reply.as_bytes())?;
        info!(%reply, "reply sent");
    }

    info!(stats = ?conn.stats(), "server exiting");
    Ok(())
}
