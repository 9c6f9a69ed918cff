use anyhow::Result;
use lockstep_eightball::EXIT_COMMAND;
use lockstep_transport::{Connection, State, TransportConfig};
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use tracing::{debug, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .compact()
        .init();

    let mut server: SocketAddr = "127.0.0.1:12345".parse()?;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server" => {
                server = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing --server value"))?
                    .parse()?;
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let mut conn = Connection::client(server, TransportConfig::default())?;
    conn.connect()?;
    if !conn.is_established() {
        anyhow::bail!("could not reach {server}: handshake gave up in state {}", conn.state());
    }
    info!(%server, "connected");
    println!("Connected to the Magic 8-Ball at {server}. Ask a question, or type '{EXIT_COMMAND}' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("? ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF on stdin behaves like an explicit exit.
            conn.close()?;
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == EXIT_COMMAND {
            conn.close()?;
            break;
        }

        conn.send(question.as_bytes())?;
        let answer = conn.receive()?;
        if answer.is_empty() && conn.state() == State::Closed {
            println!("The server has shut down.");
            break;
        }
        println!("{}", String::from_utf8_lossy(&answer));
    }

    debug!(stats = ?conn.stats(), "client exiting");
    Ok(())
}
