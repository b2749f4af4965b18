use anyhow::Result;
use session_broker::session;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Session-Broker v{}", env!("CARGO_PKG_VERSION"));

    let sessions = session::enumerate_sessions(None)?;
    info!("Enumerated {} sessions", sessions.len());
    println!("{}", serde_json::to_string_pretty(&sessions)?);

    if let Some(primary) = session::get_primary_active_user_session(None)? {
        info!(
            session_id = primary.session_id,
            station = %primary.station_name,
            "Primary active user session"
        );
        let extended = session::get_extended_session_info(primary.session_id, None)?;
        println!("{}", serde_json::to_string_pretty(&extended)?);
    } else {
        info!("No active user session found");
    }

    Ok(())
}
