//! Example: Spawn a panel connection and print the decoded settings once
//! the download finishes.
//!
//! The connection is transport-agnostic: commands come out of `outbound_rx`
//! and panel reports go in through `message_sender()`. Wire both to your
//! Powerlink LAN adapter; here the outbound side is just printed.

use powermax_lan_bridge::{PanelConfig, PanelConnection, PanelEvent, PanelType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .panel_type(PanelType::PowerMaxPro)
        .pin_code("1234")
        .auto_sync_time(true)
        .build();

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(64);
    let connection = PanelConnection::spawn(config, outbound_tx)?;

    // Feed panel reports in with this from your transport task:
    let _messages = connection.message_sender();

    let mut events = connection.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let PanelEvent::SettingsUpdated { settings, complete } = event {
                println!("--- Settings (complete: {complete}) ---");
                print!("{settings}");
            }
        }
    });

    println!("Commands the connection wants to send (Ctrl+C to stop):");
    loop {
        tokio::select! {
            cmd = outbound_rx.recv() => {
                match cmd {
                    Some(cmd) => println!("  -> {cmd:?}"),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.shutdown().await;
    connection.join().await;
    Ok(())
}
