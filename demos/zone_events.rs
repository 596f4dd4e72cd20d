//! Example: Subscribe to panel events and print zone activity.

use powermax_lan_bridge::{PanelConfig, PanelConnection, PanelEvent, PanelType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::builder()
        .panel_type(PanelType::PowerMaxPro)
        .pin_code("1234")
        .build();

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(64);
    let connection = PanelConnection::spawn(config, outbound_tx)?;

    // A real application forwards these to the panel and feeds replies
    // back through connection.message_sender()
    tokio::spawn(async move { while outbound_rx.recv().await.is_some() {} });

    let mut events = connection.subscribe();

    println!("Listening for panel events (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(PanelEvent::StateChanged(state)) => {
                        for (i, zone) in state.zones.iter().enumerate() {
                            if zone.is_tripped() {
                                println!("Zone {} tripped", i + 1);
                            }
                        }
                        println!("armed={:?} ready={:?} alarm={}", state.armed, state.ready, state.alarm_active);
                    }
                    Ok(PanelEvent::ZoneSettingsUpdated { zone }) => {
                        println!("Zone {} settings changed", zone);
                    }
                    Ok(PanelEvent::Disconnected) => {
                        println!("Panel disconnected!");
                    }
                    Ok(event) => {
                        println!("Event: {event:?}");
                    }
                    Err(_) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.shutdown().await;
    connection.join().await;
    Ok(())
}
