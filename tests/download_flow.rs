// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! End-to-end download flow over scripted transport channels.

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use powermax_lan_bridge::protocol::download_sequence;
use powermax_lan_bridge::{
    ArmMode, ConnectionStatus, OperatingMode, PanelConfig, PanelConnection, PanelEvent,
    PanelMessage, PanelType, SendMessage,
};

fn test_config() -> PanelConfig {
    PanelConfig::builder()
        .panel_type(PanelType::PowerMaxPro)
        .pin_code("1234")
        .allow_arming(true)
        .allow_disarming(true)
        .build()
}

async fn wait_for_status(
    events: &mut powermax_lan_bridge::EventReceiver,
    wanted: ConnectionStatus,
) {
    // Generous bound: paused-clock tests auto-advance through the retry
    // delays, so virtual minutes can pass before the wanted status shows up
    timeout(Duration::from_secs(3600), async {
        loop {
            match events.recv().await {
                Ok(PanelEvent::StatusChanged(status)) if status == wanted => break,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {:?}", e),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}", wanted));
}

#[tokio::test]
async fn full_download_reaches_enhanced_mode() {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(256);
    let connection = PanelConnection::spawn(test_config(), outbound_tx).unwrap();
    let mut events = connection.subscribe();
    let messages = connection.message_sender();

    // Collect the read commands of the download pass
    let sequence = download_sequence(PanelType::PowerMaxPro);
    let mut reads = Vec::new();
    while reads.len() < sequence.len() {
        match timeout(Duration::from_secs(5), outbound_rx.recv()).await.unwrap() {
            Some(SendMessage::ReadSettings(cmd)) => {
                if !reads.contains(&cmd) {
                    reads.push(cmd);
                }
            }
            Some(_) => continue,
            None => panic!("outbound channel closed"),
        }
    }
    assert_eq!(reads.len(), sequence.len());

    // Answer every range, then signal the end of the exchange
    for cmd in reads {
        let (page, index) = cmd.origin();
        messages
            .send(PanelMessage::SettingsChunk { index, page, data: vec![0x20; cmd.length()] })
            .await
            .unwrap();
    }
    messages.send(PanelMessage::DownloadComplete).await.unwrap();

    wait_for_status(
        &mut events,
        ConnectionStatus::Operational(OperatingMode::Enhanced),
    )
    .await;
    assert_eq!(
        connection.status(),
        ConnectionStatus::Operational(OperatingMode::Enhanced)
    );

    connection.shutdown().await;
    connection.join().await;
}

#[tokio::test(start_paused = true)]
async fn failed_downloads_fall_back_to_standard_mode() {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(256);
    let connection = PanelConnection::spawn(test_config(), outbound_tx).unwrap();
    let mut events = connection.subscribe();

    // Never answer any read command: all three attempts must expire, then
    // the connection settles in standard mode
    wait_for_status(
        &mut events,
        ConnectionStatus::Operational(OperatingMode::Standard),
    )
    .await;

    // Three download passes were issued before giving up
    let mut starts = 0;
    while let Ok(msg) = outbound_rx.try_recv() {
        if msg == SendMessage::StartDownload {
            starts += 1;
        }
    }
    assert_eq!(starts, 3);

    connection.shutdown().await;
    connection.join().await;
}

#[tokio::test(start_paused = true)]
async fn arm_gated_until_operational() {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(256);
    let connection = PanelConnection::spawn(test_config(), outbound_tx).unwrap();
    let mut events = connection.subscribe();

    // Still downloading: commands are rejected
    let err = connection.arm(ArmMode::Armed).await.unwrap_err();
    assert!(matches!(
        err,
        powermax_lan_bridge::PowermaxError::CommandRejected(_)
    ));

    wait_for_status(
        &mut events,
        ConnectionStatus::Operational(OperatingMode::Standard),
    )
    .await;

    // Standard mode with a configured PIN: arming goes through
    connection.arm(ArmMode::Armed).await.unwrap();
    let mut armed = false;
    while let Ok(msg) = outbound_rx.try_recv() {
        if let SendMessage::Arm { mode, pin } = msg {
            assert_eq!(mode, ArmMode::Armed);
            assert_eq!(pin, "1234");
            armed = true;
        }
    }
    assert!(armed);

    // Bypass stays rejected without enhanced mode
    let err = connection.bypass(1, true).await.unwrap_err();
    assert!(matches!(
        err,
        powermax_lan_bridge::PowermaxError::CommandRejected(_)
    ));

    connection.shutdown().await;
    connection.join().await;
}
