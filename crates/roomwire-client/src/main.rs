//! roomwire demo client.
//!
//! Loads `roomwire.yaml`, connects the room channel, joins a room, and logs
//! everything the server pushes. Useful for poking at a live gateway:
//! `RUST_LOG=roomwire_client=debug cargo run`.

use tracing_subscriber::{fmt, EnvFilter};

use roomwire_client::channel::{ChannelSettings, RoomChannel};
use roomwire_client::config;
use roomwire_client::transport::WsConnector;
use roomwire_core::protocol::room::UserDescriptor;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_file("roomwire.yaml").expect("config load failed");
    let settings = ChannelSettings::from_config(&cfg.channel);

    let channel: RoomChannel<WsConnector> = RoomChannel::new(settings, WsConnector);

    channel.on_status(|up| tracing::info!(connected = up, "connection status"));
    channel.on_chat(|m| tracing::info!(from = ?m.from, text = %m.text, "chat"));
    channel.on_user_joined(|u| tracing::info!(user = %u.user.name, "user joined"));
    channel.on_user_left(|u| tracing::info!(user_id = %u.user_id, "user left"));
    channel.on_user_moved(|m| {
        tracing::debug!(user_id = ?m.user_id, x = m.position.x, z = m.position.z, "moved")
    });
    channel.on_agent_message(|m| tracing::info!(text = %m.text, "agent"));

    channel.connect().await.expect("connect failed");
    channel
        .join_room(
            "lobby",
            UserDescriptor {
                id: "demo".into(),
                name: "demo".into(),
                avatar: None,
            },
        )
        .expect("join failed");

    tokio::signal::ctrl_c().await.expect("signal handler failed");
    channel.disconnect().await;
}
