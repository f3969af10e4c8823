//! Cross-module lifecycle checks for [`NfsClient`]'s state machine that
//! don't require a live server: the v3 path has no I/O before the first
//! `MNT`, so every state-guard branch below is reachable without a socket.

use nfs_mamont_client::error::Error;
use nfs_mamont_client::facade::options::{ConnectOptions, NfsVersion};
use nfs_mamont_client::facade::NfsClient;
use std::net::{IpAddr, Ipv4Addr};

fn unreachable_server() -> IpAddr {
    // TEST-NET-1 (RFC 5737): guaranteed to never answer, which is fine since
    // none of the paths exercised here touch the network.
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
}

fn v3_client() -> NfsClient {
    NfsClient::new(unreachable_server(), NfsVersion::V3, ConnectOptions::default())
}

#[tokio::test]
async fn connect_twice_is_rejected() {
    let mut client = v3_client();
    client.connect().await.unwrap();
    let second = client.connect().await;
    assert!(matches!(second, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn mount_before_connect_is_rejected() {
    let mut client = v3_client();
    let result = client.mount_device("/srv/nfs").await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn unmount_without_a_mount_is_rejected() {
    let mut client = v3_client();
    client.connect().await.unwrap();
    let result = client.unmount_device().await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn disconnect_without_a_mount_succeeds() {
    let mut client = v3_client();
    client.connect().await.unwrap();
    assert!(client.disconnect().await.is_ok());
}

#[tokio::test]
async fn operations_without_an_active_mount_fail_before_any_io() {
    let mut client = v3_client();
    client.connect().await.unwrap();

    assert!(matches!(client.get_item_list(".").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.get_item_attributes("a").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.is_directory("a").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.create_file("a").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.delete_file("a").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.read("a", 0, 10).await, Err(Error::InvalidState(_))));
    assert!(matches!(client.write("a", 0, &[1, 2, 3]).await, Err(Error::InvalidState(_))));
    assert!(matches!(client.set_file_size("a", 0).await, Err(Error::InvalidState(_))));
    assert!(matches!(client.move_item("a", "b").await, Err(Error::InvalidState(_))));
    assert!(matches!(client.health_check().await, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn keepalive_is_a_no_op_for_v3_without_a_session() {
    let mut client = v3_client();
    client.connect().await.unwrap();
    // v4-only behavior; a v3 client should never error here even unmounted.
    assert!(client.keepalive_if_idle().await.is_ok());
}

#[test]
fn fresh_client_starts_disconnected() {
    let client = v3_client();
    assert_eq!(client.state(), nfs_mamont_client::facade::ClientState::Disconnected);
}

#[tokio::test]
async fn sweep_cache_is_a_no_op_without_handle_cache_enabled() {
    let client = v3_client();
    // ConnectOptions::default() has use_handle_cache = false; this must not panic.
    client.sweep_cache();
}

#[tokio::test]
async fn subscribing_to_transfer_events_before_any_transfer_yields_no_backlog() {
    let client = v3_client();
    let rx = client.subscribe_transfers(8);
    assert!(rx.try_recv().is_err());
}
