//! Integration test: the TCP transport, one session per connection.

use riverstone::core::error::ErrorKind;
use riverstone::protocol::Request;
use riverstone::service::CharacterService;
use riverstone::store::CharacterStore;
use riverstone::transport::{shutdown_channel, Channel, SocketChannel, SocketServer};
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_sessions_are_per_connection() {
    let dir = TempDir::new().unwrap();
    let service = CharacterService::new(CharacterStore::open(dir.path()).unwrap());
    let server = SocketServer::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (stop_tx, stop_rx) = shutdown_channel();
    let running = tokio::spawn(async move { server.run(&service, stop_rx).await });

    let mut first = SocketChannel::connect(addr, TIMEOUT).await.unwrap();
    let created = first
        .round_trip("create_new_character name=Aria job=Mage")
        .await
        .unwrap();
    assert!(created.contains("\"status\":\"success\""));
    let active = first.call(&Request::GetActiveCharacter).await.unwrap();
    assert_eq!(active.character.unwrap().name, "Aria");
    drop(first);

    let mut second = SocketChannel::connect(addr, TIMEOUT).await.unwrap();
    let active = second.call(&Request::GetActiveCharacter).await.unwrap();
    assert_eq!(active.error, Some(ErrorKind::NoActiveCharacter));

    let names = second.call(&Request::GetCharacterList).await.unwrap();
    assert_eq!(names.names, Some(vec!["Aria".to_string()]));
    drop(second);

    stop_tx.send(true).unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_full_progression_over_socket() {
    let dir = TempDir::new().unwrap();
    let service = CharacterService::new(CharacterStore::open(dir.path()).unwrap());
    let server = SocketServer::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (stop_tx, stop_rx) = shutdown_channel();
    let running = tokio::spawn(async move { server.run(&service, stop_rx).await });

    let mut client = SocketChannel::connect(addr, TIMEOUT).await.unwrap();
    client
        .call(&Request::CreateNewCharacter {
            name: "Vex".into(),
            job: "Rogue".into(),
        })
        .await
        .unwrap();
    client
        .call(&Request::AddExperience { exp_points: 1000 })
        .await
        .unwrap();
    let leveled = client.call(&Request::LevelUp).await.unwrap();
    let vex = leveled.character.unwrap();
    assert_eq!(vex.level, 2);
    assert_eq!(vex.stats.hp, 107);
    assert_eq!(vex.stats.hit_rate, 8);

    let renamed = client
        .call(&Request::UpdateCharacterName {
            new_name: "Vexa".into(),
        })
        .await
        .unwrap();
    assert_eq!(renamed.character.unwrap().name, "Vexa");

    let malformed = client.round_trip("add_experience points").await.unwrap();
    assert!(malformed.contains("\"error\":\"malformed_request\""));

    drop(client);
    stop_tx.send(true).unwrap();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_idle_server() {
    let dir = TempDir::new().unwrap();
    let service = CharacterService::new(CharacterStore::open(dir.path()).unwrap());
    let server = SocketServer::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let (stop_tx, stop_rx) = shutdown_channel();
    let running = tokio::spawn(async move { server.run(&service, stop_rx).await });

    stop_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
