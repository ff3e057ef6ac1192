use std::thread;
use std::time::Duration;

use iec104::client;
use iec104::server::Server;
use iec104::types::Measurement;

fn spawn_server() -> std::net::SocketAddr {
    let _ = env_logger::try_init();
    let server = Server::builder().bind_addr("127.0.0.1:0").build().unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || {
        server.run().unwrap();
    });
    addr
}

#[test]
fn fresh_server_reports_eleven_points_at_rest() {
    let addr = spawn_server();
    let mut session = client::connect(addr.ip().to_string(), addr.port(), Duration::from_secs(2)).unwrap();

    let points = session.request_data().unwrap();
    assert_eq!(points.len(), 11);
    for ioa in 1100..=1106u32 {
        assert_eq!(points.get(&ioa), Some(&Measurement::Bool(false)));
    }
    assert_eq!(points.get(&10010), Some(&Measurement::Float32(0.0)));
    assert_eq!(points.get(&10013), Some(&Measurement::Float32(15.0)));

    session.close().unwrap();
}

#[test]
fn write_single_is_visible_on_next_interrogation() {
    let addr = spawn_server();
    let mut session = client::connect(addr.ip().to_string(), addr.port(), Duration::from_secs(2)).unwrap();

    let first = session.request_data().unwrap();
    assert_eq!(first.get(&1101), Some(&Measurement::Bool(false)));

    let confirmed = session.write_single(15101, true).unwrap();
    assert!(confirmed);

    let second = session.request_data().unwrap();
    assert_eq!(second.get(&1101), Some(&Measurement::Bool(true)));

    session.close().unwrap();
}

#[test]
fn write_single_to_unregistered_ioa_is_not_confirmed() {
    let addr = spawn_server();
    let mut session = client::connect(addr.ip().to_string(), addr.port(), Duration::from_secs(2)).unwrap();

    let confirmed = session.write_single(99999, true).unwrap();
    assert!(!confirmed);

    session.close().unwrap();
}

#[test]
fn two_consecutive_interrogations_agree_on_ordering() {
    let addr = spawn_server();
    let mut session = client::connect(addr.ip().to_string(), addr.port(), Duration::from_secs(2)).unwrap();

    let first: Vec<u32> = session.request_data().unwrap().into_keys().collect();
    let second: Vec<u32> = session.request_data().unwrap().into_keys().collect();
    assert_eq!(first, second);

    session.close().unwrap();
}
