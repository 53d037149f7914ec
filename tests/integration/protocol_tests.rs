//! End-to-end protocol tests: UDP socket → engine → controller → mock relays.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use retic::Controller;
use retic::config::ServerConfig;
use retic::rpc::engine::CommandEngine;
use retic::rpc::transport::{self, ListenerHandle};
use serde_json::Value;

use crate::mock_hw::{RecordingSink, Rig, garden, rig, wait_for};

struct Client {
    socket: UdpSocket,
    server: SocketAddr,
}

impl Client {
    fn new(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        Self { socket, server }
    }

    fn request(&self, payload: &str) -> String {
        self.socket.send_to(payload.as_bytes(), self.server).unwrap();
        let mut buf = [0u8; 2048];
        let (n, _) = self.socket.recv_from(&mut buf).unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    fn status(&self) -> Value {
        serde_json::from_str(&self.request(r#"{"OPERATION":"GET","TYPE":"STATUS"}"#)).unwrap()
    }
}

struct Served {
    sink: RecordingSink,
    listener: ListenerHandle,
    client: Client,
    _controller: Arc<Controller>,
}

fn serve() -> Served {
    let Rig {
        controller, sink, ..
    } = rig(garden());
    let controller = Arc::new(controller);
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        rate_limit_per_sec: 1000,
        ..ServerConfig::default()
    };
    let listener = transport::spawn(&config, CommandEngine::new(controller.clone())).unwrap();
    let client = Client::new(listener.local_addr());
    Served {
        sink,
        listener,
        client,
        _controller: controller,
    }
}

#[test]
fn idle_status_over_udp() {
    let served = serve();
    let client = &served.client;
    assert_eq!(
        client.request(r#"{"OPERATION":"GET","TYPE":"STATUS"}"#),
        r#"{"ZONE":"","DURATION":0,"START_TIME":0,"JOB_Q_SIZE":0}"#
    );
}

#[test]
fn stations_list_zones_only() {
    let served = serve();
    let client = &served.client;
    let body: Value =
        serde_json::from_str(&client.request(r#"{"operation":"get","type":"stations"}"#)).unwrap();
    let map = body.as_object().unwrap();
    let zones: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(zones, ["ZONE1", "ZONE2", "ZONE3"]);
    assert_eq!(map["ZONE1"], "zone1 description");
}

#[test]
fn operate_runs_and_reports_status() {
    let served = serve();
    let (client, sink) = (&served.client, &served.sink);
    let req = r#"{"OPERATION":"SET","TYPE":"OPERATE","ZONE":"zone3","DURATION":"50"}"#;
    assert_eq!(client.request(req), req.to_uppercase());

    assert!(wait_for(|| client.status()["ZONE"] == "ZONE3"));
    let s = client.status();
    assert_eq!(s["DURATION"], 50);
    assert_eq!(s["JOB_Q_SIZE"], 0);
    assert!(s["START_TIME"].as_f64().unwrap() > 1_600_000_000.0);

    let cancel = r#"{"OPERATION":"SET","TYPE":"CANCEL_ALL"}"#;
    assert_eq!(client.request(cancel), cancel);
    assert!(wait_for(|| sink.stops() == 1));
    assert!(wait_for(|| client.status()["ZONE"] == ""));
}

#[test]
fn bad_requests_are_echoed_and_ignored() {
    let served = serve();
    let (client, sink) = (&served.client, &served.sink);
    for raw in [
        "not json at all",
        r#"{"OPERATION":"SET","TYPE":"OPERATE","ZONE":"ZONE9","DURATION":"10"}"#,
        r#"{"OPERATION":"SET","TYPE":"OPERATE","ZONE":"ZONE1","DURATION":"abc"}"#,
        r#"{"OPERATION":"DELETE","TYPE":"STATUS"}"#,
    ] {
        assert_eq!(client.request(raw), raw.to_uppercase());
    }
    std::thread::sleep(Duration::from_millis(100));
    assert!(sink.events().is_empty());
    assert_eq!(client.status()["JOB_Q_SIZE"], 0);
}

#[test]
fn listener_survives_many_datagrams() {
    let mut served = serve();
    for i in 0..50 {
        let body = served.client.request(&format!("garbage {i}"));
        assert_eq!(body, format!("GARBAGE {i}"));
    }
    assert_eq!(served.client.status()["ZONE"], "");
    served.listener.stop();
}
