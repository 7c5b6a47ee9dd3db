// The reqwest transport against a tiny local HTTP server.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use link_guardian::checker::{check_external, HttpSettings, ReqwestClient};
use link_guardian::link::EXCEPTION_CODE;
use link_guardian::LinkRecord;

type RequestLog = Arc<Mutex<Vec<(String, String)>>>;

// Serves a fixed route table, one request per connection, and logs
// (method, path) for every request it sees.
fn serve() -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&log);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            respond(stream, &seen);
        }
    });

    (base, log)
}

fn respond(mut stream: TcpStream, log: &RequestLog) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // drain headers
    let mut line = String::new();
    while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) && line != "\r\n" {
        line.clear();
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    log.lock().push((method.clone(), path.clone()));

    let status = match (method.as_str(), path.as_str()) {
        ("HEAD", "/head-not-allowed") => "405 Method Not Allowed",
        ("GET", "/head-not-allowed") => "200 OK",
        (_, "/missing") => "404 Not Found",
        (_, "/moved") => "301 Moved Permanently\r\nLocation: /ok",
        (_, "/found") => "302 Found\r\nLocation: /ok",
        _ => "200 OK",
    };
    let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes());
}

fn client() -> ReqwestClient {
    ReqwestClient::new(&HttpSettings {
        socket_timeout: Duration::from_secs(5),
        connection_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn methods_for(log: &RequestLog, path: &str) -> Vec<String> {
    log.lock()
        .iter()
        .filter(|(_, p)| p == path)
        .map(|(m, _)| m.clone())
        .collect()
}

#[test]
fn head_405_retries_with_get() {
    let (base, log) = serve();
    let record = LinkRecord::new(format!("{base}/head-not-allowed"), "field");
    check_external(&client(), &record);

    assert!(record.is_checked());
    assert!(!record.is_broken());
    assert_eq!(methods_for(&log, "/head-not-allowed"), vec!["HEAD", "GET"]);
}

#[test]
fn head_404_is_broken_without_get() {
    let (base, log) = serve();
    let record = LinkRecord::new(format!("{base}/missing"), "field");
    check_external(&client(), &record);

    let state = record.state();
    assert!(state.broken);
    assert_eq!(state.result_code, 404);
    assert_eq!(methods_for(&log, "/missing"), vec!["HEAD"]);
}

#[test]
fn redirects_are_not_followed() {
    let (base, log) = serve();
    let client = client();

    let moved = LinkRecord::new(format!("{base}/moved"), "field");
    check_external(&client, &moved);
    assert_eq!(moved.state().result_code, 301);
    assert!(moved.is_broken());

    let found = LinkRecord::new(format!("{base}/found"), "field");
    check_external(&client, &found);
    assert!(!found.is_broken());

    assert!(methods_for(&log, "/ok").is_empty());
}

#[test]
fn refused_connection_is_an_exception() {
    // bind then drop, so nothing listens on the port
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let record = LinkRecord::new(format!("http://127.0.0.1:{port}/"), "field");
    check_external(&client(), &record);

    let state = record.state();
    assert!(state.broken);
    assert_eq!(state.result_code, EXCEPTION_CODE);
    assert_eq!(state.result_message.as_deref(), Some("Connect"));
}

