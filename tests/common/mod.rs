//! Mock SOCKS4 proxy for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as seen by the mock proxy
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub version: u8,
    pub command: u8,
    pub port: u16,
    pub ip: [u8; 4],
    pub user_id: Vec<u8>,
    pub host: Option<String>,
}

#[derive(Debug)]
pub enum ProxyEvent {
    Request(ProxyRequest),
    /// The client closed the connection
    Closed,
}

/// What the mock proxy does after reading a request
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Send `reply`, then echo everything back
    Echo([u8; 8]),
    /// Send `reply`, read one HTTP request, answer with `response` and close
    Http([u8; 8], Vec<u8>),
    /// Send these raw bytes and close
    Raw(Vec<u8>),
    /// Send `reply`, then read without ever answering
    Stall([u8; 8]),
    /// Never answer
    Silent,
}

pub const GRANTED_LOCALHOST_80: [u8; 8] = [0x00, 0x5a, 0x00, 0x50, 127, 0, 0, 1];

/// Start a mock proxy accepting any number of connections
pub async fn spawn_proxy(behavior: Behavior) -> (SocketAddr, mpsc::UnboundedReceiver<ProxyEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let behavior = behavior.clone();
            let events = events_tx.clone();
            tokio::spawn(async move {
                handle_connection(stream, behavior, events).await;
            });
        }
    });

    (addr, events_rx)
}

/// Address of a port nothing listens on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Wait for the next request event
pub async fn next_request(events: &mut mpsc::UnboundedReceiver<ProxyEvent>) -> ProxyRequest {
    loop {
        match events.recv().await {
            Some(ProxyEvent::Request(request)) => return request,
            Some(ProxyEvent::Closed) => continue,
            None => panic!("mock proxy stopped"),
        }
    }
}

/// Wait for the next close event
pub async fn next_close(events: &mut mpsc::UnboundedReceiver<ProxyEvent>) {
    loop {
        match events.recv().await {
            Some(ProxyEvent::Closed) => return,
            Some(ProxyEvent::Request(_)) => continue,
            None => panic!("mock proxy stopped"),
        }
    }
}

async fn handle_connection(mut stream: TcpStream, behavior: Behavior, events: mpsc::UnboundedSender<ProxyEvent>) {
    let Ok(request) = read_request(&mut stream).await else {
        let _ = events.send(ProxyEvent::Closed);
        return;
    };
    let _ = events.send(ProxyEvent::Request(request));

    match behavior {
        Behavior::Echo(reply) => {
            if stream.write_all(&reply).await.is_ok() {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            }
        }
        Behavior::Http(reply, response) => {
            if stream.write_all(&reply).await.is_ok() {
                let mut head = Vec::new();
                while !head.ends_with(b"\r\n\r\n") {
                    match stream.read_u8().await {
                        Ok(byte) => head.push(byte),
                        Err(_) => break,
                    }
                }
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            }
        }
        Behavior::Raw(bytes) => {
            let _ = stream.write_all(&bytes).await;
            let _ = stream.shutdown().await;
        }
        Behavior::Stall(reply) => {
            if stream.write_all(&reply).await.is_ok() {
                drain(&mut stream).await;
            }
        }
        Behavior::Silent => drain(&mut stream).await,
    }

    let _ = events.send(ProxyEvent::Closed);
}

async fn drain(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    while let Ok(n) = stream.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<ProxyRequest> {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).await?;

    let ip = [header[4], header[5], header[6], header[7]];
    let user_id = read_nul_terminated(stream).await?;

    // 0.0.0.x with x != 0: a hostname follows
    let host = if ip[..3] == [0, 0, 0] && ip[3] != 0 {
        let host = read_nul_terminated(stream).await?;
        Some(String::from_utf8_lossy(&host).into_owned())
    } else {
        None
    };

    Ok(ProxyRequest {
        version: header[0],
        command: header[1],
        port: u16::from_be_bytes([header[2], header[3]]),
        ip,
        user_id,
        host,
    })
}

async fn read_nul_terminated(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut field = Vec::new();
    loop {
        let byte = stream.read_u8().await?;
        if byte == 0 {
            return Ok(field);
        }
        field.push(byte);
    }
}
