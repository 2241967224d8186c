mod common;

use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use jobchat::AppState;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::header, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    address: String,
    app: Router,
}

async fn spawn_server(state: AppState) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let app = common::app(state);

    let served = app.clone();
    tokio::spawn(async move { axum::serve(listener, served).await });
    TestServer { address, app }
}

impl TestServer {
    async fn connect(&self, user_id: Uuid, role: &str) -> Socket {
        let cookie = common::cookie_for(&self.app, user_id, role).await;
        let mut request = format!("ws://{}/ws", self.address).into_client_request().unwrap();
        request.headers_mut().insert(header::COOKIE, cookie.parse().unwrap());

        let (ws, _) = connect_async(request).await.expect("websocket handshake");
        ws
    }
}

async fn send(ws: &mut Socket, frame: Value) {
    ws.send(WsMessage::text(frame.to_string())).await.unwrap();
}

async fn recv(ws: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(1), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..100 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn anonymous_upgrade_is_refused() {
    let server = spawn_server(common::state().await).await;
    let result = connect_async(format!("ws://{}/ws", server.address)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn malformed_frame_gets_a_validation_error() {
    let server = spawn_server(common::state().await).await;
    let mut ws = server.connect(Uuid::now_v7(), "client").await;

    ws.send(WsMessage::text("{not json")).await.unwrap();
    let reply = recv(&mut ws).await;
    assert_eq!(reply["event"], "error");
    assert_eq!(reply["data"]["code"], "validation");

    send(&mut ws, json!({ "event": "typing", "data": {} })).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["data"]["code"], "validation");
}

#[tokio::test]
async fn sent_message_is_acked_and_reaches_the_room() {
    let state = common::state().await;
    let server = spawn_server(state.clone()).await;
    let (job, client, freelancer) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

    let mut client_ws = server.connect(client, "client").await;
    send(&mut client_ws, json!({
        "event": "join-room",
        "data": { "jobId": job, "userId": client },
    })).await;

    let mut freelancer_ws = server.connect(freelancer, "freelancer").await;
    send(&mut freelancer_ws, json!({
        "event": "join-room",
        "data": { "jobId": job, "userId": freelancer },
    })).await;

    wait_until(|| state.rooms.member_count(job) == 2).await;
    assert_eq!(state.rooms.member_count(job), 2);

    send(&mut freelancer_ws, json!({
        "event": "send-message",
        "data": {
            "jobId": job,
            "senderId": freelancer,
            "receiverId": client,
            "body": "Can start Monday",
            "clientMsgId": "m-7",
        },
    })).await;

    let received = recv(&mut client_ws).await;
    assert_eq!(received["event"], "receive-message");
    assert_eq!(received["data"]["body"], "Can start Monday");
    assert_eq!(received["data"]["status"], "delivered");

    // the sender's own socket gets the room copy and the ack, in either order
    let mut frames = [recv(&mut freelancer_ws).await, recv(&mut freelancer_ws).await];
    frames.sort_by_key(|frame| frame["event"].as_str().unwrap_or_default().to_owned());
    assert_eq!(frames[0]["event"], "ack");
    assert_eq!(frames[0]["data"]["inReplyTo"], "m-7");
    assert_eq!(frames[0]["data"]["messageId"], received["data"]["id"]);
    assert_eq!(frames[1]["event"], "receive-message");
}

#[tokio::test]
async fn closing_the_socket_leaves_its_rooms() {
    let state = common::state().await;
    let server = spawn_server(state.clone()).await;
    let (job, me) = (Uuid::now_v7(), Uuid::now_v7());

    let mut ws = server.connect(me, "client").await;
    send(&mut ws, json!({
        "event": "join-room",
        "data": { "jobId": job, "userId": me },
    })).await;
    wait_until(|| state.rooms.member_count(job) == 1).await;
    assert_eq!(state.rooms.member_count(job), 1);

    ws.close(None).await.unwrap();

    wait_until(|| state.rooms.is_empty()).await;
    assert_eq!(state.rooms.member_count(job), 0);
    assert!(state.rooms.is_empty());
}
