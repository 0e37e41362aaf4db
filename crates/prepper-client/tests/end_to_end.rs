//! End-to-end exchanges between the client and a live server.

mod support;

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use prepper_client::{ClientError, SearchKind};
use prepper_config::Config;
use prepper_protocol::{Data, Role, decode, encode, encode_frame, read_frame};

use support::{FRAME_LIMIT, RunningServer};

#[fixture]
fn server() -> RunningServer {
    RunningServer::start()
}

fn data(value: Value) -> Data {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn ids(images: Option<&Value>) -> Vec<u64> {
    images
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| image.get("id").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default()
}

#[rstest]
fn ping_reports_both_timestamps(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    let pong = client.ping_at(1000.0)?;

    assert_eq!(pong.command(), "PONG");
    assert_eq!(
        pong.data().get("received_timestamp").and_then(Value::as_f64),
        Some(1000.0)
    );
    let server_time = pong
        .data()
        .get("server_timestamp")
        .and_then(Value::as_f64)
        .context("server timestamp")?;
    assert!(server_time >= 1000.0);
    Ok(())
}

#[rstest]
fn login_checks_credentials(server: RunningServer) -> Result<()> {
    let mut client = server.client();

    let refused = client.login("Andy", "wrong")?;
    assert_eq!(refused.command(), "LOGIN_FAILED");
    assert_eq!(refused.message(), Some("Invalid username or password"));

    let accepted = client.login("Andy", "password")?;
    assert_eq!(accepted.command(), "LOGIN_SUCCESS");
    assert_eq!(accepted.data().get("user_id"), Some(&json!(1)));
    Ok(())
}

#[rstest]
fn concurrent_saves_of_one_image_succeed_once(server: RunningServer) -> Result<()> {
    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let mut client = server.client();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                client.connect()?;
                barrier.wait();
                client.save_image(1, 9)
            })
        })
        .collect();

    let mut tags = Vec::new();
    for worker in workers {
        let response = worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker panicked"))??;
        tags.push(response.command().to_owned());
    }
    tags.sort();
    assert_eq!(tags, vec!["SAVE_IMAGE_FAILED", "SAVE_IMAGE_SUCCESS"]);

    let saved = server.client().get_saved_images(1)?;
    assert_eq!(ids(saved.data().get("images")), vec![9]);
    Ok(())
}

#[rstest]
fn responses_count_up_from_one_per_connection(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    let mut numbers = Vec::new();
    for _ in 0..5 {
        numbers.push(client.ping()?.sequence_number());
    }
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    Ok(())
}

#[rstest]
fn split_and_coalesced_frames_are_answered_in_order(server: RunningServer) -> Result<()> {
    let mut stream = TcpStream::connect(("127.0.0.1", server.port()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_nodelay(true)?;

    let frame = |command: &str, sequence: u64| -> Result<Vec<u8>> {
        let payload = encode(command, Data::new(), sequence, Role::Client, Role::Server)?;
        Ok(encode_frame(&payload, FRAME_LIMIT)?)
    };

    let first = frame("PING", 1)?;
    for chunk in first.chunks(7) {
        stream.write_all(chunk)?;
        stream.flush()?;
        thread::sleep(Duration::from_millis(5));
    }
    let mut pair = frame("GET_IMAGES", 2)?;
    pair.extend(frame("ECHO", 3)?);
    stream.write_all(&pair)?;

    let mut tags = Vec::new();
    for _ in 0..3 {
        let reply = decode(&read_frame(&mut stream, FRAME_LIMIT)?)?;
        tags.push((reply.command().to_owned(), reply.sequence_number()));
    }
    assert_eq!(
        tags,
        vec![
            ("PONG".to_owned(), 1),
            ("IMAGES".to_owned(), 2),
            ("ECHO".to_owned(), 3)
        ]
    );
    Ok(())
}

#[rstest]
fn corrupted_packets_leave_the_connection_usable(server: RunningServer) -> Result<()> {
    let mut stream = TcpStream::connect(("127.0.0.1", server.port()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let payload = encode(
        "SAVE_IMAGE",
        data(json!({ "user_id": 1, "image_id": 2 })),
        1,
        Role::Client,
        Role::Server,
    )?;
    let tampered = String::from_utf8(payload)?.replacen("\"image_id\":2", "\"image_id\":3", 1);
    stream.write_all(&encode_frame(tampered.as_bytes(), FRAME_LIMIT)?)?;
    let rejected = decode(&read_frame(&mut stream, FRAME_LIMIT)?)?;
    assert_eq!(rejected.command(), "ERROR");
    assert_eq!(
        rejected.data().get("message").and_then(Value::as_str),
        Some("Checksum validation failed")
    );

    let ping = encode("PING", Data::new(), 2, Role::Client, Role::Server)?;
    stream.write_all(&encode_frame(&ping, FRAME_LIMIT)?)?;
    let pong = decode(&read_frame(&mut stream, FRAME_LIMIT)?)?;
    assert_eq!(pong.command(), "PONG");
    Ok(())
}

#[rstest]
fn unknown_commands_are_answered_with_error(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    let response = client.send_request("FLY", Data::new())?;
    assert_eq!(response.command(), "ERROR");
    assert_eq!(response.data().get("command"), Some(&json!("FLY")));
    assert!(!response.is_success());
    Ok(())
}

#[rstest]
fn saving_without_an_image_is_refused(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    let response = client.send_request("SAVE_IMAGE", data(json!({ "user_id": 1 })))?;
    assert_eq!(response.command(), "SAVE_IMAGE_FAILED");
    assert_eq!(response.message(), Some("Missing required field: image_id"));
    Ok(())
}

#[rstest]
fn unsaving_twice_reports_the_second_as_a_no_op(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    assert_eq!(client.save_image(1, 3)?.command(), "SAVE_IMAGE_SUCCESS");

    let first = client.unsave_image(1, 3)?;
    let second = client.unsave_image(1, 3)?;
    assert_eq!(first.data().get("success"), Some(&json!(true)));
    assert_eq!(second.command(), "UNSAVE_IMAGE_SUCCESS");
    assert_eq!(second.data().get("success"), Some(&json!(false)));
    Ok(())
}

#[rstest]
fn comments_and_searches_reflect_new_content(server: RunningServer) -> Result<()> {
    let mut client = server.client();
    let added = client.add_comment(7, "stocked up on iodine", Some(1))?;
    assert_eq!(added.command(), "ADD_COMMENT_SUCCESS");

    let comments = client.get_comments(7)?;
    let texts: Vec<&str> = comments
        .data()
        .get("comments")
        .and_then(Value::as_array)
        .context("comments array")?
        .iter()
        .filter_map(|comment| comment.get("text").and_then(Value::as_str))
        .collect();
    assert_eq!(texts, vec!["stocked up on iodine"]);

    let users = client.search(SearchKind::Users, "and", None)?;
    assert_eq!(users.command(), "SEARCH_RESULTS");
    let results = users
        .data()
        .get("results")
        .and_then(Value::as_array)
        .context("results array")?;
    assert_eq!(results.len(), 1);
    Ok(())
}

#[rstest]
fn send_returns_body_or_message(server: RunningServer) {
    let mut client = server.client();

    let (ok, body) = client.send(
        "LOGIN",
        data(json!({ "username": "Andy", "password": "password" })),
    );
    assert!(ok);
    assert_eq!(body.get("username"), Some(&json!("Andy")));

    let (ok, body) = client.send("LOGIN", data(json!({ "username": "Andy", "password": "nope" })));
    assert!(!ok);
    assert_eq!(body, json!("Invalid username or password"));
}

#[test]
fn connections_beyond_the_limit_are_told_the_server_is_busy() -> Result<()> {
    let server = RunningServer::with_config(Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        max_connections: 1,
        idle_timeout_secs: 5,
        ..Config::default()
    });
    let mut occupant = server.client();
    assert_eq!(occupant.ping()?.command(), "PONG");

    let mut rejected = server.client();
    let response = rejected.ping()?;
    assert_eq!(response.command(), "ERROR");
    assert_eq!(response.message(), Some("server busy"));
    Ok(())
}

#[test]
fn clients_reconnect_after_the_server_drops_them() -> Result<()> {
    let server = RunningServer::with_config(Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        idle_timeout_secs: 1,
        ..Config::default()
    });
    let mut client = server.client();
    assert_eq!(client.ping()?.sequence_number(), 1);
    assert_eq!(client.ping()?.sequence_number(), 2);

    thread::sleep(Duration::from_millis(1500));
    let error = client.ping().expect_err("idle connection was closed");
    assert!(
        matches!(error, ClientError::Closed | ClientError::Io(_)),
        "unexpected error: {error}"
    );
    assert!(!client.is_connected());

    let pong = client.ping()?;
    assert_eq!(pong.command(), "PONG");
    assert_eq!(pong.sequence_number(), 1);
    Ok(())
}

#[test]
fn oversized_requests_close_the_connection() -> Result<()> {
    let server = RunningServer::with_config(Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        max_frame_bytes: 512,
        idle_timeout_secs: 5,
        ..Config::default()
    });
    let mut stream = TcpStream::connect(("127.0.0.1", server.port()))?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.write_all(&4096_u32.to_be_bytes())?;

    let rejected = decode(&read_frame(&mut stream, FRAME_LIMIT)?)?;
    assert_eq!(rejected.command(), "ERROR");
    let mut rest = Vec::new();
    match stream.read_to_end(&mut rest) {
        Ok(_) => assert!(rest.is_empty(), "nothing follows the rejection"),
        Err(error) => assert_eq!(error.kind(), io::ErrorKind::ConnectionReset),
    }
    Ok(())
}
