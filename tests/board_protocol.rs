//! Protocol behaviour against an in-memory board

use devlink_core::{DevboardClient, DeviceTemplates, HttpMethod, ReadPolicy, SocketDialect, VirtualBoard};

fn client(lines: &[&str]) -> DevboardClient<VirtualBoard> {
    DevboardClient::new(VirtualBoard::scripted(lines))
}

#[tokio::test]
async fn ping_answered_with_pong() {
    let mut client = client(&["[PONG]"]);

    assert!(client.ping().await.unwrap());
    assert_eq!(client.transport().written(), ["[PING]"]);
}

#[tokio::test]
async fn ping_against_silent_board() {
    let mut client = client(&[]);

    assert!(!client.ping().await.unwrap());
    // five attempts for the reply, five more for the drain
    assert_eq!(client.transport().read_attempts(), 10);
}

#[tokio::test]
async fn ping_rejects_other_marker() {
    let mut client = client(&["[ERROR] busy"]);
    assert!(!client.ping().await.unwrap());
}

#[tokio::test]
async fn ping_result_follows_each_reply() {
    let mut client = client(&[]);

    for _ in 0..2 {
        client.transport_mut().push_line("[ERROR] busy");
        assert!(!client.ping().await.unwrap());

        client.transport_mut().push_line("[PONG]");
        assert!(client.ping().await.unwrap());
    }
    assert_eq!(client.transport().written(), ["[PING]"; 4]);
}

#[tokio::test]
async fn get_returns_body_line() {
    let mut client = client(&["[GET/SUCCESS]", "hello world", "[GET/END]"]);

    assert_eq!(client.get_request("http://x").await.unwrap(), "hello world");
    assert_eq!(client.transport().written(), ["[GET]http://x"]);
    assert_eq!(client.transport().pending(), 0);
}

#[tokio::test]
async fn get_skips_empty_lines_before_body() {
    let mut client = client(&["[GET/SUCCESS]", "", "", "body", "[GET/END]"]);
    assert_eq!(client.get_request("http://x").await.unwrap(), "body");
}

#[tokio::test]
async fn get_returns_first_body_line_only() {
    let mut client = client(&["[GET/SUCCESS]", "first", "second", "[GET/END]"]);
    assert_eq!(client.get_request("http://x").await.unwrap(), "first");
}

#[tokio::test]
async fn get_with_empty_body() {
    let mut client = client(&["[GET/SUCCESS]", "[GET/END]"]);
    assert_eq!(client.get_request("http://x").await.unwrap(), "");
}

#[tokio::test]
async fn get_failure_is_empty_string() {
    let mut client = client(&["[ERROR] GET request failed"]);
    assert_eq!(client.get_request("http://x").await.unwrap(), "");
}

#[tokio::test]
async fn get_with_headers_payload_shape() {
    let mut client = client(&["[GET/SUCCESS]", "{}", "[GET/END]"]);

    let body = client
        .get_request_with_headers("https://api.example", r#"{"Accept":"application/json"}"#)
        .await
        .unwrap();
    assert_eq!(body, "{}");
    assert_eq!(
        client.transport().written(),
        [r#"[GET/HTTP]{url:"https://api.example",headers:{"Accept":"application/json"}}"#]
    );
}

#[tokio::test]
async fn post_needs_its_own_markers() {
    let mut client = client(&["[GET/SUCCESS]", "body", "[GET/END]"]);
    let body = client
        .post_request_with_headers("http://x", "{}", r#"{"a":1}"#)
        .await
        .unwrap();
    assert_eq!(body, "");
}

#[tokio::test]
async fn put_and_delete_stream_their_bodies() {
    let mut client = client(&["[PUT/SUCCESS]", "updated", "[PUT/END]"]);
    assert_eq!(client.put_request_with_headers("http://x", "{}", "{}").await.unwrap(), "updated");

    let mut client = self::client(&["[DELETE/SUCCESS]", "deleted", "[DELETE/END]"]);
    assert_eq!(client.delete_request_with_headers("http://x", "{}", "{}").await.unwrap(), "deleted");
    assert_eq!(
        client.transport().written(),
        [r#"[DELETE/HTTP]{"url":"http://x","headers":{},"payload":{}}"#]
    );
}

#[tokio::test]
async fn drain_runs_past_foreign_end_markers() {
    // only [GET/END] stops a drain, so a PUT end marker is swallowed with what follows
    let mut client = client(&["[PUT/SUCCESS]", "updated", "[PUT/END]", "[PONG]", "stale"]);
    assert_eq!(client.put_request_with_headers("http://x", "{}", "{}").await.unwrap(), "updated");
    assert_eq!(client.transport().pending(), 1);
}

#[tokio::test]
async fn stream_gives_up_after_line_cap() {
    let policy = ReadPolicy {
        stream_line_cap: 3,
        ..ReadPolicy::default()
    };
    let mut client = client(&["[GET/SUCCESS]"]).with_policy(policy);

    assert_eq!(client.get_request("http://x").await.unwrap(), "");
    // reply, three silent body reads, one silent drain
    assert_eq!(client.transport().read_attempts(), 1 + 3 * 5 + 5);
}

#[tokio::test]
async fn request_dispatches_bare_get_without_headers() {
    let mut client = DevboardClient::new(DeviceTemplates::wifi_devboard());

    client.request(HttpMethod::Get, "http://a", "{}", "").await.unwrap();
    client.request(HttpMethod::Get, "http://b", r#"{"X":"1"}"#, "").await.unwrap();

    let written = client.transport().written();
    assert_eq!(written[0], "[GET]http://a");
    assert!(written[1].starts_with("[GET/HTTP]"));
}

#[tokio::test]
async fn connect_wifi_accepts_info() {
    let mut client = client(&["[INFO] Already connected"]);
    assert!(client.connect_wifi().await.unwrap());

    let mut client = self::client(&["[ERROR] No saved network"]);
    assert!(!client.connect_wifi().await.unwrap());
}

#[tokio::test]
async fn disconnect_wifi_accepts_stop_text() {
    let mut client = client(&["WiFi stop"]);
    assert!(client.disconnect_wifi().await.unwrap());

    let mut client = self::client(&["[SUCCESS]"]);
    assert!(!client.disconnect_wifi().await.unwrap());
}

#[tokio::test]
async fn save_wifi_rejects_empty_arguments() {
    let mut client = client(&["[SUCCESS]"]);

    assert!(!client.save_wifi("", "password").await.unwrap());
    assert!(!client.save_wifi("home", "").await.unwrap());
    assert!(client.transport().written().is_empty());
    assert_eq!(client.transport().read_attempts(), 0);
}

#[tokio::test]
async fn save_wifi_drains_twice_on_success() {
    let mut client = client(&["[SUCCESS] Saved", "[INFO] a", "[SUCCESS] b", "[INFO] c", "leftover"]);

    assert!(client.save_wifi("home", "hunter2").await.unwrap());
    assert_eq!(
        client.transport().written(),
        [r#"[WIFI/SAVE]{"ssid":"home","password":"hunter2"}"#]
    );
    assert_eq!(client.transport().pending(), 1);
}

#[tokio::test]
async fn query_verbs_return_raw_line() {
    let mut client = client(&["home-net, cafe", "10.0.0.7", "192.168.4.1", "[PING], [LIST]"]);

    assert_eq!(client.scan_wifi().await.unwrap(), "home-net, cafe");
    assert_eq!(client.ip_wifi().await.unwrap(), "10.0.0.7");
    assert_eq!(client.ip_address().await.unwrap(), "192.168.4.1");
    assert_eq!(client.list_commands().await.unwrap(), "[PING], [LIST]");
}

#[tokio::test]
async fn query_error_reply_is_empty() {
    let mut client = client(&["[ERROR] Failed to parse JSON"]);
    assert_eq!(client.parse_json("fact", "{}").await.unwrap(), "");
}

#[tokio::test]
async fn parse_payloads() {
    let mut client = client(&["cat", "b"]);

    assert_eq!(client.parse_json("fact", r#"{"fact":"cat"}"#).await.unwrap(), "cat");
    assert_eq!(client.parse_json_array("items", 1, r#"{"items":["a","b"]}"#).await.unwrap(), "b");

    let written = client.transport().written();
    assert_eq!(written[0], r#"[PARSE]{"key":"fact","data":{"fact":"cat"}}"#);
    assert_eq!(written[1], r#"[PARSE/ARRAY]{"key":"items","index":1,"data":{"items":["a","b"]}}"#);
}

#[tokio::test]
async fn websocket_ws_dialect() {
    let mut client = client(&["[WS/STARTED]"]);
    assert!(client.websocket_start("wss://echo", 443, "{}").await.unwrap());

    client.transport_mut().push_line("[WS/STOPPED]");
    assert!(client.websocket_stop().await.unwrap());
    assert_eq!(
        client.transport().written(),
        [r#"[WS/START]{"url":"wss://echo","port":443,"headers":{}}"#, "[WS/STOP]"]
    );
}

#[tokio::test]
async fn websocket_socket_dialect() {
    let mut client = client(&["[INFO] connecting"]).with_socket_dialect(SocketDialect::Socket);
    assert!(client.websocket_start("ws://x", 80, "{}").await.unwrap());

    let mut client = self::client(&["[ERROR] refused"]).with_socket_dialect(SocketDialect::Socket);
    assert!(!client.websocket_start("ws://x", 80, "{}").await.unwrap());
}

#[tokio::test]
async fn led_is_write_only() {
    let mut client = client(&[]);

    client.led_on().await.unwrap();
    client.led_off().await.unwrap();
    assert_eq!(client.transport().written(), ["[LED/ON]", "[LED/OFF]"]);
    assert_eq!(client.transport().read_attempts(), 0);
}

#[tokio::test]
async fn read_data_counts_attempts() {
    let mut board = VirtualBoard::new("retry");
    board.push_timeouts(4).push_line("late");
    let mut client = DevboardClient::new(board);
    let timeout = ReadPolicy::default().data_timeout;

    assert_eq!(client.read_data(timeout).await.unwrap().as_deref(), Some("late"));

    let mut board = VirtualBoard::new("too-late");
    board.push_timeouts(5).push_line("too late");
    let mut client = DevboardClient::new(board);

    assert_eq!(client.read_data(timeout).await.unwrap(), None);
    assert_eq!(client.transport().pending(), 1);
}

#[tokio::test]
async fn drain_success_marker_depends_on_flag() {
    let mut client = client(&["noise", "[SUCCESS]", "after"]);
    client.clear_buffer(true).await.unwrap();
    assert_eq!(client.transport().pending(), 1);

    let mut client = self::client(&["noise", "[SUCCESS]", "after"]);
    client.clear_buffer(false).await.unwrap();
    assert_eq!(client.transport().pending(), 0);
}

#[tokio::test]
async fn drain_stops_at_marker_and_limit() {
    let mut client = client(&["[GET/END]", "next"]);
    client.clear_buffer(false).await.unwrap();
    assert_eq!(client.transport().pending(), 1);

    let mut client = self::client(&["1", "2", "3", "4", "5", "6", "7"]);
    client.clear_buffer(false).await.unwrap();
    assert_eq!(client.transport().pending(), 2);
}

#[tokio::test]
async fn status_gathers_each_answer() {
    let mut client = DevboardClient::new(DeviceTemplates::wifi_devboard());

    let status = client.status().await.unwrap();
    assert!(status.responsive);
    assert_eq!(status.wifi_ip, "192.168.1.42");
    assert_eq!(status.board_ip, "192.168.4.1");
    assert!(status.wifi_connected);
    assert_eq!(
        client.transport().written(),
        ["[PING]", "[WIFI/IP]", "[IP/ADDRESS]", "[WIFI/CONNECT]"]
    );
}

#[tokio::test]
async fn calls_do_not_leak_into_each_other() {
    let mut client = DevboardClient::new(DeviceTemplates::wifi_devboard());

    assert_eq!(
        client.get_request_with_headers("https://catfact.ninja/fact", "{}").await.unwrap(),
        r#"{"fact":"Cats sleep 70% of their lives.","length":31}"#
    );
    assert!(client.ping().await.unwrap());
    assert_eq!(client.parse_json("fact", "{}").await.unwrap(), "Cats sleep 70% of their lives.");
    assert!(client.save_wifi("home", "secret").await.unwrap());
    assert!(client.ping().await.unwrap());
    assert_eq!(client.transport().pending(), 0);
}
