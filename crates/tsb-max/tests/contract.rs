//! HTTP contract tests for the MAX adapter.

use serde_json::json;
use tsb_core::{
    domain::{ChatId, MessageId},
    errors::Error,
    messaging::port::MessagingPort,
};
use tsb_max::MaxMessenger;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn messenger(server: &MockServer) -> MaxMessenger {
    MaxMessenger::new(format!("{}/messages", server.uri()), "bot-token").unwrap()
}

#[tokio::test]
async fn posts_html_body_with_token_and_chat_in_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(query_param("access_token", "bot-token"))
        .and(query_param("chat_id", "-100"))
        .and(body_json(json!({
            "text": "<b>hi</b>",
            "attachments": null,
            "link": null,
            "format": "html",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": {"body": {"mid": "m", "seq": 7}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sent = messenger(&server)
        .send_html(ChatId(-100), "<b>hi</b>")
        .await
        .unwrap();
    assert_eq!(sent.chat_id, ChatId(-100));
    assert_eq!(sent.message_id, MessageId(7));
}

#[tokio::test]
async fn non_json_success_still_counts_as_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let sent = messenger(&server).send_html(ChatId(5), "x").await.unwrap();
    assert_eq!(sent.message_id, MessageId(0));
}

#[tokio::test]
async fn rejected_send_maps_to_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("chat not allowed"))
        .mount(&server)
        .await;

    let err = messenger(&server)
        .send_html(ChatId(5), "x")
        .await
        .unwrap_err();
    match err {
        Error::Transport { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "chat not allowed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn zero_chat_id_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let res = messenger(&server).send_html(ChatId(0), "x").await;
    assert!(matches!(res, Err(Error::External(_))));
}
