//! GroqClient tests against a local httpmock server.

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use xiaozhi_core::types::Turn;
    use xiaozhi_core::{CompletionBackend, CompletionError, CompletionRequest};

    use crate::client::{SseLine, parse_sse_line};
    use crate::{GroqClient, GroqConfig};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![Turn::system("你是小智"), Turn::user("你好")],
            temperature: 0.7,
            max_tokens: 2048,
        }
    }

    fn client_for(server: &httpmock::MockServer) -> GroqClient {
        GroqClient::new(GroqConfig::new("gsk_test").with_base_url(server.base_url()))
    }

    #[tokio::test]
    async fn complete_posts_openai_body_and_returns_first_choice() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer gsk_test")
                    .body_contains(r#""model":"llama-3.3-70b-versatile""#)
                    .body_contains(r#""max_tokens":2048"#)
                    .body_contains(r#""stream":false"#)
                    .body_contains(r#""role":"system""#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"你好！我是小智"}}]}"#);
            })
            .await;

        let reply = client_for(&server).complete(&request()).await.unwrap();

        assert_eq!(reply, "你好！我是小智");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn structured_error_body_becomes_api_error() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(401).body(
                    r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error","code":"invalid_api_key"}}"#,
                );
            })
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.code(), Some("invalid_api_key"));
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[tokio::test]
    async fn error_type_is_used_when_code_is_absent() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(429).body(
                    r#"{"error":{"message":"Rate limit reached","type":"rate_limit_exceeded"}}"#,
                );
            })
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert_eq!(err.code(), Some("rate_limit_exceeded"));
    }

    #[tokio::test]
    async fn plain_text_error_body_is_kept_as_message() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(502).body("upstream unavailable");
            })
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();

        assert!(matches!(
            err,
            CompletionError::Api { status: 502, code: None, ref message } if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(200).body(r#"{"choices":[]}"#);
            })
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();

        assert!(matches!(err, CompletionError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let client =
            GroqClient::new(GroqConfig::new("gsk_test").with_base_url("http://127.0.0.1:9"));

        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, CompletionError::Transport(_)));
    }

    #[tokio::test]
    async fn streaming_forwards_deltas_and_stops_at_done() {
        let server = httpmock::MockServer::start_async().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"你\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"好\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat/completions")
                    .body_contains(r#""stream":true"#);
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(sse);
            })
            .await;
        let (tx, mut rx) = mpsc::channel(16);

        let full = client_for(&server)
            .complete_streaming(&request(), tx)
            .await
            .unwrap();

        assert_eq!(full, "你好");
        let mut fragments = Vec::new();
        while let Some(fragment) = rx.recv().await {
            fragments.push(fragment);
        }
        assert_eq!(fragments, vec!["你", "好"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn streaming_survives_dropped_receiver() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(200)
                    .body("data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n\ndata: [DONE]\n\n");
            })
            .await;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let full = client_for(&server)
            .complete_streaming(&request(), tx)
            .await
            .unwrap();

        assert_eq!(full, "hi");
    }

    #[tokio::test]
    async fn streaming_http_error_is_api_error() {
        let server = httpmock::MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/completions");
                then.status(400).body(
                    r#"{"error":{"message":"Please reduce the length of the messages","type":"invalid_request_error","code":"context_length_exceeded"}}"#,
                );
            })
            .await;
        let (tx, _rx) = mpsc::channel(1);

        let err = client_for(&server)
            .complete_streaming(&request(), tx)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("context_length_exceeded"));
    }

    #[test]
    fn sse_line_parsing() {
        assert_eq!(parse_sse_line(b"data: [DONE]\n").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line(b"data:[DONE]\r\n").unwrap(), SseLine::Done);
        assert_eq!(parse_sse_line(b"\n").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line(b"event: ping\n").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line(b"data: not json\n").unwrap(), SseLine::Skip);
        assert_eq!(
            parse_sse_line(b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n").unwrap(),
            SseLine::Skip
        );
        assert_eq!(
            parse_sse_line("data: {\"choices\":[{\"delta\":{\"content\":\"小智\"}}]}\n".as_bytes())
                .unwrap(),
            SseLine::Fragment("小智".into())
        );
    }

    #[test]
    fn in_stream_error_event_fails_the_call() {
        let err = parse_sse_line(
            br#"data: {"error":{"message":"Rate limit reached","type":"tokens","code":"rate_limit_exceeded"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), Some("rate_limit_exceeded"));
    }
}
