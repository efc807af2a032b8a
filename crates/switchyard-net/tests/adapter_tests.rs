//! Integration tests for the HTTP adapters against a mock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use switchyard_net::{
    Adapter, AdapterKind, AdapterOptions, BatchQuery, Context, MultiDomainAdapter, NetworkError,
    Variables, build_adapter,
};
use wiremock::matchers::{basic_auth, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY: &str = "query Github__Repository($owner: String!) { repository(owner: $owner) { name } }";

fn variables(value: serde_json::Value) -> Variables {
    value.as_object().cloned().expect("variables must be an object")
}

fn adapter(kind: AdapterKind, server: &MockServer) -> Arc<dyn Adapter> {
    let options = AdapterOptions::new("github").url(format!("{}/graphql", server.uri()));
    build_adapter(kind, &options).expect("Failed to build adapter")
}

async fn mount_status(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_execute_sends_envelope_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "token abc"))
        .and(body_json(json!({
            "query": QUERY,
            "variables": {"owner": "rails"},
            "operationName": "Github__Repository"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"repository": {"name": "rails"}}})),
        )
        .expect(3)
        .mount(&server)
        .await;

    for kind in [
        AdapterKind::DirectHttp,
        AdapterKind::PersistentHttp,
        AdapterKind::MultiplexedHttp,
    ] {
        let response = adapter(kind, &server)
            .execute(
                QUERY,
                Some("Github__Repository"),
                &variables(json!({"owner": "rails"})),
                &Context::new().header("Authorization", "token abc"),
            )
            .await
            .unwrap_or_else(|e| panic!("{kind} failed: {e}"));

        assert_eq!(response.data, Some(json!({"repository": {"name": "rails"}})));
        assert!(response.errors.is_empty());
    }
}

#[tokio::test]
async fn test_empty_variables_and_missing_name_are_omitted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!({"query": "{ viewer { login } }"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let response = adapter(AdapterKind::DirectHttp, &server)
        .execute("{ viewer { login } }", None, &Variables::new(), &Context::new())
        .await
        .expect("request failed");
    assert_eq!(response.data, Some(json!({})));
}

#[tokio::test]
async fn test_status_400_is_an_envelope() {
    let server = MockServer::start().await;
    mount_status(&server, 400, r#"{"errors":[{"message":"Variable $owner is required"}]}"#).await;

    let response = adapter(AdapterKind::DirectHttp, &server)
        .execute(QUERY, Some("Github__Repository"), &Variables::new(), &Context::new())
        .await
        .expect("400 must not raise");

    assert_eq!(
        response.error_message(),
        Some("Variable $owner is required".to_string())
    );
}

#[tokio::test]
async fn test_server_errors_raise() {
    for status in [500, 503, 599] {
        let server = MockServer::start().await;
        mount_status(&server, status, "Server error").await;

        let err = adapter(AdapterKind::PersistentHttp, &server)
            .execute(QUERY, None, &Variables::new(), &Context::new())
            .await
            .expect_err("5xx must raise");

        assert_eq!(
            err,
            NetworkError::GraphQLServerError {
                status,
                body: "Server error".into()
            }
        );
    }
}

#[tokio::test]
async fn test_other_statuses_degrade_to_error_envelope() {
    let server = MockServer::start().await;
    mount_status(&server, 302, "moved").await;

    let response = adapter(AdapterKind::DirectHttp, &server)
        .execute(QUERY, None, &Variables::new(), &Context::new())
        .await
        .expect("302 must not raise");

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": null, "errors": [{"message": "302 moved"}]})
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_json_error() {
    let server = MockServer::start().await;
    mount_status(&server, 200, "<html>oops</html>").await;

    let err = adapter(AdapterKind::DirectHttp, &server)
        .execute(QUERY, None, &Variables::new(), &Context::new())
        .await
        .expect_err("HTML body must fail");
    assert!(matches!(err, NetworkError::Json(_)));
}

#[tokio::test]
async fn test_timeout_surfaces_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    for kind in [
        AdapterKind::DirectHttp,
        AdapterKind::PersistentHttp,
        AdapterKind::MultiplexedHttp,
    ] {
        let options = AdapterOptions::new("github")
            .url(format!("{}/graphql", server.uri()))
            .timeout(Duration::from_millis(500));
        let err = build_adapter(kind, &options)
            .expect("Failed to build adapter")
            .execute(QUERY, None, &Variables::new(), &Context::new())
            .await
            .expect_err("slow server must time out");

        assert!(err.is_timeout(), "{kind}: expected timeout, got {err:?}");
        assert!(!err.is_server_error());
    }
}

#[tokio::test]
async fn test_connection_refused() {
    let options = AdapterOptions::new("github").url("http://127.0.0.1:1/graphql");
    let err = build_adapter(AdapterKind::DirectHttp, &options)
        .expect("Failed to build adapter")
        .execute(QUERY, None, &Variables::new(), &Context::new())
        .await
        .expect_err("closed port must fail");
    assert!(matches!(err, NetworkError::Connection(_)), "got {err:?}");
}

#[tokio::test]
async fn test_user_info_sent_as_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(basic_auth("user", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let url = server.uri().replacen("http://", "http://user:secret@", 1);
    let options = AdapterOptions::new("github").url(format!("{url}/graphql"));
    let adapter = build_adapter(AdapterKind::DirectHttp, &options).expect("build");

    adapter
        .execute(QUERY, None, &Variables::new(), &Context::new())
        .await
        .expect("request failed");
    assert_eq!(adapter.url(), Some(format!("{url}/graphql").as_str()));
}

#[tokio::test]
async fn test_multiplex_sends_json_array() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({"_json": [
            {"query": "query A { a }", "operationName": "A"},
            {"query": "query B($id: ID!) { b(id: $id) }", "variables": {"id": "1"}, "operationName": "B"}
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": {"a": 1}},
            {"data": {"b": 2}, "errors": [{"message": "partial"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let queries = vec![
        BatchQuery::new("query A { a }", Some("A".into()), Variables::new(), Context::new()),
        BatchQuery::new(
            "query B($id: ID!) { b(id: $id) }",
            Some("B".into()),
            variables(json!({"id": "1"})),
            Context::new(),
        ),
    ];

    let responses = adapter(AdapterKind::PersistentHttp, &server)
        .multiplex(&queries, &Context::new())
        .await
        .expect("multiplex failed");

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].data, Some(json!({"a": 1})));
    assert_eq!(responses[1].error_message(), Some("partial".to_string()));
}

#[tokio::test]
async fn test_multiplex_server_error_raises() {
    let server = MockServer::start().await;
    mount_status(&server, 502, "bad gateway").await;

    let queries = vec![BatchQuery::new("{ a }", None, Variables::new(), Context::new())];
    let err = adapter(AdapterKind::DirectHttp, &server)
        .multiplex(&queries, &Context::new())
        .await
        .expect_err("5xx must raise");
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_multi_domain_routes_by_context_url() {
    let tenant_a = MockServer::start().await;
    let tenant_b = MockServer::start().await;

    for (server, name) in [(&tenant_a, "a"), (&tenant_b, "b")] {
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"tenant": name}})))
            .expect(1)
            .mount(server)
            .await;
    }

    let router = MultiDomainAdapter::new(&AdapterOptions::new("github").delegate(AdapterKind::PersistentHttp))
        .expect("router");

    for (server, name) in [(&tenant_a, "a"), (&tenant_b, "b")] {
        let context = Context::new().url(format!("{}/graphql", server.uri()));
        let response = router
            .execute(QUERY, None, &Variables::new(), &context)
            .await
            .expect("routed request failed");
        assert_eq!(response.data, Some(json!({"tenant": name})));
    }

    assert_eq!(router.connection_count(), 2);
    let delegate = router
        .adapter_for(&format!("{}/graphql", tenant_a.uri()))
        .expect("cached delegate");
    assert_eq!(delegate.kind(), AdapterKind::PersistentHttp);
    assert_eq!(router.connection_count(), 2);
}

#[tokio::test]
async fn test_multi_domain_without_url_fails() {
    let router = build_adapter(AdapterKind::MultiDomain, &AdapterOptions::new("github"))
        .expect("router");

    let err = router
        .execute(QUERY, None, &Variables::new(), &Context::new())
        .await
        .expect_err("missing url must fail");
    assert!(matches!(err, NetworkError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_http_client_reads_whole_response() {
    use switchyard_net::http::{ConnectionMode, HttpClient};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("x-client", "switchyard"))
        .and(body_json(json!({"query": "{ a }"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "abc")
                .set_body_string(r#"{"data":{"a":1}}"#),
        )
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .mode(ConnectionMode::Pooled {
            max_idle: 2,
            idle_timeout: Duration::from_secs(5),
        })
        .default_header("x-client", "switchyard")
        .unwrap()
        .build()
        .unwrap();

    let response = client
        .post(format!("{}/graphql", server.uri()))
        .json(&json!({"query": "{ a }"}))
        .unwrap()
        .send()
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.header("x-request-id"), Some("abc"));
    assert_eq!(response.body, r#"{"data":{"a":1}}"#);
}

#[tokio::test]
async fn test_pooled_client_speaks_http1() {
    use switchyard_net::http::{ConnectionMode, HttpClient};

    let server = MockServer::start().await;
    mount_status(&server, 200, r#"{"data":{}}"#).await;

    for mode in [
        ConnectionMode::PerRequest,
        ConnectionMode::Pooled {
            max_idle: 2,
            idle_timeout: Duration::from_secs(5),
        },
    ] {
        let client = HttpClient::builder().mode(mode).build().unwrap();
        for _ in 0..2 {
            let response = client
                .post(format!("{}/graphql", server.uri()))
                .json(&json!({"query": "{ a }"}))
                .unwrap()
                .send()
                .await
                .unwrap();
            assert_eq!(response.version, http::Version::HTTP_11, "{mode:?}");
        }
    }
}
