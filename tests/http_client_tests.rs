//! GraphQL and auth clients against a local stub server

use profile_dash::{
    auth::AuthClient,
    config::DashboardConfig,
    credentials::SessionToken,
    graphql::{GraphQLClient, QueryExecutor},
    session::SessionTerminator,
    Error, QueryError,
};
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use tiny_http::{Response, Server, StatusCode};

#[derive(Debug)]
struct Recorded {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

/// Answer one request per canned response, in order, then stop.
/// Returns the API base URL and the recorded requests.
fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Recorded>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok(mut request) = server.recv() else {
                return;
            };

            let mut content = String::new();
            let _ = request.as_reader().read_to_string(&mut content);
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());

            let _ = tx.send(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                body: content,
            });

            let _ = request.respond(Response::from_string(body).with_status_code(StatusCode(status)));
        }
    });

    (format!("http://{}/api", addr), rx)
}

fn token() -> SessionToken {
    SessionToken::new("jwt-123").unwrap()
}

fn graphql_client(base: &str) -> GraphQLClient {
    GraphQLClient::new(&DashboardConfig::with_endpoint(base).unwrap()).unwrap()
}

fn auth_client(base: &str) -> AuthClient {
    AuthClient::new(&DashboardConfig::with_endpoint(base).unwrap()).unwrap()
}

#[tokio::test]
async fn test_graphql_success_sends_bearer_and_query() {
    let (base, requests) = stub_server(vec![(200, r#"{"data": {"user": [{"id": 1, "login": "ada"}]}}"#)]);

    let data = graphql_client(&base)
        .execute("query Profile { user { id login } }", &token())
        .await
        .unwrap();

    assert_eq!(data["user"][0]["login"], "ada");

    let request = requests.recv().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/api/graphql-engine/v1/graphql");
    assert_eq!(request.authorization.as_deref(), Some("Bearer jwt-123"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["query"], "query Profile { user { id login } }");
}

#[tokio::test]
async fn test_graphql_errors_in_ok_response() {
    let (base, _requests) = stub_server(vec![(
        200,
        r#"{"data": null, "errors": [{"message": "field 'nope' not found in type: 'user'"}]}"#,
    )]);

    let err = graphql_client(&base)
        .execute("query Profile { user { nope } }", &token())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::GraphQL(vec!["field 'nope' not found in type: 'user'".to_string()])
    );
}

#[tokio::test]
async fn test_graphql_http_status_error() {
    let (base, _requests) = stub_server(vec![(401, r#"{"message": "Could not verify JWT: JWTExpired"}"#)]);

    let err = graphql_client(&base)
        .execute("query Profile { user { id } }", &token())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::HttpStatus {
            status: 401,
            message: "Could not verify JWT: JWTExpired".to_string()
        }
    );
}

#[tokio::test]
async fn test_graphql_transport_error() {
    // Grab a free port and release it so nothing is listening there
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = graphql_client(&format!("http://127.0.0.1:{}/api", port))
        .execute("query Profile { user { id } }", &token())
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Transport(_)));
}

#[tokio::test]
async fn test_sign_in_uses_basic_auth_and_decodes_json_token() {
    let (base, requests) = stub_server(vec![(200, r#""header.payload.signature""#)]);

    let token = auth_client(&base).sign_in("ada", "secret").await.unwrap();

    assert_eq!(token.as_str(), "header.payload.signature");

    let request = requests.recv().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/api/auth/signin");
    assert_eq!(request.authorization.as_deref(), Some("Basic YWRhOnNlY3JldA=="));
}

#[tokio::test]
async fn test_sign_in_accepts_raw_token() {
    let (base, _requests) = stub_server(vec![(200, "header.payload.signature\n")]);

    let token = auth_client(&base).sign_in("ada", "secret").await.unwrap();

    assert_eq!(token.as_str(), "header.payload.signature");
}

#[tokio::test]
async fn test_sign_in_failure_message() {
    let (base, _requests) = stub_server(vec![(401, "")]);

    let err = auth_client(&base).sign_in("ada", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::SignIn { status: 401, .. }));
    assert_eq!(err.to_string(), "Login failed: 401 Invalid credentials");
}

#[tokio::test]
async fn test_sign_in_failure_with_body() {
    let (base, _requests) = stub_server(vec![(403, r#"{"error":"User does not exist or password incorrect"}"#)]);

    let err = auth_client(&base).sign_in("ada", "wrong").await.unwrap_err();

    assert_eq!(
        err.to_string(),
        r#"Login failed: 403 {"error":"User does not exist or password incorrect"}"#
    );
}

#[tokio::test]
async fn test_terminate_calls_expire_then_signout() {
    let (base, requests) = stub_server(vec![(200, ""), (200, "")]);

    auth_client(&base).terminate(&token()).await.unwrap();

    let expire = requests.recv().unwrap();
    assert_eq!(expire.method, "GET");
    assert_eq!(expire.url, "/api/auth/expire");
    assert_eq!(expire.authorization.as_deref(), Some("Bearer jwt-123"));

    let signout = requests.recv().unwrap();
    assert_eq!(signout.method, "POST");
    assert_eq!(signout.url, "/api/auth/signout");
    assert_eq!(signout.authorization.as_deref(), Some("Bearer jwt-123"));
}

#[tokio::test]
async fn test_terminate_reports_failure_but_still_signs_out() {
    let (base, requests) = stub_server(vec![(500, "boom"), (200, "")]);

    let result = auth_client(&base).terminate(&token()).await;

    assert!(result.is_err());
    assert_eq!(requests.recv().unwrap().url, "/api/auth/expire");
    assert_eq!(requests.recv().unwrap().url, "/api/auth/signout");
}
