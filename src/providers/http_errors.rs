use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::RemoteCallError;

/// Walks the source chain looking for an io error of `kind`, or for `needle` in a
/// lower-cased message when the kind was lost along the way (hyper wraps some io errors).
fn error_chain_matches(err: &(dyn StdError + 'static), kind: ErrorKind, needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }
        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        current = source.source();
    }
    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

pub(crate) fn model_api_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> RemoteCallError {
    let api_url = api_url.to_string();

    if err.is_timeout() || error_chain_has_timeout(&err) {
        return RemoteCallError::Timeout {
            api_url,
            timeout_secs,
        };
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return RemoteCallError::ConnectionRefused { api_url };
        }
        return RemoteCallError::Connect { api_url };
    }

    RemoteCallError::Request {
        api_url,
        source: err,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        error_chain_has_connection_refused, error_chain_has_timeout, model_api_request_error,
    };
    use crate::error::RemoteCallError;
    use reqwest::Client;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    fn free_local_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn maps_connection_refused_errors_to_actionable_message() {
        let addr = free_local_addr();
        let api_url = format!("http://{}/v1/chat/completions", addr);
        let client = Client::builder()
            .timeout(Duration::from_millis(300))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with connection-refused");
        let mapped = model_api_request_error(req_err, &api_url, 1);
        assert!(
            matches!(mapped, RemoteCallError::ConnectionRefused { .. }),
            "unexpected error: {mapped:?}"
        );

        let msg = mapped.to_string();
        assert!(msg.contains(&api_url), "unexpected message: {msg}");
        assert!(msg.contains("MODEL_BASE_URL"), "unexpected message: {msg}");
    }

    #[tokio::test]
    async fn maps_timeout_errors_to_actionable_message() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let server = thread::spawn(move || {
            let (_stream, _) = listener.accept().expect("accept should succeed");
            thread::sleep(Duration::from_secs(1));
        });

        let api_url = format!("http://{}/v1/chat/completions", addr);
        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("client should build");

        let req_err = client
            .post(&api_url)
            .send()
            .await
            .expect_err("request should fail with timeout");
        let mapped = model_api_request_error(req_err, &api_url, 2);
        assert!(
            matches!(mapped, RemoteCallError::Timeout { timeout_secs: 2, .. }),
            "unexpected error: {mapped:?}"
        );

        let msg = mapped.to_string();

        assert!(
            msg.contains("Model request timed out after 2s"),
            "unexpected message: {msg}"
        );
        assert!(
            msg.contains("MODEL_TIMEOUT_SECS"),
            "unexpected message: {msg}"
        );

        server.join().expect("server thread should join");
    }

    #[test]
    fn detects_timeout_from_error_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(error_chain_has_timeout(&err));
    }

    #[test]
    fn detects_connection_refused_from_message_text() {
        let err = std::io::Error::other("tcp connect error: Connection refused (os error 111)");
        assert!(error_chain_has_connection_refused(&err));
        assert!(!error_chain_has_timeout(&err));
    }
}
