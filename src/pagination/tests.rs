//! Tests for pagination module

use super::*;
use crate::error::Error;
use crate::testing::ScriptedTransport;
use crate::types::{params, HttpResponse, Method, QueryParams};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "http://scripted/api.php";

fn base_params() -> QueryParams {
    params([("action", "query"), ("list", "allpages"), ("format", "json")])
}

fn enumerator(transport: &Arc<ScriptedTransport>) -> QueryEnumerator {
    QueryEnumerator::new(transport.clone(), ENDPOINT, base_params())
}

// ============================================================================
// ContinuationShape Tests
// ============================================================================

#[test]
fn test_detect_modern_shape() {
    let body = json!({"continue": {"apcontinue": "B", "continue": "-||"}, "query": {}});
    assert!(matches!(ContinuationShape::detect(&body), ContinuationShape::Modern(m) if m.len() == 2));
}

#[test]
fn test_detect_legacy_shape() {
    let body = json!({"query-continue": {"allpages": {"apfrom": "B"}}, "query": {}});
    assert!(matches!(ContinuationShape::detect(&body), ContinuationShape::Legacy(_)));
}

#[test]
fn test_detect_prefers_modern_when_both_present() {
    let body = json!({
        "continue": {"apcontinue": "M"},
        "query-continue": {"allpages": {"apfrom": "L"}}
    });
    let cursor = ContinuationCursor::from_response(&body);
    assert_eq!(cursor.get("apcontinue"), Some("M"));
    assert_eq!(cursor.get("apfrom"), None);
}

#[test]
fn test_detect_absent() {
    let body = json!({"batchcomplete": "", "query": {"allpages": []}});
    assert!(ContinuationShape::detect(&body).is_absent());
    // A non-object "continue" is not the modern shape
    let body = json!({"continue": "yes"});
    assert!(ContinuationShape::detect(&body).is_absent());
}

// ============================================================================
// ContinuationCursor Tests
// ============================================================================

#[test]
fn test_cursor_empty_vs_inert() {
    let empty = ContinuationCursor::empty();
    assert!(empty.is_empty());
    assert!(!empty.is_inert());

    let inert = ContinuationCursor::from_response(&json!({"continue": {}}));
    assert!(!inert.is_empty());
    assert!(inert.is_inert());
    assert_eq!(inert.len(), 0);
}

#[test]
fn test_cursor_renders_scalars_and_skips_nested() {
    let body = json!({"continue": {
        "offset": 50,
        "flag": true,
        "apcontinue": "Foo",
        "nested": {"x": 1},
        "nothing": null
    }});
    let cursor = ContinuationCursor::from_response(&body);
    assert_eq!(cursor.len(), 3);
    assert_eq!(cursor.get("offset"), Some("50"));
    assert_eq!(cursor.get("flag"), Some("true"));
    assert_eq!(cursor.get("apcontinue"), Some("Foo"));
}

#[test]
fn test_legacy_cursor_merges_all_modules() {
    let body = json!({"query-continue": {
        "allpages": {"gapcontinue": "C"},
        "revisions": {"rvcontinue": "123|456"}
    }});
    let cursor = ContinuationCursor::from_response(&body);
    assert_eq!(cursor.get("gapcontinue"), Some("C"));
    assert_eq!(cursor.get("rvcontinue"), Some("123|456"));
}

#[test]
fn test_apply_overwrites_and_inserts() {
    let mut p = params([("action", "query"), ("apcontinue", "A")]);
    let cursor = ContinuationCursor::from_response(
        &json!({"continue": {"apcontinue": "B", "continue": "-||"}}),
    );

    assert!(cursor.apply_to(&mut p));
    assert_eq!(
        p,
        params([("action", "query"), ("apcontinue", "B"), ("continue", "-||")])
    );

    // Applying again changes nothing
    assert!(!cursor.apply_to(&mut p));
}

// ============================================================================
// QueryEnumerator Tests (scripted transport)
// ============================================================================

#[tokio::test]
async fn test_parameter_evolution_across_shapes() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B", "continue": "-||"}, "query": {"allpages": [1]}}))
        .push_json(json!({"query-continue": {"allpages": {"apfrom": "C"}}, "query": {"allpages": [2]}}))
        .push_json(json!({"query": {"allpages": [3]}}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    for expected in 1..=3 {
        let page = e.advance(&cancel).await.unwrap().into_page().unwrap();
        assert_eq!(page, json!({"allpages": [expected]}));
    }
    assert_eq!(e.advance(&cancel).await.unwrap(), Advance::End);
    assert_eq!(e.state(), EnumeratorState::Ended);

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].params, base_params());

    let mut second = base_params();
    second.insert("apcontinue".into(), "B".into());
    second.insert("continue".into(), "-||".into());
    assert_eq!(requests[1].params, second);

    let mut third = second.clone();
    third.insert("apfrom".into(), "C".into());
    assert_eq!(requests[2].params, third);
}

#[tokio::test]
async fn test_no_request_after_absent_continuation() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(json!({"query": {"allpages": ["only"]}}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert!(matches!(e.advance(&cancel).await.unwrap(), Advance::Page(_)));
    assert!(e.advance(&cancel).await.unwrap().is_end());
    assert!(e.advance(&cancel).await.unwrap().is_end());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_empty_page_is_skipped_not_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"allpages": ["a"]}}))
        .push_json(json!({"continue": {"apcontinue": "C"}}))
        .push_json(json!({"continue": {"apcontinue": "D"}, "query": null}))
        .push_json(json!({"query": {"allpages": ["d"]}}));

    let pages = enumerator(&transport)
        .collect_all(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        pages,
        vec![json!({"allpages": ["a"]}), json!({"allpages": ["d"]})]
    );
    assert_eq!(transport.request_count(), 4);
    assert_eq!(transport.requests()[3].params.get("apcontinue").unwrap(), "D");
}

#[tokio::test]
async fn test_empty_page_counter() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}}))
        .push_json(json!({"query": {"allpages": ["b"]}}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert!(matches!(e.advance(&cancel).await.unwrap(), Advance::Page(_)));
    assert_eq!(e.empty_pages(), 1);
    assert_eq!(e.pages_yielded(), 1);
}

#[tokio::test]
async fn test_final_response_without_payload_ends() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"allpages": ["a"]}}))
        .push_json(json!({"batchcomplete": ""}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert!(matches!(e.advance(&cancel).await.unwrap(), Advance::Page(_)));
    assert_eq!(e.advance(&cancel).await.unwrap(), Advance::End);
    assert_eq!(e.state(), EnumeratorState::Ended);
}

#[tokio::test]
async fn test_custom_result_key_and_method() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(json!({"items": [1, 2]}));

    let pages = QueryEnumerator::new(transport.clone(), ENDPOINT, base_params())
        .with_result_key("items")
        .with_method(Method::POST)
        .collect_all(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages, vec![json!([1, 2])]);
    assert_eq!(transport.requests()[0].method, Method::POST);
}

#[tokio::test]
async fn test_transport_fault_propagates_and_is_terminal() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"allpages": ["a"]}}))
        .push(Err(Error::Other("connection reset".into())));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert!(matches!(e.advance(&cancel).await.unwrap(), Advance::Page(_)));

    let err = e.advance(&cancel).await.unwrap_err();
    assert_eq!(err.to_string(), "connection reset");
    assert_eq!(e.state(), EnumeratorState::Faulted);

    assert!(matches!(e.advance(&cancel).await, Err(Error::EnumerationFinished)));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_malformed_json_faults() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Ok(HttpResponse::new(ENDPOINT, 200, "<html>not json</html>")));

    let mut e = enumerator(&transport);
    let err = e.advance(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
    assert_eq!(e.state(), EnumeratorState::Faulted);
}

#[tokio::test]
async fn test_http_status_faults() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Ok(HttpResponse::new(ENDPOINT, 503, "busy")));

    let mut e = enumerator(&transport);
    let err = e.advance(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_api_error_envelope_faults() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(json!({"error": {"code": "badvalue", "info": "Unrecognized value for parameter \"list\"."}}));

    let mut e = enumerator(&transport);
    match e.advance(&CancellationToken::new()).await {
        Err(Error::Api { code, .. }) => assert_eq!(code, "badvalue"),
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_inert_continuation_with_payload_queries_again() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {}, "query": {"n": 1}}))
        .push_json(json!({"query": {"n": 2}}));

    let pages = enumerator(&transport)
        .collect_all(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(pages, vec![json!({"n": 1}), json!({"n": 2})]);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_inert_continuation_without_payload_queries_again() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {}}))
        .push_json(json!({"query": {"n": 2}}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert_eq!(e.advance(&cancel).await.unwrap(), Advance::Page(json!({"n": 2})));
    assert_eq!(e.empty_pages(), 1);
    assert!(e.advance(&cancel).await.unwrap().is_end());
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_inert_legacy_continuation_queries_again() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"query-continue": {}, "query": {"n": 1}}))
        .push_json(json!({"query": {"n": 2}}));

    let pages = enumerator(&transport)
        .collect_all(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_unchanged_continuation_queries_again() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}}))
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"n": 1}}))
        .push_json(json!({"continue": {"action": "query"}, "query": {"n": 2}}))
        .push_json(json!({"query": {"n": 3}}));

    let pages = enumerator(&transport)
        .collect_all(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(pages, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_ends_only_on_first_response_without_continuation() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"n": 1}}))
        .push_json(json!({"query": {"n": 2}}))
        .push_json(json!({"query": {"n": 3}}));

    let cancel = CancellationToken::new();
    let mut e = enumerator(&transport);
    assert_eq!(e.advance(&cancel).await.unwrap(), Advance::Page(json!({"n": 1})));
    assert_eq!(e.advance(&cancel).await.unwrap(), Advance::Page(json!({"n": 2})));
    assert!(e.advance(&cancel).await.unwrap().is_end());
    assert_eq!(e.state(), EnumeratorState::Ended);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_cancelled_before_advance_issues_no_request() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_json(json!({"query": {}}));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut e = enumerator(&transport);
    assert!(matches!(e.advance(&cancel).await, Err(Error::Cancelled)));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(e.state(), EnumeratorState::Faulted);

    let fresh = CancellationToken::new();
    assert!(matches!(e.advance(&fresh).await, Err(Error::EnumerationFinished)));
}

#[tokio::test]
async fn test_into_stream_yields_pages_then_stops_after_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .push_json(json!({"continue": {"apcontinue": "B"}, "query": {"n": 1}}))
        .push(Ok(HttpResponse::new(ENDPOINT, 500, "")));

    let items: Vec<_> = enumerator(&transport)
        .into_stream(CancellationToken::new())
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &json!({"n": 1}));
    assert!(items[1].is_err());
}

// ============================================================================
// QueryEnumerator Tests (HTTP)
// ============================================================================

#[tokio::test]
async fn test_enumerates_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param_is_missing("apcontinue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "continue": {"apcontinue": "Beta", "continue": "-||"},
            "query": {"allpages": [{"title": "Alpha"}]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("apcontinue", "Beta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": "",
            "query": {"allpages": [{"title": "Beta"}]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = crate::http::HttpClient::new().unwrap();
    let pages = QueryEnumerator::new(
        Arc::new(client),
        format!("{}/w/api.php", mock_server.uri()),
        base_params(),
    )
    .collect_all(&CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1]["allpages"][0]["title"], "Beta");
}

#[tokio::test]
async fn test_cancel_during_in_flight_advance() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"query": {}}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = crate::http::HttpClient::new().unwrap();
    let mut e = QueryEnumerator::new(Arc::new(client), mock_server.uri(), base_params());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    assert!(matches!(e.advance(&cancel).await, Err(Error::Cancelled)));
    assert_eq!(e.state(), EnumeratorState::Faulted);
    assert!(e.advance(&CancellationToken::new()).await.is_err());
}
