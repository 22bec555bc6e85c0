//! Concurrency bound and deadline behaviour of `BoundedGenerator`.

use std::sync::Arc;
use std::time::Duration;

use calweave_textgen::fakes::ScriptedGenerator;
use calweave_textgen::{
    BoundedGenerator, BoundedGeneratorConfig, GenerationError, GenerationRequest, TextGenerator,
};
use serde_json::json;

#[tokio::test]
async fn test_in_flight_calls_never_exceed_permits() {
    let inner = Arc::new(
        ScriptedGenerator::new()
            .with_delay(Duration::from_millis(20))
            .fallback(json!({ "ok": true })),
    );
    let bounded = Arc::new(BoundedGenerator::new(
        inner.clone(),
        BoundedGeneratorConfig {
            max_concurrent: 2,
            timeout: Duration::from_secs(5),
        },
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let bounded = Arc::clone(&bounded);
        handles.push(tokio::spawn(async move {
            bounded
                .generate(GenerationRequest::new(format!("task-{i}"), "p"))
                .await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }

    assert_eq!(inner.calls().len(), 8);
    assert!(inner.peak_in_flight() <= 2, "peak was {}", inner.peak_in_flight());
    assert_eq!(bounded.available_permits(), 2);
}

#[tokio::test]
async fn test_slow_call_maps_to_timeout() {
    let inner = Arc::new(
        ScriptedGenerator::new()
            .with_delay(Duration::from_millis(200))
            .fallback(json!({})),
    );
    let bounded = BoundedGenerator::new(
        inner,
        BoundedGeneratorConfig {
            max_concurrent: 1,
            timeout: Duration::from_millis(10),
        },
    );

    let err = bounded
        .generate(GenerationRequest::new("slow", "p"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Timeout { .. }));
}

#[tokio::test]
async fn test_zero_permits_is_clamped_to_one() {
    let inner = Arc::new(ScriptedGenerator::new().fallback(json!({ "v": 1 })));
    let bounded = BoundedGenerator::new(
        inner,
        BoundedGeneratorConfig {
            max_concurrent: 0,
            timeout: Duration::from_secs(1),
        },
    );
    assert_eq!(bounded.available_permits(), 1);
    let data = bounded
        .generate(GenerationRequest::new("t", "p"))
        .await
        .unwrap();
    assert_eq!(data["v"], 1);
}
