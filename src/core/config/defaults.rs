use serde_json::{json, Value};

/// Baseline configuration merged under whatever `config.yml` provides.
pub fn default_config() -> Value {
    json!({
        "server": {
            "cors_allowed_origins": []
        },
        "scrape": {
            "target_urls": [],
            "concurrency": 4,
            "max_retries": 3,
            "request_timeout_secs": 30,
            "min_request_interval_ms": 1500
        },
        "retrieval": {
            "top_k": 5,
            "min_score": 0.3
        },
        "generation": {
            "model": "gemini-2.0-flash",
            "max_prompt_chars": 4000,
            "timeout_secs": 30,
            "max_inflight": 4,
            "temperature": 0.3
        },
        "embedding": {
            "backend": "gemini",
            "model": "text-embedding-004",
            "dimension": 768,
            "timeout_secs": 20
        },
        "gemini": {
            "api_key": null,
            "base_url": "https://generativelanguage.googleapis.com/v1beta"
        }
    })
}
