#![no_main]

use keycase_core::{KeyTransformer, StructuredValue, DEFAULT_SENTINEL_KEY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<StructuredValue>(data) else {
        return;
    };

    let camel = KeyTransformer::camel();
    let once = camel.transform(&value);
    assert_eq!(camel.transform(&once), once);

    let snake = camel.inverse().with_sentinel_key(DEFAULT_SENTINEL_KEY);
    let (out, stats) = snake.transform_with_stats(value.clone());
    assert!(stats.keys_rewritten <= stats.keys_visited);
    assert_eq!(snake.audit(&value).len() as u64, stats.keys_rewritten);

    // Serializing never fails for values parsed from JSON
    let _ = serde_json::to_vec(&out).expect("serializable");
});
