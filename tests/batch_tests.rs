use persian_normalizer::{BatchRunner, CancelFlag, NormalizeError, Normalizer, NormalizerConfig};
use std::sync::Arc;

fn tweets() -> Vec<String> {
    let base = [
        "سلام چطوری؟ امروز خیلی هوا خوبه!",
        "چرا انقدر ترافیک زیاده؟؟؟ خسته شدم",
        "کاش یه روز بدون استرس داشته باشیم...",
        "@ali سلام خوبی؟ کجایی؟",
        "بیا اینو ببین چه باحاله https://t.co/test",
        "نمیدونم چرا انقدر خوابم میاد...",
        "سلامممممم به همه دوستام!",
        "این خوبه ها",
    ];
    (0..150)
        .map(|i| format!("{} {}", base[i % base.len()], i))
        .collect()
}

#[test]
fn test_parallel_batch_preserves_order() {
    let runner = BatchRunner::new(Arc::new(Normalizer::default()), 4, 100).unwrap();
    let inputs = tweets();
    assert!(runner.is_parallel(inputs.len()));

    let out = runner.normalize_many(&inputs);
    assert_eq!(out.len(), inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        assert_eq!(out[i], runner.normalizer().normalize_sentence(input), "index {i}");
    }
    assert_eq!(out[7], "این خوبه\u{200c}ها ۷");
    assert_eq!(out[149], runner.normalizer().normalize_sentence(&inputs[149]));
}

#[test]
fn test_sequential_and_parallel_agree() {
    let inputs = tweets();
    let sequential = BatchRunner::new(Arc::new(Normalizer::default()), 1, usize::MAX).unwrap();
    let parallel = BatchRunner::new(Arc::new(Normalizer::default()), 3, 1).unwrap();
    assert!(!sequential.is_parallel(inputs.len()));
    assert_eq!(sequential.normalize_many(&inputs), parallel.normalize_many(&inputs));
}

#[test]
fn test_empty_strings_in_batch() {
    let runner = BatchRunner::new(Arc::new(Normalizer::default()), 2, 2).unwrap();
    let inputs = vec![String::new(); 5];
    assert_eq!(runner.normalize_many(&inputs), vec![String::new(); 5]);
}

#[test]
fn test_injected_pool() {
    let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap());
    let runner = BatchRunner::with_pool(Arc::new(Normalizer::default()), Arc::clone(&pool), 10);
    assert_eq!(runner.workers(), 2);
    let inputs: Vec<&str> = vec!["میدونم"; 20];
    let out = runner.normalize_many(&inputs);
    assert!(out.iter().all(|o| o == "می\u{200c}دونم"));
}

#[test]
fn test_batch_fails_fast_with_index() {
    let runner = BatchRunner::from_config(&NormalizerConfig::default()).unwrap();
    let mut raw: Vec<Vec<u8>> = tweets().into_iter().map(String::into_bytes).collect();
    raw[120] = vec![0x80, 0x80];
    raw[130] = vec![0xff];

    let err = runner.try_normalize_many(&raw).unwrap_err();
    match &err {
        NormalizeError::InvalidInput { index, .. } => assert_eq!(*index, Some(120)),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("index 120"));
}

#[test]
fn test_batch_bytes_success() {
    let runner = BatchRunner::from_config(&NormalizerConfig::default()).unwrap();
    let raw: Vec<&[u8]> = vec!["این خوبه ها".as_bytes(), "3.14".as_bytes()];
    assert_eq!(
        runner.try_normalize_many(&raw).unwrap(),
        vec!["این خوبه\u{200c}ها".to_string(), "۳٫۱۴".to_string()]
    );
}

#[test]
fn test_cancellation_keeps_collected_results() {
    let runner = BatchRunner::new(Arc::new(Normalizer::default()), 2, 10).unwrap();
    let inputs = tweets();

    let cancel = CancelFlag::new();
    let full = runner.normalize_many_cancellable(&inputs, &cancel);
    assert!(full.iter().all(Option::is_some));

    cancel.cancel();
    let skipped = runner.normalize_many_cancellable(&inputs, &cancel);
    assert_eq!(skipped.len(), inputs.len());
    assert!(skipped.iter().all(Option::is_none));

    // whatever completed is the same value an uncancelled run produces
    for (done, expected) in full.iter().zip(runner.normalize_many(&inputs)) {
        assert_eq!(done.as_deref(), Some(expected.as_str()));
    }
}

#[test]
fn test_shared_cache_under_parallel_word_calls() {
    use rayon::prelude::*;

    let normalizer = Arc::new(Normalizer::new(
        NormalizerConfig::default().build_rules(),
        16,
    ));
    let words: Vec<String> = (0..400).map(|i| format!("WORD{}!", i % 40)).collect();
    let out: Vec<String> = words.par_iter().map(|w| normalizer.normalize_word(w)).collect();

    for (w, o) in words.iter().zip(&out) {
        assert_eq!(*o, normalizer.normalize_word_uncached(w));
    }
    assert!(normalizer.cache().len() <= 16);
}
