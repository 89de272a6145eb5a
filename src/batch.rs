//! Fan-out of sentence normalization over many independent texts.

use crate::config::NormalizerConfig;
use crate::error::{NormalizeError, Result};
use crate::normalize::Normalizer;
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller raises to stop a running batch. Items already
/// normalized keep their results; items not yet started are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs [`Normalizer::normalize_sentence`] over a slice of texts.
///
/// Batches shorter than `parallel_threshold` run on the calling thread;
/// larger ones are spread over a rayon pool. Output position `i` always holds
/// the result for input position `i`.
pub struct BatchRunner {
    normalizer: Arc<Normalizer>,
    pool: Arc<ThreadPool>,
    parallel_threshold: usize,
}

impl BatchRunner {
    /// Builds a dedicated pool with `workers` threads (0 picks one per CPU).
    pub fn new(
        normalizer: Arc<Normalizer>,
        workers: usize,
        parallel_threshold: usize,
    ) -> Result<Self> {
        let workers = if workers == 0 { num_cpus::get().max(1) } else { workers };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("normalize-{i}"))
            .build()?;
        debug!("batch pool built with {} workers", workers);
        Ok(Self::with_pool(normalizer, Arc::new(pool), parallel_threshold))
    }

    /// Uses a caller-supplied pool, e.g. one shared with other work.
    pub fn with_pool(
        normalizer: Arc<Normalizer>,
        pool: Arc<ThreadPool>,
        parallel_threshold: usize,
    ) -> Self {
        BatchRunner {
            normalizer,
            pool,
            parallel_threshold: parallel_threshold.max(1),
        }
    }

    pub fn from_config(config: &NormalizerConfig) -> Result<Self> {
        let normalizer = Normalizer::from_config(config)?;
        Self::new(
            Arc::new(normalizer),
            config.resolved_workers(),
            config.parallel_threshold,
        )
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn is_parallel(&self, len: usize) -> bool {
        len >= self.parallel_threshold
    }

    pub fn normalize_many<S>(&self, texts: &[S]) -> Vec<String>
    where
        S: AsRef<str> + Sync,
    {
        let normalizer = &*self.normalizer;
        if !self.is_parallel(texts.len()) {
            return texts
                .iter()
                .map(|t| normalizer.normalize_sentence(t.as_ref()))
                .collect();
        }

        debug!(
            "normalizing {} texts on {} workers",
            texts.len(),
            self.workers()
        );
        self.pool.install(|| {
            texts
                .par_iter()
                .map(|t| normalizer.normalize_sentence(t.as_ref()))
                .collect()
        })
    }

    /// Byte-level batch. Every item is checked in input order before any
    /// work starts; the first item that is not UTF-8 fails the whole batch
    /// and its index is reported.
    pub fn try_normalize_many<B>(&self, raw: &[B]) -> Result<Vec<String>>
    where
        B: AsRef<[u8]> + Sync,
    {
        let texts = raw
            .iter()
            .enumerate()
            .map(|(i, bytes)| {
                std::str::from_utf8(bytes.as_ref())
                    .map_err(|e| NormalizeError::invalid_utf8(Some(i), e))
            })
            .collect::<Result<Vec<&str>>>()?;
        Ok(self.normalize_many(&texts))
    }

    /// Like [`normalize_many`](Self::normalize_many), but items that had not
    /// started when `cancel` was raised come back as `None`.
    pub fn normalize_many_cancellable<S>(
        &self,
        texts: &[S],
        cancel: &CancelFlag,
    ) -> Vec<Option<String>>
    where
        S: AsRef<str> + Sync,
    {
        self.run_cancellable(texts, cancel, |_| {})
    }

    // `after_item` sees the index of every item that finished normalizing.
    fn run_cancellable<S, F>(
        &self,
        texts: &[S],
        cancel: &CancelFlag,
        after_item: F,
    ) -> Vec<Option<String>>
    where
        S: AsRef<str> + Sync,
        F: Fn(usize) + Sync,
    {
        let normalizer = &*self.normalizer;
        let after_item = &after_item;
        let run = |(i, t): (usize, &S)| {
            if cancel.is_cancelled() {
                return None;
            }
            let normalized = normalizer.normalize_sentence(t.as_ref());
            after_item(i);
            Some(normalized)
        };

        if !self.is_parallel(texts.len()) {
            return texts.iter().enumerate().map(run).collect();
        }
        self.pool
            .install(|| texts.par_iter().enumerate().map(run).collect())
    }
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("workers", &self.workers())
            .field("parallel_threshold", &self.parallel_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(threshold: usize) -> BatchRunner {
        BatchRunner::new(Arc::new(Normalizer::default()), 2, threshold).unwrap()
    }

    #[test]
    fn test_threshold_switch() {
        let r = runner(100);
        assert!(!r.is_parallel(99));
        assert!(r.is_parallel(100));
        assert_eq!(r.workers(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let r = runner(100);
        let empty: Vec<String> = Vec::new();
        assert!(r.normalize_many(&empty).is_empty());
    }

    #[test]
    fn test_sequential_path_matches_single_calls() {
        let r = runner(100);
        let texts = ["سلام چطوری؟", "", "این خوبه ها"];
        let out = r.normalize_many(&texts);
        assert_eq!(out.len(), 3);
        for (i, t) in texts.iter().enumerate() {
            assert_eq!(out[i], r.normalizer().normalize_sentence(t));
        }
    }

    #[test]
    fn test_invalid_item_reports_index() {
        let r = runner(2);
        let raw: Vec<Vec<u8>> = vec![
            "سلام".as_bytes().to_vec(),
            "خوبی".as_bytes().to_vec(),
            vec![0xff, 0xfe],
            vec![0xc3],
        ];
        match r.try_normalize_many(&raw) {
            Err(NormalizeError::InvalidInput { index, .. }) => assert_eq!(index, Some(2)),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let r = runner(2);
        let texts = vec!["سلام"; 10];
        let cancel = CancelFlag::new();
        cancel.cancel();
        let out = r.normalize_many_cancellable(&texts, &cancel);
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn test_cancel_mid_sequential_batch() {
        let r = runner(100);
        let texts: Vec<String> = (0..10).map(|i| format!("میدونم {i}")).collect();
        let cancel = CancelFlag::new();
        let out = r.run_cancellable(&texts, &cancel, |i| {
            if i == 2 {
                cancel.cancel();
            }
        });

        assert_eq!(out.len(), 10);
        for (i, o) in out.iter().enumerate() {
            if i < 3 {
                let expected = r.normalizer().normalize_sentence(&texts[i]);
                assert_eq!(o.as_deref(), Some(expected.as_str()));
            } else {
                assert!(o.is_none(), "index {i} ran after cancel");
            }
        }
    }

    #[test]
    fn test_cancel_mid_parallel_batch() {
        use std::sync::atomic::AtomicUsize;

        let r = runner(10);
        let texts: Vec<String> = (0..150).map(|i| format!("سلامممم {i} خوبه ها")).collect();
        assert!(r.is_parallel(texts.len()));

        let cancel = CancelFlag::new();
        let finished = AtomicUsize::new(0);
        let out = r.run_cancellable(&texts, &cancel, |_| {
            if finished.fetch_add(1, Ordering::SeqCst) + 1 == 20 {
                cancel.cancel();
            }
        });

        assert_eq!(out.len(), texts.len());
        let done = out.iter().filter(|o| o.is_some()).count();
        // at most one in-flight item per worker can still finish
        assert!(done >= 20 && done <= 20 + r.workers(), "{done} items finished");
        assert!(out.iter().any(Option::is_none));
        for (i, o) in out.iter().enumerate() {
            if let Some(s) = o {
                assert_eq!(*s, r.normalizer().normalize_sentence(&texts[i]), "index {i}");
            }
        }
    }

    #[test]
    fn test_not_cancelled_returns_all() {
        let r = runner(2);
        let texts = vec!["سلام"; 10];
        let out = r.normalize_many_cancellable(&texts, &CancelFlag::new());
        assert!(out.iter().all(|o| o.as_deref() == Some("سلام")));
    }
}
