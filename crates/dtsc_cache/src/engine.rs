//! High-level build orchestrator.
//!
//! [`CacheEngine`] ties together the cache store, staleness detector, batch
//! scheduler, and eviction policy. One call to [`CacheEngine::build`] walks
//! the phases `Idle → CacheLoading → EntriesEvaluated → (NoWork | Generating
//! → OutputsWritten) → CachePersisted → Idle`. A build with no entrypoints
//! stops at `NoWork` without touching the cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dtsc_common::now_millis;
use dtsc_config::Options;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::CacheError;
use crate::eviction::EvictionPolicy;
use crate::paths::plan_outputs;
use crate::scheduler::{generate_batches, Bundler};
use crate::staleness::{check, invalidate_stale_keys, observe_all, CompareMode, Observation, Staleness};
use crate::store::{CacheEntry, CacheFile, CacheStore, ColdReason};
use crate::tsconfig::resolve_config_hint;

/// Phase of the build state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// No build in progress.
    Idle,
    /// Loading or initializing the cache.
    CacheLoading,
    /// Stale keys pruned and every entrypoint classified.
    EntriesEvaluated,
    /// Nothing to regenerate.
    NoWork,
    /// Bundler batches in flight.
    Generating,
    /// Declaration files written and cache entries updated.
    OutputsWritten,
    /// Eviction applied and the cache persisted if needed.
    CachePersisted,
}

/// How a build finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every entrypoint was fresh (or there were none); the bundler was not called.
    NoWork,
    /// At least one entrypoint was regenerated.
    Generated,
}

/// Inputs supplied by the host for one build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Entrypoint source files. Sorted and de-duplicated by the engine.
    pub entrypoints: Vec<PathBuf>,
    /// Directory receiving the generated declaration files.
    pub outdir: PathBuf,
}

/// Counts of cache mutations accumulated during one build.
///
/// Whether the cache is persisted is decided from this log alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationLog {
    /// Entries dropped because their entrypoint disappeared.
    pub pruned: usize,
    /// Entries whose `last_used` was bumped during validation.
    pub touched: usize,
    /// Entries inserted or replaced with regenerated content.
    pub updated: usize,
    /// Entries removed by the eviction policy.
    pub evicted: usize,
}

impl MutationLog {
    /// Returns `true` if any mutation was recorded.
    pub fn is_dirty(&self) -> bool {
        self.pruned + self.touched + self.updated + self.evicted > 0
    }
}

/// Summary of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// How the build finished.
    pub outcome: BuildOutcome,
    /// Entrypoints sent to the bundler, in order.
    pub regenerated: Vec<PathBuf>,
    /// Entrypoints served from the cache.
    pub reused: Vec<PathBuf>,
    /// Output files written.
    pub written: Vec<PathBuf>,
    /// Cache keys pruned because their entrypoint is gone.
    pub pruned: Vec<PathBuf>,
    /// Cache keys evicted by the size bound.
    pub evicted: Vec<PathBuf>,
    /// Mutations recorded against the cache.
    pub mutations: MutationLog,
    /// Whether the cache file was written.
    pub persisted: bool,
    /// Why the load started cold, if it did. `None` for a warm load or when caching is disabled.
    pub cold: Option<ColdReason>,
    /// Phases entered during the build, in order, not counting `Idle`.
    pub phases: Vec<BuildPhase>,
}

impl BuildReport {
    fn new(cold: Option<ColdReason>) -> Self {
        Self {
            outcome: BuildOutcome::NoWork,
            regenerated: Vec::new(),
            reused: Vec::new(),
            written: Vec::new(),
            pruned: Vec::new(),
            evicted: Vec::new(),
            mutations: MutationLog::default(),
            persisted: false,
            cold,
            phases: Vec::new(),
        }
    }
}

/// Incremental declaration-bundle cache engine.
///
/// The engine exclusively owns the in-memory [`CacheFile`] for the duration
/// of a build; `build` takes `&mut self`, so one engine never runs two builds
/// at once. The cache is reloaded from disk at the start of every build.
pub struct CacheEngine {
    /// Root used for probing the config hint.
    root: PathBuf,

    /// Persisted store, or `None` when caching is disabled.
    store: Option<CacheStore>,

    /// Working snapshot of the cache.
    cache: CacheFile,

    compare: CompareMode,
    hash_contents: bool,
    parallel_limit: usize,
    eviction: EvictionPolicy,
    tsconfig: Option<PathBuf>,
    phase: BuildPhase,
    trace: Vec<BuildPhase>,
}

impl CacheEngine {
    /// Creates an engine from options, resolving relative paths against `root`.
    ///
    /// Caching is disabled when no cache directory is configured; the engine
    /// then performs no cache I/O and regenerates every entrypoint.
    pub fn new(options: &Options, root: &Path) -> Self {
        let store = options
            .resolve_cache_dir(root)
            .map(|dir| CacheStore::new(&dir, &options.cache_version));
        let enabled = store.is_some();

        Self {
            root: root.to_path_buf(),
            store,
            cache: CacheFile::new(&options.cache_version),
            compare: CompareMode::from_hashing(options.use_content_hashing),
            hash_contents: options.use_content_hashing && enabled,
            parallel_limit: options.parallel_limit.max(1),
            eviction: EvictionPolicy::from_max_entries(options.max_cache_entries),
            tsconfig: options.tsconfig.as_ref().map(|p| root.join(p)),
            phase: BuildPhase::Idle,
            trace: Vec::new(),
        }
    }

    /// Returns `true` if a cache directory is configured.
    pub fn caching_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the cache store, if caching is enabled.
    pub fn store(&self) -> Option<&CacheStore> {
        self.store.as_ref()
    }

    /// Returns the working cache snapshot.
    pub fn cache(&self) -> &CacheFile {
        &self.cache
    }

    /// Returns the current build phase.
    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    fn enter(&mut self, phase: BuildPhase) {
        debug!(from = ?self.phase, to = ?phase, "build phase");
        if phase != BuildPhase::Idle {
            self.trace.push(phase);
        }
        self.phase = phase;
    }

    /// Runs one build: load, evaluate, generate, write, evict, and persist.
    ///
    /// Only output collisions, bundler failures and output write failures
    /// are returned as errors. A corrupt cache starts cold and a failed cache
    /// write is logged; neither affects the generated output.
    pub async fn build(
        &mut self,
        bundler: &dyn Bundler,
        request: &BuildRequest,
    ) -> Result<BuildReport, CacheError> {
        self.trace.clear();
        let result = self.run(bundler, request).await;
        self.enter(BuildPhase::Idle);
        let phases = std::mem::take(&mut self.trace);
        result.map(|report| BuildReport { phases, ..report })
    }

    async fn run(
        &mut self,
        bundler: &dyn Bundler,
        request: &BuildRequest,
    ) -> Result<BuildReport, CacheError> {
        self.enter(BuildPhase::CacheLoading);

        if let Err(e) = tokio::fs::create_dir_all(&request.outdir).await {
            debug!(outdir = %request.outdir.display(), error = %e, "could not create output directory");
        }
        let cold = self.load().await;
        let mut report = BuildReport::new(cold);
        let mut log = MutationLog::default();

        let mut entrypoints = request.entrypoints.clone();
        entrypoints.sort();
        entrypoints.dedup();
        if entrypoints.is_empty() {
            self.enter(BuildPhase::NoWork);
            return Ok(report);
        }
        let outputs = plan_outputs(&entrypoints, &request.outdir)?;

        if self.caching_enabled() {
            report.pruned = invalidate_stale_keys(&mut self.cache, &entrypoints);
            log.pruned = report.pruned.len();
        }

        let observations = observe_all(&entrypoints, self.hash_contents).await;
        let mut stale: Vec<Observation> = Vec::new();
        let now = now_millis();
        for observed in observations {
            let verdict = if self.caching_enabled() {
                check(&mut self.cache, &observed, self.compare, now)
            } else {
                Staleness::Missing
            };
            if verdict != Staleness::Missing {
                log.touched += 1;
            }
            if verdict.is_stale() {
                stale.push(observed);
            } else {
                report.reused.push(observed.path);
            }
        }
        self.enter(BuildPhase::EntriesEvaluated);
        debug!(stale = stale.len(), fresh = report.reused.len(), "entrypoints evaluated");

        if stale.is_empty() {
            self.enter(BuildPhase::NoWork);
            self.finalize(&mut report, log).await;
            self.enter(BuildPhase::CachePersisted);
            info!(reused = report.reused.len(), "declarations up to date");
            return Ok(report);
        }

        self.enter(BuildPhase::Generating);
        let hint = resolve_config_hint(self.tsconfig.as_deref(), &self.root).await;
        let stale_paths: Vec<PathBuf> = stale.iter().map(|o| o.path.clone()).collect();
        let mut generated =
            generate_batches(bundler, &stale_paths, hint.as_deref(), self.parallel_limit).await?;

        report.written = write_outputs(&stale_paths, &generated, &outputs).await?;

        if self.caching_enabled() {
            let now = now_millis();
            for observed in stale {
                // Unreadable sources are regenerated every build and never cached.
                if !observed.readable {
                    if self.cache.entries.remove(&observed.path).is_some() {
                        log.updated += 1;
                    }
                    continue;
                }
                let content = generated.remove(&observed.path).unwrap_or_default();
                self.cache.entries.insert(
                    observed.path,
                    CacheEntry {
                        hash: observed.hash,
                        mtime: observed.mtime,
                        content,
                        last_used: now,
                    },
                );
                log.updated += 1;
            }
        }
        report.regenerated = stale_paths;
        report.outcome = BuildOutcome::Generated;
        self.enter(BuildPhase::OutputsWritten);

        self.finalize(&mut report, log).await;
        self.enter(BuildPhase::CachePersisted);

        info!(
            regenerated = report.regenerated.len(),
            reused = report.reused.len(),
            evicted = report.evicted.len(),
            persisted = report.persisted,
            "declarations generated"
        );
        Ok(report)
    }

    /// Applies eviction and persists the cache if anything changed.
    async fn finalize(&mut self, report: &mut BuildReport, mut log: MutationLog) {
        if self.caching_enabled() {
            report.evicted = self.eviction.evict(&mut self.cache);
            log.evicted = report.evicted.len();
        }
        report.persisted = self.persist(&log).await;
        report.mutations = log;
    }

    async fn load(&mut self) -> Option<ColdReason> {
        let Some(store) = &self.store else {
            return None;
        };
        let (cache, cold) = store.load().await.into_cache(store.version());
        self.cache = cache;
        cold
    }

    /// Saves the cache if it is enabled and the log is dirty. Returns whether it was written.
    async fn persist(&self, log: &MutationLog) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        if !log.is_dirty() {
            return false;
        }
        match store.save(&self.cache).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %store.path().display(), error = %e, "failed to write cache file");
                false
            }
        }
    }
}

/// Writes each regenerated declaration concurrently, returning the written paths.
async fn write_outputs(
    paths: &[PathBuf],
    generated: &BTreeMap<PathBuf, String>,
    outputs: &BTreeMap<PathBuf, PathBuf>,
) -> Result<Vec<PathBuf>, CacheError> {
    let writes = paths
        .iter()
        .filter_map(|entry| outputs.get(entry).map(|out| (entry, out)))
        .map(|(entry, out)| async move {
            if let Some(dir) = out.parent() {
                if let Err(e) = tokio::fs::create_dir_all(dir).await {
                    debug!(dir = %dir.display(), error = %e, "could not create output directory");
                }
            }
            let content = generated.get(entry).map(String::as_str).unwrap_or_default();
            tokio::fs::write(out, content)
                .await
                .map_err(|e| CacheError::Io {
                    path: out.clone(),
                    source: e,
                })?;
            Ok::<_, CacheError>(out.clone())
        });

    join_all(writes).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::{declaration_for, RecordingBundler};
    use crate::store::LoadOutcome;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn source(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.root().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn request(&self, entrypoints: Vec<PathBuf>) -> BuildRequest {
            BuildRequest {
                entrypoints,
                outdir: self.root().join("dist"),
            }
        }

        fn cached_options(&self) -> Options {
            Options::default().with_cache_dir(self.root().join(".cache"))
        }
    }

    #[tokio::test]
    async fn first_build_generates_everything() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let b = fx.source("src/nested/b.ts", "export const b = 2;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let report = engine
            .build(&bundler, &fx.request(vec![b.clone(), a.clone()]))
            .await
            .unwrap();

        assert_eq!(report.outcome, BuildOutcome::Generated);
        assert_eq!(report.regenerated, vec![a.clone(), b.clone()]);
        assert!(report.reused.is_empty());
        assert!(report.persisted);
        assert_eq!(report.cold, Some(ColdReason::Missing));
        assert_eq!(engine.phase(), BuildPhase::Idle);

        let out_a = fx.root().join("dist/a.d.ts");
        let out_b = fx.root().join("dist/nested/b.d.ts");
        assert_eq!(std::fs::read_to_string(&out_a).unwrap(), declaration_for(&a));
        assert_eq!(std::fs::read_to_string(&out_b).unwrap(), declaration_for(&b));
        assert_eq!(engine.cache().entries[&a].content, declaration_for(&a));
    }

    #[tokio::test]
    async fn second_build_reuses_everything() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();

        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        let report = engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        assert_eq!(report.outcome, BuildOutcome::NoWork);
        assert!(report.regenerated.is_empty());
        assert_eq!(report.reused, vec![a]);
        assert_eq!(report.cold, None);
        assert_eq!(report.mutations.touched, 1);
        assert!(report.persisted, "last_used bumps are persisted");
        assert_eq!(bundler.calls(), 1);
    }

    #[tokio::test]
    async fn changed_source_is_regenerated() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let b = fx.source("src/b.ts", "export const b = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine
            .build(&bundler, &fx.request(vec![a.clone(), b.clone()]))
            .await
            .unwrap();

        fx.source("src/b.ts", "export const b = 2;");
        let report = engine
            .build(&bundler, &fx.request(vec![a.clone(), b.clone()]))
            .await
            .unwrap();

        assert_eq!(report.regenerated, vec![b.clone()]);
        assert_eq!(report.reused, vec![a]);
        assert_eq!(bundler.batch_sizes(), vec![2, 1]);
        assert_eq!(
            engine.cache().entries[&b].hash,
            dtsc_common::ContentHash::from_bytes(b"export const b = 2;").to_hex()
        );
    }

    #[tokio::test]
    async fn cache_hits_are_not_rewritten() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let b = fx.source("src/b.ts", "export const b = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine
            .build(&bundler, &fx.request(vec![a.clone(), b.clone()]))
            .await
            .unwrap();

        let out_a = fx.root().join("dist/a.d.ts");
        std::fs::write(&out_a, "// hand edited").unwrap();
        fx.source("src/b.ts", "export const b = 2;");

        let report = engine
            .build(&bundler, &fx.request(vec![a, b]))
            .await
            .unwrap();
        assert_eq!(report.written, vec![fx.root().join("dist/b.d.ts")]);
        assert_eq!(std::fs::read_to_string(&out_a).unwrap(), "// hand edited");
    }

    #[tokio::test]
    async fn removed_entrypoint_is_pruned() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let b = fx.source("src/b.ts", "export const b = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine
            .build(&bundler, &fx.request(vec![a.clone(), b.clone()]))
            .await
            .unwrap();

        let report = engine.build(&bundler, &fx.request(vec![b.clone()])).await.unwrap();
        assert_eq!(report.pruned, vec![a.clone()]);
        assert_eq!(report.outcome, BuildOutcome::NoWork);
        assert!(report.persisted);

        let store = engine.store().unwrap();
        match store.load().await {
            LoadOutcome::Warm(cache) => {
                assert!(!cache.entries.contains_key(&a));
                assert!(cache.entries.contains_key(&b));
            }
            LoadOutcome::Cold(reason) => panic!("expected warm cache, got {reason}"),
        }
    }

    #[tokio::test]
    async fn empty_entrypoints_leave_cache_alone() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        let report = engine.build(&bundler, &fx.request(vec![])).await.unwrap();
        assert_eq!(report.outcome, BuildOutcome::NoWork);
        assert!(report.pruned.is_empty());
        assert!(!report.persisted);
        assert!(engine.cache().entries.contains_key(&a));
    }

    #[tokio::test]
    async fn eviction_runs_after_generation() {
        let fx = Fixture::new();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| fx.source(&format!("src/m{i}.ts"), &format!("export const v = {i};")))
            .collect();
        let bundler = RecordingBundler::default();
        let options = Options {
            max_cache_entries: Some(2),
            ..fx.cached_options()
        };
        let mut engine = CacheEngine::new(&options, fx.root());

        let report = engine.build(&bundler, &fx.request(paths.clone())).await.unwrap();
        assert_eq!(report.regenerated.len(), 3);
        assert_eq!(report.written.len(), 3);
        assert_eq!(report.evicted.len(), 1);
        assert_eq!(engine.cache().len(), 2);
    }

    #[tokio::test]
    async fn mtime_mode_skips_hashing() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let options = Options {
            use_content_hashing: false,
            ..fx.cached_options()
        };
        let mut engine = CacheEngine::new(&options, fx.root());
        engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        let entry = &engine.cache().entries[&a];
        assert!(entry.hash.is_empty());
        assert!(entry.mtime > 0);

        let report = engine.build(&bundler, &fx.request(vec![a])).await.unwrap();
        assert_eq!(report.outcome, BuildOutcome::NoWork);
    }

    #[tokio::test]
    async fn disabled_cache_always_regenerates() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&Options::default(), fx.root());
        assert!(!engine.caching_enabled());

        for _ in 0..2 {
            let report = engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();
            assert_eq!(report.regenerated, vec![a.clone()]);
            assert!(!report.persisted);
            assert_eq!(report.cold, None);
        }
        assert_eq!(bundler.calls(), 2);
        assert!(engine.cache().is_empty());
        assert!(!fx.root().join(".cache").exists());
    }

    #[tokio::test]
    async fn missing_source_is_regenerated() {
        let fx = Fixture::new();
        let ghost = fx.root().join("src/ghost.ts");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let report = engine.build(&bundler, &fx.request(vec![ghost.clone()])).await.unwrap();
        assert_eq!(report.regenerated, vec![ghost.clone()]);
        assert!(!engine.cache().entries.contains_key(&ghost));

        let report = engine.build(&bundler, &fx.request(vec![ghost.clone()])).await.unwrap();
        assert_eq!(report.outcome, BuildOutcome::Generated);
        assert_eq!(report.regenerated, vec![ghost]);
        assert_eq!(bundler.calls(), 2);
    }

    #[tokio::test]
    async fn deleted_source_drops_its_entry() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        std::fs::remove_file(&a).unwrap();
        for _ in 0..2 {
            let report = engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();
            assert_eq!(report.regenerated, vec![a.clone()]);
            assert!(!engine.cache().entries.contains_key(&a));
        }
        assert_eq!(bundler.calls(), 3);
    }

    #[tokio::test]
    async fn generated_build_walks_every_phase() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let report = engine.build(&bundler, &fx.request(vec![a])).await.unwrap();
        assert_eq!(
            report.phases,
            vec![
                BuildPhase::CacheLoading,
                BuildPhase::EntriesEvaluated,
                BuildPhase::Generating,
                BuildPhase::OutputsWritten,
                BuildPhase::CachePersisted,
            ]
        );
        assert_eq!(engine.phase(), BuildPhase::Idle);
    }

    #[tokio::test]
    async fn up_to_date_build_still_persists() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());
        engine.build(&bundler, &fx.request(vec![a.clone()])).await.unwrap();

        let report = engine.build(&bundler, &fx.request(vec![a])).await.unwrap();
        assert_eq!(report.outcome, BuildOutcome::NoWork);
        assert!(report.persisted);
        assert_eq!(
            report.phases,
            vec![
                BuildPhase::CacheLoading,
                BuildPhase::EntriesEvaluated,
                BuildPhase::NoWork,
                BuildPhase::CachePersisted,
            ]
        );
    }

    #[tokio::test]
    async fn empty_build_stops_at_no_work() {
        let fx = Fixture::new();
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let report = engine.build(&bundler, &fx.request(vec![])).await.unwrap();
        assert_eq!(report.phases, vec![BuildPhase::CacheLoading, BuildPhase::NoWork]);
        assert_eq!(engine.phase(), BuildPhase::Idle);
    }

    #[tokio::test]
    async fn colliding_outputs_abort_before_generation() {
        let fx = Fixture::new();
        let ts = fx.source("src/a.ts", "export const a = 1;");
        let tsx = fx.source("src/a.tsx", "export const a = 2;");
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let err = engine
            .build(&bundler, &fx.request(vec![tsx.clone(), ts.clone()]))
            .await
            .unwrap_err();
        match err {
            CacheError::OutputCollision { output, first, second } => {
                assert_eq!(output, fx.root().join("dist/a.d.ts"));
                assert_eq!((first, second), (ts, tsx));
            }
            other => panic!("expected collision, got {other}"),
        }
        assert_eq!(bundler.calls(), 0);
        assert!(!fx.root().join("dist/a.d.ts").exists());
        assert!(!engine.store().unwrap().path().exists());
        assert_eq!(engine.phase(), BuildPhase::Idle);
    }

    #[tokio::test]
    async fn bundler_failure_aborts_build() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler {
            fail_on_call: Some(0),
            ..RecordingBundler::default()
        };
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let err = engine.build(&bundler, &fx.request(vec![a])).await.unwrap_err();
        assert!(matches!(err, CacheError::Bundler(_)));
        assert_eq!(engine.phase(), BuildPhase::Idle);
        assert!(!fx.root().join("dist/a.d.ts").exists());
        assert!(!engine.store().unwrap().path().exists());
    }

    #[tokio::test]
    async fn explicit_tsconfig_is_passed_to_bundler() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        let bundler = RecordingBundler::default();
        let options = Options {
            tsconfig: Some(PathBuf::from("tsconfig.build.json")),
            ..Options::default()
        };
        let mut engine = CacheEngine::new(&options, fx.root());
        engine.build(&bundler, &fx.request(vec![a])).await.unwrap();

        let hints = bundler.hints.lock().unwrap();
        assert_eq!(hints[0], Some(fx.root().join("tsconfig.build.json")));
    }

    #[tokio::test]
    async fn persistence_failure_keeps_outputs() {
        let fx = Fixture::new();
        let a = fx.source("src/a.ts", "export const a = 1;");
        // A regular file where the cache directory should be.
        std::fs::write(fx.root().join(".cache"), "not a directory").unwrap();
        let bundler = RecordingBundler::default();
        let mut engine = CacheEngine::new(&fx.cached_options(), fx.root());

        let report = engine.build(&bundler, &fx.request(vec![a])).await.unwrap();
        assert_eq!(report.outcome, BuildOutcome::Generated);
        assert!(!report.persisted);
        assert!(fx.root().join("dist/a.d.ts").exists());
    }

    #[test]
    fn mutation_log_dirty() {
        assert!(!MutationLog::default().is_dirty());
        let log = MutationLog {
            evicted: 1,
            ..MutationLog::default()
        };
        assert!(log.is_dirty());
    }
}
