//! Bounded parallel decompilation for whole-archive runs.
//!
//! Each request blocks a worker for the external toolchain's full runtime,
//! so concurrency is capped by a fixed-size thread pool instead of spawning
//! one interpreter per unit. Tasks are fed over a channel; results come back
//! over another. Dropping the submitter drains the queue and joins the
//! scheduler.

use anyhow::Result;
use rayon::ThreadPool;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::bridge::{DecompilerBridge, KrakatauBridge};

#[derive(Debug, Clone)]
pub struct DecompileTask {
    pub unit_name: String,
    pub unit_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DecompileResult {
    pub unit_name: String,
    /// Decompiled source, or diagnostic text; opaque to the pool.
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_concurrent: usize,
    pub poll_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub pending_tasks: Arc<AtomicUsize>,
    pub running_tasks: Arc<AtomicUsize>,
    pub completed_tasks: Arc<AtomicU64>,
}

impl PoolStats {
    fn new() -> Self {
        Self {
            pending_tasks: Arc::new(AtomicUsize::new(0)),
            running_tasks: Arc::new(AtomicUsize::new(0)),
            completed_tasks: Arc::new(AtomicU64::new(0)),
        }
    }
}

pub struct DecompilePool {
    tx: Option<Sender<DecompileTask>>,
    stats: PoolStats,
    handle: Option<JoinHandle<()>>,
}

impl DecompilePool {
    pub fn new(
        bridge: Arc<KrakatauBridge>,
        container: PathBuf,
        config: PoolConfig,
        results: Sender<DecompileResult>,
    ) -> Self {
        let (tx, rx) = std::sync::mpsc::channel::<DecompileTask>();
        let stats = PoolStats::new();
        let handle = spawn_scheduler(rx, bridge, container, config, stats.clone(), results);
        Self {
            tx: Some(tx),
            stats,
            handle: Some(handle),
        }
    }

    pub fn submit(&self, task: DecompileTask) -> Result<()> {
        if let Some(tx) = self.tx.as_ref() {
            tx.send(task)?;
            self.stats.pending_tasks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }

    pub fn shutdown_and_drain(&mut self) -> Result<()> {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for DecompilePool {
    fn drop(&mut self) {
        let _ = self.shutdown_and_drain();
    }
}

fn spawn_scheduler(
    rx: Receiver<DecompileTask>,
    bridge: Arc<KrakatauBridge>,
    container: PathBuf,
    config: PoolConfig,
    stats: PoolStats,
    results: Sender<DecompileResult>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let width = config.max_concurrent.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .build()
            .expect("decompile pool construction cannot fail with nonzero width");
        let mut queue: VecDeque<DecompileTask> = VecDeque::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<String>();
        let draining = AtomicBool::new(false);

        loop {
            while let Ok(done) = done_rx.try_recv() {
                in_flight.remove(&done);
            }

            match rx.recv_timeout(Duration::from_millis(config.poll_interval_ms)) {
                Ok(task) => queue.push_back(task),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    draining.store(true, Ordering::Relaxed);
                }
            }

            while stats.running_tasks.load(Ordering::Relaxed) < width {
                let Some(task) = queue.pop_front() else { break };
                if in_flight.contains(&task.unit_name) {
                    // Same unit already running; requeue behind it.
                    queue.push_back(task);
                    break;
                }
                in_flight.insert(task.unit_name.clone());

                stats.pending_tasks.fetch_sub(1, Ordering::Relaxed);
                stats.running_tasks.fetch_add(1, Ordering::Relaxed);

                let bridge = Arc::clone(&bridge);
                let container = container.clone();
                let stats = stats.clone();
                let done_tx = done_tx.clone();
                let results = results.clone();

                spawn_on_pool(&pool, move || {
                    let text =
                        bridge.decompile(&container, &task.unit_name, &task.unit_bytes);
                    let _ = results.send(DecompileResult {
                        unit_name: task.unit_name.clone(),
                        text,
                    });
                    stats.completed_tasks.fetch_add(1, Ordering::Relaxed);
                    stats.running_tasks.fetch_sub(1, Ordering::Relaxed);
                    let _ = done_tx.send(task.unit_name);
                });
            }

            if draining.load(Ordering::Relaxed)
                && queue.is_empty()
                && stats.running_tasks.load(Ordering::Relaxed) == 0
            {
                break;
            }
        }
    })
}

fn spawn_on_pool(pool: &ThreadPool, f: impl FnOnce() + Send + 'static) {
    pool.spawn(f);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::testutil::{env_lock, set_java_home, temp_dir, write_jar, write_script};
    use std::collections::HashMap;

    #[test]
    fn pool_processes_every_submitted_unit() -> Result<()> {
        let _guard = env_lock().lock().expect("env lock poisoned");
        let base = temp_dir("pool_all");
        set_java_home(&base.join("jdk"))?;

        let prepared = base.join("prepared.jar");
        write_jar(&prepared, &[("Target.java", b"class X {}\n" as &[u8])])?;
        let fake = base.join("python");
        write_script(&fake, &format!("#!/bin/sh\ncp '{}' \"$4\"\n", prepared.display()))?;

        let container = base.join("container.jar");
        write_jar(&container, &[])?;

        let bridge = Arc::new(KrakatauBridge::new(BridgeConfig {
            python: fake.to_string_lossy().to_string(),
            toolchain_zip: None,
            timeout: Duration::from_secs(10),
        }));

        let (results_tx, results_rx) = std::sync::mpsc::channel();
        let mut pool = DecompilePool::new(
            bridge,
            container,
            PoolConfig {
                max_concurrent: 2,
                poll_interval_ms: 10,
            },
            results_tx,
        );

        let names = ["a/One", "a/Two", "a/Three", "a/Four"];
        for name in names {
            pool.submit(DecompileTask {
                unit_name: name.to_string(),
                unit_bytes: b"\xca\xfe\xba\xbe".to_vec(),
            })?;
        }
        pool.shutdown_and_drain()?;

        let collected: HashMap<String, String> = results_rx
            .into_iter()
            .map(|r| (r.unit_name, r.text))
            .collect();
        assert_eq!(collected.len(), names.len());
        assert!(collected.values().all(|t| t == "class X {}\n"));
        assert_eq!(pool.stats().running_tasks.load(Ordering::Relaxed), 0);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }
}
