//! The polling loop: fetch, check continuity, walk back on reorg, process.

use crate::{
    BlockHeader, BlockLike, Datasource, Processor, SyncConfig, SyncError, SyncResult,
};
use log::{debug, info, warn};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Initializing,
    Polling,
    Processing,
    Reverting,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    /// Nothing new at the source.
    Idle,
    Advanced,
    Reverted,
    /// Batch did not line up; retried on the next poll.
    Discontinuous,
    Interrupted,
}

pub struct RunesSync<T, D, P> {
    datasource: Arc<D>,
    processor: P,
    config: SyncConfig,
    current: Option<BlockHeader>,
    state: SyncState,
    _block: PhantomData<fn() -> T>,
}

impl<T, D, P> RunesSync<T, D, P>
where
    T: BlockLike,
    D: Datasource<T>,
    P: Processor<T>,
{
    pub fn new(datasource: Arc<D>, processor: P, config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            datasource,
            processor,
            config,
            current: None,
            state: SyncState::Initializing,
            _block: PhantomData,
        })
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn current(&self) -> Option<&BlockHeader> {
        self.current.as_ref()
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn into_processor(self) -> P {
        self.processor
    }

    fn next_height(&self) -> u64 {
        self.current.as_ref().map_or(0, |header| header.height + 1)
    }

    fn exit_reached(&self) -> bool {
        match (self.config.exit_at, &self.current) {
            (Some(exit_at), Some(current)) => current.height >= exit_at,
            _ => false,
        }
    }

    /// Runs until `shutdown` flips to true, `exit_at` is indexed, or a fatal
    /// error occurs. The processor's shutdown hook runs in every case but
    /// the last.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> SyncResult<()> {
        self.state = SyncState::Initializing;
        self.processor.verify_states().await?;

        self.current = match self.processor.current_block().await {
            Ok(header) => Some(header),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        match &self.current {
            Some(current) => info!(
                "{}: resuming after block {current}",
                self.processor.name()
            ),
            None => info!("{}: starting from genesis", self.processor.name()),
        }

        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.exit_reached() {
                info!(
                    "{}: reached exit height {:?}",
                    self.processor.name(),
                    self.config.exit_at
                );
                break;
            }

            self.state = SyncState::Polling;
            let round = match self.poll_round(&shutdown).await {
                Ok(round) => round,
                Err(err) if err.is_fatal() => {
                    self.state = SyncState::Stopped;
                    return Err(err);
                }
                Err(err) => {
                    warn!("{}: round failed, retrying: {err}", self.processor.name());
                    Round::Idle
                }
            };
            debug!("{}: round ended {round:?}", self.processor.name());

            match round {
                Round::Advanced | Round::Reverted => continue,
                Round::Interrupted => break,
                Round::Idle | Round::Discontinuous => {}
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.state = SyncState::ShuttingDown;
        info!("{}: shutting down", self.processor.name());
        self.processor.shutdown().await?;
        self.state = SyncState::Stopped;
        Ok(())
    }

    async fn poll_round(&mut self, shutdown: &watch::Receiver<bool>) -> SyncResult<Round> {
        let from = self.next_height();
        let mut subscription = self.datasource.fetch_async(from, self.config.exit_at).await?;
        let mut round = Round::Idle;

        while let Some(batch) = subscription.next().await? {
            if *shutdown.borrow() {
                subscription.cancel();
                return Ok(Round::Interrupted);
            }

            let Some(first) = batch.first().map(|block| block.header().clone()) else {
                continue;
            };

            if let Some(current) = &self.current {
                if first.prev_hash != current.hash {
                    subscription.cancel();
                    warn!(
                        "{}: block {first} does not extend {current}, looking for fork point",
                        self.processor.name()
                    );
                    self.handle_reorg().await?;
                    return Ok(Round::Reverted);
                }
            }

            if !is_contiguous(self.next_height(), &batch) {
                subscription.cancel();
                warn!(
                    "{}: discontinuous batch starting at {first}, retrying",
                    self.processor.name()
                );
                return Ok(Round::Discontinuous);
            }

            self.process_batch(batch).await?;
            round = Round::Advanced;

            if self.exit_reached() {
                subscription.cancel();
                break;
            }
        }

        Ok(round)
    }

    async fn process_batch(&mut self, mut batch: Vec<T>) -> SyncResult<()> {
        self.state = SyncState::Processing;
        while !batch.is_empty() {
            let rest = batch.split_off(self.config.batch_size.min(batch.len()));
            let (Some(first), Some(last)) = (
                batch.first().map(|block| block.header().clone()),
                batch.last().map(|block| block.header().clone()),
            ) else {
                break;
            };

            let started = Instant::now();
            self.processor.process(batch).await?;
            info!(
                "{}: processed blocks {}..={} (tip {}) in {:?}",
                self.processor.name(),
                first.height,
                last.height,
                last.hash,
                started.elapsed()
            );
            self.current = Some(last);
            batch = rest;
        }
        Ok(())
    }

    /// Walks back from the current tip until the indexed header and the
    /// source agree, then reverts everything above that height.
    async fn handle_reorg(&mut self) -> SyncResult<()> {
        self.state = SyncState::Reverting;
        let Some(current) = self.current.clone() else {
            return Ok(());
        };

        for step in 0..self.config.max_reorg_depth {
            let Some(height) = current.height.checked_sub(step) else {
                break;
            };

            let (local, remote) = tokio::try_join!(
                self.processor.get_indexed_block(height),
                self.datasource.get_block_header(height),
            )?;

            if local.hash == remote.hash {
                info!(
                    "{}: common ancestor {local}, reverting {} block(s) above it",
                    self.processor.name(),
                    current.height - height
                );
                self.processor.revert_data(height + 1).await?;
                self.current = Some(local);
                return Ok(());
            }

            debug!(
                "{}: height {height} differs: indexed {} source {}",
                self.processor.name(),
                local.hash,
                remote.hash
            );
        }

        if current.height < self.config.max_reorg_depth {
            warn!(
                "{}: chain differs down to genesis, reverting everything",
                self.processor.name()
            );
            self.processor.revert_data(0).await?;
            self.current = None;
            return Ok(());
        }

        Err(SyncError::ReorgTooDeep {
            height: current.height,
            max_depth: self.config.max_reorg_depth,
        })
    }
}

impl<T, D, P> RunesSync<T, D, P>
where
    T: BlockLike,
    D: Datasource<T> + 'static,
    P: Processor<T> + 'static,
{
    /// Runs the driver on a background task.
    pub fn spawn(mut self) -> SyncHandle<P> {
        let (shutdown, receiver) = watch::channel(false);
        let timeout = self.config.shutdown_timeout;
        let task = tokio::spawn(async move {
            self.run(receiver).await?;
            Ok::<P, SyncError>(self.processor)
        });
        SyncHandle {
            shutdown,
            task,
            timeout,
        }
    }
}

/// Heights start at `expected` and go up by one; each block points at the
/// previous one.
fn is_contiguous<T: BlockLike>(expected: u64, batch: &[T]) -> bool {
    let Some(first) = batch.first() else {
        return true;
    };
    if first.header().height != expected {
        return false;
    }
    batch
        .windows(2)
        .all(|pair| pair[1].header().extends(pair[0].header()))
}

pub struct SyncHandle<P> {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<SyncResult<P>>,
    timeout: std::time::Duration,
}

impl<P> SyncHandle<P> {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the driver to stop on its own (`exit_at` or a fatal error).
    pub async fn join(self) -> SyncResult<P> {
        self.task
            .await
            .map_err(|err| SyncError::Task(err.to_string()))?
    }

    /// Signals the loop, then waits up to the configured timeout for the
    /// in-flight round and the processor's shutdown hook.
    pub async fn shutdown(self) -> SyncResult<P> {
        self.shutdown.send_replace(true);
        match tokio::time::timeout(self.timeout, self.task).await {
            Ok(joined) => joined.map_err(|err| SyncError::Task(err.to_string()))?,
            Err(_) => Err(SyncError::ShutdownTimeout(self.timeout)),
        }
    }
}
