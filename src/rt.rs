//! RT module: evaluates a compiled program once per lane on a worker pool.
//!
//! A lane is one register file. Lanes are independent, so they are evaluated
//! in parallel without locking; the program is shared read-only.

// IMPORTANT: Do not call assert_invariant from lane paths; it takes a lock.

use crate::config::{ConfigError, RuntimeConfig};
use crate::kernel::{eval_program, Instruction, RegisterFile};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Program plus worker pool.
pub struct Runtime {
    program: Arc<[Instruction]>,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("instructions", &self.program.len())
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Runtime {
    /// Runtime with a default-sized pool.
    pub fn new(program: impl Into<Arc<[Instruction]>>) -> Result<Self, ConfigError> {
        Self::with_config(program, &RuntimeConfig::default())
    }

    /// Runtime with a pool built from `config`.
    pub fn with_config(
        program: impl Into<Arc<[Instruction]>>,
        config: &RuntimeConfig,
    ) -> Result<Self, ConfigError> {
        let pool = config.build_pool()?;
        Ok(Self::with_pool(program, pool))
    }

    /// Runtime on an existing pool.
    pub fn with_pool(program: impl Into<Arc<[Instruction]>>, pool: rayon::ThreadPool) -> Self {
        let program = program.into();
        tracing::debug!(
            instructions = program.len(),
            threads = pool.current_num_threads(),
            "runtime created"
        );
        Self { program, pool }
    }

    /// The program being evaluated.
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate the program on one lane, on the calling thread.
    pub fn run_lane(&self, lane: &mut RegisterFile) {
        eval_program(&self.program, lane);
    }

    /// Evaluate the program once per lane, in parallel.
    pub fn run_lanes(&self, lanes: &mut [RegisterFile]) {
        let program = &*self.program;
        self.pool.install(|| {
            lanes
                .par_iter_mut()
                .for_each(|lane| eval_program(program, lane));
        });
    }

    /// Like [`Self::run_lanes`], but a lane that panics is zeroed instead of
    /// unwinding. Returns the number of lanes that failed.
    pub fn run_lanes_safe(&self, lanes: &mut [RegisterFile]) -> usize {
        let program = &*self.program;
        self.pool.install(|| {
            lanes
                .par_iter_mut()
                .map(|lane| usize::from(!eval_lane_safe(program, lane)))
                .sum()
        })
    }

    /// Like [`Self::run_lanes`], but stops issuing lanes once `cancel` is set.
    /// Lanes already started run to completion. Returns the number of lanes
    /// evaluated.
    pub fn run_lanes_until(&self, lanes: &mut [RegisterFile], cancel: &AtomicBool) -> usize {
        let program = &*self.program;
        self.pool.install(|| {
            lanes
                .par_iter_mut()
                .map(|lane| {
                    if cancel.load(Ordering::Relaxed) {
                        0
                    } else {
                        eval_program(program, lane);
                        1
                    }
                })
                .sum()
        })
    }
}

/// Evaluate `program` on `lane`, containing any panic.
///
/// A panic means the program broke its offset contract; the lane fails closed
/// with every register zeroed. Returns `true` on success.
pub fn eval_lane_safe(program: &[Instruction], lane: &mut RegisterFile) -> bool {
    let result = catch_unwind(AssertUnwindSafe(|| eval_program(program, lane)));
    if result.is_err() {
        lane.clear();
        return false;
    }
    true
}
