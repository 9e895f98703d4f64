use rayon::prelude::*;

use crate::error::Error;

/// An independent unit of work.
pub trait Job: Send + Sync {
    type Output: Send;

    fn run(&self) -> Result<Self::Output, Error>;
}

/// Runs a batch of independent jobs and reports one result per job, in input order.
pub trait JobExecutor {
    fn execute<J: Job>(
        &self,
        jobs: &[J],
        parallelism: Option<usize>,
    ) -> Vec<Result<J::Output, Error>>;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SequentialExecutor;

impl JobExecutor for SequentialExecutor {
    fn execute<J: Job>(
        &self,
        jobs: &[J],
        _parallelism: Option<usize>,
    ) -> Vec<Result<J::Output, Error>> {
        jobs.iter().map(|job| job.run()).collect()
    }
}

/// Runs jobs on a rayon pool. A parallelism hint gets a dedicated pool with that many threads,
/// otherwise the global pool is used.
#[derive(Copy, Clone, Debug, Default)]
pub struct RayonExecutor;

impl JobExecutor for RayonExecutor {
    fn execute<J: Job>(
        &self,
        jobs: &[J],
        parallelism: Option<usize>,
    ) -> Vec<Result<J::Output, Error>> {
        let run_all = || jobs.par_iter().map(|job| job.run()).collect::<Vec<_>>();
        match parallelism {
            Some(num_threads) => match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
            {
                Ok(pool) => pool.install(run_all),
                Err(error) => {
                    log::warn!(
                        "could not build a pool with {} threads, using the global pool: {}",
                        num_threads,
                        error
                    );
                    run_all()
                }
            },
            None => run_all(),
        }
    }
}
