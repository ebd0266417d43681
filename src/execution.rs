use crate::config::CheckConfig;
use crate::extractor::Sample;
use crate::report::SampleReport;
use crate::rules;
use crate::runtime::{ExecutionResult, SampleRuntime};
use crate::transformer::Transformer;
use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};

/// One sample waiting to be validated, transformed and run.
///
/// A task owns its sample outright so tasks can be driven concurrently
/// without sharing any state beyond the read-only runtime and config.
#[derive(Debug)]
pub struct SampleTask {
    sample: Sample,
}

impl SampleTask {
    pub fn new(sample: Sample) -> Self {
        Self { sample }
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Validates, transforms and (unless `static_only`) executes the sample,
    /// consuming the task.
    ///
    /// Never fails: every problem ends up in the returned report. The
    /// workspace is released before this returns.
    pub async fn run(
        self,
        runtime: &dyn SampleRuntime,
        config: &CheckConfig,
        static_only: bool,
    ) -> SampleReport {
        let language = runtime.language();
        log::debug!("Checking {} sample at {}", language, self.sample.location());

        let findings = rules::evaluate(&self.sample, &language.rules);

        let program = match Transformer::new(language, config).transform(&self.sample) {
            Ok(program) => program,
            Err(e) => {
                log::warn!("Could not prepare {}: {}", self.sample.location(), e);
                return SampleReport::new(self.sample, None, Some(e.to_string()), findings);
            }
        };

        if static_only {
            return SampleReport::new(self.sample, None, None, findings);
        }

        let start = Instant::now();
        let execution = match runtime.prepare_environment() {
            Ok(workspace) => {
                let result = runtime
                    .execute(&program, &workspace, language.timeout)
                    .await;
                drop(workspace);
                result
            }
            Err(failure) => ExecutionResult::failed(failure, start.elapsed()),
        };

        log::debug!(
            "[SAMPLE_RUN_TIME] [{}] {}: {}ms ({})",
            language,
            self.sample.location(),
            start.elapsed().as_millis(),
            if execution.success { "ok" } else { "failed" }
        );

        SampleReport::new(self.sample, Some(execution), None, findings)
    }
}

/// Drives all tasks with at most `jobs` in flight at once.
///
/// Returns the reports (in completion order) and the wall-clock duration.
pub async fn run_tasks(
    tasks: Vec<SampleTask>,
    runtime: &dyn SampleRuntime,
    config: &CheckConfig,
    static_only: bool,
    jobs: usize,
) -> (Vec<SampleReport>, Duration) {
    let start = Instant::now();
    let reports: Vec<SampleReport> = stream::iter(tasks)
        .map(|task| task.run(runtime, config, static_only))
        .buffer_unordered(jobs.max(1))
        .collect()
        .await;
    (reports, start.elapsed())
}
