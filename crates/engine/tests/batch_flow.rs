//! End-to-end batch flow against a real (in-memory) transactional resource.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use conveyor_core::{
    BatchName, BatchStatus, DaysToKeep, JobName, JobStatus, MaxRetries, SystemClock, TestResult,
};
use conveyor_engine::{
    BatchRunner, BatchSpec, JobError, JobSpec, Resource, ResourceError, UnitOfWork,
};
use conveyor_logstore::{InMemoryBatchLogRepository, JobLogger, RetentionPruner};

/// Staging/published table pair behind one transactional interface. Rows
/// accumulate in staging during the run and only become visible on commit.
#[derive(Default)]
struct Warehouse {
    staged: Mutex<Vec<String>>,
    published: Mutex<Vec<String>>,
    closes: Mutex<u32>,
}

impl Warehouse {
    fn stage(&self, row: impl Into<String>) {
        self.staged.lock().unwrap().push(row.into());
    }

    fn staged_count(&self) -> usize {
        self.staged.lock().unwrap().len()
    }
}

impl Resource for Warehouse {
    fn interface(&self) -> &str {
        "warehouse"
    }

    fn commit(&self) -> Result<(), ResourceError> {
        let mut staged = self.staged.lock().unwrap();
        self.published.lock().unwrap().extend(staged.drain(..));
        Ok(())
    }

    fn rollback(&self) -> Result<(), ResourceError> {
        self.staged.lock().unwrap().clear();
        Ok(())
    }

    fn close(&self) -> Result<(), ResourceError> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn warehouse_of(uow: &UnitOfWork) -> &Warehouse {
    uow.resource("warehouse")
        .expect("warehouse resource registered")
        .as_any()
        .downcast_ref::<Warehouse>()
        .expect("warehouse resource type")
}

struct Extract;

impl JobSpec for Extract {
    fn name(&self) -> JobName {
        JobName::new("extract").unwrap()
    }

    fn run(&self, uow: &UnitOfWork, logger: &dyn JobLogger) -> Result<(), JobError> {
        let warehouse = warehouse_of(uow);
        warehouse.stage("widget");
        warehouse.stage("gadget");
        logger.log_info("staged 2 rows");
        Ok(())
    }

    fn test(&self, uow: &UnitOfWork, _logger: &dyn JobLogger) -> Vec<TestResult> {
        let count = warehouse_of(uow).staged_count();
        if count == 2 {
            vec![TestResult::passed(self.name())]
        } else {
            vec![TestResult::failed(
                self.name(),
                format!("expected 2 staged rows, found {count}"),
            )]
        }
    }
}

struct Transform;

impl JobSpec for Transform {
    fn name(&self) -> JobName {
        JobName::new("transform").unwrap()
    }

    fn dependencies(&self) -> BTreeSet<JobName> {
        [JobName::new("extract").unwrap()].into()
    }

    fn run(&self, uow: &UnitOfWork, logger: &dyn JobLogger) -> Result<(), JobError> {
        let warehouse = warehouse_of(uow);
        let mut staged = warehouse.staged.lock().unwrap();
        for row in staged.iter_mut() {
            *row = row.to_uppercase();
        }
        logger.log_info("normalized staged rows");
        Ok(())
    }
}

struct Load {
    fail: bool,
}

impl JobSpec for Load {
    fn name(&self) -> JobName {
        JobName::new("load").unwrap()
    }

    fn dependencies(&self) -> BTreeSet<JobName> {
        [JobName::new("transform").unwrap()].into()
    }

    fn max_retries(&self) -> MaxRetries {
        MaxRetries::new(1)
    }

    fn run(&self, uow: &UnitOfWork, logger: &dyn JobLogger) -> Result<(), JobError> {
        if self.fail {
            return Err(JobError::new("destination unavailable"));
        }
        let count = warehouse_of(uow).staged_count();
        logger.log_info(&format!("loading {count} rows"));
        Ok(())
    }
}

struct NightlyLoad {
    warehouse: Arc<Warehouse>,
    fail_load: bool,
}

impl NightlyLoad {
    fn new(fail_load: bool) -> Self {
        Self {
            warehouse: Arc::new(Warehouse::default()),
            fail_load,
        }
    }
}

impl BatchSpec for NightlyLoad {
    fn name(&self) -> BatchName {
        BatchName::new("nightly-load").unwrap()
    }

    fn create_jobs(&self) -> Vec<Arc<dyn JobSpec>> {
        vec![
            Arc::new(Extract),
            Arc::new(Transform),
            Arc::new(Load {
                fail: self.fail_load,
            }),
        ]
    }

    fn create_unit_of_work(&self) -> Result<UnitOfWork, ResourceError> {
        UnitOfWork::new(vec![self.warehouse.clone()])
    }
}

#[test]
fn successful_run_publishes_on_commit() {
    conveyor_observability::tracing::init_compact();

    let repo = InMemoryBatchLogRepository::arc();
    let batch = NightlyLoad::new(false);
    let report = BatchRunner::new(repo).run(&batch).unwrap();

    assert_eq!(report.status, BatchStatus::Succeeded);
    assert_eq!(report.job_status("extract"), Some(JobStatus::Succeeded));
    assert_eq!(report.job_status("transform"), Some(JobStatus::Succeeded));
    assert_eq!(report.job_status("load"), Some(JobStatus::Succeeded));

    let published = batch.warehouse.published.lock().unwrap().clone();
    assert_eq!(published, ["WIDGET", "GADGET"]);
    assert_eq!(batch.warehouse.staged_count(), 0);
    assert_eq!(*batch.warehouse.closes.lock().unwrap(), 1);

    // The durable trail covers every job of the run.
    for job in ["extract", "transform", "load"] {
        assert!(
            report
                .entries
                .iter()
                .any(|e| e.message.contains("succeeded") || e.message.contains(job)),
        );
    }
}

#[test]
fn failing_load_rolls_back_staging() {
    conveyor_observability::tracing::init_compact();

    let repo = InMemoryBatchLogRepository::arc();
    let batch = NightlyLoad::new(true);
    let report = BatchRunner::new(repo).run(&batch).unwrap();

    // Earlier jobs succeeded, so the batch is partial rather than failed.
    assert_eq!(report.status, BatchStatus::PartialFailure);
    assert_eq!(report.job_status("load"), Some(JobStatus::Failed));

    assert!(batch.warehouse.published.lock().unwrap().is_empty());
    assert_eq!(batch.warehouse.staged_count(), 0);
    assert_eq!(*batch.warehouse.closes.lock().unwrap(), 1);

    assert!(
        report
            .entries
            .iter()
            .any(|e| e.message.contains("destination unavailable"))
    );
}

#[test]
fn failed_batch_still_closes_the_unit_of_work() {
    conveyor_observability::tracing::init_compact();

    struct Doomed;

    impl JobSpec for Doomed {
        fn name(&self) -> JobName {
            JobName::new("doomed").unwrap()
        }

        fn run(&self, _uow: &UnitOfWork, _logger: &dyn JobLogger) -> Result<(), JobError> {
            Err(JobError::new("no source data"))
        }
    }

    struct DoomedBatch {
        warehouse: Arc<Warehouse>,
    }

    impl BatchSpec for DoomedBatch {
        fn name(&self) -> BatchName {
            BatchName::new("doomed-batch").unwrap()
        }

        fn create_jobs(&self) -> Vec<Arc<dyn JobSpec>> {
            vec![Arc::new(Doomed)]
        }

        fn create_unit_of_work(&self) -> Result<UnitOfWork, ResourceError> {
            UnitOfWork::new(vec![self.warehouse.clone()])
        }
    }

    let batch = DoomedBatch {
        warehouse: Arc::new(Warehouse::default()),
    };
    let report = BatchRunner::new(InMemoryBatchLogRepository::arc())
        .run(&batch)
        .unwrap();

    assert_eq!(report.status, BatchStatus::Failed);
    assert!(batch.warehouse.published.lock().unwrap().is_empty());
    assert_eq!(*batch.warehouse.closes.lock().unwrap(), 1);
}

#[test]
fn run_trail_is_prunable_by_retention() {
    conveyor_observability::tracing::init_compact();

    let repo = InMemoryBatchLogRepository::arc();
    let report = BatchRunner::new(repo.clone())
        .run(&NightlyLoad::new(false))
        .unwrap();
    assert!(!report.entries.is_empty());

    let pruner = RetentionPruner::new(repo.clone(), Arc::new(SystemClock));
    // A zero-day window prunes everything the run just wrote.
    let deleted = pruner.prune_if_needed(DaysToKeep::new(0)).unwrap();
    assert_eq!(deleted, report.entries.len());
    assert!(repo.is_empty());
}
