pub mod announcement;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::error::BotError;
use crate::{Data, Error};

#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    fn name(&self) -> &str;
    /// Six-field cron expression, seconds first, in UTC.
    fn schedule(&self) -> &str;
    async fn run(&self, http: &serenity::Http, data: &Data) -> Result<(), Error>;
}

#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<Arc<dyn TaskHandler>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_task(&mut self, task: impl TaskHandler) {
        self.tasks.push(Arc::new(task));
    }

    /// Schedules every registered task and starts the scheduler.
    ///
    /// Each task is scheduled on its own; one that fails to register is logged
    /// and skipped. Returns how many tasks were scheduled.
    pub async fn run_all(self, http: Arc<serenity::Http>, data: Data) -> Result<usize, BotError> {
        let scheduler = JobScheduler::new().await?;
        let mut scheduled = 0;

        for task in self.tasks {
            let task_name = task.name().to_string();
            match schedule_task(&scheduler, task, http.clone(), data.clone()).await {
                Ok(()) => {
                    info!("Scheduled task {}", task_name);
                    scheduled += 1;
                }
                Err(e) => error!("Task {} could not be scheduled: {}", task_name, e),
            }
        }

        scheduler.start().await?;
        Ok(scheduled)
    }
}

async fn schedule_task(
    scheduler: &JobScheduler,
    task: Arc<dyn TaskHandler>,
    http: Arc<serenity::Http>,
    data: Data,
) -> Result<(), BotError> {
    let schedule = task.schedule().to_string();
    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let task = task.clone();
        let http = http.clone();
        let data = data.clone();

        Box::pin(async move {
            if let Err(e) = task.run(&http, &data).await {
                error!("Task {} failed: {}", task.name(), e);
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
