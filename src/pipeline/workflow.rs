//! Scheduler-facing description of the stock ETL workflow.
//!
//! Nothing here runs tasks; it is the registration data an orchestrator needs
//! (identifiers, dependency chain, trigger and retry policy).

use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;

/// The three tasks of the workflow, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    Extract,
    ProcessStockData,
    LoadDataToSnowflake,
}

impl TaskId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::Extract => "extract",
            TaskId::ProcessStockData => "process_stock_data",
            TaskId::LoadDataToSnowflake => "load_data_to_snowflake",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow registration: identifier, trigger and default task policy
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    pub dag_id: String,
    pub description: String,
    /// `None` means triggered manually
    pub schedule: Option<String>,
    pub start_date: NaiveDate,
    pub catchup: bool,
    pub depends_on_past: bool,
    /// Extra attempts per task after the first failure
    pub retries: u32,
    pub retry_delay: Duration,
    /// Linear chain, upstream first
    pub tasks: Vec<TaskId>,
}

impl WorkflowDefinition {
    pub fn stock_etl() -> Self {
        Self {
            dag_id: "stock_etl_dag".to_string(),
            description: "ETL DAG for Stock Data using Alpha Vantage and Snowflake".to_string(),
            schedule: None,
            start_date: NaiveDate::from_ymd_opt(2024, 10, 10).unwrap_or_default(),
            catchup: false,
            depends_on_past: false,
            retries: 1,
            retry_delay: Duration::from_secs(300),
            tasks: vec![TaskId::Extract, TaskId::ProcessStockData, TaskId::LoadDataToSnowflake],
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Total attempts a task gets before the run fails
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Task that must finish before `task` starts
    pub fn upstream_of(&self, task: TaskId) -> Option<TaskId> {
        let position = self.tasks.iter().position(|t| *t == task)?;
        position.checked_sub(1).map(|i| self.tasks[i])
    }
}

impl fmt::Display for WorkflowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workflow:    {}", self.dag_id)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Schedule:    {}", self.schedule.as_deref().unwrap_or("manual trigger"))?;
        writeln!(f, "Start date:  {}", self.start_date)?;
        writeln!(f, "Catchup:     {}", self.catchup)?;
        writeln!(f, "Depends on past: {}", self.depends_on_past)?;
        writeln!(f, "Retries:     {} (delay {}s)", self.retries, self.retry_delay.as_secs())?;
        let chain: Vec<&str> = self.tasks.iter().map(TaskId::as_str).collect();
        write!(f, "Tasks:       {}", chain.join(" >> "))
    }
}
