// src/store/store_server.rs — Async message passing for Store

use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};

use crate::bot::activity::ConversationReference;
use crate::infra::errors::{with_timeout, TimesheetError};
use crate::store::store::Store;
use crate::timesheet::types::{Employee, SubmissionRecord, SubmissionRow};

type Responder<T> = oneshot::Sender<Result<T, TimesheetError>>;

#[derive(Debug)]
pub enum StoreCommand {
    InsertSubmissions {
        records: Vec<SubmissionRecord>,
        resp: Responder<Vec<i64>>,
    },
    QuerySubmissions {
        employee_id: String,
        date: NaiveDate,
        resp: Responder<Vec<SubmissionRow>>,
    },
    UpsertEmployee {
        employee: Employee,
        resp: Responder<()>,
    },
    ListEmployees {
        resp: Responder<Vec<Employee>>,
    },
    SaveReference {
        user_id: String,
        reference: ConversationReference,
        resp: Responder<()>,
    },
    LoadReference {
        user_id: String,
        resp: Responder<Option<ConversationReference>>,
    },
}

/// A handle to the Store that uses message passing. Every call is bounded
/// by the configured timeout.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        build: impl FnOnce(Responder<T>) -> StoreCommand,
    ) -> Result<T, TimesheetError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let cmd = build(resp_tx);
        with_timeout(operation, self.timeout, async {
            self.tx
                .send(cmd)
                .await
                .map_err(|_| TimesheetError::StoreUnavailable("store server stopped".into()))?;
            resp_rx
                .await
                .map_err(|_| TimesheetError::StoreUnavailable("store server dropped reply".into()))?
        })
        .await
    }

    /// Insert one submission's records atomically.
    pub async fn insert_submissions(
        &self,
        records: Vec<SubmissionRecord>,
    ) -> Result<Vec<i64>, TimesheetError> {
        self.call("insert submissions", |resp| StoreCommand::InsertSubmissions {
            records,
            resp,
        })
        .await
    }

    pub async fn query_submissions(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<SubmissionRow>, TimesheetError> {
        let employee_id = employee_id.to_string();
        self.call("query submissions", |resp| StoreCommand::QuerySubmissions {
            employee_id,
            date,
            resp,
        })
        .await
    }

    pub async fn upsert_employee(&self, employee: Employee) -> Result<(), TimesheetError> {
        self.call("upsert employee", |resp| StoreCommand::UpsertEmployee {
            employee,
            resp,
        })
        .await
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>, TimesheetError> {
        self.call("list employees", |resp| StoreCommand::ListEmployees { resp })
            .await
    }

    pub async fn save_reference(
        &self,
        user_id: &str,
        reference: ConversationReference,
    ) -> Result<(), TimesheetError> {
        let user_id = user_id.to_string();
        self.call("save conversation reference", |resp| {
            StoreCommand::SaveReference {
                user_id,
                reference,
                resp,
            }
        })
        .await
    }

    pub async fn load_reference(
        &self,
        user_id: &str,
    ) -> Result<Option<ConversationReference>, TimesheetError> {
        let user_id = user_id.to_string();
        self.call("load conversation reference", |resp| {
            StoreCommand::LoadReference { user_id, resp }
        })
        .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(
    store: Store,
    timeout: Duration,
) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let handle = StoreHandle::new(tx, timeout);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::InsertSubmissions { records, resp } => {
                let res = store.insert_submissions(&records);
                let _ = resp.send(res);
            }
            StoreCommand::QuerySubmissions {
                employee_id,
                date,
                resp,
            } => {
                let res = store.query_submissions(&employee_id, date);
                let _ = resp.send(res);
            }
            StoreCommand::UpsertEmployee { employee, resp } => {
                let res = store.upsert_employee(&employee);
                let _ = resp.send(res);
            }
            StoreCommand::ListEmployees { resp } => {
                let res = store.list_employees();
                let _ = resp.send(res);
            }
            StoreCommand::SaveReference {
                user_id,
                reference,
                resp,
            } => {
                let res = store.save_reference(&user_id, &reference);
                let _ = resp.send(res);
            }
            StoreCommand::LoadReference { user_id, resp } => {
                let res = store.load_reference(&user_id);
                let _ = resp.send(res);
            }
        }
    }
}
