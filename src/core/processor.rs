//! Request replay with account-based partitioning
//!
//! This module provides the `RequestProcessor`, which runs [`BankRequest`]s
//! against a shared [`BankingEngine`] and captures each outcome.
//!
//! # Design
//!
//! A batch is cut into segments. A run of consecutive account-keyed requests
//! (`delete`, `use`, `cancel`) forms one segment; every other request is a
//! segment on its own and acts as a barrier. Within a keyed segment the
//! requests are partitioned by account number: partitions run concurrently
//! while each partition keeps its input order. Segments run one after the
//! other.
//!
//! Because the result of every request only depends on earlier requests on
//! the same account, or on barriers, the outcome of a batch matches
//! processing it strictly in order.
//!
//! # Transaction references
//!
//! A cancel or query may name a transaction as `#N`, the transaction produced
//! by the successful use or cancel with sequence number `N`. Only earlier
//! requests can be named; a reference to the request itself or a later one
//! never resolves. A cancel that refers to an earlier request from a
//! different partition of the same segment starts a new segment, so the
//! reference is always resolved before it is read.
//!
//! ```text
//! RequestProcessor
//!     ├── Arc<BankingEngine>                  (shared engine)
//!     └── Arc<DashMap<RequestSeq, String>>    (transaction ids by sequence)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use log::error;

use super::BankingEngine;
use crate::types::{
    AccountInfo, AccountRecord, BankError, BankRequest, CancelBalanceRequest, RequestSeq,
    SequencedRequest, TransactionRecord, TransactionRef, UseBalanceRequest, UserId,
};

/// What a successful request produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Registered { user_id: UserId },
    Account(AccountRecord),
    Transaction(TransactionRecord),
    Accounts(Vec<AccountInfo>),
}

/// Result of processing a single request
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub seq: RequestSeq,
    /// Operation name of the request
    pub op: &'static str,
    pub outcome: Result<Outcome, BankError>,
}

enum Segment {
    Barrier(SequencedRequest),
    Keyed(Vec<SequencedRequest>),
}

/// Replays requests against a shared engine
#[derive(Clone)]
pub struct RequestProcessor {
    engine: Arc<BankingEngine>,
    transaction_refs: Arc<DashMap<RequestSeq, String>>,
}

impl RequestProcessor {
    pub fn new(engine: Arc<BankingEngine>) -> Self {
        Self {
            engine,
            transaction_refs: Arc::new(DashMap::new()),
        }
    }

    /// Resolve a transaction reference made by request `seq`
    ///
    /// Only earlier requests can be referenced. A `#N` that is not resolved,
    /// or that points at request `seq` or later, is passed on literally and
    /// fails the lookup as an unknown transaction.
    fn resolve(&self, seq: RequestSeq, transaction: &TransactionRef) -> String {
        match transaction {
            TransactionRef::Id(id) => id.clone(),
            TransactionRef::Seq(target) if *target < seq => self
                .transaction_refs
                .get(target)
                .map(|id| id.value().clone())
                .unwrap_or_else(|| format!("#{}", target)),
            TransactionRef::Seq(target) => format!("#{}", target),
        }
    }

    /// Process one request
    pub async fn process(&self, request: SequencedRequest) -> ProcessingResult {
        let SequencedRequest { seq, request } = request;
        let op = request.op();

        let outcome = match request {
            BankRequest::Register { user_id, name } => self
                .engine
                .register_user(user_id, &name)
                .map(|user| Outcome::Registered { user_id: user.id }),
            BankRequest::Create {
                user_id,
                initial_balance,
            } => self
                .engine
                .create_account(user_id, initial_balance)
                .await
                .map(Outcome::Account),
            BankRequest::Delete {
                user_id,
                account_number,
            } => self
                .engine
                .delete_account(user_id, &account_number)
                .await
                .map(Outcome::Account),
            BankRequest::Use {
                user_id,
                account_number,
                amount,
            } => {
                let request = UseBalanceRequest {
                    user_id,
                    account_number,
                    amount,
                };
                self.engine
                    .use_balance(&request)
                    .await
                    .map(|record| self.remember(seq, record))
            }
            BankRequest::Cancel {
                transaction,
                account_number,
                amount,
            } => {
                let request = CancelBalanceRequest {
                    transaction_id: self.resolve(seq, &transaction),
                    account_number,
                    amount,
                };
                self.engine
                    .cancel_balance(&request)
                    .await
                    .map(|record| self.remember(seq, record))
            }
            BankRequest::Query { transaction } => self
                .engine
                .query_transaction(&self.resolve(seq, &transaction))
                .map(Outcome::Transaction),
            BankRequest::List { user_id } => self
                .engine
                .get_accounts_by_user(user_id)
                .map(Outcome::Accounts),
        };

        ProcessingResult { seq, op, outcome }
    }

    fn remember(&self, seq: RequestSeq, record: TransactionRecord) -> Outcome {
        self.transaction_refs
            .insert(seq, record.transaction_id.clone());
        Outcome::Transaction(record)
    }

    /// Partition account-keyed requests by account number
    ///
    /// Each request appears in exactly one partition, and every partition
    /// keeps the input order of its requests.
    pub fn partition_by_account(
        &self,
        requests: Vec<SequencedRequest>,
    ) -> HashMap<String, Vec<SequencedRequest>> {
        let mut partitions: HashMap<String, Vec<SequencedRequest>> = HashMap::new();

        for request in requests {
            let key = request.request.account_key().unwrap_or_default().to_string();
            partitions.entry(key).or_default().push(request);
        }

        partitions
    }

    /// Process the requests of one partition in order
    pub async fn process_partition(&self, requests: Vec<SequencedRequest>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            results.push(self.process(request).await);
        }

        results
    }

    /// Process a batch, running independent accounts concurrently
    ///
    /// Results are returned sorted by sequence number.
    pub async fn process_batch(&self, batch: Vec<SequencedRequest>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());

        for segment in segment(batch) {
            match segment {
                Segment::Barrier(request) => results.push(self.process(request).await),
                Segment::Keyed(requests) => {
                    results.extend(self.process_concurrently(requests).await)
                }
            }
        }

        results.sort_by_key(|result| result.seq);
        results
    }

    async fn process_concurrently(&self, requests: Vec<SequencedRequest>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_account(requests);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_account_number, requests) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_partition(requests).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(partition_results) => results.extend(partition_results),
                Err(e) => error!("Partition task panicked: {:?}", e),
            }
        }

        results
    }
}

/// Cut a batch into barrier and account-keyed segments
fn segment(batch: Vec<SequencedRequest>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut keyed: Vec<SequencedRequest> = Vec::new();
    // Account of every request in the current keyed segment
    let mut keys: HashMap<RequestSeq, String> = HashMap::new();

    for request in batch {
        let key = match request.request.account_key() {
            Some(key) => key.to_string(),
            None => {
                if !keyed.is_empty() {
                    segments.push(Segment::Keyed(std::mem::take(&mut keyed)));
                    keys.clear();
                }
                segments.push(Segment::Barrier(request));
                continue;
            }
        };

        if let BankRequest::Cancel {
            transaction: TransactionRef::Seq(target),
            ..
        } = &request.request
        {
            let crosses = keys.get(target).is_some_and(|target_key| *target_key != key);
            if crosses {
                segments.push(Segment::Keyed(std::mem::take(&mut keyed)));
                keys.clear();
            }
        }

        keys.insert(request.seq, key);
        keyed.push(request);
    }

    if !keyed.is_empty() {
        segments.push(Segment::Keyed(keyed));
    }
    segments
}
