//! License assignment operations built on the bulk engine.
//!
//! Assigning to users is the chunked, preflighted path. Schools, classes and
//! workgroups are a single object each and go out as one unchunked call whose
//! payload follows the same result contract. Removing assignments and deleting
//! licenses are chunked without preflight.

use crate::assignment::selection::LicenseSelection;
use crate::bulk::{
    BulkOperationExecutor, BulkOutcome, BulkRequest, NoProgress, ProgressSink, SuccessCounting,
};
use crate::config::BulkConfig;
use crate::context::OperationContext;
use crate::error::{BulkError, BulkResult};
use crate::remote::{RemoteInvoker, operations};
use log::info;
use serde_json::{Map, Value, json};

const PROGRESS_LABEL: &str = "licenses processed";

/// Name of a group from its DN: the value of the first RDN.
///
/// `cn=5a,cn=klassen,cn=schueler,...` yields `5a`.
pub fn group_name_from_dn(dn: &str) -> Option<&str> {
    let rdn = dn.split(',').next()?;
    let (_, value) = rdn.split_once('=')?;
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// High-level license operations for one executor.
pub struct LicenseAssignmentService<I: RemoteInvoker> {
    executor: BulkOperationExecutor<I>,
}

impl<I: RemoteInvoker> LicenseAssignmentService<I> {
    pub fn new(invoker: I, config: BulkConfig) -> BulkResult<Self> {
        Ok(Self::with_executor(BulkOperationExecutor::new(invoker, config)?))
    }

    pub fn with_executor(executor: BulkOperationExecutor<I>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &BulkOperationExecutor<I> {
        &self.executor
    }

    /// Assign the selected licenses to users.
    ///
    /// Users that already hold one of the selected licenses are filtered out
    /// first. If the remaining users outnumber the selection's available
    /// assignments, nothing is sent and the outcome is a preflight abort.
    pub async fn assign_to_users(
        &self,
        context: &OperationContext,
        selection: &LicenseSelection,
        usernames: Vec<String>,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        require_selection(selection)?;
        info!(
            "Assigning {} license(s) to {} users (operation: '{}')",
            selection.rows().len(),
            usernames.len(),
            context.operation_id
        );
        let request = BulkRequest::new(operations::ASSIGN_TO_USERS, "usernames", usernames)
            .with_parameter("licenseCodes", selection.license_codes())
            .with_progress_label(PROGRESS_LABEL);
        self.executor
            .execute_with_preflight(context, request, &selection.preflight(), progress)
            .await
    }

    pub async fn assign_to_school(
        &self,
        context: &OperationContext,
        selection: &LicenseSelection,
        school: &str,
    ) -> BulkResult<BulkOutcome> {
        require_selection(selection)?;
        if school.is_empty() {
            return Err(BulkError::invalid_request("School must not be empty"));
        }
        let arguments = group_arguments(selection, "school", school);
        self.executor
            .execute_single(context, operations::ASSIGN_TO_SCHOOL, arguments)
            .await
    }

    /// Assign to the class named by the first RDN of `class_dn`.
    pub async fn assign_to_class(
        &self,
        context: &OperationContext,
        selection: &LicenseSelection,
        class_dn: &str,
    ) -> BulkResult<BulkOutcome> {
        require_selection(selection)?;
        let class = group_name_from_dn(class_dn).ok_or_else(|| {
            BulkError::invalid_request(format!("Invalid class DN: {:?}", class_dn))
        })?;
        let arguments = group_arguments(selection, "schoolClass", class);
        self.executor
            .execute_single(context, operations::ASSIGN_TO_CLASS, arguments)
            .await
    }

    /// Assign to the workgroup named by the first RDN of `workgroup_dn`.
    pub async fn assign_to_workgroup(
        &self,
        context: &OperationContext,
        selection: &LicenseSelection,
        workgroup_dn: &str,
    ) -> BulkResult<BulkOutcome> {
        require_selection(selection)?;
        let workgroup = group_name_from_dn(workgroup_dn).ok_or_else(|| {
            BulkError::invalid_request(format!("Invalid workgroup DN: {:?}", workgroup_dn))
        })?;
        let arguments = group_arguments(selection, "workgroup", workgroup);
        self.executor
            .execute_single(context, operations::ASSIGN_TO_WORKGROUP, arguments)
            .await
    }

    /// Remove one license from the given users. Users that do not hold it come
    /// back as failures and are not counted.
    pub async fn remove_from_users(
        &self,
        context: &OperationContext,
        license_code: &str,
        usernames: Vec<String>,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        let request = BulkRequest::new(operations::REMOVE_FROM_USERS, "usernames", usernames)
            .with_parameter("licenseCode", license_code)
            .with_counting(SuccessCounting::ChunkLengthMinusFailures)
            .with_progress_label(PROGRESS_LABEL);
        self.executor.execute(context, request, progress).await
    }

    /// Delete licenses. The backend reports no counter, so every code sent
    /// counts as processed.
    pub async fn delete_licenses(
        &self,
        context: &OperationContext,
        license_codes: Vec<String>,
        progress: &dyn ProgressSink,
    ) -> BulkResult<BulkOutcome> {
        let request = BulkRequest::new(operations::DELETE, "licenses", license_codes)
            .with_counting(SuccessCounting::ChunkLength)
            .with_progress_label(PROGRESS_LABEL);
        self.executor.execute(context, request, progress).await
    }

    /// [`assign_to_users`](Self::assign_to_users) without progress reporting.
    pub async fn assign_to_users_quietly(
        &self,
        context: &OperationContext,
        selection: &LicenseSelection,
        usernames: Vec<String>,
    ) -> BulkResult<BulkOutcome> {
        self.assign_to_users(context, selection, usernames, &NoProgress)
            .await
    }
}

fn require_selection(selection: &LicenseSelection) -> BulkResult<()> {
    if selection.is_empty() {
        return Err(BulkError::invalid_request("No licenses selected"));
    }
    Ok(())
}

fn group_arguments(selection: &LicenseSelection, key: &str, name: &str) -> Map<String, Value> {
    let mut arguments = Map::new();
    arguments.insert("licenseCodes".to_string(), json!(selection.license_codes()));
    arguments.insert(key.to_string(), json!(name));
    arguments
}
