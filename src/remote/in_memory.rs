//! In-memory license backend.
//!
//! This module provides a thread-safe, in-process implementation of
//! [`RemoteInvoker`] that answers the license commands from an in-memory
//! license store. It's designed for testing, demos and benchmarks of the bulk
//! engine without a running license server.
//!
//! # Assignment rules
//!
//! * Expired licenses are skipped when collecting candidates
//! * If the candidates offer fewer free assignments than there are objects,
//!   nothing is assigned and `notEnoughLicenses` is reported
//! * Licenses are consumed ordered by validity end date; licenses without an
//!   end date go last
//! * An object that already holds the license counts as a success
//! * Users take `SINGLE`/`VOLUME` licenses, groups `WORKGROUP`, schools `SCHOOL`
//! * A license whose validity starts after "today" is reported in
//!   `validityInFuture`
//!
//! # Example Usage
//!
//! ```rust
//! use school_license_bulk::remote::{InMemoryLicenseBackend, License, LicenseType, RemoteInvoker, operations};
//! use serde_json::{Map, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryLicenseBackend::new();
//! backend.add_license(License::new("VOL-1", "school-a", LicenseType::Volume, 10)).await;
//! backend.add_user("anna", "school-a").await;
//!
//! let mut arguments = Map::new();
//! arguments.insert("licenseCodes".to_string(), json!(["VOL-1"]));
//! arguments.insert("usernames".to_string(), json!(["anna"]));
//!
//! let response = backend.invoke(operations::ASSIGN_TO_USERS, arguments).await?;
//! assert_eq!(response.result["countSuccessfulAssignments"], 1);
//! # Ok(())
//! # }
//! ```

use crate::remote::{BackendError, CommandResponse, RemoteInvoker, TransportError, operations};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// License types known to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseType {
    Single,
    Volume,
    Workgroup,
    School,
}

impl LicenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Single => "SINGLE",
            LicenseType::Volume => "VOLUME",
            LicenseType::Workgroup => "WORKGROUP",
            LicenseType::School => "SCHOOL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectType {
    User,
    Group,
    School,
}

impl ObjectType {
    fn as_str(&self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Group => "group",
            ObjectType::School => "school",
        }
    }

    fn accepts(&self, license_type: LicenseType) -> bool {
        match self {
            ObjectType::User => {
                matches!(license_type, LicenseType::Single | LicenseType::Volume)
            }
            ObjectType::Group => license_type == LicenseType::Workgroup,
            ObjectType::School => license_type == LicenseType::School,
        }
    }
}

/// A license with its current assignees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub code: String,
    pub school: String,
    pub license_type: LicenseType,
    /// Number of assignments the license grants. `0` means unlimited group size
    /// for group and school licenses.
    pub quantity: usize,
    pub assignees: Vec<String>,
    pub ignored: bool,
    pub expired: bool,
    pub validity_start: Option<NaiveDate>,
    pub validity_end: Option<NaiveDate>,
}

impl License {
    /// Create a license with no assignees and unrestricted validity.
    pub fn new(
        code: impl Into<String>,
        school: impl Into<String>,
        license_type: LicenseType,
        quantity: usize,
    ) -> Self {
        Self {
            code: code.into(),
            school: school.into(),
            license_type,
            quantity,
            assignees: Vec::new(),
            ignored: false,
            expired: false,
            validity_start: None,
            validity_end: None,
        }
    }

    pub fn with_validity(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.validity_start = start;
        self.validity_end = end;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn expired(mut self) -> Self {
        self.expired = true;
        self
    }

    /// Total assignments the license grants. Workgroup and school licenses use
    /// `quantity` as the group size limit and can be assigned once.
    pub fn total_assignments(&self) -> usize {
        match self.license_type {
            LicenseType::Workgroup | LicenseType::School => 1,
            LicenseType::Single | LicenseType::Volume => self.quantity,
        }
    }

    /// Free assignments left on this license.
    pub fn num_available(&self) -> usize {
        if self.ignored || self.expired {
            return 0;
        }
        self.total_assignments().saturating_sub(self.assignees.len())
    }
}

/// A call as it reached the backend, in call order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub arguments: Map<String, Value>,
}

impl RecordedCall {
    /// The string items stored under `key`, or an empty list.
    pub fn items(&self, key: &str) -> Vec<String> {
        self.arguments
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Group {
    school: String,
    members: usize,
}

#[derive(Default)]
struct BackendState {
    licenses: HashMap<String, License>,
    // username -> school
    users: HashMap<String, String>,
    groups: HashMap<String, Group>,
    // school -> member count
    schools: HashMap<String, usize>,
    calls: Vec<RecordedCall>,
    injected_failures: HashMap<usize, TransportError>,
}

/// Thread-safe in-memory license backend.
///
/// Cloning is cheap and yields a handle to the same store, so a test can keep
/// one clone for inspection while the executor owns another.
#[derive(Clone)]
pub struct InMemoryLicenseBackend {
    state: Arc<RwLock<BackendState>>,
    today: NaiveDate,
}

impl InMemoryLicenseBackend {
    /// Create an empty backend using the current UTC date as "today".
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(BackendState::default())),
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the date used for future-validity checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn add_license(&self, license: License) {
        let mut state = self.state.write().await;
        state.licenses.insert(license.code.clone(), license);
    }

    pub async fn add_user(&self, username: impl Into<String>, school: impl Into<String>) {
        let mut state = self.state.write().await;
        state.users.insert(username.into(), school.into());
    }

    /// Register a class or workgroup with its member count.
    pub async fn add_group(
        &self,
        name: impl Into<String>,
        school: impl Into<String>,
        members: usize,
    ) {
        let mut state = self.state.write().await;
        state.groups.insert(
            name.into(),
            Group {
                school: school.into(),
                members,
            },
        );
    }

    pub async fn add_school(&self, name: impl Into<String>, members: usize) {
        let mut state = self.state.write().await;
        state.schools.insert(name.into(), members);
    }

    /// Snapshot of a license.
    pub async fn license(&self, code: &str) -> Option<License> {
        self.state.read().await.licenses.get(code).cloned()
    }

    /// All calls received so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.calls.clone()
    }

    /// Calls received for one operation.
    pub async fn calls_for(&self, operation: &str) -> Vec<RecordedCall> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    /// Make the call with the given zero-based index reject with `error`.
    pub async fn fail_call(&self, index: usize, error: TransportError) {
        let mut state = self.state.write().await;
        state.injected_failures.insert(index, error);
    }

    fn dispatch(
        &self,
        state: &mut BackendState,
        operation: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, String> {
        match operation {
            operations::ASSIGN_TO_USERS => {
                let codes = string_list(arguments, "licenseCodes")?;
                let usernames = string_list(arguments, "usernames")?;
                self.assign_objects(state, &codes, ObjectType::User, &usernames)
            }
            operations::ASSIGN_TO_SCHOOL => {
                let codes = string_list(arguments, "licenseCodes")?;
                let school = string_arg(arguments, "school")?;
                self.assign_objects(state, &codes, ObjectType::School, &[school])
            }
            operations::ASSIGN_TO_CLASS => {
                let codes = string_list(arguments, "licenseCodes")?;
                let class = string_arg(arguments, "schoolClass")?;
                self.assign_objects(state, &codes, ObjectType::Group, &[class])
            }
            operations::ASSIGN_TO_WORKGROUP => {
                let codes = string_list(arguments, "licenseCodes")?;
                let workgroup = string_arg(arguments, "workgroup")?;
                self.assign_objects(state, &codes, ObjectType::Group, &[workgroup])
            }
            operations::NOT_ASSIGNED_USERS => {
                let usernames = string_list(arguments, "usernames")?;
                let codes = string_list(arguments, "licenseCodes")?;
                Ok(json!(not_assigned_users(state, &usernames, &codes)))
            }
            operations::REMOVE_FROM_USERS => {
                let code = string_arg(arguments, "licenseCode")?;
                let usernames = string_list(arguments, "usernames")?;
                remove_from_users(state, &code, &usernames)
            }
            operations::DELETE => {
                let codes = string_list(arguments, "licenses")?;
                let mut deleted = 0;
                for code in &codes {
                    if state.licenses.remove(code).is_some() {
                        deleted += 1;
                    }
                }
                info!("Deleted {}/{} licenses", deleted, codes.len());
                Ok(Value::Null)
            }
            other => Err(format!("Unknown command {:?}", other)),
        }
    }

    fn assign_objects(
        &self,
        state: &mut BackendState,
        license_codes: &[String],
        object_type: ObjectType,
        object_names: &[String],
    ) -> Result<Value, String> {
        struct Candidate {
            code: String,
            available: usize,
            end: Option<NaiveDate>,
        }

        let mut candidates = Vec::new();
        for code in license_codes {
            let license = state.licenses.get(code).ok_or_else(|| {
                BackendError::LicenseNotFound { code: code.clone() }.to_string()
            })?;
            if license.expired {
                continue;
            }
            candidates.push(Candidate {
                code: code.clone(),
                available: license.num_available(),
                end: license.validity_end,
            });
        }

        let available: usize = candidates.iter().map(|c| c.available).sum();
        if available < object_names.len() {
            debug!(
                "Not enough licenses: {} available for {} objects",
                available,
                object_names.len()
            );
            return Ok(json!({
                "countSuccessfulAssignments": 0,
                "notEnoughLicenses": true,
                "failedAssignments": [],
                "validityInFuture": [],
            }));
        }

        candidates.sort_by(|a, b| match (a.end, b.end) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let slots = candidates
            .iter()
            .flat_map(|c| std::iter::repeat_n(c.code.as_str(), c.available));

        let mut count = 0usize;
        let mut failed = Vec::new();
        let mut validity_in_future: Vec<String> = Vec::new();
        for (name, code) in object_names.iter().zip(slots) {
            match self.assign_license(state, code, object_type, name) {
                Ok(()) => {
                    count += 1;
                    let starts_later = state
                        .licenses
                        .get(code)
                        .and_then(|license| license.validity_start)
                        .is_some_and(|start| start > self.today);
                    if starts_later && !validity_in_future.iter().any(|c| c == code) {
                        validity_in_future.push(code.to_string());
                    }
                }
                Err(e) => {
                    warn!("Assignment of {:?} to {:?} failed: {}", code, name, e);
                    failed.push(json!({"username": name, "error": e.to_string()}));
                }
            }
        }

        info!(
            "Assigned licenses to {}/{} {}s",
            count,
            object_names.len(),
            object_type.as_str()
        );
        Ok(json!({
            "countSuccessfulAssignments": count,
            "notEnoughLicenses": false,
            "failedAssignments": failed,
            "validityInFuture": validity_in_future,
        }))
    }

    fn assign_license(
        &self,
        state: &mut BackendState,
        code: &str,
        object_type: ObjectType,
        name: &str,
    ) -> Result<(), BackendError> {
        let license = state
            .licenses
            .get(code)
            .ok_or_else(|| BackendError::LicenseNotFound {
                code: code.to_string(),
            })?;
        if license.ignored {
            return Err(BackendError::LicenseIgnored {
                code: code.to_string(),
            });
        }
        if license.expired {
            return Err(BackendError::LicenseExpired {
                code: code.to_string(),
            });
        }
        if !object_type.accepts(license.license_type) {
            return Err(BackendError::WrongLicenseType {
                license_type: license.license_type.as_str().to_string(),
                object_type: object_type.as_str().to_string(),
            });
        }

        let not_found = || BackendError::ObjectNotFound {
            object_type: object_type.as_str().to_string(),
            name: name.to_string(),
        };
        let (object_school, members) = match object_type {
            ObjectType::User => (state.users.get(name).ok_or_else(not_found)?.clone(), None),
            ObjectType::Group => {
                let group = state.groups.get(name).ok_or_else(not_found)?;
                (group.school.clone(), Some(group.members))
            }
            ObjectType::School => {
                let members = state.schools.get(name).ok_or_else(not_found)?;
                (name.to_string(), Some(*members))
            }
        };
        if license.school != object_school {
            return Err(BackendError::WrongSchool);
        }
        if let Some(members) = members {
            if license.quantity != 0 && members > license.quantity {
                return Err(BackendError::GroupTooLarge {
                    quantity: license.quantity,
                });
            }
        }
        if license.assignees.iter().any(|assignee| assignee == name) {
            return Ok(());
        }
        if license.num_available() == 0 {
            return Err(BackendError::NoAssignmentsLeft {
                code: code.to_string(),
                name: name.to_string(),
            });
        }

        if let Some(license) = state.licenses.get_mut(code) {
            license.assignees.push(name.to_string());
            debug!(
                "Assigned license {:?} ({} left) to {:?}",
                code,
                license.num_available(),
                name
            );
        }
        Ok(())
    }
}

impl Default for InMemoryLicenseBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteInvoker for InMemoryLicenseBackend {
    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> Result<CommandResponse, TransportError> {
        let mut state = self.state.write().await;
        let index = state.calls.len();
        state.calls.push(RecordedCall {
            operation: operation.to_string(),
            arguments: arguments.clone(),
        });

        if let Some(error) = state.injected_failures.remove(&index) {
            warn!("Injected transport failure for call {} ({})", index, operation);
            return Err(error);
        }

        match self.dispatch(&mut state, operation, &arguments) {
            Ok(result) => Ok(CommandResponse::ok(result)),
            Err(message) => Ok(CommandResponse::error(message)),
        }
    }
}

fn string_list(arguments: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    let items = arguments
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("Argument {:?} must be a list", key))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Argument {:?} must contain strings", key))
        })
        .collect()
}

fn string_arg(arguments: &Map<String, Value>, key: &str) -> Result<String, String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("Argument {:?} must be a string", key))
}

fn not_assigned_users(
    state: &BackendState,
    usernames: &[String],
    license_codes: &[String],
) -> Vec<String> {
    usernames
        .iter()
        .filter(|username| {
            !license_codes.iter().any(|code| {
                state
                    .licenses
                    .get(code)
                    .is_some_and(|license| license.assignees.contains(username))
            })
        })
        .cloned()
        .collect()
}

fn remove_from_users(
    state: &mut BackendState,
    code: &str,
    usernames: &[String],
) -> Result<Value, String> {
    let license = state.licenses.get_mut(code).ok_or_else(|| {
        BackendError::LicenseNotFound {
            code: code.to_string(),
        }
        .to_string()
    })?;

    let mut removed = 0;
    let mut failed = Vec::new();
    for username in usernames {
        match license.assignees.iter().position(|a| a == username) {
            Some(position) => {
                license.assignees.remove(position);
                removed += 1;
            }
            None => {
                let error = BackendError::AssignmentNotFound {
                    code: code.to_string(),
                    name: username.clone(),
                };
                failed.push(json!({"username": username, "error": error.to_string()}));
            }
        }
    }

    info!(
        "Removed {}/{} user assignments from license {:?}",
        removed,
        usernames.len(),
        code
    );
    Ok(json!({ "failedAssignments": failed }))
}
