//! End-to-end assignment scenarios against the in-memory license backend.

mod common;

use chrono::NaiveDate;
use common::{RecordingSink, config, init_logging, users};
use school_license_bulk::assignment::{
    AssignmentSummary, AssignmentTarget, LicenseAssignmentService, LicenseSelection,
};
use school_license_bulk::bulk::{NoProgress, OutcomeStatus};
use school_license_bulk::context::OperationContext;
use school_license_bulk::remote::{InMemoryLicenseBackend, License, LicenseType, operations};

const SCHOOL: &str = "school-a";

async fn backend_with_users(count: usize) -> InMemoryLicenseBackend {
    let backend = InMemoryLicenseBackend::new()
        .with_today(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    for username in users(count) {
        backend.add_user(username, SCHOOL).await;
    }
    backend
}

fn service(
    backend: &InMemoryLicenseBackend,
    chunk_size: usize,
) -> LicenseAssignmentService<InMemoryLicenseBackend> {
    LicenseAssignmentService::new(backend.clone(), config(chunk_size)).unwrap()
}

#[tokio::test]
async fn test_assign_130_users_with_progress() {
    init_logging();
    let backend = backend_with_users(130).await;
    backend
        .add_license(License::new("VOL-1", SCHOOL, LicenseType::Volume, 200))
        .await;
    let service = service(&backend, 60);
    let sink = RecordingSink::new();
    let selection = LicenseSelection::default().with_license("VOL-1", 200);

    let outcome = service
        .assign_to_users(&OperationContext::for_school(SCHOOL), &selection, users(130), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::Completed);
    assert_eq!(outcome.result.successful_count, 130);
    assert_eq!(sink.updates(), vec![60, 120, 130]);
    assert_eq!(sink.teardowns(), 1);
    assert_eq!(
        backend.license("VOL-1").await.unwrap().assignees.len(),
        130
    );
    assert_eq!(backend.calls_for(operations::NOT_ASSIGNED_USERS).await.len(), 1);
    assert_eq!(backend.calls_for(operations::ASSIGN_TO_USERS).await.len(), 3);

    let summary =
        AssignmentSummary::from_outcome(&outcome, AssignmentTarget::Users { requested: 130 });
    assert_eq!(
        summary.lines,
        vec!["Licenses were successfully assigned to all 130 selected users."]
    );
}

#[tokio::test]
async fn test_users_already_holding_the_license_are_skipped() {
    let backend = backend_with_users(10).await;
    let mut license = License::new("VOL-1", SCHOOL, LicenseType::Volume, 12);
    license.assignees = users(8);
    backend.add_license(license).await;
    let service = service(&backend, 60);
    let selection = LicenseSelection::default().with_license("VOL-1", 4);

    let outcome = service
        .assign_to_users_quietly(&OperationContext::default(), &selection, users(10))
        .await
        .unwrap();

    assert_eq!(outcome.result.successful_count, 2);
    let assigned = backend.calls_for(operations::ASSIGN_TO_USERS).await;
    let mut sent = assigned[0].items("usernames");
    sent.sort();
    assert_eq!(sent, vec!["user8", "user9"]);

    let summary =
        AssignmentSummary::from_outcome(&outcome, AssignmentTarget::Users { requested: 10 });
    assert!(summary.lines[0].starts_with("Licenses were successfully assigned to 2 of the 10"));
}

#[tokio::test]
async fn test_everyone_already_assigned_is_nothing_to_do() {
    let backend = backend_with_users(5).await;
    let mut license = License::new("VOL-1", SCHOOL, LicenseType::Volume, 5);
    license.assignees = users(5);
    backend.add_license(license).await;
    let service = service(&backend, 60);

    let outcome = service
        .assign_to_users_quietly(
            &OperationContext::default(),
            &LicenseSelection::default().with_license("VOL-1", 0),
            users(5),
        )
        .await
        .unwrap();

    assert!(outcome.is_nothing_to_do());
    assert!(backend.calls_for(operations::ASSIGN_TO_USERS).await.is_empty());
}

#[tokio::test]
async fn test_preflight_refuses_when_selection_is_too_small() {
    let backend = backend_with_users(50).await;
    let mut license = License::new("VOL-1", SCHOOL, LicenseType::Volume, 48);
    license.assignees = users(45);
    backend.add_license(license).await;
    let service = service(&backend, 60);

    let outcome = service
        .assign_to_users_quietly(
            &OperationContext::default(),
            &LicenseSelection::default().with_license("VOL-1", 3),
            users(50),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::PreflightAborted);
    assert_eq!(
        outcome.reason.as_deref(),
        Some("Assigning licenses to 5 users failed")
    );
    assert!(backend.calls_for(operations::ASSIGN_TO_USERS).await.is_empty());
    assert_eq!(backend.license("VOL-1").await.unwrap().assignees.len(), 45);
}

#[tokio::test]
async fn test_backend_hard_stop_mid_run() {
    // The selection claims more than the backend really has left, so the
    // preflight passes and the backend stops the run.
    let backend = backend_with_users(100).await;
    backend
        .add_license(License::new("VOL-1", SCHOOL, LicenseType::Volume, 70))
        .await;
    let service = service(&backend, 40);
    let sink = RecordingSink::new();

    let outcome = service
        .assign_to_users(
            &OperationContext::default(),
            &LicenseSelection::default().with_license("VOL-1", 100),
            users(100),
            &sink,
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, OutcomeStatus::HardStopped);
    assert_eq!(outcome.result.successful_count, 40);
    assert_eq!(backend.calls_for(operations::ASSIGN_TO_USERS).await.len(), 2);
    assert_eq!(sink.teardowns(), 1);

    let summary =
        AssignmentSummary::from_outcome(&outcome, AssignmentTarget::Users { requested: 100 });
    assert_eq!(summary.title, "Assigning licenses failed");
}

#[tokio::test]
async fn test_failures_and_future_validity_are_reported() {
    let backend = backend_with_users(3).await;
    backend.add_user("visitor", "school-b").await;
    backend
        .add_license(
            License::new("FUT-1", SCHOOL, LicenseType::Volume, 10)
                .with_validity(NaiveDate::from_ymd_opt(2024, 8, 1), None),
        )
        .await;
    let service = service(&backend, 60);
    let mut requested = users(3);
    requested.push("visitor".to_string());

    let outcome = service
        .assign_to_users_quietly(
            &OperationContext::default(),
            &LicenseSelection::default().with_license("FUT-1", 10),
            requested,
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.successful_count, 3);
    assert_eq!(outcome.result.failures.len(), 1);
    assert_eq!(outcome.result.failures[0].identifier, "visitor");
    assert_eq!(outcome.result.future_validity_warnings, vec!["FUT-1"]);
}

#[tokio::test]
async fn test_assign_to_school_and_workgroup() {
    let backend = InMemoryLicenseBackend::new();
    backend.add_school(SCHOOL, 250).await;
    backend.add_group("chess", SCHOOL, 12).await;
    backend
        .add_license(License::new("SCH-1", SCHOOL, LicenseType::School, 300))
        .await;
    backend
        .add_license(License::new("WG-1", SCHOOL, LicenseType::Workgroup, 15))
        .await;
    let service = service(&backend, 60);
    let context = OperationContext::for_school(SCHOOL);

    let outcome = service
        .assign_to_school(
            &context,
            &LicenseSelection::default().with_license("SCH-1", 1),
            SCHOOL,
        )
        .await
        .unwrap();
    assert_eq!(outcome.result.successful_count, 1);
    assert_eq!(
        AssignmentSummary::from_outcome(&outcome, AssignmentTarget::School).lines,
        vec!["Licenses were successfully assigned to selected school."]
    );

    let outcome = service
        .assign_to_workgroup(
            &context,
            &LicenseSelection::default().with_license("WG-1", 1),
            "cn=chess,cn=groups,ou=school-a,dc=example",
        )
        .await
        .unwrap();
    assert_eq!(outcome.result.successful_count, 1);
    assert_eq!(
        backend.license("WG-1").await.unwrap().assignees,
        vec!["chess"]
    );

    // The school license was used up by the school assignment above.
    let outcome = service
        .assign_to_workgroup(
            &context,
            &LicenseSelection::default().with_license("SCH-1", 1),
            "cn=chess,cn=groups,ou=school-a,dc=example",
        )
        .await
        .unwrap();
    assert_eq!(outcome.result.successful_count, 0);
    assert!(outcome.not_enough_licenses());
}

#[tokio::test]
async fn test_remove_from_users_in_chunks() {
    let backend = backend_with_users(9).await;
    let mut license = License::new("VOL-1", SCHOOL, LicenseType::Volume, 20);
    license.assignees = users(8);
    backend.add_license(license).await;
    let service = service(&backend, 4);
    let sink = RecordingSink::new();

    let outcome = service
        .remove_from_users(&OperationContext::default(), "VOL-1", users(9), &sink)
        .await
        .unwrap();

    // user8 never held the license.
    assert_eq!(outcome.result.successful_count, 8);
    assert!(backend.license("VOL-1").await.unwrap().assignees.is_empty());
    let calls = backend.calls_for(operations::REMOVE_FROM_USERS).await;
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.arguments["licenseCode"] == "VOL-1"));
    assert_eq!(sink.updates(), vec![4, 8, 9]);
}

#[tokio::test]
async fn test_remove_does_not_count_unassigned_users() {
    let backend = backend_with_users(5).await;
    let mut license = License::new("VOL-1", SCHOOL, LicenseType::Volume, 5);
    license.assignees = vec!["user0".to_string()];
    backend.add_license(license).await;
    let service = service(&backend, 60);

    let outcome = service
        .remove_from_users(&OperationContext::default(), "VOL-1", users(5), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.result.successful_count, 1);
    assert_eq!(outcome.result.failures.len(), 4);
    assert!(
        outcome
            .result
            .failures
            .iter()
            .all(|failure| failure.identifier != "user0")
    );
    assert!(backend.license("VOL-1").await.unwrap().assignees.is_empty());
}

#[tokio::test]
async fn test_delete_licenses() {
    let backend = InMemoryLicenseBackend::new();
    for i in 0..5 {
        backend
            .add_license(License::new(
                format!("VOL-{}", i),
                SCHOOL,
                LicenseType::Volume,
                1,
            ))
            .await;
    }
    let service = service(&backend, 2);

    let codes: Vec<String> = (0..5).map(|i| format!("VOL-{}", i)).collect();
    let outcome = service
        .delete_licenses(&OperationContext::default(), codes, &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.result.successful_count, 5);
    assert_eq!(backend.calls_for(operations::DELETE).await.len(), 3);
    for i in 0..5 {
        assert!(backend.license(&format!("VOL-{}", i)).await.is_none());
    }
}

#[tokio::test]
async fn test_transport_failure_surfaces_as_error() {
    let backend = backend_with_users(10).await;
    backend
        .add_license(License::new("VOL-1", SCHOOL, LicenseType::Volume, 10))
        .await;
    // Call 0 is the preflight; the assignment call fails on every attempt.
    for index in 1..=3 {
        backend
            .fail_call(
                index,
                school_license_bulk::remote::TransportError::network("unreachable"),
            )
            .await;
    }
    let service = service(&backend, 60);

    let result = service
        .assign_to_users_quietly(
            &OperationContext::default(),
            &LicenseSelection::default().with_license("VOL-1", 10),
            users(10),
        )
        .await;

    assert!(result.unwrap_err().is_transport());
    assert!(backend.license("VOL-1").await.unwrap().assignees.is_empty());
}
