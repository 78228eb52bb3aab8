//! Attendance pipeline tests: scoping, uniqueness, conditional validation,
//! enrichment.

use chrono::Utc;

use super::super::common::*;
use rota_proto::rota_service_server::RotaService;
use rota_proto::{Empty, MarkAttendanceRequest};
use rota_storage::{attendance_day, AttendanceStatus, MarkAttendanceParams, Store};

fn mark_request(subject: &rota_storage::UserId, status: &str, check_in: i64) -> MarkAttendanceRequest {
    MarkAttendanceRequest {
        subject_id: subject.0.to_string(),
        status: status.to_string(),
        check_in_time: check_in,
    }
}

#[tokio::test]
async fn hr_marks_present_employee_and_gets_enriched_record() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let check_in = Utc::now().timestamp();
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "present", check_in),
    );
    let record = server.mark_attendance(request).await.unwrap().into_inner();

    assert_eq!(record.subject_id, emp_id.0.to_string());
    assert_eq!(record.marked_by, hr_id.0.to_string());
    assert_eq!(record.status, "present");
    assert_eq!(record.check_in_time, check_in);
    assert_eq!(record.subject_name, "alice");
    assert_eq!(record.day, attendance_day(Utc::now()).to_string());

    // Display joins arrive in the same response, no second round trip
    let subject = record.subject.unwrap();
    assert_eq!(subject.email, "alice@example.com");
    assert_eq!(subject.role, "employee");
    let marker = record.marker.unwrap();
    assert_eq!(marker.id, hr_id.0.to_string());
    assert_eq!(marker.role, "hr");
}

#[tokio::test]
async fn second_mark_same_day_is_rejected_as_duplicate() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "present", Utc::now().timestamp()),
    );
    server.mark_attendance(request).await.unwrap();

    // Same subject, same day, different status: still one record per day
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "absent", 0),
    );
    let result = server.mark_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::AlreadyExists);
}

#[tokio::test]
async fn non_present_status_clears_incoming_check_in() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    // Caller sends a check-in with status=absent; it must not persist
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "absent", Utc::now().timestamp()),
    );
    let record = server.mark_attendance(request).await.unwrap().into_inner();
    assert_eq!(record.status, "absent");
    assert_eq!(record.check_in_time, 0);

    let stored = server
        .store
        .get_attendance_for_day(&emp_id, attendance_day(Utc::now()))
        .await
        .unwrap();
    assert_eq!(stored.status, AttendanceStatus::Absent);
    assert!(stored.check_in.is_none());
}

#[tokio::test]
async fn present_without_check_in_is_rejected() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "present", 0),
    );
    let result = server.mark_attendance(request).await;
    let status = result.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(status.message().contains("conditional-field-missing"));
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "vacation", 0),
    );
    let result = server.mark_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
}

#[tokio::test]
async fn employee_cannot_mark_attendance_even_for_themselves() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, _) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, emp_key) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &emp_id,
        &emp_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_id, "present", Utc::now().timestamp()),
    );
    let result = server.mark_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::PermissionDenied);
}

#[tokio::test]
async fn hr_cannot_mark_outside_their_created_set() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_a, hr_a_key) = create_test_hr(&server, "hr-a@example.com", &admin_id).await;
    let (hr_b, _) = create_test_hr(&server, "hr-b@example.com", &admin_id).await;
    let (emp_b, _) = create_test_employee(&server, "bob@example.com", &hr_b).await;

    let request = create_signed_request(
        &hr_a,
        &hr_a_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&emp_b, "present", Utc::now().timestamp()),
    );
    let result = server.mark_attendance(request).await;
    // Merged rejection: out-of-scope looks exactly like missing
    assert_eq!(result.unwrap_err().code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn missing_subject_gets_the_same_rejection_as_out_of_scope() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/MarkAttendance",
        MarkAttendanceRequest {
            subject_id: uuid::Uuid::new_v4().to_string(),
            status: "present".to_string(),
            check_in_time: Utc::now().timestamp(),
        },
    );
    let result = server.mark_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn non_employee_subjects_are_not_markable() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, _) = create_test_hr(&server, "hr@example.com", &admin_id).await;

    // Admin scope contains the hr account, but its role is not employee
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/MarkAttendance",
        mark_request(&hr_id, "present", Utc::now().timestamp()),
    );
    let result = server.mark_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn hr_with_no_employees_gets_empty_reads() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;

    let request =
        create_signed_request(&hr_id, &hr_key, "/rota.RotaService/ListAttendance", Empty {});
    let records = server.list_attendance(request).await.unwrap().into_inner();
    assert!(records.records.is_empty());

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/ListMarkableSubjects",
        Empty {},
    );
    let subjects = server
        .list_markable_subjects(request)
        .await
        .unwrap()
        .into_inner();
    assert!(subjects.users.is_empty());
}

#[tokio::test]
async fn list_attendance_is_scoped_and_ordered_newest_first() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_a, hr_a_key) = create_test_hr(&server, "hr-a@example.com", &admin_id).await;
    let (hr_b, _) = create_test_hr(&server, "hr-b@example.com", &admin_id).await;
    let (emp_a, emp_a_key) = create_test_employee(&server, "alice@example.com", &hr_a).await;
    let (emp_b, _) = create_test_employee(&server, "bob@example.com", &hr_b).await;

    // Seed history directly in the store (marking over RPC is today-only)
    let today = attendance_day(Utc::now());
    let yesterday = today.pred_opt().unwrap();
    for (subject, name, day, marker) in [
        (&emp_a, "alice", yesterday, &hr_a),
        (&emp_a, "alice", today, &hr_a),
        (&emp_b, "bob", yesterday, &hr_b),
    ] {
        server
            .store
            .insert_attendance(&MarkAttendanceParams {
                subject_id: subject.clone(),
                subject_name: name.to_string(),
                status: AttendanceStatus::Leave,
                check_in: None,
                day,
                marked_by: marker.clone(),
            })
            .await
            .unwrap();
    }

    // Hr A sees only their employee's records, newest day first
    let request = create_signed_request(
        &hr_a,
        &hr_a_key,
        "/rota.RotaService/ListAttendance",
        Empty {},
    );
    let list = server.list_attendance(request).await.unwrap().into_inner();
    assert_eq!(list.records.len(), 2);
    assert_eq!(list.records[0].day, today.to_string());
    assert_eq!(list.records[1].day, yesterday.to_string());
    assert!(list
        .records
        .iter()
        .all(|r| r.subject_id == emp_a.0.to_string()));

    // Admin sees everything
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/ListAttendance",
        Empty {},
    );
    let all = server.list_attendance(request).await.unwrap().into_inner();
    assert_eq!(all.records.len(), 3);

    // Employees may read their own records only
    let request = create_signed_request(
        &emp_a,
        &emp_a_key,
        "/rota.RotaService/ListAttendance",
        Empty {},
    );
    let own = server.list_attendance(request).await.unwrap().into_inner();
    assert_eq!(own.records.len(), 2);
    assert!(own
        .records
        .iter()
        .all(|r| r.subject_id == emp_a.0.to_string()));
}

#[tokio::test]
async fn list_today_filters_to_the_current_day() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, emp_key) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let today = attendance_day(Utc::now());
    let yesterday = today.pred_opt().unwrap();
    for day in [yesterday, today] {
        server
            .store
            .insert_attendance(&MarkAttendanceParams {
                subject_id: emp_id.clone(),
                subject_name: "alice".to_string(),
                status: AttendanceStatus::HalfDay,
                check_in: None,
                day,
                marked_by: hr_id.clone(),
            })
            .await
            .unwrap();
    }

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/ListTodayAttendance",
        Empty {},
    );
    let list = server
        .list_today_attendance(request)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(list.records.len(), 1);
    assert_eq!(list.records[0].day, today.to_string());

    // Privileged read: employees are rejected
    let request = create_signed_request(
        &emp_id,
        &emp_key,
        "/rota.RotaService/ListTodayAttendance",
        Empty {},
    );
    let result = server.list_today_attendance(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::PermissionDenied);
}

#[tokio::test]
async fn markable_subjects_are_employees_in_scope() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_a, hr_a_key) = create_test_hr(&server, "hr-a@example.com", &admin_id).await;
    let (hr_b, _) = create_test_hr(&server, "hr-b@example.com", &admin_id).await;
    let (emp_a, _) = create_test_employee(&server, "alice@example.com", &hr_a).await;
    let (emp_b, _) = create_test_employee(&server, "bob@example.com", &hr_b).await;

    // Hr A: only their own employee, never the hr/admin accounts
    let request = create_signed_request(
        &hr_a,
        &hr_a_key,
        "/rota.RotaService/ListMarkableSubjects",
        Empty {},
    );
    let subjects = server
        .list_markable_subjects(request)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(subjects.users.len(), 1);
    assert_eq!(subjects.users[0].id, emp_a.0.to_string());

    // Admin: every employee in the directory, still no hr/admin accounts
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/ListMarkableSubjects",
        Empty {},
    );
    let subjects = server
        .list_markable_subjects(request)
        .await
        .unwrap()
        .into_inner();
    let ids: Vec<_> = subjects.users.iter().map(|u| u.id.clone()).collect();
    assert_eq!(subjects.users.len(), 2);
    assert!(ids.contains(&emp_a.0.to_string()));
    assert!(ids.contains(&emp_b.0.to_string()));
}
