//! Meeting scheduling, scoping and status transition tests.

use chrono::Utc;

use super::super::common::*;
use crate::config::ServerConfig;
use rota_proto::rota_service_server::RotaService;
use rota_proto::{CreateMeetingRequest, Empty, UpdateMeetingStatusRequest};

fn meeting_request(title: &str, attendees: &[&rota_storage::UserId]) -> CreateMeetingRequest {
    CreateMeetingRequest {
        title: title.to_string(),
        description: "".to_string(),
        starts_at: Utc::now().timestamp() + 3600,
        duration_minutes: 30,
        attendee_ids: attendees.iter().map(|a| a.0.to_string()).collect(),
        join_link: "".to_string(),
    }
}

#[tokio::test]
async fn hr_schedules_meeting_with_their_employees() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_a, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;
    let (emp_b, _) = create_test_employee(&server, "bob@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Standup", &[&emp_a, &emp_b]),
    );
    let meeting = server.create_meeting(request).await.unwrap().into_inner();

    assert_eq!(meeting.title, "Standup");
    assert_eq!(meeting.status, "scheduled");
    assert_eq!(meeting.organizer_id, hr_id.0.to_string());
    assert_eq!(meeting.attendee_ids.len(), 2);
}

#[tokio::test]
async fn admin_scope_is_unrestricted_for_attendees() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    // An hr account not created by anyone relevant
    let (hr_id, _) = create_test_hr(&server, "hr@example.com", &admin_id).await;

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("All hands", &[&hr_id]),
    );
    assert!(server.create_meeting(request).await.is_ok());
}

#[tokio::test]
async fn hr_cannot_invite_outside_their_created_set() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_a, hr_a_key) = create_test_hr(&server, "hr-a@example.com", &admin_id).await;
    let (hr_b, _) = create_test_hr(&server, "hr-b@example.com", &admin_id).await;
    let (emp_b, _) = create_test_employee(&server, "bob@example.com", &hr_b).await;

    let request = create_signed_request(
        &hr_a,
        &hr_a_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Sync", &[&emp_b]),
    );
    let status = server.create_meeting(request).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(status.message().contains("out-of-scope-attendee"));
}

#[tokio::test]
async fn nonexistent_attendee_is_out_of_scope_for_admin_too() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let ghost = rota_storage::UserId(uuid::Uuid::new_v4());

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Seance", &[&ghost]),
    );
    let status = server.create_meeting(request).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(status.message().contains("out-of-scope-attendee"));
}

#[tokio::test]
async fn validation_reports_all_violations_at_once() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/CreateMeeting",
        CreateMeetingRequest {
            title: "   ".to_string(),
            description: "".to_string(),
            starts_at: 0,
            duration_minutes: 0,
            attendee_ids: vec![],
            join_link: "".to_string(),
        },
    );
    let status = server.create_meeting(request).await.unwrap_err();
    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(status.message().contains("missing-field: title"));
    assert!(status.message().contains("missing-field: starts_at"));
    assert!(status.message().contains("empty-attendee-set"));
}

#[tokio::test]
async fn employees_cannot_schedule_meetings() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, _) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, emp_key) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &emp_id,
        &emp_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Coup", &[&emp_id]),
    );
    let result = server.create_meeting(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::PermissionDenied);
}

#[tokio::test]
async fn join_link_is_synthesized_from_configured_base() {
    let config = ServerConfig {
        meeting_link_base: Some("https://meet.example.com".to_string()),
        ..ServerConfig::default()
    };
    let server = create_test_server_with_config(config).await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, _) = create_test_hr(&server, "hr@example.com", &admin_id).await;

    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("All hands", &[&hr_id]),
    );
    let meeting = server.create_meeting(request).await.unwrap().into_inner();
    assert!(meeting
        .join_link
        .starts_with("https://meet.example.com/"));

    // An explicit link is stored verbatim
    let mut explicit = meeting_request("Offsite", &[&hr_id]);
    explicit.join_link = "https://elsewhere.example.com/xyz".to_string();
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/CreateMeeting",
        explicit,
    );
    let meeting = server.create_meeting(request).await.unwrap().into_inner();
    assert_eq!(meeting.join_link, "https://elsewhere.example.com/xyz");
}

#[tokio::test]
async fn list_meetings_is_scoped_to_participants() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_a, emp_a_key) = create_test_employee(&server, "alice@example.com", &hr_id).await;
    let (emp_b, emp_b_key) = create_test_employee(&server, "bob@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Standup", &[&emp_a]),
    );
    server.create_meeting(request).await.unwrap();

    // Attendee sees the meeting
    let request =
        create_signed_request(&emp_a, &emp_a_key, "/rota.RotaService/ListMeetings", Empty {});
    let list = server.list_meetings(request).await.unwrap().into_inner();
    assert_eq!(list.meetings.len(), 1);

    // Non-attendee employee does not
    let request =
        create_signed_request(&emp_b, &emp_b_key, "/rota.RotaService/ListMeetings", Empty {});
    let list = server.list_meetings(request).await.unwrap().into_inner();
    assert!(list.meetings.is_empty());

    // Admin sees every meeting
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/ListMeetings",
        Empty {},
    );
    let list = server.list_meetings(request).await.unwrap().into_inner();
    assert_eq!(list.meetings.len(), 1);
}

#[tokio::test]
async fn status_transitions_are_one_directional() {
    let server = create_test_server().await;
    let (admin_id, _) = create_test_admin(&server, "root@example.com").await;
    let (hr_id, hr_key) = create_test_hr(&server, "hr@example.com", &admin_id).await;
    let (emp_id, _) = create_test_employee(&server, "alice@example.com", &hr_id).await;

    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Standup", &[&emp_id]),
    );
    let meeting = server.create_meeting(request).await.unwrap().into_inner();

    // scheduled -> completed is allowed for the organizer
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id.clone(),
            status: "completed".to_string(),
        },
    );
    let updated = server
        .update_meeting_status(request)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(updated.status, "completed");

    // completed is terminal
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id.clone(),
            status: "cancelled".to_string(),
        },
    );
    let result = server.update_meeting_status(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::FailedPrecondition);

    // ...even back to scheduled
    let request = create_signed_request(
        &hr_id,
        &hr_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id,
            status: "scheduled".to_string(),
        },
    );
    let result = server.update_meeting_status(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::FailedPrecondition);
}

#[tokio::test]
async fn only_organizer_or_admin_may_change_status() {
    let server = create_test_server().await;
    let (admin_id, admin_key) = create_test_admin(&server, "root@example.com").await;
    let (hr_a, hr_a_key) = create_test_hr(&server, "hr-a@example.com", &admin_id).await;
    let (hr_b, hr_b_key) = create_test_hr(&server, "hr-b@example.com", &admin_id).await;
    let (emp_id, emp_key) = create_test_employee(&server, "alice@example.com", &hr_a).await;

    let request = create_signed_request(
        &hr_a,
        &hr_a_key,
        "/rota.RotaService/CreateMeeting",
        meeting_request("Standup", &[&emp_id]),
    );
    let meeting = server.create_meeting(request).await.unwrap().into_inner();

    // Another hr cannot
    let request = create_signed_request(
        &hr_b,
        &hr_b_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id.clone(),
            status: "cancelled".to_string(),
        },
    );
    let result = server.update_meeting_status(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::PermissionDenied);

    // An attendee employee cannot either; employees are read-only participants
    let request = create_signed_request(
        &emp_id,
        &emp_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id.clone(),
            status: "cancelled".to_string(),
        },
    );
    let result = server.update_meeting_status(request).await;
    assert_eq!(result.unwrap_err().code(), tonic::Code::PermissionDenied);

    // An admin can
    let request = create_signed_request(
        &admin_id,
        &admin_key,
        "/rota.RotaService/UpdateMeetingStatus",
        UpdateMeetingStatusRequest {
            meeting_id: meeting.id,
            status: "cancelled".to_string(),
        },
    );
    let updated = server
        .update_meeting_status(request)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(updated.status, "cancelled");
}
