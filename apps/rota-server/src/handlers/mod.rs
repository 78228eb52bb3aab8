//! Handler modules for gRPC service implementation
//!
//! This module contains handler functions organized by domain:
//! - users: provisioning (admin → hr → employee) and scoped directory reads
//! - attendance: mark pipeline, scoped listing, today's view, markable subjects
//! - meetings: scheduling, scoped listing, status transitions
//! - audit: audit log queries

pub mod attendance;
pub mod audit;
pub mod meetings;
pub mod users;

use tonic::{Request, Response, Status};

use crate::server::RotaServer;
use rota_proto::rota_service_server::RotaService;
use rota_proto::*;

#[tonic::async_trait]
impl RotaService for RotaServer {
    // ───────────────────────────────────── Users ─────────────────────────────────────

    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<User>, Status> {
        users::create_user(self, request).await
    }

    async fn get_user(&self, request: Request<GetUserRequest>) -> Result<Response<User>, Status> {
        users::get_user(self, request).await
    }

    async fn list_users(&self, request: Request<Empty>) -> Result<Response<UserList>, Status> {
        users::list_users(self, request).await
    }

    // ───────────────────────────────────── Attendance ─────────────────────────────────────

    async fn mark_attendance(
        &self,
        request: Request<MarkAttendanceRequest>,
    ) -> Result<Response<AttendanceRecord>, Status> {
        attendance::mark_attendance(self, request).await
    }

    async fn list_attendance(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<AttendanceList>, Status> {
        attendance::list_attendance(self, request).await
    }

    async fn list_today_attendance(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<AttendanceList>, Status> {
        attendance::list_today_attendance(self, request).await
    }

    async fn list_markable_subjects(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<UserList>, Status> {
        attendance::list_markable_subjects(self, request).await
    }

    // ───────────────────────────────────── Meetings ─────────────────────────────────────

    async fn create_meeting(
        &self,
        request: Request<CreateMeetingRequest>,
    ) -> Result<Response<Meeting>, Status> {
        meetings::create_meeting(self, request).await
    }

    async fn list_meetings(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<MeetingList>, Status> {
        meetings::list_meetings(self, request).await
    }

    async fn update_meeting_status(
        &self,
        request: Request<UpdateMeetingStatusRequest>,
    ) -> Result<Response<Meeting>, Status> {
        meetings::update_meeting_status(self, request).await
    }

    // ───────────────────────────────────── Audit Logs ─────────────────────────────────────

    async fn list_audit_logs(
        &self,
        request: Request<ListAuditLogsRequest>,
    ) -> Result<Response<AuditLogList>, Status> {
        audit::list_audit_logs(self, request).await
    }
}
