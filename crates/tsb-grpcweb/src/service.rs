use async_trait::async_trait;
use tracing::warn;
use tsb_core::{
    diff::ScheduleUpdate,
    domain::{ScheduleId, SnapshotId},
    errors::Error,
    ports::{ScheduleService, SubscribedSchedule},
    Result,
};

use crate::{
    client::GrpcWebClient,
    normalize::{normalize_diff, schedule_id_from_proto, schedule_id_to_proto},
    proto::{self, personal_schedule_updates::Outcome},
};

/// `PersonalScheduleService` over gRPC-Web.
pub struct GrpcScheduleService {
    client: GrpcWebClient,
}

impl GrpcScheduleService {
    pub fn new(client: GrpcWebClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScheduleService for GrpcScheduleService {
    async fn list_subscribed_schedules(&self) -> Result<Vec<SubscribedSchedule>> {
        let resp: proto::GetSubscribedSchedulesResponse = self
            .client
            .unary("GetSubscribedSchedules", &proto::GetSubscribedSchedulesRequest {})
            .await?;

        let mut out = Vec::with_capacity(resp.schedules.len());
        for s in resp.schedules {
            let Some(schedule_id) = s.schedule_id.as_ref().and_then(schedule_id_from_proto) else {
                warn!(title = %s.long_title, "skipping subscribed schedule with unknown id");
                continue;
            };
            out.push(SubscribedSchedule {
                schedule_id,
                title: s.long_title,
            });
        }
        Ok(out)
    }

    async fn get_updates(&self, schedule: &SubscribedSchedule) -> Result<Option<ScheduleUpdate>> {
        let req = proto::GetPersonalScheduleUpdatesRequest {
            schedule_id: Some(schedule_id_to_proto(&schedule.schedule_id)),
        };
        let resp: proto::GetPersonalScheduleUpdatesResponse = self
            .client
            .unary("GetPersonalScheduleUpdates", &req)
            .await?;

        Ok(match resp.outcome {
            Some(Outcome::Exists(diff)) => Some(normalize_diff(schedule, diff)),
            Some(Outcome::NotExists(_)) | None => None,
        })
    }

    async fn accept_updates(
        &self,
        schedule_id: &ScheduleId,
        snapshot_id: SnapshotId,
    ) -> Result<()> {
        let req = proto::AcceptScheduleUpdatesRequest {
            schedule_id: Some(schedule_id_to_proto(schedule_id)),
            snapshot_id: snapshot_id.0,
        };
        let _: proto::AcceptScheduleUpdatesResponse =
            self.client.unary("AcceptScheduleUpdates", &req).await?;
        Ok(())
    }

    async fn register_schedules(&self, page: &[ScheduleId]) -> Result<()> {
        let req = proto::UpdateSubscribedSchedulesRequest {
            schedule_id: page.iter().map(schedule_id_to_proto).collect(),
        };
        let resp: proto::UpdateSubscribedSchedulesResponse =
            self.client.unary("UpdateSubscribedSchedules", &req).await?;

        if resp.state == proto::UpdateSubscribedSchedulesState::Ok as i32 {
            Ok(())
        } else {
            Err(Error::External(format!(
                "registration rejected with state {}",
                resp.state
            )))
        }
    }

    async fn schedule_title(&self, schedule_id: &ScheduleId) -> Result<String> {
        let req = proto::GetScheduleTitleRequest {
            schedule_id: Some(schedule_id_to_proto(schedule_id)),
        };
        let resp: proto::GetScheduleTitleResponse =
            self.client.unary("GetScheduleTitle", &req).await?;
        Ok(resp.title)
    }
}
