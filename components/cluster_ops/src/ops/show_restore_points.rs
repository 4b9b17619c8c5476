use super::initiator;
use crate::context::ExecContext;
use crate::error::Result;
use crate::op::{ClusterOp, OpBase};
use crate::request::{HostRequest, HttpMethod};
use cluster_primitives::RestorePoint;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
struct ShowRestorePointsRequest {
    db_name: String,
    communal_location: String,
    parameters: BTreeMap<String, String>,
}

/// Lists every restore point in communal storage, across all archives
pub struct NMAShowRestorePointsOp {
    base: OpBase,
    request: ShowRestorePointsRequest,
}

impl NMAShowRestorePointsOp {
    pub fn new(
        hosts: &[String],
        db_name: impl Into<String>,
        communal_location: impl Into<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base: OpBase::new("NMAShowRestorePointsOp", "List restore points", initiator(hosts)),
            request: ShowRestorePointsRequest {
                db_name: db_name.into(),
                communal_location: communal_location.into(),
                parameters,
            },
        }
    }
}

impl ClusterOp for NMAShowRestorePointsOp {
    fn base(&self) -> &OpBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OpBase {
        &mut self.base
    }

    fn prepare(&mut self, _ctx: &mut ExecContext) -> Result<()> {
        let request = HostRequest::agent(HttpMethod::Post, "v1/restore-points");
        let request = self.base.json_request(request, &self.request)?;
        self.base.set_request_for_all(request);
        Ok(())
    }

    fn process_result(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let mut found = Vec::new();

        self.base.collect_results(|_, result| {
            let points: Vec<RestorePoint> = result.decode()?;
            found.extend(points);
            Ok(())
        })?;

        info!("[{}] found {} restore points", self.base.name(), found.len());
        ctx.restore_points = Some(found);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpError;
    use crate::testing::{context_over, hosts, run_op, FakeTransport, Reply};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    const PATH: &str = "v1/restore-points";

    #[tokio::test]
    async fn lists_points_from_the_initiator() {
        let body = r#"[
            {"archive": "nightly", "index": 1, "id": "a1", "timestamp": "2023-10-01 00:00:00"},
            {"archive": "nightly", "index": 2, "id": "b2"},
            {"archive": "weekly", "index": 1, "id": "c3"}
        ]"#;
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(body)));
        let mut ctx = context_over(&fake);
        let mut op = NMAShowRestorePointsOp::new(
            &hosts(&["10.0.0.1", "10.0.0.2"]),
            "test_db",
            "s3://bucket/db",
            BTreeMap::new(),
        );

        run_op(&mut op, &mut ctx).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "10.0.0.1");
        assert_eq!(calls[0].json_body()["communal_location"], "s3://bucket/db");

        let points = ctx.restore_points.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], RestorePoint::new("nightly", 2, "b2"));
    }

    #[tokio::test]
    async fn malformed_listing_fails() {
        let fake = Arc::new(FakeTransport::new().on(PATH, Reply::json(r#"{"oops": true}"#)));
        let mut ctx = context_over(&fake);
        let mut op = NMAShowRestorePointsOp::new(&hosts(&["10.0.0.1"]), "test_db", "/communal", BTreeMap::new());

        let err = run_op(&mut op, &mut ctx).await.unwrap_err();

        assert_matches!(err, OpError::Hosts(_));
        assert!(ctx.restore_points.is_none());
    }
}
