/// `POST /quick-review` success body.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct QuickReviewBody {
    #[serde(default)]
    pub points: Vec<String>,
}

/// `GET /` health check body.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthBody {
    pub status: String,
}

impl HealthBody {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
