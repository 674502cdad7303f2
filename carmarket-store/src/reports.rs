//! User reports and the fixed reason taxonomy.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use carmarket_shared::{AppError, AppResult, ErrorCode, Paginated, PaginationParams};

use crate::models::{ReasonCategory, Report, ReportReason, ReportStatus, ReportedType};
use crate::storage::{load_state, save_state, StateStorage, REPORTS_KEY};

pub const MAX_DESCRIPTION_LEN: usize = 500;

pub static REPORT_REASONS: [ReportReason; 7] = [
    ReportReason {
        id: "1",
        label: "Lừa đảo",
        description: "Người này có hành vi lừa đảo, không giao xe sau khi nhận tiền",
        category: ReasonCategory::Fraud,
    },
    ReportReason {
        id: "2",
        label: "Thông tin sai lệch",
        description: "Thông tin xe không đúng với thực tế",
        category: ReasonCategory::Content,
    },
    ReportReason {
        id: "3",
        label: "Giá cả không minh bạch",
        description: "Thay đổi giá bán sau khi thỏa thuận",
        category: ReasonCategory::Fraud,
    },
    ReportReason {
        id: "4",
        label: "Hành vi không phù hợp",
        description: "Có thái độ xấu, không tôn trọng khách hàng",
        category: ReasonCategory::Behavior,
    },
    ReportReason {
        id: "5",
        label: "Không phản hồi",
        description: "Không trả lời tin nhắn hoặc cuộc gọi sau khi liên hệ",
        category: ReasonCategory::Behavior,
    },
    ReportReason {
        id: "6",
        label: "Xe có vấn đề kỹ thuật",
        description: "Xe có lỗi kỹ thuật nhưng không thông báo trước",
        category: ReasonCategory::Content,
    },
    ReportReason {
        id: "7",
        label: "Khác",
        description: "Lý do khác (vui lòng mô tả chi tiết)",
        category: ReasonCategory::Other,
    },
];

#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub reported_id: Uuid,
    pub reported_type: ReportedType,
    pub reason: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportStats {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReportsState {
    reports: Vec<Report>,
}

#[derive(Clone)]
pub struct ReportsHolder {
    state: Arc<RwLock<ReportsState>>,
    storage: Arc<dyn StateStorage>,
}

impl ReportsHolder {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ReportsState::default())),
            storage,
        }
    }

    pub async fn hydrate(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        *state = load_state(self.storage.as_ref(), REPORTS_KEY)
            .await?
            .unwrap_or_default();
        tracing::debug!(count = state.reports.len(), "reports hydrated");
        Ok(())
    }

    pub fn get_report_reasons(&self) -> &'static [ReportReason] {
        &REPORT_REASONS
    }

    /// File a report. It always starts out `pending`.
    pub async fn submit_report(&self, reporter_id: Uuid, new: NewReport) -> AppResult<Report> {
        if !REPORT_REASONS.iter().any(|r| r.id == new.reason) {
            return Err(AppError::new(
                ErrorCode::UnknownReportReason,
                format!("unknown report reason '{}'", new.reason),
            ));
        }
        let description = new.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("description is required".into()));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if reporter_id == new.reported_id {
            return Err(AppError::new(ErrorCode::CannotReportSelf, "you cannot report yourself"));
        }

        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            reporter_id,
            reported_id: new.reported_id,
            reported_type: new.reported_type,
            reason: new.reason,
            description: description.to_string(),
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.reports.push(report.clone());
        save_state(self.storage.as_ref(), REPORTS_KEY, &next).await?;
        *state = next;

        tracing::info!(
            report_id = %report.id,
            reported_id = %report.reported_id,
            reason = %report.reason,
            "report submitted"
        );
        Ok(report)
    }

    /// Reports filed by `user_id`.
    pub async fn get_user_reports(&self, user_id: Uuid) -> Vec<Report> {
        self.filtered(|r| r.reporter_id == user_id).await
    }

    /// Reports filed against `user_id`.
    pub async fn get_reports_against_user(&self, user_id: Uuid) -> Vec<Report> {
        self.filtered(|r| r.reported_id == user_id).await
    }

    pub async fn update_report_status(&self, report_id: Uuid, status: ReportStatus) -> AppResult<Report> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let report = next
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ReportNotFound, format!("report {report_id} not found"))
            })?;
        let previous = report.status;
        report.status = status;
        report.updated_at = Utc::now();
        let updated = report.clone();

        save_state(self.storage.as_ref(), REPORTS_KEY, &next).await?;
        *state = next;

        tracing::info!(report_id = %report_id, from = ?previous, to = ?status, "report status changed");
        Ok(updated)
    }

    pub async fn get_report(&self, report_id: Uuid) -> AppResult<Report> {
        self.state
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, format!("report {report_id} not found")))
    }

    /// Back-office listing, newest first.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        params: &PaginationParams,
    ) -> Paginated<Report> {
        let mut reports = self
            .filtered(|r| status.map_or(true, |s| r.status == s))
            .await;
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        params.paginate(&reports)
    }

    pub async fn stats(&self) -> ReportStats {
        let state = self.state.read().await;
        let mut by_status = BTreeMap::new();
        for report in &state.reports {
            *by_status.entry(report.status.as_str()).or_insert(0) += 1;
        }
        ReportStats {
            total: state.reports.len(),
            by_status,
        }
    }

    async fn filtered(&self, pred: impl Fn(&Report) -> bool) -> Vec<Report> {
        self.state
            .read()
            .await
            .reports
            .iter()
            .filter(|r| pred(r))
            .cloned()
            .collect()
    }
}
