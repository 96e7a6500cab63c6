//! Job ranking by derived impact.

use serde::Serialize;

use crate::Job;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedJob {
    /// 1-based.
    pub rank: usize,
    #[serde(flatten)]
    pub job: Job,
}

/// Order open jobs by `impact_value` (highest first).
///
/// Ties fall back to the manual `position`, then title, then id, so the
/// ranking is stable across calls. Done jobs are left out.
pub fn rank_jobs(jobs: impl IntoIterator<Item = Job>) -> Vec<RankedJob> {
    let mut open: Vec<Job> = jobs.into_iter().filter(|j| !j.is_done).collect();
    open.sort_by(|a, b| {
        b.impact_value
            .total_cmp(&a.impact_value)
            .then_with(|| a.position.cmp(&b.position))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });

    open.into_iter()
        .enumerate()
        .map(|(i, job)| RankedJob { rank: i + 1, job })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobDraft;
    use chrono::Utc;
    use impactline_core::TenantId;

    fn job(t: TenantId, title: &str, impact: f64, position: i64) -> Job {
        let draft = JobDraft {
            title: title.to_string(),
            position: Some(position),
            ..JobDraft::default()
        };
        let mut j = Job::create(t, draft, Utc::now()).unwrap();
        j.impact_value = impact;
        j
    }

    #[test]
    fn highest_impact_first_with_position_tiebreak() {
        let t = TenantId::new();
        let jobs = vec![
            job(t, "low", 1.0, 0),
            job(t, "tied-later", 20.0, 5),
            job(t, "negative", -3.0, 0),
            job(t, "tied-first", 20.0, 1),
        ];

        let titles: Vec<_> = rank_jobs(jobs).into_iter().map(|r| r.job.title).collect();
        assert_eq!(titles, ["tied-first", "tied-later", "low", "negative"]);
    }

    #[test]
    fn done_jobs_are_not_ranked() {
        let t = TenantId::new();
        let mut done = job(t, "done", 100.0, 0);
        done.is_done = true;

        let ranked = rank_jobs(vec![done, job(t, "open", 1.0, 0)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].job.title, "open");
    }
}
