use crate::domain::stats::{DomainStats, RecentActivity};
use chrono::{Local, NaiveDate};

/// Surface the most recently evaluated domain and how many domains were
/// evaluated on `today` (local calendar date).
///
/// Ties on the timestamp go to the first domain in traversal order.
pub fn resolve_recent_activity<'a, I>(domains: I, today: NaiveDate) -> RecentActivity
where
    I: IntoIterator<Item = &'a DomainStats>,
{
    let mut latest: Option<&DomainStats> = None;
    let mut evaluations_today = 0;

    for domain in domains {
        let Some(date) = domain.last_evaluation_date else {
            continue;
        };

        if date.with_timezone(&Local).date_naive() == today {
            evaluations_today += 1;
        }

        let newer = latest
            .and_then(|d| d.last_evaluation_date)
            .map_or(true, |current| date > current);
        if newer {
            latest = Some(domain);
        }
    }

    RecentActivity {
        last_evaluated_domain_name: latest.map(|d| d.domain_name.clone()),
        last_evaluation_date: latest.and_then(|d| d.last_evaluation_date),
        evaluations_today,
    }
}
