use serde::Serialize;

use super::insight::{metric, Insight};
use super::post::Post;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricTotals {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub quotes: u64,
}

impl MetricTotals {
    /// Saturates: the counts come from the remote and are not trusted to stay small.
    fn add(&mut self, other: &MetricTotals) {
        self.views = self.views.saturating_add(other.views);
        self.likes = self.likes.saturating_add(other.likes);
        self.comments = self.comments.saturating_add(other.comments);
        self.quotes = self.quotes.saturating_add(other.quotes);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithInsights {
    pub post: Post,
    pub insights: Vec<Insight>,
    pub totals: MetricTotals,
}

impl PostWithInsights {
    /// `insights` is `None` when the per-post call failed; the post still counts,
    /// with only its own like count to go on.
    pub fn new(post: Post, insights: Option<Vec<Insight>>) -> Self {
        let insights = insights.unwrap_or_default();
        let own_likes = post.like_count.filter(|n| *n > 0);
        let totals = MetricTotals {
            views: metric(&insights, "views").unwrap_or(0),
            likes: metric(&insights, "likes").or(own_likes).unwrap_or(0),
            comments: metric(&insights, "comments").unwrap_or(0),
            quotes: metric(&insights, "quotes").unwrap_or(0),
        };
        Self {
            post,
            insights,
            totals,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub posts: usize,
    pub totals: MetricTotals,
    pub averages: MetricTotals,
}

/// Aggregate over one fetched page of posts. Nothing crosses page boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub posts: Vec<PostWithInsights>,
    pub summary: AnalyticsSummary,
}

impl AnalyticsReport {
    pub fn build(posts: Vec<PostWithInsights>) -> Self {
        let mut totals = MetricTotals::default();
        for p in &posts {
            totals.add(&p.totals);
        }

        let n = posts.len();
        let avg = |sum: u64| -> u64 {
            if n == 0 {
                0
            } else {
                (sum as f64 / n as f64).round() as u64
            }
        };
        let averages = MetricTotals {
            views: avg(totals.views),
            likes: avg(totals.likes),
            comments: avg(totals.comments),
            quotes: avg(totals.quotes),
        };

        Self {
            posts,
            summary: AnalyticsSummary {
                posts: n,
                totals,
                averages,
            },
        }
    }
}
