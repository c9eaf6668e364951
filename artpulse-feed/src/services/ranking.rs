//! Feed ranking engine
//!
//! Pure scoring and selection over a retrieved candidate pool. The pipeline
//! is: quality filter -> score -> select top N -> (optional diversity pass)
//! -> shuffle. Scores decide feed *membership*; the final shuffle removes any
//! visible score ordering from the returned page.

use std::collections::HashMap;

use rand::seq::SliceRandom;

use artpulse_common::db::models::{ContentRow, ProfileRow};

/// Why an item made the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reasoning {
    Personalized,
    Trending,
    Exploration,
}

impl Reasoning {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reasoning::Personalized => "personalized",
            Reasoning::Trending => "trending",
            Reasoning::Exploration => "exploration",
        }
    }
}

/// A candidate with its final score and reasoning label
#[derive(Debug, Clone)]
pub struct ScoredContent {
    pub content: ContentRow,
    pub score: f64,
    pub reasoning: Reasoning,
}

/// Feed ranker with named weights and thresholds.
///
/// The component weights split the score 70/20/10 between exploitation
/// (preference match), exploration (retrieval position) and trending.
#[derive(Debug, Clone)]
pub struct FeedRanker {
    /// Weight of the personalized (exploitation) component
    pub personalization_weight: f64,
    /// Weight of the exploration component
    pub exploration_weight: f64,
    /// Weight of the trending component
    pub trending_weight: f64,

    /// Sub-weights inside the personalized component
    pub category_weight: f64,
    pub artist_weight: f64,
    pub style_weight: f64,

    /// Hit/miss values for each preference match term
    pub category_hit: f64,
    pub category_miss: f64,
    pub artist_hit: f64,
    pub artist_miss: f64,
    pub style_hit: f64,
    pub style_miss: f64,

    /// Multiplier applied on a time-of-day mood match
    pub context_boost: f64,

    /// Minimum dwell samples before the quality filter may judge an item
    pub min_dwell_samples: usize,
    /// Fraction of judged items dropped from the bottom (by mean dwell)
    pub low_dwell_drop_fraction: f64,

    /// Weighted personalized component above this labels the item `personalized`
    pub personalized_reason_threshold: f64,
    /// Weighted trending component above this labels the item `trending`
    pub trending_reason_threshold: f64,

    /// Diversity pass: maximum run of items sharing a content type
    pub max_consecutive_same_type: usize,
}

impl Default for FeedRanker {
    fn default() -> Self {
        Self {
            personalization_weight: 0.7,
            exploration_weight: 0.2,
            trending_weight: 0.1,
            category_weight: 0.4,
            artist_weight: 0.3,
            style_weight: 0.3,
            category_hit: 0.7,
            category_miss: 0.3,
            artist_hit: 0.8,
            artist_miss: 0.4,
            style_hit: 0.6,
            style_miss: 0.3,
            context_boost: 1.2,
            min_dwell_samples: 5,
            low_dwell_drop_fraction: 0.2,
            personalized_reason_threshold: 0.5,
            trending_reason_threshold: 0.05,
            max_consecutive_same_type: 2,
        }
    }
}

impl FeedRanker {
    /// Drop the worst-dwelling candidates.
    ///
    /// Only items with at least `min_dwell_samples` positive dwell samples are
    /// judged; the bottom `low_dwell_drop_fraction` of those (rounded up, by
    /// mean dwell ascending) are removed. Items with fewer samples carry
    /// insufficient evidence and always pass.
    pub fn apply_quality_filter(
        &self,
        candidates: Vec<ContentRow>,
        dwell_samples: &HashMap<String, Vec<i64>>,
    ) -> Vec<ContentRow> {
        let mut judged: Vec<(String, f64)> = dwell_samples
            .iter()
            .filter(|(_, samples)| samples.len() >= self.min_dwell_samples)
            .map(|(content_id, samples)| {
                let mean = samples.iter().sum::<i64>() as f64 / samples.len() as f64;
                (content_id.clone(), mean)
            })
            .collect();

        if judged.is_empty() {
            return candidates;
        }

        judged.sort_by(|a, b| a.1.total_cmp(&b.1));
        let drop_count = (judged.len() as f64 * self.low_dwell_drop_fraction).ceil() as usize;
        let dropped: Vec<&String> = judged.iter().take(drop_count).map(|(id, _)| id).collect();

        candidates
            .into_iter()
            .filter(|item| !dropped.iter().any(|id| **id == item.content_id))
            .collect()
    }

    /// Score every candidate against the profile and request context.
    ///
    /// `index` is the candidate's position in the (arbitrary) retrieval
    /// order; earlier retrieval earns a higher exploration component.
    pub fn score_candidates(
        &self,
        candidates: &[ContentRow],
        profile: Option<&ProfileRow>,
        context: &str,
        hour: u32,
    ) -> Vec<ScoredContent> {
        let pool_size = candidates.len();

        candidates
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let personalized = self.personalized_component(item, profile);
                let exploration =
                    (1.0 - index as f64 / pool_size as f64) * self.exploration_weight;
                let trending = item.trending_score * self.trending_weight;

                let multiplier = self.context_multiplier(item, context, hour);
                let score = ((personalized + exploration + trending) * multiplier).min(1.0);

                let reasoning = if personalized > self.personalized_reason_threshold {
                    Reasoning::Personalized
                } else if trending > self.trending_reason_threshold {
                    Reasoning::Trending
                } else {
                    Reasoning::Exploration
                };

                ScoredContent {
                    content: item.clone(),
                    score,
                    reasoning,
                }
            })
            .collect()
    }

    /// Weighted personalized component. Without a profile the item's own
    /// quality score stands in for preference match.
    fn personalized_component(&self, item: &ContentRow, profile: Option<&ProfileRow>) -> f64 {
        let Some(profile) = profile else {
            return item.quality_score * self.personalization_weight;
        };

        let tags = item.tag_list();
        let moods = item.mood_tag_list();

        let liked_categories = profile.liked_category_list();
        let category_match = if tags.iter().any(|t| liked_categories.contains(t)) {
            self.category_hit
        } else {
            self.category_miss
        };

        let artist_match = if item.content_type == "artwork"
            && item
                .artist_id()
                .map(|id| profile.liked_artist_list().contains(&id))
                .unwrap_or(false)
        {
            self.artist_hit
        } else {
            self.artist_miss
        };

        let liked_styles = profile.liked_style_list();
        let style_match = if liked_styles
            .iter()
            .any(|style| moods.contains(style) || tags.contains(style))
        {
            self.style_hit
        } else {
            self.style_miss
        };

        (category_match * self.category_weight
            + artist_match * self.artist_weight
            + style_match * self.style_weight)
            * self.personalization_weight
    }

    /// Time-of-day mood boost: morning favors inspiring/energetic content,
    /// evening favors peaceful/contemplative content.
    fn context_multiplier(&self, item: &ContentRow, context: &str, hour: u32) -> f64 {
        let moods = item.mood_tag_list();
        let has_mood = |wanted: &[&str]| moods.iter().any(|m| wanted.contains(&m.as_str()));

        if context == "morning" || (6..12).contains(&hour) {
            if has_mood(&["inspiring", "energetic"]) {
                return self.context_boost;
            }
        } else if context == "evening" || (18..24).contains(&hour) {
            if has_mood(&["peaceful", "contemplative"]) {
                return self.context_boost;
            }
        }
        1.0
    }

    /// Take the top `count` by score. Ties resolve by retrieval order.
    pub fn select(&self, mut scored: Vec<ScoredContent>, count: usize) -> Vec<ScoredContent> {
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(count);
        scored
    }

    /// Diversity pass: walk the score-ordered pool, skipping items that would
    /// extend a same-type run past the limit, until `count` items are taken.
    pub fn select_diverse(
        &self,
        mut scored: Vec<ScoredContent>,
        count: usize,
    ) -> Vec<ScoredContent> {
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut selected: Vec<ScoredContent> = Vec::with_capacity(count);
        let mut run_type: Option<String> = None;
        let mut run_length = 0usize;

        for item in scored {
            if selected.len() >= count {
                break;
            }
            if run_type.as_deref() == Some(item.content.content_type.as_str()) {
                if run_length >= self.max_consecutive_same_type {
                    continue;
                }
                run_length += 1;
            } else {
                run_type = Some(item.content.content_type.clone());
                run_length = 1;
            }
            selected.push(item);
        }

        selected
    }

    /// Uniform shuffle of the selected page (score decides membership, not
    /// display order).
    pub fn shuffle(&self, selected: &mut [ScoredContent]) {
        selected.shuffle(&mut rand::thread_rng());
    }
}
