//! Page scoring: ranks bulletin pages by how likely they are to hold the
//! vegetable price table.

use veglytics_shared::ScoredPage;

/// A weighted signal: scores `weight` once if any of its phrases occurs.
#[derive(Debug, Clone, Copy)]
pub struct Signal {
    pub any_of: &'static [&'static str],
    pub weight: u32,
}

/// Keyword tables for one document family. All phrases are lowercase.
#[derive(Debug, Clone, Copy)]
pub struct ScoringTable {
    /// Strong signals, each with its own weight.
    pub signals: &'static [Signal],
    /// Commodity keywords, each worth `keyword_weight` once.
    pub keywords: &'static [&'static str],
    pub keyword_weight: u32,
}

/// Scoring table for the daily food commodities bulletin.
pub const BULLETIN_SCORING: ScoringTable = ScoringTable {
    signals: &[
        Signal {
            any_of: &["variety"],
            weight: 5,
        },
        Signal {
            any_of: &["peliyagoda"],
            weight: 8,
        },
        Signal {
            any_of: &["dambulla"],
            weight: 8,
        },
        Signal {
            any_of: &["nuwara"],
            weight: 6,
        },
        Signal {
            any_of: &["nuwaraeliya", "nuwara eliya"],
            weight: 8,
        },
    ],
    keywords: &[
        "carrot", "beans", "leeks", "cabbage", "brinjal", "tomato", "pumpkin", "lime", "chilli",
        "okra", "beet", "capsicum", "banana", "cucumber", "radish", "green", "ladies", "bitter",
    ],
    keyword_weight: 2,
};

/// Score one page's text. Blank text scores 0.
pub fn score_page(text: &str, table: &ScoringTable) -> u32 {
    if text.trim().is_empty() {
        return 0;
    }
    let haystack = text.to_lowercase();

    let signals: u32 = table
        .signals
        .iter()
        .filter(|s| s.any_of.iter().any(|phrase| haystack.contains(phrase)))
        .map(|s| s.weight)
        .sum();

    let keywords = table
        .keywords
        .iter()
        .filter(|k| haystack.contains(*k))
        .count() as u32;

    signals + keywords * table.keyword_weight
}

/// Pick up to `top_k` pages with a positive score, best first.
///
/// Equal scores keep their page order. An empty result means nothing looked
/// like a price page and the caller should scan every page.
pub fn select_pages(scores: &[ScoredPage], top_k: usize) -> Vec<ScoredPage> {
    let mut ranked: Vec<ScoredPage> = scores.iter().copied().filter(|s| s.score > 0).collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(scores: &[u32]) -> Vec<ScoredPage> {
        scores
            .iter()
            .enumerate()
            .map(|(page_index, &score)| ScoredPage { page_index, score })
            .collect()
    }

    #[test]
    fn market_page_outscores_plain_page() {
        let market = score_page("Dambulla tomato carrot beans", &BULLETIN_SCORING);
        let plain = score_page("Rice and coconut prices remained steady", &BULLETIN_SCORING);
        assert_eq!(market, 8 + 3 * 2);
        assert!(market > plain);
    }

    #[test]
    fn nuwara_eliya_counts_both_signals() {
        assert_eq!(score_page("NUWARA ELIYA", &BULLETIN_SCORING), 6 + 8);
        assert_eq!(score_page("NuwaraEliya", &BULLETIN_SCORING), 6 + 8);
        assert_eq!(score_page("Nuwara", &BULLETIN_SCORING), 6);
    }

    #[test]
    fn keywords_count_once() {
        let once = score_page("tomato", &BULLETIN_SCORING);
        let many = score_page("tomato tomato TOMATO", &BULLETIN_SCORING);
        assert_eq!(once, 2);
        assert_eq!(once, many);
    }

    #[test]
    fn full_price_page() {
        let text = "Variety Peliyagoda Dambulla Nuwara Eliya\nCarrot Beans Leeks Cabbage";
        assert_eq!(score_page(text, &BULLETIN_SCORING), 5 + 8 + 8 + 6 + 8 + 4 * 2);
    }

    #[test]
    fn blank_page_scores_zero() {
        assert_eq!(score_page("", &BULLETIN_SCORING), 0);
        assert_eq!(score_page("  \n\t ", &BULLETIN_SCORING), 0);
    }

    #[test]
    fn select_top_k_descending() {
        let picked = select_pages(&scored(&[3, 40, 0, 22, 40]), 2);
        assert_eq!(
            picked.iter().map(|p| p.page_index).collect::<Vec<_>>(),
            vec![1, 4]
        );
    }

    #[test]
    fn select_skips_zero_scores() {
        assert!(select_pages(&scored(&[0, 0, 0]), 2).is_empty());
        let picked = select_pages(&scored(&[0, 7, 0]), 2);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].page_index, 1);
    }
}
