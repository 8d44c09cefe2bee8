//! Price analytics over stored records.
//!
//! Every function here is pure: callers load rows from storage (newest
//! first, as the read contract returns them) and pass them in. See
//! [`crate::queries`] for the storage-backed wrappers.

use serde::Serialize;
use veglytics_shared::{DatedPrice, Market, MarketPrice, PriceRecord};

/// Market whose recent averages drive sell/hold advice.
pub const BENCHMARK_MARKET: Market = Market::Dambulla;

/// Day-over-day change beyond this percentage is a move.
const DAY_TREND_THRESHOLD: f64 = 2.0;

/// Oldest-to-newest change beyond this percentage is a weekly move.
const WEEK_TREND_THRESHOLD: f64 = 3.0;

/// Minimum averages for weekly trend and volatility.
const MIN_SERIES_POINTS: usize = 3;

/// Volatility percentages at or below these are low / medium risk.
const LOW_RISK_MAX: f64 = 5.0;
const MEDIUM_RISK_MAX: f64 = 12.0;

/// Spread thresholds for recommendation confidence.
const HIGH_CONFIDENCE_SPREAD: f64 = 50.0;
const MEDIUM_CONFIDENCE_SPREAD: f64 = 20.0;

/// Benchmark moves smaller than this are considered flat.
const STABLE_MOVE: f64 = 5.0;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

// ---------------------------------------------------------------------------
// Latest prices
// ---------------------------------------------------------------------------

/// Movement of one commodity since the previous bulletin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Same,
}

/// One row of a market price listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub commodity: String,
    pub raw_price: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_avg: Option<f64>,
    pub prev_avg: Option<f64>,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub direction: Direction,
}

/// Join a day's prices with the previous day's, sorted by commodity.
///
/// Change figures are only filled in when both averages exist and the
/// previous one is non-zero. `search` keeps commodities containing it,
/// ignoring case.
pub fn price_changes(
    today: &[MarketPrice],
    previous: &[MarketPrice],
    search: Option<&str>,
) -> Vec<PriceChange> {
    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut items: Vec<PriceChange> = today
        .iter()
        .filter(|p| {
            needle
                .as_deref()
                .is_none_or(|n| p.commodity.to_lowercase().contains(n))
        })
        .map(|p| {
            let prev_avg = previous
                .iter()
                .find(|q| q.commodity == p.commodity)
                .and_then(|q| q.price_avg);

            let (change, change_pct, direction) = match (p.price_avg, prev_avg) {
                (Some(avg), Some(prev)) if prev != 0.0 => {
                    let change = avg - prev;
                    let direction = if change > 0.0 {
                        Direction::Up
                    } else if change < 0.0 {
                        Direction::Down
                    } else {
                        Direction::Same
                    };
                    (Some(change), Some(change / prev * 100.0), direction)
                }
                _ => (None, None, Direction::Same),
            };

            PriceChange {
                commodity: p.commodity.clone(),
                raw_price: p.raw_price.clone(),
                price_min: p.price_min,
                price_max: p.price_max,
                price_avg: p.price_avg,
                prev_avg,
                change,
                change_pct,
                direction,
            }
        })
        .collect();

    items.sort_by(|a, b| a.commodity.cmp(&b.commodity));
    items
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

/// Direction of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    fn from_change(change_pct: f64, threshold: f64) -> Self {
        if change_pct > threshold {
            Self::Up
        } else if change_pct < -threshold {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

/// Latest average against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayOverDay {
    pub today: DatedPrice,
    pub yesterday: DatedPrice,
    pub change_percent: f64,
    pub trend: Trend,
}

/// Compare the two newest averages. `None` with fewer than two.
pub fn day_over_day(recent: &[DatedPrice]) -> Option<DayOverDay> {
    let [today, yesterday, ..] = recent else {
        return None;
    };
    let change = percent_change(yesterday.price_avg, today.price_avg);
    Some(DayOverDay {
        today: DatedPrice {
            date: today.date.clone(),
            price_avg: round2(today.price_avg),
        },
        yesterday: DatedPrice {
            date: yesterday.date.clone(),
            price_avg: round2(yesterday.price_avg),
        },
        change_percent: round2(change),
        trend: Trend::from_change(change, DAY_TREND_THRESHOLD),
    })
}

/// Summary of up to a week of averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekTrend {
    pub days: usize,
    pub average_price: f64,
    pub week_change_percent: f64,
    pub trend: Trend,
}

/// Mean and oldest-to-newest change. `None` with fewer than three points.
pub fn week_trend(recent: &[DatedPrice]) -> Option<WeekTrend> {
    if recent.len() < MIN_SERIES_POINTS {
        return None;
    }
    let newest = recent[0].price_avg;
    let oldest = recent[recent.len() - 1].price_avg;
    let change = percent_change(oldest, newest);
    Some(WeekTrend {
        days: recent.len(),
        average_price: round2(mean(recent)),
        week_change_percent: round2(change),
        trend: Trend::from_change(change, WEEK_TREND_THRESHOLD),
    })
}

/// One point of a price chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub price_avg: Option<f64>,
    pub raw_price: String,
}

/// Chart points, oldest first, from a newest-first history.
pub fn chart_points(history: &[PriceRecord]) -> Vec<TrendPoint> {
    history
        .iter()
        .rev()
        .map(|r| TrendPoint {
            date: r.date.clone(),
            price_avg: r.price_avg,
            raw_price: r.raw_price.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Volatility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volatility {
    pub average_price: f64,
    /// Coefficient of variation, in percent.
    pub volatility_percent: f64,
    pub risk_level: RiskLevel,
    pub days_used: usize,
}

/// Coefficient of variation of the averages. `None` with fewer than three.
pub fn volatility(recent: &[DatedPrice]) -> Option<Volatility> {
    if recent.len() < MIN_SERIES_POINTS {
        return None;
    }
    let avg = mean(recent);
    let variance = recent
        .iter()
        .map(|p| (p.price_avg - avg).powi(2))
        .sum::<f64>()
        / (recent.len() - 1) as f64;
    let pct = if avg == 0.0 {
        0.0
    } else {
        round2(variance.sqrt() / avg * 100.0)
    };

    let risk_level = if pct <= LOW_RISK_MAX {
        RiskLevel::Low
    } else if pct <= MEDIUM_RISK_MAX {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    Some(Volatility {
        average_price: round2(avg),
        volatility_percent: pct,
        risk_level,
        days_used: recent.len(),
    })
}

fn mean(points: &[DatedPrice]) -> f64 {
    points.iter().map(|p| p.price_avg).sum::<f64>() / points.len() as f64
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// One market's quote for a commodity; `None` fields when not reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketQuote {
    pub market: Market,
    pub raw_price: Option<String>,
    pub price_avg: Option<f64>,
}

impl MarketQuote {
    /// Quote from a stored record, or an empty quote when there is none.
    pub fn from_record(market: Market, record: Option<&PriceRecord>) -> Self {
        Self {
            market,
            raw_price: record.map(|r| r.raw_price.clone()),
            price_avg: record.and_then(|r| r.price_avg),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// When to sell, judged from the benchmark market's recent averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Advice {
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "SELL NOW")]
    SellNow,
    #[serde(rename = "SELL OR WAIT")]
    SellOrWait,
    #[serde(rename = "WATCH")]
    Watch,
    #[serde(rename = "HOLD")]
    Hold,
}

impl Advice {
    pub fn label(self) -> &'static str {
        match self {
            Self::Wait => "WAIT",
            Self::SellNow => "SELL NOW",
            Self::SellOrWait => "SELL OR WAIT",
            Self::Watch => "WATCH",
            Self::Hold => "HOLD",
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Wait => "Price is rising steadily. Wait 1-2 days.",
            Self::SellNow => "Price is dropping. Sell before it falls further.",
            Self::SellOrWait => "Market is stable. Safe to sell.",
            Self::Watch => "Market is volatile.",
            Self::Hold => "Insufficient trend data",
        }
    }
}

impl std::fmt::Display for Advice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAverage {
    pub market: Market,
    pub price_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub best_market: Market,
    pub best_price: f64,
    pub worst_market: Market,
    pub worst_price: f64,
    pub price_difference: f64,
    pub confidence: Confidence,
    pub markets_checked: usize,
    /// Markets by descending average.
    pub all_markets: Vec<MarketAverage>,
    pub advice: Advice,
    pub advice_reason: String,
}

/// Advice from the benchmark's newest-first averages.
///
/// Uses the three newest points: a rise into the latest means wait, a fall
/// means sell now, a move under [`STABLE_MOVE`] means either is fine.
pub fn advise(benchmark: &[DatedPrice]) -> Advice {
    let [p0, p1, p2, ..] = benchmark else {
        return Advice::Hold;
    };
    let (p0, p1, p2) = (p0.price_avg, p1.price_avg, p2.price_avg);
    if p0 > p1 && p1 >= p2 {
        Advice::Wait
    } else if p0 < p1 && p1 <= p2 {
        Advice::SellNow
    } else if (p0 - p1).abs() < STABLE_MOVE {
        Advice::SellOrWait
    } else {
        Advice::Watch
    }
}

/// Pick the best market to sell in today and whether to sell now.
///
/// `today` holds the commodity's records on its latest date; records without
/// an average are ignored. `None` with fewer than two priced markets.
pub fn recommend(today: &[PriceRecord], benchmark: &[DatedPrice]) -> Option<Recommendation> {
    let mut markets: Vec<MarketAverage> = today
        .iter()
        .filter_map(|r| {
            r.price_avg.map(|price_avg| MarketAverage {
                market: r.market,
                price_avg,
            })
        })
        .collect();
    if markets.len() < 2 {
        return None;
    }
    markets.sort_by(|a, b| b.price_avg.total_cmp(&a.price_avg));

    let best = &markets[0];
    let worst = &markets[markets.len() - 1];
    let spread = best.price_avg - worst.price_avg;

    let confidence = if markets.len() >= 3 && spread >= HIGH_CONFIDENCE_SPREAD {
        Confidence::High
    } else if spread >= MEDIUM_CONFIDENCE_SPREAD {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let advice = advise(benchmark);
    Some(Recommendation {
        best_market: best.market,
        best_price: round2(best.price_avg),
        worst_market: worst.market,
        worst_price: round2(worst.price_avg),
        price_difference: round2(spread),
        confidence,
        markets_checked: markets.len(),
        all_markets: markets
            .iter()
            .map(|m| MarketAverage {
                market: m.market,
                price_avg: round2(m.price_avg),
            })
            .collect(),
        advice,
        advice_reason: advice.reason().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veglytics_shared::PriceRange;

    fn series(avgs: &[f64]) -> Vec<DatedPrice> {
        avgs.iter()
            .enumerate()
            .map(|(i, a)| DatedPrice {
                date: format!("{:02}-01-2026", 20 - i),
                price_avg: *a,
            })
            .collect()
    }

    fn listing(commodity: &str, avg: Option<f64>) -> MarketPrice {
        MarketPrice {
            commodity: commodity.into(),
            raw_price: avg.map(|a| a.to_string()),
            price_min: avg,
            price_max: avg,
            price_avg: avg,
        }
    }

    fn quote(market: Market, avg: f64) -> PriceRecord {
        PriceRecord::new("20-01-2026", "Tomato", market, avg.to_string(), PriceRange::single(avg))
    }

    #[test]
    fn price_changes_join_and_sort() {
        let today = vec![
            listing("Tomato", Some(220.0)),
            listing("Beans", Some(380.0)),
            listing("Carrot", Some(300.0)),
            listing("Leeks", None),
            listing("Radish", Some(90.0)),
        ];
        let previous = vec![
            listing("Tomato", Some(200.0)),
            listing("Beans", Some(400.0)),
            listing("Carrot", Some(300.0)),
            listing("Leeks", Some(150.0)),
            listing("Radish", Some(0.0)),
        ];
        let items = price_changes(&today, &previous, None);
        let names: Vec<&str> = items.iter().map(|i| i.commodity.as_str()).collect();
        assert_eq!(names, vec!["Beans", "Carrot", "Leeks", "Radish", "Tomato"]);

        assert_eq!(items[0].direction, Direction::Down);
        assert_eq!(items[0].change, Some(-20.0));
        assert_eq!(items[1].direction, Direction::Same);
        assert_eq!(items[1].change, Some(0.0));
        // Missing today / zero previous: no change figures.
        assert_eq!(items[2].change, None);
        assert_eq!(items[2].prev_avg, Some(150.0));
        assert_eq!(items[3].change_pct, None);
        assert_eq!(items[4].change_pct, Some(10.0));
        assert_eq!(items[4].direction, Direction::Up);
    }

    #[test]
    fn price_changes_search_ignores_case() {
        let today = vec![listing("Green Chillies", Some(600.0)), listing("Beans", Some(1.0))];
        let items = price_changes(&today, &[], Some("chILL"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].prev_avg, None);
        assert_eq!(price_changes(&today, &[], Some("  ")).len(), 2);
    }

    #[test]
    fn day_over_day_thresholds() {
        assert!(day_over_day(&series(&[100.0])).is_none());

        let up = day_over_day(&series(&[103.0, 100.0])).unwrap();
        assert_eq!(up.trend, Trend::Up);
        assert_eq!(up.change_percent, 3.0);
        assert_eq!(up.today.date, "20-01-2026");
        assert_eq!(up.yesterday.date, "19-01-2026");

        assert_eq!(day_over_day(&series(&[101.0, 100.0])).unwrap().trend, Trend::Stable);
        assert_eq!(day_over_day(&series(&[97.0, 100.0])).unwrap().trend, Trend::Down);

        let from_zero = day_over_day(&series(&[50.0, 0.0])).unwrap();
        assert_eq!(from_zero.change_percent, 0.0);
        assert_eq!(from_zero.trend, Trend::Stable);
    }

    #[test]
    fn week_trend_uses_oldest_and_newest() {
        assert!(week_trend(&series(&[110.0, 100.0])).is_none());

        let t = week_trend(&series(&[110.0, 90.0, 100.0])).unwrap();
        assert_eq!(t.days, 3);
        assert_eq!(t.average_price, 100.0);
        assert_eq!(t.week_change_percent, 10.0);
        assert_eq!(t.trend, Trend::Up);

        assert_eq!(
            week_trend(&series(&[96.0, 120.0, 80.0, 100.0])).unwrap().trend,
            Trend::Down
        );
        assert_eq!(
            week_trend(&series(&[102.0, 200.0, 100.0])).unwrap().trend,
            Trend::Stable
        );
    }

    #[test]
    fn volatility_levels() {
        assert!(volatility(&series(&[100.0, 100.0])).is_none());

        let flat = volatility(&series(&[100.0, 100.0, 100.0])).unwrap();
        assert_eq!(flat.volatility_percent, 0.0);
        assert_eq!(flat.risk_level, RiskLevel::Low);

        // mean 100, sample stdev 10
        let medium = volatility(&series(&[90.0, 100.0, 110.0])).unwrap();
        assert_eq!(medium.volatility_percent, 10.0);
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert_eq!(medium.days_used, 3);

        let high = volatility(&series(&[50.0, 100.0, 150.0])).unwrap();
        assert_eq!(high.volatility_percent, 50.0);
        assert_eq!(high.risk_level, RiskLevel::High);
    }

    #[test]
    fn chart_points_oldest_first() {
        let history = vec![quote(Market::Dambulla, 120.0), {
            let mut r = quote(Market::Dambulla, 100.0);
            r.date = "19-01-2026".into();
            r
        }];
        let points = chart_points(&history);
        assert_eq!(points[0].date, "19-01-2026");
        assert_eq!(points[1].price_avg, Some(120.0));
    }

    #[test]
    fn advice_from_benchmark() {
        assert_eq!(advise(&series(&[100.0, 90.0])), Advice::Hold);
        assert_eq!(advise(&series(&[110.0, 100.0, 100.0])), Advice::Wait);
        assert_eq!(advise(&series(&[90.0, 100.0, 100.0])), Advice::SellNow);
        assert_eq!(advise(&series(&[102.0, 100.0, 120.0])), Advice::SellOrWait);
        assert_eq!(advise(&series(&[130.0, 100.0, 120.0])), Advice::Watch);
        assert_eq!(Advice::SellNow.to_string(), "SELL NOW");
    }

    #[test]
    fn recommendation_confidence() {
        let three = vec![
            quote(Market::Colombo, 200.0),
            quote(Market::Dambulla, 140.0),
            quote(Market::NuwaraEliya, 180.0),
        ];
        let rec = recommend(&three, &series(&[140.0, 130.0, 120.0])).unwrap();
        assert_eq!(rec.best_market, Market::Colombo);
        assert_eq!(rec.worst_market, Market::Dambulla);
        assert_eq!(rec.price_difference, 60.0);
        assert_eq!(rec.confidence, Confidence::High);
        assert_eq!(rec.markets_checked, 3);
        assert_eq!(rec.all_markets[1].market, Market::NuwaraEliya);
        assert_eq!(rec.advice, Advice::Wait);
        assert_eq!(rec.advice_reason, Advice::Wait.reason());

        let two = vec![quote(Market::Colombo, 200.0), quote(Market::Dambulla, 140.0)];
        assert_eq!(recommend(&two, &[]).unwrap().confidence, Confidence::Medium);
        assert_eq!(recommend(&two, &[]).unwrap().advice, Advice::Hold);

        let close = vec![quote(Market::Colombo, 150.0), quote(Market::Dambulla, 140.0)];
        assert_eq!(recommend(&close, &[]).unwrap().confidence, Confidence::Low);
    }

    #[test]
    fn recommendation_needs_two_priced_markets() {
        let mut unpriced = quote(Market::Dambulla, 0.0);
        unpriced.price_avg = None;
        assert!(recommend(&[quote(Market::Colombo, 200.0), unpriced], &[]).is_none());
        assert!(recommend(&[], &[]).is_none());
    }
}
