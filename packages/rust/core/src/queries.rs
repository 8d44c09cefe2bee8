//! Storage-backed analytics: load rows through the read contract and hand
//! them to [`crate::analytics`].

use serde::Serialize;
use veglytics_shared::{Market, Result};
use veglytics_storage::Storage;

use crate::analytics::{
    self, BENCHMARK_MARKET, DayOverDay, MarketQuote, PriceChange, Recommendation, TrendPoint,
    Volatility, WeekTrend,
};
use crate::pipeline::normalize_bulletin_date;

/// Number of dates listed by `dates` and used for weekly figures.
pub const RECENT_DAYS: u32 = 7;

/// Benchmark points considered for sell/hold advice.
const ADVICE_POINTS: u32 = 5;

/// An analytics result for one commodity; `result` is `None` when there is
/// not enough data.
#[derive(Debug, Clone, Serialize)]
pub struct CommodityReport<T> {
    pub commodity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Market>,
    #[serde(flatten)]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T> CommodityReport<T> {
    fn new(commodity: &str, market: Option<Market>, result: Option<T>, missing: &'static str) -> Self {
        let message = result.is_none().then_some(missing);
        Self {
            commodity: commodity.to_string(),
            market,
            result,
            message,
        }
    }
}

/// A market's price listing with changes since the previous bulletin.
#[derive(Debug, Clone, Serialize)]
pub struct MarketListing {
    pub date: Option<String>,
    pub prev_date: Option<String>,
    pub market: Market,
    pub items: Vec<PriceChange>,
}

/// Prices in `market` on `date` (latest when `None`) against the previous
/// stored date. `date` may omit zero padding; a malformed date is an error.
pub async fn market_listing(
    storage: &Storage,
    market: Market,
    date: Option<&str>,
    search: Option<&str>,
) -> Result<MarketListing> {
    let target = match date {
        Some(d) => Some(normalize_bulletin_date(d)?),
        None => storage.latest_dates(1).await?.into_iter().next(),
    };
    let Some(target) = target else {
        return Ok(MarketListing {
            date: None,
            prev_date: None,
            market,
            items: Vec::new(),
        });
    };

    let prev_date = storage.previous_date(&target).await?;
    let today = storage.prices_for_market_on(market, &target).await?;
    let previous = match &prev_date {
        Some(prev) => storage.prices_for_market_on(market, prev).await?,
        None => Vec::new(),
    };

    Ok(MarketListing {
        items: analytics::price_changes(&today, &previous, search),
        date: Some(target),
        prev_date,
        market,
    })
}

/// Day-over-day change of the two newest averages.
pub async fn analyze(
    storage: &Storage,
    commodity: &str,
    market: Market,
) -> Result<CommodityReport<DayOverDay>> {
    let recent = storage.recent_averages(commodity, market, 2).await?;
    Ok(CommodityReport::new(
        commodity,
        Some(market),
        analytics::day_over_day(&recent),
        "Not enough data (need at least 2 days)",
    ))
}

/// Weekly trend over the newest seven averages.
pub async fn week_trend(
    storage: &Storage,
    commodity: &str,
    market: Market,
) -> Result<CommodityReport<WeekTrend>> {
    let recent = storage
        .recent_averages(commodity, market, RECENT_DAYS)
        .await?;
    Ok(CommodityReport::new(
        commodity,
        Some(market),
        analytics::week_trend(&recent),
        "Not enough data for 7-day trend",
    ))
}

/// Volatility over the newest seven averages.
pub async fn volatility(
    storage: &Storage,
    commodity: &str,
    market: Market,
) -> Result<CommodityReport<Volatility>> {
    let recent = storage
        .recent_averages(commodity, market, RECENT_DAYS)
        .await?;
    Ok(CommodityReport::new(
        commodity,
        Some(market),
        analytics::volatility(&recent),
        "Not enough data for volatility",
    ))
}

/// Chart points for the last `days` records, oldest first.
pub async fn trend_points(
    storage: &Storage,
    commodity: &str,
    market: Market,
    days: u32,
) -> Result<Vec<TrendPoint>> {
    let history = storage.price_history(commodity, market, days).await?;
    Ok(analytics::chart_points(&history))
}

/// Quotes for one commodity across markets on the latest stored date.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub date: Option<String>,
    pub commodity: String,
    pub markets: Vec<MarketQuote>,
}

pub async fn compare(storage: &Storage, commodity: &str, markets: &[Market]) -> Result<Comparison> {
    let Some(latest) = storage.latest_dates(1).await?.into_iter().next() else {
        return Ok(Comparison {
            date: None,
            commodity: commodity.to_string(),
            markets: Vec::new(),
        });
    };

    let mut quotes = Vec::with_capacity(markets.len());
    for &market in markets {
        let record = storage.price_on(&latest, commodity, market).await?;
        quotes.push(MarketQuote::from_record(market, record.as_ref()));
    }

    Ok(Comparison {
        date: Some(latest),
        commodity: commodity.to_string(),
        markets: quotes,
    })
}

/// Best market today plus sell/hold advice from the benchmark market.
pub async fn recommend(storage: &Storage, commodity: &str) -> Result<CommodityReport<Recommendation>> {
    let today = storage.latest_prices_by_market(commodity).await?;
    let benchmark = storage
        .recent_averages(commodity, BENCHMARK_MARKET, ADVICE_POINTS)
        .await?;
    Ok(CommodityReport::new(
        commodity,
        None,
        analytics::recommend(&today, &benchmark),
        "Not enough data",
    ))
}
