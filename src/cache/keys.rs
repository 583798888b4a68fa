//! Key Conventions
//!
//! Names for common data categories. The cache does not enforce these; they
//! keep related keys sharing a prefix so they can be invalidated together.

pub const AIRPORTS: &str = "airports";
pub const CITIES: &str = "cities";
pub const USER_PREFERENCES: &str = "user_preferences";
pub const RECENT_SEARCHES: &str = "recent_searches";
pub const FLIGHT_RESULTS: &str = "flight_results_";
pub const HOTEL_RESULTS: &str = "hotel_results_";
pub const EXCHANGE_RATES: &str = "exchange_rates";

/// Key for one flight search result set.
pub fn flight_results(search_id: &str) -> String {
    format!("{FLIGHT_RESULTS}{search_id}")
}

/// Key for one hotel search result set.
pub fn hotel_results(search_id: &str) -> String {
    format!("{HOTEL_RESULTS}{search_id}")
}
