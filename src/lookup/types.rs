use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Response of the snap endpoint. An empty `result_entries` means no match.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEventsResponse {
    #[serde(default)]
    pub result_entries: Vec<SportEventResultEntry>,
}

impl SportEventsResponse {
    /// Best-ranked match, if any
    pub fn into_top_match(self) -> Option<SportEventResultEntry> {
        self.result_entries.into_iter().next()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEventResultEntry {
    pub sport_event: SportEvent,
    pub tv_channel: TvChannel,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEvent {
    pub id: i64,
    pub sport_data_provider_code: String,
    pub sport_data_provider_match_id: String,
    pub tv_channel_id: i64,
    pub start_time: String,
    pub end_time: String,
    pub sport: String,
    pub category: String,
    pub tournament: String,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Option<SportEventLinks>,
}

impl SportEvent {
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.start_time).ok()
    }

    /// "Home vs Away" style label
    pub fn title(&self) -> String {
        self.competitors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" vs ")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Competitor {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEventLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub tv_channel: Option<Link>,
    pub tv_channel_logo: Option<Link>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TvChannel {
    pub id: i64,
    pub name: String,
}

/// Best odds a sportsbook offers for one event
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsBestOffer {
    #[serde(default)]
    pub sports_book: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<OddsBestOfferOutcome>,
}

impl OddsBestOffer {
    /// One-line summary, e.g. "Bet365: Bulls 1.85 | Celtics 2.10"
    pub fn summary(&self) -> String {
        let outcomes = self
            .outcomes
            .iter()
            .map(|o| format!("{} {:.2}", o.name, o.odds))
            .collect::<Vec<_>>()
            .join(" | ");

        match &self.sports_book {
            Some(book) => format!("{}: {}", book, outcomes),
            None => outcomes,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsBestOfferOutcome {
    pub name: String,
    pub odds: f64,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "resultEntries": [{
            "sportEvent": {
                "id": 1234,
                "sportDataProviderCode": "sportradar",
                "sportDataProviderMatchId": "sr:match:1",
                "tvChannelId": 7,
                "startTime": "2021-03-14T03:40:00.000+00:00",
                "endTime": "2021-03-14T06:00:00.000+00:00",
                "sport": "Basketball",
                "category": "USA",
                "tournament": "NBA",
                "competitors": [{ "name": "Chicago Bulls" }, { "name": "Boston Celtics" }],
                "externalId": "ext-1",
                "_links": {
                    "self": { "href": "https://api.local/sport/events/1234" },
                    "tvChannel": { "href": "https://api.local/tv/channels/7" },
                    "tvChannelLogo": { "href": "https://api.local/tv/channels/7/logo" }
                }
            },
            "tvChannel": { "id": 7, "name": "ESPN" }
        }]
    }"#;

    #[test]
    fn test_parse_sport_events_response() {
        let response: SportEventsResponse = serde_json::from_str(SAMPLE).unwrap();
        let top = response.into_top_match().unwrap();

        assert_eq!(top.sport_event.tournament, "NBA");
        assert_eq!(top.sport_event.title(), "Chicago Bulls vs Boston Celtics");
        assert_eq!(top.tv_channel.name, "ESPN");
        assert!(top.sport_event.start_time().is_some());
        assert_eq!(
            top.sport_event.links.as_ref().unwrap().self_link.href,
            "https://api.local/sport/events/1234"
        );
    }

    #[test]
    fn test_best_offer_summary() {
        let offer: OddsBestOffer = serde_json::from_str(
            r#"{"sportsBook":"Bet365","outcomes":[
                {"name":"Bulls","odds":1.85,"redirectUrl":"https://local.dev"},
                {"name":"Celtics","odds":2.1}]}"#,
        )
        .unwrap();

        assert_eq!(offer.summary(), "Bet365: Bulls 1.85 | Celtics 2.10");
        assert_eq!(
            offer.outcomes[0].redirect_url.as_deref(),
            Some("https://local.dev")
        );
    }

    #[test]
    fn test_missing_entries_is_empty() {
        let response: SportEventsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_top_match().is_none());
    }
}
