//! Fixed rule tables for campaign specifications.
//!
//! New objectives, goals or enum values are added by extending these tables.

/// What a required field must hold to count as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Object,
    /// Any non-null value; deeper checks decide what is acceptable.
    Value,
}

pub type FieldSpec = (&'static str, Kind);

pub const REQUIRED_SECTIONS: &[&str] = &["campaign", "ad_set", "ad"];

pub const CAMPAIGN_FIELDS: &[FieldSpec] = &[
    ("name", Kind::Text),
    ("objective", Kind::Text),
    ("status", Kind::Text),
];

pub const AD_SET_FIELDS: &[FieldSpec] = &[
    ("name", Kind::Text),
    ("optimization_goal", Kind::Text),
    ("billing_event", Kind::Text),
    ("bid_strategy", Kind::Text),
    ("budget", Kind::Object),
    ("targeting", Kind::Object),
];

pub const AD_FIELDS: &[FieldSpec] = &[("name", Kind::Text), ("creative", Kind::Object)];

pub const BUDGET_FIELDS: &[FieldSpec] = &[("amount", Kind::Value), ("type", Kind::Text)];

pub const CREATIVE_FIELDS: &[FieldSpec] = &[
    ("title", Kind::Text),
    ("body", Kind::Text),
    ("call_to_action", Kind::Text),
    ("link", Kind::Text),
];

/// Top-level sections with the fields each one must carry.
pub const SECTION_FIELDS: &[(&str, &[FieldSpec])] = &[
    ("campaign", CAMPAIGN_FIELDS),
    ("ad_set", AD_SET_FIELDS),
    ("ad", AD_FIELDS),
];

// Character limits
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 125;
pub const MAX_BODY_LEN: usize = 500;
pub const MAX_IMAGE_DESCRIPTION_LEN: usize = 200;

/// Minor currency units (cents).
pub const MIN_BUDGET_AMOUNT: f64 = 100.0;

pub const MIN_AGE: i64 = 13;
pub const MAX_AGE: i64 = 65;

/// 1 = male, 2 = female
pub const VALID_GENDERS: &[i64] = &[1, 2];

pub const OBJECTIVES: &[&str] = &[
    "OUTCOME_AWARENESS",
    "OUTCOME_ENGAGEMENT",
    "OUTCOME_SALES",
    "OUTCOME_LEAD_GENERATION",
    "OUTCOME_APP_PROMOTION",
    "OUTCOME_TRAFFIC",
];

pub const STATUSES: &[&str] = &["ACTIVE", "PAUSED", "DELETED", "ARCHIVED"];

pub const OPTIMIZATION_GOALS: &[(&str, &[&str])] = &[
    ("OUTCOME_AWARENESS", &["AD_RECALL_LIFT", "IMPRESSIONS", "REACH"]),
    ("OUTCOME_ENGAGEMENT", &["LINK_CLICKS", "POST_ENGAGEMENT", "VIDEO_VIEWS"]),
    ("OUTCOME_SALES", &["OFFSITE_CONVERSIONS", "VALUE", "OMNI_SALES", "STORE_VISITS"]),
    ("OUTCOME_LEAD_GENERATION", &["LEAD_GENERATION", "LINK_CLICKS"]),
    ("OUTCOME_APP_PROMOTION", &["APP_INSTALLS", "LINK_CLICKS", "APP_EVENTS", "VALUE"]),
    ("OUTCOME_TRAFFIC", &["LINK_CLICKS", "LANDING_PAGE_VIEWS", "IMPRESSIONS", "REACH"]),
];

pub const BILLING_EVENTS: &[&str] = &[
    "IMPRESSIONS",
    "LINK_CLICKS",
    "APP_INSTALLS",
    "OFFER_CLAIMS",
    "PAGE_LIKES",
    "POST_ENGAGEMENT",
];

pub const BID_STRATEGIES: &[&str] = &[
    "LOWEST_COST_WITHOUT_CAP",
    "LOWEST_COST_WITH_BID_CAP",
    "TARGET_COST",
    "COST_CAP",
];

pub const BUDGET_TYPES: &[&str] = &["daily", "lifetime"];

pub const CALL_TO_ACTIONS: &[&str] = &[
    "BOOK_TRAVEL",
    "DONATE",
    "DOWNLOAD",
    "GET_OFFER",
    "GET_QUOTE",
    "LEARN_MORE",
    "LISTEN_MUSIC",
    "MESSAGE_PAGE",
    "NO_BUTTON",
    "OPEN_LINK",
    "ORDER_NOW",
    "PLAY_GAME",
    "SHOP_NOW",
    "SIGN_UP",
    "SUBSCRIBE",
    "USE_APP",
    "WATCH_MORE",
    "WATCH_VIDEO",
];

/// Goals allowed for `objective`, or `None` for an objective not in the table.
pub fn allowed_goals(objective: &str) -> Option<&'static [&'static str]> {
    OPTIMIZATION_GOALS
        .iter()
        .find(|(o, _)| *o == objective)
        .map(|(_, goals)| *goals)
}
