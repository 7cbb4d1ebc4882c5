// Narrative text attached to computed statistics.
//
// Every label is an enum variant; its display text lives in a static table
// indexed by the variant, so adding a variant means adding a row.
//
// Enums serialize as kebab-case ids. Report fields that carry a verdict
// rather than a key are written with `serialize_label`, so `report.json`
// holds the same text the previews print.
use serde::{Serialize, Serializer};

/// Display text of a narrative enum.
pub trait Label: Copy {
    fn label(self) -> &'static str;
}

/// `serialize_with` helper: writes the display text instead of the id.
pub fn serialize_label<L: Label, S: Serializer>(value: &L, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.label())
}

/// Meal price tier, one per price bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceTier {
    Frugal,
    Economical,
    Quality,
    Luxury,
}

/// (range label, lower bound in cents, upper bound in cents, type name)
const PRICE_TIER_TEXT: [(&str, i64, Option<i64>, &str); 4] = [
    ("<10元", 0, Some(1000), "勤俭节约型"),
    ("10-20元", 1000, Some(2000), "经济实惠型"),
    ("20-30元", 2000, Some(3000), "品质生活型"),
    (">30元", 3000, None, "豪华享受型"),
];

impl PriceTier {
    /// Declared order; ties on bucket size go to the earlier tier.
    pub const ALL: [PriceTier; 4] = [
        PriceTier::Frugal,
        PriceTier::Economical,
        PriceTier::Quality,
        PriceTier::Luxury,
    ];

    pub fn range_label(self) -> &'static str {
        PRICE_TIER_TEXT[self as usize].0
    }

    pub fn min(self) -> i64 {
        PRICE_TIER_TEXT[self as usize].1
    }

    /// Exclusive upper bound, `None` for the open-ended top tier.
    pub fn max(self) -> Option<i64> {
        PRICE_TIER_TEXT[self as usize].2
    }

    pub fn type_name(self) -> &'static str {
        PRICE_TIER_TEXT[self as usize].3
    }

    /// Half-open `[min, max)` membership.
    pub fn contains(self, amount: i64) -> bool {
        amount >= self.min() && self.max().map_or(true, |max| amount < max)
    }
}

impl Label for PriceTier {
    fn label(self) -> &'static str {
        self.type_name()
    }
}

/// Weekday versus weekend spending verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    WeekendIndulges,
    WeekdayEatsBetter,
    Balanced,
}

const COMPARISON_TEXT: [&str; 3] = [
    "周末更舍得犒劳自己呢",
    "工作日吃得更好哦",
    "相当均衡的生活！",
];

impl Label for Comparison {
    fn label(self) -> &'static str {
        COMPARISON_TEXT[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

/// (display name, calendar months)
const SEASON_TEXT: [(&str, [u32; 3]); 4] = [
    ("春季", [3, 4, 5]),
    ("夏季", [6, 7, 8]),
    ("秋季", [9, 10, 11]),
    ("冬季", [12, 1, 2]),
];

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub fn months(self) -> [u32; 3] {
        SEASON_TEXT[self as usize].1
    }

    pub fn of_month(month: u32) -> Season {
        Season::ALL
            .into_iter()
            .find(|s| s.months().contains(&month))
            .unwrap_or(Season::Winter)
    }
}

impl Label for Season {
    fn label(self) -> &'static str {
        SEASON_TEXT[self as usize].0
    }
}

/// How the card holder keeps the balance topped up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManagementStyle {
    CardRich,
    LastMinute,
    WellPrepared,
    LaissezFaire,
}

const MANAGEMENT_TEXT: [&str; 4] = ["一卡通富豪", "临时抱佛脚型", "未雨绸缪型", "佛系管理型"];

impl Label for ManagementStyle {
    fn label(self) -> &'static str {
        MANAGEMENT_TEXT[self as usize]
    }
}

/// Buckets for card spending that is not a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeyondCategory {
    ColdDrinks,
    Pastries,
    ColdCuts,
    Fitness,
    Other,
}

/// (display name, stall-name keywords); checked in declared order.
const BEYOND_TEXT: [(&str, &[&str]); 5] = [
    ("冷饮饮品", &["冷饮", "水吧"]),
    ("糕点甜品", &["糕点", "西饼"]),
    ("冷荤熟食", &["冷荤"]),
    ("体育健身", &["游泳"]),
    ("其他", &[]),
];

impl BeyondCategory {
    pub const ALL: [BeyondCategory; 5] = [
        BeyondCategory::ColdDrinks,
        BeyondCategory::Pastries,
        BeyondCategory::ColdCuts,
        BeyondCategory::Fitness,
        BeyondCategory::Other,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        BEYOND_TEXT[self as usize].1
    }

    /// First bucket whose keyword appears in the stall name, else `Other`.
    pub fn classify(stall: &str) -> BeyondCategory {
        BeyondCategory::ALL
            .into_iter()
            .find(|c| c.keywords().iter().any(|k| stall.contains(k)))
            .unwrap_or(BeyondCategory::Other)
    }
}

impl Label for BeyondCategory {
    fn label(self) -> &'static str {
        BEYOND_TEXT[self as usize].0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeKind {
    Explorer,
    NightOwl,
    BreakfastHero,
    Vip,
    Regular,
}

pub struct BadgeText {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
    /// `{n}` is replaced with the rendered badge value.
    pub template: &'static str,
    pub threshold: i64,
}

static BADGE_TEXT: [BadgeText; 5] = [
    BadgeText {
        id: "explorer",
        name: "食堂探险家",
        emoji: "🏆",
        template: "打卡{n}个不同食堂，探索精神满分！",
        threshold: 3,
    },
    BadgeText {
        id: "night-owl",
        name: "深夜干饭人",
        emoji: "🌙",
        template: "{n}次20:00后用餐，真·时间管理大师",
        threshold: 5,
    },
    BadgeText {
        id: "breakfast-hero",
        name: "早餐铁人",
        emoji: "☀️",
        template: "{n}天吃了早餐，健康生活典范",
        threshold: 30,
    },
    BadgeText {
        id: "vip",
        name: "食堂VIP",
        emoji: "💰",
        template: "年度消费{n}元，食堂该给你分红！",
        threshold: 500_000,
    },
    BadgeText {
        id: "regular",
        name: "常客认证",
        emoji: "🍜",
        template: "{n}顿饭的坚持，食堂阿姨都认识你了",
        threshold: 100,
    },
];

impl BadgeKind {
    pub const ALL: [BadgeKind; 5] = [
        BadgeKind::Explorer,
        BadgeKind::NightOwl,
        BadgeKind::BreakfastHero,
        BadgeKind::Vip,
        BadgeKind::Regular,
    ];

    pub fn text(self) -> &'static BadgeText {
        &BADGE_TEXT[self as usize]
    }

    /// Renders the description for `value`. The VIP value is in cents and is
    /// shown in whole yuan.
    pub fn describe(self, value: i64) -> String {
        let shown = match self {
            BadgeKind::Vip => format!("{:.0}", value as f64 / 100.0),
            _ => value.to_string(),
        };
        self.text().template.replace("{n}", &shown)
    }
}
