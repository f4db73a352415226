//! Industry classification.
//!
//! Maps free-text industry labels (as reported by market-data providers,
//! e.g. "光伏设备", "股份制银行") to a Dang-style industry tier and to the
//! valuation archetype that selects the PE threshold row.
//!
//! Both mappings are ordered keyword tables: each rule is a keyword set plus
//! the tag it yields, evaluated top to bottom with substring containment.

use serde::{Deserialize, Serialize};

// ============================================================================
// Tags
// ============================================================================

/// Industry tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndustryTier {
    /// Means-of-production industries, high dividend (优选行业)
    Preferred,
    /// Ordinary industry (普通行业)
    Normal,
    /// Needs extra attention (谨慎行业)
    Caution,
    /// Never touch (黑名单行业)
    Blacklist,
}

impl std::fmt::Display for IndustryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preferred => write!(f, "优选行业"),
            Self::Normal => write!(f, "普通行业"),
            Self::Caution => write!(f, "谨慎行业"),
            Self::Blacklist => write!(f, "黑名单行业"),
        }
    }
}

/// Valuation archetype used to pick PE thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockArchetype {
    /// 周期股
    Cyclical,
    /// 银行股
    Banking,
    /// 科技股
    Tech,
    /// 消费股
    Consumer,
    /// 其他
    Default,
}

impl std::fmt::Display for StockArchetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cyclical => write!(f, "周期股"),
            Self::Banking => write!(f, "银行股"),
            Self::Tech => write!(f, "科技股"),
            Self::Consumer => write!(f, "消费股"),
            Self::Default => write!(f, "其他"),
        }
    }
}

// ============================================================================
// Keyword lists
// ============================================================================

/// Blacklisted industries: cut-throat competition, unpredictable, or poor business models.
pub const BLACKLIST_INDUSTRIES: &[&str] = &[
    "光伏", "光伏设备", "光伏电池", "组件",
    "电池", "锂电池", "动力电池", "储能电池",
    "电动车", "新能源车", "新能源汽车", "整车",
    "影视", "电影", "传媒", "游戏", "手游",
    "房地产", "地产", "房地产开发", "物业",
    "光伏组件", "电池组件",
];

/// Preferred industries: means of production.
pub const PREFERRED_INDUSTRIES: &[&str] = &[
    "银行", "国有大型银行", "股份制银行", "城商行", "农商行",
    "有色金属", "铜", "铝", "锌", "锡", "黄金", "稀土",
    "煤炭", "煤炭开采",
    "石油", "石油开采",
    "矿产", "铁矿", "锂矿",
    "电力", "水电", "火电", "核电",
    "高速公路", "港口", "机场",
];

/// Caution industries: opaque finance, policy risk, rich valuations, high volatility.
pub const CAUTION_INDUSTRIES: &[&str] = &[
    "证券", "保险",
    "医药", "生物医药",
    "白酒",
    "半导体", "芯片",
];

/// Ordinary industries listed explicitly; anything unmatched is also normal.
pub const NORMAL_INDUSTRIES: &[&str] = &[
    "机械", "建筑", "建材", "交通运输", "通信", "纺织", "农业", "环保",
];

pub const BANKING_KEYWORDS: &[&str] = &["银行"];

pub const CYCLICAL_KEYWORDS: &[&str] =
    &["有色", "煤炭", "钢铁", "石油", "化工", "矿", "水泥", "航运"];

pub const TECH_KEYWORDS: &[&str] = &[
    "科技", "软件", "互联网", "半导体", "芯片", "AI", "人工智能", "云计算",
];

pub const CONSUMER_KEYWORDS: &[&str] =
    &["白酒", "食品", "饮料", "家电", "服装", "零售", "消费"];

// ============================================================================
// Keyword classifier
// ============================================================================

/// One keyword rule: any keyword contained in the text yields `tag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule<T> {
    pub tag: T,
    pub keywords: Vec<String>,
}

impl<T> KeywordRule<T> {
    pub fn new(tag: T, keywords: &[&str]) -> Self {
        Self {
            tag,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// First keyword of this rule contained in `text`.
    pub fn matching_keyword(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|kw| !kw.is_empty() && text.contains(kw))
    }
}

/// Result of a keyword classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch<T> {
    pub tag: T,
    /// Keyword that matched, `None` when the fallback tag was used
    pub keyword: Option<String>,
}

/// Ordered keyword classifier with a fallback tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordClassifier<T> {
    rules: Vec<KeywordRule<T>>,
    fallback: T,
}

impl<T: Copy> KeywordClassifier<T> {
    pub fn new(rules: Vec<KeywordRule<T>>, fallback: T) -> Self {
        Self { rules, fallback }
    }

    /// Classify text; the first rule with a contained keyword wins.
    pub fn classify(&self, text: &str) -> KeywordMatch<T> {
        for rule in &self.rules {
            if let Some(keyword) = rule.matching_keyword(text) {
                return KeywordMatch {
                    tag: rule.tag,
                    keyword: Some(keyword.to_string()),
                };
            }
        }

        KeywordMatch {
            tag: self.fallback,
            keyword: None,
        }
    }

    /// Tags in evaluation order.
    pub fn tags(&self) -> Vec<T> {
        self.rules.iter().map(|r| r.tag).collect()
    }

    pub fn fallback(&self) -> T {
        self.fallback
    }
}

// ============================================================================
// Industry classifier
// ============================================================================

/// Tier classification with its commentary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAssessment {
    pub tier: IndustryTier,
    pub comment: String,
    pub matched_keyword: Option<String>,
}

/// Full industry classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryClassification {
    pub tier: IndustryTier,
    pub archetype: StockArchetype,
    pub comment: String,
}

/// Classifies industry labels into tiers and valuation archetypes.
#[derive(Debug, Clone)]
pub struct IndustryClassifier {
    tiers: KeywordClassifier<IndustryTier>,
    archetypes: KeywordClassifier<StockArchetype>,
}

impl Default for IndustryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IndustryClassifier {
    /// Create a classifier with the built-in keyword tables.
    pub fn new() -> Self {
        Self {
            tiers: default_tier_rules(),
            archetypes: default_archetype_rules(),
        }
    }

    /// Create with custom keyword tables.
    pub fn with_rules(
        tiers: KeywordClassifier<IndustryTier>,
        archetypes: KeywordClassifier<StockArchetype>,
    ) -> Self {
        Self { tiers, archetypes }
    }

    /// Classify an industry into a tier (blacklist > preferred > caution > normal).
    pub fn classify_industry(&self, industry: &str) -> TierAssessment {
        let industry = industry.trim();
        if industry.is_empty() {
            return TierAssessment {
                tier: IndustryTier::Normal,
                comment: "行业信息缺失".to_string(),
                matched_keyword: None,
            };
        }

        let hit = self.tiers.classify(industry);
        let comment = match hit.tag {
            IndustryTier::Blacklist => {
                format!("⚠️ {}属于Dang氏黑名单行业，内卷严重或商业模式差", industry)
            }
            IndustryTier::Preferred => format!("✅ {}是Dang氏优选的生产资料类行业", industry),
            IndustryTier::Caution => format!("⚡ {}需要额外关注政策和估值风险", industry),
            IndustryTier::Normal => format!("{}属于普通行业", industry),
        };

        tracing::debug!(
            industry,
            tier = ?hit.tag,
            keyword = ?hit.keyword,
            "Industry tier classified"
        );

        TierAssessment {
            tier: hit.tag,
            comment,
            matched_keyword: hit.keyword,
        }
    }

    /// Determine the valuation archetype (banking > cyclical > tech > consumer > default).
    pub fn classify_stock_type(&self, industry: &str) -> StockArchetype {
        let industry = industry.trim();
        if industry.is_empty() {
            return StockArchetype::Default;
        }
        self.archetypes.classify(industry).tag
    }

    /// Tier and archetype together.
    pub fn classify(&self, industry: &str) -> IndustryClassification {
        let tier = self.classify_industry(industry);
        IndustryClassification {
            tier: tier.tier,
            archetype: self.classify_stock_type(industry),
            comment: tier.comment,
        }
    }
}

fn default_tier_rules() -> KeywordClassifier<IndustryTier> {
    KeywordClassifier::new(
        vec![
            KeywordRule::new(IndustryTier::Blacklist, BLACKLIST_INDUSTRIES),
            KeywordRule::new(IndustryTier::Preferred, PREFERRED_INDUSTRIES),
            KeywordRule::new(IndustryTier::Caution, CAUTION_INDUSTRIES),
            KeywordRule::new(IndustryTier::Normal, NORMAL_INDUSTRIES),
        ],
        IndustryTier::Normal,
    )
}

fn default_archetype_rules() -> KeywordClassifier<StockArchetype> {
    KeywordClassifier::new(
        vec![
            KeywordRule::new(StockArchetype::Banking, BANKING_KEYWORDS),
            KeywordRule::new(StockArchetype::Cyclical, CYCLICAL_KEYWORDS),
            KeywordRule::new(StockArchetype::Tech, TECH_KEYWORDS),
            KeywordRule::new(StockArchetype::Consumer, CONSUMER_KEYWORDS),
        ],
        StockArchetype::Default,
    )
}
