//! Region detection from free-text node labels
//!
//! Flags win over keywords. Among keywords the longest match wins, ties go to
//! the earlier table entry. ASCII keywords only match between non-letters so
//! that short codes like `no` or `de` don't fire inside ordinary words;
//! CJK keywords match anywhere.

use serde::Serialize;

/// Region code, display name and flag glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct RegionInfo {
    /// ISO 3166-1 alpha-2 code, empty when unknown
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

impl RegionInfo {
    const fn new(code: &'static str, name: &'static str, flag: &'static str) -> Self {
        Self { code, name, flag }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

const REGIONS: &[RegionInfo] = &[
    RegionInfo::new("HK", "Hong Kong", "🇭🇰"),
    RegionInfo::new("TW", "Taiwan", "🇹🇼"),
    RegionInfo::new("JP", "Japan", "🇯🇵"),
    RegionInfo::new("KR", "South Korea", "🇰🇷"),
    RegionInfo::new("CN", "China", "🇨🇳"),
    RegionInfo::new("SG", "Singapore", "🇸🇬"),
    RegionInfo::new("MY", "Malaysia", "🇲🇾"),
    RegionInfo::new("TH", "Thailand", "🇹🇭"),
    RegionInfo::new("VN", "Vietnam", "🇻🇳"),
    RegionInfo::new("PH", "Philippines", "🇵🇭"),
    RegionInfo::new("ID", "Indonesia", "🇮🇩"),
    RegionInfo::new("US", "United States", "🇺🇸"),
    RegionInfo::new("CA", "Canada", "🇨🇦"),
    RegionInfo::new("GB", "United Kingdom", "🇬🇧"),
    RegionInfo::new("DE", "Germany", "🇩🇪"),
    RegionInfo::new("FR", "France", "🇫🇷"),
    RegionInfo::new("NL", "Netherlands", "🇳🇱"),
    RegionInfo::new("RU", "Russia", "🇷🇺"),
    RegionInfo::new("IT", "Italy", "🇮🇹"),
    RegionInfo::new("ES", "Spain", "🇪🇸"),
    RegionInfo::new("CH", "Switzerland", "🇨🇭"),
    RegionInfo::new("SE", "Sweden", "🇸🇪"),
    RegionInfo::new("FI", "Finland", "🇫🇮"),
    RegionInfo::new("NO", "Norway", "🇳🇴"),
    RegionInfo::new("PL", "Poland", "🇵🇱"),
    RegionInfo::new("TR", "Turkey", "🇹🇷"),
    RegionInfo::new("AU", "Australia", "🇦🇺"),
    RegionInfo::new("NZ", "New Zealand", "🇳🇿"),
    RegionInfo::new("BR", "Brazil", "🇧🇷"),
    RegionInfo::new("AR", "Argentina", "🇦🇷"),
    RegionInfo::new("AE", "UAE", "🇦🇪"),
    RegionInfo::new("IL", "Israel", "🇮🇱"),
    RegionInfo::new("IN", "India", "🇮🇳"),
];

/// Lower-case keyword to region code
const KEYWORDS: &[(&str, &str)] = &[
    // East Asia
    ("hk", "HK"),
    ("hongkong", "HK"),
    ("hong kong", "HK"),
    ("香港", "HK"),
    ("tw", "TW"),
    ("taiwan", "TW"),
    ("taipei", "TW"),
    ("台湾", "TW"),
    ("台灣", "TW"),
    ("台北", "TW"),
    ("jp", "JP"),
    ("japan", "JP"),
    ("tokyo", "JP"),
    ("osaka", "JP"),
    ("日本", "JP"),
    ("东京", "JP"),
    ("東京", "JP"),
    ("大阪", "JP"),
    ("kr", "KR"),
    ("korea", "KR"),
    ("seoul", "KR"),
    ("韩国", "KR"),
    ("韓國", "KR"),
    ("首尔", "KR"),
    ("cn", "CN"),
    ("china", "CN"),
    ("shanghai", "CN"),
    ("beijing", "CN"),
    ("guangzhou", "CN"),
    ("shenzhen", "CN"),
    ("中国", "CN"),
    ("中國", "CN"),
    ("上海", "CN"),
    ("北京", "CN"),
    ("广州", "CN"),
    ("深圳", "CN"),
    // Southeast Asia
    ("sg", "SG"),
    ("singapore", "SG"),
    ("新加坡", "SG"),
    ("狮城", "SG"),
    ("my", "MY"),
    ("malaysia", "MY"),
    ("kuala lumpur", "MY"),
    ("马来西亚", "MY"),
    ("th", "TH"),
    ("thailand", "TH"),
    ("bangkok", "TH"),
    ("泰国", "TH"),
    ("曼谷", "TH"),
    ("vn", "VN"),
    ("vietnam", "VN"),
    ("越南", "VN"),
    ("ph", "PH"),
    ("philippines", "PH"),
    ("manila", "PH"),
    ("菲律宾", "PH"),
    ("id", "ID"),
    ("indonesia", "ID"),
    ("jakarta", "ID"),
    ("印尼", "ID"),
    ("印度尼西亚", "ID"),
    // North America
    ("us", "US"),
    ("usa", "US"),
    ("america", "US"),
    ("united states", "US"),
    ("los angeles", "US"),
    ("new york", "US"),
    ("seattle", "US"),
    ("san jose", "US"),
    ("silicon valley", "US"),
    ("dallas", "US"),
    ("chicago", "US"),
    ("美国", "US"),
    ("洛杉矶", "US"),
    ("纽约", "US"),
    ("西雅图", "US"),
    ("圣何塞", "US"),
    ("硅谷", "US"),
    ("达拉斯", "US"),
    ("芝加哥", "US"),
    ("ca", "CA"),
    ("canada", "CA"),
    ("toronto", "CA"),
    ("vancouver", "CA"),
    ("加拿大", "CA"),
    ("多伦多", "CA"),
    ("温哥华", "CA"),
    // Europe
    ("uk", "GB"),
    ("gb", "GB"),
    ("england", "GB"),
    ("britain", "GB"),
    ("united kingdom", "GB"),
    ("london", "GB"),
    ("英国", "GB"),
    ("伦敦", "GB"),
    ("de", "DE"),
    ("germany", "DE"),
    ("frankfurt", "DE"),
    ("德国", "DE"),
    ("法兰克福", "DE"),
    ("fr", "FR"),
    ("france", "FR"),
    ("paris", "FR"),
    ("法国", "FR"),
    ("巴黎", "FR"),
    ("nl", "NL"),
    ("netherlands", "NL"),
    ("amsterdam", "NL"),
    ("荷兰", "NL"),
    ("阿姆斯特丹", "NL"),
    ("ru", "RU"),
    ("russia", "RU"),
    ("moscow", "RU"),
    ("俄罗斯", "RU"),
    ("莫斯科", "RU"),
    ("it", "IT"),
    ("italy", "IT"),
    ("milan", "IT"),
    ("意大利", "IT"),
    ("es", "ES"),
    ("spain", "ES"),
    ("madrid", "ES"),
    ("西班牙", "ES"),
    ("ch", "CH"),
    ("switzerland", "CH"),
    ("zurich", "CH"),
    ("瑞士", "CH"),
    ("se", "SE"),
    ("sweden", "SE"),
    ("stockholm", "SE"),
    ("瑞典", "SE"),
    ("fi", "FI"),
    ("finland", "FI"),
    ("helsinki", "FI"),
    ("芬兰", "FI"),
    ("no", "NO"),
    ("norway", "NO"),
    ("oslo", "NO"),
    ("挪威", "NO"),
    ("pl", "PL"),
    ("poland", "PL"),
    ("warsaw", "PL"),
    ("波兰", "PL"),
    ("tr", "TR"),
    ("turkey", "TR"),
    ("istanbul", "TR"),
    ("土耳其", "TR"),
    // Oceania
    ("au", "AU"),
    ("australia", "AU"),
    ("sydney", "AU"),
    ("melbourne", "AU"),
    ("澳大利亚", "AU"),
    ("悉尼", "AU"),
    ("墨尔本", "AU"),
    ("nz", "NZ"),
    ("new zealand", "NZ"),
    ("newzealand", "NZ"),
    ("auckland", "NZ"),
    ("新西兰", "NZ"),
    // South America
    ("br", "BR"),
    ("brazil", "BR"),
    ("sao paulo", "BR"),
    ("巴西", "BR"),
    ("ar", "AR"),
    ("argentina", "AR"),
    ("buenos aires", "AR"),
    ("阿根廷", "AR"),
    // Middle East
    ("ae", "AE"),
    ("uae", "AE"),
    ("dubai", "AE"),
    ("阿联酋", "AE"),
    ("迪拜", "AE"),
    ("il", "IL"),
    ("israel", "IL"),
    ("tel aviv", "IL"),
    ("以色列", "IL"),
    // South Asia
    ("in", "IN"),
    ("india", "IN"),
    ("mumbai", "IN"),
    ("印度", "IN"),
];

/// Identify the region a node label refers to
///
/// Returns the empty [`RegionInfo`] when nothing matches.
pub fn detect(label: &str) -> RegionInfo {
    if label.is_empty() {
        return RegionInfo::default();
    }

    // The flag appearing first in the label wins
    let by_flag = REGIONS
        .iter()
        .filter_map(|region| label.find(region.flag).map(|pos| (pos, region)))
        .min_by_key(|(pos, _)| *pos);
    if let Some((_, region)) = by_flag {
        return *region;
    }

    let lower = label.to_lowercase();
    let mut best: Option<(&str, &str)> = None;
    for &(keyword, code) in KEYWORDS {
        if !contains_keyword(&lower, keyword) {
            continue;
        }
        if best.map_or(true, |(current, _)| keyword.len() > current.len()) {
            best = Some((keyword, code));
        }
    }

    best.and_then(|(_, code)| lookup(code)).unwrap_or_default()
}

/// Region details for an upper-case code
pub fn lookup(code: &str) -> Option<RegionInfo> {
    REGIONS
        .iter()
        .find(|region| region.code.eq_ignore_ascii_case(code))
        .copied()
}

/// Every known region, sorted by code
pub fn all_regions() -> Vec<RegionInfo> {
    let mut regions = REGIONS.to_vec();
    regions.sort_by_key(|region| region.code);
    regions
}

fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return haystack.contains(keyword);
    }

    let bytes = haystack.as_bytes();
    haystack.match_indices(keyword).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphabetic();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphabetic();
        before_ok && after_ok
    })
}
